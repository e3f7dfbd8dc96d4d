// src/ingest/mod.rs
//! Run orchestrator: fetch → normalize → dedup → store for every configured adapter,
//! sequentially, with a fixed pause between adapters.

pub mod config;
pub mod deadline;
pub mod dedup;
pub mod normalize;
pub mod providers;
pub mod types;

use std::time::{Duration, Instant};

use chrono::Utc;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use once_cell::sync::OnceCell;
use serde::Serialize;

use crate::error::RunError;
use crate::ingest::dedup::{store_if_new, DedupPolicy, StoreOutcome};
use crate::ingest::normalize::normalize_candidate;
use crate::ingest::types::SourceProvider;
use crate::listing::{RunLog, RunStatus};
use crate::store::Repository;

pub const DEFAULT_INTER_ADAPTER_DELAY: Duration = Duration::from_millis(1000);
pub const DEFAULT_ADAPTER_DEADLINE: Duration = Duration::from_secs(15);

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "ingest_candidates_total",
            "Raw candidates yielded by adapters."
        );
        describe_counter!(
            "ingest_malformed_total",
            "Items skipped by adapters as malformed."
        );
        describe_counter!("ingest_added_total", "Listings inserted as new.");
        describe_counter!(
            "ingest_duplicates_total",
            "Candidates skipped as already stored."
        );
        describe_counter!(
            "ingest_refreshed_total",
            "Stored listings refreshed from a re-crawl."
        );
        describe_counter!(
            "ingest_rejected_total",
            "Candidates dropped by normalization."
        );
        describe_counter!(
            "ingest_adapter_errors_total",
            "Adapter fetch/parse failures."
        );
        describe_counter!("ingest_store_errors_total", "Per-item store failures.");
        describe_counter!("ingest_runs_total", "Orchestrator runs by status.");
        describe_histogram!("ingest_parse_ms", "Adapter parse time in milliseconds.");
        describe_histogram!("ingest_run_ms", "Whole run duration in milliseconds.");
        describe_gauge!("ingest_last_run_ts", "Unix ts when a run last finished.");
    });
}

/// Adapters that share a run-log label (e.g. "contests").
pub struct SourceGroup {
    pub name: String,
    pub providers: Vec<Box<dyn SourceProvider>>,
}

#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    pub inter_adapter_delay: Duration,
    /// Hard ceiling on one adapter's fetch + parse, on top of the HTTP timeout.
    pub adapter_deadline: Duration,
    pub dedup: DedupPolicy,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            inter_adapter_delay: DEFAULT_INTER_ADAPTER_DELAY,
            adapter_deadline: DEFAULT_ADAPTER_DEADLINE,
            dedup: DedupPolicy::SkipExisting,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct RunSummary {
    pub source_group: String,
    pub items_found: usize,
    pub items_added: usize,
    pub items_refreshed: usize,
    pub items_skipped: usize,
    pub items_rejected: usize,
    pub store_failures: usize,
    pub adapter_failures: usize,
    pub duration_ms: u64,
}

pub fn group_label(groups: &[SourceGroup]) -> String {
    if groups.is_empty() {
        return "none".to_string();
    }
    groups
        .iter()
        .map(|g| g.name.as_str())
        .collect::<Vec<_>>()
        .join("+")
}

/// Run every adapter of every group once and write exactly one run-log row.
///
/// Adapter failures, malformed candidates and per-item store failures are counted
/// and logged; only an unreachable repository or an empty source set abort the run.
pub async fn run_once(
    repo: &dyn Repository,
    groups: &[SourceGroup],
    opts: &RunOptions,
) -> Result<RunSummary, RunError> {
    ensure_metrics_described();
    let started = Instant::now();
    let label = group_label(groups);

    if groups.iter().all(|g| g.providers.is_empty()) {
        let err = RunError::NoSources {
            scope: label.clone(),
        };
        return Err(abort(repo, &label, started, err));
    }
    if let Err(e) = repo.ping() {
        return Err(abort(repo, &label, started, RunError::Repository(e)));
    }

    let mut sum = RunSummary {
        source_group: label.clone(),
        ..Default::default()
    };
    let mut first = true;

    for group in groups {
        for p in &group.providers {
            if !first && !opts.inter_adapter_delay.is_zero() {
                tokio::time::sleep(opts.inter_adapter_delay).await;
            }
            first = false;

            let fetched = tokio::time::timeout(opts.adapter_deadline, p.fetch_latest()).await;
            let candidates = match fetched {
                Ok(Ok(v)) => v,
                Ok(Err(e)) => {
                    tracing::warn!(
                        target: "ingest",
                        error = ?e,
                        provider = p.name(),
                        group = %group.name,
                        "adapter failed"
                    );
                    counter!("ingest_adapter_errors_total").increment(1);
                    sum.adapter_failures += 1;
                    continue;
                }
                Err(_) => {
                    tracing::warn!(
                        target: "ingest",
                        provider = p.name(),
                        group = %group.name,
                        deadline_ms = opts.adapter_deadline.as_millis() as u64,
                        "adapter timed out"
                    );
                    counter!("ingest_adapter_errors_total").increment(1);
                    sum.adapter_failures += 1;
                    continue;
                }
            };

            sum.items_found += candidates.len();
            let crawled_at = Utc::now();
            let (mut added, mut skipped) = (0usize, 0usize);

            for raw in &candidates {
                let item = match normalize_candidate(raw, p.descriptor(), crawled_at) {
                    Ok(item) => item,
                    Err(reason) => {
                        tracing::debug!(
                            target: "ingest",
                            provider = p.name(),
                            %reason,
                            "candidate dropped"
                        );
                        counter!("ingest_rejected_total").increment(1);
                        sum.items_rejected += 1;
                        continue;
                    }
                };
                let id = item.id.clone();
                match store_if_new(repo, item, opts.dedup) {
                    Ok(StoreOutcome::Added) => {
                        added += 1;
                        counter!("ingest_added_total").increment(1);
                    }
                    Ok(StoreOutcome::Duplicate) => {
                        skipped += 1;
                        counter!("ingest_duplicates_total").increment(1);
                    }
                    Ok(StoreOutcome::Refreshed) => {
                        sum.items_refreshed += 1;
                        counter!("ingest_refreshed_total").increment(1);
                    }
                    Err(e) => {
                        tracing::warn!(
                            target: "ingest",
                            error = %e,
                            provider = p.name(),
                            %id,
                            "store failed"
                        );
                        counter!("ingest_store_errors_total").increment(1);
                        sum.store_failures += 1;
                    }
                }
            }

            sum.items_added += added;
            sum.items_skipped += skipped;
            tracing::info!(
                target: "ingest",
                provider = p.name(),
                group = %group.name,
                found = candidates.len(),
                added,
                skipped,
                "adapter done"
            );
        }
    }

    sum.duration_ms = started.elapsed().as_millis() as u64;
    let log = RunLog {
        source_group: label,
        status: RunStatus::Success,
        items_found: sum.items_found,
        items_added: sum.items_added,
        items_skipped: sum.items_skipped,
        items_rejected: sum.items_rejected,
        adapter_failures: sum.adapter_failures,
        error_message: None,
        duration_ms: sum.duration_ms,
        created_at: Utc::now(),
    };
    repo.insert_run_log(log).map_err(RunError::RunLog)?;

    record_run(RunStatus::Success, sum.duration_ms);
    tracing::info!(
        target: "ingest",
        group = %sum.source_group,
        found = sum.items_found,
        added = sum.items_added,
        adapter_failures = sum.adapter_failures,
        duration_ms = sum.duration_ms,
        "run finished"
    );
    Ok(sum)
}

/// Write the error run-log row (best effort) and hand the error back.
fn abort(repo: &dyn Repository, label: &str, started: Instant, err: RunError) -> RunError {
    let duration_ms = started.elapsed().as_millis() as u64;
    tracing::error!(target: "ingest", group = label, error = %err, "run aborted");
    let log = RunLog {
        source_group: label.to_string(),
        status: RunStatus::Error,
        items_found: 0,
        items_added: 0,
        items_skipped: 0,
        items_rejected: 0,
        adapter_failures: 0,
        error_message: Some(err.to_string()),
        duration_ms,
        created_at: Utc::now(),
    };
    if let Err(e) = repo.insert_run_log(log) {
        tracing::warn!(target: "ingest", error = %e, "could not record failed run");
    }
    record_run(RunStatus::Error, duration_ms);
    err
}

fn record_run(status: RunStatus, duration_ms: u64) {
    counter!("ingest_runs_total", "status" => status.to_string()).increment(1);
    histogram!("ingest_run_ms").record(duration_ms as f64);
    gauge!("ingest_last_run_ts").set(Utc::now().timestamp().max(0) as f64);
}
