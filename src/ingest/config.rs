// src/ingest/config.rs
//! Source catalogue: which adapters exist, grouped by run-log label.

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::ingest::providers::{Fetch, SourceAdapter, SourceSpec};
use crate::ingest::types::SourceProvider;
use crate::ingest::SourceGroup;
use crate::config::Settings;

const ENV_PATH: &str = "SOURCES_CONFIG_PATH";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourceCatalogue {
    #[serde(default)]
    pub groups: Vec<GroupSpec>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GroupSpec {
    pub name: String,
    #[serde(default)]
    pub sources: Vec<SourceSpec>,
}

impl SourceCatalogue {
    pub fn group_names(&self) -> Vec<&str> {
        self.groups.iter().map(|g| g.name.as_str()).collect()
    }

    /// Reject empty group names and sources whose selectors do not compile, disabled
    /// ones included.
    pub fn validate(&self) -> Result<()> {
        for g in &self.groups {
            if g.name.trim().is_empty() {
                return Err(anyhow!("source group with empty name"));
            }
            for spec in &g.sources {
                spec.validate()
                    .with_context(|| format!("in source group {:?}", g.name))?;
            }
        }
        Ok(())
    }

    /// Build live HTTP adapters. `only` restricts the run to one group by name.
    pub fn build_groups(
        &self,
        only: Option<&str>,
        settings: &Settings,
        client: &reqwest::Client,
    ) -> Result<Vec<SourceGroup>> {
        if let Some(name) = only {
            if !self.groups.iter().any(|g| g.name.eq_ignore_ascii_case(name)) {
                return Err(anyhow!("unknown source group {name:?}"));
            }
        }

        let mut out = Vec::new();
        for g in &self.groups {
            if only.is_some_and(|n| !g.name.eq_ignore_ascii_case(n)) {
                continue;
            }
            let mut providers: Vec<Box<dyn SourceProvider>> = Vec::new();
            for spec in g.sources.iter().filter(|s| s.enabled) {
                let fetch =
                    Fetch::http(spec.fetch_url(), client.clone(), settings.fetch_timeout);
                let adapter =
                    SourceAdapter::from_spec(spec, fetch, settings.max_items_per_source)
                        .with_context(|| format!("building source {:?}", spec.name))?;
                providers.push(Box::new(adapter));
            }
            out.push(SourceGroup {
                name: g.name.clone(),
                providers,
            });
        }
        Ok(out)
    }
}

/// Load the catalogue from an explicit path. Supports TOML or JSON.
pub fn load_sources_from(path: &Path) -> Result<SourceCatalogue> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading sources from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_catalogue(&content, ext.as_str())
        .with_context(|| format!("parsing sources from {}", path.display()))
}

/// Load the catalogue using env var + fallbacks:
/// 1) $SOURCES_CONFIG_PATH
/// 2) config/sources.toml
/// 3) config/sources.json
///
/// Nothing found → empty catalogue (the orchestrator refuses to run on it).
pub fn load_sources_default() -> Result<SourceCatalogue> {
    if let Ok(p) = std::env::var(ENV_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_sources_from(&pb);
        } else {
            return Err(anyhow!("SOURCES_CONFIG_PATH points to non-existent path"));
        }
    }
    let toml_p = PathBuf::from("config/sources.toml");
    if toml_p.exists() {
        return load_sources_from(&toml_p);
    }
    let json_p = PathBuf::from("config/sources.json");
    if json_p.exists() {
        return load_sources_from(&json_p);
    }
    Ok(SourceCatalogue::default())
}

fn parse_catalogue(s: &str, hint_ext: &str) -> Result<SourceCatalogue> {
    let cat: SourceCatalogue = if hint_ext == "json" || s.trim_start().starts_with('{') {
        serde_json::from_str(s)?
    } else {
        toml::from_str(s)?
    };
    cat.validate()?;
    Ok(cat)
}
