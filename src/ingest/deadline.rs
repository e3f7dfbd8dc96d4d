//! Deadline parsing as an ordered list of independent strategies.
//!
//! Each strategy looks at the raw date text and the crawl date and either produces a
//! calendar date or passes. The first hit wins; when every strategy passes the
//! deadline falls back to crawl date + [`FALLBACK_DAYS`].

use chrono::{DateTime, Days, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

pub const FALLBACK_DAYS: u64 = 30;

pub trait DeadlineStrategy: Send + Sync {
    fn name(&self) -> &'static str;
    fn parse(&self, text: &str, crawl_date: NaiveDate) -> Option<NaiveDate>;
}

/// `YYYY.MM.DD`, `YYYY-MM-DD` or `YYYY/MM/DD` anywhere in the text.
/// For a range like `2026.01.01 ~ 2026.01.31` the last valid date is the deadline.
pub struct LiteralDate;

static RE_LITERAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{4})\s*[.\-/]\s*(\d{1,2})\s*[.\-/]\s*(\d{1,2})").expect("literal date regex")
});

impl DeadlineStrategy for LiteralDate {
    fn name(&self) -> &'static str {
        "literal"
    }

    fn parse(&self, text: &str, _crawl_date: NaiveDate) -> Option<NaiveDate> {
        RE_LITERAL
            .captures_iter(text)
            .filter_map(|c| {
                let y = c[1].parse::<i32>().ok()?;
                let m = c[2].parse::<u32>().ok()?;
                let d = c[3].parse::<u32>().ok()?;
                NaiveDate::from_ymd_opt(y, m, d)
            })
            .last()
    }
}

/// `D-N` countdown notation: crawl date + N days. `D-DAY` is the crawl date itself.
pub struct RelativeDays;

static RE_D_MINUS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:^|[^a-z0-9])d\s*-\s*(\d{1,4}|day)\b").expect("d-minus regex"));

impl DeadlineStrategy for RelativeDays {
    fn name(&self) -> &'static str {
        "d-minus"
    }

    fn parse(&self, text: &str, crawl_date: NaiveDate) -> Option<NaiveDate> {
        let caps = RE_D_MINUS.captures(text)?;
        let raw = &caps[1];
        if raw.eq_ignore_ascii_case("day") {
            return Some(crawl_date);
        }
        let n = raw.parse::<u64>().ok()?;
        crawl_date.checked_add_days(Days::new(n))
    }
}

pub fn default_strategies() -> Vec<Box<dyn DeadlineStrategy>> {
    vec![Box::new(LiteralDate), Box::new(RelativeDays)]
}

pub fn fallback_deadline(crawl_date: NaiveDate) -> NaiveDate {
    crawl_date
        .checked_add_days(Days::new(FALLBACK_DAYS))
        .unwrap_or(crawl_date)
}

/// Resolve a deadline with the default strategy order.
pub fn parse_deadline(text: Option<&str>, crawled_at: DateTime<Utc>) -> NaiveDate {
    static STRATEGIES: Lazy<Vec<Box<dyn DeadlineStrategy>>> = Lazy::new(default_strategies);
    parse_deadline_with(&STRATEGIES, text, crawled_at)
}

pub fn parse_deadline_with(
    strategies: &[Box<dyn DeadlineStrategy>],
    text: Option<&str>,
    crawled_at: DateTime<Utc>,
) -> NaiveDate {
    let crawl_date = crawled_at.date_naive();
    let text = text.map(str::trim).unwrap_or_default();
    if !text.is_empty() {
        for s in strategies {
            if let Some(d) = s.parse(text, crawl_date) {
                tracing::trace!(target: "ingest", strategy = s.name(), %d, "deadline parsed");
                return d;
            }
        }
    }
    fallback_deadline(crawl_date)
}
