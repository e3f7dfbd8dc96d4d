// src/ingest/normalize.rs
//! Raw candidate → canonical [`ListingItem`].

use chrono::{DateTime, Utc};
use once_cell::sync::OnceCell;
use regex::Regex;
use url::Url;

use crate::error::ValidationError;
use crate::ingest::deadline::parse_deadline;
use crate::ingest::types::{RawCandidate, SourceDescriptor};
use crate::listing::{ListingItem, ListingType};

pub const ONLINE_LOCATION: &str = "online";
pub const UNSPECIFIED_LOCATION: &str = "unspecified";
const DESCRIPTION_CAP: usize = 2000;
const FIELD_CAP: usize = 300;

/// Normalize text: decode entities, strip tags, fold quotes, collapse whitespace, trim.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, " ").to_string();

    // 3) Typographic quotes to ASCII
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace (incl. nbsp)
    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"[\s\u{00A0}]+").unwrap());
    re_ws.replace_all(&out, " ").trim().to_string()
}

fn cap_chars(s: String, max: usize) -> String {
    if s.chars().count() > max {
        s.chars().take(max).collect()
    } else {
        s
    }
}

fn clean_opt(s: Option<&str>, max: usize) -> Option<String> {
    s.map(normalize_text)
        .filter(|t| !t.is_empty())
        .map(|t| cap_chars(t, max))
}

/// Resolve `raw` against `base`. Only http(s) results count; anything else is `None`.
pub fn resolve_link(base: &str, raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() || raw.starts_with('#') {
        return None;
    }
    if raw.to_ascii_lowercase().starts_with("javascript:") {
        return None;
    }
    let resolved = match Url::parse(raw) {
        Ok(abs) => abs,
        Err(url::ParseError::RelativeUrlWithoutBase) => Url::parse(base).ok()?.join(raw).ok()?,
        Err(_) => return None,
    };
    match resolved.scheme() {
        "http" | "https" if resolved.host_str().is_some() => Some(resolved.to_string()),
        _ => None,
    }
}

/// Pull a compact prize string like `1,000만원`, `3억원`, `1억5천만원`, `500,000원` or
/// `$5,000`. A bare `억` counts as won; the smaller units need the `원` suffix.
pub fn extract_prize(text: &str) -> Option<String> {
    static RE_KRW_UNIT: OnceCell<Regex> = OnceCell::new();
    static RE_KRW_PLAIN: OnceCell<Regex> = OnceCell::new();
    static RE_USD: OnceCell<Regex> = OnceCell::new();

    let re_unit = RE_KRW_UNIT.get_or_init(|| {
        const NUM: &str = r"(\d{1,3}(?:,\d{3})+|\d+(?:\.\d+)?)";
        Regex::new(&format!(
            r"{NUM}\s*억(?:\s*{NUM}\s*(천만|백만|만)\s*원|\s*원)?|{NUM}\s*(천만|백만|만)\s*원"
        ))
        .unwrap()
    });
    if let Some(c) = re_unit.captures(text) {
        return match (c.get(1), c.get(2), c.get(3)) {
            (Some(eok), Some(n), Some(unit)) => Some(format!(
                "{}억{}{}원",
                eok.as_str(),
                n.as_str(),
                unit.as_str()
            )),
            (Some(eok), _, _) => Some(format!("{}억원", eok.as_str())),
            _ => Some(format!("{}{}원", &c[4], &c[5])),
        };
    }

    let re_plain =
        RE_KRW_PLAIN.get_or_init(|| Regex::new(r"(\d{1,3}(?:,\d{3})+|\d{4,})\s*원").unwrap());
    if let Some(c) = re_plain.captures(text) {
        return Some(format!("{}원", &c[1]));
    }

    let re_usd = RE_USD.get_or_init(|| Regex::new(r"\$\s?(\d{1,3}(?:,\d{3})+|\d+)").unwrap());
    re_usd.captures(text).map(|c| format!("${}", &c[1]))
}

fn default_location(kind: ListingType, given: Option<String>) -> Option<String> {
    match (kind, given) {
        (_, Some(loc)) => Some(loc),
        (ListingType::Contest, None) => Some(ONLINE_LOCATION.to_string()),
        (ListingType::Job, None) => Some(UNSPECIFIED_LOCATION.to_string()),
        (ListingType::Event, None) => None,
    }
}

/// Map one raw candidate to a pending listing, or say why it was dropped.
pub fn normalize_candidate(
    raw: &RawCandidate,
    source: &SourceDescriptor,
    crawled_at: DateTime<Utc>,
) -> Result<ListingItem, ValidationError> {
    let title = cap_chars(normalize_text(&raw.title), FIELD_CAP);
    if title.is_empty() {
        return Err(ValidationError::EmptyTitle);
    }
    let link = resolve_link(&source.base_url, &raw.link).ok_or(ValidationError::EmptyLink)?;

    let deadline = parse_deadline(raw.date_text.as_deref(), crawled_at);
    let description = clean_opt(raw.description.as_deref(), DESCRIPTION_CAP);

    let prize = match source.listing_type {
        ListingType::Contest => raw
            .prize_text
            .as_deref()
            .and_then(extract_prize)
            .or_else(|| description.as_deref().and_then(extract_prize))
            .or_else(|| extract_prize(&title)),
        _ => raw.prize_text.as_deref().and_then(extract_prize),
    };

    let mut item = ListingItem::pending(
        source.listing_type,
        title,
        link,
        deadline,
        source.name.clone(),
        crawled_at,
    );
    item.description = description;
    item.company = clean_opt(raw.company.as_deref(), FIELD_CAP);
    item.location = default_location(
        source.listing_type,
        clean_opt(raw.location.as_deref(), FIELD_CAP),
    );
    item.prize = prize;
    Ok(item)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    fn src(kind: ListingType) -> SourceDescriptor {
        SourceDescriptor {
            name: "test-source".into(),
            base_url: "https://contests.example.com/list/".into(),
            listing_type: kind,
        }
    }

    fn t() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 10, 0, 0, 0).unwrap()
    }

    #[test]
    fn normalize_text_strips_tags_and_entities() {
        let s = "  <b>Hello</b>&nbsp;&nbsp;\n world &ldquo;ok&rdquo; ";
        assert_eq!(normalize_text(s), r#"Hello world "ok""#);
    }

    #[test]
    fn relative_links_resolve_against_base() {
        let base = "https://contests.example.com/list/";
        assert_eq!(
            resolve_link(base, "/detail/7").as_deref(),
            Some("https://contests.example.com/detail/7")
        );
        assert_eq!(
            resolve_link(base, "view?id=3").as_deref(),
            Some("https://contests.example.com/list/view?id=3")
        );
        assert_eq!(
            resolve_link(base, "http://other.example.org/a").as_deref(),
            Some("http://other.example.org/a")
        );
    }

    #[test]
    fn useless_links_are_rejected() {
        let base = "https://contests.example.com/";
        assert_eq!(resolve_link(base, ""), None);
        assert_eq!(resolve_link(base, "   "), None);
        assert_eq!(resolve_link(base, "#top"), None);
        assert_eq!(resolve_link(base, "javascript:void(0)"), None);
        assert_eq!(resolve_link(base, "mailto:a@b.c"), None);
    }

    #[test]
    fn prize_patterns() {
        assert_eq!(extract_prize("총 상금 1,000 만원").as_deref(), Some("1,000만원"));
        assert_eq!(extract_prize("대상 3억").as_deref(), Some("3억원"));
        assert_eq!(extract_prize("상금 5천만원 규모").as_deref(), Some("5천만원"));
        assert_eq!(extract_prize("1등 500,000원").as_deref(), Some("500,000원"));
        assert_eq!(extract_prize("Grand prize $5,000").as_deref(), Some("$5,000"));
        assert_eq!(extract_prize("상품 및 기념품"), None);
    }

    #[test]
    fn prize_units_below_eok_need_won() {
        assert_eq!(extract_prize("참가자 5만 명"), None);
        assert_eq!(extract_prize("조회수 10만 돌파, 상금 300만원").as_deref(), Some("300만원"));
        assert_eq!(extract_prize("총상금 1억 5천만원").as_deref(), Some("1억5천만원"));
        assert_eq!(extract_prize("상금 2억5000만원").as_deref(), Some("2억5000만원"));
        assert_eq!(extract_prize("1등 500만원, 총 1억").as_deref(), Some("500만원"));
    }

    #[test]
    fn empty_title_is_rejected() {
        let raw = RawCandidate {
            title: " <span> </span> ".into(),
            link: "/a".into(),
            ..Default::default()
        };
        assert_eq!(
            normalize_candidate(&raw, &src(ListingType::Contest), t()),
            Err(ValidationError::EmptyTitle)
        );
    }

    #[test]
    fn missing_link_is_rejected() {
        let raw = RawCandidate {
            title: "Hackathon".into(),
            link: "".into(),
            ..Default::default()
        };
        assert_eq!(
            normalize_candidate(&raw, &src(ListingType::Contest), t()),
            Err(ValidationError::EmptyLink)
        );
    }

    #[test]
    fn contest_defaults_online_and_reads_prize_from_description() {
        let raw = RawCandidate {
            title: " AI 공모전 ".into(),
            link: "/detail/1".into(),
            date_text: Some("D-10".into()),
            description: Some("총상금 2,000만원".into()),
            ..Default::default()
        };
        let it = normalize_candidate(&raw, &src(ListingType::Contest), t()).unwrap();
        assert_eq!(it.title, "AI 공모전");
        assert_eq!(it.link, "https://contests.example.com/detail/1");
        assert_eq!(it.deadline, NaiveDate::from_ymd_opt(2026, 1, 20).unwrap());
        assert_eq!(it.location.as_deref(), Some(ONLINE_LOCATION));
        assert_eq!(it.prize.as_deref(), Some("2,000만원"));
        assert!(!it.is_approved && !it.is_active && !it.show_as_banner);
        assert_eq!(it.source, "test-source");
    }

    #[test]
    fn job_and_event_location_defaults() {
        let raw = RawCandidate {
            title: "Backend Engineer".into(),
            link: "https://jobs.example.com/1".into(),
            company: Some("Acme".into()),
            ..Default::default()
        };
        let job = normalize_candidate(&raw, &src(ListingType::Job), t()).unwrap();
        assert_eq!(job.location.as_deref(), Some(UNSPECIFIED_LOCATION));
        assert_eq!(job.company.as_deref(), Some("Acme"));

        let ev = normalize_candidate(&raw, &src(ListingType::Event), t()).unwrap();
        assert_eq!(ev.location, None);
    }
}
