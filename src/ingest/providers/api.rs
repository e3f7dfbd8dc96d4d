// src/ingest/providers/api.rs
//! Structured-fetch adapter: a JSON listing endpoint or an RSS 2.0 feed.

use anyhow::{Context, Result};
use async_trait::async_trait;
use quick_xml::de::from_str;
use serde::Deserialize;
use serde_json::Value;

use super::{record_parse, Fetch};
use crate::ingest::types::{RawCandidate, SourceDescriptor, SourceProvider};

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ApiFormat {
    #[default]
    Json,
    Rss,
}

/// Which JSON keys carry which candidate fields.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FieldMap {
    pub title: String,
    pub link: String,
    pub date: String,
    pub description: String,
    pub company: String,
    pub location: String,
    pub prize: String,
}

impl Default for FieldMap {
    fn default() -> Self {
        Self {
            title: "title".into(),
            link: "link".into(),
            date: "deadline".into(),
            description: "description".into(),
            company: "company".into(),
            location: "location".into(),
            prize: "prize".into(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiSpec {
    #[serde(default)]
    pub format: ApiFormat,
    /// Dotted path to the item array inside a JSON object (`data.items`);
    /// absent means the document itself is the array.
    #[serde(default)]
    pub items_key: Option<String>,
    #[serde(default)]
    pub fields: FieldMap,
}

pub struct ApiAdapter {
    desc: SourceDescriptor,
    spec: ApiSpec,
    fetch: Fetch,
    max_items: usize,
}

impl ApiAdapter {
    pub fn new(desc: SourceDescriptor, spec: ApiSpec, fetch: Fetch, max_items: usize) -> Self {
        Self {
            desc,
            spec,
            fetch,
            max_items,
        }
    }

    pub fn parse_body(&self, body: &str) -> Result<Vec<RawCandidate>> {
        match self.spec.format {
            ApiFormat::Json => self.parse_json(body),
            ApiFormat::Rss => self.parse_rss(body),
        }
    }

    fn parse_json(&self, body: &str) -> Result<Vec<RawCandidate>> {
        let t0 = std::time::Instant::now();
        let doc: Value = serde_json::from_str(body)
            .with_context(|| format!("{}: response is not JSON", self.desc.name))?;

        let mut node = &doc;
        if let Some(path) = self.spec.items_key.as_deref() {
            for key in path.split('.').filter(|k| !k.is_empty()) {
                node = node
                    .get(key)
                    .with_context(|| format!("{}: missing key {key:?}", self.desc.name))?;
            }
        }
        let items = node
            .as_array()
            .with_context(|| format!("{}: item list is not an array", self.desc.name))?;

        let f = &self.spec.fields;
        let mut out = Vec::new();
        let mut skipped = 0usize;
        for it in items {
            if out.len() >= self.max_items {
                break;
            }
            let (Some(title), Some(link)) = (field(it, &f.title), field(it, &f.link)) else {
                skipped += 1;
                tracing::debug!(
                    target: "ingest",
                    provider = %self.desc.name,
                    "skipping malformed item"
                );
                continue;
            };
            out.push(RawCandidate {
                title,
                link,
                date_text: field(it, &f.date),
                description: field(it, &f.description),
                company: field(it, &f.company),
                location: field(it, &f.location),
                prize_text: field(it, &f.prize),
            });
        }

        record_parse(t0, out.len(), skipped);
        Ok(out)
    }

    fn parse_rss(&self, body: &str) -> Result<Vec<RawCandidate>> {
        let t0 = std::time::Instant::now();
        let xml_clean = scrub_html_entities_for_xml(body);
        let rss: Rss = from_str(&xml_clean)
            .with_context(|| format!("{}: parsing rss xml", self.desc.name))?;

        let mut out = Vec::new();
        let mut skipped = 0usize;
        for it in rss.channel.item {
            if out.len() >= self.max_items {
                break;
            }
            let title = it.title.unwrap_or_default();
            let link = it.link.unwrap_or_default();
            if title.trim().is_empty() || link.trim().is_empty() {
                skipped += 1;
                continue;
            }
            out.push(RawCandidate {
                title,
                link,
                // feeds carry no deadline field; let the strategies scan the body
                date_text: it.description.clone(),
                description: it.description,
                company: it.author,
                location: None,
                prize_text: None,
            });
        }

        record_parse(t0, out.len(), skipped);
        Ok(out)
    }
}

/// String-ish JSON field; numbers are stringified, blanks are absent.
fn field(item: &Value, key: &str) -> Option<String> {
    match item.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    description: Option<String>,
    author: Option<String>,
}

fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}

#[async_trait]
impl SourceProvider for ApiAdapter {
    async fn fetch_latest(&self) -> Result<Vec<RawCandidate>> {
        let body = self.fetch.body(&self.desc.name).await?;
        self.parse_body(&body)
    }

    fn descriptor(&self) -> &SourceDescriptor {
        &self.desc
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listing::ListingType;

    fn adapter(spec: ApiSpec, max: usize) -> ApiAdapter {
        let desc = SourceDescriptor {
            name: "events-api".into(),
            base_url: "https://events.example.com/".into(),
            listing_type: ListingType::Event,
        };
        ApiAdapter::new(desc, spec, Fetch::fixture(""), max)
    }

    #[test]
    fn nested_items_key_and_custom_fields() {
        let body = r#"{"data":{"items":[
            {"name":"Meetup","url":"/e/1","ends":"2026-04-01","venue":"Seoul"},
            {"name":"","url":"/e/2"},
            {"url":"/e/3"},
            {"name":"Conf","url":"/e/4","ends":20260501}
        ]}}"#;
        let spec = ApiSpec {
            format: ApiFormat::Json,
            items_key: Some("data.items".into()),
            fields: FieldMap {
                title: "name".into(),
                link: "url".into(),
                date: "ends".into(),
                location: "venue".into(),
                ..FieldMap::default()
            },
        };
        let out = adapter(spec, 10).parse_body(body).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].title, "Meetup");
        assert_eq!(out[0].location.as_deref(), Some("Seoul"));
        assert_eq!(out[1].date_text.as_deref(), Some("20260501"));
    }

    #[test]
    fn non_array_payload_is_an_error() {
        let spec = ApiSpec::default();
        assert!(adapter(spec.clone(), 10).parse_body(r#"{"x":1}"#).is_err());
        assert!(adapter(spec, 10).parse_body("<html>").is_err());
    }

    #[test]
    fn cap_applies() {
        let items: Vec<String> = (0..25)
            .map(|i| format!(r#"{{"title":"t{i}","link":"/l/{i}"}}"#))
            .collect();
        let body = format!("[{}]", items.join(","));
        let out = adapter(ApiSpec::default(), 10).parse_body(&body).unwrap();
        assert_eq!(out.len(), 10);
        assert_eq!(out[9].title, "t9");
    }
}
