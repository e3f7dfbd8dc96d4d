// src/ingest/providers/markup.rs
//! Markup-scraping adapter: CSS selectors over a listing page.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;

use super::{record_parse, Fetch};
use crate::ingest::types::{RawCandidate, SourceDescriptor, SourceProvider};

/// Selector strings as written in the source catalogue. Field selectors are relative
/// to each matched item element.
#[derive(Debug, Clone, Deserialize)]
pub struct MarkupSpec {
    pub item: String,
    /// Defaults to the item element's own text.
    #[serde(default)]
    pub title: Option<String>,
    /// Defaults to the item element itself (e.g. when items are `<a>` tags).
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default = "default_link_attr")]
    pub link_attr: String,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub prize: Option<String>,
}

fn default_link_attr() -> String {
    "href".to_string()
}

fn compile(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| anyhow!("invalid selector {s:?}: {e:?}"))
}

fn compile_opt(s: &Option<String>) -> Result<Option<Selector>> {
    s.as_deref().map(compile).transpose()
}

impl MarkupSpec {
    /// Compile every selector once and discard the result.
    pub fn validate(&self) -> Result<()> {
        compile(&self.item)?;
        for field in [
            &self.title,
            &self.link,
            &self.date,
            &self.description,
            &self.company,
            &self.location,
            &self.prize,
        ] {
            compile_opt(field)?;
        }
        Ok(())
    }
}

pub struct MarkupAdapter {
    desc: SourceDescriptor,
    fetch: Fetch,
    max_items: usize,
    item: Selector,
    title: Option<Selector>,
    link: Option<Selector>,
    link_attr: String,
    date: Option<Selector>,
    description: Option<Selector>,
    company: Option<Selector>,
    location: Option<Selector>,
    prize: Option<Selector>,
}

impl MarkupAdapter {
    pub fn new(
        desc: SourceDescriptor,
        spec: &MarkupSpec,
        fetch: Fetch,
        max_items: usize,
    ) -> Result<Self> {
        Ok(Self {
            desc,
            fetch,
            max_items,
            item: compile(&spec.item)?,
            title: compile_opt(&spec.title)?,
            link: compile_opt(&spec.link)?,
            link_attr: spec.link_attr.clone(),
            date: compile_opt(&spec.date)?,
            description: compile_opt(&spec.description)?,
            company: compile_opt(&spec.company)?,
            location: compile_opt(&spec.location)?,
            prize: compile_opt(&spec.prize)?,
        })
    }

    /// Parse a listing page. Items missing a title or link are skipped; at most
    /// `max_items` candidates are returned.
    pub fn parse_page(&self, html: &str) -> Vec<RawCandidate> {
        let t0 = std::time::Instant::now();
        let doc = Html::parse_document(html);

        let mut out = Vec::new();
        let mut skipped = 0usize;
        for el in doc.select(&self.item) {
            if out.len() >= self.max_items {
                break;
            }
            match self.extract(el) {
                Some(c) => out.push(c),
                None => {
                    skipped += 1;
                    tracing::debug!(
                        target: "ingest",
                        provider = %self.desc.name,
                        "skipping malformed item"
                    );
                }
            }
        }

        record_parse(t0, out.len(), skipped);
        out
    }

    fn extract(&self, el: ElementRef<'_>) -> Option<RawCandidate> {
        let title = match &self.title {
            Some(sel) => text_in(el, sel)?,
            None => own_text(el)?,
        };
        let link_el = match &self.link {
            Some(sel) => el.select(sel).next()?,
            None => el,
        };
        let link = link_el.value().attr(&self.link_attr)?.trim().to_string();
        if link.is_empty() {
            return None;
        }

        Some(RawCandidate {
            title,
            link,
            date_text: self.date.as_ref().and_then(|s| text_in(el, s)),
            description: self.description.as_ref().and_then(|s| text_in(el, s)),
            company: self.company.as_ref().and_then(|s| text_in(el, s)),
            location: self.location.as_ref().and_then(|s| text_in(el, s)),
            prize_text: self.prize.as_ref().and_then(|s| text_in(el, s)),
        })
    }
}

fn own_text(el: ElementRef<'_>) -> Option<String> {
    let t = el.text().collect::<Vec<_>>().join(" ");
    let t = t.trim();
    (!t.is_empty()).then(|| t.to_string())
}

fn text_in(el: ElementRef<'_>, sel: &Selector) -> Option<String> {
    el.select(sel).next().and_then(own_text)
}

#[async_trait]
impl SourceProvider for MarkupAdapter {
    async fn fetch_latest(&self) -> Result<Vec<RawCandidate>> {
        let body = self.fetch.body(&self.desc.name).await?;
        Ok(self.parse_page(&body))
    }

    fn descriptor(&self) -> &SourceDescriptor {
        &self.desc
    }
}
