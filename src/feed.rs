// src/feed.rs
//! EDGAR "current events" Atom feed -> `FilingReference` list.

use anyhow::{Context, Result};
use metrics::{counter, histogram};
use once_cell::sync::OnceCell;
use quick_xml::de::from_str;
use regex::Regex;
use serde::Deserialize;
use time::{format_description::well_known::Rfc3339, OffsetDateTime, UtcOffset};

use crate::fetch::PageFetcher;
use crate::types::FilingReference;

#[derive(Debug, Deserialize)]
struct AtomFeed {
    #[serde(rename = "entry", default)]
    entries: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    title: Option<String>,
    #[serde(rename = "link", default)]
    links: Vec<AtomLink>,
    updated: Option<String>,
    #[serde(rename = "category", default)]
    categories: Vec<AtomCategory>,
}

#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href")]
    href: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomCategory {
    #[serde(rename = "@term")]
    term: Option<String>,
}

fn parse_rfc3339_to_unix(ts: &str) -> u64 {
    OffsetDateTime::parse(ts, &Rfc3339)
        .ok()
        .map(|dt| dt.to_offset(UtcOffset::UTC).unix_timestamp())
        .and_then(|x| u64::try_from(x).ok())
        .unwrap_or(0)
}

/// Decode entities, strip markup, collapse whitespace.
fn clean_title(s: &str) -> String {
    let mut out = html_escape::decode_html_entities(s).to_string();
    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();
    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").unwrap());
    re_ws.replace_all(&out, " ").trim().to_string()
}

/// Parse a feed body into at most `max` references, feed order preserved
/// (the feed serves newest first). Entries without a link are dropped.
pub fn parse_feed(xml: &str, max: usize) -> Result<Vec<FilingReference>> {
    let t0 = std::time::Instant::now();
    let feed: AtomFeed = from_str(xml).context("parsing atom feed xml")?;

    let mut out = Vec::with_capacity(feed.entries.len().min(max));
    for e in feed.entries {
        if out.len() >= max {
            break;
        }
        let link = e
            .links
            .iter()
            .find_map(|l| l.href.clone())
            .unwrap_or_default();
        if link.is_empty() {
            continue;
        }
        let title = clean_title(e.title.as_deref().unwrap_or_default());
        let updated_raw = e.updated.unwrap_or_default();
        let form_type = e
            .categories
            .iter()
            .find_map(|c| c.term.clone())
            .unwrap_or_else(|| title.split(" - ").next().unwrap_or_default().to_string());

        out.push(FilingReference {
            title,
            link,
            updated_at: parse_rfc3339_to_unix(&updated_raw),
            updated_raw,
            form_type,
        });
    }

    let ms = t0.elapsed().as_secs_f64() * 1_000.0;
    histogram!("feed_parse_ms").record(ms);
    counter!("feed_entries_total").increment(out.len() as u64);
    Ok(out)
}

/// Fetch and parse the feed. Any failure degrades to an empty list with a
/// warning; an unreachable feed is a valid "nothing new" outcome, not an
/// error the pipeline should surface.
pub async fn fetch_filings(
    fetcher: &dyn PageFetcher,
    feed_url: &str,
    max: usize,
) -> Vec<FilingReference> {
    let body = match fetcher.fetch_text(feed_url).await {
        Ok(b) => b,
        Err(e) => {
            tracing::warn!(error = ?e, url = feed_url, "feed unreachable; treating as empty");
            counter!("feed_fetch_errors_total").increment(1);
            return Vec::new();
        }
    };
    match parse_feed(&body, max) {
        Ok(refs) => refs,
        Err(e) => {
            tracing::warn!(error = ?e, url = feed_url, "feed unparseable; treating as empty");
            counter!("feed_fetch_errors_total").increment(1);
            Vec::new()
        }
    }
}
