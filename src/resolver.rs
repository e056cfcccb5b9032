// src/resolver.rs
//! Locate the best ownership XML behind a filing's index page.
//!
//! Index pages are not a fixed schema across eras; the only guarantee is
//! zero or more anchors to XML documents. We score every candidate by path
//! markers, fetch in descending score order, and accept the first one that
//! parses and looks like an ownership document.

use metrics::counter;
use once_cell::sync::OnceCell;
use regex::Regex;

use crate::fetch::PageFetcher;
use crate::xml::{self, XmlNode};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub url: String,
    pub score: i32,
}

/// Outcome of resolution for one filing.
pub enum Resolution {
    /// A candidate parsed and passed the sanity check.
    Document { url: String, tree: XmlNode },
    /// No usable document; the filing is still loggable as a bare event.
    Unresolved,
}

/// Enumerate `.xml` anchors on an index page, scored by path markers.
/// Relative hrefs are resolved against the index page URL.
pub fn xml_candidates(index_html: &str, index_url: &str) -> Vec<Candidate> {
    static RE_HREF: OnceCell<Regex> = OnceCell::new();
    let re = RE_HREF.get_or_init(|| Regex::new(r#"href="([^"]+\.(?:xml|XML))""#).unwrap());

    let base = reqwest::Url::parse(index_url).ok();
    let mut out = Vec::new();
    for cap in re.captures_iter(index_html) {
        let href = html_escape::decode_html_entities(&cap[1]).to_string();
        let url = if href.starts_with("http") {
            href
        } else if let Some(resolved) = base.as_ref().and_then(|b| b.join(&href).ok()) {
            resolved.to_string()
        } else {
            continue;
        };
        let name = url.to_ascii_lowercase();
        let mut score = 0;
        if name.contains("form4") {
            score += 5;
        }
        if name.contains("ownership") {
            score += 4;
        }
        if name.contains("primary") {
            score += 3;
        }
        if name.contains("xml") {
            score += 1;
        }
        out.push(Candidate { url, score });
    }
    // Stable sort keeps page order among equally-scored candidates.
    out.sort_by(|a, b| b.score.cmp(&a.score));
    out
}

/// An ownership document must carry the root marker or at least the
/// mandatory ticker field.
pub fn looks_like_ownership_doc(tree: &XmlNode) -> bool {
    tree.find("ownershipDocument").is_some() || tree.find("issuerTradingSymbol").is_some()
}

pub async fn resolve_document(fetcher: &dyn PageFetcher, index_url: &str) -> Resolution {
    let page = match fetcher.fetch_text(index_url).await {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!(error = ?e, url = index_url, "index page unreachable");
            counter!("resolver_unresolved_total").increment(1);
            return Resolution::Unresolved;
        }
    };

    for cand in xml_candidates(&page, index_url) {
        let body = match fetcher.fetch_text(&cand.url).await {
            Ok(b) if !b.trim().is_empty() => b,
            Ok(_) => continue,
            Err(e) => {
                tracing::debug!(error = ?e, url = %cand.url, "candidate fetch failed");
                continue;
            }
        };
        match xml::parse(&body) {
            Ok(tree) if looks_like_ownership_doc(&tree) => {
                return Resolution::Document {
                    url: cand.url,
                    tree,
                };
            }
            Ok(_) => {
                tracing::debug!(url = %cand.url, "candidate failed sanity check");
            }
            Err(e) => {
                tracing::debug!(error = ?e, url = %cand.url, "candidate unparseable");
            }
        }
    }

    counter!("resolver_unresolved_total").increment(1);
    Resolution::Unresolved
}
