// src/fetch.rs
//! Page retrieval seam: one trait, an HTTP implementation with bounded
//! exponential backoff, and an in-memory fixture implementation for tests.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use metrics::counter;

#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch a URL as text. Implementations retry transient failures
    /// internally; an `Err` means the URL is not retrievable this run.
    async fn fetch_text(&self, url: &str) -> Result<String>;
}

/// Sequential HTTP fetcher. EDGAR rate limits aggressively, so there is no
/// parallelism here on purpose; backoff blocks the whole pipeline.
pub struct HttpFetcher {
    client: reqwest::Client,
    user_agent: String,
    retries: u32,
    backoff_base: Duration,
}

impl HttpFetcher {
    pub fn new(user_agent: &str, timeout_secs: u64, retries: u32) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("building http client")?;
        Ok(Self {
            client,
            user_agent: user_agent.to_string(),
            retries,
            backoff_base: Duration::from_secs(1),
        })
    }

    async fn get_once(&self, url: &str) -> Result<String> {
        let resp = self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .send()
            .await
            .with_context(|| format!("GET {url}"))?;
        let resp = resp
            .error_for_status()
            .with_context(|| format!("GET {url}"))?;
        resp.text().await.with_context(|| format!("body of {url}"))
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String> {
        let mut last_err = None;
        for attempt in 0..=self.retries {
            match self.get_once(url).await {
                Ok(body) => return Ok(body),
                Err(e) => {
                    counter!("fetch_errors_total").increment(1);
                    tracing::debug!(error = ?e, url, attempt, "fetch attempt failed");
                    last_err = Some(e);
                    if attempt < self.retries {
                        tokio::time::sleep(self.backoff_base * 2u32.pow(attempt)).await;
                    }
                }
            }
        }
        Err(last_err.unwrap_or_else(|| anyhow!("fetch failed: {url}")))
    }
}

// --- Test helper ---
/// Serves canned pages from memory. Unknown URLs are an error, which is how
/// tests exercise the unresolved/skip paths.
#[derive(Default)]
pub struct FixtureFetcher {
    pages: HashMap<String, String>,
}

impl FixtureFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: &str, body: &str) -> Self {
        self.pages.insert(url.to_string(), body.to_string());
        self
    }
}

#[async_trait]
impl PageFetcher for FixtureFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String> {
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| anyhow!("no fixture for {url}"))
    }
}
