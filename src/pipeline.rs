// src/pipeline.rs
//! One sequential pipeline run: feed -> resolver -> extractor -> ledger ->
//! scorer -> persisted artifacts.
//!
//! Per-filing failures degrade (bare record or skip) and never abort the
//! batch; only setup errors (unwritable state/report paths) bubble up.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge};
use once_cell::sync::OnceCell;

use crate::config::Config;
use crate::extract;
use crate::feed;
use crate::fetch::PageFetcher;
use crate::headline;
use crate::ledger::SeenLedger;
use crate::rank;
use crate::resolver::{self, Resolution};
use crate::types::{FilingRecord, FilingReference};

/// One-time metrics registration (so series show up wherever the host
/// exports them).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("feed_entries_total", "Entries parsed from the filing feed.");
        describe_counter!("feed_fetch_errors_total", "Feed fetch/parse failures.");
        describe_counter!("fetch_errors_total", "Individual HTTP attempt failures.");
        describe_counter!("filings_new_total", "Filings not previously in the ledger.");
        describe_counter!("filings_seen_total", "Filings skipped via the ledger.");
        describe_counter!("resolver_unresolved_total", "Filings with no usable ownership XML.");
        describe_counter!("extract_transactions_total", "Transactions extracted across filings.");
        describe_histogram!("feed_parse_ms", "Feed parse time in milliseconds.");
        describe_gauge!("pipeline_last_run_ts", "Unix ts when the pipeline last ran.");
    });
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub fetched: usize,
    pub skipped_seen: usize,
    pub new_records: usize,
    pub unresolved: usize,
    pub ranked_lines: usize,
}

/// Bare "filed" record for filings whose ownership XML never resolved.
fn bare_record(r: &FilingReference, key: &str) -> FilingRecord {
    FilingRecord {
        key: key.to_string(),
        ticker: String::new(),
        issuer: r.issuer_from_title(),
        owner: "Insider".to_string(),
        role: String::new(),
        is_officer: false,
        is_director: false,
        transactions: Vec::new(),
        observed_at: r.updated_raw.clone(),
        source_url: None,
    }
}

fn write_lines(path: &Path, lines: &[String]) -> Result<()> {
    let mut out = lines.join("\n");
    if !out.is_empty() {
        out.push('\n');
    }
    fs::write(path, out).with_context(|| format!("writing {}", path.display()))
}

fn write_events(path: &Path, records: &[FilingRecord]) -> Result<()> {
    let mut out = String::new();
    for r in records {
        out.push_str(&serde_json::to_string(r).context("serializing filing record")?);
        out.push('\n');
    }
    fs::write(path, out).with_context(|| format!("writing {}", path.display()))
}

/// Load the full event log, skipping unreadable lines.
pub fn load_events(path: &Path) -> Vec<FilingRecord> {
    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(_) => return Vec::new(),
    };
    let mut out = Vec::new();
    let mut skipped = 0usize;
    for line in content.lines() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<FilingRecord>(line) {
            Ok(r) => out.push(r),
            Err(_) => skipped += 1,
        }
    }
    if skipped > 0 {
        tracing::warn!(path = %path.display(), skipped, "event lines skipped as unreadable");
    }
    out
}

pub async fn run_once(cfg: &Config, fetcher: &dyn PageFetcher) -> Result<RunSummary> {
    ensure_metrics_described();

    let reports = cfg.reports_dir();
    fs::create_dir_all(&reports)
        .with_context(|| format!("creating reports dir {}", reports.display()))?;
    let mut ledger = SeenLedger::load(&cfg.ledger_path(), cfg.ledger_retention_days)?;

    let refs = feed::fetch_filings(fetcher, &cfg.feed_url, cfg.max_entries).await;
    let mut summary = RunSummary {
        fetched: refs.len(),
        ..RunSummary::default()
    };

    let mut records: Vec<FilingRecord> = Vec::new();
    let mut lines: Vec<String> = Vec::new();

    // One filing fully resolved and parsed before the next; EDGAR's rate
    // limits rule out fanning these out.
    for r in &refs {
        let key = r.dedup_key();
        if ledger.has_seen(&key) {
            tracing::debug!(key = %key, link = %r.link, "already processed; skipping");
            counter!("filings_seen_total").increment(1);
            summary.skipped_seen += 1;
            continue;
        }

        let record = match resolver::resolve_document(fetcher, &r.link).await {
            Resolution::Document { url, tree } => {
                let ext = extract::extract_filing(&tree);
                tracing::info!(
                    key = %key,
                    ticker = %ext.ticker,
                    owner = %ext.owner,
                    transactions = ext.transactions.len(),
                    "extracted filing"
                );
                FilingRecord {
                    key: key.clone(),
                    ticker: ext.ticker,
                    issuer: ext.issuer,
                    owner: ext.owner,
                    role: ext.role,
                    is_officer: ext.is_officer,
                    is_director: ext.is_director,
                    transactions: ext.transactions,
                    observed_at: r.updated_raw.clone(),
                    source_url: Some(url),
                }
            }
            Resolution::Unresolved => {
                tracing::warn!(key = %key, link = %r.link, "no usable ownership document; recording bare filing");
                summary.unresolved += 1;
                bare_record(r, &key)
            }
        };

        lines.push(headline::filing_line(&record));
        records.push(record);
        ledger.mark_seen(&key);
        summary.new_records += 1;
    }
    counter!("filings_new_total").increment(summary.new_records as u64);

    let headlines_path = cfg.headlines_path();
    let events_path = cfg.events_path();
    let ranked_path = cfg.ranked_path();

    if records.is_empty() {
        // Nothing new: keep the previous run's artifacts intact and pass the
        // raw headlines through unranked. Outputs must still exist.
        for p in [&headlines_path, &events_path] {
            if !p.exists() {
                fs::write(p, "").with_context(|| format!("writing {}", p.display()))?;
            }
        }
        let raw = fs::read_to_string(&headlines_path).unwrap_or_default();
        summary.ranked_lines = raw.lines().count();
        fs::write(&ranked_path, raw)
            .with_context(|| format!("writing {}", ranked_path.display()))?;
        tracing::info!("no new filings; passed raw headlines through unranked");
    } else {
        write_lines(&headlines_path, &lines)?;
        write_events(&events_path, &records)?;

        // Rank from the persisted log: identical input to what a standalone
        // re-rank over the artifacts would see.
        let events = load_events(&events_path);
        let ranked = rank::rank_records(&events, &cfg.score);
        summary.ranked_lines = ranked.len();
        let ranked_lines: Vec<String> = ranked.into_iter().map(|h| h.line).collect();
        write_lines(&ranked_path, &ranked_lines)?;
    }

    ledger.flush()?;
    gauge!("pipeline_last_run_ts").set(chrono::Utc::now().timestamp().max(0) as f64);

    tracing::info!(
        fetched = summary.fetched,
        new = summary.new_records,
        seen = summary.skipped_seen,
        unresolved = summary.unresolved,
        ranked = summary.ranked_lines,
        ledger = ledger.len(),
        "pipeline run complete"
    );
    Ok(summary)
}
