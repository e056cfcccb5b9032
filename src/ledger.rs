// src/ledger.rs
//! Append-only ledger of filing keys already processed.
//!
//! Single writer, read fully at startup, appended once at the end of a run.
//! Lines are newline-delimited JSON `{"key": ..., "ts": ...}`; unreadable
//! lines are skipped, never fatal.

use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
struct SeenLine {
    key: String,
    ts: String,
}

#[derive(Debug)]
pub struct SeenLedger {
    path: PathBuf,
    seen: HashSet<String>,
    pending: Vec<SeenLine>,
}

impl SeenLedger {
    /// Load the ledger, creating parent directories as needed. When
    /// `retention_days` is set, entries older than the cutoff are dropped
    /// and the file compacted in place; by default nothing is ever pruned.
    pub fn load(path: &Path, retention_days: Option<u32>) -> Result<Self> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating ledger dir {}", dir.display()))?;
        }

        let mut seen = HashSet::new();
        let mut kept_lines: Vec<SeenLine> = Vec::new();
        let mut skipped = 0usize;
        let mut expired = 0usize;
        let cutoff = retention_days.map(|d| Utc::now() - Duration::days(i64::from(d)));

        if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("reading ledger {}", path.display()))?;
            for line in content.lines() {
                if line.trim().is_empty() {
                    continue;
                }
                let parsed: SeenLine = match serde_json::from_str(line) {
                    Ok(p) => p,
                    Err(_) => {
                        skipped += 1;
                        continue;
                    }
                };
                if parsed.key.is_empty() {
                    skipped += 1;
                    continue;
                }
                if let Some(cut) = cutoff {
                    // Unparseable timestamps are kept; dropping them would
                    // re-emit old filings.
                    if let Ok(ts) = DateTime::parse_from_rfc3339(&parsed.ts) {
                        if ts.with_timezone(&Utc) < cut {
                            expired += 1;
                            continue;
                        }
                    }
                }
                seen.insert(parsed.key.clone());
                kept_lines.push(parsed);
            }
        }

        if skipped > 0 {
            tracing::warn!(path = %path.display(), skipped, "ledger lines skipped as unreadable");
        }
        if expired > 0 {
            tracing::info!(path = %path.display(), expired, "ledger entries expired; compacting");
            let mut out = String::new();
            for l in &kept_lines {
                out.push_str(&serde_json::to_string(l).context("serializing ledger line")?);
                out.push('\n');
            }
            fs::write(path, out)
                .with_context(|| format!("compacting ledger {}", path.display()))?;
        }

        Ok(Self {
            path: path.to_path_buf(),
            seen,
            pending: Vec::new(),
        })
    }

    pub fn has_seen(&self, key: &str) -> bool {
        self.seen.contains(key)
    }

    /// Record a key as processed. Buffered in memory until `flush`; only a
    /// completed extraction pass should persist.
    pub fn mark_seen(&mut self, key: &str) {
        if self.seen.insert(key.to_string()) {
            self.pending.push(SeenLine {
                key: key.to_string(),
                ts: Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            });
        }
    }

    /// Append all pending keys to the file.
    pub fn flush(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("opening ledger {}", self.path.display()))?;
        for l in self.pending.drain(..) {
            let line = serde_json::to_string(&l).context("serializing ledger line")?;
            writeln!(f, "{line}").context("appending ledger line")?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
