// src/config.rs
//! Environment-driven pipeline configuration with documented defaults.
//! Everything here can be absent; the pipeline then runs with the values
//! below. Only path creation failures downstream are fatal.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};

use crate::rank::ScoreConfig;

pub const DEFAULT_FEED_URL: &str =
    "https://www.sec.gov/cgi-bin/browse-edgar?action=getcurrent&type=4&count=200&output=atom";
pub const DEFAULT_USER_AGENT: &str = "insider-monitor/0.1 (contact: ops@example.com)";

const ENV_DENYLIST_PATH: &str = "INSIDER_DENYLIST_PATH";

#[derive(Debug, Clone)]
pub struct Config {
    pub feed_url: String,
    pub user_agent: String,
    /// Most recent feed entries considered per run.
    pub max_entries: usize,
    pub http_timeout_secs: u64,
    pub http_retries: u32,
    pub data_dir: PathBuf,
    /// Drop ledger entries older than this many days at load. `None` (the
    /// default) keeps the ledger append-only forever, like the feed itself.
    pub ledger_retention_days: Option<u32>,
    pub score: ScoreConfig,
}

fn env_str(name: &str, default: &str) -> String {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty()).unwrap_or_else(|| default.to_string())
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            feed_url: DEFAULT_FEED_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_entries: 160,
            http_timeout_secs: 20,
            http_retries: 2,
            data_dir: PathBuf::from("data"),
            ledger_retention_days: None,
            score: ScoreConfig::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let d = Self::default();
        let mut score = ScoreConfig::from_env();
        match load_denylist_default() {
            Ok(Some(terms)) => score.denylist = terms,
            Ok(None) => {}
            Err(e) => tracing::warn!(error = ?e, "denylist file unusable; keeping defaults"),
        }
        Self {
            feed_url: env_str("INSIDER_FEED_URL", &d.feed_url),
            user_agent: env_str("SEC_USER_AGENT", &d.user_agent),
            max_entries: env_parse("INSIDER_MAX_ENTRIES", d.max_entries),
            http_timeout_secs: env_parse("INSIDER_HTTP_TIMEOUT_SECS", d.http_timeout_secs),
            http_retries: env_parse("INSIDER_HTTP_RETRIES", d.http_retries),
            data_dir: PathBuf::from(env_str("INSIDER_DATA_DIR", "data")),
            ledger_retention_days: std::env::var("LEDGER_RETENTION_DAYS")
                .ok()
                .and_then(|v| v.trim().parse().ok()),
            score,
        }
    }

    pub fn reports_dir(&self) -> PathBuf {
        self.data_dir.join("reports")
    }

    pub fn headlines_path(&self) -> PathBuf {
        self.reports_dir().join("sec_headlines.txt")
    }

    pub fn events_path(&self) -> PathBuf {
        self.reports_dir().join("sec_events.jsonl")
    }

    pub fn ranked_path(&self) -> PathBuf {
        self.reports_dir().join("sec_headlines_ranked.txt")
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.data_dir.join("state").join("sec_seen.jsonl")
    }
}

/// Load denylist terms from an explicit path. Supports TOML
/// (`terms = [...]`) or a bare JSON array.
pub fn load_denylist_from(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading denylist from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_denylist(&content, ext.as_str())
}

/// Denylist resolution order:
/// 1) $INSIDER_DENYLIST_PATH
/// 2) config/denylist.toml
/// 3) config/denylist.json
/// `Ok(None)` means no file configured; callers keep their defaults.
pub fn load_denylist_default() -> Result<Option<Vec<String>>> {
    if let Ok(p) = std::env::var(ENV_DENYLIST_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_denylist_from(&pb).map(Some);
        }
        return Err(anyhow!("{ENV_DENYLIST_PATH} points to non-existent path"));
    }
    let toml_p = PathBuf::from("config/denylist.toml");
    if toml_p.exists() {
        return load_denylist_from(&toml_p).map(Some);
    }
    let json_p = PathBuf::from("config/denylist.json");
    if json_p.exists() {
        return load_denylist_from(&json_p).map(Some);
    }
    Ok(None)
}

fn parse_denylist(s: &str, hint_ext: &str) -> Result<Vec<String>> {
    let try_toml = hint_ext == "toml" || s.contains("terms");
    if try_toml {
        if let Ok(v) = parse_toml(s) {
            return Ok(v);
        }
    }
    if let Ok(v) = parse_json(s) {
        return Ok(v);
    }
    if !try_toml {
        if let Ok(v) = parse_toml(s) {
            return Ok(v);
        }
    }
    Err(anyhow!("unsupported denylist format"))
}

fn parse_toml(s: &str) -> Result<Vec<String>> {
    #[derive(serde::Deserialize)]
    struct TomlDeny {
        terms: Vec<String>,
    }
    let v: TomlDeny = toml::from_str(s)?;
    Ok(clean_list(v.terms))
}

fn parse_json(s: &str) -> Result<Vec<String>> {
    let v: Vec<String> = serde_json::from_str(s)?;
    Ok(clean_list(v))
}

fn clean_list(items: Vec<String>) -> Vec<String> {
    use std::collections::BTreeSet;
    let mut set = BTreeSet::new();
    for it in items {
        let t = it.trim().to_ascii_lowercase();
        if !t.is_empty() {
            set.insert(t);
        }
    }
    set.into_iter().collect()
}
