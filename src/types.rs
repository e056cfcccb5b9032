// src/types.rs
//! Core data model for the filing pipeline.

use once_cell::sync::OnceCell;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// One entry from the EDGAR Atom feed, in feed order (newest first).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilingReference {
    pub title: String,
    /// Link to the filing index page.
    pub link: String,
    /// Raw `updated` timestamp as the feed carried it (RFC 3339).
    pub updated_raw: String,
    /// Same instant as unix seconds; 0 when unparseable.
    pub updated_at: u64,
    pub form_type: String,
}

impl FilingReference {
    /// Stable dedup key: the accession number from the index link when
    /// present, else a `link|updated` composite.
    pub fn dedup_key(&self) -> String {
        static RE_ACC: OnceCell<Regex> = OnceCell::new();
        let re = RE_ACC.get_or_init(|| Regex::new(r"/([\d-]+)-index\.htm").unwrap());
        if let Some(c) = re.captures(&self.link) {
            return c[1].to_string();
        }
        format!("{}|{}", self.link, self.updated_raw)
    }

    /// Issuer name guessed from the Atom title, used when no ownership
    /// document could be resolved. EDGAR titles look like
    /// `4 - ACME CORP (0001234) (Issuer)`.
    pub fn issuer_from_title(&self) -> String {
        self.title
            .split(" - ")
            .nth(1)
            .unwrap_or(&self.title)
            .split(" (")
            .next()
            .unwrap_or("")
            .trim()
            .to_string()
    }
}

/// Acquired/disposed flag on a transaction. Serialized as the raw schema
/// letter ("A"/"D", empty when absent) so the event log stays greppable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AcqDisp {
    Acquired,
    Disposed,
    Unknown,
}

impl AcqDisp {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => AcqDisp::Acquired,
            "D" => AcqDisp::Disposed,
            _ => AcqDisp::Unknown,
        }
    }
}

impl From<String> for AcqDisp {
    fn from(s: String) -> Self {
        AcqDisp::parse(&s)
    }
}

impl From<AcqDisp> for String {
    fn from(v: AcqDisp) -> Self {
        match v {
            AcqDisp::Acquired => "A".into(),
            AcqDisp::Disposed => "D".into(),
            AcqDisp::Unknown => "".into(),
        }
    }
}

/// One reported transaction, non-derivative or derivative.
///
/// All amounts are sanitized at construction: malformed or negative input
/// becomes 0.0, never NaN and never an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Form 4 transaction code, uppercased ("P", "S", "M", "F", ...).
    pub code: String,
    pub ad: AcqDisp,
    pub shares: f64,
    pub price: f64,
    pub total: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<chrono::NaiveDate>,
}

impl Transaction {
    pub fn new(
        code: &str,
        ad: AcqDisp,
        shares: f64,
        price: f64,
        total: f64,
        date: Option<chrono::NaiveDate>,
    ) -> Self {
        Self {
            code: code.trim().to_ascii_uppercase(),
            ad,
            shares: sane(shares),
            price: sane(price),
            total: sane(total),
            date,
        }
    }

    /// Open-market purchase, or anything flagged as acquired.
    pub fn is_buy(&self) -> bool {
        self.code == "P" || self.ad == AcqDisp::Acquired
    }

    /// Open-market sale, or anything flagged as disposed.
    pub fn is_sell(&self) -> bool {
        self.code == "S" || self.ad == AcqDisp::Disposed
    }

    /// Mandatory conversion/exercise of a derivative.
    pub fn is_conversion(&self) -> bool {
        self.code == "M"
    }

    /// Shares withheld to cover tax on vesting.
    pub fn is_tax_withholding(&self) -> bool {
        self.code == "F"
    }
}

/// Clamp to a non-negative finite amount.
fn sane(v: f64) -> f64 {
    if v.is_finite() && v > 0.0 {
        v
    } else {
        0.0
    }
}

/// Notional totals per transaction class for one filing.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TxnSummary {
    pub buy: f64,
    pub sell: f64,
    pub conversion: f64,
    pub withheld: f64,
}

impl TxnSummary {
    pub fn of(txs: &[Transaction]) -> Self {
        let mut s = TxnSummary::default();
        for t in txs {
            if t.is_buy() {
                s.buy += t.total;
            }
            if t.is_sell() {
                s.sell += t.total;
            }
            if t.is_conversion() {
                s.conversion += t.total;
            }
            if t.is_tax_withholding() {
                s.withheld += t.total;
            }
        }
        s
    }

    /// Sell notional net of administrative (conversion + tax) amounts.
    pub fn net_sell(&self) -> f64 {
        (self.sell - (self.conversion + self.withheld)).max(0.0)
    }

    pub fn has_notional(&self) -> bool {
        self.buy > 0.0 || self.sell > 0.0 || self.conversion > 0.0 || self.withheld > 0.0
    }
}

/// One fully-extracted filing. Immutable after creation; mirrored verbatim
/// into the JSONL event log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilingRecord {
    pub key: String,
    pub ticker: String,
    pub issuer: String,
    pub owner: String,
    /// Free-text officer title, e.g. "Chief Financial Officer". May be empty.
    pub role: String,
    #[serde(default)]
    pub is_officer: bool,
    #[serde(default)]
    pub is_director: bool,
    #[serde(rename = "txs", default)]
    pub transactions: Vec<Transaction>,
    /// Feed `updated` timestamp, raw.
    #[serde(rename = "when", default)]
    pub observed_at: String,
    #[serde(rename = "xml_url", default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
}

impl FilingRecord {
    pub fn summary(&self) -> TxnSummary {
        TxnSummary::of(&self.transactions)
    }
}

/// One rendered, scored output line. Recomputed every run; never persisted
/// with its score.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedHeadline {
    pub line: String,
    pub priority_score: f64,
}
