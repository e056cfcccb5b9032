// src/rank.rs
//! Salience scoring and ranking of extracted filings.
//!
//! Ranking is recomputed from the full record set every run; nothing here
//! is incremental. Thresholds live in `ScoreConfig` so they can be tuned
//! from the environment without touching the formula.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use crate::headline;
use crate::types::{FilingRecord, RankedHeadline, TxnSummary};

/// Score assigned to filings with no notional at all ("Form 4 filed").
/// They only render when nothing better exists.
pub const NO_NOTIONAL_SCORE: f64 = -10.0;

/// All scorer tunables, env-overridable, defaulted to the values the
/// pipeline has been run with historically.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreConfig {
    pub top_buy: f64,
    pub officer_buy: f64,
    pub other_buy: f64,
    pub top_sell: f64,
    pub officer_sell: f64,
    pub other_sell: f64,
    /// Small-trade floors: records below both are dropped from the ranked
    /// list (unless the fallback kicks in).
    pub min_buy: f64,
    pub min_sell: f64,
    pub top_n: usize,
    pub max_lines: usize,
    /// Substrings marking non-corporate filers (funds, trusts, banks).
    pub denylist: Vec<String>,
}

impl Default for ScoreConfig {
    fn default() -> Self {
        Self {
            top_buy: 100_000.0,
            officer_buy: 150_000.0,
            other_buy: 1_000_000.0,
            top_sell: 750_000.0,
            officer_sell: 1_000_000.0,
            other_sell: 2_000_000.0,
            min_buy: 50_000.0,
            min_sell: 250_000.0,
            top_n: 30,
            max_lines: 120,
            denylist: ["fund", "trust", "account", "bank", "finance"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

/// Tolerates `_` separators in env values (e.g. `1_000_000`).
fn env_f64(name: &str, default: f64) -> f64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.replace('_', "").trim().parse::<f64>().ok())
        .unwrap_or(default)
}

fn env_usize(name: &str, default: usize) -> usize {
    std::env::var(name)
        .ok()
        .and_then(|v| v.replace('_', "").trim().parse::<usize>().ok())
        .unwrap_or(default)
}

impl ScoreConfig {
    pub fn from_env() -> Self {
        let d = Self::default();
        let denylist = match std::env::var("INSIDER_DENYLIST") {
            Ok(v) => v
                .split(',')
                .map(|s| s.trim().to_ascii_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
            Err(_) => d.denylist,
        };
        Self {
            top_buy: env_f64("SEC_THRESH_TOP_BUY", d.top_buy),
            officer_buy: env_f64("SEC_THRESH_OFF_BUY", d.officer_buy),
            other_buy: env_f64("SEC_THRESH_OTHER_BUY", d.other_buy),
            top_sell: env_f64("SEC_THRESH_TOP_SELL", d.top_sell),
            officer_sell: env_f64("SEC_THRESH_OFF_SELL", d.officer_sell),
            other_sell: env_f64("SEC_THRESH_OTHER_SELL", d.other_sell),
            min_buy: env_f64("SEC_MIN_BUY", d.min_buy),
            min_sell: env_f64("SEC_MIN_SELL", d.min_sell),
            top_n: env_usize("INSIDER_TOP_N", d.top_n),
            max_lines: env_usize("INSIDER_MAX_LINES", d.max_lines),
            denylist,
        }
    }

    fn buy_threshold(&self, b: RoleBucket) -> f64 {
        match b {
            RoleBucket::Top => self.top_buy,
            RoleBucket::OfficerDirector => self.officer_buy,
            RoleBucket::Other => self.other_buy,
        }
    }

    fn sell_threshold(&self, b: RoleBucket) -> f64 {
        match b {
            RoleBucket::Top => self.top_sell,
            RoleBucket::OfficerDirector => self.officer_sell,
            RoleBucket::Other => self.other_sell,
        }
    }
}

/// Coarse seniority classification used to weight salience.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleBucket {
    Top,
    OfficerDirector,
    Other,
}

pub fn role_bucket(rec: &FilingRecord) -> RoleBucket {
    let r = rec.role.to_ascii_lowercase();
    if ["ceo", "chief executive", "cfo", "chief financial", "president", "chair"]
        .iter()
        .any(|k| r.contains(k))
    {
        return RoleBucket::Top;
    }
    if rec.is_officer || rec.is_director || !r.is_empty() {
        return RoleBucket::OfficerDirector;
    }
    RoleBucket::Other
}

pub fn role_weight(b: RoleBucket) -> f64 {
    match b {
        RoleBucket::Top => 3.0,
        RoleBucket::OfficerDirector => 2.0,
        RoleBucket::Other => 1.0,
    }
}

/// Large enough to warrant prominent display, by role-dependent notional.
pub fn hot_flag(bucket: RoleBucket, s: &TxnSummary, cfg: &ScoreConfig) -> bool {
    if s.buy > 0.0 {
        return s.buy >= cfg.buy_threshold(bucket);
    }
    if s.sell > 0.0 {
        return s.net_sell() >= cfg.sell_threshold(bucket);
    }
    false
}

/// Non-corporate filer filter, applied before scoring.
pub fn is_noise(rec: &FilingRecord, denylist: &[String]) -> bool {
    let hay = format!("{}{}{}", rec.ticker, rec.issuer, rec.owner).to_ascii_lowercase();
    denylist.iter().any(|bad| hay.contains(bad.as_str()))
}

fn cluster_key(rec: &FilingRecord) -> &str {
    if rec.ticker.is_empty() {
        "UNKNOWN"
    } else {
        rec.ticker.as_str()
    }
}

fn score(s: &TxnSummary, bucket: RoleBucket, cluster: usize, hot: bool) -> f64 {
    if !s.has_notional() {
        return NO_NOTIONAL_SCORE;
    }
    let rw = role_weight(bucket);
    let mut score =
        2.5 * rw * s.buy.ln_1p() - 1.2 * rw * s.net_sell().ln_1p() + (cluster as f64).ln_1p();
    if hot {
        score += 2.0;
    }
    score
}

struct Scored<'a> {
    rec: &'a FilingRecord,
    summary: TxnSummary,
    hot: bool,
    score: f64,
}

/// Rank this run's records: noise filter, cluster count, composite score,
/// stable sort (ties keep feed order), small-trade floor, top-N cut.
/// Zero-notional filings only render when nothing else qualifies.
pub fn rank_records(records: &[FilingRecord], cfg: &ScoreConfig) -> Vec<RankedHeadline> {
    let kept: Vec<&FilingRecord> = records
        .iter()
        .filter(|r| !is_noise(r, &cfg.denylist))
        .collect();

    let mut owners_per: HashMap<&str, HashSet<&str>> = HashMap::new();
    for r in &kept {
        owners_per
            .entry(cluster_key(r))
            .or_default()
            .insert(r.owner.as_str());
    }

    let mut scored: Vec<Scored> = kept
        .iter()
        .map(|&r| {
            let summary = r.summary();
            let bucket = role_bucket(r);
            let hot = hot_flag(bucket, &summary, cfg);
            let cluster = owners_per.get(cluster_key(r)).map_or(1, HashSet::len);
            Scored {
                rec: r,
                summary,
                hot,
                score: score(&summary, bucket, cluster, hot),
            }
        })
        .collect();
    // Vec::sort_by is stable, so equal scores keep feed order.
    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));

    let render = |s: &Scored| RankedHeadline {
        line: headline::ranked_line(s.rec, &s.summary, s.hot),
        priority_score: s.score,
    };

    let out: Vec<RankedHeadline> = scored
        .iter()
        .filter(|s| s.summary.buy >= cfg.min_buy || s.summary.sell >= cfg.min_sell)
        .take(cfg.top_n)
        .filter(|s| s.score > NO_NOTIONAL_SCORE + 0.01)
        .take(cfg.max_lines)
        .map(render)
        .collect();
    if !out.is_empty() {
        return out;
    }
    // Nothing with real notional qualified: fall back to whatever exists,
    // "filed" stubs included, rather than emitting nothing.
    scored
        .iter()
        .take(cfg.top_n.min(cfg.max_lines))
        .map(render)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AcqDisp, Transaction};

    fn record(key: &str, ticker: &str, owner: &str, role: &str, txs: Vec<Transaction>) -> FilingRecord {
        FilingRecord {
            key: key.into(),
            ticker: ticker.into(),
            issuer: format!("{ticker} Corp"),
            owner: owner.into(),
            role: role.into(),
            is_officer: !role.is_empty(),
            is_director: false,
            transactions: txs,
            observed_at: "2025-08-20T18:03:11Z".into(),
            source_url: None,
        }
    }

    fn buy(total: f64) -> Transaction {
        Transaction::new("P", AcqDisp::Acquired, total / 10.0, 10.0, total, None)
    }

    fn sell(total: f64) -> Transaction {
        Transaction::new("S", AcqDisp::Disposed, total / 10.0, 10.0, total, None)
    }

    #[test]
    fn buckets_and_weights() {
        let top = record("1", "A", "X", "Chief Financial Officer", vec![]);
        let off = record("2", "A", "Y", "VP, Controller", vec![]);
        let other = record("3", "A", "Z", "", vec![]);
        assert_eq!(role_bucket(&top), RoleBucket::Top);
        assert_eq!(role_bucket(&off), RoleBucket::OfficerDirector);
        let mut plain = other.clone();
        plain.is_officer = false;
        assert_eq!(role_bucket(&plain), RoleBucket::Other);
        assert!(role_weight(RoleBucket::Top) > role_weight(RoleBucket::Other));
    }

    #[test]
    fn top_role_outscores_other_for_same_buy() {
        let cfg = ScoreConfig::default();
        let mut a = record("1", "AAA", "X", "Chief Executive Officer", vec![buy(80_000.0)]);
        let mut b = record("2", "BBB", "Y", "", vec![buy(80_000.0)]);
        b.is_officer = false;
        a.issuer = "AAA Inc".into();
        b.issuer = "BBB Inc".into();
        let ranked = rank_records(&[a, b], &cfg);
        assert_eq!(ranked.len(), 2);
        assert!(ranked[0].line.contains("AAA"));
        assert!(ranked[0].priority_score >= ranked[1].priority_score);
    }

    #[test]
    fn hot_flag_uses_role_thresholds() {
        let cfg = ScoreConfig::default();
        let s = TxnSummary {
            buy: 125_000.0,
            ..TxnSummary::default()
        };
        assert!(hot_flag(RoleBucket::Top, &s, &cfg)); // 125k >= 100k
        assert!(!hot_flag(RoleBucket::OfficerDirector, &s, &cfg)); // < 150k
        assert!(!hot_flag(RoleBucket::Other, &s, &cfg));

        let sells = TxnSummary {
            sell: 900_000.0,
            ..TxnSummary::default()
        };
        assert!(hot_flag(RoleBucket::Top, &sells, &cfg)); // 900k >= 750k
        assert!(!hot_flag(RoleBucket::OfficerDirector, &sells, &cfg));
    }

    #[test]
    fn administrative_codes_discount_the_sell_side() {
        let cfg = ScoreConfig::default();
        let txs = vec![
            sell(800_000.0),
            Transaction::new("F", AcqDisp::Unknown, 100.0, 10.0, 700_000.0, None),
        ];
        let rec = record("1", "TAX", "X", "Chief Executive Officer", txs);
        let s = rec.summary();
        assert_eq!(s.net_sell(), 100_000.0);
        // net sell is under the TOP sell threshold, so not hot
        assert!(!hot_flag(RoleBucket::Top, &s, &cfg));
    }

    #[test]
    fn noise_and_small_trades_are_filtered() {
        let cfg = ScoreConfig::default();
        let fund = record("1", "XYZ", "Big Value Fund LP", "", vec![buy(500_000.0)]);
        let tiny = record("2", "TINY", "Jane Doe", "CEO", vec![buy(1_000.0)]);
        let real = record("3", "REAL", "John Roe", "CEO", vec![buy(200_000.0)]);
        let ranked = rank_records(&[fund, tiny, real], &cfg);
        assert_eq!(ranked.len(), 1);
        assert!(ranked[0].line.contains("REAL"));
    }

    #[test]
    fn filed_stubs_render_only_as_fallback() {
        let cfg = ScoreConfig::default();
        let stub = record("1", "STUB", "Insider", "", vec![]);
        let ranked = rank_records(std::slice::from_ref(&stub), &cfg);
        assert_eq!(ranked.len(), 1);
        assert!(ranked[0].line.contains("Form 4 filed"));
        assert_eq!(ranked[0].priority_score, NO_NOTIONAL_SCORE);

        // With a real record present, the stub drops out.
        let real = record("2", "REAL", "John Roe", "CEO", vec![buy(200_000.0)]);
        let ranked = rank_records(&[stub, real], &cfg);
        assert_eq!(ranked.len(), 1);
        assert!(ranked[0].line.contains("REAL"));
    }

    #[test]
    fn cluster_of_owners_raises_salience() {
        let cfg = ScoreConfig::default();
        let solo = vec![record("1", "SOLO", "A", "CEO", vec![buy(200_000.0)])];
        let pair = vec![
            record("2", "PAIR", "B", "CEO", vec![buy(200_000.0)]),
            record("3", "PAIR", "C", "CEO", vec![buy(200_000.0)]),
        ];
        let solo_score = rank_records(&solo, &cfg)[0].priority_score;
        let pair_score = rank_records(&pair, &cfg)[0].priority_score;
        assert!(pair_score > solo_score);
    }

    #[test]
    fn ranking_is_stable_on_ties() {
        let cfg = ScoreConfig::default();
        let a = record("1", "AAA", "A", "CEO", vec![buy(200_000.0)]);
        let b = record("2", "BBB", "B", "CEO", vec![buy(200_000.0)]);
        let ranked = rank_records(&[a, b], &cfg);
        assert!(ranked[0].line.contains("AAA"));
        assert!(ranked[1].line.contains("BBB"));
    }
}
