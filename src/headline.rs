// src/headline.rs
//! Human-readable output lines. One line per filing, self-contained:
//! ticker, owner, transaction summary, timestamp.

use crate::rank::{role_bucket, RoleBucket};
use crate::types::{FilingRecord, TxnSummary};

pub fn human_amount(v: f64) -> String {
    if v >= 1_000_000.0 {
        format!("${:.2}M", v / 1_000_000.0)
    } else if v >= 1_000.0 {
        format!("${:.0}k", v / 1_000.0)
    } else {
        format!("${v:.0}")
    }
}

/// `2025-08-20T18:03:11Z` -> `2025-08-20 18:03:11 UTC`.
fn when_human(raw: &str) -> String {
    if raw.trim().is_empty() {
        return "time:n/a".to_string();
    }
    raw.replace('T', " ").replace('Z', " UTC").trim().to_string()
}

fn summary_parts(s: &TxnSummary) -> Vec<String> {
    let mut parts = Vec::new();
    if s.buy > 0.0 {
        parts.push(format!("BUY {}", human_amount(s.buy)));
    }
    if s.sell > 0.0 {
        parts.push(format!("SELL {}", human_amount(s.sell)));
    }
    if s.conversion > 0.0 {
        parts.push(format!("M {}", human_amount(s.conversion)));
    }
    if s.withheld > 0.0 {
        parts.push(format!("F {}", human_amount(s.withheld)));
    }
    parts
}

fn display_ticker(rec: &FilingRecord) -> String {
    let base = if !rec.ticker.is_empty() {
        &rec.ticker
    } else if !rec.issuer.is_empty() {
        &rec.issuer
    } else {
        "UNKNOWN"
    };
    base.to_ascii_uppercase()
}

fn display_owner(rec: &FilingRecord) -> &str {
    if rec.owner.is_empty() {
        "Insider"
    } else {
        &rec.owner
    }
}

/// Unranked line written right after extraction, with a coarse role label.
pub fn filing_line(rec: &FilingRecord) -> String {
    let base = display_ticker(rec);
    let who = display_owner(rec);
    let when = when_human(&rec.observed_at);
    let parts = summary_parts(&rec.summary());
    if parts.is_empty() {
        return format!("- [SEC] {base} – {who}: Form 4 filed ({when})");
    }
    let role = match role_bucket(rec) {
        RoleBucket::Top => "CEO/CFO",
        RoleBucket::OfficerDirector => "Officer/Dir",
        RoleBucket::Other => "Insider",
    };
    format!("- [SEC] {base} – {who} ({role}): {} ({when})", parts.join(", "))
}

/// Ranked line with the free-text role and the hot marker.
pub fn ranked_line(rec: &FilingRecord, s: &TxnSummary, hot: bool) -> String {
    let base = display_ticker(rec);
    let who = display_owner(rec);
    let role = if rec.role.is_empty() {
        "Insider"
    } else {
        rec.role.as_str()
    };
    let when = when_human(&rec.observed_at);
    let tag = if hot { "\u{1F525}HOT\u{1F525} " } else { "" };
    let parts = summary_parts(s);
    let body = if parts.is_empty() {
        "Form 4 filed".to_string()
    } else {
        parts.join(", ")
    };
    format!("- [SEC] {tag}{base} – {who} ({role}): {body} ({when})")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AcqDisp, Transaction};

    #[test]
    fn amounts_render_compactly() {
        assert_eq!(human_amount(125_000.0), "$125k");
        assert_eq!(human_amount(2_500_000.0), "$2.50M");
        assert_eq!(human_amount(999.0), "$999");
    }

    fn cfo_record() -> FilingRecord {
        FilingRecord {
            key: "k".into(),
            ticker: "ACME".into(),
            issuer: "Acme Corp".into(),
            owner: "Doe Jane".into(),
            role: "Chief Financial Officer".into(),
            is_officer: true,
            is_director: false,
            transactions: vec![Transaction::new(
                "P",
                AcqDisp::Acquired,
                10_000.0,
                12.5,
                125_000.0,
                None,
            )],
            observed_at: "2025-08-20T18:03:11Z".into(),
            source_url: None,
        }
    }

    #[test]
    fn filing_line_includes_ticker_summary_and_time() {
        let line = filing_line(&cfo_record());
        assert!(line.contains("ACME"));
        assert!(line.contains("BUY $125k"));
        assert!(line.contains("CEO/CFO"));
        assert!(line.contains("2025-08-20 18:03:11 UTC"));
    }

    #[test]
    fn bare_filing_renders_filed_stub() {
        let mut rec = cfo_record();
        rec.transactions.clear();
        rec.ticker.clear();
        let line = filing_line(&rec);
        assert!(line.contains("ACME CORP"));
        assert!(line.contains("Form 4 filed"));
    }

    #[test]
    fn ranked_line_tags_hot_records() {
        let rec = cfo_record();
        let s = rec.summary();
        let hot = ranked_line(&rec, &s, true);
        assert!(hot.contains("HOT"));
        assert!(hot.contains("Chief Financial Officer"));
        let cold = ranked_line(&rec, &s, false);
        assert!(!cold.contains("HOT"));
    }
}
