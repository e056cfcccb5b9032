// src/extract.rs
//! Ownership document -> structured filing fields and transactions.

use chrono::NaiveDate;
use metrics::counter;

use crate::types::{AcqDisp, Transaction};
use crate::xml::XmlNode;

/// Fields pulled from one ownership document. Merged with the feed
/// reference into a `FilingRecord` by the pipeline.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedFiling {
    pub ticker: String,
    pub issuer: String,
    pub owner: String,
    pub role: String,
    pub is_officer: bool,
    pub is_director: bool,
    pub transactions: Vec<Transaction>,
}

/// Lenient numeric coercion: commas and currency markers stripped, anything
/// unparseable (or negative) is 0.0. Extraction never raises over numbers.
fn parse_amount(s: &str) -> f64 {
    let cleaned: String = s
        .trim()
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    match cleaned.parse::<f64>() {
        Ok(v) if v.is_finite() && v > 0.0 => v,
        _ => 0.0,
    }
}

fn parse_flag(s: &str) -> bool {
    matches!(s.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes")
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    let head = s.trim().get(..10)?;
    NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
}

fn parse_transaction(blk: &XmlNode) -> Transaction {
    let code = blk.text_of("transactionCode");
    let ad = AcqDisp::parse(&blk.value_of("transactionAcquiredDisposedCode"));
    let shares = parse_amount(&blk.value_of("transactionShares"));

    // Price source order mirrors the schema variants: explicit per-share
    // price, then the derivative exercise prices, then back-derivation
    // from the aggregate value.
    let mut price = parse_amount(&blk.value_of("transactionPricePerShare"));
    if price == 0.0 {
        price = parse_amount(&blk.value_of("conversionOrExercisePrice"));
    }
    if price == 0.0 {
        price = parse_amount(&blk.value_of("exercisePrice"));
    }
    let aggregate = parse_amount(&blk.value_of("transactionTotalValue"));
    if price == 0.0 && aggregate > 0.0 && shares > 0.0 {
        price = aggregate / shares;
    }

    let total = if shares > 0.0 && price > 0.0 {
        shares * price
    } else {
        aggregate
    };

    Transaction::new(
        &code,
        ad,
        shares,
        price,
        total,
        parse_date(&blk.value_of("transactionDate")),
    )
}

/// Extract issuer, owner, and the union of non-derivative and derivative
/// transaction blocks. An empty transaction list is a valid result.
pub fn extract_filing(tree: &XmlNode) -> ExtractedFiling {
    let role = tree.text_of("officerTitle");
    let is_officer = parse_flag(&tree.value_of("isOfficer"));
    let is_director = parse_flag(&tree.value_of("isDirector"));

    let mut transactions = Vec::new();
    for blk in tree
        .find_all("nonDerivativeTransaction")
        .into_iter()
        .chain(tree.find_all("derivativeTransaction"))
    {
        transactions.push(parse_transaction(blk));
    }
    counter!("extract_transactions_total").increment(transactions.len() as u64);

    ExtractedFiling {
        ticker: tree.text_of("issuerTradingSymbol").to_ascii_uppercase(),
        issuer: tree.text_of("issuerName"),
        owner: tree.text_of("rptOwnerName"),
        role,
        is_officer,
        is_director,
        transactions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml;

    const PLAIN: &str = r#"<?xml version="1.0"?>
<ownershipDocument>
  <issuer>
    <issuerName>Acme Corp</issuerName>
    <issuerTradingSymbol>acme</issuerTradingSymbol>
  </issuer>
  <reportingOwner>
    <reportingOwnerId><rptOwnerName>Doe Jane</rptOwnerName></reportingOwnerId>
    <reportingOwnerRelationship>
      <isOfficer>1</isOfficer>
      <officerTitle>Chief Financial Officer</officerTitle>
    </reportingOwnerRelationship>
  </reportingOwner>
  <nonDerivativeTable>
    <nonDerivativeTransaction>
      <transactionDate><value>2025-08-19</value></transactionDate>
      <transactionCoding><transactionCode>P</transactionCode></transactionCoding>
      <transactionAmounts>
        <transactionShares><value>10,000</value></transactionShares>
        <transactionPricePerShare><value>12.50</value></transactionPricePerShare>
        <transactionAcquiredDisposedCode><value>A</value></transactionAcquiredDisposedCode>
      </transactionAmounts>
    </nonDerivativeTransaction>
  </nonDerivativeTable>
  <derivativeTable>
    <derivativeTransaction>
      <transactionCoding><transactionCode>M</transactionCode></transactionCoding>
      <transactionAmounts>
        <transactionShares><value>500</value></transactionShares>
        <transactionTotalValue><value>2500</value></transactionTotalValue>
        <transactionAcquiredDisposedCode><value>D</value></transactionAcquiredDisposedCode>
      </transactionAmounts>
    </derivativeTransaction>
  </derivativeTable>
</ownershipDocument>"#;

    fn extract(doc: &str) -> ExtractedFiling {
        extract_filing(&xml::parse(doc).unwrap())
    }

    #[test]
    fn pulls_issuer_owner_and_role() {
        let f = extract(PLAIN);
        assert_eq!(f.ticker, "ACME");
        assert_eq!(f.issuer, "Acme Corp");
        assert_eq!(f.owner, "Doe Jane");
        assert_eq!(f.role, "Chief Financial Officer");
        assert!(f.is_officer);
        assert!(!f.is_director);
    }

    #[test]
    fn unions_non_derivative_and_derivative_blocks() {
        let f = extract(PLAIN);
        assert_eq!(f.transactions.len(), 2);

        let p = &f.transactions[0];
        assert_eq!(p.code, "P");
        assert_eq!(p.ad, AcqDisp::Acquired);
        assert_eq!(p.shares, 10_000.0);
        assert_eq!(p.price, 12.50);
        assert_eq!(p.total, 125_000.0);
        assert_eq!(p.date, NaiveDate::from_ymd_opt(2025, 8, 19));

        let m = &f.transactions[1];
        assert_eq!(m.code, "M");
        assert_eq!(m.ad, AcqDisp::Disposed);
        // price back-derived from the aggregate value
        assert!((m.price - 5.0).abs() < 1e-9);
        assert!((m.total - 2_500.0).abs() < 1e-9);
    }

    #[test]
    fn namespace_prefixes_do_not_change_extraction() {
        let namespaced = PLAIN
            .replace("<ownershipDocument>", r#"<ns1:ownershipDocument xmlns:ns1="urn:sec">"#)
            .replace("</ownershipDocument>", "</ns1:ownershipDocument>")
            .replace("<issuerTradingSymbol>", "<ns1:issuerTradingSymbol>")
            .replace("</issuerTradingSymbol>", "</ns1:issuerTradingSymbol>")
            .replace("<transactionShares>", "<ns1:transactionShares>")
            .replace("</transactionShares>", "</ns1:transactionShares>")
            .replace("<value>", "<ns1:value>")
            .replace("</value>", "</ns1:value>");
        assert_eq!(extract(&namespaced), extract(PLAIN));
    }

    #[test]
    fn malformed_numbers_become_zero_not_errors() {
        let doc = r#"<ownershipDocument>
          <issuerTradingSymbol>X</issuerTradingSymbol>
          <nonDerivativeTransaction>
            <transactionCode>S</transactionCode>
            <transactionShares><value>n/a</value></transactionShares>
            <transactionPricePerShare><value>-3.0</value></transactionPricePerShare>
            <transactionAcquiredDisposedCode><value>D</value></transactionAcquiredDisposedCode>
          </nonDerivativeTransaction>
        </ownershipDocument>"#;
        let f = extract(doc);
        assert_eq!(f.transactions.len(), 1);
        let t = &f.transactions[0];
        assert_eq!(t.shares, 0.0);
        assert_eq!(t.price, 0.0);
        assert_eq!(t.total, 0.0);
        assert!(t.total.is_finite());
    }

    #[test]
    fn missing_transactions_is_a_valid_empty_result() {
        let f = extract("<ownershipDocument><issuerTradingSymbol>Y</issuerTradingSymbol></ownershipDocument>");
        assert_eq!(f.ticker, "Y");
        assert!(f.transactions.is_empty());
    }
}
