// tests/score_thresholds.rs
// Threshold configuration from the environment, including `_` separators.

use insider_monitor::rank::ScoreConfig;

#[serial_test::serial]
#[test]
fn env_overrides_with_underscore_separators() {
    std::env::set_var("SEC_THRESH_OFF_BUY", "200_000");
    std::env::set_var("SEC_THRESH_TOP_SELL", "500000");
    std::env::set_var("INSIDER_TOP_N", "10");
    let cfg = ScoreConfig::from_env();
    assert_eq!(cfg.officer_buy, 200_000.0);
    assert_eq!(cfg.top_sell, 500_000.0);
    assert_eq!(cfg.top_n, 10);
    // Untouched fields keep their defaults.
    assert_eq!(cfg.top_buy, 100_000.0);
    for k in ["SEC_THRESH_OFF_BUY", "SEC_THRESH_TOP_SELL", "INSIDER_TOP_N"] {
        std::env::remove_var(k);
    }
}

#[serial_test::serial]
#[test]
fn garbage_env_values_fall_back_to_defaults() {
    std::env::set_var("SEC_THRESH_TOP_BUY", "lots");
    let cfg = ScoreConfig::from_env();
    assert_eq!(cfg.top_buy, 100_000.0);
    std::env::remove_var("SEC_THRESH_TOP_BUY");
}

#[serial_test::serial]
#[test]
fn denylist_env_is_csv_and_lowercased() {
    std::env::set_var("INSIDER_DENYLIST", "Fund, SPAC ,");
    let cfg = ScoreConfig::from_env();
    assert_eq!(cfg.denylist, vec!["fund".to_string(), "spac".to_string()]);
    std::env::remove_var("INSIDER_DENYLIST");
}
