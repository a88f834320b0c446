#![allow(clippy::float_cmp)]

use super::*;

#[test]
fn defaults_match_layout_constants() {
    let config = EngineConfig::default();
    assert_eq!(config.grid_columns, 4);
    assert_eq!(config.grid_gap, 20.0);
    assert_eq!(config.default_width, 160.0);
    assert_eq!(config.default_height, 160.0);
    assert_eq!(config.min_width, 80.0);
    assert_eq!(config.min_height, 40.0);
    assert_eq!(config.sweep_interval_ms, 1000);
}

#[test]
fn parse_or_accepts_trimmed_numbers() {
    assert_eq!(parse_or(" 6 ", 4_usize), 6);
    assert_eq!(parse_or("12.5", 20.0_f64), 12.5);
}

#[test]
fn parse_or_falls_back_on_garbage() {
    assert_eq!(parse_or("wide", 4_usize), 4);
    assert_eq!(parse_or("", 1000_u64), 1000);
    assert_eq!(parse_or("-3", 4_usize), 4);
}

#[test]
fn env_parse_missing_key_uses_default() {
    assert_eq!(env_parse("BUTTONBOARD_TEST_KEY_THAT_IS_NEVER_SET", 7_u64), 7);
}

#[test]
fn finite_or_rejects_nan_and_infinity() {
    assert_eq!(finite_or("NaN", 20.0), 20.0);
    assert_eq!(finite_or("inf", 160.0), 160.0);
    assert_eq!(finite_or("-infinity", 80.0), 80.0);
    assert_eq!(finite_or("32.5", 20.0), 32.5);
    assert_eq!(finite_or("tall", 40.0), 40.0);
}

#[test]
fn env_parse_finite_missing_key_uses_default() {
    assert_eq!(env_parse_finite("BUTTONBOARD_TEST_LENGTH_THAT_IS_NEVER_SET", 20.0), 20.0);
}
