//! Engine configuration.
//!
//! DESIGN
//! ======
//! Every knob has a compiled-in default from [`crate::consts`] and may be
//! overridden by a `BUTTONBOARD_*` environment variable. Unparseable values,
//! and non-finite lengths, fall back to the default instead of failing startup.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use crate::consts::{
    DEFAULT_BUTTON_HEIGHT, DEFAULT_BUTTON_WIDTH, GRID_COLUMNS, GRID_GAP, LOCK_SWEEP_INTERVAL_MS, MIN_BUTTON_HEIGHT,
    MIN_BUTTON_WIDTH,
};

/// Tuning knobs for layout defaults, geometry bounds and lock sweeping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    /// Columns in the default grid. Always at least 1.
    pub grid_columns: usize,
    /// Gap between grid cells.
    pub grid_gap: f64,
    /// Width assumed for buttons without a stored width.
    pub default_width: f64,
    /// Height assumed for buttons without a stored height.
    pub default_height: f64,
    /// Minimum committed width.
    pub min_width: f64,
    /// Minimum committed height.
    pub min_height: f64,
    /// Interval at which the host should call `EngineCore::tick`.
    pub sweep_interval_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            grid_columns: GRID_COLUMNS,
            grid_gap: GRID_GAP,
            default_width: DEFAULT_BUTTON_WIDTH,
            default_height: DEFAULT_BUTTON_HEIGHT,
            min_width: MIN_BUTTON_WIDTH,
            min_height: MIN_BUTTON_HEIGHT,
            sweep_interval_ms: LOCK_SWEEP_INTERVAL_MS,
        }
    }
}

impl EngineConfig {
    /// Load the configuration from `BUTTONBOARD_*` environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            grid_columns: env_parse("BUTTONBOARD_GRID_COLUMNS", defaults.grid_columns).max(1),
            grid_gap: env_parse_finite("BUTTONBOARD_GRID_GAP", defaults.grid_gap),
            default_width: env_parse_finite("BUTTONBOARD_DEFAULT_WIDTH", defaults.default_width),
            default_height: env_parse_finite("BUTTONBOARD_DEFAULT_HEIGHT", defaults.default_height),
            min_width: env_parse_finite("BUTTONBOARD_MIN_WIDTH", defaults.min_width),
            min_height: env_parse_finite("BUTTONBOARD_MIN_HEIGHT", defaults.min_height),
            sweep_interval_ms: env_parse("BUTTONBOARD_SWEEP_INTERVAL_MS", defaults.sweep_interval_ms),
        }
    }
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    match std::env::var(key) {
        Ok(raw) => parse_or(&raw, default),
        Err(_) => default,
    }
}

/// Like [`env_parse`], but a value that is not finite (`NaN`, `inf`) keeps the default.
pub(crate) fn env_parse_finite(key: &str, default: f64) -> f64 {
    match std::env::var(key) {
        Ok(raw) => finite_or(&raw, default),
        Err(_) => default,
    }
}

pub(crate) fn finite_or(raw: &str, default: f64) -> f64 {
    Some(parse_or(raw, default)).filter(|v| v.is_finite()).unwrap_or(default)
}

pub(crate) fn parse_or<T>(raw: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    raw.trim().parse::<T>().unwrap_or(default)
}
