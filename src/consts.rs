//! Shared numeric constants for the buttonboard crate.

// ── Grid layout ─────────────────────────────────────────────────

/// Number of columns in the default grid layout.
pub const GRID_COLUMNS: usize = 4;

/// Gap between grid cells, and the margin from the canvas origin.
pub const GRID_GAP: f64 = 20.0;

/// Width used for a button that has no stored width.
pub const DEFAULT_BUTTON_WIDTH: f64 = 160.0;

/// Height used for a button that has no stored height.
pub const DEFAULT_BUTTON_HEIGHT: f64 = 160.0;

// ── Geometry bounds ─────────────────────────────────────────────

/// Smallest width a resize may commit.
pub const MIN_BUTTON_WIDTH: f64 = 80.0;

/// Smallest height a resize may commit.
pub const MIN_BUTTON_HEIGHT: f64 = 40.0;

// ── Timers ──────────────────────────────────────────────────────

/// How often the host should sweep expired locks, in milliseconds.
pub const LOCK_SWEEP_INTERVAL_MS: u64 = 1000;

// ── Cache keys ──────────────────────────────────────────────────

/// Prefix for per-page position maps: `buttonPositions:<page id>`.
pub const POSITIONS_KEY_PREFIX: &str = "buttonPositions:";

/// Prefix for per-page size maps: `buttonSizes:<page id>`.
pub const SIZES_KEY_PREFIX: &str = "buttonSizes:";

/// Prefix for per-button background colors: `buttonColor:<button id>`.
pub const COLOR_KEY_PREFIX: &str = "buttonColor:";

/// Single key holding every active timer lock.
pub const TIMER_LOCKS_KEY: &str = "buttonTimerLocks";

// ── Display ─────────────────────────────────────────────────────

/// Decimal places kept when a linked value is shown.
pub const DISPLAY_DECIMALS: i32 = 2;
