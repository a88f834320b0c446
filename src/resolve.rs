//! Position resolution for a page's buttons.
//!
//! DESIGN
//! ======
//! Three sources can place a button, checked per entry in this order:
//! the externally supplied map (remote store or shared view), the local
//! cache, and finally the grid default computed from the button's index and
//! size. `resolve_one` is the single place that encodes this precedence;
//! `resolve_positions` just walks the button list through it, so every
//! button ends up with an entry.

#[cfg(test)]
#[path = "resolve_test.rs"]
mod resolve_test;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::model::{Button, ButtonId, Position, PositionMap, Size};

/// Row shape used by the remote position store.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionRecord {
    pub button_id: ButtonId,
    pub x: f64,
    pub y: f64,
}

impl PositionRecord {
    #[must_use]
    pub fn new(button_id: ButtonId, position: Position) -> Self {
        Self { button_id, x: position.x, y: position.y }
    }

    #[must_use]
    pub fn position(&self) -> Position {
        Position::new(self.x, self.y)
    }
}

/// Which source supplied a resolved position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionSource {
    Remote,
    Cache,
    Grid,
}

/// The outcome of resolving every button on a page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    pub positions: PositionMap,
    pub from_remote: usize,
    pub from_cache: usize,
    pub from_grid: usize,
}

/// Grid cell for the button at `index` in list order.
///
/// `x = col * (width + gap) + gap`, `y = row * (height + gap) + gap`, with
/// `row = index / columns` and `col = index % columns`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn grid_default(index: usize, size: Size, config: &EngineConfig) -> Position {
    let columns = config.grid_columns.max(1);
    let row = (index / columns) as f64;
    let col = (index % columns) as f64;
    let gap = config.grid_gap;
    Position { x: col * (size.width + gap) + gap, y: row * (size.height + gap) + gap }
}

/// Pick one button's position: remote, then cache, then the computed default.
#[must_use]
pub fn resolve_one(
    id: &ButtonId,
    remote: Option<&PositionMap>,
    cached: &PositionMap,
    computed: Position,
) -> (Position, PositionSource) {
    if let Some(pos) = remote.and_then(|m| m.get(id)).filter(|p| p.is_finite()) {
        return (*pos, PositionSource::Remote);
    }
    if let Some(pos) = cached.get(id).filter(|p| p.is_finite()) {
        return (*pos, PositionSource::Cache);
    }
    (computed, PositionSource::Grid)
}

/// Resolve a complete position map for `buttons`, given in list order.
#[must_use]
pub fn resolve_positions(
    buttons: &[&Button],
    remote: Option<&PositionMap>,
    cached: &PositionMap,
    config: &EngineConfig,
) -> Resolution {
    let mut out = Resolution::default();
    for (index, button) in buttons.iter().enumerate() {
        let computed = grid_default(index, button.size_or_default(config), config);
        let (pos, source) = resolve_one(&button.id, remote, cached, computed);
        match source {
            PositionSource::Remote => out.from_remote += 1,
            PositionSource::Cache => out.from_cache += 1,
            PositionSource::Grid => out.from_grid += 1,
        }
        out.positions.insert(button.id, pos);
    }
    out
}

/// Drop entries whose button is not in `existing`.
#[must_use]
pub fn prune_positions(source: &PositionMap, existing: &HashSet<ButtonId>) -> PositionMap {
    source.iter().filter(|(id, _)| existing.contains(id)).map(|(id, pos)| (*id, *pos)).collect()
}

/// Build an external position map from button records and store rows.
///
/// Positions stored on the records go in first; store rows override them.
/// Rows with non-finite coordinates are ignored.
#[must_use]
pub fn external_positions(buttons: &[&Button], records: &[PositionRecord]) -> PositionMap {
    let mut map: PositionMap =
        buttons.iter().filter_map(|b| b.position.filter(Position::is_finite).map(|p| (b.id, p))).collect();
    for record in records {
        let pos = record.position();
        if pos.is_finite() {
            map.insert(record.button_id, pos);
        }
    }
    map
}

/// Complete a shared-view position map: prune unknown ids and fill the rest with grid defaults.
#[must_use]
pub fn complete_shared(source: &PositionMap, buttons: &[&Button], config: &EngineConfig) -> PositionMap {
    let existing: HashSet<ButtonId> = buttons.iter().map(|b| b.id).collect();
    let pruned = prune_positions(source, &existing);
    resolve_positions(buttons, Some(&pruned), &PositionMap::new(), config).positions
}
