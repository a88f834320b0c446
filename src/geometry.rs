//! Geometry mutation tracking for drag and resize gestures.
//!
//! DESIGN
//! ======
//! The tracker owns the current page's position map and size map. A commit
//! validates first and only then replaces a single entry, so a rejected
//! gesture leaves the previous value in place. Position and size live in
//! separate maps: committing one never touches the other.
//!
//! Persisting the maps is the engine's job; the tracker stays free of I/O.

#[cfg(test)]
#[path = "geometry_test.rs"]
mod geometry_test;

use std::collections::HashSet;

use crate::config::EngineConfig;
use crate::dispatch::Mode;
use crate::model::{Button, ButtonId, PageId, Position, PositionMap, Size, SizeMap};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeometryError {
    #[error("geometry is read-only in live mode")]
    LiveMode,
    #[error("button {0} is fixed")]
    Fixed(ButtonId),
    #[error("button {0} is not on the current page")]
    NotOnPage(ButtonId),
    #[error("position ({x}, {y}) is not finite")]
    NonFinite { x: f64, y: f64 },
    #[error("size {width}x{height} is below the minimum {min_width}x{min_height}")]
    TooSmall { width: f64, height: f64, min_width: f64, min_height: f64 },
}

/// Position and size state for the page currently on the canvas.
#[derive(Debug, Default)]
pub struct GeometryTracker {
    page_id: Option<PageId>,
    positions: PositionMap,
    sizes: SizeMap,
    unsaved: HashSet<PageId>,
}

impl GeometryTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install freshly resolved maps for a page.
    pub fn load(&mut self, page_id: PageId, positions: PositionMap, sizes: SizeMap) {
        self.page_id = Some(page_id);
        self.positions = positions;
        self.sizes = sizes;
    }

    #[must_use]
    pub fn page_id(&self) -> Option<PageId> {
        self.page_id
    }

    #[must_use]
    pub fn positions(&self) -> &PositionMap {
        &self.positions
    }

    #[must_use]
    pub fn sizes(&self) -> &SizeMap {
        &self.sizes
    }

    #[must_use]
    pub fn position(&self, id: &ButtonId) -> Option<Position> {
        self.positions.get(id).copied()
    }

    #[must_use]
    pub fn size(&self, id: &ButtonId) -> Option<Size> {
        self.sizes.get(id).copied()
    }

    /// Whether drag/resize may touch `button` in `mode`.
    ///
    /// # Errors
    ///
    /// `LiveMode` outside edit mode, `Fixed` for fixed buttons, `NotOnPage`
    /// when the button has no resolved position on the loaded page.
    pub fn ensure_editable(&self, button: &Button, mode: Mode) -> Result<(), GeometryError> {
        if mode != Mode::Edit {
            return Err(GeometryError::LiveMode);
        }
        if button.is_fixed {
            return Err(GeometryError::Fixed(button.id));
        }
        if !self.positions.contains_key(&button.id) {
            return Err(GeometryError::NotOnPage(button.id));
        }
        Ok(())
    }

    /// Commit the end of a drag: replace exactly this button's position.
    ///
    /// # Errors
    ///
    /// See [`Self::ensure_editable`]; also `NonFinite` for NaN/infinite coordinates.
    pub fn commit_drag(&mut self, button: &Button, mode: Mode, to: Position) -> Result<Position, GeometryError> {
        self.ensure_editable(button, mode)?;
        if !to.is_finite() {
            return Err(GeometryError::NonFinite { x: to.x, y: to.y });
        }
        self.positions.insert(button.id, to);
        self.mark_unsaved();
        Ok(to)
    }

    /// Commit the end of a resize: replace exactly this button's size.
    ///
    /// # Errors
    ///
    /// See [`Self::ensure_editable`]; also `TooSmall` for sizes under the
    /// configured minimum or non-finite values.
    pub fn commit_resize(
        &mut self,
        button: &Button,
        mode: Mode,
        to: Size,
        config: &EngineConfig,
    ) -> Result<Size, GeometryError> {
        self.ensure_editable(button, mode)?;
        let fits = to.width.is_finite()
            && to.height.is_finite()
            && to.width >= config.min_width
            && to.height >= config.min_height;
        if !fits {
            return Err(GeometryError::TooSmall {
                width: to.width,
                height: to.height,
                min_width: config.min_width,
                min_height: config.min_height,
            });
        }
        self.sizes.insert(button.id, to);
        self.mark_unsaved();
        Ok(to)
    }

    fn mark_unsaved(&mut self) {
        if let Some(page) = self.page_id {
            self.unsaved.insert(page);
        }
    }

    /// Whether `page_id` has geometry commits not yet bulk-saved.
    #[must_use]
    pub fn has_unsaved(&self, page_id: &PageId) -> bool {
        self.unsaved.contains(page_id)
    }

    /// Clear the unsaved flag after a successful bulk save.
    pub fn mark_saved(&mut self, page_id: &PageId) {
        self.unsaved.remove(page_id);
    }

    /// Drop entries for buttons that no longer exist.
    pub fn retain(&mut self, existing: &HashSet<ButtonId>) {
        self.positions.retain(|id, _| existing.contains(id));
        self.sizes.retain(|id, _| existing.contains(id));
    }

    /// Forget everything about a removed page.
    pub fn forget_page(&mut self, page_id: &PageId) {
        self.unsaved.remove(page_id);
        if self.page_id.as_ref() == Some(page_id) {
            self.page_id = None;
            self.positions.clear();
            self.sizes.clear();
        }
    }
}
