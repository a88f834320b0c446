//! Entity model: pages, buttons, their payloads, and the in-memory store.
//!
//! This module defines what lives on a canvas (`Page`, `Button`) together
//! with the typed payloads a button carries: its click action
//! (`ButtonAction`), optional shape styling (`ShapeDetails`), link
//! calculation (`Calculation`) and timer (`TimerConfig`). `PartialButton` is
//! the sparse update sent to the remote button store, and `CanvasDoc` is the
//! runtime store that owns every loaded page.
//!
//! Records arrive from the remote store as JSON, so field names follow the
//! store's camelCase convention on the wire.

#[cfg(test)]
#[path = "model_test.rs"]
mod model_test;

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::EngineConfig;

/// Unique identifier for a button. Unique across all pages.
pub type ButtonId = Uuid;

/// Unique identifier for a page.
pub type PageId = Uuid;

/// Resolved positions keyed by button id.
pub type PositionMap = BTreeMap<ButtonId, Position>;

/// Committed sizes keyed by button id.
pub type SizeMap = BTreeMap<ButtonId, Size>;

// =============================================================================
// GEOMETRY
// =============================================================================

/// Top-left offset of a button within the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Both coordinates are finite numbers.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Logical size of a button.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    #[must_use]
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Both dimensions are finite and strictly positive.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

// =============================================================================
// BEHAVIOR
// =============================================================================

/// The declared behavior of a button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ButtonKind {
    /// Does nothing when clicked apart from counting.
    #[default]
    Empty,
    /// Navigates to another page.
    Page,
    /// Opens a media viewer.
    Media,
    /// Opens a media viewer; shown without the surrounding page chrome.
    StandaloneMedia,
    /// Opens a file viewer.
    File,
    /// Non-rectangular shape; its action lives in `ShapeDetails::action`.
    Shape,
}

/// What a click resolves to. Shape buttons embed one of these too.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ButtonAction {
    #[default]
    None,
    #[serde(rename_all = "camelCase")]
    Page { target_page: PageId },
    #[serde(rename_all = "camelCase")]
    Media { url: String, media_type: String },
    #[serde(rename_all = "camelCase")]
    File { url: String, file_name: String, file_type: String },
}

/// Styling and embedded action for shape buttons.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShapeDetails {
    pub background_color: String,
    pub text_color: String,
    pub text: String,
    pub font_size: f64,
    pub border_radius: f64,
    /// CSS-style properties used for non-rectangular clipping.
    pub style: BTreeMap<String, String>,
    pub action: ButtonAction,
}

/// Arithmetic applied to a linked pair's click counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalcOp {
    #[default]
    Add,
    Subtract,
    Multiply,
    Percentage,
}

/// Link calculation settings declared on a button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Calculation {
    #[serde(rename = "type")]
    pub op: CalcOp,
    pub enabled: bool,
}

/// Label wording used while a button is locked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerKind {
    #[default]
    Countdown,
    Cooldown,
}

/// Where remaining lock time is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerDisplay {
    #[default]
    None,
    Button,
    Toast,
    Both,
}

impl TimerDisplay {
    #[must_use]
    pub fn on_button(self) -> bool {
        matches!(self, Self::Button | Self::Both)
    }

    #[must_use]
    pub fn as_toast(self) -> bool {
        matches!(self, Self::Toast | Self::Both)
    }
}

/// What happens when a lock expires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerAction {
    /// Return to idle.
    #[default]
    None,
    /// Deactivate the button.
    Hide,
}

/// Per-button timer settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TimerConfig {
    pub enabled: bool,
    /// Lock window in seconds.
    pub duration: u64,
    #[serde(rename = "type")]
    pub kind: TimerKind,
    pub display: TimerDisplay,
    pub action: TimerAction,
}

impl TimerConfig {
    /// Whether clicks on this button are lock-gated.
    #[must_use]
    pub fn gates_clicks(&self) -> bool {
        self.enabled && self.duration > 0
    }
}

// =============================================================================
// ENTITIES
// =============================================================================

/// A clickable button placed on a page.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Button {
    pub id: ButtonId,
    pub page_id: PageId,
    #[serde(default)]
    pub text: String,
    #[serde(rename = "type", default)]
    pub kind: ButtonKind,
    /// Payload for page, media and file buttons.
    #[serde(default)]
    pub action: ButtonAction,
    #[serde(default)]
    pub width: Option<f64>,
    #[serde(default)]
    pub height: Option<f64>,
    /// Position persisted on the record itself, if any.
    #[serde(default)]
    pub position: Option<Position>,
    #[serde(default)]
    pub background_color: String,
    #[serde(default)]
    pub text_color: String,
    #[serde(default)]
    pub shape_details: Option<ShapeDetails>,
    #[serde(default)]
    pub clicks: u64,
    #[serde(default)]
    pub linked_button_id: Option<ButtonId>,
    #[serde(default)]
    pub calculation: Calculation,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_fixed: bool,
    #[serde(default)]
    pub timer: TimerConfig,
}

fn default_true() -> bool {
    true
}

impl Button {
    /// A freshly authored button: active, zero clicks, no geometry.
    #[must_use]
    pub fn new(id: ButtonId, page_id: PageId) -> Self {
        Self {
            id,
            page_id,
            text: String::new(),
            kind: ButtonKind::Empty,
            action: ButtonAction::None,
            width: None,
            height: None,
            position: None,
            background_color: String::new(),
            text_color: String::new(),
            shape_details: None,
            clicks: 0,
            linked_button_id: None,
            calculation: Calculation::default(),
            is_active: true,
            is_fixed: false,
            timer: TimerConfig::default(),
        }
    }

    /// Apply a sparse update. `clicks` never moves backwards.
    pub fn apply(&mut self, partial: &PartialButton) {
        if let Some(clicks) = partial.clicks {
            self.clicks = self.clicks.max(clicks);
        }
        if let Some(active) = partial.is_active {
            self.is_active = active;
        }
        if let Some(w) = partial.width {
            self.width = Some(w);
        }
        if let Some(h) = partial.height {
            self.height = Some(h);
        }
        if let Some(pos) = partial.position {
            self.position = Some(pos);
        }
        if let Some(ref color) = partial.background_color {
            self.background_color.clone_from(color);
        }
    }

    /// Size from the record, falling back to configured defaults per axis.
    #[must_use]
    pub fn size_or_default(&self, config: &EngineConfig) -> Size {
        Size {
            width: self.width.filter(|w| w.is_finite() && *w > 0.0).unwrap_or(config.default_width),
            height: self.height.filter(|h| h.is_finite() && *h > 0.0).unwrap_or(config.default_height),
        }
    }

    /// The action a live click performs, if `kind` and payload agree.
    ///
    /// Page, media and file buttons use `action` only when its variant
    /// matches the declared kind. Shape buttons use their embedded action.
    #[must_use]
    pub fn effective_action(&self) -> Option<&ButtonAction> {
        let action = match self.kind {
            ButtonKind::Empty => return None,
            ButtonKind::Shape => &self.shape_details.as_ref()?.action,
            ButtonKind::Page | ButtonKind::Media | ButtonKind::StandaloneMedia | ButtonKind::File => &self.action,
        };
        let agrees = match (self.kind, action) {
            (_, ButtonAction::None) => false,
            (ButtonKind::Shape, _)
            | (ButtonKind::Page, ButtonAction::Page { .. })
            | (ButtonKind::Media | ButtonKind::StandaloneMedia, ButtonAction::Media { .. })
            | (ButtonKind::File, ButtonAction::File { .. }) => true,
            _ => false,
        };
        agrees.then_some(action)
    }
}

/// A canvas page and the buttons it owns, in list order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub id: PageId,
    pub name: String,
    #[serde(default)]
    pub order: i64,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub buttons: Vec<Button>,
}

impl Page {
    #[must_use]
    pub fn new(id: PageId, name: impl Into<String>, order: i64) -> Self {
        Self { id, name: name.into(), order, is_active: true, buttons: Vec::new() }
    }
}

/// Sparse update for a button. Only present fields are applied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialButton {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clicks: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
}

// =============================================================================
// STORE
// =============================================================================

/// In-memory store of every loaded page and its buttons.
#[derive(Debug, Default)]
pub struct CanvasDoc {
    pages: Vec<Page>,
}

impl CanvasDoc {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace all pages with a fresh snapshot, kept sorted by `order`.
    pub fn load_pages(&mut self, mut pages: Vec<Page>) {
        pages.sort_by_key(|p| p.order);
        self.pages = pages;
    }

    /// Replace the button list of one page. Returns false if the page is unknown.
    pub fn replace_buttons(&mut self, page_id: &PageId, buttons: Vec<Button>) -> bool {
        let Some(page) = self.page_mut(page_id) else {
            return false;
        };
        page.buttons = buttons;
        true
    }

    /// Remove a page together with its buttons.
    pub fn remove_page(&mut self, page_id: &PageId) -> Option<Page> {
        let idx = self.pages.iter().position(|p| &p.id == page_id)?;
        Some(self.pages.remove(idx))
    }

    #[must_use]
    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    #[must_use]
    pub fn page(&self, page_id: &PageId) -> Option<&Page> {
        self.pages.iter().find(|p| &p.id == page_id)
    }

    pub fn page_mut(&mut self, page_id: &PageId) -> Option<&mut Page> {
        self.pages.iter_mut().find(|p| &p.id == page_id)
    }

    /// Look up a button on any page.
    #[must_use]
    pub fn button(&self, id: &ButtonId) -> Option<&Button> {
        self.buttons().find(|b| &b.id == id)
    }

    pub fn button_mut(&mut self, id: &ButtonId) -> Option<&mut Button> {
        self.pages.iter_mut().flat_map(|p| p.buttons.iter_mut()).find(|b| &b.id == id)
    }

    /// Every button, in page order then list order.
    pub fn buttons(&self) -> impl Iterator<Item = &Button> {
        self.pages.iter().flat_map(|p| p.buttons.iter())
    }

    /// Ids of every button on every page.
    #[must_use]
    pub fn button_ids(&self) -> HashSet<ButtonId> {
        self.buttons().map(|b| b.id).collect()
    }

    /// The page owning a button.
    #[must_use]
    pub fn page_of(&self, id: &ButtonId) -> Option<PageId> {
        self.pages.iter().find(|p| p.buttons.iter().any(|b| &b.id == id)).map(|p| p.id)
    }

    /// Apply a sparse update. Returns false if the button doesn't exist.
    pub fn apply_partial(&mut self, id: &ButtonId, partial: &PartialButton) -> bool {
        let Some(button) = self.button_mut(id) else {
            return false;
        };
        button.apply(partial);
        true
    }

    /// Number of buttons across all pages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pages.iter().map(|p| p.buttons.len()).sum()
    }

    /// Returns `true` if no page holds any button.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
