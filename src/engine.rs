//! Top-level engine: owns all canvas state and turns host events into actions.
//!
//! `EngineCore` is what the rendering layer talks to. Data arrives through
//! `load_pages` / `replace_buttons` and page loads; gestures and clicks come
//! in through `commit_drag`, `commit_resize` and `click`; the periodic
//! `tick` sweeps timer locks. Every operation returns a list of [`Action`]s
//! for the host to carry out (persist, navigate, open a viewer, notify).
//! Nothing here returns an error to the host: failures degrade to a default
//! path and surface as `Action::Notify` or a log line.

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

use std::collections::HashSet;

use tracing::{debug, info, warn};

use crate::cache::{self, CacheError, LocalCache};
use crate::calc::{self, LinkedResult};
use crate::config::EngineConfig;
use crate::dispatch::{self, Mode};
use crate::geometry::{GeometryError, GeometryTracker};
use crate::model::{
    Button, ButtonId, CanvasDoc, Page, PageId, PartialButton, Position, PositionMap, Size, SizeMap, TimerAction,
};
use crate::resolve::{self, PositionRecord};
use crate::store::{NotifyLevel, StoreError, ViewerKind};
use crate::timer::{self, Gate, LockState, LockTable};

/// Actions returned from engine operations for the host to process.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Send a sparse update to the remote button store.
    ButtonUpdated { id: ButtonId, fields: PartialButton },
    SelectionChanged(Option<ButtonId>),
    /// The current page changed to this page.
    NavigateTo(PageId),
    /// Optional convenience scroll to a linked button.
    ScrollTo { page: PageId, button: ButtonId },
    OpenViewer { url: String, kind: ViewerKind },
    /// A timer-gated click was accepted; it takes effect at `unlock_at`.
    TimerStarted { id: ButtonId, unlock_at: i64 },
    /// A click hit a locked button.
    ClickRejected { id: ButtonId, remaining_secs: u64 },
    /// A drag or resize was refused; the prior geometry is kept.
    GeometryRejected { id: ButtonId, reason: GeometryError },
    Notify { level: NotifyLevel, message: String },
    RenderNeeded,
}

/// Identifies one in-flight page load. Results for a superseded ticket are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    pub page_id: PageId,
    generation: u64,
}

/// Geometry waiting for the external bulk save.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PendingSave {
    pub page_id: PageId,
    pub positions: Vec<PositionRecord>,
    pub sizes: Vec<(ButtonId, Size)>,
}

/// Core engine state.
pub struct EngineCore<C: LocalCache> {
    pub doc: CanvasDoc,
    cache: C,
    config: EngineConfig,
    mode: Mode,
    current_page: Option<PageId>,
    generation: u64,
    geometry: GeometryTracker,
    locks: LockTable,
    selection: Option<ButtonId>,
}

impl<C: LocalCache> EngineCore<C> {
    /// Create an engine over `cache`, restoring any cached timer locks.
    pub fn new(cache: C, config: EngineConfig) -> Self {
        let locks = LockTable::from_deadlines(cache::read_locks(&cache));
        Self {
            doc: CanvasDoc::new(),
            cache,
            config,
            mode: Mode::Edit,
            current_page: None,
            generation: 0,
            geometry: GeometryTracker::new(),
            locks,
            selection: None,
        }
    }

    // --- Data inputs ---

    /// Hydrate from a fresh page list and clean the cache against it.
    ///
    /// If the current page survives the reload it is resolved again, so
    /// buttons added to it get a position before the next paint.
    pub fn load_pages(&mut self, pages: Vec<Page>) -> Vec<Action> {
        self.doc.load_pages(pages);
        let mut actions = self.reconcile();
        match self.current_page {
            Some(page_id) => actions.extend(self.activate_page(&page_id, None)),
            None => actions.push(Action::RenderNeeded),
        }
        actions
    }

    /// Replace one page's buttons with a freshly fetched list.
    pub fn replace_buttons(&mut self, page_id: &PageId, buttons: Vec<Button>) -> Vec<Action> {
        if !self.doc.replace_buttons(page_id, buttons) {
            debug!(%page_id, "buttons for unknown page ignored");
            return Vec::new();
        }
        let mut actions = self.reconcile();
        if self.current_page.as_ref() == Some(page_id) {
            actions.extend(self.activate_page(page_id, None));
        }
        actions
    }

    /// Remove a page and everything cached for its buttons.
    pub fn remove_page(&mut self, page_id: &PageId) -> Vec<Action> {
        let Some(page) = self.doc.remove_page(page_id) else {
            return Vec::new();
        };
        let ids: Vec<ButtonId> = page.buttons.iter().map(|b| b.id).collect();
        let mut actions = Vec::new();
        if let Err(e) = cache::forget_page(&mut self.cache, page_id, &ids) {
            actions.push(cache_failure("page cleanup", &e));
        }
        self.geometry.forget_page(page_id);
        self.locks.retain(|id| !ids.contains(id));
        if self.selection.is_some_and(|s| ids.contains(&s)) {
            self.selection = None;
            actions.push(Action::SelectionChanged(None));
        }
        if self.current_page.as_ref() == Some(page_id) {
            self.current_page = None;
            self.generation += 1;
        }
        actions.push(Action::RenderNeeded);
        actions
    }

    fn reconcile(&mut self) -> Vec<Action> {
        let mut actions = Vec::new();
        let page_ids: HashSet<PageId> = self.doc.pages().iter().map(|p| p.id).collect();
        let button_ids = self.doc.button_ids();

        match cache::reconcile(&mut self.cache, &page_ids, &button_ids) {
            Ok(summary) if summary.removed_keys + summary.removed_entries > 0 => {
                debug!(keys = summary.removed_keys, entries = summary.removed_entries, "cache reconciled");
            }
            Ok(_) => {}
            Err(e) => actions.push(cache_failure("cache cleanup", &e)),
        }

        self.geometry.retain(&button_ids);
        self.locks.retain(|id| button_ids.contains(id));
        if self.selection.is_some_and(|s| !button_ids.contains(&s)) {
            self.selection = None;
            actions.push(Action::SelectionChanged(None));
        }
        if self.current_page.is_some_and(|p| !page_ids.contains(&p)) {
            self.current_page = None;
            self.generation += 1;
        }
        actions
    }

    // --- Page activation ---

    /// Start loading `page_id`: show it at once from cache and grid defaults,
    /// and hand back a ticket for the remote position fetch.
    pub fn begin_page_load(&mut self, page_id: PageId) -> (LoadTicket, Vec<Action>) {
        self.generation += 1;
        self.current_page = Some(page_id);
        let actions = self.activate_page(&page_id, None);
        (LoadTicket { page_id, generation: self.generation }, actions)
    }

    /// Apply the result of a remote position fetch started by `begin_page_load`.
    ///
    /// Stale tickets are discarded. A failed fetch is reported and the page
    /// is resolved without a remote layer: cached positions still apply, and
    /// grid defaults fill every button the cache does not place.
    pub fn finish_page_load(
        &mut self,
        ticket: LoadTicket,
        result: Result<Vec<PositionRecord>, StoreError>,
    ) -> Vec<Action> {
        if ticket.generation != self.generation || self.current_page != Some(ticket.page_id) {
            debug!(page_id = %ticket.page_id, "discarding positions for a page no longer shown");
            return Vec::new();
        }
        match result {
            Ok(records) => {
                let external = match self.doc.page(&ticket.page_id) {
                    Some(page) => resolve::external_positions(&page.buttons.iter().collect::<Vec<_>>(), &records),
                    None => PositionMap::new(),
                };
                self.activate_page(&ticket.page_id, Some(&external))
            }
            Err(e) => {
                warn!(page_id = %ticket.page_id, error = %e, "position fetch failed; using local layout");
                let mut actions = vec![Action::Notify {
                    level: NotifyLevel::Warning,
                    message: "Could not load saved button positions; using the local layout.".into(),
                }];
                actions.extend(self.activate_page(&ticket.page_id, None));
                actions
            }
        }
    }

    /// Resolve positions for `page_id` and make it the current page.
    ///
    /// `external` is a remote or shared-view map; entries for buttons not on
    /// the page are pruned before use. The merged map is written back to the
    /// cache.
    pub fn activate_page(&mut self, page_id: &PageId, external: Option<&PositionMap>) -> Vec<Action> {
        let Some(page) = self.doc.page(page_id) else {
            debug!(%page_id, "activation of unknown page ignored");
            return Vec::new();
        };
        if self.current_page.as_ref() != Some(page_id) {
            self.current_page = Some(*page_id);
            self.generation += 1;
        }

        let buttons: Vec<&Button> = page.buttons.iter().collect();
        let existing: HashSet<ButtonId> = buttons.iter().map(|b| b.id).collect();
        let pruned = external.map(|m| resolve::prune_positions(m, &existing));
        let cached_positions = cache::read_positions(&self.cache, page_id);
        let resolution = resolve::resolve_positions(&buttons, pruned.as_ref(), &cached_positions, &self.config);

        let cached_sizes = cache::read_sizes(&self.cache, page_id);
        let sizes: SizeMap = buttons
            .iter()
            .filter_map(|b| {
                let explicit = match (b.width, b.height) {
                    (Some(width), Some(height)) => Some(Size::new(width, height)).filter(Size::is_valid),
                    _ => None,
                };
                cached_sizes.get(&b.id).copied().or(explicit).map(|s| (b.id, s))
            })
            .collect();

        info!(
            %page_id,
            buttons = buttons.len(),
            remote = resolution.from_remote,
            cached = resolution.from_cache,
            grid = resolution.from_grid,
            "page positions resolved"
        );

        let mut actions = Vec::new();
        if let Err(e) = cache::write_positions(&mut self.cache, page_id, &resolution.positions) {
            actions.push(cache_failure("position cache", &e));
        }
        self.geometry.load(*page_id, resolution.positions, sizes);
        actions.push(Action::RenderNeeded);
        actions
    }

    // --- Mode ---

    /// Switch between edit and live mode. Entering live mode clears selection.
    pub fn set_mode(&mut self, mode: Mode) -> Vec<Action> {
        self.mode = mode;
        let mut actions = Vec::new();
        if mode == Mode::Live && self.selection.take().is_some() {
            actions.push(Action::SelectionChanged(None));
        }
        actions.push(Action::RenderNeeded);
        actions
    }

    // --- Geometry ---

    /// Commit the end of a drag.
    pub fn commit_drag(&mut self, id: &ButtonId, to: Position) -> Vec<Action> {
        let Some(button) = self.doc.button(id) else {
            debug!(%id, "drag of unknown button ignored");
            return Vec::new();
        };
        if let Err(reason) = self.geometry.commit_drag(button, self.mode, to) {
            debug!(%id, %reason, "drag rejected");
            return vec![Action::GeometryRejected { id: *id, reason }];
        }
        let mut actions = Vec::new();
        if let Some(page_id) = self.geometry.page_id() {
            if let Err(e) = cache::write_positions(&mut self.cache, &page_id, self.geometry.positions()) {
                actions.push(cache_failure("position cache", &e));
            }
        }
        actions.push(Action::RenderNeeded);
        actions
    }

    /// Resize in progress. Intentionally commits nothing; only `commit_resize` does.
    #[must_use]
    pub fn on_resize(&self, _id: &ButtonId, _size: Size) -> Vec<Action> {
        Vec::new()
    }

    /// Commit the end of a resize.
    pub fn commit_resize(&mut self, id: &ButtonId, to: Size) -> Vec<Action> {
        let Some(button) = self.doc.button(id) else {
            debug!(%id, "resize of unknown button ignored");
            return Vec::new();
        };
        if let Err(reason) = self.geometry.commit_resize(button, self.mode, to, &self.config) {
            debug!(%id, %reason, "resize rejected");
            return vec![Action::GeometryRejected { id: *id, reason }];
        }
        let mut actions = Vec::new();
        if let Some(page_id) = self.geometry.page_id() {
            if let Err(e) = cache::write_sizes(&mut self.cache, &page_id, self.geometry.sizes()) {
                actions.push(cache_failure("size cache", &e));
            }
        }
        actions.push(Action::RenderNeeded);
        actions
    }

    /// Whether `page_id` has geometry not yet bulk-saved.
    #[must_use]
    pub fn has_unsaved_changes(&self, page_id: &PageId) -> bool {
        self.geometry.has_unsaved(page_id)
    }

    /// Geometry of the current page, shaped for the external bulk save.
    #[must_use]
    pub fn pending_save(&self) -> Option<PendingSave> {
        let page_id = self.geometry.page_id()?;
        Some(PendingSave {
            page_id,
            positions: self.geometry.positions().iter().map(|(id, pos)| PositionRecord::new(*id, *pos)).collect(),
            sizes: self.geometry.sizes().iter().map(|(id, size)| (*id, *size)).collect(),
        })
    }

    /// Clear the unsaved flag once the bulk save succeeded.
    pub fn mark_saved(&mut self, page_id: &PageId) {
        self.geometry.mark_saved(page_id);
    }

    // --- Visibility and presentation ---

    /// Show or hide a button. Geometry is never touched.
    pub fn set_active(&mut self, id: &ButtonId, active: bool) -> Vec<Action> {
        let fields = PartialButton { is_active: Some(active), ..Default::default() };
        if !self.doc.apply_partial(id, &fields) {
            debug!(%id, "visibility change for unknown button ignored");
            return Vec::new();
        }
        vec![Action::ButtonUpdated { id: *id, fields }, Action::RenderNeeded]
    }

    /// Set a button's background color, cached locally and sent to the store.
    pub fn set_background_color(&mut self, id: &ButtonId, color: &str) -> Vec<Action> {
        let fields = PartialButton { background_color: Some(color.to_string()), ..Default::default() };
        if !self.doc.apply_partial(id, &fields) {
            debug!(%id, "color change for unknown button ignored");
            return Vec::new();
        }
        let mut actions = Vec::new();
        if let Err(e) = cache::write_color(&mut self.cache, id, color) {
            actions.push(cache_failure("color cache", &e));
        }
        actions.push(Action::ButtonUpdated { id: *id, fields });
        actions.push(Action::RenderNeeded);
        actions
    }

    /// Background color to paint: the cached override, else the record's.
    #[must_use]
    pub fn background_color(&self, id: &ButtonId) -> Option<String> {
        cache::read_color(&self.cache, id).or_else(|| self.doc.button(id).map(|b| b.background_color.clone()))
    }

    // --- Clicks and timers ---

    /// Handle a click on `id` at wall-clock time `now` (ms since epoch).
    pub fn click(&mut self, id: &ButtonId, now: i64) -> Vec<Action> {
        if self.mode == Mode::Edit {
            return dispatch::dispatch(&mut self.doc, &mut self.selection, id, Mode::Edit);
        }

        let mut actions = self.tick(now);
        let Some(button) = self.doc.button(id) else {
            debug!(%id, "click on unknown button ignored");
            return actions;
        };
        if !button.is_active {
            debug!(%id, "click on hidden button ignored");
            return actions;
        }
        let timer = button.timer;

        match self.locks.gate(button, now) {
            Gate::Open => actions.extend(self.run_activation(id)),
            Gate::Armed { unlock_at } => {
                actions.extend(self.persist_locks());
                actions.push(Action::TimerStarted { id: *id, unlock_at });
                actions.push(Action::RenderNeeded);
            }
            Gate::Rejected { remaining_secs } => {
                debug!(%id, remaining_secs, "click rejected while locked");
                actions.push(Action::ClickRejected { id: *id, remaining_secs });
                if timer.display.as_toast() {
                    actions.push(Action::Notify {
                        level: NotifyLevel::Info,
                        message: timer::lock_message(timer.kind, remaining_secs),
                    });
                }
            }
        }
        actions
    }

    /// Sweep expired locks and run their deferred activations.
    pub fn tick(&mut self, now: i64) -> Vec<Action> {
        let expired = self.locks.sweep(now);
        if expired.is_empty() {
            return Vec::new();
        }
        let mut actions = self.persist_locks();
        for id in expired {
            let Some(hide) = self.doc.button(&id).map(|b| b.timer.action == TimerAction::Hide) else {
                debug!(%id, "expired lock for a button that no longer exists");
                continue;
            };
            actions.extend(self.run_activation(&id));
            if hide {
                actions.extend(self.set_active(&id, false));
            }
        }
        actions
    }

    /// Run a live activation. In edit mode (a deferred activation firing
    /// after the operator left live mode) the click is still counted but
    /// navigation, scrolling and viewers are dropped.
    fn run_activation(&mut self, id: &ButtonId) -> Vec<Action> {
        let mut actions = dispatch::activate(&mut self.doc, id);
        if self.mode == Mode::Edit {
            actions.retain(|a| {
                !matches!(a, Action::NavigateTo(_) | Action::ScrollTo { .. } | Action::OpenViewer { .. })
            });
            debug!(%id, "deferred activation in edit mode; effects dropped");
            return actions;
        }
        let targets: Vec<PageId> = actions
            .iter()
            .filter_map(|a| match a {
                Action::NavigateTo(page) => Some(*page),
                _ => None,
            })
            .collect();
        for page in targets {
            actions.extend(self.activate_page(&page, None));
        }
        actions
    }

    fn persist_locks(&mut self) -> Vec<Action> {
        match cache::write_locks(&mut self.cache, self.locks.deadlines()) {
            Ok(()) => Vec::new(),
            Err(e) => vec![cache_failure("timer cache", &e)],
        }
    }

    /// Seconds until `id` can be clicked again.
    #[must_use]
    pub fn remaining_secs(&self, id: &ButtonId, now: i64) -> u64 {
        self.locks.remaining(id, now)
    }

    #[must_use]
    pub fn lock_state(&self, id: &ButtonId, now: i64) -> Option<LockState> {
        self.doc.button(id).map(|b| self.locks.state(b, now))
    }

    /// Remaining-time label for the button face, when its timer shows one.
    #[must_use]
    pub fn timer_label(&self, id: &ButtonId, now: i64) -> Option<String> {
        self.doc.button(id).and_then(|b| self.locks.label(b, now))
    }

    // --- Links ---

    /// Derived values for every linked pair across all pages.
    #[must_use]
    pub fn compute_links(&self) -> Vec<LinkedResult> {
        calc::compute_all(self.doc.buttons())
    }

    // --- Queries ---

    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    #[must_use]
    pub fn current_page(&self) -> Option<PageId> {
        self.current_page
    }

    #[must_use]
    pub fn selection(&self) -> Option<ButtonId> {
        self.selection
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub fn cache(&self) -> &C {
        &self.cache
    }

    #[must_use]
    pub fn positions(&self) -> &PositionMap {
        self.geometry.positions()
    }

    #[must_use]
    pub fn position(&self, id: &ButtonId) -> Option<Position> {
        self.geometry.position(id)
    }

    /// Committed size, else the record's size, else the configured default.
    #[must_use]
    pub fn size(&self, id: &ButtonId) -> Option<Size> {
        self.geometry.size(id).or_else(|| self.doc.button(id).map(|b| b.size_or_default(&self.config)))
    }

    #[must_use]
    pub fn button(&self, id: &ButtonId) -> Option<&Button> {
        self.doc.button(id)
    }

    /// Buttons of the current page to render. Live mode hides inactive ones.
    #[must_use]
    pub fn visible_buttons(&self) -> Vec<&Button> {
        let Some(page) = self.current_page.and_then(|p| self.doc.page(&p)) else {
            return Vec::new();
        };
        page.buttons.iter().filter(|b| self.mode == Mode::Edit || b.is_active).collect()
    }
}

fn cache_failure(context: &str, e: &CacheError) -> Action {
    warn!(context, error = %e, "local cache write failed");
    Action::Notify { level: NotifyLevel::Warning, message: format!("Could not save {context}: {e}") }
}
