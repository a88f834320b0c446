//! Click dispatch for edit and live mode.
//!
//! In edit mode a click only toggles selection. In live mode it bumps the
//! button's click counter and resolves the button's action into host
//! [`Action`]s. A click never mutates any other button. References that no
//! longer resolve (target page, linked button, empty media URL) are logged at
//! debug level and skipped; the counter still advances.
//!
//! Lock gating happens before this module is reached; see [`crate::timer`].

#[cfg(test)]
#[path = "dispatch_test.rs"]
mod dispatch_test;

use tracing::debug;

use crate::engine::Action;
use crate::model::{Button, ButtonAction, ButtonId, ButtonKind, CanvasDoc, PartialButton};
use crate::store::ViewerKind;

/// Interaction mode of the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Drag, resize and selection.
    #[default]
    Edit,
    /// Clicks run button actions as an end user would see them.
    Live,
}

/// Dispatch a click on `id` in `mode`.
pub fn dispatch(doc: &mut CanvasDoc, selection: &mut Option<ButtonId>, id: &ButtonId, mode: Mode) -> Vec<Action> {
    match mode {
        Mode::Edit => {
            if doc.button(id).is_none() {
                debug!(%id, "edit click on unknown button");
                return Vec::new();
            }
            vec![toggle_selection(selection, *id)]
        }
        Mode::Live => activate(doc, id),
    }
}

/// Select `id`, or deselect it if it is already selected.
pub fn toggle_selection(selection: &mut Option<ButtonId>, id: ButtonId) -> Action {
    *selection = if *selection == Some(id) { None } else { Some(id) };
    Action::SelectionChanged(*selection)
}

/// Run a live activation: count the click, then resolve its side effects.
pub fn activate(doc: &mut CanvasDoc, id: &ButtonId) -> Vec<Action> {
    let Some(button) = doc.button_mut(id) else {
        debug!(%id, "live click on unknown button");
        return Vec::new();
    };
    if !button.is_active {
        debug!(%id, "live click on hidden button ignored");
        return Vec::new();
    }
    button.clicks = button.clicks.saturating_add(1);
    let clicks = button.clicks;

    let fields = PartialButton { clicks: Some(clicks), ..Default::default() };
    let mut actions = vec![Action::ButtonUpdated { id: *id, fields }];
    if let Some(button) = doc.button(id) {
        actions.extend(resolve_effects(doc, button));
    }
    actions
}

/// Side effects of a live click on `button`, without touching any counter.
#[must_use]
pub fn resolve_effects(doc: &CanvasDoc, button: &Button) -> Vec<Action> {
    let mut actions = Vec::new();

    if let Some(linked) = button.linked_button_id {
        match doc.page_of(&linked) {
            Some(page) => actions.push(Action::ScrollTo { page, button: linked }),
            None => debug!(id = %button.id, %linked, "linked button no longer exists"),
        }
    }

    let Some(action) = button.effective_action() else {
        if button.kind != ButtonKind::Empty {
            debug!(id = %button.id, kind = ?button.kind, "button has no action matching its kind");
        }
        return actions;
    };

    match action {
        ButtonAction::None => {}
        ButtonAction::Page { target_page } => {
            if doc.page(target_page).is_some() {
                actions.push(Action::NavigateTo(*target_page));
            } else {
                debug!(id = %button.id, %target_page, "target page no longer exists");
            }
        }
        ButtonAction::Media { url, media_type } => {
            if url.trim().is_empty() {
                debug!(id = %button.id, "media button has no media");
            } else {
                actions.push(Action::OpenViewer {
                    url: url.clone(),
                    kind: ViewerKind::Media { media_type: media_type.clone() },
                });
            }
        }
        ButtonAction::File { url, file_name, file_type } => {
            if url.trim().is_empty() {
                debug!(id = %button.id, "file button has no file");
            } else {
                actions.push(Action::OpenViewer {
                    url: url.clone(),
                    kind: ViewerKind::File { file_name: file_name.clone(), file_type: file_type.clone() },
                });
            }
        }
    }
    actions
}
