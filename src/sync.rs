//! Async glue between the engine and its remote collaborators.
//!
//! DESIGN
//! ======
//! The engine is synchronous and never awaits. This module runs the remote
//! calls around it: hydrating pages, fetching a page's stored positions
//! against a load ticket, bulk-saving geometry, and carrying out the actions
//! an engine operation returns. Remote failures never propagate to the host
//! as errors from `apply_actions`; they are logged and surfaced through the
//! notifier.
//!
//! ERROR HANDLING
//! ==============
//! `save_layout` clears the unsaved flag only after every write succeeded.
//! A partial failure leaves the page marked unsaved so the next save retries
//! the whole layout; repeated upserts are harmless.

#[cfg(test)]
#[path = "sync_test.rs"]
mod sync_test;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::cache::LocalCache;
use crate::engine::{Action, EngineCore, LoadTicket};
use crate::model::{PageId, PartialButton};
use crate::resolve::PositionRecord;
use crate::store::{ButtonStore, NotifyLevel, Notifier, PositionStore, StoreError, Viewer};
use crate::timer;

// =============================================================================
// LOADING
// =============================================================================

/// Fetch every page and its buttons, then hand them to the engine.
///
/// # Errors
///
/// Returns the first store failure; the engine is left untouched.
pub async fn hydrate<C: LocalCache>(
    engine: &mut EngineCore<C>,
    store: &dyn ButtonStore,
) -> Result<Vec<Action>, StoreError> {
    let mut pages = store.get_pages().await?;
    for page in &mut pages {
        page.buttons = store.get_buttons(page.id).await?;
    }
    info!(pages = pages.len(), "pages hydrated");
    Ok(engine.load_pages(pages))
}

/// Fetch stored positions for the page a ticket was issued for.
///
/// The ticket comes back with the result so the caller can pass both to
/// [`EngineCore::finish_page_load`] once the engine is available again.
pub async fn fetch_positions(
    store: &dyn PositionStore,
    ticket: LoadTicket,
) -> (LoadTicket, Result<Vec<PositionRecord>, StoreError>) {
    let result = store.get_all_positions(Some(ticket.page_id)).await;
    (ticket, result)
}

/// Show `page_id` at once and settle it against the remote position store.
pub async fn load_page<C: LocalCache>(
    engine: &mut EngineCore<C>,
    store: &dyn PositionStore,
    page_id: PageId,
) -> Vec<Action> {
    let (ticket, mut actions) = engine.begin_page_load(page_id);
    let (ticket, result) = fetch_positions(store, ticket).await;
    actions.extend(engine.finish_page_load(ticket, result));
    actions
}

// =============================================================================
// SAVING
// =============================================================================

/// Bulk-save the current page's positions and sizes. Returns the number of
/// buttons written; 0 when nothing is unsaved.
///
/// # Errors
///
/// Returns the first store failure. The page stays marked unsaved.
pub async fn save_layout<C: LocalCache>(
    engine: &mut EngineCore<C>,
    positions: &dyn PositionStore,
    buttons: &dyn ButtonStore,
) -> Result<usize, StoreError> {
    let Some(pending) = engine.pending_save() else {
        return Ok(0);
    };
    if !engine.has_unsaved_changes(&pending.page_id) {
        return Ok(0);
    }

    for record in &pending.positions {
        positions.upsert_position(*record).await?;
    }
    for (id, size) in &pending.sizes {
        let fields = PartialButton { width: Some(size.width), height: Some(size.height), ..Default::default() };
        buttons.update_button(*id, fields).await?;
    }

    engine.mark_saved(&pending.page_id);
    info!(page_id = %pending.page_id, positions = pending.positions.len(), sizes = pending.sizes.len(), "layout saved");
    Ok(pending.positions.len())
}

// =============================================================================
// ACTIONS
// =============================================================================

/// Carry out the host-facing part of `actions`. Returns how many remote
/// updates failed.
///
/// Button updates go to the store; viewer and notification requests go to
/// their sinks. Navigation, scrolling and render requests are for the
/// rendering layer and are skipped here.
pub async fn apply_actions(
    actions: Vec<Action>,
    store: &dyn ButtonStore,
    viewer: &dyn Viewer,
    notifier: &dyn Notifier,
) -> usize {
    let mut failures = 0;
    for action in actions {
        match action {
            Action::ButtonUpdated { id, fields } => {
                if let Err(e) = store.update_button(id, fields).await {
                    warn!(%id, error = %e, "button update failed");
                    notifier.notify("Could not save the button change.", NotifyLevel::Error);
                    failures += 1;
                }
            }
            Action::OpenViewer { url, kind } => viewer.open(&url, &kind),
            Action::Notify { level, message } => notifier.notify(&message, level),
            other => debug!(action = ?other, "left to the renderer"),
        }
    }
    failures
}

// =============================================================================
// LOCK SWEEPER
// =============================================================================

/// Spawn the periodic lock sweep. Each non-empty batch of actions produced by
/// a sweep is sent on `tx`; the task ends when the receiver is dropped.
#[must_use]
pub fn spawn_lock_sweeper<C>(
    engine: Arc<Mutex<EngineCore<C>>>,
    tx: mpsc::Sender<Vec<Action>>,
) -> JoinHandle<()>
where
    C: LocalCache + Send + 'static,
{
    tokio::spawn(async move {
        let interval_ms = engine.lock().await.config().sweep_interval_ms;
        info!(interval_ms, "lock sweeper started");
        let mut ticker = tokio::time::interval(Duration::from_millis(interval_ms.max(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            if tx.is_closed() {
                debug!("lock sweeper receiver dropped");
                break;
            }
            let actions = engine.lock().await.tick(timer::now_ms());
            if actions.is_empty() {
                continue;
            }
            if tx.send(actions).await.is_err() {
                debug!("lock sweeper receiver dropped");
                break;
            }
        }
    })
}
