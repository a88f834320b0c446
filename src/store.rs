//! Contracts for the collaborators the engine talks to.
//!
//! ARCHITECTURE
//! ============
//! The remote position store and the remote page/button store are async and
//! may fail; the engine treats every failure as non-fatal. The viewer and the
//! notification sink are fire-and-forget. `MemoryStore` implements both
//! remote stores in process for tests and the demo host, with a switch to
//! simulate an unreachable backend.

#[cfg(test)]
#[path = "store_test.rs"]
mod store_test;

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::model::{Button, ButtonId, Page, PageId, PartialButton};
use crate::resolve::PositionRecord;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("page not found: {0}")]
    PageNotFound(PageId),
    #[error("button not found: {0}")]
    ButtonNotFound(ButtonId),
}

/// Severity of a user-facing notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifyLevel {
    Info,
    Warning,
    Error,
}

/// What a viewer is asked to show.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ViewerKind {
    #[serde(rename_all = "camelCase")]
    Media { media_type: String },
    #[serde(rename_all = "camelCase")]
    File { file_name: String, file_type: String },
}

// =============================================================================
// CONTRACTS
// =============================================================================

#[async_trait]
pub trait PositionStore: Send + Sync {
    /// Stored positions, for one page or for every page.
    async fn get_all_positions(&self, page_id: Option<PageId>) -> Result<Vec<PositionRecord>, StoreError>;

    async fn upsert_position(&self, record: PositionRecord) -> Result<(), StoreError>;
}

#[async_trait]
pub trait ButtonStore: Send + Sync {
    async fn get_pages(&self) -> Result<Vec<Page>, StoreError>;

    async fn get_buttons(&self, page_id: PageId) -> Result<Vec<Button>, StoreError>;

    async fn update_button(&self, id: ButtonId, fields: PartialButton) -> Result<(), StoreError>;

    async fn create_button(&self, button: Button) -> Result<Button, StoreError>;

    async fn delete_button(&self, id: ButtonId) -> Result<(), StoreError>;
}

pub trait Viewer {
    fn open(&self, url: &str, kind: &ViewerKind);
}

pub trait Notifier {
    fn notify(&self, message: &str, level: NotifyLevel);
}

/// Notifier that forwards to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, message: &str, level: NotifyLevel) {
        match level {
            NotifyLevel::Info => tracing::info!("{message}"),
            NotifyLevel::Warning => tracing::warn!("{message}"),
            NotifyLevel::Error => tracing::error!("{message}"),
        }
    }
}

// =============================================================================
// IN-MEMORY STORE
// =============================================================================

#[derive(Debug, Default)]
struct MemoryInner {
    pages: Vec<Page>,
    positions: BTreeMap<ButtonId, PositionRecord>,
    offline: bool,
}

/// Both remote stores, held in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

impl MemoryStore {
    #[must_use]
    pub fn new(pages: Vec<Page>) -> Self {
        Self { inner: Mutex::new(MemoryInner { pages, ..Default::default() }) }
    }

    /// Make every call fail with `Unavailable` until switched back.
    pub fn set_offline(&self, offline: bool) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.offline = offline;
        }
    }

    fn with<T>(&self, f: impl FnOnce(&mut MemoryInner) -> Result<T, StoreError>) -> Result<T, StoreError> {
        let mut inner = self.inner.lock().map_err(|_| StoreError::Unavailable("store lock poisoned".into()))?;
        if inner.offline {
            return Err(StoreError::Unavailable("offline".into()));
        }
        f(&mut inner)
    }
}

fn find_button<'a>(pages: &'a mut [Page], id: &ButtonId) -> Option<&'a mut Button> {
    pages.iter_mut().flat_map(|p| p.buttons.iter_mut()).find(|b| &b.id == id)
}

#[async_trait]
impl PositionStore for MemoryStore {
    async fn get_all_positions(&self, page_id: Option<PageId>) -> Result<Vec<PositionRecord>, StoreError> {
        self.with(|inner| {
            let on_page = |id: &ButtonId| match page_id {
                None => true,
                Some(page) => inner.pages.iter().any(|p| p.id == page && p.buttons.iter().any(|b| &b.id == id)),
            };
            Ok(inner.positions.values().filter(|r| on_page(&r.button_id)).copied().collect())
        })
    }

    async fn upsert_position(&self, record: PositionRecord) -> Result<(), StoreError> {
        self.with(|inner| {
            inner.positions.insert(record.button_id, record);
            Ok(())
        })
    }
}

#[async_trait]
impl ButtonStore for MemoryStore {
    async fn get_pages(&self) -> Result<Vec<Page>, StoreError> {
        self.with(|inner| Ok(inner.pages.clone()))
    }

    async fn get_buttons(&self, page_id: PageId) -> Result<Vec<Button>, StoreError> {
        self.with(|inner| {
            inner
                .pages
                .iter()
                .find(|p| p.id == page_id)
                .map(|p| p.buttons.clone())
                .ok_or(StoreError::PageNotFound(page_id))
        })
    }

    async fn update_button(&self, id: ButtonId, fields: PartialButton) -> Result<(), StoreError> {
        self.with(|inner| {
            let button = find_button(&mut inner.pages, &id).ok_or(StoreError::ButtonNotFound(id))?;
            button.apply(&fields);
            Ok(())
        })
    }

    async fn create_button(&self, button: Button) -> Result<Button, StoreError> {
        self.with(|inner| {
            let page = inner
                .pages
                .iter_mut()
                .find(|p| p.id == button.page_id)
                .ok_or(StoreError::PageNotFound(button.page_id))?;
            page.buttons.push(button.clone());
            Ok(button)
        })
    }

    async fn delete_button(&self, id: ButtonId) -> Result<(), StoreError> {
        self.with(|inner| {
            let mut removed = false;
            for page in &mut inner.pages {
                let before = page.buttons.len();
                page.buttons.retain(|b| b.id != id);
                removed |= page.buttons.len() != before;
            }
            if !removed {
                return Err(StoreError::ButtonNotFound(id));
            }
            inner.positions.remove(&id);
            Ok(())
        })
    }
}
