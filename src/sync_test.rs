#![allow(clippy::float_cmp)]

use std::sync::Mutex as StdMutex;

use uuid::Uuid;

use super::*;
use crate::cache::MemoryCache;
use crate::config::EngineConfig;
use crate::dispatch::Mode;
use crate::model::{Button, ButtonAction, ButtonKind, Page, Position, Size, TimerConfig};
use crate::store::{MemoryStore, ViewerKind};

const HOME: u128 = 1000;
const MEDIA: u128 = 2000;

fn id(n: u128) -> Uuid {
    Uuid::from_u128(n)
}

fn seeded_store() -> MemoryStore {
    let mut video = Button::new(id(3), id(MEDIA));
    video.kind = ButtonKind::Media;
    video.action = ButtonAction::Media { url: "https://cdn/v.mp4".into(), media_type: "video".into() };
    let home = Page {
        buttons: vec![Button::new(id(1), id(HOME)), Button::new(id(2), id(HOME))],
        ..Page::new(id(HOME), "home", 0)
    };
    let media = Page { buttons: vec![video], ..Page::new(id(MEDIA), "media", 1) };
    MemoryStore::new(vec![home, media])
}

fn engine() -> EngineCore<MemoryCache> {
    EngineCore::new(MemoryCache::new(), EngineConfig::default())
}

#[derive(Default)]
struct RecordingViewer {
    opened: StdMutex<Vec<(String, ViewerKind)>>,
}

impl Viewer for RecordingViewer {
    fn open(&self, url: &str, kind: &ViewerKind) {
        self.opened.lock().unwrap().push((url.to_string(), kind.clone()));
    }
}

#[derive(Default)]
struct RecordingNotifier {
    seen: StdMutex<Vec<(String, NotifyLevel)>>,
}

impl Notifier for RecordingNotifier {
    fn notify(&self, message: &str, level: NotifyLevel) {
        self.seen.lock().unwrap().push((message.to_string(), level));
    }
}

// =============================================================
// Loading
// =============================================================

#[tokio::test]
async fn hydrate_loads_every_page() {
    let store = seeded_store();
    let mut engine = engine();
    let actions = hydrate(&mut engine, &store).await.unwrap();
    assert!(actions.contains(&Action::RenderNeeded));
    assert_eq!(engine.doc.pages().len(), 2);
    assert_eq!(engine.doc.len(), 3);
}

#[tokio::test]
async fn hydrate_failure_leaves_engine_empty() {
    let store = seeded_store();
    store.set_offline(true);
    let mut engine = engine();
    assert!(hydrate(&mut engine, &store).await.is_err());
    assert!(engine.doc.is_empty());
}

#[tokio::test]
async fn load_page_prefers_stored_positions() {
    let store = seeded_store();
    store.upsert_position(PositionRecord::new(id(2), Position::new(500.0, 40.0))).await.unwrap();
    let mut engine = engine();
    hydrate(&mut engine, &store).await.unwrap();

    load_page(&mut engine, &store, id(HOME)).await;
    assert_eq!(engine.position(&id(2)), Some(Position::new(500.0, 40.0)));
    assert_eq!(engine.position(&id(1)), Some(Position::new(20.0, 20.0)));
}

#[tokio::test]
async fn load_page_offline_falls_back_with_warning() {
    let store = seeded_store();
    let mut engine = engine();
    hydrate(&mut engine, &store).await.unwrap();
    store.set_offline(true);

    let actions = load_page(&mut engine, &store, id(HOME)).await;
    assert!(actions.iter().any(|a| matches!(a, Action::Notify { level: NotifyLevel::Warning, .. })));
    assert_eq!(engine.positions().len(), 2);
}

#[tokio::test]
async fn result_for_superseded_ticket_is_dropped() {
    let store = seeded_store();
    store.upsert_position(PositionRecord::new(id(1), Position::new(700.0, 700.0))).await.unwrap();
    let mut engine = engine();
    hydrate(&mut engine, &store).await.unwrap();

    let (ticket, _) = engine.begin_page_load(id(HOME));
    let pending = fetch_positions(&store, ticket);
    engine.begin_page_load(id(MEDIA));
    let (ticket, result) = pending.await;

    assert!(engine.finish_page_load(ticket, result).is_empty());
    assert_eq!(engine.current_page(), Some(id(MEDIA)));
}

// =============================================================
// Saving
// =============================================================

#[tokio::test]
async fn save_layout_writes_and_clears_unsaved() {
    let store = seeded_store();
    let mut engine = engine();
    hydrate(&mut engine, &store).await.unwrap();
    load_page(&mut engine, &store, id(HOME)).await;

    assert_eq!(save_layout(&mut engine, &store, &store).await.unwrap(), 0);

    engine.commit_drag(&id(1), Position::new(42.0, 43.0));
    engine.commit_resize(&id(1), Size::new(200.0, 120.0));
    assert_eq!(save_layout(&mut engine, &store, &store).await.unwrap(), 2);
    assert!(!engine.has_unsaved_changes(&id(HOME)));

    let stored = store.get_all_positions(Some(id(HOME))).await.unwrap();
    assert!(stored.contains(&PositionRecord::new(id(1), Position::new(42.0, 43.0))));
    let buttons = store.get_buttons(id(HOME)).await.unwrap();
    let resized = buttons.iter().find(|b| b.id == id(1)).unwrap();
    assert_eq!((resized.width, resized.height), (Some(200.0), Some(120.0)));
}

#[tokio::test]
async fn failed_save_keeps_page_unsaved() {
    let store = seeded_store();
    let mut engine = engine();
    hydrate(&mut engine, &store).await.unwrap();
    load_page(&mut engine, &store, id(HOME)).await;
    engine.commit_drag(&id(2), Position::new(1.0, 1.0));

    store.set_offline(true);
    assert!(save_layout(&mut engine, &store, &store).await.is_err());
    assert!(engine.has_unsaved_changes(&id(HOME)));
}

// =============================================================
// Actions
// =============================================================

#[tokio::test]
async fn live_click_actions_reach_store_and_viewer() {
    let store = seeded_store();
    let viewer = RecordingViewer::default();
    let notifier = RecordingNotifier::default();
    let mut engine = engine();
    hydrate(&mut engine, &store).await.unwrap();
    load_page(&mut engine, &store, id(MEDIA)).await;
    engine.set_mode(Mode::Live);

    let actions = engine.click(&id(3), 0);
    let failures = apply_actions(actions, &store, &viewer, &notifier).await;

    assert_eq!(failures, 0);
    let buttons = store.get_buttons(id(MEDIA)).await.unwrap();
    assert_eq!(buttons[0].clicks, 1);
    let opened = viewer.opened.lock().unwrap();
    assert_eq!(opened.len(), 1);
    assert_eq!(opened[0], ("https://cdn/v.mp4".to_string(), ViewerKind::Media { media_type: "video".into() }));
    assert!(notifier.seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn failed_update_is_counted_and_notified() {
    let store = seeded_store();
    let viewer = RecordingViewer::default();
    let notifier = RecordingNotifier::default();
    store.set_offline(true);

    let actions = vec![
        Action::ButtonUpdated { id: id(1), fields: PartialButton { clicks: Some(1), ..Default::default() } },
        Action::Notify { level: NotifyLevel::Info, message: "hello".into() },
        Action::RenderNeeded,
    ];
    let failures = apply_actions(actions, &store, &viewer, &notifier).await;

    assert_eq!(failures, 1);
    let seen = notifier.seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].1, NotifyLevel::Error);
    assert_eq!(seen[1], ("hello".to_string(), NotifyLevel::Info));
}

// =============================================================
// Lock sweeper
// =============================================================

#[tokio::test]
async fn sweeper_fires_expired_locks() {
    let mut button = Button::new(id(1), id(HOME));
    button.timer = TimerConfig { enabled: true, duration: 1, ..Default::default() };
    let config = EngineConfig { sweep_interval_ms: 10, ..EngineConfig::default() };
    let mut engine = EngineCore::new(MemoryCache::new(), config);
    engine.load_pages(vec![Page { buttons: vec![button], ..Page::new(id(HOME), "home", 0) }]);
    engine.set_mode(Mode::Live);
    engine.click(&id(1), timer::now_ms() - 2_000);

    let engine = Arc::new(Mutex::new(engine));
    let (tx, mut rx) = mpsc::channel(4);
    let handle = spawn_lock_sweeper(Arc::clone(&engine), tx);

    let actions = rx.recv().await.unwrap();
    assert!(actions.iter().any(|a| matches!(a, Action::ButtonUpdated { .. })));
    assert_eq!(engine.lock().await.button(&id(1)).map(|b| b.clicks), Some(1));

    drop(rx);
    handle.await.unwrap();
}
