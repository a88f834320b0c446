//! Demo host: drives one scripted editing and live session against the
//! in-memory stores and logs every action the engine hands back.

use std::process::ExitCode;
use std::sync::Arc;

use buttonboard::cache::MemoryCache;
use buttonboard::config::EngineConfig;
use buttonboard::dispatch::Mode;
use buttonboard::engine::{Action, EngineCore};
use buttonboard::model::{Button, ButtonAction, ButtonKind, CalcOp, Calculation, Page, Position, Size, TimerConfig};
use buttonboard::store::{MemoryStore, StoreError, TracingNotifier, Viewer, ViewerKind};
use buttonboard::{sync, timer};
use tokio::sync::{Mutex, mpsc};
use tracing::{error, info};
use uuid::Uuid;

/// Viewer that only logs what it would open.
struct LogViewer;

impl Viewer for LogViewer {
    fn open(&self, url: &str, kind: &ViewerKind) {
        info!(url, ?kind, "open viewer");
    }
}

fn demo_pages() -> Vec<Page> {
    let home_id = Uuid::new_v4();
    let media_id = Uuid::new_v4();

    let mut to_media = Button::new(Uuid::new_v4(), home_id);
    to_media.text = "Media".into();
    to_media.kind = ButtonKind::Page;
    to_media.action = ButtonAction::Page { target_page: media_id };

    let mut counter = Button::new(Uuid::new_v4(), home_id);
    counter.text = "Counter".into();
    counter.timer = TimerConfig { enabled: true, duration: 2, ..Default::default() };

    let mut total = Button::new(Uuid::new_v4(), home_id);
    total.text = "Total".into();
    total.linked_button_id = Some(counter.id);
    total.calculation = Calculation { op: CalcOp::Add, enabled: true };

    let mut clip = Button::new(Uuid::new_v4(), media_id);
    clip.text = "Clip".into();
    clip.kind = ButtonKind::Media;
    clip.action = ButtonAction::Media { url: "https://example.com/clip.mp4".into(), media_type: "video".into() };

    vec![
        Page { buttons: vec![to_media, counter, total], ..Page::new(home_id, "Home", 0) },
        Page { buttons: vec![clip], ..Page::new(media_id, "Media", 1) },
    ]
}

fn log_actions(actions: &[Action]) {
    for action in actions {
        info!(?action, "engine action");
    }
}

async fn run() -> Result<(), StoreError> {
    let config = EngineConfig::from_env();
    info!(?config, "engine configured");

    let store = MemoryStore::new(demo_pages());
    let viewer = LogViewer;
    let notifier = TracingNotifier;
    let mut engine = EngineCore::new(MemoryCache::new(), config);

    log_actions(&sync::hydrate(&mut engine, &store).await?);
    let Some(home) = engine.doc.pages().first().map(|p| p.id) else {
        return Err(StoreError::Unavailable("no pages to show".into()));
    };
    let ids: Vec<Uuid> = engine.doc.page(&home).map(|p| p.buttons.iter().map(|b| b.id).collect()).unwrap_or_default();
    let [to_media, counter, total] = ids[..] else {
        return Err(StoreError::PageNotFound(home));
    };

    // Edit session: rearrange and resize, then bulk-save.
    log_actions(&sync::load_page(&mut engine, &store, home).await);
    log_actions(&engine.commit_drag(&total, Position::new(380.0, 220.0)));
    log_actions(&engine.commit_resize(&total, Size::new(240.0, 120.0)));
    let saved = sync::save_layout(&mut engine, &store, &store).await?;
    info!(saved, "layout saved");

    // Live session: click the timed counter twice, then navigate.
    log_actions(&engine.set_mode(Mode::Live));
    let now = timer::now_ms();
    for id in [counter, counter] {
        let actions = engine.click(&id, now);
        sync::apply_actions(actions, &store, &viewer, &notifier).await;
    }

    let engine = Arc::new(Mutex::new(engine));
    let (tx, mut rx) = mpsc::channel(16);
    let sweeper = sync::spawn_lock_sweeper(Arc::clone(&engine), tx);
    if let Some(actions) = rx.recv().await {
        sync::apply_actions(actions, &store, &viewer, &notifier).await;
    }
    drop(rx);
    if let Err(e) = sweeper.await {
        error!(error = %e, "lock sweeper task failed");
    }

    let mut engine = engine.lock().await;
    for result in engine.compute_links() {
        info!(pair = ?result.pair, value = %result.formatted(), "linked value");
    }
    let actions = engine.click(&to_media, timer::now_ms());
    sync::apply_actions(actions, &store, &viewer, &notifier).await;
    if let Some(page) = engine.current_page() {
        let (ticket, actions) = engine.begin_page_load(page);
        log_actions(&actions);
        let (ticket, result) = sync::fetch_positions(&store, ticket).await;
        log_actions(&engine.finish_page_load(ticket, result));
    }
    let visible: Vec<Uuid> = engine.visible_buttons().iter().map(|b| b.id).collect();
    for id in visible {
        let actions = engine.click(&id, timer::now_ms());
        sync::apply_actions(actions, &store, &viewer, &notifier).await;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "demo session failed");
            ExitCode::FAILURE
        }
    }
}
