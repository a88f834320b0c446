//! Button canvas state engine for the administrative canvas editor.
//!
//! Operators place, resize, link and time-gate interactive buttons on a
//! per-page canvas; end users later click them to navigate, open media or
//! accumulate counters. This crate owns the stateful core of that editor:
//! resolving where every button sits, committing drag/resize gestures,
//! dispatching clicks, computing linked-button values and running per-button
//! lock timers. The host (renderer plus network layer) feeds events in and
//! carries out the [`engine::Action`]s that come back.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`engine`] | Top-level [`engine::EngineCore`] and the host-facing [`engine::Action`] |
//! | [`model`] | Pages, buttons, their payload types and the in-memory [`model::CanvasDoc`] |
//! | [`resolve`] | Position resolution: remote map, local cache, grid default |
//! | [`geometry`] | Drag/resize commit tracking with validation |
//! | [`dispatch`] | Click semantics for edit and live mode |
//! | [`calc`] | Linked-button pair discovery and derived values |
//! | [`timer`] | Per-button lock windows and expiry sweep |
//! | [`cache`] | Best-effort local key/value cache and its typed entries |
//! | [`store`] | Contracts for the remote stores, viewer and notification sink |
//! | [`sync`] | Async glue between the engine and the remote stores |
//! | [`config`] | Engine tuning knobs loaded from the environment |
//! | [`consts`] | Shared numeric constants and cache key prefixes |

pub mod cache;
pub mod calc;
pub mod config;
pub mod consts;
pub mod dispatch;
pub mod engine;
pub mod geometry;
pub mod model;
pub mod resolve;
pub mod store;
pub mod sync;
pub mod timer;
