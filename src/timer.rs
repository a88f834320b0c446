//! Per-button lock windows.
//!
//! DESIGN
//! ======
//! A timer-gated click does not act immediately. It arms a lock that stores
//! the absolute unlock time (ms since the Unix epoch) for the button; the
//! click's side effects run when the lock expires. Because the table holds
//! wall-clock deadlines instead of relative counters, it can be written to the
//! local cache and restored after a reload without resetting any lock.
//!
//! The table is swept on a fixed interval and before every lock check. A
//! sweep removes expired entries and returns their ids so the caller can run
//! the deferred activations.

#[cfg(test)]
#[path = "timer_test.rs"]
mod timer_test;

use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::model::{Button, ButtonId, TimerAction, TimerKind};

/// Current wall-clock time in milliseconds since the Unix epoch.
#[must_use]
pub fn now_ms() -> i64 {
    let Ok(dur) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(dur.as_millis()).unwrap_or(0)
}

/// Whole seconds left until `unlock_at`, rounded up and never negative.
#[must_use]
pub fn remaining_secs(unlock_at: i64, now: i64) -> u64 {
    let left_ms = unlock_at.saturating_sub(now);
    if left_ms <= 0 {
        return 0;
    }
    u64::try_from(left_ms).map_or(0, |ms| ms.div_ceil(1000))
}

/// Outcome of passing a live click through the lock gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    /// The button has no timer; dispatch immediately.
    Open,
    /// A lock was armed; activation is deferred until `unlock_at`.
    Armed { unlock_at: i64 },
    /// The button is already locked.
    Rejected { remaining_secs: u64 },
}

/// Observable timer state of a button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    Idle,
    Locked { unlock_at: i64 },
    /// Expired with the hide action; the button is inactive.
    Hidden,
}

/// Unlock deadlines keyed by button id.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LockTable {
    locks: BTreeMap<ButtonId, i64>,
}

impl LockTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore a table from cached deadlines.
    #[must_use]
    pub fn from_deadlines(locks: BTreeMap<ButtonId, i64>) -> Self {
        Self { locks }
    }

    #[must_use]
    pub fn deadlines(&self) -> &BTreeMap<ButtonId, i64> {
        &self.locks
    }

    #[must_use]
    pub fn unlock_at(&self, id: &ButtonId) -> Option<i64> {
        self.locks.get(id).copied()
    }

    /// Whether `id` is locked at `now`.
    #[must_use]
    pub fn is_locked(&self, id: &ButtonId, now: i64) -> bool {
        self.unlock_at(id).is_some_and(|at| at > now)
    }

    /// Seconds until `id` unlocks; 0 when not locked.
    #[must_use]
    pub fn remaining(&self, id: &ButtonId, now: i64) -> u64 {
        self.unlock_at(id).map_or(0, |at| remaining_secs(at, now))
    }

    /// Gate a live click on `button` at `now`.
    ///
    /// Call [`Self::sweep`] first so an expired lock is not mistaken for a
    /// live one.
    pub fn gate(&mut self, button: &Button, now: i64) -> Gate {
        if !button.timer.gates_clicks() {
            return Gate::Open;
        }
        if self.is_locked(&button.id, now) {
            return Gate::Rejected { remaining_secs: self.remaining(&button.id, now) };
        }
        let window_ms = i64::try_from(button.timer.duration.saturating_mul(1000)).unwrap_or(i64::MAX);
        let unlock_at = now.saturating_add(window_ms);
        self.locks.insert(button.id, unlock_at);
        Gate::Armed { unlock_at }
    }

    /// Remove every lock whose deadline is at or before `now`; return their ids.
    pub fn sweep(&mut self, now: i64) -> Vec<ButtonId> {
        let expired: Vec<ButtonId> = self.locks.iter().filter(|(_, at)| **at <= now).map(|(id, _)| *id).collect();
        for id in &expired {
            self.locks.remove(id);
        }
        expired
    }

    /// Keep only locks for which `keep` returns true.
    pub fn retain(&mut self, mut keep: impl FnMut(&ButtonId) -> bool) {
        self.locks.retain(|id, _| keep(id));
    }

    /// Timer state of `button` at `now`.
    #[must_use]
    pub fn state(&self, button: &Button, now: i64) -> LockState {
        if let Some(unlock_at) = self.unlock_at(&button.id).filter(|at| *at > now) {
            return LockState::Locked { unlock_at };
        }
        if !button.is_active && button.timer.enabled && button.timer.action == TimerAction::Hide {
            return LockState::Hidden;
        }
        LockState::Idle
    }

    /// Label shown on the button while it is locked, if its display asks for one.
    #[must_use]
    pub fn label(&self, button: &Button, now: i64) -> Option<String> {
        if !button.timer.display.on_button() || !self.is_locked(&button.id, now) {
            return None;
        }
        Some(lock_message(button.timer.kind, self.remaining(&button.id, now)))
    }
}

/// Human-readable remaining-time message for a locked button.
#[must_use]
pub fn lock_message(kind: TimerKind, remaining_secs: u64) -> String {
    match kind {
        TimerKind::Countdown => format!("{remaining_secs}s"),
        TimerKind::Cooldown => format!("Available again in {remaining_secs}s"),
    }
}
