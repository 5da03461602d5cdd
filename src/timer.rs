//! Deferred callbacks on the orchestrator's virtual clock.
//!
//! The host advances time explicitly; nothing fires on its own. Timers due at
//! the same instant fire in the order they were scheduled.

use crate::pipeline::AdTicket;
use crate::slot::SlotId;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

/// What to do when a timer fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    /// The slot's ad did not start in time.
    AdCancelTimeout { slot: SlotId, ticket: AdTicket },
    /// Deferred end-of-content notification from the clock adapter.
    ContentTimeEnd,
    /// Remove the loading indicator once the ad had a moment to render.
    HideLoading,
    /// Reset issued after content end when ads must always play.
    DeferredReset,
}

#[derive(Debug, Clone)]
struct Timer {
    id: TimerId,
    due: Duration,
    kind: TimerKind,
}

#[derive(Debug, Default)]
pub struct TimerQueue {
    next_id: u64,
    timers: Vec<Timer>,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `kind` to fire `delay` after `now`.
    pub fn schedule(&mut self, now: Duration, delay: Duration, kind: TimerKind) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.timers.push(Timer {
            id,
            due: now + delay,
            kind,
        });
        id
    }

    /// Disarm a timer. Returns false if it already fired or was canceled.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let before = self.timers.len();
        self.timers.retain(|t| t.id != id);
        self.timers.len() != before
    }

    /// Remove and return the earliest timer due at or before `now`.
    pub fn pop_due(&mut self, now: Duration) -> Option<(TimerId, TimerKind)> {
        let index = self
            .timers
            .iter()
            .enumerate()
            .filter(|(_, t)| t.due <= now)
            .min_by_key(|(_, t)| (t.due, t.id))
            .map(|(i, _)| i)?;
        let timer = self.timers.remove(index);
        Some((timer.id, timer.kind))
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        self.timers.iter().map(|t| t.due).min()
    }

    pub fn is_armed(&self, id: TimerId) -> bool {
        self.timers.iter().any(|t| t.id == id)
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }
}
