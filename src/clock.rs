//! Playback clock adapter.
//!
//! Turns irregular `(current_time, duration)` progress callbacks into one
//! tick per whole second of normal-speed content playback. Seeks, speed
//! changes and regressions move the baseline without ticking, so a midroll
//! bound to second N cannot fire twice or fire from a jump.

use std::time::Duration;

/// Delay between reaching the end of content and announcing it, so a
/// trailing progress frame can settle first.
pub const CONTENT_END_DELAY: Duration = Duration::from_millis(100);

/// What one progress callback produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClockUpdate {
    /// Whole second reached by normal playback.
    pub tick: Option<u64>,
    /// Content just reached its end; schedule the deferred notification.
    pub reached_end: bool,
}

#[derive(Debug, Default)]
pub struct PlaybackClock {
    last_second: Option<u64>,
    end_pending: bool,
    replay_armed: bool,
}

impl PlaybackClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one raw progress callback. Nothing is emitted while an ad is active.
    pub fn observe(&mut self, current_time: f64, duration: f64, ad_active: bool) -> ClockUpdate {
        if ad_active || !current_time.is_finite() || current_time < 0.0 {
            return ClockUpdate::default();
        }

        let second = current_time.floor() as u64;
        let expected = self.last_second.map_or(0, |last| last + 1);
        let tick = if self.last_second == Some(second) {
            None
        } else if second == expected {
            self.last_second = Some(second);
            Some(second)
        } else {
            self.last_second = Some(second);
            None
        };

        let at_end = duration.is_finite()
            && duration > 0.0
            && current_time > 0.0
            && current_time >= duration;
        let reached_end = at_end && !self.end_pending;
        self.end_pending = at_end;

        ClockUpdate { tick, reached_end }
    }

    pub fn last_second(&self) -> Option<u64> {
        self.last_second
    }

    /// Rewind content to a replayable state once the end-of-content ad settles.
    pub fn arm_replay(&mut self) {
        self.replay_armed = true;
    }

    pub fn take_replay(&mut self) -> bool {
        std::mem::take(&mut self.replay_armed)
    }

    pub fn disarm_replay(&mut self) {
        self.replay_armed = false;
    }
}
