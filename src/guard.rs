//! Anti-skip guard for devices whose native controls can scrub through ads.
//!
//! Armed by the pipeline when an ad starts on a guarded device and dropped
//! from the [`AdContext`](crate::context::AdContext) as soon as the ad ends,
//! is canceled or fails.

/// Largest progress jump (seconds) accepted as normal playback.
pub const PROGRESS_THRESHOLD: f64 = 3.0;

/// Correction the orchestrator must apply to the player.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GuardAction {
    None,
    /// Seek back to `to`; pause as well when `pause` is set.
    Revert { to: f64, pause: bool },
    /// Spurious end: pause, play, then seek to `to`.
    Reassert { to: f64 },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AntiSkipGuard {
    previous_time: f64,
    skip_attempts: u32,
}

impl AntiSkipGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn previous_time(&self) -> f64 {
        self.previous_time
    }

    pub fn skip_attempts(&self) -> u32 {
        self.skip_attempts
    }

    /// Check one ad progress callback.
    ///
    /// One accidental jump is tolerated; from the second jump on playback is
    /// paused as well.
    pub fn on_progress(&mut self, current_time: f64) -> GuardAction {
        if !current_time.is_finite() {
            return GuardAction::None;
        }
        let delta = (current_time - self.previous_time).abs();
        if delta > PROGRESS_THRESHOLD {
            self.skip_attempts += 1;
            GuardAction::Revert {
                to: self.previous_time,
                pause: self.skip_attempts > 1,
            }
        } else {
            self.previous_time = current_time;
            GuardAction::None
        }
    }

    /// Check an `ended` report against the ad's real duration.
    pub fn on_ended(&self, duration: f64) -> GuardAction {
        if duration.is_finite() && duration - self.previous_time > PROGRESS_THRESHOLD {
            GuardAction::Reassert {
                to: self.previous_time,
            }
        } else {
            GuardAction::None
        }
    }
}
