//! Signals the orchestrator emits for the surrounding player UI.

use crate::ad::AdResponse;
use crate::error::AdError;
use crate::slot::SlotId;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    AdStart { slot: SlotId },
    AdEnd { slot: SlotId },
    AdError {
        slot: SlotId,
        error: AdError,
        response: Option<AdResponse>,
    },
    AdsCancel { slot: SlotId },
    ContentStart,
    ContentEnd,
    /// Deferred end-of-content notification from the clock adapter.
    TimeEnd,
    Reset,
    /// Normalized content second.
    Tick(u64),
}

impl Signal {
    /// Event name as seen on the player's event bus. Ticks are published
    /// per second as `vast.timeUpdate:<second>`.
    pub fn name(&self) -> &'static str {
        match self {
            Signal::AdStart { .. } => "vast.adStart",
            Signal::AdEnd { .. } => "vast.adEnd",
            Signal::AdError { .. } => "vast.adError",
            Signal::AdsCancel { .. } => "vast.adsCancel",
            Signal::ContentStart => "vast.contentStart",
            Signal::ContentEnd => "vast.contentEnd",
            Signal::TimeEnd => "vast.timeEnd",
            Signal::Reset => "vast.reset",
            Signal::Tick(_) => "vast.timeUpdate",
        }
    }

    pub fn slot(&self) -> Option<SlotId> {
        match self {
            Signal::AdStart { slot }
            | Signal::AdEnd { slot }
            | Signal::AdError { slot, .. }
            | Signal::AdsCancel { slot } => Some(*slot),
            _ => None,
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::AdError { slot, error, .. } => {
                write!(f, "{} [slot {}] {}", self.name(), slot, error)
            }
            Signal::Tick(second) => write!(f, "{}:{}", self.name(), second),
            other => match other.slot() {
                Some(slot) => write!(f, "{} [slot {}]", other.name(), slot),
                None => f.write_str(other.name()),
            },
        }
    }
}
