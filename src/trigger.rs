//! Insertion triggers: the moment each slot becomes eligible to play.

use crate::config::{AdSlotConfig, RollPosition};

/// The single condition a slot listens for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    FirstPlay,
    /// Normalized tick for this whole second.
    Second(u64),
    ContentEnd,
}

impl Trigger {
    pub fn for_config(config: &AdSlotConfig) -> Self {
        match config.position {
            RollPosition::Preroll => Trigger::FirstPlay,
            RollPosition::Midroll => Trigger::Second(config.trigger_second()),
            RollPosition::Postroll => Trigger::ContentEnd,
        }
    }
}

/// Something that may satisfy a trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerEvent {
    FirstPlay,
    Tick(u64),
    ContentEnd,
}

/// A one-shot listener bound to one slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerBinding {
    trigger: Trigger,
    fired: bool,
}

impl TriggerBinding {
    pub fn bind(config: &AdSlotConfig) -> Self {
        TriggerBinding {
            trigger: Trigger::for_config(config),
            fired: false,
        }
    }

    pub fn trigger(&self) -> Trigger {
        self.trigger
    }

    pub fn has_fired(&self) -> bool {
        self.fired
    }

    /// Returns true exactly once, on the first matching event.
    pub fn fire(&mut self, event: TriggerEvent) -> bool {
        if self.fired {
            return false;
        }
        let matched = match (self.trigger, event) {
            (Trigger::FirstPlay, TriggerEvent::FirstPlay) => true,
            (Trigger::Second(n), TriggerEvent::Tick(tick)) => n == tick,
            (Trigger::ContentEnd, TriggerEvent::ContentEnd) => true,
            _ => false,
        };
        self.fired = matched;
        matched
    }

    /// Listen again after a slot was explicitly re-armed.
    pub fn rearm(&mut self) {
        self.fired = false;
    }
}
