//! Per-player ad state shared by the slots, the clock adapter and the guard.

use crate::ad::{AdResponse, AdUnit};
use crate::guard::AntiSkipGuard;
use crate::slot::SlotId;

/// State owned by the orchestrator for one player.
///
/// Only the owning slot may populate or clear the ad fields.
#[derive(Debug, Default)]
pub struct AdContext {
    /// Set on ad-start, cleared on ad-end, ad-error and ad-cancel.
    pub ad_active: bool,
    /// Slot whose run currently holds the player.
    pub owner: Option<SlotId>,
    pub ad_unit: Option<AdUnit>,
    pub ad_response: Option<AdResponse>,
    /// Present only while an ad plays on a guarded device.
    pub guard: Option<AntiSkipGuard>,
}

impl AdContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_owned_by(&self, slot: SlotId) -> bool {
        self.owner == Some(slot)
    }

    /// Claim the player for `slot`. Fails if another slot holds it.
    pub fn claim(&mut self, slot: SlotId) -> Result<(), SlotId> {
        match self.owner {
            Some(other) if other != slot => Err(other),
            _ => {
                self.owner = Some(slot);
                Ok(())
            }
        }
    }

    /// Drop everything the owning run left behind.
    pub fn release(&mut self) {
        self.ad_active = false;
        self.owner = None;
        self.ad_unit = None;
        self.ad_response = None;
        self.guard = None;
    }
}
