//! Ad slots: one per configured insertion point.

use crate::config::AdSlotConfig;
use crate::pipeline::{AdTicket, PipelineRun};
use crate::player::{ContentSnapshot, HostPlayer};
use crate::trigger::{TriggerBinding, TriggerEvent};
use std::fmt;

/// Index of the slot's entry in the plugin options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(pub usize);

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Idle,
    Preparing,
    TimeoutArmed,
    Fetching,
    Playing,
    Restoring,
    Canceled,
    Errored,
}

#[derive(Debug)]
pub struct AdSlot {
    id: SlotId,
    config: AdSlotConfig,
    state: SlotState,
    canceled: bool,
    ads_enabled: bool,
    snapshot: Option<ContentSnapshot>,
    trigger: TriggerBinding,
    run: Option<PipelineRun>,
    torn_down: bool,
}

impl AdSlot {
    pub fn new(id: SlotId, config: AdSlotConfig) -> Self {
        AdSlot {
            id,
            trigger: TriggerBinding::bind(&config),
            ads_enabled: config.flags.ads_enabled,
            config,
            state: SlotState::Idle,
            canceled: false,
            snapshot: None,
            run: None,
            torn_down: false,
        }
    }

    pub fn id(&self) -> SlotId {
        self.id
    }

    pub fn config(&self) -> &AdSlotConfig {
        &self.config
    }

    pub fn state(&self) -> SlotState {
        self.state
    }

    pub(crate) fn set_state(&mut self, state: SlotState) {
        self.state = state;
    }

    pub fn is_canceled(&self) -> bool {
        self.canceled
    }

    pub(crate) fn clear_canceled(&mut self) {
        self.canceled = false;
    }

    pub fn ads_enabled(&self) -> bool {
        self.ads_enabled
    }

    pub fn set_ads_enabled(&mut self, enabled: bool) {
        self.ads_enabled = enabled;
    }

    pub fn trigger(&self) -> &TriggerBinding {
        &self.trigger
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// Offer an event to the slot's trigger. Torn-down slots never fire.
    pub fn fire(&mut self, event: TriggerEvent) -> bool {
        !self.torn_down && self.trigger.fire(event)
    }

    // ── Snapshot ───────────────────────────────────────────────────────────

    pub fn has_snapshot(&self) -> bool {
        self.snapshot.is_some()
    }

    pub fn capture_snapshot<P: HostPlayer>(&mut self, player: &P) {
        self.snapshot = Some(player.capture_snapshot());
    }

    /// Hand the snapshot back to the player. Returns false if there was
    /// nothing left to restore.
    pub fn restore_snapshot<P: HostPlayer>(&mut self, player: &mut P) -> bool {
        match self.snapshot.take() {
            Some(snapshot) => {
                player.restore_snapshot(snapshot);
                true
            }
            None => false,
        }
    }

    // ── Pipeline run ───────────────────────────────────────────────────────

    pub fn run(&self) -> Option<&PipelineRun> {
        self.run.as_ref()
    }

    pub(crate) fn run_mut(&mut self) -> Option<&mut PipelineRun> {
        self.run.as_mut()
    }

    pub fn is_in_flight(&self) -> bool {
        self.run.is_some()
    }

    /// The run `ticket` belongs to, unless it is stale or canceled.
    pub fn live_run(&self, ticket: AdTicket) -> Option<&PipelineRun> {
        self.run
            .as_ref()
            .filter(|run| run.ticket == ticket && !run.token.is_canceled())
    }

    pub(crate) fn begin_run(&mut self, ticket: AdTicket) {
        self.run = Some(PipelineRun::new(ticket));
    }

    pub(crate) fn take_run(&mut self) -> Option<PipelineRun> {
        self.run.take()
    }

    /// Mark the slot canceled and invalidate the in-flight run.
    pub fn cancel(&mut self) {
        self.canceled = true;
        if let Some(run) = self.run.as_mut() {
            run.token.cancel();
        }
    }

    /// Tear the slot down for good: snapshot dropped, run canceled.
    /// Returns the run that was in flight, if any.
    pub fn teardown(&mut self) -> Option<PipelineRun> {
        self.cancel();
        self.snapshot = None;
        self.state = SlotState::Canceled;
        self.torn_down = true;
        self.run.take()
    }

    /// Listen for the trigger again after a failure. Refused for slots that
    /// were torn down or still have a run in flight.
    pub fn rearm(&mut self) -> bool {
        if self.torn_down || self.run.is_some() {
            return false;
        }
        self.trigger.rearm();
        self.canceled = false;
        self.state = SlotState::Idle;
        true
    }
}
