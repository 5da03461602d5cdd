//! The per-player ad orchestrator.
//!
//! Owns the slots, the shared [`AdContext`], the playback clock and the timer
//! queue. The host drives it from a single thread by forwarding player
//! events, collaborator completions and virtual-time advances; everything the
//! surrounding UI needs to know comes back out as [`Signal`]s.

use crate::ad::{AdResponse, AdServices};
use crate::clock::{PlaybackClock, CONTENT_END_DELAY};
use crate::config::{AdSlotConfig, PluginOptions, RollPosition, SlotOptions};
use crate::context::AdContext;
use crate::device::DeviceProfile;
use crate::error::{AdError, OptionsError};
use crate::guard::{AntiSkipGuard, GuardAction};
use crate::pipeline::{self, AdTicket, Progress, StageEnv};
use crate::player::{HostPlayer, PlayerEvent};
use crate::signal::Signal;
use crate::slot::{AdSlot, SlotId, SlotState};
use crate::timer::{TimerKind, TimerQueue};
use crate::trigger::{Trigger, TriggerEvent};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Delay before the loading indicator is hidden after an ad starts or fails.
pub const LOADING_HIDE_DELAY: Duration = Duration::from_millis(100);

/// Content lifecycle events armed after an ad hands the player back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentWatch {
    Idle,
    /// The next `playing` emits content-start.
    AwaitPlaying,
    /// The next `ended` emits content-end.
    AwaitEnded,
}

pub struct Orchestrator<P: HostPlayer> {
    player: P,
    services: AdServices,
    device: DeviceProfile,
    ctx: AdContext,
    clock: PlaybackClock,
    timers: TimerQueue,
    options: Vec<SlotOptions>,
    slots: Vec<AdSlot>,
    content: ContentWatch,
    outbox: Vec<Signal>,
    now: Duration,
    next_ticket: u64,
}

impl<P: HostPlayer> Orchestrator<P> {
    /// Bind one slot per options entry. Entries that fail validation are
    /// reported once as ad-error signals and bind nothing.
    pub fn attach(
        player: P,
        services: AdServices,
        device: DeviceProfile,
        options: &[SlotOptions],
    ) -> Self {
        let mut orchestrator = Orchestrator {
            player,
            services,
            device,
            ctx: AdContext::new(),
            clock: PlaybackClock::new(),
            timers: TimerQueue::new(),
            options: options.to_vec(),
            slots: Vec::new(),
            content: ContentWatch::Idle,
            outbox: Vec::new(),
            now: Duration::ZERO,
            next_ticket: 1,
        };
        orchestrator.bind_slots(true);
        orchestrator
    }

    /// Attach using a loaded options file; the device comes from its
    /// `device` or `userAgent` entry.
    pub fn from_plugin_options(
        player: P,
        services: AdServices,
        options: &PluginOptions,
    ) -> Result<Self, OptionsError> {
        let device = DeviceProfile::for_class(options.device_class()?);
        Ok(Self::attach(player, services, device, &options.ads))
    }

    fn bind_slots(&mut self, report_errors: bool) {
        self.slots.clear();
        let mut has_preroll = false;
        for (index, options) in self.options.iter().enumerate() {
            let id = SlotId(index);
            match AdSlotConfig::from_options(options) {
                Ok(config) => {
                    debug!(slot = %id, position = %config.position, offset = config.offset, "ad slot bound");
                    has_preroll |= config.position == RollPosition::Preroll;
                    self.slots.push(AdSlot::new(id, config));
                }
                Err(error) if report_errors => {
                    warn!(slot = %id, %error, "ad slot failed to initialize");
                    self.outbox.push(Signal::AdError {
                        slot: id,
                        error,
                        response: None,
                    });
                }
                Err(_) => {}
            }
        }
        if has_preroll {
            self.services.show_black_poster();
        }
    }

    // ── Accessors ──────────────────────────────────────────────────────────

    pub fn player(&self) -> &P {
        &self.player
    }

    pub fn player_mut(&mut self) -> &mut P {
        &mut self.player
    }

    pub fn device(&self) -> &DeviceProfile {
        &self.device
    }

    pub fn context(&self) -> &AdContext {
        &self.ctx
    }

    pub fn slots(&self) -> &[AdSlot] {
        &self.slots
    }

    pub fn slot(&self, id: SlotId) -> Option<&AdSlot> {
        self.slots.iter().find(|slot| slot.id() == id)
    }

    pub fn content_watch(&self) -> ContentWatch {
        self.content
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    /// When the host should call [`advance`](Self::advance) next.
    pub fn next_deadline(&self) -> Option<Duration> {
        self.timers.next_deadline()
    }

    /// True while any slot has a pipeline run in flight.
    pub fn is_busy(&self) -> bool {
        self.slots.iter().any(AdSlot::is_in_flight)
    }

    pub fn drain_signals(&mut self) -> Vec<Signal> {
        std::mem::take(&mut self.outbox)
    }

    // ── Runtime controls ───────────────────────────────────────────────────

    pub fn enable_ads(&mut self) {
        self.set_ads_enabled(true);
    }

    pub fn disable_ads(&mut self) {
        self.set_ads_enabled(false);
    }

    fn set_ads_enabled(&mut self, enabled: bool) {
        info!(enabled, "ads enabled flag changed");
        for slot in &mut self.slots {
            slot.set_ads_enabled(enabled);
        }
    }

    /// True when every bound slot has ads enabled.
    pub fn ads_enabled(&self) -> bool {
        self.slots.iter().all(AdSlot::ads_enabled)
    }

    /// Let a slot that failed listen for its trigger again.
    pub fn rearm(&mut self, id: SlotId) -> bool {
        match self.slot_index(id) {
            Some(index) => self.slots[index].rearm(),
            None => false,
        }
    }

    /// Tear down every slot. Runs in flight are canceled and their
    /// snapshots dropped; no slot plays again until [`reattach`](Self::reattach).
    pub fn reset(&mut self) {
        info!("resetting ad slots");
        self.outbox.push(Signal::Reset);
        self.content = ContentWatch::Idle;

        for slot in &mut self.slots {
            if let Some(run) = slot.teardown() {
                if let Some(timer) = run.cancel_timer {
                    self.timers.cancel(timer);
                }
                debug!(slot = %slot.id(), ticket = %run.ticket, stage = ?run.stage, "run canceled by reset");
                self.outbox.push(Signal::AdsCancel { slot: slot.id() });
            }
        }

        if self.ctx.owner.is_some() {
            self.ctx.release();
            if self.player.has_ads_label() {
                self.player.remove_ads_label();
            }
            self.player.set_loading(false);
            self.services.hide_black_poster();
        }
        self.clock = PlaybackClock::new();
    }

    /// Bind fresh slot instances from the original options.
    pub fn reattach(&mut self) {
        debug!("reattaching ad slots");
        self.bind_slots(false);
    }

    // ── Host input ─────────────────────────────────────────────────────────

    pub fn handle(&mut self, event: PlayerEvent) {
        match event {
            PlayerEvent::FirstPlay => {
                self.content = ContentWatch::Idle;
                self.fire_triggers(TriggerEvent::FirstPlay);
            }
            PlayerEvent::Playing => self.on_playing(),
            PlayerEvent::TimeUpdate {
                current_time,
                duration,
            } => self.on_time_update(current_time, duration),
            PlayerEvent::Ended => self.on_ended(),
        }
    }

    /// Move virtual time forward and fire every timer that became due.
    pub fn advance(&mut self, now: Duration) {
        self.now = self.now.max(now);
        while let Some((_, kind)) = self.timers.pop_due(self.now) {
            self.on_timer(kind);
        }
    }

    /// The resolver finished the request it was given for `ticket`.
    pub fn deliver_ad_response(&mut self, ticket: AdTicket, result: Result<AdResponse, AdError>) {
        let Some(id) = self.live_slot(ticket) else {
            debug!(%ticket, "dropping ad response for a stale run");
            return;
        };
        self.drive_slot(id, |slot, env| pipeline::deliver_response(slot, env, result));
    }

    /// The playback strategy started rendering the ad for `ticket`.
    pub fn ad_started(&mut self, ticket: AdTicket) {
        let Some(id) = self.live_slot(ticket) else {
            debug!(%ticket, "ignoring ad start for a stale run");
            return;
        };
        let Some(index) = self.slot_index(id) else {
            return;
        };
        let Some(run) = self.slots[index].run_mut() else {
            return;
        };
        if run.started || run.stage != pipeline::Stage::AwaitCompletion {
            return;
        }
        run.started = true;
        if let Some(timer) = run.cancel_timer.take() {
            self.timers.cancel(timer);
        }

        self.ctx.ad_active = true;
        if self.device.needs_anti_skip_guard() {
            self.ctx.guard = Some(AntiSkipGuard::new());
        }
        self.timers
            .schedule(self.now, LOADING_HIDE_DELAY, TimerKind::HideLoading);
        if !self.player.has_ads_label() {
            self.player.add_ads_label();
        }
        self.slots[index].set_state(SlotState::Playing);

        info!(slot = %id, %ticket, "ad started");
        self.outbox.push(Signal::AdStart { slot: id });
    }

    /// The playback strategy is done with the ad for `ticket`.
    pub fn ad_finished(&mut self, ticket: AdTicket, result: Result<(), AdError>) {
        let Some(id) = self.live_slot(ticket) else {
            debug!(%ticket, "ignoring ad completion for a stale run");
            return;
        };
        match result {
            Ok(()) => {
                info!(slot = %id, %ticket, "ad finished");
                self.outbox.push(Signal::AdEnd { slot: id });
                if let Some(index) = self.slot_index(id) {
                    self.settle(index);
                    self.slots[index].set_state(SlotState::Idle);
                }
            }
            Err(error) => self.fail(id, error),
        }
    }

    // ── Player events ──────────────────────────────────────────────────────

    fn on_playing(&mut self) {
        let waiting: Vec<SlotId> = self
            .slots
            .iter()
            .filter(|slot| slot.run().is_some_and(|run| run.awaiting_playing))
            .map(AdSlot::id)
            .collect();
        for id in waiting {
            self.drive_slot(id, pipeline::on_playing);
        }

        if self.content == ContentWatch::AwaitPlaying && !self.ctx.ad_active {
            self.content = ContentWatch::AwaitEnded;
            self.outbox.push(Signal::ContentStart);
        }
    }

    fn on_time_update(&mut self, current_time: f64, duration: f64) {
        if self.ctx.ad_active {
            if let Some(guard) = self.ctx.guard.as_mut() {
                let action = guard.on_progress(current_time);
                self.apply_guard(action);
            }
        }

        let update = self.clock.observe(current_time, duration, self.ctx.ad_active);
        if let Some(second) = update.tick {
            self.outbox.push(Signal::Tick(second));
            self.fire_triggers(TriggerEvent::Tick(second));
        }
        if update.reached_end {
            debug!(current_time, duration, "content reached its end");
            self.timers
                .schedule(self.now, CONTENT_END_DELAY, TimerKind::ContentTimeEnd);
        }
    }

    fn on_ended(&mut self) {
        if self.ctx.ad_active {
            if let Some(guard) = self.ctx.guard.as_ref() {
                let action = guard.on_ended(self.player.duration());
                self.apply_guard(action);
            }
            return;
        }
        if self.content == ContentWatch::AwaitEnded {
            self.content = ContentWatch::Idle;
            self.outbox.push(Signal::ContentEnd);
            if self.slots.iter().any(|slot| slot.config().flags.play_ad_always) {
                self.timers
                    .schedule(self.now, Duration::ZERO, TimerKind::DeferredReset);
            }
        }
    }

    fn apply_guard(&mut self, action: GuardAction) {
        match action {
            GuardAction::None => {}
            GuardAction::Revert { to, pause } => {
                warn!(to, pause, "skip attempt during ad reverted");
                self.player.set_current_time(to);
                if pause {
                    self.player.pause();
                }
            }
            GuardAction::Reassert { to } => {
                warn!(to, "ad reported ended early, resuming it");
                self.player.pause();
                self.player.play();
                self.player.set_current_time(to);
            }
        }
    }

    fn on_timer(&mut self, kind: TimerKind) {
        match kind {
            TimerKind::AdCancelTimeout { slot, ticket } => {
                let live = self
                    .slot_index(slot)
                    .and_then(|index| self.slots[index].live_run(ticket))
                    .is_some_and(|run| !run.started);
                if live {
                    self.fail(slot, AdError::Timeout);
                } else {
                    debug!(slot = %slot, %ticket, "cancel timeout for a settled run");
                }
            }
            TimerKind::ContentTimeEnd => {
                self.outbox.push(Signal::TimeEnd);
                self.clock.arm_replay();
                self.fire_triggers(TriggerEvent::ContentEnd);
                let postroll_running = self.slots.iter().any(|slot| {
                    slot.is_in_flight() && slot.trigger().trigger() == Trigger::ContentEnd
                });
                if !postroll_running {
                    self.clock.disarm_replay();
                }
            }
            TimerKind::HideLoading => self.player.set_loading(false),
            TimerKind::DeferredReset => {
                self.reset();
                self.reattach();
            }
        }
    }

    // ── Slot entry and settlement ──────────────────────────────────────────

    fn fire_triggers(&mut self, event: TriggerEvent) {
        let due: Vec<SlotId> = self
            .slots
            .iter_mut()
            .filter_map(|slot| slot.fire(event).then(|| slot.id()))
            .collect();
        for id in due {
            self.enter(id);
        }
    }

    fn enter(&mut self, id: SlotId) {
        let Some(index) = self.slot_index(id) else {
            return;
        };
        if let Err(owner) = self.ctx.claim(id) {
            warn!(slot = %id, %owner, "ad trigger refused while another slot holds the player");
            self.slots[index].set_state(SlotState::Errored);
            self.outbox.push(Signal::AdError {
                slot: id,
                error: AdError::precondition(format!("slot {} is still playing an ad", owner)),
                response: None,
            });
            return;
        }

        let position = self.slots[index].config().position;
        info!(slot = %id, %position, "entering ad slot");
        self.player.remove_native_poster();
        if position != RollPosition::Preroll {
            self.services.show_black_poster();
        }

        let ticket = AdTicket(self.next_ticket);
        self.next_ticket += 1;
        self.slots[index].begin_run(ticket);
        self.drive_slot(id, pipeline::drive);
    }

    /// Run one pipeline step against the slot and act on where it stopped.
    fn drive_slot<F>(&mut self, id: SlotId, step: F)
    where
        F: FnOnce(&mut AdSlot, &mut StageEnv<'_, P>) -> Progress,
    {
        let Some(index) = self.slot_index(id) else {
            return;
        };
        let progress = {
            let mut env = StageEnv {
                player: &mut self.player,
                services: &mut self.services,
                device: &self.device,
                timers: &mut self.timers,
                ctx: &mut self.ctx,
                now: self.now,
            };
            step(&mut self.slots[index], &mut env)
        };
        match progress {
            Progress::Suspended => {}
            Progress::Canceled => debug!(slot = %id, "pipeline stopped, run canceled"),
            Progress::Failed(error) => self.fail(id, error),
        }
    }

    /// Single failure path for every pipeline error: cancel, log, report.
    fn fail(&mut self, id: SlotId, error: AdError) {
        let Some(index) = self.slot_index(id) else {
            return;
        };
        let response = self.slots[index]
            .run()
            .and_then(|run| run.response.clone())
            .or_else(|| {
                self.ctx
                    .is_owned_by(id)
                    .then(|| self.ctx.ad_response.clone())
                    .flatten()
            });

        self.slots[index].cancel();
        self.outbox.push(Signal::AdsCancel { slot: id });
        self.settle(index);
        self.slots[index].set_state(SlotState::Errored);

        let ad_id = response.as_ref().and_then(|r| r.ad_id.as_deref());
        error!(slot = %id, code = ?error.code(), ?ad_id, %error, "ad pipeline failed");
        self.outbox.push(Signal::AdError {
            slot: id,
            error,
            response,
        });
    }

    /// Drop the slot's run and hand the player back to content.
    fn settle(&mut self, index: usize) {
        let id = self.slots[index].id();
        let position = self.slots[index].config().position;
        let run = self.slots[index].take_run();
        self.slots[index].set_state(SlotState::Restoring);

        let started = match &run {
            Some(run) => {
                if let Some(timer) = run.cancel_timer {
                    self.timers.cancel(timer);
                }
                run.started
            }
            None => false,
        };
        if !self.ctx.is_owned_by(id) {
            return;
        }
        self.ctx.release();

        if !started {
            self.timers
                .schedule(self.now, LOADING_HIDE_DELAY, TimerKind::HideLoading);
        }
        if self.player.has_ads_label() {
            self.player.remove_ads_label();
        }
        self.services.hide_black_poster();

        if position != RollPosition::Postroll {
            self.content = ContentWatch::AwaitPlaying;
        }
        self.slots[index].restore_snapshot(&mut self.player);

        if self.clock.take_replay() {
            debug!(slot = %id, "rewinding content for replay");
            self.player.set_current_time(0.0);
            self.player.play();
            self.player.pause();
        }
    }

    fn slot_index(&self, id: SlotId) -> Option<usize> {
        self.slots.iter().position(|slot| slot.id() == id)
    }

    fn live_slot(&self, ticket: AdTicket) -> Option<SlotId> {
        self.slots
            .iter()
            .find(|slot| slot.live_run(ticket).is_some())
            .map(AdSlot::id)
    }
}
