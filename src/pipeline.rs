//! The ad pipeline: ordered, short-circuiting stages for one ad run.
//!
//! Each stage either finishes and hands over to the next one, suspends until
//! the host reports an asynchronous result, or fails the whole run. Every
//! resumption goes through [`resume_at`] (or one of its wrappers) and is a
//! no-op once the run's cancellation token has been tripped.

use crate::ad::{AdResponse, AdServices, StrategySettings};
use crate::context::AdContext;
use crate::device::DeviceProfile;
use crate::error::AdError;
use crate::player::HostPlayer;
use crate::slot::{AdSlot, SlotState};
use crate::timer::{TimerId, TimerKind, TimerQueue};
use std::fmt;
use std::time::Duration;
use tracing::debug;

/// Identifies one pipeline run. Collaborator callbacks carry it back so
/// late results from an older run can be recognized and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AdTicket(pub u64);

impl fmt::Display for AdTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    CheckEnabled,
    PreparePlayer,
    ArmCancelTimeout,
    FetchResponse,
    HandOff,
    AwaitCompletion,
}

impl Stage {
    pub fn next(self) -> Option<Stage> {
        match self {
            Stage::CheckEnabled => Some(Stage::PreparePlayer),
            Stage::PreparePlayer => Some(Stage::ArmCancelTimeout),
            Stage::ArmCancelTimeout => Some(Stage::FetchResponse),
            Stage::FetchResponse => Some(Stage::HandOff),
            Stage::HandOff => Some(Stage::AwaitCompletion),
            Stage::AwaitCompletion => None,
        }
    }

    pub fn slot_state(self) -> SlotState {
        match self {
            Stage::CheckEnabled | Stage::PreparePlayer => SlotState::Preparing,
            Stage::ArmCancelTimeout => SlotState::TimeoutArmed,
            Stage::FetchResponse | Stage::HandOff => SlotState::Fetching,
            Stage::AwaitCompletion => SlotState::Playing,
        }
    }
}

/// Owned cancellation flag of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CancelToken {
    canceled: bool,
}

impl CancelToken {
    pub fn cancel(&mut self) {
        self.canceled = true;
    }

    pub fn is_canceled(&self) -> bool {
        self.canceled
    }
}

/// Transient state of one run, dropped when the run settles.
#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub ticket: AdTicket,
    pub stage: Stage,
    pub token: CancelToken,
    pub response: Option<AdResponse>,
    pub cancel_timer: Option<TimerId>,
    /// The strategy reported ad-start.
    pub started: bool,
    /// Preparation is waiting for one `playing` event before re-pausing.
    pub awaiting_playing: bool,
}

impl PipelineRun {
    pub fn new(ticket: AdTicket) -> Self {
        PipelineRun {
            ticket,
            stage: Stage::CheckEnabled,
            token: CancelToken::default(),
            response: None,
            cancel_timer: None,
            started: false,
            awaiting_playing: false,
        }
    }
}

/// Everything a stage may touch besides its own slot.
pub struct StageEnv<'a, P: HostPlayer> {
    pub player: &'a mut P,
    pub services: &'a mut AdServices,
    pub device: &'a DeviceProfile,
    pub timers: &'a mut TimerQueue,
    pub ctx: &'a mut AdContext,
    pub now: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Next,
    Suspend,
}

/// Where a run stopped after being driven.
#[derive(Debug, Clone, PartialEq)]
pub enum Progress {
    /// Waiting for an external event.
    Suspended,
    /// The run was canceled or no longer exists.
    Canceled,
    Failed(AdError),
}

/// Drive the slot's run from its current stage until it suspends or fails.
pub fn drive<P: HostPlayer>(slot: &mut AdSlot, env: &mut StageEnv<'_, P>) -> Progress {
    loop {
        let Some(run) = slot.run() else {
            return Progress::Canceled;
        };
        if run.token.is_canceled() {
            return Progress::Canceled;
        }
        let stage = run.stage;
        slot.set_state(stage.slot_state());

        let step = match stage {
            Stage::CheckEnabled => check_enabled(slot),
            Stage::PreparePlayer => prepare_player(slot, env),
            Stage::ArmCancelTimeout => arm_cancel_timeout(slot, env),
            Stage::FetchResponse => fetch_response(slot, env),
            Stage::HandOff => hand_off(slot, env),
            Stage::AwaitCompletion => Ok(Step::Suspend),
        };

        match step {
            Err(error) => return Progress::Failed(error),
            Ok(Step::Suspend) => return Progress::Suspended,
            Ok(Step::Next) => match (stage.next(), slot.run_mut()) {
                (Some(next), Some(run)) => run.stage = next,
                _ => return Progress::Suspended,
            },
        }
    }
}

/// Continue a suspended run at `stage`.
pub fn resume_at<P: HostPlayer>(
    slot: &mut AdSlot,
    env: &mut StageEnv<'_, P>,
    stage: Stage,
) -> Progress {
    match slot.run_mut() {
        Some(run) if !run.token.is_canceled() => run.stage = stage,
        _ => return Progress::Canceled,
    }
    drive(slot, env)
}

/// The player finished its transition to playing: re-pause and go on.
pub fn on_playing<P: HostPlayer>(slot: &mut AdSlot, env: &mut StageEnv<'_, P>) -> Progress {
    match slot.run_mut() {
        Some(run) if run.awaiting_playing && run.stage == Stage::PreparePlayer => {
            run.awaiting_playing = false;
        }
        _ => return Progress::Suspended,
    }
    env.player.pause();
    resume_at(slot, env, Stage::ArmCancelTimeout)
}

/// Feed the resolver's answer into a run waiting at the fetch stage.
pub fn deliver_response<P: HostPlayer>(
    slot: &mut AdSlot,
    env: &mut StageEnv<'_, P>,
    result: Result<AdResponse, AdError>,
) -> Progress {
    let Some(run) = slot.run_mut() else {
        return Progress::Canceled;
    };
    if run.stage != Stage::FetchResponse {
        debug!(ticket = %run.ticket, stage = ?run.stage, "ignoring ad response outside the fetch stage");
        return Progress::Suspended;
    }
    match result {
        Ok(response) => {
            run.response = Some(response);
            resume_at(slot, env, Stage::HandOff)
        }
        Err(error) => Progress::Failed(error),
    }
}

// ── Stages ─────────────────────────────────────────────────────────────────

fn check_enabled(slot: &AdSlot) -> Result<Step, AdError> {
    if slot.ads_enabled() {
        Ok(Step::Next)
    } else {
        Err(AdError::Disabled)
    }
}

fn prepare_player<P: HostPlayer>(
    slot: &mut AdSlot,
    env: &mut StageEnv<'_, P>,
) -> Result<Step, AdError> {
    let config = slot.config();
    env.device.check_eligibility(
        config.position,
        env.player.current_time(),
        config.timeouts.preroll_window_secs,
    )?;

    slot.capture_snapshot(&*env.player);
    env.player.pause();
    env.player.set_loading(true);

    if env.player.paused() {
        return Ok(Step::Next);
    }
    if let Some(run) = slot.run_mut() {
        run.awaiting_playing = true;
    }
    debug!(slot = %slot.id(), "player still starting, waiting for playing to re-pause");
    Ok(Step::Suspend)
}

fn arm_cancel_timeout<P: HostPlayer>(
    slot: &mut AdSlot,
    env: &mut StageEnv<'_, P>,
) -> Result<Step, AdError> {
    let id = slot.id();
    let delay = slot.config().timeouts.ad_cancel;
    slot.clear_canceled();
    if let Some(run) = slot.run_mut() {
        let kind = TimerKind::AdCancelTimeout {
            slot: id,
            ticket: run.ticket,
        };
        run.cancel_timer = Some(env.timers.schedule(env.now, delay, kind));
    }
    Ok(Step::Next)
}

fn fetch_response<P: HostPlayer>(
    slot: &mut AdSlot,
    env: &mut StageEnv<'_, P>,
) -> Result<Step, AdError> {
    let request = slot.config().source.resolve();
    if let Some(run) = slot.run() {
        env.services.resolver.request(run.ticket, request);
    }
    Ok(Step::Suspend)
}

fn hand_off<P: HostPlayer>(
    slot: &mut AdSlot,
    env: &mut StageEnv<'_, P>,
) -> Result<Step, AdError> {
    let settings = StrategySettings {
        timeout: slot.config().timeouts.stage,
        auto_resize: slot.config().flags.auto_resize,
    };
    let Some(run) = slot.run() else {
        return Ok(Step::Suspend);
    };
    let response = run
        .response
        .clone()
        .ok_or_else(|| AdError::fetch("no ad response to play", None))?;

    let kind = response.strategy_kind();
    debug!(slot = %slot.id(), ticket = %run.ticket, ?kind, "handing ad to playback strategy");
    let unit = env
        .services
        .strategy(kind)
        .play_ad(run.ticket, &response, &settings);
    env.ctx.ad_unit = Some(unit);
    env.ctx.ad_response = Some(response);
    Ok(Step::Next)
}
