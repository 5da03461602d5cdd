//! Virtual-time simulation of a viewing session.
//!
//! Plays content on a [`SimulatedPlayer`] with scripted collaborators: the
//! resolver answers every request on the next step, the strategy starts each
//! ad immediately and finishes it after a fixed length.

use crate::ad::{
    AdResolver, AdResponse, AdServices, AdUnit, MediaFile, PlaybackStrategy, StrategyKind,
    StrategySettings,
};
use crate::config::{AdRequest, PluginOptions};
use crate::error::{AdError, SimulationError};
use crate::orchestrator::Orchestrator;
use crate::pipeline::AdTicket;
use crate::player::{HostPlayer, PlayerEvent, SimulatedPlayer};
use crate::signal::Signal;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;
use tracing::debug;

/// Extra virtual time allowed after content ends for trailing ads to finish.
const TAIL_ALLOWANCE: Duration = Duration::from_secs(120);

#[derive(Debug, Clone)]
pub struct SimulationSettings {
    /// Content length in seconds.
    pub content_duration: f64,
    /// How long each ad plays, in seconds.
    pub ad_length: f64,
    /// Every ad request fails with a fetch error.
    pub fail_fetch: bool,
    /// Interval between progress callbacks.
    pub step: Duration,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        SimulationSettings {
            content_duration: 60.0,
            ad_length: 15.0,
            fail_fetch: false,
            step: Duration::from_millis(250),
        }
    }
}

impl SimulationSettings {
    /// Reject lengths that cannot be turned into virtual time.
    pub fn validate(&self) -> Result<(), SimulationError> {
        length("content duration", self.content_duration)?;
        length("ad length", self.ad_length)?;
        if self.step.is_zero() {
            return Err(SimulationError::ZeroStep);
        }
        Ok(())
    }
}

fn length(name: &'static str, value: f64) -> Result<Duration, SimulationError> {
    Duration::try_from_secs_f64(value).map_err(|_| SimulationError::InvalidLength { name, value })
}

/// Signals emitted during the session, stamped with virtual time.
#[derive(Debug, Clone, Default)]
pub struct SimulationReport {
    pub signals: Vec<(Duration, Signal)>,
}

impl SimulationReport {
    pub fn count(&self, name: &str) -> usize {
        self.signals.iter().filter(|(_, s)| s.name() == name).count()
    }
}

#[derive(Debug, Default)]
struct Inbox {
    requests: VecDeque<AdTicket>,
    plays: VecDeque<AdTicket>,
}

struct ScriptedResolver(Rc<RefCell<Inbox>>);

impl AdResolver for ScriptedResolver {
    fn request(&mut self, ticket: AdTicket, request: AdRequest) {
        debug!(%ticket, ?request, "simulated ad request");
        self.0.borrow_mut().requests.push_back(ticket);
    }
}

struct ScriptedStrategy {
    inbox: Rc<RefCell<Inbox>>,
    kind: StrategyKind,
}

impl PlaybackStrategy for ScriptedStrategy {
    fn play_ad(
        &mut self,
        ticket: AdTicket,
        response: &AdResponse,
        _settings: &StrategySettings,
    ) -> AdUnit {
        self.inbox.borrow_mut().plays.push_back(ticket);
        AdUnit {
            ticket,
            kind: self.kind,
            handle: response.ad_id.clone().unwrap_or_else(|| format!("ad-{}", ticket.0)),
        }
    }
}

fn sample_response(ticket: AdTicket) -> AdResponse {
    let mut response = AdResponse::new(vec![MediaFile::new(
        "https://cdn.example.com/creative.mp4",
        "video/mp4",
    )]);
    response.ad_id = Some(format!("sim-{}", ticket.0));
    response
}

/// Run one session from first play to the end of content.
pub fn run(
    options: &PluginOptions,
    settings: &SimulationSettings,
) -> Result<SimulationReport, SimulationError> {
    settings.validate()?;
    let inbox = Rc::new(RefCell::new(Inbox::default()));
    let services = AdServices {
        resolver: Box::new(ScriptedResolver(inbox.clone())),
        interactive: Box::new(ScriptedStrategy {
            inbox: inbox.clone(),
            kind: StrategyKind::Interactive,
        }),
        declarative: Box::new(ScriptedStrategy {
            inbox: inbox.clone(),
            kind: StrategyKind::Declarative,
        }),
        black_poster: None,
    };
    let player = SimulatedPlayer::new(settings.content_duration);
    let mut orch = Orchestrator::from_plugin_options(player, services, options)?;

    let mut report = SimulationReport::default();
    let step_secs = settings.step.as_secs_f64();
    let ad_length = length("ad length", settings.ad_length)?;
    let limit = length("content duration", settings.content_duration)?.saturating_add(TAIL_ALLOWANCE);
    let mut now = Duration::ZERO;
    let mut playing_ads: Vec<(AdTicket, Duration)> = Vec::new();
    let mut was_paused = true;
    let mut ended = false;

    collect(&mut orch, now, &mut report);
    orch.player_mut().start_playback();
    orch.handle(PlayerEvent::FirstPlay);
    collect(&mut orch, now, &mut report);

    while now <= limit {
        orch.advance(now);

        let requests: Vec<AdTicket> = inbox.borrow_mut().requests.drain(..).collect();
        for ticket in requests {
            let result = if settings.fail_fetch {
                Err(AdError::fetch("simulated fetch failure", Some(303)))
            } else {
                Ok(sample_response(ticket))
            };
            orch.deliver_ad_response(ticket, result);
        }
        let plays: Vec<AdTicket> = inbox.borrow_mut().plays.drain(..).collect();
        for ticket in plays {
            orch.ad_started(ticket);
            playing_ads.push((ticket, now.saturating_add(ad_length)));
        }
        let (done, pending): (Vec<_>, Vec<_>) =
            playing_ads.into_iter().partition(|(_, end)| *end <= now);
        playing_ads = pending;
        for (ticket, _) in done {
            orch.ad_finished(ticket, Ok(()));
        }

        if was_paused && !orch.player().paused() {
            orch.handle(PlayerEvent::Playing);
        }

        if !orch.context().ad_active && !orch.player().paused() && !ended {
            let duration = settings.content_duration;
            let time = (orch.player().current_time() + step_secs).min(duration);
            orch.player_mut().set_time(time);
            orch.handle(PlayerEvent::TimeUpdate {
                current_time: time,
                duration,
            });
            if time >= duration {
                ended = true;
                orch.player_mut().pause();
                orch.handle(PlayerEvent::Ended);
            }
        }
        was_paused = orch.player().paused();
        collect(&mut orch, now, &mut report);

        if ended && !orch.is_busy() && playing_ads.is_empty() && orch.next_deadline().is_none() {
            break;
        }
        now += settings.step;
    }
    Ok(report)
}

fn collect(orch: &mut Orchestrator<SimulatedPlayer>, now: Duration, report: &mut SimulationReport) {
    report
        .signals
        .extend(orch.drain_signals().into_iter().map(|signal| (now, signal)));
}
