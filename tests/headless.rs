//! Headless integration tests for the ad orchestrator.
//!
//! These drive an `Orchestrator` end-to-end with a simulated player and
//! recording collaborators, advancing virtual time by hand.

use ad_orchestrator::ad::{
    AdResolver, AdResponse, AdServices, AdUnit, BlackPoster, MediaFile, PlaybackStrategy,
    StrategyKind, StrategySettings,
};
use ad_orchestrator::config::{AdRequest, RollPosition, SlotOptions, XmlSupplier};
use ad_orchestrator::device::{DeviceClass, DeviceProfile};
use ad_orchestrator::error::{AdError, TIMEOUT_ERROR_CODE};
use ad_orchestrator::orchestrator::{ContentWatch, Orchestrator};
use ad_orchestrator::pipeline::AdTicket;
use ad_orchestrator::player::{HostPlayer, PlayerCall, PlayerEvent, SimulatedPlayer};
use ad_orchestrator::signal::Signal;
use ad_orchestrator::slot::{SlotId, SlotState};
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

// ── Recording collaborators ───────────────────────────────────────────────

#[derive(Default)]
struct Recorder {
    requests: Vec<(AdTicket, AdRequest)>,
    plays: Vec<(AdTicket, StrategyKind, StrategySettings)>,
    poster: Vec<&'static str>,
}

type Shared = Rc<RefCell<Recorder>>;

struct RecordingResolver(Shared);

impl AdResolver for RecordingResolver {
    fn request(&mut self, ticket: AdTicket, request: AdRequest) {
        self.0.borrow_mut().requests.push((ticket, request));
    }
}

struct RecordingStrategy(Shared, StrategyKind);

impl PlaybackStrategy for RecordingStrategy {
    fn play_ad(
        &mut self,
        ticket: AdTicket,
        _response: &AdResponse,
        settings: &StrategySettings,
    ) -> AdUnit {
        self.0.borrow_mut().plays.push((ticket, self.1, *settings));
        AdUnit {
            ticket,
            kind: self.1,
            handle: format!("unit-{}", ticket.0),
        }
    }
}

struct RecordingPoster(Shared);

impl BlackPoster for RecordingPoster {
    fn show(&mut self) {
        self.0.borrow_mut().poster.push("show");
    }

    fn hide(&mut self) {
        self.0.borrow_mut().poster.push("hide");
    }
}

struct Session {
    orch: Orchestrator<SimulatedPlayer>,
    rec: Shared,
    now: Duration,
}

impl Session {
    fn new(device: DeviceClass, options: &[SlotOptions]) -> Self {
        let rec: Shared = Rc::new(RefCell::new(Recorder::default()));
        let services = AdServices {
            resolver: Box::new(RecordingResolver(rec.clone())),
            interactive: Box::new(RecordingStrategy(rec.clone(), StrategyKind::Interactive)),
            declarative: Box::new(RecordingStrategy(rec.clone(), StrategyKind::Declarative)),
            black_poster: Some(Box::new(RecordingPoster(rec.clone()))),
        };
        let player = SimulatedPlayer::new(120.0).with_source("https://cdn.example.com/movie.mp4");
        let orch = Orchestrator::attach(player, services, DeviceProfile::for_class(device), options);
        Session {
            orch,
            rec,
            now: Duration::ZERO,
        }
    }

    fn desktop(options: &[SlotOptions]) -> Self {
        Self::new(DeviceClass::Desktop, options)
    }

    fn advance_ms(&mut self, ms: u64) {
        self.now += Duration::from_millis(ms);
        self.orch.advance(self.now);
    }

    /// Start playing content from zero, as the viewer pressing play.
    fn first_play(&mut self) {
        self.orch.player_mut().start_playback();
        self.orch.handle(PlayerEvent::FirstPlay);
    }

    /// Normal-speed playback from `from` to `to` in quarter-second steps.
    fn play_content(&mut self, from: f64, to: f64) {
        let mut t = from;
        while t <= to {
            self.time_update(t);
            t += 0.25;
        }
    }

    fn time_update(&mut self, t: f64) {
        let duration = self.orch.player().duration();
        self.orch.player_mut().set_time(t);
        self.orch.handle(PlayerEvent::TimeUpdate {
            current_time: t,
            duration,
        });
    }

    fn last_ticket(&self) -> AdTicket {
        self.rec.borrow().requests.last().map(|(t, _)| *t).unwrap()
    }

    /// Resolve the latest request and let the strategy start the ad.
    fn start_ad(&mut self, response: AdResponse) -> AdTicket {
        let ticket = self.last_ticket();
        self.orch.deliver_ad_response(ticket, Ok(response));
        self.orch.ad_started(ticket);
        ticket
    }

    fn signals(&mut self) -> Vec<Signal> {
        self.orch.drain_signals()
    }

    fn calls(&self, call: &PlayerCall) -> usize {
        self.orch.player().count(call)
    }
}

fn url_slot(position: RollPosition, offset: f64) -> SlotOptions {
    SlotOptions::new(position, offset).with_ad_tag_url("https://ads.example.com/vast")
}

fn video_response() -> AdResponse {
    let mut response = AdResponse::new(vec![MediaFile::new(
        "https://cdn.example.com/ad.mp4",
        "video/mp4",
    )]);
    response.ad_id = Some("ad-42".into());
    response
}

fn interactive_response() -> AdResponse {
    AdResponse::new(vec![
        MediaFile::new("https://cdn.example.com/ad.mp4", "video/mp4"),
        MediaFile::new("https://cdn.example.com/ad.js", "application/javascript")
            .with_api_framework("VPAID"),
    ])
}

fn ticks(signals: &[Signal]) -> Vec<u64> {
    signals
        .iter()
        .filter_map(|s| match s {
            Signal::Tick(n) => Some(*n),
            _ => None,
        })
        .collect()
}

// ── Configuration ─────────────────────────────────────────────────────────

#[test]
fn invalid_slots_report_once_and_bind_nothing() {
    let mut both = url_slot(RollPosition::Preroll, 0.0);
    both.ad_tag_xml = Some(XmlSupplier::inline("<VAST/>".into()));
    let mut no_offset = url_slot(RollPosition::Midroll, 0.0);
    no_offset.offset = None;

    let mut s = Session::desktop(&[
        SlotOptions::new(RollPosition::Preroll, 0.0),
        both,
        no_offset,
        url_slot(RollPosition::Postroll, 0.0),
    ]);

    let signals = s.signals();
    let errored: Vec<SlotId> = signals
        .iter()
        .filter_map(|sig| match sig {
            Signal::AdError {
                slot,
                error: AdError::Configuration { .. },
                ..
            } => Some(*slot),
            _ => None,
        })
        .collect();
    assert_eq!(errored, vec![SlotId(0), SlotId(1), SlotId(2)]);
    assert_eq!(s.orch.slots().len(), 1);
    assert_eq!(s.orch.slots()[0].id(), SlotId(3));

    // Nothing fires for the invalid preroll.
    s.first_play();
    assert!(s.rec.borrow().requests.is_empty());
    assert!(s.signals().is_empty());
}

#[test]
fn xml_source_is_supplied_at_fetch_time() {
    let supplier = XmlSupplier::new(|| "<VAST version=\"4.0\"/>".to_string());
    let options = SlotOptions::new(RollPosition::Preroll, 0.0).with_ad_tag_xml(supplier);
    let mut s = Session::desktop(&[options]);
    s.first_play();

    assert_eq!(
        s.rec.borrow().requests[0].1,
        AdRequest::Xml("<VAST version=\"4.0\"/>".into())
    );
}

// ── Playback clock ────────────────────────────────────────────────────────

#[test]
fn ticks_are_gap_free_and_jumps_absorbed() {
    let mut s = Session::desktop(&[]);
    s.first_play();
    s.play_content(0.0, 3.0);
    s.time_update(10.0);
    s.time_update(10.5);
    s.time_update(11.0);
    s.time_update(5.0);
    s.time_update(6.0);

    assert_eq!(ticks(&s.signals()), vec![0, 1, 2, 3, 11, 6]);
}

#[test]
fn no_ticks_while_ad_is_active() {
    let mut s = Session::desktop(&[url_slot(RollPosition::Midroll, 2.0)]);
    s.first_play();
    s.play_content(0.0, 2.0);
    let ticket = s.start_ad(video_response());
    s.signals();

    // Ad progress on the shared element must not look like content.
    s.play_content(0.0, 5.0);
    assert!(ticks(&s.signals()).is_empty());

    s.orch.ad_finished(ticket, Ok(()));
    assert!(!s.orch.context().ad_active);
    s.time_update(2.5);
    s.time_update(3.0);
    assert_eq!(ticks(&s.signals()), vec![3]);
}

// ── Triggers ──────────────────────────────────────────────────────────────

#[test]
fn midroll_fires_exactly_once_on_its_tick() {
    let mut s = Session::desktop(&[url_slot(RollPosition::Midroll, 30.0)]);
    s.first_play();
    s.play_content(0.0, 29.75);
    assert!(s.rec.borrow().requests.is_empty());

    s.time_update(30.0);
    assert_eq!(s.rec.borrow().requests.len(), 1);

    let ticket = s.start_ad(video_response());
    s.orch.ad_finished(ticket, Ok(()));

    // Seeking back across the offset does not fire it again.
    s.time_update(29.0);
    s.play_content(29.25, 31.0);
    assert_eq!(s.rec.borrow().requests.len(), 1);
}

#[test]
fn midroll_skipped_by_seek_never_fires() {
    let mut s = Session::desktop(&[url_slot(RollPosition::Midroll, 30.0)]);
    s.first_play();
    s.play_content(0.0, 20.0);
    s.time_update(45.0);
    s.play_content(45.25, 60.0);
    assert!(s.rec.borrow().requests.is_empty());
}

#[test]
fn postroll_fires_after_deferred_content_end() {
    let mut s = Session::desktop(&[url_slot(RollPosition::Postroll, 0.0)]);
    s.first_play();
    s.play_content(118.0, 120.0);
    assert!(s.rec.borrow().requests.is_empty());

    s.advance_ms(99);
    assert!(s.rec.borrow().requests.is_empty());
    s.advance_ms(1);
    assert_eq!(s.rec.borrow().requests.len(), 1);
    assert!(s.signals().contains(&Signal::TimeEnd));
    assert_eq!(s.rec.borrow().poster, vec!["show"]);

    // Once the postroll settles, content is rewound to a replayable state.
    let ticket = s.start_ad(video_response());
    s.orch.player_mut().clear_calls();
    s.orch.ad_finished(ticket, Ok(()));
    let calls = s.orch.player().calls().to_vec();
    let tail = &calls[calls.len() - 3..];
    assert_eq!(tail, &[PlayerCall::Seek(0.0), PlayerCall::Play, PlayerCall::Pause]);
    assert!(s.orch.player().paused());
    assert_eq!(s.orch.content_watch(), ContentWatch::Idle);
}

// ── Pipeline ──────────────────────────────────────────────────────────────

#[test]
fn disabled_slot_has_no_side_effects() {
    let mut s = Session::desktop(&[url_slot(RollPosition::Preroll, 0.0).with_ads_enabled(false)]);
    s.first_play();

    let signals = s.signals();
    assert!(signals.contains(&Signal::AdError {
        slot: SlotId(0),
        error: AdError::Disabled,
        response: None,
    }));
    assert_eq!(s.calls(&PlayerCall::Pause), 0);
    assert_eq!(s.calls(&PlayerCall::RestoreSnapshot), 0);
    assert!(s.rec.borrow().requests.is_empty());
    assert!(!s.orch.slots()[0].has_snapshot());
}

#[test]
fn cancel_timeout_fails_with_timeout_and_halts() {
    let mut s = Session::desktop(&[url_slot(RollPosition::Preroll, 0.0).with_ad_cancel_timeout(1000)]);
    s.first_play();
    let ticket = s.last_ticket();

    s.advance_ms(999);
    assert!(s.orch.slots()[0].is_in_flight());
    s.advance_ms(1);

    let signals = s.signals();
    let cancel = signals
        .iter()
        .position(|sig| *sig == Signal::AdsCancel { slot: SlotId(0) })
        .unwrap();
    let error = signals
        .iter()
        .position(|sig| {
            matches!(sig, Signal::AdError { error, .. }
                if *error == AdError::Timeout && error.code() == Some(TIMEOUT_ERROR_CODE))
        })
        .unwrap();
    assert!(cancel < error);
    assert_eq!(s.orch.slots()[0].state(), SlotState::Errored);
    assert!(s.orch.slots()[0].is_canceled());

    // A late response is dropped: no strategy is invoked.
    s.orch.deliver_ad_response(ticket, Ok(video_response()));
    s.orch.ad_started(ticket);
    assert!(s.rec.borrow().plays.is_empty());
    assert!(!s.orch.context().ad_active);
    assert!(s.signals().is_empty());
}

#[test]
fn timed_out_slot_can_be_rearmed() {
    let mut s = Session::desktop(&[url_slot(RollPosition::Midroll, 5.0).with_ad_cancel_timeout(1000)]);
    s.first_play();
    s.play_content(0.0, 5.0);
    s.advance_ms(1000);
    assert_eq!(s.orch.slots()[0].state(), SlotState::Errored);
    assert!(!AdError::Timeout.is_retryable());

    assert!(s.orch.rearm(SlotId(0)));
    assert_eq!(s.orch.slots()[0].state(), SlotState::Idle);
    s.orch.player_mut().start_playback();
    s.time_update(4.0);
    s.time_update(5.0);
    assert_eq!(s.rec.borrow().requests.len(), 2);
    assert!(s.orch.slots()[0].is_in_flight());
}

#[test]
fn ad_start_disarms_the_timeout() {
    let mut s = Session::desktop(&[url_slot(RollPosition::Preroll, 0.0)]);
    s.first_play();
    s.start_ad(video_response());
    s.advance_ms(5000);
    assert!(!s
        .signals()
        .iter()
        .any(|sig| matches!(sig, Signal::AdError { .. })));
    assert_eq!(s.orch.slots()[0].state(), SlotState::Playing);
}

#[test]
fn successful_run_captures_and_restores_once() {
    let mut s = Session::desktop(&[url_slot(RollPosition::Midroll, 10.0)]);
    s.first_play();
    s.play_content(0.0, 10.0);
    let ticket = s.start_ad(video_response());

    assert!(s.orch.player().paused());
    assert!(s.orch.player().has_ads_label());
    s.orch.ad_finished(ticket, Ok(()));

    assert_eq!(s.calls(&PlayerCall::RestoreSnapshot), 1);
    assert!(!s.orch.slots()[0].has_snapshot());
    assert_eq!(s.orch.player().current_time(), 10.0);
    assert!(!s.orch.player().paused());
    assert!(!s.orch.player().has_ads_label());
    assert_eq!(s.calls(&PlayerCall::AddAdsLabel), 1);
    assert_eq!(s.calls(&PlayerCall::RemoveAdsLabel), 1);
    assert!(s.orch.context().ad_unit.is_none());
    assert_eq!(s.rec.borrow().poster, vec!["show", "hide"]);

    // Late duplicate completion is a no-op.
    s.orch.ad_finished(ticket, Ok(()));
    assert_eq!(s.calls(&PlayerCall::RestoreSnapshot), 1);
}

#[test]
fn interactive_creatives_use_the_interactive_strategy() {
    let mut s = Session::desktop(&[url_slot(RollPosition::Preroll, 0.0)]);
    s.first_play();
    s.start_ad(interactive_response());

    let rec = s.rec.borrow();
    let plays = &rec.plays;
    assert_eq!(plays.len(), 1);
    assert_eq!(plays[0].1, StrategyKind::Interactive);
    assert_eq!(plays[0].2.timeout, Duration::from_millis(1000));
    assert!(plays[0].2.auto_resize);
}

#[test]
fn fetch_error_is_propagated_with_its_code() {
    let mut s = Session::desktop(&[url_slot(RollPosition::Preroll, 0.0)]);
    s.first_play();
    let ticket = s.last_ticket();
    s.orch
        .deliver_ad_response(ticket, Err(AdError::fetch("no ads", Some(303))));

    let signals = s.signals();
    assert_eq!(
        signals,
        vec![
            Signal::AdsCancel { slot: SlotId(0) },
            Signal::AdError {
                slot: SlotId(0),
                error: AdError::fetch("no ads", Some(303)),
                response: None,
            },
        ]
    );
    assert_eq!(s.calls(&PlayerCall::RestoreSnapshot), 1);
    assert!(!s.orch.player().paused());
}

#[test]
fn playback_error_reports_the_response() {
    let mut s = Session::desktop(&[url_slot(RollPosition::Preroll, 0.0)]);
    s.first_play();
    let ticket = s.start_ad(video_response());
    s.signals();
    s.orch
        .ad_finished(ticket, Err(AdError::playback("media decode error", Some(405))));

    let signals = s.signals();
    assert!(matches!(
        signals.last(),
        Some(Signal::AdError { response: Some(r), .. }) if r.ad_id.as_deref() == Some("ad-42")
    ));
    assert!(!s.orch.context().ad_active);
}

#[test]
fn loading_indicator_hidden_after_failure() {
    let mut s = Session::desktop(&[url_slot(RollPosition::Preroll, 0.0)]);
    s.first_play();
    assert!(s.orch.player().is_loading());
    let ticket = s.last_ticket();
    s.orch.deliver_ad_response(ticket, Err(AdError::fetch("timeout", None)));
    assert!(s.orch.player().is_loading());
    s.advance_ms(100);
    assert!(!s.orch.player().is_loading());
}

#[test]
fn preparation_waits_for_pending_play() {
    let mut s = Session::desktop(&[url_slot(RollPosition::Preroll, 0.0)]);
    s.orch.player_mut().begin_play_transition();
    s.orch.handle(PlayerEvent::FirstPlay);
    assert!(s.rec.borrow().requests.is_empty());
    assert_eq!(s.orch.slots()[0].state(), SlotState::Preparing);

    let playing = s.orch.player_mut().finish_play_transition();
    s.orch.handle(playing);
    assert!(s.orch.player().paused());
    assert_eq!(s.rec.borrow().requests.len(), 1);
}

#[test]
fn second_slot_is_refused_while_player_is_busy() {
    let mut s = Session::desktop(&[
        url_slot(RollPosition::Midroll, 5.0),
        url_slot(RollPosition::Midroll, 6.0),
    ]);
    s.first_play();
    s.play_content(0.0, 5.0);
    // Content keeps reporting progress while the first ad is still loading.
    s.orch.player_mut().start_playback();
    s.time_update(6.0);

    assert_eq!(s.rec.borrow().requests.len(), 1);
    assert!(s.signals().iter().any(|sig| matches!(
        sig,
        Signal::AdError { slot: SlotId(1), error: AdError::Precondition { .. }, .. }
    )));
    assert_eq!(s.orch.context().owner, Some(SlotId(0)));
}

// ── Device policy ─────────────────────────────────────────────────────────

#[test]
fn iphone_refuses_preroll_after_start_window() {
    let mut s = Session::new(DeviceClass::Iphone, &[url_slot(RollPosition::Preroll, 0.0)]);
    s.orch.player_mut().set_time(3.0);
    s.first_play();

    let signals = s.signals();
    assert!(signals.iter().any(|sig| matches!(
        sig,
        Signal::AdError { error: AdError::Precondition { .. }, .. }
    )));
    assert_eq!(s.calls(&PlayerCall::Pause), 0);
    assert!(s.rec.borrow().requests.is_empty());
}

#[test]
fn iphone_allows_preroll_inside_start_window() {
    let mut s = Session::new(DeviceClass::Iphone, &[url_slot(RollPosition::Preroll, 0.0)]);
    s.orch.player_mut().set_time(1.5);
    s.first_play();
    assert_eq!(s.rec.borrow().requests.len(), 1);
}

#[test]
fn anti_skip_guard_reverts_then_pauses() {
    let mut s = Session::new(DeviceClass::Ipad, &[url_slot(RollPosition::Preroll, 0.0)]);
    s.first_play();
    s.start_ad(video_response());
    assert!(s.orch.context().guard.is_some());

    s.orch.player_mut().start_playback();
    s.play_content(0.0, 10.0);
    s.orch.player_mut().clear_calls();

    s.time_update(20.0);
    assert_eq!(s.orch.player().calls(), &[PlayerCall::Seek(10.0)]);
    assert_eq!(s.orch.context().guard.as_ref().map(|g| g.skip_attempts()), Some(1));
    assert!(!s.orch.player().paused());

    s.time_update(25.0);
    assert_eq!(
        s.orch.player().calls(),
        &[PlayerCall::Seek(10.0), PlayerCall::Seek(10.0), PlayerCall::Pause]
    );
    assert!(s.orch.player().paused());
}

#[test]
fn anti_skip_guard_resists_early_end() {
    let mut s = Session::new(DeviceClass::Iphone, &[url_slot(RollPosition::Preroll, 0.0)]);
    s.first_play();
    s.start_ad(video_response());
    s.play_content(0.0, 5.0);
    s.orch.player_mut().clear_calls();

    s.orch.handle(PlayerEvent::Ended);
    assert_eq!(
        s.orch.player().calls(),
        &[PlayerCall::Pause, PlayerCall::Play, PlayerCall::Seek(5.0)]
    );
    assert!(!s.signals().contains(&Signal::ContentEnd));
}

#[test]
fn guard_detaches_when_ad_ends() {
    let mut s = Session::new(DeviceClass::Iphone, &[url_slot(RollPosition::Preroll, 0.0)]);
    s.first_play();
    let ticket = s.start_ad(video_response());
    s.orch.ad_finished(ticket, Ok(()));
    assert!(s.orch.context().guard.is_none());

    s.orch.player_mut().clear_calls();
    s.time_update(50.0);
    assert_eq!(s.calls(&PlayerCall::Seek(0.0)), 0);
    assert!(s.orch.player().calls().is_empty());
}

#[test]
fn desktop_never_arms_the_guard() {
    let mut s = Session::desktop(&[url_slot(RollPosition::Preroll, 0.0)]);
    s.first_play();
    s.start_ad(video_response());
    assert!(s.orch.context().guard.is_none());
}

// ── Reset and lifecycle ───────────────────────────────────────────────────

#[test]
fn reset_clears_snapshot_and_cancels_in_flight_run() {
    let mut s = Session::desktop(&[
        url_slot(RollPosition::Preroll, 0.0),
        url_slot(RollPosition::Postroll, 0.0),
    ]);
    s.first_play();
    let ticket = s.last_ticket();
    assert!(s.orch.slots()[0].has_snapshot());
    s.signals();

    s.orch.reset();
    let signals = s.signals();
    assert_eq!(signals, vec![Signal::Reset, Signal::AdsCancel { slot: SlotId(0) }]);
    for slot in s.orch.slots() {
        assert!(!slot.has_snapshot());
        assert!(slot.is_canceled());
        assert_eq!(slot.state(), SlotState::Canceled);
    }
    assert!(s.orch.context().owner.is_none());

    // Late collaborator results for the canceled run are ignored.
    s.orch.deliver_ad_response(ticket, Ok(video_response()));
    assert!(s.rec.borrow().plays.is_empty());
    s.advance_ms(5000);
    assert!(!s.signals().iter().any(|sig| matches!(sig, Signal::AdError { .. })));
}

#[test]
fn reset_while_preparing_drops_the_pending_run() {
    let mut s = Session::desktop(&[url_slot(RollPosition::Preroll, 0.0)]);
    s.orch.player_mut().begin_play_transition();
    s.orch.handle(PlayerEvent::FirstPlay);
    assert_eq!(s.orch.slots()[0].state(), SlotState::Preparing);
    assert!(s.orch.slots()[0].has_snapshot());
    assert_eq!(s.calls(&PlayerCall::Pause), 1);
    s.signals();

    s.orch.reset();
    assert_eq!(
        s.signals(),
        vec![Signal::Reset, Signal::AdsCancel { slot: SlotId(0) }]
    );

    // The play that was pending at reset completes afterwards.
    let playing = s.orch.player_mut().finish_play_transition();
    s.orch.handle(playing);

    let slot = &s.orch.slots()[0];
    assert!(slot.is_canceled());
    assert!(!slot.has_snapshot());
    assert!(!slot.is_in_flight());
    assert_eq!(s.calls(&PlayerCall::Pause), 1);
    assert!(s.rec.borrow().requests.is_empty());
    assert!(s.orch.next_deadline().is_none());
    assert!(s.signals().is_empty());
}

#[test]
fn reset_disarms_the_cancel_timeout() {
    let mut s = Session::desktop(&[url_slot(RollPosition::Preroll, 0.0).with_ad_cancel_timeout(1000)]);
    s.first_play();
    assert!(s.orch.next_deadline().is_some());

    s.orch.reset();
    assert!(s.orch.next_deadline().is_none());
    s.advance_ms(1000);
    assert!(!s.signals().iter().any(|sig| matches!(sig, Signal::AdError { .. })));
}

#[test]
fn reset_during_playback_releases_the_player() {
    let mut s = Session::desktop(&[url_slot(RollPosition::Preroll, 0.0)]);
    s.first_play();
    let ticket = s.start_ad(video_response());
    s.orch.reset();

    assert!(!s.orch.context().ad_active);
    assert!(!s.orch.player().has_ads_label());
    assert!(!s.orch.player().is_loading());

    s.orch.ad_finished(ticket, Ok(()));
    assert!(!s.signals().contains(&Signal::AdEnd { slot: SlotId(0) }));
}

#[test]
fn torn_down_slots_stay_down_until_reattach() {
    let mut s = Session::desktop(&[url_slot(RollPosition::Preroll, 0.0)]);
    s.orch.reset();
    s.first_play();
    assert!(s.rec.borrow().requests.is_empty());
    assert!(!s.orch.rearm(SlotId(0)));

    s.orch.reattach();
    s.first_play();
    assert_eq!(s.rec.borrow().requests.len(), 1);
}

#[test]
fn play_ad_always_reattaches_after_content_end() {
    let mut s = Session::desktop(&[url_slot(RollPosition::Preroll, 0.0).with_play_ad_always(true)]);
    s.first_play();
    let ticket = s.start_ad(video_response());
    s.orch.ad_finished(ticket, Ok(()));
    s.orch.handle(PlayerEvent::Playing);
    s.orch.handle(PlayerEvent::Ended);
    s.advance_ms(0);

    let signals = s.signals();
    assert!(signals.contains(&Signal::ContentStart));
    assert!(signals.contains(&Signal::ContentEnd));
    assert!(signals.contains(&Signal::Reset));
    assert!(!s.orch.slots()[0].is_torn_down());

    // The next viewing plays the preroll again.
    s.first_play();
    assert_eq!(s.rec.borrow().requests.len(), 2);
}

#[test]
fn postroll_restore_skips_content_events() {
    let mut s = Session::desktop(&[url_slot(RollPosition::Postroll, 0.0)]);
    s.first_play();
    s.play_content(119.5, 120.0);
    s.advance_ms(100);
    let ticket = s.start_ad(video_response());
    s.orch.ad_finished(ticket, Ok(()));
    assert_eq!(s.orch.content_watch(), ContentWatch::Idle);
}

#[test]
fn native_poster_removed_on_entry() {
    let mut s = Session::desktop(&[url_slot(RollPosition::Preroll, 0.0)]);
    assert!(s.orch.player().has_native_poster());
    s.first_play();
    assert!(!s.orch.player().has_native_poster());
    assert_eq!(s.rec.borrow().poster, vec!["show"]);
}
