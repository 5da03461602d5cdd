//! Host player seam and an in-memory player for the CLI and tests.

/// Player state captured right before an ad takes over.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentSnapshot {
    pub paused: bool,
    pub current_time: f64,
    pub duration: f64,
    pub source: Option<String>,
    pub active_text_track: Option<String>,
}

/// Lifecycle and progress events the host forwards to the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlayerEvent {
    /// The viewer started playback for the first time.
    FirstPlay,
    Playing,
    TimeUpdate { current_time: f64, duration: f64 },
    Ended,
}

/// The media player ads are inserted into.
pub trait HostPlayer {
    fn play(&mut self);
    fn pause(&mut self);
    fn paused(&self) -> bool;
    fn current_time(&self) -> f64;
    fn set_current_time(&mut self, seconds: f64);
    fn duration(&self) -> f64;

    fn capture_snapshot(&self) -> ContentSnapshot;
    fn restore_snapshot(&mut self, snapshot: ContentSnapshot);

    /// Show or hide the loading indicator.
    fn set_loading(&mut self, loading: bool);

    /// Control-bar marker shown while an ad plays.
    fn has_ads_label(&self) -> bool;
    fn add_ads_label(&mut self);
    fn remove_ads_label(&mut self);

    fn remove_native_poster(&mut self);
}

// ── Simulated player ───────────────────────────────────────────────────────

/// Every call made on a [`SimulatedPlayer`], in order.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerCall {
    Play,
    Pause,
    Seek(f64),
    CaptureSnapshot,
    RestoreSnapshot,
    SetLoading(bool),
    AddAdsLabel,
    RemoveAdsLabel,
    RemoveNativePoster,
}

/// Player that keeps its state in memory and records every call.
///
/// A play transition can be left pending to model players that only settle
/// into `paused` after the in-flight `play()` completes.
#[derive(Debug, Clone)]
pub struct SimulatedPlayer {
    paused: bool,
    current_time: f64,
    duration: f64,
    source: Option<String>,
    text_track: Option<String>,
    loading: bool,
    ads_label: bool,
    native_poster: bool,
    play_pending: bool,
    calls: Vec<PlayerCall>,
}

impl SimulatedPlayer {
    pub fn new(duration: f64) -> Self {
        SimulatedPlayer {
            paused: true,
            current_time: 0.0,
            duration,
            source: None,
            text_track: None,
            loading: false,
            ads_label: false,
            native_poster: true,
            play_pending: false,
            calls: Vec::new(),
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_text_track(mut self, track: impl Into<String>) -> Self {
        self.text_track = Some(track.into());
        self
    }

    /// Move the playhead without recording a seek, as normal playback does.
    pub fn set_time(&mut self, seconds: f64) {
        self.current_time = seconds;
    }

    /// Start playing without recording a call, as the viewer would.
    pub fn start_playback(&mut self) {
        self.paused = false;
    }

    /// Enter a state where `pause()` cannot take effect yet.
    pub fn begin_play_transition(&mut self) {
        self.paused = false;
        self.play_pending = true;
    }

    /// Complete the pending play. The host should now report `Playing`.
    pub fn finish_play_transition(&mut self) -> PlayerEvent {
        self.play_pending = false;
        self.paused = false;
        PlayerEvent::Playing
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn has_native_poster(&self) -> bool {
        self.native_poster
    }

    pub fn calls(&self) -> &[PlayerCall] {
        &self.calls
    }

    pub fn count(&self, call: &PlayerCall) -> usize {
        self.calls.iter().filter(|c| *c == call).count()
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }
}

impl HostPlayer for SimulatedPlayer {
    fn play(&mut self) {
        self.calls.push(PlayerCall::Play);
        self.paused = false;
    }

    fn pause(&mut self) {
        self.calls.push(PlayerCall::Pause);
        if !self.play_pending {
            self.paused = true;
        }
    }

    fn paused(&self) -> bool {
        self.paused
    }

    fn current_time(&self) -> f64 {
        self.current_time
    }

    fn set_current_time(&mut self, seconds: f64) {
        self.calls.push(PlayerCall::Seek(seconds));
        self.current_time = seconds;
    }

    fn duration(&self) -> f64 {
        self.duration
    }

    fn capture_snapshot(&self) -> ContentSnapshot {
        ContentSnapshot {
            paused: self.paused,
            current_time: self.current_time,
            duration: self.duration,
            source: self.source.clone(),
            active_text_track: self.text_track.clone(),
        }
    }

    fn restore_snapshot(&mut self, snapshot: ContentSnapshot) {
        self.calls.push(PlayerCall::RestoreSnapshot);
        self.current_time = snapshot.current_time;
        self.duration = snapshot.duration;
        self.source = snapshot.source;
        self.text_track = snapshot.active_text_track;
        self.paused = snapshot.paused;
    }

    fn set_loading(&mut self, loading: bool) {
        self.calls.push(PlayerCall::SetLoading(loading));
        self.loading = loading;
    }

    fn has_ads_label(&self) -> bool {
        self.ads_label
    }

    fn add_ads_label(&mut self) {
        self.calls.push(PlayerCall::AddAdsLabel);
        self.ads_label = true;
    }

    fn remove_ads_label(&mut self) {
        self.calls.push(PlayerCall::RemoveAdsLabel);
        self.ads_label = false;
    }

    fn remove_native_poster(&mut self) {
        self.calls.push(PlayerCall::RemoveNativePoster);
        self.native_poster = false;
    }
}
