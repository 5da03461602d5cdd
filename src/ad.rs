//! Ad responses and the collaborators that fetch and play them.
//!
//! Fetching and rendering are owned by external components. The orchestrator
//! starts them through these traits and hears back through
//! `Orchestrator::deliver_ad_response`, `Orchestrator::ad_started` and
//! `Orchestrator::ad_finished`, each keyed by the run's [`AdTicket`].

use crate::config::AdRequest;
use crate::pipeline::AdTicket;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// API framework name that marks an interactive creative.
pub const INTERACTIVE_API_FRAMEWORK: &str = "VPAID";

/// One candidate rendition of an ad creative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaFile {
    pub url: String,
    pub mime_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_framework: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bitrate: Option<u32>,
}

impl MediaFile {
    pub fn new(url: impl Into<String>, mime_type: impl Into<String>) -> Self {
        MediaFile {
            url: url.into(),
            mime_type: mime_type.into(),
            api_framework: None,
            width: None,
            height: None,
            bitrate: None,
        }
    }

    pub fn with_api_framework(mut self, framework: impl Into<String>) -> Self {
        self.api_framework = Some(framework.into());
        self
    }

    /// True for creatives that must run in the sandboxed interactive player.
    pub fn is_interactive(&self) -> bool {
        self.api_framework
            .as_deref()
            .is_some_and(|f| f.eq_ignore_ascii_case(INTERACTIVE_API_FRAMEWORK))
    }
}

/// Which playback strategy renders a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    Interactive,
    Declarative,
}

/// Resolved ad metadata, as produced by the ad resolver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ad_id: Option<String>,
    pub media_files: Vec<MediaFile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<f64>,
}

impl AdResponse {
    pub fn new(media_files: Vec<MediaFile>) -> Self {
        AdResponse {
            ad_id: None,
            media_files,
            duration_secs: None,
        }
    }

    /// Interactive as soon as any candidate media file is interactive.
    pub fn strategy_kind(&self) -> StrategyKind {
        if self.media_files.iter().any(MediaFile::is_interactive) {
            StrategyKind::Interactive
        } else {
            StrategyKind::Declarative
        }
    }
}

/// Handle to an ad that a strategy is currently playing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdUnit {
    pub ticket: AdTicket,
    pub kind: StrategyKind,
    /// Strategy-specific identifier (element id, iframe name, ...).
    pub handle: String,
}

/// Per-slot settings forwarded to the playback strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrategySettings {
    pub timeout: Duration,
    pub auto_resize: bool,
}

/// Fetches ad metadata. The result arrives later through
/// `Orchestrator::deliver_ad_response` with the same ticket.
pub trait AdResolver {
    fn request(&mut self, ticket: AdTicket, request: AdRequest);
}

/// Plays one ad response. Must report start through
/// `Orchestrator::ad_started` and completion exactly once through
/// `Orchestrator::ad_finished`.
pub trait PlaybackStrategy {
    fn play_ad(&mut self, ticket: AdTicket, response: &AdResponse, settings: &StrategySettings)
        -> AdUnit;
}

/// Shared overlay that hides the content frame around an ad.
pub trait BlackPoster {
    fn show(&mut self);
    fn hide(&mut self);
}

/// The external components a player's ads depend on.
pub struct AdServices {
    pub resolver: Box<dyn AdResolver>,
    pub interactive: Box<dyn PlaybackStrategy>,
    pub declarative: Box<dyn PlaybackStrategy>,
    pub black_poster: Option<Box<dyn BlackPoster>>,
}

impl AdServices {
    pub fn strategy(&mut self, kind: StrategyKind) -> &mut dyn PlaybackStrategy {
        match kind {
            StrategyKind::Interactive => self.interactive.as_mut(),
            StrategyKind::Declarative => self.declarative.as_mut(),
        }
    }

    pub fn show_black_poster(&mut self) {
        if let Some(poster) = self.black_poster.as_mut() {
            poster.show();
        }
    }

    pub fn hide_black_poster(&mut self) {
        if let Some(poster) = self.black_poster.as_mut() {
            poster.hide();
        }
    }
}
