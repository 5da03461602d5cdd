//! Error types for ad slots, the ad pipeline, options loading and simulation.

use std::path::PathBuf;
use thiserror::Error;

/// Error code reported when no ad started before the cancel timeout.
pub const TIMEOUT_ERROR_CODE: u16 = 402;

/// Everything that can abort an ad slot or one of its pipeline runs.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AdError {
    /// Invalid slot options. Fatal to the slot; nothing is bound.
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// The slot's ads-enabled flag is off.
    #[error("ads are not enabled")]
    Disabled,

    /// The player is not in a state where this ad may play.
    #[error("precondition failed: {message}")]
    Precondition { message: String },

    /// No ad started before the cancel timeout elapsed.
    #[error("timeout while waiting for the video to start playing")]
    Timeout,

    /// The ad resolver could not produce a response.
    #[error("ad fetch failed: {message}")]
    Fetch { message: String, code: Option<u16> },

    /// The playback strategy failed to play the ad.
    #[error("ad playback failed: {message}")]
    Playback { message: String, code: Option<u16> },
}

impl AdError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn precondition(message: impl Into<String>) -> Self {
        Self::Precondition {
            message: message.into(),
        }
    }

    pub fn fetch(message: impl Into<String>, code: Option<u16>) -> Self {
        Self::Fetch {
            message: message.into(),
            code,
        }
    }

    pub fn playback(message: impl Into<String>, code: Option<u16>) -> Self {
        Self::Playback {
            message: message.into(),
            code,
        }
    }

    /// Numeric error code, when the error kind carries one.
    pub fn code(&self) -> Option<u16> {
        match self {
            AdError::Timeout => Some(TIMEOUT_ERROR_CODE),
            AdError::Fetch { code, .. } | AdError::Playback { code, .. } => *code,
            _ => None,
        }
    }

    /// Whether the failure can clear without anything changing in the ad
    /// setup: a disabled slot plays once ads are enabled again.
    ///
    /// Every other kind is final for the trigger occurrence that produced
    /// it. This does not gate [`Orchestrator::rearm`], which lets the host
    /// start a fresh occurrence after any pipeline failure.
    ///
    /// [`Orchestrator::rearm`]: crate::orchestrator::Orchestrator::rearm
    pub fn is_retryable(&self) -> bool {
        matches!(self, AdError::Disabled)
    }
}

/// Failure while reading or interpreting a plugin options file.
#[derive(Error, Debug)]
pub enum OptionsError {
    #[error("cannot read options file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid options JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unknown device class '{0}'")]
    UnknownDevice(String),

    #[error("no default options location on this platform")]
    NoConfigDir,
}

/// Failure to set up a simulated session.
#[derive(Error, Debug)]
pub enum SimulationError {
    #[error(transparent)]
    Options(#[from] OptionsError),

    #[error("invalid {name} {value}: must be a non-negative number of seconds")]
    InvalidLength { name: &'static str, value: f64 },

    #[error("simulation step must be greater than zero")]
    ZeroStep,
}
