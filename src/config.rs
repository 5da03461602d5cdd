//! Slot options (as written by the embedding page) and their validated form.

use crate::device::DeviceClass;
use crate::error::{AdError, OptionsError};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

const OPTIONS_DIR: &str = "ad-orchestrator";
const OPTIONS_FILE: &str = "options.json";

// ── Roll position ──────────────────────────────────────────────────────────

/// Where in the content timeline an ad is inserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RollPosition {
    Preroll,
    Midroll,
    Postroll,
}

impl RollPosition {
    pub fn from_str_loose(s: &str) -> Result<Self, AdError> {
        match s.trim().to_lowercase().as_str() {
            "preroll" => Ok(RollPosition::Preroll),
            "midroll" => Ok(RollPosition::Midroll),
            "postroll" => Ok(RollPosition::Postroll),
            other => Err(AdError::configuration(format!(
                "unrecognized roll position '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for RollPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RollPosition::Preroll => write!(f, "preroll"),
            RollPosition::Midroll => write!(f, "midroll"),
            RollPosition::Postroll => write!(f, "postroll"),
        }
    }
}

// ── Ad source ──────────────────────────────────────────────────────────────

/// Produces an ad-tag XML document on demand.
#[derive(Clone)]
pub struct XmlSupplier(Arc<dyn Fn() -> String + Send + Sync>);

impl XmlSupplier {
    pub fn new<F>(supply: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        XmlSupplier(Arc::new(supply))
    }

    /// Supplier that always returns the same inline document.
    pub fn inline(document: String) -> Self {
        XmlSupplier::new(move || document.clone())
    }

    pub fn supply(&self) -> String {
        (self.0)()
    }
}

impl fmt::Debug for XmlSupplier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("XmlSupplier(..)")
    }
}

/// Where a slot gets its ad metadata from. Exactly one per slot.
#[derive(Debug, Clone)]
pub enum AdSource {
    Url(String),
    Xml(XmlSupplier),
}

impl AdSource {
    /// Evaluate the source into the request handed to the resolver.
    pub fn resolve(&self) -> AdRequest {
        match self {
            AdSource::Url(url) => AdRequest::Url(url.clone()),
            AdSource::Xml(supplier) => AdRequest::Xml(supplier.supply()),
        }
    }
}

/// A resolved ad source, as passed to the ad resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdRequest {
    Url(String),
    Xml(String),
}

// ── Raw options ────────────────────────────────────────────────────────────

/// Per-slot options as they appear in the plugin options JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotOptions {
    #[serde(default)]
    pub roll_position: Option<String>,
    /// Seconds from content start. Required for every slot, used by midrolls.
    #[serde(default)]
    pub offset: Option<f64>,
    #[serde(default)]
    pub ad_tag_url: Option<String>,
    /// Legacy alias for `adTagUrl`.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(
        default,
        rename = "adTagXML",
        alias = "adTagXml",
        deserialize_with = "inline_xml",
        skip_serializing
    )]
    pub ad_tag_xml: Option<XmlSupplier>,
    /// Timeout for strategy scripts and stages, milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout: u64,
    /// Milliseconds to wait for the ad to start before giving up.
    #[serde(default = "default_timeout_ms")]
    pub ad_cancel_timeout: u64,
    /// Preroll start window on unreliable-clock devices, milliseconds.
    #[serde(default = "default_preroll_window_ms")]
    pub ios_preroll_cancel_timeout: u64,
    #[serde(default)]
    pub play_ad_always: bool,
    #[serde(default = "default_true")]
    pub ads_enabled: bool,
    #[serde(default = "default_true")]
    pub auto_resize: bool,
    /// Log level requested by this slot. See [`PluginOptions::log_level`].
    #[serde(
        default,
        deserialize_with = "log_level",
        skip_serializing_if = "Option::is_none"
    )]
    pub verbosity: Option<String>,
}

fn default_timeout_ms() -> u64 {
    1000
}

fn default_preroll_window_ms() -> u64 {
    2000
}

fn default_true() -> bool {
    true
}

/// Level names indexed by the numeric verbosity of older option files.
const VERBOSITY_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

#[derive(Deserialize)]
#[serde(untagged)]
enum RawVerbosity {
    Level(u64),
    Name(String),
}

/// Accept either a level name or a number (0 = error up to 4 = trace).
fn log_level<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<RawVerbosity>::deserialize(deserializer)? {
        Some(RawVerbosity::Level(n)) => {
            let index = (n as usize).min(VERBOSITY_LEVELS.len() - 1);
            Some(VERBOSITY_LEVELS[index].to_string())
        }
        Some(RawVerbosity::Name(name)) => Some(name),
        None => None,
    })
}

fn inline_xml<'de, D>(deserializer: D) -> Result<Option<XmlSupplier>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.map(XmlSupplier::inline))
}

impl SlotOptions {
    pub fn new(roll_position: RollPosition, offset: f64) -> Self {
        SlotOptions {
            roll_position: Some(roll_position.to_string()),
            offset: Some(offset),
            ad_tag_url: None,
            url: None,
            ad_tag_xml: None,
            timeout: default_timeout_ms(),
            ad_cancel_timeout: default_timeout_ms(),
            ios_preroll_cancel_timeout: default_preroll_window_ms(),
            play_ad_always: false,
            ads_enabled: true,
            auto_resize: true,
            verbosity: None,
        }
    }

    pub fn with_ad_tag_url(mut self, url: impl Into<String>) -> Self {
        self.ad_tag_url = Some(url.into());
        self
    }

    pub fn with_ad_tag_xml(mut self, supplier: XmlSupplier) -> Self {
        self.ad_tag_xml = Some(supplier);
        self
    }

    pub fn with_ad_cancel_timeout(mut self, millis: u64) -> Self {
        self.ad_cancel_timeout = millis;
        self
    }

    pub fn with_ads_enabled(mut self, enabled: bool) -> Self {
        self.ads_enabled = enabled;
        self
    }

    pub fn with_play_ad_always(mut self, always: bool) -> Self {
        self.play_ad_always = always;
        self
    }
}

// ── Validated config ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlotTimeouts {
    /// Budget handed to playback strategies for their own loading steps.
    pub stage: Duration,
    pub ad_cancel: Duration,
    pub preroll_window_secs: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotFlags {
    pub ads_enabled: bool,
    pub play_ad_always: bool,
    pub auto_resize: bool,
}

/// Immutable, validated settings of one ad slot.
#[derive(Debug, Clone)]
pub struct AdSlotConfig {
    pub position: RollPosition,
    pub offset: f64,
    pub source: AdSource,
    pub timeouts: SlotTimeouts,
    pub flags: SlotFlags,
}

impl AdSlotConfig {
    /// Validate raw options. The ad source is checked before the offset.
    pub fn from_options(options: &SlotOptions) -> Result<Self, AdError> {
        let url = options.ad_tag_url.clone().or_else(|| options.url.clone());
        let source = match (url, options.ad_tag_xml.clone()) {
            (Some(url), None) => AdSource::Url(url),
            (None, Some(supplier)) => AdSource::Xml(supplier),
            (Some(_), Some(_)) => {
                return Err(AdError::configuration(
                    "both adTagUrl and adTagXML are set, only one ad source is allowed",
                ));
            }
            (None, None) => {
                return Err(AdError::configuration("missing adTagUrl on options object"));
            }
        };

        let offset = match options.offset {
            Some(offset) if offset.is_finite() && offset >= 0.0 => offset,
            _ => return Err(AdError::configuration("invalid ad offset")),
        };

        let position = match options.roll_position.as_deref() {
            Some(raw) => RollPosition::from_str_loose(raw)?,
            None => return Err(AdError::configuration("missing roll position")),
        };

        Ok(AdSlotConfig {
            position,
            offset,
            source,
            timeouts: SlotTimeouts {
                stage: Duration::from_millis(options.timeout),
                ad_cancel: Duration::from_millis(options.ad_cancel_timeout),
                preroll_window_secs: options.ios_preroll_cancel_timeout as f64 / 1000.0,
            },
            flags: SlotFlags {
                ads_enabled: options.ads_enabled,
                play_ad_always: options.play_ad_always,
                auto_resize: options.auto_resize,
            },
        })
    }

    /// Whole content second at which a midroll becomes eligible.
    ///
    /// Fractional offsets round up so an ad never starts before its offset.
    pub fn trigger_second(&self) -> u64 {
        self.offset.ceil() as u64
    }
}

// ── Plugin options file ────────────────────────────────────────────────────

/// Top-level plugin options: logging, device selection and the slot list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginOptions {
    /// Default log level (`error`, `warn`, `info`, `debug`, `trace`, or 0-4).
    #[serde(
        default,
        deserialize_with = "log_level",
        skip_serializing_if = "Option::is_none"
    )]
    pub verbosity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub ads: Vec<SlotOptions>,
}

impl PluginOptions {
    /// Default options location: `<config dir>/ad-orchestrator/options.json`.
    pub fn default_path() -> Result<PathBuf, OptionsError> {
        dirs::config_dir()
            .map(|dir| dir.join(OPTIONS_DIR).join(OPTIONS_FILE))
            .ok_or(OptionsError::NoConfigDir)
    }

    pub fn load(path: &Path) -> Result<Self, OptionsError> {
        let data = fs::read_to_string(path).map_err(|source| OptionsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&data)
    }

    pub fn from_json(data: &str) -> Result<Self, OptionsError> {
        Ok(serde_json::from_str(data)?)
    }

    /// Device class: an explicit `device` wins over `userAgent` detection.
    pub fn device_class(&self) -> Result<DeviceClass, OptionsError> {
        if let Some(name) = &self.device {
            return name.parse();
        }
        Ok(self
            .user_agent
            .as_deref()
            .map(DeviceClass::from_user_agent)
            .unwrap_or_default())
    }

    /// Log level for the session. The top-level setting wins; otherwise
    /// the last slot that names one.
    pub fn log_level(&self) -> Option<&str> {
        self.verbosity
            .as_deref()
            .or_else(|| self.ads.iter().rev().find_map(|ad| ad.verbosity.as_deref()))
    }

    pub fn has_preroll(&self) -> bool {
        self.ads.iter().any(|ad| {
            ad.roll_position
                .as_deref()
                .and_then(|p| RollPosition::from_str_loose(p).ok())
                == Some(RollPosition::Preroll)
        })
    }
}
