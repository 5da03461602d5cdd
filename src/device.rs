//! Device policy, chosen once per player and consulted by the pipeline and guard.

use crate::config::RollPosition;
use crate::error::{AdError, OptionsError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Broad device families that change how ads may be played.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceClass {
    #[default]
    Desktop,
    Android,
    Iphone,
    Ipod,
    Ipad,
}

impl DeviceClass {
    /// Classify a browser user-agent string.
    pub fn from_user_agent(user_agent: &str) -> Self {
        if user_agent.contains("iPhone") {
            DeviceClass::Iphone
        } else if user_agent.contains("iPod") {
            DeviceClass::Ipod
        } else if user_agent.contains("iPad") {
            DeviceClass::Ipad
        } else if user_agent.contains("Android") {
            DeviceClass::Android
        } else {
            DeviceClass::Desktop
        }
    }

    /// Handheld Apple devices whose native controls allow scrubbing ads.
    pub fn is_apple_mobile(&self) -> bool {
        matches!(self, DeviceClass::Iphone | DeviceClass::Ipod | DeviceClass::Ipad)
    }

    /// Devices whose first-play signal is unreliable.
    pub fn has_unreliable_first_play(&self) -> bool {
        matches!(self, DeviceClass::Iphone | DeviceClass::Ipod)
    }
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeviceClass::Desktop => "desktop",
            DeviceClass::Android => "android",
            DeviceClass::Iphone => "iphone",
            DeviceClass::Ipod => "ipod",
            DeviceClass::Ipad => "ipad",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for DeviceClass {
    type Err = OptionsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "desktop" => Ok(DeviceClass::Desktop),
            "android" => Ok(DeviceClass::Android),
            "iphone" => Ok(DeviceClass::Iphone),
            "ipod" => Ok(DeviceClass::Ipod),
            "ipad" => Ok(DeviceClass::Ipad),
            other => Err(OptionsError::UnknownDevice(other.to_string())),
        }
    }
}

/// When a preroll may still start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrerollEligibility {
    /// Any time the first-play event arrives.
    Always,
    /// Only while playback is still within the slot's start window.
    StartWindow,
}

/// Capabilities selected once at construction from the device class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceProfile {
    pub class: DeviceClass,
    pub preroll_eligibility: PrerollEligibility,
    pub anti_skip_guard: bool,
}

impl DeviceProfile {
    pub fn for_class(class: DeviceClass) -> Self {
        DeviceProfile {
            class,
            preroll_eligibility: if class.has_unreliable_first_play() {
                PrerollEligibility::StartWindow
            } else {
                PrerollEligibility::Always
            },
            anti_skip_guard: class.is_apple_mobile(),
        }
    }

    pub fn needs_anti_skip_guard(&self) -> bool {
        self.anti_skip_guard
    }

    /// Refuse a preroll once content is already past the start window.
    pub fn check_eligibility(
        &self,
        position: RollPosition,
        current_time: f64,
        window_secs: f64,
    ) -> Result<(), AdError> {
        if position != RollPosition::Preroll {
            return Ok(());
        }
        match self.preroll_eligibility {
            PrerollEligibility::Always => Ok(()),
            PrerollEligibility::StartWindow if current_time <= window_secs => Ok(()),
            PrerollEligibility::StartWindow => Err(AdError::precondition(
                "video content has been playing before preroll ad",
            )),
        }
    }
}

impl Default for DeviceProfile {
    fn default() -> Self {
        Self::for_class(DeviceClass::Desktop)
    }
}
