//! Rig configuration
//!
//! A rig is one physical boat: which port its microcontroller is on, which
//! sensors the firmware answers for, and how its rudder and winch are
//! calibrated. Loaded from TOML or picked from the built-in presets.

use crate::boat::actuator::{RudderMapping, SailMapping};
use crate::error::{Error, Result};
use crate::link::DEFAULT_BAUD;
use crate::position::gpsd::DEFAULT_GPSD_ADDR;
use crate::position::{DEFAULT_POLL_TIMEOUT, DEFAULT_RETRY_BUDGET};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Names accepted by [`RigConfig::preset`]
pub const PRESETS: &[&str] = &["dewi", "xpb", "kitty"];

/// Complete capability descriptor for one rig
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RigConfig {
    pub name: String,
    pub serial: SerialConfig,
    pub gpsd: GpsdConfig,
    pub sensors: SensorConfig,
    pub rudder: RudderMapping,
    pub sail: SailMapping,
    pub reconnect: ReconnectConfig,
}

/// Microcontroller link
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Device path (e.g., "/dev/arduino")
    pub port: String,
    pub baud: u32,
    /// Firmware prints one line after reset that must be thrown away
    pub discard_banner: bool,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: "/dev/arduino".to_string(),
            baud: DEFAULT_BAUD,
            discard_banner: false,
        }
    }
}

/// Positioning daemon
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct GpsdConfig {
    /// host:port of gpsd
    pub address: String,
    /// Per-attempt wait for a report
    pub poll_timeout_ms: u64,
    /// Non-TPV reports tolerated after the first one in a single poll
    pub retry_budget: usize,
}

impl Default for GpsdConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_GPSD_ADDR.to_string(),
            poll_timeout_ms: DEFAULT_POLL_TIMEOUT.as_millis() as u64,
            retry_budget: DEFAULT_RETRY_BUDGET,
        }
    }
}

impl GpsdConfig {
    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }
}

/// Which sensor queries the firmware supports
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SensorConfig {
    pub pitch: bool,
    pub roll: bool,
    pub wind: WindSource,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            pitch: false,
            roll: false,
            wind: WindSource::Vane,
        }
    }
}

/// Where wind direction comes from
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WindSource {
    /// Masthead vane read with the `w` command, relative to the bow
    Vane,
    /// No vane; a configured absolute direction in degrees
    Fixed { absolute: f64 },
    /// Rig reports no wind at all
    #[serde(rename = "none")]
    Unsupported,
}

/// Connection retry policy
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ReconnectConfig {
    /// Sleep before every connection attempt so devices finish resetting
    pub settle_delay_ms: u64,
    pub attempts: u32,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: 0,
            attempts: 1,
        }
    }
}

impl ReconnectConfig {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

impl Default for RigConfig {
    fn default() -> Self {
        Self::dewi()
    }
}

impl RigConfig {
    /// Vane, linear winch over 1100-2100
    pub fn dewi() -> Self {
        Self {
            name: "dewi".to_string(),
            serial: SerialConfig::default(),
            gpsd: GpsdConfig::default(),
            sensors: SensorConfig::default(),
            rudder: RudderMapping::default(),
            sail: SailMapping::default(),
            reconnect: ReconnectConfig::default(),
        }
    }

    /// Pitch/roll compass, no vane, range-normalized winch over 1365-1800
    pub fn xpb() -> Self {
        Self {
            name: "xpb".to_string(),
            sensors: SensorConfig {
                pitch: true,
                roll: true,
                wind: WindSource::Fixed { absolute: 180.0 },
            },
            sail: SailMapping::RangeNormalized {
                max_sail_angle: 70.0,
                full_in: 1800,
                full_out: 1365,
            },
            reconnect: ReconnectConfig {
                settle_delay_ms: 1000,
                attempts: 3,
            },
            ..Self::dewi()
        }
    }

    /// Same wiring as dewi, but the firmware prints a banner line on reset
    pub fn kitty() -> Self {
        Self {
            name: "kitty".to_string(),
            serial: SerialConfig {
                discard_banner: true,
                ..SerialConfig::default()
            },
            ..Self::dewi()
        }
    }

    pub fn preset(name: &str) -> Result<Self> {
        match name {
            "dewi" => Ok(Self::dewi()),
            "xpb" => Ok(Self::xpb()),
            "kitty" => Ok(Self::kitty()),
            other => Err(Error::Config(format!(
                "unknown rig preset {:?} (known: {})",
                other,
                PRESETS.join(", ")
            ))),
        }
    }

    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject calibrations that cannot produce a sane PWM value
    pub fn validate(&self) -> Result<()> {
        if self.rudder.min >= self.rudder.max {
            return Err(Error::Config(format!(
                "rudder range {}..{} is empty",
                self.rudder.min, self.rudder.max
            )));
        }
        match self.sail {
            SailMapping::Linear { max_angle, min, max, .. } => {
                if max_angle <= 0.0 || min >= max {
                    return Err(Error::Config("linear sail mapping needs max_angle > 0 and min < max".to_string()));
                }
            }
            SailMapping::RangeNormalized { max_sail_angle, full_in, full_out } => {
                if max_sail_angle <= 0.0 || full_out >= full_in {
                    return Err(Error::Config(
                        "range-normalized sail mapping needs max_sail_angle > 0 and full_out < full_in".to_string(),
                    ));
                }
            }
            SailMapping::NoWinch => {}
        }
        if self.reconnect.attempts == 0 {
            return Err(Error::Config("reconnect.attempts must be at least 1".to_string()));
        }
        Ok(())
    }
}
