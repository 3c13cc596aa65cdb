//! Engine configuration and presets
//!
//! The game shipped in several flavours that differ only in these knobs:
//! growth rate, crash table, whether there is a join countdown, how the
//! next round is armed, and whether a crash wipes the accumulated discount.

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::ConfigError;
use crate::sim::CrashTable;

/// Named configurations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Preset {
    /// Press ignite to fly, no countdown
    #[default]
    Classic,
    /// Rounds launch on a timer; press ignite during the countdown to join
    Countdown,
}

impl Preset {
    pub fn as_str(&self) -> &'static str {
        match self {
            Preset::Classic => "Classic",
            Preset::Countdown => "Countdown",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "classic" => Some(Preset::Classic),
            "countdown" | "join" => Some(Preset::Countdown),
            _ => None,
        }
    }
}

/// How the next round gets armed after the post-round delay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum RestartPolicy {
    /// Back to idle; the player must ignite again
    ///
    /// A configured countdown only opens the first round (via `start`).
    /// Later rounds launch directly from `ignite`.
    #[default]
    Manual,
    /// Open the countdown again, or launch straight away without one
    Automatic,
}

/// When a crash wipes the accumulated discount
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ResetPolicy {
    #[default]
    Always,
    /// Only rounds the player joined can cost them anything
    OnlyIfJoined,
}

/// What the discount freezes at when the rocket crashes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum CrashFreeze {
    /// Clamp to the crash point
    #[default]
    AtCrashPoint,
    /// Keep the value of the tick that detected the crash
    Overshoot,
}

/// Engine parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Discount points per second of flight
    pub growth_rate: f64,
    pub start_discount: f64,
    pub max_discount: f64,
    /// Growth ticker cadence
    pub tick_interval_ms: f64,
    /// Join window length; 0 disables the countdown
    pub countdown_secs: u32,
    /// Pause after a crash or cash-out
    pub rearm_delay_ms: f64,
    pub restart: RestartPolicy,
    pub reset: ResetPolicy,
    pub crash_freeze: CrashFreeze,
    pub crash_table: CrashTable,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            growth_rate: DEFAULT_GROWTH_RATE,
            start_discount: START_DISCOUNT,
            max_discount: MAX_DISCOUNT,
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            countdown_secs: 0,
            rearm_delay_ms: DEFAULT_REARM_DELAY_MS,
            restart: RestartPolicy::Manual,
            reset: ResetPolicy::Always,
            crash_freeze: CrashFreeze::AtCrashPoint,
            crash_table: CrashTable::classic(),
        }
    }
}

impl EngineConfig {
    /// Configuration for a named preset
    pub fn from_preset(preset: Preset) -> Self {
        match preset {
            Preset::Classic => Self::default(),
            Preset::Countdown => Self {
                countdown_secs: DEFAULT_COUNTDOWN_SECS,
                restart: RestartPolicy::Automatic,
                reset: ResetPolicy::OnlyIfJoined,
                crash_table: CrashTable::five_sixths(),
                ..Self::default()
            },
        }
    }

    /// Parse and validate a JSON config; missing fields take Classic defaults
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Whether rounds open with a join countdown
    pub fn has_countdown(&self) -> bool {
        self.countdown_secs > 0
    }

    /// Reject anything the engine cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.growth_rate.is_finite() || self.growth_rate <= 0.0 {
            return Err(ConfigError::InvalidGrowthRate(self.growth_rate));
        }
        if !self.tick_interval_ms.is_finite() || self.tick_interval_ms <= 0.0 {
            return Err(ConfigError::InvalidTickInterval(self.tick_interval_ms));
        }
        if !self.rearm_delay_ms.is_finite() || self.rearm_delay_ms < 0.0 {
            return Err(ConfigError::InvalidRearmDelay(self.rearm_delay_ms));
        }
        let bounds_ok = self.start_discount.is_finite()
            && self.max_discount.is_finite()
            && self.start_discount > 0.0
            && self.start_discount < self.max_discount
            && self.max_discount <= MAX_DISCOUNT;
        if !bounds_ok {
            return Err(ConfigError::InvalidDiscountBounds {
                start: self.start_discount,
                max: self.max_discount,
            });
        }
        self.crash_table.validate()?;
        // A crash point the curve never reaches would leave the round flying forever
        for (index, band) in self.crash_table.bands().iter().enumerate() {
            if band.max > self.max_discount {
                return Err(ConfigError::CrashPointAboveMax {
                    index,
                    band_max: band.max,
                    max: self.max_discount,
                });
            }
        }
        Ok(())
    }
}
