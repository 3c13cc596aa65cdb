//! Rocket Discount - a crash-style mini-game that awards a discount coupon
//!
//! Core modules:
//! - `sim`: Round engine (growth, crash sampling, scheduling, accounting)
//! - `config`: Engine parameters and named presets
//! - `observer`: Boundary to whatever renders the rocket
//! - `history`: Recent round outcomes

pub mod config;
pub mod error;
pub mod history;
pub mod observer;
pub mod sim;

pub use config::{CrashFreeze, EngineConfig, Preset, ResetPolicy, RestartPolicy};
pub use error::ConfigError;
pub use history::{Outcome, RoundHistory, RoundRecord};
pub use observer::{LogObserver, Observer};
pub use sim::{EngineEvent, EnginePhase, RoundEngine, RoundStatus, Snapshot};

/// Reference constants
pub mod consts {
    /// Discount every round starts from (percent)
    pub const START_DISCOUNT: f64 = 0.01;
    /// Hard ceiling on the discount (percent)
    pub const MAX_DISCOUNT: f64 = 100.0;
    /// Discount points gained per second of flight
    pub const DEFAULT_GROWTH_RATE: f64 = 0.2;
    /// Growth ticker cadence
    pub const DEFAULT_TICK_INTERVAL_MS: f64 = 50.0;
    /// Pause between a finished round and re-arming
    pub const DEFAULT_REARM_DELAY_MS: f64 = 2000.0;
    /// Countdown length used by the opt-in preset
    pub const DEFAULT_COUNTDOWN_SECS: u32 = 5;
    /// Countdown step length
    pub const COUNTDOWN_STEP_MS: f64 = 1000.0;
    /// Discounts closer than this to the crash point count as reaching it
    pub const CRASH_EPSILON: f64 = 1e-9;
}

/// Round a percentage to hundredths
#[inline]
pub fn round_to_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Format a discount for display, e.g. `1.25%`
#[inline]
pub fn format_percent(value: f64) -> String {
    format!("{:.2}%", value)
}
