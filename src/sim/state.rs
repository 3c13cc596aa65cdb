//! Round and session state
//!
//! Everything a renderer may look at lives here, together with the events
//! the engine reports on every tick and transition.

use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::history::RoundHistory;

/// Where the engine is in its cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnginePhase {
    /// Waiting for `ignite`
    Idle,
    /// Join window before an automatic start
    Countdown,
    /// Rocket in flight, discount growing
    Active,
    /// Round lost, waiting out the re-arm delay
    Crashed,
    /// Round won, waiting out the re-arm delay
    CashedOut,
}

impl EnginePhase {
    /// Post-round delay in progress
    pub fn is_terminal(&self) -> bool {
        matches!(self, EnginePhase::Crashed | EnginePhase::CashedOut)
    }
}

/// Status of a single round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundStatus {
    /// Not started yet
    Pending,
    Active,
    Crashed,
    CashedOut,
}

/// One flight from ignition to crash or cash-out
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Round {
    /// 1-based round counter within the session
    pub number: u32,
    /// Current discount (frozen once the round ends)
    pub discount: f64,
    /// Hidden threshold, sampled once at start
    crash_point: f64,
    /// Start time (ms, same clock as `advance`)
    pub started_at_ms: f64,
    pub status: RoundStatus,
    /// Whether this round counts the player in
    pub joined: bool,
}

impl Round {
    pub fn new(number: u32, crash_point: f64, start_discount: f64, now_ms: f64, joined: bool) -> Self {
        Self {
            number,
            discount: start_discount,
            crash_point,
            started_at_ms: now_ms,
            status: RoundStatus::Active,
            joined,
        }
    }

    pub fn crash_point(&self) -> f64 {
        self.crash_point
    }

    pub fn is_active(&self) -> bool {
        self.status == RoundStatus::Active
    }

    /// Seconds since start
    pub fn elapsed_secs(&self, now_ms: f64) -> f64 {
        ((now_ms - self.started_at_ms) / 1000.0).max(0.0)
    }

    /// Crash point, but only once the player is allowed to see it
    pub fn revealed_crash_point(&self) -> Option<f64> {
        match self.status {
            RoundStatus::Pending | RoundStatus::Active => None,
            RoundStatus::Crashed | RoundStatus::CashedOut => Some(self.crash_point),
        }
    }
}

/// State that spans rounds
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Session {
    /// Sum of cashed-out discounts since the last counted crash
    pub accumulated_discount: f64,
    /// Whether the current/next round counts the player in
    pub player_joined: bool,
    /// Rounds started so far
    pub rounds_played: u32,
    /// Recent outcomes
    pub history: RoundHistory,
}

/// RNG state wrapper for reproducibility
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RngState {
    pub seed: u64,
}

impl RngState {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    pub fn to_rng(&self) -> Pcg32 {
        Pcg32::seed_from_u64(self.seed)
    }
}

/// Read-only view handed to observers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub phase: EnginePhase,
    pub status: RoundStatus,
    pub discount: f64,
    pub crashed: bool,
    pub accumulated_discount: f64,
    pub player_joined: bool,
    /// Whole seconds left in the join window
    pub countdown_remaining: Option<u32>,
    /// Number of the current or most recent round (0 before the first)
    pub round_number: u32,
    /// Only set once the round is over
    pub crash_point: Option<f64>,
    /// Whether `ignite` would be accepted right now
    pub can_ignite: bool,
    /// Whether `cash_out` would be accepted right now
    pub can_cash_out: bool,
}

/// Things observers are told about
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum EngineEvent {
    CountdownStarted { seconds: u32 },
    CountdownStep { remaining: u32 },
    RoundStarted { round: u32, joined: bool },
    Tick { discount: f64 },
    Crashed { round: u32, discount: f64, crash_point: f64 },
    CashedOut { round: u32, discount: f64, accumulated: f64 },
    Rearmed { phase: EnginePhase },
}
