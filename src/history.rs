//! Recent round outcomes
//!
//! Kept in memory for the lifetime of the page, newest first.

use serde::{Deserialize, Serialize};

/// Maximum number of rounds to keep
pub const MAX_HISTORY: usize = 20;

/// How a round ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Crashed,
    CashedOut,
}

/// A single finished round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundRecord {
    /// Round number within the session
    pub number: u32,
    pub outcome: Outcome,
    /// Frozen discount
    pub discount: f64,
    /// Where the rocket would have (or did) crash
    pub crash_point: f64,
    /// Whether the player was in this round
    pub joined: bool,
}

/// Bounded round log
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RoundHistory {
    pub entries: Vec<RoundRecord>,
}

impl RoundHistory {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Record a finished round, dropping the oldest past the cap
    pub fn push(&mut self, record: RoundRecord) {
        self.entries.insert(0, record);
        self.entries.truncate(MAX_HISTORY);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Most recent round
    pub fn last(&self) -> Option<&RoundRecord> {
        self.entries.first()
    }

    /// Highest discount locked in by the player
    pub fn best_cash_out(&self) -> Option<f64> {
        self.entries
            .iter()
            .filter(|r| r.outcome == Outcome::CashedOut)
            .map(|r| r.discount)
            .fold(None, |best, d| Some(best.map_or(d, |b: f64| b.max(d))))
    }

    /// Sum of every cash-out still in the log
    pub fn total_cashed_out(&self) -> f64 {
        self.entries
            .iter()
            .filter(|r| r.outcome == Outcome::CashedOut)
            .map(|r| r.discount)
            .sum()
    }

    pub fn crash_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|r| r.outcome == Outcome::Crashed)
            .count()
    }
}
