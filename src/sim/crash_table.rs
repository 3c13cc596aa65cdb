//! Piecewise crash-point distribution
//!
//! A table is a list of bands, each owning a share of the probability mass
//! and an interval of crash points. One uniform draw picks the band and the
//! position inside it.

use serde::{Deserialize, Serialize};

use crate::consts::MAX_DISCOUNT;
use crate::error::ConfigError;
use crate::round_to_cents;

/// Tolerance when checking that band weights sum to one
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// One slice of the distribution
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CrashBand {
    /// Probability of landing in this band
    pub weight: f64,
    /// Lowest crash point (inclusive)
    pub min: f64,
    /// Highest crash point (inclusive)
    pub max: f64,
}

impl CrashBand {
    pub const fn new(weight: f64, min: f64, max: f64) -> Self {
        Self { weight, min, max }
    }

    /// Map a fraction in [0, 1) onto the band's interval
    fn point_at(&self, fraction: f64) -> f64 {
        let raw = self.min + fraction * (self.max - self.min);
        round_to_cents(raw).clamp(self.min, self.max)
    }
}

/// Crash-point distribution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CrashTable {
    bands: Vec<CrashBand>,
}

impl Default for CrashTable {
    fn default() -> Self {
        Self::classic()
    }
}

impl CrashTable {
    /// Build a table without validating it
    pub fn new(bands: Vec<CrashBand>) -> Self {
        Self { bands }
    }

    /// 10% near-instant crash, 80% between 1 and 3, 10% long flight
    pub fn classic() -> Self {
        Self::new(vec![
            CrashBand::new(0.10, 0.01, 0.05),
            CrashBand::new(0.80, 1.00, 3.00),
            CrashBand::new(0.10, 3.00, 100.00),
        ])
    }

    /// Five in six rounds crash below 2
    pub fn five_sixths() -> Self {
        Self::new(vec![
            CrashBand::new(5.0 / 6.0, 0.01, 2.00),
            CrashBand::new(1.0 / 6.0, 2.00, 100.00),
        ])
    }

    pub fn bands(&self) -> &[CrashBand] {
        &self.bands
    }

    /// Check weights and intervals
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bands.is_empty() {
            return Err(ConfigError::EmptyCrashTable);
        }

        let mut sum = 0.0;
        for (index, band) in self.bands.iter().enumerate() {
            if !band.weight.is_finite() || band.weight <= 0.0 {
                return Err(ConfigError::InvalidWeight {
                    index,
                    weight: band.weight,
                });
            }
            if !band.min.is_finite() || !band.max.is_finite() || band.min >= band.max {
                return Err(ConfigError::InvalidInterval {
                    index,
                    min: band.min,
                    max: band.max,
                });
            }
            if band.min <= 0.0 || band.max > MAX_DISCOUNT {
                return Err(ConfigError::IntervalOutOfRange {
                    index,
                    min: band.min,
                    max: band.max,
                });
            }
            sum += band.weight;
        }

        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(ConfigError::WeightsDoNotSumToOne { sum });
        }
        Ok(())
    }

    /// Map a uniform draw `r` in [0, 1) to a crash point
    ///
    /// Assumes the table has been validated.
    pub fn sample(&self, r: f64) -> f64 {
        let r = r.clamp(0.0, 1.0);
        let mut cumulative = 0.0;
        for band in &self.bands {
            let upper = cumulative + band.weight;
            if r < upper {
                let fraction = (r - cumulative) / band.weight;
                return band.point_at(fraction);
            }
            cumulative = upper;
        }
        // Weights may sum to a hair under 1.0
        self.bands.last().map(|b| b.max).unwrap_or(MAX_DISCOUNT)
    }
}
