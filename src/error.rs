//! Configuration errors
//!
//! The engine has no runtime faults: illegal commands are rejected silently.
//! A bad configuration is the only thing that can fail, and it fails at
//! construction time.

/// Why an [`EngineConfig`](crate::EngineConfig) was refused
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("crash table has no bands")]
    EmptyCrashTable,
    #[error("crash band {index} has invalid weight {weight}")]
    InvalidWeight { index: usize, weight: f64 },
    #[error("crash band weights sum to {sum}, expected 1.0")]
    WeightsDoNotSumToOne { sum: f64 },
    #[error("crash band {index} has empty or inverted interval [{min}, {max}]")]
    InvalidInterval { index: usize, min: f64, max: f64 },
    #[error("crash band {index} interval [{min}, {max}] is outside (0, 100]")]
    IntervalOutOfRange { index: usize, min: f64, max: f64 },
    #[error("crash band {index} reaches {band_max}, above the discount ceiling {max}")]
    CrashPointAboveMax { index: usize, band_max: f64, max: f64 },
    #[error("growth rate must be finite and positive, got {0}")]
    InvalidGrowthRate(f64),
    #[error("tick interval must be finite and positive, got {0} ms")]
    InvalidTickInterval(f64),
    #[error("re-arm delay must be finite and non-negative, got {0} ms")]
    InvalidRearmDelay(f64),
    #[error("discount bounds must satisfy 0 < start < max <= 100, got start {start}, max {max}")]
    InvalidDiscountBounds { start: f64, max: f64 },
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}
