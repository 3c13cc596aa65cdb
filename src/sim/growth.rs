//! Discount growth curve
//!
//! The discount is a pure function of elapsed flight time. It is never
//! accumulated tick by tick, so a late or skipped tick only means a bigger
//! step the next time it is evaluated.

/// Discount after `elapsed_secs` of flight
#[inline]
pub fn discount_at(elapsed_secs: f64, rate: f64, start: f64, max: f64) -> f64 {
    let elapsed = elapsed_secs.max(0.0);
    (start + elapsed * rate).min(max)
}

/// Seconds of flight needed to reach `target`
///
/// Returns `None` when the target is above the ceiling and can never be
/// reached.
pub fn time_to_reach(target: f64, rate: f64, start: f64, max: f64) -> Option<f64> {
    if target > max {
        return None;
    }
    Some(((target - start) / rate).max(0.0))
}
