//! Recency weighting with an exponential half-life.

use chrono::{DateTime, Utc};

/// Default half-life in days, shared with the history retention window.
pub const HALF_LIFE_DAYS: f64 = 90.0;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Recency weight for an evaluation `age_days` old, using the default
/// half-life.
///
/// weight = 2^(-age / half_life)
pub fn weight(age_days: f64) -> f64 {
    weight_with_half_life(age_days, HALF_LIFE_DAYS)
}

/// Recency weight with an explicit half-life.
///
/// Negative ages (future-dated evaluations) and NaN are treated as age zero.
/// A half-life that is not a positive finite number falls back to
/// [`HALF_LIFE_DAYS`]. The result is always in (0, 1]: it is floored at the
/// smallest positive normal `f64` instead of underflowing to zero.
pub fn weight_with_half_life(age_days: f64, half_life_days: f64) -> f64 {
    let age = age_days.max(0.0);
    let half_life_days = usable_half_life(half_life_days);
    2.0_f64
        .powf(-age / half_life_days)
        .clamp(f64::MIN_POSITIVE, 1.0)
}

/// `half_life_days` if it is positive and finite, otherwise the default.
pub fn usable_half_life(half_life_days: f64) -> f64 {
    if half_life_days.is_finite() && half_life_days > 0.0 {
        half_life_days
    } else {
        HALF_LIFE_DAYS
    }
}

/// Fractional days elapsed between `occurred_at` and `as_of`. Negative when
/// `occurred_at` lies in the future.
pub fn age_days(occurred_at: DateTime<Utc>, as_of: DateTime<Utc>) -> f64 {
    (as_of - occurred_at).num_milliseconds() as f64 / MILLIS_PER_DAY
}
