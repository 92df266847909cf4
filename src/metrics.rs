//! Derived-metric calculations.
//!
//! Small pure helpers shared by the collectors and the composite
//! aggregator: ratio-of-baseline percentages and date arithmetic.

use chrono::{NaiveDate, TimeZone, Utc};

/// Round a value to the given number of decimal places.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Compute `numerator` as a percentage of `denominator`, rounded to
/// two decimal places.
///
/// Both values must already be in the same unit; no unit inference is
/// performed here. A non-positive denominator yields `0.0` rather than
/// a division error.
pub fn ratio_pct(numerator: f64, denominator: f64) -> f64 {
    if denominator <= 0.0 {
        return 0.0;
    }
    round_to(numerator / denominator * 100.0, 2)
}

/// Compute whole days from now (UTC) until a `YYYY-MM-DD` date string.
///
/// Returns `None` if the string cannot be parsed. Dates in the past
/// clamp to zero.
pub fn days_until(target_date: &str) -> Option<i64> {
    let date = NaiveDate::parse_from_str(target_date, "%Y-%m-%d").ok()?;
    let target = Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?);
    let delta = target.signed_duration_since(Utc::now());
    Some(delta.num_days().max(0))
}
