//! # Metrics
//!
//! Small calculations shared by the reports: percentage shares, daily quota
//! progress and the retailer sales streak.

use chrono::{Duration, NaiveDate};
use std::collections::HashSet;

/// `part` as a percentage of `whole`, rounded to two decimals.
///
/// Returns `0.0` when `whole` is zero.
///
/// ```rust
/// use stockadoodle_core::metrics::percentage;
///
/// assert_eq!(percentage(1, 4), 25.0);
/// assert_eq!(percentage(2, 3), 66.67);
/// assert_eq!(percentage(5, 0), 0.0);
/// ```
pub fn percentage(part: i64, whole: i64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    round2(part as f64 / whole as f64 * 100.0)
}

/// Rounds to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Consecutive days with at least one sale, counted back from `today`.
///
/// If nothing has been sold yet today the count starts from yesterday, so
/// a streak is not broken by the morning before the first sale.
///
/// ## Example
/// ```text
/// sale days:   Oct 15  Oct 16  Oct 17  Oct 18  (none on Oct 19)
/// today:       Oct 19
///                                        ◄─── streak = 4
/// ```
pub fn sales_streak<I>(sale_days: I, today: NaiveDate) -> u32
where
    I: IntoIterator<Item = NaiveDate>,
{
    let days: HashSet<NaiveDate> = sale_days.into_iter().collect();

    let mut cursor = if days.contains(&today) {
        today
    } else {
        today - Duration::days(1)
    };

    let mut streak = 0;
    while days.contains(&cursor) {
        streak += 1;
        cursor -= Duration::days(1);
    }
    streak
}
