//! Price-performance metrics over bounded history slices.
//!
//! `window_change` is the single formula everything else is built on:
//! `((close of last bar - open of first bar) / open of first bar) * 100`.
//! An empty slice yields the sentinel `0.0` so the pipeline stays total;
//! a zero opening price is a per-symbol fault, never a panic.

use crate::error::MetricError;
use crate::models::{Bar, MonthlyChangeMap};
use chrono::Datelike;

/// Trailing calendar months considered: current, previous, and the one before.
pub const MONTH_BUCKETS: u32 = 3;

/// Value substituted when a window has no bars.
pub const EMPTY_WINDOW_CHANGE: f64 = 0.0;

/// Percent change across `bars`, first open to last close.
pub fn window_change(bars: &[Bar]) -> Result<f64, MetricError> {
    let (Some(first), Some(last)) = (bars.first(), bars.last()) else {
        return Ok(EMPTY_WINDOW_CHANGE);
    };

    if first.open == 0.0 {
        return Err(MetricError::ZeroOpen(first.timestamp.date_naive().to_string()));
    }

    Ok(((last.close - first.open) / first.open) * 100.0)
}

/// Step `back` months before (`month`, `year`), wrapping below January once.
///
/// `back` must stay below 12; the lookback horizon never needs a second wrap.
pub fn month_back(month: u32, year: i32, back: u32) -> (u32, i32) {
    let idx = month as i32 - back as i32;
    if idx <= 0 {
        ((idx + 12) as u32, year - 1)
    } else {
        (idx as u32, year)
    }
}

/// Percent change for each of the trailing `MONTH_BUCKETS` calendar months.
///
/// Months with no bars in `history` are left out of the map rather than
/// defaulted, so the screen can tell "no data" from "flat".
pub fn monthly_changes(
    history: &[Bar],
    current_month: u32,
    current_year: i32,
) -> Result<MonthlyChangeMap, MetricError> {
    let mut changes = MonthlyChangeMap::new();

    for back in (0..MONTH_BUCKETS).rev() {
        let (month, year) = month_back(current_month, current_year, back);

        let bucket: Vec<Bar> = history
            .iter()
            .filter(|b| b.timestamp.month() == month && b.timestamp.year() == year)
            .cloned()
            .collect();

        if bucket.is_empty() {
            continue;
        }

        changes.insert(month, window_change(&bucket)?);
    }

    Ok(changes)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::America::New_York;

    pub(crate) fn bar(y: i32, m: u32, d: u32, open: f64, close: f64) -> Bar {
        Bar {
            timestamp: New_York.with_ymd_and_hms(y, m, d, 9, 30, 0).unwrap(),
            open,
            close,
        }
    }

    #[test]
    fn test_window_change_formula() {
        let up = vec![bar(2024, 3, 1, 80.0, 90.0), bar(2024, 3, 4, 95.0, 100.0)];
        assert_eq!(window_change(&up), Ok(((100.0 - 80.0) / 80.0) * 100.0));
        assert_eq!(window_change(&up), Ok(25.0));

        let down = vec![bar(2024, 3, 1, 200.0, 190.0), bar(2024, 3, 4, 180.0, 150.0)];
        assert_eq!(window_change(&down), Ok(-25.0));
    }

    #[test]
    fn test_window_change_single_bar() {
        assert_eq!(window_change(&[bar(2024, 3, 1, 100.0, 110.0)]), Ok(10.0));
    }

    #[test]
    fn test_window_change_empty_is_sentinel() {
        assert_eq!(window_change(&[]), Ok(0.0));
    }

    #[test]
    fn test_window_change_zero_open() {
        let bars = vec![bar(2024, 3, 1, 0.0, 5.0)];
        assert_eq!(
            window_change(&bars),
            Err(MetricError::ZeroOpen("2024-03-01".to_string()))
        );
    }

    #[test]
    fn test_month_back_rollover() {
        assert_eq!(month_back(5, 2024, 0), (5, 2024));
        assert_eq!(month_back(5, 2024, 2), (3, 2024));
        assert_eq!(month_back(2, 2024, 2), (12, 2023));
        assert_eq!(month_back(1, 2024, 1), (12, 2023));
        assert_eq!(month_back(1, 2024, 2), (11, 2023));
    }

    fn one_bar_per_month(from: (i32, u32), count: u32) -> Vec<Bar> {
        let (mut y, mut m) = from;
        let mut bars = Vec::new();
        for i in 0..count {
            bars.push(bar(y, m, 15, 100.0, 100.0 + i as f64 + 1.0));
            m += 1;
            if m > 12 {
                m = 1;
                y += 1;
            }
        }
        bars
    }

    #[test]
    fn test_monthly_changes_three_keys() {
        let history = one_bar_per_month((2023, 7), 12);
        let changes = monthly_changes(&history, 6, 2024).unwrap();

        assert_eq!(changes.keys().copied().collect::<Vec<_>>(), vec![4, 5, 6]);
        assert_eq!(changes[&6], 12.0);
        assert_eq!(changes[&5], 11.0);
        assert_eq!(changes[&4], 10.0);
    }

    #[test]
    fn test_monthly_changes_january_rolls_into_prior_year() {
        let history = one_bar_per_month((2023, 2), 12);
        let changes = monthly_changes(&history, 1, 2024).unwrap();

        assert_eq!(changes.keys().copied().collect::<Vec<_>>(), vec![1, 11, 12]);
        // November 2023 is the tenth bar of the series.
        assert_eq!(changes[&11], 10.0);
        assert_eq!(changes[&12], 11.0);
        assert_eq!(changes[&1], 12.0);
    }

    #[test]
    fn test_monthly_changes_ignores_same_month_of_other_year() {
        // March 2023 must not stand in for March 2024.
        let history = vec![
            bar(2023, 3, 10, 100.0, 150.0),
            bar(2024, 4, 10, 100.0, 101.0),
            bar(2024, 5, 10, 100.0, 102.0),
        ];
        let changes = monthly_changes(&history, 5, 2024).unwrap();

        assert!(!changes.contains_key(&3));
        assert_eq!(changes.len(), 2);
    }

    #[test]
    fn test_monthly_changes_omits_empty_month() {
        let history = vec![
            bar(2024, 4, 1, 100.0, 100.0),
            bar(2024, 4, 30, 100.0, 100.0),
            bar(2024, 6, 3, 100.0, 101.0),
        ];
        let changes = monthly_changes(&history, 6, 2024).unwrap();

        assert!(!changes.contains_key(&5));
        // A flat month is present with a value of zero.
        assert_eq!(changes.get(&4), Some(&0.0));
        assert_eq!(changes.get(&6), Some(&1.0));
    }

    #[test]
    fn test_monthly_changes_uses_first_open_and_last_close_of_month() {
        let history = vec![
            bar(2024, 6, 3, 50.0, 55.0),
            bar(2024, 6, 14, 60.0, 58.0),
            bar(2024, 6, 28, 59.0, 62.5),
        ];
        let changes = monthly_changes(&history, 6, 2024).unwrap();
        assert_eq!(changes[&6], 25.0);
    }
}
