use std::collections::BTreeSet;

use chrono::NaiveDate;

/// How far back from the final deadline earlier dates still count as the
/// same deadline having moved.
pub const DEFAULT_LOOKBACK_DAYS: u32 = 120;

/// Days the deadline visibly drifted during its public life.
///
/// Looks at the distinct dates falling within `lookback_days` before (and
/// including) `deadline`. Fewer than two such dates means no evidence of
/// drift; otherwise the span from the earliest to the latest is returned.
pub fn observed_extension_days(dates: &[NaiveDate], deadline: NaiveDate, lookback_days: u32) -> u32 {
    let window: BTreeSet<NaiveDate> = dates
        .iter()
        .copied()
        .filter(|d| {
            let delta = (deadline - *d).num_days();
            (0..=i64::from(lookback_days)).contains(&delta)
        })
        .collect();

    match (window.first(), window.last()) {
        (Some(first), Some(last)) if window.len() >= 2 => {
            u32::try_from((*last - *first).num_days()).unwrap_or(0)
        }
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn span_of_in_window_dates() {
        let dates = [ymd(2025, 1, 5), ymd(2025, 1, 25), ymd(2025, 2, 1)];
        assert_eq!(
            observed_extension_days(&dates, ymd(2025, 2, 1), DEFAULT_LOOKBACK_DAYS),
            27
        );
    }

    #[test]
    fn single_date_is_zero() {
        let dates = [ymd(2025, 2, 1)];
        assert_eq!(observed_extension_days(&dates, ymd(2025, 2, 1), 120), 0);
    }

    #[test]
    fn dates_outside_window_ignored() {
        let dates = [ymd(2024, 6, 1), ymd(2025, 1, 20), ymd(2025, 2, 1), ymd(2025, 3, 1)];
        // 2024-06-01 is too old, 2025-03-01 is after the deadline
        assert_eq!(observed_extension_days(&dates, ymd(2025, 2, 1), 120), 12);
    }

    #[test]
    fn window_edge_is_inclusive() {
        let deadline = ymd(2025, 5, 1);
        let edge = deadline - chrono::Duration::days(120);
        assert_eq!(observed_extension_days(&[edge, deadline], deadline, 120), 120);
    }

    #[test]
    fn duplicates_do_not_count_twice() {
        let d = ymd(2025, 2, 1);
        assert_eq!(observed_extension_days(&[d, d, d], d, 120), 0);
    }
}
