use chrono::{Duration, NaiveDate};

use crate::models::{DaySugar, StreakState};

/// Points awarded for each day a streak grows by.
pub const STREAK_DAY_POINTS: i64 = 100;

/// Flat deduction when a running streak drops to zero.
pub const STREAK_BREAK_PENALTY: i64 = 150;

/// Count consecutive sugar-free days ending at the most recent logged day.
///
/// `days` must be ordered most recent first. A most recent day older than
/// yesterday means the streak is already broken.
#[must_use]
pub fn scan_streak(days: &[DaySugar], today: NaiveDate, sugar_limit: f64) -> i64 {
    let Some(most_recent) = days.first().map(|d| d.date) else {
        return 0;
    };

    let yesterday = today - Duration::days(1);
    if most_recent != today && most_recent != yesterday {
        return 0;
    }

    let mut streak: i64 = 0;
    let mut expected = most_recent;
    for day in days {
        if day.date != expected {
            break;
        }
        if day.total_sugar > sugar_limit {
            break;
        }
        streak += 1;
        expected -= Duration::days(1);
    }
    streak
}

/// Apply a freshly scanned streak to the stored state.
///
/// Growth earns [`STREAK_DAY_POINTS`] per added day; dropping from a running
/// streak to zero costs [`STREAK_BREAK_PENALTY`], floored at zero. Any other
/// change leaves points untouched.
#[must_use]
pub fn apply_streak(state: StreakState, new_streak: i64) -> StreakState {
    let new_streak = new_streak.max(0);
    let total_points = if new_streak > state.current_streak {
        state.total_points + (new_streak - state.current_streak) * STREAK_DAY_POINTS
    } else if new_streak == 0 && state.current_streak > 0 {
        (state.total_points - STREAK_BREAK_PENALTY).max(0)
    } else {
        state.total_points
    };

    StreakState {
        current_streak: new_streak,
        longest_streak: state.longest_streak.max(new_streak),
        total_points,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DEFAULT_SUGAR_LIMIT_G;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    /// Build scan input from `(days_ago, sugar)` pairs, most recent first.
    fn days(pairs: &[(i64, f64)]) -> Vec<DaySugar> {
        pairs
            .iter()
            .map(|&(ago, sugar)| DaySugar {
                date: today() - Duration::days(ago),
                total_sugar: sugar,
            })
            .collect()
    }

    fn state(current: i64, longest: i64, points: i64) -> StreakState {
        StreakState {
            current_streak: current,
            longest_streak: longest,
            total_points: points,
        }
    }

    #[test]
    fn test_no_data_means_no_streak() {
        assert_eq!(scan_streak(&[], today(), DEFAULT_SUGAR_LIMIT_G), 0);
    }

    #[test]
    fn test_three_clean_days_ending_today() {
        let input = days(&[(0, 0.0), (1, 0.0), (2, 0.0)]);
        assert_eq!(scan_streak(&input, today(), DEFAULT_SUGAR_LIMIT_G), 3);
    }

    #[test]
    fn test_streak_may_end_yesterday() {
        let input = days(&[(1, 10.0), (2, 25.0)]);
        assert_eq!(scan_streak(&input, today(), DEFAULT_SUGAR_LIMIT_G), 2);
    }

    #[test]
    fn test_stale_activity_breaks_streak() {
        let input = days(&[(3, 0.0), (4, 0.0), (5, 0.0), (6, 0.0)]);
        assert_eq!(scan_streak(&input, today(), DEFAULT_SUGAR_LIMIT_G), 0);
    }

    #[test]
    fn test_sugary_day_stops_scan() {
        let input = days(&[(0, 3.0), (1, 26.0), (2, 0.0), (3, 0.0)]);
        assert_eq!(scan_streak(&input, today(), DEFAULT_SUGAR_LIMIT_G), 1);
    }

    #[test]
    fn test_sugary_most_recent_day_gives_zero() {
        let input = days(&[(0, 26.0), (1, 0.0)]);
        assert_eq!(scan_streak(&input, today(), DEFAULT_SUGAR_LIMIT_G), 0);
    }

    #[test]
    fn test_gap_stops_scan() {
        let input = days(&[(0, 0.0), (1, 0.0), (3, 0.0), (4, 0.0)]);
        assert_eq!(scan_streak(&input, today(), DEFAULT_SUGAR_LIMIT_G), 2);
    }

    #[test]
    fn test_limit_is_inclusive_and_configurable() {
        let input = days(&[(0, 15.0), (1, 15.0)]);
        assert_eq!(scan_streak(&input, today(), 15.0), 2);
        assert_eq!(scan_streak(&input, today(), 10.0), 0);
    }

    #[test]
    fn test_scan_crosses_month_boundary() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let input: Vec<DaySugar> = (0..3)
            .map(|ago| DaySugar {
                date: today - Duration::days(ago),
                total_sugar: 0.0,
            })
            .collect();
        // 2024 is a leap year: Mar 1, Feb 29, Feb 28.
        assert_eq!(input[1].date, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        assert_eq!(scan_streak(&input, today, DEFAULT_SUGAR_LIMIT_G), 3);
    }

    #[test]
    fn test_growth_awards_points_per_day() {
        let updated = apply_streak(state(5, 5, 1000), 8);
        assert_eq!(updated.total_points, 1300);
        assert_eq!(updated.current_streak, 8);
        assert_eq!(updated.longest_streak, 8);
    }

    #[test]
    fn test_break_applies_penalty() {
        let updated = apply_streak(state(5, 12, 1000), 0);
        assert_eq!(updated.total_points, 850);
        assert_eq!(updated.current_streak, 0);
        assert_eq!(updated.longest_streak, 12);
    }

    #[test]
    fn test_break_penalty_floors_at_zero() {
        let updated = apply_streak(state(5, 5, 100), 0);
        assert_eq!(updated.total_points, 0);
    }

    #[test]
    fn test_zero_to_zero_is_not_a_break() {
        let updated = apply_streak(state(0, 4, 300), 0);
        assert_eq!(updated, state(0, 4, 300));
    }

    #[test]
    fn test_unchanged_or_partial_drop_keeps_points() {
        assert_eq!(apply_streak(state(5, 9, 700), 5).total_points, 700);
        let dropped = apply_streak(state(5, 9, 700), 2);
        assert_eq!(dropped.total_points, 700);
        assert_eq!(dropped.current_streak, 2);
        assert_eq!(dropped.longest_streak, 9);
    }

    #[test]
    fn test_longest_never_below_current() {
        for current in 0..6 {
            for longest in current..8 {
                for new in 0..10 {
                    let updated = apply_streak(state(current, longest, 200), new);
                    assert!(updated.longest_streak >= updated.current_streak);
                    assert!(updated.total_points >= 0);
                }
            }
        }
    }
}
