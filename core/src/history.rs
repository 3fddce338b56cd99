use anyhow::{Result, bail};
use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::models::{DailyLog, DailyTotals};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeRange {
    #[default]
    Week,
    Month,
}

impl TimeRange {
    /// Inclusive `(start, end)` of the range containing `today`.
    /// Weeks run Monday to Sunday.
    #[must_use]
    pub fn bounds(self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        match self {
            Self::Week => {
                let start =
                    today - Duration::days(i64::from(today.weekday().num_days_from_monday()));
                (start, start + Duration::days(6))
            }
            Self::Month => {
                let start = today.with_day(1).unwrap_or(today);
                let next_month = if today.month() == 12 {
                    NaiveDate::from_ymd_opt(today.year() + 1, 1, 1)
                } else {
                    NaiveDate::from_ymd_opt(today.year(), today.month() + 1, 1)
                };
                let end = next_month.map_or(today, |d| d - Duration::days(1));
                (start, end)
            }
        }
    }
}

pub fn parse_time_range(s: &str) -> Result<TimeRange> {
    match s.trim().to_lowercase().as_str() {
        "week" | "w" => Ok(TimeRange::Week),
        "month" | "m" => Ok(TimeRange::Month),
        _ => bail!("Invalid range '{s}'. Must be one of: week, month"),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NutritionHistory {
    pub range: TimeRange,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub days: Vec<DailyLog>,
    pub averages: DailyTotals,
    pub sugar_free_days: usize,
    pub total_days: usize,
}

/// Summarize stored daily logs for a range. Averages are over logged days only
/// and rounded to whole units.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn summarize(range: TimeRange, today: NaiveDate, days: Vec<DailyLog>) -> NutritionHistory {
    let (start, end) = range.bounds(today);
    let total_days = days.len();
    let sugar_free_days = days.iter().filter(|d| d.is_sugar_free).count();

    let averages = if total_days == 0 {
        DailyTotals::default()
    } else {
        let n = total_days as f64;
        let sum = days.iter().fold(DailyTotals::default(), |mut acc, d| {
            acc.calories += d.total_calories;
            acc.protein += d.total_protein;
            acc.carbs += d.total_carbs;
            acc.sugar += d.total_sugar;
            acc
        });
        DailyTotals {
            calories: (sum.calories / n).round(),
            protein: (sum.protein / n).round(),
            carbs: (sum.carbs / n).round(),
            sugar: (sum.sugar / n).round(),
        }
    };

    NutritionHistory {
        range,
        start,
        end,
        days,
        averages,
        sugar_free_days,
        total_days,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn log(d: NaiveDate, calories: f64, sugar: f64) -> DailyLog {
        DailyLog {
            id: format!("l-{d}"),
            user_id: "u".to_string(),
            log_date: d,
            total_calories: calories,
            total_protein: 100.0,
            total_carbs: 200.0,
            total_sugar: sugar,
            is_sugar_free: sugar <= 25.0,
            points_earned: 0,
            created_at: String::new(),
        }
    }

    #[test]
    fn test_week_bounds_start_monday() {
        // 2024-06-15 is a Saturday.
        let (start, end) = TimeRange::Week.bounds(date(2024, 6, 15));
        assert_eq!(start, date(2024, 6, 10));
        assert_eq!(end, date(2024, 6, 16));

        let (start, end) = TimeRange::Week.bounds(date(2024, 6, 10));
        assert_eq!(start, date(2024, 6, 10));
        assert_eq!(end, date(2024, 6, 16));
    }

    #[test]
    fn test_month_bounds() {
        assert_eq!(
            TimeRange::Month.bounds(date(2024, 2, 10)),
            (date(2024, 2, 1), date(2024, 2, 29))
        );
        assert_eq!(
            TimeRange::Month.bounds(date(2023, 12, 31)),
            (date(2023, 12, 1), date(2023, 12, 31))
        );
    }

    #[test]
    fn test_parse_time_range() {
        assert_eq!(parse_time_range("Week").unwrap(), TimeRange::Week);
        assert_eq!(parse_time_range("month").unwrap(), TimeRange::Month);
        assert!(parse_time_range("year").is_err());
    }

    #[test]
    fn test_summarize_empty() {
        let history = summarize(TimeRange::Week, date(2024, 6, 15), Vec::new());
        assert_eq!(history.total_days, 0);
        assert_eq!(history.sugar_free_days, 0);
        assert_eq!(history.averages, DailyTotals::default());
    }

    #[test]
    fn test_summarize_averages_and_counts() {
        let days = vec![
            log(date(2024, 6, 10), 1800.0, 10.0),
            log(date(2024, 6, 11), 2101.0, 40.0),
            log(date(2024, 6, 12), 2000.0, 21.0),
        ];
        let history = summarize(TimeRange::Week, date(2024, 6, 15), days);
        assert_eq!(history.total_days, 3);
        assert_eq!(history.sugar_free_days, 2);
        // (1800 + 2101 + 2000) / 3 = 1967.0
        assert!((history.averages.calories - 1967.0).abs() < f64::EPSILON);
        // (10 + 40 + 21) / 3 = 23.67 -> 24
        assert!((history.averages.sugar - 24.0).abs() < f64::EPSILON);
        assert!((history.averages.protein - 100.0).abs() < f64::EPSILON);
    }
}
