use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDate;

use crate::calendar::DayBoundary;
use crate::models::{DailyTotals, FoodEntry, NewDailyLog};

/// Sum entries per calendar day under `boundary`.
#[must_use]
pub fn group_by_day(
    entries: &[FoodEntry],
    boundary: DayBoundary,
) -> BTreeMap<NaiveDate, DailyTotals> {
    let mut days: BTreeMap<NaiveDate, DailyTotals> = BTreeMap::new();
    for entry in entries {
        let date = boundary.date_of(&entry.logged_at);
        days.entry(date).or_default().add(entry);
    }
    days
}

/// Totals for a single day. Entries outside `date` are ignored.
#[must_use]
pub fn totals_for_day(
    entries: &[FoodEntry],
    boundary: DayBoundary,
    date: NaiveDate,
) -> DailyTotals {
    entries
        .iter()
        .filter(|e| boundary.date_of(&e.logged_at) == date)
        .fold(DailyTotals::default(), |mut acc, e| {
            acc.add(e);
            acc
        })
}

/// Daily log rows for every day that has entries but no stored log yet.
///
/// Days already present in `existing` are skipped even if their totals differ:
/// the backfill never rewrites a stored day.
#[must_use]
pub fn missing_daily_logs(
    user_id: &str,
    days: &BTreeMap<NaiveDate, DailyTotals>,
    existing: &HashSet<NaiveDate>,
    sugar_limit: f64,
) -> Vec<NewDailyLog> {
    days.iter()
        .filter(|(date, _)| !existing.contains(*date))
        .map(|(date, totals)| NewDailyLog::from_totals(user_id, *date, *totals, sugar_limit))
        .collect()
}
