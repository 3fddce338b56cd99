use anyhow::{Context, Result};
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use cutsistent_core::calendar::DayBoundary;
use cutsistent_core::engine::StreakOutcome;
use cutsistent_core::models::FoodEntry;
use cutsistent_core::service::CutsistentService;

pub(crate) fn parse_date(date_str: Option<String>, today: NaiveDate) -> Result<NaiveDate> {
    match date_str {
        None => Ok(today),
        Some(s) => match s.as_str() {
            "today" => Ok(today),
            "yesterday" => Ok(today - Duration::days(1)),
            _ => NaiveDate::parse_from_str(&s, "%Y-%m-%d")
                .with_context(|| format!("Invalid date '{s}'. Use YYYY-MM-DD or today/yesterday")),
        },
    }
}

pub(crate) fn parse_time(s: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M")
        .with_context(|| format!("Invalid time '{s}'. Use HH:MM (24-hour)"))
}

pub(crate) fn clock_time(boundary: DayBoundary, ts: &DateTime<Utc>) -> String {
    boundary.time_of(ts).format("%H:%M").to_string()
}

/// Refresh today's daily log and recalculate the streak after a food change.
///
/// Failures are logged, not returned: the food change itself already succeeded.
pub(crate) fn refresh_streak(svc: &CutsistentService, user_id: &str) -> Option<StreakOutcome> {
    let today = svc.today();
    if let Err(e) = svc.refresh_day(user_id, today) {
        tracing::warn!("Failed to refresh today's daily log: {e:#}");
    }
    match svc.recalculate_streak(user_id, today) {
        Ok(outcome) => Some(outcome),
        Err(e) => {
            tracing::warn!("Failed to recalculate streak: {e:#}");
            None
        }
    }
}

pub(crate) fn print_streak_change(outcome: &StreakOutcome) {
    let streak = outcome.updated.current_streak;
    let points = outcome.updated.total_points;
    if outcome.streak_broken() {
        let previous = outcome.previous.current_streak;
        println!("Streak broken after {previous} days. Points: {points}");
    } else if outcome.points_delta > 0 {
        let delta = outcome.points_delta;
        println!("Streak: {streak} days (+{delta} points, {points} total)");
    } else {
        println!("Streak: {streak} days ({points} points)");
    }
}

pub(crate) fn print_entries_table(entries: &[FoodEntry], boundary: DayBoundary) {
    #[derive(Tabled)]
    struct EntryRow {
        #[tabled(rename = "Time")]
        time: String,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Calories")]
        calories: String,
        #[tabled(rename = "Protein")]
        protein: String,
        #[tabled(rename = "Carbs")]
        carbs: String,
        #[tabled(rename = "Sugar")]
        sugar: String,
        #[tabled(rename = "ID")]
        id: String,
    }

    let rows: Vec<EntryRow> = entries
        .iter()
        .map(|e| EntryRow {
            time: clock_time(boundary, &e.logged_at),
            name: truncate(&e.name, 30),
            calories: format!("{:.0}", no_neg_zero(e.calories)),
            protein: format!("{:.1}g", no_neg_zero(e.protein)),
            carbs: format!("{:.1}g", no_neg_zero(e.carbs)),
            sugar: format!("{:.1}g", no_neg_zero(e.sugar)),
            id: e.id.clone(),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(2..6)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

pub(crate) fn json_error(message: &str) -> String {
    #[derive(Serialize)]
    struct CliError<'a> {
        error: &'a str,
    }
    serde_json::to_string(&CliError { error: message })
        .unwrap_or_else(|_| format!("{{\"error\":\"{message}\"}}"))
}

pub(crate) fn no_neg_zero(v: f64) -> f64 {
    if v == 0.0 { 0.0 } else { v }
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let end = s.char_indices().nth(max - 3).map_or(s.len(), |(i, _)| i);
        format!("{}...", &s[..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    #[test]
    fn test_parse_date_none() {
        assert_eq!(parse_date(None, today()).unwrap(), today());
    }

    #[test]
    fn test_parse_date_keywords() {
        assert_eq!(parse_date(Some("today".to_string()), today()).unwrap(), today());
        assert_eq!(
            parse_date(Some("yesterday".to_string()), today()).unwrap(),
            today() - Duration::days(1)
        );
        assert!(parse_date(Some("tomorrow".to_string()), today()).is_err());
    }

    #[test]
    fn test_parse_date_iso() {
        let date = parse_date(Some("2024-01-15".to_string()), today()).unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
    }

    #[test]
    fn test_parse_date_invalid() {
        assert!(parse_date(Some("nope".to_string()), today()).is_err());
    }

    #[test]
    fn test_parse_time() {
        assert_eq!(
            parse_time("08:30").unwrap(),
            NaiveTime::from_hms_opt(8, 30, 0).unwrap()
        );
        assert!(parse_time("25:00").is_err());
        assert!(parse_time("noon").is_err());
    }

    #[test]
    fn test_clock_time_fixed_offset() {
        let boundary: DayBoundary = "+02:00".parse().unwrap();
        let ts = boundary
            .at(today(), NaiveTime::from_hms_opt(1, 0, 0).unwrap())
            .unwrap();
        // 01:00 at +02:00 is 23:00 UTC the day before.
        assert_eq!(ts.to_rfc3339(), "2024-06-14T23:00:00+00:00");
        assert_eq!(boundary.date_of(&ts), today());
        assert_eq!(clock_time(boundary, &ts), "01:00");
    }

    #[test]
    fn test_clock_time_utc() {
        let ts = today().and_hms_opt(18, 5, 0).unwrap().and_utc();
        assert_eq!(clock_time(DayBoundary::Utc, &ts), "18:05");
    }

    #[test]
    fn test_clock_time_local_on_dst_change_day() {
        // 2024-03-10 is a DST change day in North America.
        let date = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let noon = NaiveTime::from_hms_opt(12, 0, 0).unwrap();
        let ts = DayBoundary::Local.at(date, noon).unwrap();
        assert_eq!(clock_time(DayBoundary::Local, &ts), "12:00");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello world this is long", 10), "hello w...");
    }

    #[test]
    fn test_truncate_utf8() {
        assert_eq!(truncate("Crème brûlée tart", 10), "Crème b...");
        assert_eq!(truncate("Müsli", 10), "Müsli");
    }

    #[test]
    fn test_no_neg_zero() {
        assert_eq!(no_neg_zero(-0.0).to_bits(), 0.0_f64.to_bits());
        assert_eq!(no_neg_zero(5.0), 5.0);
    }

    #[test]
    fn test_json_error() {
        assert_eq!(json_error("boom"), "{\"error\":\"boom\"}");
    }
}
