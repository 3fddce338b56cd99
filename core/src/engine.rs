use std::collections::HashSet;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Serialize;

use crate::aggregate::{group_by_day, missing_daily_logs};
use crate::calendar::DayBoundary;
use crate::models::{DaySugar, FoodEntry, NewDailyLog, Profile, StreakState};
use crate::streak::{apply_streak, scan_streak};

/// Persistence the streak engine reads from and writes to.
///
/// `Database` implements this on SQLite; tests can swap in failing or
/// recording stores.
pub trait StreakStore {
    fn food_entries_for_user(&self, user_id: &str) -> Result<Vec<FoodEntry>>;
    fn daily_log_dates(&self, user_id: &str) -> Result<HashSet<NaiveDate>>;
    /// Insert rows that do not exist yet, all or nothing. Returns rows written.
    fn insert_daily_logs(&self, logs: &[NewDailyLog]) -> Result<usize>;
    /// Per-day sugar totals from stored daily logs, most recent first.
    fn daily_sugar_desc(&self, user_id: &str) -> Result<Vec<DaySugar>>;
    fn profile(&self, user_id: &str) -> Result<Profile>;
    /// Write the three streak fields in a single statement.
    fn save_streak_state(&self, user_id: &str, state: &StreakState) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub days_with_entries: usize,
    pub inserted: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct StreakOutcome {
    pub user_id: String,
    pub today: NaiveDate,
    pub previous: StreakState,
    pub updated: StreakState,
    pub points_delta: i64,
    pub sync: SyncReport,
}

impl StreakOutcome {
    #[must_use]
    pub fn streak_broken(&self) -> bool {
        self.previous.current_streak > 0 && self.updated.current_streak == 0
    }
}

pub struct StreakEngine<'a, S: StreakStore + ?Sized> {
    store: &'a S,
    boundary: DayBoundary,
}

impl<'a, S: StreakStore + ?Sized> StreakEngine<'a, S> {
    pub fn new(store: &'a S, boundary: DayBoundary) -> Self {
        Self { store, boundary }
    }

    /// Backfill a daily log for every day that has food entries but no log.
    /// Stored days are left as they are.
    pub fn sync_daily_logs(&self, user_id: &str, sugar_limit: f64) -> Result<SyncReport> {
        let entries = self
            .store
            .food_entries_for_user(user_id)
            .context("Failed to load food entries")?;
        let days = group_by_day(&entries, self.boundary);
        let existing = self
            .store
            .daily_log_dates(user_id)
            .context("Failed to load daily log dates")?;

        let missing = missing_daily_logs(user_id, &days, &existing, sugar_limit);
        let inserted = if missing.is_empty() {
            0
        } else {
            self.store
                .insert_daily_logs(&missing)
                .context("Failed to insert daily logs")?
        };

        tracing::debug!(
            user_id,
            entries = entries.len(),
            days = days.len(),
            inserted,
            "synced daily logs"
        );

        Ok(SyncReport {
            days_with_entries: days.len(),
            inserted,
        })
    }

    /// Sync, rescan the sugar-free streak as of `today`, and persist the new
    /// streak, longest streak and points.
    ///
    /// Nothing is written to the profile unless every read succeeded.
    pub fn recalculate(&self, user_id: &str, today: NaiveDate) -> Result<StreakOutcome> {
        let profile = self
            .store
            .profile(user_id)
            .with_context(|| format!("Failed to load profile for user {user_id}"))?;
        let sugar_limit = profile.goals.sugar_limit;

        let sync = self.sync_daily_logs(user_id, sugar_limit)?;

        let days = self
            .store
            .daily_sugar_desc(user_id)
            .context("Failed to load daily logs")?;
        let new_streak = scan_streak(&days, today, sugar_limit);

        let previous = profile.streak_state();
        let updated = apply_streak(previous, new_streak);
        self.store
            .save_streak_state(user_id, &updated)
            .context("Failed to update profile streak")?;

        let outcome = StreakOutcome {
            user_id: user_id.to_string(),
            today,
            previous,
            updated,
            points_delta: updated.total_points - previous.total_points,
            sync,
        };

        if outcome.streak_broken() {
            tracing::warn!(
                user_id,
                previous = previous.current_streak,
                points = updated.total_points,
                "sugar-free streak broken"
            );
        } else if updated.current_streak != previous.current_streak {
            tracing::info!(
                user_id,
                from = previous.current_streak,
                to = updated.current_streak,
                points_delta = outcome.points_delta,
                "streak updated"
            );
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DailyTotals, NutritionGoals};
    use anyhow::bail;
    use chrono::Duration;
    use std::cell::RefCell;
    use std::collections::BTreeMap;

    /// In-memory store that can be told to fail on the profile write.
    struct MemoryStore {
        entries: Vec<FoodEntry>,
        logs: RefCell<BTreeMap<NaiveDate, DailyTotals>>,
        profile: RefCell<Profile>,
        fail_write: bool,
        writes: RefCell<usize>,
    }

    impl MemoryStore {
        fn new(entries: Vec<FoodEntry>, state: StreakState) -> Self {
            Self {
                entries,
                logs: RefCell::new(BTreeMap::new()),
                profile: RefCell::new(Profile {
                    id: "p".to_string(),
                    user_id: "u".to_string(),
                    username: Some("u".to_string()),
                    display_name: None,
                    bio: None,
                    current_streak: state.current_streak,
                    longest_streak: state.longest_streak,
                    total_points: state.total_points,
                    goals: NutritionGoals::default(),
                    created_at: String::new(),
                    updated_at: String::new(),
                }),
                fail_write: false,
                writes: RefCell::new(0),
            }
        }
    }

    impl StreakStore for MemoryStore {
        fn food_entries_for_user(&self, _user_id: &str) -> Result<Vec<FoodEntry>> {
            Ok(self.entries.clone())
        }

        fn daily_log_dates(&self, _user_id: &str) -> Result<HashSet<NaiveDate>> {
            Ok(self.logs.borrow().keys().copied().collect())
        }

        fn insert_daily_logs(&self, logs: &[NewDailyLog]) -> Result<usize> {
            let mut stored = self.logs.borrow_mut();
            let mut n = 0;
            for log in logs {
                if !stored.contains_key(&log.log_date) {
                    stored.insert(log.log_date, log.totals);
                    n += 1;
                }
            }
            Ok(n)
        }

        fn daily_sugar_desc(&self, _user_id: &str) -> Result<Vec<DaySugar>> {
            Ok(self
                .logs
                .borrow()
                .iter()
                .rev()
                .map(|(date, t)| DaySugar {
                    date: *date,
                    total_sugar: t.sugar,
                })
                .collect())
        }

        fn profile(&self, _user_id: &str) -> Result<Profile> {
            Ok(self.profile.borrow().clone())
        }

        fn save_streak_state(&self, _user_id: &str, state: &StreakState) -> Result<()> {
            if self.fail_write {
                bail!("disk full");
            }
            *self.writes.borrow_mut() += 1;
            let mut p = self.profile.borrow_mut();
            p.current_streak = state.current_streak;
            p.longest_streak = state.longest_streak;
            p.total_points = state.total_points;
            Ok(())
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    fn entry_on(days_ago: i64, sugar: f64) -> FoodEntry {
        let date = today() - Duration::days(days_ago);
        let at = date.and_hms_opt(12, 0, 0).unwrap().and_utc();
        FoodEntry {
            id: format!("e-{days_ago}-{sugar}"),
            user_id: "u".to_string(),
            name: "Meal".to_string(),
            calories: 500.0,
            protein: 30.0,
            carbs: 50.0,
            sugar,
            logged_at: at,
            image_url: None,
            created_at: String::new(),
        }
    }

    fn state(current: i64, longest: i64, points: i64) -> StreakState {
        StreakState {
            current_streak: current,
            longest_streak: longest,
            total_points: points,
        }
    }

    #[test]
    fn test_recalculate_builds_streak_from_entries() {
        let store = MemoryStore::new(
            vec![entry_on(0, 5.0), entry_on(1, 10.0), entry_on(1, 10.0), entry_on(2, 0.0)],
            StreakState::default(),
        );
        let engine = StreakEngine::new(&store, DayBoundary::Utc);
        let outcome = engine.recalculate("u", today()).unwrap();

        assert_eq!(outcome.sync.inserted, 3);
        assert_eq!(outcome.updated.current_streak, 3);
        assert_eq!(outcome.updated.longest_streak, 3);
        assert_eq!(outcome.updated.total_points, 300);
        assert_eq!(outcome.points_delta, 300);
        assert_eq!(store.profile.borrow().current_streak, 3);
    }

    #[test]
    fn test_same_day_entries_summed_before_limit_check() {
        // 15 + 15 = 30g on the same day breaks the limit.
        let store = MemoryStore::new(
            vec![entry_on(0, 15.0), entry_on(0, 15.0), entry_on(1, 0.0)],
            StreakState::default(),
        );
        let engine = StreakEngine::new(&store, DayBoundary::Utc);
        let outcome = engine.recalculate("u", today()).unwrap();
        assert_eq!(outcome.updated.current_streak, 0);
    }

    #[test]
    fn test_recalculate_breaks_stale_streak() {
        let store = MemoryStore::new(vec![entry_on(3, 0.0), entry_on(4, 0.0)], state(5, 5, 100));
        let engine = StreakEngine::new(&store, DayBoundary::Utc);
        let outcome = engine.recalculate("u", today()).unwrap();

        assert!(outcome.streak_broken());
        assert_eq!(outcome.updated.current_streak, 0);
        assert_eq!(outcome.updated.longest_streak, 5);
        assert_eq!(outcome.updated.total_points, 0);
        assert_eq!(outcome.points_delta, -100);
    }

    #[test]
    fn test_recalculate_without_entries() {
        let store = MemoryStore::new(Vec::new(), StreakState::default());
        let engine = StreakEngine::new(&store, DayBoundary::Utc);
        let outcome = engine.recalculate("u", today()).unwrap();
        assert_eq!(outcome.updated, StreakState::default());
        assert_eq!(outcome.sync.days_with_entries, 0);
        assert!(!outcome.streak_broken());
    }

    #[test]
    fn test_repeat_recalculate_is_stable() {
        let store = MemoryStore::new(
            vec![entry_on(0, 0.0), entry_on(1, 0.0)],
            StreakState::default(),
        );
        let engine = StreakEngine::new(&store, DayBoundary::Utc);
        let first = engine.recalculate("u", today()).unwrap();
        let second = engine.recalculate("u", today()).unwrap();
        assert_eq!(first.updated, second.updated);
        assert_eq!(second.points_delta, 0);
        assert_eq!(second.sync.inserted, 0);
    }

    #[test]
    fn test_sync_twice_inserts_once() {
        let store = MemoryStore::new(
            vec![entry_on(0, 0.0), entry_on(5, 40.0)],
            StreakState::default(),
        );
        let engine = StreakEngine::new(&store, DayBoundary::Utc);
        assert_eq!(engine.sync_daily_logs("u", 25.0).unwrap().inserted, 2);
        let again = engine.sync_daily_logs("u", 25.0).unwrap();
        assert_eq!(again.inserted, 0);
        assert_eq!(again.days_with_entries, 2);
        assert_eq!(store.logs.borrow().len(), 2);
    }

    #[test]
    fn test_failed_write_reports_error_and_keeps_profile() {
        let mut store = MemoryStore::new(vec![entry_on(0, 0.0)], state(2, 4, 500));
        store.fail_write = true;
        let engine = StreakEngine::new(&store, DayBoundary::Utc);
        let err = engine.recalculate("u", today()).unwrap_err();
        assert!(format!("{err:#}").contains("disk full"));

        let p = store.profile.borrow();
        assert_eq!(p.streak_state(), state(2, 4, 500));
        assert_eq!(*store.writes.borrow(), 0);
    }

    #[test]
    fn test_per_user_sugar_limit() {
        let store = MemoryStore::new(
            vec![entry_on(0, 12.0), entry_on(1, 8.0)],
            StreakState::default(),
        );
        store.profile.borrow_mut().goals.sugar_limit = 10.0;
        let engine = StreakEngine::new(&store, DayBoundary::Utc);
        let outcome = engine.recalculate("u", today()).unwrap();
        assert_eq!(outcome.updated.current_streak, 0);
    }
}
