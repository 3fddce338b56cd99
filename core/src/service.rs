use std::path::Path;

use anyhow::{Result, bail};
use chrono::{DateTime, NaiveDate, Utc};

use crate::aggregate::totals_for_day;
use crate::calendar::DayBoundary;
use crate::db::Database;
use crate::engine::{StreakEngine, StreakOutcome, SyncReport};
use crate::history::{NutritionHistory, TimeRange, summarize};
use crate::leaderboard::{LeaderboardEntry, rank_profiles};
use crate::models::{
    DailyLog, DailyTotals, FoodEntry, GoalPreset, NewDailyLog, NewFoodEntry, NewProfile,
    NutritionGoals, Profile, UpdateFoodEntry, UpdateProfile, validate_food_update, validate_goals,
    validate_new_food_entry,
};

/// Entry point for callers: one SQLite database plus the calendar-day policy
/// used for every date computation.
pub struct CutsistentService {
    db: Database,
    boundary: DayBoundary,
}

impl CutsistentService {
    pub fn new(db_path: &Path, boundary: DayBoundary) -> Result<Self> {
        let db = Database::open(db_path)?;
        Ok(Self { db, boundary })
    }

    pub fn new_in_memory(boundary: DayBoundary) -> Result<Self> {
        let db = Database::open_in_memory()?;
        Ok(Self { db, boundary })
    }

    #[must_use]
    pub fn boundary(&self) -> DayBoundary {
        self.boundary
    }

    #[must_use]
    pub fn today(&self) -> NaiveDate {
        self.boundary.today()
    }

    // --- Profiles ---

    pub fn create_profile(&self, profile: &NewProfile) -> Result<Profile> {
        let created = self.db.create_profile(profile)?;
        tracing::info!(user_id = %created.user_id, "created profile");
        Ok(created)
    }

    pub fn get_profile(&self, user_id: &str) -> Result<Profile> {
        self.db.get_profile(user_id)
    }

    pub fn find_profile(&self, username: &str) -> Result<Profile> {
        match self.db.get_profile_by_username(username)? {
            Some(profile) => Ok(profile),
            None => bail!("No profile with username '{}'", username.trim()),
        }
    }

    pub fn update_profile(&self, user_id: &str, update: &UpdateProfile) -> Result<Profile> {
        self.db.update_profile(user_id, update)
    }

    // --- Goals ---

    pub fn set_goals(&self, user_id: &str, goals: &NutritionGoals) -> Result<Profile> {
        validate_goals(goals)?;
        self.db.set_goals(user_id, goals)
    }

    pub fn apply_goal_preset(&self, user_id: &str, preset: GoalPreset) -> Result<Profile> {
        self.set_goals(user_id, &preset.goals())
    }

    // --- Food entries ---

    pub fn log_food(&self, entry: &NewFoodEntry) -> Result<FoodEntry> {
        validate_new_food_entry(entry)?;
        self.check_not_future(&entry.logged_at)?;
        // Verify the owner exists
        self.db.get_profile(&entry.user_id)?;
        self.db.insert_food_entry(entry)
    }

    /// Fetch an entry, failing unless it belongs to `user_id`.
    pub fn get_food_entry(&self, user_id: &str, id: &str) -> Result<FoodEntry> {
        let entry = self.db.get_food_entry(id)?;
        if entry.user_id != user_id {
            bail!("Food entry not found");
        }
        Ok(entry)
    }

    pub fn update_food(
        &self,
        user_id: &str,
        id: &str,
        update: &UpdateFoodEntry,
    ) -> Result<FoodEntry> {
        if update.is_empty() {
            bail!("Nothing to update");
        }
        validate_food_update(update)?;
        if let Some(logged_at) = &update.logged_at {
            self.check_not_future(logged_at)?;
        }
        self.get_food_entry(user_id, id)?;
        self.db.update_food_entry(id, update)
    }

    // A log dated after today would end the streak scan at a day that is
    // neither today nor yesterday.
    fn check_not_future(&self, logged_at: &DateTime<Utc>) -> Result<()> {
        let date = self.boundary.date_of(logged_at);
        if date > self.today() {
            bail!("Cannot log food for a future date ({date})");
        }
        Ok(())
    }

    pub fn delete_food(&self, user_id: &str, id: &str) -> Result<bool> {
        self.get_food_entry(user_id, id)?;
        self.db.delete_food_entry(id)
    }

    /// Entries whose timestamp falls on `date` under the configured boundary,
    /// most recent first.
    pub fn entries_for_day(&self, user_id: &str, date: NaiveDate) -> Result<Vec<FoodEntry>> {
        let (start, end) = self.boundary.day_range(date)?;
        self.db.list_food_entries_between(user_id, &start, &end)
    }

    pub fn day_totals(&self, user_id: &str, date: NaiveDate) -> Result<DailyTotals> {
        let entries = self.entries_for_day(user_id, date)?;
        Ok(totals_for_day(&entries, self.boundary, date))
    }

    // --- Daily logs & streaks ---

    /// Recompute and overwrite the stored daily log for one date from its
    /// current entries.
    ///
    /// A date with no entries and no stored log is left alone. A stored log
    /// whose entries were all deleted is rewritten with zero totals.
    pub fn refresh_day(&self, user_id: &str, date: NaiveDate) -> Result<Option<DailyLog>> {
        let profile = self.db.get_profile(user_id)?;
        let entries = self.entries_for_day(user_id, date)?;
        if entries.is_empty() && self.db.get_daily_log(user_id, date)?.is_none() {
            return Ok(None);
        }
        let totals = totals_for_day(&entries, self.boundary, date);
        let log = NewDailyLog::from_totals(user_id, date, totals, profile.goals.sugar_limit);
        let stored = self.db.upsert_daily_log(&log)?;
        tracing::debug!(user_id, %date, sugar = totals.sugar, "refreshed daily log");
        Ok(Some(stored))
    }

    pub fn get_daily_log(&self, user_id: &str, date: NaiveDate) -> Result<Option<DailyLog>> {
        self.db.get_daily_log(user_id, date)
    }

    pub fn sync_daily_logs(&self, user_id: &str) -> Result<SyncReport> {
        let profile = self.db.get_profile(user_id)?;
        StreakEngine::new(&self.db, self.boundary)
            .sync_daily_logs(user_id, profile.goals.sugar_limit)
    }

    pub fn recalculate_streak(&self, user_id: &str, today: NaiveDate) -> Result<StreakOutcome> {
        StreakEngine::new(&self.db, self.boundary).recalculate(user_id, today)
    }

    pub fn recalculate_streak_now(&self, user_id: &str) -> Result<StreakOutcome> {
        self.recalculate_streak(user_id, self.today())
    }

    // --- Leaderboard & history ---

    pub fn leaderboard(&self, limit: i64) -> Result<Vec<LeaderboardEntry>> {
        let profiles = self.db.list_profiles_by_points(limit.max(0))?;
        Ok(rank_profiles(&profiles))
    }

    pub fn nutrition_history(
        &self,
        user_id: &str,
        range: TimeRange,
        today: NaiveDate,
    ) -> Result<NutritionHistory> {
        let (start, end) = range.bounds(today);
        let days = self.db.list_daily_logs_between(user_id, start, end)?;
        Ok(summarize(range, today, days))
    }
}
