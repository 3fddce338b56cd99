use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Local, NaiveDate, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, params};
use uuid::Uuid;

use crate::engine::StreakStore;
use crate::models::{
    DailyLog, DaySugar, FoodEntry, NewDailyLog, NewFoodEntry, NewProfile, NutritionGoals, Profile,
    StreakState, UpdateFoodEntry, UpdateProfile, validate_username,
};

const PROFILE_COLUMNS: &str = "id, user_id, username, display_name, bio, total_points,
    current_streak, longest_streak, calorie_goal, protein_goal, carbs_goal, sugar_limit,
    created_at, updated_at";

const FOOD_ENTRY_COLUMNS: &str =
    "id, user_id, name, calories, protein, carbs, sugar, image_url, logged_at, created_at";

const DAILY_LOG_COLUMNS: &str = "id, user_id, log_date, total_calories, total_protein,
    total_carbs, total_sugar, is_sugar_free, points_earned, created_at";

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        let version: i64 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;

        if version < 1 {
            self.conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS profiles (
                    id TEXT PRIMARY KEY,
                    user_id TEXT NOT NULL UNIQUE,
                    username TEXT UNIQUE,
                    display_name TEXT,
                    bio TEXT,
                    total_points INTEGER NOT NULL DEFAULT 0 CHECK (total_points >= 0),
                    current_streak INTEGER NOT NULL DEFAULT 0 CHECK (current_streak >= 0),
                    longest_streak INTEGER NOT NULL DEFAULT 0 CHECK (longest_streak >= 0),
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS food_entries (
                    id TEXT PRIMARY KEY,
                    user_id TEXT NOT NULL REFERENCES profiles(user_id),
                    name TEXT NOT NULL,
                    calories REAL NOT NULL DEFAULT 0,
                    protein REAL NOT NULL DEFAULT 0,
                    carbs REAL NOT NULL DEFAULT 0,
                    sugar REAL NOT NULL DEFAULT 0,
                    image_url TEXT,
                    logged_at TEXT NOT NULL,
                    created_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS daily_logs (
                    id TEXT PRIMARY KEY,
                    user_id TEXT NOT NULL REFERENCES profiles(user_id),
                    log_date TEXT NOT NULL,
                    total_calories REAL NOT NULL DEFAULT 0,
                    total_protein REAL NOT NULL DEFAULT 0,
                    total_carbs REAL NOT NULL DEFAULT 0,
                    total_sugar REAL NOT NULL DEFAULT 0,
                    is_sugar_free INTEGER NOT NULL DEFAULT 0,
                    points_earned INTEGER NOT NULL DEFAULT 0,
                    created_at TEXT NOT NULL,
                    UNIQUE (user_id, log_date)
                );

                CREATE INDEX IF NOT EXISTS idx_food_entries_user_logged ON food_entries(user_id, logged_at);
                CREATE INDEX IF NOT EXISTS idx_daily_logs_user_date ON daily_logs(user_id, log_date);
                CREATE INDEX IF NOT EXISTS idx_profiles_points ON profiles(total_points);

                PRAGMA user_version = 1;",
            )?;
        }

        if version < 2 {
            // Nutrition goals, including the per-user sugar limit.
            self.conn.execute_batch(
                "ALTER TABLE profiles ADD COLUMN calorie_goal INTEGER NOT NULL DEFAULT 2000;
                 ALTER TABLE profiles ADD COLUMN protein_goal INTEGER NOT NULL DEFAULT 120;
                 ALTER TABLE profiles ADD COLUMN carbs_goal INTEGER NOT NULL DEFAULT 250;
                 ALTER TABLE profiles ADD COLUMN sugar_limit REAL NOT NULL DEFAULT 25;
                 PRAGMA user_version = 2;",
            )?;
        }

        Ok(())
    }

    // --- Row mapping helpers ---

    fn profile_from_row(row: &rusqlite::Row) -> rusqlite::Result<Profile> {
        Ok(Profile {
            id: row.get(0)?,
            user_id: row.get(1)?,
            username: row.get(2)?,
            display_name: row.get(3)?,
            bio: row.get(4)?,
            total_points: row.get(5)?,
            current_streak: row.get(6)?,
            longest_streak: row.get(7)?,
            goals: NutritionGoals {
                calorie_goal: row.get(8)?,
                protein_goal: row.get(9)?,
                carbs_goal: row.get(10)?,
                sugar_limit: row.get(11)?,
            },
            created_at: row.get(12)?,
            updated_at: row.get(13)?,
        })
    }

    fn food_entry_from_row(row: &rusqlite::Row) -> rusqlite::Result<FoodEntry> {
        let logged_at: String = row.get(8)?;
        Ok(FoodEntry {
            id: row.get(0)?,
            user_id: row.get(1)?,
            name: row.get(2)?,
            calories: row.get(3)?,
            protein: row.get(4)?,
            carbs: row.get(5)?,
            sugar: row.get(6)?,
            image_url: row.get(7)?,
            logged_at: parse_timestamp(8, &logged_at)?,
            created_at: row.get(9)?,
        })
    }

    fn daily_log_from_row(row: &rusqlite::Row) -> rusqlite::Result<DailyLog> {
        let log_date: String = row.get(2)?;
        Ok(DailyLog {
            id: row.get(0)?,
            user_id: row.get(1)?,
            log_date: parse_date(2, &log_date)?,
            total_calories: row.get(3)?,
            total_protein: row.get(4)?,
            total_carbs: row.get(5)?,
            total_sugar: row.get(6)?,
            is_sugar_free: row.get(7)?,
            points_earned: row.get(8)?,
            created_at: row.get(9)?,
        })
    }

    // --- Profiles ---

    pub fn create_profile(&self, profile: &NewProfile) -> Result<Profile> {
        let username = validate_username(&profile.username)?;
        if self.get_profile_by_username(&username)?.is_some() {
            bail!("Username '{username}' is already taken");
        }

        let now = Local::now().to_rfc3339();
        let id = Uuid::new_v4().to_string();
        let user_id = Uuid::new_v4().to_string();
        let goals = NutritionGoals::default();
        self.conn.execute(
            "INSERT INTO profiles (id, user_id, username, display_name, calorie_goal, protein_goal,
                                   carbs_goal, sugar_limit, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                id,
                user_id,
                username,
                profile.display_name,
                goals.calorie_goal,
                goals.protein_goal,
                goals.carbs_goal,
                goals.sugar_limit,
                now,
                now,
            ],
        )?;
        self.get_profile(&user_id)
    }

    pub fn get_profile(&self, user_id: &str) -> Result<Profile> {
        self.conn
            .query_row(
                &format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE user_id = ?1"),
                params![user_id],
                Self::profile_from_row,
            )
            .context("Profile not found")
    }

    pub fn get_profile_by_username(&self, username: &str) -> Result<Option<Profile>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles WHERE username = ?1"
        ))?;
        let mut rows = stmt.query(params![username.trim().to_lowercase()])?;
        if let Some(row) = rows.next()? {
            Ok(Some(Self::profile_from_row(row)?))
        } else {
            Ok(None)
        }
    }

    pub fn update_profile(&self, user_id: &str, update: &UpdateProfile) -> Result<Profile> {
        // Verify existence
        self.get_profile(user_id)?;

        let now = Local::now().to_rfc3339();
        if let Some(ref display_name) = update.display_name {
            self.conn.execute(
                "UPDATE profiles SET display_name = ?1, updated_at = ?2 WHERE user_id = ?3",
                params![display_name, now, user_id],
            )?;
        }
        if let Some(ref bio) = update.bio {
            self.conn.execute(
                "UPDATE profiles SET bio = ?1, updated_at = ?2 WHERE user_id = ?3",
                params![bio, now, user_id],
            )?;
        }

        self.get_profile(user_id)
    }

    pub fn set_goals(&self, user_id: &str, goals: &NutritionGoals) -> Result<Profile> {
        let now = Local::now().to_rfc3339();
        let rows = self.conn.execute(
            "UPDATE profiles
             SET calorie_goal = ?1, protein_goal = ?2, carbs_goal = ?3, sugar_limit = ?4, updated_at = ?5
             WHERE user_id = ?6",
            params![
                goals.calorie_goal,
                goals.protein_goal,
                goals.carbs_goal,
                goals.sugar_limit,
                now,
                user_id,
            ],
        )?;
        if rows == 0 {
            bail!("Profile not found");
        }
        self.get_profile(user_id)
    }

    pub fn update_streak_state(&self, user_id: &str, state: &StreakState) -> Result<()> {
        let now = Local::now().to_rfc3339();
        let rows = self.conn.execute(
            "UPDATE profiles
             SET current_streak = ?1, longest_streak = ?2, total_points = ?3, updated_at = ?4
             WHERE user_id = ?5",
            params![
                state.current_streak,
                state.longest_streak,
                state.total_points,
                now,
                user_id,
            ],
        )?;
        if rows == 0 {
            bail!("Profile not found");
        }
        Ok(())
    }

    pub fn list_profiles_by_points(&self, limit: i64) -> Result<Vec<Profile>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles
             ORDER BY total_points DESC, created_at ASC
             LIMIT ?1"
        ))?;
        let profiles = stmt
            .query_map(params![limit], Self::profile_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(profiles)
    }

    // --- Food entries ---

    pub fn insert_food_entry(&self, entry: &NewFoodEntry) -> Result<FoodEntry> {
        let now = Local::now().to_rfc3339();
        let id = Uuid::new_v4().to_string();
        self.conn.execute(
            "INSERT INTO food_entries (id, user_id, name, calories, protein, carbs, sugar, image_url, logged_at, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                id,
                entry.user_id,
                entry.name.trim(),
                entry.calories,
                entry.protein,
                entry.carbs,
                entry.sugar,
                entry.image_url,
                timestamp_to_sql(&entry.logged_at),
                now,
            ],
        )?;
        self.get_food_entry(&id)
    }

    pub fn get_food_entry(&self, id: &str) -> Result<FoodEntry> {
        self.conn
            .query_row(
                &format!("SELECT {FOOD_ENTRY_COLUMNS} FROM food_entries WHERE id = ?1"),
                params![id],
                Self::food_entry_from_row,
            )
            .context("Food entry not found")
    }

    pub fn update_food_entry(&self, id: &str, update: &UpdateFoodEntry) -> Result<FoodEntry> {
        // Verify existence
        self.get_food_entry(id)?;

        if let Some(ref name) = update.name {
            self.conn.execute(
                "UPDATE food_entries SET name = ?1 WHERE id = ?2",
                params![name.trim(), id],
            )?;
        }
        for (column, value) in [
            ("calories", update.calories),
            ("protein", update.protein),
            ("carbs", update.carbs),
            ("sugar", update.sugar),
        ] {
            if let Some(v) = value {
                self.conn.execute(
                    &format!("UPDATE food_entries SET {column} = ?1 WHERE id = ?2"),
                    params![v, id],
                )?;
            }
        }
        if let Some(logged_at) = update.logged_at {
            self.conn.execute(
                "UPDATE food_entries SET logged_at = ?1 WHERE id = ?2",
                params![timestamp_to_sql(&logged_at), id],
            )?;
        }
        if let Some(ref image_url) = update.image_url {
            self.conn.execute(
                "UPDATE food_entries SET image_url = ?1 WHERE id = ?2",
                params![image_url, id],
            )?;
        }

        self.get_food_entry(id)
    }

    pub fn delete_food_entry(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM food_entries WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    pub fn list_food_entries(&self, user_id: &str) -> Result<Vec<FoodEntry>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {FOOD_ENTRY_COLUMNS} FROM food_entries WHERE user_id = ?1 ORDER BY logged_at, id"
        ))?;
        let entries = stmt
            .query_map(params![user_id], Self::food_entry_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    /// Entries logged in `[start, end)`, most recent first.
    pub fn list_food_entries_between(
        &self,
        user_id: &str,
        start: &DateTime<Utc>,
        end: &DateTime<Utc>,
    ) -> Result<Vec<FoodEntry>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {FOOD_ENTRY_COLUMNS} FROM food_entries
             WHERE user_id = ?1 AND logged_at >= ?2 AND logged_at < ?3
             ORDER BY logged_at DESC, id"
        ))?;
        let entries = stmt
            .query_map(
                params![user_id, timestamp_to_sql(start), timestamp_to_sql(end)],
                Self::food_entry_from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    // --- Daily logs ---

    pub fn get_daily_log_dates(&self, user_id: &str) -> Result<HashSet<NaiveDate>> {
        let mut stmt = self
            .conn
            .prepare("SELECT log_date FROM daily_logs WHERE user_id = ?1")?;
        let dates = stmt
            .query_map(params![user_id], |row| {
                let s: String = row.get(0)?;
                parse_date(0, &s)
            })?
            .collect::<Result<HashSet<_>, _>>()?;
        Ok(dates)
    }

    /// Insert daily logs in one transaction, skipping any `(user, date)` that
    /// already has a row.
    pub fn insert_missing_daily_logs(&self, logs: &[NewDailyLog]) -> Result<usize> {
        let now = Local::now().to_rfc3339();
        let tx = self.conn.unchecked_transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO daily_logs (id, user_id, log_date, total_calories, total_protein,
                     total_carbs, total_sugar, is_sugar_free, points_earned, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            )?;
            for log in logs {
                inserted += stmt.execute(params![
                    Uuid::new_v4().to_string(),
                    log.user_id,
                    date_to_sql(log.log_date),
                    log.totals.calories,
                    log.totals.protein,
                    log.totals.carbs,
                    log.totals.sugar,
                    log.is_sugar_free,
                    log.points_earned,
                    now,
                ])?;
            }
        }
        tx.commit()?;
        Ok(inserted)
    }

    /// Insert or overwrite the daily log for `(user, date)`.
    pub fn upsert_daily_log(&self, log: &NewDailyLog) -> Result<DailyLog> {
        let now = Local::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO daily_logs (id, user_id, log_date, total_calories, total_protein,
                 total_carbs, total_sugar, is_sugar_free, points_earned, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
             ON CONFLICT(user_id, log_date) DO UPDATE SET
                 total_calories = excluded.total_calories,
                 total_protein = excluded.total_protein,
                 total_carbs = excluded.total_carbs,
                 total_sugar = excluded.total_sugar,
                 is_sugar_free = excluded.is_sugar_free,
                 points_earned = excluded.points_earned",
            params![
                Uuid::new_v4().to_string(),
                log.user_id,
                date_to_sql(log.log_date),
                log.totals.calories,
                log.totals.protein,
                log.totals.carbs,
                log.totals.sugar,
                log.is_sugar_free,
                log.points_earned,
                now,
            ],
        )?;
        self.get_daily_log(&log.user_id, log.log_date)?
            .context("Daily log not found after upsert")
    }

    pub fn get_daily_log(&self, user_id: &str, date: NaiveDate) -> Result<Option<DailyLog>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {DAILY_LOG_COLUMNS} FROM daily_logs WHERE user_id = ?1 AND log_date = ?2"
        ))?;
        let mut rows = stmt.query(params![user_id, date_to_sql(date)])?;
        if let Some(row) = rows.next()? {
            Ok(Some(Self::daily_log_from_row(row)?))
        } else {
            Ok(None)
        }
    }

    /// Daily logs with `start <= log_date <= end`, oldest first.
    pub fn list_daily_logs_between(
        &self,
        user_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyLog>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {DAILY_LOG_COLUMNS} FROM daily_logs
             WHERE user_id = ?1 AND log_date >= ?2 AND log_date <= ?3
             ORDER BY log_date ASC"
        ))?;
        let logs = stmt
            .query_map(
                params![user_id, date_to_sql(start), date_to_sql(end)],
                Self::daily_log_from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(logs)
    }

    pub fn get_daily_sugar_desc(&self, user_id: &str) -> Result<Vec<DaySugar>> {
        let mut stmt = self.conn.prepare(
            "SELECT log_date, total_sugar FROM daily_logs WHERE user_id = ?1 ORDER BY log_date DESC",
        )?;
        let days = stmt
            .query_map(params![user_id], |row| {
                let s: String = row.get(0)?;
                Ok(DaySugar {
                    date: parse_date(0, &s)?,
                    total_sugar: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(days)
    }
}

impl StreakStore for Database {
    fn food_entries_for_user(&self, user_id: &str) -> Result<Vec<FoodEntry>> {
        self.list_food_entries(user_id)
    }

    fn daily_log_dates(&self, user_id: &str) -> Result<HashSet<NaiveDate>> {
        self.get_daily_log_dates(user_id)
    }

    fn insert_daily_logs(&self, logs: &[NewDailyLog]) -> Result<usize> {
        self.insert_missing_daily_logs(logs)
    }

    fn daily_sugar_desc(&self, user_id: &str) -> Result<Vec<DaySugar>> {
        self.get_daily_sugar_desc(user_id)
    }

    fn profile(&self, user_id: &str) -> Result<Profile> {
        self.get_profile(user_id)
    }

    fn save_streak_state(&self, user_id: &str, state: &StreakState) -> Result<()> {
        self.update_streak_state(user_id, state)
    }
}

// Timestamps are stored at second precision in UTC ("2024-06-15T12:00:00Z") so
// text comparison matches time order.
fn timestamp_to_sql(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn date_to_sql(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn parse_timestamp(idx: usize, s: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parse_date(idx: usize, s: &str) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
