use anyhow::{Result, bail};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Daily sugar allowance (grams) under which a day still counts as sugar-free.
pub const DEFAULT_SUGAR_LIMIT_G: f64 = 25.0;

/// Points recorded on a daily log that stayed within the sugar limit.
pub const SUGAR_FREE_DAY_POINTS: i64 = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FoodEntry {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub sugar: f64,
    pub logged_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub image_url: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct NewFoodEntry {
    pub user_id: String,
    pub name: String,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub sugar: f64,
    pub logged_at: DateTime<Utc>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateFoodEntry {
    pub name: Option<String>,
    pub calories: Option<f64>,
    pub protein: Option<f64>,
    pub carbs: Option<f64>,
    pub sugar: Option<f64>,
    pub logged_at: Option<DateTime<Utc>>,
    pub image_url: Option<Option<String>>,
}

impl UpdateFoodEntry {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.calories.is_none()
            && self.protein.is_none()
            && self.carbs.is_none()
            && self.sugar.is_none()
            && self.logged_at.is_none()
            && self.image_url.is_none()
    }
}

/// Summed nutrients for one calendar day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DailyTotals {
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub sugar: f64,
}

impl DailyTotals {
    pub fn add(&mut self, entry: &FoodEntry) {
        self.calories += entry.calories;
        self.protein += entry.protein;
        self.carbs += entry.carbs;
        self.sugar += entry.sugar;
    }

    #[must_use]
    pub fn is_sugar_free(&self, sugar_limit: f64) -> bool {
        self.sugar <= sugar_limit
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyLog {
    pub id: String,
    pub user_id: String,
    pub log_date: NaiveDate,
    pub total_calories: f64,
    pub total_protein: f64,
    pub total_carbs: f64,
    pub total_sugar: f64,
    pub is_sugar_free: bool,
    pub points_earned: i64,
    pub created_at: String,
}

impl DailyLog {
    #[must_use]
    pub fn totals(&self) -> DailyTotals {
        DailyTotals {
            calories: self.total_calories,
            protein: self.total_protein,
            carbs: self.total_carbs,
            sugar: self.total_sugar,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewDailyLog {
    pub user_id: String,
    pub log_date: NaiveDate,
    pub totals: DailyTotals,
    pub is_sugar_free: bool,
    pub points_earned: i64,
}

impl NewDailyLog {
    /// Build the aggregate row for a date, deriving the sugar-free flag and
    /// points from `sugar_limit`.
    #[must_use]
    pub fn from_totals(
        user_id: &str,
        log_date: NaiveDate,
        totals: DailyTotals,
        sugar_limit: f64,
    ) -> Self {
        let is_sugar_free = totals.is_sugar_free(sugar_limit);
        Self {
            user_id: user_id.to_string(),
            log_date,
            totals,
            is_sugar_free,
            points_earned: if is_sugar_free {
                SUGAR_FREE_DAY_POINTS
            } else {
                0
            },
        }
    }
}

/// One day of the streak scan input: the date and its summed sugar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DaySugar {
    pub date: NaiveDate,
    pub total_sugar: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NutritionGoals {
    pub calorie_goal: i64,
    pub protein_goal: i64,
    pub carbs_goal: i64,
    pub sugar_limit: f64,
}

impl Default for NutritionGoals {
    fn default() -> Self {
        GoalPreset::Maintenance.goals()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GoalPreset {
    WeightLoss,
    Maintenance,
    MuscleGain,
    LowCarb,
}

pub const GOAL_PRESETS: &[&str] = &["weight-loss", "maintenance", "muscle-gain", "low-carb"];

impl GoalPreset {
    #[must_use]
    pub fn goals(self) -> NutritionGoals {
        let (calorie_goal, protein_goal, carbs_goal, sugar_limit) = match self {
            Self::WeightLoss => (1500, 150, 100, 15.0),
            Self::Maintenance => (2000, 120, 250, DEFAULT_SUGAR_LIMIT_G),
            Self::MuscleGain => (2500, 180, 300, 30.0),
            Self::LowCarb => (1800, 140, 50, 10.0),
        };
        NutritionGoals {
            calorie_goal,
            protein_goal,
            carbs_goal,
            sugar_limit,
        }
    }
}

pub fn parse_goal_preset(name: &str) -> Result<GoalPreset> {
    let normalized = name.trim().to_lowercase().replace(['_', ' '], "-");
    match normalized.as_str() {
        "weight-loss" => Ok(GoalPreset::WeightLoss),
        "maintenance" => Ok(GoalPreset::Maintenance),
        "muscle-gain" => Ok(GoalPreset::MuscleGain),
        "low-carb" => Ok(GoalPreset::LowCarb),
        _ => bail!(
            "Invalid goal preset '{name}'. Must be one of: {}",
            GOAL_PRESETS.join(", ")
        ),
    }
}

pub fn validate_goals(goals: &NutritionGoals) -> Result<()> {
    if goals.calorie_goal < 0 || goals.protein_goal < 0 || goals.carbs_goal < 0 {
        bail!("Nutrition goals must be non-negative");
    }
    if !goals.sugar_limit.is_finite() || goals.sugar_limit < 0.0 {
        bail!("Sugar limit must be a non-negative number of grams");
    }
    Ok(())
}

/// The three profile fields owned by the streak engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakState {
    pub current_streak: i64,
    pub longest_streak: i64,
    pub total_points: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub user_id: String,
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub current_streak: i64,
    pub longest_streak: i64,
    pub total_points: i64,
    pub goals: NutritionGoals,
    pub created_at: String,
    pub updated_at: String,
}

impl Profile {
    #[must_use]
    pub fn streak_state(&self) -> StreakState {
        StreakState {
            current_streak: self.current_streak,
            longest_streak: self.longest_streak,
            total_points: self.total_points,
        }
    }

    /// Name shown on leaderboards: display name, then username, then "Anonymous".
    #[must_use]
    pub fn public_name(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .or(self.username.as_deref())
            .unwrap_or("Anonymous")
    }
}

#[derive(Debug, Clone)]
pub struct NewProfile {
    pub username: String,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateProfile {
    pub display_name: Option<Option<String>>,
    pub bio: Option<Option<String>>,
}

pub fn validate_username(username: &str) -> Result<String> {
    let trimmed = username.trim();
    if trimmed.is_empty() {
        bail!("Username must not be empty");
    }
    if trimmed.chars().any(char::is_whitespace) {
        bail!("Username must not contain whitespace");
    }
    Ok(trimmed.to_lowercase())
}

fn validate_nutrient(label: &str, value: f64) -> Result<()> {
    if !value.is_finite() {
        bail!("{label} must be a finite number");
    }
    if value < 0.0 {
        bail!("{label} must not be negative");
    }
    Ok(())
}

/// Validate a new food entry: name must not be empty, nutrients must not be negative.
pub fn validate_new_food_entry(entry: &NewFoodEntry) -> Result<()> {
    if entry.name.trim().is_empty() {
        bail!("Food name must not be empty");
    }
    validate_nutrient("calories", entry.calories)?;
    validate_nutrient("protein", entry.protein)?;
    validate_nutrient("carbs", entry.carbs)?;
    validate_nutrient("sugar", entry.sugar)?;
    Ok(())
}

pub fn validate_food_update(update: &UpdateFoodEntry) -> Result<()> {
    if update.name.as_ref().is_some_and(|n| n.trim().is_empty()) {
        bail!("Food name must not be empty");
    }
    for (label, value) in [
        ("calories", update.calories),
        ("protein", update.protein),
        ("carbs", update.carbs),
        ("sugar", update.sugar),
    ] {
        if let Some(v) = value {
            validate_nutrient(label, v)?;
        }
    }
    Ok(())
}
