use anyhow::{Result, bail};
use chrono::{NaiveTime, Utc};
use std::process;

use cutsistent_core::models::{NewFoodEntry, Profile, UpdateFoodEntry};
use cutsistent_core::service::CutsistentService;

use super::helpers::{
    json_error, no_neg_zero, parse_date, parse_time, print_entries_table, print_streak_change,
    refresh_streak,
};

/// Food fields as given on the command line, shared by `log` and `edit`.
pub(crate) struct FoodFields {
    pub name: Option<String>,
    pub calories: Option<f64>,
    pub protein: Option<f64>,
    pub carbs: Option<f64>,
    pub sugar: Option<f64>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub image_url: Option<Option<String>>,
}

pub(crate) fn cmd_log(
    svc: &CutsistentService,
    profile: &Profile,
    fields: FoodFields,
    json: bool,
) -> Result<()> {
    let boundary = svc.boundary();
    let logged_at = match (fields.date, fields.time) {
        (None, None) => Utc::now(),
        (date, time) => {
            let date = parse_date(date, svc.today())?;
            let time = match time {
                Some(t) => parse_time(&t)?,
                None => NaiveTime::from_hms_opt(12, 0, 0).unwrap_or(NaiveTime::MIN),
            };
            boundary.at(date, time)?
        }
    };

    let entry = svc.log_food(&NewFoodEntry {
        user_id: profile.user_id.clone(),
        name: fields.name.unwrap_or_default(),
        calories: fields.calories.unwrap_or(0.0),
        protein: fields.protein.unwrap_or(0.0),
        carbs: fields.carbs.unwrap_or(0.0),
        sugar: fields.sugar.unwrap_or(0.0),
        logged_at,
        image_url: fields.image_url.flatten(),
    })?;
    let outcome = refresh_streak(svc, &profile.user_id);

    if json {
        let out = serde_json::json!({ "entry": entry, "streak": outcome });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        let date = boundary.date_of(&entry.logged_at);
        let name = &entry.name;
        let cal = no_neg_zero(entry.calories);
        let sugar = no_neg_zero(entry.sugar);
        println!("Logged {name} for {date}: {cal:.0} kcal, {sugar:.1}g sugar");
        println!("  ID: {}", entry.id);
        if let Some(ref outcome) = outcome {
            print_streak_change(outcome);
        }
    }

    Ok(())
}

pub(crate) fn cmd_entries(
    svc: &CutsistentService,
    profile: &Profile,
    date: Option<String>,
    json: bool,
) -> Result<()> {
    let date = parse_date(date, svc.today())?;
    let entries = svc.entries_for_day(&profile.user_id, date)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        eprintln!("No entries for {date}");
        process::exit(2);
    }

    println!("=== {date} ===\n");
    print_entries_table(&entries, svc.boundary());

    let totals = svc.day_totals(&profile.user_id, date)?;
    let cal = no_neg_zero(totals.calories);
    let p = no_neg_zero(totals.protein);
    let c = no_neg_zero(totals.carbs);
    let s = no_neg_zero(totals.sugar);
    println!("  TOTAL: {cal:.0} kcal | P:{p:.0}g C:{c:.0}g Sugar:{s:.1}g");

    Ok(())
}

pub(crate) fn cmd_edit(
    svc: &CutsistentService,
    profile: &Profile,
    id: &str,
    fields: FoodFields,
    json: bool,
) -> Result<()> {
    let boundary = svc.boundary();
    let logged_at = match (fields.date, fields.time) {
        (None, None) => None,
        (date, time) => {
            let existing = svc.get_food_entry(&profile.user_id, id)?;
            let date = match date {
                Some(d) => parse_date(Some(d), svc.today())?,
                None => boundary.date_of(&existing.logged_at),
            };
            let time = match time {
                Some(t) => parse_time(&t)?,
                None => boundary.time_of(&existing.logged_at),
            };
            Some(boundary.at(date, time)?)
        }
    };

    let update = UpdateFoodEntry {
        name: fields.name,
        calories: fields.calories,
        protein: fields.protein,
        carbs: fields.carbs,
        sugar: fields.sugar,
        logged_at,
        image_url: fields.image_url,
    };
    if update.is_empty() {
        bail!(
            "Nothing to update. Provide at least one of --name, --calories, --protein, --carbs, --sugar, --date, --time, --image-url"
        );
    }

    let entry = svc.update_food(&profile.user_id, id, &update)?;
    let outcome = refresh_streak(svc, &profile.user_id);

    if json {
        let out = serde_json::json!({ "entry": entry, "streak": outcome });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        let name = &entry.name;
        let date = boundary.date_of(&entry.logged_at);
        let cal = no_neg_zero(entry.calories);
        let sugar = no_neg_zero(entry.sugar);
        println!("Updated {name} on {date}: {cal:.0} kcal, {sugar:.1}g sugar");
        if let Some(ref outcome) = outcome {
            print_streak_change(outcome);
        }
    }

    Ok(())
}

pub(crate) fn cmd_delete(
    svc: &CutsistentService,
    profile: &Profile,
    id: &str,
    json: bool,
) -> Result<()> {
    if svc.get_food_entry(&profile.user_id, id).is_err() {
        if json {
            println!("{}", json_error(&format!("Entry {id} not found")));
        } else {
            eprintln!("Entry {id} not found");
        }
        process::exit(2);
    }

    svc.delete_food(&profile.user_id, id)?;
    let outcome = refresh_streak(svc, &profile.user_id);

    if json {
        println!(
            "{}",
            serde_json::json!({ "deleted": id, "streak": outcome })
        );
    } else {
        println!("Deleted entry {id}");
        if let Some(ref outcome) = outcome {
            print_streak_change(outcome);
        }
    }

    Ok(())
}
