use anyhow::Result;
use std::process;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use cutsistent_core::models::Profile;
use cutsistent_core::service::CutsistentService;

use super::helpers::{no_neg_zero, print_streak_change, truncate};

pub(crate) fn cmd_today(svc: &CutsistentService, profile: &Profile, json: bool) -> Result<()> {
    let today = svc.today();
    let totals = svc.day_totals(&profile.user_id, today)?;
    let goals = &profile.goals;

    if json {
        let out = serde_json::json!({
            "date": today,
            "totals": totals,
            "goals": goals,
            "sugar_free": totals.is_sugar_free(goals.sugar_limit),
            "streak": profile.streak_state(),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    let cal = no_neg_zero(totals.calories);
    let p = no_neg_zero(totals.protein);
    let c = no_neg_zero(totals.carbs);
    let s = no_neg_zero(totals.sugar);
    println!("=== {today} ===\n");
    println!("  Calories: {cal:.0} / {} kcal", goals.calorie_goal);
    println!("  Protein:  {p:.0} / {}g", goals.protein_goal);
    println!("  Carbs:    {c:.0} / {}g", goals.carbs_goal);
    println!("  Sugar:    {s:.1} / {:.0}g", goals.sugar_limit);

    let remaining = goals.sugar_limit - totals.sugar;
    if remaining >= 0.0 {
        println!("\n  Sugar-free so far, {remaining:.1}g to spare");
    } else {
        let over = -remaining;
        println!("\n  Over the sugar limit by {over:.1}g");
    }
    println!(
        "  Streak: {} days (best {}) | {} points",
        profile.current_streak, profile.longest_streak, profile.total_points
    );
    Ok(())
}

pub(crate) fn cmd_sync(svc: &CutsistentService, profile: &Profile, json: bool) -> Result<()> {
    let report = svc.sync_daily_logs(&profile.user_id)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "Synced {} days with entries, {} new daily logs",
            report.days_with_entries, report.inserted
        );
    }
    Ok(())
}

pub(crate) fn cmd_streak(svc: &CutsistentService, profile: &Profile, json: bool) -> Result<()> {
    let outcome = svc.recalculate_streak_now(&profile.user_id)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    print_streak_change(&outcome);
    println!("  Longest streak: {} days", outcome.updated.longest_streak);
    if outcome.sync.inserted > 0 {
        println!("  Backfilled {} daily logs", outcome.sync.inserted);
    }
    Ok(())
}

pub(crate) fn cmd_leaderboard(svc: &CutsistentService, limit: i64, json: bool) -> Result<()> {
    #[derive(Tabled)]
    struct LeaderboardRow {
        #[tabled(rename = "#")]
        rank: usize,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Points")]
        points: i64,
        #[tabled(rename = "Streak")]
        streak: i64,
        #[tabled(rename = "Badges")]
        badges: String,
    }

    let board = svc.leaderboard(limit)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&board)?);
        return Ok(());
    }

    if board.is_empty() {
        eprintln!("No profiles yet. Use `cutsistent profile create` to add one.");
        process::exit(2);
    }

    let rows: Vec<LeaderboardRow> = board
        .iter()
        .map(|e| LeaderboardRow {
            rank: e.rank,
            name: truncate(&e.name, 25),
            points: e.points,
            streak: e.streak,
            badges: e
                .badges
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", "),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(2..4)).with(Alignment::right()))
        .to_string();
    println!("{table}");
    Ok(())
}
