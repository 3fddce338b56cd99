use anyhow::Result;
use std::process;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use cutsistent_core::history::parse_time_range;
use cutsistent_core::models::Profile;
use cutsistent_core::service::CutsistentService;

use super::helpers::no_neg_zero;

pub(crate) fn cmd_history(
    svc: &CutsistentService,
    profile: &Profile,
    range: &str,
    json: bool,
) -> Result<()> {
    #[derive(Tabled)]
    struct HistoryRow {
        #[tabled(rename = "Date")]
        date: String,
        #[tabled(rename = "Calories")]
        calories: String,
        #[tabled(rename = "Protein")]
        protein: String,
        #[tabled(rename = "Carbs")]
        carbs: String,
        #[tabled(rename = "Sugar")]
        sugar: String,
        #[tabled(rename = "Sugar-free")]
        sugar_free: String,
    }

    let range = parse_time_range(range)?;
    let history = svc.nutrition_history(&profile.user_id, range, svc.today())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&history)?);
        return Ok(());
    }

    let (start, end) = (history.start, history.end);
    if history.days.is_empty() {
        eprintln!("No daily logs between {start} and {end}. Run `cutsistent sync` to backfill.");
        process::exit(2);
    }

    println!("=== {start} to {end} ===\n");

    let rows: Vec<HistoryRow> = history
        .days
        .iter()
        .map(|d| HistoryRow {
            date: d.log_date.format("%a %Y-%m-%d").to_string(),
            calories: format!("{:.0}", no_neg_zero(d.total_calories)),
            protein: format!("{:.0}g", no_neg_zero(d.total_protein)),
            carbs: format!("{:.0}g", no_neg_zero(d.total_carbs)),
            sugar: format!("{:.1}g", no_neg_zero(d.total_sugar)),
            sugar_free: if d.is_sugar_free { "yes" } else { "no" }.to_string(),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..5)).with(Alignment::right()))
        .to_string();
    println!("{table}");

    let avg = history.averages;
    println!(
        "  AVERAGE: {:.0} kcal | P:{:.0}g C:{:.0}g Sugar:{:.0}g",
        no_neg_zero(avg.calories),
        no_neg_zero(avg.protein),
        no_neg_zero(avg.carbs),
        no_neg_zero(avg.sugar)
    );
    println!(
        "  Sugar-free days: {} of {}",
        history.sugar_free_days, history.total_days
    );
    Ok(())
}
