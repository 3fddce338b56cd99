mod commands;
mod config;

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use std::process;
use tracing_subscriber::EnvFilter;

use crate::commands::{
    FoodFields, cmd_delete, cmd_edit, cmd_entries, cmd_goals_set, cmd_goals_show, cmd_history,
    cmd_leaderboard, cmd_log, cmd_profile_create, cmd_profile_edit, cmd_profile_show,
    cmd_profile_use, cmd_streak, cmd_sync, cmd_today,
};
use crate::config::Config;
use cutsistent_core::leaderboard::DEFAULT_LEADERBOARD_LIMIT;
use cutsistent_core::models::Profile;
use cutsistent_core::service::CutsistentService;

#[derive(Parser)]
#[command(
    name = "cutsistent",
    version,
    about = "Log what you eat and keep a sugar-free streak going"
)]
struct Cli {
    /// Username to act as (defaults to the `user` in config.toml)
    #[arg(long, global = true)]
    user: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create, show, edit or select a profile
    Profile {
        #[command(subcommand)]
        command: ProfileCommands,
    },
    /// Show or set nutrition goals
    Goals {
        #[command(subcommand)]
        command: GoalsCommands,
    },
    /// Log a food entry
    Log {
        /// Food name
        name: String,
        /// Sugar in grams
        #[arg(long)]
        sugar: f64,
        /// Calories
        #[arg(long, default_value = "0")]
        calories: f64,
        /// Protein in grams
        #[arg(long, default_value = "0")]
        protein: f64,
        /// Carbs in grams
        #[arg(long, default_value = "0")]
        carbs: f64,
        /// Date eaten (YYYY-MM-DD or today/yesterday, default: now)
        #[arg(long)]
        date: Option<String>,
        /// Time eaten (HH:MM, default: now for today, 12:00 for other dates)
        #[arg(long)]
        time: Option<String>,
        /// Photo URL
        #[arg(long)]
        image_url: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List food entries for a day (defaults to today)
    Entries {
        /// Date to show (YYYY-MM-DD or today/yesterday)
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Edit a food entry
    Edit {
        /// Entry ID
        id: String,
        /// New food name
        #[arg(long)]
        name: Option<String>,
        /// New calories
        #[arg(long)]
        calories: Option<f64>,
        /// New protein in grams
        #[arg(long)]
        protein: Option<f64>,
        /// New carbs in grams
        #[arg(long)]
        carbs: Option<f64>,
        /// New sugar in grams
        #[arg(long)]
        sugar: Option<f64>,
        /// New date (YYYY-MM-DD or today/yesterday)
        #[arg(long)]
        date: Option<String>,
        /// New time (HH:MM, requires or implies the entry's date)
        #[arg(long)]
        time: Option<String>,
        /// New photo URL
        #[arg(long, conflicts_with = "clear_image")]
        image_url: Option<String>,
        /// Remove the photo URL
        #[arg(long)]
        clear_image: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a food entry
    Delete {
        /// Entry ID
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show today's totals against your goals, plus your streak
    Today {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Backfill daily logs from food entries
    Sync {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Recalculate and show your sugar-free streak
    Streak {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the points leaderboard
    Leaderboard {
        /// Number of profiles to show
        #[arg(short, long, default_value_t = DEFAULT_LEADERBOARD_LIMIT)]
        limit: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show nutrition history for this week or month
    History {
        /// Range: week or month
        #[arg(short, long, default_value = "week")]
        range: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum ProfileCommands {
    /// Create a profile and make it the default
    Create {
        /// Unique username
        username: String,
        /// Name shown on the leaderboard
        #[arg(long)]
        display_name: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the current profile
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Edit display name or bio
    Edit {
        /// New display name
        #[arg(long, conflicts_with = "clear_display_name")]
        display_name: Option<String>,
        /// Remove the display name
        #[arg(long)]
        clear_display_name: bool,
        /// New bio
        #[arg(long, conflicts_with = "clear_bio")]
        bio: Option<String>,
        /// Remove the bio
        #[arg(long)]
        clear_bio: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Make a profile the default for future commands
    Use {
        /// Username
        username: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum GoalsCommands {
    /// Show nutrition goals
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Set nutrition goals from a preset and/or individual values
    Set {
        /// Preset: weight-loss, maintenance, muscle-gain, low-carb
        #[arg(long)]
        preset: Option<String>,
        /// Daily calorie goal
        #[arg(long)]
        calories: Option<i64>,
        /// Daily protein goal in grams
        #[arg(long)]
        protein: Option<i64>,
        /// Daily carbs goal in grams
        #[arg(long)]
        carbs: Option<i64>,
        /// Daily sugar limit in grams
        #[arg(long)]
        sugar_limit: Option<f64>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_logging() {
    // Logs go to stderr so --json output on stdout stays clean.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    init_logging();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

/// Resolve the acting profile from `--user` or the configured default.
fn current_profile(
    svc: &CutsistentService,
    user: Option<&str>,
    config: &Config,
) -> Result<Profile> {
    let Some(username) = user.or(config.settings.user.as_deref()) else {
        bail!(
            "No profile selected. Create one with `cutsistent profile create <username>` or pass --user"
        );
    };
    svc.find_profile(username)
}

#[allow(clippy::too_many_lines)]
fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load()?;
    let svc = CutsistentService::new(&config.db_path, config.settings.day_boundary)?;
    let user = cli.user.as_deref();

    match cli.command {
        Commands::Profile { command } => match command {
            ProfileCommands::Create {
                username,
                display_name,
                json,
            } => cmd_profile_create(&svc, &mut config, &username, display_name, json),
            ProfileCommands::Show { json } => {
                let profile = current_profile(&svc, user, &config)?;
                cmd_profile_show(&profile, json)
            }
            ProfileCommands::Edit {
                display_name,
                clear_display_name,
                bio,
                clear_bio,
                json,
            } => {
                let profile = current_profile(&svc, user, &config)?;
                let display_name = if clear_display_name {
                    Some(None)
                } else {
                    display_name.map(Some)
                };
                let bio = if clear_bio { Some(None) } else { bio.map(Some) };
                cmd_profile_edit(&svc, &profile, display_name, bio, json)
            }
            ProfileCommands::Use { username, json } => {
                cmd_profile_use(&svc, &mut config, &username, json)
            }
        },
        Commands::Goals { command } => {
            let profile = current_profile(&svc, user, &config)?;
            match command {
                GoalsCommands::Show { json } => cmd_goals_show(&profile, json),
                GoalsCommands::Set {
                    preset,
                    calories,
                    protein,
                    carbs,
                    sugar_limit,
                    json,
                } => cmd_goals_set(
                    &svc,
                    &profile,
                    preset.as_deref(),
                    calories,
                    protein,
                    carbs,
                    sugar_limit,
                    json,
                ),
            }
        }
        Commands::Log {
            name,
            sugar,
            calories,
            protein,
            carbs,
            date,
            time,
            image_url,
            json,
        } => {
            let profile = current_profile(&svc, user, &config)?;
            let fields = FoodFields {
                name: Some(name),
                calories: Some(calories),
                protein: Some(protein),
                carbs: Some(carbs),
                sugar: Some(sugar),
                date,
                time,
                image_url: image_url.map(Some),
            };
            cmd_log(&svc, &profile, fields, json)
        }
        Commands::Entries { date, json } => {
            let profile = current_profile(&svc, user, &config)?;
            cmd_entries(&svc, &profile, date, json)
        }
        Commands::Edit {
            id,
            name,
            calories,
            protein,
            carbs,
            sugar,
            date,
            time,
            image_url,
            clear_image,
            json,
        } => {
            let profile = current_profile(&svc, user, &config)?;
            let fields = FoodFields {
                name,
                calories,
                protein,
                carbs,
                sugar,
                date,
                time,
                image_url: if clear_image {
                    Some(None)
                } else {
                    image_url.map(Some)
                },
            };
            cmd_edit(&svc, &profile, &id, fields, json)
        }
        Commands::Delete { id, json } => {
            let profile = current_profile(&svc, user, &config)?;
            cmd_delete(&svc, &profile, &id, json)
        }
        Commands::Today { json } => {
            let profile = current_profile(&svc, user, &config)?;
            cmd_today(&svc, &profile, json)
        }
        Commands::Sync { json } => {
            let profile = current_profile(&svc, user, &config)?;
            cmd_sync(&svc, &profile, json)
        }
        Commands::Streak { json } => {
            let profile = current_profile(&svc, user, &config)?;
            cmd_streak(&svc, &profile, json)
        }
        Commands::Leaderboard { limit, json } => cmd_leaderboard(&svc, limit, json),
        Commands::History { range, json } => {
            let profile = current_profile(&svc, user, &config)?;
            cmd_history(&svc, &profile, &range, json)
        }
    }
}
