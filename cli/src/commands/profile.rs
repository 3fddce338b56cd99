use anyhow::{Result, bail};

use cutsistent_core::models::{
    NewProfile, NutritionGoals, Profile, UpdateProfile, parse_goal_preset,
};
use cutsistent_core::service::CutsistentService;

use crate::config::Config;

pub(crate) fn cmd_profile_create(
    svc: &CutsistentService,
    config: &mut Config,
    username: &str,
    display_name: Option<String>,
    json: bool,
) -> Result<()> {
    let profile = svc.create_profile(&NewProfile {
        username: username.to_string(),
        display_name,
    })?;
    if let Some(ref name) = profile.username {
        config.set_default_user(name)?;
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&profile)?);
    } else {
        println!("Created profile '{}'", profile.public_name());
        println!("  User ID: {}", profile.user_id);
    }
    Ok(())
}

pub(crate) fn cmd_profile_show(profile: &Profile, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(profile)?);
        return Ok(());
    }

    println!("=== {} ===\n", profile.public_name());
    if let Some(ref username) = profile.username {
        println!("  Username:       {username}");
    }
    if let Some(ref bio) = profile.bio {
        println!("  Bio:            {bio}");
    }
    println!("  Current streak: {} days", profile.current_streak);
    println!("  Longest streak: {} days", profile.longest_streak);
    println!("  Points:         {}", profile.total_points);
    println!("  Sugar limit:    {:.0}g/day", profile.goals.sugar_limit);
    Ok(())
}

pub(crate) fn cmd_profile_edit(
    svc: &CutsistentService,
    profile: &Profile,
    display_name: Option<Option<String>>,
    bio: Option<Option<String>>,
    json: bool,
) -> Result<()> {
    if display_name.is_none() && bio.is_none() {
        bail!(
            "Nothing to update. Provide at least one of --display-name, --clear-display-name, --bio, --clear-bio"
        );
    }
    let updated = svc.update_profile(&profile.user_id, &UpdateProfile { display_name, bio })?;

    if json {
        println!("{}", serde_json::to_string_pretty(&updated)?);
    } else {
        println!("Updated profile '{}'", updated.public_name());
    }
    Ok(())
}

pub(crate) fn cmd_profile_use(
    svc: &CutsistentService,
    config: &mut Config,
    username: &str,
    json: bool,
) -> Result<()> {
    let profile = svc.find_profile(username)?;
    let name = profile.username.as_deref().unwrap_or(username);
    config.set_default_user(name)?;

    if json {
        println!("{}", serde_json::json!({ "user": name, "user_id": profile.user_id }));
    } else {
        println!("Now acting as '{name}'");
    }
    Ok(())
}

fn print_goals(goals: &NutritionGoals) {
    println!("  Calories:    {} kcal", goals.calorie_goal);
    println!("  Protein:     {}g", goals.protein_goal);
    println!("  Carbs:       {}g", goals.carbs_goal);
    println!("  Sugar limit: {:.0}g", goals.sugar_limit);
}

pub(crate) fn cmd_goals_show(profile: &Profile, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&profile.goals)?);
    } else {
        println!("Daily goals for {}:", profile.public_name());
        print_goals(&profile.goals);
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn cmd_goals_set(
    svc: &CutsistentService,
    profile: &Profile,
    preset: Option<&str>,
    calories: Option<i64>,
    protein: Option<i64>,
    carbs: Option<i64>,
    sugar_limit: Option<f64>,
    json: bool,
) -> Result<()> {
    if preset.is_none()
        && calories.is_none()
        && protein.is_none()
        && carbs.is_none()
        && sugar_limit.is_none()
    {
        bail!(
            "Nothing to set. Provide --preset or at least one of --calories, --protein, --carbs, --sugar-limit"
        );
    }

    // Explicit values override the preset, which overrides the current goals.
    let mut goals = match preset {
        Some(p) => parse_goal_preset(p)?.goals(),
        None => profile.goals,
    };
    if let Some(v) = calories {
        goals.calorie_goal = v;
    }
    if let Some(v) = protein {
        goals.protein_goal = v;
    }
    if let Some(v) = carbs {
        goals.carbs_goal = v;
    }
    if let Some(v) = sugar_limit {
        goals.sugar_limit = v;
    }

    let updated = svc.set_goals(&profile.user_id, &goals)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&updated.goals)?);
    } else {
        println!("Goals updated:");
        print_goals(&updated.goals);
        if (updated.goals.sugar_limit - profile.goals.sugar_limit).abs() > f64::EPSILON {
            println!(
                "\nStored daily logs keep their sugar-free flag; the streak uses the new limit."
            );
        }
    }
    Ok(())
}
