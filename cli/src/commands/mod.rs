mod food;
mod helpers;
mod history;
mod profile;
mod streak;

pub(crate) use food::{FoodFields, cmd_delete, cmd_edit, cmd_entries, cmd_log};
pub(crate) use history::cmd_history;
pub(crate) use profile::{
    cmd_goals_set, cmd_goals_show, cmd_profile_create, cmd_profile_edit, cmd_profile_show,
    cmd_profile_use,
};
pub(crate) use streak::{cmd_leaderboard, cmd_streak, cmd_sync, cmd_today};
