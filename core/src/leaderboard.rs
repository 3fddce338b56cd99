use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::Profile;

pub const DEFAULT_LEADERBOARD_LIMIT: i64 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Badge {
    Elite,
    Warrior,
    Champion,
    Dedicated,
    Starter,
}

impl Badge {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Elite => "elite",
            Self::Warrior => "warrior",
            Self::Champion => "champion",
            Self::Dedicated => "dedicated",
            Self::Starter => "starter",
        }
    }
}

impl fmt::Display for Badge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Badges earned by a streak at a leaderboard rank (1-based).
#[must_use]
pub fn badges_for(streak: i64, rank: usize) -> Vec<Badge> {
    let mut badges = Vec::new();
    if streak >= 30 {
        badges.push(Badge::Elite);
    }
    if streak >= 21 {
        badges.push(Badge::Warrior);
    }
    if rank <= 3 {
        badges.push(Badge::Champion);
    }
    if streak >= 14 {
        badges.push(Badge::Dedicated);
    }
    if streak >= 7 {
        badges.push(Badge::Starter);
    }
    badges
}

#[derive(Debug, Clone, Serialize)]
pub struct LeaderboardEntry {
    pub user_id: String,
    pub name: String,
    pub points: i64,
    pub streak: i64,
    pub rank: usize,
    pub badges: Vec<Badge>,
}

/// Rank profiles that are already ordered by points, best first.
#[must_use]
pub fn rank_profiles(profiles: &[Profile]) -> Vec<LeaderboardEntry> {
    profiles
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let rank = i + 1;
            LeaderboardEntry {
                user_id: p.user_id.clone(),
                name: p.public_name().to_string(),
                points: p.total_points,
                streak: p.current_streak,
                rank,
                badges: badges_for(p.current_streak, rank),
            }
        })
        .collect()
}
