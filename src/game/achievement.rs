//! Achievement Catalog and Eligibility Rules
//!
//! Fixed catalog of badges and the pure rule engine that decides which
//! ones a finished game qualifies for.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::game::stats::{GameResult, PlayerStats};

/// Minimum score for the Century badge.
pub const CENTURY_SCORE: u32 = 100;

/// Minimum lines cleared in one game for the Hot Streak badge.
pub const HOT_STREAK_LINES: u32 = 10;

/// Games played required for the Champion badge.
pub const CHAMPION_GAMES: u32 = 10;

/// Achievement identifier.
///
/// Wire and digest form is the integer discriminant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
#[repr(u8)]
pub enum AchievementId {
    /// Finished a first game.
    FirstGame = 1,
    /// Cleared 10+ lines in one game.
    HotStreak = 2,
    /// Scored 100+ in one game.
    Century = 3,
    /// Played 10 games.
    Champion = 4,
}

/// Unknown achievement id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("unknown achievement id: {0}")]
pub struct UnknownAchievement(pub u64);

impl AchievementId {
    /// Full catalog in ascending id order.
    pub const ALL: [AchievementId; 4] = [
        AchievementId::FirstGame,
        AchievementId::HotStreak,
        AchievementId::Century,
        AchievementId::Champion,
    ];

    /// Numeric id.
    #[inline]
    pub fn as_u64(self) -> u64 {
        self as u64
    }

    /// Display name.
    pub fn name(self) -> &'static str {
        match self {
            AchievementId::FirstGame => "First Block",
            AchievementId::HotStreak => "Hot Streak",
            AchievementId::Century => "Century",
            AchievementId::Champion => "Champion",
        }
    }

    /// Look up by numeric id.
    pub fn from_u64(id: u64) -> Option<AchievementId> {
        match id {
            1 => Some(AchievementId::FirstGame),
            2 => Some(AchievementId::HotStreak),
            3 => Some(AchievementId::Century),
            4 => Some(AchievementId::Champion),
            _ => None,
        }
    }
}

impl TryFrom<u64> for AchievementId {
    type Error = UnknownAchievement;

    fn try_from(id: u64) -> Result<Self, Self::Error> {
        Self::from_u64(id).ok_or(UnknownAchievement(id))
    }
}

impl From<AchievementId> for u64 {
    fn from(id: AchievementId) -> Self {
        id.as_u64()
    }
}

impl std::fmt::Display for AchievementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{} {}", self.as_u64(), self.name())
    }
}

/// Evaluate which achievements a finished game qualifies for.
///
/// `stats` must be the snapshot taken right after this game was applied,
/// so `total_games` already counts it. Rules are independent; every match
/// is returned in catalog order. Previously earned badges are returned
/// again, deduplication is the store's job.
pub fn evaluate_achievements(stats: &PlayerStats, game: &GameResult) -> Vec<AchievementId> {
    AchievementId::ALL
        .into_iter()
        .filter(|id| qualifies(*id, stats, game))
        .collect()
}

fn qualifies(id: AchievementId, stats: &PlayerStats, game: &GameResult) -> bool {
    match id {
        AchievementId::FirstGame => stats.total_games == 1,
        AchievementId::HotStreak => game.lines_cleared >= HOT_STREAK_LINES,
        AchievementId::Century => game.score >= CENTURY_SCORE,
        AchievementId::Champion => stats.total_games >= CHAMPION_GAMES,
    }
}

// =============================================================================
// TESTS
// =============================================================================
