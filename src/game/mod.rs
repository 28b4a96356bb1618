//! Game Results and Eligibility
//!
//! Ingestion of finished games and the achievement rule engine.

pub mod achievement;
pub mod stats;

pub use achievement::{evaluate_achievements, AchievementId, UnknownAchievement};
pub use stats::{GameRecord, GameResult, LeaderboardEntry, PlayerRegistry, PlayerStats};
