//! Player Statistics
//!
//! Cumulative per-player totals and the game history.
//! `record_game` is the only mutation path: it applies a result and returns
//! the post-increment snapshot under the same write guard, so eligibility is
//! always evaluated against the counter this game produced.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::core::address::AccountAddress;

/// A just-finished game as reported by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameResult {
    /// Player who played the game.
    pub player: AccountAddress,
    /// Final score.
    pub score: u32,
    /// Lines cleared in this game.
    pub lines_cleared: u32,
    /// Game duration in seconds.
    #[serde(default)]
    pub duration_secs: Option<u32>,
    /// Whether the game counted toward a tournament.
    #[serde(default)]
    pub is_tournament: bool,
    /// Tournament the game belongs to.
    #[serde(default)]
    pub tournament_id: Option<u64>,
}

impl GameResult {
    /// Create a casual game result.
    pub fn new(player: AccountAddress, score: u32, lines_cleared: u32) -> Self {
        Self {
            player,
            score,
            lines_cleared,
            duration_secs: None,
            is_tournament: false,
            tournament_id: None,
        }
    }
}

/// Cumulative player totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerStats {
    /// Player address.
    pub address: AccountAddress,
    /// Games played, including the latest.
    pub total_games: u32,
    /// Best single-game score.
    pub best_score: u32,
    /// Lines cleared across all games.
    pub total_lines_cleared: u64,
    /// First time the player was seen.
    pub created_at: DateTime<Utc>,
}

impl PlayerStats {
    /// Fresh player with zero games.
    pub fn new(address: AccountAddress, created_at: DateTime<Utc>) -> Self {
        Self {
            address,
            total_games: 0,
            best_score: 0,
            total_lines_cleared: 0,
            created_at,
        }
    }

    /// Fold one game into the totals.
    pub fn apply(&mut self, game: &GameResult) {
        self.total_games = self.total_games.saturating_add(1);
        self.best_score = self.best_score.max(game.score);
        self.total_lines_cleared = self
            .total_lines_cleared
            .saturating_add(u64::from(game.lines_cleared));
    }
}

/// Stored game history entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRecord {
    /// Unique game id.
    pub id: Uuid,
    /// The reported result.
    #[serde(flatten)]
    pub result: GameResult,
    /// When the game was recorded.
    pub played_at: DateTime<Utc>,
}

/// Leaderboard row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    /// Player address.
    pub player_address: AccountAddress,
    /// Best single-game score.
    pub best_score: u32,
    /// Games played.
    pub games_played: u32,
}

#[derive(Default)]
struct RegistryInner {
    players: BTreeMap<AccountAddress, PlayerStats>,
    games: Vec<GameRecord>,
}

/// Player stats and game history.
pub struct PlayerRegistry {
    inner: RwLock<RegistryInner>,
}

impl PlayerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(RegistryInner::default()),
        }
    }

    /// Restore from persisted players and games.
    pub fn from_parts(players: Vec<PlayerStats>, games: Vec<GameRecord>) -> Self {
        let players = players.into_iter().map(|p| (p.address, p)).collect();
        Self {
            inner: RwLock::new(RegistryInner { players, games }),
        }
    }

    /// Apply a game result and return the post-increment stats and the
    /// stored record.
    pub async fn record_game(&self, game: GameResult) -> (PlayerStats, GameRecord) {
        let now = Utc::now();
        let mut inner = self.inner.write().await;

        let stats = inner
            .players
            .entry(game.player)
            .or_insert_with(|| PlayerStats::new(game.player, now));
        stats.apply(&game);
        let snapshot = stats.clone();

        let record = GameRecord {
            id: Uuid::new_v4(),
            result: game,
            played_at: now,
        };
        inner.games.push(record.clone());

        (snapshot, record)
    }

    /// Get a player's stats.
    pub async fn get(&self, address: &AccountAddress) -> Option<PlayerStats> {
        self.inner.read().await.players.get(address).cloned()
    }

    /// Games recorded for a player, oldest first.
    pub async fn games_for(&self, address: &AccountAddress) -> Vec<GameRecord> {
        self.inner
            .read()
            .await
            .games
            .iter()
            .filter(|g| g.result.player == *address)
            .cloned()
            .collect()
    }

    /// Top players by best score.
    ///
    /// Ties break on games played (more first), then address.
    pub async fn leaderboard(&self, limit: usize) -> Vec<LeaderboardEntry> {
        let inner = self.inner.read().await;
        let mut rows: Vec<LeaderboardEntry> = inner
            .players
            .values()
            .map(|p| LeaderboardEntry {
                player_address: p.address,
                best_score: p.best_score,
                games_played: p.total_games,
            })
            .collect();

        sort_rows(&mut rows);
        rows.truncate(limit);
        rows
    }

    /// Top players within one tournament, ranked like [`leaderboard`].
    ///
    /// Only games tagged with `tournament_id` count, both for the best
    /// score and for games played.
    ///
    /// [`leaderboard`]: PlayerRegistry::leaderboard
    pub async fn tournament_leaderboard(
        &self,
        tournament_id: u64,
        limit: usize,
    ) -> Vec<LeaderboardEntry> {
        let inner = self.inner.read().await;
        let mut per_player: BTreeMap<AccountAddress, LeaderboardEntry> = BTreeMap::new();

        for game in inner
            .games
            .iter()
            .filter(|g| g.result.tournament_id == Some(tournament_id))
        {
            let entry = per_player
                .entry(game.result.player)
                .or_insert(LeaderboardEntry {
                    player_address: game.result.player,
                    best_score: 0,
                    games_played: 0,
                });
            entry.best_score = entry.best_score.max(game.result.score);
            entry.games_played += 1;
        }

        let mut rows: Vec<LeaderboardEntry> = per_player.into_values().collect();
        sort_rows(&mut rows);
        rows.truncate(limit);
        rows
    }

    /// Number of known players.
    pub async fn player_count(&self) -> usize {
        self.inner.read().await.players.len()
    }

    /// Copy out all players and games for persistence.
    pub async fn snapshot(&self) -> (Vec<PlayerStats>, Vec<GameRecord>) {
        let inner = self.inner.read().await;
        (
            inner.players.values().cloned().collect(),
            inner.games.clone(),
        )
    }
}

/// Best score first, then more games played, then address.
fn sort_rows(rows: &mut [LeaderboardEntry]) {
    rows.sort_by(|a, b| {
        b.best_score
            .cmp(&a.best_score)
            .then(b.games_played.cmp(&a.games_played))
            .then(a.player_address.cmp(&b.player_address))
    });
}

impl Default for PlayerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::sync::Arc;

    fn player(byte: u8) -> AccountAddress {
        AccountAddress::new([byte; 20])
    }

    #[tokio::test]
    async fn test_first_game_creates_player() {
        let registry = PlayerRegistry::new();
        let (stats, record) = registry.record_game(GameResult::new(player(1), 150, 3)).await;

        assert_eq!(stats.total_games, 1);
        assert_eq!(stats.best_score, 150);
        assert_eq!(stats.total_lines_cleared, 3);
        assert_eq!(record.result.score, 150);
        assert_eq!(registry.player_count().await, 1);
    }

    #[tokio::test]
    async fn test_totals_accumulate() {
        let registry = PlayerRegistry::new();
        registry.record_game(GameResult::new(player(1), 150, 3)).await;
        let (stats, _) = registry.record_game(GameResult::new(player(1), 40, 12)).await;

        assert_eq!(stats.total_games, 2);
        assert_eq!(stats.best_score, 150);
        assert_eq!(stats.total_lines_cleared, 15);
        assert_eq!(registry.get(&player(1)).await, Some(stats));
        assert_eq!(registry.games_for(&player(1)).await.len(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_games_see_distinct_counters() {
        let registry = Arc::new(PlayerRegistry::new());
        let mut handles = Vec::new();

        for i in 0..32u32 {
            let registry = registry.clone();
            handles.push(tokio::spawn(async move {
                let (stats, _) = registry.record_game(GameResult::new(player(7), i, 0)).await;
                stats.total_games
            }));
        }

        let mut seen = BTreeSet::new();
        for handle in handles {
            seen.insert(handle.await.unwrap());
        }

        assert_eq!(seen, (1..=32).collect::<BTreeSet<u32>>());
    }

    #[tokio::test]
    async fn test_leaderboard_order_and_limit() {
        let registry = PlayerRegistry::new();
        registry.record_game(GameResult::new(player(1), 100, 0)).await;
        registry.record_game(GameResult::new(player(2), 300, 0)).await;
        registry.record_game(GameResult::new(player(3), 100, 0)).await;
        registry.record_game(GameResult::new(player(3), 20, 0)).await;

        let board = registry.leaderboard(2).await;
        assert_eq!(board.len(), 2);
        assert_eq!(board[0].player_address, player(2));
        // Same best score, player 3 has more games.
        assert_eq!(board[1].player_address, player(3));
        assert_eq!(board[1].games_played, 2);
    }

    #[tokio::test]
    async fn test_tournament_leaderboard_counts_tagged_games_only() {
        let registry = PlayerRegistry::new();
        let tagged = |who: u8, score: u32, id: u64| {
            let mut game = GameResult::new(player(who), score, 0);
            game.is_tournament = true;
            game.tournament_id = Some(id);
            game
        };

        registry.record_game(tagged(1, 80, 3)).await;
        registry.record_game(tagged(1, 20, 3)).await;
        registry.record_game(tagged(2, 80, 3)).await;
        registry.record_game(tagged(3, 999, 4)).await;
        registry.record_game(GameResult::new(player(2), 900, 0)).await;

        let rows = registry.tournament_leaderboard(3, 10).await;
        assert_eq!(rows.len(), 2);
        // Tie on 80 broken by games played within the tournament.
        assert_eq!(rows[0].player_address, player(1));
        assert_eq!(rows[0].games_played, 2);
        assert_eq!(rows[1].player_address, player(2));
        assert_eq!(rows[1].best_score, 80);
        assert_eq!(rows[1].games_played, 1);

        assert_eq!(registry.tournament_leaderboard(3, 1).await.len(), 1);
    }

    #[tokio::test]
    async fn test_snapshot_restore() {
        let registry = PlayerRegistry::new();
        registry.record_game(GameResult::new(player(1), 10, 1)).await;
        let (players, games) = registry.snapshot().await;

        let restored = PlayerRegistry::from_parts(players, games);
        assert_eq!(restored.get(&player(1)).await.unwrap().total_games, 1);
        assert_eq!(restored.games_for(&player(1)).await.len(), 1);
    }
}
