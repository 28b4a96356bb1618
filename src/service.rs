//! Achievement Service
//!
//! Ties ingestion, eligibility, the earned store, issuance and persistence
//! together. The network layer talks only to this type.
//!
//! ```text
//! submit_game ──► PlayerRegistry::record_game ──► evaluate_achievements
//!                                                      │
//!                                                      ▼
//!                 SnapshotStore ◄── persist ◄── AttestationStore::record_all
//!
//! issue_credential ──► AttestationSigner::sign (checks AttestationStore)
//! ```

use thiserror::Error;
use tracing::{error, info, instrument};

use crate::attest::signer::{AttestationSigner, IssuanceError};
use crate::attest::store::{AchievementRecord, AttestationStore};
use crate::attest::Credential;
use crate::core::address::{AccountAddress, AddressError};
use crate::game::achievement::{evaluate_achievements, AchievementId, UnknownAchievement};
use crate::game::stats::{GameRecord, GameResult, LeaderboardEntry, PlayerRegistry, PlayerStats};
use crate::ledger::events::LedgerEvent;
use crate::storage::snapshot::{Snapshot, SnapshotStore, StorageError, SNAPSHOT_VERSION};

/// Service errors.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Malformed address.
    #[error(transparent)]
    Address(#[from] AddressError),

    /// Achievement id outside the catalog.
    #[error(transparent)]
    UnknownAchievement(#[from] UnknownAchievement),

    /// Credential issuance failed.
    #[error(transparent)]
    Issuance(#[from] IssuanceError),

    /// Persistence failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ServiceError {
    /// Request was well-formed but not permitted.
    pub fn is_authorization(&self) -> bool {
        matches!(self, ServiceError::Issuance(e) if e.is_authorization())
    }

    /// Request itself was malformed.
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            ServiceError::Address(_) | ServiceError::UnknownAchievement(_)
        )
    }
}

/// Result of a game submission.
#[derive(Debug, Clone)]
pub struct GameOutcome {
    /// Stored game record.
    pub game: GameRecord,
    /// Player totals after this game.
    pub stats: PlayerStats,
    /// Achievements earned for the first time by this game.
    pub newly_earned: Vec<AchievementId>,
}

/// Player lookup result.
#[derive(Debug, Clone)]
pub struct PlayerSummary {
    /// Totals, if the player has played at all.
    pub stats: Option<PlayerStats>,
    /// Earned achievements in catalog order.
    pub achievements: Vec<AchievementRecord>,
}

/// The achievement service.
pub struct AchievementService {
    registry: PlayerRegistry,
    store: AttestationStore,
    signer: AttestationSigner,
    snapshot: Option<SnapshotStore>,
    leaderboard_limit: usize,
}

impl AchievementService {
    /// In-memory service with no persistence.
    pub fn new(signer: AttestationSigner, leaderboard_limit: usize) -> Self {
        Self {
            registry: PlayerRegistry::new(),
            store: AttestationStore::new(),
            signer,
            snapshot: None,
            leaderboard_limit,
        }
    }

    /// Service restored from, and persisting to, a snapshot file.
    pub async fn open(
        signer: AttestationSigner,
        snapshot: SnapshotStore,
        leaderboard_limit: usize,
    ) -> Result<Self, ServiceError> {
        let state = snapshot.load().await?;
        info!(
            "restored {} players and {} achievements from {}",
            state.players.len(),
            state.achievements.len(),
            snapshot.path().display()
        );

        Ok(Self {
            registry: PlayerRegistry::from_parts(state.players, state.games),
            store: AttestationStore::from_records(state.achievements),
            signer,
            snapshot: Some(snapshot),
            leaderboard_limit,
        })
    }

    /// Address whose signatures the ledger must trust.
    pub fn signer_address(&self) -> AccountAddress {
        self.signer.address()
    }

    /// Earned-achievement store.
    pub fn store(&self) -> &AttestationStore {
        &self.store
    }

    /// Record a finished game and mark any newly earned achievements.
    ///
    /// Eligibility is judged against the stats produced by this very game.
    /// The call succeeds only once the snapshot holding the new records is
    /// on disk; a write failure is returned as `ServiceError::Storage`.
    #[instrument(skip_all, fields(player = %game.player, score = game.score))]
    pub async fn submit_game(&self, game: GameResult) -> Result<GameOutcome, ServiceError> {
        let (stats, record) = self.registry.record_game(game).await;
        let qualifying = evaluate_achievements(&stats, &record.result);
        let newly_earned = self.store.record_all(stats.address, &qualifying).await;

        if !newly_earned.is_empty() {
            info!("{} unlocked {:?}", stats.address.short(), newly_earned);
        }

        if let Err(e) = self.persist().await {
            error!("failed to persist snapshot: {}", e);
            return Err(e.into());
        }

        Ok(GameOutcome {
            game: record,
            stats,
            newly_earned,
        })
    }

    /// Look up a player and their achievements.
    pub async fn player(&self, address: &AccountAddress) -> PlayerSummary {
        PlayerSummary {
            stats: self.registry.get(address).await,
            achievements: self.store.achievements_for(address).await,
        }
    }

    /// Issue a credential for an earned achievement.
    pub async fn issue_credential(
        &self,
        player: AccountAddress,
        achievement_id: u64,
    ) -> Result<Credential, ServiceError> {
        let achievement = AchievementId::try_from(achievement_id)?;
        let credential = self.signer.sign(&self.store, player, achievement).await?;
        Ok(credential)
    }

    /// Top players, capped at the configured limit.
    pub async fn leaderboard(&self, limit: Option<usize>) -> Vec<LeaderboardEntry> {
        let limit = limit
            .unwrap_or(self.leaderboard_limit)
            .min(self.leaderboard_limit);
        self.registry.leaderboard(limit).await
    }

    /// Top players of one tournament, capped at the configured limit.
    pub async fn tournament_leaderboard(
        &self,
        tournament_id: u64,
        limit: Option<usize>,
    ) -> Vec<LeaderboardEntry> {
        let limit = limit
            .unwrap_or(self.leaderboard_limit)
            .min(self.leaderboard_limit);
        self.registry.tournament_leaderboard(tournament_id, limit).await
    }

    /// Fold ledger events into the store's redeemed flags.
    pub async fn reconcile(&self, events: &[LedgerEvent]) -> Result<usize, ServiceError> {
        let flipped = self.store.apply_ledger_events(events).await;
        if flipped > 0 {
            self.persist().await?;
        }
        Ok(flipped)
    }

    /// Number of players seen.
    pub async fn player_count(&self) -> usize {
        self.registry.player_count().await
    }

    async fn persist(&self) -> Result<(), StorageError> {
        let Some(snapshot) = &self.snapshot else {
            return Ok(());
        };

        snapshot
            .save_with(|| async {
                let (players, games) = self.registry.snapshot().await;
                Snapshot {
                    version: SNAPSHOT_VERSION,
                    players,
                    games,
                    achievements: self.store.snapshot().await,
                }
            })
            .await
    }
}
