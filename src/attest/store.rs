//! Attestation Store
//!
//! Durable record of which (player, achievement) pairs have been earned.
//! This is the only thing consulted before signing. The `redeemed` flag is
//! a reconciled copy of ledger state and never gates issuance.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

use crate::core::address::AccountAddress;
use crate::game::achievement::AchievementId;
use crate::ledger::events::LedgerEvent;

/// One earned achievement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AchievementRecord {
    /// Player who earned it.
    pub player: AccountAddress,
    /// Which achievement.
    pub achievement: AchievementId,
    /// When it was first earned.
    pub earned_at: DateTime<Utc>,
    /// Redeemed on the ledger (monotonic).
    pub redeemed: bool,
}

type RecordKey = (AccountAddress, AchievementId);

/// Earned-achievement store.
pub struct AttestationStore {
    records: RwLock<BTreeMap<RecordKey, AchievementRecord>>,
}

impl AttestationStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            records: RwLock::new(BTreeMap::new()),
        }
    }

    /// Restore from persisted records. Later duplicates are ignored.
    pub fn from_records(records: Vec<AchievementRecord>) -> Self {
        let mut map = BTreeMap::new();
        for record in records {
            map.entry((record.player, record.achievement)).or_insert(record);
        }
        Self {
            records: RwLock::new(map),
        }
    }

    /// Mark an achievement as earned.
    ///
    /// Insert-if-absent: returns `true` only when a new record was created.
    /// Re-earning keeps the original timestamp and redeemed flag.
    pub async fn record_earned(&self, player: AccountAddress, achievement: AchievementId) -> bool {
        let mut records = self.records.write().await;
        Self::insert_if_absent(&mut records, player, achievement, Utc::now())
    }

    /// Mark several achievements at once, returning the newly earned ones.
    pub async fn record_all(
        &self,
        player: AccountAddress,
        achievements: &[AchievementId],
    ) -> Vec<AchievementId> {
        let now = Utc::now();
        let mut records = self.records.write().await;
        achievements
            .iter()
            .copied()
            .filter(|id| Self::insert_if_absent(&mut records, player, *id, now))
            .collect()
    }

    fn insert_if_absent(
        records: &mut BTreeMap<RecordKey, AchievementRecord>,
        player: AccountAddress,
        achievement: AchievementId,
        now: DateTime<Utc>,
    ) -> bool {
        if records.contains_key(&(player, achievement)) {
            return false;
        }
        records.insert(
            (player, achievement),
            AchievementRecord {
                player,
                achievement,
                earned_at: now,
                redeemed: false,
            },
        );
        debug!("{} earned {}", player.short(), achievement);
        true
    }

    /// Whether the achievement was earned, regardless of redemption.
    pub async fn is_earned(&self, player: &AccountAddress, achievement: AchievementId) -> bool {
        self.records
            .read()
            .await
            .contains_key(&(*player, achievement))
    }

    /// Get a single record.
    pub async fn get(
        &self,
        player: &AccountAddress,
        achievement: AchievementId,
    ) -> Option<AchievementRecord> {
        self.records.read().await.get(&(*player, achievement)).cloned()
    }

    /// All records for a player in catalog order.
    pub async fn achievements_for(&self, player: &AccountAddress) -> Vec<AchievementRecord> {
        let records = self.records.read().await;
        AchievementId::ALL
            .iter()
            .filter_map(|id| records.get(&(*player, *id)).cloned())
            .collect()
    }

    /// Reconcile the local redeemed flags from ledger events.
    ///
    /// Returns how many records flipped to redeemed. Events for pairs that
    /// were never earned locally are ignored.
    pub async fn apply_ledger_events(&self, events: &[LedgerEvent]) -> usize {
        let mut records = self.records.write().await;
        let mut flipped = 0;

        for event in events {
            if let LedgerEvent::BadgeMinted { player, achievement } = event {
                if let Some(record) = records.get_mut(&(*player, *achievement)) {
                    if !record.redeemed {
                        record.redeemed = true;
                        flipped += 1;
                    }
                }
            }
        }

        flipped
    }

    /// Total number of records.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Whether the store is empty.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Copy out all records for persistence.
    pub async fn snapshot(&self) -> Vec<AchievementRecord> {
        self.records.read().await.values().cloned().collect()
    }
}

impl Default for AttestationStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::Arc;

    fn player(byte: u8) -> AccountAddress {
        AccountAddress::new([byte; 20])
    }

    #[tokio::test]
    async fn test_record_earned_is_idempotent() {
        let store = AttestationStore::new();

        assert!(store.record_earned(player(1), AchievementId::Century).await);
        let first = store.get(&player(1), AchievementId::Century).await.unwrap();

        assert!(!store.record_earned(player(1), AchievementId::Century).await);
        let second = store.get(&player(1), AchievementId::Century).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_is_earned() {
        let store = AttestationStore::new();
        assert!(!store.is_earned(&player(1), AchievementId::FirstGame).await);

        store.record_earned(player(1), AchievementId::FirstGame).await;
        assert!(store.is_earned(&player(1), AchievementId::FirstGame).await);
        assert!(!store.is_earned(&player(2), AchievementId::FirstGame).await);
        assert!(!store.is_earned(&player(1), AchievementId::Champion).await);
    }

    #[tokio::test]
    async fn test_record_all_reports_new_only() {
        let store = AttestationStore::new();
        store.record_earned(player(1), AchievementId::FirstGame).await;

        let new = store
            .record_all(player(1), &[AchievementId::FirstGame, AchievementId::Century])
            .await;
        assert_eq!(new, vec![AchievementId::Century]);
    }

    #[tokio::test]
    async fn test_concurrent_inserts_converge() {
        let store = Arc::new(AttestationStore::new());
        let mut handles = Vec::new();

        for _ in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.record_earned(player(3), AchievementId::HotStreak).await
            }));
        }

        let mut inserted = 0;
        for handle in handles {
            if handle.await.unwrap() {
                inserted += 1;
            }
        }

        assert_eq!(inserted, 1);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_ledger_events_flip_redeemed() {
        let store = AttestationStore::new();
        store.record_earned(player(1), AchievementId::Century).await;

        let events = vec![
            LedgerEvent::BadgeMinted { player: player(1), achievement: AchievementId::Century },
            LedgerEvent::BadgeMinted { player: player(1), achievement: AchievementId::Century },
            LedgerEvent::BadgeMinted { player: player(9), achievement: AchievementId::Century },
            LedgerEvent::SignerUpdated { new_signer: player(5) },
        ];

        assert_eq!(store.apply_ledger_events(&events).await, 1);
        let record = store.get(&player(1), AchievementId::Century).await.unwrap();
        assert!(record.redeemed);
        assert!(store.is_earned(&player(1), AchievementId::Century).await);
        assert!(!store.is_earned(&player(9), AchievementId::Century).await);
    }

    #[tokio::test]
    async fn test_achievements_for_in_catalog_order() {
        let store = AttestationStore::new();
        store.record_earned(player(1), AchievementId::Champion).await;
        store.record_earned(player(1), AchievementId::FirstGame).await;

        let ids: Vec<_> = store
            .achievements_for(&player(1))
            .await
            .into_iter()
            .map(|r| r.achievement)
            .collect();
        assert_eq!(ids, vec![AchievementId::FirstGame, AchievementId::Champion]);
    }

    proptest! {
        #[test]
        fn prop_recording_twice_equals_once(
            byte in any::<u8>(),
            ids in proptest::collection::vec(1u64..=4, 0..8),
        ) {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            let ids: Vec<AchievementId> = ids
                .into_iter()
                .filter_map(AchievementId::from_u64)
                .collect();

            let (once, twice) = rt.block_on(async {
                let once = AttestationStore::new();
                let twice = AttestationStore::new();
                for id in &ids {
                    once.record_earned(player(byte), *id).await;
                    twice.record_earned(player(byte), *id).await;
                    twice.record_earned(player(byte), *id).await;
                }
                let strip = |records: Vec<AchievementRecord>| -> Vec<(AccountAddress, AchievementId, bool)> {
                    records.into_iter().map(|r| (r.player, r.achievement, r.redeemed)).collect()
                };
                (strip(once.snapshot().await), strip(twice.snapshot().await))
            });

            prop_assert_eq!(once, twice);
        }
    }
}
