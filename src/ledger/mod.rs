//! Badge Ledger
//!
//! Ledger-side verification and one-time consumption of credentials,
//! plus owner-gated signer rotation.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    LEDGER                                   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  badges.rs      - Redemption state machine + replay set     │
//! │  governance.rs  - Owner / authorized signer singleton       │
//! │  events.rs      - BadgeMinted / SignerUpdated log           │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod badges;
pub mod events;
pub mod governance;

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Mutex;

use crate::core::address::AccountAddress;
use crate::game::achievement::AchievementId;

pub use badges::BadgeLedger;
pub use events::LedgerEvent;
pub use governance::SignerGovernance;

/// Ledger call rejections.
///
/// Every variant is terminal for the call: resubmitting the same input
/// fails the same way.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// Caller is not the ledger owner.
    #[error("not owner: {caller}")]
    NotOwner {
        /// Rejected caller.
        caller: AccountAddress,
    },

    /// Pair was already redeemed.
    #[error("already minted: {achievement} for {player}")]
    AlreadyRedeemed {
        /// Player holding the badge.
        player: AccountAddress,
        /// Achievement already redeemed.
        achievement: AchievementId,
    },

    /// Signature was already consumed by an earlier redemption.
    #[error("signature already used")]
    SignatureReplay,

    /// Malformed signature or signer mismatch.
    #[error("invalid signature: {0}")]
    InvalidSignature(String),
}

impl LedgerError {
    /// Ledger rejections never succeed on retry.
    pub fn is_retryable(&self) -> bool {
        false
    }

    /// Caller lacks permission (as opposed to a bad credential).
    pub fn is_authorization(&self) -> bool {
        matches!(self, LedgerError::NotOwner { .. })
    }
}

/// Shared handle serializing all ledger calls.
///
/// Redemptions from concurrent tasks queue on one mutex, matching the
/// ledger's single global execution order.
#[derive(Clone)]
pub struct LedgerHandle {
    inner: Arc<Mutex<BadgeLedger>>,
}

impl LedgerHandle {
    /// Wrap a ledger.
    pub fn new(ledger: BadgeLedger) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ledger)),
        }
    }

    /// See [`BadgeLedger::redeem`].
    pub async fn redeem(
        &self,
        caller: AccountAddress,
        achievement: AchievementId,
        signature: &[u8],
    ) -> Result<(), LedgerError> {
        self.inner.lock().await.redeem(caller, achievement, signature)
    }

    /// See [`BadgeLedger::rotate_signer`].
    pub async fn rotate_signer(
        &self,
        caller: AccountAddress,
        new_signer: AccountAddress,
    ) -> Result<(), LedgerError> {
        self.inner.lock().await.rotate_signer(caller, new_signer)
    }

    /// Currently authorized signer.
    pub async fn authorized_signer(&self) -> AccountAddress {
        self.inner.lock().await.authorized_signer()
    }

    /// Whether the pair has been redeemed.
    pub async fn has_badge(&self, player: &AccountAddress, achievement: AchievementId) -> bool {
        self.inner.lock().await.has_badge(player, achievement)
    }

    /// Copy of events from `cursor` onward.
    pub async fn events_since(&self, cursor: usize) -> Vec<LedgerEvent> {
        self.inner.lock().await.events_since(cursor).to_vec()
    }
}
