//! Attestation Signer
//!
//! Turns an earned achievement into a portable credential.
//! Holds the issuing private key; the matching address is what the ledger
//! is configured to trust.

use std::str::FromStr;

use alloy_primitives::B256;
use alloy_signer::SignerSync;
use alloy_signer_local::PrivateKeySigner;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::attest::credential::{Credential, SignatureBytes, SIGNATURE_LEN};
use crate::attest::store::AttestationStore;
use crate::core::address::AccountAddress;
use crate::core::hash::attestation_digest;
use crate::game::achievement::AchievementId;

/// Issuance errors.
#[derive(Debug, Error)]
pub enum IssuanceError {
    /// The player has not earned this achievement.
    #[error("achievement not earned: {achievement} for {player}")]
    NotEarned {
        /// Requesting player.
        player: AccountAddress,
        /// Requested achievement.
        achievement: AchievementId,
    },
    /// Private key could not be parsed.
    #[error("invalid signing key: {0}")]
    InvalidKey(String),
    /// The signing backend failed.
    #[error("signing failed: {0}")]
    Signing(String),
}

impl IssuanceError {
    /// Caller is not permitted (maps to a 403-style rejection).
    pub fn is_authorization(&self) -> bool {
        matches!(self, IssuanceError::NotEarned { .. })
    }
}

/// Credential issuer.
pub struct AttestationSigner {
    key: PrivateKeySigner,
}

impl AttestationSigner {
    /// Wrap an existing key.
    pub fn new(key: PrivateKeySigner) -> Self {
        Self { key }
    }

    /// Parse a hex private key (with or without `0x`).
    pub fn from_private_key_hex(hex_key: &str) -> Result<Self, IssuanceError> {
        let key = PrivateKeySigner::from_str(hex_key.trim())
            .map_err(|e| IssuanceError::InvalidKey(e.to_string()))?;
        Ok(Self::new(key))
    }

    /// Build from a raw 32-byte secret.
    pub fn from_secret_bytes(secret: [u8; 32]) -> Result<Self, IssuanceError> {
        let key = PrivateKeySigner::from_bytes(&B256::from(secret))
            .map_err(|e| IssuanceError::InvalidKey(e.to_string()))?;
        Ok(Self::new(key))
    }

    /// Fresh random key.
    pub fn random() -> Self {
        Self::new(PrivateKeySigner::random())
    }

    /// Identity the ledger must trust for these credentials.
    pub fn address(&self) -> AccountAddress {
        AccountAddress::from(self.key.address())
    }

    /// Issue a credential for an earned achievement.
    ///
    /// Fails with `NotEarned` and produces nothing when the store has no
    /// record. Repeated calls are fine; the ledger enforces single use.
    #[instrument(skip_all, fields(player = %player, achievement = achievement.as_u64()))]
    pub async fn sign(
        &self,
        store: &AttestationStore,
        player: AccountAddress,
        achievement: AchievementId,
    ) -> Result<Credential, IssuanceError> {
        if !store.is_earned(&player, achievement).await {
            return Err(IssuanceError::NotEarned {
                player,
                achievement,
            });
        }

        let signature = self.sign_attestation(&player, achievement)?;
        debug!("issued credential");

        Ok(Credential {
            player,
            achievement,
            signature,
        })
    }

    /// Sign the attestation digest without the eligibility check.
    ///
    /// Kept crate-private: only `sign` may hand out credentials.
    pub(crate) fn sign_attestation(
        &self,
        player: &AccountAddress,
        achievement: AchievementId,
    ) -> Result<SignatureBytes, IssuanceError> {
        let digest = attestation_digest(player, achievement.as_u64());
        let signature = self
            .key
            .sign_hash_sync(&digest)
            .map_err(|e| IssuanceError::Signing(e.to_string()))?;

        let bytes: [u8; SIGNATURE_LEN] = signature.as_bytes();
        Ok(SignatureBytes(bytes))
    }
}

impl std::fmt::Debug for AttestationSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttestationSigner")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}
