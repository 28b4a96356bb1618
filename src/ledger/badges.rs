//! Badge Ledger
//!
//! Ledger-side redemption state machine. Each (player, achievement) pair
//! moves Unredeemed -> Redeemed exactly once, and each accepted signature
//! is consumed forever.
//!
//! Every mutation takes `&mut self`, so one call fully commits or fully
//! fails before the next one starts.

use std::collections::BTreeSet;

use alloy_primitives::Signature;
use tracing::{debug, info, warn};

use crate::core::address::AccountAddress;
use crate::core::hash::{attestation_digest, signature_digest, Digest};
use crate::game::achievement::AchievementId;
use crate::ledger::events::LedgerEvent;
use crate::ledger::governance::SignerGovernance;
use crate::ledger::LedgerError;

/// In-process model of the badge contract.
#[derive(Clone, Debug)]
pub struct BadgeLedger {
    governance: SignerGovernance,
    redeemed: BTreeSet<(AccountAddress, AchievementId)>,
    consumed_signatures: BTreeSet<Digest>,
    events: Vec<LedgerEvent>,
}

impl BadgeLedger {
    /// Deploy with `owner` as both owner and initial signer.
    pub fn deploy(owner: AccountAddress) -> Self {
        Self::with_governance(SignerGovernance::new(owner))
    }

    /// Deploy with explicit governance state.
    pub fn with_governance(governance: SignerGovernance) -> Self {
        Self {
            governance,
            redeemed: BTreeSet::new(),
            consumed_signatures: BTreeSet::new(),
            events: Vec::new(),
        }
    }

    /// Redeem a credential as `caller`.
    ///
    /// The digest is rebuilt from the caller's own identity, so a credential
    /// only works for the player it was issued to. Checks run in order:
    /// pair already redeemed, signature already consumed, recovered signer.
    pub fn redeem(
        &mut self,
        caller: AccountAddress,
        achievement: AchievementId,
        signature: &[u8],
    ) -> Result<(), LedgerError> {
        if self.redeemed.contains(&(caller, achievement)) {
            debug!("{} already holds {}", caller.short(), achievement);
            return Err(LedgerError::AlreadyRedeemed {
                player: caller,
                achievement,
            });
        }

        let digest = attestation_digest(&caller, achievement.as_u64());

        let parsed = parse_signature(signature)?;
        let replay_key = signature_digest(&parsed.as_bytes());
        if self.consumed_signatures.contains(&replay_key) {
            warn!("replayed signature from {}", caller.short());
            return Err(LedgerError::SignatureReplay);
        }

        let recovered = parsed
            .recover_address_from_prehash(&digest)
            .map_err(|e| LedgerError::InvalidSignature(e.to_string()))?;
        let recovered = AccountAddress::from(recovered);
        if recovered != self.governance.signer() {
            return Err(LedgerError::InvalidSignature(format!(
                "recovered {} is not the authorized signer",
                recovered
            )));
        }

        self.redeemed.insert((caller, achievement));
        self.consumed_signatures.insert(replay_key);
        self.events.push(LedgerEvent::BadgeMinted {
            player: caller,
            achievement,
        });
        info!("badge {} minted for {}", achievement, caller);

        Ok(())
    }

    /// Replace the authorized signer (owner only).
    pub fn rotate_signer(
        &mut self,
        caller: AccountAddress,
        new_signer: AccountAddress,
    ) -> Result<(), LedgerError> {
        let event = self.governance.rotate_signer(caller, new_signer)?;
        self.events.push(event);
        Ok(())
    }

    /// Currently authorized signer.
    pub fn authorized_signer(&self) -> AccountAddress {
        self.governance.signer()
    }

    /// Ledger owner.
    pub fn owner(&self) -> AccountAddress {
        self.governance.owner()
    }

    /// Whether the pair has been redeemed.
    pub fn has_badge(&self, player: &AccountAddress, achievement: AchievementId) -> bool {
        self.redeemed.contains(&(*player, achievement))
    }

    /// Whether these signature bytes were already accepted.
    ///
    /// Malformed signatures are never consumed.
    pub fn is_signature_consumed(&self, signature: &[u8]) -> bool {
        parse_signature(signature)
            .map(|sig| {
                self.consumed_signatures
                    .contains(&signature_digest(&sig.as_bytes()))
            })
            .unwrap_or(false)
    }

    /// Number of redeemed badges.
    pub fn redeemed_count(&self) -> usize {
        self.redeemed.len()
    }

    /// Full event log.
    pub fn events(&self) -> &[LedgerEvent] {
        &self.events
    }

    /// Events from `cursor` onward, for incremental sync.
    pub fn events_since(&self, cursor: usize) -> &[LedgerEvent] {
        self.events.get(cursor..).unwrap_or(&[])
    }
}

/// Parse 65 raw bytes into a signature.
///
/// Re-encoding through `as_bytes` canonicalizes `v` (0/1 vs 27/28), so the
/// replay key does not depend on which form the caller submitted.
fn parse_signature(signature: &[u8]) -> Result<Signature, LedgerError> {
    if signature.len() != 65 {
        return Err(LedgerError::InvalidSignature(format!(
            "invalid signature length {}",
            signature.len()
        )));
    }
    Signature::from_raw(signature).map_err(|e| LedgerError::InvalidSignature(e.to_string()))
}

// =============================================================================
// TESTS
// =============================================================================
