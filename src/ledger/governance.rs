//! Signer Governance
//!
//! Owner-gated control over the single authorized signer identity.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::core::address::AccountAddress;
use crate::ledger::events::LedgerEvent;
use crate::ledger::LedgerError;

/// Owner and current signer.
///
/// The owner is fixed at construction and has no setter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignerGovernance {
    owner: AccountAddress,
    signer: AccountAddress,
}

impl SignerGovernance {
    /// Owner starts out as the authorized signer too.
    pub fn new(owner: AccountAddress) -> Self {
        Self::with_signer(owner, owner)
    }

    /// Explicit initial signer.
    pub fn with_signer(owner: AccountAddress, signer: AccountAddress) -> Self {
        Self { owner, signer }
    }

    /// Privileged owner identity.
    pub fn owner(&self) -> AccountAddress {
        self.owner
    }

    /// Currently authorized signer.
    pub fn signer(&self) -> AccountAddress {
        self.signer
    }

    /// Replace the authorized signer.
    ///
    /// Only the owner may call this. Credentials signed by the previous
    /// signer stop verifying immediately.
    pub fn rotate_signer(
        &mut self,
        caller: AccountAddress,
        new_signer: AccountAddress,
    ) -> Result<LedgerEvent, LedgerError> {
        if caller != self.owner {
            warn!("rejected signer rotation from non-owner {}", caller);
            return Err(LedgerError::NotOwner { caller });
        }

        let previous = self.signer;
        self.signer = new_signer;
        info!("authorized signer rotated {} -> {}", previous, new_signer);

        Ok(LedgerEvent::SignerUpdated { new_signer })
    }
}
