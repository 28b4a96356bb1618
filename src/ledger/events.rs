//! Ledger Events
//!
//! Emitted on every successful state change, in execution order.

use serde::{Deserialize, Serialize};

use crate::core::address::AccountAddress;
use crate::game::achievement::AchievementId;

/// Ledger event log entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LedgerEvent {
    /// A credential was accepted and the badge recorded.
    BadgeMinted {
        player: AccountAddress,
        achievement: AchievementId,
    },

    /// The authorized signer was replaced.
    SignerUpdated {
        new_signer: AccountAddress,
    },
}
