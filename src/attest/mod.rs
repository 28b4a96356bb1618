//! Attestation Issuance
//!
//! Off-ledger half of the badge protocol:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    ATTESTATION                              │
//! ├─────────────────────────────────────────────────────────────┤
//! │  store.rs       - Earned (player, achievement) records      │
//! │  signer.rs      - Eligibility check + secp256k1 signing     │
//! │  credential.rs  - Signed credential handed to the player    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The store only knows what was earned. What was redeemed is ledger state.

pub mod credential;
pub mod signer;
pub mod store;

pub use credential::{Credential, SignatureBytes, SignatureDecodeError, SIGNATURE_LEN};
pub use signer::{AttestationSigner, IssuanceError};
pub use store::{AchievementRecord, AttestationStore};
