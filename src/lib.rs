//! # Puzzle Badges Server
//!
//! Achievement attestation for Base Puzzle: games are ingested, earned
//! achievements are recorded, and players receive signed credentials they
//! can redeem exactly once on the badge ledger.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    PUZZLE BADGES SERVER                     │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Identity and hashing primitives          │
//! │  ├── address.rs  - 20-byte account addresses               │
//! │  └── hash.rs     - Packed keccak digests                    │
//! │                                                             │
//! │  game/           - Stats and eligibility                    │
//! │  ├── stats.rs    - Player totals and game history           │
//! │  └── achievement.rs - Catalog and rules                     │
//! │                                                             │
//! │  attest/         - Issuance                                 │
//! │  ├── store.rs    - Earned-achievement store                 │
//! │  ├── signer.rs   - Credential signing                       │
//! │  └── credential.rs - 65-byte signatures                     │
//! │                                                             │
//! │  ledger/         - Redemption (one-time consumption)        │
//! │  storage/        - JSON snapshots                           │
//! │  service.rs      - Orchestration                            │
//! │  network/        - WebSocket server                         │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Replay Protection
//!
//! Two independent guards, keyed differently:
//! - The ledger refuses a second redemption of any (player, achievement).
//! - The ledger refuses any signature whose digest it already consumed,
//!   whatever the caller.
//!
//! The local store only gates issuance; it is never the redemption
//! authority.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod attest;
pub mod config;
pub mod core;
pub mod game;
pub mod ledger;
pub mod network;
pub mod service;
pub mod storage;

// Re-export commonly used types
pub use attest::{AttestationSigner, AttestationStore, Credential, IssuanceError};
pub use config::{ConfigError, ServerConfig};
pub use core::address::AccountAddress;
pub use game::achievement::AchievementId;
pub use ledger::{BadgeLedger, LedgerError, LedgerHandle};
pub use service::{AchievementService, ServiceError};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
