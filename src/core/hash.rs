//! Attestation Digests
//!
//! Deterministic keccak-256 digests shared by the signer and the ledger.
//! Both sides must derive byte-identical digests from public inputs alone:
//!
//! ```text
//! message = keccak256(player[20] || be_u256(achievement_id))
//! wrapped = keccak256("\x19Ethereum Signed Message:\n" || "32" || message)
//! ```

use alloy_primitives::{Keccak256, B256, U256};

use super::address::AccountAddress;

/// Digest output type (256 bits / 32 bytes)
pub type Digest = B256;

/// Domain separation tag for signed attestations.
///
/// Followed by the decimal length of the wrapped digest.
pub const SIGNED_MESSAGE_TAG: &[u8] = b"\x19Ethereum Signed Message:\n";

/// Packed keccak-256 hasher.
///
/// Mirrors tightly packed ABI encoding: addresses are 20 raw bytes,
/// integers are 32-byte big-endian words. Order of updates is significant.
pub struct PackedHasher {
    hasher: Keccak256,
}

impl PackedHasher {
    /// Create an empty hasher.
    pub fn new() -> Self {
        Self {
            hasher: Keccak256::new(),
        }
    }

    /// Create a hasher with a domain prefix already absorbed.
    pub fn with_domain(domain: &[u8]) -> Self {
        let mut hasher = Self::new();
        hasher.update_bytes(domain);
        hasher
    }

    /// Update with raw bytes.
    #[inline]
    pub fn update_bytes(&mut self, bytes: &[u8]) {
        self.hasher.update(bytes);
    }

    /// Update with a 20-byte address.
    #[inline]
    pub fn update_address(&mut self, address: &AccountAddress) {
        self.hasher.update(address.as_bytes());
    }

    /// Update with an unsigned integer widened to a 32-byte big-endian word.
    #[inline]
    pub fn update_u256(&mut self, value: u64) {
        self.hasher.update(U256::from(value).to_be_bytes::<32>());
    }

    /// Finalize and return the digest.
    pub fn finalize(self) -> Digest {
        self.hasher.finalize()
    }
}

impl Default for PackedHasher {
    fn default() -> Self {
        Self::new()
    }
}

/// Inner digest binding a player to an achievement.
pub fn achievement_message(player: &AccountAddress, achievement_id: u64) -> Digest {
    let mut hasher = PackedHasher::new();
    hasher.update_address(player);
    hasher.update_u256(achievement_id);
    hasher.finalize()
}

/// Wrap a digest with the signed-message domain tag and hash again.
pub fn signed_message_digest(message: &Digest) -> Digest {
    let mut hasher = PackedHasher::with_domain(SIGNED_MESSAGE_TAG);
    hasher.update_bytes(message.len().to_string().as_bytes());
    hasher.update_bytes(message.as_slice());
    hasher.finalize()
}

/// The digest that is actually signed and recovered against.
pub fn attestation_digest(player: &AccountAddress, achievement_id: u64) -> Digest {
    signed_message_digest(&achievement_message(player, achievement_id))
}

/// Digest of raw signature bytes, used as the replay key.
pub fn signature_digest(signature: &[u8]) -> Digest {
    let mut hasher = PackedHasher::new();
    hasher.update_bytes(signature);
    hasher.finalize()
}

// =============================================================================
// TESTS
// =============================================================================
