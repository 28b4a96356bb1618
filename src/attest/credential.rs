//! Credentials
//!
//! A credential is the signed claim handed to a player. It is never stored
//! server-side.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::address::AccountAddress;
use crate::game::achievement::AchievementId;

/// Signature length: r (32) || s (32) || v (1).
pub const SIGNATURE_LEN: usize = 65;

/// Raw 65-byte recoverable signature, hex on the wire.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SignatureBytes(pub [u8; SIGNATURE_LEN]);

/// Signature decoding errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureDecodeError {
    /// Wrong number of bytes.
    #[error("invalid signature length: expected {SIGNATURE_LEN} bytes, got {0}")]
    InvalidLength(usize),
    /// Non-hex characters present.
    #[error("invalid signature encoding")]
    InvalidHex,
}

impl SignatureBytes {
    /// Decode from hex, with or without `0x`/`0X`, any case.
    pub fn from_hex(s: &str) -> Result<Self, SignatureDecodeError> {
        let s = s.trim();
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        let bytes = hex::decode(digits).map_err(|_| SignatureDecodeError::InvalidHex)?;
        Self::from_slice(&bytes)
    }

    /// Copy from a byte slice of exactly 65 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, SignatureDecodeError> {
        if bytes.len() != SIGNATURE_LEN {
            return Err(SignatureDecodeError::InvalidLength(bytes.len()));
        }
        let mut arr = [0u8; SIGNATURE_LEN];
        arr.copy_from_slice(bytes);
        Ok(Self(arr))
    }

    /// `0x`-prefixed lowercase hex.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl TryFrom<String> for SignatureBytes {
    type Error = SignatureDecodeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::from_hex(&s)
    }
}

impl From<SignatureBytes> for String {
    fn from(sig: SignatureBytes) -> Self {
        sig.to_hex()
    }
}

impl fmt::Debug for SignatureBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SignatureBytes(0x{}..)", hex::encode(&self.0[..4]))
    }
}

/// Signed claim that `player` earned `achievement`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// Player named in the signed digest.
    pub player: AccountAddress,
    /// Achievement named in the signed digest.
    pub achievement: AchievementId,
    /// Signature over the attestation digest.
    pub signature: SignatureBytes,
}
