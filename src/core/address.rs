//! Account Addresses
//!
//! 20-byte account identifiers shared by players and signers.
//! Accepted case-insensitively on the wire, stored and displayed lowercase.

use std::fmt;
use std::str::FromStr;

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Address length in bytes.
pub const ADDRESS_LEN: usize = 20;

/// Address length in hex characters (without `0x`).
pub const ADDRESS_HEX_LEN: usize = ADDRESS_LEN * 2;

/// Account identifier (player or signer).
///
/// Ordering follows the raw bytes, which is also the order of the
/// lowercase hex form. Used as a BTreeMap key throughout.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountAddress([u8; ADDRESS_LEN]);

/// Address parsing errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    /// Wrong number of hex characters.
    #[error("invalid address length: expected 40 hex chars, got {0}")]
    InvalidLength(usize),
    /// Non-hex characters present.
    #[error("invalid address encoding")]
    InvalidHex,
}

impl AccountAddress {
    /// Create from raw bytes.
    pub const fn new(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    /// Parse a 40-hex-char address, with or without `0x`, any case.
    pub fn parse(s: &str) -> Result<Self, AddressError> {
        let s = s.trim();
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);

        if digits.len() != ADDRESS_HEX_LEN {
            return Err(AddressError::InvalidLength(digits.len()));
        }

        let bytes = hex::decode(digits).map_err(|_| AddressError::InvalidHex)?;
        let mut arr = [0u8; ADDRESS_LEN];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }

    /// Get raw bytes.
    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }

    /// Convert to an alloy `Address`.
    pub fn to_alloy(&self) -> Address {
        Address::from(self.0)
    }

    /// Canonical lowercase form with `0x` prefix.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Short form for log lines (`0xaabbcc..`).
    pub fn short(&self) -> String {
        format!("0x{}..", hex::encode(&self.0[..3]))
    }
}

impl From<Address> for AccountAddress {
    fn from(address: Address) -> Self {
        let mut arr = [0u8; ADDRESS_LEN];
        arr.copy_from_slice(address.as_slice());
        Self(arr)
    }
}

impl FromStr for AccountAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for AccountAddress {
    type Error = AddressError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<AccountAddress> for String {
    fn from(address: AccountAddress) -> Self {
        address.to_hex()
    }
}

impl fmt::Display for AccountAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for AccountAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountAddress({})", self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIXED: &str = "0xAaAa00000000000000000000000000000000111F";

    #[test]
    fn test_parse_is_case_insensitive() {
        let upper = AccountAddress::parse(&MIXED.to_uppercase().replace("0X", "0x")).unwrap();
        let lower = AccountAddress::parse(&MIXED.to_lowercase()).unwrap();
        let mixed = AccountAddress::parse(MIXED).unwrap();

        assert_eq!(upper, lower);
        assert_eq!(lower, mixed);
    }

    #[test]
    fn test_display_is_lowercase() {
        let addr = AccountAddress::parse(MIXED).unwrap();
        assert_eq!(addr.to_string(), MIXED.to_lowercase());
    }

    #[test]
    fn test_prefix_optional() {
        let with = AccountAddress::parse(MIXED).unwrap();
        let without = AccountAddress::parse(&MIXED[2..]).unwrap();
        assert_eq!(with, without);
    }

    #[test]
    fn test_invalid_length_rejected() {
        assert_eq!(
            AccountAddress::parse("0x1234"),
            Err(AddressError::InvalidLength(4))
        );
    }

    #[test]
    fn test_invalid_hex_rejected() {
        let bad = format!("0x{}", "zz".repeat(20));
        assert_eq!(AccountAddress::parse(&bad), Err(AddressError::InvalidHex));
    }

    #[test]
    fn test_alloy_roundtrip() {
        let addr = AccountAddress::parse(MIXED).unwrap();
        assert_eq!(AccountAddress::from(addr.to_alloy()), addr);
    }

    #[test]
    fn test_serde_uses_hex_string() {
        let addr = AccountAddress::parse(MIXED).unwrap();
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, format!("\"{}\"", MIXED.to_lowercase()));

        let back: AccountAddress = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
    }
}
