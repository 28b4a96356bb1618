//! Core Primitives
//!
//! Account addresses and the attestation digest scheme.
//! Everything here is pure and deterministic.

pub mod address;
pub mod hash;

pub use address::{AccountAddress, AddressError};
pub use hash::{attestation_digest, signature_digest, Digest};
