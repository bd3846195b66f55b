//! # Account Addresses
//!
//! A 20-byte account identity, rendered as `0x`-prefixed lowercase hex.
//! Wallets, contracts, price feeds and creator tokens all share this type,
//! so one ledger can hold balances for any of them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Address length in bytes.
pub const ADDRESS_LENGTH: usize = 20;

/// BLAKE3 derive-key context for [`Address::derive`].
const DERIVE_CONTEXT: &str = "retriever 2026 address derivation v1";

/// Errors returned when parsing an address string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    /// The string is not `0x` followed by 40 hex characters.
    #[error("malformed address: {0}")]
    Malformed(String),
}

/// A 20-byte account identity.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address([u8; ADDRESS_LENGTH]);

impl Address {
    /// The all-zero address. Never a valid recipient.
    pub const ZERO: Address = Address([0u8; ADDRESS_LENGTH]);

    /// Wraps raw address bytes.
    pub fn from_bytes(bytes: [u8; ADDRESS_LENGTH]) -> Self {
        Address(bytes)
    }

    /// Derives a deterministic address from a label.
    ///
    /// The address is the first 20 bytes of a BLAKE3 derive-key hash of the
    /// label. The same label always yields the same address, and distinct
    /// labels collide with negligible probability.
    pub fn derive(label: &str) -> Self {
        let mut hasher = blake3::Hasher::new_derive_key(DERIVE_CONTEXT);
        hasher.update(label.as_bytes());
        let digest = hasher.finalize();
        let mut bytes = [0u8; ADDRESS_LENGTH];
        bytes.copy_from_slice(&digest.as_bytes()[..ADDRESS_LENGTH]);
        Address(bytes)
    }

    /// Returns the raw bytes.
    pub fn as_bytes(&self) -> &[u8; ADDRESS_LENGTH] {
        &self.0
    }

    /// Returns `true` for [`Address::ZERO`].
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; ADDRESS_LENGTH]
    }

    /// Shortened form for log lines: `0x1234…abcd`.
    pub fn short(&self) -> String {
        let full = hex::encode(self.0);
        format!("0x{}…{}", &full[..4], &full[full.len() - 4..])
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let body = s
            .strip_prefix("0x")
            .ok_or_else(|| AddressError::Malformed(s.to_string()))?;
        let decoded = hex::decode(body).map_err(|_| AddressError::Malformed(s.to_string()))?;
        let bytes: [u8; ADDRESS_LENGTH] = decoded
            .try_into()
            .map_err(|_| AddressError::Malformed(s.to_string()))?;
        Ok(Address(bytes))
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_is_deterministic() {
        assert_eq!(Address::derive("creator1"), Address::derive("creator1"));
        assert_ne!(Address::derive("creator1"), Address::derive("creator2"));
        assert!(!Address::derive("creator1").is_zero());
    }

    #[test]
    fn display_and_parse_agree() {
        let addr = Address::derive("user1");
        let text = addr.to_string();
        assert!(text.starts_with("0x"));
        assert_eq!(text.len(), 2 + ADDRESS_LENGTH * 2);
        assert_eq!(text.parse::<Address>().unwrap(), addr);
    }

    #[test]
    fn parse_rejects_malformed_input() {
        for bad in ["", "0x", "1234", "0xzz", "0x0102"] {
            assert!(bad.parse::<Address>().is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn serializes_as_hex_string() {
        let addr = Address::derive("deployer");
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, format!("\"{}\"", addr));
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
    }

    #[test]
    fn short_form_keeps_both_ends() {
        let addr = Address::from_bytes([0xab; ADDRESS_LENGTH]);
        assert_eq!(addr.short(), "0xabab…abab");
    }
}
