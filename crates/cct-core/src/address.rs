//! # Actor Newtypes
//!
//! Newtype wrappers for every public actor reference in the stack.
//! These prevent accidental identifier confusion: you cannot pass a wallet
//! `Address` where an `IdentityId` is expected.
//!
//! ## Security Invariant
//!
//! Cap accounting is keyed by [`IdentityId`], never by wallet [`Address`].
//! Type-level distinction makes it a compile error to key a per-identity
//! map by a wallet, which is the latent bug class behind wallet-recovery
//! inconsistencies.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::digest::{tagged_sha256, to_hex};
use crate::error::CoreError;

/// A 20-byte account address (wallet, token, compliance or module).
///
/// Serialized as a 0x-prefixed lowercase hex string.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(pub [u8; 20]);

impl Address {
    /// The zero address. Mints originate from it and burns go to it.
    pub const ZERO: Address = Address([0u8; 20]);

    /// Derive a deterministic address from a human-readable label.
    ///
    /// Used by scenarios and tests so that `"alice"` always names the
    /// same account.
    pub fn from_label(label: &str) -> Self {
        let digest = tagged_sha256("cct:address", &[label.as_bytes()]);
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&digest[..20]);
        Self(bytes)
    }

    /// Whether this is the zero address.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    /// Access the raw bytes.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Render as `0x`-prefixed lowercase hex.
    pub fn to_hex(&self) -> String {
        format!("0x{}", to_hex(&self.0))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_hex())
    }
}

impl FromStr for Address {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| CoreError::InvalidAddress {
            input: s.to_string(),
            reason: reason.to_string(),
        };
        let hex = s
            .strip_prefix("0x")
            .ok_or_else(|| invalid("missing 0x prefix"))?;
        if hex.len() != 40 || !hex.is_ascii() {
            return Err(invalid("expected 40 hex digits"));
        }
        let mut bytes = [0u8; 20];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16)
                .map_err(|_| invalid("non-hex digit"))?;
        }
        Ok(Self(bytes))
    }
}

impl TryFrom<String> for Address {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Address> for String {
    fn from(value: Address) -> Self {
        value.to_hex()
    }
}

/// The stable logical owner behind one or more wallets.
///
/// Identity registries map wallets to identities; a recovered wallet keeps
/// its identity, so identity-keyed state survives recovery.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityId(pub Address);

impl IdentityId {
    /// Derive a deterministic identity from a label.
    pub fn from_label(label: &str) -> Self {
        Self(Address::from_label(&format!("identity:{label}")))
    }

    /// Access the underlying identity contract address.
    pub fn as_address(&self) -> &Address {
        &self.0
    }
}

impl fmt::Display for IdentityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "identity:{}", self.0)
    }
}

impl fmt::Debug for IdentityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IdentityId({})", self.0.to_hex())
    }
}

/// ISO 3166-1 numeric country code as reported by the identity registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CountryCode(pub u16);

impl CountryCode {
    /// Country reported for wallets the registry does not know.
    pub const UNKNOWN: CountryCode = CountryCode(0);
}

impl fmt::Display for CountryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
