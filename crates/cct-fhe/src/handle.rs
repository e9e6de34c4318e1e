//! # Ciphertext Handles
//!
//! A `Handle` is the only representation of a ciphertext outside the
//! backend. Byte 30 carries the `CiphertextType` tag so that the type of a
//! handle is public, as on every handle-based FHE coprocessor; byte 31 is
//! a version byte.
//!
//! The all-zero handle is the *uninitialized* handle. Backends treat it as
//! an encrypted zero, so a never-written balance slot behaves like a
//! balance of zero.

use std::fmt;

use serde::{Deserialize, Serialize};

use cct_core::to_hex;

/// Position of the type tag inside the handle bytes.
const TYPE_BYTE: usize = 30;
/// Position of the version byte inside the handle bytes.
const VERSION_BYTE: usize = 31;
/// Current handle layout version.
const HANDLE_VERSION: u8 = 1;

/// The plaintext type behind a ciphertext.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CiphertextType {
    /// Encrypted boolean (0 or 1).
    Bool,
    /// Encrypted unsigned 64-bit integer.
    U64,
}

impl CiphertextType {
    fn tag(self) -> u8 {
        match self {
            Self::Bool => 0,
            Self::U64 => 5,
        }
    }

    fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::Bool),
            5 => Some(Self::U64),
            _ => None,
        }
    }

    /// Largest plaintext representable by this type.
    pub fn max_value(self) -> u64 {
        match self {
            Self::Bool => 1,
            Self::U64 => u64::MAX,
        }
    }
}

impl fmt::Display for CiphertextType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool => f.write_str("ebool"),
            Self::U64 => f.write_str("euint64"),
        }
    }
}

/// Opaque reference to a ciphertext held by an [`FheBackend`](crate::FheBackend).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Handle(pub [u8; 32]);

impl Handle {
    /// The uninitialized handle; evaluates as an encrypted zero.
    pub const UNINITIALIZED: Handle = Handle([0u8; 32]);

    /// Build a handle from a 32-byte digest, stamping the type and version.
    pub fn from_digest(mut digest: [u8; 32], ty: CiphertextType) -> Self {
        digest[TYPE_BYTE] = ty.tag();
        digest[VERSION_BYTE] = HANDLE_VERSION;
        Self(digest)
    }

    /// Whether this is the uninitialized handle.
    pub fn is_uninitialized(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// The ciphertext type stamped into the handle, if well-formed.
    ///
    /// The uninitialized handle has no stamped type and reports `None`.
    pub fn ciphertext_type(&self) -> Option<CiphertextType> {
        if self.is_uninitialized() || self.0[VERSION_BYTE] != HANDLE_VERSION {
            return None;
        }
        CiphertextType::from_tag(self.0[TYPE_BYTE])
    }

    /// Access the raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Render as `0x`-prefixed lowercase hex.
    pub fn to_hex(&self) -> String {
        format!("0x{}", to_hex(&self.0))
    }
}

impl Default for Handle {
    fn default() -> Self {
        Self::UNINITIALIZED
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Short form keeps traces readable.
        write!(f, "Handle(0x{}..)", to_hex(&self.0[..6]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_is_stamped() {
        let h = Handle::from_digest([7u8; 32], CiphertextType::U64);
        assert_eq!(h.ciphertext_type(), Some(CiphertextType::U64));
        let b = Handle::from_digest([7u8; 32], CiphertextType::Bool);
        assert_eq!(b.ciphertext_type(), Some(CiphertextType::Bool));
        assert_ne!(h, b);
    }

    #[test]
    fn test_uninitialized_has_no_type() {
        assert!(Handle::default().is_uninitialized());
        assert_eq!(Handle::UNINITIALIZED.ciphertext_type(), None);
    }

    #[test]
    fn test_hex_rendering() {
        let h = Handle::from_digest([0xab; 32], CiphertextType::U64);
        let hex = h.to_hex();
        assert!(hex.starts_with("0xabab"));
        assert_eq!(hex.len(), 2 + 64);
    }
}
