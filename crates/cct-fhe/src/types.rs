//! # Typed Ciphertexts
//!
//! `EncryptedAmount` and `EncryptedBit` are thin, `Copy` wrappers around a
//! [`Handle`]. They carry no plaintext and implement no comparison on the
//! hidden value: `PartialEq` compares *handles*, which are public.
//!
//! `EncryptedBit` has no accessor that yields a `bool`. The only consumer
//! of a bit is [`Fhe::select`](crate::Fhe::select) (or further logic on
//! bits), which is what keeps encrypted verdicts from reaching an `if`.

use serde::{Deserialize, Serialize};

use crate::handle::{CiphertextType, Handle};

mod sealed {
    pub trait Sealed {}
    impl Sealed for super::EncryptedAmount {}
    impl Sealed for super::EncryptedBit {}
}

/// A typed ciphertext payload that `select` can choose between.
pub trait Ciphertext: sealed::Sealed + Copy + std::fmt::Debug {
    /// The plaintext type behind this payload.
    const TYPE: CiphertextType;

    /// The underlying handle.
    fn handle(&self) -> Handle;

    /// Wrap a handle produced by the backend for this type.
    #[doc(hidden)]
    fn from_handle(handle: Handle) -> Self;
}

/// Encrypted unsigned 64-bit magnitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EncryptedAmount(Handle);

impl EncryptedAmount {
    /// The uninitialized amount (evaluates as zero).
    pub const UNINITIALIZED: EncryptedAmount = EncryptedAmount(Handle::UNINITIALIZED);

    /// The underlying handle.
    pub fn handle(&self) -> Handle {
        self.0
    }

    /// Whether this slot has never been written.
    pub fn is_uninitialized(&self) -> bool {
        self.0.is_uninitialized()
    }
}

impl Ciphertext for EncryptedAmount {
    const TYPE: CiphertextType = CiphertextType::U64;

    fn handle(&self) -> Handle {
        self.0
    }

    fn from_handle(handle: Handle) -> Self {
        Self(handle)
    }
}

/// Encrypted boolean produced by comparisons and bit logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EncryptedBit(Handle);

impl EncryptedBit {
    /// The underlying handle.
    pub fn handle(&self) -> Handle {
        self.0
    }
}

impl Ciphertext for EncryptedBit {
    const TYPE: CiphertextType = CiphertextType::Bool;

    fn handle(&self) -> Handle {
        self.0
    }

    fn from_handle(handle: Handle) -> Self {
        Self(handle)
    }
}

/// A client-submitted encrypted amount that has not been verified yet.
///
/// Must be converted with [`Fhe::verify_amount`](crate::Fhe::verify_amount)
/// together with its [`InputProof`] before it can enter any computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExternalAmount {
    /// Handle assigned at client-side encryption.
    pub handle: Handle,
}

/// Proof binding an [`ExternalAmount`] to a contract and a submitting user.
///
/// The byte format is defined by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InputProof(pub Vec<u8>);

impl InputProof {
    /// Access the raw proof bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}
