//! # FHE Errors
//!
//! Errors raised by the oblivious layer. Every variant is structural: it
//! depends on handle provenance, proofs or access grants, never on the
//! plaintext behind a handle.

use thiserror::Error;

use cct_core::Address;

use crate::handle::{CiphertextType, Handle};

/// Errors produced by the oblivious arithmetic layer and its backends.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FheError {
    /// The input proof does not bind the handle to the contract and user.
    #[error("invalid input proof for handle {handle} (contract {contract}, user {user})")]
    InvalidInputProof {
        /// The submitted input handle.
        handle: Handle,
        /// Contract the input was meant for.
        contract: Address,
        /// User who submitted the input.
        user: Address,
    },

    /// The submitted input handle was never produced by a client encryption.
    #[error("unknown input handle {0}")]
    UnknownInput(Handle),

    /// The handle does not carry the expected ciphertext type.
    #[error("ciphertext type mismatch for {handle}: expected {expected}")]
    TypeMismatch {
        /// The offending handle.
        handle: Handle,
        /// The type the caller required.
        expected: CiphertextType,
    },

    /// The requester holds no decrypt grant for the handle.
    #[error("{requester} is not allowed to decrypt {handle}")]
    AccessDenied {
        /// The handle whose plaintext was requested.
        handle: Handle,
        /// The account that asked.
        requester: Address,
    },
}
