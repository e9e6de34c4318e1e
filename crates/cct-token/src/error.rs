//! # Token Errors
//!
//! Structural and authorization failures of the action gate. Whether a
//! compliance rule or a balance check passed is never an error: a failed
//! confidential check turns the action into a zero-amount action.

use thiserror::Error;

use cct_compliance::ComplianceError;
use cct_core::{Address, IdentityId};
use cct_fhe::{FheError, Handle};

/// Errors raised by [`ConfidentialToken`](crate::ConfidentialToken).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// The caller lacks the role the operation requires.
    #[error("{caller} is not authorized: {required} required")]
    Unauthorized {
        /// The rejected caller.
        caller: Address,
        /// The role that was required.
        required: &'static str,
    },

    /// A zero address was supplied where a real account is required.
    #[error("zero address supplied for {0}")]
    ZeroAddress(&'static str),

    /// The token is paused.
    #[error("token is paused")]
    Paused,

    /// The token is not paused.
    #[error("token is not paused")]
    NotPaused,

    /// The wallet is frozen.
    #[error("wallet {wallet} is frozen")]
    WalletFrozen {
        /// The frozen wallet.
        wallet: Address,
    },

    /// The receiver has no verified identity.
    #[error("receiver {wallet} is not verified")]
    ReceiverNotVerified {
        /// The unverified receiver.
        wallet: Address,
    },

    /// The account is already an agent.
    #[error("{agent} is already an agent")]
    AgentAlreadyAdded {
        /// The account.
        agent: Address,
    },

    /// The account is not an agent.
    #[error("{agent} is not an agent")]
    AgentNotFound {
        /// The account.
        agent: Address,
    },

    /// A batch call was empty.
    #[error("batch must not be empty")]
    EmptyBatch,

    /// Paired arrays had different lengths.
    #[error("array length mismatch: {left} vs {right}")]
    LengthMismatch {
        /// Length of the first array.
        left: usize,
        /// Length of the second array.
        right: usize,
    },

    /// The wallet does not belong to the claimed identity.
    #[error("wallet {wallet} is not registered to {identity}")]
    IdentityMismatch {
        /// The wallet checked.
        wallet: Address,
        /// The identity claimed for it.
        identity: IdentityId,
    },

    /// Recovery named the same wallet as lost and new.
    #[error("cannot recover wallet {wallet} onto itself")]
    RecoveryToSameWallet {
        /// The wallet.
        wallet: Address,
    },

    /// The caller presented a ciphertext it holds no access to.
    #[error("{caller} may not use ciphertext {handle}")]
    CiphertextNotAllowed {
        /// The caller.
        caller: Address,
        /// The ciphertext handle.
        handle: Handle,
    },

    /// A compliance or module call failed structurally.
    #[error("compliance: {0}")]
    Compliance(#[from] ComplianceError),

    /// An encrypted input failed verification.
    #[error("encrypted input rejected: {0}")]
    Fhe(#[from] FheError),
}
