//! # FHE Backend Trait
//!
//! Defines the raw, handle-level interface that every homomorphic scheme
//! implementation satisfies. The trait is object safe so that the token,
//! the compliance engine and every module share one `Arc<dyn FheBackend>`.
//!
//! ## Security Invariant
//!
//! Every method except [`FheBackend::verify_input`] is total. An
//! implementation must perform the same amount of work and return a fresh
//! handle regardless of the plaintexts behind its operands. Input
//! verification may fail, but only on proof and provenance data, which is
//! public.

use cct_core::Address;

use crate::error::FheError;
use crate::handle::{CiphertextType, Handle};
use crate::types::InputProof;

/// Two-operand homomorphic operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    /// Addition, saturating at the type maximum.
    Add,
    /// Subtraction, saturating at zero.
    Sub,
    /// `lhs <= rhs`.
    Le,
    /// `lhs < rhs`.
    Lt,
    /// `lhs >= rhs`.
    Ge,
    /// `lhs > rhs`.
    Gt,
    /// `lhs == rhs`.
    Eq,
    /// Boolean AND.
    And,
    /// Boolean OR.
    Or,
}

impl BinaryOp {
    /// Stable lowercase name used in traces and metrics labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Sub => "sub",
            Self::Le => "le",
            Self::Lt => "lt",
            Self::Ge => "ge",
            Self::Gt => "gt",
            Self::Eq => "eq",
            Self::And => "and",
            Self::Or => "or",
        }
    }

    /// Type of the result given the operand type.
    pub fn output_type(&self, operand: CiphertextType) -> CiphertextType {
        match self {
            Self::Add | Self::Sub => operand,
            Self::Le | Self::Lt | Self::Ge | Self::Gt | Self::Eq | Self::And | Self::Or => {
                CiphertextType::Bool
            }
        }
    }
}

/// Handle-level homomorphic backend.
pub trait FheBackend: Send + Sync {
    /// Encrypt a public constant.
    fn trivial_encrypt(&self, value: u64, ty: CiphertextType) -> Handle;

    /// Verify a client input and return a handle usable in computation.
    fn verify_input(
        &self,
        input: Handle,
        proof: &InputProof,
        contract: &Address,
        user: &Address,
        ty: CiphertextType,
    ) -> Result<Handle, FheError>;

    /// Apply a binary operation.
    fn binary(&self, op: BinaryOp, lhs: Handle, rhs: Handle) -> Handle;

    /// Boolean negation.
    fn not(&self, operand: Handle) -> Handle;

    /// Oblivious multiplexer: `condition ? if_true : if_false`.
    fn select(&self, condition: Handle, if_true: Handle, if_false: Handle) -> Handle;

    /// Grant `account` the right to request decryption of `handle`.
    fn allow(&self, handle: Handle, account: &Address);

    /// Whether `account` may request decryption of `handle`.
    fn is_allowed(&self, handle: Handle, account: &Address) -> bool;
}

/// Authorised decryption, the only path from a handle to a plaintext.
///
/// Consumed by holders and auditors, never by the engine or the token.
pub trait Decryptor: Send + Sync {
    /// Decrypt `handle` on behalf of `requester`.
    fn decrypt(&self, handle: Handle, requester: &Address) -> Result<u64, FheError>;
}
