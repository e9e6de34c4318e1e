//! # Error Types
//!
//! Errors raised while parsing addresses. All errors use
//! `thiserror` for derive-based `Display` and `Error` implementations.

use thiserror::Error;

/// Errors produced by the foundational types.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// An address string was not 0x-prefixed 40-digit hex.
    #[error("invalid address {input:?}: {reason}")]
    InvalidAddress {
        /// The rejected input.
        input: String,
        /// Why it was rejected.
        reason: String,
    },
}
