//! # cct-fhe — Oblivious Arithmetic Layer
//!
//! Wraps an encrypted-unsigned-integer scheme behind operations that never
//! decrypt their operands.
//!
//! ## Architecture
//!
//! - **Handles** (`handle.rs`): `Handle` is an opaque 32-byte ciphertext
//!   reference with its `CiphertextType` encoded in the handle bytes.
//!
//! - **Types** (`types.rs`): `EncryptedAmount` and `EncryptedBit` are
//!   typed wrappers. The sealed `Ciphertext` trait lets `select` work over
//!   either payload while keeping comparisons and arithmetic type-correct.
//!
//! - **Backend** (`backend.rs`): The object-safe `FheBackend` trait is the
//!   contract every scheme implementation satisfies. All operations are
//!   total: they return a handle, never an error.
//!
//! - **Facade** (`oblivious.rs`): `Fhe` is the only surface the compliance
//!   engine and token use. It offers comparisons, logic, saturating
//!   arithmetic, and `select`, the single mechanism by which a ciphertext
//!   may influence a result.
//!
//! - **Mock** (`mock.rs`, feature `mock`): `MockFheBackend` keeps plaintexts
//!   in a table keyed by handle, verifies input proofs, enforces decrypt
//!   ACLs and records an `OpTrace` of operation kinds for branch-equivalence
//!   tests.
//!
//! ## Security Invariant
//!
//! No function in this crate branches on a plaintext hidden behind a
//! handle, except inside the mock backend's evaluation of a single
//! operation. The sequence of backend calls made by a caller depends only
//! on public inputs.

pub mod backend;
pub mod error;
pub mod handle;
#[cfg(feature = "mock")]
pub mod mock;
pub mod oblivious;
pub mod types;

pub use backend::{BinaryOp, Decryptor, FheBackend};
pub use error::FheError;
pub use handle::{CiphertextType, Handle};
#[cfg(feature = "mock")]
pub use mock::{MockFheBackend, OpKind};
pub use oblivious::Fhe;
pub use types::{Ciphertext, EncryptedAmount, EncryptedBit, ExternalAmount, InputProof};
