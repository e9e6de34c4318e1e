//! # cct-core — Foundational Types for the Confidential Compliance Stack
//!
//! Every other crate in the workspace depends on `cct-core`; it depends on
//! nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for actors.** `Address`, `IdentityId` and
//!    `CountryCode` are distinct types. A wallet address cannot be passed
//!    where an identity key is expected, which keeps identity-keyed cap
//!    state from silently degrading into wallet-keyed state.
//!
//! 2. **Public metadata only.** Nothing in this crate can hold a
//!    confidential magnitude. Events and labels carry addresses, flags
//!    and ciphertext handle bytes.
//!
//! 3. **UTC event stamps.** Every event record carries a whole-second UTC
//!    `Timestamp`.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `cct-*` crates (this is the leaf of the DAG).
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod address;
pub mod digest;
pub mod error;
pub mod event;
pub mod temporal;

// Re-export primary types for ergonomic imports.
pub use address::{Address, CountryCode, IdentityId};
pub use digest::{tagged_sha256, to_hex};
pub use error::CoreError;
pub use event::{EventKind, EventLog, EventRecord};
pub use temporal::Timestamp;
