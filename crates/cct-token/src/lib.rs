//! # cct-token — Confidential Token Action Gate
//!
//! A permissioned token whose balances, allowances, frozen amounts and
//! total supply are ciphertext handles. Every mint, burn and transfer is
//! checked against a [`ModularCompliance`](cct_compliance::ModularCompliance)
//! and the encrypted balance rules, and the outcome is folded into the
//! amount with `select`: a failing action moves an encrypted zero.
//!
//! ## Components
//!
//! - **Token** (`token.rs`): state, roles (owner and agents), pause, wallet
//!   freezing, compliance and registry wiring, queries.
//! - **Gate** (`gate.rs`): the confidential actions (transfer, approve,
//!   transfer_from, mint, batch_mint, burn, forced_transfer, partial
//!   freezes, wallet recovery).
//! - **Events** (`event.rs`) and **errors** (`error.rs`).
//!
//! ## Security Invariant
//!
//! A call either fails on a public precondition before writing anything,
//! or succeeds with an effect whose shape is independent of every hidden
//! value.

pub mod config;
pub mod error;
pub mod event;
mod gate;
pub mod token;

pub use config::TokenConfig;
pub use error::TokenError;
pub use event::TokenEvent;
pub use token::ConfidentialToken;
