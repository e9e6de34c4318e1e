//! # cct-cli — Confidential Compliance Scenario Runner
//!
//! Provides the `cct` binary. A scenario file describes a deployment
//! (identities, token, compliance, modules) and a list of actions; the CLI
//! builds everything in memory on the mock FHE backend and reports what
//! each holder can decrypt afterwards.
//!
//! ## Subcommands
//!
//! - `cct run <scenario.yaml> [--json]`: deploy and execute.
//! - `cct validate <scenario.yaml>`: parse and check without executing.
//!
//! ```bash
//! cct run scenarios/bond_issuance.yaml
//! RUST_LOG=debug cct run scenarios/bond_issuance.yaml --json
//! ```

pub mod run;
pub mod scenario;
pub mod validate;
