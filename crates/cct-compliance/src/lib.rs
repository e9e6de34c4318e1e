//! # cct-compliance — Confidential Compliance Engine
//!
//! Aggregates pluggable rule modules behind one encrypted eligibility bit
//! per token action.
//!
//! ## Components
//!
//! - **Modules** (`module/`): the `ComplianceModule` trait and its five
//!   variants. Plaintext-predicate modules (`CountryRestrictModule`,
//!   `CountryAllowModule`, `TransferRestrictModule`) widen a public verdict
//!   into an encrypted constant. Stateful cap modules (`MaxBalanceModule`,
//!   `SupplyLimitModule`) compare encrypted running totals against
//!   encrypted caps.
//!
//! - **Engine** (`engine.rs`): `ModularCompliance` holds the ordered set of
//!   bound modules for one token, AND-reduces their verdicts, forwards
//!   admin calls, and fans out post-action hooks.
//!
//! - **Registry** (`registry.rs`): the `IdentityRegistry` interface the
//!   token and modules consume, plus an in-memory implementation.
//!
//! ## Security Invariant
//!
//! Errors in this crate are structural only. A module whose rule is not
//! met returns an encrypted `false`; nothing here reverts, logs or emits
//! differently because of a hidden value.
//!
//! ## Lifecycle
//!
//! ```text
//! Unbound ──▶ [PresetPending ──▶ PresetCompleted] ──▶ Bound ──▶ Unbound
//!              (stateful modules only)          add_module   remove_module
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod module;
pub mod registry;

pub use config::{
    ComplianceConfig, DEFAULT_MAX_MODULES, MAX_COUNTRY_BATCH, MAX_PRESET_BATCH, MAX_USER_BATCH,
};
pub use engine::{ComplianceEvent, ModularCompliance};
pub use error::ComplianceError;
pub use module::{
    AdminContext, ComplianceModule, CountryAllowModule, CountryRestrictModule, EncryptedInput,
    MaxBalanceModule, ModuleAction, ModuleCall, ModuleContext, ModuleEvent, SupplyLimitModule,
    TransferRestrictModule,
};
pub use registry::{IdentityRegistry, InMemoryIdentityRegistry};
