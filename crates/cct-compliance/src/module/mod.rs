//! # Compliance Modules
//!
//! A module is a self-contained rule unit that may be bound to many
//! compliances at once. Per-compliance state lives inside the module,
//! keyed by the compliance address, so two tokens sharing one module
//! instance never see each other's counters.
//!
//! The engine talks to every variant through [`ComplianceModule`] only and
//! never inspects which concrete variant it holds.
//!
//! ## Variants
//!
//! | Module | State | Preset | Verdict |
//! |--------|-------|--------|---------|
//! | [`CountryRestrictModule`] | plaintext country set | no | receiver country not restricted |
//! | [`CountryAllowModule`] | plaintext country set | no | receiver country allowed |
//! | [`TransferRestrictModule`] | plaintext wallet set | no | sender or receiver allow-listed |
//! | [`MaxBalanceModule`] | encrypted per-identity balances + cap | yes | `idBalance(to) + amount <= cap` |
//! | [`SupplyLimitModule`] | encrypted running supply + cap | no | mints: `supply + amount <= limit` |

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use cct_core::{Address, CountryCode, EventKind, EventLog, EventRecord, IdentityId};
use cct_fhe::{EncryptedAmount, EncryptedBit, ExternalAmount, Fhe, Handle, InputProof};

use crate::error::ComplianceError;
use crate::registry::IdentityRegistry;

pub mod country_allow;
pub mod country_restrict;
pub mod max_balance;
pub mod supply_limit;
pub mod transfer_restrict;

pub use country_allow::CountryAllowModule;
pub use country_restrict::CountryRestrictModule;
pub use max_balance::MaxBalanceModule;
pub use supply_limit::SupplyLimitModule;
pub use transfer_restrict::TransferRestrictModule;

// ─── Call contexts ───────────────────────────────────────────────────

/// Context for checks and post-action hooks, supplied by the engine.
pub struct ModuleContext<'a> {
    /// The calling compliance.
    pub compliance: Address,
    /// Oblivious arithmetic layer.
    pub fhe: &'a Fhe,
    /// Identity registry of the bound token.
    pub registry: &'a dyn IdentityRegistry,
}

/// Context for admin calls forwarded by [`ModularCompliance::call_module_function`](crate::ModularCompliance::call_module_function).
pub struct AdminContext<'a> {
    /// The forwarding compliance. Modules authorize against this.
    pub compliance: Address,
    /// Oblivious arithmetic layer.
    pub fhe: &'a Fhe,
}

/// The public shape of a token action, used for hook preflight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleAction {
    /// Tokens created for `to`.
    Mint {
        /// Receiver.
        to: Address,
    },
    /// Tokens destroyed from `from`.
    Burn {
        /// Holder.
        from: Address,
    },
    /// Tokens moved from `from` to `to`.
    Transfer {
        /// Sender.
        from: Address,
        /// Receiver.
        to: Address,
    },
}

/// A client-encrypted admin value with its input proof.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedInput {
    /// The submitted ciphertext.
    pub input: ExternalAmount,
    /// Proof binding it to the module and the forwarding compliance.
    pub proof: InputProof,
}

impl EncryptedInput {
    /// Verify the input for `module`, as forwarded by `compliance`.
    pub(crate) fn verify(
        &self,
        fhe: &Fhe,
        module: &Address,
        compliance: &Address,
    ) -> Result<EncryptedAmount, ComplianceError> {
        Ok(fhe.verify_amount(&self.input, &self.proof, module, compliance)?)
    }
}

/// Typed admin payload forwarded through the compliance to a module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleCall {
    /// Restrict one country.
    AddCountryRestriction(CountryCode),
    /// Lift one country restriction.
    RemoveCountryRestriction(CountryCode),
    /// Restrict several countries at once.
    BatchRestrictCountries(Vec<CountryCode>),
    /// Lift several country restrictions at once.
    BatchUnrestrictCountries(Vec<CountryCode>),
    /// Allow one country.
    AddAllowedCountry(CountryCode),
    /// Disallow one country.
    RemoveAllowedCountry(CountryCode),
    /// Allow several countries at once.
    BatchAllowCountries(Vec<CountryCode>),
    /// Disallow several countries at once.
    BatchDisallowCountries(Vec<CountryCode>),
    /// Add a wallet to the allow-list.
    AllowUser(Address),
    /// Remove a wallet from the allow-list.
    DisallowUser(Address),
    /// Add several wallets to the allow-list.
    BatchAllowUsers(Vec<Address>),
    /// Remove several wallets from the allow-list.
    BatchDisallowUsers(Vec<Address>),
    /// Set the encrypted per-identity balance cap.
    SetMaxBalance(EncryptedInput),
    /// Set the encrypted supply cap.
    SetSupplyLimit(EncryptedInput),
}

impl ModuleCall {
    /// Stable call name, used in events and errors.
    pub fn name(&self) -> &'static str {
        match self {
            Self::AddCountryRestriction(_) => "addCountryRestriction",
            Self::RemoveCountryRestriction(_) => "removeCountryRestriction",
            Self::BatchRestrictCountries(_) => "batchRestrictCountries",
            Self::BatchUnrestrictCountries(_) => "batchUnrestrictCountries",
            Self::AddAllowedCountry(_) => "addAllowedCountry",
            Self::RemoveAllowedCountry(_) => "removeAllowedCountry",
            Self::BatchAllowCountries(_) => "batchAllowCountries",
            Self::BatchDisallowCountries(_) => "batchDisallowCountries",
            Self::AllowUser(_) => "allowUser",
            Self::DisallowUser(_) => "disallowUser",
            Self::BatchAllowUsers(_) => "batchAllowUsers",
            Self::BatchDisallowUsers(_) => "batchDisallowUsers",
            Self::SetMaxBalance(_) => "setMaxBalance",
            Self::SetSupplyLimit(_) => "setSupplyLimit",
        }
    }
}

// ─── Module events ───────────────────────────────────────────────────

/// Public events emitted by modules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModuleEvent {
    /// A compliance bound the module.
    ComplianceBound { compliance: Address },
    /// A compliance unbound the module.
    ComplianceUnbound { compliance: Address },
    /// A country was restricted.
    AddedRestrictedCountry { compliance: Address, country: CountryCode },
    /// A country restriction was lifted.
    RemovedRestrictedCountry { compliance: Address, country: CountryCode },
    /// A country was allowed.
    CountryAllowed { compliance: Address, country: CountryCode },
    /// A country was disallowed.
    CountryUnallowed { compliance: Address, country: CountryCode },
    /// A wallet was allow-listed.
    UserAllowed { compliance: Address, user: Address },
    /// A wallet was removed from the allow-list.
    UserDisallowed { compliance: Address, user: Address },
    /// A new balance cap was set (ciphertext handle only).
    MaxBalanceSet { compliance: Address, max_balance: Handle },
    /// An identity balance was seeded before binding.
    IdBalancePreSet {
        compliance: Address,
        identity: IdentityId,
        balance: Handle,
    },
    /// Preset closed for a compliance.
    PresetCompleted { compliance: Address },
    /// A new supply cap was set (ciphertext handle only).
    SupplyLimitSet { compliance: Address, limit: Handle },
}

impl EventKind for ModuleEvent {
    fn kind(&self) -> &'static str {
        match self {
            Self::ComplianceBound { .. } => "ComplianceBound",
            Self::ComplianceUnbound { .. } => "ComplianceUnbound",
            Self::AddedRestrictedCountry { .. } => "AddedRestrictedCountry",
            Self::RemovedRestrictedCountry { .. } => "RemovedRestrictedCountry",
            Self::CountryAllowed { .. } => "CountryAllowed",
            Self::CountryUnallowed { .. } => "CountryUnallowed",
            Self::UserAllowed { .. } => "UserAllowed",
            Self::UserDisallowed { .. } => "UserDisallowed",
            Self::MaxBalanceSet { .. } => "MaxBalanceSet",
            Self::IdBalancePreSet { .. } => "IDBalancePreSet",
            Self::PresetCompleted { .. } => "PresetCompleted",
            Self::SupplyLimitSet { .. } => "SupplyLimitSet",
        }
    }
}

// ─── Module trait ────────────────────────────────────────────────────

/// Uniform capability interface over every module variant.
///
/// Checks never mutate state. Hooks receive the *effective* amount decided
/// by the token, so a rejected request leaves counters untouched.
pub trait ComplianceModule: Send + Sync + fmt::Debug {
    /// Human-readable module name.
    fn name(&self) -> &'static str;

    /// The module's own address.
    fn address(&self) -> Address;

    /// Whether the module can bind without a preset.
    fn is_plug_and_play(&self) -> bool;

    /// Whether `compliance` may bind the module now.
    fn can_compliance_bind(&self, compliance: &Address) -> bool;

    /// Whether `compliance` has bound the module.
    fn is_compliance_bound(&self, compliance: &Address) -> bool;

    /// Record `compliance` as bound. Called by the engine on `add_module`.
    fn bind_compliance(&self, compliance: &Address) -> Result<(), ComplianceError>;

    /// Forget `compliance` as bound. Per-compliance state is retained.
    fn unbind_compliance(&self, compliance: &Address) -> Result<(), ComplianceError>;

    /// This module's encrypted verdict for moving `amount` from `from` to `to`.
    fn module_check(
        &self,
        ctx: &ModuleContext<'_>,
        from: &Address,
        to: &Address,
        amount: &EncryptedAmount,
    ) -> Result<EncryptedBit, ComplianceError>;

    /// Validate, without mutating, that the hook for `action` will succeed.
    fn preflight(&self, ctx: &ModuleContext<'_>, action: &ModuleAction) -> Result<(), ComplianceError>;

    /// Post-mint hook.
    fn module_mint_action(
        &self,
        ctx: &ModuleContext<'_>,
        to: &Address,
        amount: &EncryptedAmount,
    ) -> Result<(), ComplianceError>;

    /// Post-burn hook.
    fn module_burn_action(
        &self,
        ctx: &ModuleContext<'_>,
        from: &Address,
        amount: &EncryptedAmount,
    ) -> Result<(), ComplianceError>;

    /// Post-transfer hook.
    fn module_transfer_action(
        &self,
        ctx: &ModuleContext<'_>,
        from: &Address,
        to: &Address,
        amount: &EncryptedAmount,
    ) -> Result<(), ComplianceError>;

    /// Admin entry point reached through the compliance.
    fn call(&self, ctx: &AdminContext<'_>, call: ModuleCall) -> Result<(), ComplianceError>;

    /// Events emitted so far.
    fn events(&self) -> Vec<EventRecord<ModuleEvent>>;
}

// ─── Shared module state ─────────────────────────────────────────────

/// Binding bookkeeping and event log common to every module.
#[derive(Debug, Default)]
pub(crate) struct ModuleBase {
    bound: HashSet<Address>,
    pub(crate) events: EventLog<ModuleEvent>,
}

impl ModuleBase {
    pub(crate) fn is_bound(&self, compliance: &Address) -> bool {
        self.bound.contains(compliance)
    }

    pub(crate) fn bind(&mut self, name: &'static str, compliance: &Address) -> Result<(), ComplianceError> {
        if compliance.is_zero() {
            return Err(ComplianceError::ZeroAddress("compliance"));
        }
        if !self.bound.insert(*compliance) {
            return Err(ComplianceError::ComplianceAlreadyBound {
                compliance: *compliance,
            });
        }
        self.events.emit(ModuleEvent::ComplianceBound {
            compliance: *compliance,
        });
        tracing::info!(module = name, %compliance, "compliance bound");
        Ok(())
    }

    pub(crate) fn unbind(&mut self, name: &'static str, compliance: &Address) -> Result<(), ComplianceError> {
        if !self.bound.remove(compliance) {
            return Err(ComplianceError::ComplianceNotBound {
                compliance: *compliance,
            });
        }
        self.events.emit(ModuleEvent::ComplianceUnbound {
            compliance: *compliance,
        });
        tracing::info!(module = name, %compliance, "compliance unbound");
        Ok(())
    }

    /// `onlyBoundCompliance` guard shared by every module.
    pub(crate) fn require_bound(&self, name: &'static str, compliance: &Address) -> Result<(), ComplianceError> {
        if self.is_bound(compliance) {
            Ok(())
        } else {
            tracing::warn!(module = name, %compliance, "call from unbound compliance");
            Err(ComplianceError::ComplianceNotBound {
                compliance: *compliance,
            })
        }
    }
}

/// Reject a batch that names the same country twice.
pub(crate) fn check_distinct_countries(countries: &[CountryCode]) -> Result<(), ComplianceError> {
    let mut seen = HashSet::with_capacity(countries.len());
    for country in countries {
        if !seen.insert(*country) {
            return Err(ComplianceError::DuplicateCountry(*country));
        }
    }
    Ok(())
}

/// Look up a wallet's identity or fail structurally.
pub(crate) fn identity_of(
    registry: &dyn IdentityRegistry,
    wallet: &Address,
) -> Result<IdentityId, ComplianceError> {
    registry
        .identity(wallet)
        .ok_or(ComplianceError::IdentityNotFound { wallet: *wallet })
}
