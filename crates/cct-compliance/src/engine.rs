//! # Modular Compliance Engine
//!
//! One [`ModularCompliance`] per token. It owns the ordered set of bound
//! modules, reduces their encrypted verdicts into a single eligibility
//! bit, forwards owner admin calls to modules, and fans out the
//! post-action hooks.
//!
//! ## Security Invariant
//!
//! Every bound module is evaluated on every check and the verdicts are
//! combined with an encrypted AND that cannot short-circuit. The number
//! and kind of backend operations therefore depend only on the public
//! module list, never on a hidden verdict.
//!
//! ## Hook atomicity
//!
//! The token runs [`ModularCompliance::preflight`] before it commits
//! anything. Preflight asks every module to validate the hook it is about
//! to receive, so the hooks that follow the commit cannot fail
//! structurally and a rejected action leaves no partial state behind.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use cct_core::{Address, EventKind, EventLog, EventRecord};
use cct_fhe::{EncryptedAmount, EncryptedBit, Fhe};

use crate::config::ComplianceConfig;
use crate::error::ComplianceError;
use crate::module::{AdminContext, ComplianceModule, ModuleAction, ModuleCall, ModuleContext};
use crate::registry::IdentityRegistry;

// ─── Events ──────────────────────────────────────────────────────────

/// Public events emitted by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComplianceEvent {
    /// A token was bound to the compliance.
    TokenBound { token: Address },
    /// The token was unbound.
    TokenUnbound { token: Address },
    /// A module was added.
    ModuleAdded { module: Address },
    /// A module was removed.
    ModuleRemoved { module: Address },
    /// The owner called an admin function on a module.
    ModuleInteraction { module: Address, selector: String },
    /// Ownership moved to a new account.
    OwnershipTransferred { previous: Address, new: Address },
}

impl EventKind for ComplianceEvent {
    fn kind(&self) -> &'static str {
        match self {
            Self::TokenBound { .. } => "TokenBound",
            Self::TokenUnbound { .. } => "TokenUnbound",
            Self::ModuleAdded { .. } => "ModuleAdded",
            Self::ModuleRemoved { .. } => "ModuleRemoved",
            Self::ModuleInteraction { .. } => "ModuleInteraction",
            Self::OwnershipTransferred { .. } => "OwnershipTransferred",
        }
    }
}

// ─── Engine ──────────────────────────────────────────────────────────

#[derive(Debug)]
struct EngineState {
    owner: Address,
    token: Option<Address>,
    modules: Vec<Arc<dyn ComplianceModule>>,
    events: EventLog<ComplianceEvent>,
}

/// Per-token aggregator over bound compliance modules.
#[derive(Debug)]
pub struct ModularCompliance {
    address: Address,
    fhe: Fhe,
    config: ComplianceConfig,
    state: RwLock<EngineState>,
}

impl ModularCompliance {
    /// Create an engine at `address` owned by `owner`, with default config.
    pub fn new(address: Address, owner: Address, fhe: Fhe) -> Self {
        Self::with_config(address, owner, fhe, ComplianceConfig::default())
    }

    /// Create an engine with an explicit configuration.
    pub fn with_config(address: Address, owner: Address, fhe: Fhe, config: ComplianceConfig) -> Self {
        Self {
            address,
            fhe,
            config,
            state: RwLock::new(EngineState {
                owner,
                token: None,
                modules: Vec::new(),
                events: EventLog::new(),
            }),
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// The engine's own address. Modules key their state by it.
    pub fn address(&self) -> Address {
        self.address
    }

    /// The current owner.
    pub fn owner(&self) -> Address {
        self.state.read().owner
    }

    /// The oblivious arithmetic layer shared with modules.
    pub fn fhe(&self) -> &Fhe {
        &self.fhe
    }

    /// The engine configuration.
    pub fn config(&self) -> &ComplianceConfig {
        &self.config
    }

    /// The bound token, if any.
    pub fn get_token_bound(&self) -> Option<Address> {
        self.state.read().token
    }

    /// Addresses of the bound modules, in binding order.
    pub fn get_modules(&self) -> Vec<Address> {
        self.state.read().modules.iter().map(|m| m.address()).collect()
    }

    /// Whether a module with `module` address is bound.
    pub fn is_module_bound(&self, module: &Address) -> bool {
        self.state
            .read()
            .modules
            .iter()
            .any(|m| m.address() == *module)
    }

    /// Events emitted so far.
    pub fn events(&self) -> Vec<EventRecord<ComplianceEvent>> {
        self.state.read().events.records().to_vec()
    }

    // ── Ownership and token binding ──────────────────────────────────

    /// Hand ownership to `new_owner`.
    pub fn transfer_ownership(&self, caller: &Address, new_owner: Address) -> Result<(), ComplianceError> {
        let mut state = self.state.write();
        require_owner(&state, caller)?;
        if new_owner.is_zero() {
            return Err(ComplianceError::ZeroAddress("new owner"));
        }
        let previous = std::mem::replace(&mut state.owner, new_owner);
        state.events.emit(ComplianceEvent::OwnershipTransferred {
            previous,
            new: new_owner,
        });
        tracing::info!(compliance = %self.address, %previous, new = %new_owner, "ownership transferred");
        Ok(())
    }

    /// Bind `token`. The owner may always (re)bind; a token may bind itself
    /// only while no token is bound.
    pub fn bind_token(&self, caller: &Address, token: Address) -> Result<(), ComplianceError> {
        let mut state = self.state.write();
        if *caller != state.owner {
            if let Some(bound) = state.token {
                return Err(ComplianceError::TokenAlreadyBound { token: bound });
            }
            if *caller != token {
                return Err(ComplianceError::Unauthorized {
                    caller: *caller,
                    required: "owner or token",
                });
            }
        }
        if token.is_zero() {
            return Err(ComplianceError::ZeroAddress("token"));
        }
        state.token = Some(token);
        state.events.emit(ComplianceEvent::TokenBound { token });
        tracing::info!(compliance = %self.address, %token, "token bound");
        Ok(())
    }

    /// Unbind `token`. Callable by the owner or by the bound token.
    pub fn unbind_token(&self, caller: &Address, token: Address) -> Result<(), ComplianceError> {
        let mut state = self.state.write();
        if *caller != state.owner && Some(*caller) != state.token {
            return Err(ComplianceError::Unauthorized {
                caller: *caller,
                required: "owner or token",
            });
        }
        if token.is_zero() {
            return Err(ComplianceError::ZeroAddress("token"));
        }
        if state.token != Some(token) {
            return Err(ComplianceError::TokenNotBound { token });
        }
        state.token = None;
        state.events.emit(ComplianceEvent::TokenUnbound { token });
        tracing::info!(compliance = %self.address, %token, "token unbound");
        Ok(())
    }

    // ── Module set ───────────────────────────────────────────────────

    /// Bind `module`, subject to its own bind predicate and the capacity
    /// ceiling.
    pub fn add_module(
        &self,
        caller: &Address,
        module: Arc<dyn ComplianceModule>,
    ) -> Result<(), ComplianceError> {
        let mut state = self.state.write();
        require_owner(&state, caller)?;
        let address = module.address();
        if address.is_zero() {
            return Err(ComplianceError::ZeroAddress("module"));
        }
        if state.modules.iter().any(|m| m.address() == address) {
            return Err(ComplianceError::ModuleAlreadyBound { module: address });
        }
        if state.modules.len() >= self.config.max_modules {
            return Err(ComplianceError::ModuleLimitReached {
                max: self.config.max_modules,
            });
        }
        if !module.can_compliance_bind(&self.address) {
            return Err(ComplianceError::ModuleCannotBind {
                module: address,
                compliance: self.address,
            });
        }
        module.bind_compliance(&self.address)?;
        state.modules.push(module);
        state.events.emit(ComplianceEvent::ModuleAdded { module: address });
        tracing::info!(compliance = %self.address, %address, count = state.modules.len(), "module added");
        Ok(())
    }

    /// Unbind the module at `module`. The module keeps its per-compliance
    /// state.
    pub fn remove_module(&self, caller: &Address, module: &Address) -> Result<(), ComplianceError> {
        let mut state = self.state.write();
        require_owner(&state, caller)?;
        if module.is_zero() {
            return Err(ComplianceError::ZeroAddress("module"));
        }
        let index = state
            .modules
            .iter()
            .position(|m| m.address() == *module)
            .ok_or(ComplianceError::ModuleNotBound { module: *module })?;
        state.modules[index].unbind_compliance(&self.address)?;
        state.modules.remove(index);
        state.events.emit(ComplianceEvent::ModuleRemoved { module: *module });
        tracing::info!(compliance = %self.address, %module, "module removed");
        Ok(())
    }

    /// Forward an owner admin call to a bound module. The module sees this
    /// engine as its caller.
    pub fn call_module_function(
        &self,
        caller: &Address,
        module: &Address,
        call: ModuleCall,
    ) -> Result<(), ComplianceError> {
        let target = {
            let state = self.state.read();
            require_owner(&state, caller)?;
            find_module(&state, module)?
        };
        let selector = call.name();
        let ctx = AdminContext {
            compliance: self.address,
            fhe: &self.fhe,
        };
        target.call(&ctx, call)?;
        self.state
            .write()
            .events
            .emit(ComplianceEvent::ModuleInteraction {
                module: *module,
                selector: selector.to_string(),
            });
        tracing::debug!(compliance = %self.address, %module, selector, "module function called");
        Ok(())
    }

    // ── Token-facing operations ──────────────────────────────────────

    /// AND of every bound module's verdict for moving `amount` from `from`
    /// to `to`. With no modules bound the verdict is an encrypted `true`.
    pub fn module_check(
        &self,
        caller: &Address,
        registry: &dyn IdentityRegistry,
        from: &Address,
        to: &Address,
        amount: &EncryptedAmount,
    ) -> Result<EncryptedBit, ComplianceError> {
        let modules = self.token_snapshot(caller)?;
        let ctx = self.context(registry);
        let verdicts = modules
            .iter()
            .map(|m| m.module_check(&ctx, from, to, amount))
            .collect::<Result<Vec<_>, _>>()?;
        metrics::counter!("cct_compliance_checks_total").increment(1);
        Ok(self.fhe.and_all(&verdicts))
    }

    /// Ask every module whether the hook for `action` will succeed.
    pub fn preflight(
        &self,
        caller: &Address,
        registry: &dyn IdentityRegistry,
        action: &ModuleAction,
    ) -> Result<(), ComplianceError> {
        let modules = self.token_snapshot(caller)?;
        let ctx = self.context(registry);
        modules.iter().try_for_each(|m| m.preflight(&ctx, action))
    }

    /// Post-mint hook, fanned out to every module.
    pub fn created(
        &self,
        caller: &Address,
        registry: &dyn IdentityRegistry,
        to: &Address,
        amount: &EncryptedAmount,
    ) -> Result<(), ComplianceError> {
        let modules = self.token_snapshot(caller)?;
        let ctx = self.context(registry);
        modules
            .iter()
            .try_for_each(|m| m.module_mint_action(&ctx, to, amount))
    }

    /// Post-burn hook, fanned out to every module.
    pub fn destroyed(
        &self,
        caller: &Address,
        registry: &dyn IdentityRegistry,
        from: &Address,
        amount: &EncryptedAmount,
    ) -> Result<(), ComplianceError> {
        let modules = self.token_snapshot(caller)?;
        let ctx = self.context(registry);
        modules
            .iter()
            .try_for_each(|m| m.module_burn_action(&ctx, from, amount))
    }

    /// Post-transfer hook, fanned out to every module.
    pub fn transferred(
        &self,
        caller: &Address,
        registry: &dyn IdentityRegistry,
        from: &Address,
        to: &Address,
        amount: &EncryptedAmount,
    ) -> Result<(), ComplianceError> {
        let modules = self.token_snapshot(caller)?;
        let ctx = self.context(registry);
        modules
            .iter()
            .try_for_each(|m| m.module_transfer_action(&ctx, from, to, amount))
    }

    /// Clone the module list after checking that `caller` is the bound
    /// token. Modules run without the engine lock held.
    fn token_snapshot(&self, caller: &Address) -> Result<Vec<Arc<dyn ComplianceModule>>, ComplianceError> {
        let state = self.state.read();
        match state.token {
            Some(token) if token == *caller => Ok(state.modules.clone()),
            Some(_) => Err(ComplianceError::Unauthorized {
                caller: *caller,
                required: "bound token",
            }),
            None => Err(ComplianceError::TokenNotBound { token: *caller }),
        }
    }

    fn context<'a>(&'a self, registry: &'a dyn IdentityRegistry) -> ModuleContext<'a> {
        ModuleContext {
            compliance: self.address,
            fhe: &self.fhe,
            registry,
        }
    }
}

fn require_owner(state: &EngineState, caller: &Address) -> Result<(), ComplianceError> {
    if *caller == state.owner {
        Ok(())
    } else {
        Err(ComplianceError::Unauthorized {
            caller: *caller,
            required: "owner",
        })
    }
}

fn find_module(state: &EngineState, module: &Address) -> Result<Arc<dyn ComplianceModule>, ComplianceError> {
    state
        .modules
        .iter()
        .find(|m| m.address() == *module)
        .cloned()
        .ok_or(ComplianceError::ModuleNotBound { module: *module })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::testing::{wallet, Fixture};
    use crate::module::{
        CountryRestrictModule, MaxBalanceModule, SupplyLimitModule, TransferRestrictModule,
    };
    use cct_core::CountryCode;

    fn owner() -> Address {
        wallet("compliance-owner")
    }

    fn token() -> Address {
        wallet("token")
    }

    fn engine(fx: &Fixture) -> ModularCompliance {
        let engine = ModularCompliance::new(fx.compliance, owner(), fx.fhe.clone());
        engine.bind_token(&token(), token()).unwrap();
        engine
    }

    fn check(fx: &Fixture, engine: &ModularCompliance, from: &str, to: &str, amount: u64) -> u64 {
        let verdict = engine
            .module_check(&token(), &fx.registry, &wallet(from), &wallet(to), &fx.amount(amount))
            .unwrap();
        fx.decrypt(&verdict)
    }

    // ── Token binding ────────────────────────────────────────────────

    #[test]
    fn test_token_binds_itself_once() {
        let fx = Fixture::new();
        let engine = engine(&fx);
        assert_eq!(engine.get_token_bound(), Some(token()));
        let other = wallet("other-token");
        assert_eq!(
            engine.bind_token(&other, other).unwrap_err(),
            ComplianceError::TokenAlreadyBound { token: token() }
        );
        // The owner may rebind.
        engine.bind_token(&owner(), other).unwrap();
        assert_eq!(engine.get_token_bound(), Some(other));
    }

    #[test]
    fn test_stranger_cannot_bind_for_token() {
        let fx = Fixture::new();
        let engine = ModularCompliance::new(fx.compliance, owner(), fx.fhe.clone());
        assert!(matches!(
            engine.bind_token(&wallet("stranger"), token()),
            Err(ComplianceError::Unauthorized { .. })
        ));
    }

    #[test]
    fn test_unbind_token() {
        let fx = Fixture::new();
        let engine = engine(&fx);
        assert_eq!(
            engine.unbind_token(&owner(), wallet("other")).unwrap_err(),
            ComplianceError::TokenNotBound {
                token: wallet("other")
            }
        );
        engine.unbind_token(&token(), token()).unwrap();
        assert_eq!(engine.get_token_bound(), None);
        assert_eq!(
            engine.events().last().map(|r| r.event.kind()),
            Some("TokenUnbound")
        );
    }

    #[test]
    fn test_token_operations_require_bound_token() {
        let fx = Fixture::new();
        let engine = engine(&fx);
        assert!(matches!(
            engine.module_check(
                &wallet("stranger"),
                &fx.registry,
                &wallet("alice"),
                &wallet("bob"),
                &fx.amount(1)
            ),
            Err(ComplianceError::Unauthorized { .. })
        ));
        assert!(matches!(
            engine.created(&owner(), &fx.registry, &wallet("alice"), &fx.amount(1)),
            Err(ComplianceError::Unauthorized { .. })
        ));
    }

    // ── Module set ───────────────────────────────────────────────────

    #[test]
    fn test_add_and_remove_module() {
        let fx = Fixture::new();
        let engine = engine(&fx);
        let module = Arc::new(CountryRestrictModule::new(wallet("cr")));
        engine.add_module(&owner(), module.clone()).unwrap();
        assert!(engine.is_module_bound(&wallet("cr")));
        assert!(module.is_compliance_bound(&fx.compliance));
        assert_eq!(engine.get_modules(), vec![wallet("cr")]);

        engine.remove_module(&owner(), &wallet("cr")).unwrap();
        assert!(!engine.is_module_bound(&wallet("cr")));
        assert!(!module.is_compliance_bound(&fx.compliance));
        assert_eq!(
            engine.remove_module(&owner(), &wallet("cr")).unwrap_err(),
            ComplianceError::ModuleNotBound {
                module: wallet("cr")
            }
        );
    }

    #[test]
    fn test_duplicate_module_rejected() {
        let fx = Fixture::new();
        let engine = engine(&fx);
        let module = Arc::new(CountryRestrictModule::new(wallet("cr")));
        engine.add_module(&owner(), module.clone()).unwrap();
        assert_eq!(
            engine.add_module(&owner(), module).unwrap_err(),
            ComplianceError::ModuleAlreadyBound {
                module: wallet("cr")
            }
        );
    }

    #[test]
    fn test_module_capacity() {
        let fx = Fixture::new();
        let engine = ModularCompliance::with_config(
            fx.compliance,
            owner(),
            fx.fhe.clone(),
            ComplianceConfig { max_modules: 2 },
        );
        for i in 0..2 {
            engine
                .add_module(&owner(), Arc::new(TransferRestrictModule::new(wallet(&format!("m{i}")))))
                .unwrap();
        }
        assert_eq!(
            engine
                .add_module(&owner(), Arc::new(TransferRestrictModule::new(wallet("m2"))))
                .unwrap_err(),
            ComplianceError::ModuleLimitReached { max: 2 }
        );
    }

    #[test]
    fn test_default_capacity_is_thirty() {
        let fx = Fixture::new();
        let engine = engine(&fx);
        for i in 0..30 {
            engine
                .add_module(&owner(), Arc::new(SupplyLimitModule::new(wallet(&format!("s{i}")))))
                .unwrap();
        }
        assert!(matches!(
            engine.add_module(&owner(), Arc::new(SupplyLimitModule::new(wallet("s30")))),
            Err(ComplianceError::ModuleLimitReached { max: 30 })
        ));
    }

    #[test]
    fn test_non_owner_cannot_manage_modules() {
        let fx = Fixture::new();
        let engine = engine(&fx);
        let intruder = wallet("intruder");
        assert!(matches!(
            engine.add_module(&intruder, Arc::new(CountryRestrictModule::new(wallet("cr")))),
            Err(ComplianceError::Unauthorized { .. })
        ));
        assert!(matches!(
            engine.call_module_function(
                &intruder,
                &wallet("cr"),
                ModuleCall::AddCountryRestriction(CountryCode(1))
            ),
            Err(ComplianceError::Unauthorized { .. })
        ));
    }

    #[test]
    fn test_preset_gate_blocks_binding() {
        let fx = Fixture::new();
        let engine = engine(&fx);
        let module = Arc::new(MaxBalanceModule::new(wallet("mb")));
        assert_eq!(
            engine.add_module(&owner(), module.clone()).unwrap_err(),
            ComplianceError::ModuleCannotBind {
                module: wallet("mb"),
                compliance: fx.compliance
            }
        );
        module.preset_completed(&owner(), &engine).unwrap();
        engine.add_module(&owner(), module).unwrap();
        assert!(engine.is_module_bound(&wallet("mb")));
    }

    #[test]
    fn test_unbind_keeps_module_state() {
        let fx = Fixture::new();
        let engine = engine(&fx);
        let module = Arc::new(CountryRestrictModule::new(wallet("cr")));
        engine.add_module(&owner(), module.clone()).unwrap();
        engine
            .call_module_function(
                &owner(),
                &wallet("cr"),
                ModuleCall::AddCountryRestriction(CountryCode(42)),
            )
            .unwrap();
        engine.remove_module(&owner(), &wallet("cr")).unwrap();
        assert!(module.is_country_restricted(&fx.compliance, CountryCode(42)));
    }

    // ── Admin forwarding ─────────────────────────────────────────────

    #[test]
    fn test_call_module_function_emits_interaction() {
        let fx = Fixture::new();
        let engine = engine(&fx);
        engine
            .add_module(&owner(), Arc::new(CountryRestrictModule::new(wallet("cr"))))
            .unwrap();
        engine
            .call_module_function(
                &owner(),
                &wallet("cr"),
                ModuleCall::AddCountryRestriction(CountryCode(42)),
            )
            .unwrap();
        assert_eq!(
            engine.events().last().map(|r| r.event.clone()),
            Some(ComplianceEvent::ModuleInteraction {
                module: wallet("cr"),
                selector: "addCountryRestriction".to_string()
            })
        );
    }

    #[test]
    fn test_call_unbound_module_rejected() {
        let fx = Fixture::new();
        let engine = engine(&fx);
        assert_eq!(
            engine
                .call_module_function(
                    &owner(),
                    &wallet("cr"),
                    ModuleCall::AddCountryRestriction(CountryCode(1))
                )
                .unwrap_err(),
            ComplianceError::ModuleNotBound {
                module: wallet("cr")
            }
        );
    }

    #[test]
    fn test_failed_module_call_emits_nothing() {
        let fx = Fixture::new();
        let engine = engine(&fx);
        engine
            .add_module(&owner(), Arc::new(CountryRestrictModule::new(wallet("cr"))))
            .unwrap();
        let before = engine.events().len();
        assert!(engine
            .call_module_function(
                &owner(),
                &wallet("cr"),
                ModuleCall::RemoveCountryRestriction(CountryCode(7))
            )
            .is_err());
        assert_eq!(engine.events().len(), before);
    }

    #[test]
    fn test_transfer_ownership() {
        let fx = Fixture::new();
        let engine = engine(&fx);
        let next = wallet("next-owner");
        engine.transfer_ownership(&owner(), next).unwrap();
        assert_eq!(engine.owner(), next);
        assert!(engine.transfer_ownership(&owner(), owner()).is_err());
        assert_eq!(
            engine.transfer_ownership(&next, Address::ZERO).unwrap_err(),
            ComplianceError::ZeroAddress("new owner")
        );
    }

    // ── Verdict reduction ────────────────────────────────────────────

    #[test]
    fn test_no_modules_passes() {
        let fx = Fixture::new();
        let engine = engine(&fx);
        assert_eq!(check(&fx, &engine, "alice", "bob", 10), 1);
    }

    #[test]
    fn test_verdict_is_and_of_modules() {
        let fx = Fixture::new();
        let engine = engine(&fx);
        engine
            .add_module(&owner(), Arc::new(CountryRestrictModule::new(wallet("cr"))))
            .unwrap();
        engine
            .add_module(&owner(), Arc::new(TransferRestrictModule::new(wallet("tr"))))
            .unwrap();
        engine
            .call_module_function(&owner(), &wallet("cr"), ModuleCall::AddCountryRestriction(CountryCode(42)))
            .unwrap();
        engine
            .call_module_function(&owner(), &wallet("tr"), ModuleCall::AllowUser(wallet("alice")))
            .unwrap();
        assert_eq!(check(&fx, &engine, "alice", "bob", 1), 1);
        // carol is in the restricted country.
        assert_eq!(check(&fx, &engine, "alice", "carol", 1), 0);
        // Neither party allow-listed.
        assert_eq!(check(&fx, &engine, "bob", "carol", 1), 0);
    }

    #[test]
    fn test_check_op_count_independent_of_verdict() {
        let fx = Fixture::new();
        let engine = engine(&fx);
        engine
            .add_module(&owner(), Arc::new(CountryRestrictModule::new(wallet("cr"))))
            .unwrap();
        engine
            .call_module_function(&owner(), &wallet("cr"), ModuleCall::AddCountryRestriction(CountryCode(42)))
            .unwrap();
        fx.backend.take_trace();
        check(&fx, &engine, "alice", "bob", 1);
        let passing = fx.backend.take_trace();
        check(&fx, &engine, "alice", "carol", 1);
        let failing = fx.backend.take_trace();
        assert_eq!(passing, failing);
    }

    #[test]
    fn test_hooks_fan_out() {
        let fx = Fixture::new();
        let engine = engine(&fx);
        let supply = Arc::new(SupplyLimitModule::new(wallet("sl")));
        engine.add_module(&owner(), supply.clone()).unwrap();
        engine
            .preflight(&token(), &fx.registry, &ModuleAction::Mint { to: wallet("alice") })
            .unwrap();
        engine
            .created(&token(), &fx.registry, &wallet("alice"), &fx.amount(25))
            .unwrap();
        engine
            .destroyed(&token(), &fx.registry, &wallet("alice"), &fx.amount(5))
            .unwrap();
        engine
            .transferred(&token(), &fx.registry, &wallet("alice"), &wallet("bob"), &fx.amount(5))
            .unwrap();
        assert_eq!(fx.decrypt(&supply.get_total_supply(&fx.compliance)), 20);
    }

    #[test]
    fn test_event_kinds() {
        let fx = Fixture::new();
        let engine = engine(&fx);
        engine
            .add_module(&owner(), Arc::new(CountryRestrictModule::new(wallet("cr"))))
            .unwrap();
        engine.remove_module(&owner(), &wallet("cr")).unwrap();
        let kinds: Vec<&str> = engine.events().iter().map(|r| r.event.kind()).collect();
        assert_eq!(kinds, vec!["TokenBound", "ModuleAdded", "ModuleRemoved"]);
    }
}
