//! # Max Balance Module
//!
//! Caps the encrypted balance any single identity may hold under a
//! compliance. Balances are tracked per identity, not per wallet, so that
//! a recovered wallet inherits the counters of the lost one.
//!
//! ## Preset
//!
//! A token that already has holders cannot start evaluating caps against
//! zero balances. Before the module may bind, the compliance owner seeds
//! historical identity balances with [`MaxBalanceModule::pre_set_module_state`]
//! and closes the window with [`MaxBalanceModule::preset_completed`].
//! Once closed, preset is closed for good.
//!
//! ## Security Invariant
//!
//! `module_check` never writes. Hooks only ever see the effective amount
//! chosen by the token, so a rejected request does not move a counter.

use std::collections::{HashMap, HashSet};

use parking_lot::RwLock;

use cct_core::{Address, EventRecord, IdentityId};
use cct_fhe::{EncryptedAmount, EncryptedBit, Fhe};

use super::{
    identity_of, AdminContext, ComplianceModule, EncryptedInput, ModuleAction, ModuleBase,
    ModuleCall, ModuleContext, ModuleEvent,
};
use crate::config::{check_batch, MAX_PRESET_BATCH};
use crate::engine::ModularCompliance;
use crate::error::ComplianceError;

const NAME: &str = "MaxBalanceModule";

#[derive(Debug, Default)]
struct State {
    base: ModuleBase,
    max_balance: HashMap<Address, EncryptedAmount>,
    id_balance: HashMap<(Address, IdentityId), EncryptedAmount>,
    preset_completed: HashSet<Address>,
}

impl State {
    fn id_balance(&self, compliance: &Address, identity: &IdentityId) -> EncryptedAmount {
        self.id_balance
            .get(&(*compliance, *identity))
            .copied()
            .unwrap_or_default()
    }

    fn max_balance(&self, compliance: &Address) -> EncryptedAmount {
        self.max_balance.get(compliance).copied().unwrap_or_default()
    }

    /// Presets are accepted until the compliance binds or closes them.
    fn require_preset_open(&self, compliance: &Address) -> Result<(), ComplianceError> {
        if self.base.is_bound(compliance) {
            return Err(ComplianceError::PresetAfterBind {
                compliance: *compliance,
            });
        }
        if self.preset_completed.contains(compliance) {
            return Err(ComplianceError::PresetAlreadyCompleted {
                compliance: *compliance,
            });
        }
        Ok(())
    }
}

/// Encrypted per-identity balance cap.
#[derive(Debug)]
pub struct MaxBalanceModule {
    address: Address,
    state: RwLock<State>,
}

impl MaxBalanceModule {
    /// Create the module at `address`.
    pub fn new(address: Address) -> Self {
        Self {
            address,
            state: RwLock::new(State::default()),
        }
    }

    /// The encrypted balance tracked for `identity` under `compliance`.
    /// Unknown identities hold the uninitialized handle, which reads as zero.
    pub fn get_id_balance(&self, compliance: &Address, identity: &IdentityId) -> EncryptedAmount {
        self.state.read().id_balance(compliance, identity)
    }

    /// The encrypted cap of `compliance`. Unset caps read as zero.
    pub fn get_max_balance(&self, compliance: &Address) -> EncryptedAmount {
        self.state.read().max_balance(compliance)
    }

    /// Whether the preset window of `compliance` is closed.
    pub fn is_preset_completed(&self, compliance: &Address) -> bool {
        self.state.read().preset_completed.contains(compliance)
    }

    // ─── Preset ──────────────────────────────────────────────────────

    /// Seed the balance of one identity before the module binds.
    ///
    /// The input proof must bind the ciphertext to this module and to the
    /// compliance owner submitting it.
    pub fn pre_set_module_state(
        &self,
        caller: &Address,
        compliance: &ModularCompliance,
        identity: IdentityId,
        value: &EncryptedInput,
    ) -> Result<(), ComplianceError> {
        self.batch_pre_set_module_state(caller, compliance, &[identity], std::slice::from_ref(value))
    }

    /// Seed many identity balances in one all-or-nothing call.
    pub fn batch_pre_set_module_state(
        &self,
        caller: &Address,
        compliance: &ModularCompliance,
        identities: &[IdentityId],
        values: &[EncryptedInput],
    ) -> Result<(), ComplianceError> {
        require_compliance_owner(caller, compliance)?;
        let key = compliance.address();
        let mut state = self.state.write();
        state.require_preset_open(&key)?;
        check_batch(identities.len(), MAX_PRESET_BATCH)?;
        if identities.len() != values.len() {
            return Err(ComplianceError::LengthMismatch {
                left: identities.len(),
                right: values.len(),
            });
        }
        if identities.iter().any(|id| id.as_address().is_zero()) {
            return Err(ComplianceError::ZeroAddress("identity"));
        }

        let fhe = compliance.fhe();
        let verified = values
            .iter()
            .map(|v| v.verify(fhe, &self.address, caller))
            .collect::<Result<Vec<_>, _>>()?;

        for (identity, balance) in identities.iter().zip(verified) {
            fhe.allow_many(&balance, &[self.address, key]);
            state.id_balance.insert((key, *identity), balance);
            state.base.events.emit(ModuleEvent::IdBalancePreSet {
                compliance: key,
                identity: *identity,
                balance: balance.handle(),
            });
        }
        tracing::info!(compliance = %key, count = identities.len(), "identity balances preset");
        Ok(())
    }

    /// Close the preset window of `compliance`. The module may bind after
    /// this, and preset calls fail from now on.
    pub fn preset_completed(
        &self,
        caller: &Address,
        compliance: &ModularCompliance,
    ) -> Result<(), ComplianceError> {
        require_compliance_owner(caller, compliance)?;
        let key = compliance.address();
        let mut state = self.state.write();
        state.require_preset_open(&key)?;
        state.preset_completed.insert(key);
        state
            .base
            .events
            .emit(ModuleEvent::PresetCompleted { compliance: key });
        tracing::info!(compliance = %key, "preset completed");
        Ok(())
    }

    // ─── Cap updates ─────────────────────────────────────────────────

    fn set_max_balance(&self, ctx: &AdminContext<'_>, value: &EncryptedInput) -> Result<(), ComplianceError> {
        let cap = value.verify(ctx.fhe, &self.address, &ctx.compliance)?;
        ctx.fhe.allow_many(&cap, &[self.address, ctx.compliance]);
        let mut state = self.state.write();
        state.max_balance.insert(ctx.compliance, cap);
        state.base.events.emit(ModuleEvent::MaxBalanceSet {
            compliance: ctx.compliance,
            max_balance: cap.handle(),
        });
        tracing::info!(compliance = %ctx.compliance, "max balance set");
        Ok(())
    }

    /// Store a new identity balance and grant it to the module and the
    /// compliance.
    fn store(
        &self,
        state: &mut State,
        fhe: &Fhe,
        compliance: &Address,
        identity: IdentityId,
        balance: EncryptedAmount,
    ) {
        fhe.allow_many(&balance, &[self.address, *compliance]);
        state.id_balance.insert((*compliance, identity), balance);
    }
}

fn require_compliance_owner(caller: &Address, compliance: &ModularCompliance) -> Result<(), ComplianceError> {
    if *caller != compliance.owner() {
        return Err(ComplianceError::Unauthorized {
            caller: *caller,
            required: "compliance owner",
        });
    }
    Ok(())
}

impl ComplianceModule for MaxBalanceModule {
    fn name(&self) -> &'static str {
        NAME
    }

    fn address(&self) -> Address {
        self.address
    }

    fn is_plug_and_play(&self) -> bool {
        false
    }

    fn can_compliance_bind(&self, compliance: &Address) -> bool {
        self.is_preset_completed(compliance)
    }

    fn is_compliance_bound(&self, compliance: &Address) -> bool {
        self.state.read().base.is_bound(compliance)
    }

    fn bind_compliance(&self, compliance: &Address) -> Result<(), ComplianceError> {
        self.state.write().base.bind(NAME, compliance)
    }

    fn unbind_compliance(&self, compliance: &Address) -> Result<(), ComplianceError> {
        self.state.write().base.unbind(NAME, compliance)
    }

    fn module_check(
        &self,
        ctx: &ModuleContext<'_>,
        _from: &Address,
        to: &Address,
        amount: &EncryptedAmount,
    ) -> Result<EncryptedBit, ComplianceError> {
        let identity = identity_of(ctx.registry, to)?;
        let (current, cap) = {
            let state = self.state.read();
            (
                state.id_balance(&ctx.compliance, &identity),
                state.max_balance(&ctx.compliance),
            )
        };
        let projected = ctx.fhe.add(&current, amount);
        Ok(ctx.fhe.le(&projected, &cap))
    }

    fn preflight(&self, ctx: &ModuleContext<'_>, action: &ModuleAction) -> Result<(), ComplianceError> {
        self.state.read().base.require_bound(NAME, &ctx.compliance)?;
        match action {
            ModuleAction::Mint { to } => identity_of(ctx.registry, to).map(|_| ()),
            ModuleAction::Burn { from } => identity_of(ctx.registry, from).map(|_| ()),
            ModuleAction::Transfer { from, to } => {
                identity_of(ctx.registry, from)?;
                identity_of(ctx.registry, to).map(|_| ())
            }
        }
    }

    fn module_mint_action(
        &self,
        ctx: &ModuleContext<'_>,
        to: &Address,
        amount: &EncryptedAmount,
    ) -> Result<(), ComplianceError> {
        let mut state = self.state.write();
        state.base.require_bound(NAME, &ctx.compliance)?;
        let identity = identity_of(ctx.registry, to)?;
        let balance = ctx.fhe.add(&state.id_balance(&ctx.compliance, &identity), amount);
        self.store(&mut state, ctx.fhe, &ctx.compliance, identity, balance);
        Ok(())
    }

    fn module_burn_action(
        &self,
        ctx: &ModuleContext<'_>,
        from: &Address,
        amount: &EncryptedAmount,
    ) -> Result<(), ComplianceError> {
        let mut state = self.state.write();
        state.base.require_bound(NAME, &ctx.compliance)?;
        let identity = identity_of(ctx.registry, from)?;
        let balance = ctx.fhe.sub(&state.id_balance(&ctx.compliance, &identity), amount);
        self.store(&mut state, ctx.fhe, &ctx.compliance, identity, balance);
        Ok(())
    }

    fn module_transfer_action(
        &self,
        ctx: &ModuleContext<'_>,
        from: &Address,
        to: &Address,
        amount: &EncryptedAmount,
    ) -> Result<(), ComplianceError> {
        let mut state = self.state.write();
        state.base.require_bound(NAME, &ctx.compliance)?;
        let from_id = identity_of(ctx.registry, from)?;
        let to_id = identity_of(ctx.registry, to)?;

        let debited = ctx.fhe.sub(&state.id_balance(&ctx.compliance, &from_id), amount);
        self.store(&mut state, ctx.fhe, &ctx.compliance, from_id, debited);
        // Read back after the debit so a same-identity move nets to zero.
        let credited = ctx.fhe.add(&state.id_balance(&ctx.compliance, &to_id), amount);
        self.store(&mut state, ctx.fhe, &ctx.compliance, to_id, credited);
        Ok(())
    }

    fn call(&self, ctx: &AdminContext<'_>, call: ModuleCall) -> Result<(), ComplianceError> {
        self.state.read().base.require_bound(NAME, &ctx.compliance)?;
        match call {
            ModuleCall::SetMaxBalance(value) => self.set_max_balance(ctx, &value),
            other => Err(ComplianceError::UnsupportedCall {
                module: NAME,
                call: other.name(),
            }),
        }
    }

    fn events(&self) -> Vec<EventRecord<ModuleEvent>> {
        self.state.read().base.events.records().to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::testing::{wallet, Fixture};

    fn owner() -> Address {
        wallet("compliance-owner")
    }

    fn engine(fx: &Fixture) -> ModularCompliance {
        ModularCompliance::new(fx.compliance, owner(), fx.fhe.clone())
    }

    /// A module bound directly (bypassing the engine) with its preset closed.
    fn live_module(fx: &Fixture, cap: u64) -> MaxBalanceModule {
        let engine = engine(fx);
        let module = MaxBalanceModule::new(wallet("max-balance"));
        module.preset_completed(&owner(), &engine).unwrap();
        module.bind_compliance(&fx.compliance).unwrap();
        let input = fx.input_for(&module.address(), &fx.compliance, cap);
        module
            .call(&fx.admin(), ModuleCall::SetMaxBalance(input))
            .unwrap();
        module
    }

    fn alice_id() -> IdentityId {
        IdentityId::from_label("alice")
    }

    // ── Preset gate ──────────────────────────────────────────────────

    #[test]
    fn test_not_plug_and_play() {
        let fx = Fixture::new();
        let module = MaxBalanceModule::new(wallet("m"));
        assert!(!module.is_plug_and_play());
        assert!(!module.can_compliance_bind(&fx.compliance));
    }

    #[test]
    fn test_preset_then_complete_enables_binding() {
        let fx = Fixture::new();
        let engine = engine(&fx);
        let module = MaxBalanceModule::new(wallet("m"));
        let value = fx.input_for(&module.address(), &owner(), 70);
        module
            .pre_set_module_state(&owner(), &engine, alice_id(), &value)
            .unwrap();
        module.preset_completed(&owner(), &engine).unwrap();
        assert!(module.can_compliance_bind(&fx.compliance));
        assert_eq!(fx.decrypt(&module.get_id_balance(&fx.compliance, &alice_id())), 70);
    }

    #[test]
    fn test_preset_requires_owner() {
        let fx = Fixture::new();
        let engine = engine(&fx);
        let module = MaxBalanceModule::new(wallet("m"));
        let intruder = wallet("intruder");
        let value = fx.input_for(&module.address(), &intruder, 1);
        assert!(matches!(
            module.pre_set_module_state(&intruder, &engine, alice_id(), &value),
            Err(ComplianceError::Unauthorized { .. })
        ));
        assert!(matches!(
            module.preset_completed(&intruder, &engine),
            Err(ComplianceError::Unauthorized { .. })
        ));
    }

    #[test]
    fn test_preset_completed_twice_rejected() {
        let fx = Fixture::new();
        let engine = engine(&fx);
        let module = MaxBalanceModule::new(wallet("m"));
        module.preset_completed(&owner(), &engine).unwrap();
        assert_eq!(
            module.preset_completed(&owner(), &engine).unwrap_err(),
            ComplianceError::PresetAlreadyCompleted {
                compliance: fx.compliance
            }
        );
    }

    #[test]
    fn test_preset_window_closes_exactly_once() {
        let fx = Fixture::new();
        let engine = engine(&fx);
        let module = MaxBalanceModule::new(wallet("m"));
        module.preset_completed(&owner(), &engine).unwrap();
        let _ = module.preset_completed(&owner(), &engine);
        let closed = module
            .events()
            .iter()
            .filter(|r| matches!(r.event, ModuleEvent::PresetCompleted { .. }))
            .count();
        assert_eq!(closed, 1);
    }

    #[test]
    fn test_preset_after_completion_rejected() {
        let fx = Fixture::new();
        let engine = engine(&fx);
        let module = MaxBalanceModule::new(wallet("m"));
        module.preset_completed(&owner(), &engine).unwrap();
        let value = fx.input_for(&module.address(), &owner(), 5);
        assert!(matches!(
            module.pre_set_module_state(&owner(), &engine, alice_id(), &value),
            Err(ComplianceError::PresetAlreadyCompleted { .. })
        ));
        assert_eq!(
            fx.decrypt(&module.get_id_balance(&fx.compliance, &alice_id())),
            0
        );
    }

    #[test]
    fn test_preset_after_bind_rejected() {
        let fx = Fixture::new();
        let module = live_module(&fx, 100);
        let value = fx.input_for(&module.address(), &owner(), 5);
        assert!(matches!(
            module.pre_set_module_state(&owner(), &engine(&fx), alice_id(), &value),
            Err(ComplianceError::PresetAfterBind { .. })
        ));
    }

    #[test]
    fn test_preset_rejects_proof_for_other_user() {
        let fx = Fixture::new();
        let engine = engine(&fx);
        let module = MaxBalanceModule::new(wallet("m"));
        let value = fx.input_for(&module.address(), &wallet("someone-else"), 5);
        assert!(matches!(
            module.pre_set_module_state(&owner(), &engine, alice_id(), &value),
            Err(ComplianceError::Fhe(_))
        ));
    }

    // ── Batch preset ─────────────────────────────────────────────────

    #[test]
    fn test_batch_preset_length_mismatch() {
        let fx = Fixture::new();
        let engine = engine(&fx);
        let module = MaxBalanceModule::new(wallet("m"));
        let value = fx.input_for(&module.address(), &owner(), 5);
        let err = module
            .batch_pre_set_module_state(
                &owner(),
                &engine,
                &[alice_id(), IdentityId::from_label("bob")],
                &[value],
            )
            .unwrap_err();
        assert_eq!(err, ComplianceError::LengthMismatch { left: 2, right: 1 });
    }

    #[test]
    fn test_batch_preset_is_all_or_nothing() {
        let fx = Fixture::new();
        let engine = engine(&fx);
        let module = MaxBalanceModule::new(wallet("m"));
        let good = fx.input_for(&module.address(), &owner(), 5);
        let bad = fx.input_for(&wallet("other-module"), &owner(), 6);
        let bob = IdentityId::from_label("bob");
        assert!(module
            .batch_pre_set_module_state(&owner(), &engine, &[alice_id(), bob], &[good, bad])
            .is_err());
        assert!(module
            .get_id_balance(&fx.compliance, &alice_id())
            .is_uninitialized());
        assert!(module.events().is_empty());
    }

    #[test]
    fn test_batch_preset_limits() {
        let fx = Fixture::new();
        let engine = engine(&fx);
        let module = MaxBalanceModule::new(wallet("m"));
        assert_eq!(
            module
                .batch_pre_set_module_state(&owner(), &engine, &[], &[])
                .unwrap_err(),
            ComplianceError::EmptyBatch
        );
        let ids: Vec<IdentityId> = (0..501)
            .map(|i| IdentityId::from_label(&format!("id-{i}")))
            .collect();
        let values: Vec<EncryptedInput> = (0..501)
            .map(|_| fx.input_for(&module.address(), &owner(), 1))
            .collect();
        assert!(matches!(
            module.batch_pre_set_module_state(&owner(), &engine, &ids, &values),
            Err(ComplianceError::BatchTooLarge { len: 501, max: 500 })
        ));
    }

    #[test]
    fn test_batch_preset_emits_per_identity() {
        let fx = Fixture::new();
        let engine = engine(&fx);
        let module = MaxBalanceModule::new(wallet("m"));
        let bob = IdentityId::from_label("bob");
        let values = vec![
            fx.input_for(&module.address(), &owner(), 10),
            fx.input_for(&module.address(), &owner(), 20),
        ];
        module
            .batch_pre_set_module_state(&owner(), &engine, &[alice_id(), bob], &values)
            .unwrap();
        let kinds = module
            .events()
            .into_iter()
            .filter(|r| matches!(r.event, ModuleEvent::IdBalancePreSet { .. }))
            .count();
        assert_eq!(kinds, 2);
        assert_eq!(fx.decrypt(&module.get_id_balance(&fx.compliance, &bob)), 20);
    }

    // ── Check and hooks ──────────────────────────────────────────────

    #[test]
    fn test_check_compares_projected_balance() {
        let fx = Fixture::new();
        let module = live_module(&fx, 150);
        let ok = module
            .module_check(&fx.ctx(), &Address::ZERO, &wallet("alice"), &fx.amount(150))
            .unwrap();
        let over = module
            .module_check(&fx.ctx(), &Address::ZERO, &wallet("alice"), &fx.amount(151))
            .unwrap();
        assert_eq!(fx.decrypt(&ok), 1);
        assert_eq!(fx.decrypt(&over), 0);
    }

    #[test]
    fn test_check_does_not_mutate() {
        let fx = Fixture::new();
        let module = live_module(&fx, 150);
        module
            .module_check(&fx.ctx(), &Address::ZERO, &wallet("alice"), &fx.amount(100))
            .unwrap();
        assert!(module
            .get_id_balance(&fx.compliance, &alice_id())
            .is_uninitialized());
    }

    #[test]
    fn test_unset_cap_rejects_any_positive_amount() {
        let fx = Fixture::new();
        let engine = engine(&fx);
        let module = MaxBalanceModule::new(wallet("m"));
        module.preset_completed(&owner(), &engine).unwrap();
        module.bind_compliance(&fx.compliance).unwrap();
        let verdict = module
            .module_check(&fx.ctx(), &Address::ZERO, &wallet("alice"), &fx.amount(1))
            .unwrap();
        assert_eq!(fx.decrypt(&verdict), 0);
    }

    #[test]
    fn test_hooks_track_identity_balances() {
        let fx = Fixture::new();
        let module = live_module(&fx, 1_000);
        module
            .module_mint_action(&fx.ctx(), &wallet("alice"), &fx.amount(100))
            .unwrap();
        module
            .module_transfer_action(&fx.ctx(), &wallet("alice"), &wallet("bob"), &fx.amount(30))
            .unwrap();
        module
            .module_burn_action(&fx.ctx(), &wallet("bob"), &fx.amount(10))
            .unwrap();
        let bob = IdentityId::from_label("bob");
        assert_eq!(fx.decrypt(&module.get_id_balance(&fx.compliance, &alice_id())), 70);
        assert_eq!(fx.decrypt(&module.get_id_balance(&fx.compliance, &bob)), 20);
    }

    #[test]
    fn test_same_identity_transfer_nets_zero() {
        let fx = Fixture::new();
        let second = wallet("alice-second");
        fx.registry
            .register_identity(second, alice_id(), cct_core::CountryCode(250))
            .unwrap();
        let module = live_module(&fx, 1_000);
        module
            .module_mint_action(&fx.ctx(), &wallet("alice"), &fx.amount(100))
            .unwrap();
        module
            .module_transfer_action(&fx.ctx(), &wallet("alice"), &second, &fx.amount(40))
            .unwrap();
        assert_eq!(fx.decrypt(&module.get_id_balance(&fx.compliance, &alice_id())), 100);
    }

    #[test]
    fn test_balances_are_acl_granted_to_module_and_compliance() {
        let fx = Fixture::new();
        let module = live_module(&fx, 1_000);
        module
            .module_mint_action(&fx.ctx(), &wallet("alice"), &fx.amount(1))
            .unwrap();
        let balance = module.get_id_balance(&fx.compliance, &alice_id());
        assert!(fx.fhe.is_allowed(&balance, &module.address()));
        assert!(fx.fhe.is_allowed(&balance, &fx.compliance));
    }

    #[test]
    fn test_preflight_rejects_unknown_identity() {
        let fx = Fixture::new();
        let module = live_module(&fx, 1_000);
        assert!(matches!(
            module.preflight(&fx.ctx(), &ModuleAction::Mint { to: wallet("ghost") }),
            Err(ComplianceError::IdentityNotFound { .. })
        ));
        module
            .preflight(
                &fx.ctx(),
                &ModuleAction::Transfer {
                    from: wallet("alice"),
                    to: wallet("bob"),
                },
            )
            .unwrap();
    }

    #[test]
    fn test_set_max_balance_requires_proof_for_compliance() {
        let fx = Fixture::new();
        let module = live_module(&fx, 10);
        let wrong = fx.input_for(&module.address(), &wallet("not-compliance"), 500);
        assert!(matches!(
            module.call(&fx.admin(), ModuleCall::SetMaxBalance(wrong)),
            Err(ComplianceError::Fhe(_))
        ));
        assert_eq!(fx.decrypt(&module.get_max_balance(&fx.compliance)), 10);
    }
}
