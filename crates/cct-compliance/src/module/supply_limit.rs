//! # Supply Limit Module
//!
//! Caps the encrypted total supply a compliance's token may reach. The
//! module keeps its own running total from the mint and burn hooks and
//! binds without a preset: the count starts at the token's genesis.
//!
//! Only mints are capped. Whether an action is a mint is public (the
//! sender is the zero address), so branching on it leaks nothing.

use std::collections::HashMap;

use parking_lot::RwLock;

use cct_core::{Address, EventRecord};
use cct_fhe::{EncryptedAmount, EncryptedBit};

use super::{
    AdminContext, ComplianceModule, EncryptedInput, ModuleAction, ModuleBase, ModuleCall, ModuleContext,
    ModuleEvent,
};
use crate::error::ComplianceError;

const NAME: &str = "SupplyLimitModule";

#[derive(Debug, Default)]
struct State {
    base: ModuleBase,
    limit: HashMap<Address, EncryptedAmount>,
    supply: HashMap<Address, EncryptedAmount>,
}

impl State {
    fn supply(&self, compliance: &Address) -> EncryptedAmount {
        self.supply.get(compliance).copied().unwrap_or_default()
    }
}

/// Encrypted cap on total supply.
#[derive(Debug)]
pub struct SupplyLimitModule {
    address: Address,
    state: RwLock<State>,
}

impl SupplyLimitModule {
    /// Create the module at `address`.
    pub fn new(address: Address) -> Self {
        Self {
            address,
            state: RwLock::new(State::default()),
        }
    }

    /// The encrypted limit of `compliance`, if one was set.
    pub fn get_supply_limit(&self, compliance: &Address) -> Option<EncryptedAmount> {
        self.state.read().limit.get(compliance).copied()
    }

    /// The running encrypted supply seen by the module for `compliance`.
    pub fn get_total_supply(&self, compliance: &Address) -> EncryptedAmount {
        self.state.read().supply(compliance)
    }

    fn set_supply_limit(&self, ctx: &AdminContext<'_>, value: &EncryptedInput) -> Result<(), ComplianceError> {
        let limit = value.verify(ctx.fhe, &self.address, &ctx.compliance)?;
        ctx.fhe.allow_many(&limit, &[self.address, ctx.compliance]);
        let mut state = self.state.write();
        state.limit.insert(ctx.compliance, limit);
        state.base.events.emit(ModuleEvent::SupplyLimitSet {
            compliance: ctx.compliance,
            limit: limit.handle(),
        });
        tracing::info!(compliance = %ctx.compliance, "supply limit set");
        Ok(())
    }

    fn update_supply(
        &self,
        ctx: &ModuleContext<'_>,
        amount: &EncryptedAmount,
        mint: bool,
    ) -> Result<(), ComplianceError> {
        let mut state = self.state.write();
        state.base.require_bound(NAME, &ctx.compliance)?;
        let current = state.supply(&ctx.compliance);
        let next = if mint {
            ctx.fhe.add(&current, amount)
        } else {
            ctx.fhe.sub(&current, amount)
        };
        ctx.fhe.allow_many(&next, &[self.address, ctx.compliance]);
        state.supply.insert(ctx.compliance, next);
        Ok(())
    }
}

impl ComplianceModule for SupplyLimitModule {
    fn name(&self) -> &'static str {
        NAME
    }

    fn address(&self) -> Address {
        self.address
    }

    fn is_plug_and_play(&self) -> bool {
        true
    }

    fn can_compliance_bind(&self, _compliance: &Address) -> bool {
        true
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
        from: &Address,
        _to: &Address,
        amount: &EncryptedAmount,
    ) -> Result<EncryptedBit, ComplianceError> {
        if !from.is_zero() {
            return Ok(ctx.fhe.bit(true));
        }
        let (supply, limit) = {
            let state = self.state.read();
            (state.supply(&ctx.compliance), state.limit.get(&ctx.compliance).copied())
        };
        let limit = limit.unwrap_or_else(|| ctx.fhe.constant(u64::MAX));
        let projected = ctx.fhe.add(&supply, amount);
        Ok(ctx.fhe.le(&projected, &limit))
    }

    fn preflight(&self, ctx: &ModuleContext<'_>, _action: &ModuleAction) -> Result<(), ComplianceError> {
        self.state.read().base.require_bound(NAME, &ctx.compliance)
    }

    fn module_mint_action(
        &self,
        ctx: &ModuleContext<'_>,
        _to: &Address,
        amount: &EncryptedAmount,
    ) -> Result<(), ComplianceError> {
        self.update_supply(ctx, amount, true)
    }

    fn module_burn_action(
        &self,
        ctx: &ModuleContext<'_>,
        _from: &Address,
        amount: &EncryptedAmount,
    ) -> Result<(), ComplianceError> {
        self.update_supply(ctx, amount, false)
    }

    fn module_transfer_action(
        &self,
        ctx: &ModuleContext<'_>,
        _from: &Address,
        _to: &Address,
        _amount: &EncryptedAmount,
    ) -> Result<(), ComplianceError> {
        self.state.read().base.require_bound(NAME, &ctx.compliance)
    }

    fn call(&self, ctx: &AdminContext<'_>, call: ModuleCall) -> Result<(), ComplianceError> {
        self.state.read().base.require_bound(NAME, &ctx.compliance)?;
        match call {
            ModuleCall::SetSupplyLimit(value) => self.set_supply_limit(ctx, &value),
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

    fn bound_module(fx: &Fixture, limit: Option<u64>) -> SupplyLimitModule {
        let module = SupplyLimitModule::new(wallet("supply-limit"));
        module.bind_compliance(&fx.compliance).unwrap();
        if let Some(limit) = limit {
            let input = fx.input_for(&module.address(), &fx.compliance, limit);
            module
                .call(&fx.admin(), ModuleCall::SetSupplyLimit(input))
                .unwrap();
        }
        module
    }

    fn mint_verdict(fx: &Fixture, module: &SupplyLimitModule, amount: u64) -> u64 {
        let bit = module
            .module_check(&fx.ctx(), &Address::ZERO, &wallet("alice"), &fx.amount(amount))
            .unwrap();
        fx.decrypt(&bit)
    }

    #[test]
    fn test_unset_limit_is_unbounded() {
        let fx = Fixture::new();
        let module = bound_module(&fx, None);
        assert!(module.get_supply_limit(&fx.compliance).is_none());
        assert_eq!(mint_verdict(&fx, &module, u64::MAX), 1);
    }

    #[test]
    fn test_mint_checked_against_running_supply() {
        let fx = Fixture::new();
        let module = bound_module(&fx, Some(1_600));
        module
            .module_mint_action(&fx.ctx(), &wallet("alice"), &fx.amount(1_500))
            .unwrap();
        assert_eq!(mint_verdict(&fx, &module, 101), 0);
        assert_eq!(mint_verdict(&fx, &module, 100), 1);
    }

    #[test]
    fn test_transfers_are_not_capped() {
        let fx = Fixture::new();
        let module = bound_module(&fx, Some(0));
        let bit = module
            .module_check(&fx.ctx(), &wallet("alice"), &wallet("bob"), &fx.amount(10))
            .unwrap();
        assert_eq!(fx.decrypt(&bit), 1);
    }

    #[test]
    fn test_burn_reduces_supply() {
        let fx = Fixture::new();
        let module = bound_module(&fx, Some(100));
        module
            .module_mint_action(&fx.ctx(), &wallet("alice"), &fx.amount(100))
            .unwrap();
        module
            .module_burn_action(&fx.ctx(), &wallet("alice"), &fx.amount(40))
            .unwrap();
        assert_eq!(fx.decrypt(&module.get_total_supply(&fx.compliance)), 60);
        assert_eq!(mint_verdict(&fx, &module, 40), 1);
        assert_eq!(mint_verdict(&fx, &module, 41), 0);
    }

    #[test]
    fn test_transfer_hook_leaves_supply() {
        let fx = Fixture::new();
        let module = bound_module(&fx, None);
        module
            .module_mint_action(&fx.ctx(), &wallet("alice"), &fx.amount(5))
            .unwrap();
        module
            .module_transfer_action(&fx.ctx(), &wallet("alice"), &wallet("bob"), &fx.amount(5))
            .unwrap();
        assert_eq!(fx.decrypt(&module.get_total_supply(&fx.compliance)), 5);
    }

    #[test]
    fn test_hooks_require_binding() {
        let fx = Fixture::new();
        let module = SupplyLimitModule::new(wallet("m"));
        assert!(matches!(
            module.module_mint_action(&fx.ctx(), &wallet("alice"), &fx.amount(1)),
            Err(ComplianceError::ComplianceNotBound { .. })
        ));
    }

    #[test]
    fn test_limit_event_carries_handle_only() {
        let fx = Fixture::new();
        let module = bound_module(&fx, Some(1_000));
        let limit = module.get_supply_limit(&fx.compliance).unwrap();
        let last = module.events().pop().unwrap().event;
        assert_eq!(
            last,
            ModuleEvent::SupplyLimitSet {
                compliance: fx.compliance,
                limit: limit.handle()
            }
        );
    }
}
