//! # Transfer Restriction Module
//!
//! Per-compliance wallet allow-list. A transfer passes when the sender is
//! allow-listed, or otherwise when the receiver is. Membership is public.

use std::collections::{HashMap, HashSet};

use parking_lot::RwLock;

use cct_core::{Address, EventRecord};
use cct_fhe::{EncryptedAmount, EncryptedBit};

use super::{
    AdminContext, ComplianceModule, ModuleAction, ModuleBase, ModuleCall, ModuleContext, ModuleEvent,
};
use crate::config::{check_batch, MAX_USER_BATCH};
use crate::error::ComplianceError;

const NAME: &str = "TransferRestrictModule";

#[derive(Debug, Default)]
struct State {
    base: ModuleBase,
    allowed: HashMap<Address, HashSet<Address>>,
}

impl State {
    fn is_allowed(&self, compliance: &Address, user: &Address) -> bool {
        self.allowed
            .get(compliance)
            .is_some_and(|set| set.contains(user))
    }

    fn allow(&mut self, compliance: &Address, user: Address) {
        self.allowed.entry(*compliance).or_default().insert(user);
        self.base.events.emit(ModuleEvent::UserAllowed {
            compliance: *compliance,
            user,
        });
    }

    fn disallow(&mut self, compliance: &Address, user: Address) {
        if let Some(set) = self.allowed.get_mut(compliance) {
            set.remove(&user);
        }
        self.base.events.emit(ModuleEvent::UserDisallowed {
            compliance: *compliance,
            user,
        });
    }
}

/// Wallet allow-list for transfers.
#[derive(Debug)]
pub struct TransferRestrictModule {
    address: Address,
    state: RwLock<State>,
}

impl TransferRestrictModule {
    /// Create the module at `address`.
    pub fn new(address: Address) -> Self {
        Self {
            address,
            state: RwLock::new(State::default()),
        }
    }

    /// Whether `user` is allow-listed for `compliance`.
    pub fn is_user_allowed(&self, compliance: &Address, user: &Address) -> bool {
        self.state.read().is_allowed(compliance, user)
    }

    /// Allowing an already-allowed wallet is idempotent: the entry stays
    /// and the event is emitted again.
    fn update(&self, compliance: &Address, users: &[Address], allow: bool) -> Result<(), ComplianceError> {
        if users.iter().any(Address::is_zero) {
            return Err(ComplianceError::ZeroAddress("user"));
        }
        let mut state = self.state.write();
        for user in users {
            if allow {
                state.allow(compliance, *user);
            } else {
                state.disallow(compliance, *user);
            }
        }
        tracing::info!(%compliance, count = users.len(), allow, "transfer allow-list updated");
        Ok(())
    }

    fn update_batch(
        &self,
        compliance: &Address,
        users: &[Address],
        allow: bool,
    ) -> Result<(), ComplianceError> {
        check_batch(users.len(), MAX_USER_BATCH)?;
        self.update(compliance, users, allow)
    }
}

impl ComplianceModule for TransferRestrictModule {
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
        to: &Address,
        _amount: &EncryptedAmount,
    ) -> Result<EncryptedBit, ComplianceError> {
        let state = self.state.read();
        let allowed =
            state.is_allowed(&ctx.compliance, from) || state.is_allowed(&ctx.compliance, to);
        Ok(ctx.fhe.bit(allowed))
    }

    fn preflight(&self, ctx: &ModuleContext<'_>, _action: &ModuleAction) -> Result<(), ComplianceError> {
        self.state.read().base.require_bound(NAME, &ctx.compliance)
    }

    fn module_mint_action(
        &self,
        ctx: &ModuleContext<'_>,
        _to: &Address,
        _amount: &EncryptedAmount,
    ) -> Result<(), ComplianceError> {
        self.state.read().base.require_bound(NAME, &ctx.compliance)
    }

    fn module_burn_action(
        &self,
        ctx: &ModuleContext<'_>,
        _from: &Address,
        _amount: &EncryptedAmount,
    ) -> Result<(), ComplianceError> {
        self.state.read().base.require_bound(NAME, &ctx.compliance)
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
            ModuleCall::AllowUser(user) => self.update(&ctx.compliance, &[user], true),
            ModuleCall::DisallowUser(user) => self.update(&ctx.compliance, &[user], false),
            ModuleCall::BatchAllowUsers(users) => self.update_batch(&ctx.compliance, &users, true),
            ModuleCall::BatchDisallowUsers(users) => self.update_batch(&ctx.compliance, &users, false),
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
