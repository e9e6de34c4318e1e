//! # Token Action Gate
//!
//! Every confidential action follows the same three steps:
//!
//! ```text
//! Requested ──▶ Evaluated ──▶ Committed
//!   verify       ok = AND(checks)      write balances with `effective`
//!   input        effective =          emit Transfer(handle)
//!                select(ok, amt, 0)   call compliance hook(effective)
//! ```
//!
//! ## Security Invariant
//!
//! Nothing here branches on a hidden value. A request whose compliance or
//! balance checks fail becomes a zero-amount action: it writes the same
//! slots, emits the same events and calls the same hooks as a passing
//! one. Only public facts (caller role, pause flag, frozen wallets,
//! receiver verification, proof validity) produce errors, and they are
//! all checked before anything is written.

use cct_compliance::{EncryptedInput, ModuleAction};
use cct_core::{Address, IdentityId};
use cct_fhe::EncryptedAmount;

use crate::error::TokenError;
use crate::event::TokenEvent;
use crate::token::{ConfidentialToken, TokenState};

impl ConfidentialToken {
    // ─── Holder actions ──────────────────────────────────────────────

    /// Move up to `amount` from the caller to `to`.
    ///
    /// Returns the effective amount: `amount` if every check passed,
    /// an encryption of zero otherwise.
    pub fn transfer(
        &self,
        caller: &Address,
        to: Address,
        amount: &EncryptedInput,
    ) -> Result<EncryptedAmount, TokenError> {
        self.apply("transfer", |state| {
            check_holder_transfer(state, caller, &to)?;
            let amount = self.verify(amount, caller)?;
            self.gated_transfer(state, *caller, to, &amount, None)
        })
    }

    /// [`transfer`](Self::transfer) with a ciphertext the caller already
    /// has access to, such as its own balance.
    pub fn transfer_handle(
        &self,
        caller: &Address,
        to: Address,
        amount: EncryptedAmount,
    ) -> Result<EncryptedAmount, TokenError> {
        self.apply("transfer", |state| {
            check_holder_transfer(state, caller, &to)?;
            if !self.fhe.is_allowed(&amount, caller) {
                return Err(TokenError::CiphertextNotAllowed {
                    caller: *caller,
                    handle: amount.handle(),
                });
            }
            self.gated_transfer(state, *caller, to, &amount, None)
        })
    }

    /// Set the caller's allowance for `spender`.
    pub fn approve(
        &self,
        caller: &Address,
        spender: Address,
        amount: &EncryptedInput,
    ) -> Result<EncryptedAmount, TokenError> {
        self.apply("approve", |state| {
            if spender.is_zero() {
                return Err(TokenError::ZeroAddress("spender"));
            }
            let amount = self.verify(amount, caller)?;
            self.write_allowance(state, *caller, spender, amount);
            state.events.emit(TokenEvent::Approval {
                owner: *caller,
                spender,
                amount: amount.handle(),
            });
            record("approve");
            Ok(amount)
        })
    }

    /// Move up to `amount` from `from` to `to` against the caller's
    /// allowance. The allowance drops by the effective amount.
    pub fn transfer_from(
        &self,
        caller: &Address,
        from: Address,
        to: Address,
        amount: &EncryptedInput,
    ) -> Result<EncryptedAmount, TokenError> {
        self.apply("transfer_from", |state| {
            if from.is_zero() {
                return Err(TokenError::ZeroAddress("sender"));
            }
            check_holder_transfer(state, &from, &to)?;
            let amount = self.verify(amount, caller)?;
            self.gated_transfer(state, from, to, &amount, Some(*caller))
        })
    }

    // ─── Agent actions ───────────────────────────────────────────────

    /// Create up to `amount` for `to`, subject to compliance.
    pub fn mint(
        &self,
        caller: &Address,
        to: Address,
        amount: &EncryptedInput,
    ) -> Result<EncryptedAmount, TokenError> {
        self.apply("mint", |state| {
            state.require_agent(caller)?;
            state.require_verified(&to)?;
            let amount = self.verify(amount, caller)?;
            state
                .compliance
                .preflight(&self.address, state.registry.as_ref(), &ModuleAction::Mint { to })?;
            self.gated_mint(state, to, &amount)
        })
    }

    /// Mint to several receivers in one all-or-nothing call.
    pub fn batch_mint(
        &self,
        caller: &Address,
        to: &[Address],
        amounts: &[EncryptedInput],
    ) -> Result<Vec<EncryptedAmount>, TokenError> {
        self.apply("batch_mint", |state| {
            state.require_agent(caller)?;
            if to.is_empty() {
                return Err(TokenError::EmptyBatch);
            }
            if to.len() != amounts.len() {
                return Err(TokenError::LengthMismatch {
                    left: to.len(),
                    right: amounts.len(),
                });
            }
            for receiver in to {
                state.require_verified(receiver)?;
            }
            let verified = amounts
                .iter()
                .map(|amount| self.verify(amount, caller))
                .collect::<Result<Vec<_>, _>>()?;
            for receiver in to {
                state.compliance.preflight(
                    &self.address,
                    state.registry.as_ref(),
                    &ModuleAction::Mint { to: *receiver },
                )?;
            }
            to.iter()
                .zip(&verified)
                .map(|(receiver, amount)| self.gated_mint(state, *receiver, amount))
                .collect()
        })
    }

    /// Destroy up to `amount` from `from`. Frozen tokens are released first
    /// when the burn reaches into them.
    pub fn burn(
        &self,
        caller: &Address,
        from: Address,
        amount: &EncryptedInput,
    ) -> Result<EncryptedAmount, TokenError> {
        self.apply("burn", |state| {
            state.require_agent(caller)?;
            if from.is_zero() {
                return Err(TokenError::ZeroAddress("holder"));
            }
            let amount = self.verify(amount, caller)?;
            let compliance = state.compliance.clone();
            let registry = state.registry.clone();
            compliance.preflight(&self.address, registry.as_ref(), &ModuleAction::Burn { from })?;

            let balance = state.balance(&from);
            let ok = self.fhe.le(&amount, &balance);
            let effective = self.fhe.select(&ok, &amount, &self.fhe.zero());

            self.release_frozen(state, from, &balance, &effective);
            let debited = self.fhe.sub(&balance, &effective);
            self.write_balance(state, from, debited);
            let supply = self.fhe.sub(&state.total_supply, &effective);
            self.write_total_supply(state, supply);
            self.fhe.allow_many(&effective, &[from, self.address]);

            state.events.emit(TokenEvent::Transfer {
                from,
                to: Address::ZERO,
                amount: effective.handle(),
            });
            compliance.destroyed(&self.address, registry.as_ref(), &from, &effective)?;
            record("burn");
            tracing::debug!(token = %self.address, %from, amount = %effective.handle(), "burn committed");
            Ok(effective)
        })
    }

    /// Move up to `amount` from `from` to `to` without consulting
    /// compliance. Frozen tokens are released as needed.
    pub fn forced_transfer(
        &self,
        caller: &Address,
        from: Address,
        to: Address,
        amount: &EncryptedInput,
    ) -> Result<EncryptedAmount, TokenError> {
        self.apply("forced_transfer", |state| {
            state.require_agent(caller)?;
            if from.is_zero() {
                return Err(TokenError::ZeroAddress("sender"));
            }
            state.require_verified(&to)?;
            let amount = self.verify(amount, caller)?;
            let compliance = state.compliance.clone();
            let registry = state.registry.clone();
            compliance.preflight(&self.address, registry.as_ref(), &ModuleAction::Transfer { from, to })?;

            let balance = state.balance(&from);
            let ok = self.fhe.le(&amount, &balance);
            let effective = self.fhe.select(&ok, &amount, &self.fhe.zero());

            self.release_frozen(state, from, &balance, &effective);
            self.move_balance(state, from, to, &effective);
            state.events.emit(TokenEvent::Transfer {
                from,
                to,
                amount: effective.handle(),
            });
            compliance.transferred(&self.address, registry.as_ref(), &from, &to, &effective)?;
            record("forced_transfer");
            tracing::debug!(token = %self.address, %from, %to, amount = %effective.handle(), "forced transfer committed");
            Ok(effective)
        })
    }

    /// Freeze up to `amount` more of `wallet`'s balance. The freeze is
    /// applied only if the frozen total stays within the balance.
    pub fn freeze_partial_tokens(
        &self,
        caller: &Address,
        wallet: Address,
        amount: &EncryptedInput,
    ) -> Result<EncryptedAmount, TokenError> {
        self.apply("freeze_partial_tokens", |state| {
            state.require_agent(caller)?;
            if wallet.is_zero() {
                return Err(TokenError::ZeroAddress("wallet"));
            }
            let amount = self.verify(amount, caller)?;
            let frozen = state.frozen_amount(&wallet);
            let ok = self
                .fhe
                .le(&self.fhe.add(&frozen, &amount), &state.balance(&wallet));
            let effective = self.fhe.select(&ok, &amount, &self.fhe.zero());
            let updated = self.fhe.add(&frozen, &effective);
            self.write_frozen(state, wallet, updated);
            self.fhe.allow_many(&effective, &[wallet, self.address]);
            state.events.emit(TokenEvent::TokensFrozen {
                wallet,
                amount: effective.handle(),
            });
            record("freeze_partial_tokens");
            Ok(effective)
        })
    }

    /// Release up to `amount` of `wallet`'s frozen tokens. Applied only if
    /// at least `amount` is frozen.
    pub fn unfreeze_partial_tokens(
        &self,
        caller: &Address,
        wallet: Address,
        amount: &EncryptedInput,
    ) -> Result<EncryptedAmount, TokenError> {
        self.apply("unfreeze_partial_tokens", |state| {
            state.require_agent(caller)?;
            if wallet.is_zero() {
                return Err(TokenError::ZeroAddress("wallet"));
            }
            let amount = self.verify(amount, caller)?;
            let frozen = state.frozen_amount(&wallet);
            let ok = self.fhe.le(&amount, &frozen);
            let effective = self.fhe.select(&ok, &amount, &self.fhe.zero());
            let updated = self.fhe.sub(&frozen, &effective);
            self.write_frozen(state, wallet, updated);
            self.fhe.allow_many(&effective, &[wallet, self.address]);
            state.events.emit(TokenEvent::TokensUnfrozen {
                wallet,
                amount: effective.handle(),
            });
            record("unfreeze_partial_tokens");
            Ok(effective)
        })
    }

    /// Move everything held by `lost` to `new`, which must belong to the
    /// same identity. Identity-keyed module counters are unchanged because
    /// the compliance sees a same-identity transfer.
    pub fn recovery_address(
        &self,
        caller: &Address,
        lost: Address,
        new: Address,
        identity: IdentityId,
    ) -> Result<EncryptedAmount, TokenError> {
        self.apply("recovery_address", |state| {
            state.require_agent(caller)?;
            if lost.is_zero() {
                return Err(TokenError::ZeroAddress("lost wallet"));
            }
            if new.is_zero() {
                return Err(TokenError::ZeroAddress("new wallet"));
            }
            if lost == new {
                return Err(TokenError::RecoveryToSameWallet { wallet: lost });
            }
            for wallet in [lost, new] {
                if state.registry.identity(&wallet) != Some(identity) {
                    return Err(TokenError::IdentityMismatch { wallet, identity });
                }
            }
            let compliance = state.compliance.clone();
            let registry = state.registry.clone();
            compliance.preflight(
                &self.address,
                registry.as_ref(),
                &ModuleAction::Transfer { from: lost, to: new },
            )?;

            let moved = state.balance(&lost);
            let moved_frozen = state.frozen_amount(&lost);
            let zero = self.fhe.zero();
            let credited = self.fhe.add(&state.balance(&new), &moved);
            let frozen = self.fhe.add(&state.frozen_amount(&new), &moved_frozen);
            self.write_balance(state, lost, zero);
            self.write_balance(state, new, credited);
            self.write_frozen(state, lost, zero);
            self.write_frozen(state, new, frozen);
            self.fhe.allow_many(&moved, &[new, self.address]);

            if state.frozen.remove(&lost) {
                state.frozen.insert(new);
                state.events.emit(TokenEvent::AddressFrozen {
                    wallet: new,
                    frozen: true,
                    agent: *caller,
                });
            }
            state.events.emit(TokenEvent::Transfer {
                from: lost,
                to: new,
                amount: moved.handle(),
            });
            state.events.emit(TokenEvent::RecoverySuccess { lost, new, identity });
            compliance.transferred(&self.address, registry.as_ref(), &lost, &new, &moved)?;
            record("recovery_address");
            tracing::info!(token = %self.address, %lost, %new, %identity, "wallet recovered");
            Ok(moved)
        })
    }

    // ─── Shared steps ────────────────────────────────────────────────

    fn verify(&self, value: &EncryptedInput, user: &Address) -> Result<EncryptedAmount, TokenError> {
        Ok(self
            .fhe
            .verify_amount(&value.input, &value.proof, &self.address, user)?)
    }

    /// Evaluate and commit a compliance-gated transfer. With a spender,
    /// the allowance is folded into the verdict and charged.
    fn gated_transfer(
        &self,
        state: &mut TokenState,
        from: Address,
        to: Address,
        amount: &EncryptedAmount,
        spender: Option<Address>,
    ) -> Result<EncryptedAmount, TokenError> {
        let compliance = state.compliance.clone();
        let registry = state.registry.clone();

        // Evaluated
        let passes = compliance.module_check(&self.address, registry.as_ref(), &from, &to, amount)?;
        let free = self
            .fhe
            .sub(&state.balance(&from), &state.frozen_amount(&from));
        let mut ok = self.fhe.and(&passes, &self.fhe.le(amount, &free));
        let allowance = spender.map(|s| (s, state.allowance(&from, &s)));
        if let Some((_, current)) = &allowance {
            ok = self.fhe.and(&ok, &self.fhe.le(amount, current));
        }
        let effective = self.fhe.select(&ok, amount, &self.fhe.zero());
        compliance.preflight(&self.address, registry.as_ref(), &ModuleAction::Transfer { from, to })?;

        // Committed
        if let Some((spender, current)) = allowance {
            let remaining = self.fhe.sub(&current, &effective);
            self.write_allowance(state, from, spender, remaining);
        }
        self.move_balance(state, from, to, &effective);
        state.events.emit(TokenEvent::Transfer {
            from,
            to,
            amount: effective.handle(),
        });
        compliance.transferred(&self.address, registry.as_ref(), &from, &to, &effective)?;
        record(if spender.is_some() { "transfer_from" } else { "transfer" });
        tracing::debug!(token = %self.address, %from, %to, amount = %effective.handle(), "transfer committed");
        Ok(effective)
    }

    /// Evaluate and commit one mint. Preflight is the caller's job.
    fn gated_mint(
        &self,
        state: &mut TokenState,
        to: Address,
        amount: &EncryptedAmount,
    ) -> Result<EncryptedAmount, TokenError> {
        let compliance = state.compliance.clone();
        let registry = state.registry.clone();

        let passes = compliance.module_check(&self.address, registry.as_ref(), &Address::ZERO, &to, amount)?;
        let effective = self.fhe.select(&passes, amount, &self.fhe.zero());

        let supply = self.fhe.add(&state.total_supply, &effective);
        self.write_total_supply(state, supply);
        let credited = self.fhe.add(&state.balance(&to), &effective);
        self.write_balance(state, to, credited);
        self.fhe.allow_many(&effective, &[to, self.address]);

        state.events.emit(TokenEvent::Transfer {
            from: Address::ZERO,
            to,
            amount: effective.handle(),
        });
        compliance.created(&self.address, registry.as_ref(), &to, &effective)?;
        record("mint");
        tracing::debug!(token = %self.address, %to, amount = %effective.handle(), "mint committed");
        Ok(effective)
    }

    /// Unfreeze whatever part of `effective` exceeds the free balance.
    fn release_frozen(
        &self,
        state: &mut TokenState,
        holder: Address,
        balance: &EncryptedAmount,
        effective: &EncryptedAmount,
    ) {
        let frozen = state.frozen_amount(&holder);
        let free = self.fhe.sub(balance, &frozen);
        let over = self.fhe.gt(effective, &free);
        let excess = self.fhe.sub(effective, &free);
        let released = self.fhe.select(&over, &excess, &self.fhe.zero());
        let remaining = self.fhe.sub(&frozen, &released);
        self.write_frozen(state, holder, remaining);
        self.fhe.allow_many(&released, &[holder, self.address]);
        state.events.emit(TokenEvent::TokensUnfrozen {
            wallet: holder,
            amount: released.handle(),
        });
    }

    /// Debit then credit. Reading the receiver after the debit makes a
    /// self-transfer net to zero.
    fn move_balance(&self, state: &mut TokenState, from: Address, to: Address, effective: &EncryptedAmount) {
        let debited = self.fhe.sub(&state.balance(&from), effective);
        self.write_balance(state, from, debited);
        let credited = self.fhe.add(&state.balance(&to), effective);
        self.write_balance(state, to, credited);
        self.fhe.allow_many(effective, &[from, to, self.address]);
    }

    fn write_balance(&self, state: &mut TokenState, holder: Address, value: EncryptedAmount) {
        self.fhe.allow_many(&value, &[holder, self.address]);
        state.balances.insert(holder, value);
    }

    fn write_frozen(&self, state: &mut TokenState, holder: Address, value: EncryptedAmount) {
        self.fhe.allow_many(&value, &[holder, self.address]);
        state.frozen_tokens.insert(holder, value);
    }

    fn write_allowance(&self, state: &mut TokenState, owner: Address, spender: Address, value: EncryptedAmount) {
        self.fhe.allow_many(&value, &[owner, spender, self.address]);
        state.allowances.insert((owner, spender), value);
    }

    fn write_total_supply(&self, state: &mut TokenState, value: EncryptedAmount) {
        self.fhe.allow_many(&value, &[state.owner, self.address]);
        state.total_supply = value;
    }
}

/// Public preconditions of a holder-initiated transfer.
fn check_holder_transfer(state: &TokenState, from: &Address, to: &Address) -> Result<(), TokenError> {
    state.require_not_paused()?;
    state.require_not_frozen(from)?;
    state.require_not_frozen(to)?;
    state.require_verified(to)
}

fn record(action: &'static str) {
    metrics::counter!("cct_token_actions_total", "action" => action).increment(1);
}
