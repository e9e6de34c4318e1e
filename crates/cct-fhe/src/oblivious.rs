//! # Oblivious Arithmetic Facade
//!
//! `Fhe` is the typed surface over an [`FheBackend`]. The compliance
//! engine, every module and the token gate perform all confidential
//! computation through it.
//!
//! ## Rules for callers
//!
//! - An [`EncryptedBit`] is never turned into a `bool`. It is combined with
//!   other bits or consumed by [`Fhe::select`].
//! - Which `Fhe` methods a caller invokes, and how many times, may depend
//!   only on public inputs (caller, addresses, flags, list lengths).
//! - [`Fhe::and_all`] evaluates every verdict it is given; there is no
//!   short-circuit on an encrypted value.

use std::fmt;
use std::sync::Arc;

use cct_core::Address;

use crate::backend::{BinaryOp, FheBackend};
use crate::error::FheError;
use crate::handle::CiphertextType;
use crate::types::{Ciphertext, EncryptedAmount, EncryptedBit, ExternalAmount, InputProof};

/// Shared handle to the oblivious arithmetic layer.
#[derive(Clone)]
pub struct Fhe {
    backend: Arc<dyn FheBackend>,
}

impl fmt::Debug for Fhe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fhe").finish_non_exhaustive()
    }
}

impl Fhe {
    /// Wrap a backend.
    pub fn new(backend: Arc<dyn FheBackend>) -> Self {
        Self { backend }
    }

    /// Access the raw backend.
    pub fn backend(&self) -> &Arc<dyn FheBackend> {
        &self.backend
    }

    // ── Constants and inputs ─────────────────────────────────────────

    /// Encrypt a public amount.
    pub fn constant(&self, value: u64) -> EncryptedAmount {
        EncryptedAmount::from_handle(self.backend.trivial_encrypt(value, CiphertextType::U64))
    }

    /// Encrypted zero.
    pub fn zero(&self) -> EncryptedAmount {
        self.constant(0)
    }

    /// Encrypt a public boolean, e.g. a plaintext module verdict.
    pub fn bit(&self, value: bool) -> EncryptedBit {
        EncryptedBit::from_handle(
            self.backend
                .trivial_encrypt(u64::from(value), CiphertextType::Bool),
        )
    }

    /// Verify a client-submitted amount for `contract`, submitted by `user`.
    ///
    /// # Errors
    ///
    /// Fails when the proof does not bind the input to `contract` and
    /// `user`. This is a provenance failure, independent of the value.
    pub fn verify_amount(
        &self,
        input: &ExternalAmount,
        proof: &InputProof,
        contract: &Address,
        user: &Address,
    ) -> Result<EncryptedAmount, FheError> {
        let handle =
            self.backend
                .verify_input(input.handle, proof, contract, user, CiphertextType::U64)?;
        Ok(EncryptedAmount::from_handle(handle))
    }

    // ── Arithmetic ───────────────────────────────────────────────────

    /// `a + b`, saturating at `u64::MAX`.
    pub fn add(&self, a: &EncryptedAmount, b: &EncryptedAmount) -> EncryptedAmount {
        self.amount_op(BinaryOp::Add, a, b)
    }

    /// `a - b`, saturating at zero. Never wraps.
    pub fn sub(&self, a: &EncryptedAmount, b: &EncryptedAmount) -> EncryptedAmount {
        self.amount_op(BinaryOp::Sub, a, b)
    }

    // ── Comparison ───────────────────────────────────────────────────

    /// `a <= b`.
    pub fn le(&self, a: &EncryptedAmount, b: &EncryptedAmount) -> EncryptedBit {
        self.compare(BinaryOp::Le, a, b)
    }

    /// `a < b`.
    pub fn lt(&self, a: &EncryptedAmount, b: &EncryptedAmount) -> EncryptedBit {
        self.compare(BinaryOp::Lt, a, b)
    }

    /// `a >= b`.
    pub fn ge(&self, a: &EncryptedAmount, b: &EncryptedAmount) -> EncryptedBit {
        self.compare(BinaryOp::Ge, a, b)
    }

    /// `a > b`.
    pub fn gt(&self, a: &EncryptedAmount, b: &EncryptedAmount) -> EncryptedBit {
        self.compare(BinaryOp::Gt, a, b)
    }

    /// `a == b`.
    pub fn eq(&self, a: &EncryptedAmount, b: &EncryptedAmount) -> EncryptedBit {
        self.compare(BinaryOp::Eq, a, b)
    }

    // ── Bit logic ────────────────────────────────────────────────────

    /// Encrypted AND.
    pub fn and(&self, a: &EncryptedBit, b: &EncryptedBit) -> EncryptedBit {
        EncryptedBit::from_handle(self.backend.binary(BinaryOp::And, a.handle(), b.handle()))
    }

    /// Encrypted OR.
    pub fn or(&self, a: &EncryptedBit, b: &EncryptedBit) -> EncryptedBit {
        EncryptedBit::from_handle(self.backend.binary(BinaryOp::Or, a.handle(), b.handle()))
    }

    /// Encrypted NOT.
    pub fn not(&self, a: &EncryptedBit) -> EncryptedBit {
        EncryptedBit::from_handle(self.backend.not(a.handle()))
    }

    /// AND-reduce every verdict. An empty input yields an encrypted `true`.
    ///
    /// Performs exactly one `and` per verdict after the seed, whatever the
    /// hidden values are.
    pub fn and_all<'a, I>(&self, verdicts: I) -> EncryptedBit
    where
        I: IntoIterator<Item = &'a EncryptedBit>,
    {
        verdicts
            .into_iter()
            .fold(self.bit(true), |acc, verdict| self.and(&acc, verdict))
    }

    // ── Selection ────────────────────────────────────────────────────

    /// Oblivious multiplexer: `condition ? if_true : if_false`.
    ///
    /// The only way an encrypted condition may influence a value.
    pub fn select<T: Ciphertext>(&self, condition: &EncryptedBit, if_true: &T, if_false: &T) -> T {
        T::from_handle(
            self.backend
                .select(condition.handle(), if_true.handle(), if_false.handle()),
        )
    }

    // ── Access control ───────────────────────────────────────────────

    /// Grant `account` decrypt rights on `value`.
    pub fn allow<T: Ciphertext>(&self, value: &T, account: &Address) {
        self.backend.allow(value.handle(), account);
    }

    /// Grant every account in `accounts` decrypt rights on `value`.
    pub fn allow_many<T: Ciphertext>(&self, value: &T, accounts: &[Address]) {
        for account in accounts {
            self.backend.allow(value.handle(), account);
        }
    }

    /// Whether `account` may decrypt `value`.
    pub fn is_allowed<T: Ciphertext>(&self, value: &T, account: &Address) -> bool {
        self.backend.is_allowed(value.handle(), account)
    }

    fn amount_op(&self, op: BinaryOp, a: &EncryptedAmount, b: &EncryptedAmount) -> EncryptedAmount {
        EncryptedAmount::from_handle(self.backend.binary(op, a.handle(), b.handle()))
    }

    fn compare(&self, op: BinaryOp, a: &EncryptedAmount, b: &EncryptedAmount) -> EncryptedBit {
        EncryptedBit::from_handle(self.backend.binary(op, a.handle(), b.handle()))
    }
}
