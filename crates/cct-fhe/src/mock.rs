//! # Mock FHE Backend
//!
//! A deterministic, transparent stand-in for a homomorphic coprocessor.
//! Plaintexts live in a table keyed by handle; every operation derives a
//! fresh handle with tagged SHA-256 and stores the computed plaintext.
//!
//! ## Security Notice
//!
//! This backend provides NO confidentiality: anyone holding the backend can
//! read the table through [`MockFheBackend::decrypt_unchecked`]. It exists
//! so that the engine and token can be exercised end to end, and so that
//! tests can compare [`OpKind`] traces of two calls that differ only in a
//! hidden value.
//!
//! ## Input Proofs
//!
//! [`MockFheBackend::encrypt_input`] plays the client: it registers a
//! pending input and returns a proof equal to
//! `SHA-256("cct:fhe:input-proof", handle, contract, user)`. Verification
//! recomputes that digest, so an input submitted to the wrong contract or
//! by the wrong user is rejected.

use std::collections::{HashMap, HashSet};

use parking_lot::Mutex;
use rand::RngCore;

use cct_core::{tagged_sha256, Address};

use crate::backend::{BinaryOp, Decryptor, FheBackend};
use crate::error::FheError;
use crate::handle::{CiphertextType, Handle};
use crate::types::{ExternalAmount, InputProof};

/// One entry in the operation trace. Carries no values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    /// Constant encryption.
    TrivialEncrypt(CiphertextType),
    /// Client input verification.
    VerifyInput,
    /// Binary operation.
    Binary(BinaryOp),
    /// Boolean negation.
    Not,
    /// Oblivious selection.
    Select,
    /// ACL grant.
    Allow,
}

impl OpKind {
    /// Stable name used as the metrics label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TrivialEncrypt(_) => "trivial_encrypt",
            Self::VerifyInput => "verify_input",
            Self::Binary(op) => op.as_str(),
            Self::Not => "not",
            Self::Select => "select",
            Self::Allow => "allow",
        }
    }
}

#[derive(Debug, Default)]
struct MockState {
    values: HashMap<Handle, (u64, CiphertextType)>,
    pending_inputs: HashMap<Handle, (u64, CiphertextType)>,
    acl: HashSet<(Handle, Address)>,
    trace: Vec<OpKind>,
    nonce: u64,
}

impl MockState {
    fn record(&mut self, kind: OpKind) {
        self.trace.push(kind);
        metrics::counter!("cct_fhe_ops_total", "op" => kind.as_str()).increment(1);
    }

    fn value_of(&self, handle: Handle) -> u64 {
        match self.values.get(&handle) {
            Some((value, _)) => *value,
            None => {
                if !handle.is_uninitialized() {
                    tracing::warn!(%handle, "unknown handle evaluated as encrypted zero");
                }
                0
            }
        }
    }

    fn type_of(&self, handle: Handle) -> Option<CiphertextType> {
        self.values.get(&handle).map(|(_, ty)| *ty)
    }

    fn store(&mut self, label: &str, operands: &[Handle], value: u64, ty: CiphertextType) -> Handle {
        self.nonce += 1;
        let nonce = self.nonce.to_be_bytes();
        let mut parts: Vec<&[u8]> = Vec::with_capacity(operands.len() + 2);
        parts.push(label.as_bytes());
        for operand in operands {
            parts.push(operand.as_bytes());
        }
        parts.push(&nonce);
        let handle = Handle::from_digest(tagged_sha256("cct:fhe:handle", &parts), ty);
        self.values.insert(handle, (value.min(ty.max_value()), ty));
        handle
    }
}

/// Deterministic in-memory FHE backend for tests, scenarios and the CLI.
#[derive(Debug, Default)]
pub struct MockFheBackend {
    state: Mutex<MockState>,
}

impl MockFheBackend {
    /// Create an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Client-side encryption of `value` destined for `contract`, submitted by `user`.
    pub fn encrypt_input(
        &self,
        value: u64,
        contract: &Address,
        user: &Address,
    ) -> (ExternalAmount, InputProof) {
        let mut seed = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut seed);
        let handle = Handle::from_digest(
            tagged_sha256("cct:fhe:input", &[&seed]),
            CiphertextType::U64,
        );
        let proof = input_proof(handle, contract, user);
        self.state
            .lock()
            .pending_inputs
            .insert(handle, (value, CiphertextType::U64));
        (ExternalAmount { handle }, proof)
    }

    /// Read the plaintext behind a handle, bypassing the ACL.
    ///
    /// Test oracle only: a real backend has no equivalent.
    pub fn decrypt_unchecked(&self, handle: Handle) -> u64 {
        self.state.lock().value_of(handle)
    }

    /// Snapshot of the operation trace.
    pub fn trace(&self) -> Vec<OpKind> {
        self.state.lock().trace.clone()
    }

    /// Remove and return the operation trace.
    pub fn take_trace(&self) -> Vec<OpKind> {
        std::mem::take(&mut self.state.lock().trace)
    }

    /// Number of operations recorded since the last `take_trace`.
    pub fn trace_len(&self) -> usize {
        self.state.lock().trace.len()
    }

    /// Number of ciphertexts currently held.
    pub fn ciphertext_count(&self) -> usize {
        self.state.lock().values.len()
    }
}

fn input_proof(handle: Handle, contract: &Address, user: &Address) -> InputProof {
    InputProof(
        tagged_sha256(
            "cct:fhe:input-proof",
            &[handle.as_bytes(), contract.as_bytes(), user.as_bytes()],
        )
        .to_vec(),
    )
}

impl FheBackend for MockFheBackend {
    fn trivial_encrypt(&self, value: u64, ty: CiphertextType) -> Handle {
        let mut state = self.state.lock();
        state.record(OpKind::TrivialEncrypt(ty));
        state.store("trivial", &[], value, ty)
    }

    fn verify_input(
        &self,
        input: Handle,
        proof: &InputProof,
        contract: &Address,
        user: &Address,
        ty: CiphertextType,
    ) -> Result<Handle, FheError> {
        let mut state = self.state.lock();
        let (value, input_ty) = state
            .pending_inputs
            .get(&input)
            .copied()
            .ok_or(FheError::UnknownInput(input))?;
        if input_ty != ty {
            return Err(FheError::TypeMismatch {
                handle: input,
                expected: ty,
            });
        }
        if &input_proof(input, contract, user) != proof {
            return Err(FheError::InvalidInputProof {
                handle: input,
                contract: *contract,
                user: *user,
            });
        }
        state.record(OpKind::VerifyInput);
        Ok(state.store("input", &[input], value, ty))
    }

    fn binary(&self, op: BinaryOp, lhs: Handle, rhs: Handle) -> Handle {
        let mut state = self.state.lock();
        state.record(OpKind::Binary(op));
        let operand_ty = state
            .type_of(lhs)
            .or_else(|| state.type_of(rhs))
            .unwrap_or(CiphertextType::U64);
        let ty = op.output_type(operand_ty);
        let a = state.value_of(lhs);
        let b = state.value_of(rhs);
        let value = match op {
            BinaryOp::Add => a.saturating_add(b),
            BinaryOp::Sub => a.saturating_sub(b),
            BinaryOp::Le => u64::from(a <= b),
            BinaryOp::Lt => u64::from(a < b),
            BinaryOp::Ge => u64::from(a >= b),
            BinaryOp::Gt => u64::from(a > b),
            BinaryOp::Eq => u64::from(a == b),
            BinaryOp::And => u64::from((a != 0) & (b != 0)),
            BinaryOp::Or => u64::from((a != 0) | (b != 0)),
        };
        state.store(op.as_str(), &[lhs, rhs], value, ty)
    }

    fn not(&self, operand: Handle) -> Handle {
        let mut state = self.state.lock();
        state.record(OpKind::Not);
        let value = u64::from(state.value_of(operand) == 0);
        state.store("not", &[operand], value, CiphertextType::Bool)
    }

    fn select(&self, condition: Handle, if_true: Handle, if_false: Handle) -> Handle {
        let mut state = self.state.lock();
        state.record(OpKind::Select);
        let ty = state
            .type_of(if_true)
            .or_else(|| state.type_of(if_false))
            .unwrap_or(CiphertextType::U64);
        let chosen = if state.value_of(condition) != 0 {
            if_true
        } else {
            if_false
        };
        let value = state.value_of(chosen);
        state.store("select", &[condition, if_true, if_false], value, ty)
    }

    fn allow(&self, handle: Handle, account: &Address) {
        let mut state = self.state.lock();
        state.record(OpKind::Allow);
        state.acl.insert((handle, *account));
    }

    fn is_allowed(&self, handle: Handle, account: &Address) -> bool {
        self.state.lock().acl.contains(&(handle, *account))
    }
}

impl Decryptor for MockFheBackend {
    fn decrypt(&self, handle: Handle, requester: &Address) -> Result<u64, FheError> {
        let state = self.state.lock();
        if handle.is_uninitialized() {
            return Ok(0);
        }
        if !state.acl.contains(&(handle, *requester)) {
            return Err(FheError::AccessDenied {
                handle,
                requester: *requester,
            });
        }
        Ok(state.value_of(handle))
    }
}
