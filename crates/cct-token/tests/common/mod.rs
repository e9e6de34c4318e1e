//! Shared deployment for the token scenario tests.
//!
//! Wallets, identities and countries:
//!
//! | wallet         | identity | country |
//! |----------------|----------|---------|
//! | alice          | alice    | 250     |
//! | alice-recovery | alice    | 250     |
//! | bob            | bob      | 276     |
//! | carol          | carol    | 42      |
//! | dave           | dave     | 840     |

#![allow(dead_code)]

use std::sync::Arc;

use cct_compliance::{
    ComplianceModule, EncryptedInput, InMemoryIdentityRegistry, ModularCompliance, ModuleCall,
};
use cct_core::{Address, CountryCode, EventKind, IdentityId};
use cct_fhe::{Ciphertext, EncryptedAmount, Fhe, MockFheBackend};
use cct_token::{ConfidentialToken, TokenConfig};

pub const OWNER: &str = "owner";
pub const AGENT: &str = "agent";

pub fn addr(label: &str) -> Address {
    Address::from_label(label)
}

pub fn identity(label: &str) -> IdentityId {
    IdentityId::from_label(label)
}

pub struct Env {
    pub backend: Arc<MockFheBackend>,
    pub fhe: Fhe,
    pub registry: Arc<InMemoryIdentityRegistry>,
    pub compliance: Arc<ModularCompliance>,
    pub token: ConfidentialToken,
}

impl Env {
    pub fn new() -> Self {
        let backend = Arc::new(MockFheBackend::new());
        let fhe = Fhe::new(backend.clone());
        let registry = Arc::new(InMemoryIdentityRegistry::new());
        for (wallet, id, country) in [
            ("alice", "alice", 250),
            ("alice-recovery", "alice", 250),
            ("bob", "bob", 276),
            ("carol", "carol", 42),
            ("dave", "dave", 840),
        ] {
            registry
                .register_identity(addr(wallet), identity(id), CountryCode(country))
                .unwrap();
        }
        let compliance = Arc::new(ModularCompliance::new(addr("compliance"), addr(OWNER), fhe.clone()));
        let token = ConfidentialToken::new(
            addr("token"),
            TokenConfig::new("Confidential Bond", "CBND", addr(OWNER)),
            fhe.clone(),
            registry.clone(),
            compliance.clone(),
        )
        .unwrap();
        token.add_agent(&addr(OWNER), addr(AGENT)).unwrap();
        Self {
            backend,
            fhe,
            registry,
            compliance,
            token,
        }
    }

    /// Input submitted to the token by `user`.
    pub fn input(&self, user: &str, value: u64) -> EncryptedInput {
        let (input, proof) = self.backend.encrypt_input(value, &addr("token"), &addr(user));
        EncryptedInput { input, proof }
    }

    /// Input forwarded to `module` through the compliance.
    pub fn module_input(&self, module: &Address, value: u64) -> EncryptedInput {
        let (input, proof) = self.backend.encrypt_input(value, module, &addr("compliance"));
        EncryptedInput { input, proof }
    }

    /// Input submitted to `module` directly by the compliance owner.
    pub fn preset_input(&self, module: &Address, value: u64) -> EncryptedInput {
        let (input, proof) = self.backend.encrypt_input(value, module, &addr(OWNER));
        EncryptedInput { input, proof }
    }

    pub fn value<T: Ciphertext>(&self, ciphertext: &T) -> u64 {
        self.backend.decrypt_unchecked(ciphertext.handle())
    }

    pub fn balance(&self, wallet: &str) -> u64 {
        self.value(&self.token.balance_of(&addr(wallet)))
    }

    pub fn supply(&self) -> u64 {
        self.value(&self.token.total_supply())
    }

    pub fn add_module(&self, module: Arc<dyn ComplianceModule>) {
        self.compliance.add_module(&addr(OWNER), module).unwrap();
    }

    pub fn call(&self, module: &Address, call: ModuleCall) {
        self.compliance
            .call_module_function(&addr(OWNER), module, call)
            .unwrap();
    }

    pub fn mint(&self, to: &str, value: u64) -> EncryptedAmount {
        self.token
            .mint(&addr(AGENT), addr(to), &self.input(AGENT, value))
            .unwrap()
    }

    pub fn transfer(&self, from: &str, to: &str, value: u64) -> EncryptedAmount {
        self.token
            .transfer(&addr(from), addr(to), &self.input(from, value))
            .unwrap()
    }

    pub fn token_event_kinds(&self) -> Vec<&'static str> {
        self.token.events().iter().map(|r| r.event.kind()).collect()
    }
}
