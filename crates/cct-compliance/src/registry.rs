//! # Identity Registry
//!
//! The identity/claims registry is an external collaborator. The engine
//! consumes it read-only through [`IdentityRegistry`]; the in-memory
//! implementation backs tests, scenarios and the CLI.
//!
//! ## Identity keying
//!
//! The registry is the single source of truth for the wallet → identity
//! mapping. Several wallets may map to the same identity; cap modules key
//! their counters by the identity, so a recovered wallet inherits the
//! counters of the lost one.

use std::collections::HashMap;

use parking_lot::RwLock;

use cct_core::{Address, CountryCode, IdentityId};

use crate::error::ComplianceError;

/// Read-only view of an identity registry.
pub trait IdentityRegistry: Send + Sync {
    /// Whether the wallet is registered and its claims are valid.
    fn is_verified(&self, wallet: &Address) -> bool;

    /// The identity behind a wallet.
    fn identity(&self, wallet: &Address) -> Option<IdentityId>;

    /// The investor country of a wallet.
    fn investor_country(&self, wallet: &Address) -> Option<CountryCode>;
}

/// A registered wallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RegistryEntry {
    identity: IdentityId,
    country: CountryCode,
    verified: bool,
}

/// In-memory identity registry.
#[derive(Debug, Default)]
pub struct InMemoryIdentityRegistry {
    entries: RwLock<HashMap<Address, RegistryEntry>>,
}

impl InMemoryIdentityRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a wallet under an identity. Registered wallets start verified.
    pub fn register_identity(
        &self,
        wallet: Address,
        identity: IdentityId,
        country: CountryCode,
    ) -> Result<(), ComplianceError> {
        if wallet.is_zero() {
            return Err(ComplianceError::ZeroAddress("wallet"));
        }
        if identity.as_address().is_zero() {
            return Err(ComplianceError::ZeroAddress("identity"));
        }
        let mut entries = self.entries.write();
        if entries.contains_key(&wallet) {
            return Err(ComplianceError::WalletAlreadyRegistered { wallet });
        }
        entries.insert(
            wallet,
            RegistryEntry {
                identity,
                country,
                verified: true,
            },
        );
        tracing::debug!(%wallet, %identity, %country, "identity registered");
        Ok(())
    }

    /// Change the investor country of a wallet.
    pub fn update_country(&self, wallet: &Address, country: CountryCode) -> Result<(), ComplianceError> {
        let mut entries = self.entries.write();
        let entry = entries
            .get_mut(wallet)
            .ok_or(ComplianceError::IdentityNotFound { wallet: *wallet })?;
        entry.country = country;
        Ok(())
    }

    /// Point a wallet at a different identity.
    pub fn update_identity(&self, wallet: &Address, identity: IdentityId) -> Result<(), ComplianceError> {
        let mut entries = self.entries.write();
        let entry = entries
            .get_mut(wallet)
            .ok_or(ComplianceError::IdentityNotFound { wallet: *wallet })?;
        entry.identity = identity;
        Ok(())
    }

    /// Mark a wallet's claims valid or invalid.
    pub fn set_verified(&self, wallet: &Address, verified: bool) -> Result<(), ComplianceError> {
        let mut entries = self.entries.write();
        let entry = entries
            .get_mut(wallet)
            .ok_or(ComplianceError::IdentityNotFound { wallet: *wallet })?;
        entry.verified = verified;
        Ok(())
    }

    /// Remove a wallet from the registry.
    pub fn delete_identity(&self, wallet: &Address) -> Result<(), ComplianceError> {
        self.entries
            .write()
            .remove(wallet)
            .map(|_| ())
            .ok_or(ComplianceError::IdentityNotFound { wallet: *wallet })
    }

    /// Whether a wallet is registered, verified or not.
    pub fn contains(&self, wallet: &Address) -> bool {
        self.entries.read().contains_key(wallet)
    }
}

impl IdentityRegistry for InMemoryIdentityRegistry {
    fn is_verified(&self, wallet: &Address) -> bool {
        self.entries
            .read()
            .get(wallet)
            .map(|e| e.verified)
            .unwrap_or(false)
    }

    fn identity(&self, wallet: &Address) -> Option<IdentityId> {
        self.entries.read().get(wallet).map(|e| e.identity)
    }

    fn investor_country(&self, wallet: &Address) -> Option<CountryCode> {
        self.entries.read().get(wallet).map(|e| e.country)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> Address {
        Address::from_label("alice")
    }

    #[test]
    fn test_register_and_lookup() {
        let reg = InMemoryIdentityRegistry::new();
        let id = IdentityId::from_label("alice");
        reg.register_identity(alice(), id, CountryCode(250)).unwrap();
        assert!(reg.is_verified(&alice()));
        assert_eq!(reg.identity(&alice()), Some(id));
        assert_eq!(reg.investor_country(&alice()), Some(CountryCode(250)));
    }

    #[test]
    fn test_unknown_wallet_is_unverified() {
        let reg = InMemoryIdentityRegistry::new();
        assert!(!reg.is_verified(&alice()));
        assert_eq!(reg.identity(&alice()), None);
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let reg = InMemoryIdentityRegistry::new();
        let id = IdentityId::from_label("alice");
        reg.register_identity(alice(), id, CountryCode(1)).unwrap();
        assert!(matches!(
            reg.register_identity(alice(), id, CountryCode(1)),
            Err(ComplianceError::WalletAlreadyRegistered { .. })
        ));
    }

    #[test]
    fn test_zero_wallet_rejected() {
        let reg = InMemoryIdentityRegistry::new();
        assert!(matches!(
            reg.register_identity(Address::ZERO, IdentityId::from_label("x"), CountryCode(1)),
            Err(ComplianceError::ZeroAddress("wallet"))
        ));
    }

    #[test]
    fn test_two_wallets_one_identity() {
        let reg = InMemoryIdentityRegistry::new();
        let id = IdentityId::from_label("alice");
        let recovered = Address::from_label("alice-new");
        reg.register_identity(alice(), id, CountryCode(1)).unwrap();
        reg.register_identity(recovered, id, CountryCode(1)).unwrap();
        assert_eq!(reg.identity(&alice()), reg.identity(&recovered));
    }

    #[test]
    fn test_revoke_verification_and_delete() {
        let reg = InMemoryIdentityRegistry::new();
        reg.register_identity(alice(), IdentityId::from_label("alice"), CountryCode(1))
            .unwrap();
        reg.set_verified(&alice(), false).unwrap();
        assert!(!reg.is_verified(&alice()));
        assert!(reg.contains(&alice()));
        reg.delete_identity(&alice()).unwrap();
        assert!(!reg.contains(&alice()));
        assert!(reg.delete_identity(&alice()).is_err());
    }

    #[test]
    fn test_update_country() {
        let reg = InMemoryIdentityRegistry::new();
        reg.register_identity(alice(), IdentityId::from_label("alice"), CountryCode(1))
            .unwrap();
        reg.update_country(&alice(), CountryCode(42)).unwrap();
        assert_eq!(reg.investor_country(&alice()), Some(CountryCode(42)));
    }
}
