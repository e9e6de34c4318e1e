//! # Country Restriction Module
//!
//! Rejects actions whose receiver's investor country is on the
//! compliance's restricted list. The list is plaintext and public; the
//! verdict is computed in the clear and widened into an encrypted
//! constant.

use std::collections::{HashMap, HashSet};

use parking_lot::RwLock;

use cct_core::{Address, CountryCode, EventRecord};
use cct_fhe::{EncryptedAmount, EncryptedBit};

use super::{
    check_distinct_countries, AdminContext, ComplianceModule, ModuleBase, ModuleCall,
    ModuleAction, ModuleContext, ModuleEvent,
};
use crate::config::{check_batch, MAX_COUNTRY_BATCH};
use crate::error::ComplianceError;

const NAME: &str = "CountryRestrictModule";

#[derive(Debug, Default)]
struct State {
    base: ModuleBase,
    restricted: HashMap<Address, HashSet<CountryCode>>,
}

impl State {
    fn is_restricted(&self, compliance: &Address, country: &CountryCode) -> bool {
        self.restricted
            .get(compliance)
            .is_some_and(|set| set.contains(country))
    }

    fn restrict(&mut self, compliance: &Address, country: CountryCode) {
        self.restricted.entry(*compliance).or_default().insert(country);
        self.base.events.emit(ModuleEvent::AddedRestrictedCountry {
            compliance: *compliance,
            country,
        });
    }

    fn unrestrict(&mut self, compliance: &Address, country: CountryCode) {
        if let Some(set) = self.restricted.get_mut(compliance) {
            set.remove(&country);
        }
        self.base.events.emit(ModuleEvent::RemovedRestrictedCountry {
            compliance: *compliance,
            country,
        });
    }
}

/// Receiver-country deny-list.
#[derive(Debug)]
pub struct CountryRestrictModule {
    address: Address,
    state: RwLock<State>,
}

impl CountryRestrictModule {
    /// Create the module at `address`.
    pub fn new(address: Address) -> Self {
        Self {
            address,
            state: RwLock::new(State::default()),
        }
    }

    /// Whether `country` is restricted for `compliance`.
    pub fn is_country_restricted(&self, compliance: &Address, country: CountryCode) -> bool {
        self.state.read().is_restricted(compliance, &country)
    }

    fn add(&self, compliance: &Address, country: CountryCode) -> Result<(), ComplianceError> {
        let mut state = self.state.write();
        if state.is_restricted(compliance, &country) {
            return Err(ComplianceError::CountryAlreadyRestricted(country));
        }
        state.restrict(compliance, country);
        tracing::info!(%compliance, %country, "country restricted");
        Ok(())
    }

    fn remove(&self, compliance: &Address, country: CountryCode) -> Result<(), ComplianceError> {
        let mut state = self.state.write();
        if !state.is_restricted(compliance, &country) {
            return Err(ComplianceError::CountryNotRestricted(country));
        }
        state.unrestrict(compliance, country);
        tracing::info!(%compliance, %country, "country restriction lifted");
        Ok(())
    }

    fn batch_add(&self, compliance: &Address, countries: Vec<CountryCode>) -> Result<(), ComplianceError> {
        check_batch(countries.len(), MAX_COUNTRY_BATCH)?;
        check_distinct_countries(&countries)?;
        let mut state = self.state.write();
        if let Some(country) = countries.iter().find(|c| state.is_restricted(compliance, c)) {
            return Err(ComplianceError::CountryAlreadyRestricted(*country));
        }
        for country in &countries {
            state.restrict(compliance, *country);
        }
        tracing::info!(%compliance, count = countries.len(), "countries restricted");
        Ok(())
    }

    fn batch_remove(&self, compliance: &Address, countries: Vec<CountryCode>) -> Result<(), ComplianceError> {
        check_batch(countries.len(), MAX_COUNTRY_BATCH)?;
        check_distinct_countries(&countries)?;
        let mut state = self.state.write();
        if let Some(country) = countries.iter().find(|c| !state.is_restricted(compliance, c)) {
            return Err(ComplianceError::CountryNotRestricted(*country));
        }
        for country in &countries {
            state.unrestrict(compliance, *country);
        }
        tracing::info!(%compliance, count = countries.len(), "country restrictions lifted");
        Ok(())
    }
}

impl ComplianceModule for CountryRestrictModule {
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
        _from: &Address,
        to: &Address,
        _amount: &EncryptedAmount,
    ) -> Result<EncryptedBit, ComplianceError> {
        let country = ctx
            .registry
            .investor_country(to)
            .unwrap_or(CountryCode::UNKNOWN);
        let allowed = !self.state.read().is_restricted(&ctx.compliance, &country);
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
            ModuleCall::AddCountryRestriction(country) => self.add(&ctx.compliance, country),
            ModuleCall::RemoveCountryRestriction(country) => self.remove(&ctx.compliance, country),
            ModuleCall::BatchRestrictCountries(countries) => self.batch_add(&ctx.compliance, countries),
            ModuleCall::BatchUnrestrictCountries(countries) => {
                self.batch_remove(&ctx.compliance, countries)
            }
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

    fn bound_module(fx: &Fixture) -> CountryRestrictModule {
        let module = CountryRestrictModule::new(wallet("country-restrict"));
        module.bind_compliance(&fx.compliance).unwrap();
        module
    }

    #[test]
    fn test_plug_and_play() {
        let module = CountryRestrictModule::new(wallet("m"));
        assert!(module.is_plug_and_play());
        assert!(module.can_compliance_bind(&wallet("any")));
        assert_eq!(module.name(), "CountryRestrictModule");
    }

    #[test]
    fn test_add_and_remove_restriction() {
        let fx = Fixture::new();
        let module = bound_module(&fx);
        module
            .call(&fx.admin(), ModuleCall::AddCountryRestriction(CountryCode(42)))
            .unwrap();
        assert!(module.is_country_restricted(&fx.compliance, CountryCode(42)));
        module
            .call(&fx.admin(), ModuleCall::RemoveCountryRestriction(CountryCode(42)))
            .unwrap();
        assert!(!module.is_country_restricted(&fx.compliance, CountryCode(42)));
    }

    #[test]
    fn test_double_restriction_rejected() {
        let fx = Fixture::new();
        let module = bound_module(&fx);
        module
            .call(&fx.admin(), ModuleCall::AddCountryRestriction(CountryCode(42)))
            .unwrap();
        let err = module
            .call(&fx.admin(), ModuleCall::AddCountryRestriction(CountryCode(42)))
            .unwrap_err();
        assert_eq!(err, ComplianceError::CountryAlreadyRestricted(CountryCode(42)));
    }

    #[test]
    fn test_remove_unrestricted_rejected() {
        let fx = Fixture::new();
        let module = bound_module(&fx);
        let err = module
            .call(&fx.admin(), ModuleCall::RemoveCountryRestriction(CountryCode(7)))
            .unwrap_err();
        assert_eq!(err, ComplianceError::CountryNotRestricted(CountryCode(7)));
    }

    #[test]
    fn test_unbound_compliance_cannot_configure() {
        let fx = Fixture::new();
        let module = CountryRestrictModule::new(wallet("m"));
        let err = module
            .call(&fx.admin(), ModuleCall::AddCountryRestriction(CountryCode(42)))
            .unwrap_err();
        assert!(matches!(err, ComplianceError::ComplianceNotBound { .. }));
    }

    #[test]
    fn test_preflight_requires_binding() {
        let fx = Fixture::new();
        let module = CountryRestrictModule::new(wallet("m"));
        let mint = ModuleAction::Mint { to: wallet("alice") };
        let err = module.preflight(&fx.ctx(), &mint).unwrap_err();
        assert!(matches!(err, ComplianceError::ComplianceNotBound { .. }));
        module.bind_compliance(&fx.compliance).unwrap();
        module.preflight(&fx.ctx(), &mint).unwrap();
    }

    #[test]
    fn test_batch_is_all_or_nothing() {
        let fx = Fixture::new();
        let module = bound_module(&fx);
        module
            .call(&fx.admin(), ModuleCall::AddCountryRestriction(CountryCode(42)))
            .unwrap();
        let err = module
            .call(
                &fx.admin(),
                ModuleCall::BatchRestrictCountries(vec![CountryCode(1), CountryCode(42), CountryCode(2)]),
            )
            .unwrap_err();
        assert_eq!(err, ComplianceError::CountryAlreadyRestricted(CountryCode(42)));
        assert!(!module.is_country_restricted(&fx.compliance, CountryCode(1)));
        assert!(!module.is_country_restricted(&fx.compliance, CountryCode(2)));
    }

    #[test]
    fn test_batch_duplicates_rejected() {
        let fx = Fixture::new();
        let module = bound_module(&fx);
        let err = module
            .call(
                &fx.admin(),
                ModuleCall::BatchRestrictCountries(vec![CountryCode(1), CountryCode(1)]),
            )
            .unwrap_err();
        assert_eq!(err, ComplianceError::DuplicateCountry(CountryCode(1)));
        assert!(!module.is_country_restricted(&fx.compliance, CountryCode(1)));
    }

    #[test]
    fn test_batch_ceiling() {
        let fx = Fixture::new();
        let module = bound_module(&fx);
        let too_many: Vec<CountryCode> = (1..=196).map(CountryCode).collect();
        let err = module
            .call(&fx.admin(), ModuleCall::BatchRestrictCountries(too_many))
            .unwrap_err();
        assert_eq!(err, ComplianceError::BatchTooLarge { len: 196, max: 195 });
        let max: Vec<CountryCode> = (1..=195).map(CountryCode).collect();
        module
            .call(&fx.admin(), ModuleCall::BatchRestrictCountries(max))
            .unwrap();
        assert!(module.is_country_restricted(&fx.compliance, CountryCode(195)));
    }

    #[test]
    fn test_batch_unrestrict() {
        let fx = Fixture::new();
        let module = bound_module(&fx);
        module
            .call(
                &fx.admin(),
                ModuleCall::BatchRestrictCountries(vec![CountryCode(1), CountryCode(2)]),
            )
            .unwrap();
        let err = module
            .call(
                &fx.admin(),
                ModuleCall::BatchUnrestrictCountries(vec![CountryCode(1), CountryCode(3)]),
            )
            .unwrap_err();
        assert_eq!(err, ComplianceError::CountryNotRestricted(CountryCode(3)));
        assert!(module.is_country_restricted(&fx.compliance, CountryCode(1)));
        module
            .call(
                &fx.admin(),
                ModuleCall::BatchUnrestrictCountries(vec![CountryCode(1), CountryCode(2)]),
            )
            .unwrap();
        assert!(!module.is_country_restricted(&fx.compliance, CountryCode(2)));
    }

    #[test]
    fn test_check_uses_receiver_country() {
        let fx = Fixture::new();
        let module = bound_module(&fx);
        module
            .call(&fx.admin(), ModuleCall::AddCountryRestriction(CountryCode(42)))
            .unwrap();
        let amount = fx.amount(10);
        // carol lives in 42, alice in 250, bob in 276.
        let to_carol = module
            .module_check(&fx.ctx(), &wallet("alice"), &wallet("carol"), &amount)
            .unwrap();
        let to_bob = module
            .module_check(&fx.ctx(), &wallet("alice"), &wallet("bob"), &amount)
            .unwrap();
        assert_eq!(fx.decrypt(&to_carol), 0);
        assert_eq!(fx.decrypt(&to_bob), 1);
    }

    #[test]
    fn test_state_is_per_compliance() {
        let fx = Fixture::new();
        let module = bound_module(&fx);
        let other = wallet("other-compliance");
        module.bind_compliance(&other).unwrap();
        module
            .call(&fx.admin(), ModuleCall::AddCountryRestriction(CountryCode(42)))
            .unwrap();
        assert!(!module.is_country_restricted(&other, CountryCode(42)));
    }

    #[test]
    fn test_unsupported_call() {
        let fx = Fixture::new();
        let module = bound_module(&fx);
        let err = module
            .call(&fx.admin(), ModuleCall::AllowUser(wallet("alice")))
            .unwrap_err();
        assert!(matches!(err, ComplianceError::UnsupportedCall { call: "allowUser", .. }));
    }

    #[test]
    fn test_events_emitted() {
        let fx = Fixture::new();
        let module = bound_module(&fx);
        module
            .call(&fx.admin(), ModuleCall::AddCountryRestriction(CountryCode(42)))
            .unwrap();
        let events: Vec<ModuleEvent> = module.events().into_iter().map(|r| r.event).collect();
        assert_eq!(
            events,
            vec![
                ModuleEvent::ComplianceBound { compliance: fx.compliance },
                ModuleEvent::AddedRestrictedCountry {
                    compliance: fx.compliance,
                    country: CountryCode(42)
                },
            ]
        );
    }
}
