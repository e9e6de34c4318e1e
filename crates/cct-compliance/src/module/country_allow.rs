//! # Country Allow Module
//!
//! The allow-list counterpart of the country restriction module: an
//! action passes only when the receiver's investor country has been
//! explicitly allowed for the compliance.

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

const NAME: &str = "CountryAllowModule";

#[derive(Debug, Default)]
struct State {
    base: ModuleBase,
    allowed: HashMap<Address, HashSet<CountryCode>>,
}

impl State {
    fn is_allowed(&self, compliance: &Address, country: &CountryCode) -> bool {
        self.allowed
            .get(compliance)
            .is_some_and(|set| set.contains(country))
    }

    fn set(&mut self, compliance: &Address, country: CountryCode, allowed: bool) {
        let set = self.allowed.entry(*compliance).or_default();
        let event = if allowed {
            set.insert(country);
            ModuleEvent::CountryAllowed {
                compliance: *compliance,
                country,
            }
        } else {
            set.remove(&country);
            ModuleEvent::CountryUnallowed {
                compliance: *compliance,
                country,
            }
        };
        self.base.events.emit(event);
    }
}

/// Receiver-country allow-list.
#[derive(Debug)]
pub struct CountryAllowModule {
    address: Address,
    state: RwLock<State>,
}

impl CountryAllowModule {
    /// Create the module at `address`.
    pub fn new(address: Address) -> Self {
        Self {
            address,
            state: RwLock::new(State::default()),
        }
    }

    /// Whether `country` is allowed for `compliance`.
    pub fn is_country_allowed(&self, compliance: &Address, country: CountryCode) -> bool {
        self.state.read().is_allowed(compliance, &country)
    }

    /// Allow or disallow every listed country, or none of them.
    fn apply(
        &self,
        compliance: &Address,
        countries: &[CountryCode],
        allowed: bool,
    ) -> Result<(), ComplianceError> {
        let mut state = self.state.write();
        for country in countries {
            match (allowed, state.is_allowed(compliance, country)) {
                (true, true) => return Err(ComplianceError::CountryAlreadyAllowed(*country)),
                (false, false) => return Err(ComplianceError::CountryNotAllowed(*country)),
                _ => {}
            }
        }
        for country in countries {
            state.set(compliance, *country, allowed);
        }
        tracing::info!(%compliance, count = countries.len(), allowed, "country allow-list updated");
        Ok(())
    }

    fn apply_batch(
        &self,
        compliance: &Address,
        countries: &[CountryCode],
        allowed: bool,
    ) -> Result<(), ComplianceError> {
        check_batch(countries.len(), MAX_COUNTRY_BATCH)?;
        check_distinct_countries(countries)?;
        self.apply(compliance, countries, allowed)
    }
}

impl ComplianceModule for CountryAllowModule {
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
        let allowed = self.state.read().is_allowed(&ctx.compliance, &country);
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
            ModuleCall::AddAllowedCountry(country) => self.apply(&ctx.compliance, &[country], true),
            ModuleCall::RemoveAllowedCountry(country) => self.apply(&ctx.compliance, &[country], false),
            ModuleCall::BatchAllowCountries(countries) => {
                self.apply_batch(&ctx.compliance, &countries, true)
            }
            ModuleCall::BatchDisallowCountries(countries) => {
                self.apply_batch(&ctx.compliance, &countries, false)
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
