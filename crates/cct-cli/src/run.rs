//! # Run Subcommand
//!
//! Deploys a scenario in memory and executes its actions in order.
//!
//! Each action is an independent call: a structural failure (unauthorized
//! caller, paused token, unverified receiver...) is recorded in the report
//! and the run continues with the next action. Confidential rejections are
//! not failures at all; they show up only in the final balances.
//!
//! The final report lists the balances each holder is authorised to
//! decrypt and the total supply as decrypted by the token owner.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Args;
use serde::Serialize;

use cct_compliance::{
    ComplianceModule, CountryAllowModule, CountryRestrictModule, EncryptedInput,
    InMemoryIdentityRegistry, MaxBalanceModule, ModularCompliance, ModuleCall, SupplyLimitModule,
    TransferRestrictModule,
};
use cct_core::{Address, CountryCode};
use cct_fhe::{Decryptor, EncryptedAmount, Fhe, MockFheBackend};
use cct_token::{ConfidentialToken, TokenConfig, TokenError};

use crate::scenario::{resolve_address, resolve_identity, Action, ModuleSpec, Scenario};

/// Arguments for the `cct run` subcommand.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Scenario file to execute.
    pub scenario: PathBuf,
}

/// Outcome of one scripted action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionReport {
    pub index: usize,
    pub action: &'static str,
    /// `"ok"` or `"error"`.
    pub status: &'static str,
    /// Effective amount handles on success, the error message otherwise.
    pub detail: String,
}

/// Authorised view of one wallet after the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HolderReport {
    pub wallet: String,
    pub address: String,
    pub balance: u64,
    pub frozen_tokens: u64,
    pub frozen: bool,
}

/// Everything `cct run` prints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub token: String,
    pub actions: Vec<ActionReport>,
    pub holders: Vec<HolderReport>,
    pub total_supply: u64,
}

impl RunReport {
    /// Number of actions that failed structurally.
    pub fn failures(&self) -> usize {
        self.actions.iter().filter(|a| a.status == "error").count()
    }

    /// Human-readable rendering.
    pub fn to_text(&self) -> String {
        let mut out = format!("token {}\n\nactions:\n", self.token);
        for action in &self.actions {
            out.push_str(&format!(
                "  [{}] {:<16} {:<5} {}\n",
                action.index, action.action, action.status, action.detail
            ));
        }
        out.push_str("\nholders:\n");
        for holder in &self.holders {
            out.push_str(&format!(
                "  {:<16} balance={} frozen_tokens={}{}\n",
                holder.wallet,
                holder.balance,
                holder.frozen_tokens,
                if holder.frozen { " (frozen)" } else { "" }
            ));
        }
        out.push_str(&format!("\ntotal supply: {}\n", self.total_supply));
        out
    }
}

/// An in-memory deployment built from a scenario.
pub struct Deployment {
    backend: Arc<MockFheBackend>,
    token: ConfidentialToken,
    /// Labelled wallets to report on, in declaration order.
    wallets: Vec<(String, Address)>,
}

impl Deployment {
    /// Deploy the registry, compliance, modules and token of `scenario`.
    pub fn deploy(scenario: &Scenario) -> Result<Self> {
        let problems = scenario.validate();
        if !problems.is_empty() {
            bail!("scenario is invalid:\n  {}", problems.join("\n  "));
        }

        let backend = Arc::new(MockFheBackend::new());
        let fhe = Fhe::new(backend.clone());

        let registry = Arc::new(InMemoryIdentityRegistry::new());
        let mut wallets = Vec::new();
        for entry in &scenario.identities {
            let wallet = resolve_address(&entry.wallet)?;
            let identity = resolve_identity(entry.identity_ref())?;
            registry
                .register_identity(wallet, identity, CountryCode(entry.country))
                .with_context(|| format!("registering {}", entry.wallet))?;
            if !entry.verified {
                registry.set_verified(&wallet, false)?;
            }
            wallets.push((entry.wallet.clone(), wallet));
        }

        let token_address = scenario.token_address()?;
        let compliance_owner = resolve_address(scenario.compliance_owner())?;
        let compliance = Arc::new(ModularCompliance::with_config(
            Address::from_label(&format!("compliance:{}", scenario.token.symbol.to_lowercase())),
            compliance_owner,
            fhe.clone(),
            scenario.compliance.config.clone(),
        ));

        for (index, spec) in scenario.modules.iter().enumerate() {
            let address = Address::from_label(&format!("module:{}:{index}", spec.kind()));
            deploy_module(&backend, &compliance, compliance_owner, address, spec)
                .with_context(|| format!("deploying modules[{index}] ({})", spec.kind()))?;
        }

        let owner = resolve_address(&scenario.token.owner)?;
        let mut config = TokenConfig::new(&scenario.token.name, &scenario.token.symbol, owner);
        config.decimals = scenario.token.decimals;
        let token = ConfidentialToken::new(token_address, config, fhe, registry, compliance)
            .context("deploying token")?;
        for agent in &scenario.agents {
            token.add_agent(&owner, resolve_address(agent)?)?;
        }

        tracing::info!(
            token = %token_address,
            modules = scenario.modules.len(),
            identities = scenario.identities.len(),
            "scenario deployed"
        );
        Ok(Self {
            backend,
            token,
            wallets,
        })
    }

    /// The deployed token.
    pub fn token(&self) -> &ConfidentialToken {
        &self.token
    }

    /// Client-side encryption of `amount` by `user` for the token.
    fn input(&self, user: &Address, amount: u64) -> EncryptedInput {
        let (input, proof) = self
            .backend
            .encrypt_input(amount, &self.token.address(), user);
        EncryptedInput { input, proof }
    }

    /// Execute one action. Returns the effective amount handles.
    pub fn execute(&self, action: &Action) -> Result<Vec<String>> {
        let token = &self.token;
        let handles = |amounts: Vec<EncryptedAmount>| -> Vec<String> {
            amounts.iter().map(|a| a.handle().to_string()).collect()
        };
        let single = |result: Result<EncryptedAmount, TokenError>| -> Result<Vec<String>> {
            Ok(handles(vec![result?]))
        };
        match action {
            Action::Mint { caller, to, amount } => {
                let caller = resolve_address(caller)?;
                single(token.mint(&caller, resolve_address(to)?, &self.input(&caller, *amount)))
            }
            Action::BatchMint { caller, to, amounts } => {
                let caller = resolve_address(caller)?;
                let receivers = to
                    .iter()
                    .map(|r| resolve_address(r))
                    .collect::<Result<Vec<_>>>()?;
                let inputs: Vec<_> = amounts.iter().map(|a| self.input(&caller, *a)).collect();
                Ok(handles(token.batch_mint(&caller, &receivers, &inputs)?))
            }
            Action::Burn { caller, from, amount } => {
                let caller = resolve_address(caller)?;
                single(token.burn(&caller, resolve_address(from)?, &self.input(&caller, *amount)))
            }
            Action::Transfer { from, to, amount } => {
                let from = resolve_address(from)?;
                single(token.transfer(&from, resolve_address(to)?, &self.input(&from, *amount)))
            }
            Action::Approve { owner, spender, amount } => {
                let owner = resolve_address(owner)?;
                single(token.approve(&owner, resolve_address(spender)?, &self.input(&owner, *amount)))
            }
            Action::TransferFrom { spender, from, to, amount } => {
                let spender = resolve_address(spender)?;
                single(token.transfer_from(
                    &spender,
                    resolve_address(from)?,
                    resolve_address(to)?,
                    &self.input(&spender, *amount),
                ))
            }
            Action::ForcedTransfer { caller, from, to, amount } => {
                let caller = resolve_address(caller)?;
                single(token.forced_transfer(
                    &caller,
                    resolve_address(from)?,
                    resolve_address(to)?,
                    &self.input(&caller, *amount),
                ))
            }
            Action::FreezeTokens { caller, wallet, amount } => {
                let caller = resolve_address(caller)?;
                single(token.freeze_partial_tokens(
                    &caller,
                    resolve_address(wallet)?,
                    &self.input(&caller, *amount),
                ))
            }
            Action::UnfreezeTokens { caller, wallet, amount } => {
                let caller = resolve_address(caller)?;
                single(token.unfreeze_partial_tokens(
                    &caller,
                    resolve_address(wallet)?,
                    &self.input(&caller, *amount),
                ))
            }
            Action::SetFrozen { caller, wallet, frozen } => {
                token.set_address_frozen(&resolve_address(caller)?, resolve_address(wallet)?, *frozen)?;
                Ok(Vec::new())
            }
            Action::Pause { caller } => {
                token.pause(&resolve_address(caller)?)?;
                Ok(Vec::new())
            }
            Action::Unpause { caller } => {
                token.unpause(&resolve_address(caller)?)?;
                Ok(Vec::new())
            }
            Action::Recover { caller, lost, new, identity } => single(token.recovery_address(
                &resolve_address(caller)?,
                resolve_address(lost)?,
                resolve_address(new)?,
                resolve_identity(identity)?,
            )),
        }
    }

    /// Run every action of `scenario` and build the report.
    pub fn run(&self, scenario: &Scenario) -> Result<RunReport> {
        let actions = scenario
            .actions
            .iter()
            .enumerate()
            .map(|(index, action)| {
                let (status, detail) = match self.execute(action) {
                    Ok(handles) => ("ok", handles.join(",")),
                    Err(err) => {
                        tracing::warn!(index, action = action.name(), "action failed: {err:#}");
                        ("error", format!("{err:#}"))
                    }
                };
                ActionReport {
                    index,
                    action: action.name(),
                    status,
                    detail,
                }
            })
            .collect();
        Ok(RunReport {
            token: format!("{} ({})", self.token.name(), self.token.symbol()),
            actions,
            holders: self.holders()?,
            total_supply: self.decrypt(&self.token.total_supply(), &self.token.owner())?,
        })
    }

    fn holders(&self) -> Result<Vec<HolderReport>> {
        self.wallets
            .iter()
            .map(|(label, wallet)| {
                Ok(HolderReport {
                    wallet: label.clone(),
                    address: wallet.to_hex(),
                    balance: self.decrypt(&self.token.balance_of(wallet), wallet)?,
                    frozen_tokens: self.decrypt(&self.token.get_frozen_tokens(wallet), wallet)?,
                    frozen: self.token.is_frozen(wallet),
                })
            })
            .collect()
    }

    /// Decrypt as `requester`. Never-written slots read as zero for anyone.
    fn decrypt(&self, amount: &EncryptedAmount, requester: &Address) -> Result<u64> {
        self.backend
            .decrypt(amount.handle(), requester)
            .with_context(|| format!("decrypting for {requester}"))
    }
}

/// Deploy one module, apply its initial settings and bind it.
fn deploy_module(
    backend: &MockFheBackend,
    compliance: &ModularCompliance,
    owner: Address,
    address: Address,
    spec: &ModuleSpec,
) -> Result<()> {
    // Admin inputs reach the module through the compliance, so they are
    // bound to (module, compliance).
    let admin_input = |value: u64| {
        let (input, proof) = backend.encrypt_input(value, &address, &compliance.address());
        EncryptedInput { input, proof }
    };
    let countries = |codes: &[u16]| codes.iter().copied().map(CountryCode).collect::<Vec<_>>();

    let (module, calls): (Arc<dyn ComplianceModule>, Vec<ModuleCall>) = match spec {
        ModuleSpec::CountryRestrict { countries: codes } => (
            Arc::new(CountryRestrictModule::new(address)),
            non_empty(codes, |c| ModuleCall::BatchRestrictCountries(countries(c))),
        ),
        ModuleSpec::CountryAllow { countries: codes } => (
            Arc::new(CountryAllowModule::new(address)),
            non_empty(codes, |c| ModuleCall::BatchAllowCountries(countries(c))),
        ),
        ModuleSpec::TransferRestrict { users } => {
            let users = users
                .iter()
                .map(|u| resolve_address(u))
                .collect::<Result<Vec<_>>>()?;
            (
                Arc::new(TransferRestrictModule::new(address)),
                non_empty(&users, |u| ModuleCall::BatchAllowUsers(u.to_vec())),
            )
        }
        ModuleSpec::MaxBalance { cap, presets } => {
            let module = MaxBalanceModule::new(address);
            if !presets.is_empty() {
                let identities = presets
                    .iter()
                    .map(|p| resolve_identity(&p.identity))
                    .collect::<Result<Vec<_>>>()?;
                let values: Vec<_> = presets
                    .iter()
                    .map(|p| {
                        let (input, proof) = backend.encrypt_input(p.balance, &address, &owner);
                        EncryptedInput { input, proof }
                    })
                    .collect();
                module.batch_pre_set_module_state(&owner, compliance, &identities, &values)?;
            }
            module.preset_completed(&owner, compliance)?;
            (
                Arc::new(module),
                vec![ModuleCall::SetMaxBalance(admin_input(*cap))],
            )
        }
        ModuleSpec::SupplyLimit { limit } => (
            Arc::new(SupplyLimitModule::new(address)),
            vec![ModuleCall::SetSupplyLimit(admin_input(*limit))],
        ),
    };

    compliance.add_module(&owner, module)?;
    for call in calls {
        compliance.call_module_function(&owner, &address, call)?;
    }
    Ok(())
}

fn non_empty<T>(items: &[T], call: impl FnOnce(&[T]) -> ModuleCall) -> Vec<ModuleCall> {
    if items.is_empty() {
        Vec::new()
    } else {
        vec![call(items)]
    }
}

/// Execute the run subcommand.
pub fn run_scenario(args: &RunArgs, json: bool) -> Result<u8> {
    let scenario = Scenario::load(&args.scenario)?;
    let deployment = Deployment::deploy(&scenario)?;
    let report = deployment.run(&scenario)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report.to_text());
    }

    tracing::info!(
        actions = report.actions.len(),
        failures = report.failures(),
        "scenario finished"
    );
    Ok(0)
}
