//! # Scenario Files
//!
//! A scenario is a YAML document describing one deployment (token,
//! compliance, modules, identities) and an ordered list of actions to run
//! against it.
//!
//! Accounts are written either as labels (`alice`), which are turned into
//! addresses with [`Address::from_label`], or as `0x`-prefixed hex.
//!
//! ```yaml
//! token:
//!   name: Confidential Bond
//!   symbol: CBND
//!   owner: issuer
//! agents: [agent]
//! identities:
//!   - wallet: alice
//!     country: 250
//! modules:
//!   - kind: max_balance
//!     cap: 150
//! actions:
//!   - action: mint
//!     caller: agent
//!     to: alice
//!     amount: 100
//! ```

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use cct_compliance::{ComplianceConfig, MAX_COUNTRY_BATCH, MAX_PRESET_BATCH, MAX_USER_BATCH};
use cct_core::{Address, IdentityId};

/// A complete scenario document.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    pub token: TokenSpec,
    #[serde(default)]
    pub compliance: ComplianceSpec,
    /// Accounts granted the agent role by the token owner.
    #[serde(default)]
    pub agents: Vec<String>,
    #[serde(default)]
    pub identities: Vec<IdentitySpec>,
    /// Modules in binding order.
    #[serde(default)]
    pub modules: Vec<ModuleSpec>,
    #[serde(default)]
    pub actions: Vec<Action>,
}

/// Token deployment parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TokenSpec {
    pub name: String,
    pub symbol: String,
    #[serde(default)]
    pub decimals: u8,
    pub owner: String,
    /// Token account. Defaults to the label `token:<symbol>`.
    #[serde(default)]
    pub address: Option<String>,
}

/// Compliance deployment parameters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ComplianceSpec {
    /// Compliance owner. Defaults to the token owner.
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(flatten)]
    pub config: ComplianceConfig,
}

/// One registry entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IdentitySpec {
    pub wallet: String,
    /// Identity label. Defaults to the wallet label, so each wallet is its
    /// own identity unless two entries name the same one.
    #[serde(default)]
    pub identity: Option<String>,
    pub country: u16,
    #[serde(default = "default_verified")]
    pub verified: bool,
}

fn default_verified() -> bool {
    true
}

impl IdentitySpec {
    /// The identity reference, falling back to the wallet label.
    pub fn identity_ref(&self) -> &str {
        self.identity.as_deref().unwrap_or(&self.wallet)
    }
}

/// A module to deploy and bind, with its initial settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", deny_unknown_fields)]
pub enum ModuleSpec {
    CountryRestrict { countries: Vec<u16> },
    CountryAllow { countries: Vec<u16> },
    TransferRestrict { users: Vec<String> },
    MaxBalance {
        cap: u64,
        /// Identity balances carried over from before binding.
        #[serde(default)]
        presets: Vec<PresetSpec>,
    },
    SupplyLimit { limit: u64 },
}

impl ModuleSpec {
    /// Stable kind name, also used to derive the module account.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CountryRestrict { .. } => "country_restrict",
            Self::CountryAllow { .. } => "country_allow",
            Self::TransferRestrict { .. } => "transfer_restrict",
            Self::MaxBalance { .. } => "max_balance",
            Self::SupplyLimit { .. } => "supply_limit",
        }
    }
}

/// A preset identity balance.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PresetSpec {
    pub identity: String,
    pub balance: u64,
}

/// One scripted call. Amounts are encrypted by the submitting account
/// before the call.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case", deny_unknown_fields)]
pub enum Action {
    Mint { caller: String, to: String, amount: u64 },
    BatchMint { caller: String, to: Vec<String>, amounts: Vec<u64> },
    Burn { caller: String, from: String, amount: u64 },
    Transfer { from: String, to: String, amount: u64 },
    Approve { owner: String, spender: String, amount: u64 },
    TransferFrom { spender: String, from: String, to: String, amount: u64 },
    ForcedTransfer { caller: String, from: String, to: String, amount: u64 },
    FreezeTokens { caller: String, wallet: String, amount: u64 },
    UnfreezeTokens { caller: String, wallet: String, amount: u64 },
    SetFrozen { caller: String, wallet: String, frozen: bool },
    Pause { caller: String },
    Unpause { caller: String },
    Recover { caller: String, lost: String, new: String, identity: String },
}

impl Action {
    /// Action name as written in the scenario.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Mint { .. } => "mint",
            Self::BatchMint { .. } => "batch_mint",
            Self::Burn { .. } => "burn",
            Self::Transfer { .. } => "transfer",
            Self::Approve { .. } => "approve",
            Self::TransferFrom { .. } => "transfer_from",
            Self::ForcedTransfer { .. } => "forced_transfer",
            Self::FreezeTokens { .. } => "freeze_tokens",
            Self::UnfreezeTokens { .. } => "unfreeze_tokens",
            Self::SetFrozen { .. } => "set_frozen",
            Self::Pause { .. } => "pause",
            Self::Unpause { .. } => "unpause",
            Self::Recover { .. } => "recover",
        }
    }

    /// Every account reference in the action, identities excluded.
    fn accounts(&self) -> Vec<&String> {
        match self {
            Self::Mint { caller, to, .. } => vec![caller, to],
            Self::BatchMint { caller, to, .. } => {
                let mut all = vec![caller];
                all.extend(to);
                all
            }
            Self::Burn { caller, from, .. } => vec![caller, from],
            Self::Transfer { from, to, .. } => vec![from, to],
            Self::Approve { owner, spender, .. } => vec![owner, spender],
            Self::TransferFrom { spender, from, to, .. } => vec![spender, from, to],
            Self::ForcedTransfer { caller, from, to, .. } => vec![caller, from, to],
            Self::FreezeTokens { caller, wallet, .. }
            | Self::UnfreezeTokens { caller, wallet, .. }
            | Self::SetFrozen { caller, wallet, .. } => vec![caller, wallet],
            Self::Pause { caller } | Self::Unpause { caller } => vec![caller],
            Self::Recover { caller, lost, new, .. } => vec![caller, lost, new],
        }
    }
}

/// Resolve an account reference: `0x` hex or a label.
pub fn resolve_address(reference: &str) -> Result<Address> {
    if reference.starts_with("0x") {
        reference
            .parse()
            .with_context(|| format!("invalid account reference {reference:?}"))
    } else {
        Ok(Address::from_label(reference))
    }
}

/// Resolve an identity reference: `0x` hex or a label.
pub fn resolve_identity(reference: &str) -> Result<IdentityId> {
    if reference.starts_with("0x") {
        resolve_address(reference).map(IdentityId)
    } else {
        Ok(IdentityId::from_label(reference))
    }
}

impl Scenario {
    /// Parse a scenario from YAML text.
    pub fn from_yaml(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).context("failed to parse scenario YAML")
    }

    /// Read and parse a scenario file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario {}", path.display()))?;
        Self::from_yaml(&text).with_context(|| format!("in {}", path.display()))
    }

    /// The token account.
    pub fn token_address(&self) -> Result<Address> {
        match &self.token.address {
            Some(reference) => resolve_address(reference),
            None => Ok(Address::from_label(&format!(
                "token:{}",
                self.token.symbol.to_lowercase()
            ))),
        }
    }

    /// The compliance owner account.
    pub fn compliance_owner(&self) -> &str {
        self.compliance.owner.as_deref().unwrap_or(&self.token.owner)
    }

    /// Structural problems that would make deployment fail. Problems inside
    /// individual actions are left to the run, where they are reported per
    /// action.
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();
        let mut check_ref = |what: String, reference: &str| {
            if let Err(err) = resolve_address(reference) {
                problems.push(format!("{what}: {err:#}"));
            }
        };

        check_ref("token.owner".into(), &self.token.owner);
        if let Some(address) = &self.token.address {
            check_ref("token.address".into(), address);
        }
        if let Some(owner) = &self.compliance.owner {
            check_ref("compliance.owner".into(), owner);
        }
        for (i, agent) in self.agents.iter().enumerate() {
            check_ref(format!("agents[{i}]"), agent);
        }
        for (i, identity) in self.identities.iter().enumerate() {
            check_ref(format!("identities[{i}].wallet"), &identity.wallet);
        }
        for (i, module) in self.modules.iter().enumerate() {
            if let ModuleSpec::TransferRestrict { users } = module {
                for user in users {
                    check_ref(format!("modules[{i}].users"), user);
                }
            }
        }
        for (i, action) in self.actions.iter().enumerate() {
            for account in action.accounts() {
                check_ref(format!("actions[{i}] ({})", action.name()), account.as_str());
            }
        }

        if self.token.name.trim().is_empty() {
            problems.push("token.name is empty".into());
        }
        if self.token.symbol.trim().is_empty() {
            problems.push("token.symbol is empty".into());
        }

        let mut wallets = HashSet::new();
        for identity in &self.identities {
            if !wallets.insert(identity.wallet.as_str()) {
                problems.push(format!("wallet {:?} is registered twice", identity.wallet));
            }
        }

        if self.modules.len() > self.compliance.config.max_modules {
            problems.push(format!(
                "{} modules exceed the compliance capacity of {}",
                self.modules.len(),
                self.compliance.config.max_modules
            ));
        }
        for (i, module) in self.modules.iter().enumerate() {
            let (len, max) = match module {
                ModuleSpec::CountryRestrict { countries } | ModuleSpec::CountryAllow { countries } => {
                    (countries.len(), MAX_COUNTRY_BATCH)
                }
                ModuleSpec::TransferRestrict { users } => (users.len(), MAX_USER_BATCH),
                ModuleSpec::MaxBalance { presets, .. } => (presets.len(), MAX_PRESET_BATCH),
                ModuleSpec::SupplyLimit { .. } => (0, usize::MAX),
            };
            if len > max {
                problems.push(format!(
                    "modules[{i}] ({}): {len} entries exceed the batch limit of {max}",
                    module.kind()
                ));
            }
        }

        for (i, action) in self.actions.iter().enumerate() {
            if let Action::BatchMint { to, amounts, .. } = action {
                if to.len() != amounts.len() {
                    problems.push(format!(
                        "actions[{i}] (batch_mint): {} receivers but {} amounts",
                        to.len(),
                        amounts.len()
                    ));
                }
            }
        }
        problems
    }
}
