//! # Confidential Token
//!
//! Token state and its plaintext surface: roles, pause, wallet freezing,
//! compliance and registry wiring, and read access to encrypted balances.
//! The confidential actions live in [`gate`](crate::gate).
//!
//! ## Roles
//!
//! | Role | Operations |
//! |------|------------|
//! | owner | `add_agent`, `remove_agent`, `set_compliance`, `set_identity_registry` |
//! | agent | mint, burn, pause, freezes, forced transfer, recovery |
//! | holder | `transfer`, `approve`, `transfer_from` |

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use cct_compliance::{IdentityRegistry, ModularCompliance};
use cct_core::{Address, EventLog, EventRecord};
use cct_fhe::{EncryptedAmount, Fhe};

use crate::config::TokenConfig;
use crate::error::TokenError;
use crate::event::TokenEvent;

/// Mutable token state. One write lock covers a whole action.
pub(crate) struct TokenState {
    pub(crate) owner: Address,
    pub(crate) agents: BTreeSet<Address>,
    pub(crate) paused: bool,
    pub(crate) frozen: HashSet<Address>,
    pub(crate) balances: HashMap<Address, EncryptedAmount>,
    pub(crate) frozen_tokens: HashMap<Address, EncryptedAmount>,
    pub(crate) allowances: HashMap<(Address, Address), EncryptedAmount>,
    pub(crate) total_supply: EncryptedAmount,
    pub(crate) compliance: Arc<ModularCompliance>,
    pub(crate) registry: Arc<dyn IdentityRegistry>,
    pub(crate) events: EventLog<TokenEvent>,
}

impl TokenState {
    pub(crate) fn balance(&self, holder: &Address) -> EncryptedAmount {
        self.balances.get(holder).copied().unwrap_or_default()
    }

    pub(crate) fn frozen_amount(&self, holder: &Address) -> EncryptedAmount {
        self.frozen_tokens.get(holder).copied().unwrap_or_default()
    }

    pub(crate) fn allowance(&self, owner: &Address, spender: &Address) -> EncryptedAmount {
        self.allowances
            .get(&(*owner, *spender))
            .copied()
            .unwrap_or_default()
    }

    pub(crate) fn require_owner(&self, caller: &Address) -> Result<(), TokenError> {
        if *caller == self.owner {
            Ok(())
        } else {
            Err(TokenError::Unauthorized {
                caller: *caller,
                required: "owner",
            })
        }
    }

    pub(crate) fn require_agent(&self, caller: &Address) -> Result<(), TokenError> {
        if self.agents.contains(caller) {
            Ok(())
        } else {
            Err(TokenError::Unauthorized {
                caller: *caller,
                required: "agent",
            })
        }
    }

    pub(crate) fn require_not_paused(&self) -> Result<(), TokenError> {
        if self.paused {
            Err(TokenError::Paused)
        } else {
            Ok(())
        }
    }

    pub(crate) fn require_not_frozen(&self, wallet: &Address) -> Result<(), TokenError> {
        if self.frozen.contains(wallet) {
            Err(TokenError::WalletFrozen { wallet: *wallet })
        } else {
            Ok(())
        }
    }

    pub(crate) fn require_verified(&self, wallet: &Address) -> Result<(), TokenError> {
        if wallet.is_zero() {
            return Err(TokenError::ZeroAddress("receiver"));
        }
        if self.registry.is_verified(wallet) {
            Ok(())
        } else {
            Err(TokenError::ReceiverNotVerified { wallet: *wallet })
        }
    }
}

/// A token whose balances, allowances and frozen amounts are ciphertexts.
pub struct ConfidentialToken {
    pub(crate) address: Address,
    pub(crate) name: String,
    pub(crate) symbol: String,
    pub(crate) decimals: u8,
    pub(crate) fhe: Fhe,
    pub(crate) state: RwLock<TokenState>,
}

impl fmt::Debug for ConfidentialToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfidentialToken")
            .field("address", &self.address)
            .field("symbol", &self.symbol)
            .finish_non_exhaustive()
    }
}

impl ConfidentialToken {
    /// Deploy a token at `address` and bind it to `compliance`.
    ///
    /// # Errors
    ///
    /// Fails when an address is zero or the compliance already has a token.
    pub fn new(
        address: Address,
        config: TokenConfig,
        fhe: Fhe,
        registry: Arc<dyn IdentityRegistry>,
        compliance: Arc<ModularCompliance>,
    ) -> Result<Self, TokenError> {
        if address.is_zero() {
            return Err(TokenError::ZeroAddress("token"));
        }
        if config.owner.is_zero() {
            return Err(TokenError::ZeroAddress("owner"));
        }
        compliance.bind_token(&address, address)?;

        let mut events = EventLog::new();
        events.emit(TokenEvent::IdentityRegistryAdded);
        events.emit(TokenEvent::ComplianceAdded {
            compliance: compliance.address(),
        });
        tracing::info!(token = %address, symbol = %config.symbol, owner = %config.owner, "token deployed");

        Ok(Self {
            address,
            name: config.name,
            symbol: config.symbol,
            decimals: config.decimals,
            fhe,
            state: RwLock::new(TokenState {
                owner: config.owner,
                agents: BTreeSet::new(),
                paused: false,
                frozen: HashSet::new(),
                balances: HashMap::new(),
                frozen_tokens: HashMap::new(),
                allowances: HashMap::new(),
                total_supply: EncryptedAmount::UNINITIALIZED,
                compliance,
                registry,
                events,
            }),
        })
    }

    // ─── Queries ─────────────────────────────────────────────────────

    /// The token's own address.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Token name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Token symbol.
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Display decimals.
    pub fn decimals(&self) -> u8 {
        self.decimals
    }

    /// The oblivious arithmetic layer.
    pub fn fhe(&self) -> &Fhe {
        &self.fhe
    }

    /// The current owner.
    pub fn owner(&self) -> Address {
        self.state.read().owner
    }

    /// Whether `account` holds the agent role.
    pub fn is_agent(&self, account: &Address) -> bool {
        self.state.read().agents.contains(account)
    }

    /// Whether the token is paused.
    pub fn paused(&self) -> bool {
        self.state.read().paused
    }

    /// Whether `wallet` is frozen.
    pub fn is_frozen(&self, wallet: &Address) -> bool {
        self.state.read().frozen.contains(wallet)
    }

    /// Encrypted balance of `holder`.
    pub fn balance_of(&self, holder: &Address) -> EncryptedAmount {
        self.state.read().balance(holder)
    }

    /// Encrypted frozen part of `holder`'s balance.
    pub fn get_frozen_tokens(&self, holder: &Address) -> EncryptedAmount {
        self.state.read().frozen_amount(holder)
    }

    /// Encrypted allowance of `spender` over `owner`'s balance.
    pub fn allowance(&self, owner: &Address, spender: &Address) -> EncryptedAmount {
        self.state.read().allowance(owner, spender)
    }

    /// Encrypted total supply.
    pub fn total_supply(&self) -> EncryptedAmount {
        self.state.read().total_supply
    }

    /// The bound compliance.
    pub fn compliance(&self) -> Arc<ModularCompliance> {
        self.state.read().compliance.clone()
    }

    /// The identity registry in use.
    pub fn identity_registry(&self) -> Arc<dyn IdentityRegistry> {
        self.state.read().registry.clone()
    }

    /// Events emitted so far.
    pub fn events(&self) -> Vec<EventRecord<TokenEvent>> {
        self.state.read().events.records().to_vec()
    }

    // ─── Owner operations ────────────────────────────────────────────

    /// Grant the agent role.
    pub fn add_agent(&self, caller: &Address, agent: Address) -> Result<(), TokenError> {
        self.apply("add_agent", |state| {
            state.require_owner(caller)?;
            if agent.is_zero() {
                return Err(TokenError::ZeroAddress("agent"));
            }
            if !state.agents.insert(agent) {
                return Err(TokenError::AgentAlreadyAdded { agent });
            }
            state.events.emit(TokenEvent::AgentAdded { agent });
            tracing::info!(token = %self.address, %agent, "agent added");
            Ok(())
        })
    }

    /// Revoke the agent role.
    pub fn remove_agent(&self, caller: &Address, agent: &Address) -> Result<(), TokenError> {
        self.apply("remove_agent", |state| {
            state.require_owner(caller)?;
            if !state.agents.remove(agent) {
                return Err(TokenError::AgentNotFound { agent: *agent });
            }
            state.events.emit(TokenEvent::AgentRemoved { agent: *agent });
            tracing::info!(token = %self.address, %agent, "agent removed");
            Ok(())
        })
    }

    /// Switch to another compliance. The new one is bound before the old
    /// one is released, and is unbound again if the release fails, so a
    /// failure leaves the token on the old one. An old compliance whose
    /// owner has already bound it elsewhere has nothing to release.
    pub fn set_compliance(&self, caller: &Address, compliance: Arc<ModularCompliance>) -> Result<(), TokenError> {
        self.apply("set_compliance", |state| {
            state.require_owner(caller)?;
            compliance.bind_token(&self.address, self.address)?;
            if state.compliance.get_token_bound() == Some(self.address) {
                if let Err(error) = state.compliance.unbind_token(&self.address, self.address) {
                    compliance.unbind_token(&self.address, self.address)?;
                    return Err(error.into());
                }
            }
            let bound = compliance.address();
            state.compliance = compliance;
            state.events.emit(TokenEvent::ComplianceAdded { compliance: bound });
            tracing::info!(token = %self.address, compliance = %bound, "compliance set");
            Ok(())
        })
    }

    /// Replace the identity registry.
    pub fn set_identity_registry(
        &self,
        caller: &Address,
        registry: Arc<dyn IdentityRegistry>,
    ) -> Result<(), TokenError> {
        self.apply("set_identity_registry", |state| {
            state.require_owner(caller)?;
            state.registry = registry;
            state.events.emit(TokenEvent::IdentityRegistryAdded);
            tracing::info!(token = %self.address, "identity registry set");
            Ok(())
        })
    }

    // ─── Agent plaintext operations ──────────────────────────────────

    /// Pause holder transfers.
    pub fn pause(&self, caller: &Address) -> Result<(), TokenError> {
        self.apply("pause", |state| {
            state.require_agent(caller)?;
            state.require_not_paused()?;
            state.paused = true;
            state.events.emit(TokenEvent::Paused { agent: *caller });
            tracing::info!(token = %self.address, agent = %caller, "token paused");
            Ok(())
        })
    }

    /// Resume holder transfers.
    pub fn unpause(&self, caller: &Address) -> Result<(), TokenError> {
        self.apply("unpause", |state| {
            state.require_agent(caller)?;
            if !state.paused {
                return Err(TokenError::NotPaused);
            }
            state.paused = false;
            state.events.emit(TokenEvent::Unpaused { agent: *caller });
            tracing::info!(token = %self.address, agent = %caller, "token unpaused");
            Ok(())
        })
    }

    /// Freeze or unfreeze a whole wallet.
    pub fn set_address_frozen(&self, caller: &Address, wallet: Address, frozen: bool) -> Result<(), TokenError> {
        self.apply("set_address_frozen", |state| {
            state.require_agent(caller)?;
            if wallet.is_zero() {
                return Err(TokenError::ZeroAddress("wallet"));
            }
            if frozen {
                state.frozen.insert(wallet);
            } else {
                state.frozen.remove(&wallet);
            }
            state.events.emit(TokenEvent::AddressFrozen {
                wallet,
                frozen,
                agent: *caller,
            });
            tracing::info!(token = %self.address, %wallet, frozen, "wallet freeze updated");
            Ok(())
        })
    }

    /// Run `action` under the state write lock, logging a structural
    /// rejection before handing it back to the caller.
    pub(crate) fn apply<T>(
        &self,
        action: &'static str,
        f: impl FnOnce(&mut TokenState) -> Result<T, TokenError>,
    ) -> Result<T, TokenError> {
        let mut state = self.state.write();
        let result = f(&mut state);
        if let Err(error) = &result {
            tracing::warn!(token = %self.address, action, %error, "token call rejected");
        }
        result
    }
}
