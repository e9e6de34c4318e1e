//! # Token Events
//!
//! Amount-carrying events hold ciphertext handles only. A confidential
//! action emits the same event kinds whether its hidden checks passed or
//! not.

use serde::{Deserialize, Serialize};

use cct_core::{Address, EventKind, IdentityId};
use cct_fhe::Handle;

/// Public events emitted by the token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenEvent {
    /// Effective amount moved. `from` is zero for mints, `to` for burns.
    Transfer {
        from: Address,
        to: Address,
        amount: Handle,
    },
    /// Allowance set.
    Approval {
        owner: Address,
        spender: Address,
        amount: Handle,
    },
    /// Token paused by an agent.
    Paused { agent: Address },
    /// Token unpaused by an agent.
    Unpaused { agent: Address },
    /// A wallet was frozen or unfrozen.
    AddressFrozen {
        wallet: Address,
        frozen: bool,
        agent: Address,
    },
    /// Part of a balance was frozen.
    TokensFrozen { wallet: Address, amount: Handle },
    /// Part of the frozen balance was released.
    TokensUnfrozen { wallet: Address, amount: Handle },
    /// A lost wallet's holdings moved to a new wallet of the same identity.
    RecoverySuccess {
        lost: Address,
        new: Address,
        identity: IdentityId,
    },
    /// A compliance was set.
    ComplianceAdded { compliance: Address },
    /// An identity registry was set.
    IdentityRegistryAdded,
    /// An agent was added.
    AgentAdded { agent: Address },
    /// An agent was removed.
    AgentRemoved { agent: Address },
}

impl EventKind for TokenEvent {
    fn kind(&self) -> &'static str {
        match self {
            Self::Transfer { .. } => "Transfer",
            Self::Approval { .. } => "Approval",
            Self::Paused { .. } => "Paused",
            Self::Unpaused { .. } => "Unpaused",
            Self::AddressFrozen { .. } => "AddressFrozen",
            Self::TokensFrozen { .. } => "TokensFrozen",
            Self::TokensUnfrozen { .. } => "TokensUnfrozen",
            Self::RecoverySuccess { .. } => "RecoverySuccess",
            Self::ComplianceAdded { .. } => "ComplianceAdded",
            Self::IdentityRegistryAdded => "IdentityRegistryAdded",
            Self::AgentAdded { .. } => "AgentAdded",
            Self::AgentRemoved { .. } => "AgentRemoved",
        }
    }
}
