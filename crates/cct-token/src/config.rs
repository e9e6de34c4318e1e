//! # Token Configuration
//!
//! Public metadata and the initial owner of a [`ConfidentialToken`](crate::ConfidentialToken).

use serde::{Deserialize, Serialize};

use cct_core::Address;

/// Decimals used when a scenario does not specify any.
pub const DEFAULT_DECIMALS: u8 = 0;

/// Token metadata and initial owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenConfig {
    /// Human-readable name.
    pub name: String,
    /// Ticker symbol.
    pub symbol: String,
    /// Display decimals. Encrypted amounts are raw integer units.
    #[serde(default = "default_decimals")]
    pub decimals: u8,
    /// Initial owner. The owner manages agents, compliance and registry.
    pub owner: Address,
}

fn default_decimals() -> u8 {
    DEFAULT_DECIMALS
}

impl TokenConfig {
    /// Build a config with default decimals.
    pub fn new(name: impl Into<String>, symbol: impl Into<String>, owner: Address) -> Self {
        Self {
            name: name.into(),
            symbol: symbol.into(),
            decimals: DEFAULT_DECIMALS,
            owner,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decimals_default_when_missing() {
        let owner = Address::from_label("owner");
        let json = format!(r#"{{"name":"Bond","symbol":"BND","owner":"{owner}"}}"#);
        let cfg: TokenConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(cfg, TokenConfig::new("Bond", "BND", owner));
    }
}
