//! # Compliance Configuration
//!
//! Engine capacity and per-call batch ceilings. Batch ceilings bound the
//! worst-case cost of a single admin call.

use serde::{Deserialize, Serialize};

use crate::error::ComplianceError;

/// Default ceiling on modules bound to one compliance.
pub const DEFAULT_MAX_MODULES: usize = 30;

/// Maximum countries per batch call (size of the enumerable country domain).
pub const MAX_COUNTRY_BATCH: usize = 195;

/// Maximum wallet addresses per batch allow/disallow call.
pub const MAX_USER_BATCH: usize = 500;

/// Maximum identities per batch preset call.
pub const MAX_PRESET_BATCH: usize = 500;

/// Configuration of a [`ModularCompliance`](crate::ModularCompliance).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComplianceConfig {
    /// Module capacity ceiling enforced by `add_module`.
    pub max_modules: usize,
}

impl Default for ComplianceConfig {
    fn default() -> Self {
        Self {
            max_modules: DEFAULT_MAX_MODULES,
        }
    }
}

/// Reject empty batches and batches over `max` items.
pub(crate) fn check_batch(len: usize, max: usize) -> Result<(), ComplianceError> {
    if len == 0 {
        return Err(ComplianceError::EmptyBatch);
    }
    if len > max {
        return Err(ComplianceError::BatchTooLarge { len, max });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        assert_eq!(ComplianceConfig::default().max_modules, 30);
    }

    #[test]
    fn test_config_missing_fields_take_defaults() {
        let cfg: ComplianceConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg, ComplianceConfig::default());
    }

    #[test]
    fn test_check_batch_bounds() {
        assert!(check_batch(1, MAX_COUNTRY_BATCH).is_ok());
        assert!(check_batch(195, MAX_COUNTRY_BATCH).is_ok());
        assert!(matches!(
            check_batch(196, MAX_COUNTRY_BATCH),
            Err(ComplianceError::BatchTooLarge { len: 196, max: 195 })
        ));
        assert!(matches!(check_batch(0, 10), Err(ComplianceError::EmptyBatch)));
    }
}
