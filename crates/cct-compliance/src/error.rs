//! # Compliance Errors
//!
//! Every variant is a structural or authorization failure derivable from
//! public data. There is deliberately no variant for "rule not satisfied":
//! that outcome is an encrypted `false` verdict.

use thiserror::Error;

use cct_core::{Address, CountryCode};
use cct_fhe::FheError;

/// Errors raised by the compliance engine, its modules and the registry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ComplianceError {
    /// The caller lacks the role the operation requires.
    #[error("{caller} is not authorized: {required} required")]
    Unauthorized {
        /// The rejected caller.
        caller: Address,
        /// The role that was required.
        required: &'static str,
    },

    /// A zero address was supplied where a real account is required.
    #[error("zero address supplied for {0}")]
    ZeroAddress(&'static str),

    /// The module is already bound to this compliance.
    #[error("module {module} is already bound")]
    ModuleAlreadyBound {
        /// The module address.
        module: Address,
    },

    /// The module is not bound to this compliance.
    #[error("module {module} is not bound")]
    ModuleNotBound {
        /// The module address.
        module: Address,
    },

    /// The module refused to bind (preset not completed).
    #[error("module {module} cannot bind to compliance {compliance}")]
    ModuleCannotBind {
        /// The module address.
        module: Address,
        /// The compliance that tried to bind it.
        compliance: Address,
    },

    /// The compliance is already at its module capacity.
    #[error("cannot add more than {max} modules")]
    ModuleLimitReached {
        /// The configured ceiling.
        max: usize,
    },

    /// The module already records this compliance as bound.
    #[error("compliance {compliance} is already bound to the module")]
    ComplianceAlreadyBound {
        /// The compliance address.
        compliance: Address,
    },

    /// The calling compliance is not bound to the module.
    #[error("compliance {compliance} is not bound to the module")]
    ComplianceNotBound {
        /// The compliance address.
        compliance: Address,
    },

    /// The compliance already has a token bound.
    #[error("compliance already bound to token {token}")]
    TokenAlreadyBound {
        /// The token currently bound.
        token: Address,
    },

    /// The supplied token is not the one bound to the compliance.
    #[error("token {token} is not bound to this compliance")]
    TokenNotBound {
        /// The token that was supplied.
        token: Address,
    },

    /// Module state is frozen once the preset has completed.
    #[error("preset already completed for compliance {compliance}")]
    PresetAlreadyCompleted {
        /// The compliance whose preset is closed.
        compliance: Address,
    },

    /// Preset attempted while the module is already live on the compliance.
    #[error("module already bound to compliance {compliance}; preset is closed")]
    PresetAfterBind {
        /// The compliance the module is bound to.
        compliance: Address,
    },

    /// A batch call was empty.
    #[error("batch must not be empty")]
    EmptyBatch,

    /// A batch call exceeded its per-call ceiling.
    #[error("batch of {len} items exceeds the maximum of {max}")]
    BatchTooLarge {
        /// Items supplied.
        len: usize,
        /// Per-call ceiling.
        max: usize,
    },

    /// Paired arrays had different lengths.
    #[error("array length mismatch: {left} vs {right}")]
    LengthMismatch {
        /// Length of the first array.
        left: usize,
        /// Length of the second array.
        right: usize,
    },

    /// The country is already restricted.
    #[error("country {0} already restricted")]
    CountryAlreadyRestricted(CountryCode),

    /// The country is not restricted.
    #[error("country {0} not restricted")]
    CountryNotRestricted(CountryCode),

    /// The country is already allowed.
    #[error("country {0} already allowed")]
    CountryAlreadyAllowed(CountryCode),

    /// The country is not allowed.
    #[error("country {0} not allowed")]
    CountryNotAllowed(CountryCode),

    /// A batch listed the same country twice.
    #[error("country {0} listed twice in batch")]
    DuplicateCountry(CountryCode),

    /// The wallet has no identity in the registry.
    #[error("no identity registered for wallet {wallet}")]
    IdentityNotFound {
        /// The wallet that was looked up.
        wallet: Address,
    },

    /// The wallet is already registered.
    #[error("wallet {wallet} is already registered")]
    WalletAlreadyRegistered {
        /// The wallet.
        wallet: Address,
    },

    /// The module does not implement the requested admin call.
    #[error("module {module} does not support {call}")]
    UnsupportedCall {
        /// The module's name.
        module: &'static str,
        /// The call's name.
        call: &'static str,
    },

    /// An encrypted input failed verification.
    #[error("encrypted input rejected: {0}")]
    Fhe(#[from] FheError),
}
