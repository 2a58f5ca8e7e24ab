use crate::attempt::Branch;

/// Errors that reject a [`HedgeConfig`](crate::HedgeConfig) at construction time.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// The standard deviation multiplier is negative, infinite or NaN.
    #[error("multiplier must be finite and non-negative, got {0}")]
    InvalidMultiplier(f64),

    /// The latency window cannot hold any sample.
    #[error("window capacity must be positive")]
    ZeroWindowCapacity,

    /// Organic requests would never fund the budget.
    #[error("deposit amount must be positive")]
    ZeroDeposit,

    /// Backups would cost nothing, leaving hedging unbounded.
    #[error("withdraw amount must be positive")]
    ZeroWithdraw,

    /// The budget cannot hold any token.
    #[error("max tokens must be positive")]
    ZeroMaxTokens,

    /// A single backup costs more than the budget can ever hold.
    #[error("withdraw amount {withdraw} exceeds max tokens {max}")]
    WithdrawExceedsMax { withdraw: u32, max: u32 },

    /// The budget would start above its own cap.
    #[error("initial tokens {initial} exceed max tokens {max}")]
    InitialExceedsMax { initial: u32, max: u32 },
}

/// Errors returned by a hedged resolution.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum HedgeError<E> {
    /// The call that settled the race failed; the underlying error is kept verbatim.
    #[error("resolution failed on the {} call", .branch.as_str())]
    Failed {
        /// The call whose failure settled the request.
        branch: Branch,
        #[source]
        error: E,
    },

    /// Every call issued for the request was cancelled.
    #[error("resolution cancelled")]
    Cancelled,
}

impl<E> HedgeError<E> {
    /// Returns `true` if the request was cancelled rather than failed.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, HedgeError::Cancelled)
    }

    /// The call whose failure settled the request, if it failed.
    pub fn branch(&self) -> Option<Branch> {
        match self {
            HedgeError::Failed { branch, .. } => Some(*branch),
            HedgeError::Cancelled => None,
        }
    }

    /// The underlying failure, if any.
    pub fn into_failure(self) -> Option<E> {
        match self {
            HedgeError::Failed { error, .. } => Some(error),
            HedgeError::Cancelled => None,
        }
    }
}
