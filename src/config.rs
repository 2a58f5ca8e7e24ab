use std::num::NonZeroUsize;

use crate::{
    budget::TokenBudget,
    errors::ConfigError,
    estimator::{StdevEstimator, DEFAULT_MULTIPLIER},
    window::DEFAULT_CAPACITY,
};

/// Hedging strategy configuration.
///
/// Controls how soon a backup request is issued and how much extra load
/// backups may add. All values are fixed for the lifetime of a
/// [`HedgedResolver`](crate::HedgedResolver).
#[derive(Debug, Clone, PartialEq)]
pub struct HedgeConfig {
    /// Number of standard deviations above the mean latency to wait before hedging.
    ///
    /// Higher values hedge later and less often.
    pub multiplier: f64,

    /// Number of recent latency samples the delay is estimated from.
    pub window_capacity: usize,

    /// Tokens credited to the budget for every organic request.
    pub deposit_amount: u32,

    /// Tokens a single backup request costs.
    ///
    /// The steady-state extra load is `deposit_amount / withdraw_amount`.
    pub withdraw_amount: u32,

    /// Upper bound of the token count.
    ///
    /// At most `max_tokens / withdraw_amount` backups can be issued back to back.
    pub max_tokens: u32,

    /// Tokens available before any organic request has been seen.
    pub initial_tokens: u32,
}

impl Default for HedgeConfig {
    fn default() -> Self {
        Self {
            multiplier: DEFAULT_MULTIPLIER,
            window_capacity: DEFAULT_CAPACITY,
            deposit_amount: 1,
            withdraw_amount: 20,
            max_tokens: 100,
            initial_tokens: 0,
        }
    }
}

impl HedgeConfig {
    /// Creates a conservative hedging configuration.
    ///
    /// Hedges only far out in the tail and sparingly:
    /// - 4 standard deviations above the mean
    /// - 2% extra load
    /// - bursts of at most 2 backups
    pub fn conservative() -> Self {
        Self {
            multiplier: 4.0,
            withdraw_amount: 50,
            ..Self::default()
        }
    }

    /// Creates an aggressive hedging configuration.
    ///
    /// Prioritizes latency over extra load:
    /// - 2 standard deviations above the mean
    /// - 10% extra load
    /// - bursts of up to 10 backups
    pub fn aggressive() -> Self {
        Self {
            multiplier: 2.0,
            withdraw_amount: 10,
            ..Self::default()
        }
    }

    /// Checks that the configuration can build a working estimator and budget.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.multiplier.is_finite() || self.multiplier < 0.0 {
            return Err(ConfigError::InvalidMultiplier(self.multiplier));
        }
        if self.window_capacity == 0 {
            return Err(ConfigError::ZeroWindowCapacity);
        }
        if self.deposit_amount == 0 {
            return Err(ConfigError::ZeroDeposit);
        }
        if self.withdraw_amount == 0 {
            return Err(ConfigError::ZeroWithdraw);
        }
        if self.max_tokens == 0 {
            return Err(ConfigError::ZeroMaxTokens);
        }
        if self.withdraw_amount > self.max_tokens {
            return Err(ConfigError::WithdrawExceedsMax {
                withdraw: self.withdraw_amount,
                max: self.max_tokens,
            });
        }
        if self.initial_tokens > self.max_tokens {
            return Err(ConfigError::InitialExceedsMax {
                initial: self.initial_tokens,
                max: self.max_tokens,
            });
        }
        Ok(())
    }

    /// Builds the default estimator and budget described by this configuration.
    pub(crate) fn build(&self) -> Result<(StdevEstimator, TokenBudget), ConfigError> {
        self.validate()?;
        let capacity =
            NonZeroUsize::new(self.window_capacity).ok_or(ConfigError::ZeroWindowCapacity)?;

        Ok((
            StdevEstimator::new(self.multiplier, capacity),
            TokenBudget::with_initial_tokens(
                self.deposit_amount,
                self.withdraw_amount,
                self.max_tokens,
                self.initial_tokens,
            ),
        ))
    }
}
