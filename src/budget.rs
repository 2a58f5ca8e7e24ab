//! Admission control for backup requests.
//!
//! Organic requests deposit tokens and every backup withdraws a larger amount,
//! which bounds the extra load hedging adds to `deposit / withdraw` of the
//! organic traffic, with bursts of at most `max_tokens / withdraw` backups.

/// Decides whether a backup request may be issued.
pub trait AdmissionBudget: Send + 'static {
    /// Credits the budget for one organic request.
    fn fund(&mut self);

    /// Withdraws the cost of one backup, returning `false` (and withdrawing
    /// nothing) when the budget cannot cover it.
    fn try_consume(&mut self) -> bool;

    /// Tokens currently available, for budgets that count them.
    fn tokens(&self) -> Option<u32> {
        None
    }
}

/// Token counter bounded to `[0, max_tokens]`.
///
/// ```
/// use hedged_resolver::{AdmissionBudget, TokenBudget};
///
/// let mut budget = TokenBudget::new(1, 20, 100);
/// for _ in 0..20 {
///     budget.fund();
/// }
/// assert!(budget.try_consume());
/// assert!(!budget.try_consume());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenBudget {
    deposit_amount: u32,
    withdraw_amount: u32,
    max_tokens: u32,
    tokens: u32,
}

impl TokenBudget {
    /// Creates an empty budget.
    pub fn new(deposit_amount: u32, withdraw_amount: u32, max_tokens: u32) -> Self {
        Self::with_initial_tokens(deposit_amount, withdraw_amount, max_tokens, 0)
    }

    /// Creates a budget holding `initial_tokens`, capped at `max_tokens`.
    pub fn with_initial_tokens(
        deposit_amount: u32,
        withdraw_amount: u32,
        max_tokens: u32,
        initial_tokens: u32,
    ) -> Self {
        Self {
            deposit_amount,
            withdraw_amount,
            max_tokens,
            tokens: initial_tokens.min(max_tokens),
        }
    }

    /// Tokens currently held.
    pub fn available(&self) -> u32 {
        self.tokens
    }
}

impl Default for TokenBudget {
    /// 5% extra load and a burst of at most 5 hedges.
    fn default() -> Self {
        Self::new(1, 20, 100)
    }
}

impl AdmissionBudget for TokenBudget {
    fn fund(&mut self) {
        self.tokens = self
            .tokens
            .saturating_add(self.deposit_amount)
            .min(self.max_tokens);
    }

    fn try_consume(&mut self) -> bool {
        if self.tokens < self.withdraw_amount {
            return false;
        }
        self.tokens -= self.withdraw_amount;
        true
    }

    fn tokens(&self) -> Option<u32> {
        Some(self.tokens)
    }
}

/// Grants every backup and never depletes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UnlimitedBudget;

impl AdmissionBudget for UnlimitedBudget {
    fn fund(&mut self) {}

    fn try_consume(&mut self) -> bool {
        true
    }
}

/// Denies every backup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClosedBudget;

impl AdmissionBudget for ClosedBudget {
    fn fund(&mut self) {}

    fn try_consume(&mut self) -> bool {
        false
    }
}
