//! Poll cursor and error budget owned by the update watcher.

use std::str::FromStr;

/// Offset into the update stream.
///
/// Starts at 0 (no offset sent). Only moves forward.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollCursor(i64);

impl PollCursor {
    pub fn new() -> Self {
        Self(0)
    }

    pub fn offset(&self) -> i64 {
        self.0
    }

    /// Move past `last_update_id`. A stale id leaves the cursor where it is.
    pub fn advance_past(&mut self, last_update_id: i64) {
        self.0 = self.0.max(last_update_id.saturating_add(1));
    }
}

/// Whether a healthy cycle forgives earlier failures.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BudgetPolicy {
    /// Every failure counts for the whole process lifetime.
    #[default]
    Lifetime,
    /// A well-formed poll response resets the counter.
    Consecutive,
}

impl FromStr for BudgetPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lifetime" => Ok(BudgetPolicy::Lifetime),
            "consecutive" => Ok(BudgetPolicy::Consecutive),
            other => Err(format!("expected 'lifetime' or 'consecutive', got '{other}'")),
        }
    }
}

/// Circuit breaker counting bad poll responses.
#[derive(Debug, Clone)]
pub struct ErrorBudget {
    errors: u16,
    limit: u16,
    policy: BudgetPolicy,
}

impl ErrorBudget {
    /// `limit` must be non-zero; the config layer rejects zero.
    pub fn new(limit: u16, policy: BudgetPolicy) -> Self {
        Self {
            errors: 0,
            limit: limit.max(1),
            policy,
        }
    }

    pub fn charge(&mut self) {
        self.errors = self.errors.saturating_add(1);
    }

    pub fn record_success(&mut self) {
        if self.policy == BudgetPolicy::Consecutive {
            self.errors = 0;
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.errors >= self.limit
    }

    pub fn errors(&self) -> u16 {
        self.errors
    }

    pub fn limit(&self) -> u16 {
        self.limit
    }
}
