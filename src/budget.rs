use crate::error::{AppError, Result};

/// Tracks the external-request budget for one job run.
///
/// Every provider call is gated by a `can_consume` / `consume` pair, so
/// `used` can never pass `limit`. The tracker is scoped to a single phase
/// invocation and is not persisted — re-running a phase starts fresh.
#[derive(Debug, Clone)]
pub struct BudgetTracker {
    limit: u32,
    used: u32,
}

impl BudgetTracker {
    pub fn new(limit: u32) -> Self {
        Self { limit, used: 0 }
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn used(&self) -> u32 {
        self.used
    }

    pub fn remaining(&self) -> u32 {
        self.limit.saturating_sub(self.used)
    }

    pub fn can_consume(&self, n: u32) -> bool {
        self.used.checked_add(n).is_some_and(|total| total <= self.limit)
    }

    /// Spends `n` requests. Callers are expected to check `can_consume`
    /// first; this re-validates and leaves `used` untouched on failure.
    pub fn consume(&mut self, n: u32) -> Result<()> {
        if !self.can_consume(n) {
            return Err(AppError::BudgetExceeded {
                used: self.used,
                requested: n,
                limit: self.limit,
            });
        }
        self.used += n;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consume_within_limit_advances_used() {
        let mut budget = BudgetTracker::new(3);
        assert_eq!(budget.remaining(), 3);
        assert!(budget.can_consume(1));
        budget.consume(1).unwrap();
        budget.consume(2).unwrap();
        assert_eq!(budget.used(), 3);
        assert_eq!(budget.remaining(), 0);
    }

    #[test]
    fn consume_past_limit_fails_and_leaves_used_unchanged() {
        let mut budget = BudgetTracker::new(2);
        budget.consume(2).unwrap();
        assert!(!budget.can_consume(1));
        let err = budget.consume(1).unwrap_err();
        assert!(matches!(
            err,
            AppError::BudgetExceeded { used: 2, requested: 1, limit: 2 }
        ));
        assert_eq!(budget.used(), 2);
    }

    #[test]
    fn oversized_single_consume_is_all_or_nothing() {
        let mut budget = BudgetTracker::new(5);
        budget.consume(1).unwrap();
        assert!(budget.consume(10).is_err());
        assert_eq!(budget.used(), 1);
        assert_eq!(budget.remaining(), 4);
    }

    #[test]
    fn zero_limit_allows_nothing_but_free_checks() {
        let mut budget = BudgetTracker::new(0);
        assert!(budget.can_consume(0));
        assert!(!budget.can_consume(1));
        budget.consume(0).unwrap();
        assert!(budget.consume(1).is_err());
        assert_eq!(budget.used(), 0);
    }

    #[test]
    fn can_consume_does_not_overflow() {
        let mut budget = BudgetTracker::new(u32::MAX);
        budget.consume(u32::MAX - 1).unwrap();
        assert!(!budget.can_consume(u32::MAX));
        assert!(budget.can_consume(1));
    }
}
