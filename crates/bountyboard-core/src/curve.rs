//! Time-decay reward curve.
//!
//! ```text
//! reward = weight[severity] * max(0, 1 - hours / (max_days_to_fix * 24)) ^ (reopen_multiplier * reopens + 1)
//! ```
//!
//! The full weight is paid for an instant fix, nothing once the fix window
//! has elapsed, and every reopen raises the exponent so reopened issues decay
//! faster.

use chrono::Duration;

use crate::config::{RewardConfig, SeverityWeights};
use crate::domain::Severity;

/// Pure reward function parameterised by [`RewardConfig`].
#[derive(Debug, Clone, PartialEq)]
pub struct RewardCurve {
    weights: SeverityWeights,
    max_days_to_fix: f64,
    reopen_multiplier: u32,
}

impl RewardCurve {
    pub fn new(config: &RewardConfig) -> Self {
        Self {
            weights: config.severity_weights.clone(),
            max_days_to_fix: config.max_days_to_fix,
            reopen_multiplier: config.reopen_multiplier,
        }
    }

    /// Reward for an issue fixed after `elapsed` and reopened `reopen_count` times.
    pub fn reward(&self, elapsed: Duration, reopen_count: u32, severity: Severity) -> f64 {
        let window_hours = self.max_days_to_fix * 24.0;
        let hours = (elapsed.num_seconds().max(0) as f64) / 3600.0;
        // Clamp the base before exponentiation: an even exponent would
        // otherwise turn an overdue fix into a positive reward.
        let base = (1.0 - hours / window_hours).max(0.0);
        self.weights.get(severity) * base.powi(self.exponent(reopen_count))
    }

    fn exponent(&self, reopen_count: u32) -> i32 {
        let exponent = self
            .reopen_multiplier
            .saturating_mul(reopen_count)
            .saturating_add(1);
        i32::try_from(exponent).unwrap_or(i32::MAX)
    }
}
