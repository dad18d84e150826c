use serde::{Deserialize, Serialize};

/// Business-rule thresholds for lifecycle classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecyclePolicy {
    /// The interruption that brings the count to this value ends the session
    /// as `interrupted` instead of `paused`.
    pub interruption_limit: u32,

    /// Fraction over the scheduled duration tolerated before a completion is
    /// classified `overdue`.
    pub overdue_tolerance: f64,
}

impl Default for LifecyclePolicy {
    fn default() -> Self {
        Self {
            interruption_limit: 4,
            overdue_tolerance: 0.10,
        }
    }
}

impl LifecyclePolicy {
    pub fn validate(&self) -> Result<(), String> {
        if self.interruption_limit == 0 {
            return Err("interruption_limit must be at least 1".into());
        }
        if !self.overdue_tolerance.is_finite() || self.overdue_tolerance < 0.0 {
            return Err(format!(
                "overdue_tolerance must be a non-negative number, got {}",
                self.overdue_tolerance
            ));
        }
        Ok(())
    }

    /// Longest focused time, in milliseconds, that still counts as on schedule.
    pub fn overdue_threshold_ms(&self, scheduled_ms: u64) -> f64 {
        scheduled_ms as f64 * (1.0 + self.overdue_tolerance)
    }
}
