//! Bayesian Beta trust per `(agent_id, task_type)`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Observed trust decays after this many days without an update.
pub const DECAY_AFTER_DAYS: i64 = 7;
/// Multiplicative decay factor applied to the observed (not persisted)
/// trust score once `DECAY_AFTER_DAYS` have elapsed.
pub const DECAY_FACTOR: f64 = 0.95;
/// The score returned for an `(agent_id, task_type)` pair with no history.
pub const DEFAULT_TRUST: f64 = 0.5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustEntry {
    pub agent_id: String,
    pub task_type: String,
    pub success_count: u64,
    pub failure_count: u64,
    pub avg_quality: f64,
    pub avg_duration: f64,
    pub trust_score: f64,
    pub last_updated: DateTime<Utc>,
}

impl TrustEntry {
    pub fn new(agent_id: String, task_type: String, now: DateTime<Utc>) -> Self {
        Self {
            agent_id,
            task_type,
            success_count: 0,
            failure_count: 0,
            avg_quality: 0.0,
            avg_duration: 0.0,
            trust_score: beta_mean(0, 0),
            last_updated: now,
        }
    }

    /// `(success_count + 1) / (success_count + failure_count + 2)`.
    pub fn recompute_trust_score(&mut self) {
        self.trust_score = beta_mean(self.success_count, self.failure_count);
    }

    /// The decayed score as observed by a caller at `now`, without
    /// mutating `self` — decay is never written back except by a further
    /// `record_outcome`.
    pub fn observed_trust_score(&self, now: DateTime<Utc>) -> f64 {
        if (now - self.last_updated).num_days() >= DECAY_AFTER_DAYS {
            self.trust_score * DECAY_FACTOR
        } else {
            self.trust_score
        }
    }
}

pub fn beta_mean(success: u64, failure: u64) -> f64 {
    (success as f64 + 1.0) / (success as f64 + failure as f64 + 2.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn new_entry_has_neutral_trust() {
        let e = TrustEntry::new("a1".into(), "build".into(), Utc::now());
        assert_eq!(e.trust_score, 0.5);
    }

    #[test]
    fn trust_score_formula() {
        assert_eq!(beta_mean(9, 1), 10.0 / 12.0);
    }

    #[test]
    fn decay_applies_after_seven_days() {
        let mut e = TrustEntry::new("a1".into(), "build".into(), Utc::now() - Duration::days(8));
        e.success_count = 9;
        e.failure_count = 0;
        e.recompute_trust_score();
        let observed = e.observed_trust_score(Utc::now());
        assert!((observed - e.trust_score * 0.95).abs() < 1e-9);
    }

    #[test]
    fn no_decay_within_window() {
        let mut e = TrustEntry::new("a1".into(), "build".into(), Utc::now() - Duration::days(6));
        e.success_count = 9;
        e.recompute_trust_score();
        assert_eq!(e.observed_trust_score(Utc::now()), e.trust_score);
    }
}
