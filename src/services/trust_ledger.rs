//! Bayesian Beta trust per `(agent_id, task_type)`, persisted through
//! [`TrustRepository`] and decayed at read time.

use chrono::Utc;
use std::sync::Arc;

use crate::domain::error::CoordinatorError;
use crate::domain::models::trust_entry::{beta_mean, DEFAULT_TRUST};
use crate::domain::models::TrustEntry;
use crate::domain::ports::TrustRepository;

pub struct TrustLedger {
    repo: Arc<dyn TrustRepository>,
}

impl TrustLedger {
    pub fn new(repo: Arc<dyn TrustRepository>) -> Self {
        Self { repo }
    }

    /// Update counts and running means, recompute `trust_score`, and
    /// persist with `last_updated = now`. Rejects out-of-range inputs.
    pub async fn record_outcome(
        &self,
        agent_id: &str,
        task_type: &str,
        success: bool,
        quality: f64,
        duration: f64,
    ) -> Result<TrustEntry, CoordinatorError> {
        if !(0.0..=1.0).contains(&quality) {
            return Err(CoordinatorError::InvalidTrustUpdate(format!("quality {quality} out of range [0,1]")));
        }
        if duration < 0.0 {
            return Err(CoordinatorError::InvalidTrustUpdate(format!("duration {duration} is negative")));
        }

        let now = Utc::now();
        let mut entry = self
            .repo
            .get(agent_id, task_type)
            .await?
            .unwrap_or_else(|| TrustEntry::new(agent_id.to_string(), task_type.to_string(), now));

        let n = (entry.success_count + entry.failure_count) as f64;
        entry.avg_quality = (entry.avg_quality * n + quality) / (n + 1.0);
        entry.avg_duration = (entry.avg_duration * n + duration) / (n + 1.0);
        if success {
            entry.success_count += 1;
        } else {
            entry.failure_count += 1;
        }
        entry.recompute_trust_score();
        entry.last_updated = now;

        self.repo.upsert(&entry).await?;
        Ok(entry)
    }

    /// `0.5` if no entry exists; otherwise the decay-applied observed score.
    pub async fn get_trust_score(&self, agent_id: &str, task_type: &str) -> Result<f64, CoordinatorError> {
        let entry = self.repo.get(agent_id, task_type).await?;
        Ok(entry.map_or(DEFAULT_TRUST, |e| e.observed_trust_score(Utc::now())))
    }

    /// Decay-applied ranking of agents, optionally filtered to one task
    /// type, highest score first. When `task_type` is `None`, agents with
    /// entries across several task types contribute their single highest
    /// score rather than one row per type.
    pub async fn get_top_agents(&self, task_type: Option<&str>, limit: usize) -> Result<Vec<(String, f64)>, CoordinatorError> {
        let now = Utc::now();
        let mut entries = self.repo.list_all().await?;
        if let Some(tt) = task_type {
            entries.retain(|e| e.task_type == tt);
        }

        let mut best: std::collections::HashMap<String, f64> = std::collections::HashMap::new();
        for entry in &entries {
            let score = entry.observed_trust_score(now);
            best.entry(entry.agent_id.clone()).and_modify(|s| *s = s.max(score)).or_insert(score);
        }

        let mut scored: Vec<(String, f64)> = best.into_iter().collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit);
        Ok(scored)
    }
}

/// Raw Beta-posterior mean, exposed for callers that score without going
/// through persistence (e.g. the ACE analyzer's simulations).
pub fn trust_score(success: u64, failure: u64) -> f64 {
    beta_mean(success, failure)
}
