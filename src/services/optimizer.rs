//! Self-optimization feedback loop: proposes parameter changes from
//! recorded session outcomes, gated on evidence volume and confidence, and
//! applies them as a new version-bumped [`Baseline`].

use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::domain::error::CoordinatorError;
use crate::domain::models::{Baseline, Outcome, OutcomeKind};
use crate::domain::ports::{BaselineRepository, OutcomeRepository};

/// No proposals are generated below this many recorded outcomes.
pub const MIN_OUTCOMES: u64 = 50;
/// The optimizer only ever looks at the most recent window of outcomes.
pub const OUTCOME_WINDOW: u32 = 200;
/// A parameter-specific optimization needs at least this many successful
/// samples before it is considered, independent of the overall gate.
const MIN_SUCCESSFUL_SAMPLES: usize = 10;
/// Proposals below this confidence are dropped.
pub const CONFIDENCE_GATE: f64 = 0.75;

#[derive(Debug, Clone, PartialEq)]
pub struct OptimizationProposal {
    pub parameter: String,
    pub current_value: f64,
    pub proposed_value: f64,
    pub confidence: f64,
    pub evidence_count: u64,
    pub improvement_pct: f64,
}

fn confidence_for(evidence_count: usize) -> f64 {
    (evidence_count as f64 / MIN_OUTCOMES as f64).min(1.0)
}

fn improvement_pct(optimal: f64, current: f64) -> f64 {
    if current > 0.0 { (optimal - current).abs() / current * 100.0 } else { 0.0 }
}

fn optimize_quality_threshold(outcomes: &[Outcome], current: f64) -> Option<OptimizationProposal> {
    let successful: Vec<f64> =
        outcomes.iter().filter(|o| o.outcome == OutcomeKind::Success).map(|o| o.quality).collect();
    if successful.len() < MIN_SUCCESSFUL_SAMPLES {
        return None;
    }

    let optimal = successful.iter().sum::<f64>() / successful.len() as f64;
    Some(OptimizationProposal {
        parameter: "quality_threshold".to_string(),
        current_value: current,
        proposed_value: optimal,
        confidence: confidence_for(successful.len()),
        evidence_count: successful.len() as u64,
        improvement_pct: improvement_pct(optimal, current),
    })
}

fn optimize_complexity_threshold(outcomes: &[Outcome], current: f64) -> Option<OptimizationProposal> {
    if outcomes.is_empty() {
        return None;
    }

    let mut complexities: Vec<f64> = outcomes.iter().map(|o| o.complexity).collect();
    complexities.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let optimal = complexities[complexities.len() / 2];

    Some(OptimizationProposal {
        parameter: "complexity_threshold".to_string(),
        current_value: current,
        proposed_value: optimal,
        confidence: confidence_for(complexities.len()),
        evidence_count: complexities.len() as u64,
        improvement_pct: improvement_pct(optimal, current),
    })
}

fn optimize_efficiency_threshold(outcomes: &[Outcome], current: f64) -> Option<OptimizationProposal> {
    let successful: Vec<f64> = outcomes
        .iter()
        .filter(|o| o.outcome == OutcomeKind::Success)
        .map(|o| o.model_efficiency)
        .collect();
    if successful.len() < MIN_SUCCESSFUL_SAMPLES {
        return None;
    }

    let optimal = successful.iter().sum::<f64>() / successful.len() as f64;
    Some(OptimizationProposal {
        parameter: "efficiency_threshold".to_string(),
        current_value: current,
        proposed_value: optimal,
        confidence: confidence_for(successful.len()),
        evidence_count: successful.len() as u64,
        improvement_pct: improvement_pct(optimal, current),
    })
}

/// Derive proposals from up to [`OUTCOME_WINDOW`] of the most recent
/// outcomes, provided at least [`MIN_OUTCOMES`] exist overall. Only
/// proposals clearing [`CONFIDENCE_GATE`] survive.
pub fn propose(outcomes: &[Outcome], baseline: &Baseline) -> Vec<OptimizationProposal> {
    if outcomes.len() < MIN_OUTCOMES as usize {
        return Vec::new();
    }

    let window = &outcomes[..outcomes.len().min(OUTCOME_WINDOW as usize)];

    let get = |key: &str, default: f64| baseline.parameters.get(key).copied().unwrap_or(default);

    [
        optimize_quality_threshold(window, get("quality_threshold", 3.0)),
        optimize_complexity_threshold(window, get("complexity_threshold", 0.5)),
        optimize_efficiency_threshold(window, get("efficiency_threshold", 0.7)),
    ]
    .into_iter()
    .flatten()
    .filter(|p| p.confidence > CONFIDENCE_GATE)
    .collect()
}

pub struct Optimizer {
    outcomes: Arc<dyn OutcomeRepository>,
    baselines: Arc<dyn BaselineRepository>,
}

impl Optimizer {
    pub fn new(outcomes: Arc<dyn OutcomeRepository>, baselines: Arc<dyn BaselineRepository>) -> Self {
        Self { outcomes, baselines }
    }

    /// Generate proposals from the live outcome history and current
    /// baseline (or the built-in defaults if no baseline has ever been
    /// applied).
    pub async fn propose(&self) -> Result<Vec<OptimizationProposal>, CoordinatorError> {
        let outcomes = self.outcomes.list_recent(OUTCOME_WINDOW).await?;
        let baseline = self.current_or_default().await?;
        Ok(propose(&outcomes, &baseline))
    }

    async fn current_or_default(&self) -> Result<Baseline, CoordinatorError> {
        match self.baselines.latest().await? {
            Some(baseline) => Ok(baseline),
            None => Ok(Baseline::initial(BTreeMap::new(), Utc::now())),
        }
    }

    /// Apply `proposals` as a new baseline version. Writes the new
    /// parameter map (current baseline's map overlaid with each proposal's
    /// value) and records lineage back to the prior version. No-op,
    /// returning `false`, when `proposals` is empty.
    pub async fn apply(&self, proposals: &[OptimizationProposal]) -> Result<bool, CoordinatorError> {
        if proposals.is_empty() {
            return Ok(false);
        }

        let current = self.current_or_default().await?;
        let mut parameters = current.parameters.clone();
        for proposal in proposals {
            parameters.insert(proposal.parameter.clone(), proposal.proposed_value);
        }

        let evidence_count = proposals.iter().map(|p| p.evidence_count).sum();
        let confidence = proposals.iter().map(|p| p.confidence).sum::<f64>() / proposals.len() as f64;

        let next = current.next(parameters, evidence_count, confidence, Utc::now());
        self.baselines.insert(&next).await?;
        Ok(true)
    }

    /// Restore the previous baseline version's parameter map, applied as a
    /// new version rather than mutating history in place (baselines are
    /// append-only — see [`crate::infrastructure::database::baseline_repo`]).
    /// Returns `false` when fewer than two versions exist.
    pub async fn rollback(&self) -> Result<bool, CoordinatorError> {
        let all = self.baselines.list_all().await?;
        if all.len() < 2 {
            return Ok(false);
        }

        let current = &all[all.len() - 1];
        let previous = &all[all.len() - 2];

        let restored = current.next(previous.parameters.clone(), previous.evidence_count, previous.confidence, Utc::now());
        self.baselines.insert(&restored).await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn outcome(outcome: OutcomeKind, quality: f64, complexity: f64, efficiency: f64) -> Outcome {
        Outcome {
            session_id: Uuid::new_v4(),
            outcome,
            quality,
            complexity,
            model_efficiency: efficiency,
            dq_score: 0.6,
            confidence: 0.6,
            analyzed_at: Utc::now(),
        }
    }

    fn default_baseline() -> Baseline {
        Baseline::initial(BTreeMap::new(), Utc::now())
    }

    #[test]
    fn below_min_outcomes_yields_no_proposals() {
        let outcomes: Vec<Outcome> = (0..49).map(|_| outcome(OutcomeKind::Success, 4.5, 0.5, 0.8)).collect();
        assert!(propose(&outcomes, &default_baseline()).is_empty());
    }

    #[test]
    fn enough_uniform_high_quality_outcomes_yields_quality_proposal() {
        let outcomes: Vec<Outcome> = (0..60).map(|_| outcome(OutcomeKind::Success, 4.8, 0.5, 0.9)).collect();
        let proposals = propose(&outcomes, &default_baseline());
        assert!(proposals.iter().any(|p| p.parameter == "quality_threshold"));
    }

    #[test]
    fn confidence_gate_drops_low_evidence_proposals() {
        // Exactly MIN_SUCCESSFUL_SAMPLES successes among 50 total outcomes:
        // confidence = 10/50 = 0.2, well under the 0.75 gate.
        let mut outcomes: Vec<Outcome> = (0..10).map(|_| outcome(OutcomeKind::Success, 4.5, 0.5, 0.8)).collect();
        outcomes.extend((0..40).map(|_| outcome(OutcomeKind::Failed, 2.0, 0.5, 0.3)));
        let proposals = propose(&outcomes, &default_baseline());
        assert!(!proposals.iter().any(|p| p.parameter == "quality_threshold"));
    }

    #[test]
    fn complexity_proposal_uses_median() {
        let mut outcomes: Vec<Outcome> = Vec::new();
        for c in [0.1, 0.2, 0.3, 0.4, 0.9] {
            outcomes.push(outcome(OutcomeKind::Success, 4.9, c, 0.9));
        }
        let padded: Vec<Outcome> = outcomes.iter().cloned().cycle().take(60).collect();
        let proposals = propose(&padded, &default_baseline());
        let complexity_proposal = proposals.iter().find(|p| p.parameter == "complexity_threshold");
        assert!(complexity_proposal.is_some());
    }
}
