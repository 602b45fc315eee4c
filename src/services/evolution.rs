//! Delegation evolution: pure statistical learning over recorded
//! delegation outcomes — EMA quality trend, complexity-banded optimal
//! decomposition, per-agent affinity, cost efficiency, and actionable
//! recommendations. No ML models, matching the donor's "learning" layer.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::domain::error::CoordinatorError;
use crate::domain::models::EvolutionOutcome;
use crate::domain::ports::EvolutionRepository;

/// Smoothing factor for the quality EMA.
pub const EMA_ALPHA: f64 = 0.3;

const COMPLEXITY_BANDS: [(f64, f64, &str); 4] =
    [(0.0, 0.3, "low"), (0.3, 0.6, "medium"), (0.6, 0.8, "high"), (0.8, 1.0, "very_high")];

fn band_for(complexity: f64) -> &'static str {
    for (low, high, label) in COMPLEXITY_BANDS {
        if complexity >= low && complexity < high {
            return label;
        }
    }
    "very_high"
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecompositionBand {
    pub band: String,
    pub optimal_subtask_count: f64,
    pub sample_size: usize,
    pub avg_quality: f64,
}

/// Quality-weighted average subtask count per complexity band, drawn from
/// the most recent 50 successful, decomposed outcomes in that band.
pub fn learn_decomposition(outcomes: &[EvolutionOutcome]) -> Vec<DecompositionBand> {
    let mut bands = Vec::new();

    for (low, high, label) in COMPLEXITY_BANDS {
        let matching: Vec<&EvolutionOutcome> = outcomes
            .iter()
            .filter(|o| o.success && o.complexity >= low && o.complexity < high && o.subtask_count > 0)
            .take(50)
            .collect();

        if matching.is_empty() {
            continue;
        }

        let total_weight: f64 = matching.iter().map(|o| o.quality_score).sum();
        let optimal_count = if total_weight > 0.0 {
            matching.iter().map(|o| f64::from(o.subtask_count) * o.quality_score).sum::<f64>() / total_weight
        } else {
            matching.iter().map(|o| f64::from(o.subtask_count)).sum::<f64>() / matching.len() as f64
        };

        bands.push(DecompositionBand {
            band: label.to_string(),
            optimal_subtask_count: (optimal_count * 10.0).round() / 10.0,
            sample_size: matching.len(),
            avg_quality: (total_weight / matching.len() as f64 * 1000.0).round() / 1000.0,
        });
    }

    bands
}

#[derive(Debug, Clone, PartialEq)]
pub struct AgentAffinity {
    pub success_rate: f64,
    pub avg_quality: f64,
    pub total_delegations: u64,
}

/// Per-agent success rate and average quality across the most recent 200
/// outcomes that named at least one agent.
pub fn learn_agent_affinity(outcomes: &[EvolutionOutcome]) -> BTreeMap<String, AgentAffinity> {
    #[derive(Default)]
    struct Stats {
        successes: u64,
        failures: u64,
        quality_sum: f64,
        count: u64,
    }

    let mut stats: BTreeMap<String, Stats> = BTreeMap::new();

    for outcome in outcomes.iter().filter(|o| !o.agent_ids.is_empty()).take(200) {
        for agent_id in &outcome.agent_ids {
            let entry = stats.entry(agent_id.clone()).or_default();
            entry.count += 1;
            entry.quality_sum += outcome.quality_score;
            if outcome.success {
                entry.successes += 1;
            } else {
                entry.failures += 1;
            }
        }
    }

    stats
        .into_iter()
        .map(|(agent_id, s)| {
            let total = s.successes + s.failures;
            let affinity = AgentAffinity {
                success_rate: if total > 0 { s.successes as f64 / total as f64 } else { 0.0 },
                avg_quality: if s.count > 0 { s.quality_sum / s.count as f64 } else { 0.0 },
                total_delegations: total,
            };
            (agent_id, affinity)
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct QualityTrend {
    pub ema_quality: f64,
    pub trend: String,
    pub sample_size: usize,
}

/// EMA of quality over all outcomes in chronological order, plus a
/// first-half-vs-second-half delta to label the trend as improving,
/// declining, or stable (threshold ±0.05).
pub fn learn_quality_trend(outcomes_oldest_first: &[EvolutionOutcome]) -> QualityTrend {
    if outcomes_oldest_first.is_empty() {
        return QualityTrend { ema_quality: 0.0, trend: "insufficient_data".to_string(), sample_size: 0 };
    }

    let mut ema = outcomes_oldest_first[0].quality_score;
    for outcome in &outcomes_oldest_first[1..] {
        ema = EMA_ALPHA * outcome.quality_score + (1.0 - EMA_ALPHA) * ema;
    }

    let mid = outcomes_oldest_first.len() / 2;
    let trend = if mid > 0 {
        let first_half: f64 =
            outcomes_oldest_first[..mid].iter().map(|o| o.quality_score).sum::<f64>() / mid as f64;
        let second_half: f64 = outcomes_oldest_first[mid..].iter().map(|o| o.quality_score).sum::<f64>()
            / (outcomes_oldest_first.len() - mid) as f64;
        let delta = second_half - first_half;
        if delta > 0.05 {
            "improving"
        } else if delta < -0.05 {
            "declining"
        } else {
            "stable"
        }
    } else {
        "insufficient_data"
    };

    QualityTrend {
        ema_quality: (ema * 1000.0).round() / 1000.0,
        trend: trend.to_string(),
        sample_size: outcomes_oldest_first.len(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CostEfficiency {
    pub avg_cost_per_quality: f64,
    pub avg_cost: f64,
    pub success_rate: f64,
    pub sample_size: usize,
}

/// Cost-per-quality-point and success rate over the most recent 50
/// cost-bearing outcomes.
pub fn learn_cost_efficiency(outcomes: &[EvolutionOutcome]) -> CostEfficiency {
    let costed: Vec<&EvolutionOutcome> = outcomes.iter().filter(|o| o.actual_cost > 0.0).take(50).collect();
    if costed.is_empty() {
        return CostEfficiency { avg_cost_per_quality: 0.0, avg_cost: 0.0, success_rate: 0.0, sample_size: 0 };
    }

    let total_cost: f64 = costed.iter().map(|o| o.actual_cost).sum();
    let total_quality: f64 = costed.iter().map(|o| o.quality_score).sum();
    let success_rate = costed.iter().filter(|o| o.success).count() as f64 / costed.len() as f64;

    CostEfficiency {
        avg_cost_per_quality: (total_cost / total_quality.max(0.01) * 1000.0).round() / 1000.0,
        avg_cost: (total_cost / costed.len() as f64 * 1000.0).round() / 1000.0,
        success_rate: (success_rate * 1000.0).round() / 1000.0,
        sample_size: costed.len(),
    }
}

/// Actionable recommendations derived from learned patterns: success-rate
/// extremes (requires ≥5 outcomes), decomposition extremes (requires
/// successful, decomposed outcomes), and a low EMA-quality warning.
pub fn recommendations(
    outcomes: &[EvolutionOutcome],
    ema_quality: f64,
) -> Vec<String> {
    let mut recs = Vec::new();

    if outcomes.len() >= 5 {
        let wins = outcomes.iter().filter(|o| o.success).count();
        let rate = wins as f64 / outcomes.len() as f64;
        if rate < 0.6 {
            recs.push(format!(
                "success rate is low ({:.0}%). consider raising quality_threshold or improving task descriptions.",
                rate * 100.0
            ));
        } else if rate > 0.9 {
            recs.push(format!(
                "success rate is high ({:.0}%). you may be over-cautious — consider delegating more complex tasks.",
                rate * 100.0
            ));
        }
    }

    let decomposed: Vec<&EvolutionOutcome> =
        outcomes.iter().filter(|o| o.success && o.subtask_count > 0).collect();
    if !decomposed.is_empty() {
        let avg_subtasks =
            decomposed.iter().map(|o| f64::from(o.subtask_count)).sum::<f64>() / decomposed.len() as f64;
        if avg_subtasks > 6.0 {
            recs.push(format!("average subtask count is high ({avg_subtasks:.1}). over-decomposition may be adding overhead."));
        } else if avg_subtasks < 2.0 {
            recs.push(format!("average subtask count is low ({avg_subtasks:.1}). consider deeper decomposition for complex tasks."));
        }
    }

    if ema_quality > 0.0 && ema_quality < 0.6 {
        recs.push(format!("EMA quality trend is low ({ema_quality:.3}). review recent delegation failures for patterns."));
    }

    if recs.is_empty() {
        recs.push("system is performing within normal parameters.".to_string());
    }

    recs
}

/// The full evolution summary returned by `evolve_strategies`.
#[derive(Debug, Clone, PartialEq)]
pub struct EvolutionSummary {
    pub decomposition: Vec<DecompositionBand>,
    pub agent_affinity: BTreeMap<String, AgentAffinity>,
    pub quality_trend: QualityTrend,
    pub cost_efficiency: CostEfficiency,
    pub recommendations: Vec<String>,
}

pub struct EvolutionEngine {
    repo: Arc<dyn EvolutionRepository>,
}

impl EvolutionEngine {
    pub fn new(repo: Arc<dyn EvolutionRepository>) -> Self {
        Self { repo }
    }

    pub async fn record_outcome(&self, outcome: &EvolutionOutcome) -> Result<(), CoordinatorError> {
        self.repo.insert(outcome).await
    }

    /// Run all four learning passes over recent history and produce the
    /// recommendation list.
    pub async fn evolve_strategies(&self) -> Result<EvolutionSummary, CoordinatorError> {
        let recent = self.repo.list_recent(200).await?;
        let mut oldest_first = recent.clone();
        oldest_first.sort_by_key(|o| o.timestamp);

        let decomposition = learn_decomposition(&recent);
        let agent_affinity = learn_agent_affinity(&recent);
        let quality_trend = learn_quality_trend(&oldest_first);
        let cost_efficiency = learn_cost_efficiency(&recent);
        let recommendations = recommendations(&recent, quality_trend.ema_quality);

        Ok(EvolutionSummary { decomposition, agent_affinity, quality_trend, cost_efficiency, recommendations })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    fn outcome(success: bool, quality: f64, complexity: f64, subtask_count: u32, agents: &[&str]) -> EvolutionOutcome {
        EvolutionOutcome {
            delegation_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            success,
            quality_score: quality,
            actual_cost: 0.05,
            actual_duration: 30.0,
            complexity,
            subtask_count,
            agent_ids: agents.iter().map(|s| (*s).to_string()).collect(),
            feedback: None,
        }
    }

    #[test]
    fn band_for_buckets_correctly() {
        assert_eq!(band_for(0.1), "low");
        assert_eq!(band_for(0.5), "medium");
        assert_eq!(band_for(0.7), "high");
        assert_eq!(band_for(0.95), "very_high");
    }

    #[test]
    fn decomposition_learns_weighted_average_subtask_count() {
        let outcomes = vec![
            outcome(true, 1.0, 0.1, 4, &[]),
            outcome(true, 0.5, 0.1, 2, &[]),
        ];
        let bands = learn_decomposition(&outcomes);
        let low = bands.iter().find(|b| b.band == "low").unwrap();
        assert!((low.optimal_subtask_count - 3.333).abs() < 0.2);
    }

    #[test]
    fn agent_affinity_tracks_success_rate() {
        let outcomes = vec![
            outcome(true, 0.9, 0.5, 3, &["agent-a"]),
            outcome(false, 0.2, 0.5, 3, &["agent-a"]),
        ];
        let affinity = learn_agent_affinity(&outcomes);
        assert_eq!(affinity["agent-a"].success_rate, 0.5);
        assert_eq!(affinity["agent-a"].total_delegations, 2);
    }

    #[test]
    fn quality_trend_detects_improvement() {
        let mut outcomes = Vec::new();
        let now = Utc::now();
        for (i, q) in [0.3, 0.3, 0.3, 0.9, 0.9, 0.9].into_iter().enumerate() {
            outcomes.push(outcome(true, q, 0.5, 3, &[]));
            outcomes.last_mut().unwrap().timestamp = now + Duration::seconds(i as i64);
        }
        let trend = learn_quality_trend(&outcomes);
        assert_eq!(trend.trend, "improving");
    }

    #[test]
    fn empty_history_is_insufficient_data() {
        let trend = learn_quality_trend(&[]);
        assert_eq!(trend.trend, "insufficient_data");
    }

    #[test]
    fn cost_efficiency_ignores_zero_cost_outcomes() {
        let mut outcomes = vec![outcome(true, 0.8, 0.5, 3, &[])];
        outcomes[0].actual_cost = 0.0;
        let efficiency = learn_cost_efficiency(&outcomes);
        assert_eq!(efficiency.sample_size, 0);
    }

    #[test]
    fn recommends_deeper_decomposition_when_avg_subtasks_low() {
        let outcomes: Vec<EvolutionOutcome> = (0..5).map(|_| outcome(true, 0.8, 0.5, 1, &[])).collect();
        let recs = recommendations(&outcomes, 0.8);
        assert!(recs.iter().any(|r| r.contains("deeper decomposition")));
    }

    #[test]
    fn recommends_nothing_unusual_when_healthy() {
        let mut outcomes: Vec<EvolutionOutcome> = (0..4).map(|_| outcome(true, 0.8, 0.5, 3, &[])).collect();
        outcomes.push(outcome(false, 0.2, 0.5, 0, &[]));
        let recs = recommendations(&outcomes, 0.8);
        assert_eq!(recs, vec!["system is performing within normal parameters.".to_string()]);
    }

    #[test]
    fn low_ema_quality_triggers_warning() {
        let outcomes: Vec<EvolutionOutcome> = (0..5).map(|_| outcome(true, 0.8, 0.5, 3, &[])).collect();
        let recs = recommendations(&outcomes, 0.4);
        assert!(recs.iter().any(|r| r.contains("EMA quality trend is low")));
    }
}
