//! Per-delegation feedback consumed by the evolution engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionOutcome {
    pub delegation_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub success: bool,
    pub quality_score: f64,
    pub actual_cost: f64,
    pub actual_duration: f64,
    pub complexity: f64,
    pub subtask_count: u32,
    pub agent_ids: Vec<String>,
    pub feedback: Option<String>,
}

/// The tunable parameter set the optimizer reads and writes, matching the
/// `baselines.json` top-level shape named in the persisted state layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionWeights {
    pub dq_weights: DqWeights,
    pub dq_actionable_threshold: f64,
    pub complexity_thresholds: ComplexityThresholds,
    pub cost_per_mtok: std::collections::BTreeMap<String, CostPerMtok>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DqWeights {
    pub validity: f64,
    pub specificity: f64,
    pub correctness: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ComplexityThresholds {
    pub haiku_max: f64,
    pub sonnet_max: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CostPerMtok {
    pub input: f64,
    pub output: f64,
}

impl Default for EvolutionWeights {
    fn default() -> Self {
        let mut cost_per_mtok = std::collections::BTreeMap::new();
        cost_per_mtok.insert("haiku".to_string(), CostPerMtok { input: 0.80, output: 4.0 });
        cost_per_mtok.insert("sonnet".to_string(), CostPerMtok { input: 3.0, output: 15.0 });
        cost_per_mtok.insert("opus".to_string(), CostPerMtok { input: 5.0, output: 25.0 });

        Self {
            dq_weights: DqWeights { validity: 0.35, specificity: 0.25, correctness: 0.40 },
            dq_actionable_threshold: 0.5,
            complexity_thresholds: ComplexityThresholds { haiku_max: 0.3, sonnet_max: 0.6 },
            cost_per_mtok,
        }
    }
}
