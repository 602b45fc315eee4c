//! The router's output: a subtask bound to an agent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// A runner-up agent the orchestrator can fall back to if the primary
/// assignee is unavailable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FallbackCandidate {
    pub agent_id: String,
    pub final_score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    pub subtask_id: Uuid,
    pub agent_id: String,
    pub trust_score: f64,
    pub capability_match: f64,
    pub timestamp: DateTime<Utc>,
    pub reasoning: String,
    pub metadata: Value,
    /// Up to three runners-up, in descending score order.
    pub fallback_chain: Vec<FallbackCandidate>,
}
