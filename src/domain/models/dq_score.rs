//! A recorded [`crate::services::dq_scorer`] routing decision, persisted
//! to the `dq_scores` table for later audit and as the optimizer's raw
//! material.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DqScoreRecord {
    pub subtask_id: Uuid,
    pub model_tier: String,
    pub validity: f64,
    pub specificity: f64,
    pub correctness: f64,
    pub dq_score: f64,
    pub actionable: bool,
    pub scored_at: DateTime<Utc>,
}
