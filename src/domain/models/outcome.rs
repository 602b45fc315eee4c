//! The result of analyzing a completed session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Success,
    Partial,
    Failed,
    Research,
    Abandoned,
    Error,
    Unknown,
}

/// Recorded exactly once per `session_id`; a later analysis upserts in
/// place rather than appending a duplicate row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Outcome {
    pub session_id: Uuid,
    pub outcome: OutcomeKind,
    pub quality: f64,
    pub complexity: f64,
    pub model_efficiency: f64,
    pub dq_score: f64,
    pub confidence: f64,
    pub analyzed_at: DateTime<Utc>,
}
