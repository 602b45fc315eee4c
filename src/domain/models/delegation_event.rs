//! Audit-trail row recorded at assignment time, distinct from the
//! [`super::outcome::Outcome`] recorded once the agent finishes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DelegationEvent {
    pub id: Uuid,
    pub session_id: Uuid,
    pub subtask_id: Uuid,
    pub agent_id: String,
    pub model_tier: String,
    pub dq_score: f64,
    pub reasoning: String,
    pub created_at: DateTime<Utc>,
}
