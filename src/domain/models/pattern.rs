//! A recorded [`crate::services::pattern_detector`] classification,
//! persisted to the `patterns` table for later audit/analysis.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternDetection {
    pub task_id: Uuid,
    pub label: String,
    pub confidence: f64,
    pub strategy: String,
    pub detected_at: DateTime<Utc>,
}
