//! Decomposition output: a verifiable unit of work.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::task_profile::TaskProfile;

/// How a subtask's output is expected to be checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationMethod {
    AutomatedTest,
    SemanticSimilarity,
    HumanReview,
    GroundTruth,
}

/// A single unit of decomposed work.
///
/// Invariant: after decomposition every `SubTask.profile.verifiability` is
/// `>= 0.3`. `parallel_safe` is monotonically degraded by dependency
/// analysis — see [`crate::services::decomposer::propagate_parallel_safety`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubTask {
    pub id: Uuid,
    pub description: String,
    pub verification_method: VerificationMethod,
    pub estimated_cost: f64,
    pub estimated_duration: f64,
    pub parallel_safe: bool,
    pub parent_id: Option<Uuid>,
    pub dependencies: Vec<Uuid>,
    pub profile: TaskProfile,
    pub metadata: Value,
}

impl SubTask {
    /// `true` once this subtask meets the minimum executable verifiability.
    pub fn is_leaf_verifiable(&self) -> bool {
        self.profile.verifiability >= 0.3
    }
}
