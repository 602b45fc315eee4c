//! Pluggable task classification.

use crate::domain::error::CoordinatorError;
use crate::domain::models::{TaskContext, TaskProfile};

/// A capability that turns a free-form description into a [`TaskProfile`].
///
/// The heuristic scorer in [`crate::services::task_profiler`] implements
/// this directly; a "real" classifier (an LLM call, an external service)
/// can be injected in its place. [`crate::services::task_profiler::profile`]
/// tries an injected classifier first and falls back to heuristics on any
/// failure.
pub trait Classifier: Send + Sync {
    fn classify(&self, description: &str, context: TaskContext) -> Result<TaskProfile, CoordinatorError>;
}
