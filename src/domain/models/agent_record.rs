//! Agent lifecycle state machine.
//!
//! `AgentStatus` names the five persisted states (`pending, running,
//! completed, failed, timeout, cancelled`); [`AgentState`] is the richer sum
//! type transitions operate on — pending carries nothing, running carries
//! its heartbeat/progress, terminal carries its kind and optional error —
//! so a transition is a pure function from `AgentState` to `AgentState`
//! rather than a grab-bag of optional fields mutated in place.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::domain::error::CoordinatorError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Timeout,
    Cancelled,
}

impl AgentStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Timeout => "timeout",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            "timeout" => Some(Self::Timeout),
            "cancelled" | "canceled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Terminal states are absorbing: no transition leaves them.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Timeout | Self::Cancelled)
    }

    /// The only states reachable directly from `self`.
    pub const fn valid_transitions(self) -> &'static [Self] {
        match self {
            Self::Pending => &[Self::Running],
            Self::Running => &[Self::Completed, Self::Failed, Self::Timeout, Self::Cancelled],
            Self::Completed | Self::Failed | Self::Timeout | Self::Cancelled => &[],
        }
    }
}

/// The lifecycle sum type: `Pending`, `Running` carrying its own heartbeat
/// state, or a `Terminal` carrying its kind and optional error.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentState {
    Pending,
    Running {
        started_at: DateTime<Utc>,
        last_heartbeat: DateTime<Utc>,
        progress: f64,
    },
    Terminal {
        kind: AgentStatus,
        completed_at: DateTime<Utc>,
        error: Option<String>,
    },
}

impl AgentState {
    pub const fn status(&self) -> AgentStatus {
        match self {
            Self::Pending => AgentStatus::Pending,
            Self::Running { .. } => AgentStatus::Running,
            Self::Terminal { kind, .. } => *kind,
        }
    }

    /// `start(id)`: pending → running, setting `started_at`/`last_heartbeat`.
    pub fn start(&self, now: DateTime<Utc>) -> Result<Self, CoordinatorError> {
        match self {
            Self::Pending => Ok(Self::Running {
                started_at: now,
                last_heartbeat: now,
                progress: 0.0,
            }),
            other => Err(invalid(other.status(), AgentStatus::Running)),
        }
    }

    /// `heartbeat(id, progress?)`: running → running, clamping progress.
    pub fn heartbeat(&self, now: DateTime<Utc>, progress: Option<f64>) -> Result<Self, CoordinatorError> {
        match self {
            Self::Running { started_at, progress: current, .. } => Ok(Self::Running {
                started_at: *started_at,
                last_heartbeat: now,
                progress: progress.unwrap_or(*current).clamp(0.0, 1.0),
            }),
            other => Err(invalid(other.status(), AgentStatus::Running)),
        }
    }

    /// Is this agent stale: running with a heartbeat older than 60s?
    /// Observable only — staleness never auto-transitions the state.
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        match self {
            Self::Running { last_heartbeat, .. } => {
                (now - *last_heartbeat).num_seconds() > 60
            }
            _ => false,
        }
    }

    fn to_terminal(&self, now: DateTime<Utc>, kind: AgentStatus, error: Option<String>) -> Result<Self, CoordinatorError> {
        match self {
            Self::Running { .. } => Ok(Self::Terminal { kind, completed_at: now, error }),
            other => Err(invalid(other.status(), kind)),
        }
    }

    pub fn complete(&self, now: DateTime<Utc>) -> Result<Self, CoordinatorError> {
        self.to_terminal(now, AgentStatus::Completed, None)
    }

    pub fn fail(&self, now: DateTime<Utc>, error: String) -> Result<Self, CoordinatorError> {
        self.to_terminal(now, AgentStatus::Failed, Some(error))
    }

    pub fn timeout(&self, now: DateTime<Utc>) -> Result<Self, CoordinatorError> {
        self.to_terminal(now, AgentStatus::Timeout, Some("agent exceeded its timeout".into()))
    }

    pub fn cancel(&self, now: DateTime<Utc>) -> Result<Self, CoordinatorError> {
        match self {
            Self::Pending | Self::Running { .. } => {
                Ok(Self::Terminal { kind: AgentStatus::Cancelled, completed_at: now, error: None })
            }
            Self::Terminal { kind: AgentStatus::Cancelled, .. } => Ok(self.clone()),
            other => Err(invalid(other.status(), AgentStatus::Cancelled)),
        }
    }

    /// Progress as persisted on the flattened `AgentRecord`; completion
    /// always reports 1.0.
    pub fn progress(&self) -> f64 {
        match self {
            Self::Pending => 0.0,
            Self::Running { progress, .. } => *progress,
            Self::Terminal { kind: AgentStatus::Completed, .. } => 1.0,
            Self::Terminal { .. } => 0.0,
        }
    }
}

fn invalid(from: AgentStatus, to: AgentStatus) -> CoordinatorError {
    CoordinatorError::InvalidAgentTransition {
        from: from.as_str().to_string(),
        to: to.as_str().to_string(),
    }
}

/// The persisted agent record: the lifecycle state plus everything the
/// executor and registry track about one subprocess invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRecord {
    pub agent_id: Uuid,
    pub task_id: Uuid,
    pub subtask_id: Uuid,
    pub agent_type: String,
    pub model_tier: String,
    pub status: AgentStatus,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub files_locked: Vec<String>,
    pub progress: f64,
    pub last_heartbeat: Option<DateTime<Utc>>,
    pub result: Option<String>,
    pub error: Option<String>,
    pub dq_score: f64,
    pub cost_estimate: f64,
    #[serde(default)]
    pub metadata: Value,
}

impl AgentRecord {
    pub fn new(task_id: Uuid, subtask_id: Uuid, agent_type: String, model_tier: String, dq_score: f64, cost_estimate: f64, now: DateTime<Utc>) -> Self {
        Self {
            agent_id: Uuid::new_v4(),
            task_id,
            subtask_id,
            agent_type,
            model_tier,
            status: AgentStatus::Pending,
            created_at: now,
            started_at: None,
            completed_at: None,
            files_locked: Vec::new(),
            progress: 0.0,
            last_heartbeat: None,
            result: None,
            error: None,
            dq_score,
            cost_estimate,
            metadata: Value::Null,
        }
    }

    pub fn state(&self) -> AgentState {
        match self.status {
            AgentStatus::Pending => AgentState::Pending,
            AgentStatus::Running => AgentState::Running {
                started_at: self.started_at.unwrap_or(self.created_at),
                last_heartbeat: self.last_heartbeat.unwrap_or(self.created_at),
                progress: self.progress,
            },
            terminal => AgentState::Terminal {
                kind: terminal,
                completed_at: self.completed_at.unwrap_or(self.created_at),
                error: self.error.clone(),
            },
        }
    }

    /// Apply a transition derived from [`AgentState`], flattening the
    /// result back onto the persisted row's fields.
    pub fn apply(&mut self, next: AgentState) {
        self.status = next.status();
        self.progress = next.progress();
        match &next {
            AgentState::Pending => {}
            AgentState::Running { started_at, last_heartbeat, .. } => {
                self.started_at.get_or_insert(*started_at);
                self.last_heartbeat = Some(*last_heartbeat);
            }
            AgentState::Terminal { completed_at, error, .. } => {
                self.completed_at = Some(*completed_at);
                if error.is_some() {
                    self.error = error.clone();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn valid_lifecycle_path() {
        let now = Utc::now();
        let s = AgentState::Pending;
        let s = s.start(now).unwrap();
        assert_eq!(s.status(), AgentStatus::Running);
        let s = s.heartbeat(now + Duration::seconds(1), Some(1.5)).unwrap();
        assert_eq!(s.progress(), 1.0);
        let s = s.complete(now + Duration::seconds(2)).unwrap();
        assert_eq!(s.status(), AgentStatus::Completed);
        assert_eq!(s.progress(), 1.0);
    }

    #[test]
    fn terminal_states_are_absorbing() {
        let now = Utc::now();
        let s = AgentState::Pending.start(now).unwrap().fail(now, "boom".into()).unwrap();
        assert!(s.complete(now).is_err());
        assert!(s.heartbeat(now, None).is_err());
    }

    #[test]
    fn cannot_start_twice() {
        let now = Utc::now();
        let s = AgentState::Pending.start(now).unwrap();
        assert!(s.start(now).is_err());
    }

    #[test]
    fn staleness_is_observable_not_auto_transitioning() {
        let now = Utc::now();
        let s = AgentState::Pending.start(now).unwrap();
        assert!(!s.is_stale(now + Duration::seconds(30)));
        assert!(s.is_stale(now + Duration::seconds(61)));
        // status is still running — staleness never forces a transition.
        assert_eq!(s.status(), AgentStatus::Running);
    }

    #[test]
    fn cancel_is_idempotent() {
        let now = Utc::now();
        let s = AgentState::Pending.cancel(now).unwrap();
        let s2 = s.cancel(now).unwrap();
        assert_eq!(s2.status(), AgentStatus::Cancelled);
    }
}
