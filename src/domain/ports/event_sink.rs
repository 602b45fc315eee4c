//! Best-effort audit/event logging.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Coordinator-specific audit vocabulary, generalized from the donor
/// logging module's fixed `AuditEventType` list to the events this engine
/// actually emits (one per 4Ds gate decision, trust update, conflict
/// detection, lifecycle transition, and baseline change).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CoordinatorEventType {
    SessionStarted,
    SessionCompleted,
    AgentSpawned,
    AgentCompleted,
    AgentFailed,
    AgentTimedOut,
    DelegationGateBlocked,
    DiligenceGateUnsafe,
    ConflictDetected,
    TrustUpdated,
    BaselineApplied,
    BaselineRolledBack,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EventOutcome {
    Success,
    Failure,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorEvent {
    pub timestamp: DateTime<Utc>,
    pub event_type: CoordinatorEventType,
    pub operation: String,
    pub actor: String,
    pub resource_id: Option<String>,
    pub outcome: EventOutcome,
    pub metadata: Option<Value>,
}

/// `EventSink.log(event)`. The core calls this and ignores failures — an
/// observability write must never fail the operation it is describing.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn log(&self, event: CoordinatorEvent);
}

/// An `EventSink` that discards everything; the default for components
/// that don't care to observe audit events (and for most unit tests).
pub struct NullEventSink;

#[async_trait]
impl EventSink for NullEventSink {
    async fn log(&self, _event: CoordinatorEvent) {}
}
