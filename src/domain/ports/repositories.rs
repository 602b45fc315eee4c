//! Storage ports. Each trait is a thin, test-doubleable boundary around one
//! table in one of the two data silos; `infrastructure::database` provides
//! the `SQLite`-backed implementations, `sqlx::query_as!` row by row.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::error::CoordinatorError;
use crate::domain::models::{
    AgentRecord, Baseline, DelegationEvent, DqScoreRecord, EvolutionOutcome, FileLock, Outcome,
    PatternDetection, Session, TrustEntry,
};

/// Sessions: one row per top-level task submitted to the orchestrator.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn insert(&self, session: &Session) -> Result<(), CoordinatorError>;
    async fn update(&self, session: &Session) -> Result<(), CoordinatorError>;
    async fn get(&self, session_id: Uuid) -> Result<Option<Session>, CoordinatorError>;
    async fn list_recent(&self, limit: u32) -> Result<Vec<Session>, CoordinatorError>;
}

/// The live agent registry: one row per spawned subprocess invocation.
#[async_trait]
pub trait AgentRegistryRepository: Send + Sync {
    async fn insert(&self, agent: &AgentRecord) -> Result<(), CoordinatorError>;
    async fn update(&self, agent: &AgentRecord) -> Result<(), CoordinatorError>;
    async fn get(&self, agent_id: Uuid) -> Result<Option<AgentRecord>, CoordinatorError>;
    async fn list_by_task(&self, task_id: Uuid) -> Result<Vec<AgentRecord>, CoordinatorError>;
    async fn list_active(&self) -> Result<Vec<AgentRecord>, CoordinatorError>;
    /// Deletes terminal rows whose `completed_at` is older than `cutoff`;
    /// returns the number of rows removed.
    async fn cleanup_completed(&self, cutoff: chrono::DateTime<chrono::Utc>) -> Result<u64, CoordinatorError>;
}

/// Bayesian trust entries keyed by `(agent_id, task_type)`.
#[async_trait]
pub trait TrustRepository: Send + Sync {
    async fn get(&self, agent_id: &str, task_type: &str) -> Result<Option<TrustEntry>, CoordinatorError>;
    async fn upsert(&self, entry: &TrustEntry) -> Result<(), CoordinatorError>;
    async fn list_for_agent(&self, agent_id: &str) -> Result<Vec<TrustEntry>, CoordinatorError>;
    async fn list_all(&self) -> Result<Vec<TrustEntry>, CoordinatorError>;
}

/// Held file locks, swept for staleness on every conflict check.
#[async_trait]
pub trait FileLockRepository: Send + Sync {
    async fn acquire(&self, lock: &FileLock) -> Result<(), CoordinatorError>;
    async fn release(&self, path: &str, agent_id: &str) -> Result<(), CoordinatorError>;
    async fn release_all_for_agent(&self, agent_id: &str) -> Result<(), CoordinatorError>;
    async fn list_for_path(&self, path: &str) -> Result<Vec<FileLock>, CoordinatorError>;
    async fn list_all(&self) -> Result<Vec<FileLock>, CoordinatorError>;
    async fn purge_stale(&self, now: DateTime<Utc>) -> Result<u64, CoordinatorError>;
}

/// Analyzed session outcomes, keyed uniquely by `session_id`.
#[async_trait]
pub trait OutcomeRepository: Send + Sync {
    async fn upsert(&self, outcome: &Outcome) -> Result<(), CoordinatorError>;
    async fn get(&self, session_id: Uuid) -> Result<Option<Outcome>, CoordinatorError>;
    async fn list_recent(&self, limit: u32) -> Result<Vec<Outcome>, CoordinatorError>;
    async fn count(&self) -> Result<u64, CoordinatorError>;
}

/// Versioned baselines the optimizer writes, never overwrites.
#[async_trait]
pub trait BaselineRepository: Send + Sync {
    async fn insert(&self, baseline: &Baseline) -> Result<(), CoordinatorError>;
    async fn latest(&self) -> Result<Option<Baseline>, CoordinatorError>;
    async fn get_version(&self, version: u32) -> Result<Option<Baseline>, CoordinatorError>;
    async fn list_all(&self) -> Result<Vec<Baseline>, CoordinatorError>;
}

/// Per-delegation feedback consumed by the evolution engine.
#[async_trait]
pub trait EvolutionRepository: Send + Sync {
    async fn insert(&self, outcome: &EvolutionOutcome) -> Result<(), CoordinatorError>;
    async fn list_recent(&self, limit: u32) -> Result<Vec<EvolutionOutcome>, CoordinatorError>;
    async fn count(&self) -> Result<u64, CoordinatorError>;
}

/// The delegation-decision audit trail, recorded at assignment time.
#[async_trait]
pub trait DelegationRepository: Send + Sync {
    async fn insert(&self, event: &DelegationEvent) -> Result<(), CoordinatorError>;
    async fn list_by_session(&self, session_id: Uuid) -> Result<Vec<DelegationEvent>, CoordinatorError>;
}

/// [`crate::services::pattern_detector`] classifications, recorded once
/// per task for later audit.
#[async_trait]
pub trait PatternRepository: Send + Sync {
    async fn insert(&self, detection: &PatternDetection) -> Result<(), CoordinatorError>;
    async fn list_by_task(&self, task_id: Uuid) -> Result<Vec<PatternDetection>, CoordinatorError>;
}

/// [`crate::services::dq_scorer`] routing decisions, recorded once per
/// subtask as the optimizer's raw material.
#[async_trait]
pub trait DqScoreRepository: Send + Sync {
    async fn insert(&self, record: &DqScoreRecord) -> Result<(), CoordinatorError>;
    async fn list_by_subtask(&self, subtask_id: Uuid) -> Result<Vec<DqScoreRecord>, CoordinatorError>;
}
