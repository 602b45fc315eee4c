//! Agent lifecycle state machine: `pending → running → {completed | failed
//! | timeout | cancelled}`, persisted through [`AgentRegistryRepository`].

use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::error::CoordinatorError;
use crate::domain::models::{AgentRecord, AgentStatus};
use crate::domain::ports::AgentRegistryRepository;

/// An agent running longer than this without a heartbeat is stale.
pub const STALE_AFTER_SECS: i64 = 60;
/// `cleanup_completed`'s default retention window for terminal rows.
pub const DEFAULT_CLEANUP_AFTER_SECS: i64 = 600;

pub struct AgentRegistry {
    repo: Arc<dyn AgentRegistryRepository>,
}

impl AgentRegistry {
    pub fn new(repo: Arc<dyn AgentRegistryRepository>) -> Self {
        Self { repo }
    }

    pub async fn register(&self, record: AgentRecord) -> Result<(), CoordinatorError> {
        self.repo.insert(&record).await
    }

    async fn load(&self, agent_id: Uuid) -> Result<AgentRecord, CoordinatorError> {
        self.repo.get(agent_id).await?.ok_or(CoordinatorError::AgentNotFound(agent_id))
    }

    pub async fn start(&self, agent_id: Uuid) -> Result<AgentRecord, CoordinatorError> {
        let mut record = self.load(agent_id).await?;
        let next = record.state().start(Utc::now())?;
        record.apply(next);
        self.repo.update(&record).await?;
        Ok(record)
    }

    pub async fn heartbeat(&self, agent_id: Uuid, progress: Option<f64>) -> Result<AgentRecord, CoordinatorError> {
        let mut record = self.load(agent_id).await?;
        let next = record.state().heartbeat(Utc::now(), progress)?;
        record.apply(next);
        self.repo.update(&record).await?;
        Ok(record)
    }

    pub async fn complete(&self, agent_id: Uuid, result: Option<String>) -> Result<AgentRecord, CoordinatorError> {
        let mut record = self.load(agent_id).await?;
        let next = record.state().complete(Utc::now())?;
        record.apply(next);
        record.result = result;
        self.repo.update(&record).await?;
        Ok(record)
    }

    pub async fn fail(&self, agent_id: Uuid, error: String) -> Result<AgentRecord, CoordinatorError> {
        let mut record = self.load(agent_id).await?;
        let next = record.state().fail(Utc::now(), error)?;
        record.apply(next);
        self.repo.update(&record).await?;
        Ok(record)
    }

    pub async fn timeout(&self, agent_id: Uuid) -> Result<AgentRecord, CoordinatorError> {
        let mut record = self.load(agent_id).await?;
        let next = record.state().timeout(Utc::now())?;
        record.apply(next);
        self.repo.update(&record).await?;
        Ok(record)
    }

    pub async fn cancel(&self, agent_id: Uuid) -> Result<AgentRecord, CoordinatorError> {
        let mut record = self.load(agent_id).await?;
        let next = record.state().cancel(Utc::now())?;
        record.apply(next);
        self.repo.update(&record).await?;
        Ok(record)
    }

    pub async fn get(&self, agent_id: Uuid) -> Result<Option<AgentRecord>, CoordinatorError> {
        self.repo.get(agent_id).await
    }

    pub async fn list_by_task(&self, task_id: Uuid) -> Result<Vec<AgentRecord>, CoordinatorError> {
        self.repo.list_by_task(task_id).await
    }

    pub async fn list_active(&self) -> Result<Vec<AgentRecord>, CoordinatorError> {
        self.repo.list_active().await
    }

    /// Stale, running agents among the currently active set — observable
    /// only; the caller (executor/supervisor) decides what to do about it.
    pub async fn list_stale(&self) -> Result<Vec<AgentRecord>, CoordinatorError> {
        let now = Utc::now();
        let active = self.repo.list_active().await?;
        Ok(active.into_iter().filter(|a| a.state().is_stale(now)).collect())
    }

    /// Deletes terminal rows older than `older_than_secs`
    /// ([`DEFAULT_CLEANUP_AFTER_SECS`] if unspecified by the caller).
    pub async fn cleanup_completed(&self, older_than_secs: i64) -> Result<u64, CoordinatorError> {
        let cutoff = Utc::now() - chrono::Duration::seconds(older_than_secs);
        self.repo.cleanup_completed(cutoff).await
    }
}

/// Pure predicate used by tests and the executor's own staleness check
/// without requiring a live registry.
pub fn is_stale(record: &AgentRecord, now: chrono::DateTime<Utc>) -> bool {
    record.status == AgentStatus::Running && record.state().is_stale(now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::database::{connection::DatabaseConnection, AgentRegistryRepositoryImpl};

    async fn registry() -> (DatabaseConnection, AgentRegistry) {
        let db = DatabaseConnection::new("sqlite::memory:").await.unwrap();
        db.migrate().await.unwrap();
        let repo = Arc::new(AgentRegistryRepositoryImpl::new(db.pool().clone()));
        (db, AgentRegistry::new(repo))
    }

    fn new_record() -> AgentRecord {
        AgentRecord::new(Uuid::new_v4(), Uuid::new_v4(), "implementer".into(), "sonnet".into(), 0.7, 0.01, Utc::now())
    }

    #[tokio::test]
    async fn full_lifecycle_to_completion() {
        let (_db, registry) = registry().await;
        let record = new_record();
        let id = record.agent_id;
        registry.register(record).await.unwrap();

        registry.start(id).await.unwrap();
        registry.heartbeat(id, Some(0.5)).await.unwrap();
        let completed = registry.complete(id, Some("done".into())).await.unwrap();
        assert_eq!(completed.status, AgentStatus::Completed);
        assert_eq!(completed.progress, 1.0);
    }

    #[tokio::test]
    async fn terminal_states_reject_further_transitions() {
        let (_db, registry) = registry().await;
        let record = new_record();
        let id = record.agent_id;
        registry.register(record).await.unwrap();
        registry.start(id).await.unwrap();
        registry.fail(id, "boom".into()).await.unwrap();
        assert!(registry.heartbeat(id, None).await.is_err());
        assert!(registry.complete(id, None).await.is_err());
    }

    #[tokio::test]
    async fn heartbeat_progress_is_clamped() {
        let (_db, registry) = registry().await;
        let record = new_record();
        let id = record.agent_id;
        registry.register(record).await.unwrap();
        registry.start(id).await.unwrap();
        let updated = registry.heartbeat(id, Some(5.0)).await.unwrap();
        assert_eq!(updated.progress, 1.0);
    }

    #[tokio::test]
    async fn cleanup_completed_removes_old_terminal_agents() {
        let (_db, registry) = registry().await;
        let record = new_record();
        let id = record.agent_id;
        registry.register(record).await.unwrap();
        registry.start(id).await.unwrap();
        let mut completed = registry.complete(id, Some("done".into())).await.unwrap();
        completed.completed_at = Some(Utc::now() - chrono::Duration::seconds(3600));
        registry.repo.update(&completed).await.unwrap();

        let removed = registry.cleanup_completed(DEFAULT_CLEANUP_AFTER_SECS).await.unwrap();
        assert_eq!(removed, 1);
        assert!(registry.get(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unknown_agent_id_errors() {
        let (_db, registry) = registry().await;
        let err = registry.start(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, CoordinatorError::AgentNotFound(_)));
    }
}
