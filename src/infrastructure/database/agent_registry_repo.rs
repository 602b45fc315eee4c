//! `SQLite`-backed [`AgentRegistryRepository`].
//!
//! `update` writes the live row in `agent_registry`; when the incoming
//! status is terminal it also appends to `agents`, the permanent
//! history table named in §4.1/§4.9 — both writes happen in one
//! transaction so a crash never leaves the live row terminal without a
//! matching history row.

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::utils::parse_datetime;
use crate::domain::error::CoordinatorError;
use crate::domain::models::{AgentRecord, AgentStatus};
use crate::domain::ports::AgentRegistryRepository;

pub struct AgentRegistryRepositoryImpl {
    pool: SqlitePool,
}

impl AgentRegistryRepositoryImpl {
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn storage_err(e: impl std::fmt::Display) -> CoordinatorError {
    CoordinatorError::Storage(e.to_string())
}

fn row_to_record(row: sqlx::sqlite::SqliteRow) -> Result<AgentRecord, CoordinatorError> {
    let files_locked: String = row.get("files_locked");
    let metadata: String = row.get("metadata");
    let status: String = row.get("status");
    let created_at: String = row.get("created_at");
    let started_at: Option<String> = row.get("started_at");
    let completed_at: Option<String> = row.get("completed_at");
    let last_heartbeat: Option<String> = row.get("last_heartbeat");
    let agent_id: String = row.get("agent_id");
    let task_id: String = row.get("task_id");
    let subtask_id: String = row.get("subtask_id");

    Ok(AgentRecord {
        agent_id: Uuid::parse_str(&agent_id).map_err(storage_err)?,
        task_id: Uuid::parse_str(&task_id).map_err(storage_err)?,
        subtask_id: Uuid::parse_str(&subtask_id).map_err(storage_err)?,
        agent_type: row.get("agent_type"),
        model_tier: row.get("model_tier"),
        status: AgentStatus::from_str(&status)
            .ok_or_else(|| CoordinatorError::Storage(format!("unknown agent status: {status}")))?,
        created_at: parse_datetime(&created_at).map_err(storage_err)?,
        started_at: started_at.map(|s| parse_datetime(&s)).transpose().map_err(storage_err)?,
        completed_at: completed_at.map(|s| parse_datetime(&s)).transpose().map_err(storage_err)?,
        files_locked: serde_json::from_str(&files_locked).map_err(storage_err)?,
        progress: row.get("progress"),
        last_heartbeat: last_heartbeat.map(|s| parse_datetime(&s)).transpose().map_err(storage_err)?,
        result: row.get("result"),
        error: row.get("error"),
        dq_score: row.get("dq_score"),
        cost_estimate: row.get("cost_estimate"),
        metadata: serde_json::from_str(&metadata).map_err(storage_err)?,
    })
}

const SELECT_COLUMNS: &str = "agent_id, task_id, subtask_id, agent_type, model_tier, status, created_at, started_at, completed_at, files_locked, progress, last_heartbeat, result, error, dq_score, cost_estimate, metadata";

#[async_trait]
impl AgentRegistryRepository for AgentRegistryRepositoryImpl {
    async fn insert(&self, agent: &AgentRecord) -> Result<(), CoordinatorError> {
        self.update(agent).await
    }

    async fn update(&self, agent: &AgentRecord) -> Result<(), CoordinatorError> {
        let files_locked = serde_json::to_string(&agent.files_locked).map_err(storage_err)?;
        let metadata = serde_json::to_string(&agent.metadata).map_err(storage_err)?;

        let mut tx = self.pool.begin().await.map_err(storage_err)?;

        sqlx::query(
            r"
            INSERT INTO agent_registry (
                agent_id, task_id, subtask_id, agent_type, model_tier, status, created_at,
                started_at, completed_at, files_locked, progress, last_heartbeat, result,
                error, dq_score, cost_estimate, metadata
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(agent_id) DO UPDATE SET
                status = excluded.status,
                started_at = excluded.started_at,
                completed_at = excluded.completed_at,
                files_locked = excluded.files_locked,
                progress = excluded.progress,
                last_heartbeat = excluded.last_heartbeat,
                result = excluded.result,
                error = excluded.error
            ",
        )
        .bind(agent.agent_id.to_string())
        .bind(agent.task_id.to_string())
        .bind(agent.subtask_id.to_string())
        .bind(&agent.agent_type)
        .bind(&agent.model_tier)
        .bind(agent.status.as_str())
        .bind(agent.created_at.to_rfc3339())
        .bind(agent.started_at.map(|d| d.to_rfc3339()))
        .bind(agent.completed_at.map(|d| d.to_rfc3339()))
        .bind(files_locked)
        .bind(agent.progress)
        .bind(agent.last_heartbeat.map(|d| d.to_rfc3339()))
        .bind(&agent.result)
        .bind(&agent.error)
        .bind(agent.dq_score)
        .bind(agent.cost_estimate)
        .bind(metadata)
        .execute(&mut *tx)
        .await
        .map_err(storage_err)?;

        if agent.status.is_terminal() {
            let completed_at = agent.completed_at.unwrap_or(agent.created_at);
            sqlx::query(
                r"
                INSERT INTO agents (agent_id, task_id, subtask_id, status, model_tier, created_at, completed_at, error)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(agent_id) DO UPDATE SET status = excluded.status, completed_at = excluded.completed_at, error = excluded.error
                ",
            )
            .bind(agent.agent_id.to_string())
            .bind(agent.task_id.to_string())
            .bind(agent.subtask_id.to_string())
            .bind(agent.status.as_str())
            .bind(&agent.model_tier)
            .bind(agent.created_at.to_rfc3339())
            .bind(completed_at.to_rfc3339())
            .bind(&agent.error)
            .execute(&mut *tx)
            .await
            .map_err(storage_err)?;
        }

        tx.commit().await.map_err(storage_err)?;
        Ok(())
    }

    async fn get(&self, agent_id: Uuid) -> Result<Option<AgentRecord>, CoordinatorError> {
        let row = sqlx::query(&format!("SELECT {SELECT_COLUMNS} FROM agent_registry WHERE agent_id = ?"))
            .bind(agent_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err)?;
        row.map(row_to_record).transpose()
    }

    async fn list_by_task(&self, task_id: Uuid) -> Result<Vec<AgentRecord>, CoordinatorError> {
        let rows = sqlx::query(&format!("SELECT {SELECT_COLUMNS} FROM agent_registry WHERE task_id = ?"))
            .bind(task_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(storage_err)?;
        rows.into_iter().map(row_to_record).collect()
    }

    async fn list_active(&self) -> Result<Vec<AgentRecord>, CoordinatorError> {
        let rows = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM agent_registry WHERE status IN ('pending', 'running')"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;
        rows.into_iter().map(row_to_record).collect()
    }

    /// Deletes terminal rows older than `cutoff`, matching `cleanup_completed`
    /// in §4.9.
    async fn cleanup_completed(&self, cutoff: chrono::DateTime<chrono::Utc>) -> Result<u64, CoordinatorError> {
        let result = sqlx::query(
            "DELETE FROM agent_registry WHERE status IN ('completed', 'failed', 'timeout', 'cancelled') AND completed_at IS NOT NULL AND completed_at < ?",
        )
        .bind(cutoff.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::database::connection::DatabaseConnection;

    async fn repo() -> (DatabaseConnection, AgentRegistryRepositoryImpl) {
        let db = DatabaseConnection::new("sqlite::memory:").await.unwrap();
        db.migrate().await.unwrap();
        let pool = db.pool().clone();
        (db, AgentRegistryRepositoryImpl::new(pool))
    }

    #[tokio::test]
    async fn insert_then_get_round_trips() {
        let (_db, repo) = repo().await;
        let rec = AgentRecord::new(Uuid::new_v4(), Uuid::new_v4(), "implementer".into(), "sonnet".into(), 0.7, 0.01, chrono::Utc::now());
        repo.insert(&rec).await.unwrap();
        let fetched = repo.get(rec.agent_id).await.unwrap().unwrap();
        assert_eq!(fetched.agent_type, "implementer");
        assert_eq!(fetched.status, AgentStatus::Pending);
    }

    #[tokio::test]
    async fn terminal_update_writes_history_row() {
        let (db, repo) = repo().await;
        let mut rec = AgentRecord::new(Uuid::new_v4(), Uuid::new_v4(), "implementer".into(), "sonnet".into(), 0.7, 0.01, chrono::Utc::now());
        repo.insert(&rec).await.unwrap();

        rec.apply(rec.state().start(chrono::Utc::now()).unwrap());
        repo.update(&rec).await.unwrap();
        rec.apply(rec.state().complete(chrono::Utc::now()).unwrap());
        repo.update(&rec).await.unwrap();

        let history: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM agents WHERE agent_id = ?")
            .bind(rec.agent_id.to_string())
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(history.0, 1);

        let active = repo.list_active().await.unwrap();
        assert!(active.is_empty());
    }

    #[tokio::test]
    async fn cleanup_completed_only_removes_old_terminal_rows() {
        let (_db, repo) = repo().await;

        let mut old = AgentRecord::new(Uuid::new_v4(), Uuid::new_v4(), "implementer".into(), "sonnet".into(), 0.7, 0.01, chrono::Utc::now());
        repo.insert(&old).await.unwrap();
        old.apply(old.state().start(chrono::Utc::now()).unwrap());
        repo.update(&old).await.unwrap();
        old.apply(old.state().complete(chrono::Utc::now()).unwrap());
        old.completed_at = Some(chrono::Utc::now() - chrono::Duration::seconds(3600));
        repo.update(&old).await.unwrap();

        let mut recent = AgentRecord::new(Uuid::new_v4(), Uuid::new_v4(), "implementer".into(), "sonnet".into(), 0.7, 0.01, chrono::Utc::now());
        repo.insert(&recent).await.unwrap();
        recent.apply(recent.state().start(chrono::Utc::now()).unwrap());
        repo.update(&recent).await.unwrap();
        recent.apply(recent.state().complete(chrono::Utc::now()).unwrap());
        repo.update(&recent).await.unwrap();

        let removed = repo.cleanup_completed(chrono::Utc::now() - chrono::Duration::seconds(600)).await.unwrap();
        assert_eq!(removed, 1);
        assert!(repo.get(old.agent_id).await.unwrap().is_none());
        assert!(repo.get(recent.agent_id).await.unwrap().is_some());
    }
}
