//! `SQLite`-backed [`DelegationRepository`]: the assignment-time audit
//! trail, distinct from the result-time [`crate::domain::models::Outcome`].

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::utils::parse_datetime;
use crate::domain::error::CoordinatorError;
use crate::domain::models::DelegationEvent;
use crate::domain::ports::DelegationRepository;

pub struct DelegationRepositoryImpl {
    pool: SqlitePool,
}

impl DelegationRepositoryImpl {
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn storage_err(e: impl std::fmt::Display) -> CoordinatorError {
    CoordinatorError::Storage(e.to_string())
}

fn row_to_event(row: sqlx::sqlite::SqliteRow) -> Result<DelegationEvent, CoordinatorError> {
    let id: String = row.get("id");
    let session_id: String = row.get("session_id");
    let subtask_id: String = row.get("subtask_id");
    let created_at: String = row.get("created_at");
    Ok(DelegationEvent {
        id: Uuid::parse_str(&id).map_err(storage_err)?,
        session_id: Uuid::parse_str(&session_id).map_err(storage_err)?,
        subtask_id: Uuid::parse_str(&subtask_id).map_err(storage_err)?,
        agent_id: row.get("agent_id"),
        model_tier: row.get("model_tier"),
        dq_score: row.get("dq_score"),
        reasoning: row.get("reasoning"),
        created_at: parse_datetime(&created_at).map_err(storage_err)?,
    })
}

const SELECT_COLUMNS: &str = "id, session_id, subtask_id, agent_id, model_tier, dq_score, reasoning, created_at";

#[async_trait]
impl DelegationRepository for DelegationRepositoryImpl {
    async fn insert(&self, event: &DelegationEvent) -> Result<(), CoordinatorError> {
        sqlx::query(
            "INSERT INTO delegation_events (id, session_id, subtask_id, agent_id, model_tier, dq_score, reasoning, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(event.id.to_string())
        .bind(event.session_id.to_string())
        .bind(event.subtask_id.to_string())
        .bind(&event.agent_id)
        .bind(&event.model_tier)
        .bind(event.dq_score)
        .bind(&event.reasoning)
        .bind(event.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(())
    }

    async fn list_by_session(&self, session_id: Uuid) -> Result<Vec<DelegationEvent>, CoordinatorError> {
        let rows = sqlx::query(&format!("SELECT {SELECT_COLUMNS} FROM delegation_events WHERE session_id = ? ORDER BY created_at ASC"))
            .bind(session_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(storage_err)?;
        rows.into_iter().map(row_to_event).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::database::connection::DatabaseConnection;
    use chrono::Utc;

    #[tokio::test]
    async fn insert_then_list_by_session() {
        let db = DatabaseConnection::new("sqlite::memory:").await.unwrap();
        db.migrate().await.unwrap();
        let repo = DelegationRepositoryImpl::new(db.pool().clone());

        let session_id = Uuid::new_v4();
        let event = DelegationEvent {
            id: Uuid::new_v4(),
            session_id,
            subtask_id: Uuid::new_v4(),
            agent_id: "agent-1".into(),
            model_tier: "sonnet".into(),
            dq_score: 0.6,
            reasoning: "best capability match".into(),
            created_at: Utc::now(),
        };
        repo.insert(&event).await.unwrap();

        let events = repo.list_by_session(session_id).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].agent_id, "agent-1");
    }
}
