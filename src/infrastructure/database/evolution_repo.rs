//! `SQLite`-backed [`EvolutionRepository`].

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::utils::parse_datetime;
use crate::domain::error::CoordinatorError;
use crate::domain::models::EvolutionOutcome;
use crate::domain::ports::EvolutionRepository;

pub struct EvolutionRepositoryImpl {
    pool: SqlitePool,
}

impl EvolutionRepositoryImpl {
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn storage_err(e: impl std::fmt::Display) -> CoordinatorError {
    CoordinatorError::Storage(e.to_string())
}

fn row_to_outcome(row: sqlx::sqlite::SqliteRow) -> Result<EvolutionOutcome, CoordinatorError> {
    let delegation_id: String = row.get("delegation_id");
    let timestamp: String = row.get("timestamp");
    let agent_ids: String = row.get("agent_ids");
    let subtask_count: i64 = row.get("subtask_count");
    Ok(EvolutionOutcome {
        delegation_id: Uuid::parse_str(&delegation_id).map_err(storage_err)?,
        timestamp: parse_datetime(&timestamp).map_err(storage_err)?,
        success: row.get::<i64, _>("success") != 0,
        quality_score: row.get("quality_score"),
        actual_cost: row.get("actual_cost"),
        actual_duration: row.get("actual_duration"),
        complexity: row.get("complexity"),
        subtask_count: u32::try_from(subtask_count).unwrap_or(0),
        agent_ids: serde_json::from_str(&agent_ids).map_err(storage_err)?,
        feedback: row.get("feedback"),
    })
}

const SELECT_COLUMNS: &str = "delegation_id, timestamp, success, quality_score, actual_cost, actual_duration, complexity, subtask_count, agent_ids, feedback";

#[async_trait]
impl EvolutionRepository for EvolutionRepositoryImpl {
    async fn insert(&self, outcome: &EvolutionOutcome) -> Result<(), CoordinatorError> {
        let agent_ids = serde_json::to_string(&outcome.agent_ids).map_err(storage_err)?;
        sqlx::query(
            r"
            INSERT INTO evolution_outcomes (delegation_id, timestamp, success, quality_score, actual_cost, actual_duration, complexity, subtask_count, agent_ids, feedback)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ",
        )
        .bind(outcome.delegation_id.to_string())
        .bind(outcome.timestamp.to_rfc3339())
        .bind(i64::from(outcome.success))
        .bind(outcome.quality_score)
        .bind(outcome.actual_cost)
        .bind(outcome.actual_duration)
        .bind(outcome.complexity)
        .bind(i64::from(outcome.subtask_count))
        .bind(agent_ids)
        .bind(&outcome.feedback)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(())
    }

    async fn list_recent(&self, limit: u32) -> Result<Vec<EvolutionOutcome>, CoordinatorError> {
        let rows = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM evolution_outcomes ORDER BY timestamp DESC LIMIT ?"
        ))
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;
        rows.into_iter().map(row_to_outcome).collect()
    }

    async fn count(&self) -> Result<u64, CoordinatorError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM evolution_outcomes")
            .fetch_one(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(u64::try_from(row.0).unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::database::connection::DatabaseConnection;
    use chrono::Utc;

    async fn repo() -> (DatabaseConnection, EvolutionRepositoryImpl) {
        let db = DatabaseConnection::new("sqlite::memory:").await.unwrap();
        db.migrate().await.unwrap();
        let pool = db.pool().clone();
        (db, EvolutionRepositoryImpl::new(pool))
    }

    #[tokio::test]
    async fn insert_then_list_recent() {
        let (_db, repo) = repo().await;
        for i in 0..3 {
            let outcome = EvolutionOutcome {
                delegation_id: Uuid::new_v4(),
                timestamp: Utc::now(),
                success: i % 2 == 0,
                quality_score: 4.0,
                actual_cost: 0.01,
                actual_duration: 10.0,
                complexity: 0.5,
                subtask_count: 3,
                agent_ids: vec!["agent-1".to_string()],
                feedback: None,
            };
            repo.insert(&outcome).await.unwrap();
        }
        assert_eq!(repo.count().await.unwrap(), 3);
        assert_eq!(repo.list_recent(2).await.unwrap().len(), 2);
    }
}
