//! `SQLite`-backed [`DqScoreRepository`]: one row per
//! [`crate::services::dq_scorer`] routing decision, the optimizer's raw
//! material.

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::utils::parse_datetime;
use crate::domain::error::CoordinatorError;
use crate::domain::models::DqScoreRecord;
use crate::domain::ports::DqScoreRepository;

pub struct DqScoreRepositoryImpl {
    pool: SqlitePool,
}

impl DqScoreRepositoryImpl {
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn storage_err(e: impl std::fmt::Display) -> CoordinatorError {
    CoordinatorError::Storage(e.to_string())
}

fn row_to_record(row: sqlx::sqlite::SqliteRow) -> Result<DqScoreRecord, CoordinatorError> {
    let subtask_id: String = row.get("subtask_id");
    let scored_at: String = row.get("scored_at");
    let actionable: i64 = row.get("actionable");
    Ok(DqScoreRecord {
        subtask_id: Uuid::parse_str(&subtask_id).map_err(storage_err)?,
        model_tier: row.get("model_tier"),
        validity: row.get("validity"),
        specificity: row.get("specificity"),
        correctness: row.get("correctness"),
        dq_score: row.get("dq_score"),
        actionable: actionable != 0,
        scored_at: parse_datetime(&scored_at).map_err(storage_err)?,
    })
}

const SELECT_COLUMNS: &str =
    "subtask_id, model_tier, validity, specificity, correctness, dq_score, actionable, scored_at";

#[async_trait]
impl DqScoreRepository for DqScoreRepositoryImpl {
    async fn insert(&self, record: &DqScoreRecord) -> Result<(), CoordinatorError> {
        sqlx::query(
            "INSERT INTO dq_scores (subtask_id, model_tier, validity, specificity, correctness, dq_score, actionable, scored_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(record.subtask_id.to_string())
        .bind(&record.model_tier)
        .bind(record.validity)
        .bind(record.specificity)
        .bind(record.correctness)
        .bind(record.dq_score)
        .bind(i64::from(record.actionable))
        .bind(record.scored_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(())
    }

    async fn list_by_subtask(&self, subtask_id: Uuid) -> Result<Vec<DqScoreRecord>, CoordinatorError> {
        let rows = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM dq_scores WHERE subtask_id = ? ORDER BY scored_at ASC"
        ))
        .bind(subtask_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;
        rows.into_iter().map(row_to_record).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::database::connection::DatabaseConnection;
    use chrono::Utc;

    #[tokio::test]
    async fn insert_then_list_by_subtask() {
        let db = DatabaseConnection::new("sqlite::memory:").await.unwrap();
        db.migrate().await.unwrap();
        let repo = DqScoreRepositoryImpl::new(db.pool().clone());

        let subtask_id = Uuid::new_v4();
        let record = DqScoreRecord {
            subtask_id,
            model_tier: "sonnet".into(),
            validity: 0.9,
            specificity: 0.8,
            correctness: 0.85,
            dq_score: 0.85,
            actionable: true,
            scored_at: Utc::now(),
        };
        repo.insert(&record).await.unwrap();

        let records = repo.list_by_subtask(subtask_id).await.unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].actionable);
        assert_eq!(records[0].model_tier, "sonnet");
    }

    #[tokio::test]
    async fn actionable_false_round_trips() {
        let db = DatabaseConnection::new("sqlite::memory:").await.unwrap();
        db.migrate().await.unwrap();
        let repo = DqScoreRepositoryImpl::new(db.pool().clone());

        let subtask_id = Uuid::new_v4();
        let record = DqScoreRecord {
            subtask_id,
            model_tier: "haiku".into(),
            validity: 0.3,
            specificity: 0.2,
            correctness: 0.25,
            dq_score: 0.25,
            actionable: false,
            scored_at: Utc::now(),
        };
        repo.insert(&record).await.unwrap();

        let records = repo.list_by_subtask(subtask_id).await.unwrap();
        assert!(!records[0].actionable);
    }
}
