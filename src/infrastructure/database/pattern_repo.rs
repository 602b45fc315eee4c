//! `SQLite`-backed [`PatternRepository`]: one row per
//! [`crate::services::pattern_detector`] classification.

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::utils::parse_datetime;
use crate::domain::error::CoordinatorError;
use crate::domain::models::PatternDetection;
use crate::domain::ports::PatternRepository;

pub struct PatternRepositoryImpl {
    pool: SqlitePool,
}

impl PatternRepositoryImpl {
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn storage_err(e: impl std::fmt::Display) -> CoordinatorError {
    CoordinatorError::Storage(e.to_string())
}

fn row_to_detection(row: sqlx::sqlite::SqliteRow) -> Result<PatternDetection, CoordinatorError> {
    let task_id: String = row.get("task_id");
    let detected_at: String = row.get("detected_at");
    Ok(PatternDetection {
        task_id: Uuid::parse_str(&task_id).map_err(storage_err)?,
        label: row.get("label"),
        confidence: row.get("confidence"),
        strategy: row.get("strategy"),
        detected_at: parse_datetime(&detected_at).map_err(storage_err)?,
    })
}

const SELECT_COLUMNS: &str = "task_id, label, confidence, strategy, detected_at";

#[async_trait]
impl PatternRepository for PatternRepositoryImpl {
    async fn insert(&self, detection: &PatternDetection) -> Result<(), CoordinatorError> {
        sqlx::query(
            "INSERT INTO patterns (task_id, label, confidence, strategy, detected_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(detection.task_id.to_string())
        .bind(&detection.label)
        .bind(detection.confidence)
        .bind(&detection.strategy)
        .bind(detection.detected_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(())
    }

    async fn list_by_task(&self, task_id: Uuid) -> Result<Vec<PatternDetection>, CoordinatorError> {
        let rows = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM patterns WHERE task_id = ? ORDER BY detected_at ASC"
        ))
        .bind(task_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;
        rows.into_iter().map(row_to_detection).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::database::connection::DatabaseConnection;
    use chrono::Utc;

    #[tokio::test]
    async fn insert_then_list_by_task() {
        let db = DatabaseConnection::new("sqlite::memory:").await.unwrap();
        db.migrate().await.unwrap();
        let repo = PatternRepositoryImpl::new(db.pool().clone());

        let task_id = Uuid::new_v4();
        let detection = PatternDetection {
            task_id,
            label: "debugging".into(),
            confidence: 0.8,
            strategy: "investigate_then_fix".into(),
            detected_at: Utc::now(),
        };
        repo.insert(&detection).await.unwrap();

        let detections = repo.list_by_task(task_id).await.unwrap();
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].label, "debugging");
    }

    #[tokio::test]
    async fn list_by_task_empty_when_no_match() {
        let db = DatabaseConnection::new("sqlite::memory:").await.unwrap();
        db.migrate().await.unwrap();
        let repo = PatternRepositoryImpl::new(db.pool().clone());

        let detections = repo.list_by_task(Uuid::new_v4()).await.unwrap();
        assert!(detections.is_empty());
    }
}
