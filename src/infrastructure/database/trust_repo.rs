//! `SQLite`-backed [`TrustRepository`]: one upsert statement per `(agent_id,
//! task_type)` update, matching §5 ("upsert performed in one statement").

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use super::utils::parse_datetime;
use crate::domain::error::CoordinatorError;
use crate::domain::models::TrustEntry;
use crate::domain::ports::TrustRepository;

pub struct TrustRepositoryImpl {
    pool: SqlitePool,
}

impl TrustRepositoryImpl {
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn storage_err(e: impl std::fmt::Display) -> CoordinatorError {
    CoordinatorError::Storage(e.to_string())
}

fn row_to_entry(row: sqlx::sqlite::SqliteRow) -> Result<TrustEntry, CoordinatorError> {
    let last_updated: String = row.get("last_updated");
    Ok(TrustEntry {
        agent_id: row.get("agent_id"),
        task_type: row.get("task_type"),
        success_count: u64::try_from(row.get::<i64, _>("success_count")).unwrap_or(0),
        failure_count: u64::try_from(row.get::<i64, _>("failure_count")).unwrap_or(0),
        avg_quality: row.get("avg_quality"),
        avg_duration: row.get("avg_duration"),
        trust_score: row.get("trust_score"),
        last_updated: parse_datetime(&last_updated).map_err(storage_err)?,
    })
}

#[async_trait]
impl TrustRepository for TrustRepositoryImpl {
    async fn get(&self, agent_id: &str, task_type: &str) -> Result<Option<TrustEntry>, CoordinatorError> {
        let row = sqlx::query(
            "SELECT agent_id, task_type, success_count, failure_count, avg_quality, avg_duration, trust_score, last_updated FROM trust_entries WHERE agent_id = ? AND task_type = ?",
        )
        .bind(agent_id)
        .bind(task_type)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_err)?;
        row.map(row_to_entry).transpose()
    }

    async fn upsert(&self, entry: &TrustEntry) -> Result<(), CoordinatorError> {
        sqlx::query(
            r"
            INSERT INTO trust_entries (agent_id, task_type, success_count, failure_count, avg_quality, avg_duration, trust_score, last_updated)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(agent_id, task_type) DO UPDATE SET
                success_count = excluded.success_count,
                failure_count = excluded.failure_count,
                avg_quality = excluded.avg_quality,
                avg_duration = excluded.avg_duration,
                trust_score = excluded.trust_score,
                last_updated = excluded.last_updated
            ",
        )
        .bind(&entry.agent_id)
        .bind(&entry.task_type)
        .bind(i64::try_from(entry.success_count).unwrap_or(i64::MAX))
        .bind(i64::try_from(entry.failure_count).unwrap_or(i64::MAX))
        .bind(entry.avg_quality)
        .bind(entry.avg_duration)
        .bind(entry.trust_score)
        .bind(entry.last_updated.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(())
    }

    async fn list_for_agent(&self, agent_id: &str) -> Result<Vec<TrustEntry>, CoordinatorError> {
        let rows = sqlx::query(
            "SELECT agent_id, task_type, success_count, failure_count, avg_quality, avg_duration, trust_score, last_updated FROM trust_entries WHERE agent_id = ?",
        )
        .bind(agent_id)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;
        rows.into_iter().map(row_to_entry).collect()
    }

    async fn list_all(&self) -> Result<Vec<TrustEntry>, CoordinatorError> {
        let rows = sqlx::query(
            "SELECT agent_id, task_type, success_count, failure_count, avg_quality, avg_duration, trust_score, last_updated FROM trust_entries",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;
        rows.into_iter().map(row_to_entry).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::database::connection::DatabaseConnection;
    use chrono::Utc;

    async fn repo() -> (DatabaseConnection, TrustRepositoryImpl) {
        let db = DatabaseConnection::new("sqlite::memory:").await.unwrap();
        db.migrate().await.unwrap();
        let pool = db.pool().clone();
        (db, TrustRepositoryImpl::new(pool))
    }

    #[tokio::test]
    async fn upsert_then_get_round_trips() {
        let (_db, repo) = repo().await;
        let mut entry = TrustEntry::new("agent-1".into(), "build".into(), Utc::now());
        entry.success_count = 9;
        entry.recompute_trust_score();
        repo.upsert(&entry).await.unwrap();

        let fetched = repo.get("agent-1", "build").await.unwrap().unwrap();
        assert_eq!(fetched.success_count, 9);
        assert!((fetched.trust_score - 10.0 / 11.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn upsert_overwrites_existing_entry() {
        let (_db, repo) = repo().await;
        let mut entry = TrustEntry::new("agent-1".into(), "build".into(), Utc::now());
        repo.upsert(&entry).await.unwrap();
        entry.success_count = 5;
        entry.recompute_trust_score();
        repo.upsert(&entry).await.unwrap();

        let all = repo.list_for_agent("agent-1").await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].success_count, 5);
    }

    #[tokio::test]
    async fn missing_entry_returns_none() {
        let (_db, repo) = repo().await;
        assert!(repo.get("nobody", "build").await.unwrap().is_none());
    }
}
