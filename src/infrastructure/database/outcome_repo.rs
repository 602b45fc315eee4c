//! `SQLite`-backed [`OutcomeRepository`].

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::utils::parse_datetime;
use crate::domain::error::CoordinatorError;
use crate::domain::models::{Outcome, OutcomeKind};
use crate::domain::ports::OutcomeRepository;

pub struct OutcomeRepositoryImpl {
    pool: SqlitePool,
}

impl OutcomeRepositoryImpl {
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn storage_err(e: impl std::fmt::Display) -> CoordinatorError {
    CoordinatorError::Storage(e.to_string())
}

fn kind_str(k: OutcomeKind) -> &'static str {
    match k {
        OutcomeKind::Success => "success",
        OutcomeKind::Partial => "partial",
        OutcomeKind::Failed => "failed",
        OutcomeKind::Research => "research",
        OutcomeKind::Abandoned => "abandoned",
        OutcomeKind::Error => "error",
        OutcomeKind::Unknown => "unknown",
    }
}

fn parse_kind(s: &str) -> OutcomeKind {
    match s {
        "success" => OutcomeKind::Success,
        "partial" => OutcomeKind::Partial,
        "failed" => OutcomeKind::Failed,
        "research" => OutcomeKind::Research,
        "abandoned" => OutcomeKind::Abandoned,
        "error" => OutcomeKind::Error,
        _ => OutcomeKind::Unknown,
    }
}

fn row_to_outcome(row: sqlx::sqlite::SqliteRow) -> Result<Outcome, CoordinatorError> {
    let session_id: String = row.get("session_id");
    let outcome: String = row.get("outcome");
    let analyzed_at: String = row.get("analyzed_at");
    Ok(Outcome {
        session_id: Uuid::parse_str(&session_id).map_err(storage_err)?,
        outcome: parse_kind(&outcome),
        quality: row.get("quality"),
        complexity: row.get("complexity"),
        model_efficiency: row.get("model_efficiency"),
        dq_score: row.get("dq_score"),
        confidence: row.get("confidence"),
        analyzed_at: parse_datetime(&analyzed_at).map_err(storage_err)?,
    })
}

const SELECT_COLUMNS: &str = "session_id, outcome, quality, complexity, model_efficiency, dq_score, confidence, analyzed_at";

#[async_trait]
impl OutcomeRepository for OutcomeRepositoryImpl {
    /// Exactly one row per `session_id` — §8 invariant 7.
    async fn upsert(&self, outcome: &Outcome) -> Result<(), CoordinatorError> {
        sqlx::query(
            r"
            INSERT INTO outcomes (session_id, outcome, quality, complexity, model_efficiency, dq_score, confidence, analyzed_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(session_id) DO UPDATE SET
                outcome = excluded.outcome,
                quality = excluded.quality,
                complexity = excluded.complexity,
                model_efficiency = excluded.model_efficiency,
                dq_score = excluded.dq_score,
                confidence = excluded.confidence,
                analyzed_at = excluded.analyzed_at
            ",
        )
        .bind(outcome.session_id.to_string())
        .bind(kind_str(outcome.outcome))
        .bind(outcome.quality)
        .bind(outcome.complexity)
        .bind(outcome.model_efficiency)
        .bind(outcome.dq_score)
        .bind(outcome.confidence)
        .bind(outcome.analyzed_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(())
    }

    async fn get(&self, session_id: Uuid) -> Result<Option<Outcome>, CoordinatorError> {
        let row = sqlx::query(&format!("SELECT {SELECT_COLUMNS} FROM outcomes WHERE session_id = ?"))
            .bind(session_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err)?;
        row.map(row_to_outcome).transpose()
    }

    async fn list_recent(&self, limit: u32) -> Result<Vec<Outcome>, CoordinatorError> {
        let rows = sqlx::query(&format!("SELECT {SELECT_COLUMNS} FROM outcomes ORDER BY analyzed_at DESC LIMIT ?"))
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(storage_err)?;
        rows.into_iter().map(row_to_outcome).collect()
    }

    async fn count(&self) -> Result<u64, CoordinatorError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM outcomes")
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

    async fn repo() -> (DatabaseConnection, OutcomeRepositoryImpl) {
        let db = DatabaseConnection::new("sqlite::memory:").await.unwrap();
        db.migrate().await.unwrap();
        let pool = db.pool().clone();
        (db, OutcomeRepositoryImpl::new(pool))
    }

    fn sample(id: Uuid) -> Outcome {
        Outcome {
            session_id: id,
            outcome: OutcomeKind::Success,
            quality: 4.0,
            complexity: 0.5,
            model_efficiency: 0.8,
            dq_score: 0.7,
            confidence: 0.9,
            analyzed_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn upsert_is_exactly_one_row_per_session() {
        let (_db, repo) = repo().await;
        let id = Uuid::new_v4();
        repo.upsert(&sample(id)).await.unwrap();
        let mut second = sample(id);
        second.quality = 2.0;
        repo.upsert(&second).await.unwrap();

        assert_eq!(repo.count().await.unwrap(), 1);
        assert_eq!(repo.get(id).await.unwrap().unwrap().quality, 2.0);
    }
}
