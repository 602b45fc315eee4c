//! `SQLite`-backed [`SessionRepository`].

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::utils::parse_datetime;
use crate::domain::error::CoordinatorError;
use crate::domain::models::{Session, SessionStatus};
use crate::domain::ports::SessionRepository;

pub struct SessionRepositoryImpl {
    pool: SqlitePool,
}

impl SessionRepositoryImpl {
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn status_str(status: SessionStatus) -> &'static str {
    match status {
        SessionStatus::Success => "success",
        SessionStatus::Partial => "partial",
        SessionStatus::Failed => "failed",
        SessionStatus::Cancelled => "cancelled",
    }
}

fn parse_status(s: &str) -> Result<SessionStatus, CoordinatorError> {
    match s {
        "success" => Ok(SessionStatus::Success),
        "partial" => Ok(SessionStatus::Partial),
        "failed" => Ok(SessionStatus::Failed),
        "cancelled" => Ok(SessionStatus::Cancelled),
        other => Err(CoordinatorError::Storage(format!("unknown session status: {other}"))),
    }
}

fn row_to_session(
    session_id: String,
    task: String,
    strategy: String,
    status: String,
    output: String,
    errors: String,
    total_cost: f64,
    created_at: String,
    completed_at: Option<String>,
) -> Result<Session, CoordinatorError> {
    Ok(Session {
        session_id: Uuid::parse_str(&session_id)
            .map_err(|e| CoordinatorError::Storage(e.to_string()))?,
        task,
        strategy,
        status: parse_status(&status)?,
        output,
        errors: serde_json::from_str(&errors).map_err(|e| CoordinatorError::Storage(e.to_string()))?,
        total_cost,
        created_at: parse_datetime(&created_at).map_err(|e| CoordinatorError::Storage(e.to_string()))?,
        completed_at: completed_at
            .map(|c| parse_datetime(&c).map_err(|e| CoordinatorError::Storage(e.to_string())))
            .transpose()?,
    })
}

#[async_trait]
impl SessionRepository for SessionRepositoryImpl {
    async fn insert(&self, session: &Session) -> Result<(), CoordinatorError> {
        self.update(session).await
    }

    /// Sessions are upserted, never duplicated — §8 invariant 7.
    async fn update(&self, session: &Session) -> Result<(), CoordinatorError> {
        let errors = serde_json::to_string(&session.errors)
            .map_err(|e| CoordinatorError::Storage(e.to_string()))?;
        sqlx::query(
            r"
            INSERT INTO sessions (session_id, task, strategy, status, output, errors, total_cost, created_at, completed_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(session_id) DO UPDATE SET
                task = excluded.task,
                strategy = excluded.strategy,
                status = excluded.status,
                output = excluded.output,
                errors = excluded.errors,
                total_cost = excluded.total_cost,
                completed_at = excluded.completed_at
            ",
        )
        .bind(session.session_id.to_string())
        .bind(&session.task)
        .bind(&session.strategy)
        .bind(status_str(session.status))
        .bind(&session.output)
        .bind(errors)
        .bind(session.total_cost)
        .bind(session.created_at.to_rfc3339())
        .bind(session.completed_at.map(|c| c.to_rfc3339()))
        .execute(&self.pool)
        .await
        .map_err(|e| CoordinatorError::Storage(e.to_string()))?;

        Ok(())
    }

    async fn get(&self, session_id: Uuid) -> Result<Option<Session>, CoordinatorError> {
        let row = sqlx::query(
            "SELECT session_id, task, strategy, status, output, errors, total_cost, created_at, completed_at FROM sessions WHERE session_id = ?",
        )
        .bind(session_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| CoordinatorError::Storage(e.to_string()))?;

        row.map(|r| {
            row_to_session(
                r.get("session_id"),
                r.get("task"),
                r.get("strategy"),
                r.get("status"),
                r.get("output"),
                r.get("errors"),
                r.get("total_cost"),
                r.get("created_at"),
                r.get("completed_at"),
            )
        })
        .transpose()
    }

    async fn list_recent(&self, limit: u32) -> Result<Vec<Session>, CoordinatorError> {
        let rows = sqlx::query(
            "SELECT session_id, task, strategy, status, output, errors, total_cost, created_at, completed_at FROM sessions ORDER BY created_at DESC LIMIT ?",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| CoordinatorError::Storage(e.to_string()))?;

        rows.into_iter()
            .map(|r| {
                row_to_session(
                    r.get("session_id"),
                    r.get("task"),
                    r.get("strategy"),
                    r.get("status"),
                    r.get("output"),
                    r.get("errors"),
                    r.get("total_cost"),
                    r.get("created_at"),
                    r.get("completed_at"),
                )
            })
            .collect()
    }
}
