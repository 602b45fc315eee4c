//! `SQLite`-backed [`FileLockRepository`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

use super::utils::parse_datetime;
use crate::domain::error::CoordinatorError;
use crate::domain::models::{FileLock, LockType};
use crate::domain::ports::FileLockRepository;

pub struct FileLockRepositoryImpl {
    pool: SqlitePool,
}

impl FileLockRepositoryImpl {
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn storage_err(e: impl std::fmt::Display) -> CoordinatorError {
    CoordinatorError::Storage(e.to_string())
}

fn lock_type_str(t: LockType) -> &'static str {
    t.as_str()
}

fn parse_lock_type(s: &str) -> Result<LockType, CoordinatorError> {
    match s {
        "read" => Ok(LockType::Read),
        "write" => Ok(LockType::Write),
        other => Err(CoordinatorError::Storage(format!("unknown lock type: {other}"))),
    }
}

fn row_to_lock(row: sqlx::sqlite::SqliteRow) -> Result<FileLock, CoordinatorError> {
    let lock_type: String = row.get("lock_type");
    let acquired_at: String = row.get("acquired_at");
    Ok(FileLock {
        path: row.get("path"),
        agent_id: row.get("agent_id"),
        lock_type: parse_lock_type(&lock_type)?,
        acquired_at: parse_datetime(&acquired_at).map_err(storage_err)?,
    })
}

#[async_trait]
impl FileLockRepository for FileLockRepositoryImpl {
    async fn acquire(&self, lock: &FileLock) -> Result<(), CoordinatorError> {
        sqlx::query(
            r"
            INSERT INTO file_locks (path, agent_id, lock_type, acquired_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(path, agent_id) DO UPDATE SET lock_type = excluded.lock_type, acquired_at = excluded.acquired_at
            ",
        )
        .bind(&lock.path)
        .bind(&lock.agent_id)
        .bind(lock_type_str(lock.lock_type))
        .bind(lock.acquired_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(())
    }

    async fn release(&self, path: &str, agent_id: &str) -> Result<(), CoordinatorError> {
        sqlx::query("DELETE FROM file_locks WHERE path = ? AND agent_id = ?")
            .bind(path)
            .bind(agent_id)
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    async fn release_all_for_agent(&self, agent_id: &str) -> Result<(), CoordinatorError> {
        sqlx::query("DELETE FROM file_locks WHERE agent_id = ?")
            .bind(agent_id)
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    async fn list_for_path(&self, path: &str) -> Result<Vec<FileLock>, CoordinatorError> {
        let rows = sqlx::query("SELECT path, agent_id, lock_type, acquired_at FROM file_locks WHERE path = ?")
            .bind(path)
            .fetch_all(&self.pool)
            .await
            .map_err(storage_err)?;
        rows.into_iter().map(row_to_lock).collect()
    }

    async fn list_all(&self) -> Result<Vec<FileLock>, CoordinatorError> {
        let rows = sqlx::query("SELECT path, agent_id, lock_type, acquired_at FROM file_locks")
            .fetch_all(&self.pool)
            .await
            .map_err(storage_err)?;
        rows.into_iter().map(row_to_lock).collect()
    }

    async fn purge_stale(&self, now: DateTime<Utc>) -> Result<u64, CoordinatorError> {
        let cutoff = (now - chrono::Duration::seconds(FileLock::STALE_AFTER_SECS)).to_rfc3339();
        let result = sqlx::query("DELETE FROM file_locks WHERE acquired_at < ?")
            .bind(cutoff)
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

    async fn repo() -> (DatabaseConnection, FileLockRepositoryImpl) {
        let db = DatabaseConnection::new("sqlite::memory:").await.unwrap();
        db.migrate().await.unwrap();
        let pool = db.pool().clone();
        (db, FileLockRepositoryImpl::new(pool))
    }

    fn lock(path: &str, agent: &str, ty: LockType) -> FileLock {
        FileLock { path: path.into(), agent_id: agent.into(), lock_type: ty, acquired_at: Utc::now() }
    }

    #[tokio::test]
    async fn acquire_then_release_leaves_no_lock() {
        let (_db, repo) = repo().await;
        let l = lock("/a.rs", "agent-1", LockType::Write);
        repo.acquire(&l).await.unwrap();
        assert_eq!(repo.list_for_path("/a.rs").await.unwrap().len(), 1);
        repo.release("/a.rs", "agent-1").await.unwrap();
        assert!(repo.list_for_path("/a.rs").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn purge_stale_removes_old_locks_only() {
        let (_db, repo) = repo().await;
        let mut old = lock("/a.rs", "agent-1", LockType::Read);
        old.acquired_at = Utc::now() - chrono::Duration::seconds(700);
        repo.acquire(&old).await.unwrap();
        let fresh = lock("/b.rs", "agent-2", LockType::Read);
        repo.acquire(&fresh).await.unwrap();

        let purged = repo.purge_stale(Utc::now()).await.unwrap();
        assert_eq!(purged, 1);
        assert!(repo.list_for_path("/a.rs").await.unwrap().is_empty());
        assert_eq!(repo.list_for_path("/b.rs").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn multiple_readers_coexist() {
        let (_db, repo) = repo().await;
        repo.acquire(&lock("/a.rs", "agent-1", LockType::Read)).await.unwrap();
        repo.acquire(&lock("/a.rs", "agent-2", LockType::Read)).await.unwrap();
        assert_eq!(repo.list_for_path("/a.rs").await.unwrap().len(), 2);
    }
}
