//! Database connection pool manager
//!
//! Manages a `SQLite` connection pool with WAL mode enabled for concurrent
//! readers alongside a single writer, matching the storage model used by
//! both logical data silos (coordinator state and agent-core state).

use anyhow::{Context, Result};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use std::str::FromStr;
use std::time::Duration;

/// Database connection pool with `SQLite` configuration tuned for a single
/// writer and many concurrent readers.
pub struct DatabaseConnection {
    pool: SqlitePool,
}

impl DatabaseConnection {
    /// Open a new connection pool against `database_url`.
    ///
    /// # Configuration
    /// - Journal mode: WAL
    /// - Synchronous: NORMAL
    /// - Foreign keys: enabled
    /// - Busy timeout: 5 seconds
    /// - Pool: 5-10 connections, 30s idle timeout, 30 minute max lifetime
    pub async fn new(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .context("invalid database URL")?
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5))
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .min_connections(5)
            .max_connections(10)
            .idle_timeout(Duration::from_secs(30))
            .max_lifetime(Duration::from_secs(1800))
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await
            .context("failed to create connection pool")?;

        Ok(Self { pool })
    }

    /// Apply all pending migrations from `./migrations`. Safe to call
    /// repeatedly; already-applied migrations are skipped.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("failed to run migrations")?;
        Ok(())
    }

    /// Borrow the underlying pool for repository adapters.
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the pool gracefully, waiting for in-flight connections.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn connection_pool_opens_against_memory_db() {
        let db = DatabaseConnection::new("sqlite::memory:")
            .await
            .expect("failed to create database connection");

        assert!(!db.pool().is_closed());
        db.close().await;
    }

    #[tokio::test]
    async fn migrations_create_core_tables() {
        let db = DatabaseConnection::new("sqlite::memory:")
            .await
            .expect("failed to create database connection");

        db.migrate().await.expect("failed to run migrations");

        let tables: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' AND name != '_sqlx_migrations' ORDER BY name",
        )
        .fetch_all(db.pool())
        .await
        .expect("failed to query tables");

        let names: Vec<String> = tables.into_iter().map(|t| t.0).collect();
        for expected in [
            "agent_registry",
            "trust_entries",
            "outcomes",
            "baselines",
            "file_locks",
            "evolution_outcomes",
            "sessions",
        ] {
            assert!(names.contains(&expected.to_string()), "missing table {expected}");
        }

        db.close().await;
    }

    #[tokio::test]
    async fn foreign_keys_are_enabled() {
        let db = DatabaseConnection::new("sqlite::memory:")
            .await
            .expect("failed to create database connection");

        let result: (i32,) = sqlx::query_as("PRAGMA foreign_keys")
            .fetch_one(db.pool())
            .await
            .expect("failed to check foreign_keys pragma");

        assert_eq!(result.0, 1, "foreign keys should be enabled");
        db.close().await;
    }
}
