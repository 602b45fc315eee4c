//! `SQLite`-backed [`BaselineRepository`].
//!
//! Baselines are append-only: §8 invariant 8 requires `rollback` to restore
//! a prior version's parameter map byte-for-byte, which only holds if no
//! version is ever overwritten in place.

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use std::collections::BTreeMap;

use super::utils::parse_datetime;
use crate::domain::error::CoordinatorError;
use crate::domain::models::Baseline;
use crate::domain::ports::BaselineRepository;

pub struct BaselineRepositoryImpl {
    pool: SqlitePool,
}

impl BaselineRepositoryImpl {
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn storage_err(e: impl std::fmt::Display) -> CoordinatorError {
    CoordinatorError::Storage(e.to_string())
}

fn row_to_baseline(row: sqlx::sqlite::SqliteRow) -> Result<Baseline, CoordinatorError> {
    let parameters: String = row.get("parameters");
    let applied_at: String = row.get("applied_at");
    let version: i64 = row.get("version");
    let evidence_count: i64 = row.get("evidence_count");
    let lineage: Option<i64> = row.get("lineage");
    let parameters: BTreeMap<String, f64> = serde_json::from_str(&parameters).map_err(storage_err)?;

    Ok(Baseline {
        version: u32::try_from(version).map_err(storage_err)?,
        parameters,
        evidence_count: u64::try_from(evidence_count).unwrap_or(0),
        confidence: row.get("confidence"),
        lineage: lineage.map(|l| u32::try_from(l).unwrap_or(0)),
        applied_at: parse_datetime(&applied_at).map_err(storage_err)?,
    })
}

const SELECT_COLUMNS: &str = "version, parameters, evidence_count, confidence, lineage, applied_at";

#[async_trait]
impl BaselineRepository for BaselineRepositoryImpl {
    async fn insert(&self, baseline: &Baseline) -> Result<(), CoordinatorError> {
        let parameters = serde_json::to_string(&baseline.parameters).map_err(storage_err)?;
        sqlx::query(
            "INSERT INTO baselines (version, parameters, evidence_count, confidence, lineage, applied_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(i64::from(baseline.version))
        .bind(parameters)
        .bind(i64::try_from(baseline.evidence_count).unwrap_or(i64::MAX))
        .bind(baseline.confidence)
        .bind(baseline.lineage.map(i64::from))
        .bind(baseline.applied_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(())
    }

    async fn latest(&self) -> Result<Option<Baseline>, CoordinatorError> {
        let row = sqlx::query(&format!("SELECT {SELECT_COLUMNS} FROM baselines ORDER BY version DESC LIMIT 1"))
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err)?;
        row.map(row_to_baseline).transpose()
    }

    async fn get_version(&self, version: u32) -> Result<Option<Baseline>, CoordinatorError> {
        let row = sqlx::query(&format!("SELECT {SELECT_COLUMNS} FROM baselines WHERE version = ?"))
            .bind(i64::from(version))
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err)?;
        row.map(row_to_baseline).transpose()
    }

    async fn list_all(&self) -> Result<Vec<Baseline>, CoordinatorError> {
        let rows = sqlx::query(&format!("SELECT {SELECT_COLUMNS} FROM baselines ORDER BY version ASC"))
            .fetch_all(&self.pool)
            .await
            .map_err(storage_err)?;
        rows.into_iter().map(row_to_baseline).collect()
    }
}
