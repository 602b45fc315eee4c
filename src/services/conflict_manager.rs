//! Multi-reader/single-writer file-lock conflict manager: canonicalized
//! path locks, staleness sweeps, all-or-nothing batch acquisition, and
//! pre-flight parallel-group analysis over planned subtasks.

use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::error::CoordinatorError;
use crate::domain::models::file_lock::LockType;
use crate::domain::models::FileLock;
use crate::domain::ports::FileLockRepository;

pub struct ConflictManager {
    repo: Arc<dyn FileLockRepository>,
}

/// Resolve symlinks and relative components for stable path comparison.
/// Falls back to a lexical cleanup (no `..`/`.` components) when the path
/// doesn't exist on disk yet — locks are frequently requested for files an
/// agent is about to create.
pub fn canonicalize(path: &str) -> String {
    let p = Path::new(path);
    if let Ok(resolved) = std::fs::canonicalize(p) {
        return resolved.to_string_lossy().into_owned();
    }
    let mut out = PathBuf::new();
    for component in p.components() {
        match component {
            std::path::Component::ParentDir => {
                out.pop();
            }
            std::path::Component::CurDir => {}
            other => out.push(other.as_os_str()),
        }
    }
    out.to_string_lossy().into_owned()
}

impl ConflictManager {
    pub fn new(repo: Arc<dyn FileLockRepository>) -> Self {
        Self { repo }
    }

    async fn sweep_stale(&self) -> Result<(), CoordinatorError> {
        self.repo.purge_stale(Utc::now()).await?;
        Ok(())
    }

    /// Acquire a single lock for `agent_id` on `path`, sweeping stale locks
    /// first and rejecting on conflict.
    pub async fn acquire(&self, path: &str, agent_id: &str, lock_type: LockType) -> Result<(), CoordinatorError> {
        self.sweep_stale().await?;
        let canonical = canonicalize(path);
        let existing = self.repo.list_for_path(&canonical).await?;
        if let Some(holder) = existing.iter().find(|l| l.conflicts_with(agent_id, lock_type)) {
            return Err(CoordinatorError::LockConflict { path: canonical, holder: holder.agent_id.clone() });
        }
        self.repo
            .acquire(&FileLock { path: canonical, agent_id: agent_id.to_string(), lock_type, acquired_at: Utc::now() })
            .await
    }

    pub async fn release(&self, path: &str, agent_id: &str) -> Result<(), CoordinatorError> {
        self.repo.release(&canonicalize(path), agent_id).await
    }

    pub async fn release_all_for_agent(&self, agent_id: &str) -> Result<(), CoordinatorError> {
        self.repo.release_all_for_agent(agent_id).await
    }

    /// Batch acquire is all-or-nothing: on any conflict, no lock from this
    /// batch is held and any locks the caller already held for `agent_id`
    /// on these paths are released (rollback).
    pub async fn acquire_batch(
        &self,
        requests: &[(String, LockType)],
        agent_id: &str,
    ) -> Result<(), CoordinatorError> {
        self.sweep_stale().await?;

        let mut acquired: Vec<String> = Vec::new();
        for (path, lock_type) in requests {
            let canonical = canonicalize(path);
            let existing = self.repo.list_for_path(&canonical).await?;
            if let Some(holder) = existing.iter().find(|l| l.conflicts_with(agent_id, *lock_type)) {
                for done in &acquired {
                    let _ = self.repo.release(done, agent_id).await;
                }
                return Err(CoordinatorError::LockConflict { path: canonical, holder: holder.agent_id.clone() });
            }
            self.repo
                .acquire(&FileLock {
                    path: canonical.clone(),
                    agent_id: agent_id.to_string(),
                    lock_type: *lock_type,
                    acquired_at: Utc::now(),
                })
                .await?;
            acquired.push(canonical);
        }
        Ok(())
    }
}

/// A planned subtask's file-lock demands, as seen by pre-flight analysis.
#[derive(Debug, Clone)]
pub struct PlannedLock {
    pub subtask_id: Uuid,
    pub path: String,
    pub lock_type: LockType,
}

#[derive(Debug, Clone)]
pub struct ConflictPair {
    pub a: Uuid,
    pub b: Uuid,
    pub path: String,
}

#[derive(Debug, Clone)]
pub struct ConflictReport {
    pub has_conflicts: bool,
    pub can_parallelize: bool,
    pub conflicts: Vec<ConflictPair>,
    pub parallel_groups: Vec<Vec<Uuid>>,
}

/// Do two subtasks' lock demands conflict (same path, at least one write)?
fn subtasks_conflict(a: &[PlannedLock], b: &[PlannedLock]) -> Option<String> {
    for la in a {
        for lb in b {
            if la.path == lb.path && (la.lock_type == LockType::Write || lb.lock_type == LockType::Write) {
                return Some(la.path.clone());
            }
        }
    }
    None
}

/// Pre-flight `detect_potential_conflicts`: groups planned subtasks into
/// maximal parallelizable sets using a conflict-pair graph and greedy
/// first-fit assignment.
pub fn detect_potential_conflicts(locks_by_subtask: &HashMap<Uuid, Vec<PlannedLock>>) -> ConflictReport {
    let ids: Vec<Uuid> = locks_by_subtask.keys().copied().collect();
    let mut conflicts = Vec::new();

    for i in 0..ids.len() {
        for j in (i + 1)..ids.len() {
            let a = &locks_by_subtask[&ids[i]];
            let b = &locks_by_subtask[&ids[j]];
            if let Some(path) = subtasks_conflict(a, b) {
                conflicts.push(ConflictPair { a: ids[i], b: ids[j], path });
            }
        }
    }

    let conflict_set: HashSet<(Uuid, Uuid)> = conflicts
        .iter()
        .flat_map(|c| [(c.a, c.b), (c.b, c.a)])
        .collect();

    let mut groups: Vec<Vec<Uuid>> = Vec::new();
    for &id in &ids {
        let mut placed = false;
        for group in &mut groups {
            if group.iter().all(|&g| !conflict_set.contains(&(id, g))) {
                group.push(id);
                placed = true;
                break;
            }
        }
        if !placed {
            groups.push(vec![id]);
        }
    }

    let can_parallelize = groups.iter().any(|g| g.len() >= 2);

    ConflictReport { has_conflicts: !conflicts.is_empty(), can_parallelize, conflicts, parallel_groups: groups }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::database::{connection::DatabaseConnection, FileLockRepositoryImpl};

    async fn manager() -> (DatabaseConnection, ConflictManager) {
        let db = DatabaseConnection::new("sqlite::memory:").await.unwrap();
        db.migrate().await.unwrap();
        let repo = Arc::new(FileLockRepositoryImpl::new(db.pool().clone()));
        (db, ConflictManager::new(repo))
    }

    #[tokio::test]
    async fn write_then_write_conflicts() {
        let (_db, mgr) = manager().await;
        mgr.acquire("/tmp/f.rs", "a1", LockType::Write).await.unwrap();
        let err = mgr.acquire("/tmp/f.rs", "a2", LockType::Write).await.unwrap_err();
        assert!(matches!(err, CoordinatorError::LockConflict { .. }));
    }

    #[tokio::test]
    async fn two_readers_coexist() {
        let (_db, mgr) = manager().await;
        mgr.acquire("/tmp/f.rs", "a1", LockType::Read).await.unwrap();
        mgr.acquire("/tmp/f.rs", "a2", LockType::Read).await.unwrap();
    }

    #[tokio::test]
    async fn acquire_then_release_leaves_no_lock() {
        let (_db, mgr) = manager().await;
        mgr.acquire("/tmp/f.rs", "a1", LockType::Write).await.unwrap();
        mgr.release("/tmp/f.rs", "a1").await.unwrap();
        mgr.acquire("/tmp/f.rs", "a2", LockType::Write).await.unwrap();
    }

    #[tokio::test]
    async fn batch_acquire_rolls_back_on_any_conflict() {
        let (_db, mgr) = manager().await;
        mgr.acquire("/tmp/taken.rs", "other", LockType::Write).await.unwrap();
        let err = mgr
            .acquire_batch(
                &[("/tmp/free.rs".into(), LockType::Write), ("/tmp/taken.rs".into(), LockType::Write)],
                "a1",
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CoordinatorError::LockConflict { .. }));
        // The free.rs lock from this batch must have been rolled back.
        mgr.acquire("/tmp/free.rs", "a2", LockType::Write).await.unwrap();
    }

    fn plan(subtask: Uuid, path: &str, lock_type: LockType) -> PlannedLock {
        PlannedLock { subtask_id: subtask, path: path.into(), lock_type }
    }

    #[test]
    fn detects_writer_vs_reader_conflict_and_splits_groups() {
        let f = "/tmp/shared.rs";
        let t1 = Uuid::new_v4();
        let t2 = Uuid::new_v4();
        let t3 = Uuid::new_v4();
        let mut locks = HashMap::new();
        locks.insert(t1, vec![plan(t1, f, LockType::Read)]);
        locks.insert(t2, vec![plan(t2, f, LockType::Read)]);
        locks.insert(t3, vec![plan(t3, f, LockType::Write)]);

        let report = detect_potential_conflicts(&locks);
        assert!(report.has_conflicts);
        // The writer must land in a different group than at least one reader.
        let writer_group = report.parallel_groups.iter().find(|g| g.contains(&t3)).unwrap();
        assert!(!(writer_group.contains(&t1) && writer_group.contains(&t2)));
    }

    #[test]
    fn no_shared_paths_means_fully_parallelizable() {
        let t1 = Uuid::new_v4();
        let t2 = Uuid::new_v4();
        let mut locks = HashMap::new();
        locks.insert(t1, vec![plan(t1, "/tmp/a.rs", LockType::Write)]);
        locks.insert(t2, vec![plan(t2, "/tmp/b.rs", LockType::Write)]);

        let report = detect_potential_conflicts(&locks);
        assert!(!report.has_conflicts);
        assert!(report.can_parallelize);
        assert_eq!(report.parallel_groups.len(), 1);
    }
}
