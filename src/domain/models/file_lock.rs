//! File locks held by agents over the conflict manager.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockType {
    Read,
    Write,
}

impl LockType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
        }
    }
}

/// A lock over a canonicalized path, owned exclusively by one agent.
///
/// Invariants enforced by [`crate::services::conflict_manager`]: no path
/// has simultaneous write locks by distinct agents; no path has a read and
/// a write lock held by distinct agents; multiple read locks on the same
/// path are permitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileLock {
    pub path: String,
    pub agent_id: String,
    pub lock_type: LockType,
    pub acquired_at: DateTime<Utc>,
}

impl FileLock {
    /// Locks older than this are swept on every conflict check.
    pub const STALE_AFTER_SECS: i64 = 600;

    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        (now - self.acquired_at).num_seconds() > Self::STALE_AFTER_SECS
    }

    /// Does `other`, a request for the same path by a different agent,
    /// conflict with this held lock?
    pub fn conflicts_with(&self, requester: &str, requested: LockType) -> bool {
        if self.agent_id == requester {
            return false;
        }
        match (self.lock_type, requested) {
            (_, LockType::Write) | (LockType::Write, _) => true,
            (LockType::Read, LockType::Read) => false,
        }
    }
}
