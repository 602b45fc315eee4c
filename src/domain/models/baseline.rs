//! Versioned routing parameters the optimizer tunes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single applied version of the tunable parameter set. New versions
/// never overwrite a prior one — [`crate::services::optimizer`] appends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    pub version: u32,
    pub parameters: BTreeMap<String, f64>,
    pub evidence_count: u64,
    pub confidence: f64,
    pub lineage: Option<u32>,
    pub applied_at: DateTime<Utc>,
}

impl Baseline {
    pub fn initial(parameters: BTreeMap<String, f64>, now: DateTime<Utc>) -> Self {
        Self {
            version: 1,
            parameters,
            evidence_count: 0,
            confidence: 0.0,
            lineage: None,
            applied_at: now,
        }
    }

    /// Produce the next version, bumping the version number and recording
    /// this baseline as its lineage.
    pub fn next(&self, parameters: BTreeMap<String, f64>, evidence_count: u64, confidence: f64, now: DateTime<Utc>) -> Self {
        Self {
            version: self.version + 1,
            parameters,
            evidence_count,
            confidence,
            lineage: Some(self.version),
            applied_at: now,
        }
    }
}
