//! An agent's advertised capability, used by the router's keyword matcher.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Reserved agent id used when the router bypasses delegation entirely
/// (low-complexity subtasks, or no candidate agents).
pub const DIRECT_EXECUTION: &str = "DIRECT_EXECUTION";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentCapability {
    pub agent_id: String,
    pub name: String,
    pub description: String,
    pub keywords: BTreeSet<String>,
    pub estimated_cost: f64,
}

impl AgentCapability {
    /// Lower-cased, length-≥4, stop-word-filtered keyword set used for
    /// capability matching.
    pub fn normalized_keywords(&self) -> BTreeSet<String> {
        normalize_keywords(self.keywords.iter().map(String::as_str))
    }
}

const STOP_WORDS: &[&str] = &[
    "that", "this", "with", "from", "into", "your", "their", "about", "which", "there",
];

/// Shared keyword normalization used by both subtask descriptions and agent
/// capability keyword sets, so `capability_match` compares like with like.
pub fn normalize_keywords<'a>(tokens: impl Iterator<Item = &'a str>) -> BTreeSet<String> {
    tokens
        .map(str::to_lowercase)
        .filter(|t| t.len() >= 4 && !STOP_WORDS.contains(&t.as_str()))
        .collect()
}
