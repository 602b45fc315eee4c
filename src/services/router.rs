//! Agent-level routing: matches a subtask to an agent via capability ×
//! trust × cost, with a complexity-based direct-execution bypass.

use chrono::Utc;
use serde_json::json;

use crate::domain::models::agent_capability::normalize_keywords;
use crate::domain::models::{AgentCapability, Assignment, FallbackCandidate, SubTask, DIRECT_EXECUTION};

/// Below this complexity, delegation is bypassed entirely (strictly
/// less-than — the distilled spec's two candidate thresholds are resolved
/// in favor of this one, matching the router's own documented semantics).
pub const COMPLEXITY_BYPASS_THRESHOLD: f64 = 0.2;

fn capability_match(subtask: &SubTask, agent: &AgentCapability) -> f64 {
    let subtask_keywords = normalize_keywords(subtask.description.split_whitespace());
    let agent_keywords = agent.normalized_keywords();
    if subtask_keywords.is_empty() || agent_keywords.is_empty() {
        return 0.0;
    }
    let intersection = subtask_keywords.intersection(&agent_keywords).count();
    let denom = subtask_keywords.len().max(agent_keywords.len());
    intersection as f64 / denom as f64
}

fn cost_efficiency(subtask: &SubTask, agent: &AgentCapability) -> f64 {
    1.0 - (subtask.estimated_cost - agent.estimated_cost).abs()
}

struct Candidate {
    agent_id: String,
    trust_score: f64,
    capability_match: f64,
    final_score: f64,
}

fn direct_execution(subtask: &SubTask, reasoning: &str) -> Assignment {
    Assignment {
        subtask_id: subtask.id,
        agent_id: DIRECT_EXECUTION.to_string(),
        trust_score: 1.0,
        capability_match: 1.0,
        timestamp: Utc::now(),
        reasoning: reasoning.to_string(),
        metadata: json!({ "direct_execution": true }),
        fallback_chain: Vec::new(),
    }
}

/// Route a subtask to an agent. `trust_scores` should already reflect any
/// time-decay the trust ledger applies; agents with no entry default to
/// `0.5` per the trust ledger's own default.
pub fn route(subtask: &SubTask, agents: &[AgentCapability], trust_scores: impl Fn(&str) -> f64) -> Assignment {
    if subtask.profile.complexity < COMPLEXITY_BYPASS_THRESHOLD {
        return direct_execution(subtask, "complexity below delegation threshold; executing directly");
    }

    if agents.is_empty() {
        return direct_execution(subtask, "no candidate agents available; executing directly");
    }

    let mut candidates: Vec<Candidate> = agents
        .iter()
        .map(|agent| {
            let cm = capability_match(subtask, agent);
            let trust = trust_scores(&agent.agent_id);
            let ce = cost_efficiency(subtask, agent);
            let final_score = 0.6 * cm + 0.3 * trust + 0.1 * ce;
            Candidate { agent_id: agent.agent_id.clone(), trust_score: trust, capability_match: cm, final_score }
        })
        .collect();

    candidates.sort_by(|a, b| b.final_score.partial_cmp(&a.final_score).unwrap_or(std::cmp::Ordering::Equal));

    let winner = &candidates[0];
    let fallback_chain = candidates
        .iter()
        .skip(1)
        .take(3)
        .map(|c| FallbackCandidate { agent_id: c.agent_id.clone(), final_score: c.final_score })
        .collect();

    Assignment {
        subtask_id: subtask.id,
        agent_id: winner.agent_id.clone(),
        trust_score: winner.trust_score,
        capability_match: winner.capability_match,
        timestamp: Utc::now(),
        reasoning: format!(
            "selected by weighted score (capability={:.2}, trust={:.2}, final={:.2})",
            winner.capability_match, winner.trust_score, winner.final_score
        ),
        metadata: json!({}),
        fallback_chain,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{TaskProfile, VerificationMethod};
    use std::collections::BTreeSet;
    use uuid::Uuid;

    fn subtask(complexity: f64, description: &str) -> SubTask {
        SubTask {
            id: Uuid::new_v4(),
            description: description.to_string(),
            verification_method: VerificationMethod::AutomatedTest,
            estimated_cost: 0.5,
            estimated_duration: 0.5,
            parallel_safe: true,
            parent_id: None,
            dependencies: vec![],
            profile: TaskProfile::new(complexity, 0.5, 0.5, 0.5, 0.5, 0.5, 0.5, 0.5, 0.5, 0.5, 0.5).unwrap(),
            metadata: serde_json::Value::Null,
        }
    }

    fn agent(id: &str, keywords: &[&str], cost: f64) -> AgentCapability {
        AgentCapability {
            agent_id: id.to_string(),
            name: id.to_string(),
            description: String::new(),
            keywords: keywords.iter().map(|s| s.to_string()).collect::<BTreeSet<_>>(),
            estimated_cost: cost,
        }
    }

    #[test]
    fn low_complexity_bypasses_delegation() {
        let t = subtask(0.1, "implement routing logic");
        let assignment = route(&t, &[agent("a1", &["routing"], 0.5)], |_| 0.5);
        assert_eq!(assignment.agent_id, DIRECT_EXECUTION);
    }

    #[test]
    fn no_agents_falls_back_to_direct_execution() {
        let t = subtask(0.7, "implement routing logic");
        let assignment = route(&t, &[], |_| 0.5);
        assert_eq!(assignment.agent_id, DIRECT_EXECUTION);
    }

    #[test]
    fn best_matching_agent_wins() {
        let t = subtask(0.7, "implement routing logic for coordinator");
        let agents = vec![agent("weak", &["database", "schema"], 0.5), agent("strong", &["routing", "coordinator"], 0.5)];
        let assignment = route(&t, &agents, |_| 0.5);
        assert_eq!(assignment.agent_id, "strong");
    }

    #[test]
    fn fallback_chain_has_up_to_three_runners_up() {
        let t = subtask(0.7, "implement routing logic for coordinator agent system");
        let agents = vec![
            agent("a1", &["routing"], 0.5),
            agent("a2", &["coordinator"], 0.5),
            agent("a3", &["agent"], 0.5),
            agent("a4", &["system"], 0.5),
            agent("a5", &["routing", "coordinator"], 0.5),
        ];
        let assignment = route(&t, &agents, |_| 0.5);
        assert!(assignment.fallback_chain.len() <= 3);
    }
}
