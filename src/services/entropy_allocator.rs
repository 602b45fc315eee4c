//! Entropy-based resource allocation (complexity + failure rate + DQ
//! variance) with a budget-aware, entropy-descending allocation pass and
//! an opus → sonnet → haiku downgrade cascade on overrun.

use crate::domain::models::ModelTier;

/// Per-second cost of a tier in normalized units, used only by this
/// allocator's budget arithmetic — distinct from [`crate::domain::models::evolution_outcome::CostPerMtok`],
/// which prices actual token usage.
const fn model_cost_per_second(tier: ModelTier) -> f64 {
    match tier {
        ModelTier::Haiku => 0.1,
        ModelTier::Sonnet => 0.5,
        ModelTier::Opus => 2.0,
    }
}

/// Inputs needed to compute a task's entropy and allocate resources to it.
#[derive(Debug, Clone)]
pub struct TaskInfo {
    pub id: String,
    pub complexity: f64,
    pub historical_failure_rate: f64,
    pub dq_variance: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Allocation {
    pub tier: ModelTier,
    pub timeout_seconds: u64,
    pub agent_count: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaskAllocation {
    pub task_id: String,
    pub allocation: Allocation,
}

/// `0.4·complexity + 0.3·failure_rate + 0.3·dq_variance`.
pub fn entropy(task: &TaskInfo) -> f64 {
    0.4 * task.complexity + 0.3 * task.historical_failure_rate + 0.3 * task.dq_variance
}

/// Band the entropy score into a tier/timeout/agent-count allocation:
/// `> 0.7` → opus, 600s, 2 agents; `> 0.3` → sonnet, 300s, 1 agent;
/// otherwise haiku, 120s, 1 agent.
pub const fn allocate_for_entropy(entropy: f64) -> Allocation {
    if entropy > 0.7 {
        Allocation { tier: ModelTier::Opus, timeout_seconds: 600, agent_count: 2 }
    } else if entropy > 0.3 {
        Allocation { tier: ModelTier::Sonnet, timeout_seconds: 300, agent_count: 1 }
    } else {
        Allocation { tier: ModelTier::Haiku, timeout_seconds: 120, agent_count: 1 }
    }
}

fn cost(allocation: Allocation) -> f64 {
    model_cost_per_second(allocation.tier) * allocation.timeout_seconds as f64
}

fn downgrade(tier: ModelTier) -> Option<Allocation> {
    match tier {
        ModelTier::Opus => Some(Allocation { tier: ModelTier::Sonnet, timeout_seconds: 300, agent_count: 1 }),
        ModelTier::Sonnet => Some(Allocation { tier: ModelTier::Haiku, timeout_seconds: 120, agent_count: 1 }),
        ModelTier::Haiku => None,
    }
}

/// Allocate resources to `tasks` within `budget`, processing in
/// entropy-descending order (highest-entropy tasks get first claim on the
/// budget). On overrun, downgrade the task's tier one step at a time
/// before giving up on it. Once a task cannot afford even haiku, the pass
/// stops entirely — remaining, lower-priority tasks are not attempted,
/// matching the donor's break-not-continue behavior.
pub fn allocate(tasks: &[TaskInfo], budget: f64) -> Vec<TaskAllocation> {
    let mut ranked: Vec<(&TaskInfo, f64)> = tasks.iter().map(|t| (t, entropy(t))).collect();
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    let mut allocations = Vec::new();
    let mut spent = 0.0;

    for (task, task_entropy) in ranked {
        let mut allocation = allocate_for_entropy(task_entropy);
        loop {
            let candidate_cost = cost(allocation);
            if spent + candidate_cost <= budget {
                spent += candidate_cost;
                allocations.push(TaskAllocation { task_id: task.id.clone(), allocation });
                break;
            }
            match downgrade(allocation.tier) {
                Some(cheaper) => allocation = cheaper,
                None => return allocations,
            }
        }
    }

    allocations
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: &str, complexity: f64, failure_rate: f64, dq_variance: f64) -> TaskInfo {
        TaskInfo { id: id.to_string(), complexity, historical_failure_rate: failure_rate, dq_variance }
    }

    #[test]
    fn entropy_formula_weights_correctly() {
        let t = task("a", 1.0, 1.0, 1.0);
        assert!((entropy(&t) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn high_entropy_bands_to_opus() {
        let a = allocate_for_entropy(0.71);
        assert_eq!(a.tier, ModelTier::Opus);
        assert_eq!(a.timeout_seconds, 600);
        assert_eq!(a.agent_count, 2);
    }

    #[test]
    fn mid_entropy_bands_to_sonnet() {
        let a = allocate_for_entropy(0.31);
        assert_eq!(a.tier, ModelTier::Sonnet);
    }

    #[test]
    fn low_entropy_bands_to_haiku() {
        let a = allocate_for_entropy(0.3);
        assert_eq!(a.tier, ModelTier::Haiku);
    }

    #[test]
    fn allocates_highest_entropy_first() {
        let tasks = vec![task("low", 0.1, 0.0, 0.0), task("high", 0.9, 0.9, 0.9)];
        let result = allocate(&tasks, 10_000.0);
        assert_eq!(result[0].task_id, "high");
        assert_eq!(result[0].allocation.tier, ModelTier::Opus);
    }

    #[test]
    fn downgrades_opus_to_sonnet_on_overrun() {
        let tasks = vec![task("only", 0.9, 0.9, 0.9)];
        // opus costs 2.0*600 = 1200; budget only covers sonnet (0.5*300=150).
        let result = allocate(&tasks, 200.0);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].allocation.tier, ModelTier::Sonnet);
    }

    #[test]
    fn stops_entirely_once_even_haiku_does_not_fit() {
        let tasks = vec![task("a", 0.9, 0.9, 0.9), task("b", 0.1, 0.0, 0.0)];
        let result = allocate(&tasks, 1.0);
        assert!(result.is_empty());
    }

    #[test]
    fn budget_exactly_covering_cost_is_allowed() {
        let tasks = vec![task("a", 0.1, 0.0, 0.0)];
        let result = allocate(&tasks, 0.1 * 120.0);
        assert_eq!(result.len(), 1);
    }
}
