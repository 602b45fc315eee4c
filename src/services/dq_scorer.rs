//! Decision-Quality scoring and tier routing: weighted combination of
//! validity, specificity and historical correctness picks a model tier and,
//! for opus, a thinking-effort band.

use crate::domain::models::evolution_outcome::DqWeights;
use crate::domain::models::{ModelTier, ThinkingEffort};

/// A DQ score is actionable once it clears this threshold (the default
/// baseline value; callers read the live value from the applied baseline).
pub const DEFAULT_ACTIONABLE_THRESHOLD: f64 = 0.5;

/// How well `tier` fits a query of the given `complexity`.
///
/// Below the tier's ceiling: `1.0` minus a small over-provisioning penalty,
/// floored (opus floors at 0.6 for complexity < 0.5; sonnet floors at 0.7
/// for complexity < 0.2) so a capable-but-overkill tier is never scored as
/// badly as a tier that's actually too weak. Above the ceiling: linear
/// falloff, `max(0, 1 - 2·over)`.
pub fn validity(tier: ModelTier, complexity: f64) -> f64 {
    let cap = tier.max_complexity();
    if complexity <= cap {
        let headroom = cap - complexity;
        let penalty = headroom * 0.3;
        let score = (1.0 - penalty).clamp(0.0, 1.0);
        let floor = match tier {
            ModelTier::Opus if complexity < 0.5 => 0.6,
            ModelTier::Sonnet if complexity < 0.2 => 0.7,
            _ => 0.0,
        };
        score.max(floor)
    } else {
        let over = complexity - cap;
        (1.0 - 2.0 * over).max(0.0)
    }
}

/// The tier whose ceiling is the tightest fit for `complexity` — the
/// lowest-ranked tier whose ceiling still covers it.
fn ideal_tier(complexity: f64) -> ModelTier {
    ModelTier::ORDERED
        .into_iter()
        .find(|t| complexity <= t.max_complexity())
        .unwrap_or(ModelTier::Opus)
}

/// Distance from `tier` to the ideal tier on the ordered `[haiku, sonnet,
/// opus]` list: `0` steps away scores `1.0`, one step `0.6`, two steps `0.2`.
pub fn specificity(tier: ModelTier, complexity: f64) -> f64 {
    let distance = (tier.ordinal() as i32 - ideal_tier(complexity).ordinal() as i32).unsigned_abs();
    match distance {
        0 => 1.0,
        1 => 0.6,
        _ => 0.2,
    }
}

/// Historical success-rate correctness, or the neutral `0.5` fallback when
/// no history is available for this tier/task-type.
pub const fn correctness(historical_rate: Option<f64>) -> f64 {
    match historical_rate {
        Some(rate) => rate,
        None => 0.5,
    }
}

/// `w_v·validity + w_s·specificity + w_c·correctness`.
pub fn dq_score(weights: DqWeights, validity: f64, specificity: f64, correctness: f64) -> f64 {
    weights.validity * validity + weights.specificity * specificity + weights.correctness * correctness
}

pub fn is_actionable(score: f64, threshold: f64) -> bool {
    score >= threshold
}

/// A tier's scored candidacy for a query.
#[derive(Debug, Clone, Copy)]
pub struct TierScore {
    pub tier: ModelTier,
    pub validity: f64,
    pub specificity: f64,
    pub correctness: f64,
    pub dq_score: f64,
}

/// Score every candidate tier for a query of the given complexity.
pub fn score_tiers(
    complexity: f64,
    weights: DqWeights,
    historical_rate: impl Fn(ModelTier) -> Option<f64>,
) -> Vec<TierScore> {
    ModelTier::ORDERED
        .into_iter()
        .map(|tier| {
            let v = validity(tier, complexity);
            let s = specificity(tier, complexity);
            let c = correctness(historical_rate(tier));
            TierScore { tier, validity: v, specificity: s, correctness: c, dq_score: dq_score(weights, v, s, c) }
        })
        .collect()
}

/// The outcome of routing: chosen tier, its score, and (for opus) the
/// derived thinking-effort band.
#[derive(Debug, Clone, Copy)]
pub struct RoutingDecision {
    pub tier: ModelTier,
    pub score: TierScore,
    pub thinking_effort: Option<ThinkingEffort>,
}

/// Sort every candidate by `(-DQ, cost_rank)` and pick the top; derive a
/// thinking-effort tier if the winner is opus.
pub fn route(complexity: f64, weights: DqWeights, historical_rate: impl Fn(ModelTier) -> Option<f64>) -> RoutingDecision {
    let mut scores = score_tiers(complexity, weights, historical_rate);
    scores.sort_by(|a, b| {
        b.dq_score
            .partial_cmp(&a.dq_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.tier.cost_rank().cmp(&b.tier.cost_rank()))
    });
    let best = scores[0];
    let thinking_effort = if best.tier == ModelTier::Opus { ThinkingEffort::from_complexity(complexity) } else { None };
    RoutingDecision { tier: best.tier, score: best, thinking_effort }
}

/// `cost = input_tokens·input_rate/1e6 + output_tokens·output_rate/1e6`,
/// `input_tokens = max(100, len/4)`, `output_tokens = 500` by default.
pub fn estimate_cost(description: &str, input_rate_per_mtok: f64, output_rate_per_mtok: f64) -> f64 {
    let input_tokens = (description.len() / 4).max(100) as f64;
    let output_tokens = 500.0;
    input_tokens * input_rate_per_mtok / 1e6 + output_tokens * output_rate_per_mtok / 1e6
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_weights() -> DqWeights {
        DqWeights { validity: 0.35, specificity: 0.25, correctness: 0.40 }
    }

    #[test]
    fn simple_query_routes_to_haiku() {
        let decision = route(0.1, default_weights(), |_| None);
        assert_eq!(decision.tier, ModelTier::Haiku);
        assert!(decision.thinking_effort.is_none());
    }

    #[test]
    fn architecture_query_routes_to_opus_with_thinking_effort() {
        let decision = route(0.9, default_weights(), |_| None);
        assert_eq!(decision.tier, ModelTier::Opus);
        assert!(decision.thinking_effort.is_some());
    }

    #[test]
    fn validity_floors_opus_for_low_complexity() {
        assert_eq!(validity(ModelTier::Opus, 0.1), 0.6);
    }

    #[test]
    fn validity_falls_off_above_ceiling() {
        let v = validity(ModelTier::Haiku, 0.8);
        let expected = 1.0 - 2.0 * (0.8 - 0.3);
        assert!((v - expected.max(0.0)).abs() < 1e-9);
    }

    #[test]
    fn specificity_perfect_match_scores_one() {
        assert_eq!(specificity(ModelTier::Haiku, 0.1), 1.0);
    }

    #[test]
    fn specificity_two_steps_away_scores_low() {
        assert_eq!(specificity(ModelTier::Opus, 0.1), 0.2);
    }

    #[test]
    fn correctness_neutral_without_history() {
        assert_eq!(correctness(None), 0.5);
    }

    #[test]
    fn cost_estimate_uses_minimum_token_floor() {
        let cost = estimate_cost("hi", 3.0, 15.0);
        let expected = 100.0 * 3.0 / 1e6 + 500.0 * 15.0 / 1e6;
        assert!((cost - expected).abs() < 1e-9);
    }

    #[test]
    fn actionable_threshold_is_inclusive() {
        assert!(is_actionable(0.5, 0.5));
        assert!(!is_actionable(0.49, 0.5));
    }
}
