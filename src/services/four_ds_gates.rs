//! The 4Ds safety gates: delegate, description, discernment, diligence.
//! Each is a pure decision function; the caller is responsible for emitting
//! the corresponding best-effort [`EventSink`] event.

use crate::domain::models::TaskProfile;

/// **Delegation gate.** Blocks delegation outright for subjective,
/// critical, irreversible work, or for critical work that isn't verifiable
/// or reversible enough to risk delegating.
pub fn delegation_gate(profile: &TaskProfile) -> bool {
    let blocked_by_subjectivity =
        profile.subjectivity > 0.7 && profile.criticality > 0.8 && profile.reversibility < 0.2;
    let blocked_by_criticality =
        profile.criticality >= 0.8 && (profile.verifiability < 0.3 || profile.reversibility < 0.3);
    !(blocked_by_subjectivity || blocked_by_criticality)
}

const VAGUE_WORDS: &[&str] = &["something", "somehow", "stuff", "things", "maybe", "whatever"];
const ACTION_VERBS: &[&str] = &["implement", "build", "fix", "add", "remove", "refactor", "create", "write"];
const CRITERIA_WORDS: &[&str] = &["criteria", "metric", "threshold", "must", "should", "requirement"];

/// **Description gate.** Weighted combination of specificity (vague-word
/// penalty, action-verb bonus), completeness (word-count band), and
/// constraint clarity (criteria/metric-word presence).
pub fn description_gate(description: &str) -> f64 {
    let lower = description.to_lowercase();
    let words: Vec<&str> = lower.split_whitespace().collect();

    let mut specificity = 0.5;
    if VAGUE_WORDS.iter().any(|w| lower.contains(w)) {
        specificity -= 0.3;
    }
    if ACTION_VERBS.iter().any(|w| lower.contains(w)) {
        specificity += 0.3;
    }
    let specificity = specificity.clamp(0.0, 1.0);

    let completeness = match words.len() {
        0..=3 => 0.2,
        4..=8 => 0.5,
        9..=30 => 0.9,
        _ => 0.7,
    };

    let constraint_clarity = if CRITERIA_WORDS.iter().any(|w| lower.contains(w)) { 0.9 } else { 0.3 };

    (0.4 * specificity + 0.3 * completeness + 0.3 * constraint_clarity).clamp(0.0, 1.0)
}

const ERROR_INDICATORS: &[&str] = &["error", "exception", "traceback", "failed", "panic", "undefined"];

/// **Discernment gate.** Combines keyword-overlap completeness against
/// `expected`, error-indicator correctness on `output`, and length-ratio
/// consistency. Returns `(score, flagged_for_review)`.
pub fn discernment_gate(output: &str, expected: &str, _profile: &TaskProfile) -> (f64, bool) {
    let output_words: std::collections::HashSet<&str> = output.split_whitespace().collect();
    let expected_words: std::collections::HashSet<&str> = expected.split_whitespace().collect();

    let completeness = if expected_words.is_empty() {
        1.0
    } else {
        output_words.intersection(&expected_words).count() as f64 / expected_words.len() as f64
    };

    let lower_output = output.to_lowercase();
    let correctness = if ERROR_INDICATORS.iter().any(|w| lower_output.contains(w)) { 0.2 } else { 1.0 };

    let ratio = if expected.is_empty() {
        1.0
    } else {
        (output.len() as f64 / expected.len() as f64).min(expected.len() as f64 / output.len().max(1) as f64)
    };
    let consistency = ratio.clamp(0.0, 1.0);

    let score = (0.4 * completeness + 0.3 * correctness + 0.3 * consistency).clamp(0.0, 1.0);
    (score, score < 0.7)
}

const SENSITIVE_KEYWORDS: &[&str] = &["password", "secret", "api key", "token", "credential", "private key"];
const DESTRUCTIVE_KEYWORDS: &[&str] = &["delete", "drop table", "rm -rf", "truncate", "force push", "wipe"];
const PRODUCTION_KEYWORDS: &[&str] = &["production", "prod deploy", "live system"];

/// Whether output/content is safe to proceed with, per keyword detection
/// combined with reversibility/verifiability.
pub fn diligence_gate(content: &str, profile: &TaskProfile) -> bool {
    let lower = content.to_lowercase();
    let sensitive = SENSITIVE_KEYWORDS.iter().any(|w| lower.contains(w));
    let destructive = DESTRUCTIVE_KEYWORDS.iter().any(|w| lower.contains(w));
    let production = PRODUCTION_KEYWORDS.iter().any(|w| lower.contains(w));
    let _ = production;

    let unsafe_combo =
        (sensitive && destructive && profile.reversibility < 0.2) || (destructive && profile.reversibility < 0.15);

    !unsafe_combo
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(criticality: f64, verifiability: f64, reversibility: f64, subjectivity: f64) -> TaskProfile {
        TaskProfile::new(0.5, criticality, 0.5, 0.5, 0.5, 0.5, 0.5, verifiability, reversibility, 0.5, subjectivity)
            .unwrap()
    }

    #[test]
    fn delegation_blocked_for_subjective_critical_irreversible() {
        assert!(!delegation_gate(&profile(0.9, 0.8, 0.1, 0.9)));
    }

    #[test]
    fn delegation_blocked_for_critical_unverifiable() {
        assert!(!delegation_gate(&profile(0.9, 0.1, 0.9, 0.1)));
    }

    #[test]
    fn delegation_allowed_for_routine_work() {
        assert!(delegation_gate(&profile(0.3, 0.8, 0.8, 0.3)));
    }

    #[test]
    fn description_gate_rewards_specific_actionable_text() {
        let vague = description_gate("do something with stuff maybe");
        let specific =
            description_gate("implement the rate limiter with a 100 req/s threshold and a clear success metric");
        assert!(specific > vague);
    }

    #[test]
    fn discernment_flags_low_overlap_for_review() {
        let (score, flagged) = discernment_gate("unrelated text entirely", "expected specific output tokens", &profile(0.5, 0.5, 0.5, 0.5));
        assert!(flagged, "score was {score}");
    }

    #[test]
    fn discernment_detects_error_indicators() {
        let (score, _) = discernment_gate("Traceback: NullPointerException", "normal output", &profile(0.5, 0.5, 0.5, 0.5));
        assert!(score < 0.7);
    }

    #[test]
    fn diligence_unsafe_for_destructive_and_sensitive_low_reversibility() {
        assert!(!diligence_gate("delete the password file", &profile(0.5, 0.5, 0.1, 0.5)));
    }

    #[test]
    fn diligence_unsafe_for_destructive_alone_at_very_low_reversibility() {
        assert!(!diligence_gate("rm -rf /data", &profile(0.5, 0.5, 0.1, 0.5)));
    }

    #[test]
    fn diligence_safe_for_destructive_with_adequate_reversibility() {
        assert!(diligence_gate("delete the staging branch", &profile(0.5, 0.5, 0.5, 0.5)));
    }
}
