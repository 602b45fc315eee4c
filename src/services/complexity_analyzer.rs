//! Query-text complexity scoring: a bounded sum of token-length band plus
//! keyword-category bands, used by [`crate::services::dq_scorer`] to pick a
//! model tier.

/// 4-char approximation of token count (matches the donor heuristic).
fn approx_tokens(text: &str) -> usize {
    (text.len() / 4).max(1)
}

fn token_band(tokens: usize) -> f64 {
    match tokens {
        0..=20 => 0.10,
        21..=100 => 0.30,
        101..=500 => 0.60,
        _ => 0.90,
    }
}

struct Category {
    keywords: &'static [&'static str],
    weight: f64,
}

const CODE: Category = Category { keywords: &["code", "function", "class", "bug", "compile"], weight: 0.15 };
const ARCHITECTURE: Category =
    Category { keywords: &["architecture", "design", "system", "distributed", "scalable"], weight: 0.25 };
const DEBUG: Category = Category { keywords: &["debug", "error", "crash", "fix", "issue"], weight: 0.10 };
const MULTI_FILE: Category =
    Category { keywords: &["multiple files", "across", "refactor", "migrate", "modules"], weight: 0.20 };
const ANALYSIS: Category = Category { keywords: &["analyze", "investigate", "evaluate", "compare"], weight: 0.15 };
const CREATION: Category = Category { keywords: &["create", "build", "generate", "write"], weight: 0.10 };
const SIMPLE: Category = Category { keywords: &["simple", "quick", "trivial", "typo", "rename"], weight: -0.15 };

const PROJECT_CONTEXT: &[&str] = &["this codebase", "our project", "existing code", "the repo"];
const CONVERSATIONAL: &[&str] = &["hi", "hello", "thanks", "please", "can you"];

/// A category's weight accumulates once per matching keyword, capped at
/// three matches.
fn category_contribution(lower: &str, category: &Category) -> f64 {
    let matches = category.keywords.iter().filter(|k| lower.contains(*k)).count().min(3);
    category.weight * matches as f64
}

/// Complexity: bounded sum of token-length band, keyword-category bands,
/// and project/conversational signal, clamped to `[0, 1]`.
pub fn analyze(text: &str) -> f64 {
    let lower = text.to_lowercase();
    let mut score = token_band(approx_tokens(text));

    for category in [&CODE, &ARCHITECTURE, &DEBUG, &MULTI_FILE, &ANALYSIS, &CREATION, &SIMPLE] {
        score += category_contribution(&lower, category);
    }

    if PROJECT_CONTEXT.iter().any(|k| lower.contains(k)) {
        score += 0.15;
    }
    if CONVERSATIONAL.iter().any(|k| lower.contains(k)) {
        score -= 0.20;
    }

    score.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_greeting_scores_low() {
        assert!(analyze("hello") < 0.3, "{}", analyze("hello"));
    }

    #[test]
    fn architecture_query_scores_high() {
        let score = analyze("Design a distributed caching system architecture");
        assert!(score >= 0.6, "{score}");
    }

    #[test]
    fn score_is_clamped_to_unit_range() {
        let score = analyze("architecture distributed system design scalable code function class bug compile");
        assert!((0.0..=1.0).contains(&score));
    }

    #[test]
    fn conversational_signal_reduces_score() {
        let with = analyze("hi can you fix this bug");
        let without = analyze("fix this bug");
        assert!(with < without);
    }
}
