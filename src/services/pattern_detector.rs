//! Keyword-bag task classification: eight labels, each naming a suggested
//! execution strategy, used by the `score` CLI surface and recorded via
//! [`crate::domain::ports::PatternRepository`] for later `patterns`-table
//! history.

struct Pattern {
    label: &'static str,
    keywords: &'static [&'static str],
    strategy: &'static str,
}

const PATTERNS: &[Pattern] = &[
    Pattern {
        label: "debugging",
        keywords: &["debug", "fix", "bug", "error", "issue", "broken", "crash", "traceback"],
        strategy: "review",
    },
    Pattern {
        label: "research",
        keywords: &["research", "explore", "investigate", "understand", "analyze", "study", "survey"],
        strategy: "research",
    },
    Pattern {
        label: "architecture",
        keywords: &["architect", "design", "structure", "system", "refactor major", "redesign"],
        strategy: "full",
    },
    Pattern {
        label: "refactoring",
        keywords: &["refactor", "rename", "extract", "reorganize", "cleanup", "simplify"],
        strategy: "implement",
    },
    Pattern {
        label: "implementation",
        keywords: &["implement", "build", "create", "add", "feature", "develop", "new"],
        strategy: "implement",
    },
    Pattern {
        label: "testing",
        keywords: &["test", "spec", "coverage", "vitest", "jest", "pytest", "assert"],
        strategy: "review",
    },
    Pattern {
        label: "documentation",
        keywords: &["doc", "readme", "comment", "explain", "guide", "tutorial"],
        strategy: "research",
    },
    Pattern {
        label: "optimization",
        keywords: &["optim", "performance", "speed", "efficient", "cache", "fast", "slow"],
        strategy: "full",
    },
];

/// Default strategy when no keyword matches any label.
pub const DEFAULT_STRATEGY: &str = "implement";

/// Classification of a task description: the best-matching label (or
/// `"unknown"`), a clamped confidence, and the suggested strategy.
#[derive(Debug, Clone, PartialEq)]
pub struct PatternMatch {
    pub label: String,
    pub confidence: f64,
    pub suggested_strategy: String,
}

/// Score every label by keyword-substring match count, pick the highest
/// scorer, and express confidence as `matches / |label.keywords|`.
pub fn detect(task_description: &str) -> PatternMatch {
    let lower = task_description.to_lowercase();

    let mut best: Option<(&Pattern, usize)> = None;
    for pattern in PATTERNS {
        let matches = pattern.keywords.iter().filter(|kw| lower.contains(*kw)).count();
        if matches == 0 {
            continue;
        }
        if best.map(|(_, best_score)| matches > best_score).unwrap_or(true) {
            best = Some((pattern, matches));
        }
    }

    match best {
        None => PatternMatch {
            label: "unknown".to_string(),
            confidence: 0.0,
            suggested_strategy: DEFAULT_STRATEGY.to_string(),
        },
        Some((pattern, matches)) => {
            let confidence = (matches as f64 / pattern.keywords.len() as f64).min(1.0);
            PatternMatch {
                label: pattern.label.to_string(),
                confidence,
                suggested_strategy: pattern.strategy.to_string(),
            }
        }
    }
}
