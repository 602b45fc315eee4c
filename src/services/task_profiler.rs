//! Heuristic task profiling: turns a free-form description into an
//! eleven-dimensional [`TaskProfile`].

use crate::domain::error::CoordinatorError;
use crate::domain::models::{TaskContext, TaskProfile};
use crate::domain::ports::Classifier;

struct Band {
    high: &'static [&'static str],
    medium: &'static [&'static str],
    low: &'static [&'static str],
}

const COMPLEXITY: Band = Band {
    high: &["architecture", "distributed", "system", "design", "scalable", "microservice"],
    medium: &["implement", "build", "integrate", "refactor"],
    low: &["fix", "typo", "rename", "format"],
};
const CRITICALITY: Band = Band {
    high: &["production", "critical", "security", "outage", "incident"],
    medium: &["staging", "customer", "release"],
    low: &["draft", "prototype", "experiment", "sandbox"],
};
const UNCERTAINTY: Band = Band {
    high: &["research", "explore", "investigate", "unclear", "ambiguous"],
    medium: &["evaluate", "assess", "consider"],
    low: &["exact", "specified", "defined", "documented"],
};
const DURATION: Band = Band {
    high: &["weeks", "month", "long-running", "migration"],
    medium: &["days", "sprint"],
    low: &["quick", "minutes", "trivial"],
};
const COST: Band = Band {
    high: &["gpu", "large-scale", "expensive", "compute-intensive"],
    medium: &["moderate", "standard"],
    low: &["cheap", "lightweight", "small"],
};
const RESOURCE_REQUIREMENTS: Band = Band {
    high: &["cluster", "infrastructure", "provision", "deploy"],
    medium: &["server", "database", "service"],
    low: &["local", "single-file", "script"],
};
const CONSTRAINTS: Band = Band {
    high: &["compliance", "regulation", "must", "strict", "policy"],
    medium: &["should", "prefer", "guideline"],
    low: &["optional", "flexible", "whatever"],
};
const VERIFIABILITY: Band = Band {
    high: &["test", "verify", "assert", "validate", "benchmark"],
    medium: &["review", "check"],
    low: &["subjective", "opinion", "feel"],
};
const REVERSIBILITY: Band = Band {
    high: &["draft", "reversible", "rollback", "revert", "branch"],
    medium: &["staged", "feature-flag"],
    low: &["irreversible", "destructive", "permanent", "delete", "drop"],
};
const CONTEXTUALITY: Band = Band {
    high: &["codebase", "existing", "legacy", "integrate"],
    medium: &["module", "component"],
    low: &["standalone", "isolated", "greenfield"],
};
const SUBJECTIVITY: Band = Band {
    high: &["opinion", "preference", "style", "taste", "aesthetic"],
    medium: &["readability", "clarity"],
    low: &["objective", "measurable", "deterministic"],
};

fn score_band(description: &str, band: &Band) -> f64 {
    let lower = description.to_lowercase();
    if band.high.iter().any(|k| lower.contains(k)) {
        0.75
    } else if band.medium.iter().any(|k| lower.contains(k)) {
        0.5
    } else if band.low.iter().any(|k| lower.contains(k)) {
        0.2
    } else {
        0.45
    }
}

/// The heuristic scorer: fixed keyword dictionaries, banded scores, context
/// flag post-modification.
pub fn heuristic_profile(description: &str, context: TaskContext) -> Result<TaskProfile, CoordinatorError> {
    if description.trim().is_empty() {
        return Err(CoordinatorError::EmptyDescription);
    }

    let profile = TaskProfile::new(
        score_band(description, &COMPLEXITY),
        score_band(description, &CRITICALITY),
        score_band(description, &UNCERTAINTY),
        score_band(description, &DURATION),
        score_band(description, &COST),
        score_band(description, &RESOURCE_REQUIREMENTS),
        score_band(description, &CONSTRAINTS),
        score_band(description, &VERIFIABILITY),
        score_band(description, &REVERSIBILITY),
        score_band(description, &CONTEXTUALITY),
        score_band(description, &SUBJECTIVITY),
    )?;

    Ok(profile.apply_context(context))
}

/// `classify(description, context, custom_classifier?)`: tries an injected
/// classifier first, falling back to heuristics on any failure (including
/// an empty description, which the classifier itself may reject).
pub fn classify(
    description: &str,
    context: TaskContext,
    custom_classifier: Option<&dyn Classifier>,
) -> Result<TaskProfile, CoordinatorError> {
    if description.trim().is_empty() {
        return Err(CoordinatorError::EmptyDescription);
    }

    if let Some(classifier) = custom_classifier {
        if let Ok(profile) = classifier.classify(description, context) {
            return Ok(profile);
        }
    }

    heuristic_profile(description, context)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_description() {
        let err = classify("   ", TaskContext::default(), None).unwrap_err();
        assert_eq!(err, CoordinatorError::EmptyDescription);
    }

    #[test]
    fn architecture_keywords_score_high_complexity() {
        let p = heuristic_profile("Design a distributed caching system", TaskContext::default()).unwrap();
        assert!(p.complexity >= 0.6, "complexity was {}", p.complexity);
    }

    #[test]
    fn simple_query_scores_low_complexity() {
        let p = heuristic_profile("fix a typo", TaskContext::default()).unwrap();
        assert!(p.complexity < 0.5, "complexity was {}", p.complexity);
    }

    #[test]
    fn context_flags_post_modify() {
        let ctx = TaskContext { is_critical: true, time_sensitive: true, high_stakes: true };
        let p = heuristic_profile("a quiet refactor", ctx).unwrap();
        assert!(p.criticality >= 0.7);
        assert!(p.duration >= 0.6);
        assert!(p.reversibility <= 0.4);
    }

    struct FailingClassifier;
    impl Classifier for FailingClassifier {
        fn classify(&self, _description: &str, _context: TaskContext) -> Result<TaskProfile, CoordinatorError> {
            Err(CoordinatorError::Storage("classifier unavailable".into()))
        }
    }

    #[test]
    fn falls_back_to_heuristics_on_classifier_failure() {
        let p = classify("Design a distributed caching system", TaskContext::default(), Some(&FailingClassifier))
            .unwrap();
        assert!(p.complexity >= 0.6);
    }

    struct FixedClassifier(TaskProfile);
    impl Classifier for FixedClassifier {
        fn classify(&self, _description: &str, _context: TaskContext) -> Result<TaskProfile, CoordinatorError> {
            Ok(self.0)
        }
    }

    #[test]
    fn uses_custom_classifier_when_it_succeeds() {
        let fixed = TaskProfile::new(0.9, 0.9, 0.9, 0.9, 0.9, 0.9, 0.9, 0.9, 0.9, 0.9, 0.9).unwrap();
        let p = classify("anything", TaskContext::default(), Some(&FixedClassifier(fixed))).unwrap();
        assert_eq!(p.complexity, 0.9);
    }
}
