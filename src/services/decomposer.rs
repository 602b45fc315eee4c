//! Recursive contract-first decomposition: splits a task into verifiable
//! [`SubTask`]s, recursing on any child below the verifiability floor and
//! forcing a leaf at the depth bound.

use std::collections::HashMap;
use uuid::Uuid;

use crate::domain::models::{SubTask, TaskProfile, VerificationMethod};

/// Recursion is bounded at this many nested template expansions.
pub const MAX_DEPTH: u8 = 4;
/// A subtask below this verifiability is recursed on (or forced at the bound).
pub const MIN_VERIFIABILITY: f64 = 0.3;

struct ChildTemplate {
    suffix: &'static str,
    verification_method: VerificationMethod,
    depends_on: &'static [usize],
    parallel_safe_default: bool,
}

struct Template {
    children: &'static [ChildTemplate],
}

const BUILD: Template = Template {
    children: &[
        ChildTemplate {
            suffix: "Design schema and data model",
            verification_method: VerificationMethod::HumanReview,
            depends_on: &[],
            parallel_safe_default: true,
        },
        ChildTemplate {
            suffix: "Implement core API endpoints",
            verification_method: VerificationMethod::AutomatedTest,
            depends_on: &[0],
            parallel_safe_default: false,
        },
        ChildTemplate {
            suffix: "Add tests and validation",
            verification_method: VerificationMethod::AutomatedTest,
            depends_on: &[1],
            parallel_safe_default: false,
        },
        ChildTemplate {
            suffix: "Write deployment and documentation",
            verification_method: VerificationMethod::HumanReview,
            depends_on: &[1],
            parallel_safe_default: true,
        },
    ],
};

const RESEARCH: Template = Template {
    children: &[
        ChildTemplate {
            suffix: "Survey existing approaches",
            verification_method: VerificationMethod::SemanticSimilarity,
            depends_on: &[],
            parallel_safe_default: true,
        },
        ChildTemplate {
            suffix: "Evaluate trade-offs",
            verification_method: VerificationMethod::HumanReview,
            depends_on: &[0],
            parallel_safe_default: false,
        },
        ChildTemplate {
            suffix: "Synthesize findings and recommend an approach",
            verification_method: VerificationMethod::HumanReview,
            depends_on: &[1],
            parallel_safe_default: false,
        },
    ],
};

const IMPLEMENT: Template = Template {
    children: &[
        ChildTemplate {
            suffix: "Implement core logic",
            verification_method: VerificationMethod::AutomatedTest,
            depends_on: &[],
            parallel_safe_default: true,
        },
        ChildTemplate {
            suffix: "Add tests",
            verification_method: VerificationMethod::AutomatedTest,
            depends_on: &[0],
            parallel_safe_default: false,
        },
        ChildTemplate {
            suffix: "Integrate and wire up",
            verification_method: VerificationMethod::AutomatedTest,
            depends_on: &[0, 1],
            parallel_safe_default: false,
        },
    ],
};

const GENERIC: Template = Template {
    children: &[
        ChildTemplate {
            suffix: "Plan approach",
            verification_method: VerificationMethod::HumanReview,
            depends_on: &[],
            parallel_safe_default: true,
        },
        ChildTemplate {
            suffix: "Execute",
            verification_method: VerificationMethod::GroundTruth,
            depends_on: &[0],
            parallel_safe_default: false,
        },
        ChildTemplate {
            suffix: "Verify and review",
            verification_method: VerificationMethod::HumanReview,
            depends_on: &[1],
            parallel_safe_default: false,
        },
    ],
};

fn select_template(description: &str) -> &'static Template {
    let lower = description.to_lowercase();
    if ["build", "api", "server", "create"].iter().any(|k| lower.contains(k)) {
        &BUILD
    } else if ["research", "investigate", "explore", "survey"].iter().any(|k| lower.contains(k)) {
        &RESEARCH
    } else if ["implement", "add feature", "feature"].iter().any(|k| lower.contains(k)) {
        &IMPLEMENT
    } else {
        &GENERIC
    }
}

/// Fixed child-profile adjustment rule from the distilled spec: complexity
/// 0.6× parent, uncertainty 0.7× parent, verifiability fixed at 0.7,
/// reversibility `max(parent, 0.5)`, remaining dimensions 0.5-0.6× parent.
fn child_profile(parent: &TaskProfile) -> TaskProfile {
    TaskProfile::new(
        (parent.complexity * 0.6).clamp(0.0, 1.0),
        (parent.criticality * 0.55).clamp(0.0, 1.0),
        (parent.uncertainty * 0.7).clamp(0.0, 1.0),
        (parent.duration * 0.5).clamp(0.0, 1.0),
        (parent.cost * 0.5).clamp(0.0, 1.0),
        (parent.resource_requirements * 0.6).clamp(0.0, 1.0),
        (parent.constraints * 0.55).clamp(0.0, 1.0),
        0.7,
        parent.reversibility.max(0.5),
        (parent.contextuality * 0.6).clamp(0.0, 1.0),
        (parent.subjectivity * 0.5).clamp(0.0, 1.0),
    )
    .expect("child profile dimensions derived from a valid parent profile stay in range")
}

/// One node's worth of decomposition: generates every child id up front, so
/// template dependency slots resolve against real ids rather than
/// placeholders that never match (see DESIGN.md).
fn expand_batch(
    description: &str,
    parent_profile: &TaskProfile,
    parent_id: Option<Uuid>,
    depth: u8,
) -> Vec<SubTask> {
    let template = select_template(description);
    let ids: Vec<Uuid> = template.children.iter().map(|_| Uuid::new_v4()).collect();
    let mut expansion: HashMap<usize, Vec<Uuid>> = HashMap::new();
    let mut result = Vec::new();

    for (i, ct) in template.children.iter().enumerate() {
        let profile = child_profile(parent_profile);
        let deps: Vec<Uuid> = ct
            .depends_on
            .iter()
            .flat_map(|di| expansion.get(di).cloned().unwrap_or_else(|| vec![ids[*di]]))
            .collect();
        let desc = format!("{}: {}", ct.suffix, description);

        if profile.verifiability < MIN_VERIFIABILITY && depth + 1 <= MAX_DEPTH {
            let mut sub_leaves = expand_batch(&desc, &profile, Some(ids[i]), depth + 1);
            for leaf in &mut sub_leaves {
                for d in &deps {
                    if !leaf.dependencies.contains(d) {
                        leaf.dependencies.push(*d);
                    }
                }
            }
            expansion.insert(i, sub_leaves.iter().map(|l| l.id).collect());
            result.extend(sub_leaves);
        } else if profile.verifiability < MIN_VERIFIABILITY {
            // Depth bound reached: force a single verifiable leaf.
            let forced_profile = TaskProfile::new(
                profile.complexity,
                profile.criticality,
                profile.uncertainty,
                profile.duration,
                profile.cost,
                profile.resource_requirements,
                profile.constraints,
                MIN_VERIFIABILITY,
                profile.reversibility,
                profile.contextuality,
                profile.subjectivity,
            )
            .expect("forced-verifiable profile stays in range");
            let leaf = SubTask {
                id: ids[i],
                description: desc,
                verification_method: VerificationMethod::HumanReview,
                estimated_cost: 0.5,
                estimated_duration: 0.5,
                parallel_safe: ct.parallel_safe_default && deps.is_empty(),
                parent_id,
                dependencies: deps,
                profile: forced_profile,
                metadata: serde_json::json!({ "forced_verifiable": true }),
            };
            expansion.insert(i, vec![leaf.id]);
            result.push(leaf);
        } else {
            let leaf = SubTask {
                id: ids[i],
                description: desc,
                verification_method: ct.verification_method,
                estimated_cost: 0.5,
                estimated_duration: 0.5,
                parallel_safe: ct.parallel_safe_default && deps.is_empty(),
                parent_id,
                dependencies: deps,
                profile,
                metadata: serde_json::Value::Null,
            };
            expansion.insert(i, vec![leaf.id]);
            result.push(leaf);
        }
    }

    result
}

/// Iteratively clear `parallel_safe` on any subtask whose dependency is not
/// `parallel_safe`, until a fixed point is reached.
pub fn propagate_parallel_safety(subtasks: &mut [SubTask]) {
    loop {
        let unsafe_ids: Vec<Uuid> = subtasks
            .iter()
            .filter(|t| !t.parallel_safe)
            .map(|t| t.id)
            .collect();

        let mut changed = false;
        for t in subtasks.iter_mut() {
            if t.parallel_safe && t.dependencies.iter().any(|d| unsafe_ids.contains(d)) {
                t.parallel_safe = false;
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }
}

/// An injectable decomposer: on failure, falls back to the heuristic
/// templates silently.
pub trait DecomposerFn: Fn(&str, &TaskProfile) -> Option<Vec<SubTask>> {}
impl<T: Fn(&str, &TaskProfile) -> Option<Vec<SubTask>>> DecomposerFn for T {}

/// Recursively decompose `description` into verifiable subtasks, falling
/// back to the heuristic templates if `custom` is absent or fails.
pub fn decompose(
    description: &str,
    profile: &TaskProfile,
    custom: Option<&dyn Fn(&str, &TaskProfile) -> Option<Vec<SubTask>>>,
) -> Vec<SubTask> {
    if let Some(f) = custom {
        if let Some(mut subtasks) = f(description, profile) {
            propagate_parallel_safety(&mut subtasks);
            return subtasks;
        }
    }

    let mut leaves = expand_batch(description, profile, None, 0);
    propagate_parallel_safety(&mut leaves);
    leaves
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(complexity: f64, verifiability: f64) -> TaskProfile {
        TaskProfile::new(complexity, 0.5, 0.5, 0.5, 0.5, 0.5, 0.5, verifiability, 0.5, 0.5, 0.5).unwrap()
    }

    #[test]
    fn build_task_produces_at_least_three_subtasks_all_verifiable() {
        let p = profile(0.7, 0.6);
        let subtasks = decompose("Build API server", &p, None);
        assert!(subtasks.len() >= 3, "got {} subtasks", subtasks.len());
        for t in &subtasks {
            assert!(t.profile.verifiability >= MIN_VERIFIABILITY);
        }
        assert!(subtasks.iter().any(|t| !t.dependencies.is_empty()), "expected at least one dependency edge");
    }

    #[test]
    fn dependency_ids_resolve_to_real_subtasks() {
        let p = profile(0.7, 0.6);
        let subtasks = decompose("Build API server", &p, None);
        let ids: std::collections::HashSet<Uuid> = subtasks.iter().map(|t| t.id).collect();
        for t in &subtasks {
            for dep in &t.dependencies {
                assert!(ids.contains(dep), "dependency {dep} does not resolve to a real subtask");
            }
        }
    }

    #[test]
    fn parallel_safety_is_monotonically_degraded() {
        let p = profile(0.7, 0.6);
        let subtasks = decompose("Implement a new feature", &p, None);
        for t in &subtasks {
            if t.parallel_safe {
                for dep_id in &t.dependencies {
                    let dep = subtasks.iter().find(|s| s.id == *dep_id).unwrap();
                    assert!(dep.parallel_safe, "parallel_safe task depends on a non-parallel-safe task");
                }
            }
        }
    }

    #[test]
    fn custom_decomposer_is_used_when_it_succeeds() {
        let p = profile(0.7, 0.6);
        let custom = |_desc: &str, _p: &TaskProfile| -> Option<Vec<SubTask>> {
            Some(vec![SubTask {
                id: Uuid::new_v4(),
                description: "custom".into(),
                verification_method: VerificationMethod::AutomatedTest,
                estimated_cost: 0.1,
                estimated_duration: 0.1,
                parallel_safe: true,
                parent_id: None,
                dependencies: vec![],
                profile: TaskProfile::new(0.1, 0.1, 0.1, 0.1, 0.1, 0.1, 0.1, 0.9, 0.1, 0.1, 0.1).unwrap(),
                metadata: serde_json::Value::Null,
            }])
        };
        let subtasks = decompose("anything", &p, Some(&custom));
        assert_eq!(subtasks.len(), 1);
        assert_eq!(subtasks[0].description, "custom");
    }

    #[test]
    fn custom_decomposer_falls_back_silently_on_failure() {
        let p = profile(0.7, 0.6);
        let custom = |_desc: &str, _p: &TaskProfile| -> Option<Vec<SubTask>> { None };
        let subtasks = decompose("Build API server", &p, Some(&custom));
        assert!(subtasks.len() >= 3);
    }
}
