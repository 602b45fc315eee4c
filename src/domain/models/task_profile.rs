//! The eleven-dimensional task profile used to drive routing, gating, and
//! decomposition decisions.

use serde::{Deserialize, Serialize};

use crate::domain::error::CoordinatorError;

/// Every dimension is independent and lives in `[0, 1]`.
///
/// `TaskProfile` is immutable after construction: [`TaskProfile::new`]
/// validates every field and rejects the profile as a whole if any
/// dimension is out of range, rather than clamping silently.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TaskProfile {
    pub complexity: f64,
    pub criticality: f64,
    pub uncertainty: f64,
    pub duration: f64,
    pub cost: f64,
    pub resource_requirements: f64,
    pub constraints: f64,
    pub verifiability: f64,
    pub reversibility: f64,
    pub contextuality: f64,
    pub subjectivity: f64,
}

/// Optional context flags supplied alongside a task description.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TaskContext {
    pub is_critical: bool,
    pub time_sensitive: bool,
    pub high_stakes: bool,
}

macro_rules! dimension_fields {
    () => {
        [
            ("complexity", 0),
            ("criticality", 1),
            ("uncertainty", 2),
            ("duration", 3),
            ("cost", 4),
            ("resource_requirements", 5),
            ("constraints", 6),
            ("verifiability", 7),
            ("reversibility", 8),
            ("contextuality", 9),
            ("subjectivity", 10),
        ]
    };
}

impl TaskProfile {
    /// Construct a profile, rejecting it if any dimension falls outside
    /// `[0, 1]`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        complexity: f64,
        criticality: f64,
        uncertainty: f64,
        duration: f64,
        cost: f64,
        resource_requirements: f64,
        constraints: f64,
        verifiability: f64,
        reversibility: f64,
        contextuality: f64,
        subjectivity: f64,
    ) -> Result<Self, CoordinatorError> {
        let values = [
            complexity,
            criticality,
            uncertainty,
            duration,
            cost,
            resource_requirements,
            constraints,
            verifiability,
            reversibility,
            contextuality,
            subjectivity,
        ];
        for (name, idx) in dimension_fields!() {
            let v = values[idx];
            if !(0.0..=1.0).contains(&v) {
                return Err(CoordinatorError::ProfileOutOfRange {
                    dimension: name,
                    value: v,
                });
            }
        }
        Ok(Self {
            complexity,
            criticality,
            uncertainty,
            duration,
            cost,
            resource_requirements,
            constraints,
            verifiability,
            reversibility,
            contextuality,
            subjectivity,
        })
    }

    /// Apply the context-flag post-modifications described for the task
    /// profiler: critical tasks floor criticality, time-sensitive tasks
    /// floor duration, high-stakes tasks cap reversibility.
    pub fn apply_context(mut self, ctx: TaskContext) -> Self {
        if ctx.is_critical {
            self.criticality = self.criticality.max(0.7);
        }
        if ctx.time_sensitive {
            self.duration = self.duration.max(0.6);
        }
        if ctx.high_stakes {
            self.reversibility = self.reversibility.min(0.4);
        }
        self
    }

    /// `clamp(1 − (0.5·complexity + 0.3·duration + 0.2·cost))`, shortcut to
    /// 0.1 when complexity is very low.
    pub fn delegation_overhead(&self) -> f64 {
        if self.complexity < 0.2 {
            return 0.1;
        }
        (1.0 - (0.5 * self.complexity + 0.3 * self.duration + 0.2 * self.cost)).clamp(0.0, 1.0)
    }

    /// `0.5·criticality + 0.3·(1 − reversibility) + 0.2·uncertainty`.
    pub fn risk_score(&self) -> f64 {
        0.5 * self.criticality + 0.3 * (1.0 - self.reversibility) + 0.2 * self.uncertainty
    }

    /// Returns each dimension's name and value, used by heuristic scorers
    /// and property tests that iterate over all eleven dimensions.
    pub fn dimensions(&self) -> [(&'static str, f64); 11] {
        [
            ("complexity", self.complexity),
            ("criticality", self.criticality),
            ("uncertainty", self.uncertainty),
            ("duration", self.duration),
            ("cost", self.cost),
            ("resource_requirements", self.resource_requirements),
            ("constraints", self.constraints),
            ("verifiability", self.verifiability),
            ("reversibility", self.reversibility),
            ("contextuality", self.contextuality),
            ("subjectivity", self.subjectivity),
        ]
    }
}
