//! The top-level pipeline: profile → decompose → route → pre-flight
//! conflict analysis → cost gate → strategy-specific execution → status
//! synthesis. Everything else in `services` is a pure function or a narrow
//! repository wrapper; this is where they're composed into one session.

use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::error::CoordinatorError;
use crate::domain::models::evolution_outcome::DqWeights;
use crate::domain::models::file_lock::LockType;
use crate::domain::models::{
    AgentCapability, AgentStatus, DelegationEvent, DqScoreRecord, EvolutionOutcome, Outcome, OutcomeKind,
    PatternDetection, Session, SessionStatus, SubTask, TaskContext, ThinkingEffort,
};
use crate::domain::ports::{
    DelegationRepository, DqScoreRepository, EventSink, EvolutionRepository, OutcomeRepository,
    PatternRepository, SessionRepository,
};
use crate::services::ace_analyzer::{self, SessionTranscript};
use crate::services::conflict_manager::{detect_potential_conflicts, PlannedLock};
use crate::services::executor::{Executor, SpawnConfig};
use crate::services::four_ds_gates::delegation_gate;
use crate::services::{complexity_analyzer, decomposer, dq_scorer, pattern_detector, router, task_profiler};
use crate::services::trust_ledger::TrustLedger;

/// A session's cost estimate above this requires operator confirmation
/// before execution proceeds (USD).
pub const COST_CONFIRMATION_THRESHOLD_USD: f64 = 1.0;

/// The execution strategy for a session, either requested explicitly or
/// inferred from the task description.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Investigate only; no write locks are requested.
    Research,
    /// Decompose and execute without a prior research pass.
    Implement,
    /// Review existing output or code; read-only.
    Review,
    /// Research first, then implement using its findings — the only
    /// strategy with a mandatory two-phase read-then-write ordering.
    Full,
    /// A named multi-agent team collaborates on one task.
    Team,
}

impl Strategy {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Research => "research",
            Self::Implement => "implement",
            Self::Review => "review",
            Self::Full => "full",
            Self::Team => "team",
        }
    }

    /// Infer a strategy from keywords in the task description when the
    /// caller asks for `auto`.
    pub fn infer(description: &str) -> Self {
        let lower = description.to_lowercase();
        if ["research", "investigate", "explore", "survey"].iter().any(|k| lower.contains(k)) {
            Self::Research
        } else if ["review", "audit", "check"].iter().any(|k| lower.contains(k)) {
            Self::Review
        } else if ["team", "collaborate", "together"].iter().any(|k| lower.contains(k)) {
            Self::Team
        } else if ["full", "end-to-end", "end to end"].iter().any(|k| lower.contains(k)) {
            Self::Full
        } else {
            Self::Implement
        }
    }
}

/// What the orchestrator decided for one subtask before execution.
pub struct PlannedSubtask {
    pub subtask: SubTask,
    pub tier: crate::domain::models::ModelTier,
    pub thinking_effort: Option<ThinkingEffort>,
    pub dq_score: f64,
    pub assignment: crate::domain::models::Assignment,
}

/// One delegated agent's terminal outcome, collected during execution and
/// folded back into the trust ledger and evolution engine after synthesis.
struct AgentCompletion {
    assignment_agent_id: String,
    success: bool,
    duration_secs: f64,
}

/// The fully-planned session, before any subprocess is spawned. Exposed so
/// callers (the CLI) can render a cost-confirmation prompt.
pub struct ExecutionPlan {
    pub session_id: Uuid,
    pub strategy: Strategy,
    pub subtasks: Vec<PlannedSubtask>,
    pub estimated_cost: f64,
    pub requires_confirmation: bool,
    pub conflict_groups: Vec<Vec<Uuid>>,
}

pub struct Orchestrator {
    sessions: Arc<dyn SessionRepository>,
    delegations: Arc<dyn DelegationRepository>,
    outcomes: Arc<dyn OutcomeRepository>,
    evolution: Arc<dyn EvolutionRepository>,
    patterns: Arc<dyn PatternRepository>,
    dq_scores: Arc<dyn DqScoreRepository>,
    trust: Arc<TrustLedger>,
    executor: Arc<Executor>,
    events: Arc<dyn EventSink>,
}

impl Orchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        sessions: Arc<dyn SessionRepository>,
        delegations: Arc<dyn DelegationRepository>,
        outcomes: Arc<dyn OutcomeRepository>,
        evolution: Arc<dyn EvolutionRepository>,
        patterns: Arc<dyn PatternRepository>,
        dq_scores: Arc<dyn DqScoreRepository>,
        trust: Arc<TrustLedger>,
        executor: Arc<Executor>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self { sessions, delegations, outcomes, evolution, patterns, dq_scores, trust, executor, events }
    }

    /// Step 1-5: allocate a session, profile the task, decompose it, and
    /// route every subtask to a tier and (optionally) an agent.
    pub async fn plan(
        &self,
        description: &str,
        context: TaskContext,
        strategy: Strategy,
        agents: &[AgentCapability],
        weights: DqWeights,
    ) -> Result<ExecutionPlan, CoordinatorError> {
        let session_id = Uuid::new_v4();
        let profile = task_profiler::classify(description, context, None)?;
        let subtasks = decomposer::decompose(description, &profile, None);

        let pattern_match = pattern_detector::detect(description);
        self.patterns
            .insert(&PatternDetection {
                task_id: session_id,
                label: pattern_match.label,
                confidence: pattern_match.confidence,
                strategy: pattern_match.suggested_strategy,
                detected_at: Utc::now(),
            })
            .await?;

        let mut trust_scores: HashMap<String, f64> = HashMap::with_capacity(agents.len());
        for agent in agents {
            let score = self.trust.get_trust_score(&agent.agent_id, "general").await.unwrap_or(0.5);
            trust_scores.insert(agent.agent_id.clone(), score);
        }

        let mut planned = Vec::with_capacity(subtasks.len());
        let mut total_cost = 0.0;

        for subtask in subtasks {
            let complexity = complexity_analyzer::analyze(&subtask.description);

            let routing = dq_scorer::route(complexity, weights, |_tier| None);
            self.dq_scores
                .insert(&DqScoreRecord {
                    subtask_id: subtask.id,
                    model_tier: routing.tier.as_str().to_string(),
                    validity: routing.score.validity,
                    specificity: routing.score.specificity,
                    correctness: routing.score.correctness,
                    dq_score: routing.score.dq_score,
                    actionable: dq_scorer::is_actionable(routing.score.dq_score, dq_scorer::DEFAULT_ACTIONABLE_THRESHOLD),
                    scored_at: Utc::now(),
                })
                .await?;
            let assignment = if delegation_gate(&subtask.profile) {
                router::route(&subtask, agents, |agent_id| trust_scores.get(agent_id).copied().unwrap_or(0.5))
            } else {
                self.events
                    .log(session_event(session_id, "delegation_gate_blocked", false))
                    .await;
                router::route(&subtask, &[], |_| 0.5)
            };

            total_cost += subtask.estimated_cost;
            planned.push(PlannedSubtask {
                dq_score: routing.score.dq_score,
                tier: routing.tier,
                thinking_effort: routing.thinking_effort,
                subtask,
                assignment,
            });
        }

        let locks_by_subtask: HashMap<Uuid, Vec<PlannedLock>> = planned
            .iter()
            .map(|p| {
                let locks = planned_locks_for(&p.subtask);
                (p.subtask.id, locks)
            })
            .collect();
        let report = detect_potential_conflicts(&locks_by_subtask);

        Ok(ExecutionPlan {
            session_id,
            strategy,
            requires_confirmation: total_cost > COST_CONFIRMATION_THRESHOLD_USD,
            estimated_cost: total_cost,
            subtasks: planned,
            conflict_groups: report.parallel_groups,
        })
    }

    /// Step 6-8: execute an already-confirmed plan and synthesize the
    /// session's final status.
    pub async fn execute(&self, plan: ExecutionPlan, description: &str) -> Result<Session, CoordinatorError> {
        let now = Utc::now();
        let session = Session {
            session_id: plan.session_id,
            task: description.to_string(),
            strategy: plan.strategy.as_str().to_string(),
            status: SessionStatus::Partial,
            output: String::new(),
            errors: Vec::new(),
            total_cost: plan.estimated_cost,
            created_at: now,
            completed_at: None,
        };
        self.sessions.insert(&session).await?;
        self.events.log(session_event(session.session_id, "session_started", true)).await;

        let by_id: HashMap<Uuid, &PlannedSubtask> = plan.subtasks.iter().map(|p| (p.subtask.id, p)).collect();

        let mut outputs = Vec::new();
        let mut errors = Vec::new();
        let mut completions = Vec::new();

        match plan.strategy {
            Strategy::Full => {
                // Two-phase: every read-only-safe group runs before any
                // group containing a write lock.
                let (read_groups, write_groups): (Vec<_>, Vec<_>) = plan
                    .conflict_groups
                    .iter()
                    .cloned()
                    .partition(|g| g.iter().all(|id| by_id.get(id).is_some_and(|p| is_read_only(&p.subtask))));
                for group in read_groups.into_iter().chain(write_groups) {
                    self.execute_group(&group, &by_id, plan.session_id, &mut outputs, &mut errors, &mut completions)
                        .await?;
                }
            }
            _ => {
                for group in &plan.conflict_groups {
                    self.execute_group(group, &by_id, plan.session_id, &mut outputs, &mut errors, &mut completions)
                        .await?;
                }
            }
        }

        let status = if errors.is_empty() {
            SessionStatus::Success
        } else if outputs.is_empty() {
            SessionStatus::Failed
        } else {
            SessionStatus::Partial
        };

        let completed = Session {
            status,
            output: outputs.join("\n---\n"),
            errors: errors.clone(),
            completed_at: Some(Utc::now()),
            ..session
        };
        self.sessions.update(&completed).await?;
        self.events.log(session_event(completed.session_id, "session_completed", status == SessionStatus::Success)).await;

        self.record_feedback(&completed, &outputs, &errors, &completions, &plan.subtasks).await?;

        Ok(completed)
    }

    /// Fold a completed session back into the learning loop: an ACE
    /// consensus analysis persisted as an [`Outcome`], per-agent trust
    /// updates, and one [`EvolutionOutcome`] summarizing the delegation.
    /// Best-effort in spirit (§4.12/§4.6) but surfaced as a real error here
    /// since, unlike audit logging, a failed write here would silently
    /// starve the optimizer of evidence.
    async fn record_feedback(
        &self,
        session: &Session,
        outputs: &[String],
        errors: &[String],
        completions: &[AgentCompletion],
        subtasks: &[PlannedSubtask],
    ) -> Result<(), CoordinatorError> {
        let transcript = SessionTranscript {
            messages: outputs.to_vec(),
            errors: errors.to_vec(),
            tools: Vec::new(),
            model: subtasks.first().map(|p| p.tier.as_str().to_string()),
        };
        let analyses = ace_analyzer::analyze_all(&transcript);
        let consensus = ace_analyzer::synthesize_consensus(&analyses);

        let outcome_kind = match session.status {
            SessionStatus::Success => OutcomeKind::Success,
            SessionStatus::Partial => OutcomeKind::Partial,
            SessionStatus::Failed => OutcomeKind::Failed,
            SessionStatus::Cancelled => OutcomeKind::Abandoned,
        };
        let outcome = Outcome {
            session_id: session.session_id,
            outcome: outcome_kind,
            quality: consensus.quality,
            complexity: consensus.complexity,
            model_efficiency: consensus.model_efficiency,
            dq_score: consensus.dq_score,
            confidence: consensus.confidence,
            analyzed_at: Utc::now(),
        };
        self.outcomes.upsert(&outcome).await?;

        for completion in completions {
            self.trust
                .record_outcome(
                    &completion.assignment_agent_id,
                    "general",
                    completion.success,
                    (consensus.quality / 5.0).clamp(0.0, 1.0),
                    completion.duration_secs,
                )
                .await?;
        }

        let agent_ids: Vec<String> = completions.iter().map(|c| c.assignment_agent_id.clone()).collect();
        let evolution_outcome = EvolutionOutcome {
            delegation_id: session.session_id,
            timestamp: Utc::now(),
            success: matches!(session.status, SessionStatus::Success),
            quality_score: consensus.quality,
            actual_cost: session.total_cost,
            actual_duration: completions.iter().map(|c| c.duration_secs).sum(),
            complexity: consensus.complexity,
            subtask_count: subtasks.len() as u32,
            agent_ids,
            feedback: (!errors.is_empty()).then(|| errors.join("; ")),
        };
        self.evolution.insert(&evolution_outcome).await?;

        Ok(())
    }

    async fn execute_group(
        &self,
        group: &[Uuid],
        by_id: &HashMap<Uuid, &PlannedSubtask>,
        session_id: Uuid,
        outputs: &mut Vec<String>,
        errors: &mut Vec<String>,
        completions: &mut Vec<AgentCompletion>,
    ) -> Result<(), CoordinatorError> {
        let mut configs = Vec::new();
        for id in group {
            let Some(planned) = by_id.get(id) else { continue };
            let event = DelegationEvent {
                id: Uuid::new_v4(),
                session_id,
                subtask_id: planned.subtask.id,
                agent_id: planned.assignment.agent_id.clone(),
                model_tier: planned.tier.as_str().to_string(),
                dq_score: planned.dq_score,
                reasoning: planned.assignment.reasoning.clone(),
                created_at: Utc::now(),
            };
            self.delegations.insert(&event).await?;

            configs.push(SpawnConfig {
                agent_id: Uuid::new_v4(),
                task_id: session_id,
                subtask_id: planned.subtask.id,
                agent_type: planned.assignment.agent_id.clone(),
                tier: planned.tier,
                thinking_effort: planned.thinking_effort,
                prompt: planned.subtask.description.clone(),
                locks: planned_locks_for(&planned.subtask)
                    .into_iter()
                    .map(|l| (l.path, l.lock_type))
                    .collect(),
                dq_score: planned.dq_score,
                cost_estimate: planned.subtask.estimated_cost,
                binary: "claude".to_string(),
                max_turns: 50,
            });
        }

        let spawned = self.executor.spawn_parallel(configs).await;
        for agent_id in spawned {
            if let Some(record) = self.executor.registry().get(agent_id).await? {
                let duration_secs = match (record.started_at, record.completed_at) {
                    (Some(start), Some(end)) => (end - start).num_milliseconds().max(0) as f64 / 1000.0,
                    _ => 0.0,
                };
                let success = record.status == AgentStatus::Completed;
                completions.push(AgentCompletion {
                    assignment_agent_id: record.agent_type.clone(),
                    success,
                    duration_secs,
                });
                match record.status {
                    AgentStatus::Completed => {
                        if let Some(result) = record.result {
                            outputs.push(result);
                        }
                    }
                    _ => errors.push(record.error.unwrap_or_else(|| format!("agent {agent_id} did not complete"))),
                }
            }
        }
        Ok(())
    }
}

fn session_event(session_id: Uuid, operation: &str, success: bool) -> crate::domain::ports::CoordinatorEvent {
    use crate::domain::ports::CoordinatorEventType;
    let event_type = match operation {
        "session_started" => CoordinatorEventType::SessionStarted,
        "delegation_gate_blocked" => CoordinatorEventType::DelegationGateBlocked,
        _ => CoordinatorEventType::SessionCompleted,
    };
    crate::domain::ports::CoordinatorEvent {
        timestamp: Utc::now(),
        event_type,
        operation: operation.to_string(),
        actor: "orchestrator".to_string(),
        resource_id: Some(session_id.to_string()),
        outcome: if success { crate::domain::ports::EventOutcome::Success } else { crate::domain::ports::EventOutcome::Failure },
        metadata: None,
    }
}

fn is_read_only(subtask: &SubTask) -> bool {
    matches!(subtask.verification_method, crate::domain::models::subtask::VerificationMethod::SemanticSimilarity)
        || subtask.metadata.get("read_only").and_then(serde_json::Value::as_bool).unwrap_or(false)
}

/// Extract planned lock demands from a subtask's metadata (`files: [..]`,
/// `write: bool`). Subtasks with no file metadata request no locks.
fn planned_locks_for(subtask: &SubTask) -> Vec<PlannedLock> {
    let Some(files) = subtask.metadata.get("files").and_then(serde_json::Value::as_array) else {
        return Vec::new();
    };
    let write = subtask.metadata.get("write").and_then(serde_json::Value::as_bool).unwrap_or(true);
    files
        .iter()
        .filter_map(serde_json::Value::as_str)
        .map(|path| PlannedLock {
            subtask_id: subtask.id,
            path: path.to_string(),
            lock_type: if write { LockType::Write } else { LockType::Read },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::evolution_outcome::EvolutionWeights;
    use crate::domain::ports::model_invoker::InvocationOutput;
    use crate::domain::ports::{ModelInvoker, NullEventSink};
    use crate::infrastructure::database::{
        connection::DatabaseConnection, AgentRegistryRepositoryImpl, DelegationRepositoryImpl,
        DqScoreRepositoryImpl, EvolutionRepositoryImpl, FileLockRepositoryImpl, OutcomeRepositoryImpl,
        PatternRepositoryImpl, SessionRepositoryImpl, TrustRepositoryImpl,
    };
    use crate::services::{AgentRegistry, ConflictManager};
    use async_trait::async_trait;
    use std::time::Duration;

    struct StubInvoker;

    #[async_trait]
    impl ModelInvoker for StubInvoker {
        async fn invoke(&self, _binary: &str, _args: &[String], _prompt: &str, _timeout: Duration) -> Result<InvocationOutput, CoordinatorError> {
            Ok(InvocationOutput { exit_code: 0, stdout: "done".to_string(), stderr: String::new() })
        }
    }

    async fn orchestrator() -> (DatabaseConnection, Orchestrator) {
        let db = DatabaseConnection::new("sqlite::memory:").await.unwrap();
        db.migrate().await.unwrap();
        let pool = db.pool().clone();

        let sessions = Arc::new(SessionRepositoryImpl::new(pool.clone()));
        let delegations = Arc::new(DelegationRepositoryImpl::new(pool.clone()));
        let outcomes = Arc::new(OutcomeRepositoryImpl::new(pool.clone()));
        let evolution_repo = Arc::new(EvolutionRepositoryImpl::new(pool.clone()));
        let patterns = Arc::new(PatternRepositoryImpl::new(pool.clone()));
        let dq_scores = Arc::new(DqScoreRepositoryImpl::new(pool.clone()));
        let trust_repo = Arc::new(TrustRepositoryImpl::new(pool.clone()));
        let agent_registry = Arc::new(AgentRegistry::new(Arc::new(AgentRegistryRepositoryImpl::new(pool.clone()))));
        let conflicts = Arc::new(ConflictManager::new(Arc::new(FileLockRepositoryImpl::new(pool.clone()))));
        let executor = Arc::new(Executor::new(agent_registry, conflicts, Arc::new(StubInvoker), 5));
        let trust = Arc::new(TrustLedger::new(trust_repo));
        let events: Arc<dyn crate::domain::ports::EventSink> = Arc::new(NullEventSink);

        let orchestrator = Orchestrator::new(
            sessions, delegations, outcomes, evolution_repo, patterns, dq_scores, trust, executor, events,
        );
        (db, orchestrator)
    }

    #[tokio::test]
    async fn plan_records_one_pattern_detection_and_one_dq_score_per_subtask() {
        let (_db, orch) = orchestrator().await;
        let weights = EvolutionWeights::default().dq_weights;
        let plan = orch
            .plan("Fix the login crash bug", TaskContext::default(), Strategy::Implement, &[], weights)
            .await
            .unwrap();

        let patterns = orch.patterns.list_by_task(plan.session_id).await.unwrap();
        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns[0].label, "debugging");

        for planned in &plan.subtasks {
            let scores = orch.dq_scores.list_by_subtask(planned.subtask.id).await.unwrap();
            assert_eq!(scores.len(), 1);
        }
    }

    #[tokio::test]
    async fn execute_runs_plan_and_synthesizes_a_successful_session() {
        let (_db, orch) = orchestrator().await;
        let weights = EvolutionWeights::default().dq_weights;
        let plan = orch
            .plan("Add a small utility function", TaskContext::default(), Strategy::Implement, &[], weights)
            .await
            .unwrap();

        let session = orch.execute(plan, "Add a small utility function").await.unwrap();
        assert_eq!(session.status, SessionStatus::Success);
        assert!(session.errors.is_empty());
    }

    #[test]
    fn auto_infers_research_strategy() {
        assert_eq!(Strategy::infer("Research the best caching approach"), Strategy::Research);
    }

    #[test]
    fn auto_infers_implement_as_default() {
        assert_eq!(Strategy::infer("Add a login endpoint"), Strategy::Implement);
    }

    #[test]
    fn auto_infers_full_for_end_to_end_phrasing() {
        assert_eq!(Strategy::infer("Do a full end-to-end rewrite"), Strategy::Full);
    }
}
