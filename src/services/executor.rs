//! Bounded-parallel subprocess execution: spawns agents via a
//! [`ModelInvoker`], enforces prompt validation, per-tier timeouts modulated
//! by thinking effort, lock acquisition/release on every exit path, and
//! cooperative cancellation.

use chrono::Utc;
use std::collections::HashMap;
use std::env;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Semaphore};
use tokio::time::timeout as tokio_timeout;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Grace period between a cancellation request and the forceful kill that
/// follows it.
const CANCELLATION_GRACE: Duration = Duration::from_secs(5);

use crate::domain::error::CoordinatorError;
use crate::domain::models::file_lock::LockType;
use crate::domain::models::{AgentRecord, ModelTier, ThinkingEffort};
use crate::domain::ports::ModelInvoker;
use crate::services::agent_registry::AgentRegistry;
use crate::services::conflict_manager::ConflictManager;

/// Maximum accepted prompt length in characters.
pub const MAX_PROMPT_CHARS: usize = 50_000;

/// Strip non-printable bytes (keeping newline/tab) and reject empty or
/// over-long prompts.
pub fn validate_prompt(prompt: &str) -> Result<String, CoordinatorError> {
    if prompt.trim().is_empty() {
        return Err(CoordinatorError::EmptyDescription);
    }
    if prompt.chars().count() > MAX_PROMPT_CHARS {
        return Err(CoordinatorError::PromptTooLong(prompt.chars().count()));
    }
    let cleaned: String = prompt.chars().filter(|c| !c.is_control() || *c == '\n' || *c == '\t').collect();
    Ok(cleaned)
}

/// Resolve the model-invoker binary: `CLAUDE_REAL_BIN` override, else the
/// configured default path under the user's home directory.
pub fn resolve_binary(configured_default: &str) -> Result<String, CoordinatorError> {
    let candidate = env::var("CLAUDE_REAL_BIN").unwrap_or_else(|_| configured_default.to_string());
    let path = Path::new(&candidate);
    if !path.exists() {
        return Err(CoordinatorError::BinaryUnavailable(candidate));
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let executable = std::fs::metadata(path).map(|m| m.permissions().mode() & 0o111 != 0).unwrap_or(false);
        if !executable {
            return Err(CoordinatorError::BinaryUnavailable(candidate));
        }
    }
    Ok(candidate)
}

/// Per-tier default timeout modulated by an optional thinking-effort
/// multiplier (opus only).
pub fn resolve_timeout(tier: ModelTier, thinking_effort: Option<ThinkingEffort>) -> Duration {
    let base = tier.default_timeout_secs() as f64;
    let multiplier = thinking_effort.map_or(1.0, ThinkingEffort::timeout_multiplier);
    Duration::from_secs_f64(base * multiplier)
}

/// Result of racing a subprocess invocation against a cancellation request.
enum SpawnOutcome {
    Invocation(Result<Result<crate::domain::ports::model_invoker::InvocationOutput, CoordinatorError>, tokio::time::error::Elapsed>),
    Cancelled,
}

/// A single agent invocation's configuration.
pub struct SpawnConfig {
    pub agent_id: Uuid,
    pub task_id: Uuid,
    pub subtask_id: Uuid,
    pub agent_type: String,
    pub tier: ModelTier,
    pub thinking_effort: Option<ThinkingEffort>,
    pub prompt: String,
    pub locks: Vec<(String, LockType)>,
    pub dq_score: f64,
    pub cost_estimate: f64,
    pub binary: String,
    pub max_turns: u32,
}

pub struct Executor {
    registry: Arc<AgentRegistry>,
    conflicts: Arc<ConflictManager>,
    invoker: Arc<dyn ModelInvoker>,
    semaphore: Arc<Semaphore>,
    cancellations: Mutex<HashMap<Uuid, CancellationToken>>,
}

impl Executor {
    pub fn new(registry: Arc<AgentRegistry>, conflicts: Arc<ConflictManager>, invoker: Arc<dyn ModelInvoker>, max_workers: usize) -> Self {
        Self {
            registry,
            conflicts,
            invoker,
            semaphore: Arc::new(Semaphore::new(max_workers.max(1))),
            cancellations: Mutex::new(HashMap::new()),
        }
    }

    /// The backing registry, for callers (the orchestrator) that need to
    /// read back a spawned agent's final record.
    pub fn registry(&self) -> &Arc<AgentRegistry> {
        &self.registry
    }

    /// `spawn(cfg, task_id)`: validate the prompt, best-effort acquire
    /// locks, launch the subprocess, map its result onto the registry, and
    /// release locks on every exit path.
    pub async fn spawn(&self, cfg: SpawnConfig) -> Result<AgentRecord, CoordinatorError> {
        let _permit = self.semaphore.acquire().await.expect("semaphore is never closed");

        let record = AgentRecord::new(
            cfg.task_id,
            cfg.subtask_id,
            cfg.agent_type.clone(),
            cfg.tier.as_str().to_string(),
            cfg.dq_score,
            cfg.cost_estimate,
            Utc::now(),
        );
        let agent_id = record.agent_id;
        self.registry.register(record).await?;

        let prompt = match validate_prompt(&cfg.prompt) {
            Ok(p) => p,
            Err(e) => {
                self.registry.fail(agent_id, e.to_string()).await?;
                return Err(e);
            }
        };

        if !cfg.locks.is_empty() {
            if let Err(e) = self.conflicts.acquire_batch(&cfg.locks, &agent_id.to_string()).await {
                self.registry.fail(agent_id, format!("lock acquisition failed: {e}")).await?;
                return Err(e);
            }
        }

        self.registry.start(agent_id).await?;

        let args = vec![
            "--model".to_string(),
            cfg.tier.vendor_id().to_string(),
            "--max-turns".to_string(),
            cfg.max_turns.to_string(),
            "-p".to_string(),
            prompt.clone(),
        ];
        let timeout_duration = resolve_timeout(cfg.tier, cfg.thinking_effort);

        let token = CancellationToken::new();
        self.cancellations.lock().await.insert(agent_id, token.clone());

        let invocation_fut = tokio_timeout(timeout_duration, self.invoker.invoke(&cfg.binary, &args, &prompt, timeout_duration));
        tokio::pin!(invocation_fut);

        let outcome = tokio::select! {
            res = &mut invocation_fut => SpawnOutcome::Invocation(res),
            () = token.cancelled() => {
                // the invocation gets a grace period to finish on its own before
                // dropping the future forces a hard kill (kill_on_drop on the
                // underlying subprocess).
                match tokio_timeout(CANCELLATION_GRACE, &mut invocation_fut).await {
                    Ok(res) => SpawnOutcome::Invocation(res),
                    Err(_elapsed) => SpawnOutcome::Cancelled,
                }
            }
        };

        self.cancellations.lock().await.remove(&agent_id);
        self.conflicts.release_all_for_agent(&agent_id.to_string()).await?;

        let record = match outcome {
            SpawnOutcome::Cancelled => self.registry.cancel(agent_id).await?,
            SpawnOutcome::Invocation(Err(_elapsed)) => self.registry.timeout(agent_id).await?,
            SpawnOutcome::Invocation(Ok(Err(e))) => self.registry.fail(agent_id, e.to_string()).await?,
            SpawnOutcome::Invocation(Ok(Ok(output))) if output.succeeded() => {
                self.registry.complete(agent_id, Some(output.stdout)).await?
            }
            SpawnOutcome::Invocation(Ok(Ok(output))) => self.registry.fail(agent_id, output.stderr).await?,
        };

        Ok(record)
    }

    /// Bounded-parallel fan-out: returns every spawned agent id (whether
    /// it succeeded, failed, or timed out).
    pub async fn spawn_parallel(&self, configs: Vec<SpawnConfig>) -> Vec<Uuid> {
        let futures = configs.into_iter().map(|cfg| {
            let this = self;
            async move {
                match this.spawn(cfg).await {
                    Ok(record) => Some(record.agent_id),
                    Err(_) => None,
                }
            }
        });
        futures::future::join_all(futures).await.into_iter().flatten().collect()
    }

    /// Poll the registry at `interval` until every id is terminal or
    /// `timeout` elapses; remaining agents are forced to `timeout` state.
    pub async fn wait_for(&self, agent_ids: &[Uuid], overall_timeout: Duration, interval: Duration) -> Result<(), CoordinatorError> {
        let deadline = tokio::time::Instant::now() + overall_timeout;
        loop {
            let mut all_terminal = true;
            for &id in agent_ids {
                if let Some(record) = self.registry.get(id).await? {
                    if !record.status.is_terminal() {
                        all_terminal = false;
                    }
                }
            }
            if all_terminal {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                for &id in agent_ids {
                    if let Some(record) = self.registry.get(id).await? {
                        if !record.status.is_terminal() {
                            self.registry.timeout(id).await?;
                        }
                    }
                }
                return Ok(());
            }
            tokio::time::sleep(interval).await;
        }
    }

    /// `cancel(agent_id)`: release locks and transition to `cancelled`.
    /// Idempotent — already-terminal agents are left as they are.
    pub async fn cancel(&self, agent_id: Uuid) -> Result<(), CoordinatorError> {
        if let Some(token) = self.cancellations.lock().await.get(&agent_id) {
            // A `spawn` task is mid-invocation: signal it and let its own
            // grace-period/hard-kill branch release locks and transition
            // the registry once the subprocess actually stops.
            token.cancel();
            return Ok(());
        }

        self.conflicts.release_all_for_agent(&agent_id.to_string()).await?;
        if let Some(record) = self.registry.get(agent_id).await? {
            if !record.status.is_terminal() {
                self.registry.cancel(agent_id).await?;
            }
        }
        Ok(())
    }

    /// `cancel_task(task_id)`: cancel every non-terminal agent under a task.
    pub async fn cancel_task(&self, task_id: Uuid) -> Result<(), CoordinatorError> {
        let agents = self.registry.list_by_task(task_id).await?;
        for agent in agents {
            if !agent.status.is_terminal() {
                self.cancel(agent.agent_id).await?;
            }
        }
        Ok(())
    }
}

/// Flatten `SpawnConfig`s keyed by agent id, used by the orchestrator to
/// map executor results back onto assignments.
pub fn index_by_agent(configs: &[SpawnConfig]) -> HashMap<Uuid, &SpawnConfig> {
    configs.iter().map(|c| (c.agent_id, c)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::model_invoker::InvocationOutput;
    use crate::infrastructure::database::{connection::DatabaseConnection, AgentRegistryRepositoryImpl, FileLockRepositoryImpl};
    use async_trait::async_trait;

    struct StubInvoker {
        exit_code: i32,
        stdout: &'static str,
    }

    #[async_trait]
    impl ModelInvoker for StubInvoker {
        async fn invoke(&self, _binary: &str, _args: &[String], _prompt: &str, _timeout: Duration) -> Result<InvocationOutput, CoordinatorError> {
            Ok(InvocationOutput { exit_code: self.exit_code, stdout: self.stdout.to_string(), stderr: String::new() })
        }
    }

    async fn executor(invoker: Arc<dyn ModelInvoker>) -> (DatabaseConnection, Executor) {
        let db = DatabaseConnection::new("sqlite::memory:").await.unwrap();
        db.migrate().await.unwrap();
        let registry = Arc::new(AgentRegistry::new(Arc::new(AgentRegistryRepositoryImpl::new(db.pool().clone()))));
        let conflicts = Arc::new(ConflictManager::new(Arc::new(FileLockRepositoryImpl::new(db.pool().clone()))));
        (db, Executor::new(registry, conflicts, invoker, 5))
    }

    fn config(agent_id: Uuid) -> SpawnConfig {
        SpawnConfig {
            agent_id,
            task_id: Uuid::new_v4(),
            subtask_id: Uuid::new_v4(),
            agent_type: "implementer".into(),
            tier: ModelTier::Haiku,
            thinking_effort: None,
            prompt: "do the thing".into(),
            locks: vec![],
            dq_score: 0.7,
            cost_estimate: 0.01,
            binary: "stub".into(),
            max_turns: 50,
        }
    }

    #[tokio::test]
    async fn successful_invocation_completes_the_agent() {
        let (_db, exec) = executor(Arc::new(StubInvoker { exit_code: 0, stdout: "ok" })).await;
        let record = exec.spawn(config(Uuid::new_v4())).await.unwrap();
        assert_eq!(record.status, crate::domain::models::AgentStatus::Completed);
        assert_eq!(record.result.as_deref(), Some("ok"));
    }

    #[tokio::test]
    async fn nonzero_exit_fails_the_agent() {
        let (_db, exec) = executor(Arc::new(StubInvoker { exit_code: 1, stdout: "" })).await;
        let record = exec.spawn(config(Uuid::new_v4())).await.unwrap();
        assert_eq!(record.status, crate::domain::models::AgentStatus::Failed);
    }

    #[tokio::test]
    async fn empty_prompt_is_rejected_before_spawn() {
        let (_db, exec) = executor(Arc::new(StubInvoker { exit_code: 0, stdout: "ok" })).await;
        let mut cfg = config(Uuid::new_v4());
        cfg.prompt = "   ".into();
        let err = exec.spawn(cfg).await.unwrap_err();
        assert_eq!(err, CoordinatorError::EmptyDescription);
    }

    #[tokio::test]
    async fn oversized_prompt_is_rejected() {
        let (_db, exec) = executor(Arc::new(StubInvoker { exit_code: 0, stdout: "ok" })).await;
        let mut cfg = config(Uuid::new_v4());
        cfg.prompt = "a".repeat(MAX_PROMPT_CHARS + 1);
        let err = exec.spawn(cfg).await.unwrap_err();
        assert!(matches!(err, CoordinatorError::PromptTooLong(_)));
    }

    #[tokio::test]
    async fn locks_are_released_after_completion() {
        let (_db, exec) = executor(Arc::new(StubInvoker { exit_code: 0, stdout: "ok" })).await;
        let mut cfg = config(Uuid::new_v4());
        cfg.locks = vec![("/tmp/f.rs".into(), LockType::Write)];
        exec.spawn(cfg).await.unwrap();
        // A second agent can now acquire the same path.
        exec.conflicts.acquire("/tmp/f.rs", "someone-else", LockType::Write).await.unwrap();
    }

    struct SlowInvoker;

    #[async_trait]
    impl ModelInvoker for SlowInvoker {
        async fn invoke(&self, _binary: &str, _args: &[String], _prompt: &str, _timeout: Duration) -> Result<InvocationOutput, CoordinatorError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(InvocationOutput { exit_code: 0, stdout: String::new(), stderr: String::new() })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_mid_flight_transitions_to_cancelled_after_grace_period() {
        let (_db, exec) = executor(Arc::new(SlowInvoker)).await;
        let exec = Arc::new(exec);
        let agent_id = Uuid::new_v4();
        let cfg = config(agent_id);

        let exec2 = exec.clone();
        let handle = tokio::spawn(async move { exec2.spawn(cfg).await });

        loop {
            if exec.cancellations.lock().await.contains_key(&agent_id) {
                break;
            }
            tokio::task::yield_now().await;
        }

        exec.cancel(agent_id).await.unwrap();
        tokio::time::advance(CANCELLATION_GRACE + Duration::from_millis(1)).await;

        let record = handle.await.unwrap().unwrap();
        assert_eq!(record.status, crate::domain::models::AgentStatus::Cancelled);
    }

    #[test]
    fn timeout_modulated_by_thinking_effort() {
        let base = resolve_timeout(ModelTier::Opus, None);
        let low = resolve_timeout(ModelTier::Opus, Some(ThinkingEffort::Low));
        let max = resolve_timeout(ModelTier::Opus, Some(ThinkingEffort::Max));
        assert!(low < base);
        assert!(max > base);
    }
}
