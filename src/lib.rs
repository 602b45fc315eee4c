//! A multi-agent task coordinator: profiles a task, decomposes it into
//! subtasks, routes each to a model tier and a delegate agent by a
//! decision-quality score, runs delegations under file-lock conflict
//! management and bounded subprocess parallelism, and folds results back
//! into a Bayesian trust ledger and a self-optimization loop.

pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::domain::models::config::Config;
use crate::domain::ports::{EventSink, SessionRepository};
use crate::infrastructure::database::{
    AgentRegistryRepositoryImpl, BaselineRepositoryImpl, DatabaseConnection, DelegationRepositoryImpl,
    DqScoreRepositoryImpl, EvolutionRepositoryImpl, FileLockRepositoryImpl, OutcomeRepositoryImpl,
    PatternRepositoryImpl, SessionRepositoryImpl, TrustRepositoryImpl,
};
use crate::infrastructure::logging::AuditLogger;
use crate::infrastructure::process::ClaudeInvoker;
use crate::services::{AgentRegistry, ConflictManager, EvolutionEngine, Executor, Optimizer, Orchestrator, TrustLedger};

/// Every wired-up dependency a CLI command needs, assembled once at
/// startup from a loaded [`Config`]. Two `SQLite` pools back two logical
/// data silos (coordinator state, agent-core trust/evolution state); every
/// service is handed the `Arc<dyn Trait>` it depends on rather than
/// reaching for a global.
pub struct AppContext {
    pub config: Config,
    pub coordinator_db: DatabaseConnection,
    pub agent_core_db: DatabaseConnection,
    pub orchestrator: Orchestrator,
    pub optimizer: Optimizer,
    pub evolution: EvolutionEngine,
    pub trust: Arc<TrustLedger>,
    pub agent_registry: Arc<AgentRegistry>,
    pub conflicts: Arc<ConflictManager>,
    pub dq_scores: Arc<DqScoreRepositoryImpl>,
    pub patterns: Arc<PatternRepositoryImpl>,
    pub events: Arc<dyn EventSink>,
    pub sessions: Arc<dyn SessionRepository>,
}

impl AppContext {
    /// Open both data silos, run migrations, and wire every service.
    /// `base_dir` is the project root the `.coordinator/` and
    /// `.agent-core/` trees hang off of (normally the current directory).
    pub async fn build(config: Config, base_dir: impl AsRef<Path>) -> Result<Self> {
        let base_dir = base_dir.as_ref();

        let coordinator_db = open_silo(base_dir, &config.database.path).await?;
        let agent_core_db = open_silo(base_dir, &config.agent_core_database.path).await?;

        let sessions = Arc::new(SessionRepositoryImpl::new(coordinator_db.pool().clone()));
        let delegations = Arc::new(DelegationRepositoryImpl::new(coordinator_db.pool().clone()));
        let outcomes = Arc::new(OutcomeRepositoryImpl::new(coordinator_db.pool().clone()));
        let dq_scores = Arc::new(DqScoreRepositoryImpl::new(coordinator_db.pool().clone()));
        let patterns = Arc::new(PatternRepositoryImpl::new(coordinator_db.pool().clone()));
        let locks = Arc::new(FileLockRepositoryImpl::new(coordinator_db.pool().clone()));
        let agent_records = Arc::new(AgentRegistryRepositoryImpl::new(coordinator_db.pool().clone()));

        let trust_repo = Arc::new(TrustRepositoryImpl::new(agent_core_db.pool().clone()));
        let baselines = Arc::new(BaselineRepositoryImpl::new(agent_core_db.pool().clone()));
        let evolution_repo = Arc::new(EvolutionRepositoryImpl::new(agent_core_db.pool().clone()));

        let audit_path = base_dir.join(".coordinator").join("audit.jsonl");
        let events: Arc<dyn EventSink> = Arc::new(
            AuditLogger::new(&audit_path)
                .await
                .with_context(|| format!("failed to open audit log at {}", audit_path.display()))?,
        );

        let trust = Arc::new(TrustLedger::new(trust_repo));
        let agent_registry = Arc::new(AgentRegistry::new(agent_records));
        let conflicts = Arc::new(ConflictManager::new(locks));
        let invoker = Arc::new(ClaudeInvoker::new());
        let executor =
            Arc::new(Executor::new(agent_registry.clone(), conflicts.clone(), invoker, config.executor.max_workers));

        let orchestrator = Orchestrator::new(
            sessions.clone(),
            delegations,
            outcomes.clone(),
            evolution_repo.clone(),
            patterns.clone(),
            dq_scores.clone(),
            trust.clone(),
            executor,
            events.clone(),
        );
        let optimizer = Optimizer::new(outcomes, baselines);
        let evolution = EvolutionEngine::new(evolution_repo);

        Ok(Self {
            config,
            coordinator_db,
            agent_core_db,
            orchestrator,
            optimizer,
            evolution,
            trust,
            agent_registry,
            conflicts,
            dq_scores,
            patterns,
            events,
            sessions,
        })
    }

    pub async fn close(&self) {
        self.coordinator_db.close().await;
        self.agent_core_db.close().await;
    }
}

async fn open_silo(base_dir: &Path, relative_path: &str) -> Result<DatabaseConnection> {
    let path = base_dir.join(relative_path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create database directory {}", parent.display()))?;
    }
    let url = format!("sqlite://{}", path.display());
    let db = DatabaseConnection::new(&url).await?;
    db.migrate().await?;
    Ok(db)
}
