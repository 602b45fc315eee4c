//! Pure coordination logic and orchestration. Everything here is
//! storage-agnostic except where a service explicitly wraps a repository
//! port (trust ledger, agent registry, conflict manager, orchestrator,
//! optimizer, evolution) — the rest are free functions over plain data.

pub mod ace_analyzer;
pub mod agent_registry;
pub mod complexity_analyzer;
pub mod conflict_manager;
pub mod decomposer;
pub mod dq_scorer;
pub mod entropy_allocator;
pub mod evolution;
pub mod executor;
pub mod four_ds_gates;
pub mod guardrails;
pub mod optimizer;
pub mod orchestrator;
pub mod pattern_detector;
pub mod router;
pub mod task_profiler;
pub mod topology;
pub mod trust_ledger;

pub use agent_registry::AgentRegistry;
pub use conflict_manager::ConflictManager;
pub use evolution::EvolutionEngine;
pub use executor::Executor;
pub use optimizer::Optimizer;
pub use orchestrator::Orchestrator;
pub use trust_ledger::TrustLedger;
