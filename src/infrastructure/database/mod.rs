//! Database infrastructure: `SQLite` via `sqlx`, WAL mode, one repository
//! adapter per `domain::ports::repositories` trait.

pub mod agent_registry_repo;
pub mod baseline_repo;
pub mod connection;
pub mod delegation_repo;
pub mod dq_score_repo;
pub mod errors;
pub mod evolution_repo;
pub mod file_lock_repo;
pub mod outcome_repo;
pub mod pattern_repo;
pub mod session_repo;
pub mod trust_repo;
pub mod utils;

pub use agent_registry_repo::AgentRegistryRepositoryImpl;
pub use baseline_repo::BaselineRepositoryImpl;
pub use connection::DatabaseConnection;
pub use delegation_repo::DelegationRepositoryImpl;
pub use dq_score_repo::DqScoreRepositoryImpl;
pub use evolution_repo::EvolutionRepositoryImpl;
pub use file_lock_repo::FileLockRepositoryImpl;
pub use outcome_repo::OutcomeRepositoryImpl;
pub use pattern_repo::PatternRepositoryImpl;
pub use session_repo::SessionRepositoryImpl;
pub use trust_repo::TrustRepositoryImpl;
