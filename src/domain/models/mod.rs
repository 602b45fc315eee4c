//! Pure domain entities: the coordinator's data model plus configuration.
//!
//! Framework-agnostic — no SQL, no subprocess handling, no CLI parsing.

pub mod agent_capability;
pub mod agent_record;
pub mod assignment;
pub mod baseline;
pub mod config;
pub mod delegation_event;
pub mod dq_score;
pub mod evolution_outcome;
pub mod file_lock;
pub mod outcome;
pub mod pattern;
pub mod session;
pub mod subtask;
pub mod task_profile;
pub mod tier;

pub use agent_capability::{AgentCapability, DIRECT_EXECUTION};
pub use agent_record::{AgentRecord, AgentState, AgentStatus};
pub use assignment::{Assignment, FallbackCandidate};
pub use baseline::Baseline;
pub use config::Config;
pub use delegation_event::DelegationEvent;
pub use dq_score::DqScoreRecord;
pub use evolution_outcome::{EvolutionOutcome, EvolutionWeights};
pub use file_lock::{FileLock, LockType};
pub use outcome::{Outcome, OutcomeKind};
pub use pattern::PatternDetection;
pub use session::{Session, SessionStatus};
pub use subtask::{SubTask, VerificationMethod};
pub use task_profile::{TaskContext, TaskProfile};
pub use tier::{ModelTier, ThinkingEffort};
