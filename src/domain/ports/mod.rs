//! Hexagonal ports: the traits `infrastructure` implements and `services`
//! depend on. Nothing here knows whether it's backed by `SQLite`, a
//! subprocess, or an in-memory stub.

pub mod classifier;
pub mod event_sink;
pub mod model_invoker;
pub mod repositories;

pub use classifier::Classifier;
pub use event_sink::{CoordinatorEvent, CoordinatorEventType, EventOutcome, EventSink, NullEventSink};
pub use model_invoker::{InvocationOutput, ModelInvoker};
pub use repositories::{
    AgentRegistryRepository, BaselineRepository, DelegationRepository, DqScoreRepository,
    EvolutionRepository, FileLockRepository, OutcomeRepository, PatternRepository,
    SessionRepository, TrustRepository,
};
