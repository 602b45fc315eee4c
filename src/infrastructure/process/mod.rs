//! Subprocess infrastructure: the one concrete [`crate::domain::ports::ModelInvoker`]
//! that actually shells out to the `claude` CLI.

pub mod claude_invoker;

pub use claude_invoker::ClaudeInvoker;
