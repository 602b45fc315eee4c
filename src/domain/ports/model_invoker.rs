//! Pluggable subprocess dispatch — the executor's only dependency on an
//! actual language-model binary.

use async_trait::async_trait;
use std::time::Duration;

use crate::domain::error::CoordinatorError;

/// The result of one subprocess invocation.
#[derive(Debug, Clone)]
pub struct InvocationOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl InvocationOutput {
    pub const fn succeeded(&self) -> bool {
        self.exit_code == 0
    }
}

/// `invoke(binary, args, prompt, timeout) -> (exit_code, stdout, stderr)`.
///
/// Production wires this to an actual `claude` subprocess; tests provide a
/// deterministic stub that returns canned output without spawning anything.
#[async_trait]
pub trait ModelInvoker: Send + Sync {
    async fn invoke(
        &self,
        binary: &str,
        args: &[String],
        prompt: &str,
        timeout: Duration,
    ) -> Result<InvocationOutput, CoordinatorError>;
}
