//! Subprocess-backed [`ModelInvoker`]: shells out to the `claude` CLI in
//! print mode, piping the prompt over stdin and capturing stdout/stderr
//! under a caller-supplied timeout.

use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tokio::time::{timeout, Duration};

use crate::domain::error::CoordinatorError;
use crate::domain::ports::{InvocationOutput, ModelInvoker};

/// Invokes `claude --print --output-format json`, matching the executor's
/// prompt-over-stdin contract.
pub struct ClaudeInvoker;

impl ClaudeInvoker {
    pub const fn new() -> Self {
        Self
    }
}

impl Default for ClaudeInvoker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ModelInvoker for ClaudeInvoker {
    async fn invoke(
        &self,
        binary: &str,
        args: &[String],
        prompt: &str,
        deadline: Duration,
    ) -> Result<InvocationOutput, CoordinatorError> {
        let mut cmd = Command::new(binary);
        cmd.args(args)
            .arg("--print")
            .arg("--output-format")
            .arg("json")
            .arg("--dangerously-skip-permissions")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // cancellation drops this future from outside; without kill_on_drop the child
            // would be orphaned instead of terminated.
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .map_err(|e| CoordinatorError::BinaryUnavailable(format!("{binary}: {e}")))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| CoordinatorError::Storage("failed to open claude stdin".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| CoordinatorError::Storage("failed to open claude stdout".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| CoordinatorError::Storage("failed to open claude stderr".to_string()))?;

        stdin
            .write_all(prompt.as_bytes())
            .await
            .map_err(|e| CoordinatorError::Storage(format!("failed to write prompt: {e}")))?;
        drop(stdin);

        let result = timeout(deadline, async {
            let mut stdout_reader = BufReader::new(stdout);
            let mut out = String::new();
            let mut line = String::new();
            while stdout_reader.read_line(&mut line).await.map_err(|e| e.to_string())? > 0 {
                out.push_str(&line);
                line.clear();
            }

            let mut stderr_reader = BufReader::new(stderr);
            let mut err = String::new();
            let mut error_line = String::new();
            while stderr_reader.read_line(&mut error_line).await.map_err(|e| e.to_string())? > 0 {
                err.push_str(&error_line);
                error_line.clear();
            }

            let status = child.wait().await.map_err(|e| e.to_string())?;
            Ok::<_, String>((out, err, status))
        })
        .await;

        match result {
            Ok(Ok((stdout, stderr, status))) => Ok(InvocationOutput {
                exit_code: status.code().unwrap_or(-1),
                stdout,
                stderr,
            }),
            Ok(Err(e)) => Err(CoordinatorError::Storage(e)),
            Err(_) => {
                let _ = child.kill().await;
                Err(CoordinatorError::Storage("claude invocation timed out".to_string()))
            }
        }
    }
}
