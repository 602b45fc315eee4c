//! Best-effort audit trail for coordination decisions.
//!
//! Implements [`EventSink`] by appending newline-delimited JSON to a log
//! file and mirroring each event through `tracing`. Writes never fail the
//! calling path: any I/O error is logged as a warning and swallowed.

use async_trait::async_trait;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

use crate::domain::ports::event_sink::{CoordinatorEvent, EventSink};

/// Audit logger writing one JSON line per [`CoordinatorEvent`].
#[derive(Clone)]
pub struct AuditLogger {
    log_file: Arc<Mutex<std::fs::File>>,
}

impl AuditLogger {
    /// Open (creating parent directories and the file if needed) an audit
    /// log at `log_path`, appending to any existing content.
    pub async fn new(log_path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let log_path = log_path.as_ref();

        if let Some(parent) = log_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let file = OpenOptions::new().create(true).append(true).open(log_path)?;

        Ok(Self { log_file: Arc::new(Mutex::new(file)) })
    }

    fn write_line(&self, json: &str) -> anyhow::Result<()> {
        let mut file = self
            .log_file
            .lock()
            .map_err(|e| anyhow::anyhow!("audit log mutex poisoned: {e}"))?;
        writeln!(file, "{json}")?;
        file.flush()?;
        Ok(())
    }
}

#[async_trait]
impl EventSink for AuditLogger {
    async fn log(&self, event: CoordinatorEvent) {
        let json = match serde_json::to_string(&event) {
            Ok(j) => j,
            Err(e) => {
                warn!(error = %e, "failed to serialize audit event");
                return;
            }
        };

        if let Err(e) = self.write_line(&json) {
            warn!(error = %e, "failed to write audit event");
        }

        info!(
            event_type = ?event.event_type,
            operation = %event.operation,
            actor = %event.actor,
            resource_id = ?event.resource_id,
            outcome = ?event.outcome,
            "audit event"
        );
    }
}
