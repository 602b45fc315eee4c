//! Command-line interface: the one externally-named interface this crate
//! owns end-to-end. Thin `clap` dispatch over `AppContext`'s services —
//! see `commands` for the actual handlers.

pub mod commands;
pub mod output;
pub mod progress;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "coordinator", version, about = "Multi-agent task coordinator")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Emit machine-readable JSON instead of formatted tables.
    #[arg(long, global = true)]
    pub json: bool,

    /// Project root the `.coordinator/` and `.agent-core/` trees hang off.
    #[arg(long, global = true, default_value = ".")]
    pub base_dir: std::path::PathBuf,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scaffold `.coordinator/config.yaml` and the two `SQLite` data silos.
    Init,
    /// Investigate only; no write locks are requested.
    Research {
        task: String,
    },
    /// Decompose and execute without a prior research pass.
    Implement {
        task: String,
    },
    /// Review existing output or code; read-only.
    Review {
        task: String,
    },
    /// Research first, then implement using its findings.
    Full {
        task: String,
    },
    /// A named multi-agent team collaborates on one task.
    Team {
        task: String,
    },
    /// Infer the strategy from the task description.
    Auto {
        task: String,
    },
    /// Show active agents and recent session summaries.
    Status,
    /// Show recently completed sessions.
    History {
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },
    /// Run the self-optimization feedback loop.
    Optimize {
        /// Show proposals without applying them (the default).
        #[arg(long)]
        dry_run: bool,
        /// Apply the generated proposals as a new baseline version.
        #[arg(long)]
        apply: bool,
    },
    /// Score a query's decision-quality/tier routing without executing it.
    Score {
        query: String,
    },
}
