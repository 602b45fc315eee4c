//! Coordinator CLI entry point.

use anyhow::{Context, Result};
use clap::Parser;

use coordinator::cli::{commands, Cli, Commands};
use coordinator::infrastructure::config::ConfigLoader;
use coordinator::AppContext;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // `init` scaffolds the project before any config/database exists, so it
    // runs before we try to load either.
    if matches!(cli.command, Commands::Init) {
        return commands::handle_init(&cli.base_dir).await;
    }

    let config_path = cli.base_dir.join(".coordinator").join("config.yaml");
    let config = if config_path.exists() {
        ConfigLoader::load_from_file(&config_path)
            .with_context(|| format!("failed to load configuration from {}", config_path.display()))?
    } else {
        ConfigLoader::load().context("failed to load configuration")?
    };

    let ctx = AppContext::build(config, &cli.base_dir)
        .await
        .context("failed to initialize coordinator")?;

    let result = dispatch(&ctx, cli.command, cli.json).await;

    ctx.close().await;
    result
}

async fn dispatch(ctx: &AppContext, command: Commands, json: bool) -> Result<()> {
    match command {
        Commands::Init => unreachable!("init is handled before AppContext is built"),
        Commands::Research { task } => commands::handle_research(ctx, task, json).await,
        Commands::Implement { task } => commands::handle_implement(ctx, task, json).await,
        Commands::Review { task } => commands::handle_review(ctx, task, json).await,
        Commands::Full { task } => commands::handle_full(ctx, task, json).await,
        Commands::Team { task } => commands::handle_team(ctx, task, json).await,
        Commands::Auto { task } => commands::handle_auto(ctx, task, json).await,
        Commands::Status => commands::handle_status(ctx, json).await,
        Commands::History { limit } => commands::handle_history(ctx, limit, json).await,
        Commands::Optimize { dry_run, apply } => commands::handle_optimize(ctx, dry_run, apply, json).await,
        Commands::Score { query } => commands::handle_score(query, json).await,
    }
}
