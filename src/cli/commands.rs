//! Handlers for each [`super::Commands`] variant. Each takes the already
//! wired [`AppContext`] and whatever the subcommand's own arguments were,
//! and either prints a table or, with `--json`, a serialized value.

use anyhow::{Context, Result};
use std::io::Write;

use crate::domain::models::{AgentCapability, TaskContext};
use crate::domain::models::evolution_outcome::EvolutionWeights;
use crate::services::{complexity_analyzer, dq_scorer};
use crate::services::orchestrator::{Strategy, COST_CONFIRMATION_THRESHOLD_USD};
use crate::services::task_profiler;
use crate::AppContext;

use super::{output, progress};

/// `init`: scaffold the project config and both data silos' directories.
pub async fn handle_init(base_dir: &std::path::Path) -> Result<()> {
    let coordinator_dir = base_dir.join(".coordinator");
    let agent_core_dir = base_dir.join(".agent-core").join("storage");
    std::fs::create_dir_all(coordinator_dir.join("data")).context("failed to create .coordinator/data")?;
    std::fs::create_dir_all(&agent_core_dir).context("failed to create .agent-core/storage")?;

    let config_path = coordinator_dir.join("config.yaml");
    if !config_path.exists() {
        let defaults = crate::domain::models::config::Config::default();
        let yaml = serde_yaml::to_string(&defaults).context("failed to serialize default config")?;
        let mut file = std::fs::File::create(&config_path)
            .with_context(|| format!("failed to create {}", config_path.display()))?;
        file.write_all(yaml.as_bytes())?;
    }

    println!("Initialized coordinator project at {}", base_dir.display());
    Ok(())
}

/// No built-in agent roster is configured yet — every delegation currently
/// routes through the router's no-candidates fallback to direct execution.
fn agent_roster() -> Vec<AgentCapability> {
    Vec::new()
}

async fn run_strategy(ctx: &AppContext, task: &str, strategy: Strategy, json: bool) -> Result<()> {
    let profile = task_profiler::classify(task, TaskContext::default(), None)?;
    let _ = profile; // profiled as part of plan(); kept for early validation of the description
    let weights = EvolutionWeights::default().dq_weights;

    let plan = ctx.orchestrator.plan(task, TaskContext::default(), strategy, &agent_roster(), weights).await?;

    if plan.requires_confirmation && !confirm_cost(plan.estimated_cost)? {
        println!("Aborted: estimated cost ${:.2} exceeds the ${:.2} confirmation threshold.", plan.estimated_cost, COST_CONFIRMATION_THRESHOLD_USD);
        return Ok(());
    }

    let spinner = (!json).then(|| progress::start(format!("running {} strategy…", strategy.as_str())));

    let session = ctx.orchestrator.execute(plan, task).await?;

    if let Some(spinner) = &spinner {
        match session.status {
            crate::domain::models::SessionStatus::Success => {
                progress::finish_ok(spinner, format!("session {} succeeded", session.session_id));
            }
            crate::domain::models::SessionStatus::Cancelled => {
                progress::finish_err(spinner, format!("session {} cancelled", session.session_id));
            }
            _ => progress::finish_err(spinner, format!("session {} — {:?}", session.session_id, session.status)),
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&session)?);
    } else {
        if !session.output.is_empty() {
            println!("\n{}", session.output);
        }
        for error in &session.errors {
            eprintln!("error: {error}");
        }
    }
    Ok(())
}

fn confirm_cost(estimated_cost: f64) -> Result<bool> {
    print!("Estimated cost ${estimated_cost:.2} exceeds ${COST_CONFIRMATION_THRESHOLD_USD:.2} — proceed? [y/N] ");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(matches!(line.trim().to_lowercase().as_str(), "y" | "yes"))
}

pub async fn handle_research(ctx: &AppContext, task: String, json: bool) -> Result<()> {
    run_strategy(ctx, &task, Strategy::Research, json).await
}

pub async fn handle_implement(ctx: &AppContext, task: String, json: bool) -> Result<()> {
    run_strategy(ctx, &task, Strategy::Implement, json).await
}

pub async fn handle_review(ctx: &AppContext, task: String, json: bool) -> Result<()> {
    run_strategy(ctx, &task, Strategy::Review, json).await
}

pub async fn handle_full(ctx: &AppContext, task: String, json: bool) -> Result<()> {
    run_strategy(ctx, &task, Strategy::Full, json).await
}

pub async fn handle_team(ctx: &AppContext, task: String, json: bool) -> Result<()> {
    run_strategy(ctx, &task, Strategy::Team, json).await
}

pub async fn handle_auto(ctx: &AppContext, task: String, json: bool) -> Result<()> {
    let strategy = Strategy::infer(&task);
    run_strategy(ctx, &task, strategy, json).await
}

/// `status`: the live agent registry plus a reminder of the most recent
/// session, so an operator can see what's in flight right now.
pub async fn handle_status(ctx: &AppContext, json: bool) -> Result<()> {
    ctx.agent_registry.cleanup_completed(crate::services::agent_registry::DEFAULT_CLEANUP_AFTER_SECS).await?;
    let active = ctx.agent_registry.list_active().await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&active)?);
    } else {
        println!("{}", output::format_active_agents(&active));
    }
    Ok(())
}

/// `history [--limit N]`: recently completed sessions.
pub async fn handle_history(ctx: &AppContext, limit: u32, json: bool) -> Result<()> {
    let sessions = ctx.sessions.list_recent(limit).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&sessions)?);
    } else {
        println!("{}", output::format_sessions(&sessions));
    }
    Ok(())
}

/// `optimize [--dry-run|--apply]`: propose (the default, and with
/// `--dry-run`), or propose-and-apply with `--apply`.
pub async fn handle_optimize(ctx: &AppContext, dry_run: bool, apply: bool, json: bool) -> Result<()> {
    let proposals = ctx.optimizer.propose().await?;

    if apply && !dry_run {
        let applied = ctx.optimizer.apply(&proposals).await?;
        if json {
            println!("{}", serde_json::json!({ "applied": applied, "proposals": proposals_as_json(&proposals) }));
        } else if applied {
            println!("Applied {} proposal(s) as a new baseline version.", proposals.len());
        } else {
            println!("Nothing to apply (no proposals cleared the confidence gate).");
        }
        return Ok(());
    }

    if json {
        println!("{}", proposals_as_json(&proposals));
    } else {
        println!("{}", output::format_proposals(&proposals));
    }
    Ok(())
}

fn proposals_as_json(proposals: &[crate::services::optimizer::OptimizationProposal]) -> serde_json::Value {
    serde_json::json!(proposals
        .iter()
        .map(|p| serde_json::json!({
            "parameter": p.parameter,
            "current_value": p.current_value,
            "proposed_value": p.proposed_value,
            "confidence": p.confidence,
            "evidence_count": p.evidence_count,
            "improvement_pct": p.improvement_pct,
        }))
        .collect::<Vec<_>>())
}

/// `score <query>`: the DQ score and tier a query would route to, without
/// spending a subprocess invocation on it.
pub async fn handle_score(query: String, json: bool) -> Result<()> {
    let complexity = complexity_analyzer::analyze(&query);
    let weights = EvolutionWeights::default().dq_weights;
    let routing = dq_scorer::route(complexity, weights, |_tier| None);

    if json {
        println!(
            "{}",
            serde_json::json!({
                "complexity": complexity,
                "tier": routing.tier.as_str(),
                "thinking_effort": routing.thinking_effort.map(|t| t.as_str()),
                "dq_score": routing.score.dq_score,
            })
        );
    } else {
        println!("complexity: {:.2}", complexity);
        println!("tier:       {}", routing.tier.as_str());
        if let Some(effort) = routing.thinking_effort {
            println!("effort:     {}", effort.as_str());
        }
        println!("dq_score:   {:.3}", routing.score.dq_score);
    }
    Ok(())
}
