//! Table formatting for CLI output, generalized from the donor's
//! `comfy-table`-based formatter to the coordinator's own row types.

use comfy_table::{presets, Attribute, Cell, Color, ContentArrangement, Table};

use crate::domain::models::{AgentRecord, AgentStatus, Session, SessionStatus};
use crate::services::optimizer::OptimizationProposal;

fn base_table() -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL).set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn bold(text: &str) -> Cell {
    Cell::new(text).add_attribute(Attribute::Bold)
}

fn session_status_color(status: SessionStatus) -> Color {
    match status {
        SessionStatus::Success => Color::Green,
        SessionStatus::Partial => Color::Yellow,
        SessionStatus::Failed => Color::Red,
        SessionStatus::Cancelled => Color::DarkGrey,
    }
}

fn agent_status_color(status: AgentStatus) -> Color {
    match status {
        AgentStatus::Completed => Color::Green,
        AgentStatus::Running | AgentStatus::Pending => Color::Cyan,
        AgentStatus::Failed | AgentStatus::Timeout => Color::Red,
        AgentStatus::Cancelled => Color::DarkGrey,
    }
}

pub fn format_sessions(sessions: &[Session]) -> String {
    if sessions.is_empty() {
        return "No sessions recorded.".to_string();
    }
    let mut table = base_table();
    table.set_header(vec![
        bold("ID"),
        bold("Strategy"),
        bold("Status"),
        bold("Cost (USD)"),
        bold("Created"),
    ]);
    for session in sessions {
        table.add_row(vec![
            Cell::new(&session.session_id.to_string()[..8]),
            Cell::new(&session.strategy),
            Cell::new(format!("{:?}", session.status)).fg(session_status_color(session.status)),
            Cell::new(format!("{:.2}", session.total_cost)),
            Cell::new(session.created_at.format("%Y-%m-%d %H:%M").to_string()),
        ]);
    }
    table.to_string()
}

pub fn format_active_agents(agents: &[AgentRecord]) -> String {
    if agents.is_empty() {
        return "No active agents.".to_string();
    }
    let mut table = base_table();
    table.set_header(vec![
        bold("ID"),
        bold("Type"),
        bold("Tier"),
        bold("Status"),
        bold("Progress"),
    ]);
    for agent in agents {
        table.add_row(vec![
            Cell::new(&agent.agent_id.to_string()[..8]),
            Cell::new(&agent.agent_type),
            Cell::new(&agent.model_tier),
            Cell::new(agent.status.as_str()).fg(agent_status_color(agent.status)),
            Cell::new(format!("{:.0}%", agent.progress * 100.0)),
        ]);
    }
    table.to_string()
}

pub fn format_proposals(proposals: &[OptimizationProposal]) -> String {
    if proposals.is_empty() {
        return "No optimization proposals (insufficient evidence or no parameter cleared the confidence gate).".to_string();
    }
    let mut table = base_table();
    table.set_header(vec![
        bold("Parameter"),
        bold("Current"),
        bold("Proposed"),
        bold("Confidence"),
        bold("Evidence"),
        bold("Improvement"),
    ]);
    for p in proposals {
        table.add_row(vec![
            Cell::new(&p.parameter),
            Cell::new(format!("{:.3}", p.current_value)),
            Cell::new(format!("{:.3}", p.proposed_value)),
            Cell::new(format!("{:.2}", p.confidence)),
            Cell::new(p.evidence_count.to_string()),
            Cell::new(format!("{:.1}%", p.improvement_pct)),
        ]);
    }
    table.to_string()
}
