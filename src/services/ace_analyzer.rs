//! ACE consensus engine: six pure analyses over a session transcript,
//! synthesized into one DQ-weighted consensus with the outcome detector
//! holding veto-like authority via a doubled vote weight.

use std::collections::BTreeMap;

use crate::domain::models::evolution_outcome::DqWeights;
use crate::domain::models::OutcomeKind;

/// The DQ weighting this analyzer applies internally — fixed at
/// `{validity: 0.4, specificity: 0.3, correctness: 0.3}`, distinct from the
/// baseline-tunable [`DqWeights`] the router uses, since this consensus
/// step is itself one of the optimizer's *inputs*, not a routing decision.
pub const ANALYZER_DQ_WEIGHTS: DqWeights = DqWeights { validity: 0.4, specificity: 0.3, correctness: 0.3 };

#[derive(Debug, Clone, Default)]
pub struct ToolUse {
    pub name: String,
}

/// A session transcript as recorded for post-hoc analysis.
#[derive(Debug, Clone, Default)]
pub struct SessionTranscript {
    pub messages: Vec<String>,
    pub errors: Vec<String>,
    pub tools: Vec<ToolUse>,
    pub model: Option<String>,
}

/// Output of one of the six pure analyses.
#[derive(Debug, Clone)]
pub struct AnalysisResult {
    pub agent_name: &'static str,
    pub summary: String,
    pub dq_score: f64,
    pub confidence: f64,
    pub data: BTreeMap<String, AnalysisValue>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisValue {
    Text(String),
    Number(f64),
}

fn has_tool(tools: &[ToolUse], name: &str) -> bool {
    tools.iter().any(|t| t.name == name)
}

fn dq(validity: f64, specificity: f64, correctness: f64) -> f64 {
    ANALYZER_DQ_WEIGHTS.validity * validity
        + ANALYZER_DQ_WEIGHTS.specificity * specificity
        + ANALYZER_DQ_WEIGHTS.correctness * correctness
}

/// Heuristic outcome classification: many errors → `error`; very short
/// sessions → `abandoned`; read-only tool use → `research`; any write →
/// `success` or `partial` depending on error volume; else `partial`.
pub fn detect_outcome(session: &SessionTranscript) -> AnalysisResult {
    let writes = has_tool(&session.tools, "Write") || has_tool(&session.tools, "Edit");
    let reads_only = has_tool(&session.tools, "Read") && !writes;

    let (outcome, validity) = if session.errors.len() > 5 {
        (OutcomeKind::Error, 0.7)
    } else if session.messages.len() < 5 {
        (OutcomeKind::Abandoned, 0.5)
    } else if reads_only {
        (OutcomeKind::Research, 0.8)
    } else if writes {
        if session.errors.len() < 3 { (OutcomeKind::Success, 0.7) } else { (OutcomeKind::Partial, 0.7) }
    } else {
        (OutcomeKind::Partial, 0.5)
    };

    let mut data = BTreeMap::new();
    data.insert("outcome".to_string(), AnalysisValue::Text(outcome_label(outcome).to_string()));

    AnalysisResult {
        agent_name: "outcome_detector",
        summary: format!("outcome: {}", outcome_label(outcome)),
        dq_score: dq(validity, 0.6, 0.0),
        confidence: 0.7,
        data,
    }
}

const fn outcome_label(outcome: OutcomeKind) -> &'static str {
    match outcome {
        OutcomeKind::Success => "success",
        OutcomeKind::Partial => "partial",
        OutcomeKind::Failed => "failed",
        OutcomeKind::Research => "research",
        OutcomeKind::Abandoned => "abandoned",
        OutcomeKind::Error => "error",
        OutcomeKind::Unknown => "unknown",
    }
}

/// Quality on a 1-5 scale, keyed off the error-to-message ratio.
pub fn score_quality(session: &SessionTranscript) -> AnalysisResult {
    let error_rate = session.errors.len() as f64 / (session.messages.len().max(1) as f64);

    let (quality, correctness) =
        if error_rate < 0.1 { (4.5, 0.8) } else if error_rate < 0.2 { (3.5, 0.6) } else { (2.5, 0.4) };

    let mut data = BTreeMap::new();
    data.insert("quality".to_string(), AnalysisValue::Number(quality));

    AnalysisResult {
        agent_name: "quality_scorer",
        summary: format!("quality: {quality}/5"),
        dq_score: dq(0.0, 0.6, correctness),
        confidence: 0.7,
        data,
    }
}

/// Complexity banded on message/tool-call volume, distinct from
/// [`crate::services::complexity_analyzer::analyze`] (which scores query
/// *text*, not a finished session transcript).
pub fn analyze_complexity(session: &SessionTranscript) -> AnalysisResult {
    let msg_count = session.messages.len();
    let tool_count = session.tools.len();

    let (complexity, specificity) = if msg_count > 50 || tool_count > 30 {
        (0.8, 0.8)
    } else if msg_count > 20 || tool_count > 15 {
        (0.5, 0.6)
    } else {
        (0.3, 0.5)
    };

    let mut data = BTreeMap::new();
    data.insert("complexity".to_string(), AnalysisValue::Number(complexity));

    AnalysisResult {
        agent_name: "complexity_analyzer",
        summary: format!("complexity: {:.0}%", complexity * 100.0),
        dq_score: dq(0.6, specificity, 0.0),
        confidence: 0.6,
        data,
    }
}

/// Whether the model tier used fit the apparent complexity of the session.
pub fn assess_model_efficiency(session: &SessionTranscript) -> AnalysisResult {
    let model = session.model.as_deref().unwrap_or("unknown").to_lowercase();
    let complexity = if session.messages.len() < 20 { 0.5 } else { 0.7 };

    let (efficiency, optimal) = if model.contains("opus") {
        if complexity > 0.6 { (0.9, "opus") } else { (0.5, "sonnet") }
    } else if model.contains("sonnet") {
        (0.8, "sonnet")
    } else if model.contains("haiku") {
        if complexity <= 0.5 { (0.7, "haiku") } else { (0.4, "sonnet") }
    } else {
        (0.5, "unknown")
    };

    let mut data = BTreeMap::new();
    data.insert("efficiency".to_string(), AnalysisValue::Number(efficiency));
    data.insert("optimal_model".to_string(), AnalysisValue::Text(optimal.to_string()));

    AnalysisResult {
        agent_name: "model_efficiency",
        summary: format!("efficiency: {:.0}%", efficiency * 100.0),
        dq_score: dq(0.6, 0.0, efficiency),
        confidence: 0.6,
        data,
    }
}

/// Productive (write/edit) vs exploratory (read/grep/glob) tool-use ratio.
pub fn analyze_productivity(session: &SessionTranscript) -> AnalysisResult {
    let productive =
        session.tools.iter().filter(|t| t.name == "Write" || t.name == "Edit").count();
    let exploratory =
        session.tools.iter().filter(|t| ["Read", "Grep", "Glob"].contains(&t.name.as_str())).count();

    let productivity_score = if productive > 0 {
        productive as f64 / (productive + exploratory).max(1) as f64
    } else {
        0.3
    };

    let level = if productivity_score > 0.6 { "high" } else if productivity_score > 0.3 { "moderate" } else { "low" };

    let mut data = BTreeMap::new();
    data.insert("productivity_score".to_string(), AnalysisValue::Number(productivity_score));
    data.insert("level".to_string(), AnalysisValue::Text(level.to_string()));

    AnalysisResult {
        agent_name: "productivity_analyzer",
        summary: format!("productivity: {level}"),
        dq_score: dq(0.6, productivity_score, 0.0),
        confidence: 0.6,
        data,
    }
}

/// Whether the routing decision (tier vs apparent complexity) looks sound
/// in hindsight.
pub fn assess_routing_quality(session: &SessionTranscript) -> AnalysisResult {
    let model = session.model.as_deref().unwrap_or("unknown").to_lowercase();
    let complexity = if session.messages.len() < 20 { 0.5 } else { 0.7 };

    let routing_quality = if model.contains("opus") && complexity > 0.6 {
        0.9
    } else if model.contains("sonnet") && complexity > 0.3 && complexity < 0.7 {
        0.8
    } else if model.contains("haiku") && complexity < 0.4 {
        0.8
    } else {
        0.5
    };

    let mut data = BTreeMap::new();
    data.insert("routing_quality".to_string(), AnalysisValue::Number(routing_quality));

    AnalysisResult {
        agent_name: "routing_quality",
        summary: format!("routing quality: {:.0}%", routing_quality * 100.0),
        dq_score: dq(routing_quality, 0.6, 0.0),
        confidence: 0.6,
        data,
    }
}

/// Run all six analyses.
pub fn analyze_all(session: &SessionTranscript) -> Vec<AnalysisResult> {
    vec![
        detect_outcome(session),
        score_quality(session),
        analyze_complexity(session),
        assess_model_efficiency(session),
        analyze_productivity(session),
        assess_routing_quality(session),
    ]
}

/// The final synthesized consensus.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsensusResult {
    pub outcome: String,
    pub quality: f64,
    pub complexity: f64,
    pub model_efficiency: f64,
    pub dq_score: f64,
    pub confidence: f64,
}

fn number_field(result: &AnalysisResult, key: &str, default: f64) -> f64 {
    match result.data.get(key) {
        Some(AnalysisValue::Number(n)) => *n,
        _ => default,
    }
}

fn text_field(result: &AnalysisResult, key: &str, default: &str) -> String {
    match result.data.get(key) {
        Some(AnalysisValue::Text(t)) => t.clone(),
        _ => default.to_string(),
    }
}

/// Weighted vote across all analyses: each contributes `dq_score ·
/// confidence`, with the outcome detector's weight doubled since it has
/// primary authority over the outcome field. Overall confidence is
/// `0.6·mean(dq) + 0.4·mean(confidence)` across all (unweighted) results.
pub fn synthesize_consensus(results: &[AnalysisResult]) -> ConsensusResult {
    if results.is_empty() {
        return ConsensusResult { outcome: "unknown".to_string(), quality: 3.0, complexity: 0.5, model_efficiency: 0.5, dq_score: 0.5, confidence: 0.3 };
    }

    let mut outcome = "unknown".to_string();
    let mut quality = 3.0;
    let mut complexity = 0.5;
    let mut model_efficiency = 0.5;

    let mut total_dq = 0.0;
    let mut total_weight = 0.0;

    for result in results {
        let mut weight = result.dq_score * result.confidence;

        if result.agent_name == "outcome_detector" {
            outcome = text_field(result, "outcome", "unknown");
            weight *= 2.0;
        }
        if result.agent_name == "quality_scorer" {
            quality = number_field(result, "quality", 3.0);
        }
        if result.agent_name == "complexity_analyzer" {
            complexity = number_field(result, "complexity", 0.5);
        }
        if result.agent_name == "model_efficiency" {
            model_efficiency = number_field(result, "efficiency", 0.5);
        }

        total_dq += result.dq_score * weight;
        total_weight += weight;
    }

    let overall_dq = if total_weight > 0.0 { total_dq / total_weight } else { 0.5 };

    let avg_dq = results.iter().map(|r| r.dq_score).sum::<f64>() / results.len() as f64;
    let avg_conf = results.iter().map(|r| r.confidence).sum::<f64>() / results.len() as f64;
    let confidence = (0.6 * avg_dq + 0.4 * avg_conf).clamp(0.0, 1.0);

    ConsensusResult { outcome, quality, complexity, model_efficiency, dq_score: overall_dq, confidence }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool(name: &str) -> ToolUse {
        ToolUse { name: name.to_string() }
    }

    #[test]
    fn many_errors_detected_as_error_outcome() {
        let session = SessionTranscript {
            messages: vec!["m".to_string(); 10],
            errors: vec!["e".to_string(); 6],
            ..Default::default()
        };
        let result = detect_outcome(&session);
        assert_eq!(text_field(&result, "outcome", ""), "error");
    }

    #[test]
    fn short_session_detected_as_abandoned() {
        let session = SessionTranscript { messages: vec!["m".to_string(); 2], ..Default::default() };
        let result = detect_outcome(&session);
        assert_eq!(text_field(&result, "outcome", ""), "abandoned");
    }

    #[test]
    fn read_only_session_detected_as_research() {
        let session = SessionTranscript {
            messages: vec!["m".to_string(); 10],
            tools: vec![tool("Read"), tool("Read")],
            ..Default::default()
        };
        let result = detect_outcome(&session);
        assert_eq!(text_field(&result, "outcome", ""), "research");
    }

    #[test]
    fn writes_with_few_errors_detected_as_success() {
        let session = SessionTranscript {
            messages: vec!["m".to_string(); 10],
            tools: vec![tool("Write")],
            ..Default::default()
        };
        let result = detect_outcome(&session);
        assert_eq!(text_field(&result, "outcome", ""), "success");
    }

    #[test]
    fn quality_scorer_rewards_low_error_rate() {
        let session = SessionTranscript { messages: vec!["m".to_string(); 100], errors: vec![], ..Default::default() };
        let result = score_quality(&session);
        assert_eq!(number_field(&result, "quality", 0.0), 4.5);
    }

    #[test]
    fn productivity_favors_write_over_read() {
        let writey = SessionTranscript { tools: vec![tool("Write"), tool("Edit")], ..Default::default() };
        let ready = SessionTranscript { tools: vec![tool("Read"), tool("Grep")], ..Default::default() };
        let w = analyze_productivity(&writey);
        let r = analyze_productivity(&ready);
        assert!(number_field(&w, "productivity_score", 0.0) > number_field(&r, "productivity_score", 0.0));
    }

    #[test]
    fn outcome_detector_gets_double_weight_in_consensus() {
        let session = SessionTranscript {
            messages: vec!["m".to_string(); 10],
            tools: vec![tool("Write")],
            ..Default::default()
        };
        let results = analyze_all(&session);
        let consensus = synthesize_consensus(&results);
        assert_eq!(consensus.outcome, "success");
    }

    #[test]
    fn empty_results_yields_default_consensus() {
        let consensus = synthesize_consensus(&[]);
        assert_eq!(consensus.outcome, "unknown");
        assert_eq!(consensus.confidence, 0.3);
    }

    #[test]
    fn confidence_is_clamped_to_unit_interval() {
        let results = vec![AnalysisResult {
            agent_name: "x",
            summary: String::new(),
            dq_score: 1.0,
            confidence: 1.0,
            data: BTreeMap::new(),
        }];
        let consensus = synthesize_consensus(&results);
        assert!(consensus.confidence <= 1.0);
    }
}
