//! Safety guardrails: pure predicate checks over cost, duration, file
//! scope, and heartbeat staleness, each reporting one of `{continue, warn,
//! kill}`. 80% of a limit is a warning; 100% is a kill.

use chrono::{DateTime, Utc};
use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardrailAction {
    Continue,
    Warn,
    Kill,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GuardrailResult {
    pub passed: bool,
    pub violation: Option<String>,
    pub action: GuardrailAction,
}

impl GuardrailResult {
    const fn ok() -> Self {
        Self { passed: true, violation: None, action: GuardrailAction::Continue }
    }
}

/// Limits a session is checked against. `max_cost: None` skips the cost
/// check entirely rather than treating it as zero.
#[derive(Debug, Clone)]
pub struct Guardrails {
    pub max_cost: Option<f64>,
    pub max_duration_secs: i64,
    pub allowed_globs: Option<Vec<String>>,
    pub heartbeat_timeout_secs: i64,
}

impl Default for Guardrails {
    fn default() -> Self {
        Self { max_cost: None, max_duration_secs: 300, allowed_globs: None, heartbeat_timeout_secs: 60 }
    }
}

impl Guardrails {
    pub fn check_cost(&self, current_cost: f64) -> GuardrailResult {
        let Some(max_cost) = self.max_cost else {
            return GuardrailResult::ok();
        };

        if current_cost > max_cost {
            return GuardrailResult {
                passed: false,
                violation: Some(format!("cost limit exceeded: {current_cost:.2} > {max_cost:.2}")),
                action: GuardrailAction::Kill,
            };
        }

        if current_cost >= max_cost * 0.8 {
            return GuardrailResult {
                passed: true,
                violation: Some(format!("cost approaching limit: {current_cost:.2} / {max_cost:.2}")),
                action: GuardrailAction::Warn,
            };
        }

        GuardrailResult::ok()
    }

    pub fn check_duration(&self, elapsed_secs: i64) -> GuardrailResult {
        if elapsed_secs > self.max_duration_secs {
            return GuardrailResult {
                passed: false,
                violation: Some(format!(
                    "duration limit exceeded: {elapsed_secs}s > {}s",
                    self.max_duration_secs
                )),
                action: GuardrailAction::Kill,
            };
        }

        if elapsed_secs as f64 >= self.max_duration_secs as f64 * 0.8 {
            return GuardrailResult {
                passed: true,
                violation: Some(format!(
                    "duration approaching limit: {elapsed_secs}s / {}s",
                    self.max_duration_secs
                )),
                action: GuardrailAction::Warn,
            };
        }

        GuardrailResult::ok()
    }

    pub fn check_scope(&self, file_path: &str) -> GuardrailResult {
        let Some(globs) = &self.allowed_globs else {
            return GuardrailResult::ok();
        };

        if globs.iter().any(|pattern| glob_match(file_path, pattern)) {
            return GuardrailResult::ok();
        }

        GuardrailResult {
            passed: false,
            violation: Some(format!("file path outside allowed scope: {file_path}")),
            action: GuardrailAction::Kill,
        }
    }

    pub fn check_heartbeat(&self, last_heartbeat: DateTime<Utc>, now: DateTime<Utc>) -> GuardrailResult {
        let elapsed = (now - last_heartbeat).num_seconds();

        if elapsed > self.heartbeat_timeout_secs {
            return GuardrailResult {
                passed: false,
                violation: Some(format!("heartbeat timeout: {elapsed}s since last heartbeat")),
                action: GuardrailAction::Kill,
            };
        }

        if elapsed as f64 >= self.heartbeat_timeout_secs as f64 * 0.8 {
            return GuardrailResult {
                passed: true,
                violation: Some(format!(
                    "heartbeat approaching timeout: {elapsed}s / {}s",
                    self.heartbeat_timeout_secs
                )),
                action: GuardrailAction::Warn,
            };
        }

        GuardrailResult::ok()
    }

    /// Run all four checks; the scope check is skipped when `file_path` is
    /// `None` rather than forced against an arbitrary path.
    pub fn check_all(
        &self,
        current_cost: f64,
        elapsed_secs: i64,
        file_path: Option<&str>,
        last_heartbeat: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Vec<GuardrailResult> {
        let mut results =
            vec![self.check_cost(current_cost), self.check_duration(elapsed_secs), self.check_heartbeat(last_heartbeat, now)];

        if let Some(path) = file_path {
            results.push(self.check_scope(path));
        }

        results
    }
}

/// Translate a glob (`?`, `*`, `**/`, `**`, with regex metacharacters
/// escaped) into an anchored regex and test `path` against it.
fn glob_match(path: &str, pattern: &str) -> bool {
    let mut regex_src = String::new();
    let chars: Vec<char> = pattern.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        if chars[i..].starts_with(&['*', '*', '/']) {
            regex_src.push_str("(?:[^/]+/)*");
            i += 3;
        } else if chars[i..].starts_with(&['*', '*']) {
            regex_src.push_str(".*");
            i += 2;
        } else if chars[i] == '*' {
            regex_src.push_str("[^/]*");
            i += 1;
        } else if chars[i] == '?' {
            regex_src.push_str("[^/]");
            i += 1;
        } else if ".+^${}|()[]\\".contains(chars[i]) {
            regex_src.push('\\');
            regex_src.push(chars[i]);
            i += 1;
        } else {
            regex_src.push(chars[i]);
            i += 1;
        }
    }

    let anchored = format!("^{regex_src}$");
    Regex::new(&anchored).is_ok_and(|re| re.is_match(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn cost_check_skipped_when_no_limit() {
        let g = Guardrails::default();
        assert_eq!(g.check_cost(1_000_000.0).action, GuardrailAction::Continue);
    }

    #[test]
    fn cost_check_warns_at_eighty_percent() {
        let g = Guardrails { max_cost: Some(10.0), ..Default::default() };
        let result = g.check_cost(8.0);
        assert_eq!(result.action, GuardrailAction::Warn);
        assert!(result.passed);
    }

    #[test]
    fn cost_check_kills_over_limit() {
        let g = Guardrails { max_cost: Some(10.0), ..Default::default() };
        let result = g.check_cost(10.01);
        assert_eq!(result.action, GuardrailAction::Kill);
        assert!(!result.passed);
    }

    #[test]
    fn duration_check_kills_over_limit() {
        let g = Guardrails { max_duration_secs: 100, ..Default::default() };
        assert_eq!(g.check_duration(101).action, GuardrailAction::Kill);
    }

    #[test]
    fn heartbeat_kills_on_timeout() {
        let g = Guardrails { heartbeat_timeout_secs: 60, ..Default::default() };
        let now = Utc::now();
        let last = now - Duration::seconds(61);
        assert_eq!(g.check_heartbeat(last, now).action, GuardrailAction::Kill);
    }

    #[test]
    fn heartbeat_ok_when_fresh() {
        let g = Guardrails { heartbeat_timeout_secs: 60, ..Default::default() };
        let now = Utc::now();
        let last = now - Duration::seconds(5);
        assert_eq!(g.check_heartbeat(last, now).action, GuardrailAction::Continue);
    }

    #[test]
    fn scope_check_allows_when_globs_absent() {
        let g = Guardrails::default();
        assert!(g.check_scope("/etc/passwd").passed);
    }

    #[test]
    fn scope_check_matches_double_star() {
        let g = Guardrails { allowed_globs: Some(vec!["src/**/*.rs".to_string()]), ..Default::default() };
        assert!(g.check_scope("src/services/foo.rs").passed);
        assert!(g.check_scope("src/a/b/c.rs").passed);
        assert!(!g.check_scope("tests/foo.rs").passed);
    }

    #[test]
    fn scope_check_matches_question_mark() {
        let g = Guardrails { allowed_globs: Some(vec!["file?.txt".to_string()]), ..Default::default() };
        assert!(g.check_scope("file1.txt").passed);
        assert!(!g.check_scope("file12.txt").passed);
    }

    #[test]
    fn scope_check_rejects_outside_scope() {
        let g = Guardrails { allowed_globs: Some(vec!["src/*.rs".to_string()]), ..Default::default() };
        let result = g.check_scope("/etc/passwd");
        assert!(!result.passed);
        assert_eq!(result.action, GuardrailAction::Kill);
    }

    #[test]
    fn check_all_skips_scope_when_path_absent() {
        let g = Guardrails::default();
        let now = Utc::now();
        let results = g.check_all(0.0, 0, None, now, now);
        assert_eq!(results.len(), 3);
    }

    #[test]
    fn check_all_includes_scope_when_path_present() {
        let g = Guardrails::default();
        let now = Utc::now();
        let results = g.check_all(0.0, 0, Some("src/main.rs"), now, now);
        assert_eq!(results.len(), 4);
    }
}
