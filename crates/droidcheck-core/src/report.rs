//! The run report: one terminal record per scenario, in execution order.

use std::fmt;
use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::scenario::ScenarioState;

/// Why a scenario was skipped instead of run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "scenario", rename_all = "snake_case")]
pub enum SkipReason {
    /// The named prerequisite failed.
    PrerequisiteFailed(String),
    /// The named prerequisite was itself skipped.
    PrerequisiteSkipped(String),
    /// The run was interrupted before the scenario started.
    Interrupted,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::PrerequisiteFailed(name) => write!(f, "prerequisite '{name}' failed"),
            SkipReason::PrerequisiteSkipped(name) => write!(f, "prerequisite '{name}' was skipped"),
            SkipReason::Interrupted => f.write_str("run interrupted"),
        }
    }
}

/// The outcome of one scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioRecord {
    pub name: String,
    pub state: ScenarioState,
    /// Failure message for failed scenarios.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<SkipReason>,
    pub duration_ms: u64,
    /// Swallowed gesture failures and similar non-fatal problems.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl ScenarioRecord {
    pub fn skipped(name: impl Into<String>, reason: SkipReason) -> Self {
        Self {
            name: name.into(),
            state: ScenarioState::Skipped,
            detail: None,
            skip_reason: Some(reason),
            duration_ms: 0,
            warnings: Vec::new(),
        }
    }
}

/// The sole output artifact of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub endpoint: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub scenarios: Vec<ScenarioRecord>,
}

impl RunReport {
    pub fn new(endpoint: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            run_id: Uuid::new_v4(),
            endpoint: endpoint.into(),
            started_at: now,
            finished_at: now,
            scenarios: Vec::new(),
        }
    }

    pub fn push(&mut self, record: ScenarioRecord) {
        self.scenarios.push(record);
    }

    pub fn finish(&mut self) {
        self.finished_at = Utc::now();
    }

    /// True if every scenario passed. An empty report counts as passing.
    pub fn all_passed(&self) -> bool {
        self.scenarios
            .iter()
            .all(|s| s.state == ScenarioState::Passed)
    }

    pub fn state_of(&self, name: &str) -> Option<ScenarioState> {
        self.record(name).map(|r| r.state)
    }

    pub fn record(&self, name: &str) -> Option<&ScenarioRecord> {
        self.scenarios.iter().find(|r| r.name == name)
    }

    pub fn passed(&self) -> usize {
        self.count(ScenarioState::Passed)
    }

    pub fn failed(&self) -> usize {
        self.count(ScenarioState::Failed)
    }

    pub fn skipped(&self) -> usize {
        self.count(ScenarioState::Skipped)
    }

    fn count(&self, state: ScenarioState) -> usize {
        self.scenarios.iter().filter(|r| r.state == state).count()
    }

    /// Human-readable summary, one line per scenario.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "run {} against {}", self.run_id, self.endpoint);
        for record in &self.scenarios {
            let state = record.state.as_str().to_uppercase();
            let _ = write!(out, "  {state:<8} {}", record.name);
            match record.state {
                ScenarioState::Skipped => {
                    if let Some(reason) = &record.skip_reason {
                        let _ = write!(out, ": {reason}");
                    }
                }
                _ => {
                    let _ = write!(out, " ({} ms)", record.duration_ms);
                    if let Some(detail) = &record.detail {
                        let _ = write!(out, ": {detail}");
                    }
                }
            }
            out.push('\n');
            for warning in &record.warnings {
                let _ = writeln!(out, "           warning: {warning}");
            }
        }
        let _ = write!(
            out,
            "{} passed, {} failed, {} skipped",
            self.passed(),
            self.failed(),
            self.skipped()
        );
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, state: ScenarioState) -> ScenarioRecord {
        ScenarioRecord {
            name: name.to_string(),
            state,
            detail: None,
            skip_reason: None,
            duration_ms: 12,
            warnings: Vec::new(),
        }
    }

    #[test]
    fn test_counts_and_all_passed() {
        let mut report = RunReport::new("http://127.0.0.1:4723/wd/hub");
        assert!(report.all_passed());

        report.push(record("a", ScenarioState::Passed));
        assert!(report.all_passed());

        report.push(record("b", ScenarioState::Failed));
        report.push(ScenarioRecord::skipped("c", SkipReason::PrerequisiteFailed("b".into())));
        assert!(!report.all_passed());
        assert_eq!((report.passed(), report.failed(), report.skipped()), (1, 1, 1));
        assert_eq!(report.state_of("c"), Some(ScenarioState::Skipped));
        assert_eq!(report.state_of("zzz"), None);
    }

    #[test]
    fn test_to_text() {
        let mut report = RunReport::new("http://device:4723/wd/hub");
        let mut failed = record("add_new_task", ScenarioState::Failed);
        failed.detail = Some("No element found for id 'fab'".to_string());
        failed.warnings.push("swipe left failed".to_string());
        report.push(failed);
        report.push(ScenarioRecord::skipped(
            "add_second_new_task",
            SkipReason::PrerequisiteFailed("add_new_task".into()),
        ));

        let text = report.to_text();
        assert!(text.contains("against http://device:4723/wd/hub"));
        assert!(text.contains("FAILED   add_new_task (12 ms): No element found for id 'fab'"));
        assert!(text.contains("warning: swipe left failed"));
        assert!(text.contains("SKIPPED  add_second_new_task: prerequisite 'add_new_task' failed"));
        assert!(text.ends_with("0 passed, 1 failed, 1 skipped"));
    }

    #[test]
    fn test_json_shape() {
        let mut report = RunReport::new("http://x/wd/hub");
        report.push(ScenarioRecord::skipped("b", SkipReason::Interrupted));
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["scenarios"][0]["state"], "skipped");
        assert_eq!(json["scenarios"][0]["skip_reason"]["kind"], "interrupted");
        assert!(json["scenarios"][0].get("detail").is_none());
    }
}
