//! Run report model: per-machine, per-action outcomes.
//!
//! Results are keyed by machine identity, never merged positionally across
//! machines. The report (and the process exit status derived from it) is
//! failed iff any machine recorded any action failure.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    Success,
    Failed,
}

/// Outcome of one action against one machine.
#[derive(Debug, Clone, Serialize)]
pub struct ActionOutcome {
    /// The action's position in the script, for attribution.
    pub index: usize,
    pub keyword: String,
    pub status: ActionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Artifacts this action wrote under the machine subtree.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<PathBuf>,
}

impl ActionOutcome {
    pub fn success(index: usize, keyword: &str) -> Self {
        Self {
            index,
            keyword: keyword.to_string(),
            status: ActionStatus::Success,
            detail: None,
            artifacts: Vec::new(),
        }
    }

    pub fn failed(index: usize, keyword: &str, detail: impl Into<String>) -> Self {
        Self {
            index,
            keyword: keyword.to_string(),
            status: ActionStatus::Failed,
            detail: Some(detail.into()),
            artifacts: Vec::new(),
        }
    }

    pub fn with_artifacts(mut self, artifacts: Vec<PathBuf>) -> Self {
        self.artifacts = artifacts;
        self
    }

    pub fn is_failed(&self) -> bool {
        self.status == ActionStatus::Failed
    }
}

/// Everything that happened on one machine. Partial results are kept: a
/// failure never discards outcomes already recorded.
#[derive(Debug, Serialize)]
pub struct MachineReport {
    pub address: String,
    /// Machine-scoped fatal error (failed session, unusable subtree,
    /// timeout). When set, the remaining actions were skipped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub outcomes: Vec<ActionOutcome>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl MachineReport {
    pub fn failed(&self) -> bool {
        self.error.is_some() || self.outcomes.iter().any(ActionOutcome::is_failed)
    }
}

/// One full script execution across all resolved machines.
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub run_id: String,
    /// Hostname of the collecting host, for provenance.
    pub collector: String,
    pub workdir: PathBuf,
    pub machines: Vec<MachineReport>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    /// Script-level failure: any machine with any recorded failure.
    pub fn failed(&self) -> bool {
        self.machines.iter().any(MachineReport::failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(outcomes: Vec<ActionOutcome>, error: Option<String>) -> MachineReport {
        MachineReport {
            address: "local".to_string(),
            error,
            outcomes,
            started_at: Utc::now(),
            finished_at: Utc::now(),
        }
    }

    #[test]
    fn one_failed_action_fails_the_run() {
        let run = RunReport {
            run_id: "r".to_string(),
            collector: "host".to_string(),
            workdir: PathBuf::from("/tmp/w"),
            machines: vec![
                report(vec![ActionOutcome::success(1, "COPY")], None),
                report(
                    vec![
                        ActionOutcome::success(1, "COPY"),
                        ActionOutcome::failed(2, "RUN", "exit status 3"),
                    ],
                    None,
                ),
            ],
            started_at: Utc::now(),
            finished_at: Utc::now(),
        };
        assert!(run.failed());
    }

    #[test]
    fn machine_error_counts_as_failure() {
        assert!(report(vec![], Some("connection refused".to_string())).failed());
        assert!(!report(vec![ActionOutcome::success(1, "COPY")], None).failed());
    }

    #[test]
    fn report_serializes_to_json() {
        let machine = report(
            vec![ActionOutcome::success(1, "COPY").with_artifacts(vec![PathBuf::from("/w/l/f")])],
            None,
        );
        let json = serde_json::to_value(&machine).unwrap();
        assert_eq!(json["address"], "local");
        assert_eq!(json["outcomes"][0]["status"], "success");
        assert!(json.get("error").is_none());
    }
}
