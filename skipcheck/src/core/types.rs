//! Shared deterministic types for skip decisions.
//!
//! These types define stable contracts between the adapters and the decision
//! core. They carry no behavior beyond small predicates and must remain
//! deterministic across runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Event kind that triggered a workflow run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerEvent {
    Push,
    PullRequest,
    WorkflowDispatch,
    Schedule,
    Release,
}

/// Lifecycle status of a workflow run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    InProgress,
    Completed,
}

/// Completion outcome of a workflow run. Only meaningful once completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Conclusion {
    Success,
    Failure,
    Neutral,
    Cancelled,
    Skipped,
    TimedOut,
}

/// One execution of a workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Run {
    pub id: u64,
    pub workflow_id: u64,
    /// Monotonic per workflow; breaks ties between content-identical runs.
    pub run_number: u64,
    pub event: TriggerEvent,
    /// Hash of the checked-out file tree.
    pub tree_hash: String,
    pub commit_hash: String,
    pub status: RunStatus,
    pub conclusion: Option<Conclusion>,
    /// `None` when the originating branch can no longer be resolved.
    pub branch: Option<String>,
    /// `None` when the originating repository can no longer be resolved.
    pub repo: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_url: Option<String>,
}

impl Run {
    pub fn is_completed(&self) -> bool {
        self.status == RunStatus::Completed
    }

    /// True if the run completed with a successful conclusion.
    pub fn is_successful(&self) -> bool {
        self.is_completed() && self.conclusion == Some(Conclusion::Success)
    }

    /// True if both runs checked out identical file contents.
    pub fn same_content(&self, other: &Run) -> bool {
        self.tree_hash == other.tree_hash
    }
}

/// A node in the first-parent ancestry walk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub hash: String,
    /// Parent hashes; the first one is followed during backtracking.
    pub parents: Vec<String>,
    pub tree_hash: String,
    /// Paths touched relative to the first parent.
    pub changed_files: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_url: Option<String>,
}

impl Commit {
    pub fn first_parent(&self) -> Option<&str> {
        self.parents.first().map(String::as_str)
    }
}
