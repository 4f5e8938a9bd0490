//! Workflow run registry adapter.
//!
//! [`JsonRunRegistry`] reads a snapshot of workflow runs exported by the CI
//! orchestrator:
//!
//! ```json
//! { "current_run_id": 42, "runs": [ { "id": 42, "tree_hash": "...", ... } ] }
//! ```
//!
//! Runs whose tree hash is unknown (e.g. removed commits) are dropped on load,
//! as are runs that do not decode (e.g. trigger kinds this tool does not know).

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::core::types::Run;

/// Source of workflow run metadata.
pub trait RunRegistry {
    /// The run this decision is being made for.
    fn current_run(&self) -> Result<Run>;
    /// Every known run of `workflow_id`, in registry order.
    fn workflow_runs(&self, workflow_id: u64) -> Result<Vec<Run>>;
}

#[derive(Debug, Deserialize)]
struct RunsSnapshot {
    current_run_id: u64,
    runs: Vec<Value>,
}

/// Registry backed by a JSON snapshot.
#[derive(Debug, Clone)]
pub struct JsonRunRegistry {
    current_run_id: u64,
    runs: Vec<Run>,
}

impl JsonRunRegistry {
    /// Load a snapshot from disk.
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn load(path: &Path) -> Result<Self> {
        let contents =
            fs::read_to_string(path).with_context(|| format!("read runs {}", path.display()))?;
        Self::from_json(&contents).with_context(|| format!("parse runs {}", path.display()))
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let snapshot: RunsSnapshot = serde_json::from_str(raw).context("parse runs snapshot")?;
        let total = snapshot.runs.len();
        let mut runs = Vec::with_capacity(total);
        for (index, value) in snapshot.runs.into_iter().enumerate() {
            let id = value.get("id").and_then(Value::as_u64);
            match parse_run(value) {
                Ok(Some(run)) => runs.push(run),
                Ok(None) => {}
                Err(err) => warn!(index, ?id, error = %err, "dropping undecodable run"),
            }
        }
        debug!(total, kept = runs.len(), "loaded run snapshot");
        Ok(Self {
            current_run_id: snapshot.current_run_id,
            runs,
        })
    }
}

impl RunRegistry for JsonRunRegistry {
    fn current_run(&self) -> Result<Run> {
        self.runs
            .iter()
            .find(|run| run.id == self.current_run_id)
            .cloned()
            .ok_or_else(|| {
                anyhow!(
                    "current run {} not found in snapshot (or has no tree hash or did not decode)",
                    self.current_run_id
                )
            })
    }

    fn workflow_runs(&self, workflow_id: u64) -> Result<Vec<Run>> {
        Ok(self
            .runs
            .iter()
            .filter(|run| run.workflow_id == workflow_id)
            .cloned()
            .collect())
    }
}

/// Decode a run, returning `None` when its tree hash is missing or null.
fn parse_run(value: Value) -> Result<Option<Run>> {
    if value.get("tree_hash").is_none_or(Value::is_null) {
        return Ok(None);
    }
    let run = serde_json::from_value(value)?;
    Ok(Some(run))
}
