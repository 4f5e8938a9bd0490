//! Orchestration of a single skip decision.
//!
//! Stages run in priority order and the first one that produces a result
//! wins: trigger exclusion, successful duplicate, concurrent runs, then path
//! backtracking. Adapter failures never abort the decision; they degrade it
//! toward running the job.

use std::collections::BTreeMap;

use anyhow::{Result, bail};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::backtrack::{PathsOutcome, backtrack};
use crate::core::concurrency::{ConcurrencyPolicy, resolve_concurrent};
use crate::core::duplicate::{find_successful_duplicate, older_runs};
use crate::core::filter::{FilterKey, FilterResult, Resolution};
use crate::core::types::Run;
use crate::io::cancel::RunCanceller;
use crate::io::config::SkipConfig;
use crate::io::history::CommitHistory;
use crate::io::registry::RunRegistry;

/// Why the decision was made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    DoNotSkip,
    SkipAfterSuccessfulDuplicate,
    ConcurrentSkipping,
    Paths,
    NoTransferableRun,
}

/// Structured skip decision for CI orchestrators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decision {
    pub should_skip: bool,
    pub reason: SkipReason,
    /// Run whose result the current run can reuse.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped_by: Option<Run>,
    /// Per-filter backtracking results, keyed by filter name (`global` included).
    pub paths_result: BTreeMap<FilterKey, FilterResult>,
    /// Changed files of every commit walked during backtracking.
    pub changed_files: Vec<Vec<String>>,
    /// Runs for which cancellation succeeded.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cancelled_runs: Vec<u64>,
}

impl Decision {
    fn run(reason: SkipReason) -> Self {
        Self {
            should_skip: false,
            reason,
            skipped_by: None,
            paths_result: BTreeMap::new(),
            changed_files: Vec::new(),
            cancelled_runs: Vec::new(),
        }
    }

    fn skip(reason: SkipReason, skipped_by: Run) -> Self {
        Self {
            should_skip: true,
            skipped_by: Some(skipped_by),
            ..Self::run(reason)
        }
    }

    /// Result of the named filter, if backtracking ran.
    pub fn filter(&self, key: &FilterKey) -> Option<&FilterResult> {
        self.paths_result.get(key)
    }
}

/// Decide whether the current run can be skipped.
///
/// Only configuration problems are returned as errors, and they are detected
/// before any adapter is called. `canceller` is required when
/// `cancel_others` is enabled.
#[instrument(skip_all)]
pub fn decide<R: RunRegistry, H: CommitHistory>(
    config: &SkipConfig,
    registry: &R,
    history: &H,
    canceller: Option<&dyn RunCanceller>,
) -> Result<Decision> {
    let filters = config.filters()?;
    if config.cancel_others && canceller.is_none() {
        bail!("cancel_others is enabled but no cancel command is configured");
    }

    let current = match registry.current_run() {
        Ok(run) => run,
        Err(err) => {
            warn!(error = %format!("{err:#}"), "failed to load current run, not skipping");
            return Ok(Decision::run(SkipReason::NoTransferableRun));
        }
    };
    let other_runs: Vec<Run> = match registry.workflow_runs(current.workflow_id) {
        Ok(runs) => runs.into_iter().filter(|run| run.id != current.id).collect(),
        Err(err) => {
            warn!(error = %format!("{err:#}"), "failed to list workflow runs, assuming none");
            Vec::new()
        }
    };
    let older = older_runs(&current, &other_runs);

    let mut cancelled_runs = Vec::new();
    if config.cancel_others
        && let Some(canceller) = canceller
    {
        cancelled_runs = cancel_outdated_runs(&current, &older, canceller);
    }

    let mut decision = evaluate(config, &current, &other_runs, &older, || {
        backtrack(history, &filters, &current.commit_hash, &older)
    });
    decision.cancelled_runs = cancelled_runs;

    info!(
        run_id = current.id,
        should_skip = decision.should_skip,
        reason = ?decision.reason,
        skipped_by = decision.skipped_by.as_ref().map(|run| run.id),
        "skip decision"
    );
    Ok(decision)
}

fn evaluate(
    config: &SkipConfig,
    current: &Run,
    other_runs: &[Run],
    older: &[Run],
    paths: impl FnOnce() -> PathsOutcome,
) -> Decision {
    if config.do_not_skip.contains(&current.event) {
        info!(event = ?current.event, "trigger is never skipped");
        return Decision::run(SkipReason::DoNotSkip);
    }

    if config.skip_after_successful_duplicate
        && let Some(run) = find_successful_duplicate(&current.tree_hash, older)
    {
        info!(duplicate = run.id, "found successful run with identical content");
        return Decision::skip(SkipReason::SkipAfterSuccessfulDuplicate, run.clone());
    }

    if config.concurrent_skipping != ConcurrencyPolicy::Never
        && let Some(run) = resolve_concurrent(config.concurrent_skipping, current, other_runs)
    {
        info!(
            concurrent = run.id,
            policy = ?config.concurrent_skipping,
            "skipping in favor of concurrent run"
        );
        return Decision::skip(SkipReason::ConcurrentSkipping, run.clone());
    }

    let outcome = paths();
    let global_skip = outcome
        .result(&FilterKey::Global)
        .filter(|result| result.should_skip == Resolution::Skip)
        .and_then(|result| result.skipped_by.clone());
    let mut decision = match global_skip {
        Some(run) => Decision::skip(SkipReason::Paths, run),
        None => Decision::run(SkipReason::NoTransferableRun),
    };
    decision.paths_result = outcome.results;
    decision.changed_files = outcome.changed_files;
    decision
}

/// Cancel older in-flight runs of the same branch and repository.
///
/// Each cancellation fails independently; returns the runs that were
/// cancelled successfully.
fn cancel_outdated_runs(current: &Run, older: &[Run], canceller: &dyn RunCanceller) -> Vec<u64> {
    let victims = older.iter().filter(|run| {
        !run.is_completed()
            && run.repo.is_some()
            && run.repo == current.repo
            && run.branch == current.branch
    });

    let mut cancelled = Vec::new();
    for victim in victims {
        match canceller.cancel_run(victim.id) {
            Ok(0) => {
                info!(run_id = victim.id, "cancelled outdated run");
                cancelled.push(victim.id);
            }
            Ok(code) => warn!(run_id = victim.id, code, "cancel request rejected"),
            Err(err) => warn!(
                run_id = victim.id,
                error = %format!("{err:#}"),
                "failed to cancel outdated run"
            ),
        }
    }
    cancelled
}
