//! First-parent backtracking over commit history for path filters.
//!
//! Starting at the current run's commit, each filter is evaluated commit by
//! commit until it resolves. Commits that are fully ignored or outside a
//! filter's include paths are transparent: if the walk reaches a commit whose
//! content was already built successfully, that run covers the filter.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::core::duplicate::find_successful_duplicate;
use crate::core::filter::{Filter, FilterKey, FilterResult, evaluate_commit};
use crate::core::types::Run;
use crate::io::history::CommitHistory;

/// Hard limit on ancestor steps for a single pass.
pub const MAX_BACKTRACK_STEPS: u32 = 50;

/// Why a backtracking pass stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PassEnd {
    /// Every filter resolved.
    AllResolved,
    /// A root commit was passed or a commit was missing.
    HistoryEnded,
    /// The history adapter returned an error.
    FetchFailed,
    /// [`MAX_BACKTRACK_STEPS`] was reached.
    StepLimit,
}

/// Result of one backtracking pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathsOutcome {
    pub results: BTreeMap<FilterKey, FilterResult>,
    /// Changed files of every fetched commit, head first.
    pub changed_files: Vec<Vec<String>>,
    /// Distance at which the pass stopped.
    pub distance: u32,
    pub end: PassEnd,
}

impl PathsOutcome {
    pub fn result(&self, key: &FilterKey) -> Option<&FilterResult> {
        self.results.get(key)
    }
}

/// Walk first-parent ancestry from `head` until every filter resolves.
///
/// `older_runs` are the candidate runs for the successful-duplicate check,
/// which only applies to ancestors (distance >= 1). Fetch errors end the pass
/// and leave the remaining filters unresolved.
#[instrument(skip_all, fields(head = %head, filters = filters.len()))]
pub fn backtrack<H: CommitHistory>(
    history: &H,
    filters: &[Filter],
    head: &str,
    older_runs: &[Run],
) -> PathsOutcome {
    let mut results: BTreeMap<FilterKey, FilterResult> = filters
        .iter()
        .map(|filter| (filter.key.clone(), FilterResult::default()))
        .collect();
    let mut changed_files = Vec::new();
    let mut next = Some(head.to_string());
    let mut distance = 0;

    let end = loop {
        if results.values().all(FilterResult::is_resolved) {
            break PassEnd::AllResolved;
        }

        if distance >= MAX_BACKTRACK_STEPS {
            let unresolved: Vec<String> = results
                .iter_mut()
                .filter(|(_, result)| !result.is_resolved())
                .map(|(key, result)| {
                    result.resolve_run(distance);
                    key.to_string()
                })
                .collect();
            warn!(
                distance,
                ?unresolved,
                "backtracking limit reached, not skipping unresolved filters"
            );
            break PassEnd::StepLimit;
        }

        let Some(hash) = next.take() else {
            debug!(distance, "reached root commit");
            break PassEnd::HistoryEnded;
        };

        let commit = match history.commit(&hash) {
            Ok(Some(commit)) => commit,
            Ok(None) => {
                warn!(commit = %hash, distance, "commit not found, stopping backtracking");
                break PassEnd::HistoryEnded;
            }
            Err(err) => {
                warn!(
                    commit = %hash,
                    distance,
                    error = %format!("{err:#}"),
                    "failed to fetch commit, stopping backtracking"
                );
                break PassEnd::FetchFailed;
            }
        };

        let successful_run = if distance >= 1 {
            find_successful_duplicate(&commit.tree_hash, older_runs)
        } else {
            None
        };
        debug!(
            commit = %commit.hash,
            distance,
            changed = commit.changed_files.len(),
            successful_run = successful_run.map(|run| run.id),
            "evaluating commit"
        );

        for filter in filters {
            if let Some(result) = results.get_mut(&filter.key) {
                evaluate_commit(filter, result, &commit, distance, successful_run);
            }
        }

        next = commit.first_parent().map(str::to_string);
        changed_files.push(commit.changed_files);
        distance += 1;
    };

    debug!(?end, distance, "backtracking finished");
    PathsOutcome {
        results,
        changed_files,
        distance,
        end,
    }
}
