//! Skip decisions driven by other in-flight runs of the same workflow.

use serde::{Deserialize, Serialize};

use crate::core::types::Run;

/// How concurrently running instances of a workflow affect the current run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConcurrencyPolicy {
    /// Skip whenever any other run is still queued or in progress.
    Always,
    /// Skip if a newer run is in flight.
    OutdatedRuns,
    /// Skip if an in-flight run checked out the same content.
    SameContent,
    /// Skip if an older in-flight run checked out the same content.
    ///
    /// Only the newer run of a content-identical pair yields, so one of them
    /// always proceeds.
    SameContentNewer,
    #[default]
    Never,
}

/// Return the concurrent run that makes `current` skippable under `policy`.
///
/// `other_runs` must exclude `current`; completed runs are ignored.
pub fn resolve_concurrent<'a>(
    policy: ConcurrencyPolicy,
    current: &Run,
    other_runs: &'a [Run],
) -> Option<&'a Run> {
    let mut concurrent = other_runs.iter().filter(|run| !run.is_completed());
    match policy {
        ConcurrencyPolicy::Never => None,
        ConcurrencyPolicy::Always => concurrent.next(),
        ConcurrencyPolicy::OutdatedRuns => {
            concurrent.find(|run| run.created_at > current.created_at)
        }
        ConcurrencyPolicy::SameContent => concurrent.find(|run| run.same_content(current)),
        ConcurrencyPolicy::SameContentNewer => concurrent
            .find(|run| run.same_content(current) && run.run_number < current.run_number),
    }
}
