//! Path filters and their per-commit resolution rules.
//!
//! A filter starts unresolved and is resolved exactly once, either to `skip`
//! (a successful run covers every commit walked so far) or to `run`.

use std::fmt;
use std::num::NonZeroU32;

use serde::{Deserialize, Serialize, Serializer};
use tracing::trace;

use crate::core::glob::PathMatcher;
use crate::core::types::{Commit, Run};

/// Reserved name of the filter built from the top-level patterns.
pub const GLOBAL_FILTER_NAME: &str = "global";

/// Identity of a filter; the global filter cannot collide with a named one.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FilterKey {
    Global,
    Named(String),
}

impl FilterKey {
    pub fn as_str(&self) -> &str {
        match self {
            FilterKey::Global => GLOBAL_FILTER_NAME,
            FilterKey::Named(name) => name,
        }
    }
}

impl fmt::Display for FilterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for FilterKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// How far back a filter may walk before giving up.
///
/// Configured as `true` (unbounded), `false` (one ancestor step) or a
/// positive step count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "RawBacktracking")]
pub enum BacktrackLimit {
    #[default]
    Unbounded,
    StopAfterOne,
    StopAfterN(NonZeroU32),
}

impl BacktrackLimit {
    /// True once the walk has reached the last distance this limit allows.
    pub fn exhausted_at(self, distance: u32) -> bool {
        match self {
            BacktrackLimit::Unbounded => false,
            BacktrackLimit::StopAfterOne => distance >= 1,
            BacktrackLimit::StopAfterN(steps) => distance >= steps.get(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawBacktracking {
    Flag(bool),
    Steps(i64),
}

impl TryFrom<RawBacktracking> for BacktrackLimit {
    type Error = String;

    fn try_from(raw: RawBacktracking) -> Result<Self, Self::Error> {
        match raw {
            RawBacktracking::Flag(true) => Ok(BacktrackLimit::Unbounded),
            RawBacktracking::Flag(false) => Ok(BacktrackLimit::StopAfterOne),
            RawBacktracking::Steps(steps) => u32::try_from(steps)
                .ok()
                .and_then(NonZeroU32::new)
                .map(BacktrackLimit::StopAfterN)
                .ok_or_else(|| {
                    format!("backtracking must be a boolean or a positive integer, got {steps}")
                }),
        }
    }
}

impl Serialize for BacktrackLimit {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            BacktrackLimit::Unbounded => serializer.serialize_bool(true),
            BacktrackLimit::StopAfterOne => serializer.serialize_bool(false),
            BacktrackLimit::StopAfterN(steps) => serializer.serialize_u32(steps.get()),
        }
    }
}

/// Compiled include/ignore configuration evaluated during backtracking.
#[derive(Debug, Clone)]
pub struct Filter {
    pub key: FilterKey,
    /// Include patterns; empty means the filter is not path-restricted.
    pub paths: PathMatcher,
    pub paths_ignore: PathMatcher,
    pub backtracking: BacktrackLimit,
}

impl Filter {
    /// The global filter always walks without a limit.
    pub fn global(paths: PathMatcher, paths_ignore: PathMatcher) -> Self {
        Self {
            key: FilterKey::Global,
            paths,
            paths_ignore,
            backtracking: BacktrackLimit::Unbounded,
        }
    }

    pub fn named(
        name: impl Into<String>,
        paths: PathMatcher,
        paths_ignore: PathMatcher,
        backtracking: BacktrackLimit,
    ) -> Self {
        Self {
            key: FilterKey::Named(name.into()),
            paths,
            paths_ignore,
            backtracking,
        }
    }

    /// True if every changed file is covered by a non-empty ignore set.
    pub fn ignores_all<S: AsRef<str>>(&self, changed_files: &[S]) -> bool {
        self.paths_ignore.covers_all(changed_files)
    }
}

/// Resolution state of a filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Resolution {
    #[default]
    Unknown,
    Skip,
    Run,
}

impl Serialize for Resolution {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Resolution::Unknown => serializer.serialize_str("unknown"),
            Resolution::Skip => serializer.serialize_bool(true),
            Resolution::Run => serializer.serialize_bool(false),
        }
    }
}

/// Accumulated backtracking result for one filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterResult {
    pub should_skip: Resolution,
    /// Ancestor steps walked before the filter resolved.
    pub backtrack_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped_by: Option<Run>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_files: Option<Vec<String>>,
}

impl FilterResult {
    pub fn is_resolved(&self) -> bool {
        self.should_skip != Resolution::Unknown
    }

    pub fn resolve_skip(&mut self, run: Run, distance: u32) {
        self.should_skip = Resolution::Skip;
        self.skipped_by = Some(run);
        self.backtrack_count = distance;
    }

    pub fn resolve_run(&mut self, distance: u32) {
        self.should_skip = Resolution::Run;
        self.backtrack_count = distance;
    }
}

/// Apply one commit to an unresolved filter.
///
/// Checks run in a fixed order: successful run, backtracking limit, ignore
/// patterns, include patterns, then resolve to `run`. A found run therefore
/// wins over an exhausted limit at the same commit. Resolved results are
/// left untouched.
pub fn evaluate_commit(
    filter: &Filter,
    result: &mut FilterResult,
    commit: &Commit,
    distance: u32,
    successful_run: Option<&Run>,
) {
    if result.is_resolved() {
        return;
    }

    if let Some(run) = successful_run {
        trace!(filter = %filter.key, distance, run_id = run.id, "covered by successful run");
        result.resolve_skip(run.clone(), distance);
        return;
    }

    if filter.backtracking.exhausted_at(distance) {
        trace!(filter = %filter.key, distance, "backtracking limit reached");
        result.resolve_run(distance);
        return;
    }

    if filter.ignores_all(&commit.changed_files) {
        trace!(filter = %filter.key, distance, "commit fully ignored");
        return;
    }

    if !filter.paths.is_empty() {
        let matches = filter.paths.matches(&commit.changed_files);
        if matches.is_empty() {
            trace!(filter = %filter.key, distance, "commit outside include paths");
            return;
        }
        result.matched_files = Some(matches.into_iter().map(str::to_string).collect());
    }

    trace!(filter = %filter.key, distance, "commit touches relevant paths");
    result.resolve_run(distance);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{commit, run};

    fn matcher(patterns: &[&str]) -> PathMatcher {
        PathMatcher::new(patterns).expect("patterns")
    }

    fn evaluate(
        filter: &Filter,
        files: &[&str],
        distance: u32,
        found: Option<&Run>,
    ) -> FilterResult {
        let mut result = FilterResult::default();
        evaluate_commit(filter, &mut result, &commit("c", "T", files, &[]), distance, found);
        result
    }

    #[test]
    fn limit_exhaustion_by_variant() {
        assert!(!BacktrackLimit::Unbounded.exhausted_at(1_000));
        assert!(!BacktrackLimit::StopAfterOne.exhausted_at(0));
        assert!(BacktrackLimit::StopAfterOne.exhausted_at(1));
        let three = BacktrackLimit::StopAfterN(NonZeroU32::new(3).expect("non-zero"));
        assert!(!three.exhausted_at(2));
        assert!(three.exhausted_at(3));
    }

    #[test]
    fn successful_run_wins_over_exhausted_limit() {
        let filter = Filter::named(
            "f",
            PathMatcher::empty(),
            PathMatcher::empty(),
            BacktrackLimit::StopAfterOne,
        );
        let found = run(1, "T");
        let result = evaluate(&filter, &["src/lib.rs"], 1, Some(&found));
        assert_eq!(result.should_skip, Resolution::Skip);
        assert_eq!(result.backtrack_count, 1);
        assert_eq!(result.skipped_by.map(|r| r.id), Some(1));
    }

    #[test]
    fn exhausted_limit_resolves_run_even_for_ignored_commit() {
        let filter = Filter::named(
            "f",
            PathMatcher::empty(),
            matcher(&["**/*.md"]),
            BacktrackLimit::StopAfterOne,
        );
        let result = evaluate(&filter, &["README.md"], 1, None);
        assert_eq!(result.should_skip, Resolution::Run);
        assert_eq!(result.backtrack_count, 1);
    }

    #[test]
    fn fully_ignored_commit_stays_unresolved() {
        let filter = Filter::global(PathMatcher::empty(), matcher(&["**/*.md"]));
        let result = evaluate(&filter, &["README.md", "docs/a.md"], 0, None);
        assert!(!result.is_resolved());
    }

    #[test]
    fn partially_ignored_commit_resolves_run() {
        let filter = Filter::global(PathMatcher::empty(), matcher(&["**/*.md"]));
        let result = evaluate(&filter, &["README.md", "src/lib.rs"], 0, None);
        assert_eq!(result.should_skip, Resolution::Run);
        assert_eq!(result.matched_files, None);
    }

    #[test]
    fn commit_outside_include_paths_stays_unresolved() {
        let filter = Filter::named(
            "frontend",
            matcher(&["frontend/**"]),
            PathMatcher::empty(),
            BacktrackLimit::Unbounded,
        );
        let result = evaluate(&filter, &["backend/x.go"], 0, None);
        assert!(!result.is_resolved());
    }

    #[test]
    fn include_match_records_files_and_resolves_run() {
        let filter = Filter::named(
            "frontend",
            matcher(&["frontend/**"]),
            PathMatcher::empty(),
            BacktrackLimit::Unbounded,
        );
        let result = evaluate(&filter, &["backend/x.go", "frontend/app.ts"], 2, None);
        assert_eq!(result.should_skip, Resolution::Run);
        assert_eq!(result.backtrack_count, 2);
        assert_eq!(result.matched_files, Some(vec!["frontend/app.ts".to_string()]));
    }

    #[test]
    fn ignore_is_checked_before_include() {
        let filter = Filter::named(
            "frontend",
            matcher(&["frontend/**"]),
            matcher(&["**/*.md"]),
            BacktrackLimit::Unbounded,
        );
        let result = evaluate(&filter, &["frontend/README.md"], 0, None);
        assert!(!result.is_resolved());
    }

    #[test]
    fn empty_change_list_without_patterns_resolves_run() {
        let filter = Filter::global(PathMatcher::empty(), PathMatcher::empty());
        let result = evaluate(&filter, &[], 0, None);
        assert_eq!(result.should_skip, Resolution::Run);
    }

    #[test]
    fn resolved_result_is_not_mutated() {
        let filter = Filter::global(PathMatcher::empty(), PathMatcher::empty());
        let mut result = FilterResult::default();
        result.resolve_run(0);
        let found = run(4, "T");
        evaluate_commit(&filter, &mut result, &commit("c", "T", &["a"], &[]), 3, Some(&found));
        assert_eq!(result.should_skip, Resolution::Run);
        assert_eq!(result.backtrack_count, 0);
        assert!(result.skipped_by.is_none());
    }

    #[test]
    fn backtracking_deserializes_from_bool_or_steps() {
        #[derive(Deserialize)]
        struct Wrapper {
            backtracking: BacktrackLimit,
        }
        let parse = |raw: &str| toml::from_str::<Wrapper>(raw).map(|w| w.backtracking);
        assert_eq!(parse("backtracking = true").expect("true"), BacktrackLimit::Unbounded);
        assert_eq!(parse("backtracking = false").expect("false"), BacktrackLimit::StopAfterOne);
        assert_eq!(
            parse("backtracking = 4").expect("steps"),
            BacktrackLimit::StopAfterN(NonZeroU32::new(4).expect("non-zero"))
        );
        assert!(parse("backtracking = 0").is_err());
        assert!(parse("backtracking = -2").is_err());
    }

    #[test]
    fn resolution_serializes_like_a_tri_state() {
        let json = serde_json::to_string(&[Resolution::Unknown, Resolution::Skip, Resolution::Run])
            .expect("json");
        assert_eq!(json, r#"["unknown",true,false]"#);
    }
}
