//! Deterministic glob matching of changed paths.
//!
//! `*` never crosses a `/`, `**` spans any number of directories, and dot
//! files are matched like any other segment.

use anyhow::{Context, Result};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

/// Compiled, ordered set of glob patterns.
#[derive(Debug, Clone)]
pub struct PathMatcher {
    patterns: Vec<String>,
    set: GlobSet,
}

impl PathMatcher {
    /// Compile `patterns`. Fails on the first malformed pattern.
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let pattern = pattern.as_ref();
            let glob = GlobBuilder::new(pattern)
                .literal_separator(true)
                .build()
                .with_context(|| format!("invalid glob pattern '{pattern}'"))?;
            builder.add(glob);
        }
        let set = builder.build().context("compile glob set")?;
        Ok(Self {
            patterns: patterns.iter().map(|p| p.as_ref().to_string()).collect(),
            set,
        })
    }

    /// Matcher with no patterns; it matches nothing.
    pub fn empty() -> Self {
        Self {
            patterns: Vec::new(),
            set: GlobSet::empty(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn is_match(&self, path: &str) -> bool {
        self.set.is_match(path)
    }

    /// Paths matching at least one pattern, in input order.
    pub fn matches<'a, S: AsRef<str>>(&self, paths: &'a [S]) -> Vec<&'a str> {
        paths
            .iter()
            .map(AsRef::as_ref)
            .filter(|path| self.is_match(path))
            .collect()
    }

    /// Paths matching none of the patterns, in input order.
    pub fn non_matching<'a, S: AsRef<str>>(&self, paths: &'a [S]) -> Vec<&'a str> {
        paths
            .iter()
            .map(AsRef::as_ref)
            .filter(|path| !self.is_match(path))
            .collect()
    }

    /// True if there are patterns and every path matches one of them.
    pub fn covers_all<S: AsRef<str>>(&self, paths: &[S]) -> bool {
        !self.is_empty() && self.non_matching(paths).is_empty()
    }
}
