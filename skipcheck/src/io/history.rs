//! Commit history adapter.
//!
//! [`CommitHistory`] decouples backtracking from where commits come from.
//! [`GitHistory`] reads them from a local clone through `git` subprocess
//! calls; tests use scripted histories instead.

use std::path::PathBuf;
use std::process::{Command, Output};

use anyhow::{Context, Result, anyhow};
use tracing::{debug, instrument};

use crate::core::types::Commit;

/// Source of commit details, fetched one commit at a time.
pub trait CommitHistory {
    /// Return the commit, or `None` if it does not exist.
    fn commit(&self, hash: &str) -> Result<Option<Commit>>;
}

/// Reads commits from a git working directory.
#[derive(Debug, Clone)]
pub struct GitHistory {
    workdir: PathBuf,
    /// Prefix for commit URLs, e.g. `https://github.com/owner/repo/commit/`.
    url_prefix: Option<String>,
}

impl GitHistory {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
            url_prefix: None,
        }
    }

    pub fn with_url_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.url_prefix = Some(prefix.into());
        self
    }

    /// Paths changed by `hash` relative to its first parent.
    ///
    /// Uses NUL-separated output; without `-z` git C-quotes paths with
    /// non-ASCII bytes, which no glob would match.
    fn changed_files(&self, hash: &str, first_parent: Option<&str>) -> Result<Vec<String>> {
        let out = match first_parent {
            Some(parent) => self.run_capture(&[
                "diff",
                "-z",
                "--name-only",
                "--no-renames",
                parent,
                hash,
            ])?,
            None => self.run_capture(&[
                "diff-tree",
                "-z",
                "--root",
                "-r",
                "--name-only",
                "--no-commit-id",
                hash,
            ])?,
        };
        Ok(split_nul_paths(&out))
    }

    fn run_capture(&self, args: &[&str]) -> Result<String> {
        let output = self.run(args)?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("git {} failed: {}", args.join(" "), stderr.trim()));
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    fn run(&self, args: &[&str]) -> Result<Output> {
        Command::new("git")
            .args(args)
            .current_dir(&self.workdir)
            .output()
            .with_context(|| format!("spawn git {}", args.join(" ")))
    }
}

impl CommitHistory for GitHistory {
    #[instrument(skip(self))]
    fn commit(&self, hash: &str) -> Result<Option<Commit>> {
        let rev = format!("{hash}^{{commit}}");
        let output = self.run(&["show", "-s", "--format=%H%x00%P%x00%T", &rev])?;
        if !output.status.success() {
            debug!(stderr = %String::from_utf8_lossy(&output.stderr).trim(), "commit not found");
            return Ok(None);
        }
        let raw = String::from_utf8_lossy(&output.stdout);
        let (full_hash, parents, tree_hash) = parse_show_line(raw.trim())?;
        let changed_files = self.changed_files(&full_hash, parents.first().map(String::as_str))?;
        debug!(
            commit = %full_hash,
            parents = parents.len(),
            changed = changed_files.len(),
            "fetched commit"
        );
        let html_url = self
            .url_prefix
            .as_ref()
            .map(|prefix| format!("{prefix}{full_hash}"));
        Ok(Some(Commit {
            hash: full_hash,
            parents,
            tree_hash,
            changed_files,
            html_url,
        }))
    }
}

fn split_nul_paths(raw: &str) -> Vec<String> {
    raw.split('\0')
        .filter(|path| !path.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse `%H%x00%P%x00%T` into hash, parents and tree hash.
fn parse_show_line(line: &str) -> Result<(String, Vec<String>, String)> {
    let mut fields = line.split('\0');
    let (Some(hash), Some(parents), Some(tree), None) =
        (fields.next(), fields.next(), fields.next(), fields.next())
    else {
        return Err(anyhow!("unexpected git show output: '{line}'"));
    };
    if hash.is_empty() || tree.is_empty() {
        return Err(anyhow!("unexpected git show output: '{line}'"));
    }
    let parents = parents.split_whitespace().map(str::to_string).collect();
    Ok((hash.to_string(), parents, tree.to_string()))
}
