//! Test-only builders and scripted adapters.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use tempfile::TempDir;

use crate::core::types::{Commit, Conclusion, Run, RunStatus, TriggerEvent};
use crate::io::cancel::RunCanceller;
use crate::io::history::CommitHistory;
use crate::io::registry::RunRegistry;

const BASE_TIMESTAMP: i64 = 1_700_000_000;

/// Deterministic creation time: one minute per `id`, so higher ids are newer.
pub fn created_at(id: u64) -> DateTime<Utc> {
    let secs = BASE_TIMESTAMP + i64::try_from(id).unwrap_or(i64::MAX / 120) * 60;
    DateTime::from_timestamp(secs, 0).unwrap_or_default()
}

/// Completed, successful push run on `main` of `acme/app`.
pub fn run(id: u64, tree_hash: &str) -> Run {
    Run {
        id,
        workflow_id: 1,
        run_number: id,
        event: TriggerEvent::Push,
        tree_hash: tree_hash.to_string(),
        commit_hash: format!("commit-{id}"),
        status: RunStatus::Completed,
        conclusion: Some(Conclusion::Success),
        branch: Some("main".to_string()),
        repo: Some("acme/app".to_string()),
        created_at: created_at(id),
        html_url: None,
    }
}

/// Completed run with an explicit conclusion.
pub fn run_with_conclusion(id: u64, tree_hash: &str, conclusion: Conclusion) -> Run {
    Run {
        conclusion: Some(conclusion),
        ..run(id, tree_hash)
    }
}

pub fn in_progress_run(id: u64, tree_hash: &str) -> Run {
    Run {
        status: RunStatus::InProgress,
        conclusion: None,
        ..run(id, tree_hash)
    }
}

pub fn queued_run(id: u64, tree_hash: &str) -> Run {
    Run {
        status: RunStatus::Queued,
        conclusion: None,
        ..run(id, tree_hash)
    }
}

/// Build a commit with explicit parents.
pub fn commit(hash: &str, tree_hash: &str, changed_files: &[&str], parents: &[&str]) -> Commit {
    Commit {
        hash: hash.to_string(),
        parents: parents.iter().map(|p| p.to_string()).collect(),
        tree_hash: tree_hash.to_string(),
        changed_files: changed_files.iter().map(|f| f.to_string()).collect(),
        html_url: None,
    }
}

/// In-memory commit graph that records every fetch.
#[derive(Debug, Default)]
pub struct ScriptedHistory {
    commits: HashMap<String, Commit>,
    failing: HashSet<String>,
    fetched: RefCell<Vec<String>>,
}

impl ScriptedHistory {
    pub fn new(commits: Vec<Commit>) -> Self {
        Self {
            commits: commits
                .into_iter()
                .map(|commit| (commit.hash.clone(), commit))
                .collect(),
            ..Self::default()
        }
    }

    /// Linear history `c0 <- c1 <- ...` where `c0` is the head.
    ///
    /// Each entry is `(tree_hash, changed_files)`; the last commit is a root.
    pub fn linear(entries: &[(&str, &[&str])]) -> Self {
        let commits = entries
            .iter()
            .enumerate()
            .map(|(index, (tree, files))| {
                let hash = format!("c{index}");
                let parent = format!("c{}", index + 1);
                let parents: Vec<&str> = if index + 1 < entries.len() {
                    vec![parent.as_str()]
                } else {
                    Vec::new()
                };
                commit(&hash, tree, files, &parents)
            })
            .collect();
        Self::new(commits)
    }

    /// Make fetching `hash` fail.
    pub fn fail_on(mut self, hash: &str) -> Self {
        self.failing.insert(hash.to_string());
        self
    }

    /// Hashes requested so far, in order.
    pub fn fetched(&self) -> Vec<String> {
        self.fetched.borrow().clone()
    }
}

impl CommitHistory for ScriptedHistory {
    fn commit(&self, hash: &str) -> Result<Option<Commit>> {
        self.fetched.borrow_mut().push(hash.to_string());
        if self.failing.contains(hash) {
            return Err(anyhow!("scripted fetch failure for {hash}"));
        }
        Ok(self.commits.get(hash).cloned())
    }
}

/// Registry returning a fixed current run and run list.
#[derive(Debug, Clone)]
pub struct ScriptedRegistry {
    pub current: Option<Run>,
    pub runs: Option<Vec<Run>>,
}

impl ScriptedRegistry {
    /// `runs` may include `current`; the decision engine removes it.
    pub fn new(current: Run, runs: Vec<Run>) -> Self {
        Self {
            current: Some(current),
            runs: Some(runs),
        }
    }
}

impl RunRegistry for ScriptedRegistry {
    fn current_run(&self) -> Result<Run> {
        self.current
            .clone()
            .ok_or_else(|| anyhow!("scripted current run unavailable"))
    }

    fn workflow_runs(&self, workflow_id: u64) -> Result<Vec<Run>> {
        let runs = self
            .runs
            .as_ref()
            .ok_or_else(|| anyhow!("scripted run list unavailable"))?;
        Ok(runs
            .iter()
            .filter(|run| run.workflow_id == workflow_id)
            .cloned()
            .collect())
    }
}

/// Canceller that records requests and replays scripted outcomes.
#[derive(Debug, Default)]
pub struct RecordingCanceller {
    /// Status codes per run id; unlisted ids return 0.
    pub codes: HashMap<u64, i32>,
    /// Run ids whose cancellation errors out.
    pub failing: HashSet<u64>,
    requested: RefCell<Vec<u64>>,
}

impl RecordingCanceller {
    pub fn requested(&self) -> Vec<u64> {
        self.requested.borrow().clone()
    }
}

impl RunCanceller for RecordingCanceller {
    fn cancel_run(&self, run_id: u64) -> Result<i32> {
        self.requested.borrow_mut().push(run_id);
        if self.failing.contains(&run_id) {
            return Err(anyhow!("scripted cancel failure for {run_id}"));
        }
        Ok(self.codes.get(&run_id).copied().unwrap_or(0))
    }
}

/// Temporary git repository for adapter and CLI tests.
pub struct TestRepo {
    dir: TempDir,
}

impl TestRepo {
    pub fn new() -> Result<Self> {
        let dir = tempfile::tempdir().context("create temp repo dir")?;
        let repo = Self { dir };
        repo.git(&["init", "--quiet"])?;
        repo.git(&["config", "user.email", "ci@example.com"])?;
        repo.git(&["config", "user.name", "CI"])?;
        repo.git(&["config", "commit.gpgsign", "false"])?;
        Ok(repo)
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write `files` (path, contents) and commit them; returns the commit hash.
    pub fn commit_files(&self, files: &[(&str, &str)], message: &str) -> Result<String> {
        for (path, contents) in files {
            let full = self.path().join(path);
            if let Some(parent) = full.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("create {}", parent.display()))?;
            }
            std::fs::write(&full, contents).with_context(|| format!("write {}", full.display()))?;
        }
        self.git(&["add", "-A"])?;
        self.git(&["commit", "--quiet", "--allow-empty", "-m", message])?;
        self.rev_parse("HEAD")
    }

    /// Resolve a revision, e.g. `HEAD^{tree}`.
    pub fn rev_parse(&self, rev: &str) -> Result<String> {
        Ok(self.git(&["rev-parse", rev])?.trim().to_string())
    }

    pub fn git(&self, args: &[&str]) -> Result<String> {
        let output = Command::new("git")
            .args(args)
            .current_dir(self.path())
            .output()
            .with_context(|| format!("spawn git {}", args.join(" ")))?;
        if !output.status.success() {
            return Err(anyhow!(
                "git {} failed: {}",
                args.join(" "),
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}
