//! Skip decision CLI.
//!
//! Reads a workflow run snapshot and a local git clone, then prints the skip
//! decision as JSON. The exit code tells CI scripts whether to run the job.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use skipcheck::decide::decide;
use skipcheck::exit_codes;
use skipcheck::io::cancel::{CommandCanceller, RunCanceller};
use skipcheck::io::config::{DEFAULT_CONFIG_FILE, SkipConfig, load_config};
use skipcheck::io::history::GitHistory;
use skipcheck::io::registry::JsonRunRegistry;
use skipcheck::logging;

#[derive(Parser)]
#[command(
    name = "skipcheck",
    version,
    about = "Decide whether a CI workflow run can be skipped"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the skip decision for the current run as JSON.
    Decide {
        /// JSON snapshot of workflow runs (`current_run_id` and `runs`).
        #[arg(long)]
        runs: PathBuf,
        /// Skip configuration (defaults to `<repo>/.skipcheck.toml`).
        #[arg(long)]
        config: Option<PathBuf>,
        /// Git working directory to read commit history from.
        #[arg(long, default_value = ".")]
        repo: PathBuf,
        /// Prefix for commit URLs, e.g. `https://github.com/owner/repo/commit/`.
        #[arg(long)]
        commit_url_prefix: Option<String>,
        /// Command that cancels a run; the run id is appended as last argument.
        #[arg(long, num_args = 1.., value_name = "ARG")]
        cancel_command: Vec<String>,
    },
    /// Load and validate the skip configuration.
    Validate {
        /// Skip configuration (defaults to `<repo>/.skipcheck.toml`).
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long, default_value = ".")]
        repo: PathBuf,
    },
}

fn main() {
    logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Decide {
            runs,
            config,
            repo,
            commit_url_prefix,
            cancel_command,
        } => cmd_decide(
            &runs,
            config.as_deref(),
            &repo,
            commit_url_prefix,
            cancel_command,
        ),
        Command::Validate { config, repo } => {
            load(config.as_deref(), &repo)?;
            Ok(exit_codes::RUN)
        }
    }
}

fn cmd_decide(
    runs: &Path,
    config: Option<&Path>,
    repo: &Path,
    commit_url_prefix: Option<String>,
    cancel_command: Vec<String>,
) -> Result<i32> {
    let cfg = load(config, repo)?;
    let registry = JsonRunRegistry::load(runs)?;
    let mut history = GitHistory::new(repo);
    if let Some(prefix) = commit_url_prefix {
        history = history.with_url_prefix(prefix);
    }
    let canceller = if cancel_command.is_empty() {
        None
    } else {
        Some(CommandCanceller::new(cancel_command)?)
    };

    let decision = decide(
        &cfg,
        &registry,
        &history,
        canceller.as_ref().map(|c| c as &dyn RunCanceller),
    )?;

    let payload = serde_json::to_string_pretty(&decision).context("serialize decision")?;
    println!("{payload}");
    Ok(if decision.should_skip {
        exit_codes::SKIP
    } else {
        exit_codes::RUN
    })
}

/// Load config from `config`, or from `<repo>/.skipcheck.toml` if unset.
fn load(config: Option<&Path>, repo: &Path) -> Result<SkipConfig> {
    let path = match config {
        Some(path) => path.to_path_buf(),
        None => repo.join(DEFAULT_CONFIG_FILE),
    };
    load_config(&path)
}
