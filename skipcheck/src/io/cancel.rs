//! Cancellation port for outdated workflow runs.

use std::process::Command;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, instrument};

/// Best-effort cancellation of a single run.
pub trait RunCanceller {
    /// Request cancellation of `run_id`; returns the backend status code (0 = ok).
    fn cancel_run(&self, run_id: u64) -> Result<i32>;
}

/// Cancels runs by spawning a command with the run id appended,
/// e.g. `["gh", "run", "cancel"]`.
#[derive(Debug, Clone)]
pub struct CommandCanceller {
    command: Vec<String>,
}

impl CommandCanceller {
    pub fn new(command: Vec<String>) -> Result<Self> {
        if command.first().is_none_or(|program| program.trim().is_empty()) {
            return Err(anyhow!("cancel command must be a non-empty array"));
        }
        Ok(Self { command })
    }
}

impl RunCanceller for CommandCanceller {
    #[instrument(skip(self))]
    fn cancel_run(&self, run_id: u64) -> Result<i32> {
        let (program, args) = self
            .command
            .split_first()
            .ok_or_else(|| anyhow!("cancel command is empty"))?;
        let status = Command::new(program)
            .args(args)
            .arg(run_id.to_string())
            .status()
            .with_context(|| format!("spawn {}", self.command.join(" ")))?;
        let code = status
            .code()
            .ok_or_else(|| anyhow!("{program} terminated by signal"))?;
        debug!(code, "cancel command finished");
        Ok(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_command() {
        assert!(CommandCanceller::new(Vec::new()).is_err());
        assert!(CommandCanceller::new(vec![" ".to_string()]).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn returns_exit_code_of_command() {
        let ok = CommandCanceller::new(vec!["true".to_string()]).expect("command");
        assert_eq!(ok.cancel_run(7).expect("cancel"), 0);
        let failing = CommandCanceller::new(vec!["false".to_string()]).expect("command");
        assert_ne!(failing.cancel_run(7).expect("cancel"), 0);
    }

    #[test]
    fn missing_program_is_an_error() {
        let canceller =
            CommandCanceller::new(vec!["skipcheck-definitely-missing-binary".to_string()])
                .expect("command");
        assert!(canceller.cancel_run(1).is_err());
    }
}
