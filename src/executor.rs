//! Process execution for undo commands and shell history queries.
//!
//! Undo commands are split into words and spawned directly, never through a
//! shell, with the terminal's stdio inherited.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::process::{ExitStatus, Output};
use tokio::process::Command;
use tracing::{error, info};

// =============================================================================
// Traits for Dependency Injection
// =============================================================================

/// Trait for running system processes.
///
/// This abstraction enables testing without spawning real processes.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Runs a program with inherited stdio and waits for it.
    async fn status(&self, program: &str, args: &[&str]) -> Result<ExitStatus>;

    /// Runs a program and captures its output.
    async fn output(&self, program: &str, args: &[&str]) -> Result<Output>;

    /// Checks if a program exists in PATH.
    fn program_exists(&self, program: &str) -> bool;
}

/// Default process runner using tokio::process::Command.
pub struct SystemProcessRunner;

#[async_trait]
impl ProcessRunner for SystemProcessRunner {
    async fn status(&self, program: &str, args: &[&str]) -> Result<ExitStatus> {
        Ok(Command::new(program).args(args).status().await?)
    }

    async fn output(&self, program: &str, args: &[&str]) -> Result<Output> {
        Ok(Command::new(program).args(args).output().await?)
    }

    fn program_exists(&self, program: &str) -> bool {
        which::which(program).is_ok()
    }
}

/// Splits a command line into words the way a POSIX shell would.
///
/// # Errors
///
/// Returns an error if quoting is unbalanced or the command is empty.
pub fn split_command(command: &str) -> Result<Vec<String>> {
    let words = shlex::split(command).ok_or_else(|| anyhow!("Could not split command '{}'", command))?;
    if words.is_empty() {
        return Err(anyhow!("No command provided"));
    }
    Ok(words)
}

// =============================================================================
// Executor Implementation
// =============================================================================

/// Runs undo commands.
///
/// # Example
///
/// ```ignore
/// let executor = Executor::new();
/// executor.run_command("rm -d build").await?;
/// ```
pub struct Executor<P: ProcessRunner = SystemProcessRunner> {
    runner: P,
}

impl Executor {
    pub fn new() -> Self {
        Self::with_runner(SystemProcessRunner)
    }
}

impl Default for Executor {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: ProcessRunner> Executor<P> {
    /// Creates an executor with a custom process runner (for testing).
    pub fn with_runner(runner: P) -> Self {
        Self { runner }
    }

    /// Runs a single undo command.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The command cannot be split into words
    /// - The program is not found in PATH
    /// - The process cannot be spawned
    /// - The process exits with a non-zero status
    pub async fn run_command(&self, command: &str) -> Result<()> {
        let words = split_command(command)?;
        let program = &words[0];
        let args: Vec<&str> = words[1..].iter().map(String::as_str).collect();

        if !self.runner.program_exists(program) {
            return Err(anyhow!("Command '{}' not found", program));
        }

        info!("Executing undo command: {} {:?}", program, args);
        let status = self.runner.status(program, &args).await?;

        if status.success() {
            Ok(())
        } else {
            error!("Command failed with status: {}", status);
            Err(anyhow!("'{}' failed with {}", command, status))
        }
    }

    /// Runs several undo commands in order, stopping at the first failure.
    pub async fn run_all(&self, commands: &[String]) -> Result<()> {
        for command in commands {
            self.run_command(command).await?;
        }
        Ok(())
    }

    pub fn runner(&self) -> &P {
        &self.runner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::process::ExitStatusExt;
    use std::sync::Mutex;

    // =========================================================================
    // Mock implementations
    // =========================================================================

    /// Mock process runner recording every invocation.
    struct MockProcessRunner {
        code: i32,
        program_exists: bool,
        calls: Mutex<Vec<Vec<String>>>,
    }

    impl MockProcessRunner {
        fn exiting_with(code: i32) -> Self {
            Self {
                code,
                program_exists: true,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn missing_program() -> Self {
            Self {
                program_exists: false,
                ..Self::exiting_with(0)
            }
        }

        fn calls(&self) -> Vec<Vec<String>> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ProcessRunner for MockProcessRunner {
        async fn status(&self, program: &str, args: &[&str]) -> Result<ExitStatus> {
            let mut call = vec![program.to_string()];
            call.extend(args.iter().map(|a| a.to_string()));
            self.calls.lock().unwrap().push(call);
            Ok(ExitStatus::from_raw(self.code << 8))
        }

        async fn output(&self, _program: &str, _args: &[&str]) -> Result<Output> {
            unreachable!("executor never captures output")
        }

        fn program_exists(&self, _program: &str) -> bool {
            self.program_exists
        }
    }

    #[tokio::test]
    async fn test_run_command_splits_words() {
        let executor = Executor::with_runner(MockProcessRunner::exiting_with(0));

        executor.run_command("mv 'dir/a file' a\\ file").await.unwrap();

        assert_eq!(executor.runner().calls(), vec![vec!["mv", "dir/a file", "a file"]]);
    }

    #[tokio::test]
    async fn test_run_command_failure_is_error() {
        let executor = Executor::with_runner(MockProcessRunner::exiting_with(1));

        let err = executor.run_command("rm x").await.unwrap_err();

        assert!(err.to_string().contains("'rm x' failed"));
    }

    #[tokio::test]
    async fn test_missing_program_is_not_spawned() {
        let executor = Executor::with_runner(MockProcessRunner::missing_program());

        let err = executor.run_command("frobnicate x").await.unwrap_err();

        assert!(err.to_string().contains("Command 'frobnicate' not found"));
        assert!(executor.runner().calls().is_empty());
    }

    #[tokio::test]
    async fn test_run_all_stops_at_first_failure() {
        let executor = Executor::with_runner(MockProcessRunner::exiting_with(2));

        let result = executor.run_all(&["rm a".to_string(), "rm b".to_string()]).await;

        assert!(result.is_err());
        assert_eq!(executor.runner().calls().len(), 1);
    }

    #[test]
    fn test_split_rejects_empty_and_unbalanced() {
        assert!(split_command("").is_err());
        assert!(split_command("rm 'open").is_err());
        assert_eq!(
            split_command("rm -d \"a b\"").unwrap(),
            vec!["rm", "-d", "a b"]
        );
    }
}
