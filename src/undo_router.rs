use crate::{
    config::Config,
    executor::{split_command, Executor, ProcessRunner, SystemProcessRunner},
    expand::{expand, DEFAULT_BOUNDS},
    history::history,
    registry::DirectoryLoader,
    resolve::{resolve, Resolution, ResolveOptions},
    selection_ui::SelectionUI,
    shell::{FixedShell, ParentProcessShell, ShellProvider},
};
use anyhow::{anyhow, Result};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing::{error, info, warn};

/// Per-invocation choices made on the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UndoRequest {
    /// Undo this command instead of the last one in history.
    pub command: Option<String>,
    pub dry: bool,
    pub interactive: bool,
}

/// An expanded undo, ready to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Commands run one after the other.
    pub commands: Vec<String>,
    /// The commands joined with the configured separator.
    pub display: String,
    pub source: PathBuf,
}

/// What a request ended up doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    NothingFound,
    Shown(Vec<Candidate>),
    Ran(Candidate),
    NothingSelected,
}

pub struct UndoRouter<P: ProcessRunner = SystemProcessRunner> {
    config: Config,
    loader: DirectoryLoader,
    shell: Box<dyn ShellProvider>,
    executor: Executor<P>,
    ui: SelectionUI,
}

impl UndoRouter {
    pub fn new(config: Config) -> Self {
        let shell: Box<dyn ShellProvider> = match &config.shell {
            Some(shell) => Box::new(FixedShell(shell.clone())),
            None => Box::new(ParentProcessShell),
        };
        Self::with_deps(config, shell, SystemProcessRunner)
    }
}

impl<P: ProcessRunner> UndoRouter<P> {
    /// Creates a router with injected dependencies (for testing).
    pub fn with_deps(config: Config, shell: Box<dyn ShellProvider>, runner: P) -> Self {
        Self {
            loader: DirectoryLoader::new(config.include_dirs.clone()),
            config,
            shell,
            executor: Executor::with_runner(runner),
            ui: SelectionUI::new(),
        }
    }

    pub async fn process(&self, request: &UndoRequest) -> Result<Outcome> {
        self.process_with_io(request, &mut io::stdin().lock(), &mut io::stdout()).await
    }

    /// Resolves, expands and, depending on the request, runs or shows the
    /// undo of a command.
    ///
    /// # Errors
    ///
    /// Returns an error if the shell cannot be determined, history cannot be
    /// read, the command cannot be split into words, or the chosen undo
    /// command fails.
    pub async fn process_with_io<R: BufRead, W: Write>(
        &self,
        request: &UndoRequest,
        input: &mut R,
        output: &mut W,
    ) -> Result<Outcome> {
        let shell = self
            .shell
            .shell()
            .ok_or_else(|| anyhow!("Could not determine the current shell"))?;

        let command = match &request.command {
            Some(command) => command.clone(),
            None => history(&shell, 1, self.executor.runner())
                .await?
                .pop()
                .ok_or_else(|| anyhow!("No previous command found in {} history", shell))?,
        };
        info!("Undoing '{}' from {}", command, shell);

        let candidates = self.candidates(&command, &shell)?;
        let displays: Vec<String> = candidates.iter().map(|c| c.display.clone()).collect();

        if candidates.is_empty() {
            self.ui.show_no_match_with_io(&command, output)?;
            return Ok(Outcome::NothingFound);
        }

        if request.dry {
            self.ui.show_dry_run_with_io(&displays, output)?;
            return Ok(Outcome::Shown(candidates));
        }

        if !request.interactive {
            if let [candidate] = candidates.as_slice() {
                self.executor.run_all(&candidate.commands).await?;
                return Ok(Outcome::Ran(candidate.clone()));
            }
            self.ui.show_candidates_with_io(&displays, output)?;
            return Ok(Outcome::Shown(candidates));
        }

        let selected = if candidates.len() == 1 {
            self.ui
                .confirm_with_io(&displays[0], input, output)?
                .then_some(0)
        } else {
            self.ui.select_with_io(&displays, input, output)?
        };

        match selected {
            Some(index) => {
                let candidate = candidates[index].clone();
                self.executor.run_all(&candidate.commands).await?;
                Ok(Outcome::Ran(candidate))
            }
            None => {
                self.ui.show_nothing_selected_with_io(output)?;
                Ok(Outcome::NothingSelected)
            }
        }
    }

    /// Every undo that applies to `command`, expanded. Entries whose
    /// template fails to expand are logged and left out.
    pub fn candidates(&self, command: &str, shell: &str) -> Result<Vec<Candidate>> {
        let argv = split_command(command)?;
        let options = ResolveOptions {
            search_all: self.config.search_all,
            allow_imprecise: self.config.allow_imprecise,
        };

        let resolutions = resolve(&argv, self.loader.registries(), shell, options);
        Ok(resolutions
            .into_iter()
            .filter_map(|resolution| self.expand_resolution(resolution))
            .collect())
    }

    fn expand_resolution(&self, resolution: Resolution) -> Option<Candidate> {
        let commands = match expand(&resolution.template, &resolution.env, DEFAULT_BOUNDS, None) {
            Ok(expanded) => expanded.into_commands(),
            Err(e) => {
                error!("Could not expand '{}' from {}: {}", resolution.template, resolution.source.display(), e);
                return None;
            }
        };

        if commands.is_empty() {
            warn!("'{}' expanded to no commands", resolution.template);
            return None;
        }

        Some(Candidate {
            display: commands.join(&self.config.command_separator),
            commands,
            source: resolution.source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::fs;
    use std::io::Cursor;
    use std::os::unix::process::ExitStatusExt;
    use std::process::{ExitStatus, Output};
    use std::sync::Mutex;
    use tempfile::TempDir;

    // =========================================================================
    // Mock implementations
    // =========================================================================

    #[derive(Default)]
    struct MockProcessRunner {
        history: &'static str,
        ran: Mutex<Vec<String>>,
    }

    impl MockProcessRunner {
        fn ran(&self) -> Vec<String> {
            self.ran.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ProcessRunner for MockProcessRunner {
        async fn status(&self, program: &str, args: &[&str]) -> Result<ExitStatus> {
            let mut words = vec![program];
            words.extend_from_slice(args);
            self.ran.lock().unwrap().push(words.join(" "));
            Ok(ExitStatus::from_raw(0))
        }

        async fn output(&self, _program: &str, _args: &[&str]) -> Result<Output> {
            Ok(Output {
                status: ExitStatus::from_raw(0),
                stdout: self.history.as_bytes().to_vec(),
                stderr: vec![],
            })
        }

        fn program_exists(&self, _program: &str) -> bool {
            true
        }
    }

    const REGISTRY: &str = r#"
[[entry]]
cmd = "mkdir [PARENTS?:-p --parents] <DIRS...>"
undo = "rm -d % $DIRS %"
precise = true

[[entry]]
cmd = "touch <FILES...>"
undo = "rm % $FILES... %"
precise = true

[[entry]]
cmd = "touch <FILES...>"
undo = "rm -f % $FILES... %"
precise = true

[[entry]]
cmd = "broken <A>"
undo = "echo %unclosed"
precise = true
"#;

    fn router(dir: &TempDir, runner: MockProcessRunner) -> UndoRouter<MockProcessRunner> {
        fs::write(dir.path().join("registry.toml"), REGISTRY).unwrap();
        let config = Config {
            include_dirs: vec![dir.path().to_path_buf()],
            ..Default::default()
        };
        UndoRouter::with_deps(config, Box::new(FixedShell("bash".to_string())), runner)
    }

    fn request(command: &str) -> UndoRequest {
        UndoRequest {
            command: Some(command.to_string()),
            ..Default::default()
        }
    }

    async fn run(router: &UndoRouter<MockProcessRunner>, request: &UndoRequest, input: &str) -> (Outcome, String) {
        let mut input = Cursor::new(input.as_bytes().to_vec());
        let mut output = Vec::new();
        let outcome = router.process_with_io(request, &mut input, &mut output).await.unwrap();
        (outcome, String::from_utf8(output).unwrap())
    }

    #[test]
    fn test_candidates_join_broadcast_commands() {
        let dir = TempDir::new().unwrap();
        let router = router(&dir, MockProcessRunner::default());

        let candidates = router.candidates("mkdir -p a b", "bash").unwrap();

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].commands, vec!["rm -d a", "rm -d b"]);
        assert_eq!(candidates[0].display, "rm -d a; rm -d b");
    }

    #[test]
    fn test_failed_expansion_is_dropped() {
        let dir = TempDir::new().unwrap();
        let router = router(&dir, MockProcessRunner::default());

        assert!(router.candidates("broken x", "bash").unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_no_match_message() {
        let dir = TempDir::new().unwrap();
        let router = router(&dir, MockProcessRunner::default());

        let (outcome, output) = run(&router, &request("ls -l"), "").await;

        assert_eq!(outcome, Outcome::NothingFound);
        assert_eq!(output, "no command was found to undo 'ls -l'\n");
    }

    #[tokio::test]
    async fn test_single_candidate_runs_every_command() {
        let dir = TempDir::new().unwrap();
        let router = router(&dir, MockProcessRunner::default());

        let (outcome, _) = run(&router, &request("mkdir a b"), "").await;

        assert!(matches!(outcome, Outcome::Ran(_)));
        assert_eq!(router.executor.runner().ran(), vec!["rm -d a", "rm -d b"]);
    }

    #[tokio::test]
    async fn test_dry_run_prints_and_runs_nothing() {
        let dir = TempDir::new().unwrap();
        let router = router(&dir, MockProcessRunner::default());
        let request = UndoRequest {
            dry: true,
            ..request("mkdir a")
        };

        let (outcome, output) = run(&router, &request, "").await;

        assert!(matches!(outcome, Outcome::Shown(_)));
        assert_eq!(output, "rm -d a\n");
        assert!(router.executor.runner().ran().is_empty());
    }

    #[tokio::test]
    async fn test_multiple_candidates_are_listed() {
        let dir = TempDir::new().unwrap();
        let router = router(&dir, MockProcessRunner::default());

        let (outcome, output) = run(&router, &request("touch a"), "").await;

        assert!(matches!(outcome, Outcome::Shown(ref c) if c.len() == 2));
        assert!(output.contains("  1 ) rm a\n  2 ) rm -f a\n"));
        assert!(router.executor.runner().ran().is_empty());
    }

    #[tokio::test]
    async fn test_interactive_selection() {
        let dir = TempDir::new().unwrap();
        let router = router(&dir, MockProcessRunner::default());
        let request = UndoRequest {
            interactive: true,
            ..request("touch a")
        };

        let (outcome, _) = run(&router, &request, "2\n").await;

        assert!(matches!(outcome, Outcome::Ran(_)));
        assert_eq!(router.executor.runner().ran(), vec!["rm -f a"]);
    }

    #[tokio::test]
    async fn test_interactive_invalid_selection_runs_nothing() {
        let dir = TempDir::new().unwrap();
        let router = router(&dir, MockProcessRunner::default());
        let request = UndoRequest {
            interactive: true,
            ..request("touch a")
        };

        let (outcome, output) = run(&router, &request, "x\n").await;

        assert_eq!(outcome, Outcome::NothingSelected);
        assert!(output.ends_with("no command was selected\n"));
        assert!(router.executor.runner().ran().is_empty());
    }

    #[tokio::test]
    async fn test_interactive_single_candidate_confirms() {
        let dir = TempDir::new().unwrap();
        let router = router(&dir, MockProcessRunner::default());
        let request = UndoRequest {
            interactive: true,
            ..request("mkdir a")
        };

        let (outcome, output) = run(&router, &request, "n\n").await;

        assert_eq!(outcome, Outcome::NothingSelected);
        assert!(output.starts_with("run command 'rm -d a'? [Y/n] "));
    }

    #[tokio::test]
    async fn test_command_taken_from_history() {
        let dir = TempDir::new().unwrap();
        let runner = MockProcessRunner {
            history: "  7  mkdir build\n  8  undo\n",
            ..Default::default()
        };
        let router = router(&dir, runner);

        let (outcome, _) = run(&router, &UndoRequest::default(), "").await;

        assert!(matches!(outcome, Outcome::Ran(_)));
        assert_eq!(router.executor.runner().ran(), vec!["rm -d build"]);
    }
}
