//! Retrieval of recent commands through the shell's own `history` builtin.
//!
//! `undo` is itself the newest history entry when it runs, so one extra line
//! is requested and the last one is dropped.

use anyhow::{anyhow, Result};
use regex_lite::Regex;
use tracing::debug;

use crate::executor::ProcessRunner;

/// History output formats understood by [`parse_history`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryFormat {
    /// `  42  command`, as printed by `sh` and `bash`.
    Numbered,
    /// One bare command per line, as printed by `fish`.
    Plain,
}

impl HistoryFormat {
    pub fn for_shell(shell: &str) -> Option<Self> {
        match shell {
            "sh" | "bash" => Some(HistoryFormat::Numbered),
            "fish" => Some(HistoryFormat::Plain),
            _ => None,
        }
    }
}

/// The command line that prints the last `count` history entries.
fn history_command(shell: &str, count: usize) -> Result<(String, Vec<String>)> {
    match shell {
        "sh" | "bash" => Ok((shell.to_string(), vec!["-c".to_string(), format!("history {}", count)])),
        "fish" => Ok((
            shell.to_string(),
            vec![
                "--command".to_string(),
                format!("history --reverse --max {}", count),
            ],
        )),
        _ => Err(anyhow!("unsupported shell '{}'", shell)),
    }
}

/// Returns up to `limit` of the most recent commands run in `shell`, oldest
/// first, excluding the invocation of `undo` itself.
///
/// # Errors
///
/// Returns an error if the shell is unsupported, the history command cannot
/// be run, or a line of its output cannot be parsed.
pub async fn history<P: ProcessRunner>(shell: &str, limit: usize, runner: &P) -> Result<Vec<String>> {
    let format = HistoryFormat::for_shell(shell).ok_or_else(|| anyhow!("unsupported shell '{}'", shell))?;
    let (program, args) = history_command(shell, limit + 1)?;
    let args: Vec<&str> = args.iter().map(String::as_str).collect();

    debug!("Running history command '{} {}'", program, args.join(" "));
    let output = runner.output(&program, &args).await?;
    if !output.status.success() {
        return Err(anyhow!("history command failed with {}", output.status));
    }

    parse_history(&String::from_utf8_lossy(&output.stdout), limit, format)
}

/// Extracts the last `limit` commands from history output, ignoring its
/// final line.
pub fn parse_history(text: &str, limit: usize, format: HistoryFormat) -> Result<Vec<String>> {
    let lines: Vec<&str> = text.lines().map(str::trim_end).collect();
    let Some((_, previous)) = lines.split_last() else {
        return Ok(Vec::new());
    };
    let previous = &previous[previous.len().saturating_sub(limit)..];

    match format {
        HistoryFormat::Plain => Ok(previous.iter().map(|line| line.to_string()).collect()),
        HistoryFormat::Numbered => {
            let numbered = Regex::new(r"^\s*[1-9][0-9]*\s+(.*)$")?;
            previous
                .iter()
                .map(|line| {
                    numbered
                        .captures(line)
                        .and_then(|captures| captures.get(1))
                        .map(|command| command.as_str().to_string())
                        .ok_or_else(|| anyhow!("could not parse command from history line '{}'", line))
                })
                .collect()
        }
    }
}
