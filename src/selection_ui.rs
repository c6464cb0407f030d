//! Terminal prompts for choosing which undo command to run.

use anyhow::Result;
use std::io::{self, BufRead, Write};
use tracing::info;

/// Handles user interaction when more than one undo command applies, or when
/// confirmation was requested.
///
/// # Example
///
/// ```no_run
/// use undo::selection_ui::SelectionUI;
///
/// let ui = SelectionUI::new();
/// let commands = vec!["rm a".to_string(), "rm -r a".to_string()];
///
/// if let Some(index) = ui.select(&commands)? {
///     println!("running {}", commands[index]);
/// }
/// # Ok::<(), anyhow::Error>(())
/// ```
#[derive(Debug, Default)]
pub struct SelectionUI;

impl SelectionUI {
    pub fn new() -> Self {
        Self
    }

    // =========================================================================
    // Core methods with I/O injection (testable)
    // =========================================================================

    /// Asks whether to run a single command. An empty answer means yes.
    ///
    /// # Errors
    ///
    /// Returns an error if I/O operations fail.
    pub fn confirm_with_io<R: BufRead, W: Write>(&self, command: &str, input: &mut R, output: &mut W) -> Result<bool> {
        write!(output, "run command '{}'? [Y/n] ", command)?;
        output.flush()?;

        let mut line = String::new();
        input.read_line(&mut line)?;
        let answer = line.trim().to_lowercase();

        let accepted = answer.is_empty() || answer == "y";
        info!("User {} '{}'", if accepted { "accepted" } else { "declined" }, command);
        Ok(accepted)
    }

    /// Shows a numbered menu and reads the index of the chosen command.
    ///
    /// Invalid input is reported and selects nothing; there is no retry.
    ///
    /// # Returns
    ///
    /// The zero-based index of the selection, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if I/O operations fail.
    pub fn select_with_io<R: BufRead, W: Write>(
        &self,
        commands: &[String],
        input: &mut R,
        output: &mut W,
    ) -> Result<Option<usize>> {
        writeln!(output, "Please select the command to run (invalid input will run no commands):")?;
        Self::write_numbered(commands, output)?;
        write!(output, "selection: ")?;
        output.flush()?;

        let mut line = String::new();
        input.read_line(&mut line)?;
        let selection = line.trim();

        let number = match selection.parse::<usize>() {
            Ok(number) => number,
            Err(_) => {
                writeln!(output, "input '{}' is not a valid number", selection)?;
                return Ok(None);
            }
        };

        if number == 0 || number > commands.len() {
            writeln!(output, "input '{}' does not match any command", number)?;
            return Ok(None);
        }

        info!("User selected command {}", number);
        Ok(Some(number - 1))
    }

    /// Lists the candidates without running any of them.
    pub fn show_candidates_with_io<W: Write>(&self, commands: &[String], output: &mut W) -> Result<()> {
        writeln!(output, "multiple undo commands found, copy one of the commands below to run:")?;
        Self::write_numbered(commands, output)
    }

    /// Prints each candidate on its own line.
    pub fn show_dry_run_with_io<W: Write>(&self, commands: &[String], output: &mut W) -> Result<()> {
        for command in commands {
            writeln!(output, "{}", command)?;
        }
        Ok(())
    }

    pub fn show_no_match_with_io<W: Write>(&self, command: &str, output: &mut W) -> Result<()> {
        writeln!(output, "no command was found to undo '{}'", command)?;
        Ok(())
    }

    pub fn show_nothing_selected_with_io<W: Write>(&self, output: &mut W) -> Result<()> {
        writeln!(output, "no command was selected")?;
        Ok(())
    }

    fn write_numbered<W: Write>(commands: &[String], output: &mut W) -> Result<()> {
        for (i, command) in commands.iter().enumerate() {
            writeln!(output, "  {} ) {}", i + 1, command)?;
        }
        Ok(())
    }

    // =========================================================================
    // Convenience methods using stdin/stdout
    // =========================================================================

    pub fn confirm(&self, command: &str) -> Result<bool> {
        self.confirm_with_io(command, &mut io::stdin().lock(), &mut io::stdout())
    }

    pub fn select(&self, commands: &[String]) -> Result<Option<usize>> {
        self.select_with_io(commands, &mut io::stdin().lock(), &mut io::stdout())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn commands() -> Vec<String> {
        vec!["rm a".to_string(), "rm -r a".to_string()]
    }

    fn confirm(answer: &str) -> bool {
        let ui = SelectionUI::new();
        let mut input = Cursor::new(answer.as_bytes().to_vec());
        let mut output = Vec::new();
        ui.confirm_with_io("rm a", &mut input, &mut output).unwrap()
    }

    fn select(answer: &str) -> (Option<usize>, String) {
        let ui = SelectionUI::new();
        let mut input = Cursor::new(answer.as_bytes().to_vec());
        let mut output = Vec::new();
        let selected = ui.select_with_io(&commands(), &mut input, &mut output).unwrap();
        (selected, String::from_utf8(output).unwrap())
    }

    #[test]
    fn test_confirm_defaults_to_yes() {
        assert!(confirm("\n"));
        assert!(confirm("y\n"));
        assert!(confirm("Y\n"));
        assert!(confirm(""));
    }

    #[test]
    fn test_confirm_anything_else_is_no() {
        assert!(!confirm("n\n"));
        assert!(!confirm("yes please\n"));
    }

    #[test]
    fn test_confirm_prompt_text() {
        let ui = SelectionUI::new();
        let mut output = Vec::new();
        ui.confirm_with_io("rm a", &mut Cursor::new(b"y\n".to_vec()), &mut output).unwrap();

        assert_eq!(String::from_utf8(output).unwrap(), "run command 'rm a'? [Y/n] ");
    }

    #[test]
    fn test_select_valid_number() {
        let (selected, output) = select("2\n");

        assert_eq!(selected, Some(1));
        assert!(output.contains("  1 ) rm a\n  2 ) rm -r a\n"));
        assert!(output.ends_with("selection: "));
    }

    #[test]
    fn test_select_out_of_range() {
        let (selected, output) = select("3\n");

        assert_eq!(selected, None);
        assert!(output.contains("input '3' does not match any command"));

        let (selected, _) = select("0\n");
        assert_eq!(selected, None);
    }

    #[test]
    fn test_select_not_a_number() {
        let (selected, output) = select("first\n");

        assert_eq!(selected, None);
        assert!(output.contains("input 'first' is not a valid number"));
    }

    #[test]
    fn test_show_candidates() {
        let ui = SelectionUI::new();
        let mut output = Vec::new();
        ui.show_candidates_with_io(&commands(), &mut output).unwrap();

        let output = String::from_utf8(output).unwrap();
        assert!(output.starts_with("multiple undo commands found"));
        assert!(output.ends_with("  2 ) rm -r a\n"));
    }
}
