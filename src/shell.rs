//! Detection of the shell `undo` was invoked from.
//!
//! Registries declare which shells they support and history retrieval
//! depends on the shell's own builtin, so the name matters in both places.
//! Detection sits behind a trait so callers can force a shell.

use std::fs;
use std::path::Path;
use tracing::debug;

/// Provides the name of the current shell, without any leading path
/// (`bash` rather than `/usr/bin/bash`).
pub trait ShellProvider: Send + Sync {
    fn shell(&self) -> Option<String>;
}

/// Reads the name of the parent process from `/proc/<ppid>/comm`, falling
/// back to the basename of `$SHELL`.
pub struct ParentProcessShell;

impl ShellProvider for ParentProcessShell {
    fn shell(&self) -> Option<String> {
        let comm = Path::new("/proc")
            .join(std::os::unix::process::parent_id().to_string())
            .join("comm");

        match fs::read_to_string(&comm) {
            Ok(name) => shell_name(&name),
            Err(e) => {
                debug!("Could not read {}: {}", comm.display(), e);
                std::env::var("SHELL").ok().and_then(|path| shell_name(&path))
            }
        }
    }
}

/// A shell chosen by configuration.
pub struct FixedShell(pub String);

impl ShellProvider for FixedShell {
    fn shell(&self) -> Option<String> {
        shell_name(&self.0)
    }
}

/// Normalizes a process name or path to a bare shell name. Login shells
/// report themselves with a leading `-`.
pub fn shell_name(raw: &str) -> Option<String> {
    let name = raw.trim();
    let name = name.rsplit('/').next().unwrap_or(name);
    let name = name.trim_start_matches('-');

    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shell_name_strips_path_and_newline() {
        assert_eq!(shell_name("bash\n"), Some("bash".to_string()));
        assert_eq!(shell_name("/usr/bin/fish"), Some("fish".to_string()));
        assert_eq!(shell_name("-zsh"), Some("zsh".to_string()));
        assert_eq!(shell_name("  "), None);
        assert_eq!(shell_name("/bin/"), None);
    }

    #[test]
    fn test_fixed_shell() {
        assert_eq!(FixedShell("/bin/sh".to_string()).shell(), Some("sh".to_string()));
    }
}
