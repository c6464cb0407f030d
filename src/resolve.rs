//! Finds the registry entries that apply to a command line.

use std::path::PathBuf;
use tracing::{debug, error, info};

use crate::env::Environment;
use crate::pattern::{compile, parse_command_pattern};
use crate::registry::RegistryFile;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Keep looking after the first registry file that matched.
    pub search_all: bool,
    /// Also accept entries not marked `precise`.
    pub allow_imprecise: bool,
}

/// A registry entry that matched, with the bindings its template needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub env: Environment,
    pub template: String,
    pub pattern: String,
    pub precise: bool,
    pub source: PathBuf,
}

/// Matches `argv` against every entry of `registries`, in order.
///
/// Registries that do not support `shell` are skipped, as are entries whose
/// pattern cannot be parsed. Unless `options.search_all` is set, no registry
/// after the first one yielding a match is consulted.
pub fn resolve<S, I>(argv: &[S], registries: I, shell: &str, options: ResolveOptions) -> Vec<Resolution>
where
    S: AsRef<str>,
    I: IntoIterator<Item = RegistryFile>,
{
    let mut resolutions = Vec::new();

    for registry in registries {
        if !registry.is_shell_supported(shell) {
            debug!("{} does not support shell '{}'", registry.path.display(), shell);
            continue;
        }

        let found = resolve_in(argv, &registry, options);
        if found.is_empty() {
            continue;
        }

        info!("{} matching entr(y/ies) in {}", found.len(), registry.path.display());
        resolutions.extend(found);

        if !options.search_all {
            break;
        }
    }

    resolutions
}

fn resolve_in<S: AsRef<str>>(argv: &[S], registry: &RegistryFile, options: ResolveOptions) -> Vec<Resolution> {
    let mut found = Vec::new();

    for entry in &registry.entries {
        let pattern = match parse_command_pattern(&entry.cmd) {
            Ok(pattern) => pattern,
            Err(e) => {
                error!("Skipping entry in {}: {}", registry.path.display(), e);
                continue;
            }
        };

        let env = match compile(&pattern).bind(argv) {
            Ok(env) => env,
            Err(no_match) => {
                debug!("'{}' did not match: {}", entry.cmd, no_match);
                continue;
            }
        };

        if !entry.precise && !options.allow_imprecise {
            debug!("'{}' matched but is not precise", entry.cmd);
            continue;
        }

        info!("'{}' matched", entry.cmd);
        found.push(Resolution {
            env,
            template: entry.undo.clone(),
            pattern: entry.cmd.clone(),
            precise: entry.precise,
            source: registry.path.clone(),
        });
    }

    found
}
