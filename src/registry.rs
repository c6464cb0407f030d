//! Registry files: TOML documents pairing command patterns with the
//! templates that undo them.
//!
//! ```toml
//! supported-shells = ["bash", "sh"]
//!
//! [[entry]]
//! cmd = "mkdir [PARENTS?:-p --parents] <DIRS...>"
//! undo = "rm -d % $DIRS... %"
//! precise = true
//! ```

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

use crate::error::RegistryError;

/// Shell name that matches every shell.
pub const ALL_SHELLS: &str = "all";

/// The `supported-shells` key: a single name (possibly `"all"`) or a list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum SupportedShells {
    One(String),
    Many(Vec<String>),
}

impl Default for SupportedShells {
    fn default() -> Self {
        SupportedShells::One(ALL_SHELLS.to_string())
    }
}

impl SupportedShells {
    pub fn contains(&self, shell: &str) -> bool {
        match self {
            SupportedShells::One(name) => name == ALL_SHELLS || name == shell,
            SupportedShells::Many(names) => names.iter().any(|name| name == ALL_SHELLS || name == shell),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryEntry {
    /// Pattern notation matched against the live command.
    pub cmd: String,
    /// Template expanded into the undo command.
    pub undo: String,
    /// Whether the undo reliably restores the previous state.
    pub precise: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryFile {
    /// Where the registry was read from, for logging and reporting.
    pub path: PathBuf,
    pub supported_shells: SupportedShells,
    pub entries: Vec<RegistryEntry>,
}

#[derive(Deserialize)]
struct RawRegistry {
    #[serde(rename = "supported-shells", default)]
    supported_shells: SupportedShells,
    #[serde(default)]
    entry: Vec<RawEntry>,
}

#[derive(Deserialize)]
struct RawEntry {
    cmd: Option<String>,
    undo: Option<String>,
    #[serde(default)]
    precise: bool,
}

impl RegistryFile {
    /// Parses registry text. `path` is only recorded, never read.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid TOML for a registry, or if
    /// any entry lacks `cmd` or `undo`.
    pub fn parse(path: impl Into<PathBuf>, content: &str) -> Result<Self, RegistryError> {
        let path = path.into();
        let raw: RawRegistry = toml::from_str(content).map_err(|source| RegistryError::Toml {
            path: path.clone(),
            source,
        })?;

        let mut entries = Vec::with_capacity(raw.entry.len());
        for (index, entry) in raw.entry.into_iter().enumerate() {
            let missing = |key| RegistryError::MissingKey {
                path: path.clone(),
                index,
                key,
            };
            let cmd = entry.cmd.ok_or_else(|| missing("cmd"))?;
            let undo = entry.undo.ok_or_else(|| missing("undo"))?;
            entries.push(RegistryEntry {
                cmd,
                undo,
                precise: entry.precise,
            });
        }

        Ok(Self {
            path,
            supported_shells: raw.supported_shells,
            entries,
        })
    }

    /// Reads and parses the registry at `path`.
    pub fn load(path: &Path) -> Result<Self, RegistryError> {
        let content = fs::read_to_string(path).map_err(|source| RegistryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(path, &content)
    }

    pub fn is_shell_supported(&self, shell: &str) -> bool {
        self.supported_shells.contains(shell)
    }
}

// =============================================================================
// Directory loading
// =============================================================================

/// Yields the registry files found in a list of include directories.
///
/// Directories are visited in the order given, files within a directory in
/// file-name order. Hidden files and anything that is not a regular file are
/// ignored. Files are read only when the iterator reaches them.
#[derive(Debug, Clone)]
pub struct DirectoryLoader {
    dirs: Vec<PathBuf>,
}

impl DirectoryLoader {
    pub fn new<I, P>(dirs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            dirs: dirs.into_iter().map(Into::into).collect(),
        }
    }

    /// Candidate registry paths, lazily, one directory at a time.
    pub fn files(&self) -> impl Iterator<Item = PathBuf> + '_ {
        self.dirs.iter().flat_map(|dir| list_registry_files(dir))
    }

    /// Parsed registries. Files that fail to load are logged and skipped.
    pub fn registries(&self) -> impl Iterator<Item = RegistryFile> + '_ {
        self.files().filter_map(|path| match RegistryFile::load(&path) {
            Ok(registry) => {
                debug!("Loaded {} entries from {}", registry.entries.len(), path.display());
                Some(registry)
            }
            Err(e) => {
                error!("Skipping registry: {}", e);
                None
            }
        })
    }
}

fn list_registry_files(dir: &Path) -> Vec<PathBuf> {
    if !dir.is_dir() {
        debug!("Include directory {} does not exist", dir.display());
        return Vec::new();
    }

    let read_dir = match fs::read_dir(dir) {
        Ok(read_dir) => read_dir,
        Err(e) => {
            error!("Could not list {}: {}", dir.display(), e);
            return Vec::new();
        }
    };

    let mut files: Vec<PathBuf> = read_dir
        .filter_map(|entry| entry.ok())
        .filter(|entry| !entry.file_name().to_string_lossy().starts_with('.'))
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect();
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    info!("Found {} registry file(s) in {}", files.len(), dir.display());
    files
}
