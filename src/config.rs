use anyhow::{anyhow, Result};
use dirs::home_dir;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Separator placed between broadcast undo commands when they are shown
/// together.
pub const DEFAULT_COMMAND_SEPARATOR: &str = "; ";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directories searched for registry files, in order.
    pub include_dirs: Vec<PathBuf>,
    pub allow_imprecise: bool,
    pub search_all: bool,
    /// Forces the shell name instead of detecting it.
    pub shell: Option<String>,
    pub command_separator: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            include_dirs: Vec::new(),
            allow_imprecise: false,
            search_all: false,
            shell: None,
            command_separator: DEFAULT_COMMAND_SEPARATOR.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from file, environment variables, or create default
    pub fn load() -> Result<Self> {
        let mut config = match Self::get_config_path() {
            Ok(path) if path.exists() => Self::load_from_file(&path)?,
            _ => {
                info!("No config file found, using defaults");
                Self::default()
            }
        };

        config.apply_env(|key| std::env::var(key).ok());

        if config.include_dirs.is_empty() {
            config.include_dirs = Self::default_include_dirs();
        }

        Ok(config)
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        info!("Loaded config from: {}", path.display());
        Ok(config)
    }

    /// Environment variables override the config file.
    pub fn apply_env<F: Fn(&str) -> Option<String>>(&mut self, var: F) {
        if let Some(dirs) = var("UNDO_INCLUDE_DIRS") {
            self.include_dirs = dirs
                .split(':')
                .filter(|dir| !dir.is_empty())
                .map(PathBuf::from)
                .collect();
        }

        if let Some(shell) = var("UNDO_SHELL").filter(|shell| !shell.is_empty()) {
            self.shell = Some(shell);
        }
    }

    pub fn default_include_dirs() -> Vec<PathBuf> {
        let mut dirs = vec![PathBuf::from("/usr/share/undo"), PathBuf::from("/usr/local/share/undo")];
        if let Some(home) = home_dir() {
            dirs.push(home.join(".local").join("share").join("undo"));
        }
        dirs
    }

    fn get_config_path() -> Result<PathBuf> {
        Ok(Self::get_config_dir()?.join("config.toml"))
    }

    pub fn get_config_dir() -> Result<PathBuf> {
        let home = home_dir().ok_or_else(|| anyhow!("Could not find home directory"))?;
        Ok(home.join(".undo"))
    }

    pub fn show_config_info(&self) -> Result<()> {
        let config_path = Self::get_config_path()?;
        println!("Configuration file: {}", config_path.display());
        println!("Status: {}", if config_path.exists() { "Found" } else { "Not found (using defaults)" });

        println!("Include directories:");
        for dir in &self.include_dirs {
            println!("  {}{}", dir.display(), if dir.is_dir() { "" } else { " (missing)" });
        }
        println!("Allow imprecise: {}", self.allow_imprecise);
        println!("Search all: {}", self.search_all);
        println!("Shell: {}", self.shell.as_deref().unwrap_or("(detected)"));
        println!("Command separator: {:?}", self.command_separator);

        println!("\nEnvironment overrides:");
        println!("  export UNDO_INCLUDE_DIRS=<dir>:<dir>");
        println!("  export UNDO_SHELL=<shell>");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();

        assert!(config.include_dirs.is_empty());
        assert!(!config.allow_imprecise);
        assert_eq!(config.command_separator, "; ");
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "search_all = true\ninclude_dirs = [\"/opt/undo\"]\n").unwrap();

        let config = Config::load_from_file(&path).unwrap();

        assert!(config.search_all);
        assert_eq!(config.include_dirs, vec![PathBuf::from("/opt/undo")]);
        assert_eq!(config.command_separator, DEFAULT_COMMAND_SEPARATOR);
        assert_eq!(config.shell, None);
    }

    #[test]
    fn test_invalid_file_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "search_all = 'maybe'").unwrap();

        assert!(Config::load_from_file(&path).is_err());
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [("UNDO_INCLUDE_DIRS", "/a::/b"), ("UNDO_SHELL", "fish")].into();
        let mut config = Config {
            include_dirs: vec![PathBuf::from("/replaced")],
            ..Default::default()
        };

        config.apply_env(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.include_dirs, vec![PathBuf::from("/a"), PathBuf::from("/b")]);
        assert_eq!(config.shell.as_deref(), Some("fish"));
    }

    #[test]
    fn test_default_include_dirs_order() {
        let dirs = Config::default_include_dirs();

        assert_eq!(dirs[0], PathBuf::from("/usr/share/undo"));
        assert_eq!(dirs[1], PathBuf::from("/usr/local/share/undo"));
    }
}
