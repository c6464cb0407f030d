//! Undo - make a best effort attempt to undo the last shell command.
//!
//! Registry files pair command patterns with undo templates. The last
//! command is read from the shell's history (or given explicitly), matched
//! against every registry entry, and the templates of the matching entries
//! are expanded into runnable commands.
//!
//! # Architecture
//!
//! - [`pattern`] - Command-pattern notation and the matcher that binds argv
//! - [`expression`] - The expression language used inside templates
//! - [`expand`] - Template expansion, including list broadcasting
//! - [`registry`] - Registry files and the include-directory loader
//! - [`resolve`] - Finds the entries that apply to a command line
//! - [`history`] - Reads recent commands from the shell
//! - [`shell`] - Detects the current shell
//! - [`executor`] - Runs undo commands
//! - [`selection_ui`] - Confirmation and selection prompts
//! - [`undo_router`] - Ties everything together for the binary
//! - [`config`] - Configuration file and environment overrides
//!
//! # Example
//!
//! ```
//! use undo::expand::{expand, DEFAULT_BOUNDS};
//! use undo::pattern::{compile, parse_command_pattern};
//!
//! let pattern = parse_command_pattern("mv <SRC> <DST>").unwrap();
//! let env = compile(&pattern).bind(&["mv", "a.txt", "b.txt"]).unwrap();
//!
//! let undo = expand("mv % $DST % % $SRC %", &env, DEFAULT_BOUNDS, None).unwrap();
//! assert_eq!(undo.into_commands(), vec!["mv b.txt a.txt"]);
//! ```

pub mod config;
pub mod env;
pub mod error;
pub mod executor;
pub mod expand;
pub mod expression;
pub mod history;
pub mod pattern;
pub mod registry;
pub mod resolve;
pub mod selection_ui;
pub mod shell;
pub mod undo_router;
