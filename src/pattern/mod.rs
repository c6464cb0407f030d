//! Command patterns: a compact notation describing the command lines a
//! registry entry applies to, e.g. `mv [?:-f --force] <SRC...> <DST>`.
//!
//! [`grammar`] turns the notation into a [`CommandPattern`];
//! [`matcher`] compiles it and binds live command lines to an
//! [`Environment`](crate::env::Environment).

pub mod grammar;
pub mod matcher;

pub use grammar::{parse_argument_pattern, parse_command_pattern, parse_group_pattern};
pub use matcher::{compile, Matcher, NoMatch};

/// How many values an argument takes, which also decides the shape of the
/// bound value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgNum {
    /// No value; binds `true`/`false`.
    Flag,
    /// A value that may only be attached (`--color=always`).
    Optional,
    /// Exactly `n` values.
    N(usize),
    AtLeastOne,
    Any,
}

impl ArgNum {
    /// Smallest and largest number of command-line tokens consumed.
    pub fn bounds(&self) -> (usize, Option<usize>) {
        match self {
            ArgNum::Flag => (0, Some(0)),
            ArgNum::Optional => (0, Some(1)),
            ArgNum::N(n) => (*n, Some(*n)),
            ArgNum::AtLeastOne => (1, None),
            ArgNum::Any => (0, None),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgumentPattern {
    /// Variable the captured value is bound to.
    pub var_name: Option<String>,
    pub arg_num: ArgNum,
    /// `-x` / `--long-name` spellings; empty for positionals.
    pub arg_names: Vec<String>,
    pub is_positional: bool,
    pub is_required: bool,
    /// Splits a single captured token into a list.
    pub delimiter: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgumentGroupPattern {
    /// At least one member must bind a set value.
    pub is_required: bool,
    pub members: Vec<ArgumentPattern>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandPattern {
    pub command: String,
    pub sub_commands: Vec<String>,
    pub arguments: Vec<ArgumentPattern>,
    pub groups: Vec<ArgumentGroupPattern>,
}
