//! Variable bindings shared by the pattern matcher and the expression evaluator.
//!
//! A successful match produces an [`Environment`]; templates are evaluated
//! against it. Lookups of names that were never bound are *not* errors: every
//! reader coalesces a missing binding to the empty string at the point of use.

use std::collections::HashMap;
use std::fmt;

/// A value captured from a command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Presence of a flag that takes no value.
    Flag(bool),
    /// A single captured argument.
    Str(String),
    /// Zero or more captured arguments, in command-line order.
    List(Vec<String>),
}

impl Value {
    /// Whether the value counts as "set" for existence checks.
    ///
    /// Mirrors shell truthiness: `false`, the empty string and the empty list
    /// are all unset.
    pub fn is_set(&self) -> bool {
        match self {
            Value::Flag(flag) => *flag,
            Value::Str(s) => !s.is_empty(),
            Value::List(items) => !items.is_empty(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Flag(true) => write!(f, "true"),
            Value::Flag(false) => Ok(()),
            Value::Str(s) => write!(f, "{}", s),
            Value::List(items) => write!(f, "{}", items.join(" ")),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<bool> for Value {
    fn from(flag: bool) -> Self {
        Value::Flag(flag)
    }
}

impl From<Vec<String>> for Value {
    fn from(items: Vec<String>) -> Self {
        Value::List(items)
    }
}

impl From<Vec<&str>> for Value {
    fn from(items: Vec<&str>) -> Self {
        Value::List(items.into_iter().map(str::to_string).collect())
    }
}

/// Variable name to captured value. Names are upper-case by convention.
pub type Environment = HashMap<String, Value>;

/// Builds an environment from literal pairs; handy in tests and examples.
///
/// ```
/// use undo::env::{environment, Value};
///
/// let env = environment([("SRC", Value::from("a.txt")), ("FORCE", Value::from(true))]);
/// assert_eq!(env.get("SRC"), Some(&Value::from("a.txt")));
/// ```
pub fn environment<K, I>(pairs: I) -> Environment
where
    K: Into<String>,
    I: IntoIterator<Item = (K, Value)>,
{
    pairs.into_iter().map(|(k, v)| (k.into(), v)).collect()
}
