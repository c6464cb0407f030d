//! Error taxonomy for the template and pattern languages.
//!
//! Lexical and grammar errors are hard failures for a caller that parses a
//! single expression or pattern directly. The resolution layer treats them as
//! recoverable per registry entry and logs them instead.

use std::path::PathBuf;
use thiserror::Error;

use crate::expression::lexer::TokenKind;

/// An unrecognized run of characters in an expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown token at col {column}: '{fragment}'")]
pub struct TokenError {
    pub fragment: String,
    pub column: usize,
}

/// A grammar violation in an expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error(transparent)]
    Token(#[from] TokenError),

    #[error("expected {expected} but found {found} '{body}' at col {column}")]
    UnexpectedToken {
        expected: TokenKind,
        found: TokenKind,
        body: String,
        column: usize,
    },

    #[error("unexpected end of input")]
    UnexpectedEndOfInput,

    #[error("wrong argument count for '{command}', expected {expected} but found {found}")]
    WrongArgumentCount {
        command: String,
        expected: usize,
        found: usize,
    },
}

impl ParseError {
    /// How far into the input the failing parse got. Used to report the most
    /// informative error when every alternative of a choice fails.
    pub(crate) fn reach(&self) -> usize {
        match self {
            ParseError::Token(err) => err.column,
            ParseError::UnexpectedToken { column, .. } => *column,
            ParseError::UnexpectedEndOfInput => usize::MAX,
            ParseError::WrongArgumentCount { .. } => usize::MAX,
        }
    }
}

/// A failure while evaluating a parsed expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvaluationError {
    #[error("no such command '{0}'")]
    UnknownCommand(String),

    #[error("cannot broadcast list '{0}' without a delimiter")]
    MissingDelimiter(String),

    #[error("broadcast lists differ in length: {expected} and {found}")]
    InconsistentBroadcastLength { expected: usize, found: usize },

    #[error("argument {position} of '{command}' must be a single string")]
    NonStringArgument { command: String, position: usize },
}

/// A failure while expanding a template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExpandError {
    #[error("unbalanced '{open}' in: {template}")]
    UnbalancedBounds { open: String, template: String },

    #[error("could not parse expression '{fragment}': {source}")]
    Parse {
        fragment: String,
        #[source]
        source: ParseError,
    },

    #[error(transparent)]
    Evaluation(#[from] EvaluationError),
}

/// Malformed command-pattern notation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}: '{fragment}'")]
pub struct PatternError {
    pub message: String,
    pub fragment: String,
}

impl PatternError {
    pub fn new(message: impl Into<String>, fragment: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            fragment: fragment.into(),
        }
    }
}

/// A registry file that cannot be used.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("could not read registry '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not deserialize registry '{path}': {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("entry {index} of registry '{path}' is missing required key '{key}'")]
    MissingKey {
        path: PathBuf,
        index: usize,
        key: &'static str,
    },
}
