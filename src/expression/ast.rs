//! Expression tree produced by the parser.

use std::str::FromStr;

use crate::error::{EvaluationError, ParseError};

/// Default join delimiter for `$NAME...`.
pub const DEFAULT_BROADCAST_DELIMITER: &str = " ";

/// Whether an expression yields a string/list or a boolean.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpressionKind {
    Value,
    Conditional,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOp {
    And,
    Or,
}

/// The remainder of a right-leaning `&&`/`||` chain.
#[derive(Debug, Clone, PartialEq)]
pub struct Chain {
    pub op: BoolOp,
    pub right: Box<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Accessor {
    pub identifier: String,
    pub broadcast: bool,
    pub delimiter: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ternary {
    pub condition: Box<Expression>,
    pub if_value: Box<Expression>,
    pub else_value: Option<Box<Expression>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Existence {
    pub negate: bool,
    pub identifier: String,
    pub chain: Option<Chain>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueBuiltin {
    Dirname,
    Basename,
    Abspath,
    Env,
    Join,
}

impl FromStr for ValueBuiltin {
    type Err = EvaluationError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "dirname" => Ok(Self::Dirname),
            "basename" => Ok(Self::Basename),
            "abspath" => Ok(Self::Abspath),
            "env" => Ok(Self::Env),
            "join" => Ok(Self::Join),
            _ => Err(EvaluationError::UnknownCommand(name.to_string())),
        }
    }
}

impl ValueBuiltin {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Dirname => "dirname",
            Self::Basename => "basename",
            Self::Abspath => "abspath",
            Self::Env => "env",
            Self::Join => "join",
        }
    }

    pub fn arity(&self) -> usize {
        match self {
            Self::Join => 2,
            _ => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionalBuiltin {
    Exists,
    IsFile,
    IsDir,
}

impl FromStr for ConditionalBuiltin {
    type Err = EvaluationError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "exists" => Ok(Self::Exists),
            "isfile" => Ok(Self::IsFile),
            "isdir" => Ok(Self::IsDir),
            _ => Err(EvaluationError::UnknownCommand(name.to_string())),
        }
    }
}

impl ConditionalBuiltin {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Exists => "exists",
            Self::IsFile => "isfile",
            Self::IsDir => "isdir",
        }
    }

    pub fn arity(&self) -> usize {
        1
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValueCommand {
    pub builtin: ValueBuiltin,
    pub args: Vec<Expression>,
}

impl ValueCommand {
    /// Builds the node, rejecting argument lists that do not fit the builtin.
    pub fn new(builtin: ValueBuiltin, args: Vec<Expression>) -> Result<Self, ParseError> {
        check_arity(builtin.name(), builtin.arity(), args.len())?;
        Ok(Self { builtin, args })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalCommand {
    pub negate: bool,
    pub builtin: ConditionalBuiltin,
    pub args: Vec<Expression>,
    pub chain: Option<Chain>,
}

impl ConditionalCommand {
    pub fn new(
        negate: bool,
        builtin: ConditionalBuiltin,
        args: Vec<Expression>,
    ) -> Result<Self, ParseError> {
        check_arity(builtin.name(), builtin.arity(), args.len())?;
        Ok(Self {
            negate,
            builtin,
            args,
            chain: None,
        })
    }
}

fn check_arity(command: &str, expected: usize, found: usize) -> Result<(), ParseError> {
    if expected != found {
        return Err(ParseError::WrongArgumentCount {
            command: command.to_string(),
            expected,
            found,
        });
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Accessor(Accessor),
    StringLiteral(String),
    /// Raw template text re-expanded with back-tick bounds on evaluation.
    StringExpansion(String),
    Ternary(Ternary),
    Existence(Existence),
    ValueCommand(ValueCommand),
    ConditionalCommand(ConditionalCommand),
}

impl Expression {
    pub fn kind(&self) -> ExpressionKind {
        match self {
            Expression::Accessor(_)
            | Expression::StringLiteral(_)
            | Expression::StringExpansion(_)
            | Expression::Ternary(_)
            | Expression::ValueCommand(_) => ExpressionKind::Value,
            Expression::Existence(_) | Expression::ConditionalCommand(_) => {
                ExpressionKind::Conditional
            }
        }
    }

    pub fn accessor(identifier: &str) -> Self {
        Expression::Accessor(Accessor {
            identifier: identifier.to_string(),
            broadcast: false,
            delimiter: None,
        })
    }

    pub fn broadcast(identifier: &str) -> Self {
        Expression::Accessor(Accessor {
            identifier: identifier.to_string(),
            broadcast: true,
            delimiter: Some(DEFAULT_BROADCAST_DELIMITER.to_string()),
        })
    }

    pub fn literal(text: &str) -> Self {
        Expression::StringLiteral(text.to_string())
    }

    pub fn exists(negate: bool, identifier: &str) -> Self {
        Expression::Existence(Existence {
            negate,
            identifier: identifier.to_string(),
            chain: None,
        })
    }

    /// The chain slot of a conditional node, `None` for value nodes.
    pub(crate) fn chain_mut(&mut self) -> Option<&mut Option<Chain>> {
        match self {
            Expression::Existence(node) => Some(&mut node.chain),
            Expression::ConditionalCommand(node) => Some(&mut node.chain),
            _ => None,
        }
    }
}
