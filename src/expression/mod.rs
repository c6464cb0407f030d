//! The small expression language embedded in undo templates.
//!
//! An expression reads captured variables (`$SRC`, `$FILES...`), tests them
//! (`FORCE`, `!isdir($DST)`), branches (`COND ? a : b`) and calls a fixed set
//! of builtins (`dirname`, `basename`, `abspath`, `env`, `join`, `exists`,
//! `isfile`, `isdir`).

pub mod ast;
pub mod evaluator;
pub mod lexer;
pub mod parser;

pub use ast::{Expression, ExpressionKind};
pub use evaluator::{evaluate, Evaluated};
pub use lexer::{tokenize, Token, TokenKind};
pub use parser::{parse, parse_condition};
