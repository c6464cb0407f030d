//! Recursive-descent parser for undo expressions.
//!
//! Grammar:
//!
//! ```text
//! VALUE       := VALUE_CMD | STRING_LITERAL | STRING_EXPANSION | TERNARY | ACCESSOR
//! VALUE_CMD   := COMMAND '(' (VALUE (',' VALUE)*)? ')'
//! TERNARY     := CONDITION '?' VALUE (':' VALUE)?
//! ACCESSOR    := '$' IDENT '...'?
//! CONDITION   := ('!'? IDENT | '!'? COMMAND '(' VALUE ')') (('&&' | '||') CONDITION)?
//! ```
//!
//! Alternatives are tried in order and the first that succeeds wins. Each
//! sub-parser receives a cursor into the shared token buffer and returns the
//! node along with the cursor just past it, so backtracking is simply trying
//! the next alternative from the same position.

use crate::error::ParseError;
use crate::expression::ast::{
    Accessor, BoolOp, Chain, ConditionalBuiltin, ConditionalCommand, Existence, Expression,
    Ternary, ValueBuiltin, ValueCommand, DEFAULT_BROADCAST_DELIMITER,
};
use crate::expression::lexer::{tokenize, Token, TokenKind};

type Step = Result<(Expression, usize), ParseError>;

type SubParser<'a> = fn(&Parser<'a>, usize) -> Step;

/// Parse a template fragment.
///
/// A value expression is preferred; a fragment that is only a condition is
/// also accepted so that the caller can decide what to do with a boolean.
///
/// # Errors
///
/// Returns a [`ParseError`] for unknown tokens, grammar violations, trailing
/// tokens, or builtins called with the wrong number of arguments.
pub fn parse(content: &str) -> Result<Expression, ParseError> {
    let tokens = tokenize(content)?;
    let parser = Parser::new(&tokens);

    match parser.complete(Parser::value) {
        Ok(expr) => Ok(expr),
        Err(err @ ParseError::WrongArgumentCount { .. }) => Err(err),
        Err(value_err) => match parser.complete(Parser::condition) {
            Ok(expr) => Ok(expr),
            Err(err @ ParseError::WrongArgumentCount { .. }) => Err(err),
            Err(condition_err) => Err(furthest(Some(value_err), condition_err)),
        },
    }
}

/// Parse a fragment that must be a condition (`A && !exists($B)`).
pub fn parse_condition(content: &str) -> Result<Expression, ParseError> {
    let tokens = tokenize(content)?;
    Parser::new(&tokens).complete(Parser::condition)
}

fn furthest(current: Option<ParseError>, candidate: ParseError) -> ParseError {
    match current {
        Some(current) if current.reach() >= candidate.reach() => current,
        _ => candidate,
    }
}

fn is_fatal(err: &ParseError) -> bool {
    matches!(err, ParseError::WrongArgumentCount { .. })
}

pub struct Parser<'a> {
    tokens: &'a [Token],
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [Token]) -> Self {
        Self { tokens }
    }

    /// Runs `rule` from the start and requires it to consume every token.
    fn complete(&self, rule: SubParser<'a>) -> Result<Expression, ParseError> {
        let (expr, pos) = rule(self, 0)?;

        match self.tokens.get(pos) {
            None => Ok(expr),
            Some(token) => Err(self.unexpected(TokenKind::EndOfInput, token)),
        }
    }

    fn peek(&self, pos: usize) -> Option<&Token> {
        self.tokens.get(pos)
    }

    fn check(&self, pos: usize, kind: TokenKind) -> bool {
        self.peek(pos).is_some_and(|t| t.kind == kind)
    }

    fn expect(&self, pos: usize, kind: TokenKind) -> Result<&Token, ParseError> {
        match self.peek(pos) {
            None => Err(ParseError::UnexpectedEndOfInput),
            Some(token) if token.kind == kind => Ok(token),
            Some(token) => Err(self.unexpected(kind, token)),
        }
    }

    fn unexpected(&self, expected: TokenKind, found: &Token) -> ParseError {
        ParseError::UnexpectedToken {
            expected,
            found: found.kind,
            body: found.body.clone(),
            column: found.column,
        }
    }

    // =========================================================================
    // Value expressions
    // =========================================================================

    fn value(&self, pos: usize) -> Step {
        let candidates: [SubParser<'a>; 5] = [
            Self::value_command,
            Self::string_literal,
            Self::string_expansion,
            Self::ternary,
            Self::accessor,
        ];

        let mut best = None;
        for candidate in candidates {
            match candidate(self, pos) {
                Ok(step) => return Ok(step),
                Err(err) if is_fatal(&err) => return Err(err),
                Err(err) => best = Some(furthest(best, err)),
            }
        }

        Err(best.unwrap_or(ParseError::UnexpectedEndOfInput))
    }

    fn value_command(&self, pos: usize) -> Step {
        let command = self.expect(pos, TokenKind::Command)?;
        let builtin = command
            .body
            .parse::<ValueBuiltin>()
            .map_err(|_| self.unexpected(TokenKind::Command, command))?;

        let (args, next) = self.arguments(pos + 1)?;
        let node = ValueCommand::new(builtin, args)?;

        Ok((Expression::ValueCommand(node), next))
    }

    fn string_literal(&self, pos: usize) -> Step {
        let token = self.expect(pos, TokenKind::StringLiteral)?;
        Ok((Expression::StringLiteral(token.body.clone()), pos + 1))
    }

    fn string_expansion(&self, pos: usize) -> Step {
        let token = self.expect(pos, TokenKind::StringExpansion)?;
        Ok((Expression::StringExpansion(token.body.clone()), pos + 1))
    }

    fn ternary(&self, pos: usize) -> Step {
        let (condition, pos) = self.condition(pos)?;
        self.expect(pos, TokenKind::TernaryIf)?;

        let (if_value, mut pos) = self.value(pos + 1)?;

        let mut else_value = None;
        if self.check(pos, TokenKind::TernaryElse) {
            let (value, next) = self.value(pos + 1)?;
            else_value = Some(Box::new(value));
            pos = next;
        }

        let node = Ternary {
            condition: Box::new(condition),
            if_value: Box::new(if_value),
            else_value,
        };
        Ok((Expression::Ternary(node), pos))
    }

    fn accessor(&self, pos: usize) -> Step {
        self.expect(pos, TokenKind::Accessor)?;
        let identifier = self.expect(pos + 1, TokenKind::Ident)?.body.clone();

        if self.check(pos + 2, TokenKind::Ellipsis) {
            let node = Accessor {
                identifier,
                broadcast: true,
                delimiter: Some(DEFAULT_BROADCAST_DELIMITER.to_string()),
            };
            return Ok((Expression::Accessor(node), pos + 3));
        }

        let node = Accessor {
            identifier,
            broadcast: false,
            delimiter: None,
        };
        Ok((Expression::Accessor(node), pos + 2))
    }

    /// `'(' (VALUE (',' VALUE)*)? ')'`; returns the arguments and the cursor
    /// past the closing parenthesis.
    fn arguments(&self, pos: usize) -> Result<(Vec<Expression>, usize), ParseError> {
        self.expect(pos, TokenKind::OpenParen)?;

        let mut pos = pos + 1;
        let mut args = Vec::new();

        match self.value(pos) {
            Ok((arg, next)) => {
                args.push(arg);
                pos = next;
            }
            Err(err) if is_fatal(&err) => return Err(err),
            Err(_) => {}
        }

        // a comma must be followed by another value
        while !args.is_empty() && self.check(pos, TokenKind::Comma) {
            let (arg, next) = self.value(pos + 1)?;
            args.push(arg);
            pos = next;
        }

        self.expect(pos, TokenKind::CloseParen)?;
        Ok((args, pos + 1))
    }

    // =========================================================================
    // Conditional expressions
    // =========================================================================

    /// A single condition optionally followed by `&&`/`||` and another
    /// condition. The chain leans right: `A && B || C` is `A && (B || C)`.
    fn condition(&self, pos: usize) -> Step {
        let (mut node, mut pos) = match self.existence(pos) {
            Ok(step) => step,
            Err(existence_err) => match self.conditional_command(pos) {
                Ok(step) => step,
                Err(err) if is_fatal(&err) => return Err(err),
                Err(command_err) => return Err(furthest(Some(existence_err), command_err)),
            },
        };

        let op = match self.peek(pos).map(|t| t.kind) {
            Some(TokenKind::And) => Some(BoolOp::And),
            Some(TokenKind::Or) => Some(BoolOp::Or),
            _ => None,
        };

        if let Some(op) = op {
            let (right, next) = self.condition(pos + 1)?;
            if let Some(slot) = node.chain_mut() {
                *slot = Some(Chain {
                    op,
                    right: Box::new(right),
                });
            }
            pos = next;
        }

        Ok((node, pos))
    }

    fn existence(&self, pos: usize) -> Step {
        let negate = self.check(pos, TokenKind::Not);
        let pos = if negate { pos + 1 } else { pos };

        let identifier = self.expect(pos, TokenKind::Ident)?.body.clone();
        let node = Existence {
            negate,
            identifier,
            chain: None,
        };

        Ok((Expression::Existence(node), pos + 1))
    }

    fn conditional_command(&self, pos: usize) -> Step {
        let negate = self.check(pos, TokenKind::Not);
        let pos = if negate { pos + 1 } else { pos };

        let command = self.expect(pos, TokenKind::Command)?;
        let builtin = command
            .body
            .parse::<ConditionalBuiltin>()
            .map_err(|_| self.unexpected(TokenKind::Command, command))?;

        let (args, next) = self.arguments(pos + 1)?;
        let node = ConditionalCommand::new(negate, builtin, args)?;

        Ok((Expression::ConditionalCommand(node), next))
    }
}
