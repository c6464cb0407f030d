//! Tokenizer for undo expressions.
//!
//! Splits the text between template bounds into a flat token stream. Leading
//! whitespace before each token is skipped; columns are 1-based character
//! positions of the first character of the token (the opening quote for
//! strings).

use std::fmt;

use crate::error::TokenError;

/// Builtins producing a string (or list of strings).
pub const VALUE_COMMANDS: &[&str] = &["dirname", "basename", "abspath", "env", "join"];

/// Builtins producing a boolean.
pub const CONDITIONAL_COMMANDS: &[&str] = &["exists", "isfile", "isdir"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Ident,
    StringLiteral,
    StringExpansion,
    Accessor,
    Ellipsis,
    Comma,
    OpenParen,
    CloseParen,
    Command,
    And,
    Or,
    Not,
    TernaryIf,
    TernaryElse,
    EndOfInput,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ident => "identifier",
            Self::StringLiteral => "string literal",
            Self::StringExpansion => "string expansion",
            Self::Accessor => "'$'",
            Self::Ellipsis => "'...'",
            Self::Comma => "','",
            Self::OpenParen => "'('",
            Self::CloseParen => "')'",
            Self::Command => "command",
            Self::And => "'&&'",
            Self::Or => "'||'",
            Self::Not => "'!'",
            Self::TernaryIf => "'?'",
            Self::TernaryElse => "':'",
            Self::EndOfInput => "end of input",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Token text; quotes are stripped from string tokens.
    pub body: String,
    pub column: usize,
}

impl Token {
    pub fn new(kind: TokenKind, body: impl Into<String>, column: usize) -> Self {
        Self {
            kind,
            body: body.into(),
            column,
        }
    }
}

/// Multi-character symbols first so that `&&` is never read as two tokens.
const SYMBOLS: &[(&str, TokenKind)] = &[
    ("...", TokenKind::Ellipsis),
    ("&&", TokenKind::And),
    ("||", TokenKind::Or),
    ("$", TokenKind::Accessor),
    ("?", TokenKind::TernaryIf),
    (":", TokenKind::TernaryElse),
    ("!", TokenKind::Not),
    (",", TokenKind::Comma),
    ("(", TokenKind::OpenParen),
    (")", TokenKind::CloseParen),
];

fn is_word_start(c: char) -> bool {
    c.is_ascii_alphanumeric()
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Tokenize an expression.
///
/// # Errors
///
/// Returns a [`TokenError`] naming the first unrecognized run of characters,
/// or an unterminated string.
pub fn tokenize(content: &str) -> Result<Vec<Token>, TokenError> {
    let chars: Vec<char> = content.chars().collect();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < chars.len() {
        if chars[pos].is_whitespace() {
            pos += 1;
            continue;
        }

        let column = pos + 1;
        let c = chars[pos];

        if c == '"' || c == '\'' {
            let (body, next) = read_quoted(&chars, pos).ok_or_else(|| TokenError {
                fragment: chars[pos..].iter().collect(),
                column,
            })?;
            let kind = if c == '"' {
                TokenKind::StringExpansion
            } else {
                TokenKind::StringLiteral
            };
            tokens.push(Token::new(kind, body, column));
            pos = next;
            continue;
        }

        if is_word_start(c) {
            let start = pos;
            while pos < chars.len() && is_word_char(chars[pos]) {
                pos += 1;
            }
            let word: String = chars[start..pos].iter().collect();
            let kind = if VALUE_COMMANDS.contains(&word.as_str())
                || CONDITIONAL_COMMANDS.contains(&word.as_str())
            {
                TokenKind::Command
            } else {
                TokenKind::Ident
            };
            tokens.push(Token::new(kind, word, column));
            continue;
        }

        let rest: String = chars[pos..].iter().take(3).collect();
        match SYMBOLS.iter().find(|(symbol, _)| rest.starts_with(symbol)) {
            Some((symbol, kind)) => {
                tokens.push(Token::new(*kind, *symbol, column));
                pos += symbol.chars().count();
            }
            None => {
                let fragment: String = chars[pos..]
                    .iter()
                    .take_while(|c| !c.is_whitespace())
                    .collect();
                return Err(TokenError { fragment, column });
            }
        }
    }

    Ok(tokens)
}

/// Reads a quoted run starting at the opening quote. The closing quote is the
/// first one not preceded by a backslash; escapes are kept verbatim.
fn read_quoted(chars: &[char], start: usize) -> Option<(String, usize)> {
    let quote = chars[start];
    let mut pos = start + 1;

    while pos < chars.len() {
        if chars[pos] == quote && chars[pos - 1] != '\\' {
            return Some((chars[start + 1..pos].iter().collect(), pos + 1));
        }
        pos += 1;
    }

    None
}
