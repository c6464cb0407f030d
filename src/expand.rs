//! Template expansion.
//!
//! A template is shell text with expressions between bound markers, e.g.
//! `mv % $DST %/% basename($SRC) % % $SRC %`. Each bounded fragment is
//! parsed and evaluated; list values broadcast the surrounding text into one
//! command per element.

use tracing::{debug, error};

use crate::env::Environment;
use crate::error::{EvaluationError, ExpandError};
use crate::expression::{evaluate, parse, Evaluated, ExpressionKind};

/// Bounds used around expressions in registry templates.
pub const DEFAULT_BOUNDS: (&str, &str) = ("%", "%");

/// Result of expanding a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expanded {
    /// One command, or several joined with a separator.
    Single(String),
    /// One command per element of a broadcast list.
    Many(Vec<String>),
}

impl Expanded {
    /// Every command as its own string.
    pub fn into_commands(self) -> Vec<String> {
        match self {
            Expanded::Single(command) => vec![command],
            Expanded::Many(commands) => commands,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Segment<'a> {
    Literal(&'a str),
    /// Expression text with the bounds removed.
    Bounded(&'a str),
}

enum Piece {
    Text(String),
    List(Vec<String>),
}

/// Expand `template` against `env`.
///
/// # Arguments
///
/// * `bounds` - Opening and closing markers around expressions
/// * `separator` - When given, broadcast commands are joined with it into a
///   single string
///
/// # Errors
///
/// Returns an error if a bound is left open, a fragment fails to parse or
/// evaluate, or two broadcast lists have different lengths.
pub fn expand(
    template: &str,
    env: &Environment,
    bounds: (&str, &str),
    separator: Option<&str>,
) -> Result<Expanded, ExpandError> {
    let mut pieces = Vec::new();

    for segment in segments(template, bounds)? {
        match segment {
            Segment::Literal(text) => pieces.push(Piece::Text(text.to_string())),
            Segment::Bounded(fragment) => {
                let fragment = fragment.trim();
                let expr = parse(fragment).map_err(|source| ExpandError::Parse {
                    fragment: fragment.to_string(),
                    source,
                })?;

                if expr.kind() == ExpressionKind::Conditional {
                    error!("expected a string value but found a boolean: '{}'", fragment);
                    continue;
                }

                match evaluate(&expr, env)? {
                    Evaluated::List(items) => pieces.push(Piece::List(items)),
                    Evaluated::Str(text) => pieces.push(Piece::Text(text)),
                    Evaluated::Bool(flag) => pieces.push(Piece::Text(flag.to_string())),
                }
            }
        }
    }

    let commands = broadcast(pieces)?;
    debug!("expanded '{}' into {} command(s)", template, commands.len());

    if commands.len() == 1 {
        return Ok(Expanded::Single(commands.concat()));
    }

    match separator {
        Some(separator) => Ok(Expanded::Single(commands.join(separator))),
        None => Ok(Expanded::Many(commands)),
    }
}

/// Repeats the text pieces once per list element. All lists must have the
/// same length; without lists the pieces form a single command.
fn broadcast(pieces: Vec<Piece>) -> Result<Vec<String>, EvaluationError> {
    let mut width = None;
    for piece in &pieces {
        if let Piece::List(items) = piece {
            match width {
                None => width = Some(items.len()),
                Some(expected) if expected != items.len() => {
                    return Err(EvaluationError::InconsistentBroadcastLength {
                        expected,
                        found: items.len(),
                    });
                }
                Some(_) => {}
            }
        }
    }

    let Some(width) = width else {
        let command = pieces
            .into_iter()
            .map(|piece| match piece {
                Piece::Text(text) => text,
                Piece::List(items) => items.concat(),
            })
            .collect();
        return Ok(vec![command]);
    };

    let commands = (0..width)
        .map(|index| {
            pieces
                .iter()
                .map(|piece| match piece {
                    Piece::Text(text) => text.as_str(),
                    Piece::List(items) => items[index].as_str(),
                })
                .collect()
        })
        .collect();

    Ok(commands)
}

fn is_escaped(template: &str, at: usize) -> bool {
    template[..at].ends_with('\\')
}

fn next_char(template: &str, at: usize) -> usize {
    at + template[at..].chars().next().map_or(1, char::len_utf8)
}

/// Splits the template into literal runs and bounded expressions.
///
/// An opening bound preceded by `\` is literal. Distinct bounds nest; equal
/// bounds close at their next occurrence.
fn segments<'a>(template: &'a str, bounds: (&str, &str)) -> Result<Vec<Segment<'a>>, ExpandError> {
    let (open, close) = bounds;
    let mut segments = Vec::new();
    let mut last = 0;
    let mut head = 0;

    while head < template.len() {
        if !template[head..].starts_with(open) || is_escaped(template, head) {
            head = next_char(template, head);
            continue;
        }

        if head != last {
            segments.push(Segment::Literal(&template[last..head]));
        }

        let end = closing_bound(template, head, bounds).ok_or_else(|| {
            ExpandError::UnbalancedBounds {
                open: open.to_string(),
                template: template.to_string(),
            }
        })?;

        segments.push(Segment::Bounded(&template[head + open.len()..end - close.len()]));
        head = end;
        last = end;
    }

    if last != template.len() {
        segments.push(Segment::Literal(&template[last..]));
    }

    Ok(segments)
}

/// Index just past the bound closing the one opened at `start`.
fn closing_bound(template: &str, start: usize, (open, close): (&str, &str)) -> Option<usize> {
    let mut depth = 0usize;
    let mut head = start;

    while head < template.len() {
        let rest = &template[head..];

        if rest.starts_with(open) && !(open == close && depth != 0) {
            depth += 1;
            head += open.len();
        } else if rest.starts_with(close) && !is_escaped(template, head) {
            depth = depth.saturating_sub(1);
            head += close.len();
            if depth == 0 {
                return Some(head);
            }
        } else {
            head = next_char(template, head);
        }
    }

    None
}
