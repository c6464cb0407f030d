//! Parser for the command-pattern notation.
//!
//! ```text
//! COMMAND_PATTERN := WORD+ (ARGUMENT | GROUP)*
//! ARGUMENT        := ('[' | '<') (SPEC ':')? NAMES? (':' DELIM ':')? (']' | '>')
//! GROUP           := '!'? '(' ARGUMENT+ ')'
//! SPEC            := IDENT? QUANT?
//! IDENT           := [A-Z][A-Z0-9_]*
//! QUANT           := '?' | '...' | '*' | '{' n '}' | n
//! NAMES           := NAME ((' ' | ',' | '|') NAME)*
//! NAME            := ('-x' | '--long-name') ('=' SPEC | '[=' IDENT? ']')?
//! ```
//!
//! `[...]` marks an optional argument and `<...>` a required one. A required
//! group (`!(...)`) must have at least one member present.

use crate::error::PatternError;
use crate::pattern::{ArgNum, ArgumentGroupPattern, ArgumentPattern, CommandPattern};

const ARGUMENT_OPEN: &[char] = &['[', '<'];
const ARGUMENT_CLOSE: &[char] = &[']', '>'];

#[derive(Debug, Default)]
struct ValueSpec {
    ident: Option<String>,
    quantifier: Option<ArgNum>,
}

impl ValueSpec {
    fn is_empty(&self) -> bool {
        self.ident.is_none() && self.quantifier.is_none()
    }
}

// =============================================================================
// Command patterns
// =============================================================================

/// Parse a full command pattern such as `cp [?:-n --no-clobber] <SRC...> <DST>`.
///
/// Unnamed positionals are named after their index among all positionals
/// (`"0"`, `"1"`, ...).
///
/// # Errors
///
/// Returns a [`PatternError`] naming the offending fragment when the notation
/// is malformed.
pub fn parse_command_pattern(content: &str) -> Result<CommandPattern, PatternError> {
    let mut words = Vec::new();
    let mut arguments = Vec::new();
    let mut groups = Vec::new();

    let mut rest = content.trim_start();
    while !rest.is_empty() {
        if rest.starts_with(ARGUMENT_OPEN) {
            let end = enclosed(rest, ARGUMENT_OPEN, ARGUMENT_CLOSE)?;
            arguments.push(parse_argument_pattern(&rest[..end])?);
            rest = rest[end..].trim_start();
            continue;
        }

        if rest.starts_with('(') || rest.starts_with("!(") {
            let offset = usize::from(rest.starts_with('!'));
            let end = offset + enclosed(&rest[offset..], &['('], &[')'])?;
            groups.push(parse_group_pattern(&rest[..end])?);
            rest = rest[end..].trim_start();
            continue;
        }

        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        let word = &rest[..end];

        if !arguments.is_empty() || !groups.is_empty() {
            return Err(PatternError::new(
                "commands must precede arguments",
                word,
            ));
        }
        if !is_valid_word(word) {
            return Err(PatternError::new("invalid command name", word));
        }

        words.push(word.to_string());
        rest = rest[end..].trim_start();
    }

    if words.is_empty() {
        return Err(PatternError::new("pattern has no command", content));
    }

    let mut ordinal = 0;
    for argument in arguments.iter_mut().filter(|a| a.is_positional) {
        if argument.var_name.is_none() {
            argument.var_name = Some(ordinal.to_string());
        }
        ordinal += 1;
    }

    let command = words.remove(0);
    Ok(CommandPattern {
        command,
        sub_commands: words,
        arguments,
        groups,
    })
}

fn is_valid_word(word: &str) -> bool {
    !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '+' | '-'))
}

/// Byte length of the bracketed run at the start of `text`, brackets
/// included.
fn enclosed(text: &str, open: &[char], close: &[char]) -> Result<usize, PatternError> {
    let mut depth = 0usize;

    for (index, c) in text.char_indices() {
        if open.contains(&c) {
            depth += 1;
        } else if close.contains(&c) {
            depth = depth.saturating_sub(1);
            if depth == 0 {
                return Ok(index + c.len_utf8());
            }
        }
    }

    Err(PatternError::new("missing closing bracket", text))
}

// =============================================================================
// Groups
// =============================================================================

/// Parse a group of optional arguments, `(...)` or the required `!(...)`.
pub fn parse_group_pattern(content: &str) -> Result<ArgumentGroupPattern, PatternError> {
    let content = content.trim();
    let (is_required, bracketed) = match content.strip_prefix('!') {
        Some(rest) => (true, rest),
        None => (false, content),
    };

    let inner = bracketed
        .strip_prefix('(')
        .and_then(|rest| rest.strip_suffix(')'))
        .ok_or_else(|| PatternError::new("argument group must be wrapped in '( )'", content))?;

    let mut members = Vec::new();
    let mut rest = inner.trim_start();
    while !rest.is_empty() {
        if !rest.starts_with(ARGUMENT_OPEN) {
            return Err(PatternError::new("expected an argument in group", rest));
        }

        let end = enclosed(rest, ARGUMENT_OPEN, ARGUMENT_CLOSE)?;
        let member = parse_argument_pattern(&rest[..end])?;

        if member.is_positional {
            return Err(PatternError::new(
                "a group may not contain positional arguments",
                &rest[..end],
            ));
        }
        if member.is_required {
            return Err(PatternError::new(
                "group members must be optional",
                &rest[..end],
            ));
        }

        members.push(member);
        rest = rest[end..].trim_start();
    }

    if members.is_empty() {
        return Err(PatternError::new("argument group is empty", content));
    }

    Ok(ArgumentGroupPattern {
        is_required,
        members,
    })
}

// =============================================================================
// Arguments
// =============================================================================

/// Parse a single bracketed argument such as `[FIELDS...:-f --fields]`.
///
/// A positional without an identifier keeps `var_name == None`; naming it is
/// up to the enclosing command pattern.
///
/// # Errors
///
/// Fails on mismatched brackets, malformed names or quantifiers, optional
/// positionals, and conflicting value specifications.
pub fn parse_argument_pattern(content: &str) -> Result<ArgumentPattern, PatternError> {
    let content = content.trim();

    let (open, close) = match (content.chars().next(), content.chars().last()) {
        (Some(open), Some(close)) if content.len() >= 2 => (open, close),
        _ => return Err(PatternError::new("argument must be wrapped in '[ ]' or '< >'", content)),
    };

    let is_required = match (open, close) {
        ('<', '>') => true,
        ('[', ']') => false,
        ('<', ']') | ('[', '>') => {
            return Err(PatternError::new(
                format!("mismatching brace types '{}' and '{}'", open, close),
                content,
            ));
        }
        _ => return Err(PatternError::new("argument must be wrapped in '[ ]' or '< >'", content)),
    };

    let body = &content[1..content.len() - 1];
    let (body, delimiter) = split_delimiter(body)?;

    let (spec, rest) = read_spec(body)?;
    let (head, names) = match rest.strip_prefix(':') {
        Some(names) => (Some(spec), names),
        None if spec.is_empty() => (None, rest),
        None if rest.trim().is_empty() => (Some(spec), ""),
        None => {
            return Err(PatternError::new(
                "expected ':' between value specification and names",
                content,
            ));
        }
    };

    let mut arg_names = Vec::new();
    let mut name_spec = None;
    for token in names
        .split(|c: char| c.is_whitespace() || c == ',' || c == '|')
        .filter(|token| !token.is_empty())
    {
        let (name, spec) = split_name_spec(token)?;

        if !is_valid_name(name) {
            return Err(PatternError::new("not a valid argument name", name));
        }
        if let Some(spec) = spec {
            if head.is_some() || name_spec.is_some() {
                return Err(PatternError::new("conflicting value specification", token));
            }
            name_spec = Some(spec);
        }

        arg_names.push(name.to_string());
    }

    let spec = head.or(name_spec).unwrap_or_default();
    let arg_num = spec.quantifier.unwrap_or(ArgNum::N(1));
    let is_positional = arg_names.is_empty();

    if is_positional && !is_required {
        return Err(PatternError::new(
            "a positional argument may not be optional, use '?' or '*' as quantifier",
            content,
        ));
    }
    if is_positional && arg_num == ArgNum::Flag {
        return Err(PatternError::new("a positional argument cannot be a flag", content));
    }

    let var_name = spec.ident.or_else(|| derive_var_name(&arg_names));

    Ok(ArgumentPattern {
        var_name,
        arg_num,
        arg_names,
        is_positional,
        is_required,
        delimiter,
    })
}

/// `--no-clobber` becomes `NO_CLOBBER`; the first of the longest names wins.
fn derive_var_name(names: &[String]) -> Option<String> {
    let longest = names.iter().fold(None::<&String>, |best, name| match best {
        Some(best) if best.len() >= name.len() => Some(best),
        _ => Some(name),
    })?;

    Some(longest.trim_start_matches('-').to_uppercase().replace('-', "_"))
}

/// Splits off a trailing `:delim:` clause.
fn split_delimiter(body: &str) -> Result<(&str, Option<String>), PatternError> {
    let Some(inner) = body.trim_end().strip_suffix(':') else {
        return Ok((body, None));
    };
    let Some(start) = inner.rfind(':') else {
        return Ok((body, None));
    };

    let delimiter = &inner[start + 1..];
    if delimiter.is_empty() {
        return Err(PatternError::new("empty list delimiter", body));
    }

    Ok((&inner[..start], Some(delimiter.to_string())))
}

/// `--dir=DIR...` or `--color[=WHEN]`.
fn split_name_spec(token: &str) -> Result<(&str, Option<ValueSpec>), PatternError> {
    if let Some(index) = token.find("[=") {
        let inner = token[index + 2..]
            .strip_suffix(']')
            .ok_or_else(|| PatternError::new("missing ']' after optional value", token))?;

        let (spec, rest) = read_spec(inner)?;
        if !rest.is_empty() || spec.quantifier.is_some() {
            return Err(PatternError::new("optional value takes only an identifier", token));
        }

        let spec = ValueSpec {
            ident: spec.ident,
            quantifier: Some(ArgNum::Optional),
        };
        return Ok((&token[..index], Some(spec)));
    }

    if let Some((name, value)) = token.split_once('=') {
        let (spec, rest) = read_spec(value)?;
        if !rest.is_empty() {
            return Err(PatternError::new("unknown value specification", token));
        }
        return Ok((name, Some(spec)));
    }

    Ok((token, None))
}

fn is_alphanumeric(word: &str) -> bool {
    word.chars().all(|c| c.is_ascii_alphanumeric())
}

/// `-x` or `--word(-word)*` with a first word of two or more characters.
fn is_valid_name(name: &str) -> bool {
    if let Some(long) = name.strip_prefix("--") {
        let mut words = long.split('-');
        let first = words.next().unwrap_or_default();

        return first.len() >= 2
            && is_alphanumeric(first)
            && words.all(|word| !word.is_empty() && is_alphanumeric(word));
    }

    match name.strip_prefix('-') {
        Some(short) => short.len() == 1 && is_alphanumeric(short),
        None => false,
    }
}

fn read_spec(text: &str) -> Result<(ValueSpec, &str), PatternError> {
    let (ident, rest) = read_ident(text);
    let (quantifier, rest) = read_quantifier(rest)?;

    Ok((ValueSpec { ident, quantifier }, rest))
}

fn read_ident(text: &str) -> (Option<String>, &str) {
    if !text.starts_with(|c: char| c.is_ascii_uppercase()) {
        return (None, text);
    }

    let end = text
        .find(|c: char| !(c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_'))
        .unwrap_or(text.len());

    (Some(text[..end].to_string()), &text[end..])
}

fn read_quantifier(text: &str) -> Result<(Option<ArgNum>, &str), PatternError> {
    if let Some(rest) = text.strip_prefix("...") {
        return Ok((Some(ArgNum::AtLeastOne), rest));
    }
    if let Some(rest) = text.strip_prefix('?') {
        return Ok((Some(ArgNum::Flag), rest));
    }
    if let Some(rest) = text.strip_prefix('*') {
        return Ok((Some(ArgNum::Any), rest));
    }

    if let Some(rest) = text.strip_prefix('{') {
        let (count, rest) = rest
            .split_once('}')
            .ok_or_else(|| PatternError::new("unknown quantifier", text))?;
        let count = count
            .parse()
            .map_err(|_| PatternError::new("unknown quantifier", text))?;
        return Ok((Some(ArgNum::N(count)), rest));
    }

    if text.starts_with(|c: char| ('1'..='9').contains(&c)) {
        let end = text.find(|c: char| !c.is_ascii_digit()).unwrap_or(text.len());
        let count = text[..end]
            .parse()
            .map_err(|_| PatternError::new("unknown quantifier", text))?;
        return Ok((Some(ArgNum::N(count)), &text[end..]));
    }

    Ok((None, text))
}
