//! Evaluation of parsed expressions against an [`Environment`].

use std::path::{Component, Path, PathBuf};

use crate::env::{Environment, Value};
use crate::error::{EvaluationError, ExpandError};
use crate::expand::{expand, Expanded};
use crate::expression::ast::{
    Accessor, BoolOp, Chain, ConditionalBuiltin, ConditionalCommand, Existence, Expression,
    Ternary, ValueBuiltin, ValueCommand,
};

/// Bounds used to re-expand the body of a double-quoted string.
pub const EXPANSION_BOUNDS: (&str, &str) = ("`", "`");

/// Result of evaluating an expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Evaluated {
    Str(String),
    List(Vec<String>),
    Bool(bool),
}

impl Evaluated {
    fn truthy(&self) -> bool {
        match self {
            Evaluated::Bool(b) => *b,
            Evaluated::Str(s) => !s.is_empty(),
            Evaluated::List(items) => !items.is_empty(),
        }
    }

    fn into_list(self) -> Vec<String> {
        match self {
            Evaluated::List(items) => items,
            Evaluated::Str(s) => vec![s],
            Evaluated::Bool(b) => vec![Value::Flag(b).to_string()],
        }
    }
}

/// Evaluate `expr` against `env`.
///
/// Names missing from `env` read as the empty string.
///
/// # Errors
///
/// Fails when a broadcast list has no delimiter, when `join` is given a list
/// as its separator, or when a nested string expansion cannot be expanded.
pub fn evaluate(expr: &Expression, env: &Environment) -> Result<Evaluated, ExpandError> {
    match expr {
        Expression::Accessor(node) => accessor(node, env),
        Expression::StringLiteral(body) => Ok(Evaluated::Str(body.clone())),
        Expression::StringExpansion(body) => {
            match expand(body, env, EXPANSION_BOUNDS, None)? {
                Expanded::Single(s) => Ok(Evaluated::Str(s)),
                Expanded::Many(items) => Ok(Evaluated::List(items)),
            }
        }
        Expression::Ternary(node) => ternary(node, env),
        Expression::Existence(node) => existence(node, env).map(Evaluated::Bool),
        Expression::ValueCommand(node) => value_command(node, env),
        Expression::ConditionalCommand(node) => conditional_command(node, env).map(Evaluated::Bool),
    }
}

/// The bound value without broadcast joining.
fn lookup(identifier: &str, env: &Environment) -> Evaluated {
    match env.get(identifier) {
        None => Evaluated::Str(String::new()),
        Some(Value::List(items)) => Evaluated::List(items.clone()),
        Some(value) => Evaluated::Str(value.to_string()),
    }
}

fn accessor(node: &Accessor, env: &Environment) -> Result<Evaluated, ExpandError> {
    match lookup(&node.identifier, env) {
        Evaluated::List(items) if node.broadcast => {
            let delimiter = node
                .delimiter
                .as_deref()
                .ok_or_else(|| EvaluationError::MissingDelimiter(node.identifier.clone()))?;
            Ok(Evaluated::Str(items.join(delimiter)))
        }
        value => Ok(value),
    }
}

fn ternary(node: &Ternary, env: &Environment) -> Result<Evaluated, ExpandError> {
    if evaluate(&node.condition, env)?.truthy() {
        return evaluate(&node.if_value, env);
    }

    match &node.else_value {
        Some(else_value) => evaluate(else_value, env),
        None => Ok(Evaluated::Str(String::new())),
    }
}

fn existence(node: &Existence, env: &Environment) -> Result<bool, ExpandError> {
    let set = match env.get(&node.identifier) {
        None => false,
        Some(value) => value.is_set(),
    };

    chain(set != node.negate, node.chain.as_ref(), env)
}

/// Short-circuits `left` with the rest of the chain, grouping to the right.
fn chain(left: bool, rest: Option<&Chain>, env: &Environment) -> Result<bool, ExpandError> {
    let Some(rest) = rest else {
        return Ok(left);
    };

    match rest.op {
        BoolOp::And if !left => Ok(false),
        BoolOp::Or if left => Ok(true),
        _ => Ok(evaluate(&rest.right, env)?.truthy()),
    }
}

/// Command arguments; broadcast accessors hand over their raw list.
fn arguments(args: &[Expression], env: &Environment) -> Result<Vec<Evaluated>, ExpandError> {
    args.iter()
        .map(|arg| match arg {
            Expression::Accessor(node) if node.broadcast => Ok(lookup(&node.identifier, env)),
            _ => evaluate(arg, env),
        })
        .collect()
}

fn value_command(node: &ValueCommand, env: &Environment) -> Result<Evaluated, ExpandError> {
    let mut args = arguments(&node.args, env)?.into_iter();

    if node.builtin == ValueBuiltin::Join {
        let items = args.next().map(Evaluated::into_list).unwrap_or_default();
        let separator = match args.next() {
            Some(Evaluated::Str(s)) => s,
            _ => {
                return Err(EvaluationError::NonStringArgument {
                    command: node.builtin.name().to_string(),
                    position: 2,
                }
                .into());
            }
        };
        return Ok(Evaluated::Str(items.join(&separator)));
    }

    match args.next() {
        Some(Evaluated::List(items)) => {
            let mapped: Vec<String> = items.iter().map(|item| apply(node.builtin, item)).collect();

            match node.args.first() {
                Some(Expression::Accessor(raw)) if raw.broadcast => {
                    let delimiter = raw
                        .delimiter
                        .as_deref()
                        .ok_or_else(|| EvaluationError::MissingDelimiter(raw.identifier.clone()))?;
                    Ok(Evaluated::Str(mapped.join(delimiter)))
                }
                _ => Ok(Evaluated::List(mapped)),
            }
        }
        Some(other) => {
            let arg = other.into_list().concat();
            Ok(Evaluated::Str(apply(node.builtin, &arg)))
        }
        None => Ok(Evaluated::Str(String::new())),
    }
}

fn conditional_command(node: &ConditionalCommand, env: &Environment) -> Result<bool, ExpandError> {
    let result = arguments(&node.args, env)?
        .into_iter()
        .flat_map(Evaluated::into_list)
        .all(|item| check(node.builtin, &item));

    chain(result != node.negate, node.chain.as_ref(), env)
}

// ============================================================================
// Builtins
// ============================================================================

fn apply(builtin: ValueBuiltin, arg: &str) -> String {
    match builtin {
        ValueBuiltin::Dirname => dirname(arg),
        ValueBuiltin::Basename => basename(arg).to_string(),
        ValueBuiltin::Abspath => abspath(arg),
        ValueBuiltin::Env => std::env::var(arg).unwrap_or_default(),
        // two-argument form handled by the caller
        ValueBuiltin::Join => arg.to_string(),
    }
}

fn check(builtin: ConditionalBuiltin, arg: &str) -> bool {
    let path = Path::new(arg);
    match builtin {
        ConditionalBuiltin::Exists => path.exists(),
        ConditionalBuiltin::IsFile => path.is_file(),
        ConditionalBuiltin::IsDir => path.is_dir(),
    }
}

/// Everything before the last `/`, without trailing slashes unless the head
/// is nothing but slashes.
pub fn dirname(path: &str) -> String {
    let Some(index) = path.rfind('/') else {
        return String::new();
    };

    let head = &path[..=index];
    let trimmed = head.trim_end_matches('/');
    if trimmed.is_empty() {
        head.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Everything after the last `/`.
pub fn basename(path: &str) -> &str {
    path.rfind('/').map_or(path, |index| &path[index + 1..])
}

/// `path` made absolute against the working directory and normalized
/// lexically; symlinks are not resolved.
pub fn abspath(path: &str) -> String {
    let path = Path::new(path);
    let full = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("/"))
            .join(path)
    };

    normalize(&full).to_string_lossy().into_owned()
}

fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                // `..` at the root stays at the root
                if !normalized.pop() && !normalized.has_root() {
                    normalized.push(component);
                }
            }
            other => normalized.push(other),
        }
    }

    normalized
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::environment;
    use crate::expression::parse;

    fn eval(text: &str, env: &Environment) -> Evaluated {
        evaluate(&parse(text).unwrap(), env).unwrap()
    }

    fn s(text: &str) -> Evaluated {
        Evaluated::Str(text.to_string())
    }

    #[test]
    fn test_missing_identifier_reads_empty() {
        let env = Environment::new();

        assert_eq!(eval("$MISSING", &env), s(""));
        assert_eq!(eval("MISSING ? 'yes' : 'no'", &env), s("no"));
        assert_eq!(eval("!MISSING ? 'yes' : 'no'", &env), s("yes"));
    }

    #[test]
    fn test_flags_render_as_text() {
        let env = environment([("ON", Value::Flag(true)), ("OFF", Value::Flag(false))]);

        assert_eq!(eval("$ON", &env), s("true"));
        assert_eq!(eval("$OFF", &env), s(""));
        assert_eq!(eval("OFF ? 'a' : 'b'", &env), s("b"));
    }

    #[test]
    fn test_plain_accessor_keeps_lists() {
        let env = environment([("L", Value::from(vec!["a", "b"]))]);

        assert_eq!(eval("$L", &env), Evaluated::List(vec!["a".into(), "b".into()]));
        assert_eq!(eval("$L...", &env), s("a b"));
    }

    #[test]
    fn test_broadcast_without_delimiter_fails() {
        let env = environment([("L", Value::from(vec!["a"]))]);
        let expr = Expression::Accessor(Accessor {
            identifier: "L".to_string(),
            broadcast: true,
            delimiter: None,
        });

        assert!(matches!(
            evaluate(&expr, &env),
            Err(ExpandError::Evaluation(EvaluationError::MissingDelimiter(name))) if name == "L"
        ));
    }

    #[test]
    fn test_ternary_without_else_defaults_empty() {
        let env = environment([("A", Value::from(""))]);

        assert_eq!(eval("A ? 'x'", &env), s(""));
    }

    #[test]
    fn test_chain_groups_to_the_right() {
        // A && (B || C)
        let env = environment([("A", Value::from("")), ("C", Value::from("c"))]);
        assert_eq!(eval("A && B || C ? 'y' : 'n'", &env), s("n"));

        let env = environment([("A", Value::from("a")), ("C", Value::from("c"))]);
        assert_eq!(eval("A && B || C ? 'y' : 'n'", &env), s("y"));
        assert_eq!(eval("A && B ? 'y' : 'n'", &env), s("n"));
        assert_eq!(eval("B || !A || C ? 'y' : 'n'", &env), s("y"));
    }

    #[test]
    fn test_dirname_and_basename() {
        assert_eq!(dirname("/a/b/c"), "/a/b");
        assert_eq!(dirname("c"), "");
        assert_eq!(dirname("/c"), "/");
        assert_eq!(dirname("a/b/"), "a/b");
        assert_eq!(basename("/a/b/c"), "c");
        assert_eq!(basename("a/b/"), "");
        assert_eq!(basename("c"), "c");
    }

    #[test]
    fn test_abspath_is_lexical() {
        assert_eq!(abspath("/a/./b/../c"), "/a/c");
        assert_eq!(abspath("/.."), "/");
        assert_eq!(abspath("/../a/.."), "/");
        assert_eq!(abspath("/../../b"), "/b");

        let cwd = std::env::current_dir().unwrap();
        assert_eq!(abspath("x"), cwd.join("x").to_string_lossy());
    }

    #[test]
    fn test_value_command_maps_over_lists() {
        let env = environment([("L", Value::from(vec!["/a/b", "/c/d"]))]);

        assert_eq!(
            eval("basename($L)", &env),
            Evaluated::List(vec!["b".into(), "d".into()])
        );
        assert_eq!(eval("basename($L...)", &env), s("b d"));
        assert_eq!(eval("dirname($L...)", &env), s("/a /c"));
    }

    #[test]
    fn test_join() {
        let env = environment([("L", Value::from(vec!["a", "b", "c"])), ("S", Value::from("x"))]);

        assert_eq!(eval("join($L, ',')", &env), s("a,b,c"));
        assert_eq!(eval("join($L..., '-')", &env), s("a-b-c"));
        assert_eq!(eval("join($S, ',')", &env), s("x"));
    }

    #[test]
    fn test_join_rejects_list_separator() {
        let env = environment([("L", Value::from(vec!["a", "b"]))]);
        let err = evaluate(&parse("join($L, $L)").unwrap(), &env).unwrap_err();

        assert_eq!(
            err,
            ExpandError::Evaluation(EvaluationError::NonStringArgument {
                command: "join".to_string(),
                position: 2,
            })
        );
    }

    #[test]
    fn test_env_builtin_reads_process_environment() {
        let env = environment([("NAME", Value::from("UNDO_EVALUATOR_SURELY_UNSET"))]);

        assert_eq!(eval("env($NAME)", &env), s(""));
        assert_eq!(eval("env('PATH')", &env), s(&std::env::var("PATH").unwrap_or_default()));
    }

    #[test]
    fn test_conditional_commands_touch_the_filesystem() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("f");
        std::fs::write(&file, "").unwrap();

        let d = dir.path().to_string_lossy().to_string();
        let f = file.to_string_lossy().to_string();

        let env = environment([
            ("D", Value::from(d.clone())),
            ("F", Value::from(f.clone())),
            ("BOTH", Value::from(vec![f, d])),
        ]);

        assert_eq!(eval("isdir($D) ? 'y' : 'n'", &env), s("y"));
        assert_eq!(eval("isfile($D) ? 'y' : 'n'", &env), s("n"));
        assert_eq!(eval("!isdir($F) ? 'y' : 'n'", &env), s("y"));
        assert_eq!(eval("exists($BOTH) ? 'y' : 'n'", &env), s("y"));
        assert_eq!(eval("isfile($BOTH) ? 'y' : 'n'", &env), s("n"));
        assert_eq!(eval("!isfile($BOTH) ? 'y' : 'n'", &env), s("y"));
    }

    #[test]
    fn test_string_expansion_recurses() {
        let env = environment([("DST", Value::from("/tmp")), ("SRC", Value::from("a/b.txt"))]);

        assert_eq!(eval("\"`$DST`/`basename($SRC)`\"", &env), s("/tmp/b.txt"));
    }

    #[test]
    fn test_existence_is_a_boolean() {
        let env = environment([("A", Value::from("a"))]);

        assert_eq!(eval("A", &env), Evaluated::Bool(true));
        assert_eq!(eval("!A", &env), Evaluated::Bool(false));
    }
}
