//! Binding live command lines against compiled command patterns.
//!
//! Option parsing follows the usual GNU conventions: `--` ends options,
//! `--long=value` and `-svalue` attach values, long options may be
//! abbreviated to a unique prefix, and short clusters (`-rf`, `-pm 755`)
//! expand with the last member allowed to take a value. Positionals are handed out left to right, variadic ones
//! taking as much as they can while leaving later positionals their minimum.

use std::collections::HashMap;

use thiserror::Error;
use tracing::debug;

use crate::env::{Environment, Value};
use crate::pattern::{ArgNum, ArgumentPattern, CommandPattern};

/// The command line does not fit the pattern. This is the common outcome
/// when scanning a registry and carries the reason only for logging.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct NoMatch {
    pub reason: String,
}

impl NoMatch {
    fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone)]
struct OptionSpec {
    var: String,
    arg_num: ArgNum,
    required: bool,
    delimiter: Option<String>,
}

impl OptionSpec {
    fn is_flag(&self) -> bool {
        matches!(self.arg_num, ArgNum::Flag | ArgNum::N(0))
    }
}

#[derive(Debug, Clone)]
struct PositionalSpec {
    var: String,
    arg_num: ArgNum,
    delimiter: Option<String>,
}

impl PositionalSpec {
    /// Token bounds; a delimited argument always arrives as one token.
    fn bounds(&self) -> (usize, Option<usize>) {
        match (&self.delimiter, self.arg_num) {
            (Some(_), ArgNum::Any) => (0, Some(1)),
            (Some(_), ArgNum::AtLeastOne) => (1, Some(1)),
            (_, arg_num) => arg_num.bounds(),
        }
    }
}

#[derive(Debug, Clone)]
struct GroupSpec {
    required: bool,
    vars: Vec<String>,
    names: Vec<String>,
}

/// A [`CommandPattern`] prepared for repeated binding.
#[derive(Debug, Clone)]
pub struct Matcher {
    command: String,
    sub_commands: Vec<String>,
    options: Vec<OptionSpec>,
    /// Every spelling (`-f`, `--force`) to its index in `options`.
    names: HashMap<String, usize>,
    positionals: Vec<PositionalSpec>,
    groups: Vec<GroupSpec>,
}

/// Prepare `pattern` for binding.
pub fn compile(pattern: &CommandPattern) -> Matcher {
    let mut matcher = Matcher {
        command: pattern.command.clone(),
        sub_commands: pattern.sub_commands.clone(),
        options: Vec::new(),
        names: HashMap::new(),
        positionals: Vec::new(),
        groups: Vec::new(),
    };

    for argument in &pattern.arguments {
        matcher.add_argument(argument);
    }

    for group in &pattern.groups {
        let mut spec = GroupSpec {
            required: group.is_required,
            vars: Vec::new(),
            names: Vec::new(),
        };
        for member in &group.members {
            spec.vars.push(matcher.add_argument(member));
            spec.names.extend(member.arg_names.iter().cloned());
        }
        matcher.groups.push(spec);
    }

    matcher
}

impl Matcher {
    /// Registers an argument and returns the variable it binds.
    fn add_argument(&mut self, argument: &ArgumentPattern) -> String {
        if argument.is_positional {
            let var = argument
                .var_name
                .clone()
                .unwrap_or_else(|| self.positionals.len().to_string());

            self.positionals.push(PositionalSpec {
                var: var.clone(),
                arg_num: argument.arg_num,
                delimiter: argument.delimiter.clone(),
            });
            return var;
        }

        let var = argument
            .var_name
            .clone()
            .unwrap_or_else(|| format!("OPTION_{}", self.options.len()));

        let index = self.options.len();
        self.options.push(OptionSpec {
            var: var.clone(),
            arg_num: argument.arg_num,
            required: argument.is_required,
            delimiter: argument.delimiter.clone(),
        });
        for name in &argument.arg_names {
            self.names.insert(name.clone(), index);
        }

        var
    }

    /// Bind `argv` (command name first) to the pattern's variables.
    ///
    /// Flags are always bound (`true`/`false`); other options only when they
    /// appear. Unknown options, missing required options or groups, and the
    /// wrong number of positionals all yield [`NoMatch`].
    pub fn bind<S: AsRef<str>>(&self, argv: &[S]) -> Result<Environment, NoMatch> {
        let argv: Vec<&str> = argv.iter().map(AsRef::as_ref).collect();

        match argv.first() {
            Some(command) if *command == self.command => {}
            Some(command) => return Err(NoMatch::new(format!("command '{}' differs", command))),
            None => return Err(NoMatch::new("empty command line")),
        }

        let mut rest = &argv[1..];
        for sub_command in &self.sub_commands {
            match rest.first() {
                Some(token) if *token == sub_command.as_str() => rest = &rest[1..],
                _ => {
                    return Err(NoMatch::new(format!(
                        "expected sub-command '{}'",
                        sub_command
                    )));
                }
            }
        }

        let mut env = Environment::new();
        let positionals = self.bind_options(rest, &mut env)?;
        self.bind_positionals(&positionals, &mut env)?;

        for option in &self.options {
            if option.is_flag() {
                env.entry(option.var.clone()).or_insert(Value::Flag(false));
            } else if option.required && !env.contains_key(&option.var) {
                return Err(NoMatch::new(format!(
                    "missing required option for '{}'",
                    option.var
                )));
            }
        }

        for group in self.groups.iter().filter(|g| g.required) {
            let satisfied = group
                .vars
                .iter()
                .any(|var| env.get(var).is_some_and(Value::is_set));
            if !satisfied {
                return Err(NoMatch::new(format!(
                    "expected at least one of {}",
                    group.names.join(" ")
                )));
            }
        }

        debug!("'{}' bound {} variable(s)", self.command, env.len());
        Ok(env)
    }

    /// Consumes options into `env` and returns the positional tokens.
    fn bind_options<'a>(
        &self,
        tokens: &[&'a str],
        env: &mut Environment,
    ) -> Result<Vec<&'a str>, NoMatch> {
        let mut positionals = Vec::new();
        let mut index = 0;

        while index < tokens.len() {
            let token = tokens[index];
            index += 1;

            if token == "--" {
                positionals.extend_from_slice(&tokens[index..]);
                break;
            }

            if !is_option_like(token) {
                positionals.push(token);
                continue;
            }

            if token.starts_with("--") {
                let (name, attached) = match token.split_once('=') {
                    Some((name, value)) => (name, Some(value)),
                    None => (token, None),
                };
                let option = self.option(name)?;
                index = self.bind_option(option, attached, tokens, index, env)?;
                continue;
            }

            let name = short_name(token);
            let option = self.option(name)?;
            let tail = &token[name.len()..];

            if tail.is_empty() {
                index = self.bind_option(option, None, tokens, index, env)?;
            } else if !option.is_flag() {
                index = self.bind_option(option, Some(tail), tokens, index, env)?;
            } else {
                // cluster: -rf, -pm 755, -Dm644
                env.insert(option.var.clone(), Value::Flag(true));
                for (offset, c) in tail.char_indices() {
                    let member = self.option(&format!("-{}", c))?;
                    if member.is_flag() {
                        env.insert(member.var.clone(), Value::Flag(true));
                        continue;
                    }

                    let value = &tail[offset + c.len_utf8()..];
                    let attached = (!value.is_empty()).then_some(value);
                    index = self.bind_option(member, attached, tokens, index, env)?;
                    break;
                }
            }
        }

        Ok(positionals)
    }

    /// Looks up an option by name; a long name may be abbreviated to any
    /// prefix that selects a single option.
    fn option(&self, name: &str) -> Result<&OptionSpec, NoMatch> {
        if let Some(&index) = self.names.get(name) {
            return Ok(&self.options[index]);
        }

        if name.starts_with("--") {
            let mut candidates: Vec<usize> = self
                .names
                .iter()
                .filter(|(known, _)| known.starts_with("--") && known.starts_with(name))
                .map(|(_, &index)| index)
                .collect();
            candidates.sort_unstable();
            candidates.dedup();

            match candidates.as_slice() {
                [index] => return Ok(&self.options[*index]),
                [] => {}
                _ => return Err(NoMatch::new(format!("ambiguous option '{}'", name))),
            }
        }

        Err(NoMatch::new(format!("unknown option '{}'", name)))
    }

    /// Binds one occurrence of `option` and returns the index of the next
    /// unconsumed token.
    fn bind_option(
        &self,
        option: &OptionSpec,
        attached: Option<&str>,
        tokens: &[&str],
        mut index: usize,
        env: &mut Environment,
    ) -> Result<usize, NoMatch> {
        if option.is_flag() {
            if attached.is_some() {
                return Err(NoMatch::new(format!("flag '{}' takes no value", option.var)));
            }
            env.insert(option.var.clone(), Value::Flag(true));
            return Ok(index);
        }

        if option.arg_num == ArgNum::Optional {
            let value = match attached {
                Some(value) => split_value(value, option.delimiter.as_deref()),
                None => Value::List(Vec::new()),
            };
            env.insert(option.var.clone(), value);
            return Ok(index);
        }

        let mut values: Vec<String> = attached.map(str::to_string).into_iter().collect();

        match (option.arg_num, option.delimiter.as_deref()) {
            (_, Some(delimiter)) => {
                if values.is_empty() {
                    let token = tokens.get(index).ok_or_else(|| {
                        NoMatch::new(format!("expected a value for '{}'", option.var))
                    })?;
                    values.push(token.to_string());
                    index += 1;
                }
                let items = split(&values[0], delimiter);
                append(env, &option.var, items);
                return Ok(index);
            }
            (ArgNum::N(count), None) => {
                while values.len() < count {
                    let token = tokens.get(index).ok_or_else(|| {
                        NoMatch::new(format!("expected {} value(s) for '{}'", count, option.var))
                    })?;
                    values.push(token.to_string());
                    index += 1;
                }

                if count == 1 {
                    env.insert(option.var.clone(), Value::Str(values.remove(0)));
                } else {
                    env.insert(option.var.clone(), Value::List(values));
                }
                return Ok(index);
            }
            _ => {}
        }

        // AtLeastOne / Any: a greedy run up to the next option
        while let Some(token) = tokens.get(index) {
            if is_option_like(token) || *token == "--" {
                break;
            }
            values.push(token.to_string());
            index += 1;
        }

        if option.arg_num == ArgNum::AtLeastOne && values.is_empty() {
            return Err(NoMatch::new(format!("expected a value for '{}'", option.var)));
        }

        append(env, &option.var, values);
        Ok(index)
    }

    fn bind_positionals(&self, tokens: &[&str], env: &mut Environment) -> Result<(), NoMatch> {
        let bounds: Vec<(usize, Option<usize>)> =
            self.positionals.iter().map(PositionalSpec::bounds).collect();
        let mut cursor = 0;

        for (index, spec) in self.positionals.iter().enumerate() {
            let (min, max) = bounds[index];
            let reserved: usize = bounds[index + 1..].iter().map(|(min, _)| min).sum();
            let available = tokens.len().saturating_sub(cursor + reserved);
            let take = max.map_or(available, |max| max.min(available));

            if take < min {
                return Err(NoMatch::new(format!(
                    "expected at least {} value(s) for '{}'",
                    min, spec.var
                )));
            }

            let taken = &tokens[cursor..cursor + take];
            cursor += take;

            let value = match (&spec.delimiter, spec.arg_num) {
                (Some(delimiter), _) => Value::List(
                    taken.iter().flat_map(|token| split(token, delimiter)).collect(),
                ),
                (None, ArgNum::N(1)) => Value::Str(taken[0].to_string()),
                (None, ArgNum::Flag) => Value::Flag(false),
                (None, _) => Value::List(taken.iter().map(|t| t.to_string()).collect()),
            };
            env.insert(spec.var.clone(), value);
        }

        if cursor < tokens.len() {
            return Err(NoMatch::new(format!(
                "unrecognized arguments: {}",
                tokens[cursor..].join(" ")
            )));
        }

        Ok(())
    }
}

fn is_option_like(token: &str) -> bool {
    token.len() > 1 && token.starts_with('-')
}

/// `-x` from `-xvalue`.
fn short_name(token: &str) -> &str {
    let end = token
        .char_indices()
        .nth(2)
        .map_or(token.len(), |(index, _)| index);
    &token[..end]
}

fn split(value: &str, delimiter: &str) -> Vec<String> {
    value
        .split(delimiter)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn split_value(value: &str, delimiter: Option<&str>) -> Value {
    match delimiter {
        Some(delimiter) => Value::List(split(value, delimiter)),
        None => Value::Str(value.to_string()),
    }
}

/// Repeated list options accumulate.
fn append(env: &mut Environment, var: &str, items: Vec<String>) {
    match env.get_mut(var) {
        Some(Value::List(existing)) => existing.extend(items),
        _ => {
            env.insert(var.to_string(), Value::List(items));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::environment;
    use crate::pattern::parse_command_pattern;

    fn matcher(pattern: &str) -> Matcher {
        compile(&parse_command_pattern(pattern).unwrap())
    }

    fn argv(command: &str) -> Vec<String> {
        shlex::split(command).unwrap()
    }

    #[test]
    fn test_flag_binds_true() {
        let env = matcher("test [?:--all]").bind(&argv("test --all")).unwrap();

        assert_eq!(env, environment([("ALL", Value::Flag(true))]));
    }

    #[test]
    fn test_absent_flag_binds_false() {
        let env = matcher("test [?:--all]").bind(&argv("test")).unwrap();

        assert_eq!(env.get("ALL"), Some(&Value::Flag(false)));
    }

    #[test]
    fn test_variadic_positional_leaves_room() {
        let env = matcher("mv <SRC...> <DST>").bind(&argv("mv a b c d")).unwrap();

        assert_eq!(
            env,
            environment([
                ("SRC", Value::from(vec!["a", "b", "c"])),
                ("DST", Value::from("d")),
            ])
        );
    }

    #[test]
    fn test_positional_counts_are_enforced() {
        let m = matcher("mv <SRC...> <DST>");

        assert!(m.bind(&argv("mv a")).is_err());
        assert!(matcher("rm <A> <B>").bind(&argv("rm a b c")).is_err());
        assert_eq!(
            matcher("touch <FILES*>").bind(&argv("touch")).unwrap().get("FILES"),
            Some(&Value::List(Vec::new()))
        );
    }

    #[test]
    fn test_command_name_must_match() {
        let m = matcher("mv <SRC> <DST>");

        assert!(m.bind(&argv("cp a b")).is_err());
        assert!(m.bind::<&str>(&[]).is_err());
    }

    #[test]
    fn test_sub_commands_lead() {
        let m = matcher("git remote add <NAME> <URL>");

        let env = m.bind(&argv("git remote add origin https://x")).unwrap();
        assert_eq!(env.get("NAME"), Some(&Value::from("origin")));
        assert!(m.bind(&argv("git remote origin https://x")).is_err());
    }

    #[test]
    fn test_unknown_option_is_no_match() {
        let err = matcher("rm <FILES...>").bind(&argv("rm -f a")).unwrap_err();

        assert_eq!(err.reason, "unknown option '-f'");
    }

    #[test]
    fn test_double_dash_ends_options() {
        let env = matcher("rm [?:-f] <FILES...>").bind(&argv("rm -- -f a")).unwrap();

        assert_eq!(env.get("F"), Some(&Value::Flag(false)));
        assert_eq!(env.get("FILES"), Some(&Value::from(vec!["-f", "a"])));
    }

    #[test]
    fn test_option_values() {
        let m = matcher("cp [-t --target-directory=DIR] <SRC...>");

        for line in [
            "cp -t dir a b",
            "cp --target-directory dir a b",
            "cp --target-directory=dir a b",
            "cp -tdir a b",
            "cp a -t dir b",
        ] {
            let env = m.bind(&argv(line)).unwrap();
            assert_eq!(env.get("DIR"), Some(&Value::from("dir")), "{}", line);
            assert_eq!(env.get("SRC"), Some(&Value::from(vec!["a", "b"])), "{}", line);
        }

        let env = m.bind(&argv("cp a b")).unwrap();
        assert_eq!(env.get("DIR"), None);
    }

    #[test]
    fn test_short_flag_cluster() {
        let m = matcher("rm [?:-r] [?:-f] [?:-v] <FILES...>");

        let env = m.bind(&argv("rm -rf x")).unwrap();
        assert_eq!(env.get("R"), Some(&Value::Flag(true)));
        assert_eq!(env.get("F"), Some(&Value::Flag(true)));
        assert_eq!(env.get("V"), Some(&Value::Flag(false)));

        assert!(m.bind(&argv("rm -rx x")).is_err());
    }

    #[test]
    fn test_cluster_ending_in_value_option() {
        let m = matcher("mkdir [?:-p] [MODE:-m --mode] <DIRS...>");

        let env = m.bind(&argv("mkdir -pm 755 d")).unwrap();
        assert_eq!(env.get("P"), Some(&Value::Flag(true)));
        assert_eq!(env.get("MODE"), Some(&Value::from("755")));
        assert_eq!(env.get("DIRS"), Some(&Value::from(vec!["d"])));

        assert!(m.bind(&argv("mkdir -pm")).is_err());
    }

    #[test]
    fn test_cluster_with_attached_value() {
        let m = matcher("install [MODE:-m --mode] [?:-D] <SOURCES...> <DST>");

        let env = m.bind(&argv("install -Dm644 a b")).unwrap();
        assert_eq!(env.get("D"), Some(&Value::Flag(true)));
        assert_eq!(env.get("MODE"), Some(&Value::from("644")));
        assert_eq!(env.get("SOURCES"), Some(&Value::from(vec!["a"])));
        assert_eq!(env.get("DST"), Some(&Value::from("b")));

        let env = matcher("tar [?:-x] [FILE:-f]").bind(&argv("tar -xf a.tar")).unwrap();
        assert_eq!(env.get("FILE"), Some(&Value::from("a.tar")));
    }

    #[test]
    fn test_long_option_abbreviation() {
        let m = matcher("cp [?:-r --recursive] [?:--remove-destination] <SRC> <DST>");

        let env = m.bind(&argv("cp --recurs a b")).unwrap();
        assert_eq!(env.get("RECURSIVE"), Some(&Value::Flag(true)));

        assert!(m.bind(&argv("cp --re a b")).is_err());
        assert!(m.bind(&argv("cp --rec=x a b")).is_err());
    }

    #[test]
    fn test_value_attached_to_flag_is_no_match() {
        assert!(matcher("ls [?:--all]").bind(&argv("ls --all=yes")).is_err());
    }

    #[test]
    fn test_required_option() {
        let m = matcher("install <DIR:-t> <SRC>");

        assert!(m.bind(&argv("install a")).is_err());
        assert_eq!(
            m.bind(&argv("install -t d a")).unwrap().get("DIR"),
            Some(&Value::from("d"))
        );
    }

    #[test]
    fn test_missing_option_value() {
        assert!(matcher("cp [DIR:-t] <SRC...>").bind(&argv("cp a -t")).is_err());
    }

    #[test]
    fn test_optional_value() {
        let m = matcher("ls [--color[=WHEN]] <FILES*>");

        let env = m.bind(&argv("ls --color x")).unwrap();
        assert_eq!(env.get("WHEN"), Some(&Value::List(Vec::new())));
        assert_eq!(env.get("FILES"), Some(&Value::from(vec!["x"])));

        let env = m.bind(&argv("ls --color=always")).unwrap();
        assert_eq!(env.get("WHEN"), Some(&Value::from("always")));

        assert_eq!(m.bind(&argv("ls")).unwrap().get("WHEN"), None);
    }

    #[test]
    fn test_variadic_option_stops_at_next_option() {
        let m = matcher("tool [FILES...:-f] [?:-v] <TARGET*>");

        let env = m.bind(&argv("tool -f a b -v")).unwrap();
        assert_eq!(env.get("FILES"), Some(&Value::from(vec!["a", "b"])));
        assert_eq!(env.get("V"), Some(&Value::Flag(true)));

        assert!(m.bind(&argv("tool -f -v")).is_err());
    }

    #[test]
    fn test_repeated_list_option_accumulates() {
        let env = matcher("tool [FILES...:-f]")
            .bind(&argv("tool -f a -f b"))
            .unwrap();

        assert_eq!(env.get("FILES"), Some(&Value::from(vec!["a", "b"])));
    }

    #[test]
    fn test_counted_option() {
        let m = matcher("tool [PAIR{2}:--pair]");

        let env = m.bind(&argv("tool --pair a b")).unwrap();
        assert_eq!(env.get("PAIR"), Some(&Value::from(vec!["a", "b"])));
        assert!(m.bind(&argv("tool --pair a")).is_err());
    }

    #[test]
    fn test_delimited_arguments_split() {
        let m = matcher("tool [FIELDS...:-f :,:] <ITEMS... :;:>");

        let env = m.bind(&argv("tool -f a,,b x;y;")).unwrap();
        assert_eq!(env.get("FIELDS"), Some(&Value::from(vec!["a", "b"])));
        assert_eq!(env.get("ITEMS"), Some(&Value::from(vec!["x", "y"])));

        assert!(m.bind(&argv("tool x y")).is_err());
    }

    #[test]
    fn test_required_group() {
        let m = matcher("tar !([?:-c] [?:-x]) [FILE:-f]");

        assert!(m.bind(&argv("tar -f a.tar")).is_err());
        let env = m.bind(&argv("tar -x -f a.tar")).unwrap();
        assert_eq!(env.get("X"), Some(&Value::Flag(true)));
        assert_eq!(env.get("C"), Some(&Value::Flag(false)));
        assert_eq!(env.get("FILE"), Some(&Value::from("a.tar")));
    }

    #[test]
    fn test_optional_group_members_are_independent() {
        let m = matcher("tool ([?:-a] [?:-b])");

        let env = m.bind(&argv("tool -a -b")).unwrap();
        assert_eq!(env.get("A"), Some(&Value::Flag(true)));
        assert_eq!(env.get("B"), Some(&Value::Flag(true)));
        assert!(m.bind(&argv("tool")).is_ok());
    }

    #[test]
    fn test_unnamed_positionals_use_ordinals() {
        let env = matcher("mknod <NAME> <> <*>")
            .bind(&argv("mknod pipe p"))
            .unwrap();

        assert_eq!(env.get("NAME"), Some(&Value::from("pipe")));
        assert_eq!(env.get("1"), Some(&Value::from("p")));
        assert_eq!(env.get("2"), Some(&Value::List(Vec::new())));
    }

    #[test]
    fn test_every_declared_variable_bound_with_expected_shape() {
        let m = matcher("tool [?:-v] [NAME:-n] [LIST*:-l] <ONE> <MANY...>");

        let env = m.bind(&argv("tool -v -n x -l a b -- one m1 m2")).unwrap();
        assert!(matches!(env.get("V"), Some(Value::Flag(true))));
        assert!(matches!(env.get("NAME"), Some(Value::Str(_))));
        assert!(matches!(env.get("LIST"), Some(Value::List(items)) if items.len() == 2));
        assert!(matches!(env.get("ONE"), Some(Value::Str(s)) if s == "one"));
        assert!(matches!(env.get("MANY"), Some(Value::List(items)) if items.len() == 2));
    }

    #[test]
    fn test_single_dash_is_positional() {
        let env = matcher("cat <FILES...>").bind(&argv("cat - a")).unwrap();

        assert_eq!(env.get("FILES"), Some(&Value::from(vec!["-", "a"])));
    }
}
