//! Single-pass tokenizer over a command's raw arguments.
//!
//! Supported forms:
//! - `--name value`, `--name=value`
//! - `-n value`, `-n=value`, `-nVALUE`
//! - bare flags (`--verbose`), which negate their default
//! - `--` ends option parsing; everything after it is positional

use std::borrow::Cow;

use indexmap::IndexMap;
use serde::Serialize;

use crate::coerce::coerce;
use crate::decl::{ArgSpec, Command};
use crate::error::ParseError;
use crate::options::{find_option, resolve_options};
use crate::value::Value;

/// Named values keyed by storage key, in first-insertion order.
pub type OptionMap = IndexMap<String, Value>;

/// Result of parsing one command invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Parsed {
    pub positionals: Vec<Value>,
    pub options: OptionMap,
}

impl Parsed {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.options.get(key)
    }

    pub fn positional(&self, index: usize) -> Option<&Value> {
        self.positionals.get(index)
    }
}

/// A token that refers to an option, split into its parts.
struct OptionToken<'a> {
    /// The token up to (not including) any inline value, e.g. `--out` or `-o`.
    flag: &'a str,
    name: &'a str,
    value: Option<&'a str>,
}

fn split_option_token(token: &str) -> Result<OptionToken<'_>, ParseError> {
    let (flag, inline) = match token.split_once('=') {
        Some((flag, value)) => (flag, Some(value)),
        None => (token, None),
    };

    if let Some(name) = flag.strip_prefix("--") {
        return Ok(OptionToken {
            flag,
            name,
            value: inline,
        });
    }

    // Short form: `-x`, `-x=VALUE` or `-xVALUE`. Never a bundle of flags.
    let rest = &flag[1..];
    let name_len = rest.chars().next().map_or(0, char::len_utf8);
    let (name, attached) = rest.split_at(name_len);
    if attached.is_empty() {
        return Ok(OptionToken {
            flag,
            name,
            value: inline,
        });
    }
    if inline.is_some() {
        return Err(ParseError::MalformedOption {
            token: token.to_string(),
        });
    }
    Ok(OptionToken {
        flag: &flag[..1 + name_len],
        name,
        value: Some(attached),
    })
}

fn coerce_for(spec: &ArgSpec, raw: &str) -> Result<Value, ParseError> {
    match &spec.value_kind {
        Some(kind) => coerce(raw, kind).map_err(|source| ParseError::Coerce {
            target: spec.name.clone(),
            source,
        }),
        None => Ok(Value::String(raw.to_string())),
    }
}

fn store(options: &mut OptionMap, spec: &ArgSpec, value: Value) {
    let key = spec.storage_key().to_string();
    if !spec.repeatable {
        options.insert(key, value);
        return;
    }
    let slot = options
        .entry(key)
        .or_insert_with(|| Value::List(Vec::new()));
    if let Value::List(items) = slot {
        items.push(value);
    } else {
        *slot = Value::List(vec![value]);
    }
}

/// Parse `argv` (the tokens after the command name) against `command`.
///
/// Fails on the first problem; there is no partial result.
pub fn parse_args(command: &Command, argv: &[String]) -> Result<Parsed, ParseError> {
    let all_options = resolve_options(command);
    tracing::debug!(
        command = %command.name,
        options = all_options.len(),
        arguments = command.arguments.len(),
        "parsing arguments"
    );

    let mut parsed = Parsed::default();
    let mut flags_active = true;
    let mut arg_idx = 0usize;
    let mut tokens = argv.iter().map(String::as_str);

    while let Some(token) = tokens.next() {
        if flags_active && token == "--" {
            tracing::trace!("option parsing stopped at separator");
            flags_active = false;
            continue;
        }

        if flags_active && token.len() >= 2 && token.starts_with('-') {
            let opt_token = split_option_token(token)?;
            let spec = find_option(opt_token.name, &all_options).ok_or_else(|| {
                ParseError::UnknownOption {
                    command: command.name.clone(),
                    option: opt_token.name.to_string(),
                }
            })?;

            let value = match opt_token.value {
                Some(raw) => coerce_for(spec, raw)?,
                None if !spec.takes_value() => {
                    let default_on = spec.resolve_default().is_some_and(|v| v.truthy());
                    Value::Bool(!default_on)
                }
                None => {
                    let raw = tokens.next().ok_or_else(|| ParseError::MissingValue {
                        option: opt_token.flag.to_string(),
                    })?;
                    coerce_for(spec, raw)?
                }
            };
            tracing::trace!(option = %spec.name, %value, "matched option");
            store(&mut parsed.options, spec, value);
            continue;
        }

        let value = match command.arguments.get(arg_idx) {
            Some(decl) => {
                let value = coerce_for(decl, token)?;
                if let Some(key) = &decl.key {
                    parsed.options.insert(key.clone(), value.clone());
                }
                value
            }
            None => Value::String(token.to_string()),
        };
        tracing::trace!(index = arg_idx, %value, "matched positional");
        parsed.positionals.push(value);
        arg_idx += 1;
    }

    fill_defaults(command, &all_options, &mut parsed, arg_idx)?;
    Ok(parsed)
}

/// Post-parse pass: defaults, then required options, then required arguments.
fn fill_defaults(
    command: &Command,
    all_options: &[Cow<'_, ArgSpec>],
    parsed: &mut Parsed,
    consumed: usize,
) -> Result<(), ParseError> {
    for spec in all_options {
        let key = spec.storage_key();
        if parsed.options.contains_key(key) {
            continue;
        }
        if let Some(value) = spec.resolve_default() {
            tracing::debug!(key, %value, "using default value");
            parsed.options.insert(key.to_string(), value);
        } else if spec.required {
            return Err(ParseError::RequiredOption {
                option: spec.display_name(),
            });
        }
    }

    for (idx, argument) in command.arguments.iter().enumerate() {
        if argument.required && consumed <= idx {
            return Err(ParseError::RequiredArgument {
                argument: argument.name.clone(),
            });
        }
    }

    for spec in all_options.iter().filter(|s| s.repeatable) {
        parsed
            .options
            .entry(spec.storage_key().to_string())
            .or_insert_with(|| Value::List(Vec::new()));
    }

    Ok(())
}
