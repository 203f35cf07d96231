use std::collections::HashMap;
use std::io::Write;

use anyhow::Context;

use crate::decl::{Command, Invocation, arg, command, normalize_name};
use crate::error::{AppError, RegistryError};
use crate::help;
use crate::options::resolve_options;
use crate::parse::parse_args;

pub const HELP_COMMAND: &str = "help";
pub const VERSION_COMMAND: &str = "version";

/// An application: a named, ordered set of commands.
#[derive(Debug, Clone, Default)]
pub struct App {
    pub name: String,
    /// Program name shown in usage lines. Falls back to `name`.
    pub argv0: Option<String>,
    pub version: Option<String>,
    pub commands: Vec<Command>,
}

/// What `App::dispatch` did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Help was requested; the caller prints it.
    Help(String),
    /// The command ran; `Some(code)` is the exit code it asked for.
    Exited(Option<i32>),
}

impl App {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn argv0(mut self, argv0: impl Into<String>) -> Self {
        self.argv0 = Some(argv0.into());
        self
    }

    pub fn command(mut self, command: Command) -> Self {
        self.commands.push(command);
        self
    }

    pub fn program_name(&self) -> &str {
        self.argv0.as_deref().unwrap_or(&self.name)
    }

    /// Look up a command by name or alias (trimmed, case-insensitive).
    pub fn find_command(&self, raw: &str) -> Result<&Command, RegistryError> {
        let name = normalize_name(raw);
        self.commands
            .iter()
            .find(|c| c.name == name)
            .or_else(|| self.commands.iter().find(|c| c.matches(&name)))
            .ok_or(RegistryError::UnknownCommand { name })
    }

    /// Sort commands by name and append the built-in `version` and `help`
    /// commands unless the application already declares them.
    pub fn with_builtins(mut self) -> Self {
        self.commands.sort_by(|a, b| a.name.cmp(&b.name));
        if self.find_command(VERSION_COMMAND).is_err() {
            self.commands.push(version_command());
        }
        if self.find_command(HELP_COMMAND).is_err() {
            self.commands.push(help_command());
        }
        self
    }

    /// Check alias uniqueness and every command's declarations.
    pub fn validate(&self) -> Result<(), RegistryError> {
        validate_aliases(&self.commands)?;
        self.commands.iter().try_for_each(validate_command)
    }

    /// Select a command from `argv[0]`, parse the rest and run it.
    ///
    /// Empty argv or `--help` before any `--` yields `Dispatch::Help`.
    pub fn dispatch(&self, argv: &[String]) -> Result<Dispatch, AppError> {
        let Some((name, rest)) = argv.split_first() else {
            return Ok(Dispatch::Help(help::app_help(self)));
        };
        let command = self.find_command(name)?;
        if rest.iter().take_while(|a| *a != "--").any(|a| a == "--help") {
            return Ok(Dispatch::Help(help::command_help(self, command)));
        }

        let parsed = parse_args(command, rest)?;
        tracing::debug!(command = %command.name, "executing command");
        let invocation = Invocation {
            options: &parsed.options,
            positionals: &parsed.positionals,
            app: self,
        };
        command
            .execute(&invocation)
            .map(Dispatch::Exited)
            .map_err(AppError::Execution)
    }
}

/// Detect an alias that shadows a command name or is claimed twice.
pub fn validate_aliases(commands: &[Command]) -> Result<(), RegistryError> {
    let mut alias_map: HashMap<&str, &str> = HashMap::new();
    for command in commands {
        for alias in &command.aliases {
            if *alias == command.name {
                continue;
            }
            if let Some(owner) = commands.iter().find(|c| c.name == *alias) {
                return Err(RegistryError::AliasShadowsCommand {
                    alias: alias.clone(),
                    command: owner.name.clone(),
                });
            }
            if let Some(prev) = alias_map.insert(alias.as_str(), command.name.as_str()) {
                if prev != command.name {
                    return Err(RegistryError::AliasConflict {
                        alias: alias.clone(),
                        first: prev.to_string(),
                        second: command.name.clone(),
                    });
                }
            }
        }
    }
    Ok(())
}

/// Detect options/flags that share a name or alias, and declarations
/// (keyed arguments included) that share a storage key.
pub fn validate_command(command: &Command) -> Result<(), RegistryError> {
    let all = resolve_options(command);
    let mut names: HashMap<&str, &str> = HashMap::new();
    let mut keys: HashMap<&str, &str> = HashMap::new();

    for spec in &all {
        for name in std::iter::once(&spec.name).chain(&spec.aliases) {
            if let Some(prev) = names.insert(name.as_str(), spec.name.as_str()) {
                return Err(RegistryError::OptionConflict {
                    command: command.name.clone(),
                    name: name.clone(),
                    first: prev.to_string(),
                    second: spec.name.clone(),
                });
            }
        }
    }

    // Keyed arguments are mirrored into the same option map.
    let keyed_arguments = command.arguments.iter().filter(|a| a.key.is_some());
    for spec in all.iter().map(|s| s.as_ref()).chain(keyed_arguments) {
        if let Some(prev) = keys.insert(spec.storage_key(), spec.name.as_str()) {
            return Err(RegistryError::KeyConflict {
                command: command.name.clone(),
                key: spec.storage_key().to_string(),
                first: prev.to_string(),
                second: spec.name.clone(),
            });
        }
    }
    Ok(())
}

fn write_stdout(text: &str) -> anyhow::Result<()> {
    let mut out = std::io::stdout().lock();
    out.write_all(text.as_bytes())
        .and_then(|_| out.flush())
        .context("failed to write to stdout")
}

fn help_command() -> Command {
    command(HELP_COMMAND)
        .description("Displays help for a command")
        .argument(arg("command").description("The command name."))
        .execute(|inv| {
            let text = match inv.positionals.first() {
                Some(name) => {
                    let target = inv.app.find_command(&name.to_string())?;
                    help::command_help(inv.app, target)
                }
                None => {
                    let own = inv.app.find_command(HELP_COMMAND)?;
                    format!(
                        "{}\n{}",
                        help::command_help(inv.app, own),
                        help::available_commands(inv.app)
                    )
                }
            };
            write_stdout(&text)?;
            Ok(None)
        })
        .build()
}

fn version_command() -> Command {
    command(VERSION_COMMAND)
        .description("Displays the application version")
        .execute(|inv| {
            write_stdout(&help::version(inv.app))?;
            Ok(None)
        })
        .build()
}

#[cfg(test)]
mod tests {
    use super::{App, Dispatch, HELP_COMMAND, VERSION_COMMAND, validate_aliases, validate_command};
    use crate::decl::{arg, command};
    use crate::error::{AppError, ParseError, RegistryError};
    use crate::value::Value;
    use std::sync::{Arc, Mutex};

    fn argv(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn find_command_normalizes_name_and_alias() {
        let app = App::new("tool")
            .command(command("copy").alias("cp").build())
            .command(command("move").alias("mv").alias("rename").build());
        assert_eq!(app.find_command(" COPY ").unwrap().name, "copy");
        assert_eq!(app.find_command("Rename").unwrap().name, "move");
        match app.find_command("Delete").unwrap_err() {
            RegistryError::UnknownCommand { name } => assert_eq!(name, "delete"),
            other => panic!("expected UnknownCommand, got: {other:?}"),
        }
    }

    #[test]
    fn builtins_sort_and_append() {
        let app = App::new("tool")
            .command(command("zip").build())
            .command(command("add").build())
            .with_builtins();
        let names: Vec<&str> = app.commands.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["add", "zip", VERSION_COMMAND, HELP_COMMAND]);

        // Not duplicated when applied twice.
        let app = app.with_builtins();
        assert_eq!(app.commands.len(), 4);
    }

    #[test]
    fn validate_aliases_rejects_conflicts() {
        let a = command("alpha").alias("beta").build();
        let b = command("beta").build();
        match validate_aliases(&[a, b]).unwrap_err() {
            RegistryError::AliasShadowsCommand { alias, .. } => assert_eq!(alias, "beta"),
            other => panic!("expected AliasShadowsCommand, got: {other:?}"),
        }

        let a = command("alpha").alias("x").build();
        let b = command("bravo").alias("x").build();
        let err = validate_aliases(&[a, b]).unwrap_err();
        assert!(err.to_string().contains("alias conflict"), "{err}");
    }

    #[test]
    fn validate_command_rejects_duplicate_option_names_and_keys() {
        let cmd = command("build")
            .option(arg("output").alias("o"))
            .flag(arg("overwrite").alias("o"))
            .build();
        assert!(matches!(
            validate_command(&cmd).unwrap_err(),
            RegistryError::OptionConflict { .. }
        ));

        let cmd = command("build")
            .option(arg("output").key("dest"))
            .option(arg("target").key("dest"))
            .build();
        assert!(matches!(
            validate_command(&cmd).unwrap_err(),
            RegistryError::KeyConflict { .. }
        ));

        let cmd = command("build")
            .option(arg("out").default_value("a.txt"))
            .argument(arg("target").key("out"))
            .build();
        match validate_command(&cmd).unwrap_err() {
            RegistryError::KeyConflict { key, first, second, .. } => {
                assert_eq!(key, "out");
                assert_eq!(first, "out");
                assert_eq!(second, "target");
            }
            other => panic!("expected KeyConflict, got: {other:?}"),
        }

        let cmd = command("pair")
            .argument(arg("first").key("dest"))
            .argument(arg("second").key("dest"))
            .build();
        assert!(matches!(
            validate_command(&cmd).unwrap_err(),
            RegistryError::KeyConflict { .. }
        ));

        let ok = command("build")
            .option(arg("output").alias("o"))
            .flag(arg("verbose").alias("v"))
            .argument(arg("target").key("target_name"))
            .argument(arg("rest"))
            .build();
        assert!(validate_command(&ok).is_ok());
    }

    #[test]
    fn dispatch_runs_handler_with_parsed_values() {
        let seen: Arc<Mutex<Vec<(String, Vec<Value>)>>> = Arc::default();
        let sink = seen.clone();
        let app = App::new("tool").command(
            command("greet")
                .option(arg("greeting").default_value("hello"))
                .argument(arg("name").required(true))
                .execute(move |inv| {
                    let greeting = inv.options["greeting"].to_string();
                    sink.lock().unwrap().push((greeting, inv.positionals.to_vec()));
                    Ok(Some(7))
                })
                .build(),
        );

        let outcome = app.dispatch(&argv(&["GREET", "Bob"])).unwrap();
        assert_eq!(outcome, Dispatch::Exited(Some(7)));
        let seen = seen.lock().unwrap();
        assert_eq!(seen[0].0, "hello");
        assert_eq!(seen[0].1, vec![Value::from("Bob")]);
    }

    #[test]
    fn dispatch_returns_help_for_empty_argv_and_help_flag() {
        let app = App::new("tool")
            .version("1.2.3")
            .command(command("copy").description("Copy files").build());

        let Dispatch::Help(text) = app.dispatch(&[]).unwrap() else {
            panic!("expected Help");
        };
        assert!(text.contains("tool version 1.2.3"));
        assert!(text.contains("copy"));

        let Dispatch::Help(text) = app.dispatch(&argv(&["copy", "--help"])).unwrap() else {
            panic!("expected Help");
        };
        assert!(text.starts_with("Copy files"));

        // After `--`, `--help` is just a positional.
        let outcome = app.dispatch(&argv(&["copy", "--", "--help"])).unwrap();
        assert_eq!(outcome, Dispatch::Exited(None));
    }

    #[test]
    fn dispatch_separates_usage_and_execution_errors() {
        let app = App::new("tool")
            .command(command("fail").execute(|_| anyhow::bail!("boom")).build())
            .command(command("strict").option(arg("x").required(true)).build());

        let err = app.dispatch(&argv(&["fail"])).unwrap_err();
        assert!(!err.is_usage());
        assert_eq!(err.to_string(), "boom");

        let err = app.dispatch(&argv(&["strict"])).unwrap_err();
        assert!(err.is_usage());
        assert!(matches!(err, AppError::Parse(ParseError::RequiredOption { .. })));

        let err = app.dispatch(&argv(&["missing"])).unwrap_err();
        assert!(matches!(err, AppError::Registry(RegistryError::UnknownCommand { .. })));
    }

    #[test]
    fn builtin_help_reports_unknown_target_as_execution_error() {
        let app = App::new("tool").with_builtins();
        let err = app.dispatch(&argv(&["help", "nope"])).unwrap_err();
        assert!(!err.is_usage());
        assert!(err.to_string().contains("not defined"), "{err}");
    }
}
