//! Declarations for commands, options, flags and positional arguments.
//!
//! Declarations are built once by the application and never mutated by the
//! parser. Use [`command`] and [`arg`] to build them.

use std::fmt;
use std::sync::Arc;

use crate::parse::OptionMap;
use crate::registry::App;
use crate::value::{Value, ValueKind};

/// Default for an option: a literal, or a producer invoked only when the
/// default is actually needed.
#[derive(Clone)]
pub enum DefaultValue {
    Literal(Value),
    Producer(Arc<dyn Fn() -> Value + Send + Sync>),
}

impl DefaultValue {
    pub fn resolve(&self) -> Value {
        match self {
            Self::Literal(v) => v.clone(),
            Self::Producer(f) => f(),
        }
    }
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(v) => f.debug_tuple("Literal").field(v).finish(),
            Self::Producer(_) => f.write_str("Producer(..)"),
        }
    }
}

/// Shared shape of an option, a flag, or a positional argument.
#[derive(Debug, Clone, Default)]
pub struct ArgSpec {
    pub name: String,
    pub aliases: Vec<String>,
    pub description: Option<String>,
    pub default_value: Option<DefaultValue>,
    /// Text shown in help instead of the rendered default.
    pub default_value_text: Option<String>,
    /// Key in the parsed option map. Falls back to `name`.
    pub key: Option<String>,
    pub value_kind: Option<ValueKind>,
    pub repeatable: bool,
    pub required: bool,
    pub value_placeholder: Option<String>,
    /// Presence alone sets the value; the next token is never consumed.
    pub value_not_required: bool,
}

impl ArgSpec {
    pub fn storage_key(&self) -> &str {
        self.key.as_deref().unwrap_or(&self.name)
    }

    /// Whether `name` is this declaration's name or one of its aliases.
    pub fn answers_to(&self, name: &str) -> bool {
        self.name == name || self.aliases.iter().any(|a| a == name)
    }

    /// Whether the option reads its value from the following token.
    ///
    /// Boolean options behave like flags: `-f` alone turns them on.
    pub fn takes_value(&self) -> bool {
        !(self.value_not_required || self.value_kind.as_ref().is_some_and(ValueKind::is_bool))
    }

    /// `-x` for single-character names, `--name` otherwise.
    pub fn display_name(&self) -> String {
        dashed(&self.name)
    }

    pub fn resolve_default(&self) -> Option<Value> {
        self.default_value.as_ref().map(DefaultValue::resolve)
    }
}

pub(crate) fn dashed(name: &str) -> String {
    if name.chars().count() == 1 {
        format!("-{name}")
    } else {
        format!("--{name}")
    }
}

pub(crate) fn normalize_name(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// What a command handler receives.
#[derive(Debug, Clone, Copy)]
pub struct Invocation<'a> {
    pub options: &'a OptionMap,
    pub positionals: &'a [Value],
    pub app: &'a App,
}

/// Command body. `Ok(Some(code))` asks the caller to exit with `code`.
pub type Handler = Arc<dyn Fn(&Invocation<'_>) -> anyhow::Result<Option<i32>> + Send + Sync>;

/// A named command with its declared inputs.
#[derive(Clone, Default)]
pub struct Command {
    pub name: String,
    pub aliases: Vec<String>,
    pub description: Option<String>,
    pub long_description: Option<String>,
    pub options: Vec<ArgSpec>,
    pub flags: Vec<ArgSpec>,
    pub arguments: Vec<ArgSpec>,
    pub handler: Option<Handler>,
}

impl Command {
    /// Case-insensitive match against the name and aliases.
    pub fn matches(&self, raw: &str) -> bool {
        let name = normalize_name(raw);
        self.name == name || self.aliases.iter().any(|a| *a == name)
    }

    /// Run the handler. Commands without one succeed without an exit code.
    pub fn execute(&self, invocation: &Invocation<'_>) -> anyhow::Result<Option<i32>> {
        match &self.handler {
            Some(handler) => handler(invocation),
            None => Ok(None),
        }
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("description", &self.description)
            .field("options", &self.options)
            .field("flags", &self.flags)
            .field("arguments", &self.arguments)
            .field("handler", &self.handler.as_ref().map(|_| ".."))
            .finish()
    }
}

/// Create a command builder.
///
/// # Example
///
/// ```
/// use argot_argparse::{ValueKind, arg, command};
///
/// let copy = command("copy")
///     .alias("cp")
///     .description("Copy a file")
///     .option(arg("force").alias("f").value_kind(ValueKind::Bool).default_value(false))
///     .argument(arg("src").value_kind(ValueKind::InputFile).required(true))
///     .argument(arg("dst").value_kind(ValueKind::OutputFile).required(true))
///     .build();
/// assert!(copy.matches("CP"));
/// ```
pub fn command(name: impl Into<String>) -> CommandBuilder {
    CommandBuilder::new(name)
}

/// Create an option/flag/argument builder.
pub fn arg(name: impl Into<String>) -> ArgBuilder {
    ArgBuilder::new(name)
}

/// Builder for `Command`.
#[derive(Default)]
pub struct CommandBuilder {
    name: String,
    aliases: Vec<String>,
    description: Option<String>,
    long_description: Option<String>,
    options: Vec<ArgSpec>,
    flags: Vec<ArgSpec>,
    arguments: Vec<ArgSpec>,
    handler: Option<Handler>,
}

impl CommandBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn long_description(mut self, text: impl Into<String>) -> Self {
        self.long_description = Some(text.into());
        self
    }

    pub fn option(mut self, option: ArgBuilder) -> Self {
        self.options.push(option.build());
        self
    }

    pub fn flag(mut self, flag: ArgBuilder) -> Self {
        self.flags.push(flag.build());
        self
    }

    pub fn argument(mut self, argument: ArgBuilder) -> Self {
        self.arguments.push(argument.build());
        self
    }

    pub fn execute<F>(mut self, handler: F) -> Self
    where
        F: Fn(&Invocation<'_>) -> anyhow::Result<Option<i32>> + Send + Sync + 'static,
    {
        self.handler = Some(Arc::new(handler));
        self
    }

    pub fn build(self) -> Command {
        Command {
            name: normalize_name(&self.name),
            aliases: self
                .aliases
                .iter()
                .map(|a| normalize_name(a))
                .filter(|a| !a.is_empty())
                .collect(),
            description: self.description,
            long_description: self.long_description,
            options: self.options,
            flags: self.flags,
            arguments: self.arguments,
            handler: self.handler,
        }
    }
}

/// Builder for `ArgSpec`.
#[derive(Default)]
pub struct ArgBuilder {
    spec: ArgSpec,
}

impl ArgBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            spec: ArgSpec {
                name: name.into(),
                ..Default::default()
            },
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.spec.aliases.push(alias.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.spec.description = Some(description.into());
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.spec.default_value = Some(DefaultValue::Literal(value.into()));
        self
    }

    /// Default computed on demand, e.g. from the environment.
    pub fn default_with<F>(mut self, producer: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.spec.default_value = Some(DefaultValue::Producer(Arc::new(producer)));
        self
    }

    pub fn default_value_text(mut self, text: impl Into<String>) -> Self {
        self.spec.default_value_text = Some(text.into());
        self
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.spec.key = Some(key.into());
        self
    }

    pub fn value_kind(mut self, kind: ValueKind) -> Self {
        self.spec.value_kind = Some(kind);
        self
    }

    pub fn repeatable(mut self, repeatable: bool) -> Self {
        self.spec.repeatable = repeatable;
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.spec.required = required;
        self
    }

    pub fn value_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.spec.value_placeholder = Some(placeholder.into());
        self
    }

    pub fn value_not_required(mut self, value_not_required: bool) -> Self {
        self.spec.value_not_required = value_not_required;
        self
    }

    pub fn build(self) -> ArgSpec {
        // Accept "--name" / "-n" spellings; the parser strips dashes itself.
        let strip = |s: &str| s.trim().trim_start_matches('-').to_string();
        let mut spec = self.spec;
        spec.name = strip(&spec.name);
        spec.aliases = spec
            .aliases
            .iter()
            .map(|a| strip(a))
            .filter(|a| !a.is_empty())
            .collect();
        spec
    }
}

#[cfg(test)]
mod tests {
    use super::{arg, command};
    use crate::value::{Value, ValueKind};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn builder_normalizes_names() {
        let cmd = command("  Copy ")
            .alias("CP")
            .option(arg("--force").alias("-f"))
            .build();
        assert_eq!(cmd.name, "copy");
        assert_eq!(cmd.aliases, vec!["cp".to_string()]);
        assert_eq!(cmd.options[0].name, "force");
        assert!(cmd.options[0].answers_to("f"));
        assert!(cmd.matches(" COPY"));
        assert!(cmd.matches("cp"));
        assert!(!cmd.matches("move"));
    }

    #[test]
    fn storage_key_falls_back_to_name() {
        let a = arg("output").build();
        assert_eq!(a.storage_key(), "output");
        let b = arg("output").key("out_path").build();
        assert_eq!(b.storage_key(), "out_path");
    }

    #[test]
    fn display_name_depends_on_length() {
        assert_eq!(arg("v").build().display_name(), "-v");
        assert_eq!(arg("verbose").build().display_name(), "--verbose");
    }

    #[test]
    fn bool_options_do_not_take_values() {
        assert!(arg("name").build().takes_value());
        assert!(!arg("force").value_kind(ValueKind::Bool).build().takes_value());
        assert!(!arg("quiet").value_not_required(true).build().takes_value());
    }

    #[test]
    fn producer_defaults_are_lazy() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let spec = arg("jobs")
            .default_with(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                Value::Int(4)
            })
            .build();
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(spec.resolve_default(), Some(Value::Int(4)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
