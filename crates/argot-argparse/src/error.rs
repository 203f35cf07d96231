use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// A value kind name that is not recognized.
#[derive(Debug, Clone, Error)]
#[error("unknown value type \"{0}\"")]
pub struct UnknownValueKind(pub String);

/// Failure to turn a raw token into a typed value.
#[derive(Debug, Error)]
pub enum CoerceError {
    #[error("could not cast \"{value}\" to boolean")]
    InvalidBool { value: String },

    #[error("could not cast \"{value}\" to integer")]
    InvalidInt { value: String },

    #[error("could not cast \"{value}\" to number")]
    InvalidFloat { value: String },

    #[error("file {} does not exist", .path.display())]
    NotFound { path: PathBuf },

    /// A directory (or the parent of a new file) is missing.
    #[error("{} does not exist", .path.display())]
    Missing { path: PathBuf },

    #[error("{} is not a file", .path.display())]
    NotAFile { path: PathBuf },

    #[error("{} is not readable", .path.display())]
    NotReadable { path: PathBuf },

    #[error("{} is not writable", .path.display())]
    NotWritable { path: PathBuf },

    #[error("{} is not searchable", .path.display())]
    NotSearchable { path: PathBuf },

    #[error("{} is not empty", .path.display())]
    NotEmpty { path: PathBuf },

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Usage error raised while tokenizing or validating argv.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("malformed option \"{token}\"")]
    MalformedOption { token: String },

    #[error("\"{command}\" command does not have option \"{option}\"")]
    UnknownOption { command: String, option: String },

    #[error("missing required value for option \"{option}\"")]
    MissingValue { option: String },

    #[error("\"{option}\" option is required")]
    RequiredOption { option: String },

    #[error("\"{argument}\" argument is required")]
    RequiredArgument { argument: String },

    #[error("invalid value for \"{target}\": {source}")]
    Coerce {
        target: String,
        #[source]
        source: CoerceError,
    },
}

/// Lookup or declaration problems in the command registry.
#[derive(Debug, Clone, Error)]
pub enum RegistryError {
    #[error("command \"{name}\" is not defined")]
    UnknownCommand { name: String },

    #[error("alias conflict: '{alias}' is both a command name and an alias (command: {command})")]
    AliasShadowsCommand { alias: String, command: String },

    #[error("alias conflict: '{alias}' refers to both '{first}' and '{second}'")]
    AliasConflict {
        alias: String,
        first: String,
        second: String,
    },

    #[error("option conflict in \"{command}\": '{name}' maps to both '{first}' and '{second}'")]
    OptionConflict {
        command: String,
        name: String,
        first: String,
        second: String,
    },

    #[error("key conflict in \"{command}\": '{key}' is stored by both '{first}' and '{second}'")]
    KeyConflict {
        command: String,
        key: String,
        first: String,
        second: String,
    },
}

/// Failure of a whole dispatch: either bad input or a failing command body.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("{0:#}")]
    Execution(anyhow::Error),
}

impl AppError {
    /// Whether the failure came from user input rather than the command body.
    pub fn is_usage(&self) -> bool {
        !matches!(self, Self::Execution(_))
    }
}
