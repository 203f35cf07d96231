//! Declarative command-line parsing with typed coercion and help rendering.
//!
//! An application declares its commands once; argv is then parsed against a
//! command into positional values and a map of options keyed by storage key.
//! Values are coerced by kind, including filesystem checks for path kinds.
//!
//! # Example
//!
//! ```rust,no_run
//! use argot_argparse::{App, Dispatch, ValueKind, arg, command};
//!
//! let app = App::new("tool")
//!     .version("1.0.0")
//!     .command(
//!         command("copy")
//!             .description("Copy a file")
//!             .option(arg("force").alias("f").value_kind(ValueKind::Bool).default_value(false))
//!             .argument(arg("src").value_kind(ValueKind::InputFile).required(true))
//!             .argument(arg("dst").value_kind(ValueKind::OutputFile).required(true))
//!             .execute(|inv| {
//!                 println!("{} -> {}", inv.positionals[0], inv.positionals[1]);
//!                 Ok(None)
//!             })
//!             .build(),
//!     )
//!     .with_builtins();
//!
//! let argv: Vec<String> = std::env::args().skip(1).collect();
//! match app.dispatch(&argv) {
//!     Ok(Dispatch::Help(text)) => print!("{text}"),
//!     Ok(Dispatch::Exited(code)) => std::process::exit(code.unwrap_or(0)),
//!     Err(err) => {
//!         eprintln!("{err}");
//!         std::process::exit(if err.is_usage() { 2 } else { 1 });
//!     }
//! }
//! ```

mod coerce;
mod decl;
mod error;
pub mod help;
mod options;
mod parse;
mod registry;
mod value;

pub use coerce::{coerce, normalize_path, to_bool};
pub use decl::{
    ArgBuilder, ArgSpec, Command, CommandBuilder, DefaultValue, Handler, Invocation, arg, command,
};
pub use error::{AppError, CoerceError, ParseError, RegistryError, UnknownValueKind};
pub use options::{find_option, resolve_options};
pub use parse::{OptionMap, Parsed, parse_args};
pub use registry::{
    App, Dispatch, HELP_COMMAND, VERSION_COMMAND, validate_aliases, validate_command,
};
pub use value::{Value, ValueKind};
