mod manifest;

use anyhow::{Context, Result};
use argot_argparse::{App, Dispatch, Handler, Invocation, OptionMap, Value, help};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, fmt};

use crate::manifest::{load_manifest, write_starter_manifest};

/// Exit code for bad input (unknown command, option or value).
const USAGE_EXIT: u8 = 2;

#[derive(Parser)]
#[command(name = "argot", disable_help_subcommand = true)]
#[command(version, about = "Declarative command-line parsing driven by a JSON manifest", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a starter argot.json
    Init(InitArgs),

    /// Parse arguments for a declared command and print the result as JSON
    Parse(ParseArgs),

    /// Show help for the application or one of its commands
    Help(HelpArgs),

    /// Validate the manifest's command declarations
    Check(CheckArgs),
}

#[derive(Parser)]
struct InitArgs {
    /// Project directory (default: current directory)
    #[arg(value_name = "DIR")]
    dir: Option<PathBuf>,

    /// Application name (default: directory name)
    #[arg(short, long)]
    name: Option<String>,
}

#[derive(Parser)]
struct ParseArgs {
    /// Path to the manifest (default: $ARGOT_MANIFEST or ./argot.json)
    #[arg(short, long, value_name = "FILE")]
    manifest: Option<PathBuf>,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,

    /// Command name or alias
    #[arg(value_name = "COMMAND")]
    command: String,

    /// Arguments passed to the command unchanged
    #[arg(value_name = "ARGS", trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

#[derive(Parser)]
struct HelpArgs {
    /// Path to the manifest (default: $ARGOT_MANIFEST or ./argot.json)
    #[arg(short, long, value_name = "FILE")]
    manifest: Option<PathBuf>,

    /// Command to describe
    #[arg(value_name = "COMMAND")]
    command: Option<String>,
}

#[derive(Parser)]
struct CheckArgs {
    /// Path to the manifest (default: $ARGOT_MANIFEST or ./argot.json)
    #[arg(short, long, value_name = "FILE")]
    manifest: Option<PathBuf>,
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init(args) => init(args),
        Commands::Parse(args) => parse(args),
        Commands::Help(args) => help_command(args),
        Commands::Check(args) => check(args),
    };
    match result {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn init(args: InitArgs) -> Result<ExitCode> {
    let dir = args.dir.unwrap_or_else(|| PathBuf::from("."));
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create directory: {}", dir.display()))?;

    let path = write_starter_manifest(&dir, args.name.as_deref())?;

    eprintln!("Created: {}", path.display());
    eprintln!("\nNext steps:");
    eprintln!("  1. Edit {} to declare your commands", path.display());
    eprintln!("  2. Run: argot check");
    eprintln!("  3. Run: argot parse copy -f in.txt out.txt");
    Ok(ExitCode::SUCCESS)
}

fn load_app(manifest: Option<PathBuf>) -> Result<App> {
    let loaded = load_manifest(manifest.as_deref())?;
    loaded
        .manifest
        .to_app()
        .with_context(|| format!("invalid manifest: {}", loaded.path.display()))
}

/// What `argot parse` prints for a successfully parsed command.
#[derive(Serialize)]
struct Report<'a> {
    command: &'a str,
    positionals: &'a [Value],
    options: &'a OptionMap,
}

/// Handler that prints what the command received.
fn echo_handler(command: String, pretty: bool) -> Handler {
    Arc::new(move |inv: &Invocation<'_>| -> Result<Option<i32>> {
        let report = Report {
            command: &command,
            positionals: inv.positionals,
            options: inv.options,
        };
        let mut text = if pretty {
            serde_json::to_string_pretty(&report)?
        } else {
            serde_json::to_string(&report)?
        };
        text.push('\n');
        let mut out = std::io::stdout().lock();
        out.write_all(text.as_bytes())
            .and_then(|_| out.flush())
            .context("failed to write to stdout")?;
        Ok(None)
    })
}

fn parse(args: ParseArgs) -> Result<ExitCode> {
    let mut app = load_app(args.manifest)?;
    for cmd in &mut app.commands {
        cmd.handler = Some(echo_handler(cmd.name.clone(), args.pretty));
    }
    let app = app.with_builtins();

    let mut argv = Vec::with_capacity(args.args.len() + 1);
    argv.push(args.command);
    argv.extend(args.args);

    match app.dispatch(&argv) {
        Ok(Dispatch::Help(text)) => {
            print!("{text}");
            Ok(ExitCode::SUCCESS)
        }
        Ok(Dispatch::Exited(code)) => Ok(exit_code(code.unwrap_or(0))),
        Err(err) if err.is_usage() => {
            eprintln!("Error: {err}");
            Ok(ExitCode::from(USAGE_EXIT))
        }
        Err(err) => Err(anyhow::Error::new(err)),
    }
}

fn exit_code(code: i32) -> ExitCode {
    u8::try_from(code).map_or(ExitCode::FAILURE, ExitCode::from)
}

fn help_command(args: HelpArgs) -> Result<ExitCode> {
    let app = load_app(args.manifest)?.with_builtins();
    let text = match args.command.as_deref() {
        Some(name) => help::command_help(&app, app.find_command(name)?),
        None => help::app_help(&app),
    };
    print!("{text}");
    Ok(ExitCode::SUCCESS)
}

fn check(args: CheckArgs) -> Result<ExitCode> {
    let app = load_app(args.manifest)?;
    let count = app.commands.len();
    app.with_builtins()
        .validate()
        .context("manifest declarations are inconsistent")?;
    eprintln!("OK: {count} command(s) declared");
    Ok(ExitCode::SUCCESS)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}
