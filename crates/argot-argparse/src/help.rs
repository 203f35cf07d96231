//! Plain-text usage and help rendering.
//!
//! Declarations are only read here, never modified.

use std::fmt::Write;

use crate::decl::{ArgSpec, Command, dashed};
use crate::options::resolve_options;
use crate::registry::App;
use crate::value::ValueKind;

/// Placeholder for an option's value in usage lines (`--out=FILE`).
pub fn value_placeholder(spec: &ArgSpec) -> String {
    if let Some(p) = &spec.value_placeholder {
        return p.clone();
    }
    match &spec.value_kind {
        Some(ValueKind::Choice(values)) => values.join("|"),
        Some(ValueKind::Bool) => {
            let default_on = spec.resolve_default().is_some_and(|v| v.truthy());
            (!default_on).to_string()
        }
        Some(ValueKind::Int | ValueKind::Float) => "#".to_string(),
        Some(ValueKind::InputFile | ValueKind::OutputFile) => "FILE".to_string(),
        Some(ValueKind::InputDirectory | ValueKind::OutputDirectory | ValueKind::EmptyDirectory) => {
            "DIR".to_string()
        }
        _ => spec.name.clone(),
    }
}

/// Text for `[default: ...]`: explicit text, else the JSON form of the default.
pub fn default_text(spec: &ArgSpec) -> Option<String> {
    if let Some(text) = &spec.default_value_text {
        return Some(text.clone());
    }
    let value = spec.resolve_default()?;
    Some(serde_json::to_string(&value).unwrap_or_else(|_| value.to_string()))
}

fn is_bool(spec: &ArgSpec) -> bool {
    spec.value_kind.as_ref().is_some_and(ValueKind::is_bool)
}

/// Left and right columns of one row in the `Options:` table.
pub fn format_option(spec: &ArgSpec) -> (String, String) {
    let mut left = spec
        .aliases
        .iter()
        .chain(std::iter::once(&spec.name))
        .map(|n| dashed(n))
        .collect::<Vec<_>>()
        .join(", ");
    if !is_bool(spec) {
        left.push('=');
        left.push_str(&value_placeholder(spec));
    }

    let mut right = spec.description.clone().unwrap_or_default();
    if let Some(text) = default_text(spec) {
        if !right.is_empty() {
            right.push(' ');
        }
        right.push_str(&format!("[default: {text}]"));
    }
    (left, right)
}

fn push_rows(out: &mut String, rows: &[(String, String)]) {
    let width = rows.iter().map(|(l, _)| l.chars().count()).max().unwrap_or(0);
    for (left, right) in rows {
        if right.is_empty() {
            let _ = writeln!(out, "  {left}");
        } else {
            let _ = writeln!(out, "  {left:width$}  {right}");
        }
    }
}

/// `prog name --required=VALUE [options] [--] <arg> [arg]`
pub fn command_usage(app: &App, command: &Command) -> String {
    let mut out = format!("{} {}", app.program_name(), command.name);

    let all = resolve_options(command);
    let mut other_options = 0usize;
    for spec in &all {
        if !spec.required {
            other_options += 1;
            continue;
        }
        out.push(' ');
        out.push_str(&spec.display_name());
        if !is_bool(spec) {
            out.push('=');
            out.push_str(&value_placeholder(spec));
        }
    }
    if other_options > 0 {
        out.push_str(" [options]");
    }

    if !command.arguments.is_empty() {
        out.push_str(" [--]");
        for argument in &command.arguments {
            let (open, close) = if argument.required { ('<', '>') } else { ('[', ']') };
            let dots = if argument.repeatable { "..." } else { "" };
            let _ = write!(out, " {open}{dots}{}{close}", argument.name);
        }
    }
    out
}

/// Full help for one command.
pub fn command_help(app: &App, command: &Command) -> String {
    let mut out = String::new();
    if let Some(description) = command.description.as_deref().map(str::trim) {
        if !description.is_empty() {
            out.push_str(description);
            out.push_str("\n\n");
        }
    }

    out.push_str("Usage:\n");
    let _ = writeln!(out, "  {}", command_usage(app, command));

    let all = resolve_options(command);
    if !all.is_empty() {
        out.push_str("\nOptions:\n");
        let rows: Vec<(String, String)> = all.iter().map(|spec| format_option(spec)).collect();
        push_rows(&mut out, &rows);
    }

    if !command.arguments.is_empty() {
        out.push_str("\nArguments:\n");
        let rows: Vec<(String, String)> = command
            .arguments
            .iter()
            .map(|a| (a.name.clone(), a.description.clone().unwrap_or_default()))
            .collect();
        push_rows(&mut out, &rows);
    }

    if !command.aliases.is_empty() {
        let label = if command.aliases.len() == 1 { "Alias" } else { "Aliases" };
        let _ = writeln!(out, "\n{label}: {}", command.aliases.join(", "));
    }

    if let Some(long) = command.long_description.as_deref() {
        out.push_str("\nDescription:\n");
        for line in long.trim_end().lines() {
            let _ = writeln!(out, "  {line}");
        }
    }
    out
}

/// The `Available commands:` table.
pub fn available_commands(app: &App) -> String {
    let mut out = String::from("Available commands:\n");
    let rows: Vec<(String, String)> = app
        .commands
        .iter()
        .map(|c| (c.name.clone(), c.description.clone().unwrap_or_default()))
        .collect();
    push_rows(&mut out, &rows);
    out
}

/// Top-level help shown when no command is given.
pub fn app_help(app: &App) -> String {
    let mut out = version(app);
    out.push_str("\nUsage:\n");
    let _ = writeln!(
        out,
        "  {} command [options] [arguments]\n",
        app.program_name()
    );
    out.push_str(&available_commands(app));
    out
}

/// `name version X` (or just `name`), newline-terminated.
pub fn version(app: &App) -> String {
    match app.version.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => format!("{} version {v}\n", app.name),
        _ => format!("{}\n", app.name),
    }
}
