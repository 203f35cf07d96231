use anyhow::{Context, Result, bail};
use argot_argparse::{App, ArgBuilder, CommandBuilder, Value, ValueKind, arg, command};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_MANIFEST_NAME: &str = "argot.json";
pub const MANIFEST_ENV: &str = "ARGOT_MANIFEST";

/// Application declared as JSON.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Program name shown in usage lines.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub argv0: Option<String>,

    #[serde(default)]
    pub commands: Vec<CommandDecl>,
}

/// `"x"` or `["x", "y"]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    fn to_vec(&self) -> Vec<String> {
        match self {
            Self::One(s) => vec![s.clone()],
            Self::Many(items) => items.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandDecl {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<OneOrMany>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub long_description: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<ArgDecl>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flags: Vec<ArgDecl>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub arguments: Vec<ArgDecl>,
}

/// A kind name (`"input-file"`) or a list of choices (`["plain", "json"]`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TypeDecl {
    Name(String),
    Choices(Vec<String>),
}

impl TypeDecl {
    fn to_kind(&self) -> Result<ValueKind> {
        match self {
            Self::Name(name) => Ok(name.parse::<ValueKind>()?),
            Self::Choices(values) => Ok(ValueKind::choice(values.iter().cloned())),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArgDecl {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<OneOrMany>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value_text: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,

    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub value_type: Option<TypeDecl>,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub repeatable: bool,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub required: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_placeholder: Option<String>,
}

impl ArgDecl {
    fn to_builder(&self) -> Result<ArgBuilder> {
        let mut b = arg(&self.name);
        for alias in self.alias.iter().flat_map(OneOrMany::to_vec) {
            b = b.alias(alias);
        }
        if let Some(description) = &self.description {
            b = b.description(description);
        }
        match &self.default_value {
            None | Some(serde_json::Value::Null) => {}
            Some(json) => {
                let value: Value = serde_json::from_value(json.clone()).with_context(|| {
                    format!("unsupported default value for \"{}\": {json}", self.name)
                })?;
                b = b.default_value(value);
            }
        }
        if let Some(text) = &self.default_value_text {
            b = b.default_value_text(text);
        }
        if let Some(key) = &self.key {
            b = b.key(key);
        }
        if let Some(ty) = &self.value_type {
            let kind = ty
                .to_kind()
                .with_context(|| format!("invalid type for \"{}\"", self.name))?;
            b = b.value_kind(kind);
        }
        if let Some(placeholder) = &self.value_placeholder {
            b = b.value_placeholder(placeholder);
        }
        Ok(b.repeatable(self.repeatable).required(self.required))
    }
}

impl CommandDecl {
    fn to_builder(&self) -> Result<CommandBuilder> {
        let mut b = command(&self.name);
        for alias in self.alias.iter().flat_map(OneOrMany::to_vec) {
            b = b.alias(alias);
        }
        if let Some(description) = &self.description {
            b = b.description(description);
        }
        if let Some(long) = &self.long_description {
            b = b.long_description(long);
        }
        for option in &self.options {
            b = b.option(option.to_builder()?);
        }
        for flag in &self.flags {
            b = b.flag(flag.to_builder()?);
        }
        for argument in &self.arguments {
            b = b.argument(argument.to_builder()?);
        }
        Ok(b)
    }
}

impl Manifest {
    /// Build the declared application. Handlers are attached by the caller.
    pub fn to_app(&self) -> Result<App> {
        if self.name.trim().is_empty() {
            bail!("manifest is missing \"name\"");
        }
        let mut app = App::new(&self.name);
        if let Some(version) = &self.version {
            app = app.version(version);
        }
        if let Some(argv0) = &self.argv0 {
            app = app.argv0(argv0);
        }
        for decl in &self.commands {
            let cmd = decl
                .to_builder()
                .with_context(|| format!("invalid declaration for command \"{}\"", decl.name))?
                .build();
            app = app.command(cmd);
        }
        Ok(app)
    }

    /// Starter manifest declaring a `copy` command.
    pub fn starter(name: &str) -> Self {
        let copy = CommandDecl {
            name: "copy".to_string(),
            alias: Some(OneOrMany::One("cp".to_string())),
            description: Some("Copy a file".to_string()),
            options: vec![ArgDecl {
                name: "force".to_string(),
                alias: Some(OneOrMany::One("f".to_string())),
                description: Some("Overwrite the destination".to_string()),
                default_value: Some(serde_json::Value::Bool(false)),
                value_type: Some(TypeDecl::Name("bool".to_string())),
                ..Default::default()
            }],
            arguments: vec![
                ArgDecl {
                    name: "src".to_string(),
                    description: Some("File to read".to_string()),
                    value_type: Some(TypeDecl::Name("input-file".to_string())),
                    required: true,
                    ..Default::default()
                },
                ArgDecl {
                    name: "dst".to_string(),
                    description: Some("File to write".to_string()),
                    value_type: Some(TypeDecl::Name("output-file".to_string())),
                    required: true,
                    ..Default::default()
                },
            ],
            ..Default::default()
        };
        Self {
            name: name.to_string(),
            version: Some("0.1.0".to_string()),
            argv0: None,
            commands: vec![copy],
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoadedManifest {
    pub path: PathBuf,
    pub manifest: Manifest,
}

/// Load from `--manifest`, else `$ARGOT_MANIFEST`, else `./argot.json`.
///
/// A manifest that was named explicitly must exist.
pub fn load_manifest(manifest_path: Option<&Path>) -> Result<LoadedManifest> {
    let cwd = std::env::current_dir().context("failed to get current directory")?;

    let explicit = manifest_path
        .map(Path::to_path_buf)
        .or_else(|| std::env::var_os(MANIFEST_ENV).map(PathBuf::from));
    let (path, explicit) = match explicit {
        Some(p) => (resolve_against(&cwd, &p), true),
        None => (cwd.join(DEFAULT_MANIFEST_NAME), false),
    };

    if !path.exists() {
        if explicit {
            bail!("manifest not found: {}", path.display());
        }
        bail!(
            "no manifest found ({} does not exist); run `argot init` to create one",
            path.display()
        );
    }

    let contents = fs::read_to_string(&path)
        .with_context(|| format!("failed to read manifest: {}", path.display()))?;
    let manifest: Manifest = serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse manifest JSON: {}", path.display()))?;
    tracing::debug!(path = %path.display(), commands = manifest.commands.len(), "loaded manifest");

    Ok(LoadedManifest { path, manifest })
}

/// Write the starter manifest into `project_dir`, refusing to overwrite.
pub fn write_starter_manifest(project_dir: &Path, name: Option<&str>) -> Result<PathBuf> {
    let dest = project_dir.join(DEFAULT_MANIFEST_NAME);
    if dest.exists() {
        bail!("{DEFAULT_MANIFEST_NAME} already exists in {}", project_dir.display());
    }

    let name = match name {
        Some(n) => n.to_string(),
        None => guess_project_name(project_dir).unwrap_or_else(|| "my-cli".to_string()),
    };
    let manifest = Manifest::starter(&name);

    let mut out = serde_json::to_string_pretty(&manifest).context("failed to serialize manifest")?;
    out.push('\n');
    fs::write(&dest, out.as_bytes())
        .with_context(|| format!("failed to write {}", dest.display()))?;
    Ok(dest)
}

fn resolve_against(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

fn guess_project_name(project_dir: &Path) -> Option<String> {
    // For `.` or other non-meaningful paths, try the current directory name.
    let meaningful = |s: &&str| !s.is_empty() && *s != "." && *s != "..";
    let direct = project_dir
        .file_name()
        .and_then(|s| s.to_str())
        .filter(meaningful);
    if let Some(name) = direct {
        return Some(name.to_string());
    }

    let cwd = std::env::current_dir().ok()?;
    cwd.file_name()
        .and_then(|s| s.to_str())
        .filter(meaningful)
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::{Manifest, OneOrMany, TypeDecl, write_starter_manifest};
    use argot_argparse::{Value, ValueKind};
    use tempfile::TempDir;

    #[test]
    fn parses_camel_case_declarations() {
        let json = r#"{
            "name": "tool",
            "version": "2.0.0",
            "commands": [{
                "name": "Build",
                "alias": ["b", "make"],
                "longDescription": "Builds things.",
                "options": [
                    {"name": "jobs", "alias": "j", "type": "int", "defaultValue": 4},
                    {"name": "format", "type": ["plain", "json"], "valuePlaceholder": "FMT"},
                    {"name": "include", "alias": "I", "repeatable": true}
                ],
                "flags": [{"name": "verbose", "alias": "v"}],
                "arguments": [{"name": "target", "required": true, "key": "target_name"}]
            }]
        }"#;
        let manifest: Manifest = serde_json::from_str(json).unwrap();
        let cmd = &manifest.commands[0];
        assert_eq!(
            cmd.alias,
            Some(OneOrMany::Many(vec!["b".to_string(), "make".to_string()]))
        );
        assert_eq!(
            cmd.options[1].value_type,
            Some(TypeDecl::Choices(vec!["plain".to_string(), "json".to_string()]))
        );

        let app = manifest.to_app().unwrap();
        let build = app.find_command("make").unwrap();
        assert_eq!(build.name, "build");
        assert_eq!(build.long_description.as_deref(), Some("Builds things."));
        assert_eq!(build.options[0].value_kind, Some(ValueKind::Int));
        assert_eq!(build.options[0].resolve_default(), Some(Value::Int(4)));
        assert_eq!(build.options[1].value_placeholder.as_deref(), Some("FMT"));
        assert!(build.options[2].repeatable);
        assert!(build.arguments[0].required);
        assert_eq!(build.arguments[0].storage_key(), "target_name");
    }

    #[test]
    fn unknown_type_is_reported_with_context() {
        let json = r#"{"name": "tool", "commands": [
            {"name": "run", "options": [{"name": "when", "type": "date"}]}
        ]}"#;
        let manifest: Manifest = serde_json::from_str(json).unwrap();
        let err = manifest.to_app().unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("command \"run\""), "{msg}");
        assert!(msg.contains("unknown value type \"date\""), "{msg}");
    }

    #[test]
    fn object_default_is_rejected() {
        let json = r#"{"name": "tool", "commands": [
            {"name": "run", "options": [{"name": "cfg", "defaultValue": {"a": 1}}]}
        ]}"#;
        let manifest: Manifest = serde_json::from_str(json).unwrap();
        let msg = format!("{:#}", manifest.to_app().unwrap_err());
        assert!(msg.contains("unsupported default value"), "{msg}");
    }

    #[test]
    fn starter_manifest_round_trips_and_refuses_overwrite() {
        let dir = TempDir::new().unwrap();
        let path = write_starter_manifest(dir.path(), Some("demo")).unwrap();
        let manifest: Manifest =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(manifest.name, "demo");
        let app = manifest.to_app().unwrap();
        assert!(app.find_command("cp").is_ok());
        assert!(app.validate().is_ok());

        let err = write_starter_manifest(dir.path(), None).unwrap_err();
        assert!(err.to_string().contains("already exists"), "{err}");
    }
}
