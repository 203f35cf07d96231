use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::UnknownValueKind;

/// Target kind applied to a raw token during coercion.
///
/// `Choice` is the closed-list variant: the accepted values are carried along
/// for help rendering, but the token is only normalized, never matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueKind {
    String,
    Bool,
    Int,
    Float,
    /// Free text, trimmed and lower-cased.
    Enum,
    /// Existing, readable regular file. `-` maps to standard input.
    InputFile,
    /// Directory with search permission.
    InputDirectory,
    /// Writable file, or a missing file inside a writable directory.
    /// `-` maps to standard output.
    OutputFile,
    OutputDirectory,
    /// Empty or missing directory.
    EmptyDirectory,
    Choice(Vec<String>),
}

impl ValueKind {
    pub fn choice<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Choice(values.into_iter().map(Into::into).collect())
    }

    pub fn is_bool(&self) -> bool {
        matches!(self, Self::Bool)
    }

    /// Whether coercion for this kind touches the filesystem.
    pub fn is_path(&self) -> bool {
        matches!(
            self,
            Self::InputFile
                | Self::InputDirectory
                | Self::OutputFile
                | Self::OutputDirectory
                | Self::EmptyDirectory
        )
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::String => "string",
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::Enum => "enum",
            Self::InputFile => "input-file",
            Self::InputDirectory => "input-directory",
            Self::OutputFile => "output-file",
            Self::OutputDirectory => "output-directory",
            Self::EmptyDirectory => "empty-directory",
            Self::Choice(values) => return f.write_str(&values.join("|")),
        };
        f.write_str(name)
    }
}

impl FromStr for ValueKind {
    type Err = UnknownValueKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        let kind = match normalized.as_str() {
            "string" | "str" => Self::String,
            "bool" | "boolean" => Self::Bool,
            "int" | "integer" => Self::Int,
            "float" | "number" => Self::Float,
            "enum" => Self::Enum,
            "input-file" => Self::InputFile,
            "input-directory" | "input-dir" => Self::InputDirectory,
            "output-file" => Self::OutputFile,
            "output-directory" | "output-dir" => Self::OutputDirectory,
            "empty-directory" | "empty-dir" => Self::EmptyDirectory,
            _ => return Err(UnknownValueKind(s.to_string())),
        };
        Ok(kind)
    }
}

/// A coerced command-line value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Path(PathBuf),
    List(Vec<Value>),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            Self::Path(p) => p.to_str(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(n) => Some(*n),
            Self::Int(n) => Some(*n as f64),
            _ => None,
        }
    }

    pub fn as_path(&self) -> Option<&std::path::Path> {
        match self {
            Self::Path(p) => Some(p),
            Self::String(s) => Some(std::path::Path::new(s)),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Truthiness used when a flag negates its default.
    pub fn truthy(&self) -> bool {
        match self {
            Self::Bool(b) => *b,
            Self::Int(n) => *n != 0,
            Self::Float(n) => *n != 0.0 && !n.is_nan(),
            Self::String(s) => !s.is_empty(),
            Self::Path(p) => !p.as_os_str().is_empty(),
            Self::List(items) => !items.is_empty(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Float(n) => write!(f, "{n}"),
            Self::String(s) => f.write_str(s),
            Self::Path(p) => write!(f, "{}", p.display()),
            Self::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Int(n.into())
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Float(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<PathBuf> for Value {
    fn from(p: PathBuf) -> Self {
        Self::Path(p)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::List(items)
    }
}

#[cfg(test)]
mod tests {
    use super::{Value, ValueKind};

    #[test]
    fn value_kind_parses_names_and_synonyms() {
        assert_eq!("input-file".parse::<ValueKind>().unwrap(), ValueKind::InputFile);
        assert_eq!("INPUT_FILE".parse::<ValueKind>().unwrap(), ValueKind::InputFile);
        assert_eq!("boolean".parse::<ValueKind>().unwrap(), ValueKind::Bool);
        assert_eq!("number".parse::<ValueKind>().unwrap(), ValueKind::Float);
        let err = "date".parse::<ValueKind>().unwrap_err();
        assert!(err.to_string().contains("date"));
    }

    #[test]
    fn choice_displays_as_alternatives() {
        let kind = ValueKind::choice(["plain", "json"]);
        assert_eq!(kind.to_string(), "plain|json");
        assert_eq!(ValueKind::EmptyDirectory.to_string(), "empty-directory");
    }

    #[test]
    fn truthiness_matches_flag_negation_rules() {
        assert!(!Value::Bool(false).truthy());
        assert!(Value::Bool(true).truthy());
        assert!(!Value::Int(0).truthy());
        assert!(!Value::Float(f64::NAN).truthy());
        assert!(!Value::from("").truthy());
        assert!(Value::from("off").truthy());
        assert!(!Value::List(Vec::new()).truthy());
    }

    #[test]
    fn untagged_json_shape() {
        let v = Value::List(vec![Value::Int(3), Value::from("a"), Value::Bool(true)]);
        assert_eq!(serde_json::to_string(&v).unwrap(), r#"[3,"a",true]"#);
        let back: Value = serde_json::from_str("2.5").unwrap();
        assert_eq!(back, Value::Float(2.5));
    }

    #[test]
    fn accessors_match_variants() {
        use std::path::{Path, PathBuf};

        assert_eq!(Value::Bool(true).as_bool(), Some(true));
        assert_eq!(Value::from("yes").as_bool(), None);
        assert_eq!(Value::Int(5).as_int(), Some(5));
        assert_eq!(Value::Float(5.0).as_int(), None);
        assert_eq!(Value::Int(5).as_float(), Some(5.0));
        assert_eq!(Value::Float(0.25).as_float(), Some(0.25));

        let path = Value::from(PathBuf::from("out/a.txt"));
        assert_eq!(path.as_path(), Some(Path::new("out/a.txt")));
        assert_eq!(path.as_str(), Some("out/a.txt"));
        assert_eq!(Value::from("b.txt").as_path(), Some(Path::new("b.txt")));
        assert_eq!(Value::Int(1).as_path(), None);

        let list = Value::from(vec![Value::Int(1), Value::Int(2)]);
        assert_eq!(list.as_list().map(<[Value]>::len), Some(2));
        assert_eq!(list.to_string(), "1, 2");
        assert_eq!(Value::Bool(false).as_list(), None);
    }

    #[test]
    fn only_filesystem_kinds_are_paths() {
        assert!(ValueKind::InputFile.is_path());
        assert!(ValueKind::EmptyDirectory.is_path());
        assert!(!ValueKind::String.is_path());
        assert!(!ValueKind::choice(["a"]).is_path());
        assert!(ValueKind::Bool.is_bool());
    }
}
