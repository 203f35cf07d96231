//! Raw token to typed value conversion.
//!
//! Path kinds probe the filesystem while coercing. The probe result only
//! holds at coercion time; callers still have to handle I/O errors on use.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use crate::error::CoerceError;
use crate::value::{Value, ValueKind};

const TRUE_VALUES: &[&str] = &["y", "yes", "t", "true", "1", "on"];
const FALSE_VALUES: &[&str] = &["n", "no", "f", "false", "0", "off"];

#[cfg(windows)]
const STDIN_PATH: &str = "CONIN$";
#[cfg(not(windows))]
const STDIN_PATH: &str = "/dev/stdin";

#[cfg(windows)]
const STDOUT_PATH: &str = "CONOUT$";
#[cfg(not(windows))]
const STDOUT_PATH: &str = "/dev/stdout";

/// Convert `raw` into a value of `kind`.
pub fn coerce(raw: &str, kind: &ValueKind) -> Result<Value, CoerceError> {
    tracing::trace!(raw, %kind, filesystem = kind.is_path(), "coercing value");
    match kind {
        // Choices are normalized only; membership is left to the caller.
        ValueKind::Choice(_) | ValueKind::Enum => Ok(Value::String(raw.trim().to_lowercase())),
        ValueKind::Bool => to_bool(raw).map(Value::Bool),
        ValueKind::Int => to_int(raw).map(Value::Int),
        ValueKind::Float => to_number(raw)
            .map(Value::Float)
            .ok_or_else(|| CoerceError::InvalidFloat {
                value: raw.to_string(),
            }),
        ValueKind::String => Ok(Value::String(raw.to_string())),
        ValueKind::InputFile => input_file(raw).map(Value::Path),
        ValueKind::InputDirectory => input_directory(raw).map(Value::Path),
        ValueKind::OutputFile => output_file(raw).map(Value::Path),
        ValueKind::OutputDirectory => output_directory(raw).map(Value::Path),
        ValueKind::EmptyDirectory => empty_directory(raw).map(Value::Path),
    }
}

/// Case-insensitive yes/no parsing.
pub fn to_bool(raw: &str) -> Result<bool, CoerceError> {
    let normalized = raw.trim().to_lowercase();
    if TRUE_VALUES.contains(&normalized.as_str()) {
        return Ok(true);
    }
    if FALSE_VALUES.contains(&normalized.as_str()) {
        return Ok(false);
    }
    Err(CoerceError::InvalidBool { value: normalized })
}

fn to_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Numeric parse truncated toward zero (`3.9` => `3`, `-3.9` => `-3`).
fn to_int(raw: &str) -> Result<i64, CoerceError> {
    let invalid = || CoerceError::InvalidInt {
        value: raw.to_string(),
    };
    let n = to_number(raw).ok_or_else(invalid)?.trunc();
    if n < i64::MIN as f64 || n >= i64::MAX as f64 {
        return Err(invalid());
    }
    Ok(n as i64)
}

/// Lexical path normalization: drops `.`, folds `a/..`, collapses separators.
///
/// Relative paths stay relative and the filesystem is not consulted.
pub fn normalize_path(raw: &str) -> PathBuf {
    let mut parts: Vec<Component<'_>> = Vec::new();
    for component in Path::new(raw).components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match parts.last() {
                Some(Component::Normal(_)) => {
                    parts.pop();
                }
                // `/..` is `/`.
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => parts.push(component),
            },
            other => parts.push(other),
        }
    }
    if parts.is_empty() {
        return PathBuf::from(".");
    }
    parts.iter().collect()
}

fn input_file(raw: &str) -> Result<PathBuf, CoerceError> {
    if raw == "-" {
        return Ok(PathBuf::from(STDIN_PATH));
    }
    let file = normalize_path(raw);
    let shown = absolute(&file);
    let meta = match fs::metadata(&file) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(CoerceError::NotFound { path: shown });
        }
        Err(source) => return Err(CoerceError::Io { path: shown, source }),
    };
    if !meta.is_file() {
        return Err(CoerceError::NotAFile { path: shown });
    }
    if access(&file, Access::Read).is_err() {
        return Err(CoerceError::NotReadable { path: shown });
    }
    Ok(file)
}

fn input_directory(raw: &str) -> Result<PathBuf, CoerceError> {
    let dir = normalize_path(raw);
    probe(&dir, Access::Search)?;
    Ok(dir)
}

fn output_file(raw: &str) -> Result<PathBuf, CoerceError> {
    if raw == "-" {
        return Ok(PathBuf::from(STDOUT_PATH));
    }
    let file = normalize_path(raw);
    match fs::metadata(&file) {
        Ok(meta) => {
            if !meta.is_file() {
                return Err(CoerceError::NotAFile { path: file });
            }
            probe(&file, Access::Write)?;
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            probe(&parent_dir(&file), Access::Write)?;
        }
        Err(source) => return Err(CoerceError::Io { path: file, source }),
    }
    Ok(file)
}

fn output_directory(raw: &str) -> Result<PathBuf, CoerceError> {
    let dir = normalize_path(raw);
    probe(&dir, Access::Write)?;
    Ok(dir)
}

fn empty_directory(raw: &str) -> Result<PathBuf, CoerceError> {
    let dir = normalize_path(raw);
    match fs::read_dir(&dir) {
        Ok(mut entries) => {
            if entries.next().is_some() {
                return Err(CoerceError::NotEmpty { path: dir });
            }
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            probe(&parent_dir(&dir), Access::Write)?;
        }
        Err(source) => return Err(CoerceError::Io { path: dir, source }),
    }
    Ok(dir)
}

/// Parent of a normalized path; a bare file name lives in `.`.
fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        Some(_) => PathBuf::from("."),
        None => path.to_path_buf(),
    }
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

#[derive(Debug, Clone, Copy)]
enum Access {
    Read,
    Write,
    Search,
}

/// `access(2)`-style check mapped onto the coercion error taxonomy.
fn probe(path: &Path, mode: Access) -> Result<(), CoerceError> {
    match access(path, mode) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Err(CoerceError::Missing {
            path: path.to_path_buf(),
        }),
        Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
            let path = path.to_path_buf();
            Err(match mode {
                Access::Read => CoerceError::NotReadable { path },
                Access::Write => CoerceError::NotWritable { path },
                Access::Search => CoerceError::NotSearchable { path },
            })
        }
        Err(source) => Err(CoerceError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

#[cfg(unix)]
fn access(path: &Path, mode: Access) -> io::Result<()> {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    let c_path = CString::new(path.as_os_str().as_bytes())
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    let flag = match mode {
        Access::Read => libc::R_OK,
        Access::Write => libc::W_OK,
        Access::Search => libc::X_OK,
    };
    // SAFETY: `c_path` is a valid NUL-terminated string that outlives the call.
    let rc = unsafe { libc::access(c_path.as_ptr(), flag) };
    if rc == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
fn access(path: &Path, mode: Access) -> io::Result<()> {
    let meta = fs::metadata(path)?;
    match mode {
        Access::Read if meta.is_dir() => fs::read_dir(path).map(|_| ()),
        Access::Read => fs::File::open(path).map(|_| ()),
        Access::Write if meta.permissions().readonly() => {
            Err(io::Error::from(io::ErrorKind::PermissionDenied))
        }
        Access::Write | Access::Search => Ok(()),
    }
}
