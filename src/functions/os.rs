use std::io;
use std::path::{Path, PathBuf, MAIN_SEPARATOR_STR};

use crate::evaluator::Interpreter;
use crate::value::{Args, Namespace, Value};
use crate::{ExceptionKind, InterpreterError};

pub fn os_namespace() -> Namespace {
  let ns = Namespace::new();
  let functions: [(&'static str, crate::value::NativeFn); 4] = [
    ("getcwd", getcwd),
    ("listdir", listdir),
    ("chdir", chdir),
    ("getenv", getenv),
  ];
  for (name, func) in functions {
    ns.set(name, Value::native(name, func));
  }
  ns.set("sep", Value::str(MAIN_SEPARATOR_STR));
  ns.set("name", Value::str(if cfg!(windows) { "nt" } else { "posix" }));
  ns
}

pub fn path_namespace() -> Namespace {
  let ns = Namespace::new();
  let functions: [(&'static str, crate::value::NativeFn); 9] = [
    ("join", join),
    ("exists", exists),
    ("isdir", isdir),
    ("isfile", isfile),
    ("basename", basename),
    ("dirname", dirname),
    ("abspath", abspath),
    ("splitext", splitext),
    ("getsize", getsize),
  ];
  for (name, func) in functions {
    ns.set(name, Value::native(name, func));
  }
  ns.set("sep", Value::str(MAIN_SEPARATOR_STR));
  ns
}

/// Map an I/O failure to the snippet exception a script would see.
fn os_error(err: io::Error, path: &str) -> InterpreterError {
  match err.kind() {
    io::ErrorKind::NotFound => InterpreterError::raise(
      ExceptionKind::FileNotFoundError,
      format!("[Errno 2] No such file or directory: '{path}'"),
    ),
    _ => InterpreterError::raise(ExceptionKind::OSError, format!("{err}: '{path}'")),
  }
}

fn path_arg<'a>(args: &'a Args, func: &str, index: usize) -> Result<&'a str, InterpreterError> {
  match args.positional.get(index) {
    Some(Value::Str(s)) => Ok(s),
    Some(other) => Err(InterpreterError::raise(
      ExceptionKind::TypeError,
      format!(
        "{func}: path should be string, not {}",
        other.type_name()
      ),
    )),
    None => Err(InterpreterError::raise(
      ExceptionKind::TypeError,
      format!("{func}() missing required argument: 'path'"),
    )),
  }
}

fn path_string(path: &Path) -> Value {
  Value::str(path.to_string_lossy().into_owned())
}

pub fn getcwd(_: &mut Interpreter, args: Args) -> Result<Value, InterpreterError> {
  args.arity("getcwd", 0, 0)?;
  let dir = std::env::current_dir().map_err(|err| os_error(err, "."))?;
  Ok(path_string(&dir))
}

pub fn listdir(_: &mut Interpreter, args: Args) -> Result<Value, InterpreterError> {
  args.arity("listdir", 0, 1)?;
  let dir = match args.positional.first() {
    Some(_) => path_arg(&args, "listdir", 0)?,
    None => ".",
  };
  let entries = std::fs::read_dir(dir).map_err(|err| os_error(err, dir))?;
  let mut names = Vec::new();
  for entry in entries {
    let entry = entry.map_err(|err| os_error(err, dir))?;
    names.push(entry.file_name().to_string_lossy().into_owned());
  }
  names.sort();
  Ok(Value::list(names.into_iter().map(Value::Str).collect()))
}

/// Changes the process directory; the surrounding execution scope puts it
/// back afterwards.
pub fn chdir(_: &mut Interpreter, args: Args) -> Result<Value, InterpreterError> {
  args.arity("chdir", 1, 1)?;
  let dir = path_arg(&args, "chdir", 0)?;
  std::env::set_current_dir(dir).map_err(|err| os_error(err, dir))?;
  Ok(Value::None)
}

pub fn getenv(_: &mut Interpreter, args: Args) -> Result<Value, InterpreterError> {
  args.arity("getenv", 1, 2)?;
  let key = path_arg(&args, "getenv", 0)?;
  Ok(match std::env::var(key) {
    Ok(value) => Value::Str(value),
    Err(_) => args.positional.get(1).cloned().unwrap_or(Value::None),
  })
}

pub fn join(_: &mut Interpreter, args: Args) -> Result<Value, InterpreterError> {
  if args.positional.is_empty() {
    return Err(InterpreterError::raise(
      ExceptionKind::TypeError,
      "join() missing required argument: 'a'",
    ));
  }
  let mut joined = PathBuf::new();
  for i in 0..args.positional.len() {
    joined.push(path_arg(&args, "join", i)?);
  }
  Ok(path_string(&joined))
}

pub fn exists(_: &mut Interpreter, args: Args) -> Result<Value, InterpreterError> {
  args.arity("exists", 1, 1)?;
  Ok(Value::Bool(Path::new(path_arg(&args, "exists", 0)?).exists()))
}

pub fn isdir(_: &mut Interpreter, args: Args) -> Result<Value, InterpreterError> {
  args.arity("isdir", 1, 1)?;
  Ok(Value::Bool(Path::new(path_arg(&args, "isdir", 0)?).is_dir()))
}

pub fn isfile(_: &mut Interpreter, args: Args) -> Result<Value, InterpreterError> {
  args.arity("isfile", 1, 1)?;
  Ok(Value::Bool(Path::new(path_arg(&args, "isfile", 0)?).is_file()))
}

/// Text after the last separator; `""` for a trailing separator.
pub fn basename(_: &mut Interpreter, args: Args) -> Result<Value, InterpreterError> {
  args.arity("basename", 1, 1)?;
  let path = path_arg(&args, "basename", 0)?;
  let name = match path.rfind(std::path::is_separator) {
    Some(i) => &path[i + 1..],
    None => path,
  };
  Ok(Value::str(name))
}

pub fn dirname(_: &mut Interpreter, args: Args) -> Result<Value, InterpreterError> {
  args.arity("dirname", 1, 1)?;
  let path = path_arg(&args, "dirname", 0)?;
  let dir = match path.rfind(std::path::is_separator) {
    Some(0) => &path[..1],
    Some(i) => path[..i].trim_end_matches(std::path::is_separator),
    None => "",
  };
  Ok(Value::str(dir))
}

pub fn abspath(_: &mut Interpreter, args: Args) -> Result<Value, InterpreterError> {
  args.arity("abspath", 1, 1)?;
  let path = Path::new(path_arg(&args, "abspath", 0)?);
  let absolute = if path.is_absolute() {
    path.to_path_buf()
  } else {
    std::env::current_dir()
      .map_err(|err| os_error(err, "."))?
      .join(path)
  };
  Ok(path_string(&normalize(&absolute)))
}

/// Lexically drop `.` and resolve `..` components.
fn normalize(path: &Path) -> PathBuf {
  use std::path::Component;
  let mut out = PathBuf::new();
  for component in path.components() {
    match component {
      Component::CurDir => {}
      Component::ParentDir => {
        out.pop();
      }
      other => out.push(other.as_os_str()),
    }
  }
  out
}

pub fn splitext(_: &mut Interpreter, args: Args) -> Result<Value, InterpreterError> {
  args.arity("splitext", 1, 1)?;
  let path = path_arg(&args, "splitext", 0)?;
  let name_start = path.rfind(std::path::is_separator).map_or(0, |i| i + 1);
  let name = &path[name_start..];
  // A leading dot names a hidden file, not an extension.
  let split = name
    .rfind('.')
    .filter(|&dot| name[..dot].chars().any(|c| c != '.'))
    .map(|dot| name_start + dot);
  let (root, ext) = match split {
    Some(at) => (&path[..at], &path[at..]),
    None => (path, ""),
  };
  Ok(Value::tuple(vec![Value::str(root), Value::str(ext)]))
}

pub fn getsize(_: &mut Interpreter, args: Args) -> Result<Value, InterpreterError> {
  args.arity("getsize", 1, 1)?;
  let path = path_arg(&args, "getsize", 0)?;
  let meta = std::fs::metadata(path).map_err(|err| os_error(err, path))?;
  Ok(Value::Int(meta.len() as i64))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn normalizes_parent_components() {
    assert_eq!(normalize(Path::new("/a/b/../c/./d")), PathBuf::from("/a/c/d"));
  }

  #[test]
  fn missing_files_map_to_file_not_found() {
    let err = os_error(io::Error::from(io::ErrorKind::NotFound), "nope.txt");
    assert_eq!(err.kind(), Some(ExceptionKind::FileNotFoundError));
    assert!(err.to_string().contains("nope.txt"));
  }
}
