use crate::evaluator::{Interpreter, MAX_RECURSION_LIMIT};
use crate::modules::SearchPath;
use crate::value::{Args, Namespace, StreamKind, Value};
use crate::{ExceptionKind, InterpreterError};

/// The `sys` module. `path` is the interpreter's search path itself, so
/// edits from snippet code affect imports.
pub fn namespace(search_path: &SearchPath, argv: &[String]) -> Namespace {
  let ns = Namespace::new();
  ns.set("path", search_path.as_value());
  ns.set(
    "argv",
    Value::list(argv.iter().map(|a| Value::str(a.as_str())).collect()),
  );
  ns.set(
    "version",
    Value::str(concat!("scratchpad ", env!("CARGO_PKG_VERSION"))),
  );
  ns.set("platform", Value::str(platform()));
  ns.set("stdout", Value::Stream(StreamKind::Stdout));
  ns.set("stderr", Value::Stream(StreamKind::Stderr));
  ns.set(
    "getrecursionlimit",
    Value::native("getrecursionlimit", getrecursionlimit),
  );
  ns.set(
    "setrecursionlimit",
    Value::native("setrecursionlimit", setrecursionlimit),
  );
  ns
}

fn platform() -> &'static str {
  match std::env::consts::OS {
    "macos" => "darwin",
    "windows" => "win32",
    other => other,
  }
}

pub fn getrecursionlimit(
  interp: &mut Interpreter,
  args: Args,
) -> Result<Value, InterpreterError> {
  args.arity("getrecursionlimit", 0, 0)?;
  Ok(Value::Int(interp.recursion_limit as i64))
}

pub fn setrecursionlimit(
  interp: &mut Interpreter,
  args: Args,
) -> Result<Value, InterpreterError> {
  args.arity("setrecursionlimit", 1, 1)?;
  match args.positional[0].as_int() {
    Some(n) if (1..=MAX_RECURSION_LIMIT as i64).contains(&n) => {
      interp.recursion_limit = n as usize;
      Ok(Value::None)
    }
    Some(n) if n < 1 => Err(InterpreterError::raise(
      ExceptionKind::ValueError,
      "recursion limit must be greater or equal than 1",
    )),
    Some(_) => Err(InterpreterError::raise(
      ExceptionKind::ValueError,
      format!("recursion limit cannot exceed {MAX_RECURSION_LIMIT}"),
    )),
    None => Err(InterpreterError::raise(
      ExceptionKind::TypeError,
      format!(
        "'{}' object cannot be interpreted as an integer",
        args.positional[0].type_name()
      ),
    )),
  }
}
