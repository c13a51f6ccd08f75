use super::{Frame, Interpreter};
use crate::value::Value;
use crate::{ExceptionKind, InterpreterError};

impl Interpreter {
  /// Resolve a name: locals, enclosing calls (innermost first), globals,
  /// then builtins.
  pub(crate) fn lookup(&self, name: &str, frame: &Frame) -> Result<Value, InterpreterError> {
    if !frame.declared_global.contains(name) {
      if let Some(value) = frame.locals.as_ref().and_then(|locals| locals.get(name)) {
        return Ok(value);
      }
      if let Some(value) = frame.enclosing.iter().rev().find_map(|ns| ns.get(name)) {
        return Ok(value);
      }
    }
    frame
      .globals
      .get(name)
      .or_else(|| self.builtins.get(name))
      .ok_or_else(|| {
        InterpreterError::raise(
          ExceptionKind::NameError,
          format!("name '{name}' is not defined"),
        )
      })
  }

  /// Bind a name in the innermost scope, or in globals after `global`.
  pub(crate) fn store(&self, name: &str, value: Value, frame: &Frame) {
    match &frame.locals {
      Some(locals) if !frame.declared_global.contains(name) => locals.set(name, value),
      _ => frame.globals.set(name, value),
    }
  }

  pub(crate) fn unbind(&self, name: &str, frame: &Frame) -> Result<(), InterpreterError> {
    let removed = match &frame.locals {
      Some(locals) if !frame.declared_global.contains(name) => locals.remove(name),
      _ => frame.globals.remove(name),
    };
    match removed {
      Some(_) => Ok(()),
      None => Err(InterpreterError::raise(
        ExceptionKind::NameError,
        format!("name '{name}' is not defined"),
      )),
    }
  }
}
