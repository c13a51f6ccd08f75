use std::collections::HashSet;
use std::rc::Rc;

use super::{Frame, Interpreter};
use crate::functions::methods;
use crate::value::{quote_str, Args, Function, Namespace, Value};
use crate::{Exception, ExceptionKind, InterpreterError};

impl Interpreter {
  /// Call any callable value.
  pub fn call_value(&mut self, func: &Value, args: Args) -> Result<Value, InterpreterError> {
    match func {
      Value::Native(native) => (native.func)(self, args),
      Value::Function(function) => self.call_function(function, args),
      Value::Method(method) => {
        methods::call_method(self, &method.receiver, &method.name, args)
      }
      Value::ExceptionType(kind) => new_exception(*kind, args),
      other => Err(InterpreterError::raise(
        ExceptionKind::TypeError,
        format!("'{}' object is not callable", other.type_name()),
      )),
    }
  }

  fn call_function(
    &mut self,
    function: &Rc<Function>,
    args: Args,
  ) -> Result<Value, InterpreterError> {
    if self.depth >= self.recursion_limit {
      return Err(InterpreterError::raise(
        ExceptionKind::RecursionError,
        "maximum recursion depth exceeded",
      ));
    }
    let locals = bind_arguments(function, args)?;
    let mut frame = Frame {
      globals: function.globals.clone(),
      locals: Some(locals),
      enclosing: function.enclosing.clone(),
      declared_global: HashSet::new(),
    };
    self.depth += 1;
    let result = self.exec_block(&function.def.body, &mut frame);
    self.depth -= 1;
    match result {
      Ok(()) => Ok(Value::None),
      Err(InterpreterError::ReturnValue(value)) => Ok(value),
      Err(err @ (InterpreterError::BreakSignal | InterpreterError::ContinueSignal)) => Err(
        InterpreterError::raise(ExceptionKind::SyntaxError, err.to_string()),
      ),
      Err(err) => Err(err),
    }
  }
}

fn bind_arguments(function: &Function, args: Args) -> Result<Namespace, InterpreterError> {
  let def = &function.def;
  let name = &def.name;
  let params = &def.params;
  let type_error = |message: String| InterpreterError::raise(ExceptionKind::TypeError, message);

  if args.positional.len() > params.len() {
    return Err(type_error(format!(
      "{name}() takes {} positional argument{} but {} {} given",
      params.len(),
      if params.len() == 1 { "" } else { "s" },
      args.positional.len(),
      if args.positional.len() == 1 { "was" } else { "were" }
    )));
  }
  let mut slots: Vec<Option<Value>> = vec![None; params.len()];
  for (slot, value) in slots.iter_mut().zip(args.positional) {
    *slot = Some(value);
  }
  for (keyword, value) in args.keywords {
    let Some(index) = params.iter().position(|p| p.name == keyword) else {
      return Err(type_error(format!(
        "{name}() got an unexpected keyword argument '{keyword}'"
      )));
    };
    if slots[index].is_some() {
      return Err(type_error(format!(
        "{name}() got multiple values for argument '{keyword}'"
      )));
    }
    slots[index] = Some(value);
  }

  let locals = Namespace::new();
  let mut missing = Vec::new();
  for (i, (param, slot)) in params.iter().zip(slots).enumerate() {
    match slot.or_else(|| function.defaults.get(i).cloned().flatten()) {
      Some(value) => locals.set(param.name.as_str(), value),
      None => missing.push(format!("'{}'", param.name)),
    }
  }
  if !missing.is_empty() {
    let listed = match missing.len() {
      1 => missing[0].clone(),
      2 => format!("{} and {}", missing[0], missing[1]),
      n => format!("{}, and {}", missing[..n - 1].join(", "), missing[n - 1]),
    };
    return Err(type_error(format!(
      "{name}() missing {} required positional argument{}: {listed}",
      missing.len(),
      if missing.len() == 1 { "" } else { "s" }
    )));
  }
  Ok(locals)
}

/// `ValueError("msg")` and friends.
fn new_exception(kind: ExceptionKind, args: Args) -> Result<Value, InterpreterError> {
  args.reject_keywords(kind.name())?;
  let message = match args.positional.as_slice() {
    [] => String::new(),
    [Value::Str(s)] if kind == ExceptionKind::KeyError => quote_str(s),
    [single] => single.to_string(),
    many => Value::tuple(many.to_vec()).repr(),
  };
  Ok(Value::Exception(Rc::new(Exception::new(kind, message))))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn run_err(source: &str) -> InterpreterError {
    Interpreter::default().run_main(source).unwrap_err()
  }

  #[test]
  fn missing_arguments_are_listed() {
    let err = run_err("def f(a, b, c=1):\n    pass\nf()\n");
    assert_eq!(
      err.to_string(),
      "f() missing 2 required positional arguments: 'a' and 'b'"
    );
  }

  #[test]
  fn duplicate_keyword_is_rejected() {
    let err = run_err("def f(a):\n    pass\nf(1, a=2)\n");
    assert_eq!(err.to_string(), "f() got multiple values for argument 'a'");
  }

  #[test]
  fn recursion_is_bounded() {
    let config = crate::EngineConfig {
      recursion_limit: 20,
      ..Default::default()
    };
    let err = Interpreter::new(&config)
      .run_main("def f(n):\n    return f(n + 1)\nf(0)\n")
      .unwrap_err();
    assert_eq!(err.kind(), Some(ExceptionKind::RecursionError));
    assert_eq!(err.to_string(), "maximum recursion depth exceeded");
  }
}
