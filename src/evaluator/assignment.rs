use super::binary_ops::binary;
use super::subscripts::{del_item, get_item, set_item, set_slice};
use super::{Frame, Interpreter};
use crate::modules::Module;
use crate::syntax::{BinaryOperator, Expr, Index, Target};
use crate::value::Value;
use crate::{ExceptionKind, InterpreterError};

impl Interpreter {
  pub(crate) fn assign(
    &mut self,
    target: &Target,
    value: Value,
    frame: &Frame,
  ) -> Result<(), InterpreterError> {
    match target {
      Target::Name(name) => {
        self.store(name, value, frame);
        Ok(())
      }
      Target::Attribute { value: object, name } => {
        let object = self.eval(object, frame)?;
        set_attribute(&object, name, value)
      }
      Target::Subscript { value: container, index } => {
        let container = self.eval(container, frame)?;
        match index {
          Index::Single(index) => {
            let index = self.eval(index, frame)?;
            set_item(&container, &index, value)
          }
          Index::Slice { step: Some(_), .. } => Err(InterpreterError::raise(
            ExceptionKind::ValueError,
            "extended slice assignment is not supported",
          )),
          Index::Slice { lower, upper, .. } => {
            let lower = self.eval_optional(lower.as_ref(), frame)?;
            let upper = self.eval_optional(upper.as_ref(), frame)?;
            set_slice(&container, lower.as_ref(), upper.as_ref(), &value)
          }
        }
      }
      Target::Tuple(targets) => {
        let items = match &value {
          Value::List(_) | Value::Tuple(_) | Value::Str(_) | Value::Range { .. }
          | Value::Dict(_) | Value::Array(_) => value.to_vec()?,
          other => {
            return Err(InterpreterError::raise(
              ExceptionKind::TypeError,
              format!("cannot unpack non-iterable {} object", other.type_name()),
            ));
          }
        };
        if items.len() < targets.len() {
          return Err(InterpreterError::raise(
            ExceptionKind::ValueError,
            format!(
              "not enough values to unpack (expected {}, got {})",
              targets.len(),
              items.len()
            ),
          ));
        }
        if items.len() > targets.len() {
          return Err(InterpreterError::raise(
            ExceptionKind::ValueError,
            format!("too many values to unpack (expected {})", targets.len()),
          ));
        }
        for (target, item) in targets.iter().zip(items) {
          self.assign(target, item, frame)?;
        }
        Ok(())
      }
    }
  }

  pub(crate) fn eval_optional(
    &mut self,
    expr: Option<&Expr>,
    frame: &Frame,
  ) -> Result<Option<Value>, InterpreterError> {
    expr.map(|e| self.eval(e, frame)).transpose()
  }

  /// `target op= value`. The target's container and index are evaluated
  /// once; `+=` on a list extends it in place.
  pub(crate) fn aug_assign(
    &mut self,
    target: &Target,
    op: BinaryOperator,
    value: &Expr,
    frame: &Frame,
  ) -> Result<(), InterpreterError> {
    match target {
      Target::Name(name) => {
        let current = self.lookup(name, frame)?;
        let rhs = self.eval(value, frame)?;
        let updated = in_place(op, current, &rhs)?;
        self.store(name, updated, frame);
        Ok(())
      }
      Target::Attribute { value: object, name } => {
        let object = self.eval(object, frame)?;
        let current = self.get_attribute(&object, name)?;
        let rhs = self.eval(value, frame)?;
        set_attribute(&object, name, in_place(op, current, &rhs)?)
      }
      Target::Subscript {
        value: container,
        index: Index::Single(index),
      } => {
        let container = self.eval(container, frame)?;
        let index = self.eval(index, frame)?;
        let current = get_item(&container, &index)?;
        let rhs = self.eval(value, frame)?;
        set_item(&container, &index, in_place(op, current, &rhs)?)
      }
      _ => Err(InterpreterError::raise(
        ExceptionKind::SyntaxError,
        "illegal expression for augmented assignment",
      )),
    }
  }

  pub(crate) fn delete(&mut self, target: &Target, frame: &Frame) -> Result<(), InterpreterError> {
    match target {
      Target::Name(name) => self.unbind(name, frame),
      Target::Attribute { value: object, name } => match self.eval(object, frame)? {
        Value::Module(module) if is_search_path(&module, name) => {
          Err(InterpreterError::raise(
            ExceptionKind::TypeError,
            "cannot delete sys.path",
          ))
        }
        Value::Module(module) if module.namespace.remove(name).is_some() => Ok(()),
        other => Err(InterpreterError::raise(
          ExceptionKind::AttributeError,
          format!("'{}' object has no attribute '{name}'", other.type_name()),
        )),
      },
      Target::Subscript { value: container, index } => {
        let container = self.eval(container, frame)?;
        match index {
          Index::Single(index) => {
            let index = self.eval(index, frame)?;
            del_item(&container, &index)
          }
          Index::Slice { lower, upper, step: None } => {
            let lower = self.eval_optional(lower.as_ref(), frame)?;
            let upper = self.eval_optional(upper.as_ref(), frame)?;
            set_slice(&container, lower.as_ref(), upper.as_ref(), &Value::list(Vec::new()))
          }
          Index::Slice { .. } => Err(InterpreterError::raise(
            ExceptionKind::ValueError,
            "extended slice deletion is not supported",
          )),
        }
      }
      Target::Tuple(targets) => {
        for target in targets {
          self.delete(target, frame)?;
        }
        Ok(())
      }
    }
  }
}

fn in_place(op: BinaryOperator, current: Value, rhs: &Value) -> Result<Value, InterpreterError> {
  if let (BinaryOperator::Add, Value::List(items)) = (op, &current) {
    let extra = rhs.to_vec()?;
    items.borrow_mut().extend(extra);
    return Ok(current);
  }
  binary(op, &current, rhs)
}

/// `object.name = value`. Only module attributes are writable.
pub(crate) fn set_attribute(
  object: &Value,
  name: &str,
  value: Value,
) -> Result<(), InterpreterError> {
  match object {
    Value::Module(module) if is_search_path(module, name) => {
      let entries = match &value {
        Value::List(_) | Value::Tuple(_) => value.to_vec()?,
        other => {
          return Err(InterpreterError::raise(
            ExceptionKind::TypeError,
            format!("sys.path must be a list, not '{}'", other.type_name()),
          ));
        }
      };
      // Refill the shared list so imports and the per-run restore see it.
      match module.namespace.get("path") {
        Some(Value::List(shared)) => *shared.borrow_mut() = entries,
        _ => module.namespace.set(name, Value::list(entries)),
      }
      Ok(())
    }
    Value::Module(module) => {
      module.namespace.set(name, value);
      Ok(())
    }
    other => Err(InterpreterError::raise(
      ExceptionKind::AttributeError,
      format!(
        "'{}' object attribute '{name}' is read-only",
        other.type_name()
      ),
    )),
  }
}

/// `sys.path` is bound once to the interpreter's search path list.
fn is_search_path(module: &Module, name: &str) -> bool {
  name == "path" && module.name == "sys" && module.is_native()
}
