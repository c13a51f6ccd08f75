use std::collections::HashSet;
use std::rc::Rc;

use super::binary_ops::{binary, compare, unary};
use super::subscripts::{get_item, get_slice};
use super::{Frame, Interpreter};
use crate::functions::builtins::dict_insert;
use crate::functions::format::format_value;
use crate::functions::methods;
use crate::syntax::{
  Argument, BoolOperator, ComparisonOp, Expr, FStringPart, Index, Target,
  UnaryOperator,
};
use crate::value::{Args, BoundMethod, Namespace, Value};
use crate::{ExceptionKind, InterpreterError};

impl Interpreter {
  pub(crate) fn eval(&mut self, expr: &Expr, frame: &Frame) -> Result<Value, InterpreterError> {
    match expr {
      Expr::None => Ok(Value::None),
      Expr::Bool(b) => Ok(Value::Bool(*b)),
      Expr::Int(n) => Ok(Value::Int(*n)),
      Expr::Float(f) => Ok(Value::Float(*f)),
      Expr::Str(s) => Ok(Value::str(s.as_str())),
      Expr::FString(parts) => self.eval_fstring(parts, frame),
      Expr::Name(name) => self.lookup(name, frame),
      Expr::List(items) => Ok(Value::list(self.eval_all(items, frame)?)),
      Expr::Tuple(items) => Ok(Value::tuple(self.eval_all(items, frame)?)),
      Expr::Dict(pairs) => {
        let mut entries = Vec::with_capacity(pairs.len());
        for (key, value) in pairs {
          let key = self.eval(key, frame)?;
          let value = self.eval(value, frame)?;
          dict_insert(&mut entries, key, value)?;
        }
        Ok(Value::dict(entries))
      }
      Expr::ListComp {
        element,
        target,
        iter,
        condition,
      } => self.eval_list_comp(element, target, iter, condition.as_deref(), frame),
      Expr::BinaryOp { op, left, right } => {
        let left = self.eval(left, frame)?;
        let right = self.eval(right, frame)?;
        binary(*op, &left, &right)
      }
      Expr::UnaryOp { op, operand } => {
        let operand = self.eval(operand, frame)?;
        match op {
          UnaryOperator::Not => Ok(Value::Bool(!operand.truthy()?)),
          _ => unary(*op, &operand),
        }
      }
      Expr::BoolOp { op, left, right } => {
        let left = self.eval(left, frame)?;
        let short_circuit = match op {
          BoolOperator::And => !left.truthy()?,
          BoolOperator::Or => left.truthy()?,
        };
        if short_circuit {
          Ok(left)
        } else {
          self.eval(right, frame)
        }
      }
      Expr::Compare { first, rest } => self.eval_compare(first, rest, frame),
      Expr::Conditional {
        condition,
        then,
        otherwise,
      } => {
        if self.eval(condition, frame)?.truthy()? {
          self.eval(then, frame)
        } else {
          self.eval(otherwise, frame)
        }
      }
      Expr::Call { func, args } => self.eval_call(func, args, frame),
      Expr::Attribute { value, name } => {
        let value = self.eval(value, frame)?;
        self.get_attribute(&value, name)
      }
      Expr::Subscript { value, index } => {
        let value = self.eval(value, frame)?;
        match index.as_ref() {
          Index::Single(index) => {
            let index = self.eval(index, frame)?;
            get_item(&value, &index)
          }
          Index::Slice { lower, upper, step } => {
            let lower = self.eval_optional(lower.as_ref(), frame)?;
            let upper = self.eval_optional(upper.as_ref(), frame)?;
            let step = self.eval_optional(step.as_ref(), frame)?;
            get_slice(&value, lower.as_ref(), upper.as_ref(), step.as_ref())
          }
        }
      }
    }
  }

  fn eval_all(&mut self, items: &[Expr], frame: &Frame) -> Result<Vec<Value>, InterpreterError> {
    items.iter().map(|item| self.eval(item, frame)).collect()
  }

  fn eval_fstring(
    &mut self,
    parts: &[FStringPart],
    frame: &Frame,
  ) -> Result<Value, InterpreterError> {
    let mut out = String::new();
    for part in parts {
      match part {
        FStringPart::Literal(text) => out.push_str(text),
        FStringPart::Field {
          expr,
          conversion,
          spec,
        } => {
          let value = self.eval(expr, frame)?;
          let value = match conversion {
            Some('r') => Value::Str(value.repr()),
            Some(_) => Value::Str(value.to_string()),
            None => value,
          };
          out.push_str(&format_value(&value, spec.as_deref().unwrap_or(""))?);
        }
      }
    }
    Ok(Value::Str(out))
  }

  /// The loop variable lives in a scope of its own, nested in `frame`.
  fn eval_list_comp(
    &mut self,
    element: &Expr,
    target: &Target,
    iter: &Expr,
    condition: Option<&Expr>,
    frame: &Frame,
  ) -> Result<Value, InterpreterError> {
    let items = self.eval(iter, frame)?.iter_values()?;
    let scope = Frame {
      globals: frame.globals.clone(),
      locals: Some(Namespace::new()),
      enclosing: frame.closure_scopes(),
      declared_global: HashSet::new(),
    };
    let mut out = Vec::new();
    for item in items {
      self.assign(target, item, &scope)?;
      if let Some(condition) = condition {
        if !self.eval(condition, &scope)?.truthy()? {
          continue;
        }
      }
      out.push(self.eval(element, &scope)?);
    }
    Ok(Value::list(out))
  }

  /// `a < b < c` evaluates `b` once and stops at the first false link.
  fn eval_compare(
    &mut self,
    first: &Expr,
    rest: &[(ComparisonOp, Expr)],
    frame: &Frame,
  ) -> Result<Value, InterpreterError> {
    let mut left = self.eval(first, frame)?;
    let mut result = Value::Bool(true);
    for (i, (op, expr)) in rest.iter().enumerate() {
      let right = self.eval(expr, frame)?;
      result = compare(*op, &left, &right)?;
      if i + 1 < rest.len() && !result.truthy()? {
        return Ok(result);
      }
      left = right;
    }
    Ok(result)
  }

  fn eval_call(
    &mut self,
    func: &Expr,
    args: &[Argument],
    frame: &Frame,
  ) -> Result<Value, InterpreterError> {
    let callee = self.eval(func, frame)?;
    let mut call_args = Args::default();
    for arg in args {
      match arg {
        Argument::Positional(expr) => call_args.positional.push(self.eval(expr, frame)?),
        Argument::Keyword(name, expr) => {
          if call_args.keyword(name).is_some() {
            return Err(InterpreterError::raise(
              ExceptionKind::SyntaxError,
              format!("keyword argument repeated: {name}"),
            ));
          }
          let value = self.eval(expr, frame)?;
          call_args.keywords.push((name.clone(), value));
        }
      }
    }
    self.call_value(&callee, call_args)
  }

  /// `value.name`: module members, bound methods, then plain attributes.
  pub(crate) fn get_attribute(&self, value: &Value, name: &str) -> Result<Value, InterpreterError> {
    if let Value::Module(module) = value {
      return module.attribute(name).ok_or_else(|| {
        InterpreterError::raise(
          ExceptionKind::AttributeError,
          format!("module '{}' has no attribute '{name}'", module.name),
        )
      });
    }
    if methods::has_method(value, name) {
      return Ok(Value::Method(Rc::new(BoundMethod {
        receiver: value.clone(),
        name: name.to_string(),
      })));
    }
    methods::attribute(value, name).ok_or_else(|| {
      InterpreterError::raise(
        ExceptionKind::AttributeError,
        format!("'{}' object has no attribute '{name}'", value.type_name()),
      )
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn eval_in(source: &str, name: &str) -> Value {
    let ns = Interpreter::default().run_main(source).unwrap();
    ns.get(name).unwrap()
  }

  #[test]
  fn boolean_operators_return_operands() {
    assert_eq!(eval_in("x = 0 or 'fallback'", "x").repr(), "'fallback'");
    assert_eq!(eval_in("x = [] and 1", "x").repr(), "[]");
  }

  #[test]
  fn comparison_chains_short_circuit() {
    assert_eq!(eval_in("x = 1 < 2 < 3", "x").repr(), "True");
    assert_eq!(eval_in("x = 3 < 2 < 1 / 0", "x").repr(), "False");
  }

  #[test]
  fn comprehension_variable_does_not_leak() {
    let ns = Interpreter::default()
      .run_main("squares = [i * i for i in range(4) if i != 2]")
      .unwrap();
    assert_eq!(ns.get("squares").unwrap().repr(), "[0, 1, 9]");
    assert!(!ns.contains("i"));
  }

  #[test]
  fn fstring_conversions_and_specs() {
    let value = eval_in("name = 'pi'\nx = f'{name!r} = {3.14159:.2f}'", "x");
    assert_eq!(value.to_string(), "'pi' = 3.14");
  }
}
