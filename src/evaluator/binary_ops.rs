use std::cmp::Ordering;

use crate::functions::format::percent_format;
use crate::functions::numeric;
use crate::syntax::{BinaryOperator, ComparisonOp, UnaryOperator};
use crate::value::{repeated_length, Value};
use crate::{ExceptionKind, InterpreterError};

fn zero_division(message: &str) -> InterpreterError {
  InterpreterError::raise(ExceptionKind::ZeroDivisionError, message)
}

fn overflow() -> InterpreterError {
  InterpreterError::raise(ExceptionKind::OverflowError, "integer overflow")
}

fn unsupported(op: BinaryOperator, left: &Value, right: &Value) -> InterpreterError {
  InterpreterError::raise(
    ExceptionKind::TypeError,
    format!(
      "unsupported operand type(s) for {}: '{}' and '{}'",
      op.symbol(),
      left.type_name(),
      right.type_name()
    ),
  )
}

fn is_numeric(value: &Value) -> bool {
  matches!(value, Value::Int(_) | Value::Float(_) | Value::Bool(_))
}

/// Apply a binary operator. Arrays on either side dispatch element-wise.
pub(crate) fn binary(
  op: BinaryOperator,
  left: &Value,
  right: &Value,
) -> Result<Value, InterpreterError> {
  if matches!(left, Value::Array(_)) || matches!(right, Value::Array(_)) {
    return numeric::array_binary(op, left, right);
  }
  if let (Some(a), Some(b)) = (int_operand(left), int_operand(right)) {
    return int_binary(op, a, b);
  }
  if is_numeric(left) && is_numeric(right) {
    let (Some(a), Some(b)) = (left.as_f64(), right.as_f64()) else {
      return Err(unsupported(op, left, right));
    };
    return float_binary(op, a, b);
  }
  sequence_binary(op, left, right)
}

fn int_operand(value: &Value) -> Option<i64> {
  match value {
    Value::Int(n) => Some(*n),
    Value::Bool(b) => Some(*b as i64),
    _ => None,
  }
}

fn int_binary(op: BinaryOperator, a: i64, b: i64) -> Result<Value, InterpreterError> {
  let value = match op {
    BinaryOperator::Add => Value::Int(a.checked_add(b).ok_or_else(overflow)?),
    BinaryOperator::Sub => Value::Int(a.checked_sub(b).ok_or_else(overflow)?),
    BinaryOperator::Mul => Value::Int(a.checked_mul(b).ok_or_else(overflow)?),
    BinaryOperator::Div => {
      if b == 0 {
        return Err(zero_division("division by zero"));
      }
      Value::Float(a as f64 / b as f64)
    }
    BinaryOperator::FloorDiv => {
      if b == 0 {
        return Err(zero_division("integer division or modulo by zero"));
      }
      Value::Int(a.checked_div_euclid(b).ok_or_else(overflow)? - floor_adjust(a, b))
    }
    BinaryOperator::Mod => {
      if b == 0 {
        return Err(zero_division("integer division or modulo by zero"));
      }
      let r = a.checked_rem(b).ok_or_else(overflow)?;
      Value::Int(if r != 0 && (r < 0) != (b < 0) { r + b } else { r })
    }
    BinaryOperator::Pow => {
      if b < 0 {
        if a == 0 {
          return Err(zero_division(
            "0.0 cannot be raised to a negative power",
          ));
        }
        Value::Float((a as f64).powf(b as f64))
      } else {
        let exp = u32::try_from(b).map_err(|_| overflow())?;
        Value::Int(a.checked_pow(exp).ok_or_else(overflow)?)
      }
    }
  };
  Ok(value)
}

/// Euclidean and floor division agree for positive divisors only.
fn floor_adjust(a: i64, b: i64) -> i64 {
  if b < 0 && a.rem_euclid(b) != 0 {
    1
  } else {
    0
  }
}

fn float_binary(op: BinaryOperator, a: f64, b: f64) -> Result<Value, InterpreterError> {
  let value = match op {
    BinaryOperator::Add => a + b,
    BinaryOperator::Sub => a - b,
    BinaryOperator::Mul => a * b,
    BinaryOperator::Div => {
      if b == 0.0 {
        return Err(zero_division("float division by zero"));
      }
      a / b
    }
    BinaryOperator::FloorDiv => {
      if b == 0.0 {
        return Err(zero_division("float floor division by zero"));
      }
      (a / b).floor()
    }
    BinaryOperator::Mod => {
      if b == 0.0 {
        return Err(zero_division("float modulo"));
      }
      let r = a % b;
      if r != 0.0 && (r < 0.0) != (b < 0.0) {
        r + b
      } else {
        r
      }
    }
    BinaryOperator::Pow => {
      if a == 0.0 && b < 0.0 {
        return Err(zero_division(
          "0.0 cannot be raised to a negative power",
        ));
      }
      a.powf(b)
    }
  };
  Ok(Value::Float(value))
}

fn repeat_count(value: &Value) -> Option<usize> {
  int_operand(value).map(|n| n.max(0) as usize)
}

fn sequence_binary(
  op: BinaryOperator,
  left: &Value,
  right: &Value,
) -> Result<Value, InterpreterError> {
  match (op, left, right) {
    (BinaryOperator::Add, Value::Str(a), Value::Str(b)) => Ok(Value::str(format!("{a}{b}"))),
    (BinaryOperator::Add, Value::Str(_), other) => Err(InterpreterError::raise(
      ExceptionKind::TypeError,
      format!(
        "can only concatenate str (not \"{}\") to str",
        other.type_name()
      ),
    )),
    (BinaryOperator::Add, Value::List(a), Value::List(b)) => {
      let mut items = a.borrow().clone();
      items.extend(b.borrow().iter().cloned());
      Ok(Value::list(items))
    }
    (BinaryOperator::Add, Value::List(_), other) => Err(InterpreterError::raise(
      ExceptionKind::TypeError,
      format!(
        "can only concatenate list (not \"{}\") to list",
        other.type_name()
      ),
    )),
    (BinaryOperator::Add, Value::Tuple(a), Value::Tuple(b)) => {
      let mut items = a.as_ref().clone();
      items.extend(b.iter().cloned());
      Ok(Value::tuple(items))
    }
    (BinaryOperator::Mul, Value::Str(s), n) | (BinaryOperator::Mul, n, Value::Str(s)) => {
      match repeat_count(n) {
        Some(count) => {
          repeated_length(s.len(), count)?;
          Ok(Value::str(s.repeat(count)))
        }
        None => Err(InterpreterError::raise(
          ExceptionKind::TypeError,
          format!(
            "can't multiply sequence by non-int of type '{}'",
            n.type_name()
          ),
        )),
      }
    }
    (BinaryOperator::Mul, Value::List(items), n) | (BinaryOperator::Mul, n, Value::List(items))
      if repeat_count(n).is_some() =>
    {
      let count = repeat_count(n).unwrap_or(0);
      let items = items.borrow();
      repeated_length(items.len(), count)?;
      Ok(Value::list(
        std::iter::repeat(items.iter().cloned()).take(count).flatten().collect(),
      ))
    }
    (BinaryOperator::Mul, Value::Tuple(items), n) | (BinaryOperator::Mul, n, Value::Tuple(items))
      if repeat_count(n).is_some() =>
    {
      let count = repeat_count(n).unwrap_or(0);
      repeated_length(items.len(), count)?;
      Ok(Value::tuple(
        std::iter::repeat(items.iter().cloned()).take(count).flatten().collect(),
      ))
    }
    (BinaryOperator::Mod, Value::Str(template), args) => {
      Ok(Value::str(percent_format(template, args)?))
    }
    _ => Err(unsupported(op, left, right)),
  }
}

pub(crate) fn unary(op: UnaryOperator, operand: &Value) -> Result<Value, InterpreterError> {
  match (op, operand) {
    (UnaryOperator::Not, value) => Ok(Value::Bool(!value.truthy()?)),
    (UnaryOperator::Neg, Value::Int(n)) => n.checked_neg().map(Value::Int).ok_or_else(overflow),
    (UnaryOperator::Neg, Value::Bool(b)) => Ok(Value::Int(-(*b as i64))),
    (UnaryOperator::Neg, Value::Float(f)) => Ok(Value::Float(-f)),
    (UnaryOperator::Neg, Value::Array(array)) => Ok(numeric::array_neg(array)),
    (UnaryOperator::Pos, Value::Bool(b)) => Ok(Value::Int(*b as i64)),
    (UnaryOperator::Pos, value @ (Value::Int(_) | Value::Float(_) | Value::Array(_))) => {
      Ok(value.clone())
    }
    (op, value) => Err(InterpreterError::raise(
      ExceptionKind::TypeError,
      format!(
        "bad operand type for unary {}: '{}'",
        if op == UnaryOperator::Neg { "-" } else { "+" },
        value.type_name()
      ),
    )),
  }
}

fn comparison_symbol(op: ComparisonOp) -> &'static str {
  match op {
    ComparisonOp::Lt => "<",
    ComparisonOp::LtE => "<=",
    ComparisonOp::Gt => ">",
    ComparisonOp::GtE => ">=",
    ComparisonOp::Eq => "==",
    ComparisonOp::NotEq => "!=",
    ComparisonOp::In => "in",
    ComparisonOp::NotIn => "not in",
    ComparisonOp::Is => "is",
    ComparisonOp::IsNot => "is not",
  }
}

/// Evaluate one link of a comparison chain.
pub(crate) fn compare(
  op: ComparisonOp,
  left: &Value,
  right: &Value,
) -> Result<Value, InterpreterError> {
  let result = match op {
    ComparisonOp::Is => left.is(right),
    ComparisonOp::IsNot => !left.is(right),
    ComparisonOp::In => contains(right, left)?,
    ComparisonOp::NotIn => !contains(right, left)?,
    _ if matches!(left, Value::Array(_)) || matches!(right, Value::Array(_)) => {
      return numeric::array_compare(op, left, right);
    }
    ComparisonOp::Eq => left.py_eq(right),
    ComparisonOp::NotEq => !left.py_eq(right),
    _ => {
      // NaN compares false against everything.
      if let (true, true, Some(a), Some(b)) =
        (is_numeric(left), is_numeric(right), left.as_f64(), right.as_f64())
      {
        if a.is_nan() || b.is_nan() {
          return Ok(Value::Bool(false));
        }
      }
      let ordering = order_for(comparison_symbol(op), left, right)?;
      match op {
        ComparisonOp::Lt => ordering == Ordering::Less,
        ComparisonOp::LtE => ordering != Ordering::Greater,
        ComparisonOp::Gt => ordering == Ordering::Greater,
        _ => ordering != Ordering::Less,
      }
    }
  };
  Ok(Value::Bool(result))
}

/// Total order used by `sorted`, `min` and `max`.
pub(crate) fn order(left: &Value, right: &Value) -> Result<Ordering, InterpreterError> {
  order_for("<", left, right)
}

fn order_for(symbol: &str, left: &Value, right: &Value) -> Result<Ordering, InterpreterError> {
  if let (Some(a), Some(b)) = (int_operand(left), int_operand(right)) {
    return Ok(a.cmp(&b));
  }
  if is_numeric(left) && is_numeric(right) {
    let (a, b) = (left.as_f64().unwrap_or(0.0), right.as_f64().unwrap_or(0.0));
    return Ok(a.partial_cmp(&b).unwrap_or(Ordering::Equal));
  }
  match (left, right) {
    (Value::Str(a), Value::Str(b)) => Ok(a.cmp(b)),
    (Value::List(a), Value::List(b)) => {
      let (a, b) = (a.borrow().clone(), b.borrow().clone());
      sequence_order(symbol, &a, &b)
    }
    (Value::Tuple(a), Value::Tuple(b)) => sequence_order(symbol, a, b),
    _ => Err(InterpreterError::raise(
      ExceptionKind::TypeError,
      format!(
        "'{symbol}' not supported between instances of '{}' and '{}'",
        left.type_name(),
        right.type_name()
      ),
    )),
  }
}

fn sequence_order(symbol: &str, a: &[Value], b: &[Value]) -> Result<Ordering, InterpreterError> {
  for (x, y) in a.iter().zip(b) {
    if !x.py_eq(y) {
      return order_for(symbol, x, y);
    }
  }
  Ok(a.len().cmp(&b.len()))
}

/// `item in container`.
pub(crate) fn contains(container: &Value, item: &Value) -> Result<bool, InterpreterError> {
  match container {
    Value::Str(haystack) => match item {
      Value::Str(needle) => Ok(haystack.contains(needle.as_str())),
      other => Err(InterpreterError::raise(
        ExceptionKind::TypeError,
        format!(
          "'in <string>' requires string as left operand, not {}",
          other.type_name()
        ),
      )),
    },
    Value::List(items) => Ok(items.borrow().iter().any(|v| v.py_eq(item))),
    Value::Tuple(items) => Ok(items.iter().any(|v| v.py_eq(item))),
    Value::Dict(items) => {
      item.check_hashable()?;
      Ok(items.borrow().iter().any(|(k, _)| k.py_eq(item)))
    }
    Value::Range { start, stop, step } => {
      let Some(n) = int_operand(item) else {
        return Ok(false);
      };
      let within = if *step > 0 {
        *start <= n && n < *stop
      } else {
        *stop < n && n <= *start
      };
      Ok(within && (n - start) % step == 0)
    }
    Value::Array(array) => Ok(match item.as_f64() {
      Some(x) => array.data.iter().any(|v| *v == x),
      None => false,
    }),
    other => Err(InterpreterError::raise(
      ExceptionKind::TypeError,
      format!("argument of type '{}' is not iterable", other.type_name()),
    )),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn int_op(op: BinaryOperator, a: i64, b: i64) -> Value {
    binary(op, &Value::Int(a), &Value::Int(b)).unwrap()
  }

  #[test]
  fn floor_division_rounds_down() {
    assert_eq!(int_op(BinaryOperator::FloorDiv, 7, 2).repr(), "3");
    assert_eq!(int_op(BinaryOperator::FloorDiv, -7, 2).repr(), "-4");
    assert_eq!(int_op(BinaryOperator::FloorDiv, 7, -2).repr(), "-4");
    assert_eq!(int_op(BinaryOperator::FloorDiv, -7, -2).repr(), "3");
    assert_eq!(int_op(BinaryOperator::Mod, -7, 2).repr(), "1");
    assert_eq!(int_op(BinaryOperator::Mod, 7, -2).repr(), "-1");
  }

  #[test]
  fn true_division_by_zero() {
    let err = binary(BinaryOperator::Div, &Value::Int(1), &Value::Int(0)).unwrap_err();
    assert_eq!(err.to_string(), "division by zero");
    assert_eq!(err.kind(), Some(ExceptionKind::ZeroDivisionError));
  }

  #[test]
  fn negative_power_gives_float() {
    assert_eq!(int_op(BinaryOperator::Pow, 2, -1).repr(), "0.5");
    assert_eq!(int_op(BinaryOperator::Pow, 2, 10).repr(), "1024");
  }

  #[test]
  fn mixed_types_are_rejected() {
    let err = binary(BinaryOperator::Sub, &Value::str("a"), &Value::Int(1)).unwrap_err();
    assert_eq!(
      err.to_string(),
      "unsupported operand type(s) for -: 'str' and 'int'"
    );
    let err = compare(ComparisonOp::Lt, &Value::str("a"), &Value::Int(1)).unwrap_err();
    assert_eq!(
      err.to_string(),
      "'<' not supported between instances of 'str' and 'int'"
    );
  }

  #[test]
  fn range_membership_respects_step() {
    let range = Value::Range { start: 0, stop: 10, step: 3 };
    assert!(contains(&range, &Value::Int(9)).unwrap());
    assert!(!contains(&range, &Value::Int(4)).unwrap());
  }
}
