//! One-dimensional numeric arrays backing the `numpy` module.

use std::fmt;
use std::rc::Rc;

use crate::evaluator::Interpreter;
use crate::syntax::{BinaryOperator, ComparisonOp};
use crate::value::{check_length, format_float, Args, Value};
use crate::{ExceptionKind, InterpreterError};

/// Arrays longer than this print only their ends.
const SUMMARY_THRESHOLD: usize = 1000;
const SUMMARY_EDGE: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DType {
  Bool,
  Int,
  Float,
}

impl DType {
  pub fn name(self) -> &'static str {
    match self {
      DType::Bool => "bool",
      DType::Int => "int64",
      DType::Float => "float64",
    }
  }

  /// The common type two operands are promoted to.
  fn promote(self, other: DType) -> DType {
    match (self, other) {
      (DType::Float, _) | (_, DType::Float) => DType::Float,
      (DType::Bool, DType::Bool) => DType::Bool,
      _ => DType::Int,
    }
  }

  fn of(value: &Value) -> Option<DType> {
    match value {
      Value::Bool(_) => Some(DType::Bool),
      Value::Int(_) => Some(DType::Int),
      Value::Float(_) => Some(DType::Float),
      _ => None,
    }
  }
}

/// A 1-D array. Elements are stored as `f64`; `dtype` decides how they
/// are displayed and converted back to scalars.
#[derive(Debug, Clone, PartialEq)]
pub struct NdArray {
  pub data: Vec<f64>,
  pub dtype: DType,
}

impl NdArray {
  pub fn new(data: Vec<f64>, dtype: DType) -> Self {
    NdArray { data, dtype }
  }

  pub fn floats(data: Vec<f64>) -> Self {
    NdArray::new(data, DType::Float)
  }

  pub fn into_value(self) -> Value {
    Value::Array(Rc::new(self))
  }

  pub fn len(&self) -> usize {
    self.data.len()
  }

  pub fn is_empty(&self) -> bool {
    self.data.is_empty()
  }

  /// Build an array from a list, tuple, range or array of numbers.
  pub fn from_value(value: &Value) -> Result<NdArray, InterpreterError> {
    if let Value::Array(array) = value {
      return Ok(array.as_ref().clone());
    }
    let items = match value {
      Value::List(_) | Value::Tuple(_) | Value::Range { .. } => {
        value.to_vec()?
      }
      scalar if DType::of(scalar).is_some() => vec![scalar.clone()],
      other => {
        return Err(InterpreterError::raise(
          ExceptionKind::TypeError,
          format!("cannot convert '{}' to an array", other.type_name()),
        ));
      }
    };
    let mut dtype = DType::Bool;
    let mut data = Vec::with_capacity(items.len());
    for item in &items {
      let item_type = match item {
        Value::List(_) | Value::Tuple(_) | Value::Array(_) => {
          return Err(InterpreterError::raise(
            ExceptionKind::ValueError,
            "only 1-dimensional arrays are supported",
          ));
        }
        other => DType::of(other).ok_or_else(|| {
          InterpreterError::raise(
            ExceptionKind::TypeError,
            format!(
              "could not convert '{}' to a number",
              other.type_name()
            ),
          )
        })?,
      };
      dtype = dtype.promote(item_type);
      data.push(item.as_f64().unwrap_or(f64::NAN));
    }
    if items.is_empty() {
      dtype = DType::Float;
    }
    Ok(NdArray::new(data, dtype))
  }

  pub fn scalar(&self, x: f64) -> Value {
    match self.dtype {
      DType::Bool => Value::Bool(x != 0.0),
      DType::Int => Value::Int(x as i64),
      DType::Float => Value::Float(x),
    }
  }

  pub fn scalars(&self) -> Vec<Value> {
    self.data.iter().map(|&x| self.scalar(x)).collect()
  }

  pub fn truthy(&self) -> Result<bool, InterpreterError> {
    match self.data.as_slice() {
      [] => Ok(false),
      [x] => Ok(*x != 0.0),
      _ => Err(InterpreterError::raise(
        ExceptionKind::ValueError,
        "The truth value of an array with more than one element is \
         ambiguous. Use a.any() or a.all()",
      )),
    }
  }

  /// Element `index`, counting from the end when negative.
  pub fn item(&self, index: i64) -> Result<Value, InterpreterError> {
    let len = self.data.len() as i64;
    let resolved = if index < 0 { index + len } else { index };
    if resolved < 0 || resolved >= len {
      return Err(InterpreterError::raise(
        ExceptionKind::IndexError,
        format!(
          "index {index} is out of bounds for axis 0 with size {len}"
        ),
      ));
    }
    Ok(self.scalar(self.data[resolved as usize]))
  }

  pub fn take(&self, indices: &[usize]) -> NdArray {
    NdArray::new(
      indices.iter().filter_map(|&i| self.data.get(i).copied()).collect(),
      self.dtype,
    )
  }

  /// Elements where `mask` is true. The mask must match in length.
  pub fn select(&self, mask: &NdArray) -> Result<NdArray, InterpreterError> {
    if mask.len() != self.len() {
      return Err(InterpreterError::raise(
        ExceptionKind::IndexError,
        format!(
          "boolean index did not match indexed array along dimension 0; \
           dimension is {} but corresponding boolean dimension is {}",
          self.len(),
          mask.len()
        ),
      ));
    }
    Ok(NdArray::new(
      self
        .data
        .iter()
        .zip(&mask.data)
        .filter(|(_, keep)| **keep != 0.0)
        .map(|(x, _)| *x)
        .collect(),
      self.dtype,
    ))
  }

  fn element_text(&self, x: f64, repr: bool) -> String {
    match self.dtype {
      DType::Bool if x != 0.0 => "True".to_string(),
      DType::Bool => "False".to_string(),
      DType::Int => format!("{}", x as i64),
      DType::Float => format_element(x, repr),
    }
  }

  fn elements(&self, repr: bool) -> Vec<String> {
    let text = |x: &f64| self.element_text(*x, repr);
    if self.data.len() > SUMMARY_THRESHOLD {
      let head = self.data[..SUMMARY_EDGE].iter().map(text);
      let tail = self.data[self.data.len() - SUMMARY_EDGE..].iter().map(text);
      head.chain(std::iter::once("...".to_string())).chain(tail).collect()
    } else {
      self.data.iter().map(text).collect()
    }
  }

  pub fn repr(&self) -> String {
    format!("array([{}])", self.elements(true).join(", "))
  }
}

impl fmt::Display for NdArray {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "[{}]", self.elements(false).join(" "))
  }
}

/// numpy-style float element: at most 8 significant decimals and a bare
/// trailing dot for whole numbers in `str`, `1.0` style in `repr`.
fn format_element(x: f64, repr: bool) -> String {
  if !x.is_finite() {
    return format_float(x);
  }
  let magnitude = x.abs();
  if magnitude != 0.0 && !(1e-4..1e16).contains(&magnitude) {
    return format_float(x);
  }
  let fixed = format!("{x:.8}");
  let trimmed = fixed.trim_end_matches('0');
  if trimmed.ends_with('.') {
    if repr {
      format!("{trimmed}0")
    } else {
      trimmed.to_string()
    }
  } else {
    trimmed.to_string()
  }
}

enum Operand {
  Scalar(f64, DType),
  Array(NdArray),
}

fn operand(value: &Value) -> Result<Operand, InterpreterError> {
  match value {
    Value::Array(array) => Ok(Operand::Array(array.as_ref().clone())),
    Value::List(_) | Value::Tuple(_) | Value::Range { .. } => {
      Ok(Operand::Array(NdArray::from_value(value)?))
    }
    other => match (other.as_f64(), DType::of(other)) {
      (Some(x), Some(dtype)) => Ok(Operand::Scalar(x, dtype)),
      _ => Err(InterpreterError::raise(
        ExceptionKind::TypeError,
        format!(
          "unsupported operand type for array arithmetic: '{}'",
          other.type_name()
        ),
      )),
    },
  }
}

/// Pair up two operands element-wise, broadcasting scalars.
fn broadcast(
  left: &Value,
  right: &Value,
) -> Result<(Vec<(f64, f64)>, DType, DType), InterpreterError> {
  let (left, right) = (operand(left)?, operand(right)?);
  let pairs = match (&left, &right) {
    (Operand::Array(a), Operand::Array(b)) => {
      if a.len() != b.len() {
        return Err(InterpreterError::raise(
          ExceptionKind::ValueError,
          format!(
            "operands could not be broadcast together with shapes ({},) ({},)",
            a.len(),
            b.len()
          ),
        ));
      }
      a.data.iter().copied().zip(b.data.iter().copied()).collect()
    }
    (Operand::Array(a), Operand::Scalar(y, _)) => {
      a.data.iter().map(|&x| (x, *y)).collect()
    }
    (Operand::Scalar(x, _), Operand::Array(b)) => {
      b.data.iter().map(|&y| (*x, y)).collect()
    }
    (Operand::Scalar(x, _), Operand::Scalar(y, _)) => vec![(*x, *y)],
  };
  let dtype_of = |op: &Operand| match op {
    Operand::Array(a) => a.dtype,
    Operand::Scalar(_, dtype) => *dtype,
  };
  Ok((pairs, dtype_of(&left), dtype_of(&right)))
}

fn floor_mod(x: f64, y: f64) -> f64 {
  let r = x % y;
  if r != 0.0 && (r < 0.0) != (y < 0.0) {
    r + y
  } else {
    r
  }
}

/// Element-wise arithmetic where at least one side is an array.
pub fn array_binary(
  op: BinaryOperator,
  left: &Value,
  right: &Value,
) -> Result<Value, InterpreterError> {
  let (pairs, lt, rt) = broadcast(left, right)?;
  let integral = lt.promote(rt) != DType::Float;
  let dtype = match op {
    BinaryOperator::Div => DType::Float,
    BinaryOperator::Pow if integral => {
      if pairs.iter().any(|(_, y)| *y < 0.0) {
        return Err(InterpreterError::raise(
          ExceptionKind::ValueError,
          "Integers to negative integer powers are not allowed.",
        ));
      }
      DType::Int
    }
    _ if integral => DType::Int,
    _ => DType::Float,
  };
  let data = pairs
    .into_iter()
    .map(|(x, y)| match op {
      BinaryOperator::Add => x + y,
      BinaryOperator::Sub => x - y,
      BinaryOperator::Mul => x * y,
      BinaryOperator::Div => x / y,
      BinaryOperator::FloorDiv if integral && y == 0.0 => 0.0,
      BinaryOperator::FloorDiv => (x / y).floor(),
      BinaryOperator::Mod if integral && y == 0.0 => 0.0,
      BinaryOperator::Mod => floor_mod(x, y),
      BinaryOperator::Pow => x.powf(y),
    })
    .collect();
  Ok(NdArray::new(data, dtype).into_value())
}

/// Element-wise comparison producing a boolean array.
pub fn array_compare(
  op: ComparisonOp,
  left: &Value,
  right: &Value,
) -> Result<Value, InterpreterError> {
  let (pairs, _, _) = broadcast(left, right)?;
  let test: fn(f64, f64) -> bool = match op {
    ComparisonOp::Eq => |x, y| x == y,
    ComparisonOp::NotEq => |x, y| x != y,
    ComparisonOp::Lt => |x, y| x < y,
    ComparisonOp::LtE => |x, y| x <= y,
    ComparisonOp::Gt => |x, y| x > y,
    ComparisonOp::GtE => |x, y| x >= y,
    ComparisonOp::In
    | ComparisonOp::NotIn
    | ComparisonOp::Is
    | ComparisonOp::IsNot => {
      return Err(InterpreterError::raise(
        ExceptionKind::TypeError,
        "unsupported comparison for arrays",
      ));
    }
  };
  let data = pairs
    .into_iter()
    .map(|(x, y)| if test(x, y) { 1.0 } else { 0.0 })
    .collect();
  Ok(NdArray::new(data, DType::Bool).into_value())
}

pub fn array_neg(array: &NdArray) -> Value {
  let dtype = if array.dtype == DType::Bool {
    DType::Int
  } else {
    array.dtype
  };
  NdArray::new(array.data.iter().map(|x| -x).collect(), dtype).into_value()
}

// ── Reductions ───────────────────────────────────────────────────────

fn empty_reduction(name: &str) -> InterpreterError {
  InterpreterError::raise(
    ExceptionKind::ValueError,
    format!("zero-size array to reduction operation {name} which has no identity"),
  )
}

pub fn sum(array: &NdArray) -> Value {
  let total: f64 = array.data.iter().sum();
  match array.dtype {
    DType::Float => Value::Float(total),
    DType::Bool | DType::Int => Value::Int(total as i64),
  }
}

pub fn mean(array: &NdArray) -> Value {
  if array.is_empty() {
    return Value::Float(f64::NAN);
  }
  Value::Float(array.data.iter().sum::<f64>() / array.len() as f64)
}

pub fn min(array: &NdArray) -> Result<Value, InterpreterError> {
  array
    .data
    .iter()
    .copied()
    .reduce(f64::min)
    .map(|x| array.scalar(x))
    .ok_or_else(|| empty_reduction("minimum"))
}

pub fn max(array: &NdArray) -> Result<Value, InterpreterError> {
  array
    .data
    .iter()
    .copied()
    .reduce(f64::max)
    .map(|x| array.scalar(x))
    .ok_or_else(|| empty_reduction("maximum"))
}

/// Population standard deviation.
pub fn std(array: &NdArray) -> Value {
  if array.is_empty() {
    return Value::Float(f64::NAN);
  }
  let n = array.len() as f64;
  let mean = array.data.iter().sum::<f64>() / n;
  let variance = array.data.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
  Value::Float(variance.sqrt())
}

pub fn cumsum(array: &NdArray) -> Value {
  let mut running = 0.0;
  let data = array
    .data
    .iter()
    .map(|x| {
      running += x;
      running
    })
    .collect();
  let dtype = if array.dtype == DType::Float {
    DType::Float
  } else {
    DType::Int
  };
  NdArray::new(data, dtype).into_value()
}

pub fn any(array: &NdArray) -> Value {
  Value::Bool(array.data.iter().any(|x| *x != 0.0))
}

pub fn all(array: &NdArray) -> Value {
  Value::Bool(array.data.iter().all(|x| *x != 0.0))
}

// ── numpy module functions ───────────────────────────────────────────

fn number(value: &Value, func: &str) -> Result<f64, InterpreterError> {
  value.as_f64().ok_or_else(|| {
    InterpreterError::raise(
      ExceptionKind::TypeError,
      format!("{func}() expected a number, got '{}'", value.type_name()),
    )
  })
}

fn length(value: &Value, func: &str) -> Result<usize, InterpreterError> {
  let n = match value {
    Value::Tuple(items) if items.len() == 1 => items[0].as_int(),
    other => other.as_int(),
  };
  match n {
    Some(n) if n >= 0 => check_length(n as usize),
    Some(_) => Err(InterpreterError::raise(
      ExceptionKind::ValueError,
      "negative dimensions are not allowed",
    )),
    None => Err(InterpreterError::raise(
      ExceptionKind::TypeError,
      format!("{func}() expected an integer size, got '{}'", value.type_name()),
    )),
  }
}

fn requested_dtype(value: &Value) -> Option<DType> {
  let name = match value {
    Value::Str(s) => s.as_str(),
    Value::Native(native) => native.name,
    _ => return None,
  };
  match name {
    "float" | "float64" | "float32" => Some(DType::Float),
    "int" | "int64" | "int32" => Some(DType::Int),
    "bool" => Some(DType::Bool),
    _ => None,
  }
}

pub fn np_array(_: &mut Interpreter, args: Args) -> Result<Value, InterpreterError> {
  let source = args.required("array", 0, "object")?;
  let mut array = NdArray::from_value(source)?;
  if let Some(dtype) = args.get(1, "dtype").and_then(requested_dtype) {
    if dtype == DType::Int {
      array.data.iter_mut().for_each(|x| *x = x.trunc());
    } else if dtype == DType::Bool {
      array
        .data
        .iter_mut()
        .for_each(|x| *x = if *x != 0.0 { 1.0 } else { 0.0 });
    }
    array.dtype = dtype;
  }
  Ok(array.into_value())
}

pub fn np_arange(_: &mut Interpreter, args: Args) -> Result<Value, InterpreterError> {
  args.arity("arange", 1, 3)?;
  let p = &args.positional;
  let (start, stop, step) = match p.len() {
    1 => (Value::Int(0), p[0].clone(), Value::Int(1)),
    2 => (p[0].clone(), p[1].clone(), Value::Int(1)),
    _ => (p[0].clone(), p[1].clone(), p[2].clone()),
  };
  let all_int = [&start, &stop, &step]
    .iter()
    .all(|v| matches!(v, Value::Int(_) | Value::Bool(_)));
  let (start, stop, step) = (
    number(&start, "arange")?,
    number(&stop, "arange")?,
    number(&step, "arange")?,
  );
  if step == 0.0 {
    return Err(InterpreterError::raise(
      ExceptionKind::ZeroDivisionError,
      "division by zero",
    ));
  }
  let count = check_length(((stop - start) / step).ceil().max(0.0) as usize)?;
  let data = (0..count).map(|i| start + i as f64 * step).collect();
  let dtype = if all_int { DType::Int } else { DType::Float };
  Ok(NdArray::new(data, dtype).into_value())
}

pub fn np_linspace(_: &mut Interpreter, args: Args) -> Result<Value, InterpreterError> {
  let start = number(args.required("linspace", 0, "start")?, "linspace")?;
  let stop = number(args.required("linspace", 1, "stop")?, "linspace")?;
  let num = match args.get(2, "num") {
    Some(value) => length(value, "linspace")?,
    None => 50,
  };
  let endpoint = match args.get(3, "endpoint") {
    Some(value) => value.truthy()?,
    None => true,
  };
  let divisions = if endpoint { num.saturating_sub(1) } else { num };
  let step = if divisions == 0 {
    0.0
  } else {
    (stop - start) / divisions as f64
  };
  let mut data: Vec<f64> = (0..num).map(|i| start + i as f64 * step).collect();
  if endpoint && num > 1 {
    if let Some(last) = data.last_mut() {
      *last = stop;
    }
  }
  Ok(NdArray::floats(data).into_value())
}

pub fn np_zeros(_: &mut Interpreter, args: Args) -> Result<Value, InterpreterError> {
  let n = length(args.required("zeros", 0, "shape")?, "zeros")?;
  Ok(NdArray::floats(vec![0.0; n]).into_value())
}

pub fn np_ones(_: &mut Interpreter, args: Args) -> Result<Value, InterpreterError> {
  let n = length(args.required("ones", 0, "shape")?, "ones")?;
  Ok(NdArray::floats(vec![1.0; n]).into_value())
}

/// Apply `f` to a scalar or element-wise to an array-like.
fn ufunc(
  args: &Args,
  name: &str,
  f: fn(f64) -> f64,
) -> Result<Value, InterpreterError> {
  args.arity(name, 1, 1)?;
  match &args.positional[0] {
    scalar @ (Value::Int(_) | Value::Float(_) | Value::Bool(_)) => {
      Ok(Value::Float(f(number(scalar, name)?)))
    }
    other => {
      let array = NdArray::from_value(other)?;
      Ok(NdArray::floats(array.data.into_iter().map(f).collect()).into_value())
    }
  }
}

pub fn np_sin(_: &mut Interpreter, args: Args) -> Result<Value, InterpreterError> {
  ufunc(&args, "sin", f64::sin)
}

pub fn np_cos(_: &mut Interpreter, args: Args) -> Result<Value, InterpreterError> {
  ufunc(&args, "cos", f64::cos)
}

pub fn np_tan(_: &mut Interpreter, args: Args) -> Result<Value, InterpreterError> {
  ufunc(&args, "tan", f64::tan)
}

pub fn np_exp(_: &mut Interpreter, args: Args) -> Result<Value, InterpreterError> {
  ufunc(&args, "exp", f64::exp)
}

pub fn np_log(_: &mut Interpreter, args: Args) -> Result<Value, InterpreterError> {
  ufunc(&args, "log", f64::ln)
}

pub fn np_sqrt(_: &mut Interpreter, args: Args) -> Result<Value, InterpreterError> {
  ufunc(&args, "sqrt", f64::sqrt)
}

/// `abs` keeps integer dtypes, unlike the other ufuncs.
pub fn np_abs(_: &mut Interpreter, args: Args) -> Result<Value, InterpreterError> {
  args.arity("abs", 1, 1)?;
  match &args.positional[0] {
    Value::Int(n) => Ok(Value::Int(n.saturating_abs())),
    Value::Bool(b) => Ok(Value::Int(*b as i64)),
    Value::Float(x) => Ok(Value::Float(x.abs())),
    other => {
      let array = NdArray::from_value(other)?;
      let dtype = if array.dtype == DType::Float {
        DType::Float
      } else {
        DType::Int
      };
      Ok(NdArray::new(array.data.iter().map(|x| x.abs()).collect(), dtype)
        .into_value())
    }
  }
}

fn reduce(
  args: &Args,
  name: &str,
) -> Result<NdArray, InterpreterError> {
  args.arity(name, 1, 1)?;
  NdArray::from_value(&args.positional[0])
}

pub fn np_sum(_: &mut Interpreter, args: Args) -> Result<Value, InterpreterError> {
  Ok(sum(&reduce(&args, "sum")?))
}

pub fn np_mean(_: &mut Interpreter, args: Args) -> Result<Value, InterpreterError> {
  Ok(mean(&reduce(&args, "mean")?))
}

pub fn np_min(_: &mut Interpreter, args: Args) -> Result<Value, InterpreterError> {
  min(&reduce(&args, "min")?)
}

pub fn np_max(_: &mut Interpreter, args: Args) -> Result<Value, InterpreterError> {
  max(&reduce(&args, "max")?)
}

pub fn np_std(_: &mut Interpreter, args: Args) -> Result<Value, InterpreterError> {
  Ok(std(&reduce(&args, "std")?))
}

pub fn np_cumsum(_: &mut Interpreter, args: Args) -> Result<Value, InterpreterError> {
  Ok(cumsum(&reduce(&args, "cumsum")?))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn display_follows_dtype() {
    let ints = NdArray::new(vec![0.0, 1.0, 2.0], DType::Int);
    assert_eq!(ints.to_string(), "[0 1 2]");
    assert_eq!(ints.repr(), "array([0, 1, 2])");
    let floats = NdArray::floats(vec![0.0, 0.5, 1.0]);
    assert_eq!(floats.to_string(), "[0. 0.5 1.]");
    assert_eq!(floats.repr(), "array([0.0, 0.5, 1.0])");
  }

  #[test]
  fn long_arrays_are_summarised() {
    let long = NdArray::new((0..2000).map(f64::from).collect(), DType::Int);
    assert_eq!(long.to_string(), "[0 1 2 ... 1997 1998 1999]");
  }

  #[test]
  fn mixed_lists_promote_to_float() {
    let array = NdArray::from_value(&Value::list(vec![
      Value::Int(1),
      Value::Float(2.5),
    ]))
    .unwrap();
    assert_eq!(array.dtype, DType::Float);
  }

  #[test]
  fn broadcasting_rejects_mismatched_lengths() {
    let a = NdArray::floats(vec![1.0, 2.0]).into_value();
    let b = NdArray::floats(vec![1.0, 2.0, 3.0]).into_value();
    let err = array_binary(BinaryOperator::Add, &a, &b).unwrap_err();
    assert_eq!(
      err.to_string(),
      "operands could not be broadcast together with shapes (2,) (3,)"
    );
  }

  #[test]
  fn integer_arithmetic_keeps_int_dtype() {
    let a = NdArray::new(vec![1.0, 2.0], DType::Int).into_value();
    let doubled = array_binary(BinaryOperator::Mul, &a, &Value::Int(2)).unwrap();
    assert_eq!(doubled.to_string(), "[2 4]");
    let halved = array_binary(BinaryOperator::Div, &a, &Value::Int(2)).unwrap();
    assert_eq!(halved.to_string(), "[0.5 1.]");
  }

  #[test]
  fn std_is_population_deviation() {
    let array = NdArray::floats(vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
    assert!(matches!(std(&array), Value::Float(x) if (x - 2.0).abs() < 1e-12));
  }
}
