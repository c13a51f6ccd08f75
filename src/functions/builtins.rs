use std::cmp::Ordering;

use crate::capture;
use crate::evaluator::binary_ops::{binary, order};
use crate::evaluator::Interpreter;
use crate::functions::format::format_value;
use crate::functions::numeric;
use crate::syntax::BinaryOperator;
use crate::value::{Args, Namespace, StreamKind, Value};
use crate::{ExceptionKind, InterpreterError};

/// The namespace consulted after globals: builtin functions and the
/// exception classes.
pub fn namespace() -> Namespace {
  let ns = Namespace::new();
  let functions: [(&'static str, crate::value::NativeFn); 25] = [
    ("print", print),
    ("len", len),
    ("range", range),
    ("str", str_),
    ("repr", repr),
    ("int", int),
    ("float", float),
    ("bool", bool_),
    ("abs", abs),
    ("min", min),
    ("max", max),
    ("sum", sum),
    ("round", round),
    ("list", list),
    ("tuple", tuple),
    ("dict", dict),
    ("enumerate", enumerate),
    ("zip", zip),
    ("sorted", sorted),
    ("reversed", reversed),
    ("any", any),
    ("all", all),
    ("type", type_),
    ("format", format),
    ("divmod", divmod),
  ];
  for (name, func) in functions {
    ns.set(name, Value::native(name, func));
  }
  for kind in ExceptionKind::ALL {
    ns.set(kind.name(), Value::ExceptionType(kind));
  }
  ns
}

fn type_error(message: impl Into<String>) -> InterpreterError {
  InterpreterError::raise(ExceptionKind::TypeError, message)
}

fn value_error(message: impl Into<String>) -> InterpreterError {
  InterpreterError::raise(ExceptionKind::ValueError, message)
}

pub(crate) fn range_len(start: i64, stop: i64, step: i64) -> i64 {
  let (start, stop, step) = (start as i128, stop as i128, step as i128);
  let len = if step > 0 && start < stop {
    (stop - start + step - 1) / step
  } else if step < 0 && start > stop {
    (start - stop - step - 1) / -step
  } else {
    0
  };
  len as i64
}

/// Resolve a `key=` function and sort accordingly. Comparison errors are
/// reported after the sort finishes.
pub(crate) fn sort_values(
  interp: &mut Interpreter,
  items: Vec<Value>,
  key: Option<&Value>,
  reverse: bool,
) -> Result<Vec<Value>, InterpreterError> {
  let mut keyed = Vec::with_capacity(items.len());
  for item in items {
    let k = match key {
      Some(Value::None) | None => item.clone(),
      Some(func) => interp.call_value(func, Args::new(vec![item.clone()]))?,
    };
    keyed.push((k, item));
  }
  let mut failure = None;
  keyed.sort_by(|(a, _), (b, _)| match order(a, b) {
    Ok(ordering) if reverse => ordering.reverse(),
    Ok(ordering) => ordering,
    Err(err) => {
      failure.get_or_insert(err);
      Ordering::Equal
    }
  });
  match failure {
    Some(err) => Err(err),
    None => Ok(keyed.into_iter().map(|(_, item)| item).collect()),
  }
}

pub fn print(_: &mut Interpreter, args: Args) -> Result<Value, InterpreterError> {
  let text_arg = |name: &str, default: &str| match args.keyword(name) {
    None | Some(Value::None) => Ok(default.to_string()),
    Some(Value::Str(s)) => Ok(s.clone()),
    Some(other) => Err(type_error(format!(
      "{name} must be None or a string, not {}",
      other.type_name()
    ))),
  };
  let sep = text_arg("sep", " ")?;
  let end = text_arg("end", "\n")?;
  let stream = match args.keyword("file") {
    None | Some(Value::None) => StreamKind::Stdout,
    Some(Value::Stream(kind)) => *kind,
    Some(other) => {
      return Err(InterpreterError::raise(
        ExceptionKind::AttributeError,
        format!("'{}' object has no attribute 'write'", other.type_name()),
      ));
    }
  };
  let mut line = args
    .positional
    .iter()
    .map(|v| v.to_string())
    .collect::<Vec<_>>()
    .join(&sep);
  line.push_str(&end);
  capture::write(stream, &line);
  Ok(Value::None)
}

pub fn len(_: &mut Interpreter, args: Args) -> Result<Value, InterpreterError> {
  args.arity("len", 1, 1)?;
  let n = match &args.positional[0] {
    Value::Str(s) => s.chars().count() as i64,
    Value::List(items) => items.borrow().len() as i64,
    Value::Tuple(items) => items.len() as i64,
    Value::Dict(items) => items.borrow().len() as i64,
    Value::Range { start, stop, step } => range_len(*start, *stop, *step),
    Value::Array(array) => array.len() as i64,
    other => {
      return Err(type_error(format!(
        "object of type '{}' has no len()",
        other.type_name()
      )));
    }
  };
  Ok(Value::Int(n))
}

fn index_arg(value: &Value) -> Result<i64, InterpreterError> {
  value.as_int().ok_or_else(|| {
    type_error(format!(
      "'{}' object cannot be interpreted as an integer",
      value.type_name()
    ))
  })
}

pub fn range(_: &mut Interpreter, args: Args) -> Result<Value, InterpreterError> {
  args.reject_keywords("range")?;
  args.arity("range", 1, 3)?;
  let p = &args.positional;
  let (start, stop, step) = match p.len() {
    1 => (0, index_arg(&p[0])?, 1),
    2 => (index_arg(&p[0])?, index_arg(&p[1])?, 1),
    _ => (index_arg(&p[0])?, index_arg(&p[1])?, index_arg(&p[2])?),
  };
  if step == 0 {
    return Err(value_error("range() arg 3 must not be zero"));
  }
  Ok(Value::Range { start, stop, step })
}

pub fn str_(_: &mut Interpreter, args: Args) -> Result<Value, InterpreterError> {
  args.arity("str", 0, 1)?;
  Ok(Value::Str(
    args.positional.first().map(|v| v.to_string()).unwrap_or_default(),
  ))
}

pub fn repr(_: &mut Interpreter, args: Args) -> Result<Value, InterpreterError> {
  args.arity("repr", 1, 1)?;
  Ok(Value::Str(args.positional[0].repr()))
}

fn float_to_int(x: f64) -> Result<Value, InterpreterError> {
  if x.is_nan() {
    return Err(value_error("cannot convert float NaN to integer"));
  }
  if x.is_infinite() || x.abs() >= 9.2e18 {
    return Err(InterpreterError::raise(
      ExceptionKind::OverflowError,
      "cannot convert float infinity to integer",
    ));
  }
  Ok(Value::Int(x.trunc() as i64))
}

pub fn int(_: &mut Interpreter, args: Args) -> Result<Value, InterpreterError> {
  args.arity("int", 0, 2)?;
  let Some(value) = args.positional.first() else {
    return Ok(Value::Int(0));
  };
  let base = match args.get(1, "base") {
    Some(base) => index_arg(base)?,
    None => 10,
  };
  match value {
    Value::Int(n) => Ok(Value::Int(*n)),
    Value::Bool(b) => Ok(Value::Int(*b as i64)),
    Value::Float(x) => float_to_int(*x),
    Value::Str(s) => {
      let digits = s.trim().replace('_', "");
      let parsed = if (2..=36).contains(&base) {
        i64::from_str_radix(&digits, base as u32).ok()
      } else {
        None
      };
      parsed.map(Value::Int).ok_or_else(|| {
        value_error(format!(
          "invalid literal for int() with base {base}: {}",
          value.repr()
        ))
      })
    }
    Value::Array(array) if array.len() == 1 => float_to_int(array.data[0]),
    other => Err(type_error(format!(
      "int() argument must be a string or a number, not '{}'",
      other.type_name()
    ))),
  }
}

pub fn float(_: &mut Interpreter, args: Args) -> Result<Value, InterpreterError> {
  args.arity("float", 0, 1)?;
  let Some(value) = args.positional.first() else {
    return Ok(Value::Float(0.0));
  };
  match value {
    Value::Str(s) => {
      let text = s.trim().to_ascii_lowercase();
      let parsed = match text.as_str() {
        "inf" | "+inf" | "infinity" => Some(f64::INFINITY),
        "-inf" | "-infinity" => Some(f64::NEG_INFINITY),
        "nan" => Some(f64::NAN),
        other => other.parse::<f64>().ok(),
      };
      parsed.map(Value::Float).ok_or_else(|| {
        value_error(format!(
          "could not convert string to float: {}",
          value.repr()
        ))
      })
    }
    Value::Array(array) if array.len() == 1 => Ok(Value::Float(array.data[0])),
    other => other.as_f64().map(Value::Float).ok_or_else(|| {
      type_error(format!(
        "float() argument must be a string or a number, not '{}'",
        other.type_name()
      ))
    }),
  }
}

pub fn bool_(_: &mut Interpreter, args: Args) -> Result<Value, InterpreterError> {
  args.arity("bool", 0, 1)?;
  match args.positional.first() {
    Some(value) => Ok(Value::Bool(value.truthy()?)),
    None => Ok(Value::Bool(false)),
  }
}

pub fn abs(interp: &mut Interpreter, args: Args) -> Result<Value, InterpreterError> {
  args.arity("abs", 1, 1)?;
  if let Value::Array(_) = args.positional[0] {
    return numeric::np_abs(interp, args);
  }
  match &args.positional[0] {
    Value::Int(n) => n.checked_abs().map(Value::Int).ok_or_else(|| {
      InterpreterError::raise(ExceptionKind::OverflowError, "integer overflow")
    }),
    Value::Bool(b) => Ok(Value::Int(*b as i64)),
    Value::Float(x) => Ok(Value::Float(x.abs())),
    other => Err(type_error(format!(
      "bad operand type for abs(): '{}'",
      other.type_name()
    ))),
  }
}

/// Shared body of `min` and `max`.
fn extreme(
  interp: &mut Interpreter,
  args: Args,
  name: &str,
  wanted: Ordering,
) -> Result<Value, InterpreterError> {
  let items = match args.positional.as_slice() {
    [] => {
      return Err(type_error(format!(
        "{name} expected at least 1 argument, got 0"
      )));
    }
    [Value::Array(array)] => {
      return match wanted {
        Ordering::Less => numeric::min(array),
        _ => numeric::max(array),
      };
    }
    [single] => single.to_vec()?,
    many => many.to_vec(),
  };
  let key = args.keyword("key").cloned();
  let mut best: Option<(Value, Value)> = None;
  for item in items {
    let k = match &key {
      Some(Value::None) | None => item.clone(),
      Some(func) => interp.call_value(func, Args::new(vec![item.clone()]))?,
    };
    let replace = match &best {
      None => true,
      Some((best_key, _)) => order(&k, best_key)? == wanted,
    };
    if replace {
      best = Some((k, item));
    }
  }
  match (best, args.keyword("default")) {
    (Some((_, item)), _) => Ok(item),
    (None, Some(default)) => Ok(default.clone()),
    (None, None) => Err(value_error(format!(
      "{name}() arg is an empty sequence"
    ))),
  }
}

pub fn min(interp: &mut Interpreter, args: Args) -> Result<Value, InterpreterError> {
  extreme(interp, args, "min", Ordering::Less)
}

pub fn max(interp: &mut Interpreter, args: Args) -> Result<Value, InterpreterError> {
  extreme(interp, args, "max", Ordering::Greater)
}

pub fn sum(_: &mut Interpreter, args: Args) -> Result<Value, InterpreterError> {
  args.arity("sum", 1, 2)?;
  if let Value::Array(array) = &args.positional[0] {
    return Ok(numeric::sum(array));
  }
  let mut total = args.get(1, "start").cloned().unwrap_or(Value::Int(0));
  if let Value::Str(_) = total {
    return Err(type_error(
      "sum() can't sum strings [use ''.join(seq) instead]",
    ));
  }
  for item in args.positional[0].iter_values()? {
    total = binary(BinaryOperator::Add, &total, &item)?;
  }
  Ok(total)
}

pub fn round(_: &mut Interpreter, args: Args) -> Result<Value, InterpreterError> {
  args.arity("round", 1, 2)?;
  let digits = match args.get(1, "ndigits") {
    None | Some(Value::None) => None,
    Some(n) => Some(index_arg(n)?),
  };
  let value = &args.positional[0];
  match (value, digits) {
    (Value::Int(_) | Value::Bool(_), None) => {
      Ok(Value::Int(value.as_int().unwrap_or_default()))
    }
    (Value::Int(n), Some(d)) if d >= 0 => Ok(Value::Int(*n)),
    (value, digits) => {
      let x = value.as_f64().ok_or_else(|| {
        type_error(format!(
          "type {} doesn't define __round__ method",
          value.type_name()
        ))
      })?;
      match digits {
        None => float_to_int(x.round_ties_even()),
        Some(d) => {
          let scale = 10f64.powi(d as i32);
          let rounded = (x * scale).round_ties_even() / scale;
          if let Value::Int(_) = value {
            float_to_int(rounded)
          } else {
            Ok(Value::Float(rounded))
          }
        }
      }
    }
  }
}

pub fn list(_: &mut Interpreter, args: Args) -> Result<Value, InterpreterError> {
  args.arity("list", 0, 1)?;
  match args.positional.first() {
    Some(value) => Ok(Value::list(value.to_vec()?)),
    None => Ok(Value::list(Vec::new())),
  }
}

pub fn tuple(_: &mut Interpreter, args: Args) -> Result<Value, InterpreterError> {
  args.arity("tuple", 0, 1)?;
  match args.positional.first() {
    Some(Value::Tuple(items)) => Ok(Value::Tuple(items.clone())),
    Some(value) => Ok(Value::tuple(value.to_vec()?)),
    None => Ok(Value::tuple(Vec::new())),
  }
}

/// Insert or overwrite `key` in an ordered dict body.
pub(crate) fn dict_insert(
  items: &mut Vec<(Value, Value)>,
  key: Value,
  value: Value,
) -> Result<(), InterpreterError> {
  key.check_hashable()?;
  match items.iter_mut().find(|(k, _)| k.py_eq(&key)) {
    Some(slot) => slot.1 = value,
    None => items.push((key, value)),
  }
  Ok(())
}

pub fn dict(_: &mut Interpreter, args: Args) -> Result<Value, InterpreterError> {
  args.arity("dict", 0, 1)?;
  let mut items = Vec::new();
  match args.positional.first() {
    None => {}
    Some(Value::Dict(source)) => items = source.borrow().clone(),
    Some(iterable) => {
      for (i, pair) in iterable.iter_values()?.enumerate() {
        let pair = pair.to_vec()?;
        let [key, value] = <[Value; 2]>::try_from(pair).map_err(|pair| {
          value_error(format!(
            "dictionary update sequence element #{i} has length {}; 2 is required",
            pair.len()
          ))
        })?;
        dict_insert(&mut items, key, value)?;
      }
    }
  }
  for (name, value) in &args.keywords {
    dict_insert(&mut items, Value::str(name.as_str()), value.clone())?;
  }
  Ok(Value::dict(items))
}

pub fn enumerate(_: &mut Interpreter, args: Args) -> Result<Value, InterpreterError> {
  args.arity("enumerate", 1, 2)?;
  let start = match args.get(1, "start") {
    Some(start) => index_arg(start)?,
    None => 0,
  };
  let pairs = args.positional[0]
    .to_vec()?
    .into_iter()
    .zip(start..)
    .map(|(item, i)| Value::tuple(vec![Value::Int(i), item]))
    .collect();
  Ok(Value::list(pairs))
}

pub fn zip(_: &mut Interpreter, args: Args) -> Result<Value, InterpreterError> {
  args.reject_keywords("zip")?;
  let columns = args
    .positional
    .iter()
    .map(Value::to_vec)
    .collect::<Result<Vec<_>, _>>()?;
  let rows = columns.iter().map(Vec::len).min().unwrap_or(0);
  let zipped = (0..rows)
    .map(|i| Value::tuple(columns.iter().map(|c| c[i].clone()).collect()))
    .collect();
  Ok(Value::list(zipped))
}

pub fn sorted(interp: &mut Interpreter, args: Args) -> Result<Value, InterpreterError> {
  args.arity("sorted", 1, 1)?;
  let reverse = match args.keyword("reverse") {
    Some(value) => value.truthy()?,
    None => false,
  };
  let items = args.positional[0].to_vec()?;
  let sorted = sort_values(interp, items, args.keyword("key"), reverse)?;
  Ok(Value::list(sorted))
}

pub fn reversed(_: &mut Interpreter, args: Args) -> Result<Value, InterpreterError> {
  args.arity("reversed", 1, 1)?;
  if let Value::Dict(_) = args.positional[0] {
    return Err(type_error("'dict' object is not reversible"));
  }
  let mut items = args.positional[0].to_vec()?;
  items.reverse();
  Ok(Value::list(items))
}

pub fn any(_: &mut Interpreter, args: Args) -> Result<Value, InterpreterError> {
  args.arity("any", 1, 1)?;
  if let Value::Array(array) = &args.positional[0] {
    return Ok(numeric::any(array));
  }
  for item in args.positional[0].iter_values()? {
    if item.truthy()? {
      return Ok(Value::Bool(true));
    }
  }
  Ok(Value::Bool(false))
}

pub fn all(_: &mut Interpreter, args: Args) -> Result<Value, InterpreterError> {
  args.arity("all", 1, 1)?;
  if let Value::Array(array) = &args.positional[0] {
    return Ok(numeric::all(array));
  }
  for item in args.positional[0].iter_values()? {
    if !item.truthy()? {
      return Ok(Value::Bool(false));
    }
  }
  Ok(Value::Bool(true))
}

/// `type(x)` gives the class name in its printed form.
pub fn type_(_: &mut Interpreter, args: Args) -> Result<Value, InterpreterError> {
  args.arity("type", 1, 1)?;
  Ok(Value::Str(format!(
    "<class '{}'>",
    args.positional[0].type_name()
  )))
}

pub fn format(_: &mut Interpreter, args: Args) -> Result<Value, InterpreterError> {
  args.arity("format", 1, 2)?;
  let spec = match args.get(1, "format_spec") {
    Some(Value::Str(spec)) => spec.as_str(),
    Some(other) => {
      return Err(type_error(format!(
        "format() argument 2 must be str, not {}",
        other.type_name()
      )));
    }
    None => "",
  };
  Ok(Value::Str(format_value(&args.positional[0], spec)?))
}

pub fn divmod(_: &mut Interpreter, args: Args) -> Result<Value, InterpreterError> {
  args.arity("divmod", 2, 2)?;
  let (a, b) = (&args.positional[0], &args.positional[1]);
  Ok(Value::tuple(vec![
    binary(BinaryOperator::FloorDiv, a, b)?,
    binary(BinaryOperator::Mod, a, b)?,
  ]))
}
