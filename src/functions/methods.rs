//! Methods and attributes of builtin value types.

use crate::capture;
use crate::evaluator::Interpreter;
use crate::evaluator::subscripts::normalize_index;
use crate::functions::builtins::{dict_insert, sort_values};
use crate::functions::format::format_template;
use crate::functions::numeric::{self, NdArray};
use crate::functions::pyplot;
use crate::value::{check_length, Args, Value};
use crate::{ExceptionKind, InterpreterError};

const STR_METHODS: &[&str] = &[
  "upper",
  "lower",
  "strip",
  "lstrip",
  "rstrip",
  "split",
  "splitlines",
  "join",
  "replace",
  "startswith",
  "endswith",
  "find",
  "index",
  "count",
  "format",
  "title",
  "capitalize",
  "isdigit",
  "isalpha",
  "isspace",
  "zfill",
  "center",
  "ljust",
  "rjust",
];

const LIST_METHODS: &[&str] = &[
  "append", "extend", "pop", "insert", "remove", "index", "count", "sort",
  "reverse", "clear", "copy",
];

const DICT_METHODS: &[&str] = &[
  "keys",
  "values",
  "items",
  "get",
  "pop",
  "update",
  "setdefault",
  "clear",
  "copy",
];

const TUPLE_METHODS: &[&str] = &["index", "count"];

const ARRAY_METHODS: &[&str] = &[
  "sum", "mean", "min", "max", "std", "cumsum", "tolist", "copy", "any",
  "all",
];

const STREAM_METHODS: &[&str] = &["write", "flush"];

fn type_error(message: impl Into<String>) -> InterpreterError {
  InterpreterError::raise(ExceptionKind::TypeError, message)
}

fn value_error(message: impl Into<String>) -> InterpreterError {
  InterpreterError::raise(ExceptionKind::ValueError, message)
}

/// Whether `receiver.name(...)` names a method.
pub fn has_method(receiver: &Value, name: &str) -> bool {
  let table = match receiver {
    Value::Str(_) => STR_METHODS,
    Value::List(_) => LIST_METHODS,
    Value::Dict(_) => DICT_METHODS,
    Value::Tuple(_) => TUPLE_METHODS,
    Value::Array(_) => ARRAY_METHODS,
    Value::Figure(_) => pyplot::FIGURE_METHODS,
    Value::Axes(_) => pyplot::AXES_METHODS,
    Value::Stream(_) => STREAM_METHODS,
    _ => return false,
  };
  table.contains(&name)
}

/// Plain (non-method) attributes.
pub fn attribute(receiver: &Value, name: &str) -> Option<Value> {
  match (receiver, name) {
    (Value::Array(array), "shape") => {
      Some(Value::tuple(vec![Value::Int(array.len() as i64)]))
    }
    (Value::Array(array), "size") => Some(Value::Int(array.len() as i64)),
    (Value::Array(_), "ndim") => Some(Value::Int(1)),
    (Value::Array(array), "dtype") => Some(Value::str(array.dtype.name())),
    (Value::Range { start, .. }, "start") => Some(Value::Int(*start)),
    (Value::Range { stop, .. }, "stop") => Some(Value::Int(*stop)),
    (Value::Range { step, .. }, "step") => Some(Value::Int(*step)),
    (Value::Exception(exc), "args") => {
      Some(Value::tuple(vec![Value::str(exc.message.as_str())]))
    }
    (Value::Figure(figure), name) => pyplot::figure_attribute(figure, name),
    (Value::Function(func), "__name__") => Some(Value::str(func.def.name.as_str())),
    (Value::Native(native), "__name__") => Some(Value::str(native.name)),
    (Value::ExceptionType(kind), "__name__") => Some(Value::str(kind.name())),
    _ => None,
  }
}

pub fn call_method(
  interp: &mut Interpreter,
  receiver: &Value,
  name: &str,
  args: Args,
) -> Result<Value, InterpreterError> {
  match receiver {
    Value::Str(s) => str_method(s, name, args),
    Value::List(_) => list_method(interp, receiver, name, args),
    Value::Dict(_) => dict_method(receiver, name, args),
    Value::Tuple(items) => sequence_method(items, name, args, "tuple"),
    Value::Array(array) => array_method(array, name, args),
    Value::Figure(figure) => pyplot::figure_method(figure, name, args),
    Value::Axes(axes) => pyplot::axes_method(axes, name, args),
    Value::Stream(kind) => match name {
      "write" => {
        args.arity("write", 1, 1)?;
        let text = match &args.positional[0] {
          Value::Str(s) => s.clone(),
          other => {
            return Err(type_error(format!(
              "write() argument must be str, not {}",
              other.type_name()
            )));
          }
        };
        capture::write(*kind, &text);
        Ok(Value::Int(text.chars().count() as i64))
      }
      _ => Ok(Value::None),
    },
    other => Err(InterpreterError::raise(
      ExceptionKind::AttributeError,
      format!("'{}' object has no attribute '{name}'", other.type_name()),
    )),
  }
}

fn str_arg<'a>(
  args: &'a Args,
  index: usize,
  name: &str,
  func: &str,
) -> Result<Option<&'a str>, InterpreterError> {
  match args.get(index, name) {
    None | Some(Value::None) => Ok(None),
    Some(Value::Str(s)) => Ok(Some(s.as_str())),
    Some(other) => Err(type_error(format!(
      "{func}() argument must be str or None, not {}",
      other.type_name()
    ))),
  }
}

fn int_arg(args: &Args, index: usize, name: &str) -> Result<Option<i64>, InterpreterError> {
  match args.get(index, name) {
    None | Some(Value::None) => Ok(None),
    Some(value) => value.as_int().map(Some).ok_or_else(|| {
      type_error(format!(
        "'{}' object cannot be interpreted as an integer",
        value.type_name()
      ))
    }),
  }
}

fn padded(s: &str, width: usize, fill: char, align: char) -> String {
  let len = s.chars().count();
  if width <= len {
    return s.to_string();
  }
  let gap = width - len;
  let run = |n: usize| std::iter::repeat(fill).take(n).collect::<String>();
  match align {
    '<' => format!("{s}{}", run(gap)),
    '>' => format!("{}{s}", run(gap)),
    _ => {
      let left = gap / 2 + (gap & width & 1);
      format!("{}{s}{}", run(left), run(gap - left))
    }
  }
}

fn fill_char(args: &Args) -> Result<char, InterpreterError> {
  match args.get(1, "fillchar") {
    None => Ok(' '),
    Some(Value::Str(s)) if s.chars().count() == 1 => Ok(s.chars().next().unwrap_or(' ')),
    Some(_) => Err(type_error(
      "The fill character must be exactly one character long",
    )),
  }
}

fn str_method(s: &str, name: &str, args: Args) -> Result<Value, InterpreterError> {
  let result = match name {
    "upper" => Value::str(s.to_uppercase()),
    "lower" => Value::str(s.to_lowercase()),
    "strip" | "lstrip" | "rstrip" => {
      let chars: Option<Vec<char>> =
        str_arg(&args, 0, "chars", name)?.map(|c| c.chars().collect());
      let matches = |c: char| match &chars {
        Some(set) => set.contains(&c),
        None => c.is_whitespace(),
      };
      Value::str(match name {
        "strip" => s.trim_matches(matches),
        "lstrip" => s.trim_start_matches(matches),
        _ => s.trim_end_matches(matches),
      })
    }
    "split" => {
      let limit = int_arg(&args, 1, "maxsplit")?.filter(|n| *n >= 0);
      let parts: Vec<String> = match str_arg(&args, 0, "sep", "split")? {
        Some("") => return Err(value_error("empty separator")),
        Some(sep) => match limit {
          Some(n) => s.splitn(n as usize + 1, sep).map(str::to_string).collect(),
          None => s.split(sep).map(str::to_string).collect(),
        },
        None => {
          let mut parts: Vec<String> = Vec::new();
          let mut rest = s.trim_start();
          while !rest.is_empty() {
            if limit.is_some_and(|n| parts.len() as i64 == n) {
              parts.push(rest.trim_end().to_string());
              break;
            }
            let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
            parts.push(rest[..end].to_string());
            rest = rest[end..].trim_start();
          }
          parts
        }
      };
      Value::list(parts.into_iter().map(Value::Str).collect())
    }
    "splitlines" => Value::list(s.lines().map(Value::str).collect()),
    "join" => {
      args.arity("join", 1, 1)?;
      let mut pieces = Vec::new();
      for (i, item) in args.positional[0].iter_values()?.enumerate() {
        match item {
          Value::Str(piece) => pieces.push(piece),
          other => {
            return Err(type_error(format!(
              "sequence item {i}: expected str instance, {} found",
              other.type_name()
            )));
          }
        }
      }
      Value::str(pieces.join(s))
    }
    "replace" => {
      let old = str_arg(&args, 0, "old", "replace")?.unwrap_or_default();
      let new = str_arg(&args, 1, "new", "replace")?.unwrap_or_default();
      match int_arg(&args, 2, "count")? {
        Some(n) if n >= 0 => Value::str(s.replacen(old, new, n as usize)),
        _ => Value::str(s.replace(old, new)),
      }
    }
    "startswith" | "endswith" => {
      let candidates: Vec<String> = match args.positional.first() {
        Some(Value::Str(p)) => vec![p.clone()],
        Some(Value::Tuple(items)) => items.iter().map(|v| v.to_string()).collect(),
        _ => {
          return Err(type_error(format!(
            "{name} first arg must be str or a tuple of str"
          )));
        }
      };
      let hit = candidates.iter().any(|p| {
        if name == "startswith" {
          s.starts_with(p.as_str())
        } else {
          s.ends_with(p.as_str())
        }
      });
      Value::Bool(hit)
    }
    "find" | "index" => {
      let needle = str_arg(&args, 0, "sub", name)?.unwrap_or_default();
      match s.find(needle) {
        Some(byte) => Value::Int(s[..byte].chars().count() as i64),
        None if name == "find" => Value::Int(-1),
        None => return Err(value_error("substring not found")),
      }
    }
    "count" => {
      let needle = str_arg(&args, 0, "sub", "count")?.unwrap_or_default();
      let n = if needle.is_empty() {
        s.chars().count() + 1
      } else {
        s.matches(needle).count()
      };
      Value::Int(n as i64)
    }
    "format" => Value::str(format_template(s, &args.positional, &args.keywords)?),
    "title" => {
      let mut out = String::with_capacity(s.len());
      let mut previous_cased = false;
      for c in s.chars() {
        if previous_cased {
          out.extend(c.to_lowercase());
        } else {
          out.extend(c.to_uppercase());
        }
        previous_cased = c.is_alphabetic();
      }
      Value::str(out)
    }
    "capitalize" => {
      let mut chars = s.chars();
      Value::str(match chars.next() {
        Some(first) => {
          first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
        }
        None => String::new(),
      })
    }
    "isdigit" => Value::Bool(!s.is_empty() && s.chars().all(|c| c.is_ascii_digit())),
    "isalpha" => Value::Bool(!s.is_empty() && s.chars().all(char::is_alphabetic)),
    "isspace" => Value::Bool(!s.is_empty() && s.chars().all(char::is_whitespace)),
    "zfill" => {
      let width = check_length(int_arg(&args, 0, "width")?.unwrap_or(0).max(0) as usize)?;
      let (sign, digits) = match s.strip_prefix(['-', '+']) {
        Some(rest) => (&s[..1], rest),
        None => ("", s),
      };
      let body = padded(digits, width.saturating_sub(sign.len()), '0', '>');
      Value::str(format!("{sign}{body}"))
    }
    "center" | "ljust" | "rjust" => {
      let width = check_length(int_arg(&args, 0, "width")?.unwrap_or(0).max(0) as usize)?;
      let align = match name {
        "ljust" => '<',
        "rjust" => '>',
        _ => '^',
      };
      Value::str(padded(s, width, fill_char(&args)?, align))
    }
    other => {
      return Err(InterpreterError::raise(
        ExceptionKind::AttributeError,
        format!("'str' object has no attribute '{other}'"),
      ));
    }
  };
  Ok(result)
}

/// `index` and `count`, shared by lists and tuples.
fn sequence_method(
  items: &[Value],
  name: &str,
  args: Args,
  type_name: &str,
) -> Result<Value, InterpreterError> {
  args.arity(name, 1, 1)?;
  let needle = &args.positional[0];
  match name {
    "index" => items
      .iter()
      .position(|item| item.py_eq(needle))
      .map(|i| Value::Int(i as i64))
      .ok_or_else(|| value_error(format!("{} is not in {type_name}", needle.repr()))),
    "count" => Ok(Value::Int(
      items.iter().filter(|item| item.py_eq(needle)).count() as i64,
    )),
    other => Err(InterpreterError::raise(
      ExceptionKind::AttributeError,
      format!("'{type_name}' object has no attribute '{other}'"),
    )),
  }
}

fn list_method(
  interp: &mut Interpreter,
  receiver: &Value,
  name: &str,
  args: Args,
) -> Result<Value, InterpreterError> {
  let Value::List(list) = receiver else {
    return Err(type_error("expected a list"));
  };
  match name {
    "append" => {
      args.arity("append", 1, 1)?;
      list.borrow_mut().push(args.positional[0].clone());
      Ok(Value::None)
    }
    "extend" => {
      args.arity("extend", 1, 1)?;
      let items = args.positional[0].to_vec()?;
      list.borrow_mut().extend(items);
      Ok(Value::None)
    }
    "insert" => {
      args.arity("insert", 2, 2)?;
      let index = int_arg(&args, 0, "index")?.unwrap_or(0);
      let mut items = list.borrow_mut();
      let len = items.len() as i64;
      let at = if index < 0 { (index + len).max(0) } else { index.min(len) };
      items.insert(at as usize, args.positional[1].clone());
      Ok(Value::None)
    }
    "pop" => {
      args.arity("pop", 0, 1)?;
      let mut items = list.borrow_mut();
      if items.is_empty() {
        return Err(InterpreterError::raise(
          ExceptionKind::IndexError,
          "pop from empty list",
        ));
      }
      let index = int_arg(&args, 0, "index")?.unwrap_or(-1);
      let at = normalize_index(index, items.len()).ok_or_else(|| {
        InterpreterError::raise(ExceptionKind::IndexError, "pop index out of range")
      })?;
      Ok(items.remove(at))
    }
    "remove" => {
      args.arity("remove", 1, 1)?;
      let mut items = list.borrow_mut();
      let position = items
        .iter()
        .position(|item| item.py_eq(&args.positional[0]))
        .ok_or_else(|| value_error("list.remove(x): x not in list"))?;
      items.remove(position);
      Ok(Value::None)
    }
    "index" | "count" => {
      let snapshot = list.borrow().clone();
      sequence_method(&snapshot, name, args, "list")
    }
    "sort" => {
      args.arity("sort", 0, 0)?;
      let reverse = match args.keyword("reverse") {
        Some(value) => value.truthy()?,
        None => false,
      };
      let items = std::mem::take(&mut *list.borrow_mut());
      let sorted = sort_values(interp, items.clone(), args.keyword("key"), reverse);
      match sorted {
        Ok(sorted) => *list.borrow_mut() = sorted,
        Err(err) => {
          *list.borrow_mut() = items;
          return Err(err);
        }
      }
      Ok(Value::None)
    }
    "reverse" => {
      list.borrow_mut().reverse();
      Ok(Value::None)
    }
    "clear" => {
      list.borrow_mut().clear();
      Ok(Value::None)
    }
    "copy" => Ok(Value::list(list.borrow().clone())),
    other => Err(InterpreterError::raise(
      ExceptionKind::AttributeError,
      format!("'list' object has no attribute '{other}'"),
    )),
  }
}

fn dict_method(receiver: &Value, name: &str, args: Args) -> Result<Value, InterpreterError> {
  let Value::Dict(dict) = receiver else {
    return Err(type_error("expected a dict"));
  };
  let lookup = |key: &Value| {
    dict
      .borrow()
      .iter()
      .find(|(k, _)| k.py_eq(key))
      .map(|(_, v)| v.clone())
  };
  match name {
    "keys" => Ok(Value::list(dict.borrow().iter().map(|(k, _)| k.clone()).collect())),
    "values" => Ok(Value::list(dict.borrow().iter().map(|(_, v)| v.clone()).collect())),
    "items" => Ok(Value::list(
      dict
        .borrow()
        .iter()
        .map(|(k, v)| Value::tuple(vec![k.clone(), v.clone()]))
        .collect(),
    )),
    "get" => {
      args.arity("get", 1, 2)?;
      let key = &args.positional[0];
      key.check_hashable()?;
      Ok(lookup(key).unwrap_or_else(|| args.positional.get(1).cloned().unwrap_or(Value::None)))
    }
    "pop" => {
      args.arity("pop", 1, 2)?;
      let key = &args.positional[0];
      let mut items = dict.borrow_mut();
      match items.iter().position(|(k, _)| k.py_eq(key)) {
        Some(i) => Ok(items.remove(i).1),
        None => args.positional.get(1).cloned().ok_or_else(|| {
          InterpreterError::raise(ExceptionKind::KeyError, key.repr())
        }),
      }
    }
    "setdefault" => {
      args.arity("setdefault", 1, 2)?;
      let key = &args.positional[0];
      if let Some(existing) = lookup(key) {
        return Ok(existing);
      }
      let default = args.positional.get(1).cloned().unwrap_or(Value::None);
      dict_insert(&mut dict.borrow_mut(), key.clone(), default.clone())?;
      Ok(default)
    }
    "update" => {
      args.arity("update", 0, 1)?;
      let incoming: Vec<(Value, Value)> = match args.positional.first() {
        Some(Value::Dict(other)) => other.borrow().clone(),
        Some(other) => {
          let mut pairs = Vec::new();
          for pair in other.iter_values()? {
            match pair.to_vec()?.as_slice() {
              [k, v] => pairs.push((k.clone(), v.clone())),
              _ => return Err(value_error("dictionary update sequence element has wrong length")),
            }
          }
          pairs
        }
        None => Vec::new(),
      };
      let mut items = dict.borrow_mut();
      for (k, v) in incoming {
        dict_insert(&mut items, k, v)?;
      }
      for (k, v) in &args.keywords {
        dict_insert(&mut items, Value::str(k.as_str()), v.clone())?;
      }
      Ok(Value::None)
    }
    "clear" => {
      dict.borrow_mut().clear();
      Ok(Value::None)
    }
    "copy" => Ok(Value::dict(dict.borrow().clone())),
    other => Err(InterpreterError::raise(
      ExceptionKind::AttributeError,
      format!("'dict' object has no attribute '{other}'"),
    )),
  }
}

fn array_method(array: &NdArray, name: &str, args: Args) -> Result<Value, InterpreterError> {
  args.arity(name, 0, 0)?;
  match name {
    "sum" => Ok(numeric::sum(array)),
    "mean" => Ok(numeric::mean(array)),
    "min" => numeric::min(array),
    "max" => numeric::max(array),
    "std" => Ok(numeric::std(array)),
    "cumsum" => Ok(numeric::cumsum(array)),
    "any" => Ok(numeric::any(array)),
    "all" => Ok(numeric::all(array)),
    "tolist" => Ok(Value::list(array.scalars())),
    "copy" => Ok(array.clone().into_value()),
    other => Err(InterpreterError::raise(
      ExceptionKind::AttributeError,
      format!("'numpy.ndarray' object has no attribute '{other}'"),
    )),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn call(s: &str, name: &str, args: Vec<Value>) -> Value {
    str_method(s, name, Args::new(args)).unwrap()
  }

  #[test]
  fn whitespace_split_collapses_runs() {
    let parts = call("  a  b\tc ", "split", vec![]);
    assert_eq!(parts.repr(), "['a', 'b', 'c']");
    let parts = call("a,b,,c", "split", vec![Value::str(",")]);
    assert_eq!(parts.repr(), "['a', 'b', '', 'c']");
  }

  #[test]
  fn padding_helpers() {
    assert_eq!(call("ab", "center", vec![Value::Int(6)]).to_string(), "  ab  ");
    assert_eq!(call("-42", "zfill", vec![Value::Int(5)]).to_string(), "-0042");
    assert_eq!(call("7", "rjust", vec![Value::Int(3), Value::str("*")]).to_string(), "**7");
  }

  #[test]
  fn title_case() {
    assert_eq!(call("hello wORLD", "title", vec![]).to_string(), "Hello World");
  }

  #[test]
  fn find_counts_characters_not_bytes() {
    assert_eq!(call("héllo", "find", vec![Value::str("l")]).to_string(), "2");
  }
}
