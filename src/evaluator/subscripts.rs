use crate::functions::builtins::{dict_insert, range_len};
use crate::functions::numeric::{DType, NdArray};
use crate::value::Value;
use crate::{ExceptionKind, InterpreterError};

/// Resolve a possibly negative index against `len`.
pub fn normalize_index(index: i64, len: usize) -> Option<usize> {
  let len = len as i64;
  let resolved = if index < 0 { index + len } else { index };
  (0..len).contains(&resolved).then_some(resolved as usize)
}

fn index_error(container: &str) -> InterpreterError {
  InterpreterError::raise(
    ExceptionKind::IndexError,
    format!("{container} index out of range"),
  )
}

fn integer_index(container: &str, index: &Value) -> Result<i64, InterpreterError> {
  index.as_int().ok_or_else(|| {
    InterpreterError::raise(
      ExceptionKind::TypeError,
      format!(
        "{container} indices must be integers or slices, not {}",
        index.type_name()
      ),
    )
  })
}

fn dict_lookup(items: &[(Value, Value)], key: &Value) -> Result<Value, InterpreterError> {
  key.check_hashable()?;
  items
    .iter()
    .find(|(k, _)| k.py_eq(key))
    .map(|(_, v)| v.clone())
    .ok_or_else(|| InterpreterError::raise(ExceptionKind::KeyError, key.repr()))
}

/// `value[index]`.
pub fn get_item(value: &Value, index: &Value) -> Result<Value, InterpreterError> {
  match value {
    Value::List(items) => {
      let items = items.borrow();
      let i = integer_index("list", index)?;
      normalize_index(i, items.len())
        .map(|i| items[i].clone())
        .ok_or_else(|| index_error("list"))
    }
    Value::Tuple(items) => {
      let i = integer_index("tuple", index)?;
      normalize_index(i, items.len())
        .map(|i| items[i].clone())
        .ok_or_else(|| index_error("tuple"))
    }
    Value::Str(s) => {
      let i = integer_index("string", index)?;
      let len = s.chars().count();
      normalize_index(i, len)
        .and_then(|i| s.chars().nth(i))
        .map(|c| Value::Str(c.to_string()))
        .ok_or_else(|| index_error("string"))
    }
    Value::Dict(items) => dict_lookup(&items.borrow(), index),
    Value::Range { start, stop, step } => {
      let i = integer_index("range object", index)?;
      let len = range_len(*start, *stop, *step) as usize;
      normalize_index(i, len)
        .map(|i| Value::Int(start + i as i64 * step))
        .ok_or_else(|| index_error("range object"))
    }
    Value::Array(array) => match index {
      Value::Array(mask) if mask.dtype == DType::Bool => {
        Ok(array.select(mask)?.into_value())
      }
      Value::Array(_) | Value::List(_) => {
        let positions = NdArray::from_value(index)?;
        let mut indices = Vec::with_capacity(positions.len());
        for &p in &positions.data {
          let resolved = normalize_index(p as i64, array.len()).ok_or_else(|| {
            InterpreterError::raise(
              ExceptionKind::IndexError,
              format!(
                "index {} is out of bounds for axis 0 with size {}",
                p as i64,
                array.len()
              ),
            )
          })?;
          indices.push(resolved);
        }
        Ok(array.take(&indices).into_value())
      }
      other => array.item(integer_index("array", other)?),
    },
    other => Err(InterpreterError::raise(
      ExceptionKind::TypeError,
      format!("'{}' object is not subscriptable", other.type_name()),
    )),
  }
}

/// Positions selected by `[lower:upper:step]` on a sequence of `len`.
pub fn slice_indices(
  len: usize,
  lower: Option<i64>,
  upper: Option<i64>,
  step: Option<i64>,
) -> Result<Vec<usize>, InterpreterError> {
  let step = step.unwrap_or(1);
  if step == 0 {
    return Err(InterpreterError::raise(
      ExceptionKind::ValueError,
      "slice step cannot be zero",
    ));
  }
  let len = len as i64;
  let clamp = |bound: i64, low: i64, high: i64| {
    let bound = if bound < 0 { bound + len } else { bound };
    bound.clamp(low, high)
  };
  let mut indices = Vec::new();
  if step > 0 {
    let start = lower.map_or(0, |b| clamp(b, 0, len));
    let stop = upper.map_or(len, |b| clamp(b, 0, len));
    let mut i = start;
    while i < stop {
      indices.push(i as usize);
      i += step;
    }
  } else {
    let start = lower.map_or(len - 1, |b| clamp(b, -1, len - 1));
    let stop = upper.map_or(-1, |b| clamp(b, -1, len - 1));
    let mut i = start;
    while i > stop {
      indices.push(i as usize);
      i += step;
    }
  }
  Ok(indices)
}

fn slice_bound(bound: Option<&Value>) -> Result<Option<i64>, InterpreterError> {
  match bound {
    None | Some(Value::None) => Ok(None),
    Some(value) => value.as_int().map(Some).ok_or_else(|| {
      InterpreterError::raise(
        ExceptionKind::TypeError,
        "slice indices must be integers or None",
      )
    }),
  }
}

/// `value[lower:upper:step]`.
pub fn get_slice(
  value: &Value,
  lower: Option<&Value>,
  upper: Option<&Value>,
  step: Option<&Value>,
) -> Result<Value, InterpreterError> {
  let (lower, upper, step) = (slice_bound(lower)?, slice_bound(upper)?, slice_bound(step)?);
  let pick = |items: &[Value]| -> Result<Vec<Value>, InterpreterError> {
    Ok(
      slice_indices(items.len(), lower, upper, step)?
        .into_iter()
        .map(|i| items[i].clone())
        .collect(),
    )
  };
  match value {
    Value::List(items) => Ok(Value::list(pick(&items.borrow())?)),
    Value::Tuple(items) => Ok(Value::tuple(pick(items)?)),
    Value::Range { .. } => Ok(Value::list(pick(&value.to_vec()?)?)),
    Value::Str(s) => {
      let chars: Vec<char> = s.chars().collect();
      Ok(Value::Str(
        slice_indices(chars.len(), lower, upper, step)?
          .into_iter()
          .map(|i| chars[i])
          .collect(),
      ))
    }
    Value::Array(array) => {
      let indices = slice_indices(array.len(), lower, upper, step)?;
      Ok(array.take(&indices).into_value())
    }
    other => Err(InterpreterError::raise(
      ExceptionKind::TypeError,
      format!("'{}' object is not subscriptable", other.type_name()),
    )),
  }
}

/// `container[index] = item`.
pub fn set_item(container: &Value, index: &Value, item: Value) -> Result<(), InterpreterError> {
  match container {
    Value::List(items) => {
      let i = integer_index("list", index)?;
      let mut items = items.borrow_mut();
      let at = normalize_index(i, items.len())
        .ok_or_else(|| index_error("list assignment"))?;
      items[at] = item;
      Ok(())
    }
    Value::Dict(items) => dict_insert(&mut items.borrow_mut(), index.clone(), item),
    other => Err(InterpreterError::raise(
      ExceptionKind::TypeError,
      format!(
        "'{}' object does not support item assignment",
        other.type_name()
      ),
    )),
  }
}

/// `container[lower:upper] = items`, for contiguous list slices.
pub fn set_slice(
  container: &Value,
  lower: Option<&Value>,
  upper: Option<&Value>,
  replacement: &Value,
) -> Result<(), InterpreterError> {
  let Value::List(items) = container else {
    return Err(InterpreterError::raise(
      ExceptionKind::TypeError,
      format!(
        "'{}' object does not support slice assignment",
        container.type_name()
      ),
    ));
  };
  let replacement = replacement.to_vec()?;
  let (lower, upper) = (slice_bound(lower)?, slice_bound(upper)?);
  let mut items = items.borrow_mut();
  let len = items.len() as i64;
  let clamp = |bound: i64| {
    let bound = if bound < 0 { bound + len } else { bound };
    bound.clamp(0, len) as usize
  };
  let start = lower.map_or(0, clamp);
  let stop = upper.map_or(len as usize, clamp).max(start);
  items.splice(start..stop, replacement);
  Ok(())
}

/// `del container[index]`.
pub fn del_item(container: &Value, index: &Value) -> Result<(), InterpreterError> {
  match container {
    Value::List(items) => {
      let i = integer_index("list", index)?;
      let mut items = items.borrow_mut();
      let at = normalize_index(i, items.len())
        .ok_or_else(|| index_error("list assignment"))?;
      items.remove(at);
      Ok(())
    }
    Value::Dict(items) => {
      index.check_hashable()?;
      let mut items = items.borrow_mut();
      let at = items
        .iter()
        .position(|(k, _)| k.py_eq(index))
        .ok_or_else(|| InterpreterError::raise(ExceptionKind::KeyError, index.repr()))?;
      items.remove(at);
      Ok(())
    }
    other => Err(InterpreterError::raise(
      ExceptionKind::TypeError,
      format!(
        "'{}' object doesn't support item deletion",
        other.type_name()
      ),
    )),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn slices_follow_sequence_semantics() {
    assert_eq!(slice_indices(5, Some(1), Some(4), None).unwrap(), vec![1, 2, 3]);
    assert_eq!(slice_indices(5, None, None, Some(-1)).unwrap(), vec![4, 3, 2, 1, 0]);
    assert_eq!(slice_indices(5, Some(-2), None, None).unwrap(), vec![3, 4]);
    assert_eq!(slice_indices(5, None, None, Some(2)).unwrap(), vec![0, 2, 4]);
    assert!(slice_indices(5, Some(10), None, None).unwrap().is_empty());
    assert!(slice_indices(5, None, None, Some(0)).is_err());
  }

  #[test]
  fn negative_indices_wrap_once() {
    assert_eq!(normalize_index(-1, 3), Some(2));
    assert_eq!(normalize_index(-4, 3), None);
    assert_eq!(normalize_index(3, 3), None);
  }

  #[test]
  fn missing_dict_key_reports_repr() {
    let dict = Value::dict(vec![(Value::str("a"), Value::Int(1))]);
    let err = get_item(&dict, &Value::str("b")).unwrap_err();
    assert_eq!(err.kind(), Some(ExceptionKind::KeyError));
    assert_eq!(err.to_string(), "'b'");
  }
}
