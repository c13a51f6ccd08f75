use std::cell::RefCell;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::evaluator::Interpreter;
use crate::functions::numeric::{DType, NdArray};
use crate::value::{check_length, Args, Value};
use crate::{ExceptionKind, InterpreterError};

// None = use thread_rng(), Some = use the seeded generator
thread_local! {
    static SEEDED_RNG: RefCell<Option<StdRng>> = const { RefCell::new(None) };
}

/// Seed the generator behind `numpy.random` (also `EngineConfig::seed`).
pub fn seed_rng(seed: u64) {
  SEEDED_RNG.with(|rng| {
    *rng.borrow_mut() = Some(StdRng::seed_from_u64(seed));
  });
}

/// Execute a closure with the current RNG: the seeded one if set,
/// otherwise thread_rng().
pub fn with_rng<F, R>(f: F) -> R
where
  F: FnOnce(&mut dyn rand::RngCore) -> R,
{
  SEEDED_RNG.with(|cell| {
    let mut borrow = cell.borrow_mut();
    if let Some(ref mut seeded) = *borrow {
      f(seeded)
    } else {
      f(&mut rand::thread_rng())
    }
  })
}

/// Standard normal sample via the Box-Muller transform.
fn standard_normal(rng: &mut dyn rand::RngCore) -> f64 {
  let u1: f64 = 1.0 - rng.gen::<f64>();
  let u2: f64 = rng.gen();
  (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

fn size_arg(value: Option<&Value>) -> Result<Option<usize>, InterpreterError> {
  let value = match value {
    None | Some(Value::None) => return Ok(None),
    Some(Value::Tuple(items)) if items.len() == 1 => &items[0],
    Some(value) => value,
  };
  match value.as_int() {
    Some(n) if n >= 0 => Ok(Some(check_length(n as usize)?)),
    _ => Err(InterpreterError::raise(
      ExceptionKind::ValueError,
      format!("invalid size: {}", value.repr()),
    )),
  }
}

/// A scalar when `size` is absent, otherwise an array of samples.
fn sample(
  size: Option<usize>,
  dtype: DType,
  mut draw: impl FnMut(&mut dyn rand::RngCore) -> f64,
) -> Value {
  with_rng(|rng| match size {
    None => NdArray::new(Vec::new(), dtype).scalar(draw(rng)),
    Some(n) => {
      NdArray::new((0..n).map(|_| draw(&mut *rng)).collect(), dtype).into_value()
    }
  })
}

fn float_arg(value: Option<&Value>, default: f64) -> Result<f64, InterpreterError> {
  match value {
    None => Ok(default),
    Some(value) => value.as_f64().ok_or_else(|| {
      InterpreterError::raise(
        ExceptionKind::TypeError,
        format!("expected a number, got '{}'", value.type_name()),
      )
    }),
  }
}

pub fn seed(_: &mut Interpreter, args: Args) -> Result<Value, InterpreterError> {
  args.arity("seed", 1, 1)?;
  match args.positional[0].as_int() {
    Some(n) if n >= 0 => {
      seed_rng(n as u64);
      Ok(Value::None)
    }
    _ => Err(InterpreterError::raise(
      ExceptionKind::ValueError,
      "Seed must be between 0 and 2**32 - 1",
    )),
  }
}

pub fn rand(_: &mut Interpreter, args: Args) -> Result<Value, InterpreterError> {
  args.arity("rand", 0, 1)?;
  let size = size_arg(args.positional.first())?;
  Ok(sample(size, DType::Float, |rng| rng.gen::<f64>()))
}

pub fn randn(_: &mut Interpreter, args: Args) -> Result<Value, InterpreterError> {
  args.arity("randn", 0, 1)?;
  let size = size_arg(args.positional.first())?;
  Ok(sample(size, DType::Float, standard_normal))
}

pub fn normal(_: &mut Interpreter, args: Args) -> Result<Value, InterpreterError> {
  let loc = float_arg(args.get(0, "loc"), 0.0)?;
  let scale = float_arg(args.get(1, "scale"), 1.0)?;
  if scale < 0.0 {
    return Err(InterpreterError::raise(ExceptionKind::ValueError, "scale < 0"));
  }
  let size = size_arg(args.get(2, "size"))?;
  Ok(sample(size, DType::Float, |rng| {
    loc + scale * standard_normal(rng)
  }))
}

pub fn uniform(_: &mut Interpreter, args: Args) -> Result<Value, InterpreterError> {
  let low = float_arg(args.get(0, "low"), 0.0)?;
  let high = float_arg(args.get(1, "high"), 1.0)?;
  let size = size_arg(args.get(2, "size"))?;
  Ok(sample(size, DType::Float, |rng| {
    low + (high - low) * rng.gen::<f64>()
  }))
}

/// `randint(low, high=None, size=None)`: integers in `[low, high)`, or
/// `[0, low)` with a single bound.
pub fn randint(_: &mut Interpreter, args: Args) -> Result<Value, InterpreterError> {
  let first = args.required("randint", 0, "low")?;
  let bound = |value: &Value| {
    value.as_int().ok_or_else(|| {
      InterpreterError::raise(
        ExceptionKind::TypeError,
        format!("randint() expected an integer, got '{}'", value.type_name()),
      )
    })
  };
  let (low, high) = match args.get(1, "high") {
    Some(Value::None) | None => (0, bound(first)?),
    Some(high) => (bound(first)?, bound(high)?),
  };
  if low >= high {
    return Err(InterpreterError::raise(
      ExceptionKind::ValueError,
      "low >= high",
    ));
  }
  let size = size_arg(args.get(2, "size"))?;
  Ok(sample(size, DType::Int, |rng| rng.gen_range(low..high) as f64))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn draws(n: usize) -> Vec<u64> {
    with_rng(|rng| (0..n).map(|_| rng.next_u64()).collect())
  }

  #[test]
  fn seeding_makes_draws_repeatable() {
    seed_rng(7);
    let first = draws(4);
    seed_rng(7);
    assert_eq!(draws(4), first);
  }

  #[test]
  fn normal_samples_are_finite() {
    seed_rng(1);
    let samples: Vec<f64> = with_rng(|rng| (0..100).map(|_| standard_normal(rng)).collect());
    assert!(samples.iter().all(|x| x.is_finite()));
  }
}
