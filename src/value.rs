use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::evaluator::Interpreter;
use crate::figures::{AxesHandle, FigureHandle};
use crate::functions::builtins::range_len;
use crate::functions::numeric::NdArray;
use crate::modules::Module;
use crate::syntax::FunctionDef;
use crate::{Exception, ExceptionKind, InterpreterError};

/// Most elements a single operation may build into one list, tuple,
/// string or array.
pub const MAX_LENGTH: usize = 1 << 24;

/// `Ok(len)` unless a container of `len` elements would be too large.
pub fn check_length(len: usize) -> Result<usize, InterpreterError> {
  if len > MAX_LENGTH {
    return Err(InterpreterError::raise(
      ExceptionKind::MemoryError,
      format!("cannot build a sequence of {len} elements"),
    ));
  }
  Ok(len)
}

/// Length of `count` copies of something `unit` long.
pub fn repeated_length(
  unit: usize,
  count: usize,
) -> Result<usize, InterpreterError> {
  check_length(unit.checked_mul(count).unwrap_or(usize::MAX))
}

/// A shared, mutable mapping of names to values: module globals and
/// function locals.
#[derive(Clone, Default)]
pub struct Namespace(Rc<RefCell<HashMap<String, Value>>>);

impl Namespace {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn get(&self, name: &str) -> Option<Value> {
    self.0.borrow().get(name).cloned()
  }

  pub fn set(&self, name: impl Into<String>, value: Value) {
    self.0.borrow_mut().insert(name.into(), value);
  }

  pub fn remove(&self, name: &str) -> Option<Value> {
    self.0.borrow_mut().remove(name)
  }

  pub fn contains(&self, name: &str) -> bool {
    self.0.borrow().contains_key(name)
  }

  pub fn names(&self) -> Vec<String> {
    let mut names: Vec<String> = self.0.borrow().keys().cloned().collect();
    names.sort();
    names
  }

  pub fn ptr_eq(&self, other: &Namespace) -> bool {
    Rc::ptr_eq(&self.0, &other.0)
  }
}

/// Lists the bound names only; values may refer back to the namespace.
impl fmt::Debug for Namespace {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_tuple("Namespace").field(&self.names()).finish()
  }
}

/// Call arguments for native functions and methods.
#[derive(Default)]
pub struct Args {
  pub positional: Vec<Value>,
  pub keywords: Vec<(String, Value)>,
}

impl Args {
  pub fn new(positional: Vec<Value>) -> Self {
    Args {
      positional,
      keywords: Vec::new(),
    }
  }

  pub fn len(&self) -> usize {
    self.positional.len()
  }

  pub fn is_empty(&self) -> bool {
    self.positional.is_empty() && self.keywords.is_empty()
  }

  pub fn arity(
    &self,
    func: &str,
    min: usize,
    max: usize,
  ) -> Result<(), InterpreterError> {
    let given = self.positional.len();
    if given >= min && given <= max {
      return Ok(());
    }
    let expected = if min == max {
      format!("{min}")
    } else {
      format!("from {min} to {max}")
    };
    Err(InterpreterError::raise(
      ExceptionKind::TypeError,
      format!(
        "{func}() takes {expected} positional argument{} but {given} {} given",
        if max == 1 { "" } else { "s" },
        if given == 1 { "was" } else { "were" }
      ),
    ))
  }

  /// Positional argument `index`, or the keyword argument `name`.
  pub fn get(&self, index: usize, name: &str) -> Option<&Value> {
    self.positional.get(index).or_else(|| self.keyword(name))
  }

  pub fn keyword(&self, name: &str) -> Option<&Value> {
    self
      .keywords
      .iter()
      .find(|(key, _)| key == name)
      .map(|(_, value)| value)
  }

  pub fn required(
    &self,
    func: &str,
    index: usize,
    name: &str,
  ) -> Result<&Value, InterpreterError> {
    self.get(index, name).ok_or_else(|| {
      InterpreterError::raise(
        ExceptionKind::TypeError,
        format!("{func}() missing required argument: '{name}'"),
      )
    })
  }

  pub fn reject_keywords(&self, func: &str) -> Result<(), InterpreterError> {
    match self.keywords.first() {
      Some((name, _)) => Err(InterpreterError::raise(
        ExceptionKind::TypeError,
        format!("{func}() got an unexpected keyword argument '{name}'"),
      )),
      None => Ok(()),
    }
  }
}

pub type NativeFn =
  fn(&mut Interpreter, Args) -> Result<Value, InterpreterError>;

#[derive(Clone)]
pub struct NativeFunction {
  pub name: &'static str,
  pub func: NativeFn,
}

/// A user function: its definition plus the scopes it closes over.
pub struct Function {
  pub def: Rc<FunctionDef>,
  pub defaults: Vec<Option<Value>>,
  pub globals: Namespace,
  pub enclosing: Vec<Namespace>,
}

/// A method looked up on a value, waiting to be called.
pub struct BoundMethod {
  pub receiver: Value,
  pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
  Stdout,
  Stderr,
}

#[derive(Clone)]
pub enum Value {
  None,
  Bool(bool),
  Int(i64),
  Float(f64),
  Str(String),
  List(Rc<RefCell<Vec<Value>>>),
  Tuple(Rc<Vec<Value>>),
  Dict(Rc<RefCell<Vec<(Value, Value)>>>),
  Range { start: i64, stop: i64, step: i64 },
  Array(Rc<NdArray>),
  Function(Rc<Function>),
  Native(NativeFunction),
  Method(Rc<BoundMethod>),
  Module(Rc<Module>),
  Figure(FigureHandle),
  Axes(AxesHandle),
  Stream(StreamKind),
  ExceptionType(ExceptionKind),
  Exception(Rc<Exception>),
}

pub enum ValueIter {
  Items(std::vec::IntoIter<Value>),
  Range { next: i64, stop: i64, step: i64 },
}

impl Iterator for ValueIter {
  type Item = Value;

  fn next(&mut self) -> Option<Value> {
    match self {
      ValueIter::Items(items) => items.next(),
      ValueIter::Range { next, stop, step } => {
        let more = if *step > 0 { *next < *stop } else { *next > *stop };
        if !more {
          return None;
        }
        let current = *next;
        *next = next.saturating_add(*step);
        if *next == current {
          *next = *stop;
        }
        Some(Value::Int(current))
      }
    }
  }
}

impl Value {
  pub fn str(text: impl Into<String>) -> Value {
    Value::Str(text.into())
  }

  pub fn list(items: Vec<Value>) -> Value {
    Value::List(Rc::new(RefCell::new(items)))
  }

  pub fn tuple(items: Vec<Value>) -> Value {
    Value::Tuple(Rc::new(items))
  }

  pub fn dict(items: Vec<(Value, Value)>) -> Value {
    Value::Dict(Rc::new(RefCell::new(items)))
  }

  pub fn native(name: &'static str, func: NativeFn) -> Value {
    Value::Native(NativeFunction { name, func })
  }

  pub fn type_name(&self) -> &'static str {
    match self {
      Value::None => "NoneType",
      Value::Bool(_) => "bool",
      Value::Int(_) => "int",
      Value::Float(_) => "float",
      Value::Str(_) => "str",
      Value::List(_) => "list",
      Value::Tuple(_) => "tuple",
      Value::Dict(_) => "dict",
      Value::Range { .. } => "range",
      Value::Array(_) => "numpy.ndarray",
      Value::Function(_) => "function",
      Value::Native(_) => "builtin_function_or_method",
      Value::Method(_) => "method",
      Value::Module(_) => "module",
      Value::Figure(_) => "Figure",
      Value::Axes(_) => "Axes",
      Value::Stream(_) => "TextIOWrapper",
      Value::ExceptionType(_) => "type",
      Value::Exception(exc) => exc.kind.name(),
    }
  }

  pub fn as_int(&self) -> Option<i64> {
    match self {
      Value::Int(n) => Some(*n),
      Value::Bool(b) => Some(*b as i64),
      _ => None,
    }
  }

  pub fn as_f64(&self) -> Option<f64> {
    match self {
      Value::Int(n) => Some(*n as f64),
      Value::Float(f) => Some(*f),
      Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
      _ => None,
    }
  }

  pub fn as_str(&self) -> Option<&str> {
    match self {
      Value::Str(s) => Some(s),
      _ => None,
    }
  }

  pub fn truthy(&self) -> Result<bool, InterpreterError> {
    Ok(match self {
      Value::None => false,
      Value::Bool(b) => *b,
      Value::Int(n) => *n != 0,
      Value::Float(f) => *f != 0.0,
      Value::Str(s) => !s.is_empty(),
      Value::List(items) => !items.borrow().is_empty(),
      Value::Tuple(items) => !items.is_empty(),
      Value::Dict(items) => !items.borrow().is_empty(),
      Value::Range { .. } => self.iter_values()?.next().is_some(),
      Value::Array(array) => array.truthy()?,
      _ => true,
    })
  }

  pub fn iter_values(&self) -> Result<ValueIter, InterpreterError> {
    let items = match self {
      Value::Range { start, stop, step } => {
        return Ok(ValueIter::Range {
          next: *start,
          stop: *stop,
          step: *step,
        });
      }
      Value::List(items) => items.borrow().clone(),
      Value::Tuple(items) => items.as_ref().clone(),
      Value::Str(s) => s.chars().map(|c| Value::Str(c.to_string())).collect(),
      Value::Dict(items) => {
        items.borrow().iter().map(|(k, _)| k.clone()).collect()
      }
      Value::Array(array) => array.scalars(),
      other => {
        return Err(InterpreterError::raise(
          ExceptionKind::TypeError,
          format!("'{}' object is not iterable", other.type_name()),
        ));
      }
    };
    Ok(ValueIter::Items(items.into_iter()))
  }

  pub fn to_vec(&self) -> Result<Vec<Value>, InterpreterError> {
    if let Value::Range { start, stop, step } = self {
      check_length(range_len(*start, *stop, *step).max(0) as usize)?;
    }
    Ok(self.iter_values()?.collect())
  }

  /// Equality as used by `==`, `in` and dict lookup.
  pub fn py_eq(&self, other: &Value) -> bool {
    match (self, other) {
      (Value::None, Value::None) => true,
      (Value::Str(a), Value::Str(b)) => a == b,
      (Value::List(a), Value::List(b)) => {
        Rc::ptr_eq(a, b)
          || compare_once(pair(a, b), || seq_eq(&a.borrow(), &b.borrow()))
      }
      (Value::Tuple(a), Value::Tuple(b)) => seq_eq(a, b),
      (Value::Dict(a), Value::Dict(b)) => {
        Rc::ptr_eq(a, b)
          || compare_once(pair(a, b), || {
            let (a, b) = (a.borrow(), b.borrow());
            a.len() == b.len()
              && a.iter().all(|(key, value)| {
                b.iter().any(|(k, v)| k.py_eq(key) && v.py_eq(value))
              })
          })
      }
      (
        Value::Range { start, stop, step },
        Value::Range {
          start: s2,
          stop: e2,
          step: t2,
        },
      ) => (start, stop, step) == (s2, e2, t2),
      (Value::ExceptionType(a), Value::ExceptionType(b)) => a == b,
      (Value::Stream(a), Value::Stream(b)) => a == b,
      (Value::Exception(a), Value::Exception(b)) => Rc::ptr_eq(a, b),
      _ => match (self.as_f64(), other.as_f64()) {
        (Some(a), Some(b)) if self.is_number() && other.is_number() => a == b,
        _ => self.is(other),
      },
    }
  }

  fn is_number(&self) -> bool {
    matches!(self, Value::Int(_) | Value::Float(_) | Value::Bool(_))
  }

  /// Identity as used by `is`.
  pub fn is(&self, other: &Value) -> bool {
    match (self, other) {
      (Value::None, Value::None) => true,
      (Value::Bool(a), Value::Bool(b)) => a == b,
      (Value::Int(a), Value::Int(b)) => a == b,
      (Value::List(a), Value::List(b)) => Rc::ptr_eq(a, b),
      (Value::Tuple(a), Value::Tuple(b)) => Rc::ptr_eq(a, b),
      (Value::Dict(a), Value::Dict(b)) => Rc::ptr_eq(a, b),
      (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
      (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
      (Value::Native(a), Value::Native(b)) => a.name == b.name,
      (Value::Module(a), Value::Module(b)) => Rc::ptr_eq(a, b),
      (Value::Figure(a), Value::Figure(b)) => a.ptr_eq(b),
      (Value::Axes(a), Value::Axes(b)) => a == b,
      (Value::Stream(a), Value::Stream(b)) => a == b,
      (Value::ExceptionType(a), Value::ExceptionType(b)) => a == b,
      (Value::Exception(a), Value::Exception(b)) => Rc::ptr_eq(a, b),
      _ => false,
    }
  }

  /// Dict keys must be immutable values.
  pub fn check_hashable(&self) -> Result<(), InterpreterError> {
    match self {
      Value::List(_) | Value::Dict(_) | Value::Array(_) => {
        Err(InterpreterError::raise(
          ExceptionKind::TypeError,
          format!("unhashable type: '{}'", self.type_name()),
        ))
      }
      Value::Tuple(items) => items.iter().try_for_each(Value::check_hashable),
      _ => Ok(()),
    }
  }

  pub fn repr(&self) -> String {
    match self {
      Value::None => "None".to_string(),
      Value::Bool(true) => "True".to_string(),
      Value::Bool(false) => "False".to_string(),
      Value::Int(n) => n.to_string(),
      Value::Float(f) => format_float(*f),
      Value::Str(s) => quote_str(s),
      Value::List(items) => {
        render_once(Rc::as_ptr(items) as usize, "[...]", || {
          format!("[{}]", join_repr(&items.borrow()))
        })
      }
      Value::Tuple(items) if items.len() == 1 => {
        format!("({},)", items[0].repr())
      }
      Value::Tuple(items) => format!("({})", join_repr(items)),
      Value::Dict(items) => {
        render_once(Rc::as_ptr(items) as usize, "{...}", || {
          let parts: Vec<String> = items
            .borrow()
            .iter()
            .map(|(k, v)| format!("{}: {}", k.repr(), v.repr()))
            .collect();
          format!("{{{}}}", parts.join(", "))
        })
      }
      Value::Range { start, stop, step } if *step == 1 => {
        format!("range({start}, {stop})")
      }
      Value::Range { start, stop, step } => {
        format!("range({start}, {stop}, {step})")
      }
      Value::Array(array) => array.repr(),
      Value::Function(func) => format!("<function {}>", func.def.name),
      Value::Native(native) => format!("<built-in function {}>", native.name),
      Value::Method(method) => format!(
        "<bound method {}.{}>",
        method.receiver.type_name(),
        method.name
      ),
      Value::Module(module) => module.repr(),
      Value::Figure(figure) => figure.describe(),
      Value::Axes(_) => "<Axes: >".to_string(),
      Value::Stream(StreamKind::Stdout) => {
        "<_io.TextIOWrapper name='<stdout>' mode='w' encoding='utf-8'>"
          .to_string()
      }
      Value::Stream(StreamKind::Stderr) => {
        "<_io.TextIOWrapper name='<stderr>' mode='w' encoding='utf-8'>"
          .to_string()
      }
      Value::ExceptionType(kind) => format!("<class '{}'>", kind.name()),
      Value::Exception(exc) => {
        format!("{}({})", exc.kind.name(), quote_str(&exc.message))
      }
    }
  }
}

impl fmt::Display for Value {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Value::Str(s) => f.write_str(s),
      Value::Array(array) => f.write_str(&array.to_string()),
      Value::Exception(exc) => f.write_str(&exc.message),
      other => f.write_str(&other.repr()),
    }
  }
}

impl fmt::Debug for Value {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.repr())
  }
}

thread_local! {
    // Lists and dicts whose repr is being built, outermost first.
    static RENDERING: RefCell<Vec<usize>> = const { RefCell::new(Vec::new()) };
    // Pairs of lists or dicts being compared, outermost first.
    static COMPARING: RefCell<Vec<(usize, usize)>> =
        const { RefCell::new(Vec::new()) };
}

// Each guard pops the entry its caller pushed, also on unwind.
struct RenderingGuard;

impl Drop for RenderingGuard {
  fn drop(&mut self) {
    RENDERING.with(|stack| stack.borrow_mut().pop());
  }
}

struct ComparingGuard;

impl Drop for ComparingGuard {
  fn drop(&mut self) {
    COMPARING.with(|stack| stack.borrow_mut().pop());
  }
}

/// Render a container, or `placeholder` if it is already being rendered
/// further out (a container that contains itself).
fn render_once(
  addr: usize,
  placeholder: &str,
  render: impl FnOnce() -> String,
) -> String {
  let nested = RENDERING.with(|stack| {
    let mut stack = stack.borrow_mut();
    if stack.contains(&addr) {
      return true;
    }
    stack.push(addr);
    false
  });
  if nested {
    return placeholder.to_string();
  }
  let _guard = RenderingGuard;
  render()
}

fn pair<T>(a: &Rc<T>, b: &Rc<T>) -> (usize, usize) {
  (Rc::as_ptr(a) as usize, Rc::as_ptr(b) as usize)
}

/// Compare two containers. A pair met again while it is still being
/// compared counts as equal, so cyclic structures terminate.
fn compare_once(key: (usize, usize), compare: impl FnOnce() -> bool) -> bool {
  let nested = COMPARING.with(|stack| {
    let mut stack = stack.borrow_mut();
    if stack.contains(&key) {
      return true;
    }
    stack.push(key);
    false
  });
  if nested {
    return true;
  }
  let _guard = ComparingGuard;
  compare()
}

fn seq_eq(a: &[Value], b: &[Value]) -> bool {
  a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.py_eq(y))
}

fn join_repr(items: &[Value]) -> String {
  items.iter().map(Value::repr).collect::<Vec<_>>().join(", ")
}

/// Shortest round-trip float text, switching to exponent notation outside
/// `1e-4 <= |f| < 1e16`.
pub fn format_float(f: f64) -> String {
  if f.is_nan() {
    return "nan".to_string();
  }
  if f.is_infinite() {
    return if f > 0.0 { "inf" } else { "-inf" }.to_string();
  }
  if f == 0.0 {
    return if f.is_sign_negative() { "-0.0" } else { "0.0" }.to_string();
  }
  let scientific = format!("{f:e}");
  let (mantissa, exponent) = scientific
    .split_once('e')
    .unwrap_or((scientific.as_str(), "0"));
  let exponent: i32 = exponent.parse().unwrap_or(0);
  if (-4..16).contains(&exponent) {
    let plain = format!("{f}");
    if plain.contains('.') {
      plain
    } else {
      format!("{plain}.0")
    }
  } else {
    let sign = if exponent < 0 { '-' } else { '+' };
    format!("{mantissa}e{sign}{:02}", exponent.abs())
  }
}

pub fn quote_str(s: &str) -> String {
  let quote = if s.contains('\'') && !s.contains('"') {
    '"'
  } else {
    '\''
  };
  let mut out = String::with_capacity(s.len() + 2);
  out.push(quote);
  for c in s.chars() {
    match c {
      '\\' => out.push_str("\\\\"),
      '\n' => out.push_str("\\n"),
      '\t' => out.push_str("\\t"),
      '\r' => out.push_str("\\r"),
      c if c == quote => {
        out.push('\\');
        out.push(c);
      }
      c if (c as u32) < 0x20 || c as u32 == 0x7f => {
        out.push_str(&format!("\\x{:02x}", c as u32));
      }
      c => out.push(c),
    }
  }
  out.push(quote);
  out
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn float_repr_matches_snippet_conventions() {
    assert_eq!(format_float(1.0), "1.0");
    assert_eq!(format_float(0.1 + 0.2), "0.30000000000000004");
    assert_eq!(format_float(1e-7), "1e-07");
    assert_eq!(format_float(1.5e20), "1.5e+20");
    assert_eq!(format_float(-2.5), "-2.5");
    assert_eq!(format_float(f64::INFINITY), "inf");
  }

  #[test]
  fn string_repr_picks_quotes() {
    assert_eq!(quote_str("it's"), "\"it's\"");
    assert_eq!(quote_str("a\nb"), "'a\\nb'");
  }

  #[test]
  fn container_repr() {
    let value = Value::list(vec![
      Value::Int(1),
      Value::str("x"),
      Value::tuple(vec![Value::None]),
    ]);
    assert_eq!(value.repr(), "[1, 'x', (None,)]");
    let dict = Value::dict(vec![(Value::str("a"), Value::Float(2.0))]);
    assert_eq!(dict.to_string(), "{'a': 2.0}");
  }

  #[test]
  fn self_containing_list_renders_ellipsis() {
    let list = Value::list(vec![Value::Int(1)]);
    if let Value::List(items) = &list {
      items.borrow_mut().push(list.clone());
    }
    assert_eq!(list.repr(), "[1, [...]]");
    assert!(list.py_eq(&list));
    // Break the cycle so the test does not leak.
    if let Value::List(items) = &list {
      items.borrow_mut().clear();
    }
  }

  #[test]
  fn distinct_cyclic_lists_compare_without_recursing_forever() {
    let make = || {
      let list = Value::list(Vec::new());
      if let Value::List(items) = &list {
        items.borrow_mut().push(list.clone());
      }
      list
    };
    let (a, b) = (make(), make());
    assert!(a.py_eq(&b));
    for list in [a, b] {
      if let Value::List(items) = &list {
        items.borrow_mut().clear();
      }
    }
  }

  #[test]
  fn numeric_equality_crosses_types() {
    assert!(Value::Int(1).py_eq(&Value::Float(1.0)));
    assert!(Value::Bool(true).py_eq(&Value::Int(1)));
    assert!(!Value::str("1").py_eq(&Value::Int(1)));
  }

  #[test]
  fn range_iterates_with_negative_step() {
    let values: Vec<i64> = Value::Range {
      start: 5,
      stop: 0,
      step: -2,
    }
    .iter_values()
    .unwrap()
    .filter_map(|v| v.as_int())
    .collect();
    assert_eq!(values, vec![5, 3, 1]);
  }
}
