//! Tree-walking evaluation of parsed snippets.
//!
//! Statements run against a [`Frame`]: module globals plus, inside a
//! function call, the call's locals and the namespaces it closes over.
//! `return`, `break` and `continue` travel as [`InterpreterError`] variants
//! until the enclosing call or loop absorbs them.

use std::collections::HashSet;
use std::rc::Rc;

use crate::config::EngineConfig;
use crate::functions::{self, builtins, random};
use crate::modules::{ModuleTable, SearchPath};
use crate::syntax::{self, ExceptHandler, Stmt, Target};
use crate::value::{Namespace, Value};
use crate::{Exception, ExceptionKind, InterpreterError};

pub mod binary_ops;
pub mod subscripts;

mod assignment;
mod core_eval;
mod function_application;
mod imports;
mod scoping;

pub const DEFAULT_RECURSION_LIMIT: usize = 100;

/// Upper bound for `sys.setrecursionlimit`; deeper snippet recursion would
/// exhaust the native stack first.
pub const MAX_RECURSION_LIMIT: usize = 1000;

/// Names pre-bound in every `__main__` namespace.
const PRELUDE: [(&str, &str); 6] = [
  ("np", "numpy"),
  ("numpy", "numpy"),
  ("plt", "matplotlib.pyplot"),
  ("matplotlib", "matplotlib.pyplot"),
  ("sys", "sys"),
  ("os", "os"),
];

/// The scopes visible to the code being executed.
pub struct Frame {
  pub globals: Namespace,
  /// `None` at module level, where assignments go to `globals`.
  pub locals: Option<Namespace>,
  /// Locals of lexically enclosing calls, outermost first.
  pub enclosing: Vec<Namespace>,
  pub declared_global: HashSet<String>,
}

impl Frame {
  pub fn module(globals: Namespace) -> Self {
    Frame {
      globals,
      locals: None,
      enclosing: Vec::new(),
      declared_global: HashSet::new(),
    }
  }

  /// Scopes captured by a function defined in this frame.
  fn closure_scopes(&self) -> Vec<Namespace> {
    let mut scopes = self.enclosing.clone();
    if let Some(locals) = &self.locals {
      scopes.push(locals.clone());
    }
    scopes
  }
}

pub struct Interpreter {
  pub modules: ModuleTable,
  pub search_path: SearchPath,
  builtins: Namespace,
  depth: usize,
  pub(crate) recursion_limit: usize,
  /// Exceptions whose `except` block is running, innermost last.
  handling: Vec<Exception>,
}

impl Default for Interpreter {
  fn default() -> Self {
    Self::new(&EngineConfig::default())
  }
}

impl Interpreter {
  pub fn new(config: &EngineConfig) -> Self {
    let search_path = SearchPath::new(
      std::iter::once(String::new()).chain(
        config
          .extra_search_paths
          .iter()
          .map(|p| p.to_string_lossy().into_owned()),
      ),
    );
    let mut modules = ModuleTable::default();
    functions::register_native_modules(&mut modules, &search_path, &config.argv);
    if let Some(seed) = config.seed {
      random::seed_rng(seed);
    }
    Interpreter {
      modules,
      search_path,
      builtins: builtins::namespace(),
      depth: 0,
      recursion_limit: config.recursion_limit.clamp(1, MAX_RECURSION_LIMIT),
      handling: Vec::new(),
    }
  }

  /// A fresh `__main__` namespace with the allow-listed modules bound.
  pub fn new_main_namespace(&self) -> Namespace {
    let ns = Namespace::new();
    ns.set("__name__", Value::str("__main__"));
    for (alias, module) in PRELUDE {
      if let Some(module) = self.modules.get(module) {
        ns.set(alias, Value::Module(module));
      }
    }
    ns
  }

  /// Parse and run `source` as the main program, returning its namespace.
  pub fn run_main(&mut self, source: &str) -> Result<Namespace, InterpreterError> {
    self.depth = 0;
    self.handling.clear();
    let globals = self.new_main_namespace();
    self.run_source(source, &globals)?;
    Ok(globals)
  }

  /// Parse and run `source` with `globals` as the module namespace.
  pub fn run_source(
    &mut self,
    source: &str,
    globals: &Namespace,
  ) -> Result<(), InterpreterError> {
    let program = syntax::parse_program(source)?;
    self.exec_module(&program, globals)
  }

  /// Run a module body. Stray `return`/`break`/`continue` are syntax
  /// errors at this level.
  pub(crate) fn exec_module(
    &mut self,
    body: &[Stmt],
    globals: &Namespace,
  ) -> Result<(), InterpreterError> {
    let mut frame = Frame::module(globals.clone());
    match self.exec_block(body, &mut frame) {
      Err(
        err @ (InterpreterError::ReturnValue(_)
        | InterpreterError::BreakSignal
        | InterpreterError::ContinueSignal),
      ) => Err(InterpreterError::raise(
        ExceptionKind::SyntaxError,
        err.to_string(),
      )),
      other => other,
    }
  }

  pub(crate) fn exec_block(
    &mut self,
    body: &[Stmt],
    frame: &mut Frame,
  ) -> Result<(), InterpreterError> {
    for stmt in body {
      self.exec_stmt(stmt, frame)?;
    }
    Ok(())
  }

  /// Bind `item` and run one pass of a `for` body; `Ok(false)` on `break`.
  fn loop_iteration(
    &mut self,
    target: &Target,
    item: Value,
    body: &[Stmt],
    frame: &mut Frame,
  ) -> Result<bool, InterpreterError> {
    self.assign(target, item, frame)?;
    match self.exec_block(body, frame) {
      Err(InterpreterError::BreakSignal) => Ok(false),
      Err(InterpreterError::ContinueSignal) | Ok(()) => Ok(true),
      Err(err) => Err(err),
    }
  }

  fn exec_stmt(&mut self, stmt: &Stmt, frame: &mut Frame) -> Result<(), InterpreterError> {
    match stmt {
      Stmt::Expr(expr) => {
        self.eval(expr, frame)?;
      }
      Stmt::Assign { targets, value } => {
        let value = self.eval(value, frame)?;
        for target in targets {
          self.assign(target, value.clone(), frame)?;
        }
      }
      Stmt::AugAssign { target, op, value } => {
        self.aug_assign(target, *op, value, frame)?;
      }
      Stmt::If { branches, orelse } => {
        for (condition, body) in branches {
          if self.eval(condition, frame)?.truthy()? {
            return self.exec_block(body, frame);
          }
        }
        self.exec_block(orelse, frame)?;
      }
      Stmt::While { condition, body } => {
        while self.eval(condition, frame)?.truthy()? {
          match self.exec_block(body, frame) {
            Err(InterpreterError::BreakSignal) => break,
            Err(InterpreterError::ContinueSignal) | Ok(()) => {}
            Err(err) => return Err(err),
          }
        }
      }
      Stmt::For { target, iter, body } => {
        let iterable = self.eval(iter, frame)?;
        if let Value::List(items) = &iterable {
          // By index over the live list: items appended by the body are
          // visited too.
          let mut index = 0;
          loop {
            let item = items.borrow().get(index).cloned();
            let Some(item) = item else {
              break;
            };
            index += 1;
            if !self.loop_iteration(target, item, body, frame)? {
              break;
            }
          }
        } else {
          for item in iterable.iter_values()? {
            if !self.loop_iteration(target, item, body, frame)? {
              break;
            }
          }
        }
      }
      Stmt::FunctionDef(def) => {
        let defaults = def
          .params
          .iter()
          .map(|p| p.default.as_ref().map(|e| self.eval(e, frame)).transpose())
          .collect::<Result<Vec<_>, _>>()?;
        let function = crate::value::Function {
          def: def.clone(),
          defaults,
          globals: frame.globals.clone(),
          enclosing: frame.closure_scopes(),
        };
        self.store(&def.name, Value::Function(Rc::new(function)), frame);
      }
      Stmt::Return(value) => {
        let value = match value {
          Some(expr) => self.eval(expr, frame)?,
          None => Value::None,
        };
        return Err(InterpreterError::ReturnValue(value));
      }
      Stmt::Pass => {}
      Stmt::Break => return Err(InterpreterError::BreakSignal),
      Stmt::Continue => return Err(InterpreterError::ContinueSignal),
      Stmt::Global(names) => frame.declared_global.extend(names.iter().cloned()),
      Stmt::Import(names) => self.exec_import(names, frame)?,
      Stmt::ImportFrom { module, names } => self.exec_import_from(module, names, frame)?,
      Stmt::Raise(value) => return Err(self.raise(value.as_ref(), frame)?),
      Stmt::Try {
        body,
        handlers,
        orelse,
        finally,
      } => self.exec_try(body, handlers, orelse, finally, frame)?,
      Stmt::Assert { test, message } => {
        if !self.eval(test, frame)?.truthy()? {
          let message = match message {
            Some(expr) => self.eval(expr, frame)?.to_string(),
            None => String::new(),
          };
          return Err(InterpreterError::raise(ExceptionKind::AssertionError, message));
        }
      }
      Stmt::Delete(targets) => {
        for target in targets {
          self.delete(target, frame)?;
        }
      }
    }
    Ok(())
  }

  /// The error a `raise` statement produces.
  fn raise(
    &mut self,
    value: Option<&syntax::Expr>,
    frame: &mut Frame,
  ) -> Result<InterpreterError, InterpreterError> {
    let Some(expr) = value else {
      return Ok(match self.handling.last() {
        Some(exc) => InterpreterError::Raised(exc.clone()),
        None => InterpreterError::raise(
          ExceptionKind::RuntimeError,
          "No active exception to reraise",
        ),
      });
    };
    Ok(match self.eval(expr, frame)? {
      Value::ExceptionType(kind) => InterpreterError::raise(kind, ""),
      Value::Exception(exc) => InterpreterError::Raised(exc.as_ref().clone()),
      _ => InterpreterError::raise(
        ExceptionKind::TypeError,
        "exceptions must derive from BaseException",
      ),
    })
  }

  fn exec_try(
    &mut self,
    body: &[Stmt],
    handlers: &[ExceptHandler],
    orelse: &[Stmt],
    finally: &[Stmt],
    frame: &mut Frame,
  ) -> Result<(), InterpreterError> {
    let outcome = match self.exec_block(body, frame) {
      Ok(()) => self.exec_block(orelse, frame),
      Err(err) => match err.as_exception() {
        Some(exc) => self.handle_exception(err, exc, handlers, frame),
        None => Err(err),
      },
    };
    if finally.is_empty() {
      return outcome;
    }
    // An error in `finally` replaces the pending outcome.
    self.exec_block(finally, frame)?;
    outcome
  }

  fn handle_exception(
    &mut self,
    err: InterpreterError,
    exc: Exception,
    handlers: &[ExceptHandler],
    frame: &mut Frame,
  ) -> Result<(), InterpreterError> {
    for handler in handlers {
      if !self.handler_matches(handler, exc.kind, frame)? {
        continue;
      }
      if let Some(name) = &handler.name {
        self.store(name, Value::Exception(Rc::new(exc.clone())), frame);
      }
      self.handling.push(exc);
      let result = self.exec_block(&handler.body, frame);
      self.handling.pop();
      return result;
    }
    Err(err)
  }

  fn handler_matches(
    &mut self,
    handler: &ExceptHandler,
    kind: ExceptionKind,
    frame: &mut Frame,
  ) -> Result<bool, InterpreterError> {
    let Some(expr) = &handler.kind else {
      return Ok(true);
    };
    let classes = match self.eval(expr, frame)? {
      Value::Tuple(items) => items.as_ref().clone(),
      other => vec![other],
    };
    let mut matched = false;
    for class in classes {
      match class {
        Value::ExceptionType(base) => matched |= kind.is_subclass_of(base),
        other => {
          return Err(InterpreterError::raise(
            ExceptionKind::TypeError,
            format!(
              "catching classes that do not inherit from BaseException is not allowed (got '{}')",
              other.type_name()
            ),
          ));
        }
      }
    }
    Ok(matched)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn run(source: &str) -> Namespace {
    Interpreter::default().run_main(source).unwrap()
  }

  #[test]
  fn prelude_binds_allow_listed_modules() {
    let ns = run("");
    for (alias, _) in PRELUDE {
      assert!(ns.contains(alias), "{alias} missing");
    }
    assert_eq!(ns.get("__name__").unwrap().to_string(), "__main__");
  }

  #[test]
  fn return_at_module_level_is_a_syntax_error() {
    let err = Interpreter::default().run_main("return 1").unwrap_err();
    assert_eq!(err.kind(), Some(ExceptionKind::SyntaxError));
  }

  #[test]
  fn finally_runs_after_handled_error() {
    let ns = run(
      "log = []\ntry:\n    1/0\nexcept ZeroDivisionError:\n    log.append('except')\nfinally:\n    log.append('finally')\n",
    );
    assert_eq!(ns.get("log").unwrap().repr(), "['except', 'finally']");
  }
}
