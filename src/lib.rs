use pest_derive::Parser;
use std::fmt;
use thiserror::Error;

pub mod capture;
pub mod config;
pub mod engine;
pub mod evaluator;
pub mod figures;
pub mod functions;
pub mod modules;
pub mod reload;
pub mod syntax;
pub mod value;
pub mod workdir;

pub use capture::OutputCapture;
pub use config::EngineConfig;
pub use engine::{ExecutionEngine, ExecutionRequest, ExecutionResult};
pub use figures::{
  FigureDisplay, FigureHandle, FigureHarvester, PlotInterceptor, SystemViewer,
};
pub use reload::ModuleReloadPolicy;
pub use workdir::WorkingDirectoryScope;

#[derive(Parser)]
#[grammar = "snippet.pest"]
pub struct SnippetParser;

/// Exception classes known to the snippet language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExceptionKind {
  Exception,
  ArithmeticError,
  AssertionError,
  AttributeError,
  FileNotFoundError,
  ImportError,
  IndexError,
  KeyError,
  LookupError,
  MemoryError,
  ModuleNotFoundError,
  NameError,
  NotImplementedError,
  OSError,
  OverflowError,
  RecursionError,
  RuntimeError,
  SyntaxError,
  TypeError,
  ValueError,
  ZeroDivisionError,
}

impl ExceptionKind {
  pub const ALL: [ExceptionKind; 21] = [
    ExceptionKind::Exception,
    ExceptionKind::ArithmeticError,
    ExceptionKind::AssertionError,
    ExceptionKind::AttributeError,
    ExceptionKind::FileNotFoundError,
    ExceptionKind::ImportError,
    ExceptionKind::IndexError,
    ExceptionKind::KeyError,
    ExceptionKind::LookupError,
    ExceptionKind::MemoryError,
    ExceptionKind::ModuleNotFoundError,
    ExceptionKind::NameError,
    ExceptionKind::NotImplementedError,
    ExceptionKind::OSError,
    ExceptionKind::OverflowError,
    ExceptionKind::RecursionError,
    ExceptionKind::RuntimeError,
    ExceptionKind::SyntaxError,
    ExceptionKind::TypeError,
    ExceptionKind::ValueError,
    ExceptionKind::ZeroDivisionError,
  ];

  pub fn name(self) -> &'static str {
    match self {
      ExceptionKind::Exception => "Exception",
      ExceptionKind::ArithmeticError => "ArithmeticError",
      ExceptionKind::AssertionError => "AssertionError",
      ExceptionKind::AttributeError => "AttributeError",
      ExceptionKind::FileNotFoundError => "FileNotFoundError",
      ExceptionKind::ImportError => "ImportError",
      ExceptionKind::IndexError => "IndexError",
      ExceptionKind::KeyError => "KeyError",
      ExceptionKind::LookupError => "LookupError",
      ExceptionKind::MemoryError => "MemoryError",
      ExceptionKind::ModuleNotFoundError => "ModuleNotFoundError",
      ExceptionKind::NameError => "NameError",
      ExceptionKind::NotImplementedError => "NotImplementedError",
      ExceptionKind::OSError => "OSError",
      ExceptionKind::OverflowError => "OverflowError",
      ExceptionKind::RecursionError => "RecursionError",
      ExceptionKind::RuntimeError => "RuntimeError",
      ExceptionKind::SyntaxError => "SyntaxError",
      ExceptionKind::TypeError => "TypeError",
      ExceptionKind::ValueError => "ValueError",
      ExceptionKind::ZeroDivisionError => "ZeroDivisionError",
    }
  }

  fn parent(self) -> Option<ExceptionKind> {
    match self {
      ExceptionKind::Exception => None,
      ExceptionKind::ZeroDivisionError | ExceptionKind::OverflowError => {
        Some(ExceptionKind::ArithmeticError)
      }
      ExceptionKind::IndexError | ExceptionKind::KeyError => {
        Some(ExceptionKind::LookupError)
      }
      ExceptionKind::ModuleNotFoundError => Some(ExceptionKind::ImportError),
      ExceptionKind::FileNotFoundError => Some(ExceptionKind::OSError),
      ExceptionKind::RecursionError | ExceptionKind::NotImplementedError => {
        Some(ExceptionKind::RuntimeError)
      }
      _ => Some(ExceptionKind::Exception),
    }
  }

  /// `except Base:` catches `self` when this returns true.
  pub fn is_subclass_of(self, base: ExceptionKind) -> bool {
    let mut current = Some(self);
    while let Some(kind) = current {
      if kind == base {
        return true;
      }
      current = kind.parent();
    }
    false
  }
}

/// A raised snippet-level exception.
#[derive(Debug, Clone, PartialEq)]
pub struct Exception {
  pub kind: ExceptionKind,
  pub message: String,
}

impl Exception {
  pub fn new(kind: ExceptionKind, message: impl Into<String>) -> Self {
    Exception {
      kind,
      message: message.into(),
    }
  }
}

impl fmt::Display for Exception {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.message)
  }
}

#[derive(Error, Debug)]
pub enum InterpreterError {
  #[error("{message} (line {line})")]
  SyntaxError { line: usize, message: String },
  #[error("{0}")]
  Raised(Exception),
  #[error("'return' outside function")]
  ReturnValue(value::Value),
  #[error("'break' outside loop")]
  BreakSignal,
  #[error("'continue' not properly in loop")]
  ContinueSignal,
}

impl InterpreterError {
  pub fn raise(kind: ExceptionKind, message: impl Into<String>) -> Self {
    InterpreterError::Raised(Exception::new(kind, message))
  }

  /// The exception class, or `None` for the internal control-flow signals.
  pub fn kind(&self) -> Option<ExceptionKind> {
    match self {
      InterpreterError::SyntaxError { .. } => Some(ExceptionKind::SyntaxError),
      InterpreterError::Raised(exc) => Some(exc.kind),
      _ => None,
    }
  }

  /// Convert into a catchable exception; control-flow signals yield `None`.
  pub fn as_exception(&self) -> Option<Exception> {
    match self {
      InterpreterError::SyntaxError { .. } => {
        Some(Exception::new(ExceptionKind::SyntaxError, self.to_string()))
      }
      InterpreterError::Raised(exc) => Some(exc.clone()),
      _ => None,
    }
  }

  /// `Kind: message`, the form written to stderr by the CLI.
  pub fn describe(&self) -> String {
    match self.kind() {
      Some(kind) => format!("{}: {}", kind.name(), self),
      None => self.to_string(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn exception_hierarchy() {
    assert!(ExceptionKind::ZeroDivisionError
      .is_subclass_of(ExceptionKind::ArithmeticError));
    assert!(ExceptionKind::KeyError.is_subclass_of(ExceptionKind::Exception));
    assert!(!ExceptionKind::KeyError.is_subclass_of(ExceptionKind::IndexError));
    assert!(ExceptionKind::ModuleNotFoundError
      .is_subclass_of(ExceptionKind::ImportError));
  }

  #[test]
  fn describe_prefixes_kind() {
    let err =
      InterpreterError::raise(ExceptionKind::ZeroDivisionError, "division by zero");
    assert_eq!(err.to_string(), "division by zero");
    assert_eq!(err.describe(), "ZeroDivisionError: division by zero");
  }
}
