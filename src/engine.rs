//! One-shot execution of snippet source with every process-global side
//! effect scoped to the call.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use crate::capture::OutputCapture;
use crate::config::EngineConfig;
use crate::evaluator::Interpreter;
use crate::figures::{self, FigureHandle, FigureHarvester, PlotInterceptor};
use crate::reload::ModuleReloadPolicy;
use crate::workdir::WorkingDirectoryScope;

pub const EMPTY_SOURCE_MESSAGE: &str = "Error: Code cannot be empty";

#[derive(Debug, Clone, Default)]
pub struct ExecutionRequest {
  pub source: String,
  pub working_directory: Option<PathBuf>,
}

impl ExecutionRequest {
  pub fn new(source: impl Into<String>) -> Self {
    ExecutionRequest {
      source: source.into(),
      working_directory: None,
    }
  }

  pub fn in_directory(mut self, dir: impl Into<PathBuf>) -> Self {
    self.working_directory = Some(dir.into());
    self
  }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExecutionResult {
  pub stdout: String,
  pub stderr: String,
  /// Message of the exception that ended the run, if any.
  pub exception: Option<String>,
  pub has_plot: bool,
  /// Numbers of the figures registered when the run finished, ascending.
  pub figure_ids: Vec<u32>,
}

impl ExecutionResult {
  pub fn is_success(&self) -> bool {
    self.exception.is_none()
  }

  /// The text an output pane shows for this result.
  pub fn console_report(&self) -> String {
    let mut report = String::new();
    if !self.stdout.is_empty() {
      report.push_str(&self.stdout);
      report.push('\n');
    }
    if !self.stderr.is_empty() {
      report.push_str("Errors:\n");
      report.push_str(&self.stderr);
      report.push('\n');
    }
    if let Some(exception) = &self.exception {
      report.push_str("Execution error: ");
      report.push_str(exception);
      report.push('\n');
    }
    if report.is_empty() {
      report.push_str("Code executed successfully. No output.\n");
    }
    report
  }
}

/// Runs snippets one at a time. Modules imported by earlier runs stay
/// loaded (and are reloaded when their files change); every run gets a
/// fresh `__main__` namespace.
///
/// Deeply recursive snippets need a correspondingly deep native stack; the
/// `scratchpad` binary runs the engine on a thread with a large stack.
pub struct ExecutionEngine {
  interp: Interpreter,
}

impl Default for ExecutionEngine {
  fn default() -> Self {
    Self::new()
  }
}

impl ExecutionEngine {
  pub fn new() -> Self {
    Self::with_config(EngineConfig::default())
  }

  pub fn with_config(config: EngineConfig) -> Self {
    // Non-interactive for the engine's lifetime; drawing calls never show.
    figures::set_interactive(false);
    ExecutionEngine {
      interp: Interpreter::new(&config),
    }
  }

  pub fn interpreter(&mut self) -> &mut Interpreter {
    &mut self.interp
  }

  pub fn execute(&mut self, request: &ExecutionRequest) -> ExecutionResult {
    self.run(&request.source, request.working_directory.as_deref())
  }

  /// Run `source`, optionally inside `working_directory`. Never fails:
  /// errors and panics are reported in the result.
  pub fn run(
    &mut self,
    source: &str,
    working_directory: Option<&Path>,
  ) -> ExecutionResult {
    if source.trim().is_empty() {
      return ExecutionResult {
        stderr: EMPTY_SOURCE_MESSAGE.to_string(),
        ..ExecutionResult::default()
      };
    }

    let mut scope =
      WorkingDirectoryScope::enter(working_directory, &self.interp.search_path);
    if let Some(dir) = scope.entered().map(Path::to_path_buf) {
      let reloaded = ModuleReloadPolicy::refresh(&mut self.interp, &dir);
      debug!(reloaded, dir = %dir.display(), "module refresh done");
    }

    let capture = OutputCapture::begin();
    let interceptor = PlotInterceptor::install();
    let outcome =
      catch_unwind(AssertUnwindSafe(|| self.interp.run_main(source)));
    drop(interceptor);
    let (stdout, stderr) = capture.finish();
    scope.exit();

    let exception = match outcome {
      Ok(Ok(_)) => None,
      Ok(Err(err)) => Some(err.to_string()),
      Err(panic) => Some(format!(
        "internal error: {}",
        panic_message(panic.as_ref())
      )),
    };
    let figure_ids = figures::figure_numbers();
    ExecutionResult {
      stdout,
      stderr,
      exception,
      has_plot: !figure_ids.is_empty(),
      figure_ids,
    }
  }

  /// The most recently active figure.
  pub fn get_figure(&self) -> Option<FigureHandle> {
    FigureHarvester::get_current_figure()
  }

  pub fn get_all_figures(&self) -> Vec<FigureHandle> {
    FigureHarvester::get_all_figures()
  }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
  if let Some(s) = payload.downcast_ref::<&str>() {
    s.to_string()
  } else if let Some(s) = payload.downcast_ref::<String>() {
    s.clone()
  } else {
    "unknown panic".to_string()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn report_lists_sections_in_order() {
    let result = ExecutionResult {
      stdout: "hi".into(),
      stderr: "warn".into(),
      exception: Some("division by zero".into()),
      ..Default::default()
    };
    assert_eq!(
      result.console_report(),
      "hi\nErrors:\nwarn\nExecution error: division by zero\n"
    );
  }

  #[test]
  fn empty_report_has_placeholder() {
    assert_eq!(
      ExecutionResult::default().console_report(),
      "Code executed successfully. No output.\n"
    );
  }

  #[test]
  fn panic_payloads_become_messages() {
    let payload: Box<dyn std::any::Any + Send> = Box::new("boom");
    assert_eq!(panic_message(payload.as_ref()), "boom");
  }
}
