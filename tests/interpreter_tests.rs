use scratchpad::evaluator::Interpreter;
use scratchpad::{OutputCapture, PlotInterceptor};

/// Run `source` as a fresh `__main__` and return what it printed.
fn run(source: &str) -> String {
  let capture = OutputCapture::begin();
  let _interceptor = PlotInterceptor::install();
  let outcome = Interpreter::default().run_main(source);
  let (stdout, _) = capture.finish();
  if let Err(err) = outcome {
    panic!("snippet failed: {}\n--- output ---\n{stdout}", err.describe());
  }
  stdout
}

/// Run `source` expecting it to fail; returns `Kind: message`.
fn run_err(source: &str) -> String {
  let capture = OutputCapture::begin();
  let _interceptor = PlotInterceptor::install();
  let outcome = Interpreter::default().run_main(source);
  drop(capture);
  match outcome {
    Ok(_) => panic!("snippet succeeded: {source}"),
    Err(err) => err.describe(),
  }
}

mod interpreter_tests {
  use super::*;

  mod arithmetic;
  mod collections;
  mod control_flow;
  mod exceptions;
  mod functions;
  mod modules;
  mod numpy;
  mod plotting;
  mod string;
  mod syntax;
}
