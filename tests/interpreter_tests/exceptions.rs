use super::*;

mod raising {
  use super::*;

  #[test]
  fn raise_with_message() {
    assert_eq!(
      run_err("raise ValueError('bad input')"),
      "ValueError: bad input"
    );
  }

  #[test]
  fn raise_class_without_arguments() {
    assert_eq!(run_err("raise KeyError"), "KeyError: ");
  }

  #[test]
  fn raising_a_non_exception() {
    assert_eq!(
      run_err("raise 5"),
      "TypeError: exceptions must derive from BaseException"
    );
  }

  #[test]
  fn bare_raise_outside_a_handler() {
    assert_eq!(
      run_err("raise"),
      "RuntimeError: No active exception to reraise"
    );
  }

  #[test]
  fn assert_with_message() {
    assert_eq!(
      run_err("x = 1\nassert x > 2, 'x too small'"),
      "AssertionError: x too small"
    );
  }

  #[test]
  fn undefined_name() {
    assert_eq!(
      run_err("print(missing)"),
      "NameError: name 'missing' is not defined"
    );
  }
}

mod handling {
  use super::*;

  #[test]
  fn except_binds_the_exception() {
    let source = "\
try:
    int('abc')
except ValueError as e:
    print('caught:', e)
";
    assert_eq!(
      run(source),
      "caught: invalid literal for int() with base 10: 'abc'\n"
    );
  }

  #[test]
  fn handlers_match_base_classes() {
    let source = "\
try:
    [1][3]
except LookupError:
    print('lookup')
";
    assert_eq!(run(source), "lookup\n");
  }

  #[test]
  fn tuple_of_classes() {
    let source = "\
for value in ['x', 0]:
    try:
        10 / value
    except (TypeError, ZeroDivisionError) as e:
        print(type(e))
";
    assert_eq!(
      run(source),
      "<class 'TypeError'>\n<class 'ZeroDivisionError'>\n"
    );
  }

  #[test]
  fn unmatched_exceptions_propagate() {
    let source = "\
try:
    {}['k']
except ValueError:
    print('wrong handler')
";
    assert_eq!(run_err(source), "KeyError: 'k'");
  }

  #[test]
  fn else_runs_when_nothing_was_raised() {
    let source = "\
try:
    x = 1
except Exception:
    print('failed')
else:
    print('ok', x)
";
    assert_eq!(run(source), "ok 1\n");
  }

  #[test]
  fn finally_always_runs() {
    let source = "\
def f():
    try:
        return 'body'
    finally:
        print('cleanup')
print(f())
";
    assert_eq!(run(source), "cleanup\nbody\n");
  }

  #[test]
  fn finally_runs_when_the_error_escapes() {
    let capture = scratchpad::OutputCapture::begin();
    let outcome = scratchpad::evaluator::Interpreter::default()
      .run_main("try:\n    1 / 0\nfinally:\n    print('cleanup')");
    let (stdout, _) = capture.finish();
    assert_eq!(stdout, "cleanup\n");
    assert_eq!(
      outcome.unwrap_err().describe(),
      "ZeroDivisionError: division by zero"
    );
  }

  #[test]
  fn bare_raise_rethrows_the_handled_exception() {
    let source = "\
try:
    raise ValueError('first')
except ValueError:
    print('logging')
    raise
";
    assert_eq!(run_err(source), "ValueError: first");
  }

  #[test]
  fn exception_args() {
    let source = "\
try:
    raise RuntimeError('boom')
except RuntimeError as e:
    print(e.args)
";
    assert_eq!(run(source), "('boom',)\n");
  }

  #[test]
  fn catching_a_non_class_is_an_error() {
    let source = "\
try:
    1 / 0
except 5:
    pass
";
    assert!(run_err(source).starts_with(
      "TypeError: catching classes that do not inherit from BaseException"
    ));
  }
}
