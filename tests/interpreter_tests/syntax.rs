use super::*;

mod layout {
  use super::*;

  #[test]
  fn comments_and_blank_lines() {
    let source = "\
# leading comment

x = 1  # trailing comment

print(x)
";
    assert_eq!(run(source), "1\n");
  }

  #[test]
  fn brackets_span_lines() {
    let source = "\
values = [
    1,
    2,
]
print(sum(values))
";
    assert_eq!(run(source), "3\n");
  }

  #[test]
  fn backslash_continuation() {
    assert_eq!(run("total = 1 + \\\n    2\nprint(total)"), "3\n");
  }

  #[test]
  fn semicolons_separate_statements() {
    assert_eq!(run("a = 1; b = 2; print(a + b)"), "3\n");
  }

  #[test]
  fn inline_clause_bodies() {
    assert_eq!(run("if True: print('inline')"), "inline\n");
  }

  #[test]
  fn docstrings_are_ignored() {
    let source = "\
def f():
    \"\"\"Return one.

    Spans lines.
    \"\"\"
    return 1
print(f())
";
    assert_eq!(run(source), "1\n");
  }

  #[test]
  fn hash_inside_a_string_is_not_a_comment() {
    assert_eq!(run("print('# not a comment')"), "# not a comment\n");
  }

  #[test]
  fn empty_program_does_nothing() {
    assert_eq!(run("\n\n# only a comment\n"), "");
  }
}

mod errors {
  use super::*;

  #[test]
  fn unterminated_string() {
    assert_eq!(
      run_err("x = 1\ny = 'open"),
      "SyntaxError: unterminated string literal (line 2)"
    );
  }

  #[test]
  fn unclosed_bracket() {
    assert_eq!(
      run_err("x = [1,\n2"),
      "SyntaxError: unexpected EOF while parsing (line 1)"
    );
  }

  #[test]
  fn unexpected_indent() {
    assert_eq!(
      run_err("x = 1\n    y = 2"),
      "SyntaxError: unexpected indent (line 2)"
    );
  }

  #[test]
  fn try_without_handlers() {
    assert_eq!(
      run_err("try:\n    pass\nprint(1)"),
      "SyntaxError: expected 'except' or 'finally' block (line 1)"
    );
  }

  #[test]
  fn assignment_to_a_literal() {
    assert!(run_err("1 = x").starts_with("SyntaxError: "));
  }

  #[test]
  fn return_outside_a_function() {
    assert_eq!(
      run_err("return 5"),
      "SyntaxError: 'return' outside function"
    );
  }

  #[test]
  fn break_outside_a_loop() {
    assert_eq!(run_err("break"), "SyntaxError: 'break' outside loop");
  }

  #[test]
  fn nothing_runs_when_parsing_fails() {
    let capture = OutputCapture::begin();
    let outcome = Interpreter::default().run_main("print('first')\nprint(");
    let (stdout, _) = capture.finish();
    assert!(outcome.is_err());
    assert_eq!(stdout, "");
  }

  #[test]
  fn non_default_after_default() {
    assert!(run_err("def f(a=1, b):\n    pass")
      .contains("non-default argument follows default argument"));
  }

  #[test]
  fn positional_after_keyword() {
    assert!(run_err("print(end='', 1)")
      .contains("positional argument follows keyword argument"));
  }
}
