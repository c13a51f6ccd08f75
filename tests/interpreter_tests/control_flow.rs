use super::*;

mod conditionals {
  use super::*;

  #[test]
  fn if_elif_else() {
    let source = "\
for n in [-1, 0, 5]:
    if n < 0:
        print('negative')
    elif n == 0:
        print('zero')
    else:
        print('positive')
";
    assert_eq!(run(source), "negative\nzero\npositive\n");
  }

  #[test]
  fn conditional_expression() {
    assert_eq!(run("x = 3\nprint('odd' if x % 2 else 'even')"), "odd\n");
  }

  #[test]
  fn truthiness_of_containers() {
    assert_eq!(
      run("print(bool([]), bool([0]), bool(''), bool({}), bool(None))"),
      "False True False False False\n"
    );
  }
}

mod loops {
  use super::*;

  #[test]
  fn while_with_break_and_continue() {
    let source = "\
i = 0
total = 0
while True:
    i += 1
    if i > 10:
        break
    if i % 2:
        continue
    total += i
print(total)
";
    assert_eq!(run(source), "30\n");
  }

  #[test]
  fn nested_loops_break_only_the_inner_one() {
    let source = "\
pairs = []
for i in range(3):
    for j in range(3):
        if j > i:
            break
        pairs.append((i, j))
print(len(pairs))
";
    assert_eq!(run(source), "6\n");
  }

  #[test]
  fn loop_variable_survives_the_loop() {
    assert_eq!(run("for i in range(4):\n    pass\nprint(i)"), "3\n");
  }

  #[test]
  fn iterating_over_a_string() {
    assert_eq!(
      run("for ch in 'ab':\n    print(ch, end='.')\nprint()"),
      "a.b.\n"
    );
  }

  #[test]
  fn iterating_over_a_number_fails() {
    assert_eq!(
      run_err("for x in 5:\n    pass"),
      "TypeError: 'int' object is not iterable"
    );
  }

  #[test]
  fn appending_during_iteration_extends_the_loop() {
    let source = "\
l = [1]
for x in l:
    if len(l) < 5:
        l.append(x)
print(l)
";
    assert_eq!(run(source), "[1, 1, 1, 1, 1]\n");
  }

  #[test]
  fn tuple_targets() {
    let source = "\
for i, (a, b) in enumerate([(1, 2), (3, 4)]):
    print(i, a + b)
";
    assert_eq!(run(source), "0 3\n1 7\n");
  }
}

mod printing {
  use super::*;

  #[test]
  fn sep_and_end() {
    assert_eq!(
      run("print(1, 2, 3, sep='-', end='!\\n')"),
      "1-2-3!\n"
    );
  }

  #[test]
  fn print_to_stderr_is_not_stdout() {
    assert_eq!(
      run("import sys\nprint('out')\nprint('err', file=sys.stderr)"),
      "out\n"
    );
  }

  #[test]
  fn stdout_write_returns_length() {
    assert_eq!(
      run("import sys\nn = sys.stdout.write('abc')\nprint('', n)"),
      "abc 3\n"
    );
  }
}
