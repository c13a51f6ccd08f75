use super::*;

/// Deep snippet recursion needs more native stack than a test thread has.
fn on_big_stack<T: Send + 'static>(f: impl FnOnce() -> T + Send + 'static) -> T {
  std::thread::Builder::new()
    .stack_size(256 * 1024 * 1024)
    .spawn(f)
    .unwrap()
    .join()
    .unwrap()
}

mod definitions {
  use super::*;

  #[test]
  fn return_values() {
    assert_eq!(run("def add(a, b):\n    return a + b\nprint(add(2, 3))"), "5\n");
  }

  #[test]
  fn implicit_none() {
    assert_eq!(run("def f():\n    pass\nprint(f())"), "None\n");
  }

  #[test]
  fn defaults_and_keywords() {
    let source = "\
def greet(name, greeting='Hello', punct='!'):
    return greeting + ', ' + name + punct
print(greet('Ada'))
print(greet('Ada', punct='?'))
print(greet(greeting='Hi', name='Bob'))
";
    assert_eq!(run(source), "Hello, Ada!\nHello, Ada?\nHi, Bob!\n");
  }

  #[test]
  fn functions_are_values() {
    let source = "\
def twice(f, x):
    return f(f(x))
def inc(x):
    return x + 1
print(twice(inc, 5))
";
    assert_eq!(run(source), "7\n");
  }

  #[test]
  fn recursion() {
    let source = "\
def fib(n):
    if n < 2:
        return n
    return fib(n - 1) + fib(n - 2)
print([fib(i) for i in range(10)])
";
    assert_eq!(run(source), "[0, 1, 1, 2, 3, 5, 8, 13, 21, 34]\n");
  }

  #[test]
  fn repr_names_the_function() {
    assert_eq!(run("def f():\n    pass\nprint(f)"), "<function f>\n");
  }
}

mod argument_errors {
  use super::*;

  #[test]
  fn missing_arguments() {
    assert_eq!(
      run_err("def f(a, b, c):\n    pass\nf()"),
      "TypeError: f() missing 3 required positional arguments: 'a', 'b', and 'c'"
    );
  }

  #[test]
  fn too_many_arguments() {
    assert_eq!(
      run_err("def f(a):\n    pass\nf(1, 2)"),
      "TypeError: f() takes 1 positional argument but 2 were given"
    );
  }

  #[test]
  fn unexpected_keyword() {
    assert_eq!(
      run_err("def f(a):\n    pass\nf(1, b=2)"),
      "TypeError: f() got an unexpected keyword argument 'b'"
    );
  }

  #[test]
  fn calling_a_non_callable() {
    assert_eq!(
      run_err("x = 3\nx()"),
      "TypeError: 'int' object is not callable"
    );
  }
}

mod scopes {
  use super::*;

  #[test]
  fn locals_do_not_leak() {
    assert_eq!(
      run_err("def f():\n    hidden = 1\nf()\nprint(hidden)"),
      "NameError: name 'hidden' is not defined"
    );
  }

  #[test]
  fn functions_read_globals() {
    assert_eq!(
      run("factor = 3\ndef scale(x):\n    return x * factor\nprint(scale(2))"),
      "6\n"
    );
  }

  #[test]
  fn assignment_shadows_a_global() {
    let source = "\
count = 1
def f():
    count = 2
    return count
print(f(), count)
";
    assert_eq!(run(source), "2 1\n");
  }

  #[test]
  fn global_declaration_rebinds() {
    let source = "\
count = 0
def bump():
    global count
    count += 1
bump()
bump()
print(count)
";
    assert_eq!(run(source), "2\n");
  }

  #[test]
  fn closures_capture_the_enclosing_scope() {
    let source = "\
def make_adder(n):
    def add(x):
        return x + n
    return add
add5 = make_adder(5)
print(add5(1), make_adder(10)(1))
";
    assert_eq!(run(source), "6 11\n");
  }

  #[test]
  fn later_globals_are_visible_at_call_time() {
    let source = "\
def show():
    return late
late = 'bound later'
print(show())
";
    assert_eq!(run(source), "bound later\n");
  }
}

mod recursion_limit {
  use super::*;

  #[test]
  fn runaway_recursion_raises() {
    let err = on_big_stack(|| {
      run_err("def down(n):\n    return down(n + 1)\ndown(0)")
    });
    assert_eq!(err, "RecursionError: maximum recursion depth exceeded");
  }

  #[test]
  fn raising_the_limit_allows_deeper_calls() {
    let source = "\
import sys
sys.setrecursionlimit(500)
def depth(n):
    if n == 0:
        return 0
    return 1 + depth(n - 1)
print(depth(400), sys.getrecursionlimit())
";
    assert_eq!(on_big_stack(|| run(source)), "400 500\n");
  }

  #[test]
  fn limit_must_be_positive() {
    assert_eq!(
      run_err("import sys\nsys.setrecursionlimit(0)"),
      "ValueError: recursion limit must be greater or equal than 1"
    );
  }
}
