use super::*;

mod construction {
  use super::*;

  #[test]
  fn integer_arrays_print_without_commas() {
    assert_eq!(run("print(np.array([1, 2, 3]))"), "[1 2 3]\n");
  }

  #[test]
  fn float_arrays_use_bare_trailing_dots() {
    assert_eq!(run("print(np.linspace(0, 1, 3))"), "[0. 0.5 1.]\n");
  }

  #[test]
  fn repr_lists_elements() {
    assert_eq!(run("print(repr(np.arange(3)))"), "array([0, 1, 2])\n");
  }

  #[test]
  fn arange_with_float_step() {
    assert_eq!(run("print(np.arange(0, 1, 0.25))"), "[0. 0.25 0.5 0.75]\n");
  }

  #[test]
  fn zeros_and_ones_are_floats() {
    assert_eq!(
      run("z = np.zeros(2)\nprint(z, np.ones(2), z.dtype)"),
      "[0. 0.] [1. 1.] float64\n"
    );
  }

  #[test]
  fn shape_and_size() {
    assert_eq!(
      run("a = np.arange(5)\nprint(a.shape, a.size, a.ndim, a.dtype)"),
      "(5,) 5 1 int64\n"
    );
  }

  #[test]
  fn oversized_arrays_fail() {
    assert_eq!(
      run_err("np.zeros(10 ** 12)"),
      "MemoryError: cannot build a sequence of 1000000000000 elements"
    );
    assert_eq!(
      run_err("np.linspace(0, 1, 10 ** 12)"),
      "MemoryError: cannot build a sequence of 1000000000000 elements"
    );
    assert_eq!(
      run_err("np.arange(10 ** 12)"),
      "MemoryError: cannot build a sequence of 1000000000000 elements"
    );
  }

  #[test]
  fn nested_lists_are_rejected() {
    assert_eq!(
      run_err("np.array([[1, 2], [3, 4]])"),
      "ValueError: only 1-dimensional arrays are supported"
    );
  }

  #[test]
  fn import_under_another_alias() {
    assert_eq!(
      run("import numpy as numeric\nprint(numeric.array([1.5]))"),
      "[1.5]\n"
    );
  }
}

mod arithmetic {
  use super::*;

  #[test]
  fn elementwise_with_scalars() {
    assert_eq!(
      run("a = np.array([1, 2, 3])\nprint(a * 2, a + 0.5, a / 2)"),
      "[2 4 6] [1.5 2.5 3.5] [0.5 1. 1.5]\n"
    );
  }

  #[test]
  fn elementwise_between_arrays() {
    assert_eq!(
      run("print(np.array([1, 2]) + np.array([10, 20]))"),
      "[11 22]\n"
    );
  }

  #[test]
  fn comparisons_give_boolean_masks() {
    assert_eq!(
      run("a = np.arange(5)\nprint(a > 2, a[a > 2])"),
      "[False False False True True] [3 4]\n"
    );
  }

  #[test]
  fn ambiguous_truth_value() {
    assert!(run_err("if np.arange(3):\n    pass").starts_with(
      "ValueError: The truth value of an array with more than one element"
    ));
  }

  #[test]
  fn ufuncs() {
    assert_eq!(
      run("print(np.sqrt(np.array([1, 4, 9])), np.abs(-2))"),
      "[1. 2. 3.] 2\n"
    );
  }

  #[test]
  fn ufuncs_on_scalars_return_floats() {
    assert_eq!(run("print(np.cos(0), np.exp(0))"), "1.0 1.0\n");
  }
}

mod reductions {
  use super::*;

  #[test]
  fn sum_keeps_integer_dtype() {
    assert_eq!(run("print(np.sum(np.arange(5)))"), "10\n");
  }

  #[test]
  fn mean_is_a_float() {
    assert_eq!(run("print(np.mean([1, 2, 3, 4]))"), "2.5\n");
  }

  #[test]
  fn methods_match_functions() {
    assert_eq!(
      run("a = np.array([3, 1, 2])\nprint(a.min(), a.max(), a.sum(), a.cumsum())"),
      "1 3 6 [3 4 6]\n"
    );
  }

  #[test]
  fn standard_deviation() {
    assert_eq!(run("print(np.std([2, 4, 4, 4, 5, 5, 7, 9]))"), "2.0\n");
  }

  #[test]
  fn tolist_round_trips_to_python_values() {
    assert_eq!(run("print(np.arange(3).tolist())"), "[0, 1, 2]\n");
  }

  #[test]
  fn builtin_len_and_iteration() {
    assert_eq!(
      run("total = 0\nfor x in np.arange(4):\n    total += x\nprint(len(np.arange(4)), total)"),
      "4 6\n"
    );
  }
}

mod random {
  use super::*;

  #[test]
  fn seeding_repeats_draws() {
    let source = "\
np.random.seed(42)
first = np.random.rand(3).tolist()
np.random.seed(42)
print(first == np.random.rand(3).tolist())
";
    assert_eq!(run(source), "True\n");
  }

  #[test]
  fn randint_stays_in_bounds() {
    let source = "\
values = np.random.randint(0, 5, 100)
print(values.min() >= 0, values.max() < 5, values.dtype)
";
    assert_eq!(run(source), "True True int64\n");
  }

  #[test]
  fn uniform_respects_bounds() {
    let source = "\
v = np.random.uniform(2, 3, 50)
print(bool((v >= 2).all()), bool((v < 3).all()))
";
    assert_eq!(run(source), "True True\n");
  }

  #[test]
  fn randint_rejects_empty_ranges() {
    assert_eq!(
      run_err("np.random.randint(3, 3)"),
      "ValueError: low >= high"
    );
  }
}
