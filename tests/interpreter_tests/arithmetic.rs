use super::*;

mod integers {
  use super::*;

  #[test]
  fn basic_operations() {
    assert_eq!(run("print(2 + 3 * 4, (2 + 3) * 4)"), "14 20\n");
  }

  #[test]
  fn floor_division_rounds_toward_negative_infinity() {
    assert_eq!(run("print(7 // 2, -7 // 2, 7 // -2)"), "3 -4 -4\n");
  }

  #[test]
  fn modulo_takes_the_sign_of_the_divisor() {
    assert_eq!(run("print(7 % 3, -7 % 3, 7 % -3)"), "1 2 -2\n");
  }

  #[test]
  fn true_division_returns_float() {
    assert_eq!(run("print(6 / 3, 7 / 2)"), "2.0 3.5\n");
  }

  #[test]
  fn power() {
    assert_eq!(run("print(2 ** 10, 2 ** -1)"), "1024 0.5\n");
  }

  #[test]
  fn divmod_pairs() {
    assert_eq!(run("print(divmod(17, 5))"), "(3, 2)\n");
  }

  #[test]
  fn overflow_is_reported() {
    assert_eq!(
      run_err("x = 9223372036854775807 + 1"),
      "OverflowError: integer overflow"
    );
  }
}

mod division_by_zero {
  use super::*;

  #[test]
  fn true_division() {
    assert_eq!(run_err("1 / 0"), "ZeroDivisionError: division by zero");
  }

  #[test]
  fn floor_division() {
    assert_eq!(
      run_err("1 // 0"),
      "ZeroDivisionError: integer division or modulo by zero"
    );
  }

  #[test]
  fn modulo() {
    assert_eq!(
      run_err("5 % 0"),
      "ZeroDivisionError: integer division or modulo by zero"
    );
  }
}

mod floats {
  use super::*;

  #[test]
  fn shortest_round_trip_repr() {
    assert_eq!(run("print(0.1 + 0.2)"), "0.30000000000000004\n");
  }

  #[test]
  fn whole_floats_keep_a_decimal_point() {
    assert_eq!(run("print(1.0, 2.5 * 2)"), "1.0 5.0\n");
  }

  #[test]
  fn mixed_arithmetic_promotes() {
    assert_eq!(run("print(1 + 0.5, 3 * 1.5)"), "1.5 4.5\n");
  }

  #[test]
  fn round_uses_bankers_rounding() {
    assert_eq!(run("print(round(2.5), round(3.5), round(-0.5))"), "2 4 0\n");
  }

  #[test]
  fn round_to_digits() {
    assert_eq!(run("print(round(3.14159, 2))"), "3.14\n");
  }

  #[test]
  fn conversions() {
    assert_eq!(run("print(int(3.9), int(-3.9), float(2))"), "3 -3 2.0\n");
  }
}

mod comparisons {
  use super::*;

  #[test]
  fn chained_comparison() {
    assert_eq!(run("x = 5\nprint(1 < x < 10, 1 < x < 3)"), "True False\n");
  }

  #[test]
  fn int_and_float_compare_equal() {
    assert_eq!(run("print(1 == 1.0, 2 != 2.0)"), "True False\n");
  }

  #[test]
  fn ordering_mismatched_types_fails() {
    assert_eq!(
      run_err("'a' < 1"),
      "TypeError: '<' not supported between instances of 'str' and 'int'"
    );
  }

  #[test]
  fn unsupported_operands() {
    assert_eq!(
      run_err("'a' - 1"),
      "TypeError: unsupported operand type(s) for -: 'str' and 'int'"
    );
  }

  #[test]
  fn builtins_abs_min_max_sum() {
    assert_eq!(
      run("print(abs(-3), min(4, 2, 8), max([1, 9, 3]), sum([1, 2, 3]))"),
      "3 2 9 6\n"
    );
  }
}
