use super::*;

mod methods {
  use super::*;

  #[test]
  fn case_and_whitespace() {
    assert_eq!(
      run("s = '  Hello World  '\nprint(s.strip().upper(), s.strip().lower())"),
      "HELLO WORLD hello world\n"
    );
  }

  #[test]
  fn split_on_whitespace() {
    assert_eq!(run("print('a  b\\tc'.split())"), "['a', 'b', 'c']\n");
  }

  #[test]
  fn split_with_separator_and_limit() {
    assert_eq!(run("print('a,b,c'.split(',', 1))"), "['a', 'b,c']\n");
  }

  #[test]
  fn join_and_replace() {
    assert_eq!(
      run("print('-'.join(['x', 'y', 'z']).replace('-', '+'))"),
      "x+y+z\n"
    );
  }

  #[test]
  fn find_and_count() {
    assert_eq!(
      run("s = 'banana'\nprint(s.find('an'), s.find('x'), s.count('a'))"),
      "1 -1 3\n"
    );
  }

  #[test]
  fn prefix_and_suffix() {
    assert_eq!(
      run("print('data.csv'.endswith('.csv'), 'data'.startswith('x'))"),
      "True False\n"
    );
  }

  #[test]
  fn padding() {
    assert_eq!(run("print('7'.zfill(3), 'ab'.rjust(4, '*'))"), "007 **ab\n");
  }

  #[test]
  fn strings_are_immutable() {
    assert_eq!(
      run_err("s = 'abc'\ns[0] = 'x'"),
      "TypeError: 'str' object does not support item assignment"
    );
  }
}

mod indexing {
  use super::*;

  #[test]
  fn negative_index_and_slices() {
    assert_eq!(
      run("s = 'python'\nprint(s[-1], s[1:4], s[::-1])"),
      "n yth nohtyp\n"
    );
  }

  #[test]
  fn out_of_range() {
    assert_eq!(
      run_err("'abc'[5]"),
      "IndexError: string index out of range"
    );
  }

  #[test]
  fn concatenation_and_repetition() {
    assert_eq!(run("print('ab' + 'cd', 'xy' * 3)"), "abcd xyxyxy\n");
  }

  #[test]
  fn concatenating_a_number_fails() {
    assert_eq!(
      run_err("'a' + 1"),
      "TypeError: can only concatenate str (not \"int\") to str"
    );
  }
}

mod formatting {
  use super::*;

  #[test]
  fn fstring_fields() {
    assert_eq!(
      run("name = 'x'\nvalue = 2.5\nprint(f'{name} = {value:.3f}')"),
      "x = 2.500\n"
    );
  }

  #[test]
  fn fstring_expressions_and_repr() {
    assert_eq!(
      run("items = ['a', 2]\nprint(f'{len(items) * 2} {items!r}')"),
      "4 ['a', 2]\n"
    );
  }

  #[test]
  fn format_method_auto_and_named_fields() {
    assert_eq!(
      run("print('{} + {} = {total}'.format(1, 2, total=3))"),
      "1 + 2 = 3\n"
    );
  }

  #[test]
  fn alignment_and_width() {
    assert_eq!(
      run("print('[{:>5}] [{:<4}] [{:^5}]'.format('ab', 'c', 'x'))"),
      "[   ab] [c   ] [  x  ]\n"
    );
  }

  #[test]
  fn percent_operator() {
    assert_eq!(
      run("print('%s has %d items (%.1f%%)' % ('cart', 3, 12.34))"),
      "cart has 3 items (12.3%)\n"
    );
  }

  #[test]
  fn thousands_separator() {
    assert_eq!(run("print(format(1234567, ','))"), "1,234,567\n");
  }

  #[test]
  fn str_and_repr_differ() {
    assert_eq!(run("print(str('a'), repr('a'))"), "a 'a'\n");
  }
}
