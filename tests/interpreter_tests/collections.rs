use super::*;

mod lists {
  use super::*;

  #[test]
  fn append_extend_insert() {
    assert_eq!(
      run("xs = [1]\nxs.append(2)\nxs.extend([3, 4])\nxs.insert(0, 0)\nprint(xs)"),
      "[0, 1, 2, 3, 4]\n"
    );
  }

  #[test]
  fn pop_and_remove() {
    assert_eq!(
      run("xs = [1, 2, 3, 2]\nlast = xs.pop()\nxs.remove(2)\nprint(last, xs)"),
      "2 [1, 3]\n"
    );
  }

  #[test]
  fn pop_from_empty_list() {
    assert_eq!(run_err("[].pop()"), "IndexError: pop from empty list");
  }

  #[test]
  fn sort_in_place_with_key_and_reverse() {
    assert_eq!(
      run("xs = ['ccc', 'a', 'bb']\nxs.sort(key=len, reverse=True)\nprint(xs)"),
      "['ccc', 'bb', 'a']\n"
    );
  }

  #[test]
  fn sorted_leaves_the_original_alone() {
    assert_eq!(
      run("xs = [3, 1, 2]\nys = sorted(xs)\nprint(xs, ys)"),
      "[3, 1, 2] [1, 2, 3]\n"
    );
  }

  #[test]
  fn aliases_share_mutations() {
    assert_eq!(run("a = [1]\nb = a\nb.append(2)\nprint(a)"), "[1, 2]\n");
  }

  #[test]
  fn augmented_add_extends_in_place() {
    assert_eq!(run("a = [1]\nb = a\nb += [2]\nprint(a)"), "[1, 2]\n");
  }

  #[test]
  fn slicing() {
    assert_eq!(
      run("xs = list(range(10))\nprint(xs[2:5], xs[::3], xs[-2:])"),
      "[2, 3, 4] [0, 3, 6, 9] [8, 9]\n"
    );
  }

  #[test]
  fn slice_assignment() {
    assert_eq!(
      run("xs = [1, 2, 3, 4]\nxs[1:3] = ['a']\nprint(xs)"),
      "[1, 'a', 4]\n"
    );
  }

  #[test]
  fn index_out_of_range() {
    assert_eq!(run_err("[1, 2][2]"), "IndexError: list index out of range");
  }

  #[test]
  fn delete_items() {
    assert_eq!(run("xs = [1, 2, 3]\ndel xs[0]\nprint(xs)"), "[2, 3]\n");
  }

  #[test]
  fn membership() {
    assert_eq!(run("print(2 in [1, 2], 5 not in [1, 2])"), "True True\n");
  }

  #[test]
  fn repetition_beyond_memory_fails() {
    assert_eq!(
      run_err("xs = [0] * 10 ** 12"),
      "MemoryError: cannot build a sequence of 1000000000000 elements"
    );
    assert_eq!(
      run_err("s = 'ab' * 10 ** 12"),
      "MemoryError: cannot build a sequence of 2000000000000 elements"
    );
  }

  #[test]
  fn list_containing_itself() {
    assert_eq!(
      run("xs = [1]\nxs.append(xs)\nprint(xs, len(xs[1][1]))"),
      "[1, [...]] 2\n"
    );
  }

  #[test]
  fn comprehension_with_condition() {
    assert_eq!(
      run("print([x * x for x in range(6) if x % 2 == 0])"),
      "[0, 4, 16]\n"
    );
  }
}

mod tuples {
  use super::*;

  #[test]
  fn unpacking() {
    assert_eq!(run("a, b = 1, 2\na, b = b, a\nprint(a, b)"), "2 1\n");
  }

  #[test]
  fn single_element_repr() {
    assert_eq!(run("print((1,), tuple([1, 2]))"), "(1,) (1, 2)\n");
  }

  #[test]
  fn unpacking_too_few_values() {
    assert_eq!(
      run_err("a, b, c = [1, 2]"),
      "ValueError: not enough values to unpack (expected 3, got 2)"
    );
  }

  #[test]
  fn unpacking_too_many_values() {
    assert_eq!(
      run_err("a, b = [1, 2, 3]"),
      "ValueError: too many values to unpack (expected 2)"
    );
  }

  #[test]
  fn tuples_are_immutable() {
    assert_eq!(
      run_err("t = (1, 2)\nt[0] = 5"),
      "TypeError: 'tuple' object does not support item assignment"
    );
  }
}

mod dicts {
  use super::*;

  #[test]
  fn insertion_order_is_preserved() {
    assert_eq!(
      run("d = {'b': 1}\nd['a'] = 2\nd['b'] = 3\nprint(d)"),
      "{'b': 3, 'a': 2}\n"
    );
  }

  #[test]
  fn get_with_default() {
    assert_eq!(
      run("d = {'a': 1}\nprint(d.get('a'), d.get('z'), d.get('z', 0))"),
      "1 None 0\n"
    );
  }

  #[test]
  fn missing_key() {
    assert_eq!(run_err("d = {}\nd['k']"), "KeyError: 'k'");
  }

  #[test]
  fn keys_values_items() {
    assert_eq!(
      run("d = {'x': 1, 'y': 2}\nprint(d.keys(), d.values(), d.items())"),
      "['x', 'y'] [1, 2] [('x', 1), ('y', 2)]\n"
    );
  }

  #[test]
  fn iterate_items() {
    assert_eq!(
      run("d = {'x': 1, 'y': 2}\nfor k, v in d.items():\n    print(k, v)"),
      "x 1\ny 2\n"
    );
  }

  #[test]
  fn setdefault_and_update() {
    assert_eq!(
      run("d = {}\nd.setdefault('a', []).append(1)\nd.update({'b': 2})\nprint(d)"),
      "{'a': [1], 'b': 2}\n"
    );
  }

  #[test]
  fn len_and_membership() {
    assert_eq!(run("d = {1: 'a'}\nprint(len(d), 1 in d, 'a' in d)"), "1 True False\n");
  }

  #[test]
  fn dict_containing_itself() {
    assert_eq!(
      run("d = {'a': 1}\nd['self'] = d\nprint(d, d == d['self'])"),
      "{'a': 1, 'self': {...}} True\n"
    );
  }

  #[test]
  fn unhashable_keys_are_rejected() {
    assert_eq!(
      run_err("d = {[1]: 2}"),
      "TypeError: unhashable type: 'list'"
    );
  }
}

mod iteration_builtins {
  use super::*;

  #[test]
  fn enumerate_with_start() {
    assert_eq!(
      run("print(list(enumerate(['a', 'b'], 1)))"),
      "[(1, 'a'), (2, 'b')]\n"
    );
  }

  #[test]
  fn zip_stops_at_the_shortest() {
    assert_eq!(
      run("print(list(zip([1, 2, 3], 'ab')))"),
      "[(1, 'a'), (2, 'b')]\n"
    );
  }

  #[test]
  fn range_forms() {
    assert_eq!(
      run("print(list(range(3)), list(range(1, 7, 2)), list(range(3, 0, -1)))"),
      "[0, 1, 2] [1, 3, 5] [3, 2, 1]\n"
    );
  }

  #[test]
  fn reversed_and_any_all() {
    assert_eq!(
      run("print(reversed([1, 2, 3]), any([0, 1]), all([1, 0]))"),
      "[3, 2, 1] True False\n"
    );
  }
}
