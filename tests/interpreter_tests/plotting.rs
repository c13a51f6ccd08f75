use super::*;

mod registry {
  use super::*;

  #[test]
  fn drawing_creates_a_figure() {
    assert_eq!(
      run("plt.plot([1, 2, 3], [4, 5, 6])\nprint(plt.get_fignums())"),
      "[1]\n"
    );
  }

  #[test]
  fn figures_are_numbered_in_order() {
    let source = "\
a = plt.figure()
b = plt.figure()
c = plt.figure(7)
print(a.number, b.number, c.number, plt.get_fignums())
";
    assert_eq!(run(source), "1 2 7 [1, 2, 7]\n");
  }

  #[test]
  fn close_all_empties_the_registry() {
    let source = "\
plt.figure()
plt.figure()
plt.close('all')
print(plt.get_fignums())
";
    assert_eq!(run(source), "[]\n");
  }

  #[test]
  fn close_one_figure_by_number() {
    let source = "\
plt.figure()
plt.figure()
plt.close(1)
print(plt.get_fignums())
";
    assert_eq!(run(source), "[2]\n");
  }

  #[test]
  fn figure_repr_reports_size_and_axes() {
    assert_eq!(
      run("plt.plot([1, 2])\nprint(plt.gcf())"),
      "<Figure size 640x480 with 1 Axes>\n"
    );
  }

  #[test]
  fn figsize_is_in_inches() {
    assert_eq!(
      run("fig, ax = plt.subplots(figsize=(4, 3))\nprint(fig)"),
      "<Figure size 400x300 with 1 Axes>\n"
    );
  }

  #[test]
  fn show_keeps_figures_registered() {
    assert_eq!(
      run("plt.plot([1, 2])\nplt.show()\nprint(plt.get_fignums())"),
      "[1]\n"
    );
  }

  #[test]
  fn interactive_mode_can_be_toggled() {
    assert_eq!(
      run("plt.ion()\na = plt.isinteractive()\nplt.ioff()\nprint(a, plt.isinteractive())"),
      "True False\n"
    );
  }
}

mod axes {
  use super::*;

  #[test]
  fn subplots_grid_shape() {
    let source = "\
fig, axes = plt.subplots(2, 3)
print(len(axes), len(axes[0]), len(fig.axes))
";
    assert_eq!(run(source), "2 3 6\n");
  }

  #[test]
  fn single_row_subplots_are_flat() {
    assert_eq!(
      run("fig, axes = plt.subplots(1, 2)\nprint(len(axes))"),
      "2\n"
    );
  }

  #[test]
  fn titles_round_trip() {
    let source = "\
fig, ax = plt.subplots()
ax.set_title('Signal')
plt.xlabel('t')
print(ax.get_title())
";
    assert_eq!(run(source), "Signal\n");
  }

  #[test]
  fn explicit_limits() {
    assert_eq!(
      run("plt.plot([0, 1])\nplt.xlim(0, 10)\nprint(plt.xlim())"),
      "(0.0, 10.0)\n"
    );
  }

  #[test]
  fn hist_returns_counts_and_edges() {
    let source = "\
counts, edges, _ = plt.hist([1, 2, 2, 3], bins=2)
print(counts, edges)
";
    assert_eq!(run(source), "[1. 3.] [1. 2. 3.]\n");
  }

  #[test]
  fn mismatched_lengths() {
    assert_eq!(
      run_err("plt.plot([1, 2, 3], [1, 2])"),
      "ValueError: x and y must have same first dimension, but have shapes (3,) and (2,)"
    );
  }

  #[test]
  fn subplot_index_out_of_range() {
    assert_eq!(
      run_err("plt.subplot(2, 1, 3)"),
      "ValueError: num must be an integer with 1 <= num <= 2, not 3"
    );
  }

  #[test]
  fn oversized_subplot_grids_are_rejected() {
    assert_eq!(
      run_err("plt.subplots(100000, 100000)"),
      "ValueError: a 100000x100000 subplot grid is too large (at most 1024 axes)"
    );
    assert_eq!(run("print(plt.get_fignums())"), "[]\n");
    assert_eq!(
      run_err("plt.subplot(100000, 100000, 1)"),
      "ValueError: a 100000x100000 subplot grid is too large (at most 1024 axes)"
    );
  }

  #[test]
  fn unknown_axes_method() {
    assert_eq!(
      run_err("fig, ax = plt.subplots()\nax.frobnicate()"),
      "AttributeError: 'Axes' object has no attribute 'frobnicate'"
    );
  }
}

mod saving {
  use super::*;

  #[test]
  fn savefig_writes_svg() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chart.svg");
    let source = format!(
      "x = np.linspace(0, 6, 20)\nplt.plot(x, np.sin(x), 'r--', label='sin')\nplt.legend()\nplt.savefig({:?})",
      path.to_string_lossy()
    );
    run(&source);
    let svg = std::fs::read_to_string(&path).unwrap();
    assert!(svg.contains("<svg"));
  }

  #[test]
  fn savefig_rejects_raster_formats() {
    assert_eq!(
      run_err("plt.plot([1, 2])\nplt.savefig('out.png')"),
      "ValueError: Format 'png' is not supported (supported formats: svg)"
    );
  }
}
