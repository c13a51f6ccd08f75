use super::*;
use scratchpad::EngineConfig;
use std::path::Path;

/// Run `source` with `dir` on the module search path.
fn run_with_path(dir: &Path, source: &str) -> Result<String, String> {
  let config = EngineConfig {
    extra_search_paths: vec![dir.to_path_buf()],
    ..EngineConfig::default()
  };
  let capture = OutputCapture::begin();
  let outcome = Interpreter::new(&config).run_main(source);
  let (stdout, _) = capture.finish();
  outcome.map(|_| stdout).map_err(|err| err.describe())
}

fn write(dir: &Path, name: &str, source: &str) {
  let path = dir.join(name);
  if let Some(parent) = path.parent() {
    std::fs::create_dir_all(parent).unwrap();
  }
  std::fs::write(path, source).unwrap();
}

mod imports {
  use super::*;

  #[test]
  fn import_a_helper_file() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "helpers.py", "def double(x):\n    return 2 * x\n");
    assert_eq!(
      run_with_path(dir.path(), "import helpers\nprint(helpers.double(21))"),
      Ok("42\n".to_string())
    );
  }

  #[test]
  fn from_import_with_alias() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "consts.py", "SCALE = 10\nOFFSET = 1\n");
    assert_eq!(
      run_with_path(
        dir.path(),
        "from consts import SCALE as s, OFFSET\nprint(s + OFFSET)"
      ),
      Ok("11\n".to_string())
    );
  }

  #[test]
  fn star_import_skips_private_names() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "stars.py", "visible = 1\n_hidden = 2\n");
    let source = "\
from stars import *
print(visible)
print(_hidden)
";
    assert_eq!(
      run_with_path(dir.path(), source),
      Err("NameError: name '_hidden' is not defined".to_string())
    );
  }

  #[test]
  fn dotted_imports_bind_the_top_package() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "pkg/tools.py", "NAME = 'tools'\n");
    assert_eq!(
      run_with_path(dir.path(), "import pkg.tools\nprint(pkg.tools.NAME)"),
      Ok("tools\n".to_string())
    );
  }

  #[test]
  fn module_level_code_runs_once() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "noisy.py", "print('loading')\n");
    assert_eq!(
      run_with_path(dir.path(), "import noisy\nimport noisy\nprint('done')"),
      Ok("loading\ndone\n".to_string())
    );
  }

  #[test]
  fn module_name_and_file() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "named.py", "x = 1\n");
    assert_eq!(
      run_with_path(
        dir.path(),
        "import named\nprint(named.__name__, named.__file__.endswith('named.py'))"
      ),
      Ok("named True\n".to_string())
    );
  }

  #[test]
  fn failing_module_is_not_cached() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "broken.py", "x = 1 / 0\n");
    let source = "\
try:
    import broken
except ZeroDivisionError:
    print('first')
try:
    import broken
except ZeroDivisionError:
    print('second')
";
    assert_eq!(
      run_with_path(dir.path(), source),
      Ok("first\nsecond\n".to_string())
    );
  }

  #[test]
  fn missing_module() {
    assert_eq!(
      run_err("import does_not_exist"),
      "ModuleNotFoundError: No module named 'does_not_exist'"
    );
  }

  #[test]
  fn missing_name() {
    assert_eq!(
      run_err("from os import nothing_here"),
      "ImportError: cannot import name 'nothing_here' from 'os'"
    );
  }

  #[test]
  fn missing_module_attribute() {
    assert_eq!(
      run_err("import os\nos.nothing"),
      "AttributeError: module 'os' has no attribute 'nothing'"
    );
  }

  #[test]
  fn prelude_names_are_bound() {
    assert_eq!(
      run("print(np.pi > 3, plt.isinteractive(), sys.argv, os.sep)"),
      "True False [''] /\n"
    );
  }

  #[test]
  fn prelude_matplotlib_is_pyplot() {
    assert_eq!(
      run("matplotlib.plot([1, 2, 3])\nprint(matplotlib is plt, plt.get_fignums())"),
      "True [1]\n"
    );
  }

  #[test]
  fn pyplot_through_the_package() {
    assert_eq!(
      run("import matplotlib.pyplot as p\nimport matplotlib\nprint(p is matplotlib.pyplot)"),
      "True\n"
    );
  }
}

mod os_module {
  use super::*;

  #[test]
  fn path_helpers() {
    let source = "\
import os
print(os.path.join('data', 'raw', 'x.csv'))
print(os.path.basename('/a/b/c.txt'), os.path.dirname('/a/b/c.txt'))
print(os.path.splitext('archive.tar.gz'))
";
    assert_eq!(
      run(source),
      "data/raw/x.csv\nc.txt /a/b\n('archive.tar', '.gz')\n"
    );
  }

  #[test]
  fn listdir_is_sorted() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "b.txt", "");
    write(dir.path(), "a.txt", "");
    let source = format!("import os\nprint(os.listdir({:?}))", dir.path().to_string_lossy());
    assert_eq!(run(&source), "['a.txt', 'b.txt']\n");
  }

  #[test]
  fn exists_isfile_isdir() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "f.txt", "abc");
    let root = dir.path().to_string_lossy().into_owned();
    let source = format!(
      "import os\nf = os.path.join({root:?}, 'f.txt')\nprint(os.path.exists(f), os.path.isfile(f), os.path.isdir(f), os.path.getsize(f))"
    );
    assert_eq!(run(&source), "True True False 3\n");
  }

  #[test]
  fn listdir_of_missing_directory() {
    assert!(run_err("import os\nos.listdir('/no/such/dir/here')")
      .starts_with("FileNotFoundError: [Errno 2] No such file or directory"));
  }

  #[test]
  fn getcwd_is_absolute() {
    assert_eq!(run("import os\nprint(os.getcwd()[0])"), "/\n");
  }
}

mod sys_module {
  use super::*;

  #[test]
  fn path_starts_with_the_current_directory() {
    assert_eq!(run("import sys\nprint(sys.path[0] == '')"), "True\n");
  }

  #[test]
  fn path_is_mutable() {
    assert_eq!(
      run("import sys\nsys.path.append('/opt/extra')\nprint(sys.path[-1])"),
      "/opt/extra\n"
    );
  }

  #[test]
  fn assigning_path_redirects_imports() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "relocated.py", "NAME = 'found'\n");
    let source = format!(
      "import sys\nsys.path = [{:?}]\nimport relocated\nprint(relocated.NAME, len(sys.path))",
      dir.path().to_string_lossy()
    );
    assert_eq!(run(&source), "found 1\n");
  }

  #[test]
  fn path_cannot_be_deleted_or_replaced_by_a_string() {
    assert_eq!(
      run_err("import sys\ndel sys.path"),
      "TypeError: cannot delete sys.path"
    );
    assert_eq!(
      run_err("import sys\nsys.path = '/tmp'"),
      "TypeError: sys.path must be a list, not 'str'"
    );
  }

  #[test]
  fn configured_argv() {
    let config = EngineConfig {
      argv: vec!["script.py".to_string(), "--fast".to_string()],
      ..EngineConfig::default()
    };
    let capture = OutputCapture::begin();
    Interpreter::new(&config)
      .run_main("import sys\nprint(sys.argv)")
      .unwrap();
    assert_eq!(capture.finish().0, "['script.py', '--fast']\n");
  }

  #[test]
  fn version_and_platform() {
    assert_eq!(
      run("import sys\nprint(sys.version.startswith('scratchpad'), type(sys.platform))"),
      "True <class 'str'>\n"
    );
  }
}
