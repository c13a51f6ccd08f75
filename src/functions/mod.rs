// Host capabilities reachable from snippet code, organized by module
pub mod builtins;
pub mod format;
pub mod methods;
pub mod numeric;
pub mod os;
pub mod plot;
pub mod pyplot;
pub mod random;
pub mod sys;

use std::rc::Rc;

use crate::modules::{Module, ModuleTable, SearchPath};
use crate::value::{NativeFn, Namespace, Value};

fn native_namespace(functions: &[(&'static str, NativeFn)]) -> Namespace {
  let ns = Namespace::new();
  for &(name, func) in functions {
    ns.set(name, Value::native(name, func));
  }
  ns
}

fn numpy_random() -> Module {
  Module::native(
    "numpy.random",
    native_namespace(&[
      ("seed", random::seed),
      ("rand", random::rand),
      ("randn", random::randn),
      ("normal", random::normal),
      ("uniform", random::uniform),
      ("randint", random::randint),
    ]),
  )
}

fn numpy(random: &Rc<Module>) -> Module {
  let ns = native_namespace(&[
    ("array", numeric::np_array),
    ("arange", numeric::np_arange),
    ("linspace", numeric::np_linspace),
    ("zeros", numeric::np_zeros),
    ("ones", numeric::np_ones),
    ("sin", numeric::np_sin),
    ("cos", numeric::np_cos),
    ("tan", numeric::np_tan),
    ("exp", numeric::np_exp),
    ("log", numeric::np_log),
    ("sqrt", numeric::np_sqrt),
    ("abs", numeric::np_abs),
    ("sum", numeric::np_sum),
    ("mean", numeric::np_mean),
    ("min", numeric::np_min),
    ("max", numeric::np_max),
    ("std", numeric::np_std),
    ("cumsum", numeric::np_cumsum),
  ]);
  ns.set("pi", Value::Float(std::f64::consts::PI));
  ns.set("e", Value::Float(std::f64::consts::E));
  ns.set("inf", Value::Float(f64::INFINITY));
  ns.set("nan", Value::Float(f64::NAN));
  ns.set("random", Value::Module(random.clone()));
  Module::native("numpy", ns)
}

fn pyplot() -> Module {
  Module::native(
    "matplotlib.pyplot",
    native_namespace(&[
      ("figure", pyplot::plt_figure),
      ("subplots", pyplot::plt_subplots),
      ("subplot", pyplot::plt_subplot),
      ("plot", pyplot::plt_plot),
      ("scatter", pyplot::plt_scatter),
      ("bar", pyplot::plt_bar),
      ("hist", pyplot::plt_hist),
      ("title", pyplot::plt_title),
      ("suptitle", pyplot::plt_suptitle),
      ("xlabel", pyplot::plt_xlabel),
      ("ylabel", pyplot::plt_ylabel),
      ("xlim", pyplot::plt_xlim),
      ("ylim", pyplot::plt_ylim),
      ("legend", pyplot::plt_legend),
      ("grid", pyplot::plt_grid),
      ("cla", pyplot::plt_cla),
      ("show", pyplot::plt_show),
      ("close", pyplot::plt_close),
      ("clf", pyplot::plt_clf),
      ("gcf", pyplot::plt_gcf),
      ("gca", pyplot::plt_gca),
      ("get_fignums", pyplot::plt_get_fignums),
      ("savefig", pyplot::plt_savefig),
      ("ion", pyplot::plt_ion),
      ("ioff", pyplot::plt_ioff),
      ("isinteractive", pyplot::plt_isinteractive),
      ("tight_layout", pyplot::plt_tight_layout),
    ]),
  )
}

/// Register the allow-listed native modules. Parent packages expose their
/// submodules as attributes, so `import matplotlib.pyplot` followed by
/// `matplotlib.pyplot.plot(...)` works.
pub fn register_native_modules(
  table: &mut ModuleTable,
  search_path: &SearchPath,
  argv: &[String],
) {
  let random = Rc::new(numpy_random());
  let numpy = Rc::new(numpy(&random));

  let pyplot = Rc::new(pyplot());
  let matplotlib_ns = Namespace::new();
  matplotlib_ns.set("pyplot", Value::Module(pyplot.clone()));
  let matplotlib = Rc::new(Module::native("matplotlib", matplotlib_ns));

  let path = Rc::new(Module::native("os.path", os::path_namespace()));
  let os_ns = os::os_namespace();
  os_ns.set("path", Value::Module(path.clone()));
  let os = Rc::new(Module::native("os", os_ns));

  let sys = Rc::new(Module::native("sys", sys::namespace(search_path, argv)));

  for module in [random, numpy, pyplot, matplotlib, path, os, sys] {
    table.insert(module);
  }
}
