use std::path::Path;
use std::rc::Rc;

use tracing::info;

use super::{Frame, Interpreter};
use crate::modules::{Module, SourceStamp};
use crate::syntax::{self, ImportName};
use crate::value::{Namespace, Value};
use crate::{ExceptionKind, InterpreterError};

fn not_found(name: &str) -> InterpreterError {
  InterpreterError::raise(
    ExceptionKind::ModuleNotFoundError,
    format!("No module named '{name}'"),
  )
}

impl Interpreter {
  /// `import a.b.c [as d]`. Without an alias the top-level package is
  /// bound and each submodule is reachable as an attribute.
  pub(crate) fn exec_import(
    &mut self,
    names: &[ImportName],
    frame: &Frame,
  ) -> Result<(), InterpreterError> {
    for ImportName { module, alias } in names {
      let loaded = self.import_module(module)?;
      match alias {
        Some(alias) => self.store(alias, Value::Module(loaded), frame),
        None => {
          let top = self.link_parents(module, loaded)?;
          let first = module.split('.').next().unwrap_or(module);
          self.store(first, Value::Module(top), frame);
        }
      }
    }
    Ok(())
  }

  /// Make `child` an attribute of each enclosing package, creating empty
  /// packages for plain directories. Returns the top-level package.
  fn link_parents(&mut self, name: &str, child: Rc<Module>) -> Result<Rc<Module>, InterpreterError> {
    let Some((parent_name, leaf)) = name.rsplit_once('.') else {
      return Ok(child);
    };
    let parent = match self.import_module(parent_name) {
      Ok(parent) => parent,
      Err(err) if err.kind() == Some(ExceptionKind::ModuleNotFoundError) => {
        let package = Rc::new(Module::native(parent_name, Namespace::new()));
        self.modules.insert(package.clone());
        package
      }
      Err(err) => return Err(err),
    };
    if !parent.namespace.contains(leaf) {
      parent.namespace.set(leaf, Value::Module(child));
    }
    self.link_parents(parent_name, parent)
  }

  /// `from module import a, b as c`.
  pub(crate) fn exec_import_from(
    &mut self,
    module: &str,
    names: &[(String, Option<String>)],
    frame: &Frame,
  ) -> Result<(), InterpreterError> {
    let source = self.import_module(module)?;
    for (name, alias) in names {
      if name == "*" {
        for public in source.namespace.names() {
          if !public.starts_with('_') {
            if let Some(value) = source.namespace.get(&public) {
              self.store(&public, value, frame);
            }
          }
        }
        continue;
      }
      let value = match source.attribute(name) {
        Some(value) => value,
        None => match self.import_module(&format!("{module}.{name}")) {
          Ok(submodule) => Value::Module(submodule),
          Err(_) => {
            return Err(InterpreterError::raise(
              ExceptionKind::ImportError,
              format!("cannot import name '{name}' from '{module}'"),
            ));
          }
        },
      };
      self.store(alias.as_deref().unwrap_or(name), value, frame);
    }
    Ok(())
  }

  /// Return the loaded module `name`, loading it from the search path on
  /// first use.
  pub fn import_module(&mut self, name: &str) -> Result<Rc<Module>, InterpreterError> {
    if let Some(module) = self.modules.get(name) {
      return Ok(module);
    }
    let path = self.search_path.resolve(name).ok_or_else(|| not_found(name))?;
    self.load_source_module(name, &path)
  }

  /// Load a module from a source file. The module is registered before its
  /// body runs so circular imports see the partial namespace; it is
  /// unregistered again if the body fails.
  fn load_source_module(&mut self, name: &str, path: &Path) -> Result<Rc<Module>, InterpreterError> {
    let source = read_source(name, path)?;
    let stamp = SourceStamp::read(path).map_err(|err| import_io_error(name, path, err))?;
    let program = syntax::parse_program(&source)?;
    let namespace = Namespace::new();
    namespace.set("__name__", Value::str(name));
    namespace.set("__file__", Value::str(path.to_string_lossy().into_owned()));
    let module = Rc::new(Module::from_file(name, namespace.clone(), path.to_path_buf(), stamp));
    self.modules.insert(module.clone());
    if let Err(err) = self.exec_module(&program, &namespace) {
      self.modules.remove(name);
      return Err(err);
    }
    info!(module = name, path = %path.display(), "loaded module");
    Ok(module)
  }

  /// Re-run a file-backed module's source in its existing namespace, so
  /// every importer sees the new definitions. A module whose new source
  /// fails to parse keeps its namespace untouched.
  pub fn reload_module(&mut self, module: &Rc<Module>) -> Result<(), InterpreterError> {
    let Some(path) = module.source_path() else {
      return Err(InterpreterError::raise(
        ExceptionKind::ImportError,
        format!("module '{}' has no source file", module.name),
      ));
    };
    let source = read_source(&module.name, &path)?;
    let stamp = SourceStamp::read(&path).map_err(|err| import_io_error(&module.name, &path, err))?;
    let program = syntax::parse_program(&source)?;
    module.set_stamp(stamp);
    self.exec_module(&program, &module.namespace)?;
    info!(module = %module.name, path = %path.display(), "reloaded module");
    Ok(())
  }
}

fn import_io_error(name: &str, path: &Path, err: std::io::Error) -> InterpreterError {
  InterpreterError::raise(
    ExceptionKind::ImportError,
    format!("cannot load module '{name}' from {}: {err}", path.display()),
  )
}

fn read_source(name: &str, path: &Path) -> Result<String, InterpreterError> {
  std::fs::read_to_string(path).map_err(|err| import_io_error(name, path, err))
}
