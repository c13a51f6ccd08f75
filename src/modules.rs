use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::SystemTime;

use crate::value::{Namespace, Value};

/// Identifies one version of a module's source file on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceStamp {
  pub modified: Option<SystemTime>,
  pub len: u64,
}

impl SourceStamp {
  pub fn read(path: &Path) -> std::io::Result<Self> {
    let meta = std::fs::metadata(path)?;
    Ok(SourceStamp {
      modified: meta.modified().ok(),
      len: meta.len(),
    })
  }
}

#[derive(Debug, Clone)]
struct ModuleSource {
  path: PathBuf,
  stamp: SourceStamp,
}

/// A loaded module. Native modules have no backing file.
pub struct Module {
  pub name: String,
  pub namespace: Namespace,
  source: RefCell<Option<ModuleSource>>,
}

impl Module {
  pub fn native(name: impl Into<String>, namespace: Namespace) -> Self {
    Module {
      name: name.into(),
      namespace,
      source: RefCell::new(None),
    }
  }

  pub fn from_file(
    name: impl Into<String>,
    namespace: Namespace,
    path: PathBuf,
    stamp: SourceStamp,
  ) -> Self {
    Module {
      name: name.into(),
      namespace,
      source: RefCell::new(Some(ModuleSource { path, stamp })),
    }
  }

  pub fn is_native(&self) -> bool {
    self.source.borrow().is_none()
  }

  pub fn source_path(&self) -> Option<PathBuf> {
    self.source.borrow().as_ref().map(|s| s.path.clone())
  }

  pub fn stamp(&self) -> Option<SourceStamp> {
    self.source.borrow().as_ref().map(|s| s.stamp)
  }

  pub fn set_stamp(&self, stamp: SourceStamp) {
    if let Some(source) = self.source.borrow_mut().as_mut() {
      source.stamp = stamp;
    }
  }

  pub fn attribute(&self, name: &str) -> Option<Value> {
    self.namespace.get(name)
  }

  pub fn repr(&self) -> String {
    match self.source_path() {
      Some(path) => format!("<module '{}' from '{}'>", self.name, path.display()),
      None => format!("<module '{}' (built-in)>", self.name),
    }
  }
}

/// Every module imported so far, by dotted name.
#[derive(Default)]
pub struct ModuleTable {
  modules: BTreeMap<String, Rc<Module>>,
}

impl ModuleTable {
  pub fn get(&self, name: &str) -> Option<Rc<Module>> {
    self.modules.get(name).cloned()
  }

  pub fn insert(&mut self, module: Rc<Module>) {
    self.modules.insert(module.name.clone(), module);
  }

  pub fn remove(&mut self, name: &str) -> Option<Rc<Module>> {
    self.modules.remove(name)
  }

  pub fn contains(&self, name: &str) -> bool {
    self.modules.contains_key(name)
  }

  pub fn names(&self) -> Vec<String> {
    self.modules.keys().cloned().collect()
  }

  /// Modules loaded from a source file, in name order.
  pub fn file_backed(&self) -> impl Iterator<Item = &Rc<Module>> {
    self.modules.values().filter(|m| !m.is_native())
  }
}

/// The module search path. It shares storage with the `sys.path` list,
/// so snippet code and the host see the same entries.
#[derive(Clone)]
pub struct SearchPath(Rc<RefCell<Vec<Value>>>);

impl SearchPath {
  pub fn new(entries: impl IntoIterator<Item = String>) -> Self {
    SearchPath(Rc::new(RefCell::new(
      entries.into_iter().map(Value::Str).collect(),
    )))
  }

  /// The `sys.path` list value.
  pub fn as_value(&self) -> Value {
    Value::List(self.0.clone())
  }

  pub fn entries(&self) -> Vec<String> {
    self
      .0
      .borrow()
      .iter()
      .filter_map(|v| v.as_str().map(str::to_string))
      .collect()
  }

  pub fn contains(&self, entry: &str) -> bool {
    self.0.borrow().iter().any(|v| v.as_str() == Some(entry))
  }

  pub fn insert_front(&self, entry: impl Into<String>) {
    self.0.borrow_mut().insert(0, Value::Str(entry.into()));
  }

  pub fn push(&self, entry: impl Into<String>) {
    self.0.borrow_mut().push(Value::Str(entry.into()));
  }

  pub fn snapshot(&self) -> Vec<Value> {
    self.0.borrow().clone()
  }

  /// Put back a snapshot; returns whether anything differed. Fails only
  /// if the list is borrowed elsewhere.
  pub fn try_restore(
    &self,
    saved: Vec<Value>,
  ) -> Result<bool, std::cell::BorrowMutError> {
    let mut current = self.0.try_borrow_mut()?;
    let changed = current.len() != saved.len()
      || current.iter().zip(&saved).any(|(a, b)| !a.py_eq(b));
    *current = saved;
    Ok(changed)
  }

  /// Find `<name>.py` in the first entry that has it. An empty entry
  /// stands for the current directory.
  pub fn resolve(&self, module: &str) -> Option<PathBuf> {
    let relative: PathBuf = module.split('.').collect();
    let file = relative.with_extension("py");
    self.entries().into_iter().find_map(|entry| {
      let dir = if entry.is_empty() {
        PathBuf::from(".")
      } else {
        PathBuf::from(entry)
      };
      let candidate = dir.join(&file);
      candidate
        .is_file()
        .then(|| candidate.canonicalize().unwrap_or(candidate))
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn resolves_modules_from_absolute_entries() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("helper.py"), "x = 1\n").unwrap();
    let path = SearchPath::new([dir.path().to_string_lossy().into_owned()]);
    let found = path.resolve("helper").unwrap();
    assert_eq!(found.file_name().unwrap(), "helper.py");
    assert!(path.resolve("missing").is_none());
  }

  #[test]
  fn restore_reports_changes() {
    let path = SearchPath::new(["a".to_string()]);
    let saved = path.snapshot();
    assert!(!path.try_restore(saved.clone()).unwrap());
    path.insert_front("b");
    assert!(path.try_restore(saved).unwrap());
    assert_eq!(path.entries(), vec!["a".to_string()]);
  }

  #[test]
  fn stamp_tracks_length() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("m.py");
    std::fs::write(&file, "a = 1\n").unwrap();
    let first = SourceStamp::read(&file).unwrap();
    std::fs::write(&file, "a = 100\n").unwrap();
    assert_ne!(first, SourceStamp::read(&file).unwrap());
  }
}
