//! Picking up edits to helper modules between executions.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::evaluator::Interpreter;
use crate::modules::{ModuleTable, SourceStamp};

/// A loaded module whose source file sits in the working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReloadCandidate {
  pub name: String,
  pub path: PathBuf,
}

pub struct ModuleReloadPolicy;

/// The directory a module "lives" in. Files under a `__pycache__`
/// directory belong to its parent.
fn home_directory(path: &Path) -> Option<PathBuf> {
  let resolved = path.canonicalize().ok()?;
  let parent = resolved.parent()?;
  if parent.file_name().is_some_and(|name| name == "__pycache__") {
    return parent.parent().map(Path::to_path_buf);
  }
  Some(parent.to_path_buf())
}

impl ModuleReloadPolicy {
  /// File-backed modules whose source resolves directly under `dir`.
  /// Modules whose file has disappeared are not candidates.
  pub fn candidates(modules: &ModuleTable, dir: &Path) -> Vec<ReloadCandidate> {
    let Ok(dir) = dir.canonicalize() else {
      return Vec::new();
    };
    modules
      .file_backed()
      .filter_map(|module| {
        let path = module.source_path()?;
        (home_directory(&path)? == dir).then(|| ReloadCandidate {
          name: module.name.clone(),
          path,
        })
      })
      .collect()
  }

  /// Reload every candidate under `dir` whose source changed since it was
  /// loaded. Failures are logged and skipped. Returns how many modules
  /// were reloaded.
  pub fn refresh(interp: &mut Interpreter, dir: &Path) -> usize {
    let mut reloaded = 0;
    for candidate in Self::candidates(&interp.modules, dir) {
      let Some(module) = interp.modules.get(&candidate.name) else {
        debug!(module = %candidate.name, "module vanished before reload");
        continue;
      };
      let current = match SourceStamp::read(&candidate.path) {
        Ok(stamp) => stamp,
        Err(err) => {
          debug!(module = %candidate.name, %err, "cannot stat module source; skipping");
          continue;
        }
      };
      if module.stamp() == Some(current) {
        continue;
      }
      debug!(module = %candidate.name, path = %candidate.path.display(), "source changed; reloading");
      let outcome = catch_unwind(AssertUnwindSafe(|| interp.reload_module(&module)));
      match outcome {
        Ok(Ok(())) => reloaded += 1,
        Ok(Err(err)) => {
          debug!(module = %candidate.name, err = %err.describe(), "reload failed; skipping");
        }
        Err(_) => debug!(module = %candidate.name, "reload panicked; skipping"),
      }
    }
    reloaded
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn pycache_files_belong_to_the_parent_directory() {
    let dir = tempfile::tempdir().unwrap();
    let cache = dir.path().join("__pycache__");
    std::fs::create_dir(&cache).unwrap();
    let file = cache.join("helper.py");
    std::fs::write(&file, "x = 1\n").unwrap();
    assert_eq!(
      home_directory(&file).unwrap(),
      dir.path().canonicalize().unwrap()
    );
  }
}
