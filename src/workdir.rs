use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::modules::SearchPath;
use crate::value::Value;

/// Scoped change of the process working directory and module search path.
///
/// `enter` always records where the process was, even when no target is
/// given, so that a snippet calling `os.chdir` is undone as well. The
/// previous directory and search path come back on `exit` or drop.
pub struct WorkingDirectoryScope {
  original_dir: Option<PathBuf>,
  search_path: SearchPath,
  saved_path: Vec<Value>,
  entered: Option<PathBuf>,
  closed: bool,
}

impl WorkingDirectoryScope {
  pub fn enter(target: Option<&Path>, search_path: &SearchPath) -> Self {
    let original_dir = match std::env::current_dir() {
      Ok(dir) => Some(dir),
      Err(err) => {
        warn!(%err, "cannot read current directory; it will not be restored");
        None
      }
    };
    let mut scope = WorkingDirectoryScope {
      original_dir,
      search_path: search_path.clone(),
      saved_path: search_path.snapshot(),
      entered: None,
      closed: false,
    };

    let Some(target) = target else {
      return scope;
    };
    if !target.is_dir() {
      debug!(target = %target.display(), "working directory missing; staying put");
      return scope;
    }
    let target = target
      .canonicalize()
      .unwrap_or_else(|_| target.to_path_buf());
    if let Err(err) = std::env::set_current_dir(&target) {
      warn!(target = %target.display(), %err, "cannot enter working directory");
      return scope;
    }
    let entry = target.to_string_lossy().into_owned();
    if !search_path.contains(&entry) {
      search_path.insert_front(entry);
    }
    scope.entered = Some(target);
    scope
  }

  /// The directory actually entered, if the target was usable.
  pub fn entered(&self) -> Option<&Path> {
    self.entered.as_deref()
  }

  /// Restore directory and search path. Each step is attempted on its own
  /// and failures are only logged. Calling this twice is harmless.
  pub fn exit(&mut self) {
    if self.closed {
      return;
    }
    self.closed = true;

    if let Some(original) = &self.original_dir {
      if let Err(err) = std::env::set_current_dir(original) {
        warn!(dir = %original.display(), %err, "cannot restore working directory");
      }
    }

    let saved = std::mem::take(&mut self.saved_path);
    match self.search_path.try_restore(saved) {
      Ok(true) => debug!("search path changes undone"),
      Ok(false) => {}
      Err(err) => warn!(%err, "cannot restore module search path"),
    }
  }
}

impl Drop for WorkingDirectoryScope {
  fn drop(&mut self) {
    self.exit();
  }
}
