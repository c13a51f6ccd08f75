use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::evaluator::DEFAULT_RECURSION_LIMIT;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
  #[error("cannot read config file {path}: {source}")]
  Read {
    path: PathBuf,
    source: std::io::Error,
  },
  #[error("invalid config file {path}: {source}")]
  Parse {
    path: PathBuf,
    source: serde_json::Error,
  },
}

/// Engine settings. Every field may be omitted from a config file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
  /// Appended to `sys.path` after the current-directory entry.
  pub extra_search_paths: Vec<PathBuf>,
  /// Exposed to snippets as `sys.argv`.
  pub argv: Vec<String>,
  pub recursion_limit: usize,
  /// Seeds `numpy.random` for reproducible runs.
  pub seed: Option<u64>,
}

impl Default for EngineConfig {
  fn default() -> Self {
    EngineConfig {
      extra_search_paths: Vec::new(),
      argv: vec![String::new()],
      recursion_limit: DEFAULT_RECURSION_LIMIT,
      seed: None,
    }
  }
}

impl EngineConfig {
  pub fn from_json_str(text: &str) -> Result<Self, serde_json::Error> {
    serde_json::from_str(text)
  }

  pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    Self::from_json_str(&text).map_err(|source| ConfigError::Parse {
      path: path.to_path_buf(),
      source,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn missing_fields_take_defaults() {
    let config = EngineConfig::from_json_str(r#"{"seed": 42}"#).unwrap();
    assert_eq!(config.seed, Some(42));
    assert_eq!(config.recursion_limit, DEFAULT_RECURSION_LIMIT);
    assert!(config.extra_search_paths.is_empty());
  }

  #[test]
  fn unknown_fields_are_rejected() {
    assert!(EngineConfig::from_json_str(r#"{"sed": 1}"#).is_err());
  }
}
