use serde::{Deserialize, Serialize};

/// Tunables for a single apply run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyOptions {
  /// Upper bound on apply actions running at the same time. Unbounded when unset.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub max_concurrency: Option<usize>,
  /// Emit a warning diagnostic for every skipped instance.
  #[serde(default = "default_surface_skipped")]
  pub surface_skipped: bool,
}

fn default_surface_skipped() -> bool {
  true
}

impl Default for ApplyOptions {
  fn default() -> Self {
    Self {
      max_concurrency: None,
      surface_skipped: default_surface_skipped(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_defaults_from_empty_object() {
    let options: ApplyOptions = serde_json::from_str("{}").unwrap();
    assert_eq!(options, ApplyOptions::default());
    assert!(options.surface_skipped);
    assert_eq!(options.max_concurrency, None);
  }
}
