use std::fmt;

use serde::{Deserialize, Serialize};
use strata_plan::ComponentInstanceAddr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
  Warning,
  Error,
}

/// A message about the apply, attributable to the instance it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
  pub severity: Severity,
  pub summary: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub detail: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub instance: Option<ComponentInstanceAddr>,
}

impl Diagnostic {
  pub fn error(summary: impl Into<String>) -> Self {
    Self {
      severity: Severity::Error,
      summary: summary.into(),
      detail: None,
      instance: None,
    }
  }

  pub fn warning(summary: impl Into<String>) -> Self {
    Self {
      severity: Severity::Warning,
      summary: summary.into(),
      detail: None,
      instance: None,
    }
  }

  pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
    self.detail = Some(detail.into());
    self
  }

  /// Attribute the diagnostic to `instance`, replacing any earlier attribution.
  pub fn for_instance(mut self, instance: &ComponentInstanceAddr) -> Self {
    self.instance = Some(instance.clone());
    self
  }

  pub fn is_error(&self) -> bool {
    self.severity == Severity::Error
  }
}

impl fmt::Display for Diagnostic {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let label = match self.severity {
      Severity::Warning => "warning",
      Severity::Error => "error",
    };
    write!(f, "{}: {}", label, self.summary)?;
    if let Some(instance) = &self.instance {
      write!(f, " ({})", instance)?;
    }
    if let Some(detail) = &self.detail {
      write!(f, ": {}", detail)?;
    }
    Ok(())
  }
}
