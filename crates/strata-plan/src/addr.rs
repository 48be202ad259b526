//! Addresses for stacks, components and component instances.
//!
//! Every address has a canonical string form which is used for display,
//! serialization and parsing:
//!
//! ```text
//! component.a
//! stack.network.component.vpc
//! component.b["i"]
//! component.c[0]
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::PlanError;

/// Path of stack calls from the root stack. The root stack has an empty path.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StackAddr(Vec<String>);

impl StackAddr {
  pub fn root() -> Self {
    Self(Vec::new())
  }

  pub fn child(&self, name: impl Into<String>) -> Self {
    let mut path = self.0.clone();
    path.push(name.into());
    Self(path)
  }

  pub fn is_root(&self) -> bool {
    self.0.is_empty()
  }

  pub fn path(&self) -> &[String] {
    &self.0
  }
}

impl fmt::Display for StackAddr {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for (i, name) in self.0.iter().enumerate() {
      if i > 0 {
        f.write_str(".")?;
      }
      write!(f, "stack.{}", name)?;
    }
    Ok(())
  }
}

/// A statically declared component within a stack.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ComponentAddr {
  pub stack: StackAddr,
  pub name: String,
}

impl ComponentAddr {
  pub fn new(stack: StackAddr, name: impl Into<String>) -> Self {
    Self {
      stack,
      name: name.into(),
    }
  }

  /// A component in the root stack.
  pub fn root(name: impl Into<String>) -> Self {
    Self::new(StackAddr::root(), name)
  }

  /// Address of one instance of this component.
  pub fn instance(&self, key: InstanceKey) -> ComponentInstanceAddr {
    ComponentInstanceAddr {
      component: self.clone(),
      key,
    }
  }
}

impl fmt::Display for ComponentAddr {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if !self.stack.is_root() {
      write!(f, "{}.", self.stack)?;
    }
    write!(f, "component.{}", self.name)
  }
}

impl FromStr for ComponentAddr {
  type Err = PlanError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let invalid = |reason: &str| PlanError::InvalidAddress {
      address: s.to_string(),
      reason: reason.to_string(),
    };

    let parts: Vec<&str> = s.split('.').collect();
    if parts.len() < 2 || parts.len() % 2 != 0 {
      return Err(invalid("expected a sequence of 'stack.NAME' ending in 'component.NAME'"));
    }

    let mut stack = StackAddr::root();
    let (stack_parts, component_parts) = parts.split_at(parts.len() - 2);
    for pair in stack_parts.chunks(2) {
      if pair[0] != "stack" {
        return Err(invalid(&format!("unexpected '{}', expected 'stack'", pair[0])));
      }
      validate_name(pair[1]).map_err(|reason| invalid(&reason))?;
      stack = stack.child(pair[1]);
    }

    if component_parts[0] != "component" {
      return Err(invalid(&format!(
        "unexpected '{}', expected 'component'",
        component_parts[0]
      )));
    }
    validate_name(component_parts[1]).map_err(|reason| invalid(&reason))?;

    Ok(Self::new(stack, component_parts[1]))
  }
}

/// Distinguishes the instances of a repeated component.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum InstanceKey {
  /// The component is not repeated.
  #[default]
  NoKey,
  Int(i64),
  Str(String),
}

impl From<Option<strata_config::InstanceKeyDef>> for InstanceKey {
  fn from(def: Option<strata_config::InstanceKeyDef>) -> Self {
    match def {
      None => Self::NoKey,
      Some(strata_config::InstanceKeyDef::Int(i)) => Self::Int(i),
      Some(strata_config::InstanceKeyDef::Str(s)) => Self::Str(s),
    }
  }
}

impl fmt::Display for InstanceKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::NoKey => Ok(()),
      Self::Int(i) => write!(f, "[{}]", i),
      Self::Str(s) => write!(f, "[\"{}\"]", s.replace('\\', "\\\\").replace('"', "\\\"")),
    }
  }
}

impl FromStr for InstanceKey {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    if s.is_empty() {
      return Ok(Self::NoKey);
    }
    let inner = s
      .strip_prefix('[')
      .and_then(|rest| rest.strip_suffix(']'))
      .ok_or_else(|| format!("instance key '{}' must be enclosed in brackets", s))?;

    if let Some(quoted) = inner.strip_prefix('"').and_then(|rest| rest.strip_suffix('"')) {
      return Ok(Self::Str(quoted.replace("\\\"", "\"").replace("\\\\", "\\")));
    }

    inner
      .parse::<i64>()
      .map(Self::Int)
      .map_err(|_| format!("instance key '{}' is neither an integer nor a quoted string", inner))
  }
}

/// One runtime instance of a component.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ComponentInstanceAddr {
  pub component: ComponentAddr,
  pub key: InstanceKey,
}

impl fmt::Display for ComponentInstanceAddr {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}{}", self.component, self.key)
  }
}

impl FromStr for ComponentInstanceAddr {
  type Err = PlanError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let (component, key) = match s.find('[') {
      Some(idx) => s.split_at(idx),
      None => (s, ""),
    };
    let component = component.parse::<ComponentAddr>()?;
    let key = key.parse::<InstanceKey>().map_err(|reason| PlanError::InvalidAddress {
      address: s.to_string(),
      reason,
    })?;
    Ok(Self { component, key })
  }
}

fn validate_name(name: &str) -> Result<(), String> {
  if name.is_empty() {
    return Err("empty name".to_string());
  }
  if let Some(c) = name
    .chars()
    .find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '-'))
  {
    return Err(format!("invalid character '{}' in name '{}'", c, name));
  }
  Ok(())
}

macro_rules! string_serde {
  ($ty:ty) => {
    impl Serialize for $ty {
      fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
      }
    }

    impl<'de> Deserialize<'de> for $ty {
      fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
      }
    }
  };
}

string_serde!(ComponentAddr);
string_serde!(ComponentInstanceAddr);
string_serde!(InstanceKey);

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_root_component_display_and_parse() {
    let addr: ComponentAddr = "component.a".parse().unwrap();
    assert_eq!(addr, ComponentAddr::root("a"));
    assert_eq!(addr.to_string(), "component.a");
  }

  #[test]
  fn test_nested_component() {
    let addr: ComponentAddr = "stack.net.stack.edge.component.lb".parse().unwrap();
    assert_eq!(addr.stack.path(), ["net".to_string(), "edge".to_string()]);
    assert_eq!(addr.name, "lb");
    assert_eq!(addr.to_string(), "stack.net.stack.edge.component.lb");
  }

  #[test]
  fn test_rejects_malformed_component() {
    assert!("component".parse::<ComponentAddr>().is_err());
    assert!("resource.a".parse::<ComponentAddr>().is_err());
    assert!("stack.x.resource.a".parse::<ComponentAddr>().is_err());
    assert!("component.".parse::<ComponentAddr>().is_err());
    assert!("component.a b".parse::<ComponentAddr>().is_err());
  }

  #[test]
  fn test_instance_keys() {
    let b = ComponentAddr::root("b");

    let keyed = b.instance(InstanceKey::Str("i".to_string()));
    assert_eq!(keyed.to_string(), r#"component.b["i"]"#);
    assert_eq!(keyed, r#"component.b["i"]"#.parse().unwrap());

    let indexed = b.instance(InstanceKey::Int(3));
    assert_eq!(indexed.to_string(), "component.b[3]");
    assert_eq!(indexed, "component.b[3]".parse().unwrap());

    let single = b.instance(InstanceKey::NoKey);
    assert_eq!(single.to_string(), "component.b");
    assert_eq!(single, "component.b".parse().unwrap());
  }

  #[test]
  fn test_rejects_bad_instance_key() {
    assert!("component.b[x]".parse::<ComponentInstanceAddr>().is_err());
    assert!("component.b[\"x\"".parse::<ComponentInstanceAddr>().is_err());
  }

  #[test]
  fn test_addresses_serialize_as_strings() {
    let addr = ComponentAddr::root("b").instance(InstanceKey::Str("ii".to_string()));
    let json = serde_json::to_value(&addr).unwrap();
    assert_eq!(json, serde_json::json!("component.b[\"ii\"]"));
    let back: ComponentInstanceAddr = serde_json::from_value(json).unwrap();
    assert_eq!(back, addr);
  }

  #[test]
  fn test_instance_keys_serialize_as_strings() {
    let cases = [
      (InstanceKey::NoKey, ""),
      (InstanceKey::Int(0), "[0]"),
      (InstanceKey::Str("i".to_string()), "[\"i\"]"),
    ];
    for (key, text) in cases {
      let json = serde_json::to_value(&key).unwrap();
      assert_eq!(json, serde_json::json!(text));
      let back: InstanceKey = serde_json::from_value(json).unwrap();
      assert_eq!(back, key);
    }
  }

  #[test]
  fn test_instance_key_rejects_malformed_string() {
    assert!(serde_json::from_value::<InstanceKey>(serde_json::json!("x")).is_err());
  }
}
