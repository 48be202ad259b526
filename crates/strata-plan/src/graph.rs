use std::collections::{BTreeMap, HashMap};

use crate::addr::ComponentAddr;

/// Component-level dependency graph for traversal and analysis.
///
/// An edge `(from, to)` means every instance of `from` must complete before
/// any instance of `to` may start in the normal apply direction.
#[derive(Debug, Clone)]
pub struct Graph {
  /// Adjacency list: component -> components depending on it.
  adjacency: BTreeMap<ComponentAddr, Vec<ComponentAddr>>,
  /// Reverse adjacency: component -> components it depends on.
  reverse_adjacency: BTreeMap<ComponentAddr, Vec<ComponentAddr>>,
  /// Components that depend on nothing.
  entry_points: Vec<ComponentAddr>,
}

impl Graph {
  /// Build a graph from components and dependency edges.
  pub fn new<'a>(
    components: impl IntoIterator<Item = &'a ComponentAddr>,
    edges: &[(ComponentAddr, ComponentAddr)],
  ) -> Self {
    let mut adjacency: BTreeMap<ComponentAddr, Vec<ComponentAddr>> = BTreeMap::new();
    let mut reverse_adjacency: BTreeMap<ComponentAddr, Vec<ComponentAddr>> = BTreeMap::new();

    for component in components {
      adjacency.entry(component.clone()).or_default();
      reverse_adjacency.entry(component.clone()).or_default();
    }

    for (from, to) in edges {
      adjacency.entry(from.clone()).or_default().push(to.clone());
      reverse_adjacency
        .entry(to.clone())
        .or_default()
        .push(from.clone());
      adjacency.entry(to.clone()).or_default();
      reverse_adjacency.entry(from.clone()).or_default();
    }

    for list in adjacency.values_mut().chain(reverse_adjacency.values_mut()) {
      list.sort();
      list.dedup();
    }

    let entry_points = reverse_adjacency
      .iter()
      .filter(|(_, upstream)| upstream.is_empty())
      .map(|(component, _)| component.clone())
      .collect();

    Self {
      adjacency,
      reverse_adjacency,
      entry_points,
    }
  }

  /// Components with no dependencies.
  pub fn entry_points(&self) -> &[ComponentAddr] {
    &self.entry_points
  }

  /// All components in the graph, in address order.
  pub fn components(&self) -> impl Iterator<Item = &ComponentAddr> {
    self.adjacency.keys()
  }

  /// Components that depend on `component`.
  pub fn downstream(&self, component: &ComponentAddr) -> &[ComponentAddr] {
    self
      .adjacency
      .get(component)
      .map(|v| v.as_slice())
      .unwrap_or(&[])
  }

  /// Components that `component` depends on.
  pub fn upstream(&self, component: &ComponentAddr) -> &[ComponentAddr] {
    self
      .reverse_adjacency
      .get(component)
      .map(|v| v.as_slice())
      .unwrap_or(&[])
  }

  /// Look for a dependency cycle using DFS.
  ///
  /// Returns the components on the first cycle found, with the starting
  /// component repeated at the end.
  pub fn detect_cycle(&self) -> Option<Vec<ComponentAddr>> {
    #[derive(Clone, Copy, PartialEq, Eq)]
    enum Mark {
      InProgress,
      Done,
    }

    fn visit<'a>(
      graph: &'a Graph,
      component: &'a ComponentAddr,
      marks: &mut HashMap<&'a ComponentAddr, Mark>,
      path: &mut Vec<&'a ComponentAddr>,
    ) -> Option<Vec<ComponentAddr>> {
      marks.insert(component, Mark::InProgress);
      path.push(component);

      for next in graph.downstream(component) {
        match marks.get(next) {
          // Back edge
          Some(Mark::InProgress) => {
            let start = path.iter().position(|c| *c == next).unwrap_or(0);
            let mut cycle: Vec<ComponentAddr> = path[start..].iter().map(|c| (*c).clone()).collect();
            cycle.push(next.clone());
            return Some(cycle);
          }
          Some(Mark::Done) => {}
          None => {
            if let Some(cycle) = visit(graph, next, marks, path) {
              return Some(cycle);
            }
          }
        }
      }

      path.pop();
      marks.insert(component, Mark::Done);
      None
    }

    let mut marks = HashMap::new();
    let mut path = Vec::new();
    for component in self.adjacency.keys() {
      if !marks.contains_key(component) {
        if let Some(cycle) = visit(self, component, &mut marks, &mut path) {
          return Some(cycle);
        }
      }
    }

    None
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn c(name: &str) -> ComponentAddr {
    ComponentAddr::root(name)
  }

  #[test]
  fn test_upstream_and_downstream() {
    let components = [c("a"), c("b"), c("c")];
    let graph = Graph::new(&components, &[(c("a"), c("b")), (c("b"), c("c"))]);

    assert_eq!(graph.upstream(&c("b")), [c("a")]);
    assert_eq!(graph.downstream(&c("b")), [c("c")]);
    assert!(graph.upstream(&c("a")).is_empty());
    assert_eq!(graph.entry_points(), [c("a")]);
    assert!(graph.detect_cycle().is_none());
  }

  #[test]
  fn test_detects_cycle_path() {
    let components = [c("a"), c("b"), c("c")];
    let graph = Graph::new(
      &components,
      &[(c("a"), c("b")), (c("b"), c("c")), (c("c"), c("a"))],
    );

    let cycle = graph.detect_cycle().expect("cycle should be found");
    assert_eq!(cycle, vec![c("a"), c("b"), c("c"), c("a")]);
  }

  #[test]
  fn test_duplicate_edges_collapse() {
    let components = [c("a"), c("b")];
    let graph = Graph::new(&components, &[(c("a"), c("b")), (c("a"), c("b"))]);
    assert_eq!(graph.downstream(&c("a")), [c("b")]);
  }
}
