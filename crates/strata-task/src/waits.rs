//! Wait-for graph used to reject self-dependent awaits.
//!
//! Each suspended await adds one edge `waiter -> target`. Edges are only
//! added while holding the graph lock and only after checking that the
//! target cannot already reach the waiter, so the graph stays acyclic and
//! every cycle is reported by the await that would have closed it.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::TaskError;
use crate::handle::TaskId;

#[derive(Debug)]
struct WaitEdge {
  token: u64,
  target: TaskId,
  target_name: Arc<str>,
}

#[derive(Debug, Default)]
struct Graph {
  next_token: u64,
  edges: HashMap<TaskId, Vec<WaitEdge>>,
}

#[derive(Debug, Default)]
pub(crate) struct WaitGraph {
  inner: Mutex<Graph>,
}

impl WaitGraph {
  /// Record that `waiter` is about to suspend on `target`.
  ///
  /// Returns a token identifying the new edge, or the cycle the edge would
  /// have closed.
  pub(crate) fn begin(
    &self,
    waiter: TaskId,
    waiter_name: &Arc<str>,
    target: TaskId,
    target_name: &Arc<str>,
  ) -> Result<u64, TaskError> {
    let mut graph = self.inner.lock().unwrap_or_else(PoisonError::into_inner);

    if waiter == target {
      return Err(TaskError::SelfDependency {
        chain: vec![waiter_name.to_string(), waiter_name.to_string()],
      });
    }

    if let Some(path) = graph.path(target, waiter) {
      let mut chain = vec![waiter_name.to_string(), target_name.to_string()];
      chain.extend(path.iter().map(|name| name.to_string()));
      return Err(TaskError::SelfDependency { chain });
    }

    graph.next_token += 1;
    let token = graph.next_token;
    graph.edges.entry(waiter).or_default().push(WaitEdge {
      token,
      target,
      target_name: target_name.clone(),
    });
    Ok(token)
  }

  /// Remove the edge created by [`begin`](Self::begin).
  pub(crate) fn end(&self, waiter: TaskId, token: u64) {
    let mut graph = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(edges) = graph.edges.get_mut(&waiter) {
      edges.retain(|edge| edge.token != token);
      if edges.is_empty() {
        graph.edges.remove(&waiter);
      }
    }
  }

  #[cfg(test)]
  fn edge_count(&self) -> usize {
    let graph = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
    graph.edges.values().map(Vec::len).sum()
  }
}

impl Graph {
  /// Names of the tasks on a path of wait edges from `from` to `to`,
  /// excluding `from` itself.
  fn path(&self, from: TaskId, to: TaskId) -> Option<Vec<Arc<str>>> {
    fn visit(
      graph: &Graph,
      current: TaskId,
      to: TaskId,
      seen: &mut HashSet<TaskId>,
      path: &mut Vec<Arc<str>>,
    ) -> bool {
      if !seen.insert(current) {
        return false;
      }
      for edge in graph.edges.get(&current).into_iter().flatten() {
        path.push(edge.target_name.clone());
        if edge.target == to || visit(graph, edge.target, to, seen, path) {
          return true;
        }
        path.pop();
      }
      false
    }

    let mut path = Vec::new();
    let mut seen = HashSet::new();
    visit(self, from, to, &mut seen, &mut path).then_some(path)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn name(s: &str) -> Arc<str> {
    Arc::from(s)
  }

  #[test]
  fn test_rejects_direct_self_wait() {
    let waits = WaitGraph::default();
    let err = waits
      .begin(TaskId(1), &name("a"), TaskId(1), &name("a"))
      .unwrap_err();
    assert_eq!(
      err,
      TaskError::SelfDependency {
        chain: vec!["a".to_string(), "a".to_string()]
      }
    );
  }

  #[test]
  fn test_rejects_transitive_cycle() {
    let waits = WaitGraph::default();
    waits
      .begin(TaskId(1), &name("a"), TaskId(2), &name("b"))
      .unwrap();
    waits
      .begin(TaskId(2), &name("b"), TaskId(3), &name("c"))
      .unwrap();

    let err = waits
      .begin(TaskId(3), &name("c"), TaskId(1), &name("a"))
      .unwrap_err();
    assert_eq!(
      err,
      TaskError::SelfDependency {
        chain: vec![
          "c".to_string(),
          "a".to_string(),
          "b".to_string(),
          "c".to_string()
        ]
      }
    );
  }

  #[test]
  fn test_shared_target_is_not_a_cycle() {
    let waits = WaitGraph::default();
    waits
      .begin(TaskId(1), &name("a"), TaskId(3), &name("c"))
      .unwrap();
    waits
      .begin(TaskId(2), &name("b"), TaskId(3), &name("c"))
      .unwrap();
    waits
      .begin(TaskId(2), &name("b"), TaskId(1), &name("a"))
      .unwrap();
    assert_eq!(waits.edge_count(), 3);
  }

  #[test]
  fn test_end_removes_edge() {
    let waits = WaitGraph::default();
    let token = waits
      .begin(TaskId(1), &name("a"), TaskId(2), &name("b"))
      .unwrap();
    waits.end(TaskId(1), token);
    assert_eq!(waits.edge_count(), 0);

    // With the edge gone the reverse wait is allowed.
    waits
      .begin(TaskId(2), &name("b"), TaskId(1), &name("a"))
      .unwrap();
  }
}
