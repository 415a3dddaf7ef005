//! Summary statistics for a built graph.

use std::collections::BTreeMap;
use std::fmt;

use petgraph::Direction;
use serde::Serialize;

use super::builder::TaskGraph;
use super::types::{Queue, TaskKind};

/// Node and edge counts of a [`TaskGraph`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct GraphStats {
  pub nodes: usize,
  pub edges: usize,
  /// Nodes that do chunk work (generate, remap, overlap).
  pub chunk_nodes: usize,
  pub scale_nodes: usize,
  /// Nodes on the longest dependency chain.
  pub critical_path: usize,
  pub by_kind: BTreeMap<TaskKind, usize>,
  pub by_queue: BTreeMap<Queue, usize>,
}

impl GraphStats {
  pub fn collect(graph: &TaskGraph) -> Self {
    let mut stats = Self {
      nodes: graph.len(),
      edges: graph.edge_count(),
      ..Default::default()
    };

    for node in graph.nodes() {
      let kind = node.key.kind;
      *stats.by_kind.entry(kind).or_default() += 1;
      *stats.by_queue.entry(node.queue).or_default() += 1;
      if node.key.chunk_of().is_some() {
        stats.chunk_nodes += 1;
      }
      if matches!(kind, TaskKind::ScaleUp | TaskKind::ScaleDown) {
        stats.scale_nodes += 1;
      }
    }

    // Longest path, relaxed in topological order
    let graph_ref = graph.as_graph();
    let mut depth = vec![1usize; graph.len()];
    for &id in graph.order_ids() {
      let d = depth[id.index()];
      for next in graph_ref.neighbors_directed(id, Direction::Outgoing) {
        depth[next.index()] = depth[next.index()].max(d + 1);
      }
    }
    stats.critical_path = depth.into_iter().max().unwrap_or(0);

    stats
  }

  #[inline]
  pub fn count(&self, kind: TaskKind) -> usize {
    self.by_kind.get(&kind).copied().unwrap_or(0)
  }
}

impl fmt::Display for GraphStats {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    writeln!(
      f,
      "{} nodes, {} edges, critical path {}",
      self.nodes, self.edges, self.critical_path
    )?;
    writeln!(f, "  chunk nodes: {}, scale nodes: {}", self.chunk_nodes, self.scale_nodes)?;
    for (kind, count) in &self.by_kind {
      writeln!(f, "  {kind:<20} {count}")?;
    }
    for (queue, count) in &self.by_queue {
      writeln!(f, "  queue {:<14} {count}", queue.to_string())?;
    }
    Ok(())
  }
}
