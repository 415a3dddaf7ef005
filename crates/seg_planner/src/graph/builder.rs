//! Graph builder and the finished, immutable [`TaskGraph`].
//!
//! The builder owns the key → node mapping for the duration of one `build`
//! call. Nodes are appended to a petgraph [`DiGraph`], edges reference nodes
//! by key, and `finish` runs `toposort`, which both rejects cycles and fixes
//! the order handed to adapters.

use std::collections::{BTreeMap, HashMap, HashSet};

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use super::stats::GraphStats;
use super::types::{NodeKey, TaskNode};
use super::Stage;
use crate::config::PipelineConfig;
use crate::error::TopologyError;
use crate::octree::ChunkGrid;

/// Dense node index, stable for the lifetime of a graph.
pub type NodeId = NodeIndex<u32>;

/// Append-only graph under construction.
#[derive(Debug, Default)]
pub struct GraphBuilder {
  graph: DiGraph<TaskNode, ()>,
  index: HashMap<NodeKey, NodeId>,
  edge_set: HashSet<(NodeId, NodeId)>,
  /// Generate nodes per (stage, mip).
  chunk_counts: BTreeMap<(Stage, u32), usize>,
}

impl GraphBuilder {
  pub fn new() -> Self {
    Self::default()
  }

  /// Append a node. Keys are unique within a run.
  pub fn add_node(&mut self, node: TaskNode) -> Result<NodeId, TopologyError> {
    if self.index.contains_key(&node.key) {
      return Err(TopologyError::DuplicateNode { key: node.key });
    }

    let key = node.key;
    if key.kind.is_generate() {
      if let (Some(stage), Some(chunk)) = (key.stage_of(), key.chunk_of()) {
        *self.chunk_counts.entry((stage, chunk.mip_level())).or_default() += 1;
      }
    }
    let id = self.graph.add_node(node);
    self.index.insert(key, id);
    Ok(id)
  }

  /// Declare that `to` runs after `from`. Repeated edges collapse.
  pub fn add_edge(&mut self, from: NodeKey, to: NodeKey) -> Result<(), TopologyError> {
    if from == to {
      return Err(TopologyError::SelfDependency { key: from });
    }
    let (Some(&a), Some(&b)) = (self.index.get(&from), self.index.get(&to)) else {
      return Err(TopologyError::MissingNode { from, to });
    };

    if self.edge_set.insert((a, b)) {
      self.graph.add_edge(a, b, ());
    }
    Ok(())
  }

  #[inline]
  pub fn contains(&self, key: &NodeKey) -> bool {
    self.index.contains_key(key)
  }

  #[inline]
  pub fn node_count(&self) -> usize {
    self.graph.node_count()
  }

  #[inline]
  pub fn edge_count(&self) -> usize {
    self.graph.edge_count()
  }

  /// Freeze the graph, rejecting cycles.
  pub fn finish(self, config: PipelineConfig, grid: ChunkGrid) -> Result<TaskGraph, TopologyError> {
    let order = toposort(&self.graph, None).map_err(|cycle| TopologyError::Cycle {
      key: self.graph[cycle.node_id()].key,
    })?;

    Ok(TaskGraph {
      config,
      grid,
      graph: self.graph,
      index: self.index,
      order,
      chunk_counts: self.chunk_counts,
    })
  }
}

/// Validated, acyclic task graph for one run. Read-only.
#[derive(Debug)]
pub struct TaskGraph {
  config: PipelineConfig,
  grid: ChunkGrid,
  graph: DiGraph<TaskNode, ()>,
  index: HashMap<NodeKey, NodeId>,
  order: Vec<NodeId>,
  chunk_counts: BTreeMap<(Stage, u32), usize>,
}

impl TaskGraph {
  /// Configuration the graph was built from.
  #[inline]
  pub fn config(&self) -> &PipelineConfig {
    &self.config
  }

  #[inline]
  pub fn grid(&self) -> &ChunkGrid {
    &self.grid
  }

  #[inline]
  pub fn top_mip(&self) -> u32 {
    self.grid.top_mip_level()
  }

  /// `batch_mip` clamped to the top of the tree.
  #[inline]
  pub fn effective_batch_mip(&self) -> u32 {
    self.config.batch_mip.min(self.top_mip())
  }

  #[inline]
  pub fn len(&self) -> usize {
    self.graph.node_count()
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.graph.node_count() == 0
  }

  /// Underlying petgraph graph, for analyses beyond the accessors here.
  #[inline]
  pub fn as_graph(&self) -> &DiGraph<TaskNode, ()> {
    &self.graph
  }

  /// Nodes in insertion order.
  pub fn nodes(&self) -> impl Iterator<Item = &TaskNode> + '_ {
    self.graph.node_weights()
  }

  pub fn node(&self, key: &NodeKey) -> Option<&TaskNode> {
    self.id_of(key).map(|id| &self.graph[id])
  }

  #[inline]
  pub fn contains(&self, key: &NodeKey) -> bool {
    self.index.contains_key(key)
  }

  #[inline]
  pub fn id_of(&self, key: &NodeKey) -> Option<NodeId> {
    self.index.get(key).copied()
  }

  #[inline]
  pub fn node_at(&self, id: NodeId) -> &TaskNode {
    &self.graph[id]
  }

  /// Edges in insertion order, as `(from, to)`.
  pub fn edges(&self) -> impl Iterator<Item = (&NodeKey, &NodeKey)> + '_ {
    self
      .graph
      .edge_references()
      .map(|e| (&self.graph[e.source()].key, &self.graph[e.target()].key))
  }

  #[inline]
  pub fn edge_count(&self) -> usize {
    self.graph.edge_count()
  }

  pub fn has_edge(&self, from: &NodeKey, to: &NodeKey) -> bool {
    match (self.id_of(from), self.id_of(to)) {
      (Some(a), Some(b)) => self.graph.contains_edge(a, b),
      _ => false,
    }
  }

  /// Direct dependencies of `key`. Empty for unknown keys.
  pub fn predecessors(&self, key: &NodeKey) -> impl Iterator<Item = &NodeKey> + '_ {
    self.neighbours(key, Direction::Incoming)
  }

  /// Direct dependents of `key`. Empty for unknown keys.
  pub fn successors(&self, key: &NodeKey) -> impl Iterator<Item = &NodeKey> + '_ {
    self.neighbours(key, Direction::Outgoing)
  }

  fn neighbours(&self, key: &NodeKey, direction: Direction) -> impl Iterator<Item = &NodeKey> + '_ {
    self
      .id_of(key)
      .into_iter()
      .flat_map(move |id| self.graph.neighbors_directed(id, direction))
      .map(move |n| &self.graph[n].key)
  }

  /// Nodes ordered so every edge points forward.
  pub fn topological_order(&self) -> impl Iterator<Item = &TaskNode> + '_ {
    self.order.iter().map(|&id| &self.graph[id])
  }

  /// Generate nodes emitted for `stage` at `mip`. Zero for skipped stages.
  pub fn chunk_count(&self, stage: Stage, mip: u32) -> usize {
    self.chunk_counts.get(&(stage, mip)).copied().unwrap_or(0)
  }

  pub fn stats(&self) -> GraphStats {
    GraphStats::collect(self)
  }

  pub(crate) fn order_ids(&self) -> &[NodeId] {
    &self.order
  }
}

#[cfg(test)]
#[path = "builder_test.rs"]
mod builder_test;
