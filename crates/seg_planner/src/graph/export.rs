//! Serializable view of a built graph.

use serde::Serialize;

use super::builder::TaskGraph;
use super::stats::GraphStats;
use super::types::{NodeKey, Payload, Queue};

#[derive(Debug, Serialize)]
pub struct ExportedNode<'a> {
  /// Engine-facing task id.
  pub id: String,
  pub key: &'a NodeKey,
  pub queue: Queue,
  pub timeout_secs: Option<u64>,
  pub payload: &'a Payload,
}

/// Nodes in topological order and edges by task id.
#[derive(Debug, Serialize)]
pub struct ExportedGraph<'a> {
  pub name: &'a str,
  pub top_mip: u32,
  pub batch_mip: u32,
  pub stats: GraphStats,
  pub nodes: Vec<ExportedNode<'a>>,
  pub edges: Vec<(String, String)>,
}

impl<'a> ExportedGraph<'a> {
  pub fn new(graph: &'a TaskGraph) -> Self {
    let nodes = graph
      .topological_order()
      .map(|node| ExportedNode {
        id: node.key.task_id(),
        key: &node.key,
        queue: node.queue,
        timeout_secs: node.timeout.map(|t| t.as_secs()),
        payload: &node.payload,
      })
      .collect();
    let edges = graph
      .edges()
      .map(|(from, to)| (from.task_id(), to.task_id()))
      .collect();

    Self {
      name: &graph.config().name,
      top_mip: graph.top_mip(),
      batch_mip: graph.effective_batch_mip(),
      stats: graph.stats(),
      nodes,
      edges,
    }
  }
}
