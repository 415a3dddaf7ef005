//! Execution adapter seam.
//!
//! The planner never runs anything. A host engine implements
//! [`ExecutionAdapter`] and receives the finished graph through [`hand_off`]:
//!
//! 1. `configure_retry` with the run's retry policy
//! 2. `register_failure_callback`
//! 3. `submit` every node in topological order
//! 4. `add_dependency` for every edge
//!
//! The queue of a node is read from [`TaskNode::queue`].

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::RetryPolicy;
use crate::error::HandOffError;
use crate::graph::{NodeKey, TaskGraph, TaskNode};

/// Called by the host when a node fails permanently: `(node, error text)`.
pub type FailureCallback = Arc<dyn Fn(&NodeKey, &str) + Send + Sync>;

/// Host workflow engine.
pub trait ExecutionAdapter {
  /// Engine-side reference to a submitted node.
  type Handle: Clone;
  type Error: std::error::Error + 'static;

  fn configure_retry(&mut self, policy: &RetryPolicy) -> Result<(), Self::Error>;

  fn register_failure_callback(&mut self, callback: FailureCallback) -> Result<(), Self::Error>;

  fn submit(&mut self, node: &TaskNode) -> Result<Self::Handle, Self::Error>;

  /// Declare that `to` runs after `from`.
  fn add_dependency(&mut self, from: &Self::Handle, to: &Self::Handle) -> Result<(), Self::Error>;

  /// Engine queue name for `node`.
  fn queue_for(&self, node: &TaskNode) -> String {
    node.queue.to_string()
  }
}

/// Handles returned by the adapter, by node key.
pub type Handles<H> = HashMap<NodeKey, H>;

/// Feed `graph` to `adapter`, logging permanent failures.
pub fn hand_off<A: ExecutionAdapter>(
  graph: &TaskGraph,
  adapter: &mut A,
) -> Result<Handles<A::Handle>, HandOffError<A::Error>> {
  let callback: FailureCallback = Arc::new(|key: &NodeKey, error: &str| {
    tracing::error!(node = %key, "task failed permanently: {error}");
  });
  hand_off_with(graph, adapter, callback)
}

/// Feed `graph` to `adapter` with a custom failure callback.
#[tracing::instrument(skip_all, name = "adapter::hand_off", fields(nodes = graph.len()))]
pub fn hand_off_with<A: ExecutionAdapter>(
  graph: &TaskGraph,
  adapter: &mut A,
  on_failure: FailureCallback,
) -> Result<Handles<A::Handle>, HandOffError<A::Error>> {
  adapter
    .configure_retry(&graph.config().retry)
    .map_err(HandOffError::Configure)?;
  adapter
    .register_failure_callback(on_failure)
    .map_err(HandOffError::Configure)?;

  let mut handles = HashMap::with_capacity(graph.len());
  for node in graph.topological_order() {
    let handle = adapter
      .submit(node)
      .map_err(|source| HandOffError::Submit { key: node.key, source })?;
    handles.insert(node.key, handle);
  }

  for (from, to) in graph.edges() {
    // both ends were submitted above
    let (Some(a), Some(b)) = (handles.get(from), handles.get(to)) else {
      continue;
    };
    adapter
      .add_dependency(a, b)
      .map_err(|source| HandOffError::Dependency {
        from: *from,
        to: *to,
        source,
      })?;
  }

  tracing::info!(edges = graph.edge_count(), "graph handed off");
  Ok(handles)
}

#[cfg(test)]
#[path = "adapter_test.rs"]
mod adapter_test;
