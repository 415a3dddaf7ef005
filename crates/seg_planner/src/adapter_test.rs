use std::sync::Mutex;

use thiserror::Error;

use super::*;
use crate::config::PipelineConfig;
use crate::graph::{build, Queue, TaskKind};

#[derive(Debug, Error)]
#[error("engine rejected {0}")]
struct EngineError(String);

/// Records everything the planner hands over.
#[derive(Default)]
struct RecordingAdapter {
  retry: Option<RetryPolicy>,
  callback: Option<FailureCallback>,
  submitted: Vec<(NodeKey, String)>,
  dependencies: Vec<(usize, usize)>,
  reject: Option<NodeKey>,
}

impl ExecutionAdapter for RecordingAdapter {
  type Handle = usize;
  type Error = EngineError;

  fn configure_retry(&mut self, policy: &RetryPolicy) -> Result<(), EngineError> {
    self.retry = Some(*policy);
    Ok(())
  }

  fn register_failure_callback(&mut self, callback: FailureCallback) -> Result<(), EngineError> {
    self.callback = Some(callback);
    Ok(())
  }

  fn submit(&mut self, node: &TaskNode) -> Result<usize, EngineError> {
    if self.reject == Some(node.key) {
      return Err(EngineError(node.key.task_id()));
    }
    let queue = self.queue_for(node);
    self.submitted.push((node.key, queue));
    Ok(self.submitted.len() - 1)
  }

  fn add_dependency(&mut self, from: &usize, to: &usize) -> Result<(), EngineError> {
    self.dependencies.push((*from, *to));
    Ok(())
  }
}

fn graph() -> TaskGraph {
  let mut config = PipelineConfig::new("handoff", [0, 0, 0, 256, 256, 64], [64, 64, 64]);
  config.batch_mip = 0;
  config.high_mip = 2;
  build(&config).unwrap()
}

#[test]
fn test_hand_off_submits_every_node_once() {
  let graph = graph();
  let mut adapter = RecordingAdapter::default();
  let handles = hand_off(&graph, &mut adapter).unwrap();

  assert_eq!(adapter.submitted.len(), graph.len());
  assert_eq!(handles.len(), graph.len());
  assert_eq!(adapter.dependencies.len(), graph.edge_count());
  assert_eq!(adapter.retry, Some(RetryPolicy::default()));
  assert!(adapter.callback.is_some());
}

/// Every dependency points from an earlier submission to a later one.
#[test]
fn test_hand_off_order_respects_edges() {
  let graph = graph();
  let mut adapter = RecordingAdapter::default();
  hand_off(&graph, &mut adapter).unwrap();

  for &(from, to) in &adapter.dependencies {
    assert!(from < to, "Dependency {from} -> {to} submitted out of order");
  }
}

#[test]
fn test_queue_names_reach_adapter() {
  let graph = graph();
  let mut adapter = RecordingAdapter::default();
  hand_off(&graph, &mut adapter).unwrap();

  for (key, queue) in &adapter.submitted {
    let node = graph.node(key).unwrap();
    assert_eq!(queue, &node.queue.to_string());
    if key.kind == TaskKind::WrapComposite && key.chunk_of().unwrap().mip_level() == 2 {
      assert_eq!(node.queue, Queue::Composite(2));
      assert_eq!(queue, "composite_2");
    }
  }
}

#[test]
fn test_submit_failure_names_node() {
  let graph = graph();
  let rejected = crate::graph::stages::reduction_key();
  let mut adapter = RecordingAdapter {
    reject: Some(rejected),
    ..Default::default()
  };

  let err = hand_off(&graph, &mut adapter).unwrap_err();
  assert!(matches!(err, HandOffError::Submit { key, .. } if key == rejected));
  assert!(adapter.dependencies.is_empty(), "No edges after a failed submit");
}

#[test]
fn test_custom_failure_callback() {
  let graph = graph();
  let failures: Arc<Mutex<Vec<String>>> = Arc::default();
  let sink = Arc::clone(&failures);
  let callback: FailureCallback = Arc::new(move |key: &NodeKey, error: &str| {
    sink.lock().unwrap().push(format!("{}: {error}", key.task_id()));
  });

  let mut adapter = RecordingAdapter::default();
  hand_off_with(&graph, &mut adapter, callback).unwrap();

  // The host fires the callback when a node gives up
  let registered = adapter.callback.unwrap();
  registered(&crate::graph::stages::end_key(), "timeout");
  assert_eq!(failures.lock().unwrap().as_slice(), ["barrier_end: timeout"]);
}
