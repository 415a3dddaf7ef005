//! Run spine: barriers, stage triggers and post-processing.
//!
//! ```text
//! start ─► reset_flags ─► trigger(ws) ─► wait(ws) ─► trigger(agg) ─► wait(agg)
//!                             │                ▲          (same)          │
//!                             └─► init … done ─┘                          │
//!          ┌──────────────────────────────────────────────────────────────┤
//!          ▼                                                              ▼
//!  check_segmentation ─► link ─► end       downsample_and_mesh ─┬─► link
//!                                                               ├─► evaluation ─► end
//!                                                               └─► end
//! ```
//!
//! Evaluation exists only with a ground-truth layer.

use super::builder::GraphBuilder;
use super::chunk_graph::{done_key, init_key};
use super::gate::GateDecision;
use super::types::{NodeKey, Payload, Queue, Stage, TaskKind, TaskNode};
use crate::config::PipelineConfig;
use crate::error::TopologyError;

pub fn start_key() -> NodeKey {
  NodeKey::run(TaskKind::Barrier, "start")
}

pub fn end_key() -> NodeKey {
  NodeKey::run(TaskKind::Barrier, "end")
}

pub fn reset_flags_key() -> NodeKey {
  NodeKey::run(TaskKind::ResetFlags, "reset_flags")
}

pub fn trigger_key(stage: Stage) -> NodeKey {
  NodeKey::stage(stage, TaskKind::Trigger, "trigger")
}

pub fn wait_key(stage: Stage) -> NodeKey {
  NodeKey::stage(stage, TaskKind::Barrier, "wait")
}

pub fn reduction_key() -> NodeKey {
  NodeKey::run(TaskKind::Reduction, "downsample_and_mesh")
}

pub fn check_key() -> NodeKey {
  NodeKey::run(TaskKind::SegmentationCheck, "check_segmentation")
}

pub fn link_key() -> NodeKey {
  NodeKey::run(TaskKind::LinkGeneration, "neuroglancer_link")
}

pub fn evaluation_key() -> NodeKey {
  NodeKey::run(TaskKind::Evaluation, "evaluate_segmentation")
}

/// Add the run-level nodes and the edges between them.
pub fn add_spine(
  builder: &mut GraphBuilder,
  config: &PipelineConfig,
  gates: &[(Stage, GateDecision)],
) -> Result<(), TopologyError> {
  let evaluate = config.ground_truth.is_some();
  let [x0, y0, z0, x1, y1, z1] = config.bbox;

  builder.add_node(TaskNode::notify(
    start_key(),
    format!(
      "{}: segmentation started, bbox [{x0}, {y0}, {z0}] - [{x1}, {y1}, {z1}], chunk size {:?}",
      config.name, config.chunk_size
    ),
  ))?;
  builder.add_node(TaskNode::new(reset_flags_key(), Queue::Manager))?;

  for (stage, decision) in gates {
    builder.add_node(
      TaskNode::new(trigger_key(*stage), Queue::Manager).with_payload(Payload::Gate(decision.clone())),
    )?;
    builder.add_node(TaskNode::new(wait_key(*stage), Queue::Manager))?;
  }

  builder.add_node(TaskNode::new(reduction_key(), Queue::Manager))?;
  builder.add_node(TaskNode::new(check_key(), Queue::Manager))?;
  builder.add_node(TaskNode::new(link_key(), Queue::Manager).with_payload(Payload::Notify {
    message: format!("{}: neuroglancer link ready", config.name),
    // the evaluation report is broadcast instead
    broadcast: !evaluate,
  }))?;
  if evaluate {
    builder.add_node(TaskNode::notify(
      evaluation_key(),
      format!("{}: evaluation finished", config.name),
    ))?;
  }
  builder.add_node(TaskNode::notify(end_key(), format!("{}: segmentation finished", config.name)))?;

  builder.add_edge(start_key(), reset_flags_key())?;
  let mut previous = reset_flags_key();
  for (stage, _) in gates {
    builder.add_edge(previous, trigger_key(*stage))?;
    builder.add_edge(trigger_key(*stage), wait_key(*stage))?;
    previous = wait_key(*stage);
  }

  builder.add_edge(previous, reduction_key())?;
  builder.add_edge(previous, check_key())?;
  builder.add_edge(reduction_key(), end_key())?;
  builder.add_edge(check_key(), link_key())?;
  builder.add_edge(reduction_key(), link_key())?;
  builder.add_edge(link_key(), end_key())?;
  if evaluate {
    builder.add_edge(reduction_key(), evaluation_key())?;
    builder.add_edge(evaluation_key(), end_key())?;
  }
  Ok(())
}

/// Hook a built stage graph between its trigger and wait barrier.
pub fn link_stage(builder: &mut GraphBuilder, stage: Stage) -> Result<(), TopologyError> {
  builder.add_edge(trigger_key(stage), init_key(stage))?;
  builder.add_edge(done_key(stage), wait_key(stage))
}

#[cfg(test)]
#[path = "stages_test.rs"]
mod stages_test;
