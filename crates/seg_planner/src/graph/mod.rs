//! Segmentation task graph.
//!
//! ```text
//! ┌──────────────┐     ┌─────────────┐     ┌────────────┐     ┌─────────┐     ┌───────────┐
//! │ PipelineConf ├────►│ Stage gates ├────►│ Run spine  ├────►│ Chunk   ├────►│ Scaling   │
//! └──────────────┘     └─────────────┘     └────────────┘     │ graphs  │     │ overlay   │
//!                                                             └─────────┘     └───────────┘
//!                                                                  │
//!                                                 GraphBuilder::finish (cycle check)
//!                                                                  ▼
//!                                                              TaskGraph
//! ```
//!
//! # Building Blocks
//!
//! - [`chunk_graph`]: generate, remap and overlap nodes per stage
//! - [`stages`]: start/end barriers, triggers, waits and post-processing
//! - [`gate`]: skip decisions carried on trigger nodes
//! - [`scaling`]: elastic and deep pool resize nodes
//! - [`builder`]: key-indexed builder and the immutable [`TaskGraph`]
//!
//! Building is single-threaded and deterministic: the same configuration
//! always yields the same nodes and edges in the same order.

pub mod builder;
pub mod chunk_graph;
pub mod export;
pub mod gate;
pub mod scaling;
pub mod stages;
pub mod stats;
pub mod types;


// Re-exports
pub use builder::{GraphBuilder, NodeId, TaskGraph};
pub use chunk_graph::LevelPlan;
pub use export::ExportedGraph;
pub use gate::{dispatch_gate, Dispatch, GateDecision, StageGate};
pub use scaling::ScalingPlan;
pub use stats::GraphStats;
pub use types::{
  NodeKey, Payload, PoolRole, Queue, ScaleDirective, Scope, Stage, Tag, TaskKind, TaskNode,
};

use web_time::Instant;

use crate::config::PipelineConfig;
use crate::error::PlanError;

/// Build the complete task graph for one run.
///
/// All-or-nothing: any configuration or topology error aborts the build.
#[tracing::instrument(skip_all, name = "graph::build", fields(run = %config.name))]
pub fn build(config: &PipelineConfig) -> Result<TaskGraph, PlanError> {
  let start = Instant::now();
  let grid = config.validate()?;
  let plan = LevelPlan::new(config, &grid);

  if config.overlap && !plan.overlap {
    tracing::info!("single batch chunk, overlap pass disabled");
  }

  let gates: Vec<(Stage, GateDecision)> = Stage::ALL
    .iter()
    .map(|&stage| (stage, StageGate::evaluate(config, stage)))
    .collect();

  let mut builder = GraphBuilder::new();
  stages::add_spine(&mut builder, config, &gates)?;

  for (stage, decision) in &gates {
    match decision {
      GateDecision::Proceed => {
        chunk_graph::add_stage_chunks(&mut builder, config, &grid, &plan, *stage)?;
        stages::link_stage(&mut builder, *stage)?;
        scaling::add_stage_scaling(&mut builder, config, &grid, &plan, *stage)?;
      }
      GateDecision::Skipped(reason) => {
        tracing::info!(stage = %stage, "{reason}");
      }
    }
  }
  scaling::add_run_scaling(&mut builder, config, &grid, &plan)?;

  let graph = builder.finish(config.clone(), grid)?;

  tracing::info!(
    nodes = graph.len(),
    edges = graph.edge_count(),
    top_mip = plan.top_mip,
    batch_mip = plan.batch_mip,
    elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
    "task graph built"
  );
  Ok(graph)
}
