//! Cluster scaling overlay.
//!
//! Worker demand is known before the run starts: the batch level is the
//! widest, and each level above holds roughly an eighth of the one below.
//! Scale nodes are hung off the milestones where that demand drops.
//!
//! # Rules (per stage)
//!
//! | Condition                               | Gate                     | Action                                 |
//! |-----------------------------------------|--------------------------|----------------------------------------|
//! | `batch_count >= fan_out_threshold`      | remap milestone          | elastic → `shed_size`                  |
//! | `min(high, top) - batch > 2`            | milestone `batch + 1`    | elastic → `2 * count(batch + 2)`       |
//! | `top >= deep`                           | milestone `deep - 1`     | elastic → 0                            |
//! | `top >= deep`                           | every chunk at `deep - 1`| deep → `max(1, count(deep) / 8)`       |
//! | `top >= deep`                           | milestone `top`          | deep → 0                               |
//! | either of the two above                 | milestone `top`          | elastic → `min(capacity, batch_count)` |
//!
//! `deep` is `max(high, batch + 1)`: the first level routed to a composite
//! queue. When `high_mip` sits above the batch level it is `high_mip` itself.
//!
//! Run-level nodes scale the elastic pool up after `reset_flags`, down to 0
//! after the last stage, and release the reduction pool after meshing.

use serde::Serialize;

use super::builder::GraphBuilder;
use super::chunk_graph::{remap_milestone_key, LevelPlan};
use super::stages::{reduction_key, reset_flags_key, wait_key};
use super::types::{NodeKey, Payload, PoolRole, Queue, ScaleDirective, Stage, TaskKind, TaskNode};
use crate::config::{PipelineConfig, PoolConfig};
use crate::error::TopologyError;
use crate::octree::{level_chunks, ChunkGrid};

/// Deep-pool phase for trees that reach `high_mip`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct DeepPhase {
  /// Milestone after which the elastic pool is released.
  pub elastic_off_after: u32,
  /// Deep pool size while the upper levels run.
  pub deep_size: u32,
  /// Milestone after which the deep pool is released.
  pub deep_off_after: u32,
}

/// Scaling decisions for one stage, derived from the level plan.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ScalingPlan {
  /// Elastic size that covers the batch level.
  pub elastic_size: u32,
  /// Elastic size after remapping a wide batch level.
  pub shed: Option<u32>,
  /// `(milestone, size)` of the intermediate elastic scale-down.
  pub intermediate: Option<(u32, u32)>,
  pub deep: Option<DeepPhase>,
  /// Scale the elastic pool back to `elastic_size` after the top milestone.
  pub restore: bool,
}

impl ScalingPlan {
  pub fn new(pools: &PoolConfig, grid: &ChunkGrid, plan: &LevelPlan) -> Self {
    let count = |mip: u32| saturating_u32(grid.chunk_count(mip));
    let batch_count = grid.chunk_count(plan.batch_mip);
    let elastic_size = pools.elastic_capacity.min(saturating_u32(batch_count));

    let shed = (batch_count >= pools.fan_out_threshold).then_some(pools.shed_size);

    let gap = plan.high_mip.min(plan.top_mip).saturating_sub(plan.batch_mip);
    let intermediate = (gap > 2).then(|| {
      let size = 2u32.saturating_mul(count(plan.batch_mip + 2));
      (plan.batch_mip + 1, size)
    });

    // Composite queues begin at the first wrap level at or above high_mip
    let deep_from = plan.high_mip.max(plan.batch_mip + 1);
    let deep = (plan.top_mip >= deep_from).then(|| DeepPhase {
      elastic_off_after: deep_from - 1,
      deep_size: (count(deep_from) / 8).max(1),
      deep_off_after: plan.top_mip,
    });

    Self {
      elastic_size,
      shed,
      intermediate,
      deep,
      restore: intermediate.is_some() || deep.is_some(),
    }
  }
}

fn saturating_u32(n: usize) -> u32 {
  u32::try_from(n).unwrap_or(u32::MAX)
}

fn scale_node(key: NodeKey, role: PoolRole, pool: &str, size: u32) -> TaskNode {
  TaskNode::new(key, Queue::Manager).with_payload(Payload::Scale(ScaleDirective {
    role,
    pool: pool.to_string(),
    size,
  }))
}

pub fn global_start_key() -> NodeKey {
  NodeKey::run(TaskKind::ScaleUp, "global_start")
}

pub fn global_finish_key() -> NodeKey {
  NodeKey::run(TaskKind::ScaleDown, "global_finish")
}

pub fn reduction_pool_key() -> NodeKey {
  NodeKey::run(TaskKind::ScaleDown, "reduction_pool")
}

pub fn shed_key(stage: Stage) -> NodeKey {
  NodeKey::stage(stage, TaskKind::ScaleDown, "shed")
}

pub fn intermediate_key(stage: Stage) -> NodeKey {
  NodeKey::stage(stage, TaskKind::ScaleDown, "intermediate")
}

pub fn elastic_off_key(stage: Stage) -> NodeKey {
  NodeKey::stage(stage, TaskKind::ScaleDown, "elastic_off")
}

pub fn deep_up_key(stage: Stage) -> NodeKey {
  NodeKey::stage(stage, TaskKind::ScaleUp, "deep_up")
}

pub fn deep_off_key(stage: Stage) -> NodeKey {
  NodeKey::stage(stage, TaskKind::ScaleDown, "deep_off")
}

pub fn restore_key(stage: Stage) -> NodeKey {
  NodeKey::stage(stage, TaskKind::ScaleUp, "restore")
}

/// Add the run-level scale nodes. Requires the spine.
pub fn add_run_scaling(
  builder: &mut GraphBuilder,
  config: &PipelineConfig,
  grid: &ChunkGrid,
  plan: &LevelPlan,
) -> Result<(), TopologyError> {
  let pools = &config.pools;
  let elastic_size = ScalingPlan::new(pools, grid, plan).elastic_size;

  builder.add_node(scale_node(global_start_key(), PoolRole::Elastic, &pools.elastic, elastic_size))?;
  builder.add_node(scale_node(global_finish_key(), PoolRole::Elastic, &pools.elastic, 0))?;
  builder.add_node(scale_node(reduction_pool_key(), PoolRole::Reduction, &pools.reduction, 0))?;

  builder.add_edge(reset_flags_key(), global_start_key())?;
  builder.add_edge(wait_key(Stage::Agg), global_finish_key())?;
  builder.add_edge(reduction_key(), reduction_pool_key())
}

/// Add the scale nodes of one built stage.
#[tracing::instrument(skip_all, name = "graph::stage_scaling", fields(stage = %stage))]
pub fn add_stage_scaling(
  builder: &mut GraphBuilder,
  config: &PipelineConfig,
  grid: &ChunkGrid,
  plan: &LevelPlan,
  stage: Stage,
) -> Result<ScalingPlan, TopologyError> {
  let pools = &config.pools;
  let scaling = ScalingPlan::new(pools, grid, plan);

  if let Some(size) = scaling.shed {
    builder.add_node(scale_node(shed_key(stage), PoolRole::Elastic, &pools.elastic, size))?;
    builder.add_edge(remap_milestone_key(stage), shed_key(stage))?;
  }

  if let Some((after, size)) = scaling.intermediate {
    builder.add_node(scale_node(intermediate_key(stage), PoolRole::Elastic, &pools.elastic, size))?;
    builder.add_edge(NodeKey::level_milestone(stage, after), intermediate_key(stage))?;
  }

  if let Some(deep) = scaling.deep {
    builder.add_node(scale_node(elastic_off_key(stage), PoolRole::Elastic, &pools.elastic, 0))?;
    builder.add_node(scale_node(deep_up_key(stage), PoolRole::Deep, &pools.deep, deep.deep_size))?;
    builder.add_node(scale_node(deep_off_key(stage), PoolRole::Deep, &pools.deep, 0))?;

    builder.add_edge(NodeKey::level_milestone(stage, deep.elastic_off_after), elastic_off_key(stage))?;
    for chunk in level_chunks(grid, deep.elastic_off_after) {
      if let Some(key) = plan.generate_key(stage, chunk) {
        builder.add_edge(key, deep_up_key(stage))?;
      }
    }
    builder.add_edge(NodeKey::level_milestone(stage, deep.deep_off_after), deep_off_key(stage))?;
  }

  if scaling.restore {
    builder.add_node(scale_node(restore_key(stage), PoolRole::Elastic, &pools.elastic, scaling.elastic_size))?;
    builder.add_edge(NodeKey::level_milestone(stage, plan.top_mip), restore_key(stage))?;
  }

  tracing::debug!(?scaling, "scaling overlay");
  Ok(scaling)
}

#[cfg(test)]
#[path = "scaling_test.rs"]
mod scaling_test;
