//! Per-stage chunk graph.
//!
//! Every chunk at or above the batch level becomes a generate node. Batch
//! chunks also get a remap node (and, for agglomeration with the overlap pass
//! on, an overlap node). Reduction edges run from each chunk to its parent,
//! so the generate nodes of one stage form a tree rooted at the top chunk.
//!
//! ```text
//!              top ──────────────┐
//!             /    \             │ (remap waits for the top chunk)
//!          wrap    wrap          ▼
//!          / \     / \      remap × N ──► remap milestone ──► done
//!  init ─► batch × N (── overlap × N when enabled)
//! ```
//!
//! All nodes of a stage are added before any edge, so neighbour wiring does
//! not depend on iteration order.

use super::builder::GraphBuilder;
use super::types::{NodeKey, Queue, Scope, Stage, Tag, TaskKind, TaskNode};
use crate::config::PipelineConfig;
use crate::error::TopologyError;
use crate::octree::{level_chunks, Chunk, ChunkGrid};

/// Level thresholds resolved against the grid of one run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LevelPlan {
  /// Level of the single root chunk.
  pub top_mip: u32,
  /// `batch_mip` clamped to `top_mip`.
  pub batch_mip: u32,
  pub high_mip: u32,
  /// Whether the overlap pass runs for agglomeration.
  pub overlap: bool,
}

impl LevelPlan {
  pub fn new(config: &PipelineConfig, grid: &ChunkGrid) -> Self {
    let top_mip = grid.top_mip_level();
    let batch_mip = config.batch_mip.min(top_mip);
    Self {
      top_mip,
      batch_mip,
      high_mip: config.high_mip,
      // a single batch chunk has no boundary to reconcile
      overlap: config.overlap && top_mip > batch_mip,
    }
  }

  /// Generate kind for a chunk at `mip`, or None below the batch level.
  #[inline]
  pub fn kind_for(&self, mip: u32) -> Option<TaskKind> {
    match mip {
      m if m < self.batch_mip => None,
      m if m == self.batch_mip => Some(TaskKind::BatchComposite),
      _ => Some(TaskKind::WrapComposite),
    }
  }

  /// Queue for the generate node of a chunk at `mip`.
  #[inline]
  pub fn queue_for(&self, mip: u32) -> Queue {
    if mip == self.batch_mip {
      Queue::Atomic
    } else {
      Queue::for_level(mip, self.high_mip)
    }
  }

  #[inline]
  pub fn overlap_for(&self, stage: Stage) -> bool {
    self.overlap && stage == Stage::Agg
  }

  /// Key of the generate node for `chunk`.
  pub fn generate_key(&self, stage: Stage, chunk: Chunk) -> Option<NodeKey> {
    self
      .kind_for(chunk.mip_level())
      .map(|kind| NodeKey::chunk(stage, kind, chunk))
  }

  /// Key of the stage's top-level generate node.
  pub fn top_key(&self, stage: Stage) -> NodeKey {
    let kind = if self.top_mip == self.batch_mip {
      TaskKind::BatchComposite
    } else {
      TaskKind::WrapComposite
    };
    NodeKey::chunk(stage, kind, Chunk::new(self.top_mip, 0, 0, 0))
  }
}

/// Stage metadata node; precedes every batch composite.
pub fn init_key(stage: Stage) -> NodeKey {
  NodeKey::stage(stage, TaskKind::Init, "init")
}

/// Fan-in of every remap node of a stage.
pub fn remap_milestone_key(stage: Stage) -> NodeKey {
  NodeKey::new(Scope::Stage(stage), TaskKind::Milestone, Tag::Remap)
}

/// Fan-in of every overlap node of a stage.
pub fn overlap_milestone_key(stage: Stage) -> NodeKey {
  NodeKey::new(Scope::Stage(stage), TaskKind::Milestone, Tag::Overlap)
}

/// Marker completing a stage.
pub fn done_key(stage: Stage) -> NodeKey {
  NodeKey::stage(stage, TaskKind::Milestone, "done")
}

/// Add every node and edge of one stage's chunk graph.
#[tracing::instrument(skip_all, name = "graph::stage_chunks", fields(stage = %stage))]
pub fn add_stage_chunks(
  builder: &mut GraphBuilder,
  config: &PipelineConfig,
  grid: &ChunkGrid,
  plan: &LevelPlan,
  stage: Stage,
) -> Result<(), TopologyError> {
  let chunks: Vec<Chunk> = (plan.batch_mip..=plan.top_mip)
    .flat_map(|mip| level_chunks(grid, mip))
    .collect();
  let overlap = plan.overlap_for(stage);

  add_nodes(builder, config, plan, stage, &chunks, overlap)?;

  let top = plan.top_key(stage);
  let init = init_key(stage);
  let remap_done = remap_milestone_key(stage);

  for &chunk in &chunks {
    let mip = chunk.mip_level();
    let Some(generate) = plan.generate_key(stage, chunk) else {
      continue;
    };
    builder.add_edge(generate, NodeKey::level_milestone(stage, mip))?;

    let mut reduction_source = generate;
    if mip == plan.batch_mip {
      let remap = NodeKey::chunk(stage, TaskKind::Remap, chunk);
      builder.add_edge(init, generate)?;
      builder.add_edge(top, remap)?;
      builder.add_edge(remap, remap_done)?;

      if overlap {
        let overlap_key = NodeKey::chunk(stage, TaskKind::Overlap, chunk);
        builder.add_edge(generate, overlap_key)?;
        for neighbour in grid.neighbours(&chunk) {
          builder.add_edge(NodeKey::chunk(stage, TaskKind::BatchComposite, neighbour), overlap_key)?;
        }
        builder.add_edge(overlap_key, overlap_milestone_key(stage))?;
        reduction_source = overlap_key;
      }
    }

    if let Some(parent) = grid.parent(&chunk) {
      if let Some(parent_key) = plan.generate_key(stage, parent) {
        builder.add_edge(reduction_source, parent_key)?;
      }
    }
  }

  builder.add_edge(remap_done, done_key(stage))?;
  if overlap {
    builder.add_edge(overlap_milestone_key(stage), done_key(stage))?;
  }
  Ok(())
}

fn add_nodes(
  builder: &mut GraphBuilder,
  config: &PipelineConfig,
  plan: &LevelPlan,
  stage: Stage,
  chunks: &[Chunk],
  overlap: bool,
) -> Result<(), TopologyError> {
  let timeouts = &config.timeouts;
  builder.add_node(TaskNode::new(init_key(stage), Queue::Manager))?;

  for &chunk in chunks {
    let mip = chunk.mip_level();
    let Some(key) = plan.generate_key(stage, chunk) else {
      continue;
    };
    let timeout = if mip == plan.batch_mip {
      timeouts.batch()
    } else {
      timeouts.wrap()
    };
    builder.add_node(TaskNode::new(key, plan.queue_for(mip)).with_timeout(timeout))?;

    if mip == plan.batch_mip {
      let remap = NodeKey::chunk(stage, TaskKind::Remap, chunk);
      builder.add_node(TaskNode::new(remap, Queue::Atomic).with_timeout(timeouts.remap()))?;
      if overlap {
        let key = NodeKey::chunk(stage, TaskKind::Overlap, chunk);
        builder.add_node(TaskNode::new(key, Queue::Atomic).with_timeout(timeouts.overlap()))?;
      }
    }
  }

  for mip in plan.batch_mip..=plan.top_mip {
    builder.add_node(TaskNode::notify(
      NodeKey::level_milestone(stage, mip),
      format!("{stage}: MIP {mip} finished"),
    ))?;
  }
  builder.add_node(TaskNode::notify(
    remap_milestone_key(stage),
    format!("{stage}: remapping finished"),
  ))?;
  if overlap {
    builder.add_node(TaskNode::notify(
      overlap_milestone_key(stage),
      format!("overlapped {} at MIP {} finished", stage.label(), plan.batch_mip),
    ))?;
  }
  builder.add_node(TaskNode::new(done_key(stage), Queue::Manager))?;
  Ok(())
}

#[cfg(test)]
#[path = "chunk_graph_test.rs"]
mod chunk_graph_test;
