//! Narrow interfaces to external jobs.
//!
//! Their internals (storage layout, meshing, evaluation metrics) live in the
//! host. The planner only decides when they run and, for batch jobs, how the
//! tree is split between workers.

use rayon::prelude::*;
use web_time::Instant;

use crate::config::PipelineConfig;
use crate::error::ExternalError;
use crate::graph::{Stage, TaskKind, TaskNode};
use crate::notify::{announce, NotificationSink};
use crate::octree::{partition_batches, BatchPartition, Chunk, ChunkGrid, ChunkIter};

/// Provisions output volume metadata for a stage.
///
/// Must be idempotent; runs before any generate node of the stage.
pub trait MetadataInitializer {
  type Error: std::error::Error + Send + Sync + 'static;

  fn create_info(&self, stage: Stage, config: &PipelineConfig) -> Result<(), Self::Error>;
}

/// Downsampling and mesh generation over the final segmentation.
pub trait ReductionJob {
  type Error: std::error::Error + Send + Sync + 'static;

  fn downsample_and_mesh(&self, config: &PipelineConfig) -> Result<(), Self::Error>;
}

/// Produces a visualization link for the run.
pub trait LinkGenerator {
  type Error: std::error::Error + Send + Sync + 'static;

  fn generate_link(&self, config: &PipelineConfig) -> Result<String, Self::Error>;
}

/// Host-side runner for the run-level nodes that call out to external jobs.
///
/// Engines call [`HostJobs::run_node`] as each node comes due. Nodes with no
/// external job only post their completion message.
pub struct HostJobs<'a, M, R, L> {
  pub metadata: &'a M,
  pub reduction: &'a R,
  pub link: &'a L,
  pub sink: &'a dyn NotificationSink,
}

impl<M, R, L> HostJobs<'_, M, R, L>
where
  M: MetadataInitializer,
  R: ReductionJob,
  L: LinkGenerator,
{
  /// Run the external job behind `node`, then announce it.
  ///
  /// The link node carries the generated URL as its attachment. Nothing is
  /// announced when the job fails.
  pub fn run_node(&self, node: &TaskNode, config: &PipelineConfig) -> Result<(), ExternalError> {
    let key = node.key;
    let attachment = match key.kind {
      TaskKind::Init => {
        if let Some(stage) = key.stage_of() {
          self
            .metadata
            .create_info(stage, config)
            .map_err(|err| ExternalError::new(key, err))?;
        }
        None
      }
      TaskKind::Reduction => {
        self
          .reduction
          .downsample_and_mesh(config)
          .map_err(|err| ExternalError::new(key, err))?;
        None
      }
      TaskKind::LinkGeneration => Some(
        self
          .link
          .generate_link(config)
          .map_err(|err| ExternalError::new(key, err))?,
      ),
      _ => None,
    };

    tracing::debug!(node = %key, "host job finished");
    announce(node, attachment, self.sink);
    Ok(())
  }
}

/// Per-batch job (segment info collection, evaluation) over a chunk list.
///
/// Invoked concurrently from the rayon pool, once per batch.
pub trait BatchJob: Sync {
  type Error: Send;

  /// Process `chunks` and return an opaque result block.
  fn run(&self, chunks: &[Chunk]) -> Result<Vec<u8>, Self::Error>;
}

/// Chunks of one batch subtree in traversal order.
pub fn batch_chunks(grid: &ChunkGrid, root: Chunk) -> Vec<Chunk> {
  ChunkIter::new(grid, root).collect()
}

/// Run `job` over the whole tree, batch by batch.
///
/// The chunks above the cut go first in a single call; the batch subtrees
/// then run in parallel. Results are concatenated in that order, batches in
/// grid order, whatever order they finish in.
#[tracing::instrument(skip_all, name = "external::run_batched")]
pub fn run_batched<J: BatchJob>(grid: &ChunkGrid, job: &J) -> Result<Vec<u8>, J::Error> {
  let start = Instant::now();
  let partition = partition_batches(grid);
  let mut output = run_high_chunks(&partition, job)?;

  let blocks = partition
    .batch_roots
    .par_iter()
    .map(|&root| job.run(&batch_chunks(grid, root)))
    .collect::<Result<Vec<_>, _>>()?;

  for block in blocks {
    output.extend_from_slice(&block);
  }

  tracing::debug!(
    batches = partition.len(),
    batch_mip = partition.batch_mip,
    bytes = output.len(),
    elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
    "batched job finished"
  );
  Ok(output)
}

fn run_high_chunks<J: BatchJob>(partition: &BatchPartition, job: &J) -> Result<Vec<u8>, J::Error> {
  if partition.high_chunks.is_empty() {
    return Ok(Vec::new());
  }
  job.run(&partition.high_chunks)
}
