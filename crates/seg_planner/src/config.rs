//! Pipeline configuration.
//!
//! One immutable value describes a run: geometry, level thresholds, stage
//! skips, pools and task metadata. It is loaded from TOML, validated once,
//! and then held by the built graph.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::graph::Stage;
use crate::octree::{BoundingBox, ChunkGrid, ChunkSize};

/// Root configuration for one segmentation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
  /// Run name, used in notifications.
  pub name: String,
  /// Voxel bounding box `[x0, y0, z0, x1, y1, z1]`, half-open.
  pub bbox: [i32; 6],
  /// Mip-0 chunk size in voxels.
  pub chunk_size: [i32; 3],
  /// Level where wrap tasks give way to batch tasks plus remap.
  #[serde(default = "default_batch_mip")]
  pub batch_mip: u32,
  /// First level routed to its own `composite_<mip>` queue.
  #[serde(default = "default_high_mip")]
  pub high_mip: u32,
  /// Run the boundary overlap pass for the agglomeration stage.
  #[serde(default)]
  pub overlap: bool,
  /// Reject chunk sizes that do not tile the box exactly.
  #[serde(default)]
  pub require_aligned: bool,
  /// Stages to skip, reusing their existing output.
  #[serde(default)]
  pub skip: Vec<Stage>,
  /// Ground-truth segmentation; enables the evaluation task.
  #[serde(default)]
  pub ground_truth: Option<String>,
  /// Layer locations quoted in notifications.
  #[serde(default)]
  pub layers: LayerPaths,
  /// Compute pools driven by the scaling overlay.
  #[serde(default)]
  pub pools: PoolConfig,
  /// Per-kind execution timeouts.
  #[serde(default)]
  pub timeouts: TimeoutConfig,
  /// Retry metadata handed to the execution adapter.
  #[serde(default)]
  pub retry: RetryPolicy,
}

fn default_batch_mip() -> u32 {
  3
}

fn default_high_mip() -> u32 {
  5
}

/// Input and output layer locations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerPaths {
  #[serde(default)]
  pub affinity: Option<String>,
  #[serde(default)]
  pub affinity_mip: u32,
  #[serde(default)]
  pub watershed: Option<String>,
  #[serde(default)]
  pub segmentation: Option<String>,
}

/// Named compute pools and the thresholds that resize them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
  /// Short-lived pool serving the `atomic` queue.
  #[serde(default = "default_elastic_pool")]
  pub elastic: String,
  /// Upper bound on elastic pool size.
  #[serde(default = "default_elastic_capacity")]
  pub elastic_capacity: u32,
  /// Elastic size kept after a wide stage finishes remapping.
  #[serde(default = "default_shed_size")]
  pub shed_size: u32,
  /// Batch-level chunk count at which the post-remap shed kicks in.
  #[serde(default = "default_fan_out_threshold")]
  pub fan_out_threshold: usize,
  /// Long-running pool serving `composite_<mip>` queues.
  #[serde(default = "default_deep_pool")]
  pub deep: String,
  /// Pool running downsampling and meshing.
  #[serde(default = "default_reduction_pool")]
  pub reduction: String,
}

fn default_elastic_pool() -> String {
  "cluster1".to_string()
}

fn default_elastic_capacity() -> u32 {
  1000
}

fn default_shed_size() -> u32 {
  20
}

fn default_fan_out_threshold() -> usize {
  100
}

fn default_deep_pool() -> String {
  "cluster2".to_string()
}

fn default_reduction_pool() -> String {
  "igneous".to_string()
}

impl Default for PoolConfig {
  fn default() -> Self {
    Self {
      elastic: default_elastic_pool(),
      elastic_capacity: default_elastic_capacity(),
      shed_size: default_shed_size(),
      fan_out_threshold: default_fan_out_threshold(),
      deep: default_deep_pool(),
      reduction: default_reduction_pool(),
    }
  }
}

/// Execution timeouts in minutes, per task kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutConfig {
  #[serde(default = "default_wrap_minutes")]
  pub wrap_minutes: u64,
  #[serde(default = "default_batch_minutes")]
  pub batch_minutes: u64,
  #[serde(default = "default_batch_minutes")]
  pub remap_minutes: u64,
  #[serde(default = "default_batch_minutes")]
  pub overlap_minutes: u64,
}

fn default_wrap_minutes() -> u64 {
  11520
}

fn default_batch_minutes() -> u64 {
  180
}

impl TimeoutConfig {
  #[inline]
  pub fn wrap(&self) -> Duration {
    minutes(self.wrap_minutes)
  }

  #[inline]
  pub fn batch(&self) -> Duration {
    minutes(self.batch_minutes)
  }

  #[inline]
  pub fn remap(&self) -> Duration {
    minutes(self.remap_minutes)
  }

  #[inline]
  pub fn overlap(&self) -> Duration {
    minutes(self.overlap_minutes)
  }
}

impl Default for TimeoutConfig {
  fn default() -> Self {
    Self {
      wrap_minutes: default_wrap_minutes(),
      batch_minutes: default_batch_minutes(),
      remap_minutes: default_batch_minutes(),
      overlap_minutes: default_batch_minutes(),
    }
  }
}

fn minutes(m: u64) -> Duration {
  Duration::from_secs(m * 60)
}

/// Graph-wide retry policy. Enforced by the host engine, not here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
  #[serde(default = "default_retries")]
  pub retries: u32,
  #[serde(default = "default_retry_delay_secs")]
  pub retry_delay_secs: u64,
  #[serde(default = "default_true")]
  pub exponential_backoff: bool,
}

fn default_retries() -> u32 {
  100
}

fn default_retry_delay_secs() -> u64 {
  10
}

fn default_true() -> bool {
  true
}

impl RetryPolicy {
  #[inline]
  pub fn retry_delay(&self) -> Duration {
    Duration::from_secs(self.retry_delay_secs)
  }
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self {
      retries: default_retries(),
      retry_delay_secs: default_retry_delay_secs(),
      exponential_backoff: true,
    }
  }
}

impl PipelineConfig {
  /// Configuration with default thresholds, pools and timeouts.
  pub fn new(name: impl Into<String>, bbox: [i32; 6], chunk_size: [i32; 3]) -> Self {
    Self {
      name: name.into(),
      bbox,
      chunk_size,
      batch_mip: default_batch_mip(),
      high_mip: default_high_mip(),
      overlap: false,
      require_aligned: false,
      skip: Vec::new(),
      ground_truth: None,
      layers: LayerPaths::default(),
      pools: PoolConfig::default(),
      timeouts: TimeoutConfig::default(),
      retry: RetryPolicy::default(),
    }
  }

  /// Load configuration from a TOML file.
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    Self::from_toml_str(&content)
  }

  /// Parse configuration from TOML text.
  pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
    Ok(toml::from_str(content)?)
  }

  /// Check every invariant and return the chunk grid it describes.
  pub fn validate(&self) -> Result<ChunkGrid, ConfigError> {
    let bbox = BoundingBox::from_array(self.bbox)?;
    let chunk_size = ChunkSize::from_array(self.chunk_size)?;
    let grid = if self.require_aligned {
      ChunkGrid::aligned(bbox, chunk_size)?
    } else {
      ChunkGrid::new(bbox, chunk_size)
    };

    if self.pools.elastic_capacity == 0 {
      return Err(ConfigError::ZeroCapacity {
        pool: self.pools.elastic.clone(),
      });
    }

    Ok(grid)
  }

  /// Whether the run skips `stage`.
  #[inline]
  pub fn skips(&self, stage: Stage) -> bool {
    self.skip.contains(&stage)
  }

  /// Output layer written by `stage`.
  pub fn stage_output(&self, stage: Stage) -> Option<&str> {
    match stage {
      Stage::Ws => self.layers.watershed.as_deref(),
      Stage::Agg => self.layers.segmentation.as_deref(),
    }
  }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;
