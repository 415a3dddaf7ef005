//! Error taxonomy for graph planning.
//!
//! Configuration and topology errors are fatal: `build` returns one of them
//! and no partial graph escapes. Failures of executed nodes belong to the
//! host engine and never show up here.

use std::path::PathBuf;

use thiserror::Error;

use crate::graph::NodeKey;
use crate::octree::Chunk;

/// Invalid pipeline configuration. Never retried.
#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("bounding box {bbox:?} has a non-positive extent on the {axis} axis")]
  EmptyExtent { bbox: [i32; 6], axis: char },

  #[error("bounding box {bbox:?} is wider than i32::MAX voxels on the {axis} axis")]
  ExtentTooLarge { bbox: [i32; 6], axis: char },

  #[error("chunk size {size:?} must be positive on every axis")]
  NonPositiveChunkSize { size: [i32; 3] },

  #[error("chunk size {size:?} does not evenly divide the bounding box extent {extent:?}")]
  Misaligned { size: [i32; 3], extent: [i32; 3] },

  #[error("start chunk {chunk} lies outside the level {level} grid of {dims:?} chunks")]
  StartOutsideGrid { chunk: Chunk, level: u32, dims: [i32; 3] },

  #[error("elastic pool `{pool}` has zero capacity")]
  ZeroCapacity { pool: String },

  #[error("unknown stage `{0}` (expected `ws` or `agg`)")]
  UnknownStage(String),

  #[error("failed to read config file {}", .path.display())]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse pipeline config")]
  Parse(#[from] toml::de::Error),
}

/// Structural violation detected while assembling the graph.
///
/// Any of these indicates a builder bug rather than bad input.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TopologyError {
  #[error("node {key} was declared twice")]
  DuplicateNode { key: NodeKey },

  #[error("edge {from} -> {to} references a node that was never declared")]
  MissingNode { from: NodeKey, to: NodeKey },

  #[error("node {key} cannot depend on itself")]
  SelfDependency { key: NodeKey },

  #[error("dependency cycle through node {key}")]
  Cycle { key: NodeKey },
}

/// Any failure of `build`.
#[derive(Debug, Error)]
pub enum PlanError {
  #[error(transparent)]
  Config(#[from] ConfigError),

  #[error(transparent)]
  Topology(#[from] TopologyError),
}

/// Failure while feeding a finished graph to an execution adapter.
#[derive(Debug, Error)]
pub enum HandOffError<E: std::error::Error + 'static> {
  #[error("adapter rejected run configuration")]
  Configure(#[source] E),

  #[error("adapter rejected node {key}")]
  Submit {
    key: NodeKey,
    #[source]
    source: E,
  },

  #[error("adapter rejected dependency {from} -> {to}")]
  Dependency {
    from: NodeKey,
    to: NodeKey,
    #[source]
    source: E,
  },
}

/// Failure to deliver a notification. Never fatal to a run.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NotifyError {
  #[error("notification channel is full")]
  Full,

  #[error("notification channel is disconnected")]
  Disconnected,

  #[error("notification rejected: {0}")]
  Rejected(String),
}

/// Failure of a host job run on behalf of a node.
#[derive(Debug, Error)]
#[error("host job for node {key} failed")]
pub struct ExternalError {
  pub key: NodeKey,
  #[source]
  pub source: Box<dyn std::error::Error + Send + Sync + 'static>,
}

impl ExternalError {
  pub fn new(key: NodeKey, source: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self {
      key,
      source: Box::new(source),
    }
  }
}
