//! seg_planner - Task graph planning for chunked volumetric segmentation
//!
//! Turns a bounding box, a chunk size and a handful of level thresholds into
//! a dependency graph of segmentation tasks: per-chunk composite work that
//! reduces up an implicit octree, remap and overlap passes at the batch
//! level, stage barriers, and compute-pool scaling hung off level milestones.
//! Execution belongs to a host engine reached through [`ExecutionAdapter`].
//!
//! # Features
//!
//! - **Implicit Octree**: Post-order, restartable chunk traversal with
//!   neighbour and parent/child math
//! - **Chunk Graph**: Wrap/batch composite nodes, remap and overlap passes,
//!   one reduction edge per chunk
//! - **Stage Coordination**: Watershed then agglomeration, with skip gates
//! - **Scaling Overlay**: Elastic and deep pool resize nodes sized from the
//!   per-level chunk counts
//! - **Batch Jobs**: Parallel per-batch external jobs via rayon
//!
//! # Example
//!
//! ```ignore
//! use seg_planner::{build, PipelineConfig, Stage};
//!
//! let config = PipelineConfig::new("run", [0, 0, 0, 1024, 1024, 128], [512, 512, 128]);
//! let graph = build(&config)?;
//!
//! println!("top mip {}, {} level-0 chunks", graph.top_mip(), graph.chunk_count(Stage::Ws, 0));
//! for node in graph.topological_order() {
//!     println!("{} on {}", node.key.task_id(), node.queue);
//! }
//! ```

pub mod config;
pub mod error;

// Implicit chunk octree
pub mod octree;
pub use octree::{BoundingBox, Chunk, ChunkGrid, ChunkSize};

// Task graph construction
pub mod graph;
pub use graph::{build, GraphStats, NodeKey, Queue, Stage, TaskGraph, TaskKind, TaskNode};

// Host seams
pub mod adapter;
pub mod external;
pub mod notify;

pub use adapter::{hand_off, hand_off_with, ExecutionAdapter, FailureCallback};
pub use config::PipelineConfig;
pub use error::{ConfigError, ExternalError, HandOffError, NotifyError, PlanError, TopologyError};
pub use external::{run_batched, BatchJob, HostJobs, LinkGenerator, MetadataInitializer, ReductionJob};
pub use notify::{notify_quietly, ChannelSink, Notification, NotificationSink};
