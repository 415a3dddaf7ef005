//! Octree module for mip-level chunk subdivision.
//!
//! The octree is implicit: chunks are value keys and parent/child
//! relationships are computed on demand via coordinate math.
//!
//! # Mip Convention
//!
//! Mip 0 = finest chunks, higher mip = coarser.
//!
//! ```text
//! Chunk Span = chunk_size * 2^mip
//! parent(c)  = (mip + 1, coord >> 1)
//! ```
//!
//! # Module Structure
//!
//! - [`node`]: `Chunk` - immutable value type for octree positions
//! - [`bounds`]: `BoundingBox`, `ChunkSize` - validated geometry inputs
//! - [`grid`]: `ChunkGrid` - per-level dimensions, neighbours, top mip
//! - [`iterator`]: `ChunkIter` - lazy children-first traversal
//! - [`batches`]: `partition_batches` - batch cut for external jobs

pub mod batches;
pub mod bounds;
pub mod grid;
pub mod iterator;
pub mod node;

// Re-exports
pub use batches::{level_chunks, partition_batches, BatchPartition};
pub use bounds::{BoundingBox, ChunkSize};
pub use grid::ChunkGrid;
pub use iterator::ChunkIter;
pub use node::Chunk;
