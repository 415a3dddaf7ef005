//! Node and key types for the segmentation task graph.
//!
//! Node identity is a structured [`NodeKey`] compared by value. The legacy
//! string form (`composite_chunk_ws_3_1_0_0`) is only produced for display.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize, Serializer};

use super::gate::GateDecision;
use crate::error::ConfigError;
use crate::octree::Chunk;

// =============================================================================
// Stage
// =============================================================================

/// Processing pass. `Ws` (watershed) runs before `Agg` (agglomeration).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
  #[serde(alias = "watershed")]
  Ws,
  #[serde(alias = "agglomeration")]
  Agg,
}

impl Stage {
  /// Both stages in execution order.
  pub const ALL: [Stage; 2] = [Stage::Ws, Stage::Agg];

  pub fn as_str(&self) -> &'static str {
    match self {
      Stage::Ws => "ws",
      Stage::Agg => "agg",
    }
  }

  /// Human-facing name used in notifications.
  pub fn label(&self) -> &'static str {
    match self {
      Stage::Ws => "watershed",
      Stage::Agg => "agglomeration",
    }
  }
}

impl fmt::Display for Stage {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Stage {
  type Err = ConfigError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "ws" | "watershed" => Ok(Stage::Ws),
      "agg" | "agglomeration" => Ok(Stage::Agg),
      _ => Err(ConfigError::UnknownStage(s.to_string())),
    }
  }
}

// =============================================================================
// NodeKey
// =============================================================================

/// Owner of a node: the run itself or one stage.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
  Run,
  Stage(Stage),
}

impl fmt::Display for Scope {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Scope::Run => f.write_str("run"),
      Scope::Stage(stage) => stage.fmt(f),
    }
  }
}

/// What a node does.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
  /// Single-chunk composite above the batch level.
  WrapComposite,
  /// Multi-chunk composite at the batch level.
  BatchComposite,
  /// Relabel a batch chunk against the global merge result.
  Remap,
  /// Reconcile a batch chunk with its touching neighbours.
  Overlap,
  /// Create stage output metadata.
  Init,
  /// Fan-in marker ("level complete", "remap complete", "stage done").
  Milestone,
  ScaleUp,
  ScaleDown,
  /// Run start/end and stage wait barriers.
  Barrier,
  /// Gated start of a stage.
  Trigger,
  ResetFlags,
  /// Downsampling and mesh generation.
  Reduction,
  SegmentationCheck,
  Evaluation,
  LinkGeneration,
}

impl TaskKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      TaskKind::WrapComposite => "wrap_composite",
      TaskKind::BatchComposite => "batch_composite",
      TaskKind::Remap => "remap",
      TaskKind::Overlap => "overlap",
      TaskKind::Init => "init",
      TaskKind::Milestone => "milestone",
      TaskKind::ScaleUp => "scale_up",
      TaskKind::ScaleDown => "scale_down",
      TaskKind::Barrier => "barrier",
      TaskKind::Trigger => "trigger",
      TaskKind::ResetFlags => "reset_flags",
      TaskKind::Reduction => "reduction",
      TaskKind::SegmentationCheck => "segmentation_check",
      TaskKind::Evaluation => "evaluation",
      TaskKind::LinkGeneration => "link_generation",
    }
  }

  /// Kinds that do chunk work (one node per chunk).
  #[inline]
  pub fn is_generate(&self) -> bool {
    matches!(self, TaskKind::WrapComposite | TaskKind::BatchComposite)
  }
}

impl fmt::Display for TaskKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Distinguishes nodes of the same scope and kind.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tag {
  Chunk(Chunk),
  /// Per-level milestone.
  Level(u32),
  /// Fan-in of every remap node.
  Remap,
  /// Fan-in of every overlap node.
  Overlap,
  /// Singleton steps (barriers, scale points, housekeeping).
  Named(&'static str),
}

impl fmt::Display for Tag {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Tag::Chunk(chunk) => chunk.fmt(f),
      Tag::Level(mip) => write!(f, "mip_{mip}"),
      Tag::Remap => f.write_str("remap"),
      Tag::Overlap => f.write_str("overlap"),
      Tag::Named(name) => f.write_str(name),
    }
  }
}

/// Unique identity of a node within one run.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize)]
pub struct NodeKey {
  pub scope: Scope,
  pub kind: TaskKind,
  pub tag: Tag,
}

impl NodeKey {
  pub fn new(scope: Scope, kind: TaskKind, tag: Tag) -> Self {
    Self { scope, kind, tag }
  }

  /// Chunk-level node of a stage.
  pub fn chunk(stage: Stage, kind: TaskKind, chunk: Chunk) -> Self {
    Self::new(Scope::Stage(stage), kind, Tag::Chunk(chunk))
  }

  /// "Level `mip` complete" milestone of a stage.
  pub fn level_milestone(stage: Stage, mip: u32) -> Self {
    Self::new(Scope::Stage(stage), TaskKind::Milestone, Tag::Level(mip))
  }

  /// Named singleton node of a stage.
  pub fn stage(stage: Stage, kind: TaskKind, name: &'static str) -> Self {
    Self::new(Scope::Stage(stage), kind, Tag::Named(name))
  }

  /// Named singleton node of the run.
  pub fn run(kind: TaskKind, name: &'static str) -> Self {
    Self::new(Scope::Run, kind, Tag::Named(name))
  }

  /// Stage this node belongs to, if any.
  pub fn stage_of(&self) -> Option<Stage> {
    match self.scope {
      Scope::Run => None,
      Scope::Stage(stage) => Some(stage),
    }
  }

  /// Chunk this node works on, if any.
  pub fn chunk_of(&self) -> Option<Chunk> {
    match self.tag {
      Tag::Chunk(chunk) => Some(chunk),
      _ => None,
    }
  }

  /// Engine-facing task id, e.g. `composite_chunk_ws_3_1_0_0`.
  pub fn task_id(&self) -> String {
    let tag = self.tag;
    match (self.kind, self.scope) {
      (TaskKind::WrapComposite | TaskKind::BatchComposite, Scope::Stage(s)) => {
        format!("composite_chunk_{s}_{tag}")
      }
      (TaskKind::Remap, Scope::Stage(s)) => format!("remap_chunk_{s}_{tag}"),
      (TaskKind::Overlap, Scope::Stage(s)) => format!("overlap_chunk_{s}_{tag}"),
      (kind, Scope::Stage(s)) => format!("{kind}_{s}_{tag}"),
      (kind, Scope::Run) => format!("{kind}_{tag}"),
    }
  }
}

impl fmt::Display for NodeKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}/{}/{}", self.scope, self.kind, self.tag)
  }
}

// =============================================================================
// Queue
// =============================================================================

/// Worker queue a node is routed to.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Queue {
  /// Shared fast queue for high-parallelism levels.
  Atomic,
  /// Dedicated queue for one deep level.
  Composite(u32),
  /// Housekeeping queue for barriers, milestones and scaling.
  Manager,
}

impl Queue {
  /// Queue for a wrap composite at `mip`.
  #[inline]
  pub fn for_level(mip: u32, high_mip: u32) -> Self {
    if mip < high_mip {
      Queue::Atomic
    } else {
      Queue::Composite(mip)
    }
  }
}

impl fmt::Display for Queue {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Queue::Atomic => f.write_str("atomic"),
      Queue::Composite(mip) => write!(f, "composite_{mip}"),
      Queue::Manager => f.write_str("manager"),
    }
  }
}

impl Serialize for Queue {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(self)
  }
}

// =============================================================================
// TaskNode
// =============================================================================

/// Role of a compute pool in the scaling policy.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolRole {
  Elastic,
  Deep,
  Reduction,
}

/// Resize request for a named pool.
#[derive(Clone, PartialEq, Eq, Debug, Serialize)]
pub struct ScaleDirective {
  pub role: PoolRole,
  /// Pool name known to the host.
  pub pool: String,
  /// Target instance count.
  pub size: u32,
}

/// Node-specific data consumed by the execution adapter.
#[derive(Clone, PartialEq, Eq, Debug, Default, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Payload {
  #[default]
  None,
  /// Notification posted when the node completes.
  Notify { message: String, broadcast: bool },
  Scale(ScaleDirective),
  Gate(GateDecision),
}

/// Immutable graph node.
#[derive(Clone, PartialEq, Eq, Debug, Serialize)]
pub struct TaskNode {
  pub key: NodeKey,
  pub queue: Queue,
  /// Per-execution timeout; enforced by the host engine.
  pub timeout: Option<Duration>,
  pub payload: Payload,
}

impl TaskNode {
  pub fn new(key: NodeKey, queue: Queue) -> Self {
    Self {
      key,
      queue,
      timeout: None,
      payload: Payload::None,
    }
  }

  pub fn with_timeout(mut self, timeout: Duration) -> Self {
    self.timeout = Some(timeout);
    self
  }

  pub fn with_payload(mut self, payload: Payload) -> Self {
    self.payload = payload;
    self
  }

  /// Node posting `message` on completion.
  pub fn notify(key: NodeKey, message: impl Into<String>) -> Self {
    Self::new(key, Queue::Manager).with_payload(Payload::Notify {
      message: message.into(),
      broadcast: false,
    })
  }

  /// Scale directive, if this is a scaling node.
  pub fn scale(&self) -> Option<&ScaleDirective> {
    match &self.payload {
      Payload::Scale(directive) => Some(directive),
      _ => None,
    }
  }
}
