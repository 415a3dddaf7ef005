//! Stage gates.
//!
//! A gate decides whether a stage runs or reuses existing output. The decision
//! is taken once at build time and carried on the stage's trigger node;
//! `dispatch_gate` replays it when the host fires the trigger.

use serde::Serialize;

use super::types::{Payload, Stage, TaskNode};
use crate::config::PipelineConfig;
use crate::notify::{notify_quietly, Notification, NotificationSink};

/// Outcome of evaluating a stage gate.
#[derive(Clone, PartialEq, Eq, Debug, Serialize)]
#[serde(tag = "decision", content = "reason", rename_all = "snake_case")]
pub enum GateDecision {
  Proceed,
  Skipped(String),
}

impl GateDecision {
  #[inline]
  pub fn proceeds(&self) -> bool {
    matches!(self, GateDecision::Proceed)
  }

  pub fn reason(&self) -> Option<&str> {
    match self {
      GateDecision::Proceed => None,
      GateDecision::Skipped(reason) => Some(reason),
    }
  }
}

/// Evaluates the per-run skip flags.
pub struct StageGate;

impl StageGate {
  pub fn evaluate(config: &PipelineConfig, stage: Stage) -> GateDecision {
    if !config.skips(stage) {
      return GateDecision::Proceed;
    }
    let reason = match config.stage_output(stage) {
      Some(path) => format!("Skip {}, reusing {path}", stage.label()),
      None => format!("Skip {}", stage.label()),
    };
    GateDecision::Skipped(reason)
  }
}

/// What the host should do with a fired trigger.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Dispatch {
  /// Start the stage.
  Forward,
  /// Do not start the stage; its wait barrier is released directly.
  Suppress,
}

/// Resolve a trigger node at run time.
///
/// Skipped stages are announced on `sink`; delivery failures are logged and
/// never block the run. Nodes without a gate always forward.
pub fn dispatch_gate(trigger: &TaskNode, sink: &dyn NotificationSink) -> Dispatch {
  match &trigger.payload {
    Payload::Gate(GateDecision::Skipped(reason)) => {
      tracing::info!(node = %trigger.key, "{reason}");
      notify_quietly(sink, &Notification::new(reason.clone()));
      Dispatch::Suppress
    }
    _ => Dispatch::Forward,
  }
}
