//! Fire-and-forget notifications.
//!
//! Milestones, barriers and gates post short messages to a sink. Delivery is
//! best effort: [`notify_quietly`] logs failures and carries on.

use crossbeam_channel::{Receiver, Sender, TrySendError};

use crate::error::NotifyError;
use crate::graph::{Payload, TaskNode};

/// One message for the run's notification channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
  pub message: String,
  /// Optional attachment (e.g. a link or report body).
  pub attachment: Option<String>,
  /// Post to the whole channel rather than the run thread.
  pub broadcast: bool,
}

impl Notification {
  pub fn new(message: impl Into<String>) -> Self {
    Self {
      message: message.into(),
      attachment: None,
      broadcast: false,
    }
  }

  pub fn broadcast(mut self) -> Self {
    self.broadcast = true;
    self
  }

  pub fn with_attachment(mut self, attachment: impl Into<String>) -> Self {
    self.attachment = Some(attachment.into());
    self
  }

  /// Message a node posts when it completes, if it carries one.
  pub fn for_node(node: &TaskNode) -> Option<Self> {
    match &node.payload {
      Payload::Notify { message, broadcast } => Some(Self {
        message: message.clone(),
        attachment: None,
        broadcast: *broadcast,
      }),
      _ => None,
    }
  }
}

/// Destination for notifications.
pub trait NotificationSink {
  fn notify(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Deliver `notification`, logging instead of propagating failures.
pub fn notify_quietly(sink: &dyn NotificationSink, notification: &Notification) {
  if let Err(err) = sink.notify(notification) {
    tracing::warn!(message = %notification.message, "failed to deliver notification: {err}");
  }
}

/// Post the completion message of `node`, if it has one.
pub fn announce(node: &TaskNode, attachment: Option<String>, sink: &dyn NotificationSink) {
  if let Some(mut notification) = Notification::for_node(node) {
    notification.attachment = attachment;
    notify_quietly(sink, &notification);
  }
}

/// Sink backed by a crossbeam channel; the host drains the receiver.
#[derive(Clone, Debug)]
pub struct ChannelSink {
  tx: Sender<Notification>,
}

impl ChannelSink {
  pub fn unbounded() -> (Self, Receiver<Notification>) {
    let (tx, rx) = crossbeam_channel::unbounded();
    (Self { tx }, rx)
  }

  /// Sink that rejects messages once `capacity` are pending.
  pub fn bounded(capacity: usize) -> (Self, Receiver<Notification>) {
    let (tx, rx) = crossbeam_channel::bounded(capacity);
    (Self { tx }, rx)
  }
}

impl NotificationSink for ChannelSink {
  fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
    self
      .tx
      .try_send(notification.clone())
      .map_err(|err| match err {
        TrySendError::Full(_) => NotifyError::Full,
        TrySendError::Disconnected(_) => NotifyError::Disconnected,
      })
  }
}
