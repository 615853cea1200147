//! Transient notifications raised by the mutation pipeline
//!
//! Delivery is up to the consumer: [`TracingNotifier`] only logs, while
//! [`ChannelNotifier`] fans notifications out to UI subscribers.

use tokio::sync::broadcast;

/// A toast-style notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Success(String),
    Error(String),
}

/// Sink for transient notifications
#[cfg_attr(test, mockall::automock)]
pub trait Notifier: Send + Sync {
    /// A write succeeded
    fn success(&self, message: &str);

    /// Something failed; `message` is already normalized
    fn error(&self, message: &str);
}

/// Notifier that writes to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn success(&self, message: &str) {
        tracing::info!(target: "ess::notify", "{}", message);
    }

    fn error(&self, message: &str) {
        tracing::warn!(target: "ess::notify", "{}", message);
    }
}

/// Notifier backed by a broadcast channel
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: broadcast::Sender<Notification>,
}

impl ChannelNotifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Subscribe to notifications sent from now on
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }

    fn publish(&self, notification: Notification) {
        // No subscribers is fine: notifications are transient.
        let _ = self.tx.send(notification);
    }
}

impl Default for ChannelNotifier {
    fn default() -> Self {
        Self::new(64)
    }
}

impl Notifier for ChannelNotifier {
    fn success(&self, message: &str) {
        self.publish(Notification::Success(message.to_string()));
    }

    fn error(&self, message: &str) {
        self.publish(Notification::Error(message.to_string()));
    }
}
