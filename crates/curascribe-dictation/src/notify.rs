//! User-visible notification channel.

use std::sync::Arc;

use curascribe_core::types::{Notification, Severity};

/// Receives severity-tagged messages meant for the user.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Routes notifications to the matching tracing level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: Notification) {
        match notification.severity {
            Severity::Info => tracing::info!(target: "curascribe::notify", "{}", notification.message),
            Severity::Warning => tracing::warn!(target: "curascribe::notify", "{}", notification.message),
            Severity::Error => tracing::error!(target: "curascribe::notify", "{}", notification.message),
        }
    }
}

/// Forwards each notification to every inner notifier, in order.
#[derive(Clone, Default)]
pub struct FanoutNotifier {
    targets: Vec<Arc<dyn Notifier>>,
}

impl FanoutNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, target: Arc<dyn Notifier>) -> Self {
        self.targets.push(target);
        self
    }
}

impl Notifier for FanoutNotifier {
    fn notify(&self, notification: Notification) {
        for target in &self.targets {
            target.notify(notification.clone());
        }
    }
}
