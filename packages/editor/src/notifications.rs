//! Messages for the user, queued by the model and by background work.
//!
//! A [`Notifier`] can be cloned into any thread; the model owns the receiving
//! end and hands out what arrived through
//! [`DocumentModel::take_notifications`](crate::DocumentModel::take_notifications).

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::debug;
use xsdedit_rules::RuleId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotificationKind {
    Info,
    Warn,
    Error,
}

/// Link from a notification to the rule it complains about
#[derive(Debug, Clone)]
pub struct RuleViolation {
    rule: RuleId,
    resolved: Arc<AtomicBool>,
}

impl RuleViolation {
    pub(crate) fn new(rule: RuleId, resolved: Arc<AtomicBool>) -> Self {
        Self { rule, resolved }
    }

    pub fn rule(&self) -> &RuleId {
        &self.rule
    }

    /// Flips once the rule holds again
    pub fn is_resolved(&self) -> bool {
        self.resolved.load(Ordering::Acquire)
    }
}

#[derive(Debug, Clone)]
pub struct Notification {
    kind: NotificationKind,
    brief: String,
    verbose: String,
    violation: Option<RuleViolation>,
}

impl Notification {
    /// `brief` is the first line of the trimmed message; `verbose` holds the
    /// whole trimmed message when it spans several lines and is empty otherwise
    pub fn new(kind: NotificationKind, message: &str) -> Self {
        let trimmed = message.trim();
        let (brief, verbose) = match trimmed.split_once('\n') {
            Some((first, _)) => (first.trim_end().to_string(), trimmed.to_string()),
            None => (trimmed.to_string(), String::new()),
        };
        Self {
            kind,
            brief,
            verbose,
            violation: None,
        }
    }

    pub fn info(message: &str) -> Self {
        Self::new(NotificationKind::Info, message)
    }

    pub fn warn(message: &str) -> Self {
        Self::new(NotificationKind::Warn, message)
    }

    pub fn error(message: &str) -> Self {
        Self::new(NotificationKind::Error, message)
    }

    pub(crate) fn rule_violation(message: &str, violation: RuleViolation) -> Self {
        Self {
            violation: Some(violation),
            ..Self::warn(message)
        }
    }

    pub fn kind(&self) -> NotificationKind {
        self.kind
    }

    pub fn brief(&self) -> &str {
        &self.brief
    }

    pub fn verbose(&self) -> &str {
        &self.verbose
    }

    pub fn violation(&self) -> Option<&RuleViolation> {
        self.violation.as_ref()
    }

    /// Whether the rule behind this notification holds again; false for plain messages
    pub fn is_resolved(&self) -> bool {
        self.violation.as_ref().is_some_and(RuleViolation::is_resolved)
    }
}

/// Sending half handed to code that reports problems from elsewhere
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: UnboundedSender<Notification>,
}

impl Notifier {
    /// Returns false once the model is gone
    pub fn send(&self, notification: Notification) -> bool {
        self.tx.send(notification).is_ok()
    }

    pub fn info(&self, message: &str) -> bool {
        self.send(Notification::info(message))
    }

    pub fn warn(&self, message: &str) -> bool {
        self.send(Notification::warn(message))
    }

    pub fn error(&self, message: &str) -> bool {
        self.send(Notification::error(message))
    }
}

#[derive(Debug)]
pub(crate) struct NotificationQueue {
    tx: UnboundedSender<Notification>,
    rx: UnboundedReceiver<Notification>,
}

impl NotificationQueue {
    pub fn new() -> Self {
        let (tx, rx) = unbounded_channel();
        Self { tx, rx }
    }

    pub fn notifier(&self) -> Notifier {
        Notifier { tx: self.tx.clone() }
    }

    pub fn push(&self, notification: Notification) {
        debug!(brief = %notification.brief, "notification queued");
        // The receiver lives as long as the queue, so this cannot fail
        let _ = self.tx.send(notification);
    }

    pub fn drain(&mut self) -> Vec<Notification> {
        let mut drained = Vec::new();
        while let Ok(notification) = self.rx.try_recv() {
            drained.push(notification);
        }
        drained
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_brief_and_verbose() {
        let single = Notification::info("  Saved.  ");
        assert_eq!(single.brief(), "Saved.");
        assert_eq!(single.verbose(), "");

        let multi = Notification::warn("\nSlices and gap must add up to 10\nwhen more than five slices are acquired.\n");
        assert_eq!(multi.brief(), "Slices and gap must add up to 10");
        assert_eq!(
            multi.verbose(),
            "Slices and gap must add up to 10\nwhen more than five slices are acquired."
        );
    }

    #[test]
    fn test_queue_drains_in_order() {
        let mut queue = NotificationQueue::new();
        let notifier = queue.notifier();
        queue.push(Notification::info("first"));
        assert!(notifier.error("second"));

        let drained: Vec<_> = queue.drain().into_iter().map(|n| n.brief).collect();
        assert_eq!(drained, vec!["first", "second"]);
        assert!(queue.drain().is_empty());
    }

    #[test]
    fn test_violation_tracks_resolution() {
        let flag = Arc::new(AtomicBool::new(false));
        let notification = Notification::rule_violation(
            "broken",
            RuleViolation::new(RuleId::new("r"), Arc::clone(&flag)),
        );
        assert_eq!(notification.kind(), NotificationKind::Warn);
        assert!(!notification.is_resolved());
        flag.store(true, Ordering::Release);
        assert!(notification.is_resolved());
        assert!(!Notification::info("plain").is_resolved());
    }
}
