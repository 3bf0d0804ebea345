//! Change notifier
//!
//! Collects `(topic, subject)` pairs during a run, collapsing duplicates, and
//! publishes one `"<topic>:<subject>"` message per pair when flushed.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info, warn};

use crate::publisher::Publisher;

/// A single change notification.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ChangeNotification {
    pub topic: String,
    pub subject: String,
}

impl std::fmt::Display for ChangeNotification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.topic, self.subject)
    }
}

/// Deduplicating accumulator of change notifications.
#[derive(Debug, Clone, Default)]
pub struct Notifier {
    pending: BTreeMap<String, BTreeSet<String>>,
}

impl Notifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a change. Recording the same pair twice has no effect.
    pub fn record(&mut self, topic: &str, subject: &str) {
        let inserted = self
            .pending
            .entry(topic.to_string())
            .or_default()
            .insert(subject.to_string());
        if inserted {
            debug!(topic = %topic, subject = %subject, "Recorded change notification");
        }
    }

    /// Whether the pair is pending.
    pub fn contains(&self, topic: &str, subject: &str) -> bool {
        self.pending
            .get(topic)
            .is_some_and(|subjects| subjects.contains(subject))
    }

    /// Number of pending pairs.
    pub fn len(&self) -> usize {
        self.pending.values().map(BTreeSet::len).sum()
    }

    /// Whether nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Pending notifications, ordered by topic then subject.
    pub fn pending(&self) -> Vec<ChangeNotification> {
        self.pending
            .iter()
            .flat_map(|(topic, subjects)| {
                subjects.iter().map(move |subject| ChangeNotification {
                    topic: topic.clone(),
                    subject: subject.clone(),
                })
            })
            .collect()
    }

    /// Publish every pending pair and reset.
    ///
    /// Send failures are logged and skipped. Returns the number of messages
    /// the transport accepted.
    pub async fn flush(&mut self, publisher: &dyn Publisher) -> usize {
        let notifications = self.pending();
        self.pending.clear();

        let mut published = 0;
        for notification in &notifications {
            let message = notification.to_string();
            match publisher.publish(&message).await {
                Ok(()) => published += 1,
                Err(e) => warn!(message = %message, error = %e, "Failed to publish notification"),
            }
        }

        info!(
            published = published,
            total = notifications.len(),
            "Flushed change notifications"
        );
        published
    }
}
