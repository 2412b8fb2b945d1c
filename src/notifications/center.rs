//! In-process notification queue with expiry.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;
use tokio::time::Instant;
use tracing::{error, info};

use super::{Notification, NotificationLevel};

/// Most recent notifications kept for `history`
const HISTORY_LIMIT: usize = 100;

struct Entry {
    notification: Notification,
    expires_at: Instant,
}

#[derive(Default)]
struct Inner {
    next_id: u64,
    entries: Vec<Entry>,
    history: VecDeque<Notification>,
}

impl Inner {
    fn prune(&mut self, now: Instant) {
        self.entries.retain(|e| e.expires_at > now);
    }
}

/// Shared queue of transient notifications.
///
/// Cloning is cheap; every clone pushes to and reads from the same queue.
#[derive(Clone)]
pub struct NotificationCenter {
    inner: Arc<Mutex<Inner>>,
    ttl: Duration,
}

impl NotificationCenter {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            ttl,
        }
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Queue a notification and return its id
    pub fn push(&self, level: NotificationLevel, message: impl Into<String>) -> u64 {
        let message = message.into();
        match level {
            NotificationLevel::Error => error!(message = %message, "notification"),
            NotificationLevel::Success | NotificationLevel::Info => {
                info!(level = level.label(), message = %message, "notification");
            }
        }

        let now = Instant::now();
        let mut inner = self.inner();
        inner.prune(now);
        inner.next_id += 1;
        let id = inner.next_id;
        let notification = Notification {
            id,
            level,
            message,
            created_at: Utc::now(),
        };

        if inner.history.len() == HISTORY_LIMIT {
            inner.history.pop_front();
        }
        inner.history.push_back(notification.clone());
        inner.entries.push(Entry {
            notification,
            expires_at: now + self.ttl,
        });
        id
    }

    pub fn success(&self, message: impl Into<String>) -> u64 {
        self.push(NotificationLevel::Success, message)
    }

    pub fn error(&self, message: impl Into<String>) -> u64 {
        self.push(NotificationLevel::Error, message)
    }

    pub fn info(&self, message: impl Into<String>) -> u64 {
        self.push(NotificationLevel::Info, message)
    }

    /// Remove a notification before it expires. Returns false if it was
    /// already gone.
    pub fn dismiss(&self, id: u64) -> bool {
        let mut inner = self.inner();
        let before = inner.entries.len();
        inner.entries.retain(|e| e.notification.id != id);
        inner.entries.len() != before
    }

    /// Unexpired notifications, oldest first. Expired ones are dropped.
    pub fn active(&self) -> Vec<Notification> {
        let mut inner = self.inner();
        inner.prune(Instant::now());
        inner
            .entries
            .iter()
            .map(|e| e.notification.clone())
            .collect()
    }

    /// The last pushed notifications, oldest first, including expired and
    /// dismissed ones
    pub fn history(&self) -> Vec<Notification> {
        self.inner().history.iter().cloned().collect()
    }

    pub fn clear(&self) {
        let mut inner = self.inner();
        inner.entries.clear();
        inner.history.clear();
    }

    #[cfg(test)]
    fn stored(&self) -> usize {
        self.inner().entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_notifications_expire() {
        let center = NotificationCenter::new(Duration::from_secs(5));
        center.success("Document set created");
        tokio::time::advance(Duration::from_secs(3)).await;
        center.error("Failed to delete");

        let active = center.active();
        assert_eq!(active.len(), 2);
        assert_eq!(active[0].level, NotificationLevel::Success);

        tokio::time::advance(Duration::from_secs(3)).await;
        let active = center.active();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].message, "Failed to delete");
    }

    #[tokio::test]
    async fn test_dismiss() {
        let center = NotificationCenter::new(Duration::from_secs(60));
        let id = center.info("hello");
        let clone = center.clone();

        assert!(clone.dismiss(id));
        assert!(!center.dismiss(id));
        assert!(center.active().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_push_drops_expired_entries() {
        let center = NotificationCenter::new(Duration::from_secs(5));
        for i in 0..10 {
            center.info(format!("sync {i}"));
            tokio::time::advance(Duration::from_secs(6)).await;
        }
        center.info("last");

        // nobody called active(); expired entries still went away
        assert_eq!(center.stored(), 1);
        assert_eq!(center.history().len(), 11);
        assert_eq!(center.history()[0].message, "sync 0");
    }

    #[test]
    fn test_history_is_capped() {
        let center = NotificationCenter::new(Duration::from_secs(60));
        for i in 0..HISTORY_LIMIT + 5 {
            center.info(format!("n{i}"));
        }
        let history = center.history();
        assert_eq!(history.len(), HISTORY_LIMIT);
        assert_eq!(history[0].message, "n5");
    }

    #[test]
    fn test_display() {
        let center = NotificationCenter::new(Duration::from_secs(60));
        center.error("boom");
        assert_eq!(center.history()[0].to_string(), "[error] boom");
    }
}
