//! Transient notifications ("toasts") raised by upload and chat outcomes.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::sanitize;

const DEFAULT_TTL: Duration = Duration::from_secs(4);
const MAX_VISIBLE: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Success,
    Error,
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub level: Level,
    pub title: String,
    pub description: String,
    pub raised_at: Instant,
}

#[derive(Debug)]
pub struct Notifications {
    items: VecDeque<Notification>,
    ttl: Duration,
}

impl Default for Notifications {
    fn default() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }
}

impl Notifications {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            items: VecDeque::new(),
            ttl,
        }
    }

    pub fn success(&mut self, title: impl Into<String>, description: impl Into<String>) {
        self.push(Level::Success, title.into(), description.into());
    }

    pub fn error(&mut self, title: impl Into<String>, description: impl Into<String>) {
        self.push(Level::Error, title.into(), description.into());
    }

    fn push(&mut self, level: Level, title: String, description: String) {
        // Descriptions carry backend `detail` text, so they are cleaned here.
        let title = sanitize::for_display(&title).into_owned();
        let description = sanitize::for_display(&description).into_owned();
        match level {
            Level::Success => tracing::info!(%title, %description, "notification"),
            Level::Error => tracing::warn!(%title, %description, "notification"),
        }
        self.items.push_back(Notification {
            level,
            title,
            description,
            raised_at: Instant::now(),
        });
        while self.items.len() > MAX_VISIBLE {
            self.items.pop_front();
        }
    }

    /// Drop notifications older than the TTL
    pub fn prune(&mut self, now: Instant) {
        let ttl = self.ttl;
        self.items.retain(|n| now.saturating_duration_since(n.raised_at) < ttl);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Notification> {
        self.items.iter()
    }

    pub fn latest(&self) -> Option<&Notification> {
        self.items.back()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_only_the_newest_few() {
        let mut notes = Notifications::new();
        for i in 0..5 {
            notes.error("Error", format!("failure {i}"));
        }
        assert_eq!(notes.len(), MAX_VISIBLE);
        assert_eq!(notes.latest().unwrap().description, "failure 4");
        assert_eq!(notes.iter().next().unwrap().description, "failure 2");
    }

    #[test]
    fn prune_expires_old_entries() {
        let mut notes = Notifications::with_ttl(Duration::from_millis(10));
        notes.success("Success!", "done");
        notes.prune(Instant::now());
        assert_eq!(notes.len(), 1);

        notes.prune(Instant::now() + Duration::from_millis(50));
        assert!(notes.is_empty());
    }

    #[test]
    fn control_sequences_never_reach_a_notification() {
        let mut notes = Notifications::new();
        notes.error("Error\u{9b}", "bad\u{1b}[2Jthing");

        let note = notes.latest().unwrap();
        assert_eq!(note.title, "Error");
        assert_eq!(note.description, "bad[2Jthing");
    }
}
