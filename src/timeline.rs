//! Chronologically ordered queue of pending deliveries.
//!
//! The timeline is the single place where "what should go out, and when"
//! lives. Every entry is a delivery that became due at some wall-clock
//! instant; the router's processor task sleeps until the head entry is due,
//! drains the ready prefix, and executes it.
//!
//! # Wake signal
//!
//! Insertions may move the head earlier than whatever the processor is
//! currently sleeping towards. Instead of per-entry timers, a single
//! capacity-1 channel carries a coalescing wake: every insert posts
//! non-blockingly (dropped when the slot is full) and the processor
//! re-reads the queue head on every wake. Missing a post is harmless
//! because an earlier post with the same meaning is still buffered.

use std::{
    fmt,
    sync::{Mutex, PoisonError},
    time::SystemTime,
};

use tokio::sync::mpsc;

use crate::metadata::Metadata;

/// Why a delivery was scheduled. Audit only; execution does not branch
/// on it.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum UpdateKind {
    /// An input published new content.
    InputChange,

    /// The current source expired and a lower-priority source takes over.
    ExpirationFallback,
}

impl fmt::Display for UpdateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdateKind::InputChange => write!(f, "input change"),
            UpdateKind::ExpirationFallback => write!(f, "expiration fallback"),
        }
    }
}

/// One pending delivery.
#[derive(Clone, Debug)]
pub struct ScheduledUpdate {
    /// Wall-clock instant at which the delivery becomes due.
    pub execute_at: SystemTime,

    /// Name of the destination output.
    pub output: String,

    /// Snapshot to deliver, captured at scheduling time.
    pub metadata: Metadata,

    /// Why this delivery was scheduled.
    pub kind: UpdateKind,
}

/// Time-sorted queue of pending deliveries with per-output cancellation.
///
/// Entries are strictly ordered by `execute_at` ascending; entries with
/// equal times keep their insertion order. One lock protects the queue;
/// it is held only for the binary-search insert or the ready-prefix drain.
pub struct Timeline {
    entries: Mutex<Vec<ScheduledUpdate>>,
    wake_tx: mpsc::Sender<()>,
    wake_rx: Mutex<Option<mpsc::Receiver<()>>>,
}

impl Timeline {
    /// Capacity of the wake channel. One slot is enough: wakes coalesce.
    const WAKE_CAPACITY: usize = 1;

    /// Creates an empty timeline.
    #[must_use]
    pub fn new() -> Self {
        let (wake_tx, wake_rx) = mpsc::channel(Self::WAKE_CAPACITY);
        Self {
            entries: Mutex::new(Vec::new()),
            wake_tx,
            wake_rx: Mutex::new(Some(wake_rx)),
        }
    }

    /// Hands out the wake receiver to the processor task.
    ///
    /// Returns `None` after the first call; there is exactly one processor.
    pub fn take_waker(&self) -> Option<mpsc::Receiver<()>> {
        self.wake_rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Inserts a pending delivery at its chronological position and posts
    /// a wake.
    pub fn insert(&self, update: ScheduledUpdate) {
        {
            let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
            let index = entries.partition_point(|entry| entry.execute_at <= update.execute_at);
            entries.insert(index, update);
        }

        // Non-blocking: a full slot means the processor will wake anyway.
        let _ = self.wake_tx.try_send(());
    }

    /// Due time of the head entry, or `None` when the timeline is empty.
    #[must_use]
    pub fn next_execution_time(&self) -> Option<SystemTime> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .first()
            .map(|entry| entry.execute_at)
    }

    /// Atomically removes and returns every entry due at or before `now`,
    /// preserving order.
    #[must_use]
    pub fn drain_ready(&self, now: SystemTime) -> Vec<ScheduledUpdate> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let ready = entries.partition_point(|entry| entry.execute_at <= now);
        entries.drain(..ready).collect()
    }

    /// Removes every pending delivery for the named output.
    ///
    /// Returns the number of removed entries, for logging.
    pub fn cancel_for_output(&self, output: &str) -> usize {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|entry| entry.output != output);
        before - entries.len()
    }

    /// Whether a delivery is pending for the named output.
    #[must_use]
    pub fn has_pending_for(&self, output: &str) -> bool {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|entry| entry.output == output)
    }
}

impl Default for Timeline {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn update(output: &str, execute_at: SystemTime, title: &str) -> ScheduledUpdate {
        ScheduledUpdate {
            execute_at,
            output: output.to_string(),
            metadata: Metadata::new("", title),
            kind: UpdateKind::InputChange,
        }
    }

    #[test]
    fn entries_are_ordered_by_due_time() {
        let timeline = Timeline::new();
        let now = SystemTime::now();

        timeline.insert(update("b", now + Duration::from_secs(2), "late"));
        timeline.insert(update("a", now, "early"));

        assert_eq!(timeline.next_execution_time(), Some(now));
        let ready = timeline.drain_ready(now + Duration::from_secs(5));
        assert_eq!(ready.len(), 2);
        assert_eq!(ready[0].metadata.title, "early");
        assert_eq!(ready[1].metadata.title, "late");
    }

    #[test]
    fn equal_due_times_keep_insertion_order() {
        let timeline = Timeline::new();
        let now = SystemTime::now();

        timeline.insert(update("a", now, "first"));
        timeline.insert(update("b", now, "second"));
        timeline.insert(update("c", now, "third"));

        let ready = timeline.drain_ready(now);
        let titles: Vec<&str> = ready.iter().map(|u| u.metadata.title.as_str()).collect();
        assert_eq!(titles, ["first", "second", "third"]);
    }

    #[test]
    fn drain_only_returns_the_ready_prefix() {
        let timeline = Timeline::new();
        let now = SystemTime::now();

        timeline.insert(update("a", now, "due"));
        timeline.insert(update("b", now + Duration::from_secs(60), "future"));

        let ready = timeline.drain_ready(now);
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].metadata.title, "due");
        assert!(timeline.has_pending_for("b"));
        assert!(!timeline.has_pending_for("a"));
    }

    #[test]
    fn cancel_removes_all_entries_for_an_output() {
        let timeline = Timeline::new();
        let now = SystemTime::now();

        timeline.insert(update("a", now, "one"));
        timeline.insert(update("a", now + Duration::from_secs(1), "two"));
        timeline.insert(update("b", now, "keep"));

        assert_eq!(timeline.cancel_for_output("a"), 2);
        assert_eq!(timeline.cancel_for_output("a"), 0);
        assert!(timeline.has_pending_for("b"));
    }

    #[test]
    fn empty_timeline_has_no_due_time() {
        let timeline = Timeline::new();
        assert_eq!(timeline.next_execution_time(), None);
        assert!(timeline.drain_ready(SystemTime::now()).is_empty());
    }

    #[tokio::test]
    async fn insert_posts_a_coalescing_wake() {
        let timeline = Timeline::new();
        let mut waker = timeline.take_waker().unwrap();
        assert!(timeline.take_waker().is_none());

        let now = SystemTime::now();
        timeline.insert(update("a", now, "one"));
        timeline.insert(update("a", now, "two"));
        timeline.insert(update("a", now, "three"));

        // The slot coalesces: one buffered wake, never a blocked producer.
        waker.recv().await.unwrap();
        assert!(waker.try_recv().is_err());
    }
}
