//! Deferred command queue for the layout pass.
//!
//! Chip glyph sizing depends on a width that is not known until the owning
//! widget has been laid out once. Commands that need that width (for example
//! an initial programmatic token add) are posted here and drained by the
//! widget at a well-defined point in its layout cycle, preserving submission
//! order (FIFO).
//!
//! The queue holds plain command values rather than closures: the single
//! mutator thread drains it with exclusive access to the widget, so the
//! widget itself interprets each command. A queue that is dropped with
//! commands still pending simply discards them; a deferred add that targets
//! a widget that no longer exists must no-op rather than fail.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

/// A unique identifier for a queued command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QueuedWorkId(u64);

impl QueuedWorkId {
    /// Get the raw u64 value of this work ID.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

/// Global counter for generating unique work IDs.
static NEXT_WORK_ID: AtomicU64 = AtomicU64::new(1);

fn next_work_id() -> QueuedWorkId {
    QueuedWorkId(NEXT_WORK_ID.fetch_add(1, Ordering::Relaxed))
}

/// Internal command data.
struct WorkData<T> {
    id: QueuedWorkId,
    command: T,
}

/// FIFO queue of commands deferred until the next layout pass.
pub struct LayoutQueue<T> {
    /// Pending commands in submission order.
    pending: VecDeque<WorkData<T>>,
}

impl<T> Default for LayoutQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> LayoutQueue<T> {
    /// Create a new empty queue.
    pub fn new() -> Self {
        Self {
            pending: VecDeque::new(),
        }
    }

    /// Post a command to run on the next layout pass.
    ///
    /// Returns the work ID that can be used to cancel it before the drain.
    pub fn post(&mut self, command: T) -> QueuedWorkId {
        let id = next_work_id();
        self.pending.push_back(WorkData { id, command });
        tracing::trace!(
            target: "tagline_core::layout_queue",
            id = id.as_u64(),
            pending = self.pending.len(),
            "posted deferred command"
        );
        id
    }

    /// Cancel a pending command.
    ///
    /// Returns `true` if the command was found and cancelled.
    pub fn cancel(&mut self, id: QueuedWorkId) -> bool {
        if let Some(pos) = self.pending.iter().position(|w| w.id == id) {
            self.pending.remove(pos);
            true
        } else {
            false
        }
    }

    /// Check if there are any pending commands.
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Get the number of pending commands.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Take all pending commands out of the queue, in submission order.
    ///
    /// The caller interprets the commands with exclusive access to whatever
    /// state they target; commands posted during that interpretation land in
    /// the (now empty) queue for the next drain.
    pub fn take_pending(&mut self) -> Vec<T> {
        self.pending.drain(..).map(|w| w.command).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_order() {
        let mut queue = LayoutQueue::new();
        for i in 0..5 {
            queue.post(i);
        }

        assert_eq!(queue.take_pending(), vec![0, 1, 2, 3, 4]);
        assert!(!queue.has_pending());
    }

    #[test]
    fn test_cancel() {
        let mut queue = LayoutQueue::new();
        let a = queue.post("a");
        let _b = queue.post("b");

        assert!(queue.cancel(a));
        assert!(!queue.cancel(a)); // already gone

        assert_eq!(queue.take_pending(), vec!["b"]);
    }

    #[test]
    fn test_pending_count() {
        let mut queue = LayoutQueue::new();
        assert_eq!(queue.pending_count(), 0);
        queue.post(1);
        queue.post(2);
        assert_eq!(queue.pending_count(), 2);
        queue.take_pending();
        assert_eq!(queue.pending_count(), 0);
    }

    #[test]
    fn test_ids_are_unique() {
        let mut queue = LayoutQueue::new();
        let a = queue.post(());
        let b = queue.post(());
        assert_ne!(a, b);
    }
}
