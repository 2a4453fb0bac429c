//! Bounded FIFO queues for handing values between threads.
//!
//! The client runs two of these: commands flow from the game thread to the
//! network thread, events flow back. Both sides only ever poll, so neither
//! operation blocks:
//!
//! - [`BoundedQueue::push`] refuses the item when the queue is at capacity.
//!   The item is dropped on the spot and the queue's drop counter goes up.
//! - [`BoundedQueue::pop`] returns `None` straight away when empty.
//!
//! Each queue has its own lock, held only for the O(1) push/pop itself.
//!
//! # Shutdown
//!
//! [`BoundedQueue::close`] rejects every later push. Combined with
//! [`BoundedQueue::drain`] this gives the "drain and free" step of client
//! shutdown: after it, nothing is reachable through the queue.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{trace, warn};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why an item was not enqueued. The item itself is gone either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    #[error("queue is full ({capacity} items)")]
    Full { capacity: usize },

    #[error("queue is closed")]
    Closed,
}

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// Point-in-time view of a queue, for status displays.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    pub len: usize,
    pub capacity: usize,
    /// Items refused since creation, for any reason.
    pub dropped: u64,
}

// ---------------------------------------------------------------------------
// Queue
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct Inner<T> {
    items: VecDeque<T>,
    dropped: u64,
    closed: bool,
}

/// A thread-safe FIFO that never holds more than `capacity` items.
#[derive(Debug)]
pub struct BoundedQueue<T> {
    name: &'static str,
    capacity: usize,
    inner: Mutex<Inner<T>>,
}

impl<T> BoundedQueue<T> {
    /// Creates an empty queue. A capacity of 0 is bumped to 1.
    ///
    /// `name` only shows up in log lines.
    pub fn new(name: &'static str, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            name,
            capacity,
            inner: Mutex::new(Inner {
                items: VecDeque::new(),
                dropped: 0,
                closed: false,
            }),
        }
    }

    // A panic while holding this lock can't leave `Inner` half-updated
    // (every mutation is a single VecDeque call), so poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, Inner<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends `item` at the tail.
    ///
    /// # Errors
    /// [`QueueError::Full`] at capacity, [`QueueError::Closed`] after
    /// [`close`](Self::close). In both cases `item` is dropped and the drop
    /// counter is incremented.
    pub fn push(&self, item: T) -> Result<(), QueueError> {
        let mut inner = self.lock();
        let result = if inner.closed {
            Err(QueueError::Closed)
        } else if inner.items.len() >= self.capacity {
            Err(QueueError::Full {
                capacity: self.capacity,
            })
        } else {
            inner.items.push_back(item);
            trace!(queue = self.name, len = inner.items.len(), "enqueued");
            return Ok(());
        };
        inner.dropped += 1;
        let dropped = inner.dropped;
        drop(inner);

        if let Err(QueueError::Full { capacity }) = result {
            warn!(queue = self.name, capacity, dropped, "queue full, item dropped");
        }
        result
    }

    /// Removes and returns the head item, or `None` if the queue is empty.
    pub fn pop(&self) -> Option<T> {
        self.lock().items.pop_front()
    }

    /// Removes every queued item, oldest first.
    pub fn drain(&self) -> Vec<T> {
        self.lock().items.drain(..).collect()
    }

    /// Discards every queued item and returns how many there were.
    pub fn clear(&self) -> usize {
        let mut inner = self.lock();
        let n = inner.items.len();
        inner.items.clear();
        n
    }

    /// Stops accepting items. Already queued items stay poppable.
    pub fn close(&self) {
        self.lock().closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Total number of refused items.
    pub fn dropped(&self) -> u64 {
        self.lock().dropped
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn stats(&self) -> QueueStats {
        let inner = self.lock();
        QueueStats {
            len: inner.items.len(),
            capacity: self.capacity,
            dropped: inner.dropped,
        }
    }
}
