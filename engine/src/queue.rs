//! Bounded lock-free ingress queue
//!
//! Multi-producer / multi-consumer queue of pool slot handles. FIFO order
//! across producers is not promised and detectors must not depend on it.

use crate::memory::Slot;
use crossbeam::queue::ArrayQueue;

/// Bounded MPMC queue of trade slot handles
pub struct IngressQueue {
    inner: ArrayQueue<Slot>,
}

impl IngressQueue {
    /// Create a queue with the given capacity
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: ArrayQueue::new(capacity),
        }
    }

    /// Push a slot handle, handing it back when the queue is full
    pub fn try_push(&self, slot: Slot) -> Result<(), Slot> {
        self.inner.push(slot)
    }

    /// Pop a slot handle, `None` when empty
    pub fn try_pop(&self) -> Option<Slot> {
        self.inner.pop()
    }

    /// Best-effort depth for statistics
    pub fn size_hint(&self) -> usize {
        self.inner.len()
    }

    /// Whether the queue is currently empty
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Configured capacity
    pub fn capacity(&self) -> usize {
        self.inner.capacity()
    }
}
