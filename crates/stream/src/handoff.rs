//! Bounded FIFO of reclaimed buffers, completion handler → producer.
//!
//! Holds at most `N - 1` entries for a pool of `N` buffers: one buffer is
//! always in flight in the hardware chain and can never be queued. When the
//! producer falls behind, the oldest entry is dropped so the newest reclaimed
//! buffer is always available.

use heapless::Deque;

use crate::error::StreamError;
use crate::pool::BufferId;

/// Drop-oldest queue of buffer ids.
#[derive(Debug)]
pub struct HandoffQueue<const N: usize> {
    items: Deque<BufferId, N>,
}

impl<const N: usize> Default for HandoffQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> HandoffQueue<N> {
    /// Logical capacity: one less than the pool size.
    pub const CAPACITY: usize = N.saturating_sub(1);

    /// Create an empty queue.
    pub const fn new() -> Self {
        Self {
            items: Deque::new(),
        }
    }

    /// Append `id`, evicting the oldest entry first if the queue is full.
    ///
    /// Returns the evicted id, if any.
    pub fn push(&mut self, id: BufferId) -> Option<BufferId> {
        let evicted = if self.items.len() >= Self::CAPACITY {
            self.items.pop_front()
        } else {
            None
        };
        match self.items.push_back(id) {
            Ok(()) => evicted,
            // Only reachable for a zero-capacity queue: the new entry is the one dropped.
            Err(rejected) => Some(rejected),
        }
    }

    /// Remove and return the oldest entry.
    pub fn pop(&mut self) -> Result<BufferId, StreamError> {
        self.items.pop_front().ok_or(StreamError::EmptyQueue)
    }

    /// Current number of entries.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// `true` when no reclaimed buffer is waiting.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// `true` when the next push will evict.
    pub fn is_full(&self) -> bool {
        self.items.len() >= Self::CAPACITY
    }

    /// Whether `id` is waiting in the queue.
    pub fn contains(&self, id: BufferId) -> bool {
        self.items.iter().any(|&queued| queued == id)
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Entries from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = BufferId> + '_ {
        self.items.iter().copied()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn id(i: usize) -> BufferId {
        BufferId::new(i).unwrap()
    }

    #[test]
    fn capacity_is_one_less_than_pool() {
        assert_eq!(HandoffQueue::<8>::CAPACITY, 7);
        assert_eq!(HandoffQueue::<2>::CAPACITY, 1);
    }

    #[test]
    fn fifo_order() {
        let mut q = HandoffQueue::<4>::new();
        assert_eq!(q.push(id(0)), None);
        assert_eq!(q.push(id(1)), None);
        assert_eq!(q.pop(), Ok(id(0)));
        assert_eq!(q.pop(), Ok(id(1)));
        assert_eq!(q.pop(), Err(StreamError::EmptyQueue));
    }

    #[test]
    fn full_queue_evicts_oldest() {
        let mut q = HandoffQueue::<4>::new();
        for i in 0..3 {
            assert_eq!(q.push(id(i)), None);
        }
        assert!(q.is_full());
        assert_eq!(q.push(id(3)), Some(id(0)));
        assert_eq!(q.len(), 3);
        assert!(!q.contains(id(0)));
        assert_eq!(q.iter().collect::<Vec<_>>(), vec![id(1), id(2), id(3)]);
    }

    #[test]
    fn clear_empties() {
        let mut q = HandoffQueue::<3>::new();
        q.push(id(1));
        q.clear();
        assert!(q.is_empty());
        assert_eq!(q.pop(), Err(StreamError::EmptyQueue));
    }
}
