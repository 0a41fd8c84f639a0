//! Fixed-capacity event buffer
//!
//! A FIFO ring over `VecDeque`: appends go to the tail, and once the buffer is
//! full the oldest entry is evicted first.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Bounded, insertion-ordered store for one event category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventBuffer<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> EventBuffer<T> {
    /// Create a buffer holding at most `capacity` items (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append at the tail, evicting from the head when full.
    ///
    /// Returns the evicted item, if any.
    pub fn append(&mut self, item: T) -> Option<T> {
        let evicted = if self.items.len() >= self.capacity {
            self.items.pop_front()
        } else {
            None
        };
        self.items.push_back(item);
        evicted
    }

    /// Iterate over the most recent `n` items, oldest first
    pub fn recent(&self, n: usize) -> impl Iterator<Item = &T> {
        let skip = self.items.len().saturating_sub(n);
        self.items.iter().skip(skip)
    }

    /// Iterate over all items, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    /// Most recently appended item
    pub fn latest(&self) -> Option<&T> {
        self.items.back()
    }

    /// Number of buffered items, never above `capacity`
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True when nothing is buffered
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Maximum number of items kept
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop every item; capacity is unchanged
    pub fn clear(&mut self) {
        self.items.clear();
    }
}

impl<T: Clone> EventBuffer<T> {
    /// Copy of the most recent `n` items, oldest first. Does not mutate the buffer.
    pub fn snapshot(&self, n: usize) -> Vec<T> {
        self.recent(n).cloned().collect()
    }

    /// Copy of every buffered item, oldest first
    pub fn to_vec(&self) -> Vec<T> {
        self.items.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_capacity_two_keeps_last_two() {
        let mut buffer = EventBuffer::new(2);
        buffer.append("A");
        buffer.append("B");
        let evicted = buffer.append("C");

        assert_eq!(evicted, Some("A"));
        assert_eq!(buffer.to_vec(), vec!["B", "C"]);
    }

    #[test]
    fn test_never_exceeds_capacity() {
        for capacity in 1..6 {
            let mut buffer = EventBuffer::new(capacity);
            for i in 0..20 {
                buffer.append(i);
                assert!(buffer.len() <= capacity);
            }
            let expected: Vec<i32> = ((20 - capacity as i32)..20).collect();
            assert_eq!(buffer.to_vec(), expected);
        }
    }

    #[test]
    fn test_snapshot_is_most_recent_and_non_mutating() {
        let mut buffer = EventBuffer::new(10);
        for i in 0..5 {
            buffer.append(i);
        }

        assert_eq!(buffer.snapshot(3), vec![2, 3, 4]);
        assert_eq!(buffer.snapshot(50), vec![0, 1, 2, 3, 4]);
        assert_eq!(buffer.len(), 5);
    }

    #[test]
    fn test_zero_capacity_clamped() {
        let mut buffer = EventBuffer::new(0);
        buffer.append(1);
        buffer.append(2);
        assert_eq!(buffer.capacity(), 1);
        assert_eq!(buffer.to_vec(), vec![2]);
    }

    #[test]
    fn test_clear() {
        let mut buffer = EventBuffer::new(3);
        buffer.append(1);
        buffer.clear();
        assert!(buffer.is_empty());
        assert_eq!(buffer.latest(), None);
    }
}
