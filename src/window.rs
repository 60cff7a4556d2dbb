//! Fixed-capacity rolling window with FIFO eviction.

use std::collections::VecDeque;

/// Bounded sequence that drops its oldest entry once full.
///
/// Backed by a `VecDeque` allocated once at full capacity, so pushes and
/// evictions are O(1) and never reallocate.
#[derive(Debug, Clone)]
pub struct RollingWindow<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> RollingWindow<T> {
    /// Create an empty window. A capacity of zero is bumped to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a value, returning the evicted oldest value if the window was full.
    pub fn push(&mut self, value: T) -> Option<T> {
        let evicted = if self.items.len() == self.capacity {
            self.items.pop_front()
        } else {
            None
        };
        self.items.push_back(value);
        evicted
    }

    /// Number of stored values.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the window is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Maximum number of stored values.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Most recently pushed value.
    pub fn last(&self) -> Option<&T> {
        self.items.back()
    }

    /// Iterate oldest to newest.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator + '_ {
        self.items.iter()
    }

    /// Iterate the newest `n` values, oldest first.
    pub fn recent(&self, n: usize) -> impl Iterator<Item = &T> + '_ {
        let skip = self.items.len().saturating_sub(n);
        self.items.iter().skip(skip)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_evicts_oldest_when_full() {
        let mut window = RollingWindow::new(3);
        assert_eq!(window.push(1), None);
        assert_eq!(window.push(2), None);
        assert_eq!(window.push(3), None);
        assert_eq!(window.push(4), Some(1));

        assert_eq!(window.len(), 3);
        assert_eq!(window.iter().copied().collect::<Vec<_>>(), vec![2, 3, 4]);
        assert_eq!(window.last(), Some(&4));
    }

    #[test]
    fn recent_returns_tail_in_order() {
        let mut window = RollingWindow::new(10);
        for i in 0..6 {
            window.push(i);
        }

        assert_eq!(window.recent(3).copied().collect::<Vec<_>>(), vec![3, 4, 5]);
        assert_eq!(window.recent(100).count(), 6);
    }

    #[test]
    fn zero_capacity_holds_one_value() {
        let mut window = RollingWindow::new(0);
        window.push("a");
        window.push("b");
        assert_eq!(window.capacity(), 1);
        assert_eq!(window.last(), Some(&"b"));
    }
}
