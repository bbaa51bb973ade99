//! Fixed-capacity sliding window
//!
//! Strict FIFO buffer of scalar values. Once full, every push evicts the oldest
//! value before appending the new one.

use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct SlidingWindow {
    values: VecDeque<f64>,
    capacity: usize,
}

impl SlidingWindow {
    /// Create an empty window. Capacity never changes afterwards.
    pub fn new(capacity: usize) -> Self {
        Self {
            values: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, value: f64) {
        if self.values.len() == self.capacity {
            self.values.pop_front();
        }
        if self.capacity > 0 {
            self.values.push_back(value);
        }
    }

    pub fn is_full(&self) -> bool {
        self.values.len() == self.capacity
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current contents in arrival order
    pub fn snapshot(&self) -> impl ExactSizeIterator<Item = f64> + '_ {
        self.values.iter().copied()
    }

    /// Drop all values (partial windows are discarded, never evaluated)
    pub fn clear(&mut self) {
        self.values.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_len_never_exceeds_capacity() {
        let mut window = SlidingWindow::new(5);
        for i in 0..23 {
            window.push(i as f64);
            assert!(window.len() <= 5);
            if i >= 4 {
                assert!(window.is_full());
                assert_eq!(window.len(), 5);
            }
        }
    }

    #[test]
    fn test_eviction_order() {
        // Push v1..v(W+k) and keep exactly v(k+1)..v(W+k)
        let capacity = 4;
        let k = 3;
        let mut window = SlidingWindow::new(capacity);
        for v in 1..=(capacity + k) {
            window.push(v as f64);
        }

        let contents: Vec<f64> = window.snapshot().collect();
        assert_eq!(contents, vec![4.0, 5.0, 6.0, 7.0]);
    }

    #[test]
    fn test_not_full_until_capacity() {
        let mut window = SlidingWindow::new(3);
        window.push(1.0);
        window.push(2.0);
        assert!(!window.is_full());
        window.push(3.0);
        assert!(window.is_full());
    }

    #[test]
    fn test_clear_discards_contents() {
        let mut window = SlidingWindow::new(3);
        window.push(1.0);
        window.push(2.0);
        window.clear();

        assert!(window.is_empty());
        assert_eq!(window.capacity(), 3);
    }
}
