use serde::{Deserialize, Serialize};

use crate::error::{EnvError, SurgeResult};

/// Outcome of one priced ride, kept for episode reporting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    /// Final price if the rider accepted, otherwise `0.0`.
    pub revenue: f64,
    pub accepted: bool,
    pub surge: f64,
}

/// Fixed-capacity ring buffer.
///
/// Storage is allocated once. When full, a push overwrites the oldest entry.
#[derive(Debug, Clone)]
pub struct HistoryBuffer<T> {
    buf: Vec<T>,
    /// Slot the next push writes to once the buffer is full.
    head: usize,
    capacity: usize,
}

impl<T> HistoryBuffer<T> {
    pub fn with_capacity(capacity: usize) -> SurgeResult<Self> {
        if capacity == 0 {
            return Err(EnvError::InvalidConfig(
                "history capacity must be greater than zero".to_string(),
            )
            .into());
        }
        Ok(Self {
            buf: Vec::with_capacity(capacity),
            head: 0,
            capacity,
        })
    }

    pub fn push(&mut self, item: T) {
        if self.buf.len() < self.capacity {
            self.buf.push(item);
        } else {
            self.buf[self.head] = item;
            self.head = (self.head + 1) % self.capacity;
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.buf.clear();
        self.head = 0;
    }

    /// Oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        let (newer, older) = self.buf.split_at(self.head);
        older.iter().chain(newer.iter())
    }

    pub fn latest(&self) -> Option<&T> {
        if self.buf.len() < self.capacity {
            self.buf.last()
        } else {
            let idx = (self.head + self.capacity - 1) % self.capacity;
            self.buf.get(idx)
        }
    }
}

impl HistoryBuffer<StepRecord> {
    /// Mean surge over retained steps, `0.0` when empty.
    pub fn mean_surge(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        self.iter().map(|r| r.surge).sum::<f64>() / self.len() as f64
    }

    pub fn revenue(&self) -> f64 {
        self.iter().map(|r| r.revenue).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_oldest_first() {
        let mut h = HistoryBuffer::with_capacity(3).unwrap();
        for i in 0..5 {
            h.push(i);
        }
        assert_eq!(h.len(), 3);
        assert_eq!(h.iter().copied().collect::<Vec<_>>(), vec![2, 3, 4]);
        assert_eq!(h.latest(), Some(&4));
    }

    #[test]
    fn partial_fill_keeps_order() {
        let mut h = HistoryBuffer::with_capacity(4).unwrap();
        h.push('a');
        h.push('b');
        assert_eq!(h.iter().collect::<String>(), "ab");
        assert_eq!(h.latest(), Some(&'b'));
        h.clear();
        assert!(h.is_empty());
        assert_eq!(h.latest(), None);
    }

    #[test]
    fn zero_capacity_is_rejected() {
        assert!(HistoryBuffer::<u8>::with_capacity(0).is_err());
    }

    #[test]
    fn mean_surge_over_window() {
        let mut h = HistoryBuffer::with_capacity(2).unwrap();
        assert_eq!(h.mean_surge(), 0.0);
        for surge in [3.0, 1.0, 2.0] {
            h.push(StepRecord {
                revenue: 1.0,
                accepted: true,
                surge,
            });
        }
        assert_eq!(h.mean_surge(), 1.5);
        assert_eq!(h.revenue(), 2.0);
    }
}
