//! Bounded population history.

use protocol::HistorySample;
use std::collections::VecDeque;

/// Oldest-first ring of population samples. Once `capacity` is reached every
/// new sample drops the oldest one.
#[derive(Debug, Clone)]
pub struct History {
    samples: VecDeque<HistorySample>,
    capacity: usize,
}

impl History {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a sample, dropping the oldest when full.
    pub fn record(&mut self, sample: HistorySample) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn latest(&self) -> Option<&HistorySample> {
        self.samples.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &HistorySample> {
        self.samples.iter()
    }

    pub fn to_vec(&self) -> Vec<HistorySample> {
        self.samples.iter().copied().collect()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol::Phase;

    fn sample(time: u64) -> HistorySample {
        HistorySample {
            time,
            population: time as usize,
            phase: Phase::Lag,
        }
    }

    #[test]
    fn test_fifo_drop_oldest() {
        let mut history = History::new(3);
        for t in 1..=5 {
            history.record(sample(t));
            assert!(history.len() <= 3);
        }
        let times: Vec<u64> = history.iter().map(|s| s.time).collect();
        assert_eq!(times, vec![3, 4, 5]);
        assert_eq!(history.latest().map(|s| s.time), Some(5));
    }

    #[test]
    fn test_clear() {
        let mut history = History::new(2);
        history.record(sample(1));
        history.clear();
        assert!(history.is_empty());
        history.record(sample(2));
        history.record(sample(3));
        history.record(sample(4));
        assert_eq!(history.len(), 2);
    }
}
