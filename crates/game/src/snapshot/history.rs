use std::collections::VecDeque;

use glam::Vec3;

pub const DEFAULT_HISTORY_CAPACITY: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub timestamp_ms: f64,
    pub position: Vec3,
    pub yaw: f32,
}

impl Sample {
    pub fn new(timestamp_ms: f64, position: Vec3, yaw: f32) -> Self {
        Self {
            timestamp_ms,
            position,
            yaw,
        }
    }
}

/// Bounded, time-ordered samples for one entity (oldest first).
#[derive(Debug, Clone)]
pub struct EntityHistory {
    samples: VecDeque<Sample>,
    capacity: usize,
    last_seen_ms: f64,
}

impl EntityHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
            last_seen_ms: f64::NEG_INFINITY,
        }
    }

    /// Appends a sample, dropping the oldest once over capacity. Samples older
    /// than the newest recorded one are rejected.
    pub fn push(&mut self, sample: Sample) -> bool {
        if self
            .samples
            .back()
            .is_some_and(|last| sample.timestamp_ms < last.timestamp_ms)
        {
            return false;
        }

        while self.samples.len() >= self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
        true
    }

    pub fn touch(&mut self, now_ms: f64) {
        self.last_seen_ms = self.last_seen_ms.max(now_ms);
    }

    pub fn last_seen_ms(&self) -> f64 {
        self.last_seen_ms
    }

    pub fn is_stale(&self, now_ms: f64, stale_after_ms: f64) -> bool {
        now_ms - self.last_seen_ms > stale_after_ms
    }

    pub fn samples(&self) -> &VecDeque<Sample> {
        &self.samples
    }

    pub fn latest(&self) -> Option<&Sample> {
        self.samples.back()
    }

    pub fn oldest(&self) -> Option<&Sample> {
        self.samples.front()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_is_bounded_and_sorted() {
        let mut history = EntityHistory::new(DEFAULT_HISTORY_CAPACITY);

        for i in 0..100 {
            assert!(history.push(Sample::new(i as f64 * 50.0, Vec3::splat(i as f32), 0.0)));
        }

        assert_eq!(history.len(), DEFAULT_HISTORY_CAPACITY);
        assert_eq!(history.oldest().unwrap().timestamp_ms, 68.0 * 50.0);
        assert_eq!(history.latest().unwrap().timestamp_ms, 99.0 * 50.0);
        assert!(
            history
                .samples()
                .iter()
                .zip(history.samples().iter().skip(1))
                .all(|(a, b)| a.timestamp_ms <= b.timestamp_ms)
        );
    }

    #[test]
    fn test_out_of_order_sample_rejected() {
        let mut history = EntityHistory::new(4);
        assert!(history.push(Sample::new(100.0, Vec3::ZERO, 0.0)));
        assert!(history.push(Sample::new(100.0, Vec3::ONE, 0.0)));
        assert!(!history.push(Sample::new(50.0, Vec3::X, 0.0)));
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_staleness() {
        let mut history = EntityHistory::new(4);
        history.touch(1000.0);

        assert!(!history.is_stale(6000.0, 5000.0));
        assert!(history.is_stale(6000.1, 5000.0));
    }
}
