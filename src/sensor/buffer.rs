use std::collections::VecDeque;

/// Acceleration magnitude at a point in time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionSample {
    pub timestamp_ms: u64,
    pub magnitude: f32,
}

impl MotionSample {
    pub fn new(timestamp_ms: u64, magnitude: f32) -> Self {
        Self {
            timestamp_ms,
            magnitude,
        }
    }
}

/// Time-windowed FIFO of motion samples.
///
/// Samples are appended in receipt order, which is assumed to be time order.
/// Every push evicts from the front whatever fell out of the trailing window,
/// so after a push all retained samples satisfy `now - timestamp <= window_ms`.
#[derive(Debug, Clone)]
pub struct SampleBuffer {
    window_ms: u64,
    samples: VecDeque<MotionSample>,
}

impl SampleBuffer {
    pub fn new(window_ms: u64) -> Self {
        Self {
            window_ms,
            samples: VecDeque::with_capacity(128),
        }
    }

    /// Append a sample and evict everything older than the window, measured
    /// from the new sample's timestamp.
    pub fn push(&mut self, sample: MotionSample) {
        let now = sample.timestamp_ms;
        self.samples.push_back(sample);
        self.evict(now);
    }

    /// Drop samples with `timestamp < now - window_ms`.
    pub fn evict(&mut self, now_ms: u64) {
        let horizon = now_ms.saturating_sub(self.window_ms);
        while let Some(front) = self.samples.front() {
            if front.timestamp_ms >= horizon {
                break;
            }
            self.samples.pop_front();
        }
    }

    /// Current contents, oldest first.
    pub fn snapshot(&self) -> Vec<MotionSample> {
        self.samples.iter().copied().collect()
    }

    pub fn magnitudes(&self) -> impl Iterator<Item = f32> + '_ {
        self.samples.iter().map(|s| s.magnitude)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn window_ms(&self) -> u64 {
        self.window_ms
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retains_samples_inside_window() {
        let mut buffer = SampleBuffer::new(2000);
        for t in (0..=2000).step_by(100) {
            buffer.push(MotionSample::new(t, 1.0));
        }
        // 0..=2000 is exactly one window wide, nothing is stale yet
        assert_eq!(buffer.len(), 21);

        buffer.push(MotionSample::new(2100, 1.0));
        assert_eq!(buffer.snapshot().first().unwrap().timestamp_ms, 100);
    }

    #[test]
    fn test_every_retained_sample_is_fresh() {
        let mut buffer = SampleBuffer::new(500);
        let mut t = 0;
        for gap in [10, 250, 40, 700, 5, 5, 300, 120, 90, 1000, 20] {
            t += gap;
            buffer.push(MotionSample::new(t, gap as f32));
            for sample in buffer.snapshot() {
                assert!(t - sample.timestamp_ms <= 500);
            }
        }
    }

    #[test]
    fn test_eviction_is_fifo() {
        let mut buffer = SampleBuffer::new(1000);
        buffer.push(MotionSample::new(0, 1.0));
        buffer.push(MotionSample::new(400, 2.0));
        buffer.push(MotionSample::new(800, 3.0));
        buffer.push(MotionSample::new(1500, 4.0));

        let kept: Vec<f32> = buffer.magnitudes().collect();
        assert_eq!(kept, vec![3.0, 4.0]);
    }

    #[test]
    fn test_long_gap_leaves_only_newest() {
        let mut buffer = SampleBuffer::new(2000);
        for t in 0..10 {
            buffer.push(MotionSample::new(t * 10, 1.0));
        }
        buffer.push(MotionSample::new(60_000, 2.0));
        assert_eq!(buffer.snapshot(), vec![MotionSample::new(60_000, 2.0)]);
    }

    #[test]
    fn test_snapshot_does_not_mutate() {
        let mut buffer = SampleBuffer::new(2000);
        buffer.push(MotionSample::new(10, 1.0));
        let _ = buffer.snapshot();
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn test_explicit_evict_drains_when_idle() {
        let mut buffer = SampleBuffer::new(2000);
        buffer.push(MotionSample::new(100, 1.0));
        buffer.evict(5000);
        assert!(buffer.is_empty());
    }
}
