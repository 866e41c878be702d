use super::MotionEstimator;
use crate::config::MotionConfig;
use crate::sensor::{AccelerationEvent, MotionSample, SampleBuffer};

/// Population standard deviation of acceleration magnitude over a trailing
/// time window.
///
/// Until the window holds `min_samples` readings the output is pinned to 0;
/// a handful of samples gives a spread that is mostly noise.
pub struct VarianceEngine {
    buffer: SampleBuffer,
    min_samples: usize,
    current: f32,
}

impl VarianceEngine {
    pub fn new(config: &MotionConfig) -> Self {
        Self {
            buffer: SampleBuffer::new(config.window_ms),
            min_samples: config.min_samples,
            current: 0.0,
        }
    }

    /// Push a magnitude reading directly and recompute.
    pub fn push_magnitude(&mut self, timestamp_ms: u64, magnitude: f32) -> f32 {
        self.buffer.push(MotionSample::new(timestamp_ms, magnitude));
        self.current = self.compute();
        self.current
    }

    fn compute(&self) -> f32 {
        let count = self.buffer.len();
        if count < self.min_samples {
            return 0.0;
        }

        let mean = self.buffer.magnitudes().sum::<f32>() / count as f32;
        let variance = self
            .buffer
            .magnitudes()
            .map(|m| (m - mean).powi(2))
            .sum::<f32>()
            / count as f32;

        variance.sqrt()
    }

    pub fn buffer(&self) -> &SampleBuffer {
        &self.buffer
    }
}

impl MotionEstimator for VarianceEngine {
    fn process(&mut self, event: &AccelerationEvent, now_ms: u64) -> f32 {
        match event.magnitude() {
            Some(magnitude) => self.push_magnitude(now_ms, magnitude),
            None => self.current,
        }
    }

    fn current(&self) -> f32 {
        self.current
    }

    fn reset(&mut self) {
        self.buffer.clear();
        self.current = 0.0;
    }

    fn estimator_type(&self) -> &'static str {
        "variance"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> VarianceEngine {
        VarianceEngine::new(&MotionConfig::default())
    }

    #[test]
    fn test_floor_below_five_samples() {
        let mut engine = engine();
        for (i, magnitude) in [1.0, 50.0, 0.0, 1000.0].iter().enumerate() {
            assert_eq!(engine.push_magnitude(i as u64 * 10, *magnitude), 0.0);
        }
    }

    #[test]
    fn test_population_stddev() {
        let mut engine = engine();
        let mut value = 0.0;
        for (i, magnitude) in [1.0, 1.0, 1.0, 1.0, 1.0, 6.0].iter().enumerate() {
            value = engine.push_magnitude(i as u64 * 20, *magnitude);
        }
        // mean 11/6, variance 125/36
        let expected = (125.0f32 / 36.0).sqrt();
        assert!((value - expected).abs() < 1e-5, "got {}", value);
        assert!((value - 1.8634).abs() < 1e-3);
    }

    #[test]
    fn test_constant_signal_has_no_spread() {
        let mut engine = engine();
        for i in 0..20 {
            engine.push_magnitude(i * 16, 9.81);
        }
        assert!(engine.current().abs() < 1e-5);
    }

    #[test]
    fn test_returns_to_floor_after_gap() {
        let mut engine = engine();
        for i in 0..10 {
            engine.push_magnitude(i * 20, (i % 3) as f32);
        }
        assert!(engine.current() > 0.0);
        // 5s later only the new sample is inside the 2s window
        assert_eq!(engine.push_magnitude(5_000, 3.0), 0.0);
        assert_eq!(engine.buffer().len(), 1);
    }

    #[test]
    fn test_incomplete_events_are_ignored() {
        let mut engine = engine();
        let missing = AccelerationEvent {
            x: Some(1.0),
            y: None,
            z: Some(1.0),
            includes_gravity: true,
        };
        engine.process(&missing, 10);
        assert!(engine.buffer().is_empty());

        engine.process(&AccelerationEvent::new(0.0, 9.8, 0.0, true), 20);
        assert_eq!(engine.buffer().len(), 1);
        assert_eq!(engine.estimator_type(), "variance");
    }

    #[test]
    fn test_reset() {
        let mut engine = engine();
        for i in 0..6 {
            engine.push_magnitude(i * 10, i as f32);
        }
        engine.reset();
        assert_eq!(engine.current(), 0.0);
        assert!(engine.buffer().is_empty());
    }
}
