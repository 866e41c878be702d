use std::collections::VecDeque;

use super::MotionEstimator;
use crate::config::CadenceConfig;
use crate::sensor::AccelerationEvent;

/// Peak-counting cadence estimator.
///
/// A step is a gravity-free acceleration peak above `peak_threshold` that
/// comes more than `step_interval_ms` after the previous one. Cadence is the
/// number of steps in the trailing history window scaled to steps per minute.
pub struct StepCounter {
    peak_threshold: f32,
    step_interval_ms: u64,
    history_window_ms: u64,
    last_peak_ms: Option<u64>,
    step_history: VecDeque<u64>,
    total_steps: u64,
    cadence: f32,
}

impl StepCounter {
    pub fn new(config: &CadenceConfig) -> Self {
        Self {
            peak_threshold: config.peak_threshold,
            step_interval_ms: config.step_interval_ms,
            history_window_ms: config.history_window_ms,
            last_peak_ms: None,
            step_history: VecDeque::with_capacity(32),
            total_steps: 0,
            cadence: 0.0,
        }
    }

    /// Feed a gravity-free magnitude reading taken at `now_ms`.
    pub fn push_magnitude(&mut self, now_ms: u64, magnitude: f32) -> f32 {
        let debounced = self
            .last_peak_ms
            .map_or(true, |last| now_ms.saturating_sub(last) > self.step_interval_ms);

        if magnitude > self.peak_threshold && debounced {
            self.last_peak_ms = Some(now_ms);
            self.step_history.push_back(now_ms);
            self.total_steps += 1;
        }

        while let Some(&oldest) = self.step_history.front() {
            if now_ms.saturating_sub(oldest) <= self.history_window_ms {
                break;
            }
            self.step_history.pop_front();
        }

        self.cadence = self.step_history.len() as f32 * self.steps_per_minute_scale();
        self.cadence
    }

    fn steps_per_minute_scale(&self) -> f32 {
        60_000.0 / self.history_window_ms as f32
    }

    pub fn total_steps(&self) -> u64 {
        self.total_steps
    }

    pub fn last_peak_ms(&self) -> Option<u64> {
        self.last_peak_ms
    }

    pub fn steps_in_window(&self) -> usize {
        self.step_history.len()
    }
}

impl MotionEstimator for StepCounter {
    fn process(&mut self, event: &AccelerationEvent, now_ms: u64) -> f32 {
        // Gravity dominates the magnitude and would read as a peak on every sample
        if event.includes_gravity {
            return self.cadence;
        }
        match event.magnitude() {
            Some(magnitude) => self.push_magnitude(now_ms, magnitude),
            None => self.cadence,
        }
    }

    fn current(&self) -> f32 {
        self.cadence
    }

    fn reset(&mut self) {
        self.last_peak_ms = None;
        self.step_history.clear();
        self.total_steps = 0;
        self.cadence = 0.0;
    }

    fn estimator_type(&self) -> &'static str {
        "cadence"
    }
}
