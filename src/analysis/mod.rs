pub mod step_counter;
pub mod variance;

pub use step_counter::StepCounter;
pub use variance::VarianceEngine;

use crate::sensor::AccelerationEvent;

/// Common interface for statistic estimators fed by accelerometer events.
///
/// Each estimator turns the running event stream into one scalar: the
/// variance engine reports the spread of acceleration magnitude, the step
/// counter reports cadence in steps per minute. Both are pure functions of
/// the events and timestamps they have seen, which keeps replays
/// reproducible.
pub trait MotionEstimator {
    /// Feed one event received at `now_ms` and return the updated statistic.
    ///
    /// Events the estimator cannot use (missing components, wrong frame of
    /// reference) leave its state untouched and return the current value.
    fn process(&mut self, event: &AccelerationEvent, now_ms: u64) -> f32;

    /// Latest statistic.
    fn current(&self) -> f32;

    /// Forget all history.
    fn reset(&mut self);

    /// Short name for logging ("variance", "cadence", ...).
    fn estimator_type(&self) -> &'static str;
}
