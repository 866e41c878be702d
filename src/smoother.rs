/// Exponential moving average stepped once per rendered frame.
///
/// Each step moves the value `factor` of the way toward the input, so after
/// `n` steps with a constant input `v` the remaining error is
/// `|value_0 - v| * (1 - factor)^n`. The smoother knows nothing about sensor
/// liveness; it only decays when its input is driven to zero.
#[derive(Debug, Clone)]
pub struct SignalSmoother {
    factor: f32,
    value: f32,
}

impl SignalSmoother {
    pub fn new(factor: f32) -> Self {
        Self { factor, value: 0.0 }
    }

    pub fn step(&mut self, raw: f32) -> f32 {
        self.value += (raw - self.value) * self.factor;
        self.value
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn factor(&self) -> f32 {
        self.factor
    }

    pub fn reset(&mut self) {
        self.value = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_step_from_zero() {
        let mut smoother = SignalSmoother::new(0.05);
        let value = smoother.step(1.8634);
        assert!((value - 0.09317).abs() < 1e-4);
    }

    #[test]
    fn test_geometric_convergence() {
        let target = 4.0f32;
        let mut smoother = SignalSmoother::new(0.05);
        let mut previous_error = (smoother.value() - target).abs();

        for n in 1..=200 {
            smoother.step(target);
            let error = (smoother.value() - target).abs();
            assert!(error <= previous_error);
            let expected = target * 0.95f32.powi(n);
            assert!(
                (error - expected).abs() < 1e-4,
                "step {}: error {} expected {}",
                n,
                error,
                expected
            );
            previous_error = error;
        }
    }

    #[test]
    fn test_decays_only_when_input_drops() {
        let mut smoother = SignalSmoother::new(0.1);
        for _ in 0..100 {
            smoother.step(2.0);
        }
        let held = smoother.value();
        smoother.step(held);
        assert!((smoother.value() - held).abs() < 1e-6);

        for _ in 0..200 {
            smoother.step(0.0);
        }
        assert!(smoother.value() < 1e-6);
    }

    #[test]
    fn test_reset() {
        let mut smoother = SignalSmoother::new(0.5);
        smoother.step(10.0);
        smoother.reset();
        assert_eq!(smoother.value(), 0.0);
    }
}
