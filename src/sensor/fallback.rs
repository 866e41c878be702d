use super::PointerEvent;

/// Synthetic motion signal derived from pointer position, used when the host
/// refuses or lacks motion sensors. Left edge is 0, right edge approaches
/// `range`.
#[derive(Debug, Clone, Copy)]
pub struct PointerFallback {
    range: f32,
}

impl PointerFallback {
    pub fn new(range: f32) -> Self {
        Self { range }
    }

    /// Map a pointer position into `[0, range)`.
    pub fn signal(&self, event: &PointerEvent) -> f32 {
        if event.width <= 0.0 || !event.x.is_finite() {
            return 0.0;
        }
        let fraction = (event.x / event.width).clamp(0.0, 1.0);
        let value = fraction * self.range;
        if value >= self.range {
            // keep the upper bound exclusive
            self.range - f32::EPSILON * self.range
        } else {
            value
        }
    }

    pub fn range(&self) -> f32 {
        self.range
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pointer(x: f32, width: f32) -> PointerEvent {
        PointerEvent { x, width }
    }

    #[test]
    fn test_signal_scales_with_position() {
        let fallback = PointerFallback::new(8.0);
        assert_eq!(fallback.signal(&pointer(0.0, 800.0)), 0.0);
        assert_eq!(fallback.signal(&pointer(400.0, 800.0)), 4.0);
        assert_eq!(fallback.signal(&pointer(200.0, 800.0)), 2.0);
    }

    #[test]
    fn test_signal_stays_in_range() {
        let fallback = PointerFallback::new(8.0);
        for x in [-50.0, 799.9, 800.0, 1e6] {
            let value = fallback.signal(&pointer(x, 800.0));
            assert!((0.0..8.0).contains(&value), "x={} gave {}", x, value);
        }
    }

    #[test]
    fn test_degenerate_surface() {
        let fallback = PointerFallback::new(8.0);
        assert_eq!(fallback.signal(&pointer(10.0, 0.0)), 0.0);
        assert_eq!(fallback.signal(&pointer(f32::NAN, 100.0)), 0.0);
    }
}
