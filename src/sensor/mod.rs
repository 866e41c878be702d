pub mod buffer;
pub mod fallback;
pub mod feed;

pub use buffer::{MotionSample, SampleBuffer};
pub use fallback::PointerFallback;
pub use feed::{read_trace, SensorFeed};

use serde::{Deserialize, Serialize};

/// One accelerometer reading as delivered by the host.
///
/// Components may be missing on hosts that fire motion events before the
/// hardware has produced data.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccelerationEvent {
    #[serde(default)]
    pub x: Option<f32>,
    #[serde(default)]
    pub y: Option<f32>,
    #[serde(default)]
    pub z: Option<f32>,
    /// True when the vector still contains gravity (~9.81 m/s² at rest)
    #[serde(default, rename = "gravity")]
    pub includes_gravity: bool,
}

impl AccelerationEvent {
    pub fn new(x: f32, y: f32, z: f32, includes_gravity: bool) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            z: Some(z),
            includes_gravity,
        }
    }

    /// Euclidean norm of the vector, `None` if any component is missing.
    pub fn magnitude(&self) -> Option<f32> {
        let (x, y, z) = (self.x?, self.y?, self.z?);
        Some((x * x + y * y + z * z).sqrt())
    }
}

/// Pointer position used as a stand-in signal when motion access is refused.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerEvent {
    pub x: f32,
    /// Width of the surface the pointer moves over
    pub width: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SensorEvent {
    Motion(AccelerationEvent),
    Pointer(PointerEvent),
}

/// A sensor event stamped with its receipt time in milliseconds.
///
/// This is also the record format of sensor traces (one JSON object per line):
/// `{"t": 1200, "type": "motion", "x": 0.1, "y": 9.7, "z": 0.4, "gravity": true}`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimedEvent {
    #[serde(rename = "t", default)]
    pub timestamp_ms: u64,
    #[serde(flatten)]
    pub event: SensorEvent,
}

impl TimedEvent {
    pub fn motion(timestamp_ms: u64, event: AccelerationEvent) -> Self {
        Self {
            timestamp_ms,
            event: SensorEvent::Motion(event),
        }
    }

    pub fn pointer(timestamp_ms: u64, x: f32, width: f32) -> Self {
        Self {
            timestamp_ms,
            event: SensorEvent::Pointer(PointerEvent { x, width }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_magnitude() {
        let event = AccelerationEvent::new(3.0, 4.0, 0.0, false);
        assert_eq!(event.magnitude(), Some(5.0));
    }

    #[test]
    fn test_magnitude_missing_component() {
        let event = AccelerationEvent {
            x: None,
            y: Some(1.0),
            z: Some(1.0),
            includes_gravity: false,
        };
        assert_eq!(event.magnitude(), None);
    }

    #[test]
    fn test_trace_record_format() {
        let line = r#"{"t": 1200, "type": "motion", "x": 0.5, "y": 9.7, "z": null, "gravity": true}"#;
        let record: TimedEvent = serde_json::from_str(line).unwrap();
        assert_eq!(record.timestamp_ms, 1200);
        match record.event {
            SensorEvent::Motion(a) => {
                assert_eq!(a.x, Some(0.5));
                assert_eq!(a.z, None);
                assert!(a.includes_gravity);
            }
            other => panic!("unexpected event {:?}", other),
        }

        let line = r#"{"type": "pointer", "x": 320, "width": 640}"#;
        let record: TimedEvent = serde_json::from_str(line).unwrap();
        assert_eq!(record, TimedEvent::pointer(0, 320.0, 640.0));
    }
}
