//! Start/stop lifecycle for the two front ends.
//!
//! A session owns the estimator, smoother, mapper and (for music) the
//! scheduler for one play-through, and moves through an explicit
//! `Idle -> Armed -> Running -> Idle` state machine. Starting while not idle
//! and stopping while idle are no-ops.

pub mod cadence;
pub mod music;

pub use cadence::CadenceSession;
pub use music::MusicSession;

use log::{debug, warn};
use serde::Serialize;
use std::fmt;

use crate::error::{SanpoError, SanpoResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Idle,
    /// Audio is being prepared; sensors are not wired yet
    Armed,
    Running,
}

impl SessionPhase {
    fn can_move_to(self, next: SessionPhase) -> bool {
        matches!(
            (self, next),
            (SessionPhase::Idle, SessionPhase::Armed)
                | (SessionPhase::Armed, SessionPhase::Running)
                | (SessionPhase::Armed, SessionPhase::Idle)
                | (SessionPhase::Running, SessionPhase::Idle)
        )
    }
}

/// Outcome of asking the host for motion sensor access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorAccess {
    Granted,
    Denied,
    Unavailable,
}

impl SensorAccess {
    /// The host's answer as a result; refusals map to their error kind.
    pub fn require(self) -> SanpoResult<()> {
        match self {
            SensorAccess::Granted => Ok(()),
            SensorAccess::Denied => Err(SanpoError::PermissionDenied),
            SensorAccess::Unavailable => Err(SanpoError::SensorUnavailable),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InputMode {
    Motion,
    PointerFallback,
}

/// User-facing label for where startup got to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StartupStatus {
    Idle,
    Starting,
    Running,
    /// Running, but without motion input
    SensorDenied,
    /// Startup aborted; start again to retry
    Failed(String),
}

impl StartupStatus {
    pub fn is_failed(&self) -> bool {
        matches!(self, StartupStatus::Failed(_))
    }
}

impl fmt::Display for StartupStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartupStatus::Idle => write!(f, "idle"),
            StartupStatus::Starting => write!(f, "starting"),
            StartupStatus::Running => write!(f, "running"),
            StartupStatus::SensorDenied => write!(f, "sensor denied"),
            StartupStatus::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

/// Guarded phase holder shared by both sessions.
#[derive(Debug, Clone)]
struct Lifecycle {
    phase: SessionPhase,
}

impl Lifecycle {
    fn new() -> Self {
        Self {
            phase: SessionPhase::Idle,
        }
    }

    fn phase(&self) -> SessionPhase {
        self.phase
    }

    fn transition(&mut self, next: SessionPhase) -> bool {
        if !self.phase.can_move_to(next) {
            warn!("Ignoring session transition {:?} -> {:?}", self.phase, next);
            return false;
        }
        debug!("Session {:?} -> {:?}", self.phase, next);
        self.phase = next;
        true
    }
}

/// Tracks the motion listener so it is attached and detached exactly once.
#[derive(Debug, Clone, Default)]
struct ListenerGuard {
    attached: bool,
}

impl ListenerGuard {
    fn attach(&mut self) -> bool {
        if self.attached {
            return false;
        }
        self.attached = true;
        debug!("Motion listener attached");
        true
    }

    fn detach(&mut self) -> bool {
        if !self.attached {
            return false;
        }
        self.attached = false;
        debug!("Motion listener detached");
        true
    }

    fn is_attached(&self) -> bool {
        self.attached
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_transitions() {
        let mut lifecycle = Lifecycle::new();
        assert!(!lifecycle.transition(SessionPhase::Running));
        assert!(lifecycle.transition(SessionPhase::Armed));
        assert!(!lifecycle.transition(SessionPhase::Armed));
        assert!(lifecycle.transition(SessionPhase::Running));
        assert!(lifecycle.transition(SessionPhase::Idle));
        assert!(!lifecycle.transition(SessionPhase::Idle));
    }

    #[test]
    fn test_listener_guard_is_single_shot() {
        let mut guard = ListenerGuard::default();
        assert!(guard.attach());
        assert!(!guard.attach());
        assert!(guard.detach());
        assert!(!guard.detach());
    }

    #[test]
    fn test_status_labels() {
        assert_eq!(StartupStatus::SensorDenied.to_string(), "sensor denied");
        assert_eq!(
            StartupStatus::Failed("no such file".into()).to_string(),
            "failed: no such file"
        );
    }
}
