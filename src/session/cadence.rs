use log::{debug, error, info, warn};

use super::{Lifecycle, ListenerGuard, SensorAccess, SessionPhase, StartupStatus};
use crate::analysis::{MotionEstimator, StepCounter};
use crate::config::CadenceConfig;
use crate::control::ControlState;
use crate::engine::{DisplayStatus, StemMixer};
use crate::error::SanpoResult;
use crate::mapping::{AudioState, CadenceMapper, Crossfade};
use crate::sensor::{SensorEvent, TimedEvent};

/// Walking front end: step cadence crossfades between three looping stems.
pub struct CadenceSession {
    config: CadenceConfig,
    lifecycle: Lifecycle,
    status: StartupStatus,
    listener: ListenerGuard,

    control: ControlState,
    counter: StepCounter,
    mapper: CadenceMapper,
    cadence: f32,
}

impl CadenceSession {
    pub fn new(config: &CadenceConfig) -> Self {
        Self {
            config: config.clone(),
            lifecycle: Lifecycle::new(),
            status: StartupStatus::Idle,
            listener: ListenerGuard::default(),
            // tempo is never driven by cadence; it only holds the default
            control: ControlState::default(),
            counter: StepCounter::new(config),
            mapper: CadenceMapper::new(config),
            cadence: 0.0,
        }
    }

    fn stems(&self) -> [(AudioState, std::path::PathBuf); 3] {
        [
            (AudioState::Still, self.config.still_stem.clone()),
            (AudioState::Walking, self.config.walking_stem.clone()),
            (AudioState::FastWalking, self.config.fast_stem.clone()),
        ]
    }

    /// Load and start all stems, then wire the sensor.
    ///
    /// A stem that fails to load aborts startup with a `Failed` status and
    /// the sensor is never wired. An engine fault on one loop is only logged.
    /// Returns whether the session is now running.
    pub fn start<M>(&mut self, access: SensorAccess, mixer: &mut M) -> bool
    where
        M: StemMixer + ?Sized,
    {
        if !self.lifecycle.transition(SessionPhase::Armed) {
            return false;
        }
        self.status = StartupStatus::Starting;

        if let Err(e) = self.prepare_audio(mixer) {
            if e.is_fatal_to_startup() {
                error!("Audio loading failed: {}", e);
                self.status = StartupStatus::Failed(e.to_string());
                self.lifecycle.transition(SessionPhase::Idle);
                return false;
            }
            warn!("Audio engine problem, continuing: {}", e);
        }

        match access.require() {
            Ok(()) => {
                self.listener.attach();
                self.status = StartupStatus::Running;
            }
            Err(e) => {
                warn!("{}, stems play without cadence", e);
                self.status = StartupStatus::SensorDenied;
            }
        }

        self.lifecycle.transition(SessionPhase::Running);
        info!("Cadence session started ({})", self.status);
        true
    }

    fn prepare_audio<M>(&mut self, mixer: &mut M) -> SanpoResult<()>
    where
        M: StemMixer + ?Sized,
    {
        let stems = self.stems();
        mixer.load_stems(&stems)?;

        for state in AudioState::ALL {
            let gain = if state == AudioState::Still { 1.0 } else { 0.0 };
            mixer.set_gain(state, gain, 0.0);
        }
        let mut outcome = Ok(());
        for state in AudioState::ALL {
            if let Err(e) = mixer.start_loop(state) {
                if e.is_fatal_to_startup() {
                    return Err(e);
                }
                outcome = outcome.and(Err(e));
            }
        }
        outcome
    }

    /// Feed one sensor event; on a state change, crossfade the stems.
    pub fn ingest<M>(&mut self, event: &TimedEvent, mixer: &mut M) -> Option<Crossfade>
    where
        M: StemMixer + ?Sized,
    {
        if self.lifecycle.phase() != SessionPhase::Running || !self.listener.is_attached() {
            return None;
        }
        let SensorEvent::Motion(acceleration) = &event.event else {
            return None;
        };

        self.cadence = self.counter.process(acceleration, event.timestamp_ms);
        self.control.sensor_port().set_raw_statistic(self.cadence);

        let fade = self.mapper.apply(self.cadence, &mut self.control)?;
        let seconds = self.config.crossfade_seconds;
        mixer.set_gain(fade.from, 0.0, seconds);
        mixer.set_gain(fade.to, 1.0, seconds);
        info!(
            "State changed: {} -> {} at cadence {:.0}",
            fade.from.label(),
            fade.to.label(),
            self.cadence
        );
        Some(fade)
    }

    /// Silence every stem and detach the sensor.
    pub fn stop<M>(&mut self, mixer: &mut M) -> bool
    where
        M: StemMixer + ?Sized,
    {
        if self.lifecycle.phase() == SessionPhase::Idle {
            return false;
        }
        self.listener.detach();
        for state in AudioState::ALL {
            mixer.set_gain(state, 0.0, 0.0);
        }
        self.counter.reset();
        debug!("Reset {} estimator", self.counter.estimator_type());
        self.mapper.reset();
        self.cadence = 0.0;
        self.control.reset_to_defaults();
        self.lifecycle.transition(SessionPhase::Idle);
        self.status = StartupStatus::Idle;
        info!("Cadence session stopped");
        true
    }

    pub fn status(&self) -> DisplayStatus {
        let running = self.lifecycle.phase() == SessionPhase::Running;
        DisplayStatus {
            phase: self.status.to_string(),
            tempo_bpm: None,
            activity_percent: None,
            cadence: running.then(|| self.cadence.round() as i64),
            state: running.then(|| self.mapper.state().label()),
            notice: None,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.lifecycle.phase()
    }

    pub fn startup_status(&self) -> &StartupStatus {
        &self.status
    }

    pub fn cadence(&self) -> f32 {
        self.cadence
    }

    pub fn audio_state(&self) -> AudioState {
        self.control.audio_state()
    }
}
