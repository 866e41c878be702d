use log::{debug, info, warn};
use rand::SeedableRng;
use rand_pcg::Pcg32;

use super::{InputMode, Lifecycle, ListenerGuard, SensorAccess, SessionPhase, StartupStatus};
use crate::analysis::{MotionEstimator, VarianceEngine};
use crate::config::SanpoConfig;
use crate::control::ControlState;
use crate::engine::{DisplayStatus, Synthesizer, TriggerEvent};
use crate::error::SanpoResult;
use crate::mapping::MusicMapper;
use crate::music::Note;
use crate::scheduler::{EventScheduler, Transport};
use crate::sensor::{PointerFallback, SensorEvent, TimedEvent};
use crate::smoother::SignalSmoother;

const FALLBACK_NOTICE: &str =
    "motion sensor not available, move the pointer across the window instead";

const DEBUG_EVERY_FRAMES: u64 = 120;

/// Generative music front end: motion variance drives tempo and note density.
pub struct MusicSession {
    lifecycle: Lifecycle,
    status: StartupStatus,
    input_mode: InputMode,
    listener: ListenerGuard,
    notice: Option<String>,
    fallback_noticed: bool,
    frames: u64,

    control: ControlState,
    variance: VarianceEngine,
    fallback: PointerFallback,
    smoother: SignalSmoother,
    transport: Transport,
    scheduler: EventScheduler,
    rng: Pcg32,
}

impl MusicSession {
    pub fn new(config: &SanpoConfig) -> SanpoResult<Self> {
        let initial_pitch = Note::parse(&config.music.initial_pitch)?;
        let rng = match config.music.seed {
            Some(seed) => Pcg32::seed_from_u64(seed),
            None => Pcg32::from_entropy(),
        };

        Ok(Self {
            lifecycle: Lifecycle::new(),
            status: StartupStatus::Idle,
            input_mode: InputMode::Motion,
            listener: ListenerGuard::default(),
            notice: None,
            fallback_noticed: false,
            frames: 0,
            control: ControlState::new(config.music.base_bpm, initial_pitch),
            variance: VarianceEngine::new(&config.motion),
            fallback: PointerFallback::new(config.motion.fallback_range),
            smoother: SignalSmoother::new(config.motion.smoothing_factor),
            transport: Transport::new(),
            scheduler: EventScheduler::new(MusicMapper::new(config.music.clone())),
            rng,
        })
    }

    /// Arm the synth, wire the sensor (or the pointer fallback) and start the
    /// transport with its first tick at `at_s`. Returns false if the session
    /// was not idle.
    pub fn start<S>(&mut self, access: SensorAccess, synth: &mut S, at_s: f64) -> bool
    where
        S: Synthesizer + ?Sized,
    {
        if !self.lifecycle.transition(SessionPhase::Armed) {
            return false;
        }
        self.status = StartupStatus::Starting;
        synth.set_tempo(self.control.tempo_bpm());

        match access.require() {
            Ok(()) => {
                self.listener.attach();
                self.input_mode = InputMode::Motion;
                self.status = StartupStatus::Running;
            }
            Err(e) => {
                warn!("{}, using pointer fallback", e);
                self.input_mode = InputMode::PointerFallback;
                self.status = StartupStatus::SensorDenied;
                if !self.fallback_noticed {
                    self.notice = Some(FALLBACK_NOTICE.to_string());
                    self.fallback_noticed = true;
                }
            }
        }

        self.transport.start(at_s);
        self.scheduler.start();
        self.lifecycle.transition(SessionPhase::Running);
        info!(
            "Music session running at {:.0} BPM ({:?} input)",
            self.control.tempo_bpm(),
            self.input_mode
        );
        true
    }

    /// Stop playback, detach the sensor and zero the signal path.
    pub fn stop(&mut self) -> bool {
        if self.lifecycle.phase() == SessionPhase::Idle {
            return false;
        }
        self.listener.detach();
        self.scheduler.stop();
        self.transport.stop();
        self.variance.reset();
        self.smoother.reset();
        debug!("Reset {} estimator", self.variance.estimator_type());
        self.control.reset_to_defaults();
        self.lifecycle.transition(SessionPhase::Idle);
        self.status = StartupStatus::Idle;
        info!("Music session stopped");
        true
    }

    /// Feed one sensor event into the variance estimator.
    ///
    /// Pointer events only count while no motion listener is attached.
    pub fn ingest(&mut self, event: &TimedEvent) {
        if self.lifecycle.phase() != SessionPhase::Running {
            return;
        }
        let raw = match &event.event {
            SensorEvent::Motion(acceleration) if self.listener.is_attached() => {
                self.variance.process(acceleration, event.timestamp_ms)
            }
            SensorEvent::Pointer(pointer) if !self.listener.is_attached() => {
                self.fallback.signal(pointer)
            }
            _ => return,
        };
        self.control.sensor_port().set_raw_statistic(raw);
    }

    /// Per-frame update: smooth, remap and push the tempo to the synth.
    pub fn frame<S>(&mut self, synth: &mut S)
    where
        S: Synthesizer + ?Sized,
    {
        if self.lifecycle.phase() != SessionPhase::Running {
            return;
        }
        let smoothed = self.smoother.step(self.control.raw_statistic());
        self.control.smoother_port().set_smoothed_statistic(smoothed);
        let (tempo, activity) = self.scheduler.mapper().apply(&mut self.control);
        synth.set_tempo(tempo);

        self.frames += 1;
        if self.frames % DEBUG_EVERY_FRAMES == 0 {
            debug!(
                "raw {:.3} smoothed {:.3} -> {:.1} BPM, activity {:.2}",
                self.control.raw_statistic(),
                smoothed,
                tempo,
                activity
            );
        }
    }

    pub fn tick_due(&self, now_s: f64) -> bool {
        self.transport.is_due(now_s)
    }

    /// Transport time of the next tick, if running.
    pub fn next_tick_time(&self) -> Option<f64> {
        self.transport
            .is_running()
            .then(|| self.transport.next_tick_time())
    }

    /// Advance the transport one sixteenth and run the scheduler layers.
    pub fn tick<S>(&mut self, synth: &mut S) -> Vec<TriggerEvent>
    where
        S: Synthesizer + ?Sized,
    {
        match self.transport.advance(self.control.tempo_bpm()) {
            Some(ctx) => self
                .scheduler
                .on_tick(ctx, &mut self.control, &mut self.rng, synth),
            None => Vec::new(),
        }
    }

    pub fn status(&self) -> DisplayStatus {
        let running = self.lifecycle.phase() == SessionPhase::Running;
        DisplayStatus {
            phase: self.status.to_string(),
            tempo_bpm: running.then(|| self.control.tempo_bpm().round() as i64),
            activity_percent: running.then(|| self.control.activity() * 100.0),
            cadence: None,
            state: None,
            notice: (running && self.input_mode == InputMode::PointerFallback)
                .then(|| "pointer fallback".to_string()),
        }
    }

    /// The fallback notice, returned once per session.
    pub fn take_notice(&mut self) -> Option<String> {
        self.notice.take()
    }

    pub fn phase(&self) -> SessionPhase {
        self.lifecycle.phase()
    }

    pub fn startup_status(&self) -> &StartupStatus {
        &self.status
    }

    pub fn input_mode(&self) -> InputMode {
        self.input_mode
    }

    pub fn control(&self) -> &ControlState {
        &self.control
    }
}
