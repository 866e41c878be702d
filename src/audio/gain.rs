use crossbeam_channel::{Receiver, Sender};
use rodio::Source;
use std::time::Duration;

/// Linear gain ramp evaluated once per output sample.
#[derive(Debug, Clone, PartialEq)]
pub struct GainRamp {
    current: f32,
    target: f32,
    step: f32,
    remaining: u64,
}

impl GainRamp {
    pub fn new(initial: f32) -> Self {
        let initial = initial.clamp(0.0, 1.0);
        Self {
            current: initial,
            target: initial,
            step: 0.0,
            remaining: 0,
        }
    }

    /// Head from the current value to `target` over `seconds`, at
    /// `samples_per_second` evaluations per second. A zero-length ramp jumps.
    pub fn ramp_to(&mut self, target: f32, seconds: f32, samples_per_second: u32) {
        self.target = target.clamp(0.0, 1.0);
        let samples = (seconds.max(0.0) * samples_per_second as f32).round() as u64;
        if samples == 0 {
            self.current = self.target;
            self.step = 0.0;
            self.remaining = 0;
        } else {
            self.step = (self.target - self.current) / samples as f32;
            self.remaining = samples;
        }
    }

    /// Gain for the next sample.
    pub fn next_gain(&mut self) -> f32 {
        if self.remaining > 0 {
            self.remaining -= 1;
            self.current = if self.remaining == 0 {
                self.target
            } else {
                self.current + self.step
            };
        }
        self.current
    }

    pub fn current(&self) -> f32 {
        self.current
    }

    pub fn target(&self) -> f32 {
        self.target
    }

    pub fn is_ramping(&self) -> bool {
        self.remaining > 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GainCommand {
    pub target: f32,
    pub ramp_seconds: f32,
}

/// Checked for new commands every this many samples.
const COMMAND_POLL_SAMPLES: u32 = 256;

/// Source adapter applying a `GainRamp` that is steered from another thread.
pub struct RampedGain<S> {
    inner: S,
    ramp: GainRamp,
    commands: Receiver<GainCommand>,
    until_poll: u32,
}

impl<S> RampedGain<S>
where
    S: Source<Item = f32>,
{
    /// Wrap `inner`; the returned sender retargets the ramp.
    pub fn new(inner: S, initial: f32) -> (Self, Sender<GainCommand>) {
        let (sender, commands) = crossbeam_channel::unbounded();
        let source = Self {
            inner,
            ramp: GainRamp::new(initial),
            commands,
            until_poll: 0,
        };
        (source, sender)
    }

    fn poll_commands(&mut self) {
        let samples_per_second = self.inner.sample_rate() * self.inner.channels() as u32;
        while let Ok(command) = self.commands.try_recv() {
            self.ramp
                .ramp_to(command.target, command.ramp_seconds, samples_per_second);
        }
    }
}

impl<S> Iterator for RampedGain<S>
where
    S: Source<Item = f32>,
{
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        if self.until_poll == 0 {
            self.poll_commands();
            self.until_poll = COMMAND_POLL_SAMPLES;
        }
        self.until_poll -= 1;

        let sample = self.inner.next()?;
        Some(sample * self.ramp.next_gain())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<S> Source for RampedGain<S>
where
    S: Source<Item = f32>,
{
    fn current_frame_len(&self) -> Option<usize> {
        self.inner.current_frame_len()
    }

    fn channels(&self) -> u16 {
        self.inner.channels()
    }

    fn sample_rate(&self) -> u32 {
        self.inner.sample_rate()
    }

    fn total_duration(&self) -> Option<Duration> {
        self.inner.total_duration()
    }
}
