use serde::Serialize;

/// One sixteenth-note tick of the transport.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TickContext {
    /// Ticks since the transport was started, from 0
    pub tick_index: u64,
    /// Transport time the tick's events should sound at, in seconds
    pub scheduled_time: f64,
}

const TICKS_PER_BEAT: f64 = 4.0;

/// Sixteenth-note clock.
///
/// The transport does not own a timer; the driver asks whether a tick is due
/// and then advances it. The tick length is taken from the tempo current at
/// each tick, so tempo changes bend the grid without rescheduling anything.
#[derive(Debug, Clone, Default)]
pub struct Transport {
    running: bool,
    tick_index: u64,
    next_tick_time: f64,
}

impl Transport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start ticking with the first tick at `at_s`. No-op if already running.
    pub fn start(&mut self, at_s: f64) -> bool {
        if self.running {
            return false;
        }
        self.running = true;
        self.tick_index = 0;
        self.next_tick_time = at_s;
        true
    }

    /// Stop and rewind to position zero.
    pub fn stop(&mut self) {
        self.running = false;
        self.tick_index = 0;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn next_tick_time(&self) -> f64 {
        self.next_tick_time
    }

    pub fn is_due(&self, now_s: f64) -> bool {
        self.running && now_s >= self.next_tick_time
    }

    /// Emit the pending tick and schedule the next one a sixteenth later at
    /// `bpm`.
    pub fn advance(&mut self, bpm: f32) -> Option<TickContext> {
        if !self.running {
            return None;
        }
        let ctx = TickContext {
            tick_index: self.tick_index,
            scheduled_time: self.next_tick_time,
        };
        self.tick_index += 1;
        self.next_tick_time += Self::tick_seconds(bpm);
        Some(ctx)
    }

    pub fn tick_seconds(bpm: f32) -> f64 {
        60.0 / bpm as f64 / TICKS_PER_BEAT
    }
}
