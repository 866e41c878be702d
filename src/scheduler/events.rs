use log::{debug, warn};
use rand::Rng;

use super::TickContext;
use crate::control::ControlState;
use crate::engine::{Sound, Synthesizer, TriggerEvent, Voice};
use crate::mapping::MusicMapper;
use crate::music::{chord_for_bar, next_note, scale_for_bar, Note, NoteValue};

const KICK_NOTE: Note = Note::from_midi(24); // C1

/// Chord, melody and drum layers driven by transport ticks.
///
/// The layers only read the signal side of the control state. The melody
/// layer is the single writer of the previous pitch.
pub struct EventScheduler {
    mapper: MusicMapper,
    running: bool,
    tick_counter: u64,
    next_note_tick: u64,
}

impl EventScheduler {
    pub fn new(mapper: MusicMapper) -> Self {
        Self {
            mapper,
            running: false,
            tick_counter: 0,
            next_note_tick: 0,
        }
    }

    /// Returns false when already running.
    pub fn start(&mut self) -> bool {
        if self.running {
            return false;
        }
        self.running = true;
        true
    }

    /// Cancel the schedule and rewind the melody counters. The previous pitch
    /// lives in the control state and carries over to the next start.
    pub fn stop(&mut self) {
        self.running = false;
        self.tick_counter = 0;
        self.next_note_tick = 0;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn tick_counter(&self) -> u64 {
        self.tick_counter
    }

    pub fn next_note_tick(&self) -> u64 {
        self.next_note_tick
    }

    pub fn mapper(&self) -> &MusicMapper {
        &self.mapper
    }

    /// Run all layers for one tick and hand the results to `synth`.
    pub fn on_tick<R, S>(
        &mut self,
        ctx: TickContext,
        control: &mut ControlState,
        rng: &mut R,
        synth: &mut S,
    ) -> Vec<TriggerEvent>
    where
        R: Rng + ?Sized,
        S: Synthesizer + ?Sized,
    {
        if !self.running {
            return Vec::new();
        }

        let activity = control.activity();
        let mut events = Vec::new();

        if let Some(chord) = self.chord_layer(ctx) {
            events.push(chord);
        }
        if let Some(note) = self.melody_layer(ctx, activity, control, rng) {
            events.push(note);
        }
        events.extend(self.drum_layer(ctx, activity));

        for event in &events {
            if let Err(e) = synth.trigger(event) {
                warn!("Dropped {:?} trigger: {}", event.voice, e);
            }
        }
        events
    }

    fn steps_per_bar(&self) -> u64 {
        self.mapper.config().steps_per_bar
    }

    fn bar_of(&self, tick: u64) -> usize {
        (tick / self.steps_per_bar()) as usize % self.mapper.config().bars
    }

    fn chord_layer(&self, ctx: TickContext) -> Option<TriggerEvent> {
        if ctx.tick_index % self.steps_per_bar() != 0 {
            return None;
        }
        let bar = self.bar_of(ctx.tick_index);
        Some(TriggerEvent {
            voice: Voice::Chord,
            sound: Sound::Notes(chord_for_bar(bar).to_vec()),
            duration: NoteValue::Whole,
            time_s: ctx.scheduled_time,
            velocity: None,
        })
    }

    fn melody_layer<R: Rng + ?Sized>(
        &mut self,
        ctx: TickContext,
        activity: f32,
        control: &mut ControlState,
        rng: &mut R,
    ) -> Option<TriggerEvent> {
        if self.tick_counter < self.next_note_tick {
            self.tick_counter += 1;
            return None;
        }

        let step = self.mapper.melody_step(activity, rng);
        let duration = MusicMapper::note_duration(step);

        let mut event = None;
        if self.mapper.should_play_note(activity, rng) {
            let bar = self.bar_of(self.tick_counter);
            if let Some(note) = next_note(control.previous_pitch(), scale_for_bar(bar), activity) {
                control.scheduler_port().set_previous_pitch(note);
                event = Some(TriggerEvent {
                    voice: Voice::Melody,
                    sound: Sound::Note(note),
                    duration,
                    time_s: ctx.scheduled_time,
                    velocity: None,
                });
            }
        } else {
            debug!("Melody rest at tick {}", self.tick_counter);
        }

        self.next_note_tick = self.tick_counter + step;
        self.tick_counter += 1;
        event
    }

    fn drum_layer(&self, ctx: TickContext, activity: f32) -> Vec<TriggerEvent> {
        let step = ctx.tick_index % self.steps_per_bar();
        let hits = self.mapper.drum_hits(activity, step);
        let mut events = Vec::with_capacity(3);

        if hits.kick {
            events.push(TriggerEvent {
                voice: Voice::Kick,
                sound: Sound::Note(KICK_NOTE),
                duration: NoteValue::Eighth,
                time_s: ctx.scheduled_time,
                velocity: None,
            });
        }
        if hits.snare {
            events.push(TriggerEvent {
                voice: Voice::Snare,
                sound: Sound::Noise,
                duration: NoteValue::Eighth,
                time_s: ctx.scheduled_time,
                velocity: None,
            });
        }
        if let Some(velocity) = hits.hihat {
            events.push(TriggerEvent {
                voice: Voice::HiHat,
                sound: Sound::Noise,
                duration: NoteValue::ThirtySecond,
                time_s: ctx.scheduled_time,
                velocity: Some(velocity),
            });
        }
        events
    }
}
