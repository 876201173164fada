use crate::codec::{SignalStream, Token};
use log::info;

/// Output device the trainer signals through (tone, vibration, flash).
/// Calls are fire-and-forget; the result of a pulse is never read.
pub trait Actuator {
    fn emit_pulse(&mut self, duration_ms: u64);
}

impl<A: Actuator + ?Sized> Actuator for &mut A {
    fn emit_pulse(&mut self, duration_ms: u64) {
        (**self).emit_pulse(duration_ms)
    }
}

/// Discards every pulse.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopActuator;

impl Actuator for NoopActuator {
    fn emit_pulse(&mut self, _duration_ms: u64) {}
}

/// Keeps the duration of every pulse it was asked to emit.
#[derive(Debug, Clone, Default)]
pub struct RecordingActuator {
    pulses: Vec<u64>,
}

impl RecordingActuator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pulses(&self) -> &[u64] {
        &self.pulses
    }

    pub fn clear(&mut self) {
        self.pulses.clear();
    }
}

impl Actuator for RecordingActuator {
    fn emit_pulse(&mut self, duration_ms: u64) {
        self.pulses.push(duration_ms);
    }
}

/// Reports each pulse through the log and counts them. Used when playing a
/// stream from the command line, where there is no tone device.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogActuator {
    pulses: usize,
    on_ms: u64,
}

impl LogActuator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pulses(&self) -> usize {
        self.pulses
    }

    /// Total time the signal was on.
    pub fn on_ms(&self) -> u64 {
        self.on_ms
    }
}

impl Actuator for LogActuator {
    fn emit_pulse(&mut self, duration_ms: u64) {
        self.pulses += 1;
        self.on_ms += duration_ms;
        info!("pulse {} for {duration_ms}ms", self.pulses);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackTiming {
    pub dit_ms: u64,
    pub dah_ms: u64,
    pub symbol_gap_ms: u64,
    pub letter_gap_ms: u64,
    /// Silence for a whole `" / "` separator: a letter gap on each side of
    /// a double-length slash pause.
    pub word_gap_ms: u64,
}

impl Default for PlaybackTiming {
    fn default() -> Self {
        Self {
            dit_ms: 200,
            dah_ms: 600,
            symbol_gap_ms: 200,
            letter_gap_ms: 600,
            word_gap_ms: 2400,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackStep {
    Pulse(u64),
    Pause(u64),
}

/// Turns a stream into the pulse/pause sequence used to play it back.
/// Unknown placeholders are silent.
pub fn plan(stream: &SignalStream, timing: &PlaybackTiming) -> Vec<PlaybackStep> {
    let mut steps = Vec::with_capacity(stream.len() * 2);
    for token in stream.tokens() {
        match token {
            Token::Dot => {
                steps.push(PlaybackStep::Pulse(timing.dit_ms));
                steps.push(PlaybackStep::Pause(timing.symbol_gap_ms));
            }
            Token::Dash => {
                steps.push(PlaybackStep::Pulse(timing.dah_ms));
                steps.push(PlaybackStep::Pause(timing.symbol_gap_ms));
            }
            Token::LetterSpace => steps.push(PlaybackStep::Pause(timing.letter_gap_ms)),
            Token::WordSpace => steps.push(PlaybackStep::Pause(timing.word_gap_ms)),
            Token::Unknown => {}
        }
    }
    steps
}

pub fn total_duration_ms(steps: &[PlaybackStep]) -> u64 {
    steps
        .iter()
        .map(|step| match step {
            PlaybackStep::Pulse(ms) | PlaybackStep::Pause(ms) => *ms,
        })
        .sum()
}

/// Plays a plan through an actuator. `wait` blocks (or fakes blocking) for
/// the given number of milliseconds; a pulse is followed by a wait of its own
/// length so the next step starts after it ends.
pub fn transmit<A, W>(steps: &[PlaybackStep], actuator: &mut A, mut wait: W)
where
    A: Actuator + ?Sized,
    W: FnMut(u64),
{
    for step in steps {
        match *step {
            PlaybackStep::Pulse(ms) => {
                actuator.emit_pulse(ms);
                wait(ms);
            }
            PlaybackStep::Pause(ms) => wait(ms),
        }
    }
}
