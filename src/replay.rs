use crate::actuator::RecordingActuator;
use crate::clock::{Clock, ManualClock};
use crate::difficulty::DifficultyProfile;
use crate::error::{CoachError, Result};
use crate::keyer::{KeyerEvent, KeyerSession};
use std::str::FromStr;

/// One key hold followed by the silence before the next press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyStroke {
    pub hold_ms: u64,
    pub gap_ms: u64,
}

impl FromStr for KeyStroke {
    type Err = CoachError;

    /// `<hold_ms>:<gap_ms>`; a bare `<hold_ms>` means no gap.
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || CoachError::InvalidTiming(s.to_string());
        let (hold, gap) = s.split_once(':').unwrap_or((s, "0"));
        Ok(KeyStroke {
            hold_ms: hold.trim().parse().map_err(|_| invalid())?,
            gap_ms: gap.trim().parse().map_err(|_| invalid())?,
        })
    }
}

/// Strokes separated by commas or whitespace.
pub fn parse_strokes(timings: &str) -> Result<Vec<KeyStroke>> {
    timings
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(str::parse::<KeyStroke>)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayOutcome {
    pub events: Vec<KeyerEvent>,
    pub code: String,
    pub text: String,
    pub completed: bool,
    pub error: bool,
    pub pulses: Vec<u64>,
    pub elapsed_ms: u64,
}

/// Polls at every deadline up to `until`, then at `until` itself.
fn run_until(
    session: &mut KeyerSession<ManualClock, RecordingActuator>,
    clock: &ManualClock,
    until: u64,
    events: &mut Vec<KeyerEvent>,
) {
    while let Some(deadline) = session.next_deadline().filter(|d| *d <= until) {
        clock.set(deadline.max(clock.now_ms()));
        events.extend(session.poll());
    }
    clock.set(until);
    events.extend(session.poll());
}

/// Drives a keyer through recorded key timings on a manual clock and lets
/// every pending timer run out at the end.
pub fn replay(profile: DifficultyProfile, phrase: &str, strokes: &[KeyStroke]) -> ReplayOutcome {
    let clock = ManualClock::new(0);
    let mut session = KeyerSession::new(profile, phrase, clock.clone(), RecordingActuator::new());
    let mut events = Vec::new();

    for stroke in strokes {
        events.extend(session.press());
        let released_at = clock.now_ms() + stroke.hold_ms;
        run_until(&mut session, &clock, released_at, &mut events);
        events.extend(session.release());
        let next_press = clock.now_ms() + stroke.gap_ms;
        run_until(&mut session, &clock, next_press, &mut events);
    }
    while let Some(deadline) = session.next_deadline() {
        clock.set(deadline.max(clock.now_ms()));
        events.extend(session.poll());
    }

    ReplayOutcome {
        code: session.displayed_code().trimmed().to_string(),
        text: session.decoded_text(),
        completed: session.is_complete(),
        error: session.is_error(),
        pulses: session.actuator().pulses().to_vec(),
        elapsed_ms: clock.now_ms(),
        events,
    }
}
