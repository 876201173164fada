use crate::clock::Clock;
use crate::codec::{self, SignalStream, Token, WORD_SEPARATOR};
use crate::error::CodecError;
use crate::util::round_to_tenth;
use chrono::{DateTime, TimeZone, Utc};
use itertools::Itertools;
use log::{debug, info};
use serde::{Deserialize, Serialize};

/// Shortest elapsed time the speed formula will divide by.
pub const MIN_ELAPSED_MINUTES: f64 = 1.0 / 60.0;

/// Standard words-per-minute: (characters / 5) / minutes, one decimal.
/// Elapsed time is floored at one second.
pub fn words_per_minute(char_count: usize, elapsed_ms: u64) -> f64 {
    let minutes = (elapsed_ms as f64 / 60_000.0).max(MIN_ELAPSED_MINUTES);
    round_to_tenth(char_count as f64 / 5.0 / minutes)
}

/// Percentage of clean appends, one decimal. No attempts means 100%.
pub fn accuracy(attempts: u32, mistakes: u32) -> f64 {
    if attempts == 0 {
        return 100.0;
    }
    let clean = attempts.saturating_sub(mistakes) as f64;
    (clean / attempts as f64 * 1000.0).round() / 10.0
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccuracyTally {
    pub attempts: u32,
    pub mistakes: u32,
}

impl AccuracyTally {
    pub fn record(&mut self, on_track: bool) {
        self.attempts += 1;
        if !on_track {
            self.mistakes += 1;
        }
    }

    pub fn accuracy(&self) -> f64 {
        accuracy(self.attempts, self.mistakes)
    }
}

/// One discrete input action in a typed (button) exercise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputAction {
    Dot,
    Dash,
    LetterSpace,
    WordSpace,
    Backspace,
}

impl InputAction {
    /// The token an append adds; `None` for backspace.
    fn token(self) -> Option<Token> {
        match self {
            InputAction::Dot => Some(Token::Dot),
            InputAction::Dash => Some(Token::Dash),
            InputAction::LetterSpace => Some(Token::LetterSpace),
            InputAction::WordSpace => Some(Token::WordSpace),
            InputAction::Backspace => None,
        }
    }

    /// Reads keystrokes in code notation: `.` `-` a space, `" / "` (or a
    /// bare `/`) for a word space, and `<` for backspace.
    pub fn parse_keystrokes(keys: &str) -> Result<Vec<InputAction>, CodecError> {
        let mut actions = Vec::new();
        let mut offset = 0;
        while let Some(c) = keys[offset..].chars().next() {
            if keys[offset..].starts_with(WORD_SEPARATOR) {
                actions.push(InputAction::WordSpace);
                offset += WORD_SEPARATOR.len();
                continue;
            }
            let action = match c {
                '.' => InputAction::Dot,
                '-' => InputAction::Dash,
                ' ' => InputAction::LetterSpace,
                '/' => InputAction::WordSpace,
                '<' => InputAction::Backspace,
                other => {
                    return Err(CodecError::InvalidSymbol {
                        symbol: other,
                        offset,
                    })
                }
            };
            actions.push(action);
            offset += 1;
        }
        Ok(actions)
    }
}

/// A completed phrase attempt.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreRun {
    pub wpm: f64,
    pub accuracy: f64,
    /// Completion time, milliseconds on the session clock.
    #[serde(rename = "timestamp")]
    pub timestamp_ms: u64,
}

impl ScoreRun {
    pub fn recorded_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.timestamp_ms as i64).single()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RacerStatus {
    Typing { error: bool },
    Completed(ScoreRun),
    /// The phrase was already complete; the action was dropped.
    Finished,
}

/// Scoring accumulator for a phrase-typing (racer) exercise.
///
/// The clock starts when the session is created, the same moment the phrase
/// is shown.
#[derive(Debug)]
pub struct RacerSession<C: Clock> {
    clock: C,
    phrase: String,
    target: SignalStream,
    input: SignalStream,
    tally: AccuracyTally,
    started_ms: u64,
    run: Option<ScoreRun>,
}

impl<C: Clock> RacerSession<C> {
    /// Runs of whitespace in the phrase count as one space, matching the
    /// encoded target.
    pub fn new(phrase: &str, clock: C) -> Self {
        let phrase = phrase.split_whitespace().join(" ").to_uppercase();
        let started_ms = clock.now_ms();
        Self {
            target: codec::encode(&phrase),
            phrase,
            clock,
            input: SignalStream::new(),
            tally: AccuracyTally::default(),
            started_ms,
            run: None,
        }
    }

    pub fn apply(&mut self, action: InputAction) -> RacerStatus {
        if self.run.is_some() {
            return RacerStatus::Finished;
        }

        match action.token() {
            Some(token) => {
                self.input.push(token);
                let on_track = self.input.is_prefix_of(&self.target);
                self.tally.record(on_track);
                if !on_track {
                    debug!("off track after {:?}: {}", action, self.input);
                }
            }
            None => {
                self.input.backspace();
            }
        }

        if self.input == self.target {
            let run = self.finish();
            return RacerStatus::Completed(run);
        }
        RacerStatus::Typing {
            error: self.is_error(),
        }
    }

    fn finish(&mut self) -> ScoreRun {
        let now = self.clock.now_ms();
        let elapsed_ms = now.saturating_sub(self.started_ms);
        let run = ScoreRun {
            wpm: words_per_minute(self.phrase.chars().count(), elapsed_ms),
            accuracy: self.tally.accuracy(),
            timestamp_ms: now,
        };
        info!(
            "racer phrase {:?} done in {elapsed_ms}ms: {} wpm, {}% accuracy",
            self.phrase, run.wpm, run.accuracy
        );
        self.run = Some(run);
        run
    }

    /// True when the current input is not a prefix of the target code.
    pub fn is_error(&self) -> bool {
        !self.input.is_prefix_of(&self.target)
    }

    pub fn input(&self) -> &SignalStream {
        &self.input
    }

    pub fn target(&self) -> &SignalStream {
        &self.target
    }

    pub fn phrase(&self) -> &str {
        &self.phrase
    }

    pub fn tally(&self) -> AccuracyTally {
        self.tally
    }

    pub fn run(&self) -> Option<ScoreRun> {
        self.run
    }

    pub fn is_complete(&self) -> bool {
        self.run.is_some()
    }
}
