use crate::codec::CODE_TABLE;
use log::debug;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Exercise families that keep their own streak.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum, strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
pub enum GameMode {
    /// Character shown, code typed.
    Standard,
    /// Code shown, character typed.
    Reverse,
    /// Code played, character typed.
    Listening,
    /// Word of the day; played through its own gate, not as practice.
    #[value(skip)]
    Daily,
}

impl GameMode {
    /// Modes whose best streak is kept as a high-water mark.
    pub const HIGH_STREAK_MODES: [GameMode; 3] =
        [GameMode::Standard, GameMode::Reverse, GameMode::Listening];

    /// Field of the user document holding this mode's streak record.
    pub fn high_streak_field(self) -> &'static str {
        match self {
            GameMode::Standard => "practice_high_streak",
            GameMode::Reverse => "reverse_high_streak",
            GameMode::Listening => "listening_high_streak",
            GameMode::Daily => "daily_high_streak",
        }
    }

    /// Whether the answer to a round is a code (as opposed to a character).
    pub fn answers_with_code(self) -> bool {
        matches!(self, GameMode::Standard | GameMode::Daily)
    }
}

/// Consecutive unaided correct answers.
///
/// A hint reveal zeroes the streak on the spot, and the answer that follows
/// it cannot add to the streak even when correct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreakCounter {
    mode: GameMode,
    current: u32,
    hint_shown: bool,
}

impl StreakCounter {
    pub fn new(mode: GameMode) -> Self {
        Self {
            mode,
            current: 0,
            hint_shown: false,
        }
    }

    pub fn mode(&self) -> GameMode {
        self.mode
    }

    pub fn current(&self) -> u32 {
        self.current
    }

    pub fn hint_shown(&self) -> bool {
        self.hint_shown
    }

    pub fn reveal_hint(&mut self) {
        self.hint_shown = true;
        self.current = 0;
    }

    /// Applies an answer and returns the streak afterwards.
    pub fn record_answer(&mut self, correct: bool) -> u32 {
        if correct && !self.hint_shown {
            self.current += 1;
        } else {
            self.current = 0;
        }
        debug!("{} streak now {}", self.mode, self.current);
        self.current
    }

    /// Clears the hint flag for the next question; the streak carries over.
    pub fn next_question(&mut self) {
        self.hint_shown = false;
    }
}

/// One single-character question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PracticeRound {
    pub mode: GameMode,
    pub character: char,
    pub started_ms: u64,
}

impl PracticeRound {
    pub fn new(mode: GameMode, character: char, started_ms: u64) -> Self {
        Self {
            mode,
            character: character.to_ascii_uppercase(),
            started_ms,
        }
    }

    /// The code for the character, or an empty string for unmapped input.
    pub fn expected_code(&self) -> &'static str {
        CODE_TABLE.code_for(self.character).unwrap_or("")
    }

    /// Code answers are compared trimmed; character answers case-insensitively.
    pub fn check(&self, answer: &str) -> bool {
        let answer = answer.trim();
        if self.mode.answers_with_code() {
            !answer.is_empty() && answer == self.expected_code()
        } else {
            let mut chars = answer.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => c.to_ascii_uppercase() == self.character,
                _ => false,
            }
        }
    }

    pub fn elapsed_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.started_ms)
    }
}

/// Random table character, different from `previous` whenever the table
/// allows it.
pub fn next_character<R: Rng + ?Sized>(rng: &mut R, previous: Option<char>) -> char {
    let pool: Vec<char> = CODE_TABLE
        .characters()
        .into_iter()
        .filter(|c| Some(*c) != previous)
        .collect();
    pool.choose(rng)
        .copied()
        .or(previous)
        .unwrap_or('E')
}
