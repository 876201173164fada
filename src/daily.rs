use crate::codec::encode_word;
use crate::phrases::DAILY_WORDS;
use chrono::{Datelike, NaiveDate};

/// Today's word: `((day_of_year * 31 + year * 7) mod n + n) mod n`.
pub fn word_for(date: NaiveDate) -> &'static str {
    let n = DAILY_WORDS.len() as i64;
    let seed = date.ordinal() as i64 * 31 + date.year() as i64 * 7;
    DAILY_WORDS[((seed % n + n) % n) as usize]
}

/// Letter codes of the day's word joined by single spaces.
pub fn expected_code(date: NaiveDate) -> String {
    encode_word(word_for(date))
}

/// ISO `YYYY-MM-DD` form used as the played-on marker.
pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Plain string comparison of the stored marker against today's; no
/// timezone handling.
pub fn already_played(last_played: &str, today: &str) -> bool {
    last_played == today
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyOutcome {
    pub correct: bool,
    pub streak: u32,
    pub date: String,
}

/// Grades one daily attempt. A wrong answer resets the streak; missed days
/// do not.
pub fn submit(date: NaiveDate, answer: &str, current_streak: u32) -> DailyOutcome {
    let correct = answer.trim() == expected_code(date);
    DailyOutcome {
        correct,
        streak: if correct { current_streak + 1 } else { 0 },
        date: date_key(date),
    }
}
