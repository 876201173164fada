use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

pub const DEFAULT_WEAKEST_COUNT: usize = 3;

/// Accumulated answers for one character.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterStat {
    pub attempts: u64,
    pub mistakes: u64,
    pub total_time_ms: u64,
}

impl CharacterStat {
    pub fn record(&mut self, correct: bool, elapsed_ms: u64) {
        self.attempts += 1;
        if !correct {
            self.mistakes += 1;
        }
        self.total_time_ms += elapsed_ms;
    }

    /// None when there were no attempts.
    pub fn mistake_rate(&self) -> Option<f64> {
        (self.attempts > 0).then(|| self.mistakes as f64 / self.attempts as f64)
    }

    pub fn avg_time_ms(&self) -> Option<f64> {
        (self.attempts > 0).then(|| self.total_time_ms as f64 / self.attempts as f64)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CharacterScore {
    pub character: char,
    pub mistake_rate: f64,
    pub avg_time_ms: f64,
}

/// Orders characters weakest first: mistake rate, then average time, both
/// descending, then the character itself ascending.
pub fn rank(stats: &HashMap<char, CharacterStat>) -> Vec<CharacterScore> {
    let mut scores: Vec<CharacterScore> = stats
        .iter()
        .filter_map(|(&character, stat)| {
            Some(CharacterScore {
                character,
                mistake_rate: stat.mistake_rate()?,
                avg_time_ms: stat.avg_time_ms()?,
            })
        })
        .collect();

    scores.sort_by(|a, b| {
        b.mistake_rate
            .partial_cmp(&a.mistake_rate)
            .unwrap_or(Ordering::Equal)
            .then_with(|| {
                b.avg_time_ms
                    .partial_cmp(&a.avg_time_ms)
                    .unwrap_or(Ordering::Equal)
            })
            .then_with(|| a.character.cmp(&b.character))
    });
    scores
}

/// Up to `count` weakest characters. Empty means there is not enough data.
pub fn weakest_characters(stats: &HashMap<char, CharacterStat>, count: usize) -> Vec<char> {
    rank(stats)
        .into_iter()
        .take(count)
        .map(|score| score.character)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrillStep {
    Teach(char),
    Quiz(char),
}

/// Teach then quiz each weak character, in rank order.
pub fn drill_plan(weak: &[char]) -> Vec<DrillStep> {
    weak.iter()
        .flat_map(|&c| [DrillStep::Teach(c), DrillStep::Quiz(c)])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stat(attempts: u64, mistakes: u64, total_time_ms: u64) -> CharacterStat {
        CharacterStat {
            attempts,
            mistakes,
            total_time_ms,
        }
    }

    #[test]
    fn test_mistake_rate_outranks_time() {
        let stats = HashMap::from([('A', stat(10, 5, 10_000)), ('B', stat(10, 2, 50_000))]);
        assert_eq!(weakest_characters(&stats, 3), vec!['A', 'B']);
    }

    #[test]
    fn test_time_breaks_rate_ties() {
        let stats = HashMap::from([
            ('A', stat(4, 1, 4_000)),
            ('B', stat(8, 2, 16_000)),
            ('C', stat(2, 0, 100)),
        ]);
        assert_eq!(weakest_characters(&stats, 3), vec!['B', 'A', 'C']);
    }

    #[test]
    fn test_full_ties_are_stable() {
        let stats = HashMap::from([
            ('Z', stat(1, 0, 500)),
            ('M', stat(1, 0, 500)),
            ('D', stat(1, 0, 500)),
        ]);
        assert_eq!(weakest_characters(&stats, 2), vec!['D', 'M']);
    }

    #[test]
    fn test_zero_attempts_are_ignored() {
        let stats = HashMap::from([('A', stat(0, 0, 0)), ('B', CharacterStat::default())]);
        assert!(weakest_characters(&stats, DEFAULT_WEAKEST_COUNT).is_empty());
        assert!(weakest_characters(&HashMap::new(), DEFAULT_WEAKEST_COUNT).is_empty());
    }

    #[test]
    fn test_takes_top_k() {
        let stats: HashMap<char, CharacterStat> = ('A'..='J')
            .enumerate()
            .map(|(i, c)| (c, stat(10, i as u64, 1_000)))
            .collect();
        assert_eq!(weakest_characters(&stats, 3), vec!['J', 'I', 'H']);
    }

    #[test]
    fn test_record_accumulates() {
        let mut s = CharacterStat::default();
        s.record(true, 800);
        s.record(false, 1_200);
        assert_eq!(s, stat(2, 1, 2_000));
        assert_eq!(s.mistake_rate(), Some(0.5));
        assert_eq!(s.avg_time_ms(), Some(1_000.0));
    }

    #[test]
    fn test_drill_plan() {
        assert_eq!(
            drill_plan(&['Q', 'Y']),
            vec![
                DrillStep::Teach('Q'),
                DrillStep::Quiz('Q'),
                DrillStep::Teach('Y'),
                DrillStep::Quiz('Y'),
            ]
        );
        assert!(drill_plan(&[]).is_empty());
    }
}
