use serde::{Deserialize, Serialize};

/// Keyer timing thresholds. A hold shorter than `dit_threshold_ms` is a dot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DifficultyProfile {
    pub dit_threshold_ms: u64,
    pub letter_gap_ms: u64,
    pub word_gap_ms: u64,
}

/// Canonical keyer presets
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    clap::ValueEnum,
    strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Relaxed,
    #[default]
    Normal,
    Fast,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Relaxed, Difficulty::Normal, Difficulty::Fast];

    pub fn profile(self) -> DifficultyProfile {
        match self {
            Difficulty::Relaxed => DifficultyProfile {
                dit_threshold_ms: 300,
                letter_gap_ms: 600,
                word_gap_ms: 1500,
            },
            Difficulty::Normal => DifficultyProfile {
                dit_threshold_ms: 200,
                letter_gap_ms: 400,
                word_gap_ms: 1000,
            },
            Difficulty::Fast => DifficultyProfile {
                dit_threshold_ms: 120,
                letter_gap_ms: 250,
                word_gap_ms: 600,
            },
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Difficulty::Relaxed => "Slower timing, great for learning",
            Difficulty::Normal => "Standard Morse timing",
            Difficulty::Fast => "Challenge yourself!",
        }
    }

    /// Name of the per-user counter of completed keyer phrases.
    pub fn completions_field(self) -> &'static str {
        match self {
            Difficulty::Relaxed => "keyer_relaxed_completions",
            Difficulty::Normal => "keyer_normal_completions",
            Difficulty::Fast => "keyer_fast_completions",
        }
    }
}

impl From<Difficulty> for DifficultyProfile {
    fn from(d: Difficulty) -> Self {
        d.profile()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_are_ordered() {
        for d in Difficulty::ALL {
            let p = d.profile();
            assert!(p.dit_threshold_ms < p.letter_gap_ms);
            assert!(p.letter_gap_ms < p.word_gap_ms);
        }
    }

    #[test]
    fn test_display_and_serde_names() {
        assert_eq!(Difficulty::Relaxed.to_string(), "Relaxed");
        assert_eq!(
            serde_json::to_string(&Difficulty::Fast).unwrap(),
            "\"fast\""
        );
        let d: Difficulty = serde_json::from_str("\"normal\"").unwrap();
        assert_eq!(d, Difficulty::Normal);
    }

    #[test]
    fn test_default_is_normal() {
        assert_eq!(Difficulty::default(), Difficulty::Normal);
        assert_eq!(Difficulty::default().profile().dit_threshold_ms, 200);
    }
}
