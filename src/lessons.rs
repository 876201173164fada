//! Fixed curriculum: each lesson teaches a few characters, then quizzes
//! them. Lessons are taken in order; completion is kept per user by the
//! progress recorder.

use crate::codec::CODE_TABLE;
use crate::error::{CoachError, Result};
use crate::practice::{GameMode, PracticeRound};
use crate::selector::{drill_plan, DrillStep};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lesson {
    pub id: &'static str,
    pub title: &'static str,
    pub order: u32,
    /// Characters taught, space separated.
    pub content: &'static str,
}

pub const LESSONS: [Lesson; 7] = [
    Lesson {
        id: "lesson_01",
        title: "The Basics",
        order: 1,
        content: "E T I M",
    },
    Lesson {
        id: "lesson_02",
        title: "Common Letters",
        order: 2,
        content: "A N S O H",
    },
    Lesson {
        id: "lesson_03",
        title: "Mirrors & Opposites",
        order: 3,
        content: "R K D U G W",
    },
    Lesson {
        id: "lesson_04",
        title: "Rhythm & Flow",
        order: 4,
        content: "B V F L P",
    },
    Lesson {
        id: "lesson_05",
        title: "Complex Characters",
        order: 5,
        content: "Q J X Y Z C",
    },
    Lesson {
        id: "lesson_06",
        title: "Numbers 1-5",
        order: 6,
        content: "1 2 3 4 5",
    },
    Lesson {
        id: "lesson_07",
        title: "Numbers 6-0",
        order: 7,
        content: "6 7 8 9 0",
    },
];

impl Lesson {
    pub fn characters(&self) -> Vec<char> {
        self.content
            .split_whitespace()
            .flat_map(str::chars)
            .filter(|c| CODE_TABLE.contains(*c))
            .collect()
    }

    /// Teach then quiz each character, in lesson order.
    pub fn steps(&self) -> Vec<DrillStep> {
        drill_plan(&self.characters())
    }

    /// Grades quiz answers given in character order. Missing answers count
    /// as wrong.
    pub fn grade<S: AsRef<str>>(&self, answers: &[S]) -> LessonGrade {
        let results = self
            .characters()
            .into_iter()
            .enumerate()
            .map(|(i, character)| {
                let round = PracticeRound::new(GameMode::Standard, character, 0);
                let correct = answers.get(i).is_some_and(|a| round.check(a.as_ref()));
                (character, correct)
            })
            .collect();
        LessonGrade { results }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonGrade {
    pub results: Vec<(char, bool)>,
}

impl LessonGrade {
    pub fn correct(&self) -> usize {
        self.results.iter().filter(|(_, ok)| *ok).count()
    }

    /// Every quiz answered correctly.
    pub fn passed(&self) -> bool {
        self.results.iter().all(|(_, ok)| *ok)
    }
}

/// Looks a lesson up by id (`lesson_03`) or by its order number (`3`).
pub fn find(key: &str) -> Result<&'static Lesson> {
    let key = key.trim();
    LESSONS
        .iter()
        .find(|l| l.id == key || key.parse::<u32>().is_ok_and(|n| n == l.order))
        .ok_or_else(|| CoachError::UnknownLesson(key.to_string()))
}

/// First lesson, in order, that is not in `completed`.
pub fn next_lesson<S: AsRef<str>>(completed: &[S]) -> Option<&'static Lesson> {
    LESSONS
        .iter()
        .find(|l| !completed.iter().any(|id| id.as_ref() == l.id))
}
