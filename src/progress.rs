//! Per-user progress written through a [`DocumentStore`].
//!
//! Layout:
//! - `users/{user}`: personal best, lifetime sums, streak records, keyer
//!   completion counters and the daily challenge marker
//! - `users/{user}/run_history/{id}`: one document per completed run
//! - `users/{user}/char_stats/{char}`: per-character answer totals

use crate::daily::DailyOutcome;
use crate::difficulty::Difficulty;
use crate::error::{StoreError, StoreResult};
use crate::practice::GameMode;
use crate::scoring::ScoreRun;
use crate::selector::{weakest_characters, CharacterStat};
use crate::store::{
    field_f64, field_u64, number_value, DocKey, Document, DocumentStore, Query, WriteMode,
};
use crate::util::{mean, round_to_tenth, std_dev};
use log::{debug, info, warn};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

pub const USERS: &str = "users";
pub const DEFAULT_MAX_HISTORY: usize = 10;

const PERSONAL_BEST: &str = "personal_best_wpm";
const LIFETIME_RUNS: &str = "lifetime_runs";
const LIFETIME_WPM_SUM: &str = "lifetime_wpm_sum";
const LIFETIME_ACCURACY_SUM: &str = "lifetime_accuracy_sum";
const DAILY_STREAK: &str = "daily_challenge_streak";
const DAILY_DATE: &str = "last_daily_challenge_date";
const TIMESTAMP: &str = "timestamp";
const COMPLETED_LESSONS: &str = "completed_lessons";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunRecord {
    pub new_personal_best: bool,
    pub pruned: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DailyInfo {
    pub streak: u32,
    /// ISO date of the last attempt, empty when never played.
    pub last_date: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatsSummary {
    pub personal_best_wpm: Option<f64>,
    pub lifetime_runs: u64,
    pub lifetime_avg_wpm: Option<f64>,
    pub lifetime_avg_accuracy: Option<f64>,
    pub recent_runs: usize,
    pub recent_avg_wpm: Option<f64>,
    pub recent_avg_accuracy: Option<f64>,
    pub recent_wpm_std_dev: Option<f64>,
    pub high_streaks: Vec<(GameMode, u64)>,
    pub keyer_completions: Vec<(Difficulty, u64)>,
    pub daily_streak: u64,
    pub daily_high_streak: u64,
}

/// A store failure reported to the user without interrupting the exercise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub operation: &'static str,
    pub message: String,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "could not {}: {}", self.operation, self.message)
    }
}

/// Logs a failed store call and turns it into a [`Notice`].
pub fn quietly<T>(operation: &'static str, result: StoreResult<T>) -> Result<T, Notice> {
    result.map_err(|e: StoreError| {
        warn!("failed to {operation}: {e}");
        Notice {
            operation,
            message: e.to_string(),
        }
    })
}

fn object(value: Value) -> Document {
    match value {
        Value::Object(map) => map,
        _ => Document::new(),
    }
}

fn lesson_ids(doc: Option<&Document>) -> Vec<String> {
    doc.and_then(|d| d.get(COMPLETED_LESSONS))
        .and_then(Value::as_array)
        .map(|ids| {
            ids.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[derive(Debug)]
pub struct ProgressRecorder<S: DocumentStore> {
    store: S,
    user_id: String,
    max_history: usize,
}

impl<S: DocumentStore> ProgressRecorder<S> {
    pub fn new(store: S, user_id: impl Into<String>) -> Self {
        Self {
            store,
            user_id: user_id.into(),
            max_history: DEFAULT_MAX_HISTORY,
        }
    }

    /// A bound of zero is treated as one.
    pub fn with_max_history(mut self, max_history: usize) -> Self {
        self.max_history = max_history.max(1);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn max_history(&self) -> usize {
        self.max_history
    }

    fn user_key(&self) -> DocKey {
        DocKey::new(USERS, &self.user_id)
    }

    fn history_collection(&self) -> String {
        format!("{USERS}/{}/run_history", self.user_id)
    }

    fn char_stats_collection(&self) -> String {
        format!("{USERS}/{}/char_stats", self.user_id)
    }

    pub fn user_document(&self) -> StoreResult<Document> {
        Ok(self.store.get(&self.user_key())?.unwrap_or_default())
    }

    /// Appends the run to history, prunes history, updates the personal
    /// best and adds to the lifetime totals.
    pub fn record_run(&self, run: &ScoreRun) -> StoreResult<RunRecord> {
        let id = format!("{:013}-{:04x}", run.timestamp_ms, rand::random::<u16>());
        let entry = object(serde_json::to_value(run)?);
        self.store.set(
            &DocKey::new(self.history_collection(), id),
            entry,
            WriteMode::Overwrite,
        )?;

        let pruned = self.prune_history()?;
        let new_personal_best = self.offer_personal_best(run.wpm)?;

        let user = self.user_key();
        self.store.increment(&user, LIFETIME_RUNS, 1.0)?;
        self.store.increment(&user, LIFETIME_WPM_SUM, run.wpm)?;
        self.store
            .increment(&user, LIFETIME_ACCURACY_SUM, run.accuracy)?;

        info!(
            "recorded run for {}: {} wpm, {}% accuracy{}",
            self.user_id,
            run.wpm,
            run.accuracy,
            if new_personal_best { " (new best)" } else { "" }
        );
        Ok(RunRecord {
            new_personal_best,
            pruned,
        })
    }

    /// Keeps the newest `max_history` entries and deletes the rest in one
    /// batch. Runs sharing the boundary timestamp are cut in id order, so the
    /// stored history never exceeds the bound.
    pub fn prune_history(&self) -> StoreResult<usize> {
        let stale: Vec<DocKey> = self
            .store
            .query(
                &self.history_collection(),
                &Query::ordered_by(TIMESTAMP).descending(),
            )?
            .into_iter()
            .skip(self.max_history)
            .map(|(key, _)| key)
            .collect();
        if stale.is_empty() {
            return Ok(0);
        }
        let deleted = self.store.delete_batch(&stale)?;
        debug!("pruned {deleted} history entries for {}", self.user_id);
        Ok(deleted)
    }

    /// Newest first, at most `max_history` runs. Malformed entries are skipped.
    pub fn history(&self) -> StoreResult<Vec<ScoreRun>> {
        let rows = self.store.query(
            &self.history_collection(),
            &Query::ordered_by(TIMESTAMP)
                .descending()
                .limit(self.max_history),
        )?;
        Ok(rows
            .into_iter()
            .filter_map(|(_, doc)| serde_json::from_value(Value::Object(doc)).ok())
            .collect())
    }

    /// Compare-and-set: writes only when `wpm` beats the stored best.
    pub fn offer_personal_best(&self, wpm: f64) -> StoreResult<bool> {
        self.store.run_transaction(&self.user_key(), &mut |current| {
            let best = current.and_then(|doc| field_f64(doc, PERSONAL_BEST));
            match best {
                Some(best) if wpm <= best => None,
                _ => {
                    let mut fields = Document::new();
                    fields.insert(PERSONAL_BEST.to_string(), number_value(wpm));
                    Some(fields)
                }
            }
        })
    }

    /// Max-merge of a streak into the mode's high-water mark.
    pub fn merge_high_streak(&self, mode: GameMode, streak: u32) -> StoreResult<bool> {
        let field = mode.high_streak_field();
        let raised = self.store.run_transaction(&self.user_key(), &mut |current| {
            let high = current.and_then(|doc| field_u64(doc, field)).unwrap_or(0);
            (u64::from(streak) > high).then(|| {
                let mut fields = Document::new();
                fields.insert(field.to_string(), Value::from(streak));
                fields
            })
        })?;
        if raised {
            info!("new {mode} high streak {streak} for {}", self.user_id);
        }
        Ok(raised)
    }

    pub fn record_char_attempt(
        &self,
        character: char,
        correct: bool,
        elapsed_ms: u64,
    ) -> StoreResult<()> {
        let key = DocKey::new(
            self.char_stats_collection(),
            character.to_ascii_uppercase().to_string(),
        );
        self.store.run_transaction(&key, &mut |current| {
            let mut stat: CharacterStat = current
                .and_then(|doc| serde_json::from_value(Value::Object(doc.clone())).ok())
                .unwrap_or_default();
            stat.record(correct, elapsed_ms);
            serde_json::to_value(stat).ok().map(object)
        })?;
        Ok(())
    }

    pub fn load_char_stats(&self) -> StoreResult<HashMap<char, CharacterStat>> {
        let rows = self
            .store
            .query(&self.char_stats_collection(), &Query::ordered_by("attempts"))?;
        Ok(rows
            .into_iter()
            .filter_map(|(key, doc)| {
                let character = key.id.chars().next()?;
                let stat = serde_json::from_value(Value::Object(doc)).ok()?;
                Some((character, stat))
            })
            .collect())
    }

    pub fn weakest(&self, count: usize) -> StoreResult<Vec<char>> {
        Ok(weakest_characters(&self.load_char_stats()?, count))
    }

    pub fn increment_keyer_completion(&self, difficulty: Difficulty) -> StoreResult<()> {
        self.store
            .increment(&self.user_key(), difficulty.completions_field(), 1.0)
    }

    /// Ids of finished lessons, in the order they were finished.
    pub fn completed_lessons(&self) -> StoreResult<Vec<String>> {
        let doc = self.user_document()?;
        Ok(lesson_ids(Some(&doc)))
    }

    /// Adds the lesson to the finished list unless it is already there.
    /// Returns whether the list changed.
    pub fn mark_lesson_complete(&self, lesson_id: &str) -> StoreResult<bool> {
        let added = self.store.run_transaction(&self.user_key(), &mut |current| {
            let mut completed = lesson_ids(current);
            if completed.iter().any(|id| id == lesson_id) {
                return None;
            }
            completed.push(lesson_id.to_string());
            let mut fields = Document::new();
            fields.insert(COMPLETED_LESSONS.to_string(), Value::from(completed));
            Some(fields)
        })?;
        if added {
            info!("{} completed {lesson_id}", self.user_id);
        }
        Ok(added)
    }

    pub fn daily_info(&self) -> StoreResult<DailyInfo> {
        let doc = self.user_document()?;
        Ok(DailyInfo {
            streak: field_u64(&doc, DAILY_STREAK).unwrap_or(0) as u32,
            last_date: doc
                .get(DAILY_DATE)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        })
    }

    /// Writes streak and date together, overwriting both, then raises the
    /// daily high-water mark if the streak beat it.
    pub fn record_daily(&self, outcome: &DailyOutcome) -> StoreResult<()> {
        let mut fields = Document::new();
        fields.insert(DAILY_STREAK.to_string(), Value::from(outcome.streak));
        fields.insert(DAILY_DATE.to_string(), Value::from(outcome.date.clone()));
        self.store.set(&self.user_key(), fields, WriteMode::Merge)?;
        self.merge_high_streak(GameMode::Daily, outcome.streak)?;
        Ok(())
    }

    pub fn summary(&self) -> StoreResult<StatsSummary> {
        let doc = self.user_document()?;
        let runs = field_u64(&doc, LIFETIME_RUNS).unwrap_or(0);
        let lifetime_avg = |field: &str| {
            (runs > 0).then(|| round_to_tenth(field_f64(&doc, field).unwrap_or(0.0) / runs as f64))
        };

        let history = self.history()?;
        let wpms: Vec<f64> = history.iter().map(|r| r.wpm).collect();
        let accuracies: Vec<f64> = history.iter().map(|r| r.accuracy).collect();

        Ok(StatsSummary {
            personal_best_wpm: field_f64(&doc, PERSONAL_BEST),
            lifetime_runs: runs,
            lifetime_avg_wpm: lifetime_avg(LIFETIME_WPM_SUM),
            lifetime_avg_accuracy: lifetime_avg(LIFETIME_ACCURACY_SUM),
            recent_runs: history.len(),
            recent_avg_wpm: mean(&wpms).map(round_to_tenth),
            recent_avg_accuracy: mean(&accuracies).map(round_to_tenth),
            recent_wpm_std_dev: std_dev(&wpms).map(round_to_tenth),
            high_streaks: GameMode::HIGH_STREAK_MODES
                .iter()
                .map(|&mode| (mode, field_u64(&doc, mode.high_streak_field()).unwrap_or(0)))
                .collect(),
            keyer_completions: Difficulty::ALL
                .iter()
                .map(|&d| (d, field_u64(&doc, d.completions_field()).unwrap_or(0)))
                .collect(),
            daily_streak: field_u64(&doc, DAILY_STREAK).unwrap_or(0),
            daily_high_streak: field_u64(&doc, GameMode::Daily.high_streak_field()).unwrap_or(0),
        })
    }
}
