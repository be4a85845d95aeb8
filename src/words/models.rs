//! Data models for the vocabulary store

use std::collections::BTreeMap;

use chrono::serde::{ts_milliseconds, ts_milliseconds_option};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Highest difficulty a word can reach (mastered-easy)
pub const MAX_DIFFICULTY: u8 = 5;

/// Difficulty at or above which a word counts as mastered
pub const MASTERED_DIFFICULTY: u8 = 4;

/// A vocabulary entry with its review state
///
/// Field names on the wire follow the dataset file format
/// (`english`/`chinese`, epoch-millisecond timestamps).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Word {
    #[serde(default)]
    pub id: i64,
    /// Source term
    #[serde(rename = "english", alias = "englishTerm")]
    pub term: String,
    /// Translated term
    #[serde(rename = "chinese", alias = "translatedTerm")]
    pub translation: String,
    #[serde(default)]
    pub example: String,
    #[serde(default)]
    pub unit: u32,
    #[serde(with = "ts_milliseconds", default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "ts_milliseconds_option", default)]
    pub last_reviewed_at: Option<DateTime<Utc>>,
    /// The word is due once `now >= next_review_date`
    #[serde(with = "ts_milliseconds", default = "Utc::now")]
    pub next_review_date: DateTime<Utc>,
    #[serde(default)]
    pub review_count: u32,
    #[serde(default)]
    pub correct_count: u32,
    #[serde(default)]
    pub incorrect_count: u32,
    /// 0 = brand new, 5 = mastered-easy
    #[serde(default)]
    pub difficulty: u8,
    /// Consecutive correct answers
    #[serde(default)]
    pub streak: u32,
}

impl Word {
    /// Create a fresh, immediately due word
    pub fn new(term: String, translation: String, now: DateTime<Utc>) -> Self {
        Self {
            id: 0,
            term,
            translation,
            example: String::new(),
            unit: 0,
            created_at: now,
            last_reviewed_at: None,
            next_review_date: now,
            review_count: 0,
            correct_count: 0,
            incorrect_count: 0,
            difficulty: 0,
            streak: 0,
        }
    }

    /// Case-insensitive identity used for duplicate checks and merging
    pub fn key(&self) -> String {
        self.term.to_lowercase()
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        now >= self.next_review_date
    }

    pub fn is_new(&self) -> bool {
        self.review_count == 0
    }

    /// Retention as a rounded percentage, 0 for never-reviewed words
    pub fn retention(&self) -> u32 {
        if self.review_count == 0 {
            return 0;
        }
        (f64::from(self.correct_count) / f64::from(self.review_count) * 100.0).round() as u32
    }

    /// Learning stage bucket, evaluated new → mastered → learning → reviewing
    pub fn status(&self) -> WordStatus {
        if self.review_count == 0 {
            WordStatus::New
        } else if self.difficulty >= MASTERED_DIFFICULTY {
            WordStatus::Mastered
        } else if self.review_count < 3 {
            WordStatus::Learning
        } else {
            WordStatus::Reviewing
        }
    }
}

/// Learning stage of a word
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WordStatus {
    /// Never reviewed
    New,
    /// Fewer than three reviews
    Learning,
    /// Regular spaced review
    Reviewing,
    /// Difficulty 4 or higher; reversible
    Mastered,
}

/// Fields supplied when adding a word
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewWord {
    #[serde(rename = "english", alias = "englishTerm")]
    pub term: String,
    #[serde(rename = "chinese", alias = "translatedTerm")]
    pub translation: String,
    #[serde(default)]
    pub example: String,
    #[serde(default)]
    pub unit: u32,
}

/// Partial update of a word; `None` leaves the field untouched
#[derive(Debug, Clone, Default)]
pub struct WordPatch {
    pub term: Option<String>,
    pub translation: Option<String>,
    pub example: Option<String>,
    pub unit: Option<u32>,
    pub last_reviewed_at: Option<DateTime<Utc>>,
    pub next_review_date: Option<DateTime<Utc>>,
    pub review_count: Option<u32>,
    pub correct_count: Option<u32>,
    pub incorrect_count: Option<u32>,
    pub difficulty: Option<u8>,
    pub streak: Option<u32>,
}

impl WordPatch {
    pub fn apply(&self, word: &mut Word) {
        if let Some(term) = &self.term {
            word.term = term.clone();
        }
        if let Some(translation) = &self.translation {
            word.translation = translation.clone();
        }
        if let Some(example) = &self.example {
            word.example = example.clone();
        }
        if let Some(unit) = self.unit {
            word.unit = unit;
        }
        if let Some(at) = self.last_reviewed_at {
            word.last_reviewed_at = Some(at);
        }
        if let Some(at) = self.next_review_date {
            word.next_review_date = at;
        }
        if let Some(n) = self.review_count {
            word.review_count = n;
        }
        if let Some(n) = self.correct_count {
            word.correct_count = n;
        }
        if let Some(n) = self.incorrect_count {
            word.incorrect_count = n;
        }
        if let Some(d) = self.difficulty {
            word.difficulty = d.min(MAX_DIFFICULTY);
        }
        if let Some(s) = self.streak {
            word.streak = s;
        }
    }
}

/// Per-review statistic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewStatistic {
    pub word_id: i64,
    pub correct: bool,
    pub difficulty: u8,
    pub streak: u32,
    pub interval_days: u32,
}

/// Per-session summary statistic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatistic {
    pub words_reviewed: u32,
    pub correct_answers: u32,
    pub incorrect_answers: u32,
    /// Session length in seconds
    pub duration: u64,
    /// Rounded percentage of correct answers
    pub accuracy: u32,
}

/// An append-only statistic event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum StatisticEvent {
    Review(ReviewStatistic),
    Session(SessionStatistic),
}

/// A statistic event as stored, with its calendar date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticRecord {
    pub id: i64,
    /// UTC calendar date the event was recorded on
    pub date: NaiveDate,
    #[serde(with = "ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub event: StatisticEvent,
}

impl StatisticRecord {
    pub fn as_review(&self) -> Option<&ReviewStatistic> {
        match &self.event {
            StatisticEvent::Review(review) => Some(review),
            StatisticEvent::Session(_) => None,
        }
    }
}

/// Full exported dataset, the unit of sync, import and export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    #[serde(default)]
    pub version: u32,
    #[serde(default = "Utc::now")]
    pub export_date: DateTime<Utc>,
    pub words: Vec<Word>,
    #[serde(default)]
    pub settings: BTreeMap<String, serde_json::Value>,
}

/// Outcome of the pure next-review calculation
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewResult {
    pub next_review_date: DateTime<Utc>,
    pub difficulty: u8,
    pub streak: u32,
    /// Incorrect count after this review
    pub incorrect_count: u32,
    pub interval_index: usize,
    pub days_until_review: u32,
}

/// A word after a review has been applied and persisted
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewedWord {
    #[serde(flatten)]
    pub word: Word,
    pub days_until_review: u32,
}

/// Aggregate counts over the word population
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningStats {
    pub total_words: usize,
    pub new_words: usize,
    pub learning: usize,
    pub reviewing: usize,
    pub mastered: usize,
    /// Mean per-word retention percentage over reviewed words
    pub average_retention: u32,
    pub overdue_words: usize,
}

/// Words scheduled for one calendar day
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DaySchedule {
    pub date: NaiveDate,
    pub words: Vec<Word>,
    pub count: usize,
}

/// Estimate of when a word will be mastered
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MasteryPrediction {
    pub mastered: bool,
    pub days_remaining: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_date: Option<DateTime<Utc>>,
}

/// Workload check over the upcoming week
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleAdvice {
    pub needs_optimization: bool,
    pub overloaded_days: Vec<NaiveDate>,
    pub message: String,
}
