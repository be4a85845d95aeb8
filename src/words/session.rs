//! Study sessions
//!
//! A session is the shuffled list of today's words plus a running tally. When
//! the last word is marked a session summary statistic is written and the
//! daily streak settings are refreshed.

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use serde::Serialize;
use serde_json::json;

use super::lock_store;
use super::models::{ReviewedWord, SessionStatistic, StatisticEvent, Word};
use super::scheduler::Scheduler;
use super::storage::Result;

pub const LAST_SESSION_DATE_SETTING: &str = "lastSessionDate";
pub const CURRENT_STREAK_SETTING: &str = "currentStreak";

/// Running tally for a session
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    pub reviewed: u32,
    pub correct: u32,
    pub incorrect: u32,
    pub start_time: DateTime<Utc>,
}

impl SessionStats {
    fn new() -> Self {
        Self {
            reviewed: 0,
            correct: 0,
            incorrect: 0,
            start_time: Utc::now(),
        }
    }

    /// Rounded percentage of correct answers, 0 before any review
    pub fn accuracy(&self) -> u32 {
        if self.reviewed == 0 {
            return 0;
        }
        (f64::from(self.correct) / f64::from(self.reviewed) * 100.0).round() as u32
    }
}

/// Result of marking the current word
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkResult {
    pub word_result: ReviewedWord,
    pub has_next: bool,
    pub session_stats: SessionStats,
}

/// An in-progress study session
pub struct Session<'a> {
    scheduler: &'a Scheduler,
    words: Vec<Word>,
    index: usize,
    stats: SessionStats,
}

impl<'a> Session<'a> {
    /// Load today's words (up to the daily goal) and shuffle them
    pub fn start(scheduler: &'a Scheduler) -> Result<Self> {
        let goal = scheduler.daily_goal()? as usize;
        Self::with_limit(scheduler, goal)
    }

    pub fn with_limit(scheduler: &'a Scheduler, limit: usize) -> Result<Self> {
        let words = scheduler.get_today_words(limit)?;
        log::info!("Starting session with {} words", words.len());

        let mut session = Self {
            scheduler,
            words,
            index: 0,
            stats: SessionStats::new(),
        };
        session.shuffle();
        Ok(session)
    }

    fn shuffle(&mut self) {
        self.words.shuffle(&mut rand::thread_rng());
    }

    pub fn words(&self) -> &[Word] {
        &self.words
    }

    pub fn current_word(&self) -> Option<&Word> {
        self.words.get(self.index)
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn remaining(&self) -> usize {
        self.words.len().saturating_sub(self.index)
    }

    pub fn is_complete(&self) -> bool {
        self.index >= self.words.len()
    }

    /// Record whether the current word was known and advance
    ///
    /// Returns `None` once the session has no words left.
    pub fn mark_word(&mut self, is_known: bool) -> Result<Option<MarkResult>> {
        let Some(word_id) = self.current_word().map(|w| w.id) else {
            return Ok(None);
        };

        let word_result = self.scheduler.review_word(word_id, is_known)?;

        self.stats.reviewed += 1;
        if is_known {
            self.stats.correct += 1;
        } else {
            self.stats.incorrect += 1;
        }
        self.index += 1;

        if self.is_complete() {
            self.complete()?;
        }

        Ok(Some(MarkResult {
            word_result,
            has_next: !self.is_complete(),
            session_stats: self.stats.clone(),
        }))
    }

    /// Rewind to the first word with a fresh tally and a new order
    pub fn reset(&mut self) {
        self.index = 0;
        self.stats = SessionStats::new();
        self.shuffle();
    }

    fn complete(&self) -> Result<()> {
        let now = Utc::now();
        let duration = (now - self.stats.start_time).num_milliseconds().max(0) as f64 / 1000.0;
        let today = now.date_naive().format("%Y-%m-%d").to_string();

        let mut store = lock_store(self.scheduler.store());
        store.append_statistic_at(
            StatisticEvent::Session(SessionStatistic {
                words_reviewed: self.stats.reviewed,
                correct_answers: self.stats.correct,
                incorrect_answers: self.stats.incorrect,
                duration: duration.round() as u64,
                accuracy: self.stats.accuracy(),
            }),
            now,
        )?;

        let last_session = store.get_setting_str(LAST_SESSION_DATE_SETTING)?;
        if last_session.as_deref() != Some(today.as_str()) {
            store.set_setting(LAST_SESSION_DATE_SETTING, json!(today))?;
            let streak = store.study_streak(now.date_naive())?;
            store.set_setting(CURRENT_STREAK_SETTING, json!(streak))?;
        }

        log::info!(
            "Session complete: {} reviewed, {} correct, {}% accuracy",
            self.stats.reviewed,
            self.stats.correct,
            self.stats.accuracy()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::words::models::NewWord;
    use crate::words::storage::SqliteWordStore;
    use crate::words::SharedStore;

    fn setup(words: &[&str]) -> (Scheduler, SharedStore) {
        let store: SharedStore = Arc::new(Mutex::new(SqliteWordStore::open_in_memory().unwrap()));
        for term in words {
            lock_store(&store)
                .add(NewWord {
                    term: term.to_string(),
                    translation: format!("{}-t", term),
                    ..Default::default()
                })
                .unwrap();
        }
        (Scheduler::new(Arc::clone(&store)), store)
    }

    #[test]
    fn test_session_runs_to_completion() {
        let (scheduler, store) = setup(&["one", "two", "three"]);
        let mut session = Session::with_limit(&scheduler, 10).unwrap();
        assert_eq!(session.remaining(), 3);

        let first = session.mark_word(true).unwrap().unwrap();
        assert!(first.has_next);
        session.mark_word(false).unwrap().unwrap();
        let last = session.mark_word(true).unwrap().unwrap();
        assert!(!last.has_next);
        assert_eq!(last.session_stats.reviewed, 3);
        assert_eq!(last.session_stats.correct, 2);
        assert_eq!(last.session_stats.incorrect, 1);

        assert!(session.mark_word(true).unwrap().is_none());

        let store = lock_store(&store);
        let today = Utc::now().date_naive();
        let events = store.get_statistics_by_date(today).unwrap();
        let summary = events
            .iter()
            .find_map(|e| match &e.event {
                StatisticEvent::Session(s) => Some(s.clone()),
                StatisticEvent::Review(_) => None,
            })
            .unwrap();
        assert_eq!(summary.words_reviewed, 3);
        assert_eq!(summary.accuracy, 67);
        assert_eq!(
            store.get_setting_str(LAST_SESSION_DATE_SETTING).unwrap(),
            Some(today.format("%Y-%m-%d").to_string())
        );
        assert_eq!(store.get_setting_u32(CURRENT_STREAK_SETTING, 0).unwrap(), 1);
    }

    #[test]
    fn test_session_respects_daily_goal() {
        let (scheduler, store) = setup(&["a", "b", "c", "d"]);
        lock_store(&store)
            .set_setting(crate::words::scheduler::DAILY_GOAL_SETTING, json!(2))
            .unwrap();

        let session = Session::start(&scheduler).unwrap();
        assert_eq!(session.words().len(), 2);
    }

    #[test]
    fn test_reset_rewinds_session() {
        let (scheduler, _store) = setup(&["a", "b"]);
        let mut session = Session::with_limit(&scheduler, 5).unwrap();
        session.mark_word(true).unwrap();
        assert_eq!(session.remaining(), 1);

        session.reset();
        assert_eq!(session.remaining(), 2);
        assert_eq!(session.stats().reviewed, 0);
    }

    #[test]
    fn test_empty_session() {
        let (scheduler, _store) = setup(&[]);
        let mut session = Session::with_limit(&scheduler, 5).unwrap();
        assert!(session.is_complete());
        assert!(session.current_word().is_none());
        assert!(session.mark_word(true).unwrap().is_none());
    }
}
