//! Store-backed review scheduling
//!
//! Applies [`calculate_next_review`] to stored words, selects the words for a
//! study session and aggregates the word population for reporting.

use std::cmp::Reverse;

use chrono::{DateTime, Duration, NaiveDate, Utc};

use super::algorithm::{calculate_next_review, PaceProfile, PACE_SETTING};
use super::models::*;
use super::storage::{Result, WordStoreError};
use super::{lock_store, SharedStore};

/// Setting key for the number of words per session
pub const DAILY_GOAL_SETTING: &str = "dailyGoal";
pub const DEFAULT_DAILY_GOAL: u32 = 20;

const MS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Reviews still needed before a word is expected to be mastered
const REVIEWS_TO_MASTERY: u32 = 5;
/// Average days between reviews used for mastery estimates
const AVERAGE_INTERVAL_DAYS: f64 = 7.0;

/// Review scheduler over a shared word store
pub struct Scheduler {
    store: SharedStore,
}

impl Scheduler {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    /// The user's pace profile, standard when unset
    pub fn pace(&self) -> Result<PaceProfile> {
        let store = lock_store(&self.store);
        let value = store.get_setting_str(PACE_SETTING)?;
        Ok(PaceProfile::from_setting(value.as_deref()))
    }

    pub fn daily_goal(&self) -> Result<u32> {
        lock_store(&self.store).get_setting_u32(DAILY_GOAL_SETTING, DEFAULT_DAILY_GOAL)
    }

    /// Compute (without persisting) the outcome of reviewing a word now
    pub fn calculate_next_review(&self, word: &Word, is_correct: bool) -> Result<ReviewResult> {
        Ok(calculate_next_review(word, is_correct, self.pace()?, Utc::now()))
    }

    /// Record a review outcome for a word
    pub fn review_word(&self, word_id: i64, is_correct: bool) -> Result<ReviewedWord> {
        self.review_word_at(word_id, is_correct, Utc::now())
    }

    pub fn review_word_at(
        &self,
        word_id: i64,
        is_correct: bool,
        now: DateTime<Utc>,
    ) -> Result<ReviewedWord> {
        let pace = self.pace()?;
        let mut store = lock_store(&self.store);
        let word = store.get(word_id)?.ok_or(WordStoreError::NotFound(word_id))?;

        let result = calculate_next_review(&word, is_correct, pace, now);

        // A correct answer on a word reviewed ahead of schedule keeps its later date
        let next_review_date = if is_correct {
            result.next_review_date.max(word.next_review_date)
        } else {
            result.next_review_date
        };
        let days_until_review = if next_review_date == result.next_review_date {
            result.days_until_review
        } else {
            days_until(next_review_date, now)
        };

        let patch = WordPatch {
            last_reviewed_at: Some(now),
            review_count: Some(word.review_count + 1),
            correct_count: Some(word.correct_count + u32::from(is_correct)),
            incorrect_count: Some(result.incorrect_count),
            difficulty: Some(result.difficulty),
            streak: Some(result.streak),
            next_review_date: Some(next_review_date),
            ..Default::default()
        };
        let updated = store.update(word_id, &patch)?;

        store.append_statistic_at(
            StatisticEvent::Review(ReviewStatistic {
                word_id,
                correct: is_correct,
                difficulty: result.difficulty,
                streak: result.streak,
                interval_days: days_until_review,
            }),
            now,
        )?;

        log::debug!(
            "Reviewed word {} correct={} difficulty={} next in {}d",
            word_id,
            is_correct,
            result.difficulty,
            days_until_review
        );

        Ok(ReviewedWord {
            word: updated,
            days_until_review,
        })
    }

    /// Words for today's session, at most `limit`
    pub fn get_today_words(&self, limit: usize) -> Result<Vec<Word>> {
        self.get_today_words_at(limit, Utc::now())
    }

    pub fn get_today_words_at(&self, limit: usize, now: DateTime<Utc>) -> Result<Vec<Word>> {
        let mut words = {
            let store = lock_store(&self.store);
            let mut words = store.get_due_for_review(limit, now)?;

            // Top up with new material only when there are not enough due reviews
            if words.len() < limit {
                let deficit = limit - words.len();
                let fresh: Vec<Word> = store
                    .get_never_reviewed(limit)?
                    .into_iter()
                    .filter(|w| !words.iter().any(|d| d.id == w.id))
                    .take(deficit)
                    .collect();
                words.extend(fresh);
            }
            words
        };

        sort_by_priority(&mut words, now);
        words.truncate(limit);
        Ok(words)
    }

    /// Per-day buckets of upcoming reviews, starting today
    pub fn get_upcoming_schedule(&self, days: u32) -> Result<Vec<DaySchedule>> {
        self.get_upcoming_schedule_at(days, Utc::now())
    }

    pub fn get_upcoming_schedule_at(&self, days: u32, now: DateTime<Utc>) -> Result<Vec<DaySchedule>> {
        let words = lock_store(&self.store).get_all()?;

        let mut schedule: Vec<DaySchedule> = (0..days)
            .map(|i| DaySchedule {
                date: (now + Duration::days(i64::from(i))).date_naive(),
                words: Vec::new(),
                count: 0,
            })
            .collect();

        for word in words {
            let days_until = (word.next_review_date - now)
                .num_milliseconds()
                .div_euclid(MS_PER_DAY);
            if days_until < 0 || days_until >= i64::from(days) {
                continue;
            }
            let date = word.next_review_date.date_naive();
            if let Some(bucket) = schedule.iter_mut().find(|d| d.date == date) {
                bucket.words.push(word);
                bucket.count += 1;
            }
        }

        Ok(schedule)
    }

    pub fn get_learning_stats(&self) -> Result<LearningStats> {
        self.get_learning_stats_at(Utc::now())
    }

    pub fn get_learning_stats_at(&self, now: DateTime<Utc>) -> Result<LearningStats> {
        let words = lock_store(&self.store).get_all()?;
        Ok(learning_stats(&words, now))
    }

    /// Estimate how long until a word is mastered
    pub fn predict_mastery(word: &Word, now: DateTime<Utc>) -> MasteryPrediction {
        if word.difficulty >= MASTERED_DIFFICULTY {
            return MasteryPrediction {
                mastered: true,
                days_remaining: 0,
                estimated_date: None,
            };
        }

        let remaining_reviews = REVIEWS_TO_MASTERY.saturating_sub(word.review_count);
        let estimated_days = f64::from(remaining_reviews) * AVERAGE_INTERVAL_DAYS;
        let performance_factor = if word.retention() > 80 { 0.8 } else { 1.2 };
        let adjusted_days = estimated_days * performance_factor;

        MasteryPrediction {
            mastered: false,
            days_remaining: adjusted_days.round() as u32,
            estimated_date: Some(now + Duration::milliseconds((adjusted_days * MS_PER_DAY as f64) as i64)),
        }
    }

    /// Check whether the next week's workload is unevenly spread
    pub fn optimize_schedule(&self) -> Result<ScheduleAdvice> {
        self.optimize_schedule_at(Utc::now())
    }

    pub fn optimize_schedule_at(&self, now: DateTime<Utc>) -> Result<ScheduleAdvice> {
        let daily_goal = f64::from(self.daily_goal()?);
        let schedule = self.get_upcoming_schedule_at(7, now)?;

        let overloaded_days: Vec<NaiveDate> = schedule
            .iter()
            .filter(|day| day.count as f64 > daily_goal * 1.5)
            .map(|day| day.date)
            .collect();

        if overloaded_days.is_empty() {
            return Ok(ScheduleAdvice {
                needs_optimization: false,
                overloaded_days,
                message: "Review schedule is well balanced.".to_string(),
            });
        }

        Ok(ScheduleAdvice {
            needs_optimization: true,
            message: format!(
                "Consider spreading reviews across multiple days. You have {} days with heavy load.",
                overloaded_days.len()
            ),
            overloaded_days,
        })
    }
}

/// Whole days from `now` until `date`, rounded up
fn days_until(date: DateTime<Utc>, now: DateTime<Utc>) -> u32 {
    let ms = (date - now).num_milliseconds().max(0);
    u32::try_from((ms + MS_PER_DAY - 1) / MS_PER_DAY).unwrap_or(u32::MAX)
}

/// Order words so that the most overdue come first, then the hardest
///
/// Only positive overdue time counts; words that are not yet due (or exactly
/// due) fall back to difficulty order. Ties break on id for a stable order.
pub fn sort_by_priority(words: &mut [Word], now: DateTime<Utc>) {
    words.sort_by_key(|w| {
        let overdue = (now - w.next_review_date).num_milliseconds().max(0);
        (Reverse(overdue), w.difficulty, w.id)
    });
}

/// Bucket the word population into learning stages
pub fn learning_stats(words: &[Word], now: DateTime<Utc>) -> LearningStats {
    let mut stats = LearningStats {
        total_words: words.len(),
        ..Default::default()
    };

    let mut total_retention = 0u32;
    let mut reviewed_words = 0u32;

    for word in words {
        match word.status() {
            WordStatus::New => stats.new_words += 1,
            WordStatus::Mastered => stats.mastered += 1,
            WordStatus::Learning => stats.learning += 1,
            WordStatus::Reviewing => stats.reviewing += 1,
        }

        if word.next_review_date < now {
            stats.overdue_words += 1;
        }

        if word.review_count > 0 {
            total_retention += word.retention();
            reviewed_words += 1;
        }
    }

    if reviewed_words > 0 {
        stats.average_retention =
            (f64::from(total_retention) / f64::from(reviewed_words)).round() as u32;
    }

    stats
}
