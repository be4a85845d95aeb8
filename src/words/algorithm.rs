//! Spaced repetition heuristic
//!
//! Each word walks an ascending interval table (chosen by the user's pace
//! profile) one step per review. The table entry is scaled by a per-difficulty
//! factor, so words the learner finds hard come back sooner:
//!
//! | difficulty | factor |
//! |-----------:|-------:|
//! | 0 (new)    | 2.5    |
//! | 1          | 2.2    |
//! | 2          | 1.8    |
//! | 3          | 1.3    |
//! | 4          | 1.0    |
//! | 5          | 0.8    |
//!
//! Incorrect answers step back two places in the table (or restart once a
//! word has been failed more than twice in total) and are never scheduled
//! more than three days out.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::models::{ReviewResult, Word, MAX_DIFFICULTY};

/// Setting key holding the pace profile name
pub const PACE_SETTING: &str = "reviewInterval";

const STANDARD_INTERVALS: [u32; 6] = [1, 2, 4, 7, 15, 30];
const FAST_INTERVALS: [u32; 6] = [1, 2, 3, 5, 7, 14];
const SLOW_INTERVALS: [u32; 6] = [1, 3, 7, 14, 30, 60];

/// Longest interval an incorrect answer can produce
const MAX_INCORRECT_DAYS: u32 = 3;

/// Cumulative failures after which a word restarts the table
const RESTART_AFTER_FAILURES: u32 = 2;

/// Named interval table controlling how aggressively reviews are spaced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaceProfile {
    #[default]
    Standard,
    Fast,
    Slow,
}

impl PaceProfile {
    /// Parse a stored setting value, falling back to standard
    pub fn from_setting(value: Option<&str>) -> Self {
        match value {
            Some("fast") => Self::Fast,
            Some("slow") => Self::Slow,
            _ => Self::Standard,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Fast => "fast",
            Self::Slow => "slow",
        }
    }

    pub fn intervals(&self) -> &'static [u32; 6] {
        match self {
            Self::Standard => &STANDARD_INTERVALS,
            Self::Fast => &FAST_INTERVALS,
            Self::Slow => &SLOW_INTERVALS,
        }
    }
}

impl std::str::FromStr for PaceProfile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "standard" => Ok(Self::Standard),
            "fast" => Ok(Self::Fast),
            "slow" => Ok(Self::Slow),
            other => Err(format!("unknown pace profile: {}", other)),
        }
    }
}

/// Interval multiplier for a difficulty level
pub fn difficulty_factor(difficulty: u8) -> f64 {
    match difficulty {
        0 => 2.5,
        1 => 2.2,
        2 => 1.8,
        3 => 1.3,
        4 => 1.0,
        5 => 0.8,
        _ => 1.0,
    }
}

/// Calculate the next review for a word
///
/// Pure over its inputs: the caller supplies the pace profile and the
/// current time, and is responsible for persisting the result.
pub fn calculate_next_review(
    word: &Word,
    is_correct: bool,
    pace: PaceProfile,
    now: DateTime<Utc>,
) -> ReviewResult {
    let intervals = pace.intervals();

    let mut difficulty = word.difficulty.min(MAX_DIFFICULTY);
    let mut streak = word.streak;
    let mut incorrect_count = word.incorrect_count;

    if is_correct {
        difficulty = (difficulty + 1).min(MAX_DIFFICULTY);
        streak += 1;
    } else {
        difficulty = difficulty.saturating_sub(1).max(1);
        streak = 0;
        incorrect_count += 1;
    }

    let review_count = word.review_count as usize;
    let interval_index = if is_correct {
        review_count.min(intervals.len() - 1)
    } else if incorrect_count > RESTART_AFTER_FAILURES {
        0
    } else {
        review_count.saturating_sub(2).min(intervals.len() - 1)
    };

    let base = f64::from(intervals[interval_index]);
    let mut days = (base * difficulty_factor(difficulty)).round() as u32;

    if !is_correct {
        days = days.clamp(1, MAX_INCORRECT_DAYS);
    }
    // Never schedule for the same instant
    let days = days.max(1);

    ReviewResult {
        next_review_date: now + Duration::days(i64::from(days)),
        difficulty,
        streak,
        incorrect_count,
        interval_index,
        days_until_review: days,
    }
}

/// Format an interval in days to a human-readable string
pub fn format_interval(days: u32) -> String {
    if days == 0 {
        "now".to_string()
    } else if days < 7 {
        format!("{}d", days)
    } else if days < 30 {
        format!("{}w", days / 7)
    } else if days < 365 {
        format!("{}mo", days / 30)
    } else {
        format!("{}y", days / 365)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word_with(review_count: u32, difficulty: u8, incorrect_count: u32) -> Word {
        let mut word = Word::new("cat".to_string(), "猫".to_string(), Utc::now());
        word.review_count = review_count;
        word.difficulty = difficulty;
        word.incorrect_count = incorrect_count;
        word.correct_count = review_count.saturating_sub(incorrect_count);
        word
    }

    #[test]
    fn test_first_review_correct() {
        let now = Utc::now();
        let word = word_with(0, 0, 0);
        let result = calculate_next_review(&word, true, PaceProfile::Standard, now);

        assert_eq!(result.difficulty, 1);
        assert_eq!(result.streak, 1);
        assert_eq!(result.interval_index, 0);
        // 1 day * 2.2 = 2.2 -> 2
        assert_eq!(result.days_until_review, 2);
        assert_eq!(result.next_review_date, now + Duration::days(2));
    }

    #[test]
    fn test_incorrect_steps_back_and_clamps() {
        let now = Utc::now();
        let word = word_with(5, 3, 0);
        let result = calculate_next_review(&word, false, PaceProfile::Standard, now);

        assert_eq!(result.difficulty, 2);
        assert_eq!(result.incorrect_count, 1);
        assert_eq!(result.streak, 0);
        assert_eq!(result.interval_index, 3);
        // 7 * 1.8 = 12.6 -> clamped to 3
        assert_eq!(result.days_until_review, 3);
    }

    #[test]
    fn test_chronic_failures_restart_table() {
        let word = word_with(5, 3, 2);
        let result = calculate_next_review(&word, false, PaceProfile::Standard, Utc::now());

        assert_eq!(result.incorrect_count, 3);
        assert_eq!(result.interval_index, 0);
        // 1 * 1.8 = 1.8 -> 2
        assert_eq!(result.days_until_review, 2);
    }

    #[test]
    fn test_correct_index_caps_at_table_end() {
        let word = word_with(40, 5, 0);
        let result = calculate_next_review(&word, true, PaceProfile::Slow, Utc::now());

        assert_eq!(result.difficulty, 5);
        assert_eq!(result.interval_index, 5);
        // 60 * 0.8 = 48
        assert_eq!(result.days_until_review, 48);
    }

    #[test]
    fn test_incorrect_never_drops_below_difficulty_one() {
        let word = word_with(0, 0, 0);
        let result = calculate_next_review(&word, false, PaceProfile::Standard, Utc::now());

        assert_eq!(result.difficulty, 1);
        assert!(result.days_until_review >= 1);
        assert!(result.days_until_review <= 3);
    }

    #[test]
    fn test_difficulty_bounded_over_random_sequences() {
        let now = Utc::now();
        let mut word = word_with(0, 0, 0);
        // Deterministic mixed sequence of outcomes
        let outcomes = [true, true, false, true, true, true, true, true, false, false, false, true];
        for (i, &correct) in outcomes.iter().cycle().take(60).enumerate() {
            let result = calculate_next_review(&word, correct, PaceProfile::Fast, now);
            assert!(result.difficulty <= 5, "step {}", i);
            assert!(result.days_until_review >= 1, "step {}", i);
            if !correct {
                assert!(result.next_review_date - now <= Duration::days(3), "step {}", i);
            }
            word.difficulty = result.difficulty;
            word.streak = result.streak;
            word.incorrect_count = result.incorrect_count;
            word.review_count += 1;
        }
    }

    #[test]
    fn test_pace_profile_from_setting() {
        assert_eq!(PaceProfile::from_setting(Some("fast")), PaceProfile::Fast);
        assert_eq!(PaceProfile::from_setting(Some("slow")), PaceProfile::Slow);
        assert_eq!(PaceProfile::from_setting(Some("weird")), PaceProfile::Standard);
        assert_eq!(PaceProfile::from_setting(None), PaceProfile::Standard);
        assert_eq!("fast".parse::<PaceProfile>(), Ok(PaceProfile::Fast));
        assert!("turbo".parse::<PaceProfile>().is_err());
    }

    #[test]
    fn test_format_interval() {
        assert_eq!(format_interval(0), "now");
        assert_eq!(format_interval(1), "1d");
        assert_eq!(format_interval(5), "5d");
        assert_eq!(format_interval(14), "2w");
        assert_eq!(format_interval(90), "3mo");
        assert_eq!(format_interval(730), "2y");
    }
}
