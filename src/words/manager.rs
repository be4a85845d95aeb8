//! Word management
//!
//! User-facing operations on the word list: adding and editing entries,
//! bulk import/export of plain word lists, and progress reporting.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::lock_store;
use super::models::{MasteryPrediction, NewWord, Word, WordPatch};
use super::scheduler::{Scheduler, DAILY_GOAL_SETTING, DEFAULT_DAILY_GOAL};
use super::storage::{Result, WordStoreError};
use super::SharedStore;

/// Format version written by `export_words`
pub const WORD_LIST_VERSION: &str = "1.0.0";

const MIN_DAILY_GOAL: u32 = 10;
const MAX_DAILY_GOAL: u32 = 50;
const DAILY_GOAL_STEP: u32 = 5;

/// Outcome of a bulk import
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportSummary {
    pub imported: usize,
    pub skipped: usize,
    pub total: usize,
    pub errors: Vec<String>,
}

/// Snapshot of the learner's progress
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    pub total_words: usize,
    pub mastered_words: usize,
    pub learning_words: usize,
    pub new_words: usize,
    pub today_reviewed: usize,
    pub today_correct: usize,
    /// Average retention over reviewed words, rounded percent
    pub accuracy: u32,
    pub streak: u32,
    pub overdue_words: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Achievement {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
}

const ACHIEVEMENTS: &[(&str, &str, &str)] = &[
    ("beginner", "Beginner", "Added 10 words"),
    ("week_streak", "Week Streak", "Studied 7 days in a row"),
    ("master_20", "Word Master", "Mastered 20 words"),
    ("accuracy_90", "Memory Champion", "Reached 90% accuracy"),
];

/// Item of an imported word list; every field is optional so that one bad
/// entry can be reported without failing the whole file
#[derive(Debug, Default, Deserialize)]
struct ImportItem {
    #[serde(default, alias = "englishTerm")]
    english: Option<String>,
    #[serde(default, alias = "translatedTerm")]
    chinese: Option<String>,
    #[serde(default)]
    example: Option<String>,
    #[serde(default)]
    unit: Option<Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportedWord<'a> {
    english: &'a str,
    chinese: &'a str,
    example: &'a str,
    unit: u32,
    review_count: u32,
    difficulty: u8,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportedList<'a> {
    version: &'static str,
    export_date: DateTime<Utc>,
    words: Vec<ExportedWord<'a>>,
}

/// Normalise a loosely typed unit; absent, negative or unparseable → 0
fn parse_unit(value: Option<&Value>) -> u32 {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    parsed
        .filter(|n| *n >= 0)
        .and_then(|n| u32::try_from(n).ok())
        .unwrap_or(0)
}

pub struct WordManager {
    store: SharedStore,
    scheduler: Scheduler,
}

impl WordManager {
    pub fn new(store: SharedStore) -> Self {
        let scheduler = Scheduler::new(store.clone());
        Self { store, scheduler }
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Add a word after trimming its fields
    ///
    /// Fails with a validation error if either term is empty or if a word
    /// with the same source term (ignoring case) already exists.
    pub fn add_word(&self, term: &str, translation: &str, example: &str, unit: Option<i64>) -> Result<i64> {
        let term = term.trim();
        let translation = translation.trim();
        if term.is_empty() || translation.is_empty() {
            return Err(WordStoreError::Validation(
                "Missing required fields: english and chinese".to_string(),
            ));
        }

        let mut store = lock_store(&self.store);
        if store.find_by_term(term)?.is_some() {
            return Err(WordStoreError::Validation("Word already exists".to_string()));
        }

        let unit = unit.filter(|u| *u >= 0).and_then(|u| u32::try_from(u).ok()).unwrap_or(0);
        store.add(NewWord {
            term: term.to_string(),
            translation: translation.to_string(),
            example: example.trim().to_string(),
            unit,
        })
    }

    pub fn update_word(
        &self,
        id: i64,
        term: &str,
        translation: &str,
        example: &str,
        unit: Option<i64>,
    ) -> Result<Word> {
        let patch = WordPatch {
            term: Some(term.trim().to_string()),
            translation: Some(translation.trim().to_string()),
            example: Some(example.trim().to_string()),
            unit: Some(unit.filter(|u| *u >= 0).and_then(|u| u32::try_from(u).ok()).unwrap_or(0)),
            ..Default::default()
        };
        lock_store(&self.store).update(id, &patch)
    }

    pub fn delete_word(&self, id: i64) -> Result<()> {
        lock_store(&self.store).delete(id)
    }

    /// Remove every word, setting and statistic
    pub fn clear_all_data(&self) -> Result<()> {
        lock_store(&self.store).clear_all()?;
        log::info!("Cleared all local data");
        Ok(())
    }

    /// Mastery estimate for one word
    pub fn mastery(&self, id: i64) -> Result<MasteryPrediction> {
        self.mastery_at(id, Utc::now())
    }

    pub fn mastery_at(&self, id: i64, now: DateTime<Utc>) -> Result<MasteryPrediction> {
        let word = lock_store(&self.store).get(id)?.ok_or(WordStoreError::NotFound(id))?;
        Ok(Scheduler::predict_mastery(&word, now))
    }

    /// All words, or those matching `query` when it is non-empty
    pub fn list_words(&self, query: Option<&str>) -> Result<Vec<Word>> {
        let store = lock_store(&self.store);
        match query.map(str::trim).filter(|q| !q.is_empty()) {
            Some(q) => store.search(q),
            None => store.get_all(),
        }
    }

    pub fn get_word(&self, id: i64) -> Result<Option<Word>> {
        lock_store(&self.store).get(id)
    }

    pub fn words_by_unit(&self, unit: u32) -> Result<Vec<Word>> {
        lock_store(&self.store).get_words_by_unit(unit)
    }

    pub fn units(&self) -> Result<Vec<u32>> {
        lock_store(&self.store).get_all_units()
    }

    /// Import a word list
    ///
    /// Accepts either a JSON array of words or an object with a `words`
    /// array. Entries are added one by one; duplicates are skipped silently
    /// and malformed entries are reported in `errors`.
    pub fn import_words(&self, json: &str) -> Result<ImportSummary> {
        let data: Value = serde_json::from_str(json)
            .map_err(|_| WordStoreError::Validation("Invalid JSON format".to_string()))?;

        let items = match data {
            Value::Array(items) => items,
            Value::Object(mut map) => match map.remove("words") {
                Some(Value::Array(items)) => items,
                _ => return Err(shape_error()),
            },
            _ => return Err(shape_error()),
        };

        let mut summary = ImportSummary {
            total: items.len(),
            ..Default::default()
        };

        for raw in items {
            let item: ImportItem = match serde_json::from_value(raw.clone()) {
                Ok(item) => item,
                Err(e) => {
                    summary.errors.push(format!("Invalid entry {}: {}", raw, e));
                    summary.skipped += 1;
                    continue;
                }
            };

            let (Some(english), Some(chinese)) = (
                item.english.as_deref().filter(|s| !s.trim().is_empty()),
                item.chinese.as_deref().filter(|s| !s.trim().is_empty()),
            ) else {
                summary.errors.push(format!("Missing required fields: {}", raw));
                summary.skipped += 1;
                continue;
            };

            if lock_store(&self.store).find_by_term(english)?.is_some() {
                summary.skipped += 1;
                continue;
            }

            let unit = i64::from(parse_unit(item.unit.as_ref()));
            match self.add_word(english, chinese, item.example.as_deref().unwrap_or(""), Some(unit)) {
                Ok(_) => summary.imported += 1,
                Err(e) => {
                    log::warn!("Skipping imported word '{}': {}", english, e);
                    summary.errors.push(format!("Error importing \"{}\": {}", english, e));
                    summary.skipped += 1;
                }
            }
        }

        log::info!(
            "Imported {} of {} words ({} skipped)",
            summary.imported,
            summary.total,
            summary.skipped
        );
        Ok(summary)
    }

    /// Export the word list as pretty-printed JSON
    pub fn export_words(&self) -> Result<String> {
        let words = lock_store(&self.store).get_all()?;
        let list = ExportedList {
            version: WORD_LIST_VERSION,
            export_date: Utc::now(),
            words: words
                .iter()
                .map(|w| ExportedWord {
                    english: &w.term,
                    chinese: &w.translation,
                    example: &w.example,
                    unit: w.unit,
                    review_count: w.review_count,
                    difficulty: w.difficulty,
                    created_at: w.created_at,
                })
                .collect(),
        };
        Ok(serde_json::to_string_pretty(&list)?)
    }

    pub fn progress(&self) -> Result<Progress> {
        self.progress_at(Utc::now())
    }

    pub fn progress_at(&self, now: DateTime<Utc>) -> Result<Progress> {
        let stats = self.scheduler.get_learning_stats_at(now)?;
        let today = now.date_naive();

        let (events, streak) = {
            let store = lock_store(&self.store);
            (store.get_statistics_by_date(today)?, store.study_streak(today)?)
        };
        let reviews: Vec<_> = events.iter().filter_map(|e| e.as_review()).collect();

        Ok(Progress {
            total_words: stats.total_words,
            mastered_words: stats.mastered,
            learning_words: stats.learning,
            new_words: stats.new_words,
            today_reviewed: reviews.len(),
            today_correct: reviews.iter().filter(|r| r.correct).count(),
            accuracy: stats.average_retention,
            streak,
            overdue_words: stats.overdue_words,
        })
    }

    /// Suggest a daily goal from today's performance
    pub fn suggested_daily_goal(&self) -> Result<u32> {
        let progress = self.progress()?;
        let goal = lock_store(&self.store).get_setting_u32(DAILY_GOAL_SETTING, DEFAULT_DAILY_GOAL)?;
        Ok(suggest_goal(&progress, goal))
    }

    /// Achievements unlocked by the current progress
    pub fn achievements(&self) -> Result<Vec<Achievement>> {
        Ok(unlocked_achievements(&self.progress()?))
    }
}

fn shape_error() -> WordStoreError {
    WordStoreError::Validation(
        "Data must be an array of words or an object with a words array".to_string(),
    )
}

fn suggest_goal(progress: &Progress, goal: u32) -> u32 {
    let reviewed = progress.today_reviewed as f64;
    if progress.accuracy > 80 && reviewed >= f64::from(goal) {
        (goal + DAILY_GOAL_STEP).min(MAX_DAILY_GOAL)
    } else if progress.accuracy < 60 || reviewed < f64::from(goal) * 0.5 {
        goal.saturating_sub(DAILY_GOAL_STEP).max(MIN_DAILY_GOAL)
    } else {
        goal
    }
}

fn unlocked_achievements(progress: &Progress) -> Vec<Achievement> {
    let unlocked = [
        progress.total_words >= 10,
        progress.streak >= 7,
        progress.mastered_words >= 20,
        progress.accuracy >= 90,
    ];

    ACHIEVEMENTS
        .iter()
        .zip(unlocked)
        .filter(|(_, ok)| *ok)
        .map(|(&(id, name, description), _)| Achievement { id, name, description })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use serde_json::json;

    use super::*;
    use crate::words::storage::SqliteWordStore;

    fn create_manager() -> WordManager {
        let store: SharedStore = Arc::new(Mutex::new(SqliteWordStore::open_in_memory().unwrap()));
        WordManager::new(store)
    }

    #[test]
    fn test_add_word_trims_and_defaults_unit() {
        let manager = create_manager();
        let id = manager.add_word("  apple ", " 苹果 ", "", Some(-3)).unwrap();

        let word = manager.get_word(id).unwrap().unwrap();
        assert_eq!(word.term, "apple");
        assert_eq!(word.translation, "苹果");
        assert_eq!(word.unit, 0);
    }

    #[test]
    fn test_add_word_rejects_duplicates_and_blanks() {
        let manager = create_manager();
        manager.add_word("Apple", "苹果", "", None).unwrap();

        let err = manager.add_word("apple", "苹果", "", None).unwrap_err();
        assert_eq!(err.to_string(), "Word already exists");
        assert!(matches!(
            manager.add_word("", "空", "", None),
            Err(WordStoreError::Validation(_))
        ));
    }

    #[test]
    fn test_update_and_list() {
        let manager = create_manager();
        let id = manager.add_word("dog", "狗", "", Some(1)).unwrap();
        manager.add_word("cat", "猫", "", Some(2)).unwrap();

        let word = manager.update_word(id, "dog", "犬", "Good dog.", Some(2)).unwrap();
        assert_eq!(word.translation, "犬");
        assert_eq!(word.example, "Good dog.");

        assert_eq!(manager.list_words(None).unwrap().len(), 2);
        assert_eq!(manager.list_words(Some("  ")).unwrap().len(), 2);
        assert_eq!(manager.list_words(Some("DO")).unwrap().len(), 1);
        assert_eq!(manager.words_by_unit(2).unwrap().len(), 2);
        assert_eq!(manager.units().unwrap(), vec![2]);

        manager.delete_word(id).unwrap();
        assert!(manager.get_word(id).unwrap().is_none());
    }

    #[test]
    fn test_clear_all_data() {
        let manager = create_manager();
        manager.add_word("dog", "狗", "", None).unwrap();
        lock_store(&manager.store).set_setting("dailyGoal", json!(5)).unwrap();

        manager.clear_all_data().unwrap();
        assert!(manager.list_words(None).unwrap().is_empty());
        assert_eq!(manager.scheduler().daily_goal().unwrap(), DEFAULT_DAILY_GOAL);
    }

    #[test]
    fn test_mastery_for_word() {
        let manager = create_manager();
        let id = manager.add_word("dog", "狗", "", None).unwrap();

        let prediction = manager.mastery(id).unwrap();
        assert!(!prediction.mastered);
        assert!(prediction.days_remaining > 0);
        assert!(matches!(manager.mastery(99), Err(WordStoreError::NotFound(99))));
    }

    #[test]
    fn test_import_words_reports_per_item() {
        let manager = create_manager();
        manager.add_word("apple", "苹果", "", None).unwrap();

        let data = json!({
            "words": [
                {"english": "APPLE", "chinese": "苹果"},
                {"english": "pear", "chinese": "梨", "unit": "3"},
                {"english": "plum"},
                {"english": "fig", "chinese": "无花果", "unit": -1, "example": "Dried figs."},
                42
            ]
        })
        .to_string();

        let summary = manager.import_words(&data).unwrap();
        assert_eq!(summary.total, 5);
        assert_eq!(summary.imported, 2);
        assert_eq!(summary.skipped, 3);
        assert_eq!(summary.errors.len(), 2);

        let pear = lock_store(&manager.store).find_by_term("pear").unwrap().unwrap();
        assert_eq!(pear.unit, 3);
        let fig = lock_store(&manager.store).find_by_term("fig").unwrap().unwrap();
        assert_eq!(fig.unit, 0);
        assert_eq!(fig.example, "Dried figs.");
    }

    #[test]
    fn test_import_words_accepts_bare_array() {
        let manager = create_manager();
        let summary = manager
            .import_words(r#"[{"english": "one", "chinese": "一"}]"#)
            .unwrap();
        assert_eq!(summary.imported, 1);
    }

    #[test]
    fn test_import_words_rejects_bad_shape() {
        let manager = create_manager();
        assert!(matches!(
            manager.import_words("not json"),
            Err(WordStoreError::Validation(msg)) if msg == "Invalid JSON format"
        ));
        assert!(matches!(
            manager.import_words(r#"{"items": []}"#),
            Err(WordStoreError::Validation(_))
        ));
    }

    #[test]
    fn test_export_words() {
        let manager = create_manager();
        manager.add_word("sun", "太阳", "The sun rises.", Some(4)).unwrap();

        let exported: Value = serde_json::from_str(&manager.export_words().unwrap()).unwrap();
        assert_eq!(exported["version"], "1.0.0");
        assert!(exported["exportDate"].is_string());
        let word = &exported["words"][0];
        assert_eq!(word["english"], "sun");
        assert_eq!(word["chinese"], "太阳");
        assert_eq!(word["unit"], 4);
        assert_eq!(word["reviewCount"], 0);
        assert!(word.get("id").is_none());

        // An exported list imports cleanly into an empty store
        let other = create_manager();
        let summary = other.import_words(&manager.export_words().unwrap()).unwrap();
        assert_eq!(summary.imported, 1);
    }

    #[test]
    fn test_progress_counts_today_reviews() {
        let manager = create_manager();
        let a = manager.add_word("a", "甲", "", None).unwrap();
        let b = manager.add_word("b", "乙", "", None).unwrap();
        manager.add_word("c", "丙", "", None).unwrap();

        manager.scheduler().review_word(a, true).unwrap();
        manager.scheduler().review_word(b, false).unwrap();

        let progress = manager.progress().unwrap();
        assert_eq!(progress.total_words, 3);
        assert_eq!(progress.new_words, 1);
        assert_eq!(progress.learning_words, 2);
        assert_eq!(progress.today_reviewed, 2);
        assert_eq!(progress.today_correct, 1);
        assert_eq!(progress.accuracy, 50);
        assert_eq!(progress.streak, 1);
    }

    #[test]
    fn test_suggest_goal() {
        let progress = |accuracy, today_reviewed| Progress {
            accuracy,
            today_reviewed,
            ..Default::default()
        };

        assert_eq!(suggest_goal(&progress(85, 20), 20), 25);
        assert_eq!(suggest_goal(&progress(85, 60), 50), 50);
        assert_eq!(suggest_goal(&progress(50, 20), 20), 15);
        assert_eq!(suggest_goal(&progress(70, 4), 12), 10);
        assert_eq!(suggest_goal(&progress(70, 15), 20), 20);
    }

    #[test]
    fn test_suggested_daily_goal_uses_setting() {
        let manager = create_manager();
        lock_store(&manager.store)
            .set_setting(DAILY_GOAL_SETTING, json!(30))
            .unwrap();
        // Nothing reviewed today, so the goal comes down
        assert_eq!(manager.suggested_daily_goal().unwrap(), 25);
    }

    #[test]
    fn test_achievements() {
        let none = unlocked_achievements(&Progress::default());
        assert!(none.is_empty());

        let progress = Progress {
            total_words: 12,
            streak: 7,
            accuracy: 95,
            ..Default::default()
        };
        let ids: Vec<_> = unlocked_achievements(&progress).iter().map(|a| a.id).collect();
        assert_eq!(ids, vec!["beginner", "week_streak", "accuracy_90"]);
    }
}
