//! Persistent storage for words, settings and statistics
//!
//! Backed by a single SQLite database:
//! ```text
//! words       -- one row per vocabulary entry, id never reused
//! settings    -- key -> JSON value
//! statistics  -- append-only review/session events
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde_json::Value;
use thiserror::Error;

use super::models::*;

/// Dataset format version written by `export_snapshot`
pub const DATASET_VERSION: u32 = 1;

/// Settings that belong to this device and never travel inside a snapshot
pub const DEVICE_LOCAL_SETTINGS: &[&str] = &[
    "github_token",
    "github_owner",
    "github_repo",
    "github_branch",
    "last_sync_time",
    "last_sync_sha",
];

#[derive(Error, Debug)]
pub enum WordStoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Word not found: {0}")]
    NotFound(i64),

    #[error("{0}")]
    Validation(String),
}

pub type Result<T> = std::result::Result<T, WordStoreError>;

pub fn is_device_local(key: &str) -> bool {
    DEVICE_LOCAL_SETTINGS.contains(&key)
}

/// Capability interface over the word database
pub trait WordStore: Send {
    /// Get a word, `None` if the id is unknown
    fn get(&self, id: i64) -> Result<Option<Word>>;

    fn get_all(&self) -> Result<Vec<Word>>;

    /// Add a word with fresh review state, returning its id
    fn add(&mut self, word: NewWord) -> Result<i64>;

    /// Apply a partial update, returning the updated word
    fn update(&mut self, id: i64, patch: &WordPatch) -> Result<Word>;

    fn delete(&mut self, id: i64) -> Result<()>;

    /// Case-insensitive match on the source term, substring match on the translation
    fn search(&self, query: &str) -> Result<Vec<Word>>;

    /// Words with `next_review_date <= now`, earliest first
    fn get_due_for_review(&self, limit: usize, now: DateTime<Utc>) -> Result<Vec<Word>>;

    /// Words that have never been reviewed, in creation order
    fn get_never_reviewed(&self, limit: usize) -> Result<Vec<Word>>;

    fn get_words_by_unit(&self, unit: u32) -> Result<Vec<Word>>;

    /// Distinct units in ascending order
    fn get_all_units(&self) -> Result<Vec<u32>>;

    fn get_setting(&self, key: &str) -> Result<Option<Value>>;

    fn set_setting(&mut self, key: &str, value: Value) -> Result<()>;

    fn all_settings(&self) -> Result<BTreeMap<String, Value>>;

    /// Append a statistic event stamped with the given time
    fn append_statistic_at(&mut self, event: StatisticEvent, at: DateTime<Utc>) -> Result<i64>;

    fn get_statistics_by_date(&self, date: NaiveDate) -> Result<Vec<StatisticRecord>>;

    /// Events with `start <= date <= end`
    fn get_statistics_between(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<StatisticRecord>>;

    /// Distinct dates with at least one event, newest first
    fn statistic_dates(&self) -> Result<Vec<NaiveDate>>;

    fn export_snapshot(&self) -> Result<Dataset>;

    /// Replace all words and shared settings with the snapshot contents
    fn import_snapshot(&mut self, dataset: &Dataset) -> Result<usize>;

    fn clear_all(&mut self) -> Result<()>;

    fn append_statistic(&mut self, event: StatisticEvent) -> Result<i64> {
        self.append_statistic_at(event, Utc::now())
    }

    fn get_setting_str(&self, key: &str) -> Result<Option<String>> {
        Ok(self.get_setting(key)?.and_then(|v| match v {
            Value::String(s) => Some(s),
            Value::Null => None,
            other => Some(other.to_string()),
        }))
    }

    fn get_setting_u32(&self, key: &str, default: u32) -> Result<u32> {
        Ok(self
            .get_setting(key)?
            .and_then(|v| match v {
                Value::Number(n) => n.as_u64(),
                Value::String(s) => s.trim().parse().ok(),
                _ => None,
            })
            .and_then(|n| u32::try_from(n).ok())
            .unwrap_or(default))
    }

    /// Find a word whose source term matches case-insensitively
    fn find_by_term(&self, term: &str) -> Result<Option<Word>> {
        let key = term.trim().to_lowercase();
        Ok(self.search(term.trim())?.into_iter().find(|w| w.key() == key))
    }

    /// Consecutive days, ending `today`, with at least one recorded event
    fn study_streak(&self, today: NaiveDate) -> Result<u32> {
        let mut streak = 0;
        let mut expected = today;
        for date in self.statistic_dates()? {
            if date == expected {
                streak += 1;
                expected -= Duration::days(1);
            } else {
                break;
            }
        }
        Ok(streak)
    }
}

/// SQLite-backed word store
pub struct SqliteWordStore {
    conn: Connection,
}

const WORD_COLUMNS: &str = "id, term, translation, example, unit, created_at, last_reviewed_at, \
     next_review_date, review_count, correct_count, incorrect_count, difficulty, streak";

impl SqliteWordStore {
    /// Open (or create) the database at the given path
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(db_path)?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS words (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                term TEXT NOT NULL,
                translation TEXT NOT NULL,
                example TEXT NOT NULL DEFAULT '',
                unit INTEGER NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL,
                last_reviewed_at INTEGER,
                next_review_date INTEGER NOT NULL,
                review_count INTEGER NOT NULL DEFAULT 0,
                correct_count INTEGER NOT NULL DEFAULT 0,
                incorrect_count INTEGER NOT NULL DEFAULT 0,
                difficulty INTEGER NOT NULL DEFAULT 0,
                streak INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS statistics (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                date TEXT NOT NULL,
                timestamp INTEGER NOT NULL,
                event TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_words_next_review ON words(next_review_date);
            CREATE INDEX IF NOT EXISTS idx_words_unit ON words(unit);
            CREATE INDEX IF NOT EXISTS idx_statistics_date ON statistics(date);
            "#,
        )?;

        Ok(Self { conn })
    }

    fn query_words(&self, sql: &str, params: impl rusqlite::Params) -> Result<Vec<Word>> {
        let mut stmt = self.conn.prepare(sql)?;
        let words = stmt
            .query_map(params, row_to_word)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(words)
    }

    fn query_statistics(&self, sql: &str, params: impl rusqlite::Params) -> Result<Vec<StatisticRecord>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt
            .query_map(params, |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut records = Vec::with_capacity(rows.len());
        for (id, date, timestamp, event) in rows {
            let Ok(date) = NaiveDate::parse_from_str(&date, "%Y-%m-%d") else {
                log::warn!("Skipping statistic {} with malformed date '{}'", id, date);
                continue;
            };
            records.push(StatisticRecord {
                id,
                date,
                timestamp: millis_to_datetime(timestamp),
                event: serde_json::from_str(&event)?,
            });
        }
        Ok(records)
    }
}

fn millis_to_datetime(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_default()
}

fn row_to_word(row: &Row<'_>) -> rusqlite::Result<Word> {
    Ok(Word {
        id: row.get(0)?,
        term: row.get(1)?,
        translation: row.get(2)?,
        example: row.get(3)?,
        unit: row.get(4)?,
        created_at: millis_to_datetime(row.get(5)?),
        last_reviewed_at: row.get::<_, Option<i64>>(6)?.map(millis_to_datetime),
        next_review_date: millis_to_datetime(row.get(7)?),
        review_count: row.get(8)?,
        correct_count: row.get(9)?,
        incorrect_count: row.get(10)?,
        difficulty: row.get(11)?,
        streak: row.get(12)?,
    })
}

fn insert_word(conn: &Connection, word: &Word) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO words (term, translation, example, unit, created_at, last_reviewed_at, \
         next_review_date, review_count, correct_count, incorrect_count, difficulty, streak) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            word.term,
            word.translation,
            word.example,
            word.unit,
            word.created_at.timestamp_millis(),
            word.last_reviewed_at.map(|t| t.timestamp_millis()),
            word.next_review_date.timestamp_millis(),
            word.review_count,
            word.correct_count,
            word.incorrect_count,
            word.difficulty,
            word.streak,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

fn validate_terms(term: &str, translation: &str) -> Result<()> {
    if term.trim().is_empty() || translation.trim().is_empty() {
        return Err(WordStoreError::Validation(
            "Missing required fields: english and chinese".to_string(),
        ));
    }
    Ok(())
}

/// Check that every word in a snapshot can be imported
pub fn validate_snapshot(dataset: &Dataset) -> Result<()> {
    for word in &dataset.words {
        validate_terms(&word.term, &word.translation).map_err(|_| {
            WordStoreError::Validation(format!(
                "Invalid import data format: word {} is missing english or chinese",
                word.id
            ))
        })?;
    }
    Ok(())
}

/// Restore counter consistency for words coming from an external snapshot
fn normalize_imported(word: &Word) -> Word {
    let mut word = word.clone();
    word.difficulty = word.difficulty.min(MAX_DIFFICULTY);
    word.incorrect_count = word.incorrect_count.min(word.review_count);
    word.correct_count = word.review_count - word.incorrect_count;
    word
}

impl WordStore for SqliteWordStore {
    fn get(&self, id: i64) -> Result<Option<Word>> {
        let word = self
            .conn
            .query_row(
                &format!("SELECT {} FROM words WHERE id = ?1", WORD_COLUMNS),
                params![id],
                row_to_word,
            )
            .optional()?;
        Ok(word)
    }

    fn get_all(&self) -> Result<Vec<Word>> {
        self.query_words(&format!("SELECT {} FROM words ORDER BY id", WORD_COLUMNS), [])
    }

    fn add(&mut self, word: NewWord) -> Result<i64> {
        validate_terms(&word.term, &word.translation)?;

        let mut record = Word::new(word.term, word.translation, Utc::now());
        record.example = word.example;
        record.unit = word.unit;

        let id = insert_word(&self.conn, &record)?;
        log::debug!("Added word {} ('{}')", id, record.term);
        Ok(id)
    }

    fn update(&mut self, id: i64, patch: &WordPatch) -> Result<Word> {
        let mut word = self.get(id)?.ok_or(WordStoreError::NotFound(id))?;
        patch.apply(&mut word);
        validate_terms(&word.term, &word.translation)?;

        self.conn.execute(
            "UPDATE words SET term = ?2, translation = ?3, example = ?4, unit = ?5, \
             last_reviewed_at = ?6, next_review_date = ?7, review_count = ?8, correct_count = ?9, \
             incorrect_count = ?10, difficulty = ?11, streak = ?12 WHERE id = ?1",
            params![
                id,
                word.term,
                word.translation,
                word.example,
                word.unit,
                word.last_reviewed_at.map(|t| t.timestamp_millis()),
                word.next_review_date.timestamp_millis(),
                word.review_count,
                word.correct_count,
                word.incorrect_count,
                word.difficulty,
                word.streak,
            ],
        )?;

        Ok(word)
    }

    fn delete(&mut self, id: i64) -> Result<()> {
        let affected = self.conn.execute("DELETE FROM words WHERE id = ?1", params![id])?;
        if affected == 0 {
            return Err(WordStoreError::NotFound(id));
        }
        Ok(())
    }

    fn search(&self, query: &str) -> Result<Vec<Word>> {
        let query_lower = query.to_lowercase();
        Ok(self
            .get_all()?
            .into_iter()
            .filter(|w| w.term.to_lowercase().contains(&query_lower) || w.translation.contains(query))
            .collect())
    }

    fn get_due_for_review(&self, limit: usize, now: DateTime<Utc>) -> Result<Vec<Word>> {
        self.query_words(
            &format!(
                "SELECT {} FROM words WHERE next_review_date <= ?1 \
                 ORDER BY next_review_date, id LIMIT ?2",
                WORD_COLUMNS
            ),
            params![now.timestamp_millis(), limit as i64],
        )
    }

    fn get_never_reviewed(&self, limit: usize) -> Result<Vec<Word>> {
        self.query_words(
            &format!(
                "SELECT {} FROM words WHERE review_count = 0 ORDER BY id LIMIT ?1",
                WORD_COLUMNS
            ),
            params![limit as i64],
        )
    }

    fn get_words_by_unit(&self, unit: u32) -> Result<Vec<Word>> {
        self.query_words(
            &format!("SELECT {} FROM words WHERE unit = ?1 ORDER BY id", WORD_COLUMNS),
            params![unit],
        )
    }

    fn get_all_units(&self) -> Result<Vec<u32>> {
        let mut stmt = self.conn.prepare("SELECT DISTINCT unit FROM words ORDER BY unit")?;
        let units = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<u32>, _>>()?;
        Ok(units)
    }

    fn get_setting(&self, key: &str) -> Result<Option<Value>> {
        let raw: Option<String> = self
            .conn
            .query_row("SELECT value FROM settings WHERE key = ?1", params![key], |row| row.get(0))
            .optional()?;
        Ok(raw.map(|s| serde_json::from_str(&s)).transpose()?)
    }

    fn set_setting(&mut self, key: &str, value: Value) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO settings (key, value) VALUES (?1, ?2)",
            params![key, serde_json::to_string(&value)?],
        )?;
        Ok(())
    }

    fn all_settings(&self) -> Result<BTreeMap<String, Value>> {
        let mut stmt = self.conn.prepare("SELECT key, value FROM settings")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut settings = BTreeMap::new();
        for (key, raw) in rows {
            settings.insert(key, serde_json::from_str(&raw)?);
        }
        Ok(settings)
    }

    fn append_statistic_at(&mut self, event: StatisticEvent, at: DateTime<Utc>) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO statistics (date, timestamp, event) VALUES (?1, ?2, ?3)",
            params![
                at.date_naive().format("%Y-%m-%d").to_string(),
                at.timestamp_millis(),
                serde_json::to_string(&event)?,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_statistics_by_date(&self, date: NaiveDate) -> Result<Vec<StatisticRecord>> {
        self.query_statistics(
            "SELECT id, date, timestamp, event FROM statistics WHERE date = ?1 ORDER BY id",
            params![date.format("%Y-%m-%d").to_string()],
        )
    }

    fn get_statistics_between(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<StatisticRecord>> {
        self.query_statistics(
            "SELECT id, date, timestamp, event FROM statistics \
             WHERE date >= ?1 AND date <= ?2 ORDER BY date, id",
            params![
                start.format("%Y-%m-%d").to_string(),
                end.format("%Y-%m-%d").to_string()
            ],
        )
    }

    fn statistic_dates(&self) -> Result<Vec<NaiveDate>> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT date FROM statistics ORDER BY date DESC")?;
        let raw = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(raw
            .iter()
            .filter_map(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
            .collect())
    }

    fn export_snapshot(&self) -> Result<Dataset> {
        let mut settings = self.all_settings()?;
        settings.retain(|key, _| !is_device_local(key));

        Ok(Dataset {
            version: DATASET_VERSION,
            export_date: Utc::now(),
            words: self.get_all()?,
            settings,
        })
    }

    fn import_snapshot(&mut self, dataset: &Dataset) -> Result<usize> {
        validate_snapshot(dataset)?;

        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM words", [])?;

        let placeholders = DEVICE_LOCAL_SETTINGS.iter().map(|_| "?").collect::<Vec<_>>().join(", ");
        tx.execute(
            &format!("DELETE FROM settings WHERE key NOT IN ({})", placeholders),
            rusqlite::params_from_iter(DEVICE_LOCAL_SETTINGS.iter()),
        )?;

        for word in &dataset.words {
            insert_word(&tx, &normalize_imported(word))?;
        }
        for (key, value) in &dataset.settings {
            if is_device_local(key) {
                continue;
            }
            tx.execute(
                "INSERT OR REPLACE INTO settings (key, value) VALUES (?1, ?2)",
                params![key, serde_json::to_string(value)?],
            )?;
        }
        tx.commit()?;

        log::info!(
            "Imported snapshot: {} words, {} settings",
            dataset.words.len(),
            dataset.settings.len()
        );
        Ok(dataset.words.len())
    }

    fn clear_all(&mut self) -> Result<()> {
        self.conn.execute_batch(
            "DELETE FROM words; DELETE FROM settings; DELETE FROM statistics;",
        )?;
        Ok(())
    }
}
