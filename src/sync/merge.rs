//! Merging of local and remote datasets
//!
//! Words are matched by their lower-cased source term. When both sides have
//! the same word the record with more reviews wins as a whole; on equal
//! review counts the more recently reviewed one wins, and remote is kept on a
//! full tie.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::words::{Dataset, Word, DATASET_VERSION};

fn local_wins(local: &Word, remote: &Word) -> bool {
    if local.review_count != remote.review_count {
        return local.review_count > remote.review_count;
    }
    match (local.last_reviewed_at, remote.last_reviewed_at) {
        (Some(l), Some(r)) => l > r,
        (Some(_), None) => true,
        (None, _) => false,
    }
}

/// Merge two datasets into a new one stamped with `now`
pub fn merge_data(local: &Dataset, remote: &Dataset, now: DateTime<Utc>) -> Dataset {
    let mut words: Vec<Word> = Vec::with_capacity(local.words.len().max(remote.words.len()));
    let mut index: HashMap<String, usize> = HashMap::new();

    for word in &remote.words {
        match index.get(&word.key()) {
            Some(&i) => words[i] = word.clone(),
            None => {
                index.insert(word.key(), words.len());
                words.push(word.clone());
            }
        }
    }

    let mut local_preferred = 0;
    for word in &local.words {
        match index.get(&word.key()) {
            Some(&i) => {
                if local_wins(word, &words[i]) {
                    words[i] = word.clone();
                    local_preferred += 1;
                }
            }
            None => {
                index.insert(word.key(), words.len());
                words.push(word.clone());
            }
        }
    }

    let mut settings = remote.settings.clone();
    settings.extend(local.settings.iter().map(|(k, v)| (k.clone(), v.clone())));

    let version = [local.version, remote.version]
        .into_iter()
        .find(|v| *v != 0)
        .unwrap_or(DATASET_VERSION);

    log::debug!(
        "Merged {} local and {} remote words into {} ({} local records preferred)",
        local.words.len(),
        remote.words.len(),
        words.len(),
        local_preferred
    );

    Dataset {
        version,
        export_date: now,
        words,
        settings,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::Duration;
    use serde_json::json;

    use super::*;

    fn word(term: &str, review_count: u32, last_reviewed: Option<DateTime<Utc>>) -> Word {
        let mut w = Word::new(term.to_string(), format!("{}-t", term), Utc::now());
        w.review_count = review_count;
        w.correct_count = review_count;
        w.last_reviewed_at = last_reviewed;
        w
    }

    fn dataset(words: Vec<Word>) -> Dataset {
        Dataset {
            version: 1,
            export_date: Utc::now(),
            words,
            settings: BTreeMap::new(),
        }
    }

    fn find<'a>(dataset: &'a Dataset, term: &str) -> &'a Word {
        dataset
            .words
            .iter()
            .find(|w| w.key() == term.to_lowercase())
            .unwrap()
    }

    #[test]
    fn test_more_reviews_wins() {
        let local = dataset(vec![word("cat", 10, None)]);
        let remote = dataset(vec![word("cat", 2, Some(Utc::now()))]);

        let merged = merge_data(&local, &remote, Utc::now());
        assert_eq!(merged.words.len(), 1);
        assert_eq!(merged.words[0].review_count, 10);

        let merged = merge_data(&remote, &local, Utc::now());
        assert_eq!(merged.words[0].review_count, 10);
    }

    #[test]
    fn test_union_is_case_insensitive() {
        let local = dataset(vec![word("Apple", 1, None), word("pear", 0, None)]);
        let remote = dataset(vec![word("apple", 1, None), word("plum", 3, None)]);

        let merged = merge_data(&local, &remote, Utc::now());
        let mut keys: Vec<String> = merged.words.iter().map(|w| w.key()).collect();
        keys.sort();
        assert_eq!(keys, vec!["apple", "pear", "plum"]);
    }

    #[test]
    fn test_tie_broken_by_last_review() {
        let now = Utc::now();
        let earlier = now - Duration::days(1);

        let mut local_word = word("dog", 3, Some(now));
        local_word.translation = "local".to_string();
        let mut remote_word = word("dog", 3, Some(earlier));
        remote_word.translation = "remote".to_string();

        let merged = merge_data(&dataset(vec![local_word.clone()]), &dataset(vec![remote_word.clone()]), now);
        assert_eq!(find(&merged, "dog").translation, "local");

        // Missing timestamp loses
        local_word.last_reviewed_at = None;
        let merged = merge_data(&dataset(vec![local_word.clone()]), &dataset(vec![remote_word.clone()]), now);
        assert_eq!(find(&merged, "dog").translation, "remote");

        remote_word.last_reviewed_at = None;
        local_word.last_reviewed_at = Some(earlier);
        let merged = merge_data(&dataset(vec![local_word.clone()]), &dataset(vec![remote_word.clone()]), now);
        assert_eq!(find(&merged, "dog").translation, "local");

        // Full tie keeps remote
        local_word.last_reviewed_at = remote_word.last_reviewed_at;
        let merged = merge_data(&dataset(vec![local_word]), &dataset(vec![remote_word]), now);
        assert_eq!(find(&merged, "dog").translation, "remote");
    }

    #[test]
    fn test_whole_record_replaced() {
        let mut local_word = word("sun", 5, None);
        local_word.example = "local example".to_string();
        local_word.unit = 2;
        let mut remote_word = word("sun", 1, None);
        remote_word.example = "remote example".to_string();
        remote_word.unit = 7;

        let merged = merge_data(&dataset(vec![local_word.clone()]), &dataset(vec![remote_word]), Utc::now());
        assert_eq!(find(&merged, "sun"), &local_word);
    }

    #[test]
    fn test_settings_local_overrides() {
        let mut local = dataset(vec![]);
        local.settings.insert("dailyGoal".to_string(), json!(30));
        let mut remote = dataset(vec![]);
        remote.settings.insert("dailyGoal".to_string(), json!(20));
        remote.settings.insert("reviewInterval".to_string(), json!("fast"));

        let merged = merge_data(&local, &remote, Utc::now());
        assert_eq!(merged.settings["dailyGoal"], json!(30));
        assert_eq!(merged.settings["reviewInterval"], json!("fast"));
    }

    #[test]
    fn test_version_and_export_date() {
        let now = Utc::now();
        let mut local = dataset(vec![]);
        let mut remote = dataset(vec![]);

        local.version = 0;
        remote.version = 3;
        let merged = merge_data(&local, &remote, now);
        assert_eq!(merged.version, 3);
        assert_eq!(merged.export_date, now);

        remote.version = 0;
        assert_eq!(merge_data(&local, &remote, now).version, 1);

        local.version = 2;
        assert_eq!(merge_data(&local, &remote, now).version, 2);
    }

    #[test]
    fn test_empty_inputs() {
        let merged = merge_data(&dataset(vec![]), &dataset(vec![]), Utc::now());
        assert!(merged.words.is_empty());
    }
}
