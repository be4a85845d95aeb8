use chrono::{DateTime, Utc};

use lexis_lib::words::{algorithm::format_interval, Word, WordStatus};

/// ANSI color codes
pub struct Color;

impl Color {
    pub const RESET: &str = "\x1b[0m";
    pub const BOLD: &str = "\x1b[1m";
    pub const DIM: &str = "\x1b[2m";
    pub const RED: &str = "\x1b[31m";
    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const BLUE: &str = "\x1b[34m";
    pub const CYAN: &str = "\x1b[36m";
}

/// Wrap text in a color when colors are enabled
pub fn paint(text: &str, color: &str, use_color: bool) -> String {
    if use_color {
        format!("{}{}{}", color, text, Color::RESET)
    } else {
        text.to_string()
    }
}

pub fn status_label(status: WordStatus, use_color: bool) -> String {
    let (label, color) = match status {
        WordStatus::New => ("new", Color::BLUE),
        WordStatus::Learning => ("learning", Color::YELLOW),
        WordStatus::Reviewing => ("reviewing", Color::CYAN),
        WordStatus::Mastered => ("mastered", Color::GREEN),
    };
    // Pad before coloring so escape codes don't break alignment
    paint(&format!("{:<9}", label), color, use_color)
}

/// When a word is next due, relative to `now`
pub fn due_label(word: &Word, now: DateTime<Utc>) -> String {
    if word.is_due(now) {
        return "due".to_string();
    }
    let days = (word.next_review_date - now).num_hours().div_euclid(24).max(0) as u32;
    if days == 0 {
        "today".to_string()
    } else {
        format!("in {}", format_interval(days))
    }
}

/// Render words as an aligned table
pub fn word_table(words: &[Word], use_color: bool) -> String {
    let now = Utc::now();
    let term_width = words.iter().map(|w| w.term.chars().count()).max().unwrap_or(4).max(4);
    let translation_width = words
        .iter()
        .map(|w| w.translation.chars().count())
        .max()
        .unwrap_or(11)
        .max(11);

    let mut lines = Vec::with_capacity(words.len() + 2);
    let header = format!(
        "{:>5} {:<tw$} {:<lw$} {:>4} {:<9} Due",
        "ID",
        "Term",
        "Translation",
        "Unit",
        "Status",
        tw = term_width,
        lw = translation_width
    );
    lines.push(paint(&header, Color::BOLD, use_color));
    lines.push("\u{2500}".repeat(header.chars().count() + 6));

    for word in words {
        let due = due_label(word, now);
        let due = if due == "due" {
            paint(&due, Color::RED, use_color)
        } else {
            paint(&due, Color::DIM, use_color)
        };
        lines.push(format!(
            "{:>5} {:<tw$} {:<lw$} {:>4} {} {}",
            word.id,
            word.term,
            word.translation,
            word.unit,
            status_label(word.status(), use_color),
            due,
            tw = term_width,
            lw = translation_width
        ));
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn test_due_label() {
        let now = Utc::now();
        let mut word = Word::new("w".to_string(), "t".to_string(), now - Duration::days(1));
        assert_eq!(due_label(&word, now), "due");

        word.next_review_date = now + Duration::hours(3);
        assert_eq!(due_label(&word, now), "today");

        word.next_review_date = now + Duration::days(3) + Duration::minutes(1);
        assert_eq!(due_label(&word, now), "in 3d");
    }

    #[test]
    fn test_table_without_color() {
        let words = vec![Word::new("apple".to_string(), "苹果".to_string(), Utc::now())];
        let table = word_table(&words, false);
        assert!(!table.contains('\x1b'));
        assert!(table.lines().nth(2).unwrap().contains("apple"));
    }
}
