use std::io::{self, Write};

use anyhow::{Context, Result};
use chrono::Utc;

use crate::app::App;
use crate::render::terminal::{due_label, paint, status_label, word_table, Color};
use crate::OutputFormat;

/// Fields given to `edit`; `None` keeps the current value
pub struct Changes {
    pub english: Option<String>,
    pub chinese: Option<String>,
    pub example: Option<String>,
    pub unit: Option<i64>,
}

pub fn run_add(
    app: &App,
    english: &str,
    chinese: &str,
    example: &str,
    unit: Option<i64>,
    format: &OutputFormat,
) -> Result<()> {
    let id = app
        .lexis
        .words
        .add_word(english, chinese, example, unit)
        .context("Failed to add word")?;
    let word = app.get_word(id)?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&word)?),
        OutputFormat::Plain => println!("Added '{}' ({}) with id {}", word.term, word.translation, id),
    }
    Ok(())
}

pub fn run_edit(app: &App, id: i64, changes: Changes, format: &OutputFormat) -> Result<()> {
    let current = app.get_word(id)?;
    let word = app
        .lexis
        .words
        .update_word(
            id,
            changes.english.as_deref().unwrap_or(&current.term),
            changes.chinese.as_deref().unwrap_or(&current.translation),
            changes.example.as_deref().unwrap_or(&current.example),
            Some(changes.unit.unwrap_or(i64::from(current.unit))),
        )
        .context("Failed to update word")?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&word)?),
        OutputFormat::Plain => println!("Updated {}: {} = {}", word.id, word.term, word.translation),
    }
    Ok(())
}

pub fn run_rm(app: &App, id: i64) -> Result<()> {
    let word = app.get_word(id)?;
    app.lexis.words.delete_word(id).context("Failed to delete word")?;
    println!("Deleted '{}'", word.term);
    Ok(())
}

pub fn run_show(app: &App, id: i64, format: &OutputFormat, use_color: bool) -> Result<()> {
    let word = app.get_word(id)?;
    let mastery = app.lexis.words.mastery(id).context("Failed to estimate mastery")?;

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({ "word": word, "mastery": mastery });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            println!("{} = {}", paint(&word.term, Color::BOLD, use_color), word.translation);
            if !word.example.is_empty() {
                println!("  {}", paint(&word.example, Color::DIM, use_color));
            }
            println!("Unit:       {}", word.unit);
            println!("Status:     {}", status_label(word.status(), use_color));
            println!("Next:       {}", due_label(&word, Utc::now()));
            println!(
                "Reviews:    {} ({} correct, {}% retention)",
                word.review_count,
                word.correct_count,
                word.retention()
            );
            match mastery.estimated_date {
                _ if mastery.mastered => println!("Mastery:    mastered"),
                Some(date) => println!(
                    "Mastery:    ~{} days (around {})",
                    mastery.days_remaining,
                    date.format("%Y-%m-%d")
                ),
                None => println!("Mastery:    ~{} days", mastery.days_remaining),
            }
        }
    }
    Ok(())
}

pub fn run_clear(app: &App, yes: bool) -> Result<()> {
    if !yes {
        print!("Delete all words, settings and statistics? This cannot be undone. [y/N] ");
        io::stdout().flush()?;
        let mut reply = String::new();
        io::stdin().read_line(&mut reply)?;
        if !matches!(reply.trim().to_lowercase().as_str(), "y" | "yes") {
            println!("Aborted.");
            return Ok(());
        }
    }
    app.lexis.words.clear_all_data().context("Failed to clear data")?;
    println!("All data cleared.");
    Ok(())
}

pub fn run_list(
    app: &App,
    query: Option<&str>,
    unit: Option<u32>,
    format: &OutputFormat,
    use_color: bool,
) -> Result<()> {
    let mut words = app.lexis.words.list_words(query).context("Failed to list words")?;
    if let Some(unit) = unit {
        words.retain(|w| w.unit == unit);
    }

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&words)?),
        OutputFormat::Plain => {
            if words.is_empty() {
                println!("No words found.");
                return Ok(());
            }
            println!("{}", word_table(&words, use_color));
            println!("\n{} words", words.len());
        }
    }
    Ok(())
}

pub fn run_units(app: &App, format: &OutputFormat) -> Result<()> {
    let units = app.lexis.words.units().context("Failed to list units")?;
    let mut counts = Vec::with_capacity(units.len());
    for unit in units {
        counts.push((unit, app.lexis.words.words_by_unit(unit)?.len()));
    }

    match format {
        OutputFormat::Json => {
            let output: Vec<serde_json::Value> = counts
                .iter()
                .map(|(unit, count)| serde_json::json!({ "unit": unit, "count": count }))
                .collect();
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            if counts.is_empty() {
                println!("No units yet.");
                return Ok(());
            }
            println!("Unit  Words");
            for (unit, count) in &counts {
                println!("{:>4}  {}", unit, count);
            }
        }
    }
    Ok(())
}
