use anyhow::{Context, Result};

use crate::app::App;
use crate::render::terminal::{paint, Color};
use crate::OutputFormat;

pub fn run_stats(app: &App, format: &OutputFormat) -> Result<()> {
    let scheduler = app.lexis.scheduler();
    let stats = scheduler.get_learning_stats().context("Failed to compute statistics")?;
    let advice = scheduler.optimize_schedule().context("Failed to check schedule")?;

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({ "stats": stats, "schedule": advice });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            println!("Total words:    {}", stats.total_words);
            println!("  New:          {}", stats.new_words);
            println!("  Learning:     {}", stats.learning);
            println!("  Reviewing:    {}", stats.reviewing);
            println!("  Mastered:     {}", stats.mastered);
            println!("Overdue:        {}", stats.overdue_words);
            println!("Avg retention:  {}%", stats.average_retention);
            println!();
            println!("{}", advice.message);
        }
    }
    Ok(())
}

pub fn run_schedule(app: &App, days: u32, format: &OutputFormat, use_color: bool) -> Result<()> {
    let schedule = app
        .lexis
        .scheduler()
        .get_upcoming_schedule(days)
        .context("Failed to compute schedule")?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&schedule)?),
        OutputFormat::Plain => {
            let widest = schedule.iter().map(|d| d.count).max().unwrap_or(0).max(1);
            for day in &schedule {
                let bar_len = (day.count * 30).div_ceil(widest);
                let bar = paint(&"\u{2588}".repeat(bar_len), Color::CYAN, use_color);
                println!("{}  {:>4}  {}", day.date.format("%a %Y-%m-%d"), day.count, bar);
            }
        }
    }
    Ok(())
}

pub fn run_progress(app: &App, format: &OutputFormat) -> Result<()> {
    let progress = app.lexis.words.progress().context("Failed to compute progress")?;
    let goal = app.lexis.scheduler().daily_goal()?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&progress)?),
        OutputFormat::Plain => {
            println!(
                "Today: {}/{} reviewed, {} correct",
                progress.today_reviewed, goal, progress.today_correct
            );
            println!("Streak: {} days", progress.streak);
            println!(
                "Words: {} total, {} mastered, {} learning, {} new",
                progress.total_words,
                progress.mastered_words,
                progress.learning_words,
                progress.new_words
            );
            println!("Accuracy: {}%", progress.accuracy);
            println!("Overdue: {}", progress.overdue_words);
        }
    }
    Ok(())
}

pub fn run_achievements(app: &App, format: &OutputFormat) -> Result<()> {
    let achievements = app.lexis.words.achievements().context("Failed to check achievements")?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&achievements)?),
        OutputFormat::Plain => {
            if achievements.is_empty() {
                println!("No achievements unlocked yet.");
                return Ok(());
            }
            for achievement in &achievements {
                println!("{}  {}", achievement.name, achievement.description);
            }
        }
    }
    Ok(())
}
