use anyhow::{Context, Result};
use serde_json::json;

use lexis_lib::words::algorithm::PACE_SETTING;
use lexis_lib::words::scheduler::DAILY_GOAL_SETTING;
use lexis_lib::words::PaceProfile;

use crate::app::App;
use crate::OutputFormat;

pub fn run_show(app: &App, format: &OutputFormat) -> Result<()> {
    let scheduler = app.lexis.scheduler();
    let pace = scheduler.pace().context("Failed to read pace")?;
    let goal = scheduler.daily_goal().context("Failed to read daily goal")?;
    let suggested = app.lexis.words.suggested_daily_goal()?;

    match format {
        OutputFormat::Json => {
            let output = json!({
                "reviewInterval": pace,
                "intervals": pace.intervals(),
                "dailyGoal": goal,
                "suggestedDailyGoal": suggested,
                "dataDir": app.lexis.config.data_dir.to_string_lossy(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            println!("Pace:        {} ({:?} days)", pace.as_str(), pace.intervals());
            println!("Daily goal:  {} (suggested: {})", goal, suggested);
            println!("Data dir:    {}", app.lexis.config.data_dir.display());
        }
    }
    Ok(())
}

pub fn run_pace(app: &App, profile: Option<PaceProfile>) -> Result<()> {
    match profile {
        Some(profile) => {
            app.set_setting(PACE_SETTING, json!(profile.as_str()))?;
            println!("Pace set to {}", profile.as_str());
        }
        None => {
            let stored = app.setting(PACE_SETTING)?;
            println!("{}", PaceProfile::from_setting(stored.as_deref()).as_str());
        }
    }
    Ok(())
}

pub fn run_goal(app: &App, goal: Option<u32>) -> Result<()> {
    match goal {
        Some(0) => anyhow::bail!("Daily goal must be at least 1"),
        Some(goal) => {
            app.set_setting(DAILY_GOAL_SETTING, json!(goal))?;
            println!("Daily goal set to {}", goal);
        }
        None => {
            let goal = app.lexis.scheduler().daily_goal()?;
            let suggested = app.lexis.words.suggested_daily_goal()?;
            println!("{} (suggested: {})", goal, suggested);
        }
    }
    Ok(())
}
