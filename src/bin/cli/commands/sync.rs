use anyhow::{Context, Result};

use lexis_lib::sync::{SyncAction, SyncConfig, SyncResult};

use crate::app::App;
use crate::OutputFormat;

fn print_result(result: &SyncResult, format: &OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(result)?),
        OutputFormat::Plain => {
            let what = match result.action {
                SyncAction::Uploaded => "Uploaded local data to GitHub",
                SyncAction::Downloaded => "Downloaded data from GitHub",
                SyncAction::Merged => "Merged local and GitHub data",
            };
            println!("{} ({} words, revision {})", what, result.words, result.sha);
        }
    }
    Ok(())
}

pub fn run_configure(app: &App, token: &str, owner: &str, repo: &str, branch: Option<&str>) -> Result<()> {
    let config = SyncConfig::new(token, owner, repo, branch);
    if !config.is_complete() {
        anyhow::bail!("Token, owner and repo must not be empty");
    }
    app.lexis.sync.save_config(&config).context("Failed to save sync config")?;
    println!(
        "Sync configured for {}/{} on branch {} (token {})",
        config.owner,
        config.repo,
        config.branch,
        config.masked_token()
    );
    Ok(())
}

pub fn run_test(app: &App, format: &OutputFormat) -> Result<()> {
    let info = app
        .block_on(app.lexis.sync.test_connection())?
        .context("Connection test failed")?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&info)?),
        OutputFormat::Plain => {
            let visibility = if info.private { "private" } else { "public" };
            println!("Connected to {} ({})", info.repo_name, visibility);
        }
    }
    Ok(())
}

pub fn run_upload(app: &App, format: &OutputFormat) -> Result<()> {
    let result = app.block_on(app.lexis.sync.upload())?.context("Upload failed")?;
    print_result(&result, format)
}

pub fn run_download(app: &App, format: &OutputFormat) -> Result<()> {
    let result = app.block_on(app.lexis.sync.download())?.context("Download failed")?;
    print_result(&result, format)
}

pub fn run_smart(app: &App, format: &OutputFormat) -> Result<()> {
    let result = app.block_on(app.lexis.sync.smart_sync())?.context("Sync failed")?;
    print_result(&result, format)
}

pub fn run_status(app: &App, format: &OutputFormat) -> Result<()> {
    let status = app.lexis.sync.status().context("Failed to read sync status")?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&status)?),
        OutputFormat::Plain => {
            if !status.configured {
                println!("GitHub sync is not configured.");
                return Ok(());
            }
            let config = app.lexis.sync.config()?;
            println!("Repository: {}/{} ({})", config.owner, config.repo, config.branch);
            match status.last_sync_time {
                Some(at) => println!("Last sync:  {}", at.format("%Y-%m-%d %H:%M:%S UTC")),
                None => println!("Last sync:  never"),
            }
            if let Some(sha) = &status.last_sync_sha {
                println!("Revision:   {}", sha);
            }
        }
    }
    Ok(())
}
