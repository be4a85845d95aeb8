use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::app::App;
use crate::OutputFormat;

pub fn run_import(app: &App, file: &Path, format: &OutputFormat) -> Result<()> {
    let data = fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let summary = app.lexis.words.import_words(&data).context("Import failed")?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
        OutputFormat::Plain => {
            println!(
                "Imported {} of {} words ({} skipped)",
                summary.imported, summary.total, summary.skipped
            );
            for error in &summary.errors {
                eprintln!("  {}", error);
            }
        }
    }
    Ok(())
}

pub fn run_export(app: &App, file: Option<&Path>) -> Result<()> {
    let json = app.lexis.words.export_words().context("Export failed")?;

    match file {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Exported words to {}", path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}
