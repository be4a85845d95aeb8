mod app;
mod commands;
mod render;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use lexis_lib::words::PaceProfile;

#[derive(Parser)]
#[command(name = "lexis-cli", about = "Lexis vocabulary trainer", version)]
struct Cli {
    /// Data directory holding the database and config.toml
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, default_value = "plain")]
    format: OutputFormat,

    /// Disable ANSI colors
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Plain,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Add a word
    Add {
        /// Source term
        english: String,
        /// Translation
        chinese: String,
        /// Example sentence
        #[arg(long, default_value = "")]
        example: String,
        /// Unit number (negative values become 0)
        #[arg(long, allow_hyphen_values = true)]
        unit: Option<i64>,
    },

    /// Edit a word; omitted fields keep their value
    Edit {
        id: i64,
        #[arg(long)]
        english: Option<String>,
        #[arg(long)]
        chinese: Option<String>,
        #[arg(long)]
        example: Option<String>,
        #[arg(long, allow_hyphen_values = true)]
        unit: Option<i64>,
    },

    /// Delete a word
    Rm { id: i64 },

    /// Show one word with its mastery estimate
    Show { id: i64 },

    /// Delete all words, settings and statistics
    Clear {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },

    /// List words
    List {
        /// Filter by source term or translation
        #[arg(long)]
        query: Option<String>,
        /// Only words in this unit
        #[arg(long)]
        unit: Option<u32>,
    },

    /// List units with word counts
    Units,

    /// Run an interactive review session
    Review {
        /// Number of words (default: the daily goal)
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Learning statistics
    Stats,

    /// Upcoming reviews per day
    Schedule {
        #[arg(long, default_value = "7")]
        days: u32,
    },

    /// Today's progress and streak
    Progress,

    /// Unlocked achievements
    Achievements,

    /// Import words from a JSON file
    Import { file: PathBuf },

    /// Export words as JSON (stdout when no file is given)
    Export { file: Option<PathBuf> },

    /// Study preferences
    #[command(subcommand)]
    Config(ConfigCommand),

    /// GitHub sync
    #[command(subcommand)]
    Sync(SyncCommand),
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Show study preferences
    Show,

    /// Show or set the review pace (standard, fast, slow)
    Pace { profile: Option<PaceProfile> },

    /// Show or set the daily goal
    Goal { goal: Option<u32> },
}

#[derive(Subcommand)]
enum SyncCommand {
    /// Store GitHub credentials for this device
    Configure {
        #[arg(long)]
        token: String,
        #[arg(long)]
        owner: String,
        #[arg(long)]
        repo: String,
        #[arg(long)]
        branch: Option<String>,
    },

    /// Check the credentials against the repository
    Test,

    /// Replace the remote file with local data
    Upload,

    /// Replace local data with the remote file
    Download,

    /// Merge local and remote data
    Smart,

    /// Show sync status
    Status,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let use_color = !cli.no_color && atty_check();
    let app = app::App::new(cli.data_dir.as_deref())?;
    let format = &cli.format;

    match cli.command {
        Command::Add { english, chinese, example, unit } => {
            commands::words::run_add(&app, &english, &chinese, &example, unit, format)?;
        }
        Command::Edit { id, english, chinese, example, unit } => {
            let changes = commands::words::Changes { english, chinese, example, unit };
            commands::words::run_edit(&app, id, changes, format)?;
        }
        Command::Rm { id } => {
            commands::words::run_rm(&app, id)?;
        }
        Command::Show { id } => {
            commands::words::run_show(&app, id, format, use_color)?;
        }
        Command::Clear { yes } => {
            commands::words::run_clear(&app, yes)?;
        }
        Command::List { query, unit } => {
            commands::words::run_list(&app, query.as_deref(), unit, format, use_color)?;
        }
        Command::Units => {
            commands::words::run_units(&app, format)?;
        }
        Command::Review { limit } => {
            commands::review::run(&app, limit, use_color)?;
        }
        Command::Stats => {
            commands::stats::run_stats(&app, format)?;
        }
        Command::Schedule { days } => {
            commands::stats::run_schedule(&app, days, format, use_color)?;
        }
        Command::Progress => {
            commands::stats::run_progress(&app, format)?;
        }
        Command::Achievements => {
            commands::stats::run_achievements(&app, format)?;
        }
        Command::Import { file } => {
            commands::transfer::run_import(&app, &file, format)?;
        }
        Command::Export { file } => {
            commands::transfer::run_export(&app, file.as_deref())?;
        }
        Command::Config(subcmd) => match subcmd {
            ConfigCommand::Show => commands::settings::run_show(&app, format)?,
            ConfigCommand::Pace { profile } => commands::settings::run_pace(&app, profile)?,
            ConfigCommand::Goal { goal } => commands::settings::run_goal(&app, goal)?,
        },
        Command::Sync(subcmd) => match subcmd {
            SyncCommand::Configure { token, owner, repo, branch } => {
                commands::sync::run_configure(&app, &token, &owner, &repo, branch.as_deref())?;
            }
            SyncCommand::Test => commands::sync::run_test(&app, format)?,
            SyncCommand::Upload => commands::sync::run_upload(&app, format)?,
            SyncCommand::Download => commands::sync::run_download(&app, format)?,
            SyncCommand::Smart => commands::sync::run_smart(&app, format)?,
            SyncCommand::Status => commands::sync::run_status(&app, format)?,
        },
    }

    Ok(())
}

/// Check if stdout is a terminal (for color support)
fn atty_check() -> bool {
    unsafe { libc_isatty(1) != 0 }
}

extern "C" {
    #[link_name = "isatty"]
    fn libc_isatty(fd: i32) -> i32;
}
