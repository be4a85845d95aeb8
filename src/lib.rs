//! Lexis: a vocabulary flashcard trainer
//!
//! Words live in a local SQLite store and are scheduled with an interval-table
//! spaced repetition heuristic. The whole dataset can be synced with a JSON
//! file in a GitHub repository.

pub mod app;
pub mod config;
pub mod sync;
pub mod words;

pub use app::{AppError, Lexis};
pub use config::AppConfig;
