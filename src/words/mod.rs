//! Vocabulary words and spaced repetition for Lexis
//!
//! This module provides:
//! - Word storage (SQLite-backed, behind the `WordStore` trait)
//! - The interval-table review heuristic
//! - Due-word selection and learning statistics
//! - Study sessions and word management (add/import/export/progress)

pub mod algorithm;
pub mod manager;
pub mod models;
pub mod scheduler;
pub mod session;
pub mod storage;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub use algorithm::PaceProfile;
pub use manager::{Achievement, ImportSummary, Progress, WordManager};
pub use models::*;
pub use scheduler::Scheduler;
pub use session::{MarkResult, Session, SessionStats};
pub use storage::{validate_snapshot, SqliteWordStore, WordStore, WordStoreError, DATASET_VERSION};

/// Word store shared between the scheduler, word manager and sync manager
pub type SharedStore = Arc<Mutex<dyn WordStore>>;

/// Lock the shared store, recovering the guard if a previous holder panicked
pub fn lock_store(store: &SharedStore) -> MutexGuard<'_, dyn WordStore + 'static> {
    store.lock().unwrap_or_else(PoisonError::into_inner)
}
