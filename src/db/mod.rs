//! Database layer for media-dl
//!
//! Handles SQLite persistence for the task ledger. The database is the
//! authoritative record of every request's lifecycle; it survives process
//! restarts so completed and failed tasks stay visible. Only the live
//! cancellation handles (held by [`TaskLedger`](crate::ledger::TaskLedger))
//! are ephemeral.
//!
//! ## Submodules
//!
//! Methods on [`Database`] are organized by domain:
//! - [`migrations`] — Database lifecycle, schema migrations
//! - [`tasks`] — Task ledger CRUD and filtered pagination

use sqlx::{FromRow, sqlite::SqlitePool};

use crate::types::{DownloadStage, MediaCategory, PendingTask, TaskId};

mod migrations;
mod tasks;

/// New task to be inserted into the database
#[derive(Debug, Clone)]
pub struct NewTask {
    /// Display label
    pub label: String,
    /// Classification code (see [`MediaCategory::as_str`])
    pub category: String,
    /// Destination path template (no extension)
    pub output_path: String,
    /// Initial stage code
    pub stage: i32,
}

/// Task record from database
#[derive(Debug, Clone, FromRow)]
pub struct TaskRow {
    /// Unique database ID
    pub id: i64,
    /// Display label
    pub label: String,
    /// Classification code
    pub category: String,
    /// Current stage code
    pub stage: i32,
    /// Destination path template
    pub output_path: String,
    /// Absolute final path (set on success)
    pub output_file: Option<String>,
    /// Failure message (set on failure)
    pub error_message: Option<String>,
    /// Unix timestamp when the task was created
    pub created_at: i64,
}

impl From<TaskRow> for PendingTask {
    fn from(row: TaskRow) -> Self {
        PendingTask {
            id: TaskId(row.id),
            label: row.label,
            category: MediaCategory::from_db(&row.category),
            stage: DownloadStage::from_i32(row.stage),
            output_path: row.output_path,
            output_file: row.output_file,
            error_message: row.error_message,
            created_at: row.created_at,
        }
    }
}

/// Database handle for media-dl
pub struct Database {
    pool: SqlitePool,
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
