//! Task ledger — the authoritative record of every request's lifecycle
//!
//! The ledger pairs the persisted [`Database`] rows with an in-memory map of
//! live cancellation handles. Rows survive restarts; handles do not — a task
//! reloaded after a restart is shown in its last-persisted stage and is
//! never resumed. The handle map is the single shared mutable structure of
//! the crate and is guarded by one async mutex; the database pool serializes
//! row mutations, so queries always see a consistent snapshot.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::db::{Database, NewTask};
use crate::error::Result;
use crate::types::{DownloadStage, MediaFilter, PendingTask, TaskId, TaskTemplate};

/// Persisted task ledger with live cancellation handles
pub struct TaskLedger {
    db: Arc<Database>,
    page_size: usize,
    active: Mutex<HashMap<TaskId, CancellationToken>>,
}

impl TaskLedger {
    /// Create a ledger over an open database
    pub fn new(db: Arc<Database>, page_size: usize) -> Self {
        Self {
            db,
            page_size,
            active: Mutex::new(HashMap::new()),
        }
    }

    /// Register a new task in `Downloading` stage and bind a fresh
    /// cancellation handle to it
    ///
    /// The row is visible to queries before this returns, so list consumers
    /// see the entry immediately — before any pipeline I/O starts.
    pub async fn add_task(&self, template: &TaskTemplate) -> Result<(TaskId, CancellationToken)> {
        let id = self
            .db
            .insert_task(&NewTask {
                label: template.label.clone(),
                category: template.category.as_str().to_string(),
                output_path: template.output_path.clone(),
                stage: DownloadStage::Downloading.to_i32(),
            })
            .await?;

        let token = CancellationToken::new();
        self.active.lock().await.insert(id, token.clone());

        debug!(task_id = id.0, label = %template.label, "registered task");
        Ok((id, token))
    }

    /// Drop the live handle once a pipeline run has finished
    ///
    /// Called by the controller on every completion path; cancelling a task
    /// whose handle is gone is a no-op.
    pub async fn release_handle(&self, id: TaskId) {
        self.active.lock().await.remove(&id);
    }

    /// Whether a task currently has a live pipeline run
    pub async fn is_active(&self, id: TaskId) -> bool {
        self.active.lock().await.contains_key(&id)
    }

    /// Cancel a task's in-flight run, if it has one
    ///
    /// Returns whether a live handle was signalled. The ledger row is left
    /// in whatever stage it last reached — cancellation never forces a
    /// terminal stage.
    pub async fn cancel(&self, id: TaskId) -> bool {
        let active = self.active.lock().await;
        match active.get(&id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Remove a task, cancelling its in-flight run first if active
    ///
    /// Returns whether a row was actually removed.
    pub async fn remove_task(&self, id: TaskId) -> Result<bool> {
        {
            let mut active = self.active.lock().await;
            if let Some(token) = active.remove(&id) {
                token.cancel();
            }
        }
        self.db.delete_task(id).await
    }

    /// Remove every task, cancelling all in-flight runs
    ///
    /// Returns the number of removed rows.
    pub async fn remove_all_tasks(&self) -> Result<u64> {
        {
            let mut active = self.active.lock().await;
            for token in active.values() {
                token.cancel();
            }
            active.clear();
        }
        self.db.delete_all_tasks().await
    }

    /// Get a single task
    pub async fn get_task(&self, id: TaskId) -> Result<Option<PendingTask>> {
        Ok(self.db.get_task(id).await?.map(Into::into))
    }

    /// Query one page of tasks, newest first
    ///
    /// `after_id` is the exclusive pagination cursor of the previous page's
    /// last entry; `None` starts from the newest task.
    pub async fn query_tasks(
        &self,
        after_id: Option<TaskId>,
        filter: MediaFilter,
    ) -> Result<Vec<PendingTask>> {
        let rows = self
            .db
            .query_tasks(after_id, filter, self.page_size as i64)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Query every task matching the filter, newest first
    pub async fn query_all_tasks(&self, filter: MediaFilter) -> Result<Vec<PendingTask>> {
        let rows = self.db.query_all_tasks(filter).await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Advance a task to a new stage
    ///
    /// Terminal stages are final: an update against a task already in a
    /// terminal stage is ignored, which keeps late pipeline writes (e.g.
    /// after a concurrent removal re-registered nothing) from resurrecting
    /// finished entries.
    pub async fn update_stage(&self, id: TaskId, stage: DownloadStage) -> Result<()> {
        if let Some(current) = self.db.get_task(id).await? {
            let current_stage = DownloadStage::from_i32(current.stage);
            if current_stage.is_terminal() {
                warn!(
                    task_id = id.0,
                    ?current_stage,
                    requested = ?stage,
                    "ignoring stage update on terminal task"
                );
                return Ok(());
            }
            self.db.update_stage(id, stage.to_i32()).await?;
        }
        Ok(())
    }

    /// Record the committed artifact path
    pub async fn set_output_file(&self, id: TaskId, output_file: &str) -> Result<()> {
        self.db.set_output_file(id, output_file).await
    }

    /// Record a failure message
    pub async fn set_error(&self, id: TaskId, message: &str) -> Result<()> {
        self.db.set_error(id, message).await
    }
}
