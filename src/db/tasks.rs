//! Task ledger CRUD operations and filtered pagination.

use crate::error::DatabaseError;
use crate::types::{MediaFilter, TaskId};
use crate::{Error, Result};

use super::{Database, NewTask, TaskRow};

const TASK_COLUMNS: &str =
    "id, label, category, stage, output_path, output_file, error_message, created_at";

/// Category code a filter constrains to, if any
fn filter_category_code(filter: MediaFilter) -> Option<&'static str> {
    match filter {
        MediaFilter::ChatMedia => Some("chat_media"),
        MediaFilter::Story => Some("story"),
        MediaFilter::Spotlight => Some("spotlight"),
        MediaFilter::None | MediaFilter::Pending => None,
    }
}

impl Database {
    /// Insert a new task record
    pub async fn insert_task(&self, task: &NewTask) -> Result<TaskId> {
        let now = chrono::Utc::now().timestamp();

        let result = sqlx::query(
            r#"
            INSERT INTO tasks (label, category, stage, output_path, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&task.label)
        .bind(&task.category)
        .bind(task.stage)
        .bind(&task.output_path)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to insert task: {}",
                e
            )))
        })?;

        Ok(TaskId(result.last_insert_rowid()))
    }

    /// Get a task by ID
    pub async fn get_task(&self, id: TaskId) -> Result<Option<TaskRow>> {
        let row = sqlx::query_as::<_, TaskRow>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to get task: {}",
                e
            )))
        })?;

        Ok(row)
    }

    /// Update the stage of a task
    pub async fn update_stage(&self, id: TaskId, stage: i32) -> Result<()> {
        sqlx::query("UPDATE tasks SET stage = ? WHERE id = ?")
            .bind(stage)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to update stage: {}",
                    e
                )))
            })?;

        Ok(())
    }

    /// Record the final committed artifact path
    pub async fn set_output_file(&self, id: TaskId, output_file: &str) -> Result<()> {
        sqlx::query("UPDATE tasks SET output_file = ? WHERE id = ?")
            .bind(output_file)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to set output file: {}",
                    e
                )))
            })?;

        Ok(())
    }

    /// Record a failure message
    pub async fn set_error(&self, id: TaskId, error: &str) -> Result<()> {
        sqlx::query("UPDATE tasks SET error_message = ? WHERE id = ?")
            .bind(error)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to set error: {}",
                    e
                )))
            })?;

        Ok(())
    }

    /// Delete a task; returns whether a row was removed
    pub async fn delete_task(&self, id: TaskId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to delete task: {}",
                    e
                )))
            })?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete every task; returns the number of removed rows
    pub async fn delete_all_tasks(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM tasks")
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to delete all tasks: {}",
                    e
                )))
            })?;

        Ok(result.rows_affected())
    }

    /// Query one page of tasks, newest first
    ///
    /// `after_id` is an exclusive pagination cursor: only rows with a
    /// strictly smaller id are returned, so repeated calls with the same
    /// cursor and no intervening writes are stable.
    pub async fn query_tasks(
        &self,
        after_id: Option<TaskId>,
        filter: MediaFilter,
        limit: i64,
    ) -> Result<Vec<TaskRow>> {
        let mut sql = format!("SELECT {TASK_COLUMNS} FROM tasks");
        let mut clauses: Vec<&str> = Vec::new();

        if after_id.is_some() {
            clauses.push("id < ?");
        }
        match filter {
            // Stages 0 (downloading) and 1 (merging) are the non-terminal set
            MediaFilter::Pending => clauses.push("stage IN (0, 1)"),
            _ => {
                if filter_category_code(filter).is_some() {
                    clauses.push("category = ?");
                }
            }
        }

        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY id DESC LIMIT ?");

        let mut query = sqlx::query_as::<_, TaskRow>(&sql);
        if let Some(after) = after_id {
            query = query.bind(after);
        }
        if let Some(code) = filter_category_code(filter) {
            query = query.bind(code);
        }
        query = query.bind(limit);

        let rows = query.fetch_all(&self.pool).await.map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to query tasks: {}",
                e
            )))
        })?;

        Ok(rows)
    }

    /// Query every task matching the filter, newest first
    pub async fn query_all_tasks(&self, filter: MediaFilter) -> Result<Vec<TaskRow>> {
        self.query_tasks(None, filter, i64::MAX).await
    }
}
