use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use crate::db::mappers::{parse_task, parse_tasks};
use crate::db::CoordDb;
use crate::error::{CoordError, Result};
use crate::types::{Task, TaskStatus};

use super::types::{TaskRow, TASK_COLUMNS};

impl CoordDb {
    /// Tasks filtered by status and/or type, oldest first.
    ///
    /// # Errors
    /// Returns an error if the store cannot be read.
    pub async fn list_tasks(
        &self,
        status: Option<TaskStatus>,
        task_type: Option<&str>,
    ) -> Result<Vec<Task>> {
        let mut builder: QueryBuilder<'_, Sqlite> =
            QueryBuilder::new(format!("SELECT {TASK_COLUMNS} FROM tasks WHERE 1 = 1"));
        if let Some(status) = status {
            builder.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(task_type) = task_type {
            builder.push(" AND task_type = ").push_bind(task_type.to_string());
        }
        builder.push(" ORDER BY id ASC");

        let mut conn = self.connect().await?;
        let rows = builder
            .build_query_as::<TaskRow>()
            .fetch_all(&mut conn)
            .await
            .map_err(|e| CoordError::DatabaseError(format!("Failed to list tasks: {e}")))?;

        parse_tasks(rows)
    }

    /// # Errors
    /// Returns an error if the store cannot be read.
    pub async fn get_task(&self, task_id: i64) -> Result<Option<Task>> {
        let mut conn = self.connect().await?;
        fetch_task(&mut conn, task_id).await
    }

    /// First pending task whose dependency (if any) is complete, ordered by
    /// priority and then id. Readiness is computed from current state on
    /// every call rather than stored.
    ///
    /// # Errors
    /// Returns an error if the store cannot be read.
    pub async fn next_runnable(&self) -> Result<Option<Task>> {
        let mut conn = self.connect().await?;
        let row = sqlx::query_as::<_, TaskRow>(
            "SELECT t.id, t.submitted_by, t.task_type, t.problem_id, t.concern_scope,
                    t.payload_path, t.priority, t.depends_on, t.status, t.claimed_by,
                    t.agent_file, t.model, t.output_path, t.created_at, t.claimed_at,
                    t.completed_at, t.error
             FROM tasks t
             LEFT JOIN tasks dep ON dep.id = t.depends_on
             WHERE t.status = 'pending'
               AND (t.depends_on IS NULL OR dep.status = 'complete')
             ORDER BY CASE t.priority
                        WHEN 'high' THEN 0
                        WHEN 'normal' THEN 1
                        ELSE 2
                      END ASC,
                      t.id ASC
             LIMIT 1",
        )
        .fetch_optional(&mut conn)
        .await
        .map_err(|e| CoordError::DatabaseError(format!("Failed to select next task: {e}")))?;

        row.map(parse_task).transpose()
    }
}

pub(crate) async fn fetch_task(conn: &mut SqliteConnection, task_id: i64) -> Result<Option<Task>> {
    sqlx::query_as::<_, TaskRow>(&format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?"))
        .bind(task_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| CoordError::DatabaseError(format!("Failed to load task {task_id}: {e}")))?
        .map(parse_task)
        .transpose()
}
