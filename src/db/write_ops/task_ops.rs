#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]

use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::info;

use crate::db::core::{finish, mint_id};
use crate::db::read_ops::fetch_task;
use crate::db::CoordDb;
use crate::error::{CoordError, Result};
use crate::types::{NewTask, TaskStatus};

impl CoordDb {
    /// Queues a task as `pending`.
    ///
    /// # Errors
    /// Returns [`CoordError::NotFound`] if `depends_on` names a task that does
    /// not exist, or an error if the store cannot be written.
    pub async fn submit_task(&self, task: &NewTask) -> Result<i64> {
        let mut conn = self.connect().await?;
        self.begin_immediate(&mut conn).await?;
        let outcome = insert_task(&mut conn, task).await;
        let id = finish(&mut conn, outcome).await?;
        info!(
            id,
            task_type = task.task_type.as_str(),
            priority = task.priority.as_str(),
            depends_on = task.depends_on,
            "task submitted"
        );
        Ok(id)
    }

    /// Moves a task from `pending` to `running` on behalf of `dispatcher`.
    /// Exactly one of several concurrent claimers succeeds.
    ///
    /// # Errors
    /// Returns [`CoordError::PreconditionFailed`] if the task is not pending,
    /// [`CoordError::NotFound`] if it does not exist.
    pub async fn claim_task(&self, dispatcher: &str, task_id: i64) -> Result<()> {
        let mut conn = self.connect().await?;
        self.begin_immediate(&mut conn).await?;
        let outcome = guarded_update(
            &mut conn,
            task_id,
            TaskStatus::Pending,
            sqlx::query(
                "UPDATE tasks
                 SET status = 'running', claimed_by = ?, claimed_at = ?
                 WHERE id = ? AND status = 'pending'",
            )
            .bind(dispatcher)
            .bind(Utc::now())
            .bind(task_id),
        )
        .await;
        finish(&mut conn, outcome).await?;
        info!(id = task_id, dispatcher, "task claimed");
        Ok(())
    }

    /// Moves a task from `running` to `complete`.
    ///
    /// # Errors
    /// Returns [`CoordError::PreconditionFailed`] if the task is not running,
    /// [`CoordError::NotFound`] if it does not exist.
    pub async fn complete_task(&self, task_id: i64, output_path: Option<&str>) -> Result<()> {
        let mut conn = self.connect().await?;
        self.begin_immediate(&mut conn).await?;
        let outcome = guarded_update(
            &mut conn,
            task_id,
            TaskStatus::Running,
            sqlx::query(
                "UPDATE tasks
                 SET status = 'complete', output_path = ?, completed_at = ?
                 WHERE id = ? AND status = 'running'",
            )
            .bind(output_path)
            .bind(Utc::now())
            .bind(task_id),
        )
        .await;
        finish(&mut conn, outcome).await?;
        info!(id = task_id, "task complete");
        Ok(())
    }

    /// Moves a task from `running` to `failed`.
    ///
    /// # Errors
    /// Returns [`CoordError::PreconditionFailed`] if the task is not running,
    /// [`CoordError::NotFound`] if it does not exist.
    pub async fn fail_task(&self, task_id: i64, error: Option<&str>) -> Result<()> {
        let mut conn = self.connect().await?;
        self.begin_immediate(&mut conn).await?;
        let outcome = guarded_update(
            &mut conn,
            task_id,
            TaskStatus::Running,
            sqlx::query(
                "UPDATE tasks
                 SET status = 'failed', error = ?, completed_at = ?
                 WHERE id = ? AND status = 'running'",
            )
            .bind(error)
            .bind(Utc::now())
            .bind(task_id),
        )
        .await;
        finish(&mut conn, outcome).await?;
        info!(id = task_id, "task failed");
        Ok(())
    }

    /// Records which agent file and model a dispatcher resolved for a task.
    /// Does not change the task's status.
    ///
    /// # Errors
    /// Returns [`CoordError::NotFound`] if the task does not exist.
    pub async fn record_task_routing(
        &self,
        task_id: i64,
        agent_file: &str,
        model: &str,
    ) -> Result<()> {
        let mut conn = self.connect().await?;
        self.begin_immediate(&mut conn).await?;
        let outcome = sqlx::query("UPDATE tasks SET agent_file = ?, model = ? WHERE id = ?")
            .bind(agent_file)
            .bind(model)
            .bind(task_id)
            .execute(&mut conn)
            .await
            .map_err(|e| CoordError::DatabaseError(format!("Failed to record routing: {e}")))
            .and_then(|result| {
                if result.rows_affected() == 0 {
                    Err(CoordError::NotFound(format!("task {task_id} does not exist")))
                } else {
                    Ok(())
                }
            });
        finish(&mut conn, outcome).await
    }
}

async fn insert_task(conn: &mut SqliteConnection, task: &NewTask) -> Result<i64> {
    if let Some(dependency) = task.depends_on {
        if fetch_task(conn, dependency).await?.is_none() {
            return Err(CoordError::NotFound(format!(
                "dependency task {dependency} does not exist"
            )));
        }
    }

    let id = mint_id(conn).await?;
    sqlx::query(
        "INSERT INTO tasks (id, submitted_by, task_type, problem_id, concern_scope,
                            payload_path, priority, depends_on, status, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, 'pending', ?)",
    )
    .bind(id)
    .bind(&task.submitted_by)
    .bind(&task.task_type)
    .bind(task.problem_id.as_deref())
    .bind(task.concern_scope.as_deref())
    .bind(task.payload_path.as_deref())
    .bind(task.priority.as_str())
    .bind(task.depends_on)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await
    .map(|_| id)
    .map_err(|e| CoordError::DatabaseError(format!("Failed to submit task: {e}")))
}

/// Runs a status-guarded UPDATE. Zero affected rows means the guard did not
/// hold; the current status is read back for the diagnostic.
async fn guarded_update<'q>(
    conn: &mut SqliteConnection,
    task_id: i64,
    expected: TaskStatus,
    update: sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
) -> Result<()> {
    let result = update
        .execute(&mut *conn)
        .await
        .map_err(|e| CoordError::DatabaseError(format!("Failed to update task {task_id}: {e}")))?;

    if result.rows_affected() > 0 {
        return Ok(());
    }

    match fetch_task(conn, task_id).await? {
        None => Err(CoordError::NotFound(format!("task {task_id} does not exist"))),
        Some(task) => Err(CoordError::PreconditionFailed(format!(
            "task {task_id} is {}, expected {expected}",
            task.status
        ))),
    }
}
