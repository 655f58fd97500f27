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
use crate::db::CoordDb;
use crate::error::{CoordError, Result};
use crate::types::AgentStatus;

impl CoordDb {
    /// Appends a `running` row for `name`.
    ///
    /// # Errors
    /// Returns an error if the store cannot be written.
    pub async fn register(&self, name: &str, pid: Option<i64>) -> Result<i64> {
        let mut conn = self.connect().await?;
        self.begin_immediate(&mut conn).await?;
        let outcome = append_agent_row(&mut conn, name, Some(pid), AgentStatus::Running).await;
        let id = finish(&mut conn, outcome).await?;
        info!(agent = name, pid, "agent registered");
        Ok(id)
    }

    /// Appends an `exited` row for `name`, keeping its last known pid.
    ///
    /// # Errors
    /// Returns an error if the store cannot be written.
    pub async fn unregister(&self, name: &str) -> Result<i64> {
        let id = self.record_status(name, AgentStatus::Exited).await?;
        info!(agent = name, "agent unregistered");
        Ok(id)
    }

    /// Appends a `cleaned` row for `name`, or for every name whose latest
    /// status is not already `cleaned` when `name` is `None`. Returns the
    /// names that were marked.
    ///
    /// # Errors
    /// Returns an error if the store cannot be written.
    pub async fn cleanup(&self, name: Option<&str>) -> Result<Vec<String>> {
        let mut conn = self.connect().await?;
        self.begin_immediate(&mut conn).await?;
        let outcome = match name {
            Some(name) => append_agent_row(&mut conn, name, None, AgentStatus::Cleaned)
                .await
                .map(|_| vec![name.to_string()]),
            None => clean_all(&mut conn).await,
        };
        let cleaned = finish(&mut conn, outcome).await?;
        info!(count = cleaned.len(), "agents cleaned");
        Ok(cleaned)
    }

    /// Appends a status row for `name`, carrying its last known pid forward.
    pub(crate) async fn record_status(&self, name: &str, status: AgentStatus) -> Result<i64> {
        let mut conn = self.connect().await?;
        self.begin_immediate(&mut conn).await?;
        let outcome = append_agent_row(&mut conn, name, None, status).await;
        finish(&mut conn, outcome).await
    }
}

async fn clean_all(conn: &mut SqliteConnection) -> Result<Vec<String>> {
    let names = sqlx::query_scalar::<_, String>(
        "SELECT a.name
         FROM agents a
         JOIN (SELECT name, MAX(id) AS max_id FROM agents GROUP BY name) latest
           ON latest.max_id = a.id
         WHERE a.status != 'cleaned'
         ORDER BY a.name ASC",
    )
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| CoordError::DatabaseError(format!("Failed to list agents to clean: {e}")))?;

    for name in &names {
        append_agent_row(conn, name, None, AgentStatus::Cleaned).await?;
    }
    Ok(names)
}

/// `pid` of `None` inherits the pid of the newest existing row for `name`;
/// `Some(pid)` records that value as given.
async fn append_agent_row(
    conn: &mut SqliteConnection,
    name: &str,
    pid: Option<Option<i64>>,
    status: AgentStatus,
) -> Result<i64> {
    let id = mint_id(conn).await?;
    let query = match pid {
        Some(pid) => sqlx::query(
            "INSERT INTO agents (id, created_at, name, pid, status) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(Utc::now())
        .bind(name)
        .bind(pid)
        .bind(status.as_str()),
        None => sqlx::query(
            "INSERT INTO agents (id, created_at, name, pid, status)
             VALUES (?, ?, ?,
                     (SELECT pid FROM agents WHERE name = ? ORDER BY id DESC LIMIT 1),
                     ?)",
        )
        .bind(id)
        .bind(Utc::now())
        .bind(name)
        .bind(name)
        .bind(status.as_str()),
    };

    query
        .execute(&mut *conn)
        .await
        .map(|_| id)
        .map_err(|e| {
            CoordError::DatabaseError(format!("Failed to record {status} for {name}: {e}"))
        })
}
