#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]

use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::debug;

use crate::db::core::{finish, mint_id};
use crate::db::CoordDb;
use crate::error::{CoordError, Result};
use crate::types::{kind, PIPELINE_STATE_TAG};

impl CoordDb {
    /// Appends one event. Events are never updated or deleted; a correction
    /// is a new event.
    ///
    /// # Errors
    /// Returns an error if the store cannot be written.
    pub async fn log(&self, kind: &str, tag: &str, body: &str, agent: &str) -> Result<i64> {
        let mut conn = self.connect().await?;
        self.begin_immediate(&mut conn).await?;
        let outcome = insert_event(&mut conn, kind, tag, body, agent).await;
        let id = finish(&mut conn, outcome).await?;
        debug!(id, kind, tag, "event logged");
        Ok(id)
    }

    /// Records a new pipeline state as a `lifecycle` / `pipeline-state` event.
    ///
    /// # Errors
    /// Returns [`CoordError::InvalidValue`] for an empty state, or an error if
    /// the store cannot be written.
    pub async fn set_pipeline_state(&self, state: &str, agent: &str) -> Result<i64> {
        if state.trim().is_empty() {
            return Err(CoordError::InvalidValue(
                "pipeline state must not be empty".to_string(),
            ));
        }
        self.log(kind::LIFECYCLE, PIPELINE_STATE_TAG, state, agent)
            .await
    }
}

async fn insert_event(
    conn: &mut SqliteConnection,
    kind: &str,
    tag: &str,
    body: &str,
    agent: &str,
) -> Result<i64> {
    let id = mint_id(conn).await?;
    sqlx::query(
        "INSERT INTO events (id, created_at, kind, tag, body, agent) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(Utc::now())
    .bind(kind)
    .bind(tag)
    .bind(body)
    .bind(agent)
    .execute(&mut *conn)
    .await
    .map(|_| id)
    .map_err(|e| CoordError::DatabaseError(format!("Failed to write event: {e}")))
}
