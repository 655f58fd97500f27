#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]

use std::time::Duration;

use chrono::Utc;
use sqlx::SqliteConnection;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::db::core::{commit, finish, mint_id, rollback};
use crate::db::read_ops::{MessageRow, MESSAGE_COLUMNS};
use crate::db::CoordDb;
use crate::error::{CoordError, Result};
use crate::types::{AgentStatus, Message, RecvOutcome};

enum ClaimAttempt {
    Claimed(Message),
    Empty,
    Lost(i64),
}

impl CoordDb {
    /// Appends an unclaimed message to `target`'s mailbox. The target does
    /// not need to be registered.
    ///
    /// # Errors
    /// Returns an error if the store cannot be written.
    pub async fn send(&self, target: &str, body: &str, sender: Option<&str>) -> Result<i64> {
        let mut conn = self.connect().await?;
        self.begin_immediate(&mut conn).await?;
        let outcome = insert_message(&mut conn, target, body, sender).await;
        let id = finish(&mut conn, outcome).await?;
        debug!(id, mailbox = target, "message sent");
        Ok(id)
    }

    /// Blocks until a message for `name` is claimed or `timeout` elapses
    /// (`None` waits forever).
    ///
    /// The caller's registry status reads `waiting` for the duration of the
    /// wait and `running` again afterwards, whatever the outcome.
    ///
    /// # Errors
    /// Returns an error if the store cannot be read or written.
    pub async fn recv(&self, name: &str, timeout: Option<Duration>) -> Result<RecvOutcome> {
        self.record_status(name, AgentStatus::Waiting).await?;
        let outcome = self.wait_for_message(name, timeout).await;
        let restored = self.record_status(name, AgentStatus::Running).await;
        let outcome = outcome?;
        restored?;
        Ok(outcome)
    }

    /// Claims the oldest unclaimed message for `name` without waiting.
    ///
    /// # Errors
    /// Returns an error if the store cannot be read or written.
    pub async fn try_recv(&self, name: &str) -> Result<Option<Message>> {
        let mut conn = self.connect().await?;
        loop {
            self.begin_immediate(&mut conn).await?;
            let attempt = claim_oldest(&mut conn, name).await;
            match finish(&mut conn, attempt).await? {
                ClaimAttempt::Claimed(message) => {
                    info!(id = message.id, mailbox = name, "message claimed");
                    return Ok(Some(message));
                }
                ClaimAttempt::Empty => return Ok(None),
                ClaimAttempt::Lost(id) => {
                    debug!(id, mailbox = name, "lost claim race; retrying");
                }
            }
        }
    }

    /// Claims every message for `name` that is unclaimed at the moment the
    /// transaction starts, oldest first. Messages sent afterwards stay
    /// unclaimed.
    ///
    /// # Errors
    /// Returns an error if the store cannot be read or written.
    pub async fn drain(&self, name: &str) -> Result<Vec<Message>> {
        let mut conn = self.connect().await?;
        loop {
            self.begin_immediate(&mut conn).await?;
            match claim_all(&mut conn, name).await {
                Ok(Some(messages)) => {
                    commit(&mut conn).await?;
                    info!(count = messages.len(), mailbox = name, "mailbox drained");
                    return Ok(messages);
                }
                Ok(None) => {
                    rollback(&mut conn).await;
                    debug!(mailbox = name, "drain snapshot changed underneath; retrying");
                }
                Err(error) => {
                    rollback(&mut conn).await;
                    return Err(error);
                }
            }
        }
    }

    async fn wait_for_message(&self, name: &str, timeout: Option<Duration>) -> Result<RecvOutcome> {
        // A limit too large to represent has no deadline.
        let deadline = timeout.and_then(|limit| Instant::now().checked_add(limit));
        let poll_interval = self.config().poll_interval;

        loop {
            if let Some(message) = self.try_recv(name).await? {
                return Ok(RecvOutcome::Delivered(message));
            }

            let now = Instant::now();
            let nap = match deadline {
                None => poll_interval,
                Some(deadline) if now >= deadline => {
                    debug!(mailbox = name, "receive timed out");
                    return Ok(RecvOutcome::TimedOut);
                }
                Some(deadline) => poll_interval.min(deadline - now),
            };
            tokio::time::sleep(nap).await;
        }
    }
}

async fn insert_message(
    conn: &mut SqliteConnection,
    target: &str,
    body: &str,
    sender: Option<&str>,
) -> Result<i64> {
    let id = mint_id(conn).await?;
    sqlx::query(
        "INSERT INTO messages (id, created_at, sender, target, body, claimed)
         VALUES (?, ?, ?, ?, ?, 0)",
    )
    .bind(id)
    .bind(Utc::now())
    .bind(sender)
    .bind(target)
    .bind(body)
    .execute(&mut *conn)
    .await
    .map(|_| id)
    .map_err(|e| CoordError::DatabaseError(format!("Failed to send message: {e}")))
}

async fn claim_oldest(conn: &mut SqliteConnection, name: &str) -> Result<ClaimAttempt> {
    let candidate = sqlx::query_as::<_, MessageRow>(&format!(
        "SELECT {MESSAGE_COLUMNS} FROM messages
         WHERE target = ? AND claimed = 0
         ORDER BY id ASC
         LIMIT 1"
    ))
    .bind(name)
    .fetch_optional(&mut *conn)
    .await
    .map_err(|e| CoordError::DatabaseError(format!("Failed to read mailbox: {e}")))?;

    let Some(row) = candidate else {
        return Ok(ClaimAttempt::Empty);
    };

    let claimed_at = Utc::now();
    let update = sqlx::query(
        "UPDATE messages
         SET claimed = 1, claimed_by = ?, claimed_at = ?
         WHERE id = ? AND claimed = 0",
    )
    .bind(name)
    .bind(claimed_at)
    .bind(row.id)
    .execute(&mut *conn)
    .await
    .map_err(|e| CoordError::DatabaseError(format!("Failed to claim message: {e}")))?;

    if update.rows_affected() == 0 {
        return Ok(ClaimAttempt::Lost(row.id));
    }

    let mut message = Message::from(row);
    message.claimed = true;
    message.claimed_by = Some(name.to_string());
    message.claimed_at = Some(claimed_at);
    Ok(ClaimAttempt::Claimed(message))
}

/// `Ok(None)` means the bulk update did not touch exactly the selected
/// rows; the caller rolls back and tries again.
async fn claim_all(conn: &mut SqliteConnection, name: &str) -> Result<Option<Vec<Message>>> {
    let rows = sqlx::query_as::<_, MessageRow>(&format!(
        "SELECT {MESSAGE_COLUMNS} FROM messages
         WHERE target = ? AND claimed = 0
         ORDER BY id ASC"
    ))
    .bind(name)
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| CoordError::DatabaseError(format!("Failed to read mailbox: {e}")))?;

    if rows.is_empty() {
        return Ok(Some(Vec::new()));
    }

    // The write lock is held from BEGIN IMMEDIATE, so every unclaimed row
    // for `name` up to the newest selected id is exactly the snapshot.
    let newest = rows.last().map_or(0, |row| row.id);
    let claimed_at = Utc::now();
    let update = sqlx::query(
        "UPDATE messages
         SET claimed = 1, claimed_by = ?, claimed_at = ?
         WHERE target = ? AND claimed = 0 AND id <= ?",
    )
    .bind(name)
    .bind(claimed_at)
    .bind(name)
    .bind(newest)
    .execute(&mut *conn)
    .await
    .map_err(|e| CoordError::DatabaseError(format!("Failed to drain mailbox: {e}")))?;

    if usize::try_from(update.rows_affected()).ok() != Some(rows.len()) {
        return Ok(None);
    }

    Ok(Some(
        rows.into_iter()
            .map(|row| {
                let mut message = Message::from(row);
                message.claimed = true;
                message.claimed_by = Some(name.to_string());
                message.claimed_at = Some(claimed_at);
                message
            })
            .collect(),
    ))
}
