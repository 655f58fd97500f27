use crate::db::CoordDb;
use crate::error::{CoordError, Result};
use crate::types::Message;

use super::types::{MessageRow, MESSAGE_COLUMNS};

impl CoordDb {
    /// Number of unclaimed messages addressed to `name`. Never claims anything.
    ///
    /// # Errors
    /// Returns an error if the store cannot be read.
    pub async fn check(&self, name: &str) -> Result<i64> {
        let mut conn = self.connect().await?;
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM messages WHERE target = ? AND claimed = 0",
        )
        .bind(name)
        .fetch_one(&mut conn)
        .await
        .map_err(|e| CoordError::DatabaseError(format!("Failed to count messages: {e}")))
    }

    /// Full mailbox history for `target`, claimed or not, oldest first.
    ///
    /// # Errors
    /// Returns an error if the store cannot be read.
    pub async fn mailbox_history(&self, target: &str) -> Result<Vec<Message>> {
        let mut conn = self.connect().await?;
        sqlx::query_as::<_, MessageRow>(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE target = ? ORDER BY id ASC"
        ))
        .bind(target)
        .fetch_all(&mut conn)
        .await
        .map(|rows| rows.into_iter().map(Message::from).collect())
        .map_err(|e| CoordError::DatabaseError(format!("Failed to load mailbox: {e}")))
    }
}
