use crate::db::mappers::parse_agent_record;
use crate::db::CoordDb;
use crate::error::{CoordError, Result};
use crate::types::{AgentRecord, AgentStatus};

use super::types::AgentListingRow;

impl CoordDb {
    /// One row per agent whose latest status is not `cleaned`, with its live
    /// count of unclaimed messages. Diagnostic view; the two tables are read
    /// in one statement but no stronger isolation is promised.
    ///
    /// # Errors
    /// Returns an error if the store cannot be read.
    pub async fn list_agents(&self) -> Result<Vec<AgentRecord>> {
        let mut conn = self.connect().await?;
        let rows = sqlx::query_as::<_, AgentListingRow>(
            "SELECT a.name, a.pid, a.status, a.created_at,
                    (SELECT COUNT(*) FROM messages m
                      WHERE m.target = a.name AND m.claimed = 0) AS pending
             FROM agents a
             JOIN (SELECT name, MAX(id) AS max_id FROM agents GROUP BY name) latest
               ON latest.max_id = a.id
             WHERE a.status != 'cleaned'
             ORDER BY a.name ASC",
        )
        .fetch_all(&mut conn)
        .await
        .map_err(|e| CoordError::DatabaseError(format!("Failed to list agents: {e}")))?;

        rows.into_iter().map(parse_agent_record).collect()
    }

    /// Status of the newest registration row for `name`.
    ///
    /// # Errors
    /// Returns an error if the store cannot be read.
    pub async fn agent_status(&self, name: &str) -> Result<Option<AgentStatus>> {
        let mut conn = self.connect().await?;
        let status = sqlx::query_scalar::<_, String>(
            "SELECT status FROM agents WHERE name = ? ORDER BY id DESC LIMIT 1",
        )
        .bind(name)
        .fetch_optional(&mut conn)
        .await
        .map_err(|e| CoordError::DatabaseError(format!("Failed to load agent status: {e}")))?;

        status
            .map(|s| AgentStatus::try_from(s.as_str()).map_err(CoordError::DatabaseError))
            .transpose()
    }
}
