use sqlx::{QueryBuilder, Sqlite};

use crate::db::CoordDb;
use crate::error::{CoordError, Result};
use crate::types::{kind, Event, EventFilter, DEFAULT_PIPELINE_STATE, PIPELINE_STATE_TAG};

use super::types::{EventRow, EVENT_COLUMNS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Ascending,
    Descending,
}

impl Direction {
    const fn sql(self) -> &'static str {
        match self {
            Self::Ascending => "ASC",
            Self::Descending => "DESC",
        }
    }
}

impl CoordDb {
    /// Cursor read: events matching `filter` with id greater than
    /// `filter.since`, oldest first.
    ///
    /// # Errors
    /// Returns an error if the store cannot be read.
    pub async fn tail(&self, filter: &EventFilter) -> Result<Vec<Event>> {
        self.select_events(filter, Direction::Ascending).await
    }

    /// Point lookup: events matching `filter`, newest first.
    ///
    /// # Errors
    /// Returns an error if the store cannot be read.
    pub async fn query(&self, filter: &EventFilter) -> Result<Vec<Event>> {
        self.select_events(filter, Direction::Descending).await
    }

    /// Newest event matching `filter`, if any.
    ///
    /// # Errors
    /// Returns an error if the store cannot be read.
    pub async fn latest(&self, filter: &EventFilter) -> Result<Option<Event>> {
        let mut filter = filter.clone();
        filter.limit = Some(1);
        Ok(self.query(&filter).await?.into_iter().next())
    }

    /// Current pipeline state: the body of the newest `lifecycle` /
    /// `pipeline-state` event, or `running` when there is none.
    ///
    /// # Errors
    /// Returns an error if the store cannot be read.
    pub async fn pipeline_state(&self) -> Result<String> {
        let latest = self
            .latest(&EventFilter::kind(kind::LIFECYCLE).with_tag(PIPELINE_STATE_TAG))
            .await?;
        Ok(latest
            .map(|event| event.body)
            .filter(|body| !body.is_empty())
            .unwrap_or_else(|| DEFAULT_PIPELINE_STATE.to_string()))
    }

    async fn select_events(&self, filter: &EventFilter, direction: Direction) -> Result<Vec<Event>> {
        let mut builder: QueryBuilder<'_, Sqlite> =
            QueryBuilder::new(format!("SELECT {EVENT_COLUMNS} FROM events WHERE 1 = 1"));

        if let Some(kind) = &filter.kind {
            builder.push(" AND kind = ").push_bind(kind.clone());
        }
        if let Some(tag) = &filter.tag {
            builder.push(" AND tag = ").push_bind(tag.clone());
        }
        if let Some(agent) = &filter.agent {
            builder.push(" AND agent = ").push_bind(agent.clone());
        }
        if let Some(since) = filter.since {
            builder.push(" AND id > ").push_bind(since);
        }
        builder.push(" ORDER BY id ").push(direction.sql());
        if let Some(limit) = filter.limit {
            builder.push(" LIMIT ").push_bind(limit);
        }

        let mut conn = self.connect().await?;
        builder
            .build_query_as::<EventRow>()
            .fetch_all(&mut conn)
            .await
            .map(|rows| rows.into_iter().map(Event::from).collect())
            .map_err(|e| CoordError::DatabaseError(format!("Failed to read events: {e}")))
    }
}
