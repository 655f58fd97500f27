use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Well-known event kinds.
pub mod kind {
    pub const SUMMARY: &str = "summary";
    pub const SIGNAL: &str = "signal";
    pub const LIFECYCLE: &str = "lifecycle";
}

/// Tag under [`kind::LIFECYCLE`] whose newest body is the pipeline state.
pub const PIPELINE_STATE_TAG: &str = "pipeline-state";

/// Pipeline state reported when no pipeline-state event exists yet.
pub const DEFAULT_PIPELINE_STATE: &str = "running";

/// An append-only log row. Optional fields are stored as empty strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub kind: String,
    pub tag: String,
    pub body: String,
    pub agent: String,
}

/// Filter shared by `tail` (ascending) and `query` (descending).
///
/// `since` is an exclusive lower bound on the event id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventFilter {
    pub kind: Option<String>,
    pub tag: Option<String>,
    pub agent: Option<String>,
    pub since: Option<i64>,
    pub limit: Option<i64>,
}

impl EventFilter {
    #[must_use]
    pub fn kind(kind: impl Into<String>) -> Self {
        Self {
            kind: Some(kind.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    #[must_use]
    pub fn with_agent(mut self, agent: impl Into<String>) -> Self {
        self.agent = Some(agent.into());
        self
    }

    #[must_use]
    pub const fn since(mut self, id: i64) -> Self {
        self.since = Some(id);
        self
    }

    #[must_use]
    pub const fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }
}
