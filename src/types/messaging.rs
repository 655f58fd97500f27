use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A mailbox row. Once `claimed` flips to true the row never changes again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub sender: Option<String>,
    pub target: String,
    pub body: String,
    pub claimed: bool,
    pub claimed_by: Option<String>,
    pub claimed_at: Option<DateTime<Utc>>,
}

/// Result of a blocking receive.
///
/// Kept as a tagged value so a message whose body happens to read
/// `TIMEOUT` is still distinguishable from an expired wait.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecvOutcome {
    Delivered(Message),
    TimedOut,
}

impl RecvOutcome {
    #[must_use]
    pub const fn message(&self) -> Option<&Message> {
        match self {
            Self::Delivered(message) => Some(message),
            Self::TimedOut => None,
        }
    }

    #[must_use]
    pub fn into_body(self) -> Option<String> {
        match self {
            Self::Delivered(message) => Some(message.body),
            Self::TimedOut => None,
        }
    }
}
