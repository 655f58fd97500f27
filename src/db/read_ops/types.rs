use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(FromRow)]
pub(crate) struct MessageRow {
    pub(crate) id: i64,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) sender: Option<String>,
    pub(crate) target: String,
    pub(crate) body: String,
    pub(crate) claimed: bool,
    pub(crate) claimed_by: Option<String>,
    pub(crate) claimed_at: Option<DateTime<Utc>>,
}

#[derive(FromRow)]
pub(crate) struct EventRow {
    pub(crate) id: i64,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) kind: String,
    pub(crate) tag: String,
    pub(crate) body: String,
    pub(crate) agent: String,
}

#[derive(FromRow)]
pub(crate) struct AgentListingRow {
    pub(crate) name: String,
    pub(crate) pid: Option<i64>,
    pub(crate) status: String,
    pub(crate) pending: i64,
    pub(crate) created_at: DateTime<Utc>,
}

#[derive(FromRow)]
pub(crate) struct TaskRow {
    pub(crate) id: i64,
    pub(crate) submitted_by: String,
    pub(crate) task_type: String,
    pub(crate) problem_id: Option<String>,
    pub(crate) concern_scope: Option<String>,
    pub(crate) payload_path: Option<String>,
    pub(crate) priority: String,
    pub(crate) depends_on: Option<i64>,
    pub(crate) status: String,
    pub(crate) claimed_by: Option<String>,
    pub(crate) agent_file: Option<String>,
    pub(crate) model: Option<String>,
    pub(crate) output_path: Option<String>,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) claimed_at: Option<DateTime<Utc>>,
    pub(crate) completed_at: Option<DateTime<Utc>>,
    pub(crate) error: Option<String>,
}

pub(crate) const MESSAGE_COLUMNS: &str =
    "id, created_at, sender, target, body, claimed, claimed_by, claimed_at";

pub(crate) const EVENT_COLUMNS: &str = "id, created_at, kind, tag, body, agent";

pub(crate) const TASK_COLUMNS: &str = "id, submitted_by, task_type, problem_id, concern_scope,
     payload_path, priority, depends_on, status, claimed_by, agent_file, model, output_path,
     created_at, claimed_at, completed_at, error";
