mod agent_queries;
mod event_queries;
mod message_queries;
mod task_queries;
mod types;

pub(crate) use task_queries::fetch_task;
pub(crate) use types::*;
