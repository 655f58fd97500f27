use super::read_ops::{AgentListingRow, EventRow, MessageRow, TaskRow};
use crate::error::{CoordError, Result};
use crate::types::{AgentRecord, AgentStatus, Event, Message, Task, TaskPriority, TaskStatus};

impl From<MessageRow> for Message {
    fn from(row: MessageRow) -> Self {
        Self {
            id: row.id,
            created_at: row.created_at,
            sender: row.sender,
            target: row.target,
            body: row.body,
            claimed: row.claimed,
            claimed_by: row.claimed_by,
            claimed_at: row.claimed_at,
        }
    }
}

impl From<EventRow> for Event {
    fn from(row: EventRow) -> Self {
        Self {
            id: row.id,
            created_at: row.created_at,
            kind: row.kind,
            tag: row.tag,
            body: row.body,
            agent: row.agent,
        }
    }
}

pub(crate) fn parse_agent_record(row: AgentListingRow) -> Result<AgentRecord> {
    let status = AgentStatus::try_from(row.status.as_str()).map_err(CoordError::Internal)?;

    Ok(AgentRecord {
        name: row.name,
        pid: row.pid,
        status,
        pending: row.pending,
        since: row.created_at,
    })
}

pub(crate) fn parse_task(row: TaskRow) -> Result<Task> {
    let priority =
        TaskPriority::try_from(row.priority.as_str()).map_err(CoordError::Internal)?;
    let status = TaskStatus::try_from(row.status.as_str()).map_err(CoordError::Internal)?;

    Ok(Task {
        id: row.id,
        submitted_by: row.submitted_by,
        task_type: row.task_type,
        problem_id: row.problem_id,
        concern_scope: row.concern_scope,
        payload_path: row.payload_path,
        priority,
        depends_on: row.depends_on,
        status,
        claimed_by: row.claimed_by,
        agent_file: row.agent_file,
        model: row.model,
        output_path: row.output_path,
        created_at: row.created_at,
        claimed_at: row.claimed_at,
        completed_at: row.completed_at,
        error: row.error,
    })
}

pub(crate) fn parse_tasks(rows: Vec<TaskRow>) -> Result<Vec<Task>> {
    rows.into_iter().map(parse_task).collect()
}
