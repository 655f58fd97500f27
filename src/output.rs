#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]

//! Text renderings of store rows. Stdout is the machine-readable contract,
//! so these formats are stable.

use chrono::{DateTime, SecondsFormat, Utc};
use itertools::Itertools;
use serde::Serialize;

use crate::error::Result;
use crate::types::{AgentRecord, Event, Message, Task};

pub const DRAIN_SEPARATOR: &str = "\n---\n";

#[must_use]
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// `id|ts|kind|tag|body|agent`
#[must_use]
pub fn render_event(event: &Event) -> String {
    format!(
        "{}|{}|{}|{}|{}|{}",
        event.id,
        format_timestamp(&event.created_at),
        event.kind,
        event.tag,
        event.body,
        event.agent
    )
}

#[must_use]
pub fn render_agent(agent: &AgentRecord) -> String {
    format!(
        "{} | pid={} | status={} | pending={} | since={}",
        agent.name,
        agent.pid.map_or_else(|| "none".to_string(), |pid| pid.to_string()),
        agent.status,
        agent.pending,
        format_timestamp(&agent.since)
    )
}

/// Full row for `list-tasks`: fixed fields, then whichever optional
/// fields are set.
#[must_use]
pub fn render_task(task: &Task) -> String {
    let mut fields = vec![
        format!("id={}", task.id),
        format!("type={}", task.task_type),
        format!("by={}", task.submitted_by),
        format!("prio={}", task.priority),
        format!("status={}", task.status),
    ];
    fields.extend(optional_fields(&[
        ("problem", task.problem_id.as_deref()),
        ("scope", task.concern_scope.as_deref()),
        ("payload", task.payload_path.as_deref()),
    ]));
    if let Some(dependency) = task.depends_on {
        fields.push(format!("depends_on={dependency}"));
    }
    fields.extend(optional_fields(&[
        ("claimed_by", task.claimed_by.as_deref()),
        ("agent_file", task.agent_file.as_deref()),
        ("model", task.model.as_deref()),
        ("output", task.output_path.as_deref()),
        ("error", task.error.as_deref()),
    ]));
    fields.join(" | ")
}

/// Dispatcher-facing row for `next-task`.
#[must_use]
pub fn render_next_task(task: &Task) -> String {
    let mut fields = vec![
        format!("id={}", task.id),
        format!("type={}", task.task_type),
        format!("by={}", task.submitted_by),
        format!("prio={}", task.priority),
    ];
    fields.extend(optional_fields(&[
        ("problem", task.problem_id.as_deref()),
        ("scope", task.concern_scope.as_deref()),
        ("payload", task.payload_path.as_deref()),
    ]));
    if let Some(dependency) = task.depends_on {
        fields.push(format!("depends_on={dependency}"));
    }
    fields.join(" | ")
}

/// Bodies joined by a `---` line. An empty drain renders as nothing.
#[must_use]
pub fn render_drain(messages: &[Message]) -> String {
    messages
        .iter()
        .map(|message| message.body.as_str())
        .join(DRAIN_SEPARATOR)
}

#[must_use]
pub fn render_lines<T>(items: &[T], render: impl Fn(&T) -> String) -> String {
    items.iter().map(render).join("\n")
}

/// One JSON object per line.
///
/// # Errors
/// Returns an error if an item fails to serialize.
pub fn render_json_lines<T: Serialize>(items: &[T]) -> Result<String> {
    let lines = items
        .iter()
        .map(serde_json::to_string)
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(lines.join("\n"))
}

fn optional_fields(fields: &[(&str, Option<&str>)]) -> Vec<String> {
    fields
        .iter()
        .filter_map(|(key, value)| value.map(|v| format!("{key}={v}")))
        .collect()
}
