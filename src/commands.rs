#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]

use std::time::Duration;

use tokio::io::AsyncReadExt;
use tracing::debug;

use crate::cli::CliCommand;
use crate::config::CoordConfig;
use crate::db::CoordDb;
use crate::error::Result;
use crate::output::{
    render_agent, render_drain, render_event, render_json_lines, render_lines, render_next_task,
    render_task,
};
use crate::types::{Event, EventFilter, RecvOutcome};

pub const TIMEOUT_SENTINEL: &str = "TIMEOUT";
pub const NO_AGENTS: &str = "No agents registered";
pub const NO_TASKS: &str = "NO_TASKS";
pub const NO_RUNNABLE_TASKS: &str = "NO_RUNNABLE_TASKS";

/// What a command prints on stdout and the exit code it ends with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub exit_code: i32,
}

impl CommandOutput {
    fn ok(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            exit_code: 0,
        }
    }

    fn negative(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            exit_code: 1,
        }
    }
}

/// Runs one command against the store it names.
///
/// # Errors
/// Propagates store errors; the caller maps them to an exit code.
pub async fn execute(command: CliCommand, config: &CoordConfig) -> Result<CommandOutput> {
    let db = CoordDb::open(command.db(), config.clone());
    debug!(?command, "executing");

    match command {
        CliCommand::Init { db: path } => {
            db.init().await?;
            Ok(CommandOutput::ok(format!("initialized:{}", path.display())))
        }
        CliCommand::Send {
            target,
            from,
            message,
            ..
        } => {
            let body = match message {
                Some(message) => message,
                None => read_stdin_body().await?,
            };
            let id = db.send(&target, &body, from.as_deref()).await?;
            Ok(CommandOutput::ok(format!("sent:{target}:{id}")))
        }
        CliCommand::Recv {
            name, timeout_secs, ..
        } => {
            // 0 waits forever, like no timeout at all.
            let timeout = timeout_secs
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs);
            match db.recv(&name, timeout).await? {
                RecvOutcome::Delivered(message) => Ok(CommandOutput::ok(message.body)),
                RecvOutcome::TimedOut => Ok(CommandOutput::negative(TIMEOUT_SENTINEL)),
            }
        }
        CliCommand::Check { name, .. } => Ok(CommandOutput::ok(db.check(&name).await?.to_string())),
        CliCommand::Drain { name, .. } => {
            let drained = db.drain(&name).await?;
            Ok(CommandOutput::ok(render_drain(&drained)))
        }
        CliCommand::Register { name, pid, .. } => {
            let pid = pid.or_else(invoking_parent_pid);
            db.register(&name, pid).await?;
            Ok(CommandOutput::ok(format!(
                "registered:{name}:{}",
                pid.map_or_else(|| "none".to_string(), |pid| pid.to_string())
            )))
        }
        CliCommand::Unregister { name, .. } => {
            db.unregister(&name).await?;
            Ok(CommandOutput::ok(format!("unregistered:{name}")))
        }
        CliCommand::Agents { json, .. } => {
            let agents = db.list_agents().await?;
            if json {
                Ok(CommandOutput::ok(render_json_lines(&agents)?))
            } else if agents.is_empty() {
                Ok(CommandOutput::ok(NO_AGENTS))
            } else {
                Ok(CommandOutput::ok(render_lines(&agents, render_agent)))
            }
        }
        CliCommand::Cleanup { name, .. } => {
            db.cleanup(name.as_deref()).await?;
            Ok(CommandOutput::ok(format!(
                "cleaned:{}",
                name.as_deref().unwrap_or("all")
            )))
        }
        CliCommand::Log {
            kind,
            tag,
            body,
            agent,
            ..
        } => {
            let id = db.log(&kind, &tag, &body, &agent).await?;
            Ok(CommandOutput::ok(format!("logged:{id}:{kind}:{tag}")))
        }
        CliCommand::Tail {
            kind,
            since,
            limit,
            json,
            ..
        } => {
            let filter = EventFilter {
                kind,
                since,
                limit,
                ..EventFilter::default()
            };
            events_output(&db.tail(&filter).await?, json)
        }
        CliCommand::Query {
            kind,
            tag,
            agent,
            since,
            limit,
            json,
            ..
        } => {
            let filter = EventFilter {
                kind: Some(kind),
                tag,
                agent,
                since,
                limit,
            };
            events_output(&db.query(&filter).await?, json)
        }
        CliCommand::SubmitTask { task, .. } => {
            let id = db.submit_task(&task).await?;
            Ok(CommandOutput::ok(format!("task:{id}")))
        }
        CliCommand::ClaimTask {
            dispatcher,
            task_id,
            ..
        } => {
            db.claim_task(&dispatcher, task_id).await?;
            Ok(CommandOutput::ok(format!("claimed:{task_id}")))
        }
        CliCommand::CompleteTask {
            task_id, output, ..
        } => {
            db.complete_task(task_id, output.as_deref()).await?;
            Ok(CommandOutput::ok(format!("completed:{task_id}")))
        }
        CliCommand::FailTask { task_id, error, .. } => {
            db.fail_task(task_id, error.as_deref()).await?;
            Ok(CommandOutput::ok(format!("failed:{task_id}")))
        }
        CliCommand::ListTasks {
            status,
            task_type,
            json,
            ..
        } => {
            let tasks = db.list_tasks(status, task_type.as_deref()).await?;
            if json {
                Ok(CommandOutput::ok(render_json_lines(&tasks)?))
            } else if tasks.is_empty() {
                Ok(CommandOutput::ok(NO_TASKS))
            } else {
                Ok(CommandOutput::ok(render_lines(&tasks, render_task)))
            }
        }
        CliCommand::NextTask { json, .. } => match db.next_runnable().await? {
            None => Ok(CommandOutput::ok(NO_RUNNABLE_TASKS)),
            Some(task) if json => Ok(CommandOutput::ok(render_json_lines(&[task])?)),
            Some(task) => Ok(CommandOutput::ok(render_next_task(&task))),
        },
        CliCommand::RouteTask {
            task_id,
            agent_file,
            model,
            ..
        } => {
            db.record_task_routing(task_id, &agent_file, &model).await?;
            Ok(CommandOutput::ok(format!("routed:{task_id}")))
        }
        CliCommand::PipelineState { state, agent, .. } => match state {
            Some(state) => {
                db.set_pipeline_state(&state, &agent).await?;
                Ok(CommandOutput::ok(format!("pipeline-state:{state}")))
            }
            None => Ok(CommandOutput::ok(db.pipeline_state().await?)),
        },
    }
}

fn events_output(events: &[Event], json: bool) -> Result<CommandOutput> {
    if json {
        Ok(CommandOutput::ok(render_json_lines(events)?))
    } else {
        Ok(CommandOutput::ok(render_lines(events, render_event)))
    }
}

async fn read_stdin_body() -> Result<String> {
    let mut body = String::new();
    tokio::io::stdin().read_to_string(&mut body).await?;
    let trimmed = body.trim_end_matches(['\n', '\r']).len();
    body.truncate(trimmed);
    Ok(body)
}

/// The process that invoked `coord`, typically the agent's shell.
#[cfg(unix)]
fn invoking_parent_pid() -> Option<i64> {
    Some(i64::from(std::os::unix::process::parent_id()))
}

#[cfg(not(unix))]
const fn invoking_parent_pid() -> Option<i64> {
    None
}
