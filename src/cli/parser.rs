#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]

use std::path::PathBuf;

use super::action::CliAction;
use super::args::{FlagSpec, ParsedArgs};
use super::commands::CliCommand;
use crate::types::{NewTask, TaskPriority, TaskStatus};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CliError {
    #[error("Missing required argument: {}", arg)]
    MissingRequiredArg { arg: String },
    #[error("Unknown command: {}", cmd)]
    UnknownCommand { cmd: String },
    #[error("Unknown flag {} for {}", flag, cmd)]
    UnknownFlag { flag: String, cmd: String },
    #[error("Unexpected argument {} for {}", arg, cmd)]
    UnexpectedArgument { arg: String, cmd: String },
    #[error("Invalid argument value for {}: {}", arg, error)]
    InvalidArgValue { arg: String, error: String },
}

const NO_FLAGS: FlagSpec = FlagSpec {
    values: &[],
    switches: &[],
};

const JSON_ONLY: FlagSpec = FlagSpec {
    values: &[],
    switches: &["json"],
};

/// Parses everything after the program name.
///
/// # Errors
/// Returns a [`CliError`] for unknown commands or flags, missing or surplus
/// positionals, and values that do not parse.
pub fn parse_cli_args(args: &[String]) -> Result<CliAction, CliError> {
    if args
        .get(1)
        .is_some_and(|arg| matches!(arg.as_str(), "-h" | "--help"))
    {
        return Ok(CliAction::ShowHelp);
    }

    let Some(command) = args.first().map(String::as_str) else {
        return Err(CliError::MissingRequiredArg {
            arg: "command".to_string(),
        });
    };
    let rest = &args[1..];

    let parsed = match command {
        "-h" | "--help" | "help" => return Ok(CliAction::ShowHelp),
        "-V" | "-v" | "--version" => return Ok(CliAction::ShowVersion),
        "init" => {
            let mut a = ParsedArgs::split(command, rest, NO_FLAGS)?;
            let db = db_path(&mut a)?;
            a.finish()?;
            CliCommand::Init { db }
        }
        "send" => parse_send(rest)?,
        "recv" => {
            let mut a = ParsedArgs::split(command, rest, NO_FLAGS)?;
            let db = db_path(&mut a)?;
            let name = a.required("name")?;
            let timeout_secs = a.optional_parsed("timeout_seconds")?;
            a.finish()?;
            CliCommand::Recv {
                db,
                name,
                timeout_secs,
            }
        }
        "check" => {
            let mut a = ParsedArgs::split(command, rest, NO_FLAGS)?;
            let db = db_path(&mut a)?;
            let name = a.required("name")?;
            a.finish()?;
            CliCommand::Check { db, name }
        }
        "drain" => {
            let mut a = ParsedArgs::split(command, rest, NO_FLAGS)?;
            let db = db_path(&mut a)?;
            let name = a.required("name")?;
            a.finish()?;
            CliCommand::Drain { db, name }
        }
        "register" => {
            let mut a = ParsedArgs::split(command, rest, NO_FLAGS)?;
            let db = db_path(&mut a)?;
            let name = a.required("name")?;
            let pid = a.optional_parsed("pid")?;
            a.finish()?;
            CliCommand::Register { db, name, pid }
        }
        "unregister" => {
            let mut a = ParsedArgs::split(command, rest, NO_FLAGS)?;
            let db = db_path(&mut a)?;
            let name = a.required("name")?;
            a.finish()?;
            CliCommand::Unregister { db, name }
        }
        "agents" => {
            let mut a = ParsedArgs::split(command, rest, JSON_ONLY)?;
            let db = db_path(&mut a)?;
            let json = a.switch("json");
            a.finish()?;
            CliCommand::Agents { db, json }
        }
        "cleanup" => {
            let mut a = ParsedArgs::split(command, rest, NO_FLAGS)?;
            let db = db_path(&mut a)?;
            let name = a.optional();
            a.finish()?;
            CliCommand::Cleanup { db, name }
        }
        "log" => {
            let mut a = ParsedArgs::split(
                command,
                rest,
                FlagSpec {
                    values: &["agent"],
                    switches: &[],
                },
            )?;
            let db = db_path(&mut a)?;
            let kind = a.required("kind")?;
            let tag = a.optional().unwrap_or_default();
            let body = a.optional().unwrap_or_default();
            let agent = a.value("agent").unwrap_or_default();
            a.finish()?;
            CliCommand::Log {
                db,
                kind,
                tag,
                body,
                agent,
            }
        }
        "tail" => {
            let mut a = ParsedArgs::split(
                command,
                rest,
                FlagSpec {
                    values: &["since", "limit"],
                    switches: &["json"],
                },
            )?;
            let db = db_path(&mut a)?;
            let kind = a.optional();
            let since = a.value_parsed("since")?;
            let limit = positive_limit(&a)?;
            let json = a.switch("json");
            a.finish()?;
            CliCommand::Tail {
                db,
                kind,
                since,
                limit,
                json,
            }
        }
        "query" => {
            let mut a = ParsedArgs::split(
                command,
                rest,
                FlagSpec {
                    values: &["tag", "agent", "since", "limit"],
                    switches: &["json"],
                },
            )?;
            let db = db_path(&mut a)?;
            let kind = a.required("kind")?;
            let tag = a.value("tag");
            let agent = a.value("agent");
            let since = a.value_parsed("since")?;
            let limit = positive_limit(&a)?;
            let json = a.switch("json");
            a.finish()?;
            CliCommand::Query {
                db,
                kind,
                tag,
                agent,
                since,
                limit,
                json,
            }
        }
        "submit-task" => parse_submit_task(rest)?,
        "claim-task" => {
            let mut a = ParsedArgs::split(command, rest, NO_FLAGS)?;
            let db = db_path(&mut a)?;
            let dispatcher = a.required("dispatcher")?;
            let task_id = a.required_parsed("task_id")?;
            a.finish()?;
            CliCommand::ClaimTask {
                db,
                dispatcher,
                task_id,
            }
        }
        "complete-task" => {
            let mut a = ParsedArgs::split(
                command,
                rest,
                FlagSpec {
                    values: &["output"],
                    switches: &[],
                },
            )?;
            let db = db_path(&mut a)?;
            let task_id = a.required_parsed("task_id")?;
            let output = a.value("output");
            a.finish()?;
            CliCommand::CompleteTask {
                db,
                task_id,
                output,
            }
        }
        "fail-task" => {
            let mut a = ParsedArgs::split(
                command,
                rest,
                FlagSpec {
                    values: &["error"],
                    switches: &[],
                },
            )?;
            let db = db_path(&mut a)?;
            let task_id = a.required_parsed("task_id")?;
            let error = a.value("error");
            a.finish()?;
            CliCommand::FailTask { db, task_id, error }
        }
        "list-tasks" => {
            let mut a = ParsedArgs::split(
                command,
                rest,
                FlagSpec {
                    values: &["status", "type"],
                    switches: &["json"],
                },
            )?;
            let db = db_path(&mut a)?;
            let status = a.value_parsed::<TaskStatus>("status")?;
            let task_type = a.value("type");
            let json = a.switch("json");
            a.finish()?;
            CliCommand::ListTasks {
                db,
                status,
                task_type,
                json,
            }
        }
        "next-task" => {
            let mut a = ParsedArgs::split(command, rest, JSON_ONLY)?;
            let db = db_path(&mut a)?;
            let json = a.switch("json");
            a.finish()?;
            CliCommand::NextTask { db, json }
        }
        "route-task" => {
            let mut a = ParsedArgs::split(command, rest, NO_FLAGS)?;
            let db = db_path(&mut a)?;
            let task_id = a.required_parsed("task_id")?;
            let agent_file = a.required("agent_file")?;
            let model = a.required("model")?;
            a.finish()?;
            CliCommand::RouteTask {
                db,
                task_id,
                agent_file,
                model,
            }
        }
        "pipeline-state" => {
            let mut a = ParsedArgs::split(
                command,
                rest,
                FlagSpec {
                    values: &["agent"],
                    switches: &[],
                },
            )?;
            let db = db_path(&mut a)?;
            let state = a.optional();
            let agent = a.value("agent").unwrap_or_default();
            a.finish()?;
            CliCommand::PipelineState { db, state, agent }
        }
        cmd => {
            return Err(CliError::UnknownCommand {
                cmd: cmd.to_string(),
            })
        }
    };

    Ok(CliAction::Command(parsed))
}

fn parse_send(rest: &[String]) -> Result<CliCommand, CliError> {
    let mut a = ParsedArgs::split(
        "send",
        rest,
        FlagSpec {
            values: &["from"],
            switches: &[],
        },
    )?;
    let db = db_path(&mut a)?;
    let target = a.required("target")?;
    let words = a.rest();
    let message = (!words.is_empty()).then(|| words.join(" "));
    Ok(CliCommand::Send {
        db,
        target,
        from: a.value("from"),
        message,
    })
}

fn parse_submit_task(rest: &[String]) -> Result<CliCommand, CliError> {
    let mut a = ParsedArgs::split(
        "submit-task",
        rest,
        FlagSpec {
            values: &["problem", "scope", "payload", "priority", "depends-on"],
            switches: &[],
        },
    )?;
    let db = db_path(&mut a)?;
    let submitted_by = a.required("submitted_by")?;
    let task_type = a.required("task_type")?;

    let mut task = NewTask::new(submitted_by, task_type)
        .with_priority(a.value_parsed::<TaskPriority>("priority")?.unwrap_or_default());
    task.problem_id = a.value("problem");
    task.concern_scope = a.value("scope");
    task.payload_path = a.value("payload");
    task.depends_on = a.value_parsed("depends-on")?;
    a.finish()?;

    Ok(CliCommand::SubmitTask { db, task })
}

fn db_path(args: &mut ParsedArgs) -> Result<PathBuf, CliError> {
    args.required("db").map(PathBuf::from)
}

fn positive_limit(args: &ParsedArgs) -> Result<Option<i64>, CliError> {
    match args.value_parsed::<i64>("limit")? {
        Some(limit) if limit <= 0 => Err(CliError::InvalidArgValue {
            arg: "--limit".to_string(),
            error: format!("must be positive, got {limit}"),
        }),
        limit => Ok(limit),
    }
}
