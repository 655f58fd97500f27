#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]

use std::path::{Path, PathBuf};

use crate::types::{NewTask, TaskStatus};

/// One parsed subcommand. Every variant names the store file first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliCommand {
    Init {
        db: PathBuf,
    },
    Send {
        db: PathBuf,
        target: String,
        from: Option<String>,
        /// `None` means read the body from stdin.
        message: Option<String>,
    },
    Recv {
        db: PathBuf,
        name: String,
        /// `None` or `Some(0)` waits forever.
        timeout_secs: Option<u64>,
    },
    Check {
        db: PathBuf,
        name: String,
    },
    Drain {
        db: PathBuf,
        name: String,
    },
    Register {
        db: PathBuf,
        name: String,
        pid: Option<i64>,
    },
    Unregister {
        db: PathBuf,
        name: String,
    },
    Agents {
        db: PathBuf,
        json: bool,
    },
    Cleanup {
        db: PathBuf,
        name: Option<String>,
    },
    Log {
        db: PathBuf,
        kind: String,
        tag: String,
        body: String,
        agent: String,
    },
    Tail {
        db: PathBuf,
        kind: Option<String>,
        since: Option<i64>,
        limit: Option<i64>,
        json: bool,
    },
    Query {
        db: PathBuf,
        kind: String,
        tag: Option<String>,
        agent: Option<String>,
        since: Option<i64>,
        limit: Option<i64>,
        json: bool,
    },
    SubmitTask {
        db: PathBuf,
        task: NewTask,
    },
    ClaimTask {
        db: PathBuf,
        dispatcher: String,
        task_id: i64,
    },
    CompleteTask {
        db: PathBuf,
        task_id: i64,
        output: Option<String>,
    },
    FailTask {
        db: PathBuf,
        task_id: i64,
        error: Option<String>,
    },
    ListTasks {
        db: PathBuf,
        status: Option<TaskStatus>,
        task_type: Option<String>,
        json: bool,
    },
    NextTask {
        db: PathBuf,
        json: bool,
    },
    RouteTask {
        db: PathBuf,
        task_id: i64,
        agent_file: String,
        model: String,
    },
    PipelineState {
        db: PathBuf,
        state: Option<String>,
        agent: String,
    },
}

impl CliCommand {
    /// Store file the command operates on.
    #[must_use]
    pub fn db(&self) -> &Path {
        match self {
            Self::Init { db }
            | Self::Send { db, .. }
            | Self::Recv { db, .. }
            | Self::Check { db, .. }
            | Self::Drain { db, .. }
            | Self::Register { db, .. }
            | Self::Unregister { db, .. }
            | Self::Agents { db, .. }
            | Self::Cleanup { db, .. }
            | Self::Log { db, .. }
            | Self::Tail { db, .. }
            | Self::Query { db, .. }
            | Self::SubmitTask { db, .. }
            | Self::ClaimTask { db, .. }
            | Self::CompleteTask { db, .. }
            | Self::FailTask { db, .. }
            | Self::ListTasks { db, .. }
            | Self::NextTask { db, .. }
            | Self::RouteTask { db, .. }
            | Self::PipelineState { db, .. } => db,
        }
    }
}

pub const HELP_TEXT: &str = "\
coord - SQLite-backed coordination for local agent pipelines

USAGE:
    coord <command> <db> [args]

MAILBOX:
    send    <db> <target> [--from agent] [msg...]   body from stdin when msg is omitted
    recv    <db> <name> [timeout_seconds]           prints body, or TIMEOUT (exit 1); 0 waits forever
    check   <db> <name>                             count of pending messages
    drain   <db> <name>                             bodies separated by ---

REGISTRY:
    register   <db> <name> [pid]
    unregister <db> <name>
    agents     <db> [--json]
    cleanup    <db> [name]

EVENTS:
    log   <db> <kind> [tag] [body] [--agent a]
    tail  <db> [kind] [--since id] [--limit n] [--json]
    query <db> <kind> [--tag t] [--agent a] [--since id] [--limit n] [--json]
    pipeline-state <db> [state] [--agent a]

TASKS:
    submit-task   <db> <submitted_by> <task_type> [--problem p] [--scope s]
                  [--payload path] [--priority high|normal|low] [--depends-on id]
    claim-task    <db> <dispatcher> <task_id>
    complete-task <db> <task_id> [--output path]
    fail-task     <db> <task_id> [--error msg]
    route-task    <db> <task_id> <agent_file> <model>
    list-tasks    <db> [--status s] [--type t] [--json]
    next-task     <db> [--json]

OTHER:
    init <db>        create the store (safe to repeat)
    -h, --help       show this help
    -V, --version    show version

ENVIRONMENT:
    COORD_LOG                log filter (falls back to RUST_LOG, default warn)
    COORD_BUSY_TIMEOUT_MS    SQLite busy timeout (default 5000)
    COORD_POLL_INTERVAL_MS   recv poll interval (default 500)
    COORD_LOCK_RETRIES       retries after busy timeout (default 5)
    COORD_RETRY_BACKOFF_MS   first retry backoff (default 50)
";
