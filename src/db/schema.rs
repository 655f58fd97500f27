/// Tables every store must have before any operation runs.
pub const REQUIRED_TABLES: &[&str] = &["id_seq", "messages", "events", "agents", "tasks"];

/// Idempotent schema, one statement per entry.
///
/// `id_seq` only mints ids: every message, event, agent row and task takes
/// its primary key from it inside the inserting transaction, so ids are
/// unique and totally ordered across tables.
pub const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS id_seq (
        id INTEGER PRIMARY KEY AUTOINCREMENT
    )",
    "CREATE TABLE IF NOT EXISTS messages (
        id INTEGER PRIMARY KEY,
        created_at TEXT NOT NULL,
        sender TEXT,
        target TEXT NOT NULL,
        body TEXT NOT NULL,
        claimed INTEGER NOT NULL DEFAULT 0,
        claimed_by TEXT,
        claimed_at TEXT
    )",
    "CREATE INDEX IF NOT EXISTS idx_messages_target_claimed
        ON messages(target, claimed, id)",
    "CREATE TABLE IF NOT EXISTS events (
        id INTEGER PRIMARY KEY,
        created_at TEXT NOT NULL,
        kind TEXT NOT NULL,
        tag TEXT NOT NULL DEFAULT '',
        body TEXT NOT NULL DEFAULT '',
        agent TEXT NOT NULL DEFAULT ''
    )",
    "CREATE INDEX IF NOT EXISTS idx_events_kind_tag
        ON events(kind, tag, id)",
    "CREATE TABLE IF NOT EXISTS agents (
        id INTEGER PRIMARY KEY,
        created_at TEXT NOT NULL,
        name TEXT NOT NULL,
        pid INTEGER,
        status TEXT NOT NULL
            CHECK (status IN ('running', 'waiting', 'exited', 'cleaned'))
    )",
    "CREATE INDEX IF NOT EXISTS idx_agents_name
        ON agents(name, id)",
    "CREATE TABLE IF NOT EXISTS tasks (
        id INTEGER PRIMARY KEY,
        submitted_by TEXT NOT NULL,
        task_type TEXT NOT NULL,
        problem_id TEXT,
        concern_scope TEXT,
        payload_path TEXT,
        priority TEXT NOT NULL DEFAULT 'normal'
            CHECK (priority IN ('high', 'normal', 'low')),
        depends_on INTEGER,
        status TEXT NOT NULL DEFAULT 'pending'
            CHECK (status IN ('pending', 'running', 'complete', 'failed')),
        claimed_by TEXT,
        agent_file TEXT,
        model TEXT,
        output_path TEXT,
        created_at TEXT NOT NULL,
        claimed_at TEXT,
        completed_at TEXT,
        error TEXT
    )",
    "CREATE INDEX IF NOT EXISTS idx_tasks_status
        ON tasks(status, priority, id)",
];
