#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqliteSynchronous};
use sqlx::{Connection, SqliteConnection};
use tracing::{debug, info, warn};

use super::schema::{REQUIRED_TABLES, SCHEMA};
use crate::config::CoordConfig;
use crate::error::{CoordError, Result};

const MAX_RETRY_BACKOFF: Duration = Duration::from_secs(2);

/// Handle on one coordination store file.
///
/// Holds no open connection: every operation connects, runs one short
/// transaction and drops the connection, so separate processes (or
/// separate handles in one process) contend only through SQLite locks.
pub struct CoordDb {
    path: PathBuf,
    options: SqliteConnectOptions,
    config: CoordConfig,
    schema_ready: Arc<AtomicBool>,
}

impl Clone for CoordDb {
    fn clone(&self) -> Self {
        Self {
            path: self.path.clone(),
            options: self.options.clone(),
            config: self.config.clone(),
            schema_ready: Arc::clone(&self.schema_ready),
        }
    }
}

impl CoordDb {
    #[must_use]
    pub fn open(path: impl AsRef<Path>, config: CoordConfig) -> Self {
        let path = path.as_ref().to_path_buf();
        let options = SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(config.busy_timeout);

        Self {
            path,
            options,
            config,
            schema_ready: Arc::new(AtomicBool::new(false)),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub const fn config(&self) -> &CoordConfig {
        &self.config
    }

    /// Creates every table and index that does not exist yet. Safe to call
    /// any number of times; existing rows are untouched.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or the schema cannot be written.
    pub async fn init(&self) -> Result<()> {
        let mut conn = self.connect_raw().await?;
        self.create_schema(&mut conn).await?;
        info!(path = %self.path.display(), "coordination store initialized");
        Ok(())
    }

    /// Opens a fresh connection, creating the schema on first use.
    pub(crate) async fn connect(&self) -> Result<SqliteConnection> {
        let mut conn = self.connect_raw().await?;
        if !self.schema_ready.load(Ordering::Acquire) {
            if self.schema_present(&mut conn).await? {
                self.schema_ready.store(true, Ordering::Release);
            } else {
                self.create_schema(&mut conn).await?;
            }
        }
        Ok(conn)
    }

    async fn connect_raw(&self) -> Result<SqliteConnection> {
        SqliteConnection::connect_with(&self.options)
            .await
            .map_err(|e| {
                CoordError::DatabaseError(format!(
                    "Failed to open {}: {e}",
                    self.path.display()
                ))
            })
    }

    async fn schema_present(&self, conn: &mut SqliteConnection) -> Result<bool> {
        let mut found = 0_usize;
        for table in REQUIRED_TABLES {
            let exists = sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?",
            )
            .bind(*table)
            .fetch_one(&mut *conn)
            .await
            .map_err(|e| CoordError::DatabaseError(format!("Failed to inspect schema: {e}")))?;
            if exists > 0 {
                found += 1;
            }
        }
        Ok(found == REQUIRED_TABLES.len())
    }

    async fn create_schema(&self, conn: &mut SqliteConnection) -> Result<()> {
        self.begin_immediate(conn).await?;
        for statement in SCHEMA {
            if let Err(e) = sqlx::query(statement).execute(&mut *conn).await {
                rollback(conn).await;
                return Err(CoordError::DatabaseError(format!(
                    "Failed to create schema: {e}"
                )));
            }
        }
        commit(conn).await?;
        self.schema_ready.store(true, Ordering::Release);
        Ok(())
    }

    /// Starts a write transaction, taking the database write lock up front.
    ///
    /// SQLite's busy timeout already waits on contention; if it still
    /// reports busy, retry with doubling backoff up to `lock_retries` times.
    pub(crate) async fn begin_immediate(&self, conn: &mut SqliteConnection) -> Result<()> {
        let mut backoff = self.config.retry_backoff;
        let mut attempt = 0_u32;
        loop {
            match sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await {
                Ok(_) => return Ok(()),
                Err(error) if is_busy(&error) && attempt < self.config.lock_retries => {
                    attempt += 1;
                    warn!(
                        attempt,
                        backoff_ms = u64::try_from(backoff.as_millis()).unwrap_or(u64::MAX),
                        "database busy; retrying BEGIN IMMEDIATE"
                    );
                    tokio::time::sleep(backoff).await;
                    backoff = next_retry_backoff(backoff);
                }
                Err(error) if is_busy(&error) => {
                    return Err(CoordError::Busy(format!(
                        "{} still locked after {attempt} retries: {error}",
                        self.path.display()
                    )));
                }
                Err(error) => {
                    return Err(CoordError::DatabaseError(format!(
                        "Failed to begin transaction: {error}"
                    )));
                }
            }
        }
    }
}

impl std::fmt::Debug for CoordDb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoordDb")
            .field("path", &self.path)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

pub(crate) async fn commit(conn: &mut SqliteConnection) -> Result<()> {
    sqlx::query("COMMIT")
        .execute(&mut *conn)
        .await
        .map(|_| ())
        .map_err(|e| CoordError::DatabaseError(format!("Failed to commit transaction: {e}")))
}

/// Rolls back the open transaction. A failure here is only logged: the
/// caller is already returning the error that caused the rollback, and
/// SQLite discards the transaction when the connection closes anyway.
pub(crate) async fn rollback(conn: &mut SqliteConnection) {
    if let Err(e) = sqlx::query("ROLLBACK").execute(&mut *conn).await {
        debug!("rollback failed: {e}");
    }
}

/// Commits on success, rolls back on error, and hands the outcome back.
pub(crate) async fn finish<T>(conn: &mut SqliteConnection, outcome: Result<T>) -> Result<T> {
    match outcome {
        Ok(value) => commit(conn).await.map(|()| value),
        Err(error) => {
            rollback(conn).await;
            Err(error)
        }
    }
}

/// Mints the next id from the shared sequence. Must run inside the
/// transaction that inserts the row using it.
pub(crate) async fn mint_id(conn: &mut SqliteConnection) -> Result<i64> {
    sqlx::query("INSERT INTO id_seq DEFAULT VALUES")
        .execute(&mut *conn)
        .await
        .map(|result| result.last_insert_rowid())
        .map_err(|e| CoordError::DatabaseError(format!("Failed to mint id: {e}")))
}

fn is_busy(error: &sqlx::Error) -> bool {
    match error {
        sqlx::Error::Database(db_error) => {
            // SQLITE_BUSY (5) and its extended codes, SQLITE_LOCKED (6).
            let busy_code = db_error
                .code()
                .and_then(|code| code.parse::<i32>().ok())
                .is_some_and(|code| matches!(code & 0xff, 5 | 6));
            busy_code || db_error.message().contains("database is locked")
        }
        _ => false,
    }
}

fn next_retry_backoff(current: Duration) -> Duration {
    let doubled_ms = current.as_millis().saturating_mul(2);
    let bounded_ms = doubled_ms.min(MAX_RETRY_BACKOFF.as_millis());
    Duration::from_millis(u64::try_from(bounded_ms).unwrap_or(u64::MAX))
}
