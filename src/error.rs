#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]

use thiserror::Error;

/// Error code constants for type-safe error handling
pub mod code {
    pub const NOTFOUND: &str = "NOTFOUND";
    pub const INVALID: &str = "INVALID";
    pub const CONFLICT: &str = "CONFLICT";
    pub const BUSY: &str = "BUSY";
    pub const INTERNAL: &str = "INTERNAL";
}

#[derive(Error, Debug)]
pub enum CoordError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Database busy: {0}")]
    Busy(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoordError {
    /// Returns the protocol error code for this error
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::ConfigError(_) | Self::InvalidValue(_) | Self::SerializationError(_) => {
                code::INVALID
            }
            Self::DatabaseError(_) | Self::IoError(_) | Self::Internal(_) => code::INTERNAL,
            Self::Busy(_) => code::BUSY,
            Self::PreconditionFailed(_) => code::CONFLICT,
            Self::NotFound(_) => code::NOTFOUND,
        }
    }

    /// Returns the exit code for this error.
    ///
    /// Failed state transitions exit 1 so that callers can treat them the
    /// same way as a lost claim; everything else gets a distinct code.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::PreconditionFailed(_) | Self::NotFound(_) => 1,
            Self::ConfigError(_) | Self::InvalidValue(_) => 2,
            Self::DatabaseError(_) => 3,
            Self::Busy(_) => 4,
            Self::IoError(_) => 7,
            Self::SerializationError(_) => 8,
            Self::Internal(_) => 9,
        }
    }
}

/// Protocol error codes as documented in the CLI
pub const ERROR_CODES: &[(&str, &str, &str)] = &[
    (
        code::NOTFOUND,
        "Resource was not found",
        "List tasks and verify the identifier",
    ),
    (
        code::INVALID,
        "Invalid argument or configuration value",
        "Check priority/status spelling and COORD_* variables",
    ),
    (
        code::CONFLICT,
        "Conflicting state transition",
        "Run list-tasks to inspect the current status",
    ),
    (
        code::BUSY,
        "Database stayed locked past the retry budget",
        "Raise COORD_BUSY_TIMEOUT_MS or COORD_LOCK_RETRIES and retry",
    ),
    (
        code::INTERNAL,
        "Unexpected internal failure",
        "Inspect logs and retry command",
    ),
];

/// Get error code details (description and fix) for a given error code
#[must_use]
pub fn get_error_info(error_code: &str) -> Option<(&'static str, &'static str)> {
    ERROR_CODES
        .iter()
        .find(|(code, _, _)| *code == error_code)
        .map(|(_, desc, fix)| (*desc, *fix))
}

pub type Result<T> = std::result::Result<T, CoordError>;
