#![forbid(unsafe_code)]

use rusqlite::ErrorCode;

#[derive(Debug)]
pub enum StoreError {
    Io(std::io::Error),
    Sql(rusqlite::Error),
    InvalidInput(&'static str),
    /// A stored row no longer decodes into the model.
    Corrupt(&'static str),
    UnknownId,
    RevisionMismatch {
        expected: i64,
        actual: i64,
    },
    InvalidTemplate {
        template: String,
    },
    AlreadyAssigned {
        post_id: String,
        department: String,
        original: bool,
    },
    InvalidTransition {
        task_id: String,
        from: &'static str,
        to: &'static str,
        reason: String,
    },
}

impl StoreError {
    /// Busy/locked database and I/O failures clear up on their own; retrying is safe.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Io(_) => true,
            Self::Sql(rusqlite::Error::SqliteFailure(err, _)) => matches!(
                err.code,
                ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked | ErrorCode::CannotOpen
            ),
            _ => false,
        }
    }
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "io: {err}"),
            Self::Sql(err) => write!(f, "sqlite: {err}"),
            Self::InvalidInput(message) => write!(f, "invalid input: {message}"),
            Self::Corrupt(message) => write!(f, "corrupt store data: {message}"),
            Self::UnknownId => write!(f, "unknown id"),
            Self::RevisionMismatch { expected, actual } => {
                write!(
                    f,
                    "revision mismatch (expected={expected}, actual={actual})"
                )
            }
            Self::InvalidTemplate { template } => {
                write!(f, "template '{template}' assigns no departments")
            }
            Self::AlreadyAssigned {
                post_id,
                department,
                original,
            } => {
                let provenance = if *original { "original" } else { "escalated" };
                write!(
                    f,
                    "department {department} already has an {provenance} task on {post_id}"
                )
            }
            Self::InvalidTransition {
                task_id,
                from,
                to,
                reason,
            } => write!(
                f,
                "invalid transition for {task_id} ({from} -> {to}): {reason}"
            ),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<std::io::Error> for StoreError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sql(value)
    }
}
