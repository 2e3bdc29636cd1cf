use rusqlite::ErrorCode;
use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

/// Every failure a data source can report. Callers get these as values;
/// nothing below the `NotesDataSource` boundary panics on bad input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Duplicate email or id at registration.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("user {user_id} is not an owner of note {note_id}")]
    NotOwner { user_id: String, note_id: String },

    /// The store rejected a write (missing owner, empty owner set, ...).
    #[error("constraint violation: {0}")]
    Constraint(String),

    /// Connection, lock or I/O failure. The only kind worth retrying.
    #[error("storage unavailable: {0}")]
    Transient(String),
}

impl StoreError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Transient(_))
    }

    pub(crate) fn not_owner(user_id: &str, note_id: &str) -> Self {
        StoreError::NotOwner {
            user_id: user_id.to_string(),
            note_id: note_id.to_string(),
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match err.sqlite_error_code() {
            Some(ErrorCode::ConstraintViolation) => StoreError::Constraint(err.to_string()),
            _ => StoreError::Transient(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Transient(format!("document encoding failed: {}", err))
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Transient(err.to_string())
    }
}

impl From<tokio::task::JoinError> for StoreError {
    fn from(err: tokio::task::JoinError) -> Self {
        StoreError::Transient(format!("storage task failed: {}", err))
    }
}

/// True for a UNIQUE or PRIMARY KEY violation, as opposed to a foreign-key
/// or NOT NULL failure.
pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(e, _) => matches!(
            e.extended_code,
            rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE | rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
        ),
        _ => false,
    }
}
