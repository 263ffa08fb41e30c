use rusqlite::ffi::ErrorCode;

use crate::models::{Role, TrackKind};

/// Errors surfaced by the repository layer.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl StorageError {
    /// True when the underlying failure is a uniqueness/constraint violation,
    /// e.g. the partial unique index guarding "one in_work ticket per staff
    /// member per track" fired on a racing claim.
    pub fn is_constraint_violation(&self) -> bool {
        let StorageError::Sqlite(rusqlite::Error::SqliteFailure(err, _)) = self else {
            return false;
        };
        err.code == ErrorCode::ConstraintViolation
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Denials and faults reported by the workflow engine. Precondition variants
/// carry no state change; `Storage` aborts the operation with nothing
/// half-written (track updates are single guarded statements).
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("ticket #{0} not found")]
    TicketNotFound(i64),

    #[error("the {0} track of ticket #{1} is already closed")]
    AlreadyClosed(TrackKind, i64),

    #[error("the {0} track of ticket #{1} is already in work")]
    AlreadyInWork(TrackKind, i64),

    #[error("you already have a ticket in work")]
    ActiveTicketExists,

    #[error("you have no ticket in work")]
    NoActiveTicket,

    #[error("the {0} track of ticket #{1} is not closed")]
    NotClosed(TrackKind, i64),

    #[error("only the staff member who closed this track may reopen it")]
    NotTheCloser,

    #[error("the {0} role may not perform this operation")]
    NotPermitted(Role),

    #[error("storage failure: {0}")]
    Storage(#[from] StorageError),
}
