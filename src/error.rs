use thiserror::Error;

/// Failure taxonomy shared by every public operation. The variant is the
/// error kind; the message is the caller-facing reason. `Store` hides the
/// driver error behind a generic message and keeps it on the source chain.
#[derive(Debug, Error)]
pub enum Error {
    #[error("authentication required")]
    Unauthenticated,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    Conflict(String),

    #[error("datastore unavailable")]
    Store(#[source] rusqlite::Error),
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(code, _)
                if code.code == rusqlite::ErrorCode::DatabaseBusy
                    || code.code == rusqlite::ErrorCode::DatabaseLocked =>
            {
                Error::Conflict("concurrent write detected, retry the operation".to_string())
            }
            other => Error::Store(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
