//! Error type for `outreach-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] outreach_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("unexpected column value: {0}")]
  Decode(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Whether `err` is a UNIQUE constraint violation.
pub(crate) fn is_unique_violation(err: &tokio_rusqlite::Error) -> bool {
  match err {
    tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(e, _)) => {
      e.code == rusqlite::ErrorCode::ConstraintViolation
        && e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    }
    _ => false,
  }
}

impl From<Error> for outreach_core::Error {
  fn from(err: Error) -> Self {
    match err {
      Error::Core(e) => e,
      Error::Database(tokio_rusqlite::Error::ConnectionClosed) => {
        Self::StorageUnavailable("database connection closed".to_owned())
      }
      Error::Database(e) if is_unique_violation(&e) => Self::Conflict(e.to_string()),
      Error::Database(e) => Self::StorageUnavailable(e.to_string()),
      Error::DateParse(m) | Error::Decode(m) => {
        Self::StorageUnavailable(format!("corrupt row: {m}"))
      }
    }
  }
}
