//! Error types for `outreach-core`.

use thiserror::Error;

/// Domain-level failures shared by every backend and surface.
///
/// Ownership mismatches are reported as [`Error::NotFound`] so callers
/// cannot probe for resources that belong to someone else.
#[derive(Debug, Error)]
pub enum Error {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("validation error: {0}")]
  Validation(String),

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("storage unavailable: {0}")]
  StorageUnavailable(String),
}

impl Error {
  pub fn validation(msg: impl Into<String>) -> Self { Self::Validation(msg.into()) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
