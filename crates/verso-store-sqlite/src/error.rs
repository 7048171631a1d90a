//! Error type for `verso-store-sqlite`.

use thiserror::Error;
use verso_core::OwnerKey;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] verso_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("malformed author columns: {0}")]
  Author(String),

  #[error("version {number} of {owner} not found")]
  VersionNotFound { owner: OwnerKey, number: u32 },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
