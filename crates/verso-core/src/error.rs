//! Error types for `verso-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// A stored diff could not be decoded into `{ field: [old, new] }`.
  #[error("malformed diff: {0}")]
  MalformedDiff(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),

  /// A failure reported by a [`VersionStore`](crate::store::VersionStore)
  /// backend, passed through unchanged.
  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Wrap a backend error.
  pub fn store<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(err))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
