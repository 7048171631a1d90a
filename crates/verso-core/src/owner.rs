//! Owner keys and authors.
//!
//! One version relation serves many kinds of tracked record, so ownership is
//! keyed by a `(kind, id)` pair rather than a single foreign key.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifies the record a version history belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OwnerKey {
  /// The kind of record, e.g. `"user"` or `"article"`.
  pub kind: String,
  /// The record's identifier, unique within `kind`.
  pub id:   String,
}

impl OwnerKey {
  pub fn new(kind: impl Into<String>, id: impl Into<String>) -> Self {
    Self { kind: kind.into(), id: id.into() }
  }
}

impl fmt::Display for OwnerKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}/{}", self.kind, self.id)
  }
}

/// Whoever caused a change.
///
/// Either a reference to another tracked record (a user row, a service
/// account, ...) or a free-text name when no such record exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Author {
  Record(OwnerKey),
  Name(String),
}

impl From<OwnerKey> for Author {
  fn from(key: OwnerKey) -> Self { Self::Record(key) }
}

impl From<&str> for Author {
  fn from(name: &str) -> Self { Self::Name(name.to_owned()) }
}

impl From<String> for Author {
  fn from(name: String) -> Self { Self::Name(name) }
}
