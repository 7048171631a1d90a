//! Version records — one immutable diff plus metadata, numbered per owner.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  modification::Modifications,
  owner::{Author, OwnerKey},
};

/// A persisted version.
///
/// `number` is unique within `owner` and strictly increases in creation
/// order. Versions are never mutated after creation except for backdating
/// `created_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Version {
  pub version_id:    Uuid,
  pub owner:         OwnerKey,
  pub number:        u32,
  pub modifications: Modifications,
  pub author:        Option<Author>,
  /// The version number this change was produced by reverting to.
  pub reverted_from: Option<u32>,
  pub tag:           Option<String>,
  pub created_at:    DateTime<Utc>,
  pub updated_at:    DateTime<Utc>,
}

impl Version {
  /// A lightweight handle to this version, usable as a revert target.
  pub fn handle(&self) -> VersionRef {
    VersionRef {
      version_id: self.version_id,
      owner:      self.owner.clone(),
      number:     self.number,
    }
  }
}

/// A handle to a stored version. Resolving it checks that the version still
/// exists and belongs to the record being reverted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRef {
  pub version_id: Uuid,
  pub owner:      OwnerKey,
  pub number:     u32,
}

/// Input for [`VersionStore::append`](crate::store::VersionStore::append).
/// The number and timestamps are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewVersion {
  pub owner:         OwnerKey,
  pub modifications: Modifications,
  pub author:        Option<Author>,
  pub reverted_from: Option<u32>,
  pub tag:           Option<String>,
}

impl NewVersion {
  /// Convenience constructor with all optional fields unset.
  pub fn new(owner: OwnerKey, modifications: Modifications) -> Self {
    Self {
      owner,
      modifications,
      author: None,
      reverted_from: None,
      tag: None,
    }
  }
}
