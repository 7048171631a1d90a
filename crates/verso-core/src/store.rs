//! The `VersionStore` trait.
//!
//! The trait is implemented by storage backends (e.g. `verso-store-sqlite`).
//! The reconstructor, resolver and reverter depend on this abstraction, not
//! on any concrete backend.

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  owner::OwnerKey,
  version::{NewVersion, Version},
};

/// Abstraction over the ordered, append-only version relation.
///
/// Versions are keyed by owner plus number. Every method returns a `Send`
/// future so the trait can be used in multi-threaded async runtimes.
pub trait VersionStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Writes ────────────────────────────────────────────────────────────

  /// Persist a new version numbered one past the owner's current maximum.
  ///
  /// Reading the maximum and inserting the row happen atomically per owner,
  /// so concurrent writers can never produce two versions with the same
  /// number.
  fn append(
    &self,
    input: NewVersion,
  ) -> impl Future<Output = Result<Version, Self::Error>> + Send + '_;

  /// Rewrite a version's `created_at`. Used to backdate history for
  /// reordering; nothing else about a version is ever changed.
  fn set_created_at<'a>(
    &'a self,
    owner: &'a OwnerKey,
    number: u32,
    created_at: DateTime<Utc>,
  ) -> impl Future<Output = Result<Version, Self::Error>> + Send + 'a;

  // ── Reads ─────────────────────────────────────────────────────────────

  /// The highest-numbered version, if any.
  fn latest<'a>(
    &'a self,
    owner: &'a OwnerKey,
  ) -> impl Future<Output = Result<Option<Version>, Self::Error>> + Send + 'a;

  fn by_number<'a>(
    &'a self,
    owner: &'a OwnerKey,
    number: u32,
  ) -> impl Future<Output = Result<Option<Version>, Self::Error>> + Send + 'a;

  /// Look a version up by its handle id, regardless of owner.
  fn by_id(
    &self,
    version_id: Uuid,
  ) -> impl Future<Output = Result<Option<Version>, Self::Error>> + Send + '_;

  /// The highest-numbered version carrying `tag`.
  fn by_tag<'a>(
    &'a self,
    owner: &'a OwnerKey,
    tag: &'a str,
  ) -> impl Future<Output = Result<Option<Version>, Self::Error>> + Send + 'a;

  /// The version with the greatest `created_at <= at`, ties broken by the
  /// greatest number. When every version is newer than `at`, the earliest
  /// version is returned instead.
  fn at_or_before<'a>(
    &'a self,
    owner: &'a OwnerKey,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<Option<Version>, Self::Error>> + Send + 'a;

  /// Every version, ascending by number.
  fn all<'a>(
    &'a self,
    owner: &'a OwnerKey,
  ) -> impl Future<Output = Result<Vec<Version>, Self::Error>> + Send + 'a;

  /// The latest version's number, or `0` when there is no history yet.
  fn current_number<'a>(
    &'a self,
    owner: &'a OwnerKey,
  ) -> impl Future<Output = Result<u32, Self::Error>> + Send + 'a {
    async move { Ok(self.latest(owner).await?.map_or(0, |v| v.number)) }
  }
}
