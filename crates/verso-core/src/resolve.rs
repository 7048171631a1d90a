//! Turning a caller-supplied revert target into a concrete version number.
//!
//! Resolution never fails loudly: an unusable target resolves to `None` and
//! callers treat that as "do nothing". Only store errors are returned.

use std::ops::{Range, RangeInclusive};

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::{
  owner::OwnerKey,
  store::VersionStore,
  version::{Version, VersionRef},
};

/// Anything a caller may name as a point in a record's history.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
  /// A version number; valid when `1 <= n <= latest`.
  Number(i64),
  /// The version current at this instant.
  Time(DateTime<Utc>),
  /// A handle to a stored version of the same record.
  Version(VersionRef),
  /// The newest version carrying this tag.
  Tag(String),
  /// A span of versions. Never a valid single target.
  Range(RangeInclusive<i64>),
  /// No target was given.
  Missing,
}

impl Target {
  /// Interpret free-form text, e.g. a query-string parameter.
  ///
  /// Integers become [`Target::Number`], RFC 3339 timestamps become
  /// [`Target::Time`], `a..b` / `a..=b` become [`Target::Range`], blank
  /// input is [`Target::Missing`] and anything else is a [`Target::Tag`].
  pub fn parse(s: &str) -> Self {
    let s = s.trim();
    if s.is_empty() {
      return Self::Missing;
    }
    if let Ok(n) = s.parse::<i64>() {
      return Self::Number(n);
    }
    if let Ok(at) = DateTime::parse_from_rfc3339(s) {
      return Self::Time(at.with_timezone(&Utc));
    }
    if let Some(range) = parse_range(s) {
      return Self::Range(range);
    }
    Self::Tag(s.to_owned())
  }
}

fn parse_range(s: &str) -> Option<RangeInclusive<i64>> {
  if let Some((start, end)) = s.split_once("..=") {
    return Some(start.trim().parse().ok()?..=end.trim().parse().ok()?);
  }
  let (start, end) = s.split_once("..")?;
  let start: i64 = start.trim().parse().ok()?;
  let end: i64 = end.trim().parse().ok()?;
  Some(start..=end.saturating_sub(1))
}

impl From<i64> for Target {
  fn from(n: i64) -> Self { Self::Number(n) }
}

impl From<i32> for Target {
  fn from(n: i32) -> Self { Self::Number(n.into()) }
}

impl From<u32> for Target {
  fn from(n: u32) -> Self { Self::Number(n.into()) }
}

impl From<DateTime<Utc>> for Target {
  fn from(at: DateTime<Utc>) -> Self { Self::Time(at) }
}

impl From<VersionRef> for Target {
  fn from(handle: VersionRef) -> Self { Self::Version(handle) }
}

impl From<&Version> for Target {
  fn from(version: &Version) -> Self { Self::Version(version.handle()) }
}

impl From<&str> for Target {
  fn from(s: &str) -> Self { Self::parse(s) }
}

impl From<RangeInclusive<i64>> for Target {
  fn from(range: RangeInclusive<i64>) -> Self { Self::Range(range) }
}

impl From<Range<i64>> for Target {
  fn from(range: Range<i64>) -> Self { Self::Range(range.start..=range.end.saturating_sub(1)) }
}

impl<T: Into<Target>> From<Option<T>> for Target {
  fn from(target: Option<T>) -> Self { target.map_or(Self::Missing, Into::into) }
}

/// Resolve `target` against `owner`'s history.
///
/// Returns `Ok(None)` for any target that does not name an existing version
/// of this owner.
pub async fn resolve<S: VersionStore>(
  store: &S,
  owner: &OwnerKey,
  target: &Target,
) -> Result<Option<u32>, S::Error> {
  let resolved = match target {
    Target::Number(n) => {
      let latest = store.current_number(owner).await?;
      u32::try_from(*n).ok().filter(|n| (1..=latest).contains(n))
    }
    Target::Time(at) => store.at_or_before(owner, *at).await?.map(|v| v.number),
    Target::Version(handle) => {
      if handle.owner != *owner {
        None
      } else {
        store
          .by_id(handle.version_id)
          .await?
          .filter(|v| v.owner == *owner && v.number == handle.number)
          .map(|v| v.number)
      }
    }
    Target::Tag(tag) => store.by_tag(owner, tag).await?.map(|v| v.number),
    Target::Range(_) | Target::Missing => None,
  };

  if resolved.is_none() {
    debug!(%owner, ?target, "revert target did not resolve");
  }
  Ok(resolved)
}
