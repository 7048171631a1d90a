//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 UTC strings (microsecond
//! precision, `Z` suffix) so that string comparison in SQL matches
//! chronological order. Diffs are stored in their codec form. UUIDs are
//! stored as hyphenated lowercase strings.

use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;
use verso_core::{Author, Modifications, OwnerKey, Version};

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Author ──────────────────────────────────────────────────────────────────

/// The `(author_kind, author_id, author_name)` column triple.
pub type AuthorColumns = (Option<String>, Option<String>, Option<String>);

pub fn encode_author(author: Option<&Author>) -> AuthorColumns {
  match author {
    None => (None, None, None),
    Some(Author::Record(key)) => (Some(key.kind.clone()), Some(key.id.clone()), None),
    Some(Author::Name(name)) => (None, None, Some(name.clone())),
  }
}

pub fn decode_author(columns: AuthorColumns) -> Result<Option<Author>> {
  match columns {
    (None, None, None) => Ok(None),
    (Some(kind), Some(id), None) => Ok(Some(Author::Record(OwnerKey { kind, id }))),
    (None, None, Some(name)) => Ok(Some(Author::Name(name))),
    other => Err(Error::Author(format!("{other:?}"))),
  }
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list matching [`RawVersion::from_row`].
pub const VERSION_COLUMNS: &str = "version_id, owner_kind, owner_id, \
   author_kind, author_id, author_name, modifications, number, \
   reverted_from, tag, created_at, updated_at";

/// Raw values read directly from a `versions` row.
pub struct RawVersion {
  pub version_id:    String,
  pub owner_kind:    String,
  pub owner_id:      String,
  pub author_kind:   Option<String>,
  pub author_id:     Option<String>,
  pub author_name:   Option<String>,
  pub modifications: String,
  pub number:        u32,
  pub reverted_from: Option<u32>,
  pub tag:           Option<String>,
  pub created_at:    String,
  pub updated_at:    String,
}

impl RawVersion {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      version_id:    row.get(0)?,
      owner_kind:    row.get(1)?,
      owner_id:      row.get(2)?,
      author_kind:   row.get(3)?,
      author_id:     row.get(4)?,
      author_name:   row.get(5)?,
      modifications: row.get(6)?,
      number:        row.get(7)?,
      reverted_from: row.get(8)?,
      tag:           row.get(9)?,
      created_at:    row.get(10)?,
      updated_at:    row.get(11)?,
    })
  }

  pub fn into_version(self) -> Result<Version> {
    Ok(Version {
      version_id:    decode_uuid(&self.version_id)?,
      owner:         OwnerKey {
        kind: self.owner_kind,
        id:   self.owner_id,
      },
      number:        self.number,
      modifications: Modifications::decode(&self.modifications)?,
      author:        decode_author((
        self.author_kind,
        self.author_id,
        self.author_name,
      ))?,
      reverted_from: self.reverted_from,
      tag:           self.tag,
      created_at:    decode_dt(&self.created_at)?,
      updated_at:    decode_dt(&self.updated_at)?,
    })
  }
}
