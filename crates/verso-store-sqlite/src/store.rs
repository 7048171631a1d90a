//! [`SqliteStore`] — the SQLite implementation of [`VersionStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension as _, TransactionBehavior, types::Value};
use tracing::debug;
use uuid::Uuid;
use verso_core::{NewVersion, OwnerKey, Version, VersionStore};

use crate::{
  Error, Result,
  encode::{RawVersion, VERSION_COLUMNS, decode_dt, encode_author, encode_dt, encode_uuid},
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Verso version store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run a query expected to yield at most one version row.
  async fn fetch_optional(&self, sql: String, params: Vec<Value>) -> Result<Option<Version>> {
    let raw: Option<RawVersion> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(&sql, rusqlite::params_from_iter(params), RawVersion::from_row)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawVersion::into_version).transpose()
  }

  /// Run a query yielding any number of version rows.
  async fn fetch_all(&self, sql: String, params: Vec<Value>) -> Result<Vec<Version>> {
    let raws: Vec<RawVersion> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params), RawVersion::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawVersion::into_version).collect()
  }
}

/// `owner_kind = ?1 AND owner_id = ?2` bind values.
fn owner_params(owner: &OwnerKey) -> Vec<Value> {
  vec![Value::Text(owner.kind.clone()), Value::Text(owner.id.clone())]
}

// ─── VersionStore impl ───────────────────────────────────────────────────────

impl VersionStore for SqliteStore {
  type Error = Error;

  // ── Writes ────────────────────────────────────────────────────────────────

  async fn append(&self, input: NewVersion) -> Result<Version> {
    let version_id = Uuid::new_v4();
    let now_str    = encode_dt(Utc::now());
    let now        = decode_dt(&now_str)?;

    let id_str         = encode_uuid(version_id);
    let owner_kind     = input.owner.kind.clone();
    let owner_id       = input.owner.id.clone();
    let (author_kind, author_id, author_name) = encode_author(input.author.as_ref());
    let modifications  = input.modifications.encode()?;
    let reverted_from  = input.reverted_from;
    let tag            = input.tag.clone();

    // The max-number read and the insert share one IMMEDIATE transaction,
    // which takes SQLite's write lock up front. The UNIQUE constraint backs
    // this up against writers on other connections.
    let number: u32 = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let number: u32 = tx.query_row(
          "SELECT COALESCE(MAX(number), 0) + 1 FROM versions
           WHERE owner_kind = ?1 AND owner_id = ?2",
          rusqlite::params![owner_kind, owner_id],
          |r| r.get(0),
        )?;
        tx.execute(
          "INSERT INTO versions (
             version_id, owner_kind, owner_id,
             author_kind, author_id, author_name,
             modifications, number, reverted_from, tag,
             created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)",
          rusqlite::params![
            id_str,
            owner_kind,
            owner_id,
            author_kind,
            author_id,
            author_name,
            modifications,
            number,
            reverted_from,
            tag,
            now_str,
          ],
        )?;
        tx.commit()?;
        Ok(number)
      })
      .await?;

    debug!(owner = %input.owner, number, ?reverted_from, "version appended");

    Ok(Version {
      version_id,
      owner: input.owner,
      number,
      modifications: input.modifications,
      author: input.author,
      reverted_from,
      tag: input.tag,
      created_at: now,
      updated_at: now,
    })
  }

  async fn set_created_at(
    &self,
    owner:      &OwnerKey,
    number:     u32,
    created_at: DateTime<Utc>,
  ) -> Result<Version> {
    let created_str = encode_dt(created_at);
    let updated_str = encode_dt(Utc::now());
    let kind        = owner.kind.clone();
    let id          = owner.id.clone();

    let updated: usize = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE versions SET created_at = ?1, updated_at = ?2
           WHERE owner_kind = ?3 AND owner_id = ?4 AND number = ?5",
          rusqlite::params![created_str, updated_str, kind, id, number],
        )?)
      })
      .await?;

    let not_found = || Error::VersionNotFound { owner: owner.clone(), number };
    if updated == 0 {
      return Err(not_found());
    }
    self.by_number(owner, number).await?.ok_or_else(not_found)
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  async fn latest(&self, owner: &OwnerKey) -> Result<Option<Version>> {
    self
      .fetch_optional(
        format!(
          "SELECT {VERSION_COLUMNS} FROM versions
           WHERE owner_kind = ?1 AND owner_id = ?2
           ORDER BY number DESC LIMIT 1"
        ),
        owner_params(owner),
      )
      .await
  }

  async fn by_number(&self, owner: &OwnerKey, number: u32) -> Result<Option<Version>> {
    let mut params = owner_params(owner);
    params.push(Value::Integer(number.into()));
    self
      .fetch_optional(
        format!(
          "SELECT {VERSION_COLUMNS} FROM versions
           WHERE owner_kind = ?1 AND owner_id = ?2 AND number = ?3"
        ),
        params,
      )
      .await
  }

  async fn by_id(&self, version_id: Uuid) -> Result<Option<Version>> {
    self
      .fetch_optional(
        format!("SELECT {VERSION_COLUMNS} FROM versions WHERE version_id = ?1"),
        vec![Value::Text(encode_uuid(version_id))],
      )
      .await
  }

  async fn by_tag(&self, owner: &OwnerKey, tag: &str) -> Result<Option<Version>> {
    let mut params = owner_params(owner);
    params.push(Value::Text(tag.to_owned()));
    self
      .fetch_optional(
        format!(
          "SELECT {VERSION_COLUMNS} FROM versions
           WHERE owner_kind = ?1 AND owner_id = ?2 AND tag = ?3
           ORDER BY number DESC LIMIT 1"
        ),
        params,
      )
      .await
  }

  async fn at_or_before(
    &self,
    owner: &OwnerKey,
    at:    DateTime<Utc>,
  ) -> Result<Option<Version>> {
    let kind   = owner.kind.clone();
    let id     = owner.id.clone();
    let at_str = encode_dt(at);

    let raw: Option<RawVersion> = self
      .conn
      .call(move |conn| {
        let found = conn
          .query_row(
            &format!(
              "SELECT {VERSION_COLUMNS} FROM versions
               WHERE owner_kind = ?1 AND owner_id = ?2 AND created_at <= ?3
               ORDER BY created_at DESC, number DESC LIMIT 1"
            ),
            rusqlite::params![kind, id, at_str],
            RawVersion::from_row,
          )
          .optional()?;
        if found.is_some() {
          return Ok(found);
        }

        // Earlier than every version: clamp to the earliest one.
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {VERSION_COLUMNS} FROM versions
                 WHERE owner_kind = ?1 AND owner_id = ?2
                 ORDER BY created_at ASC, number ASC LIMIT 1"
              ),
              rusqlite::params![kind, id],
              RawVersion::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawVersion::into_version).transpose()
  }

  async fn all(&self, owner: &OwnerKey) -> Result<Vec<Version>> {
    self
      .fetch_all(
        format!(
          "SELECT {VERSION_COLUMNS} FROM versions
           WHERE owner_kind = ?1 AND owner_id = ?2
           ORDER BY number ASC"
        ),
        owner_params(owner),
      )
      .await
  }

  async fn current_number(&self, owner: &OwnerKey) -> Result<u32> {
    let kind = owner.kind.clone();
    let id   = owner.id.clone();

    let number: u32 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT COALESCE(MAX(number), 0) FROM versions
           WHERE owner_kind = ?1 AND owner_id = ?2",
          rusqlite::params![kind, id],
          |r| r.get(0),
        )?)
      })
      .await?;

    Ok(number)
  }
}
