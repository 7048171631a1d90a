//! The reverter: a tracked record's working copy, bound to its store.
//!
//! Reverting only stages attribute values in memory and marks the record as
//! [`RevertState::Pending`]. The next commit that writes a version records
//! the pending source in `reverted_from` and clears the marker; a reload
//! clears it without writing anything.

use tracing::debug;

use crate::{
  Error, Result,
  modification::{Attributes, Modifications},
  owner::{Author, OwnerKey},
  reconstruct,
  record::{Document, Record},
  resolve::{Target, resolve},
  store::VersionStore,
  version::{NewVersion, Version},
};

/// Revert provenance waiting for the next commit. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RevertState {
  /// No revert staged.
  #[default]
  Idle,
  /// Reverted in memory to this version number; not yet committed.
  Pending(u32),
}

impl RevertState {
  pub fn pending(self) -> Option<u32> {
    match self {
      Self::Idle => None,
      Self::Pending(n) => Some(n),
    }
  }
}

/// Per-commit metadata. The author is always passed explicitly; there is no
/// ambient "current user".
#[derive(Debug, Clone, Default)]
pub struct CommitOptions {
  pub author: Option<Author>,
  pub tag:    Option<String>,
}

impl CommitOptions {
  pub fn by(author: impl Into<Author>) -> Self {
    Self { author: Some(author.into()), tag: None }
  }

  pub fn tagged(mut self, tag: impl Into<String>) -> Self {
    self.tag = Some(tag.into());
    self
  }
}

/// A record's working copy plus its version history.
pub struct Tracked<S, R> {
  store:   S,
  record:  R,
  owner:   OwnerKey,
  current: u32,
  revert:  RevertState,
}

impl<S: VersionStore> Tracked<S, Document> {
  /// Load a [`Document`] whose live state is rebuilt from its history.
  pub async fn open(store: S, owner: OwnerKey) -> Result<Self> {
    let history = store.all(&owner).await.map_err(Error::store)?;
    let current = history.last().map_or(0, |v| v.number);
    let record = Document::from_history(owner.clone(), &history);
    Ok(Self {
      store,
      record,
      owner,
      current,
      revert: RevertState::Idle,
    })
  }
}

impl<S: VersionStore, R: Record> Tracked<S, R> {
  /// Wrap an already-loaded record.
  pub async fn load(store: S, record: R) -> Result<Self> {
    let owner = record.owner_key();
    let current = store.current_number(&owner).await.map_err(Error::store)?;
    Ok(Self {
      store,
      record,
      owner,
      current,
      revert: RevertState::Idle,
    })
  }

  pub fn record(&self) -> &R { &self.record }

  pub fn record_mut(&mut self) -> &mut R { &mut self.record }

  pub fn into_record(self) -> R { self.record }

  pub fn store(&self) -> &S { &self.store }

  pub fn owner(&self) -> &OwnerKey { &self.owner }

  /// The latest persisted version number; `0` before the first commit.
  pub fn current_version_number(&self) -> u32 { self.current }

  pub fn revert_state(&self) -> RevertState { self.revert }

  // ── History ───────────────────────────────────────────────────────────

  pub async fn version_history(&self) -> Result<Vec<Version>> {
    self.store.all(&self.owner).await.map_err(Error::store)
  }

  /// Every version except the latest: the states one could revert to.
  pub async fn versions_excluding_latest(&self) -> Result<Vec<Version>> {
    let mut history = self.version_history().await?;
    history.pop();
    Ok(history)
  }

  /// Each prior version paired with the attributes it represents.
  pub async fn revisions(&self) -> Result<Vec<(Version, Attributes)>> {
    let history = self.version_history().await?;
    let live = self.persisted_attributes();
    let mut revisions: Vec<(Version, Attributes)> = history
      .iter()
      .map(|v| (v.clone(), reconstruct::state_at(&live, &history, v.number)))
      .collect();
    revisions.pop();
    Ok(revisions)
  }

  pub async fn resolve(&self, target: impl Into<Target>) -> Result<Option<u32>> {
    resolve(&self.store, &self.owner, &target.into())
      .await
      .map_err(Error::store)
  }

  /// The record's attributes as of `target`, or `None` when it does not
  /// resolve. Never modifies the record or the store.
  pub async fn state_at(&self, target: impl Into<Target>) -> Result<Option<Attributes>> {
    let Some(number) = self.resolve(target).await? else {
      return Ok(None);
    };
    Ok(Some(self.state_at_number(number).await?))
  }

  /// The record's attributes as of version `number` (`0` is the base state).
  pub async fn state_at_number(&self, number: u32) -> Result<Attributes> {
    let history = self.version_history().await?;
    Ok(reconstruct::state_at(
      &self.persisted_attributes(),
      &history,
      number,
    ))
  }

  /// One diff taking the record from `from` to `to`, or `None` when either
  /// end does not resolve.
  pub async fn changes_between(
    &self,
    from: impl Into<Target>,
    to: impl Into<Target>,
  ) -> Result<Option<Modifications>> {
    let (Some(from), Some(to)) = (self.resolve(from).await?, self.resolve(to).await?)
    else {
      return Ok(None);
    };
    let history = self.version_history().await?;
    Ok(Some(reconstruct::changes_between(&history, from, to)))
  }

  /// The last committed state: in-memory attributes with any uncommitted
  /// edits rolled back.
  fn persisted_attributes(&self) -> Attributes {
    let mut attributes = self.record.attributes();
    attributes.extend(self.record.changes().old_values());
    attributes
  }

  // ── Revert ────────────────────────────────────────────────────────────

  /// Stage the record's attributes as of `target` in memory.
  ///
  /// Returns the resolved version number. An unresolvable target changes
  /// nothing and returns the current version number.
  pub async fn revert_to(&mut self, target: impl Into<Target>) -> Result<u32> {
    let Some(number) = self.resolve(target).await? else {
      return Ok(self.current);
    };

    let state = self.state_at_number(number).await?;
    for (field, value) in state {
      if self.record.read_attribute(&field) != value {
        self.record.write_attribute(&field, value);
      }
    }

    self.revert = RevertState::Pending(number);
    debug!(owner = %self.owner, number, "revert staged");
    Ok(number)
  }

  /// [`revert_to`](Self::revert_to) followed immediately by
  /// [`commit`](Self::commit).
  pub async fn revert_to_and_commit(
    &mut self,
    target: impl Into<Target>,
    options: CommitOptions,
  ) -> Result<u32> {
    let number = self.revert_to(target).await?;
    self.commit(options).await?;
    Ok(number)
  }

  // ── Commit / reload ───────────────────────────────────────────────────

  /// Persist in-memory changes as a new version.
  ///
  /// Returns `None` when nothing changed. A pending revert is recorded as
  /// the new version's `reverted_from`; the marker is cleared once the
  /// commit completes, whether or not a version was written. Store errors
  /// leave the marker in place.
  pub async fn commit(&mut self, options: CommitOptions) -> Result<Option<Version>> {
    let changes = self.record.changes();
    if changes.is_empty() {
      self.revert = RevertState::Idle;
      return Ok(None);
    }

    let input = NewVersion {
      owner:         self.owner.clone(),
      modifications: changes,
      author:        options.author,
      reverted_from: self.revert.pending(),
      tag:           options.tag,
    };
    let version = self.store.append(input).await.map_err(Error::store)?;

    self.record.mark_committed();
    self.current = version.number;
    self.revert = RevertState::Idle;
    debug!(
      owner = %self.owner,
      number = version.number,
      reverted_from = ?version.reverted_from,
      "version committed"
    );
    Ok(Some(version))
  }

  /// Discard in-memory edits, including any staged revert, and refresh the
  /// current version number from the store.
  pub async fn reload(&mut self) -> Result<()> {
    self.record.discard_changes();
    self.revert = RevertState::Idle;
    self.current = self
      .store
      .current_number(&self.owner)
      .await
      .map_err(Error::store)?;
    Ok(())
  }
}
