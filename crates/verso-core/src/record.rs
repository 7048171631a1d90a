//! The host adapter — how the engine sees a tracked record — and
//! [`Document`], a ready-made host over a JSON attribute map.

use serde_json::Value;

use crate::{
  modification::{Attributes, Change, Modifications},
  owner::OwnerKey,
  reconstruct::replay,
  version::Version,
};

/// A tracked record's in-memory working state.
///
/// Implementors keep whatever baseline they need to report which fields
/// changed since the last commit.
pub trait Record {
  fn owner_key(&self) -> OwnerKey;

  /// Every versioned field's current in-memory value.
  fn attributes(&self) -> Attributes;

  /// A field's in-memory value; `Null` when unset.
  fn read_attribute(&self, field: &str) -> Value;

  fn write_attribute(&mut self, field: &str, value: Value);

  /// Fields changed since the last commit, as `[old, new]` pairs.
  fn changes(&self) -> Modifications;

  /// Accept the in-memory state as persisted.
  fn mark_committed(&mut self);

  /// Throw away in-memory edits and return to the last persisted state.
  fn discard_changes(&mut self);
}

/// A schemaless record: named JSON fields plus the snapshot taken at the last
/// commit.
#[derive(Debug, Clone)]
pub struct Document {
  owner:      OwnerKey,
  attributes: Attributes,
  committed:  Attributes,
}

impl Document {
  /// A record with no fields and no history.
  pub fn new(owner: OwnerKey) -> Self {
    Self {
      owner,
      attributes: Attributes::new(),
      committed: Attributes::new(),
    }
  }

  /// Rebuild the live state by replaying every version from an empty base.
  pub fn from_history(owner: OwnerKey, history: &[Version]) -> Self {
    let attributes = replay(history, u32::MAX);
    Self {
      owner,
      committed: attributes.clone(),
      attributes,
    }
  }

  pub fn get(&self, field: &str) -> Option<&Value> { self.attributes.get(field) }

  pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
    self.attributes.insert(field.into(), value.into());
  }

  pub fn is_dirty(&self) -> bool { !self.changes().is_empty() }
}

impl Record for Document {
  fn owner_key(&self) -> OwnerKey { self.owner.clone() }

  fn attributes(&self) -> Attributes { self.attributes.clone() }

  fn read_attribute(&self, field: &str) -> Value {
    self.attributes.get(field).cloned().unwrap_or(Value::Null)
  }

  fn write_attribute(&mut self, field: &str, value: Value) {
    self.attributes.insert(field.to_owned(), value);
  }

  fn changes(&self) -> Modifications {
    let fields = self.committed.keys().chain(self.attributes.keys());
    let mut changes = Modifications::new();
    for field in fields {
      if changes.contains(field) {
        continue;
      }
      let old = self.committed.get(field).cloned().unwrap_or(Value::Null);
      let new = self.attributes.get(field).cloned().unwrap_or(Value::Null);
      if old != new {
        changes.insert(field.clone(), Change { old, new });
      }
    }
    changes
  }

  fn mark_committed(&mut self) { self.committed = self.attributes.clone(); }

  fn discard_changes(&mut self) { self.attributes = self.committed.clone(); }
}
