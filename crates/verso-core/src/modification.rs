//! The modification codec — one commit's changes as a compact diff.
//!
//! A diff maps each changed field to an `[old, new]` pair. Only fields that
//! actually changed are present. The stored form is a JSON object with sorted
//! keys, so encoding does not depend on the order fields were reported in.

use std::collections::{BTreeMap, btree_map};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Error, Result};

/// A record's attribute state: field name to JSON value.
pub type Attributes = BTreeMap<String, Value>;

/// A single field's transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "(Value, Value)", into = "(Value, Value)")]
pub struct Change {
  pub old: Value,
  pub new: Value,
}

impl Change {
  pub fn new(old: impl Into<Value>, new: impl Into<Value>) -> Self {
    Self { old: old.into(), new: new.into() }
  }

  /// The same transition, run backwards.
  pub fn reversed(&self) -> Self {
    Self { old: self.new.clone(), new: self.old.clone() }
  }

  pub fn is_noop(&self) -> bool { self.old == self.new }
}

impl From<(Value, Value)> for Change {
  fn from((old, new): (Value, Value)) -> Self { Self { old, new } }
}

impl From<Change> for (Value, Value) {
  fn from(c: Change) -> Self { (c.old, c.new) }
}

/// The diff recorded by one version.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Modifications(BTreeMap<String, Change>);

impl Modifications {
  pub fn new() -> Self { Self::default() }

  pub fn is_empty(&self) -> bool { self.0.is_empty() }

  pub fn len(&self) -> usize { self.0.len() }

  pub fn get(&self, field: &str) -> Option<&Change> { self.0.get(field) }

  pub fn contains(&self, field: &str) -> bool { self.0.contains_key(field) }

  pub fn insert(&mut self, field: impl Into<String>, change: Change) {
    self.0.insert(field.into(), change);
  }

  pub fn iter(&self) -> btree_map::Iter<'_, String, Change> { self.0.iter() }

  pub fn fields(&self) -> impl Iterator<Item = &str> {
    self.0.keys().map(String::as_str)
  }

  /// Serialise to the stored form. An empty diff encodes to `{}`.
  pub fn encode(&self) -> Result<String> { Ok(serde_json::to_string(self)?) }

  /// Parse the stored form.
  ///
  /// Anything other than an object of two-element arrays is rejected with
  /// [`Error::MalformedDiff`]; partial results are never returned.
  pub fn decode(s: &str) -> Result<Self> {
    serde_json::from_str(s).map_err(|e| Error::MalformedDiff(e.to_string()))
  }

  /// Each changed field's value before the change.
  pub fn old_values(&self) -> Attributes {
    self
      .0
      .iter()
      .map(|(field, c)| (field.clone(), c.old.clone()))
      .collect()
  }

  /// Each changed field's value after the change.
  pub fn new_values(&self) -> Attributes {
    self
      .0
      .iter()
      .map(|(field, c)| (field.clone(), c.new.clone()))
      .collect()
  }

  /// Every transition run backwards.
  pub fn reversed(&self) -> Self {
    Self(
      self
        .0
        .iter()
        .map(|(field, c)| (field.clone(), c.reversed()))
        .collect(),
    )
  }

  /// Fold a later diff into this one: a field touched by both keeps this
  /// diff's `old` and takes `later`'s `new`.
  pub fn fold(&mut self, later: &Modifications) {
    for (field, change) in later.iter() {
      match self.0.get_mut(field) {
        Some(existing) => existing.new = change.new.clone(),
        None => {
          self.0.insert(field.clone(), change.clone());
        }
      }
    }
  }

  /// Drop fields whose old and new values are equal.
  pub fn prune(&mut self) { self.0.retain(|_, c| !c.is_noop()); }
}

impl FromIterator<(String, Change)> for Modifications {
  fn from_iter<I: IntoIterator<Item = (String, Change)>>(iter: I) -> Self {
    Self(iter.into_iter().collect())
  }
}

impl IntoIterator for Modifications {
  type Item = (String, Change);
  type IntoIter = btree_map::IntoIter<String, Change>;

  fn into_iter(self) -> Self::IntoIter { self.0.into_iter() }
}

impl<'a> IntoIterator for &'a Modifications {
  type Item = (&'a String, &'a Change);
  type IntoIter = btree_map::Iter<'a, String, Change>;

  fn into_iter(self) -> Self::IntoIter { self.0.iter() }
}
