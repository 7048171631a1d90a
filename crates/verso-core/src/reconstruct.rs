//! Rebuilding historical attribute state from a version history.
//!
//! Everything here is pure: nothing touches the host record or the store.
//! Callers load the history once (ascending by number) and pass it in.

use crate::{
  modification::{Attributes, Modifications},
  version::Version,
};

/// The attribute state as of version `number`.
///
/// Starts from `live` and undoes, newest first, every version numbered above
/// `number` by writing back its old values. Fields that no later version
/// touched keep their live value.
///
/// A field first set after `number` is present in the result as `null`, not
/// absent: a missing attribute reads as `null`, and keeping the key lets a
/// revert clear the field on the live record.
pub fn state_at(live: &Attributes, history: &[Version], number: u32) -> Attributes {
  let mut later: Vec<&Version> =
    history.iter().filter(|v| v.number > number).collect();
  later.sort_by(|a, b| b.number.cmp(&a.number));

  let mut state = live.clone();
  for version in later {
    for (field, change) in &version.modifications {
      state.insert(field.clone(), change.old.clone());
    }
  }
  state
}

/// The attribute state as of version `number`, built forward from an empty
/// base by applying the new values of every version numbered `<= number`.
pub fn replay(history: &[Version], number: u32) -> Attributes {
  let mut earlier: Vec<&Version> =
    history.iter().filter(|v| v.number <= number).collect();
  earlier.sort_by_key(|v| v.number);

  let mut state = Attributes::new();
  for version in earlier {
    for (field, change) in &version.modifications {
      state.insert(field.clone(), change.new.clone());
    }
  }
  state
}

/// A single diff that takes the record from version `from` to version `to`.
///
/// Going backwards (`from > to`) yields the reversed transitions. Fields
/// that end where they started are left out.
pub fn changes_between(history: &[Version], from: u32, to: u32) -> Modifications {
  let (low, high) = if from <= to { (from, to) } else { (to, from) };

  let mut span: Vec<&Version> = history
    .iter()
    .filter(|v| v.number > low && v.number <= high)
    .collect();
  span.sort_by_key(|v| v.number);

  let mut folded = Modifications::new();
  for version in span {
    folded.fold(&version.modifications);
  }
  folded.prune();

  if from > to { folded.reversed() } else { folded }
}
