//! Integration tests for `SqliteStore`, mostly against an in-memory database.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use uuid::Uuid;
use verso_core::{
  Attributes, Author, Change, CommitOptions, Document, Modifications, NewVersion,
  OwnerKey, Record, RevertState, Target, Tracked, VersionStore,
};

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn user(id: &str) -> OwnerKey { OwnerKey::new("user", id) }

fn diff(field: &str, old: serde_json::Value, new: serde_json::Value) -> Modifications {
  [(field.to_string(), Change::new(old, new))].into_iter().collect()
}

// ─── Fixture ─────────────────────────────────────────────────────────────────

const NAMES: [&str; 4] = ["Steve Richert", "Stephen Richert", "Stephen Jobs", "Steve Jobs"];

fn set_name(doc: &mut Document, name: &str) {
  let (first, last) = name.split_once(' ').unwrap_or((name, ""));
  doc.set("first_name", first);
  doc.set("last_name", last);
}

fn name(doc: &Document) -> String {
  format!(
    "{} {}",
    doc.read_attribute("first_name").as_str().unwrap_or_default(),
    doc.read_attribute("last_name").as_str().unwrap_or_default(),
  )
}

/// A user renamed four times, with versions backdated one hour apart so the
/// last one sits at "now".
struct Fixture {
  user:      Tracked<SqliteStore, Document>,
  snapshots: BTreeMap<u32, Attributes>,
  times:     BTreeMap<u32, DateTime<Utc>>,
}

async fn fixture() -> Fixture {
  let s = store().await;
  let owner = user("1");
  let mut tracked = Tracked::open(s.clone(), owner.clone()).await.unwrap();
  let mut snapshots = BTreeMap::new();
  let mut times = BTreeMap::new();

  let mut time = Utc::now() - Duration::hours(NAMES.len() as i64);
  for n in NAMES {
    set_name(tracked.record_mut(), n);
    let version = tracked
      .commit(CommitOptions::default())
      .await
      .unwrap()
      .expect("a version per rename");
    snapshots.insert(version.number, tracked.record().attributes());

    time += Duration::hours(1);
    let backdated = s.set_created_at(&owner, version.number, time).await.unwrap();
    times.insert(version.number, backdated.created_at);
  }

  tracked.reload().await.unwrap();
  Fixture { user: tracked, snapshots, times }
}

async fn latest_reverted_from(f: &Fixture) -> Option<u32> {
  f.user
    .store()
    .latest(f.user.owner())
    .await
    .unwrap()
    .expect("history")
    .reverted_from
}

// ─── Appending ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn append_numbers_versions_per_owner() {
  let s = store().await;

  let a1 = s.append(NewVersion::new(user("a"), diff("x", json!(null), json!(1)))).await.unwrap();
  let a2 = s.append(NewVersion::new(user("a"), diff("x", json!(1), json!(2)))).await.unwrap();
  let b1 = s.append(NewVersion::new(user("b"), diff("x", json!(null), json!(1)))).await.unwrap();
  let other_kind = s
    .append(NewVersion::new(OwnerKey::new("article", "a"), diff("x", json!(null), json!(1))))
    .await
    .unwrap();

  assert_eq!((a1.number, a2.number, b1.number, other_kind.number), (1, 2, 1, 1));
  assert_eq!(s.current_number(&user("a")).await.unwrap(), 2);
  assert_eq!(s.current_number(&user("nobody")).await.unwrap(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_appends_never_share_a_number() {
  let s = store().await;

  let tasks: Vec<_> = (0..16)
    .map(|i| {
      let s = s.clone();
      tokio::spawn(async move {
        s.append(NewVersion::new(user("busy"), diff("n", json!(i), json!(i + 1))))
          .await
          .map(|v| v.number)
      })
    })
    .collect();

  let mut numbers = Vec::new();
  for task in tasks {
    numbers.push(task.await.unwrap().unwrap());
  }
  numbers.sort_unstable();
  assert_eq!(numbers, (1..=16).collect::<Vec<u32>>());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn appends_from_separate_connections_never_share_a_number() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("verso.db");
  let first = SqliteStore::open(&path).await.unwrap();
  let second = SqliteStore::open(&path).await.unwrap();

  let tasks: Vec<_> = (0..40)
    .map(|i| {
      let s = if i % 2 == 0 { first.clone() } else { second.clone() };
      tokio::spawn(async move {
        s.append(NewVersion::new(user("shared"), diff("n", json!(i), json!(i + 1))))
          .await
          .map(|v| v.number)
      })
    })
    .collect();

  let mut numbers = Vec::new();
  for task in tasks {
    numbers.push(task.await.unwrap().unwrap());
  }
  numbers.sort_unstable();
  assert_eq!(numbers, (1..=40).collect::<Vec<u32>>());
  assert_eq!(second.current_number(&user("shared")).await.unwrap(), 40);
}

#[tokio::test]
async fn append_round_trips_metadata() {
  let s = store().await;

  let mut input = NewVersion::new(user("1"), diff("name", json!("A"), json!("B")));
  input.author = Some(Author::Record(OwnerKey::new("admin", "7")));
  input.tag = Some("release".into());
  input.reverted_from = Some(3);
  let appended = s.append(input).await.unwrap();

  let fetched = s.by_id(appended.version_id).await.unwrap().unwrap();
  assert_eq!(fetched, appended);

  let mut named = NewVersion::new(user("1"), diff("name", json!("B"), json!("C")));
  named.author = Some(Author::Name("cron".into()));
  s.append(named).await.unwrap();
  let latest = s.latest(&user("1")).await.unwrap().unwrap();
  assert_eq!(latest.author, Some(Author::Name("cron".into())));
  assert_eq!(latest.reverted_from, None);
}

// ─── Lookups ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn lookups_on_empty_history() {
  let s = store().await;
  let owner = user("ghost");
  assert!(s.latest(&owner).await.unwrap().is_none());
  assert!(s.by_number(&owner, 1).await.unwrap().is_none());
  assert!(s.at_or_before(&owner, Utc::now()).await.unwrap().is_none());
  assert!(s.all(&owner).await.unwrap().is_empty());
  assert!(s.by_id(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn at_or_before_picks_latest_then_clamps_to_earliest() {
  let f = fixture().await;
  let s = f.user.store();
  let owner = f.user.owner();

  for (number, time) in &f.times {
    let found = s.at_or_before(owner, *time + Duration::seconds(1)).await.unwrap();
    assert_eq!(found.map(|v| v.number), Some(*number));
  }

  let before_all = f.times[&1] - Duration::days(1);
  let found = s.at_or_before(owner, before_all).await.unwrap();
  assert_eq!(found.map(|v| v.number), Some(1));
}

#[tokio::test]
async fn at_or_before_breaks_ties_by_number() {
  let s = store().await;
  let owner = user("1");
  let at = Utc::now() - Duration::hours(1);
  for i in 0..3 {
    s.append(NewVersion::new(owner.clone(), diff("n", json!(i), json!(i + 1)))).await.unwrap();
  }
  s.set_created_at(&owner, 1, at).await.unwrap();
  s.set_created_at(&owner, 2, at).await.unwrap();

  let found = s.at_or_before(&owner, at).await.unwrap().unwrap();
  assert_eq!(found.number, 2);
}

#[tokio::test]
async fn set_created_at_missing_version() {
  let s = store().await;
  let err = s.set_created_at(&user("1"), 4, Utc::now()).await.unwrap_err();
  assert!(matches!(err, Error::VersionNotFound { number: 4, .. }), "{err:?}");
}

#[tokio::test]
async fn malformed_diff_is_surfaced() {
  let s = store().await;
  s.append(NewVersion::new(user("1"), diff("x", json!(null), json!(1)))).await.unwrap();
  s.conn
    .call(|conn| {
      conn.execute("UPDATE versions SET modifications = '[\"oops\"]'", [])?;
      Ok(())
    })
    .await
    .unwrap();

  let err = s.all(&user("1")).await.unwrap_err();
  assert!(
    matches!(err, Error::Core(verso_core::Error::MalformedDiff(_))),
    "{err:?}"
  );

  let tracked = Tracked::load(s.clone(), Document::new(user("1"))).await.unwrap();
  assert!(tracked.state_at_number(0).await.is_err());
}

// ─── Reconstruction ──────────────────────────────────────────────────────────

#[tokio::test]
async fn state_at_matches_each_snapshot() {
  let f = fixture().await;
  for (number, snapshot) in &f.snapshots {
    let state = f.user.state_at(*number).await.unwrap();
    assert_eq!(state.as_ref(), Some(snapshot), "version {number}");
  }
}

#[tokio::test]
async fn state_at_is_read_only() {
  let f = fixture().await;
  let state = f.user.state_at(1).await.unwrap().unwrap();
  assert_eq!(state["first_name"], json!("Steve"));
  assert_eq!(state["last_name"], json!("Richert"));

  assert_eq!(name(f.user.record()), "Steve Jobs");
  assert_eq!(f.user.revert_state(), RevertState::Idle);
  assert_eq!(f.user.version_history().await.unwrap().len(), 4);
}

#[tokio::test]
async fn document_rebuilds_from_history() {
  let f = fixture().await;
  let reopened = Tracked::open(f.user.store().clone(), user("1")).await.unwrap();
  assert_eq!(reopened.current_version_number(), 4);
  assert_eq!(reopened.record().attributes(), f.snapshots[&4]);
}

#[tokio::test]
async fn changes_between_versions() {
  let f = fixture().await;
  let changes = f.user.changes_between(1, 4).await.unwrap().unwrap();
  assert!(!changes.contains("first_name"));
  assert_eq!(changes.get("last_name"), Some(&Change::new("Richert", "Jobs")));

  let back = f.user.changes_between(3, 2).await.unwrap().unwrap();
  assert_eq!(back.get("last_name"), Some(&Change::new("Jobs", "Richert")));

  assert!(f.user.changes_between(1, "bogus").await.unwrap().is_none());
}

// ─── Reverting ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn revert_returns_the_resolved_number() {
  let mut f = fixture().await;
  assert_eq!(f.user.revert_to(1).await.unwrap(), 1);
}

#[tokio::test]
async fn revert_stages_without_committing() {
  let mut f = fixture().await;
  f.user.revert_to(1).await.unwrap();

  assert_eq!(name(f.user.record()), "Steve Richert");
  assert_eq!(f.user.current_version_number(), 4);
  assert_eq!(f.user.revert_state(), RevertState::Pending(1));
  assert_eq!(f.user.version_history().await.unwrap().len(), 4);
}

#[tokio::test]
async fn revert_and_commit_changes_the_version_number() {
  let mut f = fixture().await;
  let before = f.user.current_version_number();
  f.user
    .revert_to_and_commit(1, CommitOptions::default())
    .await
    .unwrap();
  assert_ne!(f.user.current_version_number(), before);
}

#[tokio::test]
async fn invalid_targets_do_nothing() {
  let mut f = fixture().await;

  let mut other = Tracked::open(f.user.store().clone(), user("2")).await.unwrap();
  other.record_mut().set("first_name", "Other");
  let foreign = other.commit(CommitOptions::default()).await.unwrap().unwrap();

  let mut stale = f.user.version_history().await.unwrap()[0].handle();
  stale.version_id = Uuid::new_v4();

  let invalid: Vec<Target> = vec![
    None::<i64>.into(),
    ":bogus".into(),
    "bogus".into(),
    (1..2_i64).into(),
    (1..=2_i64).into(),
    0_i64.into(),
    (-1_i64).into(),
    5_i64.into(),
    (&foreign).into(),
    stale.into(),
  ];

  let current = f.user.current_version_number();
  for target in invalid {
    let returned = f.user.revert_to(target.clone()).await.unwrap();
    assert_eq!(returned, current, "{target:?}");
    assert_eq!(f.user.current_version_number(), current);
    assert_eq!(f.user.revert_state(), RevertState::Idle, "{target:?}");
    assert!(!f.user.record().is_dirty(), "{target:?}");
  }
}

#[tokio::test]
async fn revert_targets_a_date_and_time() {
  let mut f = fixture().await;
  let times = f.times.clone();
  for (number, time) in times {
    let resolved = f.user.revert_to(time + Duration::seconds(1)).await.unwrap();
    assert_eq!(resolved, number);
  }

  let first = f.times[&1];
  assert_eq!(f.user.revert_to(first - Duration::hours(2)).await.unwrap(), 1);
}

#[tokio::test]
async fn revert_targets_a_version_handle() {
  let mut f = fixture().await;
  for version in f.user.version_history().await.unwrap() {
    assert_eq!(f.user.revert_to(&version).await.unwrap(), version.number);
  }
}

#[tokio::test]
async fn revert_targets_a_tag() {
  let mut f = fixture().await;
  f.user.record_mut().set("email", "steve@example.com");
  let tagged = f
    .user
    .commit(CommitOptions::by("admin").tagged("launch"))
    .await
    .unwrap()
    .unwrap();
  assert_eq!(tagged.tag.as_deref(), Some("launch"));
  assert_eq!(tagged.author, Some(Author::Name("admin".into())));

  f.user.revert_to(1).await.unwrap();
  assert_eq!(f.user.record().read_attribute("email"), json!(null));
  assert_eq!(f.user.revert_to("launch").await.unwrap(), tagged.number);
  assert_eq!(f.user.record().read_attribute("email"), json!("steve@example.com"));
}

#[tokio::test]
async fn revert_rolls_back_every_attribute() {
  let mut f = fixture().await;
  let snapshots = f.snapshots.clone();
  for (number, snapshot) in snapshots {
    f.user
      .revert_to_and_commit(number, CommitOptions::default())
      .await
      .unwrap();
    assert_eq!(f.user.record().attributes(), snapshot, "version {number}");
  }
}

#[tokio::test]
async fn four_renames_then_revert_to_first() {
  let mut f = fixture().await;
  assert_eq!(f.user.state_at(1).await.unwrap().unwrap(), f.snapshots[&1]);

  assert_eq!(f.user.revert_to(1).await.unwrap(), 1);
  assert_eq!(name(f.user.record()), "Steve Richert");
  assert_eq!(f.user.current_version_number(), 4);

  f.user.revert_to_and_commit(1, CommitOptions::default()).await.unwrap();
  let latest = f.user.store().latest(f.user.owner()).await.unwrap().unwrap();
  assert_eq!(latest.number, 5);
  assert_eq!(latest.reverted_from, Some(1));
  assert_eq!(name(f.user.record()), "Steve Richert");
}

#[tokio::test]
async fn revisions_exclude_the_latest_version() {
  let mut f = fixture().await;
  let excluded = f.user.versions_excluding_latest().await.unwrap();
  assert_eq!(
    excluded.iter().map(|v| v.number).collect::<Vec<_>>(),
    vec![1, 2, 3]
  );

  let revisions = f.user.revisions().await.unwrap();
  assert_eq!(revisions.len(), 3);
  for (version, attributes) in revisions {
    f.user.revert_to(version.number).await.unwrap();
    assert_eq!(f.user.record().attributes(), attributes);
  }
}

// ─── Revert provenance ───────────────────────────────────────────────────────

#[tokio::test]
async fn reverted_from_points_at_the_source_version() {
  let mut f = fixture().await;
  f.user.revert_to_and_commit(1, CommitOptions::default()).await.unwrap();
  assert_eq!(latest_reverted_from(&f).await, Some(1));
  assert_eq!(f.user.revert_state(), RevertState::Idle);
}

#[tokio::test]
async fn reverted_from_not_stored_for_subsequent_saves() {
  let mut f = fixture().await;
  f.user.revert_to_and_commit(1, CommitOptions::default()).await.unwrap();

  set_name(f.user.record_mut(), "Bill Gates");
  f.user.commit(CommitOptions::default()).await.unwrap();
  assert_eq!(latest_reverted_from(&f).await, None);
}

#[tokio::test]
async fn reverted_from_attaches_to_a_later_save() {
  let mut f = fixture().await;
  f.user.revert_to(1).await.unwrap();
  set_name(f.user.record_mut(), "Reverted");
  f.user.commit(CommitOptions::default()).await.unwrap();
  assert_eq!(latest_reverted_from(&f).await, Some(1));
}

#[tokio::test]
async fn reverted_from_not_stored_after_a_later_save() {
  let mut f = fixture().await;
  f.user.revert_to(1).await.unwrap();
  set_name(f.user.record_mut(), "Reverted");
  f.user.commit(CommitOptions::default()).await.unwrap();

  set_name(f.user.record_mut(), "Bill Gates");
  f.user.commit(CommitOptions::default()).await.unwrap();
  assert_eq!(latest_reverted_from(&f).await, None);
}

#[tokio::test]
async fn reload_discards_a_pending_revert() {
  let mut f = fixture().await;
  f.user.revert_to(1).await.unwrap();
  f.user.reload().await.unwrap();
  assert_eq!(f.user.revert_state(), RevertState::Idle);
  assert_eq!(name(f.user.record()), "Steve Jobs");

  set_name(f.user.record_mut(), "Bill Gates");
  f.user.commit(CommitOptions::default()).await.unwrap();
  assert_eq!(latest_reverted_from(&f).await, None);
  assert_eq!(f.user.current_version_number(), 5);
}

#[tokio::test]
async fn ordinary_edit_matching_old_state_has_no_provenance() {
  let mut f = fixture().await;
  set_name(f.user.record_mut(), NAMES[0]);
  let version = f.user.commit(CommitOptions::default()).await.unwrap().unwrap();
  assert_eq!(f.user.record().attributes(), f.snapshots[&1]);
  assert_eq!(version.reverted_from, None);
}

#[tokio::test]
async fn empty_commit_clears_the_marker() {
  let mut f = fixture().await;
  // Reverting to the current version stages nothing to write.
  f.user.revert_to(4).await.unwrap();
  assert_eq!(f.user.revert_state(), RevertState::Pending(4));

  assert!(f.user.commit(CommitOptions::default()).await.unwrap().is_none());
  assert_eq!(f.user.revert_state(), RevertState::Idle);
  assert_eq!(f.user.current_version_number(), 4);

  set_name(f.user.record_mut(), "Bill Gates");
  f.user.commit(CommitOptions::default()).await.unwrap();
  assert_eq!(latest_reverted_from(&f).await, None);
}

#[tokio::test]
async fn failed_commit_keeps_the_marker_and_version() {
  let mut f = fixture().await;
  f.user.revert_to(1).await.unwrap();

  f.user
    .store()
    .conn
    .call(|conn| {
      conn.execute_batch(
        "CREATE TRIGGER reject_versions BEFORE INSERT ON versions
         BEGIN SELECT RAISE(ABORT, 'disk full'); END;",
      )?;
      Ok(())
    })
    .await
    .unwrap();

  let err = f.user.commit(CommitOptions::default()).await.unwrap_err();
  let verso_core::Error::Store(source) = &err else {
    panic!("expected a store error, got {err:?}");
  };
  assert!(
    matches!(source.downcast_ref::<Error>(), Some(Error::Database(_))),
    "{source:?}"
  );
  assert_eq!(f.user.current_version_number(), 4);
  assert_eq!(f.user.revert_state(), RevertState::Pending(1));
  assert!(f.user.record().is_dirty());

  f.user
    .store()
    .conn
    .call(|conn| {
      conn.execute_batch("DROP TRIGGER reject_versions;")?;
      Ok(())
    })
    .await
    .unwrap();

  let version = f.user.commit(CommitOptions::default()).await.unwrap().unwrap();
  assert_eq!(version.number, 5);
  assert_eq!(version.reverted_from, Some(1));
}

#[tokio::test]
async fn revert_and_commit_to_unknown_target_still_saves_edits() {
  let mut f = fixture().await;
  set_name(f.user.record_mut(), "Bill Gates");

  let returned = f
    .user
    .revert_to_and_commit("bogus", CommitOptions::default())
    .await
    .unwrap();

  assert_eq!(returned, 4);
  assert_eq!(f.user.current_version_number(), 5);
  assert_eq!(f.user.revert_state(), RevertState::Idle);
  assert_eq!(latest_reverted_from(&f).await, None);

  let reloaded = Tracked::open(f.user.store().clone(), user("1")).await.unwrap();
  assert_eq!(name(reloaded.record()), "Bill Gates");
}
