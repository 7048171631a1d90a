//! Handlers that read or change a record's attribute state.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/records/:kind/:id/state` | Optional `?at=<target>`; 404 if it does not resolve |
//! | `GET`  | `/records/:kind/:id/changes` | `?from=<target>&to=<target>` |
//! | `POST` | `/records/:kind/:id` | Body: [`CommitBody`]; 201 + version, or 204 if unchanged |
//! | `POST` | `/records/:kind/:id/revert` | Body: [`RevertBody`]; reverts and commits |
//!
//! A `<target>` is a version number, an RFC 3339 timestamp or a tag.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use verso_core::{
  Attributes, Author, CommitOptions, Modifications, OwnerKey, Target, Tracked,
  Version, VersionStore,
};

use crate::error::ApiError;

/// Interpret a JSON value as a revert target.
fn target_from_json(value: &Value) -> Result<Target, ApiError> {
  match value {
    Value::Null => Ok(Target::Missing),
    Value::Number(n) => n
      .as_i64()
      .map(Target::Number)
      .ok_or_else(|| ApiError::BadRequest(format!("not an integer target: {n}"))),
    Value::String(s) => Ok(Target::parse(s)),
    other => Err(ApiError::BadRequest(format!("unsupported target: {other}"))),
  }
}

// ─── State ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct StateParams {
  pub at: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StateResponse {
  pub owner:      OwnerKey,
  /// The version the attributes correspond to; `0` for a record with no
  /// history.
  pub number:     u32,
  pub attributes: Attributes,
}

/// `GET /records/:kind/:id/state[?at=<target>]`
pub async fn state<S>(
  State(store): State<Arc<S>>,
  Path((kind, id)): Path<(String, String)>,
  Query(params): Query<StateParams>,
) -> Result<Json<StateResponse>, ApiError>
where
  S: VersionStore + Clone,
{
  let owner = OwnerKey { kind, id };
  let tracked = Tracked::open(store.as_ref().clone(), owner.clone()).await?;

  let number = match params.at.as_deref() {
    None => tracked.current_version_number(),
    Some(at) => tracked
      .resolve(Target::parse(at))
      .await?
      .ok_or_else(|| ApiError::NotFound(format!("{at:?} does not name a version of {owner}")))?,
  };
  let attributes = tracked.state_at_number(number).await?;

  Ok(Json(StateResponse { owner, number, attributes }))
}

// ─── Changes ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ChangesParams {
  pub from: String,
  pub to:   String,
}

/// `GET /records/:kind/:id/changes?from=<target>&to=<target>`
pub async fn changes<S>(
  State(store): State<Arc<S>>,
  Path((kind, id)): Path<(String, String)>,
  Query(params): Query<ChangesParams>,
) -> Result<Json<Modifications>, ApiError>
where
  S: VersionStore + Clone,
{
  let owner = OwnerKey { kind, id };
  let tracked = Tracked::open(store.as_ref().clone(), owner.clone()).await?;
  let changes = tracked
    .changes_between(Target::parse(&params.from), Target::parse(&params.to))
    .await?
    .ok_or_else(|| {
      ApiError::NotFound(format!(
        "{:?}..{:?} does not span versions of {owner}",
        params.from, params.to
      ))
    })?;
  Ok(Json(changes))
}

// ─── Commit ───────────────────────────────────────────────────────────────────

/// JSON body accepted by `POST /records/:kind/:id`.
#[derive(Debug, Deserialize)]
pub struct CommitBody {
  /// Fields to set; fields not mentioned keep their current value.
  pub attributes: Map<String, Value>,
  pub author:     Option<Author>,
  pub tag:        Option<String>,
}

/// `POST /records/:kind/:id` — returns 201 + the new [`Version`], or 204 when
/// nothing changed.
pub async fn commit<S>(
  State(store): State<Arc<S>>,
  Path((kind, id)): Path<(String, String)>,
  Json(body): Json<CommitBody>,
) -> Result<Response, ApiError>
where
  S: VersionStore + Clone,
{
  let owner = OwnerKey { kind, id };
  let mut tracked = Tracked::open(store.as_ref().clone(), owner).await?;
  for (field, value) in body.attributes {
    tracked.record_mut().set(field, value);
  }

  let options = CommitOptions { author: body.author, tag: body.tag };
  Ok(match tracked.commit(options).await? {
    Some(version) => (StatusCode::CREATED, Json(version)).into_response(),
    None => StatusCode::NO_CONTENT.into_response(),
  })
}

// ─── Revert ───────────────────────────────────────────────────────────────────

/// JSON body accepted by `POST /records/:kind/:id/revert`.
#[derive(Debug, Deserialize)]
pub struct RevertBody {
  /// A version number, timestamp string or tag.
  #[serde(default)]
  pub target: Value,
  pub author: Option<Author>,
  pub tag:    Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RevertResponse {
  /// The resolved version number, or the unchanged current number when the
  /// target did not resolve.
  pub number:  u32,
  /// The version written by the revert, if it changed anything.
  pub version: Option<Version>,
}

/// `POST /records/:kind/:id/revert` — reverts to `target` and commits.
pub async fn revert<S>(
  State(store): State<Arc<S>>,
  Path((kind, id)): Path<(String, String)>,
  Json(body): Json<RevertBody>,
) -> Result<Json<RevertResponse>, ApiError>
where
  S: VersionStore + Clone,
{
  let target = target_from_json(&body.target)?;
  let owner = OwnerKey { kind, id };
  let mut tracked = Tracked::open(store.as_ref().clone(), owner).await?;

  let number = tracked.revert_to(target).await?;
  let version = tracked
    .commit(CommitOptions { author: body.author, tag: body.tag })
    .await?;

  Ok(Json(RevertResponse { number, version }))
}
