//! Handlers for `/records/:kind/:id/versions` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/records/:kind/:id/versions` | Ascending; optional `?exclude_latest=true` |
//! | `GET`  | `/records/:kind/:id/versions/:number` | 404 if not found |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
};
use serde::Deserialize;
use verso_core::{OwnerKey, Version, VersionStore};

use crate::error::ApiError;

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  /// Drop the latest version, leaving only states one could revert to.
  #[serde(default)]
  pub exclude_latest: bool,
}

/// `GET /records/:kind/:id/versions[?exclude_latest=true]`
pub async fn list<S>(
  State(store): State<Arc<S>>,
  Path((kind, id)): Path<(String, String)>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Version>>, ApiError>
where
  S: VersionStore,
{
  let owner = OwnerKey { kind, id };
  let mut history = store
    .all(&owner)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;

  if params.exclude_latest {
    history.pop();
  }

  Ok(Json(history))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /records/:kind/:id/versions/:number`
pub async fn get_one<S>(
  State(store): State<Arc<S>>,
  Path((kind, id, number)): Path<(String, String, u32)>,
) -> Result<Json<Version>, ApiError>
where
  S: VersionStore,
{
  let owner = OwnerKey { kind, id };
  let version = store
    .by_number(&owner, number)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .ok_or_else(|| ApiError::NotFound(format!("version {number} of {owner} not found")))?;
  Ok(Json(version))
}
