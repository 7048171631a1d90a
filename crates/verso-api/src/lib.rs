//! JSON REST API for Verso.
//!
//! Exposes an axum [`Router`] backed by any [`verso_core::VersionStore`].
//! Auth, TLS, and transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", verso_api::api_router(store.clone()))
//! ```

pub mod error;
pub mod records;
pub mod versions;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use verso_core::VersionStore;

pub use error::ApiError;

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>) -> Router<()>
where
  S: VersionStore + Clone + Send + Sync + 'static,
{
  Router::new()
    .route("/records/{kind}/{id}", post(records::commit::<S>))
    .route("/records/{kind}/{id}/state", get(records::state::<S>))
    .route("/records/{kind}/{id}/changes", get(records::changes::<S>))
    .route("/records/{kind}/{id}/revert", post(records::revert::<S>))
    .route("/records/{kind}/{id}/versions", get(versions::list::<S>))
    .route("/records/{kind}/{id}/versions/{number}", get(versions::get_one::<S>))
    .with_state(store)
}
