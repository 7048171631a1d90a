//! Core types and algorithms for the Verso attribute-history engine.
//!
//! Records change over time; each commit is stored as a compact diff with a
//! per-record version number. This crate rebuilds a record's attributes as of
//! any past version and stages reverts, tracking which version a revert came
//! from. It is deliberately free of HTTP and database dependencies.

pub mod error;
pub mod modification;
pub mod owner;
pub mod reconstruct;
pub mod record;
pub mod resolve;
pub mod revert;
pub mod store;
pub mod version;

pub use error::{Error, Result};
pub use modification::{Attributes, Change, Modifications};
pub use owner::{Author, OwnerKey};
pub use record::{Document, Record};
pub use resolve::Target;
pub use revert::{CommitOptions, RevertState, Tracked};
pub use store::VersionStore;
pub use version::{NewVersion, Version, VersionRef};
