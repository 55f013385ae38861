//! Release persistence
//!
//! # Modules
//!
//! - [`storer`]: `ReleaseStorer` trait used by the checker and the notifier
//! - [`sqlite`]: SQLite-backed store for releases and check history
//! - [`error`]: Storage error type

pub mod error;
pub mod sqlite;
pub mod storer;

pub use error::StoreError;
pub use sqlite::ReleaseStore;
pub use storer::{InsertOutcome, ReleaseStorer};
