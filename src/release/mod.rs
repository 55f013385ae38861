//! Release domain layer
//! - types.rs: Channel, Release, StoredRelease, check history types
//! - version_key.rs: Orderable key for dotted version strings

pub mod types;
pub mod version_key;

pub use types::{Channel, CheckHistoryEntry, CheckStatus, Release, ReleaseKey, StoredRelease};
pub use version_key::VersionKey;
