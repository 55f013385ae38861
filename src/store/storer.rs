//! Storage trait for releases and check history

#[cfg(test)]
use mockall::automock;

use chrono::{DateTime, Utc};

use crate::release::{Channel, CheckHistoryEntry, CheckStatus, Release, ReleaseKey, StoredRelease};
use crate::store::error::StoreError;

/// Result of a successful insert attempt
///
/// Storage faults are reported through `Err(StoreError)`, so callers can
/// tell an already known release apart from a failed write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// No release with the same (version, build, channel) existed
    Inserted,
    /// The release was already known; the stored row is left untouched
    Duplicate,
}

impl InsertOutcome {
    pub fn is_new(&self) -> bool {
        matches!(self, InsertOutcome::Inserted)
    }
}

/// Trait for storing releases and the check history
#[cfg_attr(test, automock)]
pub trait ReleaseStorer: Send + Sync + 'static {
    /// Insert the release unless its identity key is already stored.
    /// The uniqueness check and the write happen in one statement.
    fn insert_if_new(
        &self,
        release: &Release,
        discovered_at: DateTime<Utc>,
    ) -> Result<InsertOutcome, StoreError>;

    /// Highest version among releases of `channel` (or all releases)
    fn latest(&self, channel: Option<Channel>) -> Result<Option<StoredRelease>, StoreError>;

    /// Flag a release as delivered; unknown keys are ignored
    fn mark_notified(&self, key: &ReleaseKey) -> Result<(), StoreError>;

    fn append_check_history(
        &self,
        check_time: DateTime<Utc>,
        releases_found: usize,
        new_releases: usize,
        status: &CheckStatus,
    ) -> Result<(), StoreError>;

    /// Most recently appended history entry
    fn last_check(&self) -> Result<Option<CheckHistoryEntry>, StoreError>;

    /// Total number of stored releases
    fn count(&self) -> Result<usize, StoreError>;

    /// All releases, most recently inserted first
    fn releases(&self) -> Result<Vec<StoredRelease>, StoreError>;
}
