//! Store and checker test utilities

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use tempfile::TempDir;

use macos_release_watch::clock::{Clock, FixedClock};
use macos_release_watch::scraper::{PageFetcher, ReleaseExtractor};
use macos_release_watch::store::ReleaseStore;
use macos_release_watch::watch::ReleaseChecker;

pub fn fixed_clock() -> Arc<dyn Clock> {
    Arc::new(FixedClock(
        Utc.with_ymd_and_hms(2024, 10, 28, 12, 0, 0).unwrap(),
    ))
}

/// Create an empty on-disk store in a temporary directory
pub fn create_test_store() -> (TempDir, Arc<ReleaseStore>) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");
    let store = ReleaseStore::new(&db_path).unwrap();
    (temp_dir, Arc::new(store))
}

pub fn create_test_checker(
    store: Arc<ReleaseStore>,
    fetcher: impl PageFetcher + 'static,
) -> ReleaseChecker<ReleaseStore> {
    ReleaseChecker::new(
        store,
        Arc::new(fetcher),
        ReleaseExtractor::new("InstallAssistant.pkg"),
        fixed_clock(),
    )
}
