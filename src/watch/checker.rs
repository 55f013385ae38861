//! Fetch, extract and reconcile one check of the installer page

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::clock::Clock;
use crate::release::{CheckStatus, Release};
use crate::scraper::{PageFetcher, ReleaseExtractor};
use crate::store::{InsertOutcome, ReleaseStorer, StoreError};

#[derive(Debug, Error)]
pub enum CheckError {
    /// Another check holds the run guard
    #[error("A release check is already running")]
    AlreadyRunning,

    /// The store could not be read or the history could not be written
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

/// Result of one check run, handed to the notification side
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckReport {
    /// The store was empty before this run
    pub is_first_run: bool,
    /// Candidates extracted from the page, including known ones
    pub total_found: usize,
    /// Newly stored releases in page order
    pub new_releases: Vec<Release>,
    pub page_updated: Option<String>,
    /// Failure description; None when the run succeeded
    pub error: Option<String>,
}

impl CheckReport {
    pub fn success(&self) -> bool {
        self.error.is_none()
    }
}

/// Runs checks against one page and one store
pub struct ReleaseChecker<S: ReleaseStorer> {
    store: Arc<S>,
    fetcher: Arc<dyn PageFetcher>,
    extractor: ReleaseExtractor,
    clock: Arc<dyn Clock>,
    in_flight: Mutex<()>,
}

impl<S: ReleaseStorer> ReleaseChecker<S> {
    pub fn new(
        store: Arc<S>,
        fetcher: Arc<dyn PageFetcher>,
        extractor: ReleaseExtractor,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            fetcher,
            extractor,
            clock,
            in_flight: Mutex::new(()),
        }
    }

    /// Fetch the page, store the releases not seen before and append one
    /// history entry.
    ///
    /// Fetch and extraction failures are recorded in the history and
    /// returned as an unsuccessful report. Only one run may be in flight; a
    /// concurrent call returns [`CheckError::AlreadyRunning`] without
    /// touching the store.
    pub async fn run_check(&self) -> Result<CheckReport, CheckError> {
        let Ok(_guard) = self.in_flight.try_lock() else {
            warn!("Release check requested while another one is running");
            return Err(CheckError::AlreadyRunning);
        };

        info!("Starting release check");

        let is_first_run = self.store.count()? == 0;

        let markup = match self.fetcher.fetch().await {
            Ok(markup) => markup,
            Err(e) => {
                error!("Failed to fetch installer page: {}", e);
                return self.record_failure(is_first_run, e.to_string());
            }
        };

        let page = match self.extractor.extract_page(&markup) {
            Ok(page) => page,
            Err(e) => {
                error!("Failed to extract releases: {}", e);
                return self.record_failure(is_first_run, e.to_string());
            }
        };

        if let Some(updated) = &page.page_updated {
            debug!("Page last updated {}", updated);
        }

        let total_found = page.releases.len();
        let mut new_releases = Vec::new();
        let mut failures = Vec::new();

        for release in page.releases {
            match self.store.insert_if_new(&release, self.clock.now()) {
                Ok(InsertOutcome::Inserted) => new_releases.push(release),
                Ok(InsertOutcome::Duplicate) => {}
                Err(e) => {
                    error!(
                        "Failed to store release {} ({}) - {}: {}",
                        release.version, release.build, release.channel, e
                    );
                    failures.push(e.to_string());
                }
            }
        }

        let status = match failures.first() {
            None => CheckStatus::Success,
            Some(first) => CheckStatus::Error(format!(
                "failed to store {} of {} releases: {}",
                failures.len(),
                total_found,
                first
            )),
        };

        self.store.append_check_history(
            self.clock.now(),
            total_found,
            new_releases.len(),
            &status,
        )?;

        info!(
            "Release check finished. Found: {}, new: {}",
            total_found,
            new_releases.len()
        );

        Ok(CheckReport {
            is_first_run,
            total_found,
            new_releases,
            page_updated: page.page_updated,
            error: match status {
                CheckStatus::Success => None,
                CheckStatus::Error(reason) => Some(reason),
            },
        })
    }

    fn record_failure(
        &self,
        is_first_run: bool,
        reason: String,
    ) -> Result<CheckReport, CheckError> {
        self.store.append_check_history(
            self.clock.now(),
            0,
            0,
            &CheckStatus::Error(reason.clone()),
        )?;

        Ok(CheckReport {
            is_first_run,
            total_found: 0,
            new_releases: Vec::new(),
            page_updated: None,
            error: Some(reason),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::release::Channel;
    use crate::scraper::FetchError;
    use crate::scraper::fetcher::MockPageFetcher;
    use crate::store::ReleaseStore;
    use crate::store::storer::MockReleaseStorer;
    use chrono::{TimeZone, Utc};
    use tokio::sync::Notify;

    const PAGE: &str = r#"
        <h2>macOS Sequoia Full Installers</h2>
        <table>
          <tr><td>15.1 (24B83)</td><td><a href="https://swcdn.apple.com/a/InstallAssistant.pkg">dl</a></td></tr>
          <tr><td>15.0.1 (24A348)</td><td><a href="https://swcdn.apple.com/b/InstallAssistant.pkg">dl</a></td></tr>
        </table>
    "#;

    fn clock() -> Arc<dyn Clock> {
        Arc::new(FixedClock(
            Utc.with_ymd_and_hms(2024, 10, 28, 9, 30, 0).unwrap(),
        ))
    }

    fn extractor() -> ReleaseExtractor {
        ReleaseExtractor::new("InstallAssistant.pkg")
    }

    fn fetcher_returning(body: &'static str) -> Arc<dyn PageFetcher> {
        let mut fetcher = MockPageFetcher::new();
        fetcher
            .expect_fetch()
            .returning(move || Ok(body.to_string()));
        Arc::new(fetcher)
    }

    #[tokio::test]
    async fn run_check_stores_new_releases_and_records_history() {
        let store = Arc::new(ReleaseStore::in_memory().unwrap());
        let checker =
            ReleaseChecker::new(store.clone(), fetcher_returning(PAGE), extractor(), clock());

        let report = checker.run_check().await.unwrap();

        assert!(report.success());
        assert!(report.is_first_run);
        assert_eq!(report.total_found, 2);
        let builds: Vec<_> = report.new_releases.iter().map(|r| r.build.as_str()).collect();
        assert_eq!(builds, vec!["24B83", "24A348"]);
        assert_eq!(store.count().unwrap(), 2);

        let last = store.last_check().unwrap().unwrap();
        assert_eq!(last.releases_found, 2);
        assert_eq!(last.new_releases, 2);
        assert_eq!(last.status, CheckStatus::Success);
        assert_eq!(last.check_time, clock().now());
    }

    #[tokio::test]
    async fn run_check_reports_nothing_new_on_repeat() {
        let store = Arc::new(ReleaseStore::in_memory().unwrap());
        let checker =
            ReleaseChecker::new(store.clone(), fetcher_returning(PAGE), extractor(), clock());

        checker.run_check().await.unwrap();
        let report = checker.run_check().await.unwrap();

        assert!(!report.is_first_run);
        assert_eq!(report.total_found, 2);
        assert!(report.new_releases.is_empty());
        assert_eq!(store.count().unwrap(), 2);
    }

    #[tokio::test]
    async fn run_check_records_fetch_failure() {
        let store = Arc::new(ReleaseStore::in_memory().unwrap());
        let mut fetcher = MockPageFetcher::new();
        fetcher
            .expect_fetch()
            .times(1)
            .returning(|| Err(FetchError::Timeout(30)));
        let checker = ReleaseChecker::new(store.clone(), Arc::new(fetcher), extractor(), clock());

        let report = checker.run_check().await.unwrap();

        assert!(!report.success());
        assert_eq!(
            report.error.as_deref(),
            Some("Request timed out after 30 seconds")
        );
        assert_eq!(report.total_found, 0);
        assert_eq!(store.count().unwrap(), 0);

        let last = store.last_check().unwrap().unwrap();
        assert_eq!((last.releases_found, last.new_releases), (0, 0));
        assert_eq!(
            last.status,
            CheckStatus::Error("Request timed out after 30 seconds".to_string())
        );
    }

    #[tokio::test]
    async fn run_check_keeps_going_when_a_single_insert_fails() {
        let mut store = MockReleaseStorer::new();
        store.expect_count().returning(|| Ok(5));
        store.expect_insert_if_new().returning(|release, _| {
            if release.build == "24B83" {
                Err(StoreError::LockPoisoned)
            } else {
                Ok(InsertOutcome::Inserted)
            }
        });
        store
            .expect_append_check_history()
            .withf(|_, found, new, status| {
                *found == 2
                    && *new == 1
                    && matches!(status, CheckStatus::Error(reason) if reason.starts_with("failed to store 1 of 2"))
            })
            .times(1)
            .returning(|_, _, _, _| Ok(()));
        let checker =
            ReleaseChecker::new(Arc::new(store), fetcher_returning(PAGE), extractor(), clock());

        let report = checker.run_check().await.unwrap();

        assert!(!report.success());
        assert!(!report.is_first_run);
        assert_eq!(report.new_releases.len(), 1);
        assert_eq!(report.new_releases[0].build, "24A348");
    }

    #[tokio::test]
    async fn run_check_propagates_history_write_failure() {
        let mut store = MockReleaseStorer::new();
        store.expect_count().returning(|| Ok(0));
        store
            .expect_insert_if_new()
            .returning(|_, _| Ok(InsertOutcome::Duplicate));
        store
            .expect_append_check_history()
            .returning(|_, _, _, _| Err(StoreError::LockPoisoned));
        let checker =
            ReleaseChecker::new(Arc::new(store), fetcher_returning(PAGE), extractor(), clock());

        let result = checker.run_check().await;

        assert!(matches!(
            result,
            Err(CheckError::Storage(StoreError::LockPoisoned))
        ));
    }

    struct GatedFetcher {
        started: Arc<Notify>,
        release: Arc<Notify>,
    }

    #[async_trait::async_trait]
    impl PageFetcher for GatedFetcher {
        async fn fetch(&self) -> Result<String, FetchError> {
            self.started.notify_one();
            self.release.notified().await;
            Ok(PAGE.to_string())
        }
    }

    #[tokio::test]
    async fn run_check_rejects_overlapping_runs() {
        let store = Arc::new(ReleaseStore::in_memory().unwrap());
        let started = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let fetcher = GatedFetcher {
            started: started.clone(),
            release: release.clone(),
        };
        let checker = Arc::new(ReleaseChecker::new(
            store.clone(),
            Arc::new(fetcher),
            extractor(),
            clock(),
        ));

        let first = tokio::spawn({
            let checker = checker.clone();
            async move { checker.run_check().await }
        });
        started.notified().await;

        let second = checker.run_check().await;
        release.notify_one();
        let first = first.await.unwrap().unwrap();

        assert!(matches!(second, Err(CheckError::AlreadyRunning)));
        assert!(first.is_first_run);
        assert_eq!(first.new_releases.len(), 2);
        assert_eq!(
            first
                .new_releases
                .iter()
                .filter(|r| r.channel == Channel::Public)
                .count(),
            2
        );
        assert_eq!(store.count().unwrap(), 2);
    }
}
