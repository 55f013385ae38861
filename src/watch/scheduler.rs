//! Periodic trigger for release checks

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{MissedTickBehavior, interval};
use tracing::{error, info, warn};

use crate::store::ReleaseStorer;
use crate::watch::checker::{CheckReport, ReleaseChecker};
use crate::watch::notify::NotificationDispatcher;

/// Shortest accepted period; `tokio::time::interval` rejects zero
const MIN_PERIOD: Duration = Duration::from_secs(1);

/// Run one check and hand its result to the dispatcher.
///
/// Failures are logged only; they are also visible in the check history.
pub async fn run_once<S: ReleaseStorer>(
    checker: &ReleaseChecker<S>,
    dispatcher: &NotificationDispatcher<S>,
) -> Option<CheckReport> {
    let report = match checker.run_check().await {
        Ok(report) => report,
        Err(e) => {
            error!("Release check failed: {}", e);
            return None;
        }
    };

    if let Some(reason) = &report.error {
        warn!("Release check finished with error: {}", reason);
    }

    dispatcher.dispatch(&report).await;
    Some(report)
}

/// Check every `period` until `shutdown` resolves.
///
/// The first check runs immediately. Ticks missed while a check is still
/// running are skipped rather than queued, and a running check is always
/// allowed to finish.
pub async fn run_periodic<S, F>(
    checker: Arc<ReleaseChecker<S>>,
    dispatcher: Arc<NotificationDispatcher<S>>,
    period: Duration,
    shutdown: F,
) where
    S: ReleaseStorer,
    F: Future<Output = ()>,
{
    let period = period.max(MIN_PERIOD);
    info!("Checking for new releases every {:?}", period);

    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Stopping release watcher");
                break;
            }
            _ = ticker.tick() => {
                run_once(&checker, &dispatcher).await;
            }
        }
    }
}
