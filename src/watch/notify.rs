//! Notification dispatch for newly discovered releases
//!
//! The transport is behind the [`Notifier`] trait. The dispatcher owns the
//! policy: a single summary after the first run (instead of one message per
//! release already on the page), one message per release afterwards.

#[cfg(test)]
use mockall::automock;

use std::sync::Arc;

use futures::future::join_all;
use thiserror::Error;
use tracing::{error, info};

use crate::release::{Channel, Release, StoredRelease};
use crate::store::ReleaseStorer;
use crate::watch::checker::CheckReport;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Delivery to {target} failed: {reason}")]
    Delivery { target: String, reason: String },
}

/// Trait for delivering a text message to one target
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn deliver(&self, target: &str, message: &str) -> Result<(), NotifyError>;
}

/// Writes notifications to the log
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait::async_trait]
impl Notifier for LogNotifier {
    async fn deliver(&self, target: &str, message: &str) -> Result<(), NotifyError> {
        info!(target: "notification", "[{}] {}", target, message);
        Ok(())
    }
}

pub struct NotificationDispatcher<S: ReleaseStorer> {
    store: Arc<S>,
    notifier: Arc<dyn Notifier>,
    targets: Vec<String>,
}

impl<S: ReleaseStorer> NotificationDispatcher<S> {
    pub fn new(store: Arc<S>, notifier: Arc<dyn Notifier>, targets: Vec<String>) -> Self {
        Self {
            store,
            notifier,
            targets,
        }
    }

    /// Send the notifications for a check report.
    ///
    /// Returns the number of successful deliveries.
    pub async fn dispatch(&self, report: &CheckReport) -> usize {
        if report.new_releases.is_empty() {
            return 0;
        }

        if report.is_first_run {
            info!(
                "First run: {} releases stored, sending summary only",
                report.new_releases.len()
            );
            let message = self.first_run_summary(&report.new_releases);
            return self.deliver_to_all(&message).await;
        }

        let mut delivered = 0;
        for release in &report.new_releases {
            let sent = self.deliver_to_all(&format_release_message(release)).await;
            if sent > 0 {
                let _ = self
                    .store
                    .mark_notified(&release.key())
                    .inspect_err(|e| {
                        error!(
                            "Failed to mark {} ({}) as notified: {}",
                            release.version, release.build, e
                        )
                    });
            }
            delivered += sent;
        }

        delivered
    }

    fn first_run_summary(&self, releases: &[Release]) -> String {
        let latest = |channel: Channel| {
            self.store
                .latest(Some(channel))
                .inspect_err(|e| error!("Failed to look up latest {} release: {}", channel, e))
                .ok()
                .flatten()
        };

        format_first_run_summary(
            releases,
            latest(Channel::Public).as_ref(),
            latest(Channel::Beta).as_ref(),
        )
    }

    /// Deliver one message to every target; failures do not stop the others
    async fn deliver_to_all(&self, message: &str) -> usize {
        let deliveries = self.targets.iter().map(|target| async move {
            self.notifier
                .deliver(target, message)
                .await
                .inspect(|_| info!("Notification sent to {}", target))
                .inspect_err(|e| error!("Failed to notify {}: {}", target, e))
                .is_ok()
        });

        join_all(deliveries)
            .await
            .into_iter()
            .filter(|ok| *ok)
            .count()
    }
}

/// Message announcing one new release
pub fn format_release_message(release: &Release) -> String {
    let mut message = format!(
        "New macOS release: {}\nVersion: {}\nBuild: {}\n",
        release.channel.label(),
        release.version,
        release.build
    );

    if !release.date_published.is_empty() {
        message.push_str(&format!("Published: {}\n", release.date_published));
    }

    if !release.download_url.is_empty() {
        message.push_str(&format!("Download: {}\n", release.download_url));
    }

    message
}

/// Message sent instead of per-release notifications after the first run
pub fn format_first_run_summary(
    releases: &[Release],
    latest_public: Option<&StoredRelease>,
    latest_beta: Option<&StoredRelease>,
) -> String {
    let count = |channel: Channel| releases.iter().filter(|r| r.channel == channel).count();

    let mut message = format!(
        "Release watch started.\nStored {} public and {} beta releases.\n",
        count(Channel::Public),
        count(Channel::Beta)
    );

    for latest in [latest_public, latest_beta].into_iter().flatten() {
        let release = &latest.release;
        message.push_str(&format!(
            "Latest {}: {} (build {})",
            release.channel.label(),
            release.version,
            release.build
        ));
        if !release.download_url.is_empty() {
            message.push_str(&format!(" {}", release.download_url));
        }
        message.push('\n');
    }

    message
}
