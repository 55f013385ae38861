//! Common release types

use chrono::{DateTime, Utc};

use crate::config::{ERROR_STATUS_PREFIX, SUCCESS_STATUS};

/// Release track of an installer build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Generally available release
    Public,
    /// Developer or public beta
    Beta,
}

impl Channel {
    /// Returns the string representation stored in the database
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Public => "public",
            Channel::Beta => "beta",
        }
    }

    /// Human readable label used in messages
    pub fn label(&self) -> &'static str {
        match self {
            Channel::Public => "Public Release",
            Channel::Beta => "Beta Release",
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Channel {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" => Ok(Channel::Public),
            "beta" => Ok(Channel::Beta),
            _ => Err(()),
        }
    }
}

/// Identity of a release: (version, build, channel)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReleaseKey {
    pub version: String,
    pub build: String,
    pub channel: Channel,
}

/// A release extracted from the page, before persistence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Release {
    /// Dotted version (e.g., "15.1.2")
    pub version: String,
    /// Apple build number (e.g., "24B83")
    pub build: String,
    pub channel: Channel,
    /// Publication date, empty when the page does not expose one
    pub date_published: String,
    /// Link to InstallAssistant.pkg as found in the page
    pub download_url: String,
}

impl Release {
    pub fn key(&self) -> ReleaseKey {
        ReleaseKey {
            version: self.version.clone(),
            build: self.build.clone(),
            channel: self.channel,
        }
    }

    /// Whether `other` describes the same installer build
    pub fn same_identity(&self, other: &Release) -> bool {
        self.version == other.version && self.build == other.build && self.channel == other.channel
    }
}

/// A release as persisted in the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRelease {
    pub release: Release,
    /// Set once at insert time
    pub date_discovered: DateTime<Utc>,
    /// Set by the notification side after a successful delivery
    pub notified: bool,
}

/// Outcome of one check run as recorded in the history log
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckStatus {
    Success,
    Error(String),
}

impl CheckStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, CheckStatus::Success)
    }

    /// Text stored in the `status` column
    pub fn to_db_string(&self) -> String {
        match self {
            CheckStatus::Success => SUCCESS_STATUS.to_string(),
            CheckStatus::Error(reason) => format!("{}{}", ERROR_STATUS_PREFIX, reason),
        }
    }

    /// Inverse of [`CheckStatus::to_db_string`]. Unknown text is kept as an error description.
    pub fn from_db_string(s: &str) -> Self {
        if s == SUCCESS_STATUS {
            return CheckStatus::Success;
        }
        CheckStatus::Error(s.strip_prefix(ERROR_STATUS_PREFIX).unwrap_or(s).to_string())
    }
}

impl std::fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_db_string())
    }
}

/// One entry of the append-only check history
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckHistoryEntry {
    pub check_time: DateTime<Utc>,
    /// Candidates extracted in the run, including already known ones
    pub releases_found: usize,
    pub new_releases: usize,
    pub status: CheckStatus,
}
