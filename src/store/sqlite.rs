use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row};
use tracing::{debug, info};

use crate::release::{
    Channel, CheckHistoryEntry, CheckStatus, Release, ReleaseKey, StoredRelease, VersionKey,
};
use crate::store::error::StoreError;
use crate::store::storer::{InsertOutcome, ReleaseStorer};

const RELEASE_COLUMNS: &str =
    "id, version, build, channel, date_published, download_url, date_discovered, notified";

pub struct ReleaseStore {
    conn: Mutex<Connection>,
}

impl ReleaseStore {
    pub fn new(db_path: &Path) -> Result<Self, StoreError> {
        info!("Initializing release database at {:?}", db_path);

        let conn = Connection::open(db_path)?;

        // Enable WAL mode for better concurrency
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        debug!("Database connection established");

        Self::with_connection(conn)
    }

    /// Store backed by a private in-memory database
    pub fn in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        let store = Self {
            conn: Mutex::new(conn),
        };

        store.create_schema()?;
        info!("Release database initialized successfully");

        Ok(store)
    }

    /// Acquire database connection lock with proper error handling
    fn lock_conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    fn create_schema(&self) -> Result<(), StoreError> {
        debug!("Creating database schema");

        let conn = self.lock_conn()?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS releases (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                version TEXT NOT NULL,
                build TEXT NOT NULL CHECK (build <> ''),
                channel TEXT NOT NULL CHECK (channel IN ('public', 'beta')),
                date_published TEXT NOT NULL DEFAULT '',
                download_url TEXT NOT NULL DEFAULT '',
                date_discovered TEXT NOT NULL,
                notified INTEGER NOT NULL DEFAULT 0,
                UNIQUE(version, build, channel)
            )
            "#,
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_releases_channel ON releases(channel)",
            [],
        )?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS check_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                check_time TEXT NOT NULL,
                releases_found INTEGER NOT NULL,
                new_releases INTEGER NOT NULL,
                status TEXT NOT NULL
            )
            "#,
            [],
        )?;

        debug!("Database schema created successfully");
        Ok(())
    }

    fn parse_timestamp(table: &'static str, value: &str) -> Result<DateTime<Utc>, StoreError> {
        DateTime::parse_from_rfc3339(value)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| StoreError::InvalidRow {
                table,
                reason: format!("bad timestamp {:?}: {}", value, e),
            })
    }

    fn release_from_row(row: &Row<'_>) -> rusqlite::Result<(i64, RawRelease)> {
        Ok((
            row.get(0)?,
            RawRelease {
                version: row.get(1)?,
                build: row.get(2)?,
                channel: row.get(3)?,
                date_published: row.get(4)?,
                download_url: row.get(5)?,
                date_discovered: row.get(6)?,
                notified: row.get(7)?,
            },
        ))
    }

    fn query_releases(
        &self,
        channel: Option<Channel>,
    ) -> Result<Vec<(i64, StoredRelease)>, StoreError> {
        let conn = self.lock_conn()?;

        let rows = match channel {
            Some(channel) => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM releases WHERE channel = ?1 ORDER BY id DESC",
                    RELEASE_COLUMNS
                ))?;
                let rows = stmt
                    .query_map([channel.as_str()], Self::release_from_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                rows
            }
            None => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM releases ORDER BY id DESC",
                    RELEASE_COLUMNS
                ))?;
                let rows = stmt
                    .query_map([], Self::release_from_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                rows
            }
        };

        rows.into_iter()
            .map(|(id, raw)| raw.into_stored().map(|release| (id, release)))
            .collect()
    }
}

/// Release row as read from SQLite, before validation
struct RawRelease {
    version: String,
    build: String,
    channel: String,
    date_published: String,
    download_url: String,
    date_discovered: String,
    notified: bool,
}

impl RawRelease {
    fn into_stored(self) -> Result<StoredRelease, StoreError> {
        let channel = self
            .channel
            .parse::<Channel>()
            .map_err(|_| StoreError::InvalidRow {
                table: "releases",
                reason: format!("unknown channel {:?}", self.channel),
            })?;

        Ok(StoredRelease {
            release: Release {
                version: self.version,
                build: self.build,
                channel,
                date_published: self.date_published,
                download_url: self.download_url,
            },
            date_discovered: ReleaseStore::parse_timestamp("releases", &self.date_discovered)?,
            notified: self.notified,
        })
    }
}

impl ReleaseStorer for ReleaseStore {
    fn insert_if_new(
        &self,
        release: &Release,
        discovered_at: DateTime<Utc>,
    ) -> Result<InsertOutcome, StoreError> {
        let conn = self.lock_conn()?;

        // Only a conflict on the identity key is swallowed; any other
        // constraint failure surfaces as an error.
        let rows_inserted = conn.execute(
            r#"
            INSERT INTO releases (version, build, channel, date_published, download_url, date_discovered, notified)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0)
            ON CONFLICT(version, build, channel) DO NOTHING
            "#,
            (
                &release.version,
                &release.build,
                release.channel.as_str(),
                &release.date_published,
                &release.download_url,
                discovered_at.to_rfc3339(),
            ),
        )?;

        if rows_inserted > 0 {
            info!(
                "Added new release: {} ({}) - {}",
                release.version, release.build, release.channel
            );
            Ok(InsertOutcome::Inserted)
        } else {
            debug!(
                "Release already known: {} ({}) - {}",
                release.version, release.build, release.channel
            );
            Ok(InsertOutcome::Duplicate)
        }
    }

    fn latest(&self, channel: Option<Channel>) -> Result<Option<StoredRelease>, StoreError> {
        let releases = self.query_releases(channel)?;

        // Highest version first, then the most recent discovery, then the
        // most recent insert.
        let latest = releases
            .into_iter()
            .max_by(|(a_id, a), (b_id, b)| {
                VersionKey::parse(&a.release.version)
                    .cmp(&VersionKey::parse(&b.release.version))
                    .then(a.date_discovered.cmp(&b.date_discovered))
                    .then(a_id.cmp(b_id))
            })
            .map(|(_, release)| release);

        Ok(latest)
    }

    fn mark_notified(&self, key: &ReleaseKey) -> Result<(), StoreError> {
        let conn = self.lock_conn()?;

        let updated = conn.execute(
            r#"
            UPDATE releases SET notified = 1
            WHERE version = ?1 AND build = ?2 AND channel = ?3
            "#,
            (&key.version, &key.build, key.channel.as_str()),
        )?;

        if updated == 0 {
            debug!(
                "No release to mark as notified: {} ({}) - {}",
                key.version, key.build, key.channel
            );
        }

        Ok(())
    }

    fn append_check_history(
        &self,
        check_time: DateTime<Utc>,
        releases_found: usize,
        new_releases: usize,
        status: &CheckStatus,
    ) -> Result<(), StoreError> {
        let conn = self.lock_conn()?;

        conn.execute(
            r#"
            INSERT INTO check_history (check_time, releases_found, new_releases, status)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            (
                check_time.to_rfc3339(),
                releases_found as i64,
                new_releases as i64,
                status.to_db_string(),
            ),
        )?;

        Ok(())
    }

    fn last_check(&self) -> Result<Option<CheckHistoryEntry>, StoreError> {
        let conn = self.lock_conn()?;

        let result = conn.query_row(
            r#"
            SELECT check_time, releases_found, new_releases, status
            FROM check_history
            ORDER BY id DESC
            LIMIT 1
            "#,
            [],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, String>(3)?,
                ))
            },
        );

        let (check_time, releases_found, new_releases, status) = match result {
            Ok(row) => row,
            Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        Ok(Some(CheckHistoryEntry {
            check_time: Self::parse_timestamp("check_history", &check_time)?,
            releases_found: releases_found.max(0) as usize,
            new_releases: new_releases.max(0) as usize,
            status: CheckStatus::from_db_string(&status),
        }))
    }

    fn count(&self) -> Result<usize, StoreError> {
        let conn = self.lock_conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM releases", [], |row| row.get(0))?;
        Ok(count.max(0) as usize)
    }

    fn releases(&self) -> Result<Vec<StoredRelease>, StoreError> {
        Ok(self
            .query_releases(None)?
            .into_iter()
            .map(|(_, release)| release)
            .collect())
    }
}
