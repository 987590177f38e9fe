// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! SQLite persistence for podcasts, episodes and sync logs.
//!
//! Query functions take a plain `&Connection` so they run unchanged inside a
//! [`Transaction`], which dereferences to one.

pub mod episodes;
pub mod podcasts;
pub mod sync_logs;

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{Connection, Transaction};
use tracing::debug;

use crate::error::StoreError;
use crate::models::{EpisodeStatus, PodcastStatus, SyncStatus};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS podcasts (
        id BLOB PRIMARY KEY,
        podcaster_id BLOB NOT NULL,
        title TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        cover_image_url TEXT NOT NULL DEFAULT '',
        rss_url TEXT NOT NULL DEFAULT '',
        website_url TEXT NOT NULL DEFAULT '',
        language TEXT NOT NULL DEFAULT '',
        author TEXT NOT NULL DEFAULT '',
        category TEXT NOT NULL DEFAULT '',
        subcategory TEXT NOT NULL DEFAULT '',
        explicit INTEGER NOT NULL DEFAULT 0,
        status TEXT NOT NULL DEFAULT 'active',
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        last_synced_at TEXT
    );

    CREATE UNIQUE INDEX IF NOT EXISTS idx_podcasts_rss_url
        ON podcasts(rss_url) WHERE rss_url != '';
    CREATE INDEX IF NOT EXISTS idx_podcasts_status ON podcasts(status);

    CREATE TABLE IF NOT EXISTS episodes (
        id BLOB PRIMARY KEY,
        podcast_id BLOB NOT NULL,
        title TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        audio_url TEXT NOT NULL,
        duration INTEGER NOT NULL DEFAULT 0,
        cover_image_url TEXT NOT NULL DEFAULT '',
        publication_date TEXT NOT NULL,
        guid TEXT NOT NULL,
        episode_number INTEGER,
        season_number INTEGER,
        transcript TEXT NOT NULL DEFAULT '',
        status TEXT NOT NULL DEFAULT 'active',
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        FOREIGN KEY (podcast_id) REFERENCES podcasts(id) ON DELETE CASCADE,
        UNIQUE(podcast_id, guid)
    );

    CREATE INDEX IF NOT EXISTS idx_episodes_podcast ON episodes(podcast_id);

    CREATE TABLE IF NOT EXISTS sync_logs (
        id BLOB PRIMARY KEY,
        podcast_id BLOB NOT NULL,
        status TEXT NOT NULL,
        episodes_added INTEGER NOT NULL DEFAULT 0,
        episodes_updated INTEGER NOT NULL DEFAULT 0,
        error_message TEXT,
        created_at TEXT NOT NULL,
        FOREIGN KEY (podcast_id) REFERENCES podcasts(id) ON DELETE CASCADE
    );

    CREATE INDEX IF NOT EXISTS idx_sync_logs_podcast_created
        ON sync_logs(podcast_id, created_at DESC);
"#;

/// Handle to the catalogue database, shareable across tasks
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) the database file at `path` and ensure the schema exists
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode=WAL;
            PRAGMA synchronous=NORMAL;
        ",
        )?;
        debug!(path = %path.display(), "opened database");
        Self::from_connection(conn)
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Lock the connection for a sequence of statements.
    ///
    /// A panic while the lock was held leaves it poisoned. Any transaction
    /// open at that point was rolled back on drop, so the connection is
    /// taken over as is.
    pub fn connection(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` inside a transaction that commits only when `f` returns `Ok`.
    ///
    /// Returning an error, or unwinding out of `f`, rolls everything back.
    pub fn with_transaction<T, E>(
        &self,
        f: impl FnOnce(&Transaction<'_>) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<StoreError>,
    {
        let mut conn = self.connection();
        let tx = conn.transaction().map_err(StoreError::from)?;

        let value = f(&tx)?;
        tx.commit().map_err(StoreError::from)?;
        Ok(value)
    }
}

macro_rules! sql_text_enum {
    ($ty:ty) => {
        impl ToSql for $ty {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $ty {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                value
                    .as_str()?
                    .parse()
                    .map_err(|other: String| FromSqlError::Other(other.into()))
            }
        }
    };
}

sql_text_enum!(PodcastStatus);
sql_text_enum!(EpisodeStatus);
sql_text_enum!(SyncStatus);
