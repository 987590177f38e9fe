// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur when retrieving a feed over HTTP
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Failed to fetch feed from {url}: {source}")]
    RequestFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Feed request for {url} failed with status: {status}")]
    HttpStatus { url: String, status: String },
}

/// Errors that can occur when decoding a feed document
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Failed to parse feed XML: {0}")]
    Xml(#[from] rss::Error),

    #[error("Feed has no content or is not a valid podcast feed")]
    MissingTitle,
}

/// Errors raised by the SQLite store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Invalid value '{value}' stored in column {column}")]
    InvalidValue { column: &'static str, value: String },

    #[error("Database task failed: {0}")]
    TaskFailed(String),
}

/// Errors raised while reconciling and writing inside the sync transaction
#[derive(Error, Debug)]
pub enum WriteError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Podcast {0} disappeared while the sync transaction was open")]
    PodcastVanished(Uuid),

    #[error("Failed to create episode with GUID {guid}: {source}")]
    CreateEpisode {
        guid: String,
        #[source]
        source: StoreError,
    },

    #[error("Failed to update episode {id}: {source}")]
    UpdateEpisode {
        id: Uuid,
        #[source]
        source: StoreError,
    },

    #[error("Transaction was cancelled and rolled back")]
    Cancelled,
}

/// Top-level errors for sync operations
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Sync already in progress for podcast: {0}")]
    InProgress(Uuid),

    #[error("Podcast not found: {0}")]
    PodcastNotFound(Uuid),

    #[error("Podcast {0} has no RSS URL")]
    MissingFeedUrl(Uuid),

    #[error("A podcast with this RSS feed already exists: {0}")]
    FeedAlreadyRegistered(String),

    #[error("Invalid feed URL '{url}': {reason}")]
    InvalidFeedUrl { url: String, reason: String },

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Write error: {0}")]
    Write(#[from] WriteError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Sync was cancelled or timed out")]
    Cancelled,
}

impl SyncError {
    /// Whether this error means a sync attempt actually ran and must be logged
    pub fn is_attempt_failure(&self) -> bool {
        !matches!(
            self,
            SyncError::InProgress(_)
                | SyncError::PodcastNotFound(_)
                | SyncError::FeedAlreadyRegistered(_)
                | SyncError::InvalidFeedUrl { .. }
        )
    }
}
