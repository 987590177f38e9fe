// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of a podcast; only active podcasts are picked up by batch syncs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PodcastStatus {
    Active,
    Inactive,
}

impl PodcastStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PodcastStatus::Active => "active",
            PodcastStatus::Inactive => "inactive",
        }
    }
}

impl fmt::Display for PodcastStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PodcastStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(PodcastStatus::Active),
            "inactive" => Ok(PodcastStatus::Inactive),
            other => Err(other.to_string()),
        }
    }
}

/// A podcast owned by a podcaster account and backed by an RSS feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Podcast {
    pub id: Uuid,
    pub podcaster_id: Uuid,
    pub title: String,
    pub description: String,
    pub cover_image_url: String,
    pub rss_url: String,
    pub website_url: String,
    pub language: String,
    pub author: String,
    pub category: String,
    pub subcategory: String,
    pub explicit: bool,
    pub status: PodcastStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_synced_at: Option<DateTime<Utc>>,
}

impl Podcast {
    /// Create an active podcast with empty metadata for the given feed URL
    pub fn new(podcaster_id: Uuid, title: &str, rss_url: &str) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            podcaster_id,
            title: title.to_string(),
            description: String::new(),
            cover_image_url: String::new(),
            rss_url: rss_url.to_string(),
            website_url: String::new(),
            language: String::new(),
            author: String::new(),
            category: String::new(),
            subcategory: String::new(),
            explicit: false,
            status: PodcastStatus::Active,
            created_at: now,
            updated_at: now,
            last_synced_at: None,
        }
    }

    /// Whether the podcast has a feed the sync engine can fetch
    pub fn has_feed(&self) -> bool {
        !self.rss_url.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_podcast_is_active_and_unsynced() {
        let podcast = Podcast::new(Uuid::new_v4(), "Test Podcast", "https://example.com/feed.xml");

        assert_eq!(podcast.status, PodcastStatus::Active);
        assert!(podcast.last_synced_at.is_none());
        assert!(podcast.has_feed());
        assert_eq!(podcast.created_at, podcast.updated_at);
    }

    #[test]
    fn blank_feed_url_is_not_a_feed() {
        let podcast = Podcast::new(Uuid::new_v4(), "Test Podcast", "   ");
        assert!(!podcast.has_feed());
    }

    #[test]
    fn status_round_trips_through_strings() {
        for status in [PodcastStatus::Active, PodcastStatus::Inactive] {
            assert_eq!(status.as_str().parse::<PodcastStatus>(), Ok(status));
        }
        assert!("deleted".parse::<PodcastStatus>().is_err());
    }

    #[test]
    fn serializes_status_lowercase() {
        let podcast = Podcast::new(Uuid::nil(), "Test", "https://example.com/feed.xml");
        let json = serde_json::to_value(&podcast).unwrap();
        assert_eq!(json["status"], "active");
        assert_eq!(json["last_synced_at"], serde_json::Value::Null);
    }
}
