// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EpisodeStatus {
    Active,
    Archived,
}

impl EpisodeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EpisodeStatus::Active => "active",
            EpisodeStatus::Archived => "archived",
        }
    }
}

impl fmt::Display for EpisodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EpisodeStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(EpisodeStatus::Active),
            "archived" => Ok(EpisodeStatus::Archived),
            other => Err(other.to_string()),
        }
    }
}

/// A stored podcast episode, keyed within its podcast by the feed GUID
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    pub id: Uuid,
    pub podcast_id: Uuid,
    pub title: String,
    pub description: String,
    pub audio_url: String,
    /// Length in seconds, 0 when unknown
    pub duration: i64,
    pub cover_image_url: String,
    pub publication_date: DateTime<Utc>,
    pub guid: String,
    pub episode_number: Option<i32>,
    pub season_number: Option<i32>,
    pub transcript: String,
    pub status: EpisodeStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_strings() {
        for status in [EpisodeStatus::Active, EpisodeStatus::Archived] {
            assert_eq!(status.to_string().parse::<EpisodeStatus>(), Ok(status));
        }
        assert_eq!("removed".parse::<EpisodeStatus>(), Err("removed".to_string()));
    }
}
