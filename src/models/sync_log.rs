// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Outcome of one sync attempt as recorded in the sync log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Success,
    Failure,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Success => "success",
            SyncStatus::Failure => "failure",
        }
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(SyncStatus::Success),
            "failure" => Ok(SyncStatus::Failure),
            other => Err(other.to_string()),
        }
    }
}

/// Append-only audit record of a sync attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncLogEntry {
    pub id: Uuid,
    pub podcast_id: Uuid,
    pub status: SyncStatus,
    pub episodes_added: u32,
    pub episodes_updated: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl SyncLogEntry {
    pub fn success(podcast_id: Uuid, episodes_added: u32, episodes_updated: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            podcast_id,
            status: SyncStatus::Success,
            episodes_added,
            episodes_updated,
            error_message: None,
            created_at: Utc::now(),
        }
    }

    pub fn failure(podcast_id: Uuid, error_message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            podcast_id,
            status: SyncStatus::Failure,
            episodes_added: 0,
            episodes_updated: 0,
            error_message: Some(error_message.into()),
            created_at: Utc::now(),
        }
    }
}

/// Result of a single podcast sync, as returned to callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncResult {
    pub podcast_id: Uuid,
    pub success: bool,
    pub episodes_added: u32,
    pub episodes_updated: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Episodes skipped by a per-item write failure (GUID, error message)
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub failed_items: Vec<(String, String)>,
}

impl SyncResult {
    pub fn failed(podcast_id: Uuid, error_message: impl Into<String>) -> Self {
        Self {
            podcast_id,
            success: false,
            episodes_added: 0,
            episodes_updated: 0,
            error_message: Some(error_message.into()),
            failed_items: vec![],
        }
    }
}

/// One page of a paginated listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
}
