// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::time::Duration;

/// What the transactional writer does when a single episode write fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WriteFailurePolicy {
    /// Roll back the whole sync
    #[default]
    Abort,
    /// Roll back only the failed episode and keep going
    SkipItem,
}

/// Options for podcast synchronization
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// User-Agent sent with every feed request
    pub user_agent: String,
    /// Deadline for a single feed request
    pub fetch_timeout: Duration,
    /// Deadline for one interactive or background sync
    pub sync_timeout: Duration,
    /// Deadline for a whole sync-all batch
    pub batch_timeout: Duration,
    /// Maximum number of podcasts synced at the same time by sync-all
    pub max_concurrent_syncs: usize,
    pub write_failure_policy: WriteFailurePolicy,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("podsync/{}", env!("CARGO_PKG_VERSION")),
            fetch_timeout: Duration::from_secs(30),
            sync_timeout: Duration::from_secs(5 * 60),
            batch_timeout: Duration::from_secs(60 * 60),
            max_concurrent_syncs: 4,
            write_failure_policy: WriteFailurePolicy::Abort,
        }
    }
}

/// Timing of the periodic sync-all job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleConfig {
    pub initial_delay: Duration,
    pub interval: Duration,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(60),
            interval: Duration::from_secs(6 * 60 * 60),
        }
    }
}
