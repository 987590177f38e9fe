// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use uuid::Uuid;

/// Process-wide record of which podcasts are currently being synced
#[derive(Debug, Clone, Default)]
pub struct SyncGuardRegistry {
    running: Arc<Mutex<HashSet<Uuid>>>,
}

impl SyncGuardRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `podcast_id`, or `None` if a sync for it is already running.
    ///
    /// The claim is released when the returned guard is dropped, including
    /// while unwinding from a panic.
    pub fn try_acquire(&self, podcast_id: Uuid) -> Option<SyncGuard> {
        let mut running = self.running.lock().unwrap_or_else(PoisonError::into_inner);
        if !running.insert(podcast_id) {
            return None;
        }

        Some(SyncGuard {
            registry: self.clone(),
            podcast_id,
        })
    }

    pub fn is_running(&self, podcast_id: Uuid) -> bool {
        self.running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&podcast_id)
    }
}

/// Exclusive claim on one podcast's sync
#[derive(Debug)]
pub struct SyncGuard {
    registry: SyncGuardRegistry,
    podcast_id: Uuid,
}

impl SyncGuard {
    pub fn podcast_id(&self) -> Uuid {
        self.podcast_id
    }
}

impl Drop for SyncGuard {
    fn drop(&mut self) {
        self.registry
            .running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.podcast_id);
    }
}
