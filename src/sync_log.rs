// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Append-only record of sync attempts, written outside the sync transaction

use std::sync::Arc;

use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{Page, SyncLogEntry};
use crate::store::{Database, sync_logs};

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Clone)]
pub struct SyncLogRecorder {
    db: Arc<Database>,
}

impl SyncLogRecorder {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub async fn record_success(
        &self,
        podcast_id: Uuid,
        episodes_added: u32,
        episodes_updated: u32,
    ) -> Result<SyncLogEntry, StoreError> {
        self.record(SyncLogEntry::success(podcast_id, episodes_added, episodes_updated))
            .await
    }

    pub async fn record_failure(
        &self,
        podcast_id: Uuid,
        error_message: impl Into<String>,
    ) -> Result<SyncLogEntry, StoreError> {
        self.record(SyncLogEntry::failure(podcast_id, error_message))
            .await
    }

    async fn record(&self, entry: SyncLogEntry) -> Result<SyncLogEntry, StoreError> {
        let db = Arc::clone(&self.db);
        blocking(move || {
            sync_logs::create(&db.connection(), &entry)?;
            Ok(entry)
        })
        .await
    }

    /// Most recent attempt for a podcast
    pub async fn latest(&self, podcast_id: Uuid) -> Result<Option<SyncLogEntry>, StoreError> {
        let db = Arc::clone(&self.db);
        blocking(move || sync_logs::latest(&db.connection(), podcast_id)).await
    }

    /// A page of attempts, newest first.
    ///
    /// Pages start at 1; a page size of 0 means the default and sizes above
    /// the maximum are capped.
    pub async fn history(
        &self,
        podcast_id: Uuid,
        page: u32,
        page_size: u32,
    ) -> Result<Page<SyncLogEntry>, StoreError> {
        let (page, page_size) = clamp_page(page, page_size);
        let offset = u64::from(page - 1) * u64::from(page_size);

        let db = Arc::clone(&self.db);
        let (items, total) =
            blocking(move || sync_logs::list(&db.connection(), podcast_id, page_size, offset))
                .await?;

        Ok(Page {
            items,
            total,
            page,
            page_size,
        })
    }
}

fn clamp_page(page: u32, page_size: u32) -> (u32, u32) {
    let page_size = match page_size {
        0 => DEFAULT_PAGE_SIZE,
        size => size.min(MAX_PAGE_SIZE),
    };
    (page.max(1), page_size)
}

/// Run SQLite work on the blocking pool
pub(crate) async fn blocking<T, F>(f: F) -> Result<T, StoreError>
where
    F: FnOnce() -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| StoreError::TaskFailed(e.to_string()))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SyncStatus;
    use crate::store::test_support::*;

    #[test]
    fn page_parameters_are_clamped() {
        assert_eq!(clamp_page(0, 0), (1, DEFAULT_PAGE_SIZE));
        assert_eq!(clamp_page(3, 500), (3, MAX_PAGE_SIZE));
        assert_eq!(clamp_page(2, 10), (2, 10));
    }

    #[tokio::test]
    async fn records_and_reads_back_attempts() {
        let db = Arc::new(memory_db());
        let podcast = seed_podcast(&db, "recorded");
        let recorder = SyncLogRecorder::new(Arc::clone(&db));

        recorder.record_success(podcast.id, 3, 1).await.unwrap();
        let failure = recorder
            .record_failure(podcast.id, "Feed request failed with status: 500 Internal Server Error")
            .await
            .unwrap();

        let latest = recorder.latest(podcast.id).await.unwrap().unwrap();
        assert_eq!(latest.id, failure.id);
        assert_eq!(latest.status, SyncStatus::Failure);

        let page = recorder.history(podcast.id, 1, 0).await.unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].id, failure.id);
    }

    #[tokio::test]
    async fn history_pages_past_the_end_are_empty() {
        let db = Arc::new(memory_db());
        let podcast = seed_podcast(&db, "sparse");
        let recorder = SyncLogRecorder::new(Arc::clone(&db));
        recorder.record_success(podcast.id, 0, 0).await.unwrap();

        let page = recorder.history(podcast.id, 5, 10).await.unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.total, 1);
        assert_eq!(page.page, 5);
    }

    #[tokio::test]
    async fn unknown_podcast_cannot_be_logged() {
        let recorder = SyncLogRecorder::new(Arc::new(memory_db()));
        assert!(recorder.record_success(Uuid::new_v4(), 0, 0).await.is_err());
    }
}
