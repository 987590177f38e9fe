// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

use crate::config::SyncConfig;
use crate::error::{StoreError, SyncError, WriteError};
use crate::feed::{NormalizedFeed, fetch_feed_bytes, parse_feed};
use crate::guard::{SyncGuard, SyncGuardRegistry};
use crate::http::HttpClient;
use crate::models::{Page, Podcast, SyncLogEntry, SyncResult};
use crate::progress::{NoopReporter, ProgressEvent, SharedProgressReporter};
use crate::reconcile::reconcile;
use crate::store::{Database, episodes, podcasts};
use crate::sync_log::{SyncLogRecorder, blocking};
use crate::writer::{self, WriteOutcome};

/// Snapshot of a podcast's sync state
#[derive(Debug, Clone, Serialize)]
pub struct PodcastSyncStatus {
    pub podcast_id: Uuid,
    pub title: String,
    /// A sync for this podcast is running right now
    pub running: bool,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub latest: Option<SyncLogEntry>,
}

/// Coordinates fetch, parse, reconcile and write for podcasts in the catalogue
pub struct SyncService<C> {
    client: C,
    db: Arc<Database>,
    guards: SyncGuardRegistry,
    logs: SyncLogRecorder,
    config: SyncConfig,
    reporter: SharedProgressReporter,
}

impl<C: HttpClient + 'static> SyncService<C> {
    pub fn new(client: C, db: Arc<Database>, config: SyncConfig) -> Self {
        Self {
            client,
            logs: SyncLogRecorder::new(Arc::clone(&db)),
            db,
            guards: SyncGuardRegistry::new(),
            config,
            reporter: NoopReporter::shared(),
        }
    }

    /// Replace the progress reporter
    pub fn with_reporter(mut self, reporter: SharedProgressReporter) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn guards(&self) -> &SyncGuardRegistry {
        &self.guards
    }

    /// Synchronize one podcast with its feed.
    ///
    /// Fails immediately with [`SyncError::InProgress`] when a sync for the
    /// same podcast is already running. Every attempt that gets past the
    /// guard and finds the podcast leaves exactly one sync log entry.
    pub async fn sync_podcast(
        &self,
        podcast_id: Uuid,
        cancel: &CancellationToken,
    ) -> Result<SyncResult, SyncError> {
        let guard = self
            .guards
            .try_acquire(podcast_id)
            .ok_or(SyncError::InProgress(podcast_id))?;
        self.run_guarded(guard, cancel).await
    }

    /// [`Self::sync_podcast`] bounded by the configured sync timeout
    pub async fn sync_podcast_with_timeout(
        &self,
        podcast_id: Uuid,
        cancel: &CancellationToken,
    ) -> Result<SyncResult, SyncError> {
        let token = cancel.child_token();
        within_deadline(
            self.sync_podcast(podcast_id, &token),
            self.config.sync_timeout,
            &token,
        )
        .await
    }

    /// Start a sync in the background and return at once.
    ///
    /// The guard is taken before spawning, so a concurrent sync is reported
    /// to the caller instead of failing silently in the task.
    pub fn spawn_sync(
        self: &Arc<Self>,
        podcast_id: Uuid,
    ) -> Result<JoinHandle<Result<SyncResult, SyncError>>, SyncError> {
        let guard = self
            .guards
            .try_acquire(podcast_id)
            .ok_or(SyncError::InProgress(podcast_id))?;

        let service = Arc::clone(self);
        Ok(tokio::spawn(async move {
            let token = CancellationToken::new();
            within_deadline(
                service.run_guarded(guard, &token),
                service.config.sync_timeout,
                &token,
            )
            .await
        }))
    }

    /// Synchronize every active podcast that has a feed.
    ///
    /// One result per podcast; a failing podcast never stops the others.
    pub async fn sync_all(&self, cancel: &CancellationToken) -> Result<Vec<SyncResult>, SyncError> {
        let db = Arc::clone(&self.db);
        let active = blocking(move || podcasts::get_active(&db.connection())).await?;

        info!(podcasts = active.len(), "starting sync of all active podcasts");
        self.reporter.report(ProgressEvent::BatchStarted {
            total: active.len(),
        });

        let results: Vec<SyncResult> = stream::iter(active)
            .map(|podcast| async move {
                match self.sync_podcast(podcast.id, cancel).await {
                    Ok(result) => result,
                    Err(e) => SyncResult::failed(podcast.id, e.to_string()),
                }
            })
            .buffer_unordered(self.config.max_concurrent_syncs.max(1))
            .collect()
            .await;

        let succeeded = results.iter().filter(|r| r.success).count();
        let failed = results.len() - succeeded;
        info!(succeeded, failed, "finished sync of all active podcasts");
        self.reporter
            .report(ProgressEvent::BatchCompleted { succeeded, failed });

        Ok(results)
    }

    /// [`Self::sync_all`] bounded by the configured batch timeout
    pub async fn sync_all_with_timeout(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<SyncResult>, SyncError> {
        let token = cancel.child_token();
        within_deadline(self.sync_all(&token), self.config.batch_timeout, &token).await
    }

    /// Validate, de-duplicate, fetch and parse a feed that is not yet registered
    pub async fn preview_feed(&self, rss_url: &str) -> Result<NormalizedFeed, SyncError> {
        validate_feed_url(rss_url)?;

        let db = Arc::clone(&self.db);
        let lookup = rss_url.to_string();
        if blocking(move || podcasts::get_by_rss_url(&db.connection(), &lookup))
            .await?
            .is_some()
        {
            return Err(SyncError::FeedAlreadyRegistered(rss_url.to_string()));
        }

        let bytes = fetch_feed_bytes(&self.client, rss_url).await?;
        Ok(parse_feed(&bytes)?)
    }

    /// Create a podcast owned by `podcaster_id`, seeded from its feed metadata.
    ///
    /// Episodes are not imported; run a sync afterwards.
    pub async fn register_podcast(
        &self,
        podcaster_id: Uuid,
        rss_url: &str,
    ) -> Result<Podcast, SyncError> {
        let feed = self.preview_feed(rss_url).await?;

        let mut podcast = Podcast::new(podcaster_id, &feed.title, rss_url);
        podcast.description = feed.description;
        podcast.language = feed.language;
        podcast.author = feed.author;
        podcast.cover_image_url = feed.cover_image_url;
        podcast.website_url = feed.website_url;
        podcast.category = feed.category;
        podcast.subcategory = feed.subcategory;
        podcast.explicit = feed.explicit;

        let db = Arc::clone(&self.db);
        let row = podcast.clone();
        blocking(move || podcasts::create(&db.connection(), &row)).await?;

        info!(podcast_id = %podcast.id, title = %podcast.title, "registered podcast");
        Ok(podcast)
    }

    pub async fn sync_status(&self, podcast_id: Uuid) -> Result<PodcastSyncStatus, SyncError> {
        let podcast = self
            .load_podcast(podcast_id)
            .await?
            .ok_or(SyncError::PodcastNotFound(podcast_id))?;
        let latest = self.logs.latest(podcast_id).await?;

        Ok(PodcastSyncStatus {
            podcast_id,
            title: podcast.title,
            running: self.guards.is_running(podcast_id),
            last_synced_at: podcast.last_synced_at,
            latest,
        })
    }

    pub async fn sync_history(
        &self,
        podcast_id: Uuid,
        page: u32,
        page_size: u32,
    ) -> Result<Page<SyncLogEntry>, SyncError> {
        if self.load_podcast(podcast_id).await?.is_none() {
            return Err(SyncError::PodcastNotFound(podcast_id));
        }
        Ok(self.logs.history(podcast_id, page, page_size).await?)
    }

    async fn load_podcast(&self, podcast_id: Uuid) -> Result<Option<Podcast>, StoreError> {
        let db = Arc::clone(&self.db);
        blocking(move || podcasts::get_by_id(&db.connection(), podcast_id)).await
    }

    /// Run one attempt while holding the guard, then record its outcome
    async fn run_guarded(
        &self,
        guard: SyncGuard,
        cancel: &CancellationToken,
    ) -> Result<SyncResult, SyncError> {
        let podcast_id = guard.podcast_id();

        match self.attempt(podcast_id, cancel).await {
            Ok((title, outcome)) => {
                info!(
                    %podcast_id,
                    added = outcome.episodes_added,
                    updated = outcome.episodes_updated,
                    skipped = outcome.failed_items.len(),
                    "sync completed"
                );
                if let Err(e) = self
                    .logs
                    .record_success(podcast_id, outcome.episodes_added, outcome.episodes_updated)
                    .await
                {
                    warn!(%podcast_id, error = %e, "failed to record sync log");
                }
                self.reporter.report(ProgressEvent::SyncCompleted {
                    podcast_id,
                    podcast_title: title,
                    episodes_added: outcome.episodes_added,
                    episodes_updated: outcome.episodes_updated,
                    episodes_skipped: outcome.failed_items.len(),
                });

                Ok(SyncResult {
                    podcast_id,
                    success: true,
                    episodes_added: outcome.episodes_added,
                    episodes_updated: outcome.episodes_updated,
                    error_message: None,
                    failed_items: outcome.failed_items,
                })
            }
            Err(err) => {
                if err.is_attempt_failure() {
                    warn!(%podcast_id, error = %err, "sync failed");
                    if let Err(e) = self.logs.record_failure(podcast_id, err.to_string()).await {
                        warn!(%podcast_id, error = %e, "failed to record sync log");
                    }
                    self.reporter.report(ProgressEvent::SyncFailed {
                        podcast_id,
                        error: err.to_string(),
                    });
                }
                Err(err)
            }
        }
    }

    /// Fetch, parse, then reconcile and write inside one transaction
    async fn attempt(
        &self,
        podcast_id: Uuid,
        cancel: &CancellationToken,
    ) -> Result<(String, WriteOutcome), SyncError> {
        let podcast = self
            .load_podcast(podcast_id)
            .await?
            .ok_or(SyncError::PodcastNotFound(podcast_id))?;
        if !podcast.has_feed() {
            return Err(SyncError::MissingFeedUrl(podcast_id));
        }

        self.reporter.report(ProgressEvent::FetchingFeed {
            podcast_id,
            url: podcast.rss_url.clone(),
        });
        let bytes = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(SyncError::Cancelled),
            fetched = fetch_feed_bytes(&self.client, &podcast.rss_url) => fetched?,
        };

        let feed = parse_feed(&bytes)?;
        debug!(%podcast_id, items = feed.items.len(), "parsed feed");
        self.reporter.report(ProgressEvent::FeedParsed {
            podcast_id,
            podcast_title: feed.title.clone(),
            total_items: feed.items.len(),
        });

        let title = feed.title.clone();
        let db = Arc::clone(&self.db);
        let policy = self.config.write_failure_policy;
        let cancel = cancel.clone();

        let written = tokio::task::spawn_blocking(move || {
            db.with_transaction(|tx| {
                let current = podcasts::get_by_id(tx, podcast_id)?
                    .ok_or(WriteError::PodcastVanished(podcast_id))?;
                let existing = episodes::get_all_by_podcast_id(tx, podcast_id)?;
                let plan = reconcile(&current, &existing, &feed, Utc::now());
                writer::apply(tx, &plan, policy, &cancel)
            })
        })
        .await
        .map_err(|e| StoreError::TaskFailed(e.to_string()))?;

        match written {
            Ok(outcome) => Ok((title, outcome)),
            Err(WriteError::Cancelled) => Err(SyncError::Cancelled),
            Err(e) => Err(e.into()),
        }
    }
}

/// Await `fut`, cancelling `token` once `deadline` passes.
///
/// After cancellation `fut` is still driven to completion so it can record
/// its own failure.
async fn within_deadline<F: Future>(fut: F, deadline: Duration, token: &CancellationToken) -> F::Output {
    tokio::pin!(fut);
    tokio::select! {
        output = &mut fut => output,
        _ = tokio::time::sleep(deadline) => {
            warn!(deadline_secs = deadline.as_secs(), "deadline passed, cancelling");
            token.cancel();
            fut.await
        }
    }
}

fn validate_feed_url(rss_url: &str) -> Result<(), SyncError> {
    let invalid = |reason: &str| SyncError::InvalidFeedUrl {
        url: rss_url.to_string(),
        reason: reason.to_string(),
    };

    let url = Url::parse(rss_url).map_err(|e| invalid(&e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid("only http and https feeds are supported"));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(invalid("missing host"));
    }
    Ok(())
}
