use std::sync::Arc;

use uuid::Uuid;

/// Events emitted during podcast synchronization for progress reporting
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// A sync-all batch is starting
    BatchStarted { total: usize },

    /// Feed is being fetched from URL
    FetchingFeed { podcast_id: Uuid, url: String },

    /// Feed has been parsed successfully
    FeedParsed {
        podcast_id: Uuid,
        podcast_title: String,
        /// Usable items in the feed
        total_items: usize,
    },

    /// Sync of one podcast committed
    SyncCompleted {
        podcast_id: Uuid,
        podcast_title: String,
        episodes_added: u32,
        episodes_updated: u32,
        /// Episodes rolled back individually under the skip-item policy
        episodes_skipped: usize,
    },

    /// Sync of one podcast failed and was rolled back
    SyncFailed { podcast_id: Uuid, error: String },

    /// A sync-all batch finished
    BatchCompleted {
        succeeded: usize,
        failed: usize,
    },
}

/// Trait for reporting progress events during synchronization.
///
/// Implementations can use this to display progress bars, log messages,
/// or collect statistics.
pub trait ProgressReporter: Send + Sync {
    /// Report a progress event
    fn report(&self, event: ProgressEvent);
}

/// A shared reference to a progress reporter
pub type SharedProgressReporter = Arc<dyn ProgressReporter>;

/// A no-op progress reporter that silently ignores all events.
/// Useful for tests or quiet mode.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn report(&self, _event: ProgressEvent) {
        // Intentionally empty
    }
}

impl NoopReporter {
    /// Create a new NoopReporter wrapped in an Arc
    pub fn shared() -> SharedProgressReporter {
        Arc::new(Self)
    }
}
