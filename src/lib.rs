pub mod config;
pub mod error;
pub mod feed;
pub mod guard;
pub mod http;
pub mod models;
pub mod progress;
pub mod reconcile;
pub mod scheduler;
pub mod store;
pub mod sync;
pub mod sync_log;
pub mod writer;

// Re-export main types for convenience
pub use config::{ScheduleConfig, SyncConfig, WriteFailurePolicy};
pub use error::{FetchError, ParseError, StoreError, SyncError, WriteError};
pub use feed::{NormalizedFeed, NormalizedFeedItem, fetch_feed_bytes, parse_feed};
pub use guard::{SyncGuard, SyncGuardRegistry};
pub use http::{HttpClient, HttpResponse, ReqwestClient};
pub use models::{
    Episode, EpisodeStatus, Page, Podcast, PodcastStatus, SyncLogEntry, SyncResult, SyncStatus,
};
pub use progress::{NoopReporter, ProgressEvent, ProgressReporter, SharedProgressReporter};
pub use reconcile::{ReconcilePlan, reconcile};
pub use scheduler::run_periodic;
pub use store::Database;
pub use sync::{PodcastSyncStatus, SyncService};
pub use sync_log::SyncLogRecorder;
pub use writer::WriteOutcome;
