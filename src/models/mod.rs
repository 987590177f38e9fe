mod episode;
mod podcast;
mod sync_log;

pub use episode::{Episode, EpisodeStatus};
pub use podcast::{Podcast, PodcastStatus};
pub use sync_log::{Page, SyncLogEntry, SyncResult, SyncStatus};
