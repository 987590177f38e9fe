//! Feed retrieval and normalization

pub mod fields;
mod fetch;
mod lenient;
mod parse;

pub use fetch::fetch_feed_bytes;
pub use lenient::repair_markup;
pub use parse::{NormalizedFeed, NormalizedFeedItem, normalize_channel, parse_feed};
