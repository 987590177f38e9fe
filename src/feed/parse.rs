// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::error::ParseError;

use super::fields::{
    clean_html, first_non_empty, parse_duration, parse_flag, parse_number, parse_pub_date,
};
use super::lenient::repair_markup;

/// Podcast-agnostic view of one fetched feed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedFeed {
    pub title: String,
    pub description: String,
    pub language: String,
    pub author: String,
    pub cover_image_url: String,
    pub website_url: String,
    pub category: String,
    pub subcategory: String,
    pub explicit: bool,
    pub items: Vec<NormalizedFeedItem>,
}

/// One usable feed entry; always has an audio URL and a GUID
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedFeedItem {
    pub guid: String,
    pub title: String,
    pub description: String,
    pub audio_url: String,
    /// Length in seconds, 0 when missing or unparseable
    pub duration: i64,
    pub cover_image_url: String,
    pub publication_date: DateTime<Utc>,
    /// The feed date could not be parsed and `publication_date` is the fetch time
    pub publication_date_is_fallback: bool,
    pub episode_number: Option<i32>,
    pub season_number: Option<i32>,
}

/// Parse raw feed bytes into a [`NormalizedFeed`].
///
/// Markup a strict reader rejects is repaired once and decoded again before
/// giving up.
pub fn parse_feed(xml_bytes: &[u8]) -> Result<NormalizedFeed, ParseError> {
    let channel = match rss::Channel::read_from(xml_bytes) {
        Ok(channel) => channel,
        Err(strict_err) => {
            debug!(error = %strict_err, "strict feed decoding failed, retrying leniently");
            let repaired = repair_markup(xml_bytes);
            rss::Channel::read_from(repaired.as_bytes()).map_err(|lenient_err| {
                warn!(error = %lenient_err, "feed could not be decoded");
                ParseError::Xml(strict_err)
            })?
        }
    };

    normalize_channel(&channel, Utc::now())
}

/// Map a decoded channel onto the normalized shape; `now` backs unparseable dates
pub fn normalize_channel(
    channel: &rss::Channel,
    now: DateTime<Utc>,
) -> Result<NormalizedFeed, ParseError> {
    let title = channel.title().trim();
    if title.is_empty() {
        return Err(ParseError::MissingTitle);
    }

    let (category, subcategory) = resolve_category(channel);
    let cover_image_url = resolve_cover_image(channel);

    let items: Vec<NormalizedFeedItem> = channel
        .items()
        .iter()
        .filter_map(|item| normalize_item(item, &cover_image_url, now))
        .collect();

    debug!(
        title,
        total_items = channel.items().len(),
        usable_items = items.len(),
        "normalized feed"
    );

    Ok(NormalizedFeed {
        title: title.to_string(),
        description: channel.description().trim().to_string(),
        language: channel.language().unwrap_or_default().trim().to_string(),
        author: resolve_author(channel, title),
        cover_image_url,
        website_url: channel.link().trim().to_string(),
        category,
        subcategory,
        explicit: channel
            .itunes_ext()
            .and_then(|ext| ext.explicit.as_deref())
            .is_some_and(parse_flag),
        items,
    })
}

/// Channel author, then `itunes:author`, then the owner name, then the title
fn resolve_author(channel: &rss::Channel, title: &str) -> String {
    let itunes = channel.itunes_ext();
    let dublin_core_creator = channel
        .dublin_core_ext()
        .and_then(|dc| dc.creators.first())
        .map(String::as_str);

    first_non_empty([
        channel.managing_editor(),
        dublin_core_creator,
        itunes.and_then(|ext| ext.author.as_deref()),
        itunes
            .and_then(|ext| ext.owner.as_ref())
            .and_then(|owner| owner.name.as_deref()),
    ])
    .unwrap_or(title)
    .to_string()
}

/// `itunes:image` href, then the RSS `image` URL
fn resolve_cover_image(channel: &rss::Channel) -> String {
    first_non_empty([
        channel.itunes_ext().and_then(|ext| ext.image.as_deref()),
        channel.image().map(|image| image.url()),
    ])
    .unwrap_or_default()
    .to_string()
}

/// First `itunes:category` text (then the first plain `category`), plus its nested subcategory
fn resolve_category(channel: &rss::Channel) -> (String, String) {
    let itunes_category = channel
        .itunes_ext()
        .and_then(|ext| ext.categories.first());

    let category = first_non_empty([
        itunes_category.map(|c| c.text.as_str()),
        channel.categories().first().map(|c| c.name()),
    ])
    .unwrap_or_default();

    let subcategory = itunes_category
        .and_then(|c| c.subcategory.as_deref())
        .map(|sub| sub.text.trim())
        .unwrap_or_default();

    (category.to_string(), subcategory.to_string())
}

fn normalize_item(
    item: &rss::Item,
    podcast_cover: &str,
    now: DateTime<Utc>,
) -> Option<NormalizedFeedItem> {
    let audio_url = item.enclosure().map(|e| e.url().trim()).unwrap_or_default();
    let guid = item.guid().map(|g| g.value().trim()).unwrap_or_default();

    if audio_url.is_empty() || guid.is_empty() {
        debug!(
            title = item.title().unwrap_or_default(),
            "skipping feed item without enclosure URL or GUID"
        );
        return None;
    }

    let itunes = item.itunes_ext();

    let description = first_non_empty([
        itunes.and_then(|ext| ext.summary.as_deref()),
        item.description(),
        item.content(),
    ])
    .map(clean_html)
    .unwrap_or_default();

    let parsed_date = item.pub_date().and_then(parse_pub_date);

    let cover_image_url = first_non_empty([itunes.and_then(|ext| ext.image.as_deref())])
        .unwrap_or(podcast_cover)
        .to_string();

    Some(NormalizedFeedItem {
        guid: guid.to_string(),
        title: item.title().unwrap_or_default().trim().to_string(),
        description,
        audio_url: audio_url.to_string(),
        duration: itunes
            .and_then(|ext| ext.duration.as_deref())
            .map(parse_duration)
            .unwrap_or(0),
        cover_image_url,
        publication_date: parsed_date.unwrap_or(now),
        publication_date_is_fallback: parsed_date.is_none(),
        episode_number: parse_number(itunes.and_then(|ext| ext.episode.as_deref())),
        season_number: parse_number(itunes.and_then(|ext| ext.season.as_deref())),
    })
}
