// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Merge a freshly parsed feed into the stored catalogue state.
//!
//! Reconciliation is pure: it only decides what to write. The feed wins for
//! any field where it carries a meaningful value that differs from what is
//! stored; blank or default feed values never erase stored data.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::feed::{NormalizedFeed, NormalizedFeedItem};
use crate::models::{Episode, EpisodeStatus, Podcast};

/// Everything one sync needs to write
#[derive(Debug, Clone)]
pub struct ReconcilePlan {
    /// The podcast with feed metadata merged in and `last_synced_at` set
    pub podcast: Podcast,
    /// Whether any podcast metadata field changed
    pub metadata_changed: bool,
    /// Episodes whose GUID is not stored yet
    pub inserts: Vec<Episode>,
    /// Stored episodes with at least one changed field, already merged
    pub updates: Vec<Episode>,
}

impl ReconcilePlan {
    /// Whether the plan writes anything besides the sync timestamp
    pub fn has_changes(&self) -> bool {
        self.metadata_changed || !self.inserts.is_empty() || !self.updates.is_empty()
    }
}

/// Compute the writes that bring `podcast` and `existing` in line with `feed`.
///
/// Stored episodes missing from the feed are left untouched. When a GUID
/// appears more than once in the feed, the first occurrence wins.
pub fn reconcile(
    podcast: &Podcast,
    existing: &[Episode],
    feed: &NormalizedFeed,
    now: DateTime<Utc>,
) -> ReconcilePlan {
    let mut merged = podcast.clone();
    let metadata_changed = merge_podcast(&mut merged, feed);
    if metadata_changed {
        merged.updated_at = now;
    }
    merged.last_synced_at = Some(now);

    let by_guid: HashMap<&str, &Episode> = existing.iter().map(|e| (e.guid.as_str(), e)).collect();
    let mut seen: HashSet<&str> = HashSet::new();
    let mut inserts = Vec::new();
    let mut updates = Vec::new();

    for item in &feed.items {
        if !seen.insert(item.guid.as_str()) {
            continue;
        }

        match by_guid.get(item.guid.as_str()) {
            Some(stored) => {
                let mut episode = (*stored).clone();
                if merge_episode(&mut episode, item) {
                    episode.updated_at = now;
                    updates.push(episode);
                }
            }
            None => inserts.push(new_episode(podcast.id, item, now)),
        }
    }

    ReconcilePlan {
        podcast: merged,
        metadata_changed,
        inserts,
        updates,
    }
}

/// Replace `target` when `incoming` is non-blank and different
fn merge_text(target: &mut String, incoming: &str) -> bool {
    if incoming.is_empty() || target.as_str() == incoming {
        return false;
    }
    *target = incoming.to_string();
    true
}

fn merge_value<T: PartialEq + Copy>(target: &mut T, incoming: Option<T>) -> bool {
    match incoming {
        Some(value) if *target != value => {
            *target = value;
            true
        }
        _ => false,
    }
}

fn merge_podcast(podcast: &mut Podcast, feed: &NormalizedFeed) -> bool {
    // Non-short-circuiting `|` so every field is merged
    merge_text(&mut podcast.title, &feed.title)
        | merge_text(&mut podcast.description, &feed.description)
        | merge_text(&mut podcast.language, &feed.language)
        | merge_text(&mut podcast.author, &feed.author)
        | merge_text(&mut podcast.cover_image_url, &feed.cover_image_url)
        | merge_text(&mut podcast.website_url, &feed.website_url)
        | merge_text(&mut podcast.category, &feed.category)
        | merge_text(&mut podcast.subcategory, &feed.subcategory)
        | merge_value(&mut podcast.explicit, feed.explicit.then_some(true))
}

fn merge_episode(episode: &mut Episode, item: &NormalizedFeedItem) -> bool {
    let publication_date = (!item.publication_date_is_fallback).then_some(item.publication_date);

    merge_text(&mut episode.title, &item.title)
        | merge_text(&mut episode.description, &item.description)
        | merge_text(&mut episode.audio_url, &item.audio_url)
        | merge_value(&mut episode.duration, (item.duration > 0).then_some(item.duration))
        | merge_text(&mut episode.cover_image_url, &item.cover_image_url)
        | merge_value(&mut episode.publication_date, publication_date)
        | merge_value(&mut episode.episode_number, item.episode_number.map(Some))
        | merge_value(&mut episode.season_number, item.season_number.map(Some))
}

fn new_episode(podcast_id: Uuid, item: &NormalizedFeedItem, now: DateTime<Utc>) -> Episode {
    Episode {
        id: Uuid::new_v4(),
        podcast_id,
        title: item.title.clone(),
        description: item.description.clone(),
        audio_url: item.audio_url.clone(),
        duration: item.duration,
        cover_image_url: item.cover_image_url.clone(),
        publication_date: item.publication_date,
        guid: item.guid.clone(),
        episode_number: item.episode_number,
        season_number: item.season_number,
        transcript: String::new(),
        status: EpisodeStatus::Active,
        created_at: now,
        updated_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, 12, 0, 0).unwrap()
    }

    fn stored_podcast() -> Podcast {
        let mut podcast = Podcast::new(Uuid::new_v4(), "Stored Title", "https://example.com/feed.xml");
        podcast.description = "Stored description".to_string();
        podcast.author = "Stored Author".to_string();
        podcast.created_at = at(1);
        podcast.updated_at = at(1);
        podcast
    }

    fn item(guid: &str) -> NormalizedFeedItem {
        NormalizedFeedItem {
            guid: guid.to_string(),
            title: format!("Episode {guid}"),
            description: String::new(),
            audio_url: format!("https://example.com/{guid}.mp3"),
            duration: 0,
            cover_image_url: String::new(),
            publication_date: at(2),
            publication_date_is_fallback: false,
            episode_number: None,
            season_number: None,
        }
    }

    fn feed(items: Vec<NormalizedFeedItem>) -> NormalizedFeed {
        NormalizedFeed {
            title: "Stored Title".to_string(),
            items,
            ..Default::default()
        }
    }

    #[test]
    fn new_guids_become_inserts() {
        let podcast = stored_podcast();
        let plan = reconcile(&podcast, &[], &feed(vec![item("a"), item("b")]), at(10));

        assert_eq!(plan.inserts.len(), 2);
        assert!(plan.updates.is_empty());

        let inserted = &plan.inserts[0];
        assert_eq!(inserted.podcast_id, podcast.id);
        assert_eq!(inserted.guid, "a");
        assert_eq!(inserted.status, EpisodeStatus::Active);
        assert!(inserted.transcript.is_empty());
        assert_eq!(inserted.created_at, at(10));
    }

    #[test]
    fn unchanged_episodes_produce_no_writes() {
        let podcast = stored_podcast();
        let first = reconcile(&podcast, &[], &feed(vec![item("a")]), at(10));

        let second = reconcile(&first.podcast, &first.inserts, &feed(vec![item("a")]), at(11));
        assert!(second.inserts.is_empty());
        assert!(second.updates.is_empty());
        assert!(!second.has_changes());
        assert_eq!(second.podcast.last_synced_at, Some(at(11)));
    }

    #[test]
    fn changed_fields_become_updates() {
        let podcast = stored_podcast();
        let stored = reconcile(&podcast, &[], &feed(vec![item("a")]), at(10)).inserts;

        let mut changed = item("a");
        changed.title = "Renamed".to_string();
        changed.duration = 600;
        changed.episode_number = Some(7);

        let plan = reconcile(&podcast, &stored, &feed(vec![changed]), at(11));
        assert_eq!(plan.updates.len(), 1);

        let updated = &plan.updates[0];
        assert_eq!(updated.id, stored[0].id);
        assert_eq!(updated.title, "Renamed");
        assert_eq!(updated.duration, 600);
        assert_eq!(updated.episode_number, Some(7));
        assert_eq!(updated.created_at, at(10));
        assert_eq!(updated.updated_at, at(11));
    }

    #[test]
    fn blank_or_default_feed_values_never_erase() {
        let podcast = stored_podcast();
        let mut original = item("a");
        original.description = "Kept".to_string();
        original.duration = 1200;
        original.cover_image_url = "https://example.com/a.jpg".to_string();
        original.episode_number = Some(3);
        let stored = reconcile(&podcast, &[], &feed(vec![original]), at(10)).inserts;

        let mut sparse = item("a");
        sparse.publication_date = at(20);
        sparse.publication_date_is_fallback = true;

        let plan = reconcile(&podcast, &stored, &feed(vec![sparse]), at(11));
        assert!(plan.updates.is_empty());
    }

    #[test]
    fn duplicate_guids_in_feed_first_wins() {
        let podcast = stored_podcast();
        let mut second = item("a");
        second.title = "Second copy".to_string();

        let plan = reconcile(&podcast, &[], &feed(vec![item("a"), second]), at(10));
        assert_eq!(plan.inserts.len(), 1);
        assert_eq!(plan.inserts[0].title, "Episode a");
    }

    #[test]
    fn episodes_missing_from_feed_are_untouched() {
        let podcast = stored_podcast();
        let stored = reconcile(&podcast, &[], &feed(vec![item("gone")]), at(10)).inserts;

        let plan = reconcile(&podcast, &stored, &feed(vec![]), at(11));
        assert!(plan.inserts.is_empty());
        assert!(plan.updates.is_empty());
    }

    #[test]
    fn podcast_metadata_merges_non_empty_values() {
        let podcast = stored_podcast();
        let incoming = NormalizedFeed {
            title: "New Title".to_string(),
            description: String::new(),
            language: "en".to_string(),
            author: "Stored Author".to_string(),
            explicit: true,
            ..Default::default()
        };

        let plan = reconcile(&podcast, &[], &incoming, at(10));
        assert!(plan.metadata_changed);
        assert_eq!(plan.podcast.title, "New Title");
        assert_eq!(plan.podcast.description, "Stored description");
        assert_eq!(plan.podcast.language, "en");
        assert!(plan.podcast.explicit);
        assert_eq!(plan.podcast.updated_at, at(10));
        assert_eq!(plan.podcast.last_synced_at, Some(at(10)));
    }

    #[test]
    fn unchanged_metadata_keeps_updated_at() {
        let podcast = stored_podcast();
        let plan = reconcile(&podcast, &[], &feed(vec![]), at(10));

        assert!(!plan.metadata_changed);
        assert_eq!(plan.podcast.updated_at, at(1));
        assert_eq!(plan.podcast.last_synced_at, Some(at(10)));
    }

    #[test]
    fn explicit_flag_is_never_cleared_by_feed() {
        let mut podcast = stored_podcast();
        podcast.explicit = true;

        let plan = reconcile(&podcast, &[], &feed(vec![]), at(10));
        assert!(plan.podcast.explicit);
        assert!(!plan.metadata_changed);
    }
}
