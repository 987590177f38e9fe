// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use rusqlite::{Connection, OptionalExtension, Row, params};
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{Podcast, PodcastStatus};

const COLUMNS: &str = "id, podcaster_id, title, description, cover_image_url, rss_url, \
     website_url, language, author, category, subcategory, explicit, status, \
     created_at, updated_at, last_synced_at";

fn from_row(row: &Row<'_>) -> rusqlite::Result<Podcast> {
    Ok(Podcast {
        id: row.get(0)?,
        podcaster_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        cover_image_url: row.get(4)?,
        rss_url: row.get(5)?,
        website_url: row.get(6)?,
        language: row.get(7)?,
        author: row.get(8)?,
        category: row.get(9)?,
        subcategory: row.get(10)?,
        explicit: row.get(11)?,
        status: row.get(12)?,
        created_at: row.get(13)?,
        updated_at: row.get(14)?,
        last_synced_at: row.get(15)?,
    })
}

pub fn create(conn: &Connection, podcast: &Podcast) -> Result<(), StoreError> {
    conn.execute(
        &format!(
            "INSERT INTO podcasts ({COLUMNS}) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)"
        ),
        params![
            podcast.id,
            podcast.podcaster_id,
            podcast.title,
            podcast.description,
            podcast.cover_image_url,
            podcast.rss_url,
            podcast.website_url,
            podcast.language,
            podcast.author,
            podcast.category,
            podcast.subcategory,
            podcast.explicit,
            podcast.status,
            podcast.created_at,
            podcast.updated_at,
            podcast.last_synced_at,
        ],
    )?;
    Ok(())
}

pub fn get_by_id(conn: &Connection, id: Uuid) -> Result<Option<Podcast>, StoreError> {
    let podcast = conn
        .query_row(
            &format!("SELECT {COLUMNS} FROM podcasts WHERE id = ?1"),
            params![id],
            from_row,
        )
        .optional()?;
    Ok(podcast)
}

pub fn get_by_rss_url(conn: &Connection, rss_url: &str) -> Result<Option<Podcast>, StoreError> {
    let podcast = conn
        .query_row(
            &format!("SELECT {COLUMNS} FROM podcasts WHERE rss_url = ?1 AND rss_url != ''"),
            params![rss_url],
            from_row,
        )
        .optional()?;
    Ok(podcast)
}

/// Active podcasts that have a feed, oldest first
pub fn get_active(conn: &Connection) -> Result<Vec<Podcast>, StoreError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM podcasts \
         WHERE status = ?1 AND rss_url != '' \
         ORDER BY created_at ASC"
    ))?;

    let podcasts = stmt
        .query_map(params![PodcastStatus::Active], from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(podcasts)
}

/// Overwrite every mutable column; returns whether a row matched
pub fn update(conn: &Connection, podcast: &Podcast) -> Result<bool, StoreError> {
    let changed = conn.execute(
        "UPDATE podcasts SET \
             title = ?2, description = ?3, cover_image_url = ?4, rss_url = ?5, \
             website_url = ?6, language = ?7, author = ?8, category = ?9, \
             subcategory = ?10, explicit = ?11, status = ?12, updated_at = ?13, \
             last_synced_at = ?14 \
         WHERE id = ?1",
        params![
            podcast.id,
            podcast.title,
            podcast.description,
            podcast.cover_image_url,
            podcast.rss_url,
            podcast.website_url,
            podcast.language,
            podcast.author,
            podcast.category,
            podcast.subcategory,
            podcast.explicit,
            podcast.status,
            podcast.updated_at,
            podcast.last_synced_at,
        ],
    )?;
    Ok(changed == 1)
}
