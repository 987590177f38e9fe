// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use rusqlite::{Connection, Row, params};
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::Episode;

const COLUMNS: &str = "id, podcast_id, title, description, audio_url, duration, \
     cover_image_url, publication_date, guid, episode_number, season_number, \
     transcript, status, created_at, updated_at";

fn from_row(row: &Row<'_>) -> rusqlite::Result<Episode> {
    Ok(Episode {
        id: row.get(0)?,
        podcast_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        audio_url: row.get(4)?,
        duration: row.get(5)?,
        cover_image_url: row.get(6)?,
        publication_date: row.get(7)?,
        guid: row.get(8)?,
        episode_number: row.get(9)?,
        season_number: row.get(10)?,
        transcript: row.get(11)?,
        status: row.get(12)?,
        created_at: row.get(13)?,
        updated_at: row.get(14)?,
    })
}

/// Every stored episode of a podcast, newest publication first
pub fn get_all_by_podcast_id(conn: &Connection, podcast_id: Uuid) -> Result<Vec<Episode>, StoreError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM episodes WHERE podcast_id = ?1 ORDER BY publication_date DESC"
    ))?;

    let episodes = stmt
        .query_map(params![podcast_id], from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(episodes)
}

pub fn create(conn: &Connection, episode: &Episode) -> Result<(), StoreError> {
    conn.execute(
        &format!(
            "INSERT INTO episodes ({COLUMNS}) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)"
        ),
        params![
            episode.id,
            episode.podcast_id,
            episode.title,
            episode.description,
            episode.audio_url,
            episode.duration,
            episode.cover_image_url,
            episode.publication_date,
            episode.guid,
            episode.episode_number,
            episode.season_number,
            episode.transcript,
            episode.status,
            episode.created_at,
            episode.updated_at,
        ],
    )?;
    Ok(())
}

/// Overwrite the feed-derived columns; transcript and status are left alone
pub fn update(conn: &Connection, episode: &Episode) -> Result<bool, StoreError> {
    let changed = conn.execute(
        "UPDATE episodes SET \
             title = ?2, description = ?3, audio_url = ?4, duration = ?5, \
             cover_image_url = ?6, publication_date = ?7, episode_number = ?8, \
             season_number = ?9, updated_at = ?10 \
         WHERE id = ?1",
        params![
            episode.id,
            episode.title,
            episode.description,
            episode.audio_url,
            episode.duration,
            episode.cover_image_url,
            episode.publication_date,
            episode.episode_number,
            episode.season_number,
            episode.updated_at,
        ],
    )?;
    Ok(changed == 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EpisodeStatus;
    use crate::store::test_support::*;

    #[test]
    fn create_and_list_episodes() {
        let db = memory_db();
        let podcast = seed_podcast(&db, "list");
        let conn = db.connection();

        let mut older = episode(podcast.id, "older");
        older.publication_date = at(1);
        let newer = episode(podcast.id, "newer");
        create(&conn, &older).unwrap();
        create(&conn, &newer).unwrap();

        let stored = get_all_by_podcast_id(&conn, podcast.id).unwrap();
        assert_eq!(stored, vec![newer, older]);
    }

    #[test]
    fn guid_is_unique_per_podcast() {
        let db = memory_db();
        let first = seed_podcast(&db, "first");
        let second = seed_podcast(&db, "second");
        let conn = db.connection();

        create(&conn, &episode(first.id, "shared")).unwrap();
        assert!(create(&conn, &episode(first.id, "shared")).is_err());
        create(&conn, &episode(second.id, "shared")).unwrap();
    }

    #[test]
    fn episodes_require_an_existing_podcast() {
        let db = memory_db();
        let conn = db.connection();
        assert!(create(&conn, &episode(Uuid::new_v4(), "orphan")).is_err());
    }

    #[test]
    fn update_keeps_transcript_and_status() {
        let db = memory_db();
        let podcast = seed_podcast(&db, "update");
        let conn = db.connection();

        let mut stored = episode(podcast.id, "ep");
        stored.transcript = "hello world".to_string();
        stored.status = EpisodeStatus::Archived;
        create(&conn, &stored).unwrap();

        let mut changed = stored.clone();
        changed.title = "New title".to_string();
        changed.duration = 42;
        changed.transcript = String::new();
        changed.status = EpisodeStatus::Active;
        changed.updated_at = at(9);
        assert!(update(&conn, &changed).unwrap());

        let reloaded = get_all_by_podcast_id(&conn, podcast.id).unwrap().remove(0);
        assert_eq!(reloaded.title, "New title");
        assert_eq!(reloaded.duration, 42);
        assert_eq!(reloaded.updated_at, at(9));
        assert_eq!(reloaded.transcript, "hello world");
        assert_eq!(reloaded.status, EpisodeStatus::Archived);
    }
}
