// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use rusqlite::{Connection, OptionalExtension, Row, params};
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::SyncLogEntry;

const COLUMNS: &str =
    "id, podcast_id, status, episodes_added, episodes_updated, error_message, created_at";

/// Newest first; insertion order breaks timestamp ties
const NEWEST_FIRST: &str = "ORDER BY created_at DESC, rowid DESC";

fn from_row(row: &Row<'_>) -> rusqlite::Result<SyncLogEntry> {
    Ok(SyncLogEntry {
        id: row.get(0)?,
        podcast_id: row.get(1)?,
        status: row.get(2)?,
        episodes_added: row.get(3)?,
        episodes_updated: row.get(4)?,
        error_message: row.get(5)?,
        created_at: row.get(6)?,
    })
}

pub fn create(conn: &Connection, entry: &SyncLogEntry) -> Result<(), StoreError> {
    conn.execute(
        &format!("INSERT INTO sync_logs ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"),
        params![
            entry.id,
            entry.podcast_id,
            entry.status,
            entry.episodes_added,
            entry.episodes_updated,
            entry.error_message,
            entry.created_at,
        ],
    )?;
    Ok(())
}

pub fn latest(conn: &Connection, podcast_id: Uuid) -> Result<Option<SyncLogEntry>, StoreError> {
    let entry = conn
        .query_row(
            &format!("SELECT {COLUMNS} FROM sync_logs WHERE podcast_id = ?1 {NEWEST_FIRST} LIMIT 1"),
            params![podcast_id],
            from_row,
        )
        .optional()?;
    Ok(entry)
}

/// One page of a podcast's logs plus the total number of logs it has
pub fn list(
    conn: &Connection,
    podcast_id: Uuid,
    limit: u32,
    offset: u64,
) -> Result<(Vec<SyncLogEntry>, u64), StoreError> {
    let total: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sync_logs WHERE podcast_id = ?1",
        params![podcast_id],
        |row| row.get(0),
    )?;

    let offset = i64::try_from(offset).map_err(|_| StoreError::InvalidValue {
        column: "offset",
        value: offset.to_string(),
    })?;

    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM sync_logs WHERE podcast_id = ?1 {NEWEST_FIRST} LIMIT ?2 OFFSET ?3"
    ))?;
    let entries = stmt
        .query_map(params![podcast_id, limit, offset], from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok((entries, total.max(0) as u64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SyncStatus;
    use crate::store::test_support::*;

    #[test]
    fn latest_prefers_newest_then_last_inserted() {
        let db = memory_db();
        let podcast = seed_podcast(&db, "logs");
        let conn = db.connection();

        assert!(latest(&conn, podcast.id).unwrap().is_none());

        let mut old = SyncLogEntry::success(podcast.id, 1, 0);
        old.created_at = at(1);
        let mut tied_first = SyncLogEntry::failure(podcast.id, "boom");
        tied_first.created_at = at(3);
        let mut tied_second = SyncLogEntry::success(podcast.id, 0, 2);
        tied_second.created_at = at(3);

        for entry in [&old, &tied_first, &tied_second] {
            create(&conn, entry).unwrap();
        }

        let newest = latest(&conn, podcast.id).unwrap().unwrap();
        assert_eq!(newest.id, tied_second.id);
        assert_eq!(newest.status, SyncStatus::Success);
        assert_eq!(newest.episodes_updated, 2);
    }

    #[test]
    fn list_pages_newest_first_with_total() {
        let db = memory_db();
        let podcast = seed_podcast(&db, "paged");
        let other = seed_podcast(&db, "other");
        let conn = db.connection();

        for day in 1..=5 {
            let mut entry = SyncLogEntry::success(podcast.id, day, 0);
            entry.created_at = at(day);
            create(&conn, &entry).unwrap();
        }
        create(&conn, &SyncLogEntry::failure(other.id, "elsewhere")).unwrap();

        let (first_page, total) = list(&conn, podcast.id, 2, 0).unwrap();
        assert_eq!(total, 5);
        let added: Vec<u32> = first_page.iter().map(|e| e.episodes_added).collect();
        assert_eq!(added, vec![5, 4]);

        let (last_page, _) = list(&conn, podcast.id, 2, 4).unwrap();
        assert_eq!(last_page.len(), 1);
        assert_eq!(last_page[0].episodes_added, 1);

        let (beyond, total) = list(&conn, podcast.id, 2, 10).unwrap();
        assert!(beyond.is_empty());
        assert_eq!(total, 5);
    }

    #[test]
    fn failure_message_round_trips() {
        let db = memory_db();
        let podcast = seed_podcast(&db, "failure");
        let conn = db.connection();

        let entry = SyncLogEntry::failure(podcast.id, "Feed request failed with status: 404 Not Found");
        create(&conn, &entry).unwrap();

        assert_eq!(latest(&conn, podcast.id).unwrap(), Some(entry));
    }
}
