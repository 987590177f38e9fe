// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Apply a [`ReconcilePlan`] inside an open transaction.
//!
//! The caller owns the transaction: returning an error here means it must be
//! rolled back, returning `Ok` means it may be committed.

use rusqlite::Connection;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::WriteFailurePolicy;
use crate::error::{StoreError, WriteError};
use crate::reconcile::ReconcilePlan;
use crate::store::{episodes, podcasts};

const EPISODE_SAVEPOINT: &str = "episode_write";

/// Counts of what was written, plus episodes skipped under [`WriteFailurePolicy::SkipItem`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteOutcome {
    pub episodes_added: u32,
    pub episodes_updated: u32,
    /// (GUID, error message) of each episode that was rolled back
    pub failed_items: Vec<(String, String)>,
}

pub fn apply(
    conn: &Connection,
    plan: &ReconcilePlan,
    policy: WriteFailurePolicy,
    cancel: &CancellationToken,
) -> Result<WriteOutcome, WriteError> {
    let mut outcome = WriteOutcome::default();

    ensure_live(cancel)?;
    if !podcasts::update(conn, &plan.podcast)? {
        return Err(WriteError::PodcastVanished(plan.podcast.id));
    }

    for episode in &plan.inserts {
        ensure_live(cancel)?;
        let result = write_item(conn, policy, || episodes::create(conn, episode));
        match result {
            Ok(()) => outcome.episodes_added += 1,
            Err(source) if policy == WriteFailurePolicy::SkipItem => {
                warn!(guid = %episode.guid, error = %source, "skipping episode that failed to insert");
                outcome
                    .failed_items
                    .push((episode.guid.clone(), source.to_string()));
            }
            Err(source) => {
                return Err(WriteError::CreateEpisode {
                    guid: episode.guid.clone(),
                    source,
                });
            }
        }
    }

    for episode in &plan.updates {
        ensure_live(cancel)?;
        let result = write_item(conn, policy, || match episodes::update(conn, episode) {
            Ok(true) => Ok(()),
            Ok(false) => Err(StoreError::Sqlite(rusqlite::Error::QueryReturnedNoRows)),
            Err(e) => Err(e),
        });
        match result {
            Ok(()) => outcome.episodes_updated += 1,
            Err(source) if policy == WriteFailurePolicy::SkipItem => {
                warn!(guid = %episode.guid, error = %source, "skipping episode that failed to update");
                outcome
                    .failed_items
                    .push((episode.guid.clone(), source.to_string()));
            }
            Err(source) => {
                return Err(WriteError::UpdateEpisode {
                    id: episode.id,
                    source,
                });
            }
        }
    }

    debug!(
        podcast_id = %plan.podcast.id,
        added = outcome.episodes_added,
        updated = outcome.episodes_updated,
        skipped = outcome.failed_items.len(),
        "applied reconcile plan"
    );
    Ok(outcome)
}

fn ensure_live(cancel: &CancellationToken) -> Result<(), WriteError> {
    if cancel.is_cancelled() {
        return Err(WriteError::Cancelled);
    }
    Ok(())
}

/// Run one episode write, isolated in a savepoint when items may be skipped
fn write_item(
    conn: &Connection,
    policy: WriteFailurePolicy,
    write: impl FnOnce() -> Result<(), StoreError>,
) -> Result<(), StoreError> {
    if policy == WriteFailurePolicy::Abort {
        return write();
    }

    conn.execute_batch(&format!("SAVEPOINT {EPISODE_SAVEPOINT}"))?;
    match write() {
        Ok(()) => {
            conn.execute_batch(&format!("RELEASE {EPISODE_SAVEPOINT}"))?;
            Ok(())
        }
        Err(e) => {
            conn.execute_batch(&format!(
                "ROLLBACK TO {EPISODE_SAVEPOINT}; RELEASE {EPISODE_SAVEPOINT}"
            ))?;
            Err(e)
        }
    }
}
