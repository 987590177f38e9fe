// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::future::Future;

use tokio::time::{Instant, MissedTickBehavior, interval_at, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::ScheduleConfig;

/// Run `job` after the initial delay and then once per interval until `shutdown` fires.
///
/// Runs never overlap: a run that outlasts the interval delays the next one.
/// A run in progress when `shutdown` fires is awaited, not dropped; the job
/// observes the same token and winds down on its own. Returns the number of
/// completed runs.
pub async fn run_periodic<F, Fut>(
    schedule: ScheduleConfig,
    shutdown: CancellationToken,
    mut job: F,
) -> usize
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    info!(
        initial_delay_secs = schedule.initial_delay.as_secs(),
        interval_secs = schedule.interval.as_secs(),
        "scheduler started"
    );

    tokio::select! {
        _ = shutdown.cancelled() => {
            info!("scheduler stopped before first run");
            return 0;
        }
        _ = sleep(schedule.initial_delay) => {}
    }

    let mut ticks = interval_at(Instant::now(), schedule.interval);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut runs = 0;

    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            _ = ticks.tick() => {}
        }

        debug!(run = runs + 1, "scheduled run starting");
        job().await;
        runs += 1;

        if shutdown.is_cancelled() {
            break;
        }
    }

    info!(runs, "scheduler stopped");
    runs
}
