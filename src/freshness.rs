use std::time::Duration;

use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info};

use crate::AppState;

pub fn spawn_freshness_worker(state: AppState, interval_seconds: u64) {
    if interval_seconds == 0 {
        info!("Freshness probe disabled");
        return;
    }

    tokio::spawn(async move {
        let mut interval = time::interval(Duration::from_secs(interval_seconds));
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First tick completes immediately; the load just checked the stamp.
        interval.tick().await;
        loop {
            interval.tick().await;
            let freshness = state.db.check_freshness(&state.sync).await;
            if freshness.stale {
                info!(
                    remote = ?freshness.remote_stamp,
                    effective = ?freshness.effective_stamp,
                    "Remote dataset has advanced; refresh available"
                );
            } else {
                debug!("Room dataset is current");
            }
            *state.freshness.write().await = Some(freshness);
        }
    });
}
