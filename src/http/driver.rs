use crate::application::commands::tick_timer;
use crate::http::SharedState;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::warn;

pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Ticks the shared timer once per second for the life of the process.
pub fn spawn_timer_driver(state: SharedState) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(TICK_INTERVAL);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // first tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            if let Err(error) = tick_timer(&state) {
                warn!(%error, "timer tick failed");
            }
        }
    })
}
