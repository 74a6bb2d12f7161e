//! Time-related re-exports.
//!
//! `Instant` is tokio's, so code measuring elapsed time follows the runtime
//! clock and behaves under paused-time tests.

pub use std::time::{Duration, SystemTime, UNIX_EPOCH};
pub use tokio::time::{
    interval, sleep, sleep_until, timeout, Instant, Interval, MissedTickBehavior, Sleep, Timeout,
};

/// Creates an interval whose first tick fires after `period` instead of
/// immediately, skipping missed ticks when the loop falls behind.
pub fn delayed_interval(period: Duration) -> Interval {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker
}
