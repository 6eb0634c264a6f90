//! Wall-clock adapter.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::app::ports::WallClock;
use crate::log_channel::Timestamp;

/// Reads the host's real-time clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl WallClock for SystemClock {
    fn now(&self) -> Timestamp {
        let secs = match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(d) => i64::try_from(d.as_secs()).unwrap_or(i64::MAX),
            // Clock set before 1970.
            Err(e) => -i64::try_from(e.duration().as_secs()).unwrap_or(i64::MAX),
        };
        Timestamp::from_unix_secs(secs)
    }
}
