//! Time sources. Deadlines use a monotonic clock; timestamps use a wall
//! clock. The two are kept as distinct traits on purpose — nothing in this
//! crate reads a deadline off `WallClock` or stamps a record off `Clock`.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// A point in monotonic time. Opaque — only differences between two
/// `Instant`s are meaningful.
pub type Instant = std::time::Instant;

/// Monotonic clock, used for deadlines and elapsed-time measurement.
/// Never used for anything that is persisted or shown to a player.
pub trait Clock: Send + Sync {
    /// The current monotonic instant.
    fn now(&self) -> Instant;

    /// Elapsed time since `since`.
    fn elapsed_since(&self, since: Instant) -> Duration {
        self.now().saturating_duration_since(since)
    }
}

/// Wall clock, used for persisted UTC timestamps
/// (`created_at`, `last_accessed`, `last_saved`).
pub trait WallClock: Send + Sync {
    /// The current UTC time.
    fn utc_now(&self) -> DateTime<Utc>;
}

/// Production clock backed by the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

impl WallClock for SystemClock {
    fn utc_now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
