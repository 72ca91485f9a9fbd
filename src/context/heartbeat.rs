//! Liveness timestamp bumped at every step boundary.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};

const NEVER: i64 = i64::MIN;

/// Last time a run reported progress.
///
/// Stored as milliseconds since the Unix epoch so it can be read from a
/// supervisor thread without locking.
#[derive(Debug)]
pub struct Heartbeat {
    last_millis: AtomicI64,
}

impl Default for Heartbeat {
    fn default() -> Self {
        Self {
            last_millis: AtomicI64::new(NEVER),
        }
    }
}

impl Heartbeat {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a beat now.
    pub fn beat(&self) {
        self.beat_at(Utc::now());
    }

    /// Record a beat at an explicit time.
    pub fn beat_at(&self, at: DateTime<Utc>) {
        self.last_millis
            .store(at.timestamp_millis(), Ordering::Release);
    }

    /// Time of the last beat, `None` if no run ever reported.
    pub fn last_beat(&self) -> Option<DateTime<Utc>> {
        match self.last_millis.load(Ordering::Acquire) {
            NEVER => None,
            millis => Utc.timestamp_millis_opt(millis).single(),
        }
    }

    /// Time elapsed between the last beat and `now`.
    ///
    /// `None` when there never was a beat. A beat in the future counts as
    /// zero elapsed time.
    pub fn elapsed_at(&self, now: DateTime<Utc>) -> Option<Duration> {
        let last = self.last_beat()?;
        Some((now - last).to_std().unwrap_or(Duration::ZERO))
    }

    /// Whether the last beat is older than `threshold`.
    pub fn is_stale_at(&self, now: DateTime<Utc>, threshold: Duration) -> bool {
        self.elapsed_at(now)
            .map(|elapsed| elapsed > threshold)
            .unwrap_or(false)
    }
}
