use std::time::Duration;

use serde::{Deserialize, Serialize};

/// A UNIX timestamp in UTC with nanosecond precision.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp {
    seconds: u64,
    nanos: u32,
}

impl Timestamp {
    /// Creates a new `Timestamp` from the given seconds and nanoseconds.
    pub fn new(mut seconds: u64, mut nanos: u32) -> Self {
        seconds += nanos as u64 / 1_000_000_000;
        nanos %= 1_000_000_000;
        Self { seconds, nanos }
    }

    pub fn from_seconds(seconds: u64) -> Self {
        Self::new(seconds, 0)
    }

    pub fn seconds(&self) -> u64 {
        self.seconds
    }

    pub fn nanos(&self) -> u32 {
        self.nanos
    }

    /// Returns the timestamp as a duration since the UNIX epoch.
    pub fn as_duration(&self) -> Duration {
        Duration::new(self.seconds, self.nanos)
    }

    /// Time elapsed from `earlier` to `self`, zero if `earlier` is in the future.
    pub fn duration_since(&self, earlier: Timestamp) -> Duration {
        self.as_duration().saturating_sub(earlier.as_duration())
    }

    pub fn checked_add(&self, duration: Duration) -> Option<Self> {
        let total = self.as_duration().checked_add(duration)?;
        Some(Self::new(total.as_secs(), total.subsec_nanos()))
    }

    pub fn now() -> Self {
        let now = std::time::SystemTime::now();
        let duration = now
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default();
        Self::new(duration.as_secs(), duration.subsec_nanos())
    }
}

impl From<Duration> for Timestamp {
    fn from(value: Duration) -> Self {
        Self::new(value.as_secs(), value.subsec_nanos())
    }
}

/// Source of "now" for every age computation in the engine.
pub trait Clock: std::fmt::Debug + Send + Sync + 'static {
    fn now(&self) -> Timestamp;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}
