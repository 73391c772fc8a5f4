//! Wall-clock abstraction
//!
//! Backend cooldowns are stored as expiry timestamps and compared against
//! [`Clock::now`] on every readiness check, so tests can drive time explicitly.

use chrono::{DateTime, Utc};
use std::fmt::Debug;

pub trait Clock: Send + Sync + Debug {
    fn now(&self) -> DateTime<Utc>;
}

/// Real time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[cfg(any(test, feature = "test-utils"))]
pub use manual::ManualClock;

#[cfg(any(test, feature = "test-utils"))]
mod manual {
    use super::Clock;
    use chrono::{DateTime, TimeZone, Utc};
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::time::Duration;

    /// A clock that only moves when told to.
    #[derive(Debug)]
    pub struct ManualClock {
        base: DateTime<Utc>,
        elapsed_ms: AtomicI64,
    }

    impl ManualClock {
        #[must_use]
        pub fn new(base: DateTime<Utc>) -> Self {
            Self {
                base,
                elapsed_ms: AtomicI64::new(0),
            }
        }

        /// Anchored at the Unix epoch.
        #[must_use]
        pub fn deterministic() -> Self {
            Self::new(Utc.timestamp_millis_opt(0).single().unwrap_or_default())
        }

        pub fn advance(&self, duration: Duration) {
            self.elapsed_ms
                .fetch_add(duration.as_millis() as i64, Ordering::SeqCst);
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            self.base + chrono::Duration::milliseconds(self.elapsed_ms.load(Ordering::SeqCst))
        }
    }
}
