//! A small time abstraction used anywhere the core needs "now": cache
//! instrumentation timestamps and pagination-hop guards benefit from a
//! mockable clock.
#![warn(missing_copy_implementations, missing_docs)]

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::time::Duration;

/// A point in time, wrapping a UTC timestamp.
///
/// Deliberately does not implement `Default`: there is no meaningful "zero"
/// time for this domain, callers should go through a [`TimeProvider`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Time(DateTime<Utc>);

impl Time {
    /// Construct a [`Time`] from a Unix timestamp in milliseconds.
    pub fn from_timestamp_millis(millis: i64) -> Self {
        Self(
            DateTime::from_timestamp_millis(millis)
                .expect("timestamp out of range for `Time::from_timestamp_millis`"),
        )
    }

    /// The underlying `chrono` datetime.
    pub fn date_time(&self) -> DateTime<Utc> {
        self.0
    }

    /// Duration elapsed from `self` until `other`, or `None` if `other` is before `self`.
    pub fn checked_duration_since(&self, other: Self) -> Option<Duration> {
        (self.0 - other.0).to_std().ok()
    }
}

impl From<DateTime<Utc>> for Time {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }
}

/// Something that can answer "what time is it".
///
/// Abstracted so tests can hold time fixed while asserting cache eviction or
/// pagination-hop behaviour deterministically.
pub trait TimeProvider: std::fmt::Debug + Send + Sync {
    /// Returns the current time.
    fn now(&self) -> Time;
}

/// A [`TimeProvider`] backed by the real wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProvider;

impl TimeProvider for SystemProvider {
    fn now(&self) -> Time {
        Time(Utc::now())
    }
}

/// A [`TimeProvider`] that returns a fixed, externally-settable time.
#[derive(Debug)]
pub struct MockProvider {
    now: Mutex<Time>,
}

impl MockProvider {
    /// Create a new mock provider starting at `time`.
    pub fn new(time: Time) -> Self {
        Self {
            now: Mutex::new(time),
        }
    }

    /// Advance (or rewind) the mock clock to `time`.
    pub fn set(&self, time: Time) {
        *self.now.lock() = time;
    }

    /// Advance the mock clock by `duration`.
    pub fn inc(&self, duration: Duration) {
        let mut guard = self.now.lock();
        *guard = Time(guard.0 + chrono::Duration::from_std(duration).expect("duration overflow"));
    }
}

impl TimeProvider for MockProvider {
    fn now(&self) -> Time {
        *self.now.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_provider_returns_set_time() {
        let provider = MockProvider::new(Time::from_timestamp_millis(1_000));
        assert_eq!(provider.now(), Time::from_timestamp_millis(1_000));

        provider.set(Time::from_timestamp_millis(2_000));
        assert_eq!(provider.now(), Time::from_timestamp_millis(2_000));
    }

    #[test]
    fn mock_provider_inc_advances_clock() {
        let provider = MockProvider::new(Time::from_timestamp_millis(0));
        provider.inc(Duration::from_millis(500));
        assert_eq!(provider.now(), Time::from_timestamp_millis(500));
    }

    #[test]
    fn checked_duration_since_is_none_when_earlier() {
        let earlier = Time::from_timestamp_millis(0);
        let later = Time::from_timestamp_millis(1_000);
        assert_eq!(
            later.checked_duration_since(earlier),
            Some(Duration::from_millis(1_000))
        );
        assert_eq!(earlier.checked_duration_since(later), None);
    }
}
