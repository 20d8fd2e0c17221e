// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use std::{
    sync::{Arc, Mutex, PoisonError},
    time::{Duration, SystemTime},
};

use crate::{Time, from_unix_seconds};

/// A clock stuck at one instant
///
/// ```
/// use rollup_timesource::{TimeSource, fakes::StaticTimeSource};
///
/// let ts = TimeSource::custom(StaticTimeSource::at_unix_seconds(1_700_000_000));
/// assert_eq!(ts.unix_seconds(), 1_700_000_000);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct StaticTimeSource {
    now: SystemTime,
}

impl StaticTimeSource {
    /// A clock that always reads `time`
    pub fn at_time(time: impl Into<SystemTime>) -> Self {
        Self { now: time.into() }
    }

    /// A clock that always reads `secs` seconds after the Unix epoch (before it, if negative)
    pub fn at_unix_seconds(secs: i64) -> Self {
        Self::at_time(from_unix_seconds(secs))
    }
}

impl Time for StaticTimeSource {
    fn now(&self) -> SystemTime {
        self.now
    }
}

/// A clock that only moves when a test moves it
///
/// Clones share the same reading, so keep one clone to drive time and hand another to the code
/// under test.
///
/// ```
/// use rollup_timesource::{TimeSource, fakes::ManuallyAdvancedTimeSource};
/// use std::time::Duration;
///
/// let clock = ManuallyAdvancedTimeSource::at_unix_seconds(60);
/// let ts = TimeSource::custom(clock.clone());
///
/// clock.advance(Duration::from_secs(30));
/// assert_eq!(ts.unix_seconds(), 90);
///
/// clock.set_unix_seconds(10);
/// assert_eq!(ts.unix_seconds(), 10);
/// ```
#[derive(Debug, Clone)]
pub struct ManuallyAdvancedTimeSource(Arc<Mutex<SystemTime>>);

impl ManuallyAdvancedTimeSource {
    /// A clock starting at `time`
    pub fn at_time(time: impl Into<SystemTime>) -> Self {
        Self(Arc::new(Mutex::new(time.into())))
    }

    /// A clock starting `secs` seconds after the Unix epoch
    pub fn at_unix_seconds(secs: i64) -> Self {
        Self::at_time(from_unix_seconds(secs))
    }

    /// Jump to `time`, forward or backward
    pub fn update_time(&self, time: impl Into<SystemTime>) {
        *self.reading() = time.into();
    }

    /// Jump to `secs` seconds after the Unix epoch
    pub fn set_unix_seconds(&self, secs: i64) {
        self.update_time(from_unix_seconds(secs));
    }

    /// Move forward by `elapsed`
    pub fn advance(&self, elapsed: Duration) {
        *self.reading() += elapsed;
    }

    fn reading(&self) -> std::sync::MutexGuard<'_, SystemTime> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Time for ManuallyAdvancedTimeSource {
    fn now(&self) -> SystemTime {
        *self.reading()
    }
}
