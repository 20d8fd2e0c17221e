// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

#![deny(missing_docs)]
#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

use std::{
    fmt::Debug,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

/// Clocks that tests control, behind the `test-util` feature
#[cfg(feature = "test-util")]
pub mod fakes;

/// A clock that can stand in for the system clock
pub trait Time: Send + Sync + Debug {
    /// The current wall-clock time
    fn now(&self) -> SystemTime;
}

/// Where "now" comes from
///
/// Cheap to clone; clones of a custom source share the underlying clock.
#[derive(Clone)]
pub enum TimeSource {
    /// [`SystemTime::now`]
    System,
    #[cfg(feature = "custom-timesource")]
    /// Any [`Time`] implementation
    Custom(std::sync::Arc<dyn Time>),
}

impl Debug for TimeSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::System => write!(f, "TimeSource::System"),
            #[cfg(feature = "custom-timesource")]
            Self::Custom(_) => write!(f, "TimeSource::Custom(...)"),
        }
    }
}

impl TimeSource {
    /// Current wall-clock time
    pub fn system_time(&self) -> SystemTime {
        match self {
            Self::System => SystemTime::now(),
            #[cfg(feature = "custom-timesource")]
            Self::Custom(ts) => ts.now(),
        }
    }

    /// Current time in whole seconds since the Unix epoch
    ///
    /// See [`unix_seconds`] for how sub-second and pre-epoch times are rounded.
    pub fn unix_seconds(&self) -> i64 {
        unix_seconds(self.system_time())
    }

    /// Read time from `custom` instead of the system clock
    #[cfg(feature = "custom-timesource")]
    pub fn custom(custom: impl Time + 'static) -> TimeSource {
        Self::Custom(std::sync::Arc::new(custom))
    }
}

impl Default for TimeSource {
    fn default() -> Self {
        Self::System
    }
}

/// Whole seconds between the Unix epoch and `time`, rounded toward negative infinity
///
/// Rounding down (rather than toward zero) keeps window alignment consistent on
/// both sides of the epoch: `-0.5s` is second `-1`, not second `0`.
///
/// ```
/// use rollup_timesource::unix_seconds;
/// use std::time::{Duration, UNIX_EPOCH};
///
/// assert_eq!(unix_seconds(UNIX_EPOCH + Duration::from_millis(1_500)), 1);
/// assert_eq!(unix_seconds(UNIX_EPOCH - Duration::from_millis(500)), -1);
/// ```
pub fn unix_seconds(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(after) => i64::try_from(after.as_secs()).unwrap_or(i64::MAX),
        Err(err) => {
            let before = err.duration();
            let secs = i64::try_from(before.as_secs()).unwrap_or(i64::MAX);
            if before.subsec_nanos() > 0 {
                secs.saturating_neg().saturating_sub(1)
            } else {
                secs.saturating_neg()
            }
        }
    }
}

/// The [`SystemTime`] `secs` whole seconds away from the Unix epoch
pub fn from_unix_seconds(secs: i64) -> SystemTime {
    let offset = Duration::from_secs(secs.unsigned_abs());
    if secs >= 0 {
        UNIX_EPOCH + offset
    } else {
        UNIX_EPOCH - offset
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, UNIX_EPOCH};

    use assert2::check;

    use crate::{TimeSource, fakes, from_unix_seconds, unix_seconds};

    #[test]
    fn default_is_the_system_clock() {
        check!(matches!(TimeSource::default(), TimeSource::System));
        let before = unix_seconds(std::time::SystemTime::now());
        check!(TimeSource::default().unix_seconds() >= before);
    }

    #[test]
    fn custom_source_is_read() {
        let ts = TimeSource::custom(fakes::StaticTimeSource::at_time(UNIX_EPOCH));
        check!(ts.system_time() == UNIX_EPOCH);
        check!(ts.unix_seconds() == 0);
    }

    #[test]
    fn unix_seconds_rounds_down() {
        check!(unix_seconds(UNIX_EPOCH + Duration::from_millis(999)) == 0);
        check!(unix_seconds(UNIX_EPOCH + Duration::from_secs(42)) == 42);
        check!(unix_seconds(UNIX_EPOCH - Duration::from_secs(2)) == -2);
        check!(unix_seconds(UNIX_EPOCH - Duration::from_millis(2_001)) == -3);
    }

    #[test]
    fn from_unix_seconds_inverts_unix_seconds() {
        for secs in [-86_400, -1, 0, 1, 1_700_000_000] {
            check!(unix_seconds(from_unix_seconds(secs)) == secs);
        }
    }
}
