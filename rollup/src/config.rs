//! Tuning knobs for a [`Group`](crate::Group)
//!
//! The defaults reproduce the classic collector behavior: 60 second windows, a window is closed
//! once a third of a step has passed its end, and a series is reclaimed after ten quiet windows.
//!
//! With the `serde` feature, [`GroupConfig`] can be deserialized; missing fields take their
//! defaults:
//!
//! ```
//! # #[cfg(feature = "serde")]
//! # {
//! use rollup::GroupConfig;
//!
//! let config: GroupConfig = toml::from_str("default_step = 10").unwrap();
//! assert_eq!(config.default_step, 10);
//! assert_eq!(config.obsolete_after_steps, 10);
//! # }
//! ```

use std::fmt;

/// Step used for points that don't declare one
pub const DEFAULT_STEP: i64 = 60;

/// Which window a newly created series accepts points for first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum FirstWindow {
    /// Start at the first window beginning after `now + step + creation_slack`
    ///
    /// Guarantees the first window a series emits saw every point sent to it: the window that
    /// was open when the series appeared may have lost points to an earlier process.
    #[default]
    NextFull,
    /// Start at the window that is still open at creation time
    ///
    /// Points for windows that already closed are dropped as late.
    Current,
}

/// Configuration of a [`Group`](crate::Group)
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(default, deny_unknown_fields))]
pub struct GroupConfig {
    /// Window width, in seconds, for points declaring a step `<= 0`
    pub default_step: i64,
    /// Number of quiet windows after which an empty series is evicted
    pub obsolete_after_steps: i64,
    /// A window closes once `now` is `step / flush_lag_divisor` seconds past its end
    pub flush_lag_divisor: i64,
    /// Seconds added to `now` before picking a new series' first window
    pub creation_slack: i64,
    /// Which window a new series accepts first
    pub first_window: FirstWindow,
}

impl Default for GroupConfig {
    fn default() -> Self {
        Self {
            default_step: DEFAULT_STEP,
            obsolete_after_steps: 10,
            flush_lag_divisor: 3,
            creation_slack: 3,
            first_window: FirstWindow::NextFull,
        }
    }
}

impl GroupConfig {
    /// Check every field is within range
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("default_step", self.default_step),
            ("obsolete_after_steps", self.obsolete_after_steps),
            ("flush_lag_divisor", self.flush_lag_divisor),
        ] {
            if value <= 0 {
                return Err(ConfigError::NonPositive { field, value });
            }
        }
        if self.creation_slack < 0 {
            return Err(ConfigError::Negative {
                field: "creation_slack",
                value: self.creation_slack,
            });
        }
        Ok(())
    }

    /// The step a series uses given the step its first point declared
    pub(crate) fn step_for(&self, declared: i64) -> i64 {
        if declared <= 0 {
            self.default_step
        } else {
            declared
        }
    }
}

/// A [`GroupConfig`] field is out of range
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The field must be strictly positive
    NonPositive {
        /// Name of the field
        field: &'static str,
        /// Value it was set to
        value: i64,
    },
    /// The field must not be negative
    Negative {
        /// Name of the field
        field: &'static str,
        /// Value it was set to
        value: i64,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonPositive { field, value } => {
                write!(f, "`{field}` must be greater than zero, got {value}")
            }
            Self::Negative { field, value } => {
                write!(f, "`{field}` must not be negative, got {value}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}
