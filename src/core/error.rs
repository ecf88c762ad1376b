//! Typed errors for the calendar and scheduling engine
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.2.0

use thiserror::Error;

use crate::features::lunar::LunarDate;

/// Result alias for engine operations
pub type EngineResult<T> = std::result::Result<T, ReminderError>;

/// Errors raised while converting, advancing or evaluating a single record.
///
/// None of these abort a scheduler tick; the tick collects them per record.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReminderError {
    /// Year outside the range covered by the lunar table
    #[error("Lunar calendar only covers 1900-2100 (got year {year})")]
    LunarRange { year: i32 },

    /// Lunar to solar search found no matching Gregorian date
    #[error("No solar date matches lunar date {date:?}")]
    LunarInverse { date: LunarDate },

    /// Month outside 1-12 or day outside 1-30
    #[error("Invalid lunar date {date:?}")]
    InvalidLunarDate { date: LunarDate },

    #[error("Period value must be at least 1 (got {value})")]
    InvalidPeriod { value: i64 },

    #[error("Unknown timezone: {0}")]
    InvalidTimezone(String),

    #[error("Invalid record {id}: {reason}")]
    InvalidRecord { id: String, reason: String },
}

impl ReminderError {
    /// True for failures that indicate a broken invariant rather than bad input
    pub fn is_internal(&self) -> bool {
        matches!(self, ReminderError::LunarInverse { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = ReminderError::LunarRange { year: 2101 };
        assert_eq!(
            err.to_string(),
            "Lunar calendar only covers 1900-2100 (got year 2101)"
        );

        let err = ReminderError::InvalidPeriod { value: 0 };
        assert_eq!(err.to_string(), "Period value must be at least 1 (got 0)");
    }

    #[test]
    fn test_internal_classification() {
        let inverse = ReminderError::LunarInverse {
            date: LunarDate {
                year: 2024,
                month: 1,
                day: 30,
                is_leap: false,
            },
        };
        assert!(inverse.is_internal());
        assert!(!ReminderError::InvalidTimezone("Mars/Base".into()).is_internal());
    }

    #[test]
    fn test_converts_into_anyhow() {
        fn fails() -> anyhow::Result<()> {
            Err(ReminderError::InvalidPeriod { value: -1 })?;
            Ok(())
        }
        let err = fails().unwrap_err();
        assert!(err.downcast_ref::<ReminderError>().is_some());
    }
}
