//! Recurrence periods

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::{EngineResult, ReminderError};

/// Unit a period counts in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodUnit {
    Day,
    Month,
    Year,
}

impl fmt::Display for PeriodUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeriodUnit::Day => write!(f, "day"),
            PeriodUnit::Month => write!(f, "month"),
            PeriodUnit::Year => write!(f, "year"),
        }
    }
}

impl std::str::FromStr for PeriodUnit {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "day" | "days" => Ok(PeriodUnit::Day),
            "month" | "months" => Ok(PeriodUnit::Month),
            "year" | "years" => Ok(PeriodUnit::Year),
            _ => Err(anyhow::anyhow!("Invalid period unit: {}", s)),
        }
    }
}

/// A recurrence step of `value` units; `value` is always at least 1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawPeriod", into = "RawPeriod")]
pub struct Period {
    value: u32,
    unit: PeriodUnit,
}

#[derive(Serialize, Deserialize)]
struct RawPeriod {
    value: i64,
    unit: PeriodUnit,
}

impl TryFrom<RawPeriod> for Period {
    type Error = ReminderError;

    fn try_from(raw: RawPeriod) -> EngineResult<Self> {
        Period::new(raw.value, raw.unit)
    }
}

impl From<Period> for RawPeriod {
    fn from(period: Period) -> Self {
        RawPeriod {
            value: i64::from(period.value),
            unit: period.unit,
        }
    }
}

impl Period {
    /// Rejects `value < 1`, which would never move a date forward
    pub fn new(value: i64, unit: PeriodUnit) -> EngineResult<Self> {
        if value < 1 || value > i64::from(u32::MAX) {
            return Err(ReminderError::InvalidPeriod { value });
        }
        Ok(Self {
            value: value as u32,
            unit,
        })
    }

    pub fn value(&self) -> u32 {
        self.value
    }

    pub fn unit(&self) -> PeriodUnit {
        self.unit
    }

    /// This period repeated `times` times, `None` on overflow
    pub fn times(&self, times: u32) -> Option<Period> {
        let value = self.value.checked_mul(times)?;
        (value >= 1).then_some(Period {
            value,
            unit: self.unit,
        })
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let plural = if self.value == 1 { "" } else { "s" };
        write!(f, "{} {}{}", self.value, self.unit, plural)
    }
}
