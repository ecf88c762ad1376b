//! Next-occurrence arithmetic for solar and lunar recurrences

use chrono::{DateTime, Days, Months, NaiveDate, Utc};

use super::period::{Period, PeriodUnit};
use crate::core::{EngineResult, ReminderError};
use crate::features::clock::CalendarClock;
use crate::features::lunar::{self, LunarDate};

/// A recurrence anchor in the calendar system it recurs in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecurringDate {
    Solar(NaiveDate),
    Lunar(LunarDate),
}

impl RecurringDate {
    /// Interpret a Gregorian date in the requested calendar system
    pub fn from_solar(date: NaiveDate, lunar: bool) -> EngineResult<Self> {
        if lunar {
            Ok(RecurringDate::Lunar(LunarDate::from_solar(date)?))
        } else {
            Ok(RecurringDate::Solar(date))
        }
    }

    pub fn is_lunar(&self) -> bool {
        matches!(self, RecurringDate::Lunar(_))
    }

    /// Gregorian date of this occurrence
    pub fn to_solar(&self) -> EngineResult<NaiveDate> {
        match self {
            RecurringDate::Solar(date) => Ok(*date),
            RecurringDate::Lunar(date) => lunar::lunar_to_solar_checked(date),
        }
    }

    /// The occurrence one `period` later
    pub fn advance(&self, period: Period) -> EngineResult<Self> {
        match self {
            RecurringDate::Solar(date) => advance_solar(*date, period).map(RecurringDate::Solar),
            RecurringDate::Lunar(date) => advance_lunar(*date, period).map(RecurringDate::Lunar),
        }
    }
}

/// Add a period with calendar-field arithmetic.
///
/// Month and year steps clamp the day to the end of the target month
/// (Jan 31 + 1 month is the last day of February).
pub fn advance_solar(date: NaiveDate, period: Period) -> EngineResult<NaiveDate> {
    let value = period.value();
    let next = match period.unit() {
        PeriodUnit::Day => date.checked_add_days(Days::new(u64::from(value))),
        PeriodUnit::Month => date.checked_add_months(Months::new(value)),
        PeriodUnit::Year => value
            .checked_mul(12)
            .and_then(|months| date.checked_add_months(Months::new(months))),
    };
    next.ok_or(ReminderError::InvalidPeriod {
        value: i64::from(value),
    })
}

/// Add a period on the lunar calendar.
///
/// Year and month steps move the numeric month and keep the leap flag only
/// when the target year's leap month is the same month. Day steps are
/// counted on the solar calendar. Dates off the month/day grid are rejected
/// before any arithmetic.
pub fn advance_lunar(date: LunarDate, period: Period) -> EngineResult<LunarDate> {
    date.validate()?;
    let value = i64::from(period.value());
    match period.unit() {
        PeriodUnit::Day => {
            let solar = lunar::lunar_to_solar_checked(&date)?;
            let next = solar
                .checked_add_days(Days::new(value as u64))
                .ok_or(ReminderError::InvalidPeriod { value })?;
            LunarDate::from_solar(next)
        }
        PeriodUnit::Year => {
            let year = i64::from(date.year) + value;
            settle(clamp_year(year)?, date.month, date.day, date.is_leap)
        }
        PeriodUnit::Month => {
            let total = (i64::from(date.year) - i64::from(lunar::MIN_YEAR)) * 12
                + i64::from(date.month)
                - 1
                + value;
            let year = total.div_euclid(12) + i64::from(lunar::MIN_YEAR);
            let month = (total.rem_euclid(12) + 1) as u32;
            settle(clamp_year(year)?, month, date.day, date.is_leap)
        }
    }
}

fn clamp_year(year: i64) -> EngineResult<i32> {
    let year = i32::try_from(year).unwrap_or(i32::MAX);
    if lunar::table::in_range(year) {
        Ok(year)
    } else {
        Err(ReminderError::LunarRange { year })
    }
}

/// Fit a day into the target month, stepping back until the date exists.
/// Fails if no day of the month converts back to a solar date.
fn settle(year: i32, month: u32, day: u32, was_leap: bool) -> EngineResult<LunarDate> {
    let is_leap = was_leap && lunar::leap_month_index(year)? == month;
    let max_day = lunar::days_in_month(year, month, is_leap)?;
    let clamped = day.min(max_day);

    let mut candidate = clamped;
    while candidate >= 1 {
        let date = LunarDate::new(year, month, candidate, is_leap);
        if lunar::lunar_to_solar(&date).is_some() {
            return Ok(date);
        }
        candidate -= 1;
    }
    Err(ReminderError::LunarInverse {
        date: LunarDate::new(year, month, clamped, is_leap),
    })
}

/// Result of rolling a recurrence forward
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Advancement {
    pub date: RecurringDate,
    /// Gregorian date of `date`
    pub solar: NaiveDate,
    /// Number of periods applied to the anchor
    pub steps: u32,
}

/// Roll `anchor` forward until its date is not before the local date of `now`.
///
/// Step `k` is computed as `anchor + k * period` rather than by chaining
/// single steps, so a day clamped at a short month recovers afterwards.
/// `period` is at least 1, so every step moves strictly forward.
pub fn advance_until_future(
    anchor: RecurringDate,
    period: Period,
    now: DateTime<Utc>,
    clock: &CalendarClock,
) -> EngineResult<Advancement> {
    let solar = anchor.to_solar()?;
    if clock.days_until(now, solar) >= 0 {
        return Ok(Advancement {
            date: anchor,
            solar,
            steps: 0,
        });
    }

    let mut steps = 0u32;
    loop {
        steps += 1;
        let step = period.times(steps).ok_or(ReminderError::InvalidPeriod {
            value: i64::from(period.value()),
        })?;
        let date = anchor.advance(step)?;
        let solar = date.to_solar()?;
        if clock.days_until(now, solar) >= 0 {
            return Ok(Advancement { date, solar, steps });
        }
    }
}
