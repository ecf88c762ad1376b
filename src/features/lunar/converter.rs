//! Solar (Gregorian) <-> lunar date conversion
//!
//! The forward direction walks day offsets from the table epoch
//! (1900-01-31, lunar 1900-01-01). The inverse has no closed form and scans
//! candidate Gregorian dates around the lunar year.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use super::table::{self, MAX_YEAR, MIN_YEAR};
use crate::core::{EngineResult, ReminderError};

/// A day in the lunar calendar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LunarDate {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    /// Only true when `month` is the year's leap month index
    pub is_leap: bool,
}

impl LunarDate {
    pub fn new(year: i32, month: u32, day: u32, is_leap: bool) -> Self {
        Self {
            year,
            month,
            day,
            is_leap,
        }
    }

    /// Check the fields are inside the table's year range and the
    /// 1-12 month / 1-30 day grid. Does not check the day exists.
    pub fn validate(&self) -> EngineResult<()> {
        if !table::in_range(self.year) {
            return Err(ReminderError::LunarRange { year: self.year });
        }
        if !(1..=12).contains(&self.month) || !(1..=30).contains(&self.day) {
            return Err(ReminderError::InvalidLunarDate { date: *self });
        }
        Ok(())
    }

    /// Convert a Gregorian date to its lunar date
    pub fn from_solar(date: NaiveDate) -> EngineResult<Self> {
        solar_to_lunar(date.year(), date.month(), date.day())
    }

    /// Gregorian date of this lunar date, `None` if no date maps onto it
    pub fn to_solar(&self) -> Option<NaiveDate> {
        lunar_to_solar(self)
    }
}

fn epoch() -> NaiveDate {
    // 1900-01-31 is a fixed valid date
    NaiveDate::from_ymd_opt(1900, 1, 31).unwrap_or(NaiveDate::MIN)
}

/// Convert a Gregorian `(year, month, day)` to a lunar date.
///
/// Fails with `LunarRange` outside 1900-2100 and for the last days of
/// January 1900, which precede the first lunar new year in the table.
pub fn solar_to_lunar(year: i32, month: u32, day: u32) -> EngineResult<LunarDate> {
    if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
        return Err(ReminderError::LunarRange { year });
    }
    let date = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| {
        ReminderError::InvalidRecord {
            id: format!("{year:04}-{month:02}-{day:02}"),
            reason: "not a valid Gregorian date".to_string(),
        }
    })?;

    let mut offset = (date - epoch()).num_days();
    if offset < 0 {
        return Err(ReminderError::LunarRange { year: MIN_YEAR - 1 });
    }

    // Year walk
    let mut lunar_year = MIN_YEAR;
    let mut span = 0i64;
    while lunar_year <= MAX_YEAR && offset > 0 {
        span = i64::from(table::year_length(lunar_year)?);
        offset -= span;
        lunar_year += 1;
    }
    if offset < 0 {
        offset += span;
        lunar_year -= 1;
    }
    if lunar_year > MAX_YEAR {
        return Err(ReminderError::LunarRange { year: lunar_year });
    }

    // Month walk; the leap month is an extra slot right after its sibling
    let leap = table::leap_month_index(lunar_year)?;
    let mut is_leap = false;
    let mut month = 1u32;
    while month < 13 && offset > 0 {
        if leap > 0 && month == leap + 1 && !is_leap {
            month -= 1;
            is_leap = true;
            span = i64::from(table::leap_month_length(lunar_year)?);
        } else {
            span = i64::from(table::month_length(lunar_year, month)?);
        }

        if is_leap && month == leap + 1 {
            is_leap = false;
        }
        offset -= span;
        month += 1;
    }

    // Landed exactly on the seam between a month and its leap sibling
    if offset == 0 && leap > 0 && month == leap + 1 {
        if is_leap {
            is_leap = false;
        } else {
            is_leap = true;
            month -= 1;
        }
    }

    if offset < 0 {
        offset += span;
        month -= 1;
    }

    Ok(LunarDate {
        year: lunar_year,
        month,
        day: (offset + 1) as u32,
        is_leap,
    })
}

/// Day offset from the epoch implied by the table, before any validation
fn table_offset(lunar: &LunarDate) -> EngineResult<i64> {
    let mut offset = 0i64;
    for year in MIN_YEAR..lunar.year {
        offset += i64::from(table::year_length(year)?);
    }
    let leap = table::leap_month_index(lunar.year)?;
    for month in 1..lunar.month {
        offset += i64::from(table::month_length(lunar.year, month)?);
        if month == leap {
            offset += i64::from(table::leap_month_length(lunar.year)?);
        }
    }
    if lunar.is_leap {
        offset += i64::from(table::month_length(lunar.year, lunar.month)?);
    }
    Ok(offset + i64::from(lunar.day) - 1)
}

/// Find the Gregorian date for a lunar date.
///
/// The candidate implied by the table is accepted only if it converts back
/// to exactly `lunar`. Otherwise every valid Gregorian date from the year
/// before to the year after is scanned for an exact match on
/// `(year, month, day, is_leap)`.
pub fn lunar_to_solar(lunar: &LunarDate) -> Option<NaiveDate> {
    lunar.validate().ok()?;

    let candidate = table_offset(lunar)
        .ok()
        .and_then(|offset| epoch().checked_add_days(chrono::Days::new(offset as u64)));
    if let Some(date) = candidate {
        if LunarDate::from_solar(date).ok() == Some(*lunar) {
            return Some(date);
        }
    }

    for year in (lunar.year - 1)..=(lunar.year + 1) {
        for month in 1..=12 {
            for day in 1..=31 {
                if NaiveDate::from_ymd_opt(year, month, day).is_none() {
                    continue;
                }
                match solar_to_lunar(year, month, day) {
                    Ok(candidate) if candidate == *lunar => {
                        return NaiveDate::from_ymd_opt(year, month, day);
                    }
                    _ => {}
                }
            }
        }
    }
    None
}

/// Like [`lunar_to_solar`] but reports a miss as `LunarInverse`
pub fn lunar_to_solar_checked(lunar: &LunarDate) -> EngineResult<NaiveDate> {
    lunar_to_solar(lunar).ok_or(ReminderError::LunarInverse { date: *lunar })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_chinese_new_year_2024() {
        assert_eq!(
            solar_to_lunar(2024, 2, 10).unwrap(),
            LunarDate::new(2024, 1, 1, false)
        );
    }

    #[test]
    fn test_epoch() {
        assert_eq!(
            solar_to_lunar(1900, 1, 31).unwrap(),
            LunarDate::new(1900, 1, 1, false)
        );
    }

    #[test]
    fn test_out_of_range() {
        assert_eq!(
            solar_to_lunar(1899, 12, 31),
            Err(ReminderError::LunarRange { year: 1899 })
        );
        assert_eq!(
            solar_to_lunar(2101, 1, 1),
            Err(ReminderError::LunarRange { year: 2101 })
        );
        assert!(solar_to_lunar(1900, 1, 30).is_err());
    }

    #[test]
    fn test_invalid_gregorian_date() {
        assert!(matches!(
            solar_to_lunar(2023, 2, 29),
            Err(ReminderError::InvalidRecord { .. })
        ));
    }

    #[test]
    fn test_leap_month_seams() {
        // 2023 has a leap second month
        assert_eq!(
            solar_to_lunar(2023, 3, 21).unwrap(),
            LunarDate::new(2023, 2, 30, false)
        );
        assert_eq!(
            solar_to_lunar(2023, 3, 22).unwrap(),
            LunarDate::new(2023, 2, 1, true)
        );
        assert_eq!(
            solar_to_lunar(2023, 4, 19).unwrap(),
            LunarDate::new(2023, 2, 29, true)
        );
        assert_eq!(
            solar_to_lunar(2023, 4, 20).unwrap(),
            LunarDate::new(2023, 3, 1, false)
        );

        // 2020 has a leap fourth month
        assert_eq!(
            solar_to_lunar(2020, 5, 23).unwrap(),
            LunarDate::new(2020, 4, 1, true)
        );
        assert_eq!(
            solar_to_lunar(2020, 6, 21).unwrap(),
            LunarDate::new(2020, 5, 1, false)
        );
    }

    #[test]
    fn test_late_table_years() {
        assert_eq!(
            solar_to_lunar(2033, 12, 22).unwrap(),
            LunarDate::new(2033, 11, 1, true)
        );
        assert_eq!(
            solar_to_lunar(2050, 1, 23).unwrap(),
            LunarDate::new(2050, 1, 1, false)
        );
        assert_eq!(
            solar_to_lunar(2100, 2, 9).unwrap(),
            LunarDate::new(2100, 1, 1, false)
        );
        assert_eq!(
            solar_to_lunar(2100, 12, 31).unwrap(),
            LunarDate::new(2100, 12, 1, false)
        );
    }

    #[test]
    fn test_previous_lunar_year() {
        assert_eq!(
            solar_to_lunar(2024, 1, 31).unwrap(),
            LunarDate::new(2023, 12, 21, false)
        );
        assert_eq!(
            solar_to_lunar(2025, 1, 28).unwrap(),
            LunarDate::new(2024, 12, 29, false)
        );
    }

    #[test]
    fn test_lunar_to_solar() {
        assert_eq!(
            lunar_to_solar(&LunarDate::new(2024, 1, 1, false)),
            Some(ymd(2024, 2, 10))
        );
        assert_eq!(
            lunar_to_solar(&LunarDate::new(2023, 2, 1, true)),
            Some(ymd(2023, 3, 22))
        );
        assert_eq!(
            lunar_to_solar(&LunarDate::new(2025, 6, 1, true)),
            Some(ymd(2025, 7, 25))
        );
    }

    #[test]
    fn test_lunar_to_solar_misses() {
        // 2024 has no leap month at all
        assert_eq!(lunar_to_solar(&LunarDate::new(2024, 2, 1, true)), None);
        // 2024 month 1 only has 29 days
        assert_eq!(lunar_to_solar(&LunarDate::new(2024, 1, 30, false)), None);
        assert_eq!(lunar_to_solar(&LunarDate::new(2024, 13, 1, false)), None);
        assert!(matches!(
            lunar_to_solar_checked(&LunarDate::new(2024, 1, 30, false)),
            Err(ReminderError::LunarInverse { .. })
        ));
    }

    #[test]
    fn test_validate() {
        assert!(LunarDate::new(2024, 12, 30, false).validate().is_ok());
        assert_eq!(
            LunarDate::new(2024, 13, 1, false).validate(),
            Err(ReminderError::InvalidLunarDate {
                date: LunarDate::new(2024, 13, 1, false)
            })
        );
        assert!(LunarDate::new(2024, 1, 0, false).validate().is_err());
        assert!(LunarDate::new(2024, 1, 31, false).validate().is_err());
        assert_eq!(
            LunarDate::new(2101, 1, 1, false).validate(),
            Err(ReminderError::LunarRange { year: 2101 })
        );
    }

    #[test]
    fn test_every_day_round_trips() {
        let mut date = ymd(1900, 1, 31);
        let end = ymd(2100, 12, 31);
        while date <= end {
            let lunar = LunarDate::from_solar(date).unwrap();
            assert_eq!(lunar.to_solar(), Some(date), "round trip failed for {date}");
            if lunar.is_leap {
                assert_eq!(table::leap_month_index(lunar.year).unwrap(), lunar.month);
            }
            assert!(lunar.day <= table::days_in_month(lunar.year, lunar.month, lunar.is_leap).unwrap());
            date += chrono::Duration::days(1);
        }
    }
}
