//! # Feature: Timezone Calendar Clock
//!
//! Timezone-local calendar dates and whole-day arithmetic.
//!
//! "Days remaining" never subtracts real local midnights. Both sides are
//! reduced to their local calendar date, each date is re-encoded as a UTC
//! midnight (a proxy instant) and the proxies are subtracted. The proxy is off
//! from the true local midnight by the zone offset, but both operands share
//! that construction, so the day difference is exact across DST changes.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Offset, TimeZone, Utc};
use chrono_tz::Tz;

use crate::core::{EngineResult, ReminderError};

const MS_PER_HOUR: f64 = 3_600_000.0;

/// Calendar view of instants in one configured timezone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarClock {
    tz: Tz,
}

impl Default for CalendarClock {
    fn default() -> Self {
        Self::utc()
    }
}

impl CalendarClock {
    /// Build a clock from an IANA name or "UTC"
    pub fn new(timezone: &str) -> EngineResult<Self> {
        let name = timezone.trim();
        if name.is_empty() {
            return Ok(Self::utc());
        }
        name.parse::<Tz>()
            .map(|tz| Self { tz })
            .map_err(|_| ReminderError::InvalidTimezone(timezone.to_string()))
    }

    pub fn utc() -> Self {
        Self { tz: Tz::UTC }
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    pub fn name(&self) -> &'static str {
        self.tz.name()
    }

    /// Calendar date of `instant` in this timezone
    pub fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.tz).date_naive()
    }

    /// Wall-clock time of `instant` in this timezone
    pub fn local_time(&self, instant: DateTime<Utc>) -> NaiveTime {
        instant.with_timezone(&self.tz).time()
    }

    /// UTC midnight carrying the components of `date`
    pub fn proxy_midnight(date: NaiveDate) -> DateTime<Utc> {
        date.and_time(NaiveTime::MIN).and_utc()
    }

    /// Proxy midnight of the local calendar date of `instant`
    pub fn local_midnight_instant(&self, instant: DateTime<Utc>) -> DateTime<Utc> {
        Self::proxy_midnight(self.local_date(instant))
    }

    /// Calendar days from `a` to `b` in this timezone (negative when `b` is earlier)
    pub fn whole_days_between(&self, a: DateTime<Utc>, b: DateTime<Utc>) -> i64 {
        (self.local_midnight_instant(b) - self.local_midnight_instant(a)).num_days()
    }

    /// Calendar days from the local date of `now` to `date`
    pub fn days_until(&self, now: DateTime<Utc>, date: NaiveDate) -> i64 {
        (Self::proxy_midnight(date) - self.local_midnight_instant(now)).num_days()
    }

    /// Fractional hours from `a` to `b`, instant to instant
    pub fn hours_between(a: DateTime<Utc>, b: DateTime<Utc>) -> f64 {
        (b - a).num_milliseconds() as f64 / MS_PER_HOUR
    }

    /// Instant of local `date` at `time`.
    ///
    /// Ambiguous wall times take the earlier instant; times inside a DST gap
    /// move forward by the length of the gap (one hour).
    pub fn to_instant(&self, date: NaiveDate, time: NaiveTime) -> DateTime<Utc> {
        let naive = date.and_time(time);
        self.tz
            .from_local_datetime(&naive)
            .earliest()
            .or_else(|| {
                self.tz
                    .from_local_datetime(&(naive + Duration::hours(1)))
                    .earliest()
            })
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|| naive.and_utc())
    }

    /// Offset from UTC at `at`, rounded to whole hours
    pub fn utc_offset_hours(&self, at: DateTime<Utc>) -> i32 {
        let seconds = at.with_timezone(&self.tz).offset().fix().local_minus_utc();
        (f64::from(seconds) / 3600.0).round() as i32
    }

    /// e.g. `Asia/Shanghai (UTC+8)`
    pub fn display_name(&self, at: DateTime<Utc>) -> String {
        format!("{} (UTC{:+})", self.name(), self.utc_offset_hours(at))
    }

    pub fn format_date(&self, instant: DateTime<Utc>) -> String {
        instant.with_timezone(&self.tz).format("%Y-%m-%d").to_string()
    }

    pub fn format_datetime(&self, instant: DateTime<Utc>) -> String {
        instant
            .with_timezone(&self.tz)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
    }
}
