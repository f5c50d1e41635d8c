//! Calendar values stored as ISO-8601 text.
//!
//! SQLite has no native date or time storage class, so these are bound as
//! zero-padded text and parsed back when a column is declared `DATE`,
//! `TIME` or `DATETIME`. The structs hold plain fields; no calendar
//! validation is applied, which keeps encode/parse a lossless round trip.
//! Use the `chrono` conversions when calendar arithmetic is needed.

use std::fmt;

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

/// A calendar date (`YYYY-MM-DD`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Date {
    /// Year, formatted to at least four digits.
    pub year: i32,
    /// Month, 1-12.
    pub month: u32,
    /// Day of month, 1-31.
    pub day: u32,
}

/// A time of day with microsecond precision (`HH:MM:SS.FFFFFF`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Time {
    /// Hour, 0-23.
    pub hour: u32,
    /// Minute, 0-59.
    pub minute: u32,
    /// Second, 0-59.
    pub second: u32,
    /// Microsecond, 0-999999.
    pub microsecond: u32,
}

/// A date and a time of day (`YYYY-MM-DD HH:MM:SS.FFFFFF`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DateTime {
    /// Date part.
    pub date: Date,
    /// Time part.
    pub time: Time,
}

impl Date {
    /// Creates a date from its parts.
    #[must_use]
    pub const fn new(year: i32, month: u32, day: u32) -> Self {
        Self { year, month, day }
    }

    /// Parses `YYYY-MM-DD`.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let mut parts = text.split('-');
        let year = digits(parts.next()?, 1, 4)?;
        let month = digits(parts.next()?, 1, 2)?;
        let day = digits(parts.next()?, 1, 2)?;
        if parts.next().is_some() {
            return None;
        }
        Some(Self {
            year: i32::try_from(year).ok()?,
            month,
            day,
        })
    }

    /// Converts to a `chrono` date; `None` if the fields do not name a real
    /// calendar day.
    #[must_use]
    pub fn to_naive(self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, self.day)
    }
}

impl Time {
    /// Creates a time from its parts.
    #[must_use]
    pub const fn new(hour: u32, minute: u32, second: u32, microsecond: u32) -> Self {
        Self {
            hour,
            minute,
            second,
            microsecond,
        }
    }

    /// Parses `HH:MM:SS` or `HH:MM:SS.F` with one to six fraction digits.
    /// A three-digit fraction is milliseconds.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        parse_clock(text, false)
    }

    /// Converts to a `chrono` time; `None` if any field is out of range.
    #[must_use]
    pub fn to_naive(self) -> Option<NaiveTime> {
        NaiveTime::from_hms_micro_opt(self.hour, self.minute, self.second, self.microsecond)
    }
}

impl DateTime {
    /// Creates a datetime from its parts.
    #[must_use]
    pub const fn new(date: Date, time: Time) -> Self {
        Self { date, time }
    }

    /// Parses, in decreasing order of specificity of the time part:
    ///
    /// 1. `YYYY-MM-DD HH:MM` (seconds and microseconds zero)
    /// 2. `YYYY-MM-DD HH:MM:SS`
    /// 3. `YYYY-MM-DD HH:MM:SS.FFF` (milliseconds, scaled to microseconds)
    /// 4. `YYYY-MM-DD HH:MM:SS.FFFFFF`
    ///
    /// `T` is accepted in place of the separating space.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let (date, time) = text.split_once([' ', 'T'])?;
        Some(Self {
            date: Date::parse(date)?,
            time: parse_clock(time, true)?,
        })
    }

    /// Converts to a `chrono` datetime.
    #[must_use]
    pub fn to_naive(self) -> Option<NaiveDateTime> {
        Some(NaiveDateTime::new(
            self.date.to_naive()?,
            self.time.to_naive()?,
        ))
    }
}

fn parse_clock(text: &str, allow_minutes_only: bool) -> Option<Time> {
    let (clock, fraction) = match text.split_once('.') {
        Some((clock, fraction)) => (clock, Some(fraction)),
        None => (text, None),
    };
    let mut parts = clock.split(':');
    let hour = digits(parts.next()?, 1, 2)?;
    let minute = digits(parts.next()?, 1, 2)?;
    let second = match parts.next() {
        Some(second) => digits(second, 1, 2)?,
        None if allow_minutes_only && fraction.is_none() => 0,
        None => return None,
    };
    if parts.next().is_some() {
        return None;
    }
    let microsecond = match fraction {
        Some(fraction) => {
            let value = digits(fraction, 1, 6)?;
            // Right-pad to six digits: ".123" is 123000 microseconds.
            let missing = 6 - u32::try_from(fraction.len()).ok()?;
            value * 10u32.pow(missing)
        }
        None => 0,
    };
    Some(Time {
        hour,
        minute,
        second,
        microsecond,
    })
}

/// Parses an all-ASCII-digit field of `min..=max` characters.
fn digits(field: &str, min: usize, max: usize) -> Option<u32> {
    if field.len() < min || field.len() > max || !field.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    field.parse().ok()
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:02}.{:06}",
            self.hour, self.minute, self.second, self.microsecond
        )
    }
}

impl fmt::Display for DateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.date, self.time)
    }
}

impl From<NaiveDate> for Date {
    fn from(date: NaiveDate) -> Self {
        Self::new(date.year(), date.month(), date.day())
    }
}

impl From<NaiveTime> for Time {
    fn from(time: NaiveTime) -> Self {
        // Leap seconds carry nanosecond values past one second; clamp them.
        let microsecond = (time.nanosecond() / 1_000).min(999_999);
        Self::new(time.hour(), time.minute(), time.second(), microsecond)
    }
}

impl From<NaiveDateTime> for DateTime {
    fn from(datetime: NaiveDateTime) -> Self {
        Self::new(datetime.date().into(), datetime.time().into())
    }
}
