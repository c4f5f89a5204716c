use std::fmt;

use chrono::{Datelike, NaiveDate};

use crate::errors::AgeError;

pub const DATE_LAYOUT: &str = "YYYY-MM-DD";

/// A validated Gregorian calendar date.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CalendarDate(NaiveDate);

impl CalendarDate {
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }

    pub fn month(&self) -> u32 {
        self.0.month()
    }

    pub fn day(&self) -> u32 {
        self.0.day()
    }

    /// Day of the year, 1-based (1..=366).
    pub fn ordinal(&self) -> u32 {
        self.0.ordinal()
    }
}

impl From<NaiveDate> for CalendarDate {
    fn from(value: NaiveDate) -> Self {
        Self(value)
    }
}

impl fmt::Display for CalendarDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year(), self.month(), self.day())
    }
}

impl std::str::FromStr for CalendarDate {
    type Err = AgeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        parse_birth_date(value)
    }
}

/// Parses `candidate` against the fixed `YYYY-MM-DD` layout.
///
/// Every field must be zero-padded to its full width and the whole input must
/// be consumed; chrono's `%Y-%m-%d` is more lenient than that, so the shape is
/// checked byte by byte before the calendar check.
pub fn parse_birth_date(candidate: &str) -> Result<CalendarDate, AgeError> {
    let malformed = || AgeError::MalformedDate { input: candidate.to_owned() };

    let bytes = candidate.as_bytes();
    if bytes.len() != DATE_LAYOUT.len() || bytes[4] != b'-' || bytes[7] != b'-' {
        return Err(malformed());
    }

    let year = digits(&bytes[0..4]).ok_or_else(malformed)?;
    let month = digits(&bytes[5..7]).ok_or_else(malformed)?;
    let day = digits(&bytes[8..10]).ok_or_else(malformed)?;

    let year = i32::try_from(year).map_err(|_| malformed())?;
    CalendarDate::from_ymd(year, month, day).ok_or_else(malformed)
}

fn digits(field: &[u8]) -> Option<u32> {
    field.iter().try_fold(0_u32, |acc, byte| {
        byte.is_ascii_digit().then(|| acc * 10 + u32::from(byte - b'0'))
    })
}
