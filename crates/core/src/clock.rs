use chrono::Local;

use crate::dob::CalendarDate;

/// Source of "today" for age calculations.
pub trait Clock: Send + Sync {
    fn today(&self) -> CalendarDate;
}

/// Reads the local calendar date from the system clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> CalendarDate {
        CalendarDate::from(Local::now().date_naive())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FixedClock(pub CalendarDate);

impl Clock for FixedClock {
    fn today(&self) -> CalendarDate {
        self.0
    }
}
