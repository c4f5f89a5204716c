use super::date::CalendarDate;
use crate::clock::Clock;

/// Whole years between `birth` and `now`.
///
/// The birthday check compares day-of-year ordinals rather than month/day, so
/// a leap year on either side shifts the comparison by one day from March
/// onwards: a 2000-03-01 birthday is not yet reached on 2023-03-01, while a
/// 2001-03-02 birthday already counts on 2024-03-01. Future birth dates yield
/// negative ages.
pub fn age_on(birth: CalendarDate, now: CalendarDate) -> i32 {
    let mut age = now.year() - birth.year();
    if now.ordinal() < birth.ordinal() {
        age -= 1;
    }
    age
}

pub fn age_today(birth: CalendarDate, clock: &dyn Clock) -> i32 {
    age_on(birth, clock.today())
}
