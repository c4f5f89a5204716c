//! Age bot core: date-of-birth parsing, age arithmetic, reply text and
//! configuration. Nothing here talks to Slack.

pub mod clock;
pub mod config;
pub mod dob;
pub mod errors;

pub use clock::{Clock, FixedClock, SystemClock};
pub use dob::{
    age_on, age_reply, age_today, compute_age, extract_date_token, parse_birth_date, reply_for,
    CalendarDate, CommandEntry,
};
pub use errors::AgeError;
