//! Date-of-birth handling: token extraction, strict parsing, age arithmetic
//! and the reply text built from them.

pub mod age;
pub mod date;
pub mod normalize;
pub mod reply;

pub use age::{age_on, age_today};
pub use date::{parse_birth_date, CalendarDate, DATE_LAYOUT};
pub use normalize::extract_date_token;
pub use reply::{age_reply, compute_age, reply_for, CommandEntry};
