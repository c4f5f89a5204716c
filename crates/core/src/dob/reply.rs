use super::{age::age_today, date::parse_birth_date, normalize::extract_date_token};
use crate::{clock::Clock, errors::AgeError};

/// Which command shape captured the text being answered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CommandEntry {
    /// `my dob is <dob>`: the parameter is already the date token.
    Phrase,
    /// `<dob>`: the parameter is the whole message and needs normalizing.
    CatchAll,
}

impl CommandEntry {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Phrase => "phrase",
            Self::CatchAll => "catch_all",
        }
    }
}

pub fn age_reply(age: i32) -> String {
    format!("Your age is {age}.")
}

/// Computes the age for `raw` as captured by `entry`.
pub fn compute_age(entry: CommandEntry, raw: &str, clock: &dyn Clock) -> Result<i32, AgeError> {
    let candidate = match entry {
        CommandEntry::Phrase => raw,
        CommandEntry::CatchAll => extract_date_token(raw)?,
    };
    let birth = parse_birth_date(candidate)?;
    Ok(age_today(birth, clock))
}

/// Produces the chat reply for `raw`. Never fails: errors become user-facing
/// prompts.
pub fn reply_for(entry: CommandEntry, raw: &str, clock: &dyn Clock) -> String {
    match compute_age(entry, raw, clock) {
        Ok(age) => age_reply(age),
        Err(error) => error.user_message(entry).to_owned(),
    }
}
