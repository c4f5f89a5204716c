use agebot_core::{age_reply, compute_age, CalendarDate, Clock, CommandEntry, FixedClock, SystemClock};

use super::CommandResult;

const COMMAND: &str = "age";

/// Answers `text` the way the bot would, against `on` or today's local date.
///
/// `catch_all` treats `text` as a whole message (date in second position)
/// instead of a bare date token. The payload message is the exact chat reply.
pub fn run(text: &str, on: Option<&str>, catch_all: bool) -> CommandResult {
    let clock: Box<dyn Clock> = match on {
        Some(raw) => match raw.parse::<CalendarDate>() {
            Ok(date) => Box::new(FixedClock(date)),
            Err(error) => {
                return CommandResult::failure(
                    COMMAND,
                    "invalid_reference_date",
                    format!("--on: {error}"),
                    2,
                )
            }
        },
        None => Box::new(SystemClock),
    };

    let entry = if catch_all { CommandEntry::CatchAll } else { CommandEntry::Phrase };

    match compute_age(entry, text, clock.as_ref()) {
        Ok(age) => CommandResult::success(COMMAND, age_reply(age)),
        Err(error) => CommandResult::failure(COMMAND, error.kind(), error.user_message(entry), 1),
    }
}
