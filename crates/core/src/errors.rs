use thiserror::Error;

use crate::dob::CommandEntry;

pub const INSUFFICIENT_INPUT_MESSAGE: &str = "Please provide a valid date in YYYY-MM-DD format.";
pub const MALFORMED_PHRASE_MESSAGE: &str =
    "Invalid date of birth format. Please provide a valid date in YYYY-MM-DD format.";
pub const MALFORMED_CATCH_ALL_MESSAGE: &str =
    "Invalid date format. Please provide the date in YYYY-MM-DD format.";

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AgeError {
    #[error("expected at least two words with the date second")]
    InsufficientInput,
    #[error("`{input}` is not a YYYY-MM-DD calendar date")]
    MalformedDate { input: String },
}

impl AgeError {
    pub fn user_message(&self, entry: CommandEntry) -> &'static str {
        match (self, entry) {
            (Self::InsufficientInput, _) => INSUFFICIENT_INPUT_MESSAGE,
            (Self::MalformedDate { .. }, CommandEntry::Phrase) => MALFORMED_PHRASE_MESSAGE,
            (Self::MalformedDate { .. }, CommandEntry::CatchAll) => MALFORMED_CATCH_ALL_MESSAGE,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::InsufficientInput => "insufficient_input",
            Self::MalformedDate { .. } => "malformed_date",
        }
    }
}
