use crate::errors::AgeError;

/// Picks the date token out of free text captured by the catch-all command.
///
/// The first whitespace-delimited word is filler and the second is taken as
/// the date. Anything after the second token is ignored.
pub fn extract_date_token(raw: &str) -> Result<&str, AgeError> {
    let mut tokens = raw.split_whitespace();
    match (tokens.next(), tokens.next()) {
        (Some(_), Some(candidate)) => Ok(candidate),
        _ => Err(AgeError::InsufficientInput),
    }
}

#[cfg(test)]
mod tests {
    use super::extract_date_token;
    use crate::errors::AgeError;

    #[test]
    fn fewer_than_two_tokens_is_insufficient() {
        for input in ["", "   ", "only", "  only  ", "\t1990-05-15\n"] {
            assert_eq!(extract_date_token(input), Err(AgeError::InsufficientInput), "{input:?}");
        }
    }

    #[test]
    fn returns_second_token() {
        assert_eq!(extract_date_token("is 1990-05-15"), Ok("1990-05-15"));
        assert_eq!(extract_date_token("  is \t 1990-05-15  "), Ok("1990-05-15"));
    }

    #[test]
    fn later_tokens_do_not_matter() {
        assert_eq!(extract_date_token("dob 1990-05-15 and more words"), Ok("1990-05-15"));
        assert_eq!(extract_date_token("my dob is 1990-05-15"), Ok("dob"));
    }
}
