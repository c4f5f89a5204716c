use std::{collections::BTreeMap, sync::Arc};

use agebot_core::{reply_for, Clock, CommandEntry};
use async_trait::async_trait;
use thiserror::Error;

use crate::api::ApiError;

pub const AGE_COMMAND_DESCRIPTION: &str = "Calculate age based on date of birth";
pub const PHRASE_COMMAND: &str = "my dob is <dob>";
pub const CATCH_ALL_COMMAND: &str = "<dob>";
pub const DOB_PARAM: &str = "dob";

#[derive(Clone, Debug, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

/// A command template such as `my dob is <dob>`.
///
/// Literal words match one token each, case-insensitively. A parameter
/// captures one token, except the final one, which takes the rest of the
/// message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandPattern {
    template: String,
    segments: Vec<Segment>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandDefinitionError {
    #[error("command template is empty")]
    EmptyTemplate,
    #[error("malformed parameter `{0}` (expected `<name>`)")]
    MalformedParameter(String),
    #[error("parameter `{0}` appears more than once")]
    DuplicateParameter(String),
}

impl CommandPattern {
    pub fn parse(template: &str) -> Result<Self, CommandDefinitionError> {
        let mut segments = Vec::new();
        let mut seen = Vec::<String>::new();

        for token in template.split_whitespace() {
            if let Some(inner) = token.strip_prefix('<') {
                let name = inner
                    .strip_suffix('>')
                    .filter(|name| !name.is_empty() && !name.contains(['<', '>']))
                    .ok_or_else(|| CommandDefinitionError::MalformedParameter(token.to_owned()))?;
                if seen.iter().any(|existing| existing == name) {
                    return Err(CommandDefinitionError::DuplicateParameter(name.to_owned()));
                }
                seen.push(name.to_owned());
                segments.push(Segment::Param(name.to_owned()));
            } else if token.contains(['<', '>']) {
                return Err(CommandDefinitionError::MalformedParameter(token.to_owned()));
            } else {
                segments.push(Segment::Literal(token.to_lowercase()));
            }
        }

        if segments.is_empty() {
            return Err(CommandDefinitionError::EmptyTemplate);
        }

        Ok(Self { template: segments_template(&segments), segments })
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn matches(&self, text: &str) -> Option<CommandRequest> {
        let mut rest = text.trim();
        let mut params = BTreeMap::new();
        let last = self.segments.len() - 1;

        for (index, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Literal(word) => {
                    let (token, remainder) = split_first_token(rest)?;
                    if token.to_lowercase() != *word {
                        return None;
                    }
                    rest = remainder;
                }
                Segment::Param(name) if index == last => {
                    if rest.is_empty() {
                        return None;
                    }
                    params.insert(name.clone(), rest.to_owned());
                    rest = "";
                }
                Segment::Param(name) => {
                    let (token, remainder) = split_first_token(rest)?;
                    params.insert(name.clone(), token.to_owned());
                    rest = remainder;
                }
            }
        }

        rest.is_empty().then_some(CommandRequest { params })
    }
}

fn segments_template(segments: &[Segment]) -> String {
    segments
        .iter()
        .map(|segment| match segment {
            Segment::Literal(word) => word.clone(),
            Segment::Param(name) => format!("<{name}>"),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn split_first_token(text: &str) -> Option<(&str, &str)> {
    let text = text.trim_start();
    if text.is_empty() {
        return None;
    }
    match text.find(char::is_whitespace) {
        Some(end) => Some((&text[..end], text[end..].trim_start())),
        None => Some((text, "")),
    }
}

/// Parameters captured by a matched command.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommandRequest {
    pub params: BTreeMap<String, String>,
}

impl CommandRequest {
    /// Captured value for `name`, or an empty string when absent.
    pub fn param(&self, name: &str) -> &str {
        self.params.get(name).map(String::as_str).unwrap_or_default()
    }
}

#[async_trait]
pub trait Responder: Send + Sync {
    async fn reply(&self, text: &str) -> Result<(), ApiError>;
}

#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn handle(&self, request: &CommandRequest, responder: &dyn Responder)
        -> Result<(), ApiError>;
}

pub struct CommandDefinition {
    pub pattern: CommandPattern,
    pub description: String,
    handler: Arc<dyn CommandHandler>,
}

impl CommandDefinition {
    pub fn usage(&self) -> &str {
        self.pattern.template()
    }

    pub async fn invoke(
        &self,
        request: &CommandRequest,
        responder: &dyn Responder,
    ) -> Result<(), ApiError> {
        self.handler.handle(request, responder).await
    }
}

pub struct RouteMatch<'a> {
    pub definition: &'a CommandDefinition,
    pub request: CommandRequest,
}

#[derive(Default)]
pub struct CommandRouter {
    definitions: Vec<CommandDefinition>,
}

impl CommandRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<H>(
        &mut self,
        template: &str,
        description: impl Into<String>,
        handler: H,
    ) -> Result<&mut Self, CommandDefinitionError>
    where
        H: CommandHandler + 'static,
    {
        self.definitions.push(CommandDefinition {
            pattern: CommandPattern::parse(template)?,
            description: description.into(),
            handler: Arc::new(handler),
        });
        Ok(self)
    }

    /// First registered command matching `text`.
    pub fn route(&self, text: &str) -> Option<RouteMatch<'_>> {
        self.definitions.iter().find_map(|definition| {
            definition.pattern.matches(text).map(|request| RouteMatch { definition, request })
        })
    }

    pub fn is_help_request(&self, text: &str) -> bool {
        text.trim().eq_ignore_ascii_case("help")
    }

    pub fn help_text(&self) -> String {
        let mut lines = vec!["Available commands:".to_owned()];
        lines.extend(self.definitions.iter().map(|definition| {
            format!("• `{}` {}", definition.usage(), definition.description)
        }));
        lines.push("• `help` List the available commands".to_owned());
        lines.join("\n")
    }

    pub fn definitions(&self) -> &[CommandDefinition] {
        &self.definitions
    }
}

/// Answers an age command captured by either entry shape.
pub struct AgeCommandHandler {
    entry: CommandEntry,
    clock: Arc<dyn Clock>,
}

impl AgeCommandHandler {
    pub fn new(entry: CommandEntry, clock: Arc<dyn Clock>) -> Self {
        Self { entry, clock }
    }
}

#[async_trait]
impl CommandHandler for AgeCommandHandler {
    async fn handle(
        &self,
        request: &CommandRequest,
        responder: &dyn Responder,
    ) -> Result<(), ApiError> {
        let reply = reply_for(self.entry, request.param(DOB_PARAM), self.clock.as_ref());
        responder.reply(&reply).await
    }
}

/// Router with the phrase command registered ahead of the catch-all.
pub fn age_router(clock: Arc<dyn Clock>) -> Result<CommandRouter, CommandDefinitionError> {
    let mut router = CommandRouter::new();
    router
        .register(
            PHRASE_COMMAND,
            AGE_COMMAND_DESCRIPTION,
            AgeCommandHandler::new(CommandEntry::Phrase, clock.clone()),
        )?
        .register(
            CATCH_ALL_COMMAND,
            AGE_COMMAND_DESCRIPTION,
            AgeCommandHandler::new(CommandEntry::CatchAll, clock),
        )?;
    Ok(router)
}

/// Drops a leading `<@U123>` bot mention from `text`.
pub fn strip_bot_mention(text: &str) -> &str {
    let trimmed = text.trim_start();
    match trimmed.strip_prefix("<@").and_then(|rest| rest.split_once('>')) {
        Some((_, remainder)) => remainder.trim_start(),
        None => trimmed,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use agebot_core::{CalendarDate, FixedClock};
    use async_trait::async_trait;

    use super::{
        age_router, strip_bot_mention, CommandDefinitionError, CommandPattern, CommandRequest,
        Responder, CATCH_ALL_COMMAND, PHRASE_COMMAND,
    };
    use crate::api::ApiError;

    #[derive(Default)]
    struct RecordingResponder {
        replies: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Responder for RecordingResponder {
        async fn reply(&self, text: &str) -> Result<(), ApiError> {
            self.replies.lock().expect("lock").push(text.to_owned());
            Ok(())
        }
    }

    fn fixed_clock() -> Arc<FixedClock> {
        Arc::new(FixedClock(CalendarDate::from_ymd(2024, 5, 15).expect("fixture date")))
    }

    #[test]
    fn parses_literals_and_parameters() {
        let pattern = CommandPattern::parse("  My   DOB is <dob> ").expect("pattern");
        assert_eq!(pattern.template(), "my dob is <dob>");
    }

    #[test]
    fn rejects_invalid_templates() {
        assert_eq!(CommandPattern::parse("   "), Err(CommandDefinitionError::EmptyTemplate));
        assert_eq!(
            CommandPattern::parse("my <>"),
            Err(CommandDefinitionError::MalformedParameter("<>".to_owned()))
        );
        assert_eq!(
            CommandPattern::parse("my <dob"),
            Err(CommandDefinitionError::MalformedParameter("<dob".to_owned()))
        );
        assert_eq!(
            CommandPattern::parse("a>b"),
            Err(CommandDefinitionError::MalformedParameter("a>b".to_owned()))
        );
        assert_eq!(
            CommandPattern::parse("<x> <x>"),
            Err(CommandDefinitionError::DuplicateParameter("x".to_owned()))
        );
    }

    #[test]
    fn phrase_pattern_captures_date_token() {
        let pattern = CommandPattern::parse(PHRASE_COMMAND).expect("pattern");
        let request = pattern.matches("My DOB is 1990-05-15").expect("match");
        assert_eq!(request.param("dob"), "1990-05-15");
        assert!(pattern.matches("my dob is").is_none());
        assert!(pattern.matches("my birthday is 1990-05-15").is_none());
    }

    #[test]
    fn final_parameter_takes_remainder() {
        let pattern = CommandPattern::parse(CATCH_ALL_COMMAND).expect("pattern");
        let request = pattern.matches("  is   1990-05-15  ").expect("match");
        assert_eq!(request.param("dob"), "is   1990-05-15");
        assert!(pattern.matches("   ").is_none());
    }

    #[test]
    fn inner_parameters_take_single_tokens() {
        let pattern = CommandPattern::parse("convert <from> to <to>").expect("pattern");
        let request = pattern.matches("convert usd to euro please").expect("match");
        assert_eq!(request.param("from"), "usd");
        assert_eq!(request.param("to"), "euro please");
        assert!(pattern.matches("convert usd into euro").is_none());
    }

    #[test]
    fn trailing_literal_rejects_extra_words() {
        let pattern = CommandPattern::parse("ping").expect("pattern");
        assert!(pattern.matches("PING").is_some());
        assert!(pattern.matches("ping now").is_none());
    }

    #[test]
    fn missing_param_reads_as_empty() {
        assert_eq!(CommandRequest::default().param("dob"), "");
    }

    #[test]
    fn router_prefers_phrase_over_catch_all() {
        let router = age_router(fixed_clock()).expect("router");
        let routed = router.route("my dob is 1990-05-15").expect("route");
        assert_eq!(routed.definition.usage(), PHRASE_COMMAND);
        assert_eq!(routed.request.param("dob"), "1990-05-15");

        let routed = router.route("is 1990-05-15").expect("route");
        assert_eq!(routed.definition.usage(), CATCH_ALL_COMMAND);
        assert_eq!(routed.request.param("dob"), "is 1990-05-15");

        assert!(router.route("").is_none());
    }

    #[tokio::test]
    async fn age_handlers_reply_through_responder() {
        let router = age_router(fixed_clock()).expect("router");
        let responder = RecordingResponder::default();

        for text in ["my dob is 1990-05-17", "is 1990-05-15", "only", "my dob is 1990-13-01"] {
            let routed = router.route(text).expect("route");
            routed.definition.invoke(&routed.request, &responder).await.expect("reply");
        }

        let replies = responder.replies.lock().expect("lock");
        assert_eq!(
            &*replies,
            &[
                "Your age is 33.",
                "Your age is 34.",
                "Please provide a valid date in YYYY-MM-DD format.",
                "Invalid date of birth format. Please provide a valid date in YYYY-MM-DD format.",
            ]
        );
    }

    #[test]
    fn help_lists_registered_commands() {
        let router = age_router(fixed_clock()).expect("router");
        assert!(router.is_help_request(" HELP "));
        assert!(!router.is_help_request("help me"));

        let help = router.help_text();
        assert!(help.contains("`my dob is <dob>` Calculate age based on date of birth"));
        assert!(help.contains("`<dob>` Calculate age based on date of birth"));
        assert_eq!(router.definitions().len(), 2);
    }

    #[test]
    fn strips_leading_mention_only() {
        assert_eq!(strip_bot_mention("<@U123ABC> my dob is 1990-05-15"), "my dob is 1990-05-15");
        assert_eq!(strip_bot_mention("  <@U1>help"), "help");
        assert_eq!(strip_bot_mention("hello <@U1>"), "hello <@U1>");
        assert_eq!(strip_bot_mention("<@U1"), "<@U1");
    }
}
