use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::{
    api::{ApiError, MessagePoster},
    commands::{CommandRouter, Responder},
    observer::{CommandEvent, CommandEventSink, EventSummary},
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlackEnvelope {
    pub envelope_id: String,
    pub event: SlackEvent,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SlackEvent {
    Message(MessageEvent),
    AppMention(MessageEvent),
    Unsupported { event_type: String },
}

impl SlackEvent {
    pub fn event_type(&self) -> SlackEventType {
        match self {
            Self::Message(_) => SlackEventType::Message,
            Self::AppMention(_) => SlackEventType::AppMention,
            Self::Unsupported { .. } => SlackEventType::Unsupported,
        }
    }

    /// Builds an event from the `event` object of an Events API payload.
    ///
    /// Bot messages and message subtypes (edits, joins, deletions) are not
    /// commands and come back as `Unsupported`.
    pub fn from_payload(event: &serde_json::Value) -> Self {
        let event_type =
            event.get("type").and_then(serde_json::Value::as_str).unwrap_or("unknown").to_owned();

        let raw = match RawMessageEvent::deserialize(event) {
            Ok(raw) => raw,
            Err(_) => return Self::Unsupported { event_type },
        };
        if raw.subtype.is_some() || raw.bot_id.is_some() {
            return Self::Unsupported { event_type };
        }
        let (Some(user_id), Some(channel_id)) = (raw.user, raw.channel) else {
            return Self::Unsupported { event_type };
        };

        let message = MessageEvent {
            channel_id,
            channel_type: raw.channel_type,
            user_id,
            text: raw.text.unwrap_or_default(),
            thread_ts: raw.thread_ts,
        };

        if event_type == "message" {
            Self::Message(message)
        } else if event_type == "app_mention" {
            Self::AppMention(message)
        } else {
            Self::Unsupported { event_type }
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawMessageEvent {
    user: Option<String>,
    channel: Option<String>,
    channel_type: Option<String>,
    text: Option<String>,
    thread_ts: Option<String>,
    subtype: Option<String>,
    bot_id: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SlackEventType {
    Message,
    AppMention,
    Unsupported,
}

impl SlackEventType {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Message => "message",
            Self::AppMention => "app_mention",
            Self::Unsupported => "unsupported",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageEvent {
    pub channel_id: String,
    pub channel_type: Option<String>,
    pub user_id: String,
    pub text: String,
    pub thread_ts: Option<String>,
}

impl MessageEvent {
    pub fn is_direct_message(&self) -> bool {
        self.channel_type.as_deref() == Some("im")
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventContext {
    pub correlation_id: String,
}

impl Default for EventContext {
    fn default() -> Self {
        Self { correlation_id: "unknown-correlation-id".to_owned() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandlerResult {
    Responded { command: String },
    Ignored,
}

#[derive(Debug, Error)]
pub enum EventHandlerError {
    #[error("reply failed: {0}")]
    Reply(#[from] ApiError),
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Handler(#[from] EventHandlerError),
}

#[async_trait]
pub trait EventHandler: Send + Sync {
    fn event_type(&self) -> SlackEventType;
    async fn handle(
        &self,
        envelope: &SlackEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError>;
}

#[derive(Default)]
pub struct EventDispatcher {
    handlers: HashMap<SlackEventType, Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<H>(&mut self, handler: H)
    where
        H: EventHandler + 'static,
    {
        self.handlers.insert(handler.event_type(), Arc::new(handler));
    }

    pub async fn dispatch(
        &self,
        envelope: &SlackEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, DispatchError> {
        let Some(handler) = self.handlers.get(&envelope.event.event_type()) else {
            return Ok(HandlerResult::Ignored);
        };

        handler.handle(envelope, ctx).await.map_err(DispatchError::from)
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

/// Dispatcher answering direct messages and mentions from one router.
pub fn command_dispatcher(
    router: Arc<CommandRouter>,
    poster: Arc<dyn MessagePoster>,
    events: CommandEventSink,
) -> EventDispatcher {
    let mut dispatcher = EventDispatcher::new();
    dispatcher.register(CommandMessageHandler::direct_messages(
        router.clone(),
        poster.clone(),
        events.clone(),
    ));
    dispatcher.register(CommandMessageHandler::mentions(router, poster, events));
    dispatcher
}

/// Replies into the channel (and thread, when there is one) a message came from.
pub struct ChannelResponder {
    poster: Arc<dyn MessagePoster>,
    channel_id: String,
    thread_ts: Option<String>,
}

impl ChannelResponder {
    pub fn new(
        poster: Arc<dyn MessagePoster>,
        channel_id: impl Into<String>,
        thread_ts: Option<String>,
    ) -> Self {
        Self { poster, channel_id: channel_id.into(), thread_ts }
    }
}

#[async_trait]
impl Responder for ChannelResponder {
    async fn reply(&self, text: &str) -> Result<(), ApiError> {
        self.poster.post_message(&self.channel_id, text, self.thread_ts.as_deref()).await
    }
}

pub struct CommandMessageHandler {
    event_type: SlackEventType,
    router: Arc<CommandRouter>,
    poster: Arc<dyn MessagePoster>,
    events: CommandEventSink,
}

impl CommandMessageHandler {
    pub fn direct_messages(
        router: Arc<CommandRouter>,
        poster: Arc<dyn MessagePoster>,
        events: CommandEventSink,
    ) -> Self {
        Self { event_type: SlackEventType::Message, router, poster, events }
    }

    pub fn mentions(
        router: Arc<CommandRouter>,
        poster: Arc<dyn MessagePoster>,
        events: CommandEventSink,
    ) -> Self {
        Self { event_type: SlackEventType::AppMention, router, poster, events }
    }
}

#[async_trait]
impl EventHandler for CommandMessageHandler {
    fn event_type(&self) -> SlackEventType {
        self.event_type.clone()
    }

    async fn handle(
        &self,
        envelope: &SlackEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let message = match &envelope.event {
            SlackEvent::AppMention(message) => message,
            // channel messages that mention the bot also arrive as app_mention
            SlackEvent::Message(message) if message.is_direct_message() => message,
            _ => return Ok(HandlerResult::Ignored),
        };

        let text = crate::commands::strip_bot_mention(&message.text);
        let responder =
            ChannelResponder::new(self.poster.clone(), &message.channel_id, message.thread_ts.clone());
        let summary = EventSummary {
            envelope_id: ctx.correlation_id.clone(),
            event_type: self.event_type.label().to_owned(),
            channel_id: message.channel_id.clone(),
            user_id: message.user_id.clone(),
            text: message.text.clone(),
        };

        if self.router.is_help_request(text) {
            self.events.emit(CommandEvent {
                timestamp: Utc::now(),
                command: "help".to_owned(),
                parameters: Default::default(),
                event: summary,
            });
            responder.reply(&self.router.help_text()).await?;
            return Ok(HandlerResult::Responded { command: "help".to_owned() });
        }

        let Some(routed) = self.router.route(text) else {
            debug!(
                correlation_id = %ctx.correlation_id,
                channel_id = %message.channel_id,
                "message did not match any command"
            );
            return Ok(HandlerResult::Ignored);
        };

        let command = routed.definition.usage().to_owned();
        self.events.emit(CommandEvent {
            timestamp: Utc::now(),
            command: command.clone(),
            parameters: routed.request.params.clone(),
            event: summary,
        });

        routed.definition.invoke(&routed.request, &responder).await?;
        Ok(HandlerResult::Responded { command })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use agebot_core::{CalendarDate, FixedClock};
    use async_trait::async_trait;
    use serde_json::json;

    use super::{
        command_dispatcher, EventContext, EventDispatcher, HandlerResult, MessageEvent,
        SlackEnvelope, SlackEvent,
    };
    use crate::{
        api::{ApiError, MessagePoster},
        commands::age_router,
        observer::{command_event_channel, CommandEventSink},
    };

    #[derive(Default)]
    struct RecordingPoster {
        posts: Mutex<Vec<(String, String, Option<String>)>>,
    }

    #[async_trait]
    impl MessagePoster for RecordingPoster {
        async fn post_message(
            &self,
            channel: &str,
            text: &str,
            thread_ts: Option<&str>,
        ) -> Result<(), ApiError> {
            self.posts.lock().expect("lock").push((
                channel.to_owned(),
                text.to_owned(),
                thread_ts.map(str::to_owned),
            ));
            Ok(())
        }
    }

    struct FailingPoster;

    #[async_trait]
    impl MessagePoster for FailingPoster {
        async fn post_message(
            &self,
            _channel: &str,
            _text: &str,
            _thread_ts: Option<&str>,
        ) -> Result<(), ApiError> {
            Err(ApiError::Api("channel_not_found".to_owned()))
        }
    }

    fn dispatcher_with(poster: Arc<dyn MessagePoster>, events: CommandEventSink) -> EventDispatcher {
        let clock = Arc::new(FixedClock(CalendarDate::from_ymd(2024, 5, 15).expect("date")));
        command_dispatcher(Arc::new(age_router(clock).expect("router")), poster, events)
    }

    fn message(text: &str, channel_type: Option<&str>) -> MessageEvent {
        MessageEvent {
            channel_id: "D1".to_owned(),
            channel_type: channel_type.map(str::to_owned),
            user_id: "U1".to_owned(),
            text: text.to_owned(),
            thread_ts: None,
        }
    }

    fn envelope(event: SlackEvent) -> SlackEnvelope {
        SlackEnvelope { envelope_id: "env-1".to_owned(), event }
    }

    #[tokio::test]
    async fn direct_message_gets_age_reply() {
        let poster = Arc::new(RecordingPoster::default());
        let dispatcher = dispatcher_with(poster.clone(), CommandEventSink::disabled());

        let result = dispatcher
            .dispatch(
                &envelope(SlackEvent::Message(message("my dob is 1990-05-15", Some("im")))),
                &EventContext::default(),
            )
            .await
            .expect("dispatch");

        assert_eq!(result, HandlerResult::Responded { command: "my dob is <dob>".to_owned() });
        let posts = poster.posts.lock().expect("lock");
        assert_eq!(&*posts, &[("D1".to_owned(), "Your age is 34.".to_owned(), None)]);
    }

    #[tokio::test]
    async fn mention_is_stripped_and_reply_stays_in_thread() {
        let poster = Arc::new(RecordingPoster::default());
        let dispatcher = dispatcher_with(poster.clone(), CommandEventSink::disabled());
        let mut mention = message("<@UBOT> is 1990-05-17", Some("channel"));
        mention.channel_id = "C1".to_owned();
        mention.thread_ts = Some("1730000000.0001".to_owned());

        let result = dispatcher
            .dispatch(&envelope(SlackEvent::AppMention(mention)), &EventContext::default())
            .await
            .expect("dispatch");

        assert_eq!(result, HandlerResult::Responded { command: "<dob>".to_owned() });
        let posts = poster.posts.lock().expect("lock");
        assert_eq!(
            &*posts,
            &[(
                "C1".to_owned(),
                "Your age is 33.".to_owned(),
                Some("1730000000.0001".to_owned())
            )]
        );
    }

    #[tokio::test]
    async fn channel_messages_are_left_to_mentions() {
        let poster = Arc::new(RecordingPoster::default());
        let dispatcher = dispatcher_with(poster.clone(), CommandEventSink::disabled());

        let result = dispatcher
            .dispatch(
                &envelope(SlackEvent::Message(message("is 1990-05-15", Some("channel")))),
                &EventContext::default(),
            )
            .await
            .expect("dispatch");

        assert_eq!(result, HandlerResult::Ignored);
        assert!(poster.posts.lock().expect("lock").is_empty());
    }

    #[tokio::test]
    async fn help_lists_commands_and_emits_event() {
        let poster = Arc::new(RecordingPoster::default());
        let (sink, mut receiver) = command_event_channel(4);
        let dispatcher = dispatcher_with(poster.clone(), sink);

        let result = dispatcher
            .dispatch(
                &envelope(SlackEvent::Message(message("help", Some("im")))),
                &EventContext { correlation_id: "env-help".to_owned() },
            )
            .await
            .expect("dispatch");

        assert_eq!(result, HandlerResult::Responded { command: "help".to_owned() });
        let event = receiver.recv().await.expect("command event");
        assert_eq!(event.command, "help");
        assert_eq!(event.event.envelope_id, "env-help");
        assert!(poster.posts.lock().expect("lock")[0].1.starts_with("Available commands:"));
    }

    #[tokio::test]
    async fn command_event_carries_parameters() {
        let poster = Arc::new(RecordingPoster::default());
        let (sink, mut receiver) = command_event_channel(4);
        let dispatcher = dispatcher_with(poster, sink);

        dispatcher
            .dispatch(
                &envelope(SlackEvent::Message(message("only", Some("im")))),
                &EventContext { correlation_id: "env-9".to_owned() },
            )
            .await
            .expect("dispatch");

        let event = receiver.recv().await.expect("command event");
        assert_eq!(event.command, "<dob>");
        assert_eq!(event.parameters.get("dob").map(String::as_str), Some("only"));
        assert_eq!(event.event.event_type, "message");
        assert_eq!(event.event.user_id, "U1");
    }

    #[tokio::test]
    async fn empty_mention_is_ignored() {
        let poster = Arc::new(RecordingPoster::default());
        let dispatcher = dispatcher_with(poster.clone(), CommandEventSink::disabled());

        let result = dispatcher
            .dispatch(
                &envelope(SlackEvent::AppMention(message("<@UBOT>", Some("channel")))),
                &EventContext::default(),
            )
            .await
            .expect("dispatch");

        assert_eq!(result, HandlerResult::Ignored);
    }

    #[tokio::test]
    async fn reply_failure_surfaces_as_dispatch_error() {
        let dispatcher = dispatcher_with(Arc::new(FailingPoster), CommandEventSink::disabled());

        let result = dispatcher
            .dispatch(
                &envelope(SlackEvent::Message(message("is 1990-05-15", Some("im")))),
                &EventContext::default(),
            )
            .await;

        let error = result.expect_err("post failure");
        assert!(error.to_string().contains("channel_not_found"));
    }

    #[tokio::test]
    async fn unsupported_events_are_ignored() {
        let dispatcher =
            dispatcher_with(Arc::new(RecordingPoster::default()), CommandEventSink::disabled());
        assert_eq!(dispatcher.handler_count(), 2);

        let result = dispatcher
            .dispatch(
                &envelope(SlackEvent::Unsupported { event_type: "reaction_added".to_owned() }),
                &EventContext::default(),
            )
            .await
            .expect("dispatch");
        assert_eq!(result, HandlerResult::Ignored);
    }

    #[test]
    fn payload_parsing_filters_bot_and_subtype_messages() {
        let user_message = json!({
            "type": "message",
            "channel": "D1",
            "channel_type": "im",
            "user": "U1",
            "text": "is 1990-05-15",
            "ts": "1.0"
        });
        assert!(matches!(
            SlackEvent::from_payload(&user_message),
            SlackEvent::Message(ref event) if event.is_direct_message() && event.text == "is 1990-05-15"
        ));

        let bot_message = json!({
            "type": "message",
            "channel": "D1",
            "user": "U1",
            "bot_id": "B1",
            "text": "Your age is 34."
        });
        assert_eq!(
            SlackEvent::from_payload(&bot_message),
            SlackEvent::Unsupported { event_type: "message".to_owned() }
        );

        let edited = json!({"type": "message", "subtype": "message_changed", "channel": "D1"});
        assert_eq!(
            SlackEvent::from_payload(&edited),
            SlackEvent::Unsupported { event_type: "message".to_owned() }
        );

        let mention = json!({
            "type": "app_mention",
            "channel": "C1",
            "user": "U2",
            "text": "<@UBOT> help",
            "ts": "2.0",
            "thread_ts": "1.0"
        });
        assert!(matches!(
            SlackEvent::from_payload(&mention),
            SlackEvent::AppMention(ref event) if event.thread_ts.as_deref() == Some("1.0")
        ));

        let reaction = json!({"type": "reaction_added", "user": "U1", "reaction": "+1"});
        assert_eq!(
            SlackEvent::from_payload(&reaction),
            SlackEvent::Unsupported { event_type: "reaction_added".to_owned() }
        );
    }
}
