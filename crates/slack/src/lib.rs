//! Slack Integration - Socket Mode bot interface
//!
//! This crate connects the age calculator to Slack:
//! - **Socket Mode** (`socket`, `transport`) - WebSocket connection to Slack (no public URL needed)
//! - **Commands** (`commands`) - `my dob is <dob>`, the `<dob>` catch-all and `help`
//! - **Events** (`events`) - Direct messages and `@mentions`
//! - **Web API** (`api`) - `apps.connections.open` and `chat.postMessage`
//! - **Observer** (`observer`) - Diagnostic stream of command invocations
//!
//! # Getting Started
//!
//! 1. Create a Slack app at https://api.slack.com/apps
//! 2. Enable Socket Mode and subscribe to `message.im` and `app_mention`
//! 3. Set env vars: `SLACK_APP_TOKEN`, `SLACK_BOT_TOKEN` (or the `AGEBOT_`-prefixed forms)
//!
//! # Architecture
//!
//! ```text
//! Slack Events → EventDispatcher → CommandRouter → age calculator (agebot-core)
//!                    ↓                   ↓
//!              CommandObserver    chat.postMessage ← reply
//! ```

pub mod api;
pub mod commands;
pub mod events;
pub mod observer;
pub mod socket;
pub mod transport;

pub use api::{ApiError, MessagePoster, SlackApi};
pub use commands::{age_router, CommandRouter};
pub use events::{command_dispatcher, EventDispatcher};
pub use observer::{command_event_channel, CommandEventSink, CommandObserver};
pub use socket::{ReconnectPolicy, SocketModeRunner, SocketTransport};
pub use transport::SlackSocketTransport;
