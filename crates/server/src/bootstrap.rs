use std::sync::Arc;

use agebot_core::{
    config::{AppConfig, ConfigError, LoadOptions},
    SystemClock,
};
use agebot_slack::{
    age_router, command_dispatcher, command_event_channel,
    commands::CommandDefinitionError, CommandObserver, MessagePoster, ReconnectPolicy, SlackApi,
    SlackSocketTransport, SocketModeRunner,
};
use secrecy::ExposeSecret;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub slack_runner: SocketModeRunner,
    pub observer: CommandObserver,
    pub observer_handle: JoinHandle<()>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("command registration failed: {0}")]
    Commands(#[from] CommandDefinitionError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

/// Wires the Slack runner and command observer around an already-loaded config.
///
/// Spawns the observer task, so this must run inside a tokio runtime.
pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );
    config.validate()?;

    let (events, receiver) = command_event_channel(config.events.buffer);
    let observer = CommandObserver::new();
    let observer_handle = observer.spawn(receiver);

    let poster: Arc<dyn MessagePoster> =
        Arc::new(SlackApi::new(config.slack.bot_token.expose_secret()));
    let router = age_router(Arc::new(SystemClock))?;
    let dispatcher = command_dispatcher(Arc::new(router), poster, events);
    info!(
        event_name = "system.bootstrap.commands_registered",
        correlation_id = "bootstrap",
        handlers = dispatcher.handler_count(),
        "slack command handlers registered"
    );

    let transport =
        SlackSocketTransport::new(SlackApi::new(config.slack.app_token.expose_secret()));
    let slack_runner = SocketModeRunner::new(
        Arc::new(transport),
        dispatcher,
        ReconnectPolicy {
            max_retries: config.socket.max_retries,
            base_delay_ms: config.socket.base_delay_ms,
            max_delay_ms: config.socket.max_delay_ms,
        },
    );

    Ok(Application { config, slack_runner, observer, observer_handle })
}
