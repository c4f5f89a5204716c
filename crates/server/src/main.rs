mod bootstrap;
mod health;

use agebot_core::config::{load_dotenv, AppConfig, LoadOptions, LogFormat};
use anyhow::Result;
use tracing_subscriber::EnvFilter;

fn init_logging(config: &AppConfig) {
    // RUST_LOG wins over logging.level when set
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.as_str()));
    let builder = tracing_subscriber::fmt().with_target(false).with_env_filter(filter);

    match config.logging.format {
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Pretty => builder.pretty().init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

async fn run() -> Result<()> {
    let dotenv_path = load_dotenv(None)?;
    // Missing tokens fail here, before anything connects.
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    if let Some(path) = dotenv_path {
        tracing::info!(path = %path.display(), "loaded environment from dotenv file");
    }

    let app = bootstrap::bootstrap_with_config(config).await?;

    health::spawn(
        &app.config.server.bind_address,
        app.config.server.health_check_port,
        app.observer.clone(),
    )
    .await?;

    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        "agebot-server started"
    );

    tokio::select! {
        result = app.slack_runner.start() => {
            result?;
            tracing::info!(
                event_name = "system.server.runner_stopped",
                correlation_id = "shutdown",
                "slack runner stopped"
            );
        }
        signal = tokio::signal::ctrl_c() => signal?,
    }

    tracing::info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        commands_observed = app.observer.observed(),
        "agebot-server stopping"
    );

    // closes the command-event queue so the observer drains what is left
    drop(app.slack_runner);
    if let Err(error) = app.observer_handle.await {
        tracing::warn!(error = %error, "command observer task failed");
    }

    Ok(())
}
