use std::env;
use std::fs;
use std::path::Path;

use agebot_core::config::{default_config_path, load_dotenv, AppConfig, LoadOptions};
use secrecy::ExposeSecret;
use toml::Value;

use super::{redact_token, CommandResult};

pub fn run() -> CommandResult {
    if let Err(error) = load_dotenv(None) {
        return CommandResult::failure("config", "dotenv", error.to_string(), 2);
    }
    render(LoadOptions::default())
}

/// Renders the effective config for `options`, one line per key with the
/// layer it came from. Tokens are reduced to their prefix.
pub fn render(options: LoadOptions) -> CommandResult {
    let config_file_path = match &options.config_path {
        Some(path) => path.exists().then(|| path.clone()),
        None => default_config_path(),
    };

    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "config",
                "config_validation",
                format!("config validation failed: {error}"),
                2,
            )
        }
    };

    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let fields: [(&str, String, &[&str]); 10] = [
        (
            "slack.app_token",
            redact_token(config.slack.app_token.expose_secret()),
            &["AGEBOT_SLACK_APP_TOKEN", "SLACK_APP_TOKEN"],
        ),
        (
            "slack.bot_token",
            redact_token(config.slack.bot_token.expose_secret()),
            &["AGEBOT_SLACK_BOT_TOKEN", "SLACK_BOT_TOKEN"],
        ),
        (
            "socket.max_retries",
            config.socket.max_retries.to_string(),
            &["AGEBOT_SOCKET_MAX_RETRIES"],
        ),
        (
            "socket.base_delay_ms",
            config.socket.base_delay_ms.to_string(),
            &["AGEBOT_SOCKET_BASE_DELAY_MS"],
        ),
        (
            "socket.max_delay_ms",
            config.socket.max_delay_ms.to_string(),
            &["AGEBOT_SOCKET_MAX_DELAY_MS"],
        ),
        ("events.buffer", config.events.buffer.to_string(), &["AGEBOT_EVENTS_BUFFER"]),
        (
            "server.bind_address",
            config.server.bind_address.clone(),
            &["AGEBOT_SERVER_BIND_ADDRESS"],
        ),
        (
            "server.health_check_port",
            config.server.health_check_port.to_string(),
            &["AGEBOT_SERVER_HEALTH_CHECK_PORT"],
        ),
        (
            "logging.level",
            config.logging.level.clone(),
            &["AGEBOT_LOGGING_LEVEL", "AGEBOT_LOG_LEVEL"],
        ),
        (
            "logging.format",
            format!("{:?}", config.logging.format),
            &["AGEBOT_LOGGING_FORMAT", "AGEBOT_LOG_FORMAT"],
        ),
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for (key, value, env_keys) in fields {
        let source =
            field_source(key, env_keys, config_file_doc.as_ref(), config_file_path.as_deref());
        lines.push(format!("- {key} = {value} (source: {source})"));
    }

    CommandResult::text(lines.join("\n"))
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let raw = fs::read_to_string(path?).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    // blank values are ignored by the loader, so they are not a source either
    let env_key = env_keys
        .iter()
        .find(|key| env::var(key).is_ok_and(|value| !value.trim().is_empty()));
    if let Some(env_key) = env_key {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    key_path.split('.').try_fold(root, |current, key| current.get(key)).is_some()
}
