//! Minimal Slack Web API client: Socket Mode URLs and outbound messages.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

pub const API_BASE: &str = "https://slack.com/api";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("slack http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("slack api returned error: {0}")]
    Api(String),
    #[error("slack api response missing `{0}`")]
    MissingField(&'static str),
}

#[derive(Debug, Deserialize)]
struct SlackResponse {
    ok: bool,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ConnectionsOpenResponse {
    ok: bool,
    error: Option<String>,
    url: Option<String>,
}

fn api_failure(error: Option<String>) -> ApiError {
    ApiError::Api(error.unwrap_or_else(|| "unknown error".to_owned()))
}

/// Outbound side of the bot: posts text into a channel or thread.
#[async_trait]
pub trait MessagePoster: Send + Sync {
    async fn post_message(
        &self,
        channel: &str,
        text: &str,
        thread_ts: Option<&str>,
    ) -> Result<(), ApiError>;
}

#[derive(Clone)]
pub struct SlackApi {
    client: Client,
    token: String,
    base_url: String,
}

impl SlackApi {
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_base_url(token, API_BASE)
    }

    pub fn with_base_url(token: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self { client: Client::new(), token: token.into(), base_url: base_url.into() }
    }

    /// Calls `apps.connections.open`; the token must be an app-level token.
    pub async fn open_socket_url(&self) -> Result<String, ApiError> {
        let response = self
            .client
            .post(format!("{}/apps.connections.open", self.base_url))
            .bearer_auth(&self.token)
            .send()
            .await?;

        let parsed: ConnectionsOpenResponse = response.json().await?;
        if !parsed.ok {
            return Err(api_failure(parsed.error));
        }
        parsed.url.ok_or(ApiError::MissingField("url"))
    }
}

impl std::fmt::Debug for SlackApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackApi").field("base_url", &self.base_url).finish_non_exhaustive()
    }
}

#[async_trait]
impl MessagePoster for SlackApi {
    async fn post_message(
        &self,
        channel: &str,
        text: &str,
        thread_ts: Option<&str>,
    ) -> Result<(), ApiError> {
        let mut body = json!({
            "channel": channel,
            "text": text,
        });
        if let Some(thread_ts) = thread_ts {
            body["thread_ts"] = serde_json::Value::String(thread_ts.to_owned());
        }

        let response = self
            .client
            .post(format!("{}/chat.postMessage", self.base_url))
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;

        let parsed: SlackResponse = response.json().await?;
        if parsed.ok {
            Ok(())
        } else {
            Err(api_failure(parsed.error))
        }
    }
}
