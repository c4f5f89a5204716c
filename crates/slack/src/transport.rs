//! Socket Mode over a real websocket.
//!
//! `apps.connections.open` hands out a single-use `wss://` URL; each
//! [`SocketTransport::connect`] asks for a fresh one. Frames are JSON text:
//! `hello` on open, `disconnect` before Slack recycles the socket, and
//! envelopes (`events_api`, `slash_commands`, ...) that must be acked by id.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::json;
use tokio::{net::TcpStream, sync::Mutex};
use tokio_tungstenite::{tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use crate::{
    api::SlackApi,
    events::{SlackEnvelope, SlackEvent},
    socket::{SocketTransport, TransportError},
};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SocketFrame {
    Hello,
    Disconnect { reason: String },
    Envelope(SlackEnvelope),
    Other { frame_type: String },
}

#[derive(Debug, Deserialize)]
struct RawFrame {
    #[serde(rename = "type")]
    frame_type: String,
    envelope_id: Option<String>,
    reason: Option<String>,
    #[serde(default)]
    payload: serde_json::Value,
}

pub fn parse_socket_frame(text: &str) -> Result<SocketFrame, serde_json::Error> {
    let raw: RawFrame = serde_json::from_str(text)?;

    if raw.frame_type == "hello" {
        return Ok(SocketFrame::Hello);
    }
    if raw.frame_type == "disconnect" {
        let reason = raw.reason.unwrap_or_else(|| "unknown".to_owned());
        return Ok(SocketFrame::Disconnect { reason });
    }
    let Some(envelope_id) = raw.envelope_id else {
        return Ok(SocketFrame::Other { frame_type: raw.frame_type });
    };

    let event = match raw.payload.get("event") {
        Some(event) if raw.frame_type == "events_api" => SlackEvent::from_payload(event),
        _ => SlackEvent::Unsupported { event_type: raw.frame_type },
    };
    Ok(SocketFrame::Envelope(SlackEnvelope { envelope_id, event }))
}

pub struct SlackSocketTransport {
    api: SlackApi,
    stream: Mutex<Option<WsStream>>,
}

impl SlackSocketTransport {
    /// `api` must carry the app-level (`xapp-`) token.
    pub fn new(api: SlackApi) -> Self {
        Self { api, stream: Mutex::new(None) }
    }
}

#[async_trait]
impl SocketTransport for SlackSocketTransport {
    async fn connect(&self) -> Result<(), TransportError> {
        let url = self
            .api
            .open_socket_url()
            .await
            .map_err(|error| TransportError::Connect(error.to_string()))?;

        let (stream, _) = tokio_tungstenite::connect_async(url.as_str())
            .await
            .map_err(|error| TransportError::Connect(error.to_string()))?;

        info!("socket mode websocket opened");
        *self.stream.lock().await = Some(stream);
        Ok(())
    }

    async fn next_envelope(&self) -> Result<Option<SlackEnvelope>, TransportError> {
        let mut guard = self.stream.lock().await;
        let stream =
            guard.as_mut().ok_or_else(|| TransportError::Receive("not connected".to_owned()))?;

        loop {
            let message = match stream.next().await {
                Some(Ok(message)) => message,
                Some(Err(error)) => return Err(TransportError::Receive(error.to_string())),
                None => return Err(TransportError::Disconnected("socket closed".to_owned())),
            };

            let text = match message {
                Message::Text(text) => text,
                Message::Close(frame) => {
                    let reason = frame
                        .map(|frame| frame.reason.as_str().to_owned())
                        .filter(|reason| !reason.is_empty())
                        .unwrap_or_else(|| "socket closed".to_owned());
                    return Err(TransportError::Disconnected(reason));
                }
                _ => continue,
            };

            match parse_socket_frame(text.as_str()) {
                Ok(SocketFrame::Envelope(envelope)) => return Ok(Some(envelope)),
                Ok(SocketFrame::Disconnect { reason }) => {
                    return Err(TransportError::Disconnected(reason))
                }
                Ok(SocketFrame::Hello) => debug!("socket mode hello received"),
                Ok(SocketFrame::Other { frame_type }) => {
                    debug!(frame_type = %frame_type, "ignoring socket mode frame")
                }
                Err(error) => warn!(error = %error, "failed to parse socket mode frame"),
            }
        }
    }

    async fn acknowledge(&self, envelope_id: &str) -> Result<(), TransportError> {
        let mut guard = self.stream.lock().await;
        let stream = guard
            .as_mut()
            .ok_or_else(|| TransportError::Acknowledge("not connected".to_owned()))?;

        let ack = json!({ "envelope_id": envelope_id }).to_string();
        stream
            .send(Message::Text(ack.into()))
            .await
            .map_err(|error| TransportError::Acknowledge(error.to_string()))
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        let Some(mut stream) = self.stream.lock().await.take() else {
            return Ok(());
        };
        stream.close(None).await.map_err(|error| TransportError::Disconnect(error.to_string()))
    }
}
