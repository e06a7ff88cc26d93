//! Live transport: a pair of channels in front of the WebSocket.
//!
//! [`LiveConnector::connect`] sends the setup message and hands back a
//! [`LiveConnection`]. The session writes [`ClientMessage`]s to `outbound` and
//! reads [`TransportEvent`]s from `inbound`; a background pump owns the
//! socket. Dropping `outbound` closes the socket.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use crate::config::LiveConfig;
use crate::error::{AssistantError, Result};

use super::protocol::{ClientMessage, ServerMessage, Setup};

/// Keepalive ping interval.
const PING_INTERVAL: Duration = Duration::from_secs(30);

/// What the pump reports upward.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Message(ServerMessage),
    /// The server closed the channel.
    Closed { reason: Option<String> },
    /// Read or write failure; the channel is gone.
    Error(String),
}

/// An open live channel.
#[derive(Debug)]
pub struct LiveConnection {
    pub outbound: mpsc::UnboundedSender<ClientMessage>,
    pub inbound: mpsc::UnboundedReceiver<TransportEvent>,
}

/// Opens live channels.
#[async_trait]
pub trait LiveConnector: Send + Sync {
    /// Connect and send `setup` as the first message.
    async fn connect(&self, setup: Setup) -> Result<LiveConnection>;
}

/// Connector for the Gemini `BidiGenerateContent` WebSocket.
#[derive(Debug, Clone)]
pub struct WsLiveConnector {
    ws_url: String,
    api_key: String,
}

impl WsLiveConnector {
    pub fn new(ws_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            ws_url: ws_url.into(),
            api_key: api_key.into(),
        }
    }

    /// # Errors
    ///
    /// Returns [`AssistantError::AuthError`] when the key variable is unset.
    pub fn from_config(config: &LiveConfig) -> Result<Self> {
        Ok(Self::new(config.ws_url.clone(), config.api_key()?))
    }

    /// Endpoint with the key as a query parameter.
    pub fn endpoint(&self) -> Result<url::Url> {
        let mut url = url::Url::parse(&self.ws_url)
            .map_err(|e| AssistantError::ConfigError(format!("invalid live ws_url: {e}")))?;
        url.query_pairs_mut().append_pair("key", &self.api_key);
        Ok(url)
    }
}

#[async_trait]
impl LiveConnector for WsLiveConnector {
    async fn connect(&self, setup: Setup) -> Result<LiveConnection> {
        let url = self.endpoint()?;
        let (mut ws, _) = connect_async(url.as_str())
            .await
            .map_err(|e| AssistantError::SessionError(format!("connect: {e}")))?;

        let json = serde_json::to_string(&ClientMessage::Setup(setup))
            .map_err(|e| AssistantError::SessionError(format!("encode setup: {e}")))?;
        ws.send(Message::Text(json))
            .await
            .map_err(|e| AssistantError::SessionError(format!("send setup: {e}")))?;

        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound) = mpsc::unbounded_channel();
        tokio::spawn(pump(ws, outbound_rx, inbound_tx));
        tracing::info!(host = url.host_str().unwrap_or_default(), "live socket open");

        Ok(LiveConnection { outbound, inbound })
    }
}

/// Parse a text or binary frame. Unparseable frames yield `None`.
pub fn parse_server_frame(bytes: &[u8]) -> Option<ServerMessage> {
    match serde_json::from_slice(bytes) {
        Ok(msg) => Some(msg),
        Err(e) => {
            tracing::debug!("ignoring unparseable server frame: {e}");
            None
        }
    }
}

async fn pump(
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
    mut outbound: mpsc::UnboundedReceiver<ClientMessage>,
    inbound: mpsc::UnboundedSender<TransportEvent>,
) {
    let (mut write, mut read) = ws.split();
    let mut ping_interval = tokio::time::interval(PING_INTERVAL);
    ping_interval.tick().await;

    loop {
        tokio::select! {
            frame = read.next() => {
                let event = match frame {
                    Some(Ok(Message::Text(text))) => parse_server_frame(text.as_bytes()).map(TransportEvent::Message),
                    Some(Ok(Message::Binary(bytes))) => parse_server_frame(&bytes).map(TransportEvent::Message),
                    Some(Ok(Message::Close(frame))) => {
                        let reason = frame.map(|f| f.reason.into_owned()).filter(|r| !r.is_empty());
                        let _ = inbound.send(TransportEvent::Closed { reason });
                        return;
                    }
                    None => {
                        let _ = inbound.send(TransportEvent::Closed { reason: None });
                        return;
                    }
                    Some(Err(e)) => {
                        let _ = inbound.send(TransportEvent::Error(format!("read error: {e}")));
                        return;
                    }
                    // Ping/pong handled by tungstenite.
                    Some(Ok(_)) => None,
                };
                if let Some(event) = event
                    && inbound.send(event).is_err()
                {
                    let _ = write.close().await;
                    return;
                }
            }
            msg = outbound.recv() => {
                let Some(msg) = msg else {
                    tracing::debug!("live session dropped its sender; closing socket");
                    let _ = write.close().await;
                    return;
                };
                let json = match serde_json::to_string(&msg) {
                    Ok(json) => json,
                    Err(e) => {
                        tracing::warn!("dropping unencodable client message: {e}");
                        continue;
                    }
                };
                if let Err(e) = write.send(Message::Text(json)).await {
                    let _ = inbound.send(TransportEvent::Error(format!("send error: {e}")));
                    return;
                }
            }
            _ = ping_interval.tick() => {
                if let Err(e) = write.send(Message::Ping(Vec::new())).await {
                    let _ = inbound.send(TransportEvent::Error(format!("ping error: {e}")));
                    return;
                }
            }
        }
    }
}
