//! Guest session over the web messenger WebSocket API.

use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::protocol::{ClientFrame, Direction, ServerFrame};
use crate::domain::errors::{ConfigError, SessionError};
use crate::domain::models::config::SessionConfig;
use crate::domain::ports::{MessagingSession, TranscriptEvent, TranscriptSubscription};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

const EVENT_BUFFER: usize = 256;
const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Where and how to connect.
#[derive(Debug, Clone)]
pub struct MessengerSettings {
    /// WebSocket URL, including the `deploymentId` query
    pub endpoint: String,
    /// Sent again in the `configureSession` frame
    pub deployment_id: String,
    /// `Origin` header for deployments with an allowed-domains list
    pub origin: Option<String>,
    /// Bound on waiting for the `SessionResponse`
    pub handshake_timeout: Duration,
}

impl MessengerSettings {
    /// Settings for `wss://webmessaging.{region}/v1`.
    ///
    /// # Errors
    /// Returns `MissingRequired` when the deployment or region is not configured.
    pub fn from_config(config: &SessionConfig) -> Result<Self, ConfigError> {
        let present = |value: &Option<String>| value.clone().filter(|v| !v.trim().is_empty());

        match (present(&config.deployment_id), present(&config.region)) {
            (Some(deployment_id), Some(region)) => Ok(Self {
                endpoint: format!("wss://webmessaging.{region}/v1?deploymentId={deployment_id}"),
                deployment_id,
                origin: config.origin.clone(),
                handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            }),
            (deployment_id, region) => Err(ConfigError::MissingRequired(
                [
                    deployment_id.is_none().then_some("session.deployment_id"),
                    region.is_none().then_some("session.region"),
                ]
                .into_iter()
                .flatten()
                .collect(),
            )),
        }
    }
}

/// One anonymous guest conversation with a web messenger deployment.
///
/// A background reader task turns `StructuredMessage` frames into
/// [`TranscriptEvent`]s on a broadcast channel; `send` writes through the
/// shared sink half of the socket.
pub struct WebMessengerSession {
    settings: MessengerSettings,
    token: String,
    events: broadcast::Sender<TranscriptEvent>,
    writer: Mutex<Option<SplitSink<WsStream, WsMessage>>>,
    reader: Mutex<Option<JoinHandle<()>>>,
}

impl WebMessengerSession {
    /// Unconnected session with a fresh guest token.
    pub fn new(settings: MessengerSettings) -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            settings,
            token: Uuid::new_v4().to_string(),
            events,
            writer: Mutex::new(None),
            reader: Mutex::new(None),
        }
    }

    async fn connect(&self) -> Result<WsStream, SessionError> {
        let mut request = self
            .settings
            .endpoint
            .as_str()
            .into_client_request()
            .map_err(|err| SessionError::Connect(err.to_string()))?;

        if let Some(origin) = &self.settings.origin {
            let value = HeaderValue::from_str(origin)
                .map_err(|err| SessionError::Connect(format!("invalid origin: {err}")))?;
            request.headers_mut().insert("Origin", value);
        }

        let (stream, response) = connect_async(request)
            .await
            .map_err(|err| SessionError::Connect(err.to_string()))?;
        debug!(status = %response.status(), "websocket connected");
        Ok(stream)
    }
}

/// Read frames until the session is confirmed or refused.
async fn await_session(stream: &mut SplitStream<WsStream>) -> Result<(), SessionError> {
    while let Some(frame) = stream.next().await {
        let frame = frame.map_err(|err| SessionError::Handshake(err.to_string()))?;
        let WsMessage::Text(raw) = frame else {
            continue;
        };
        match ServerFrame::parse(&raw)? {
            ServerFrame::SessionReady => return Ok(()),
            ServerFrame::SessionRejected { code, detail } => {
                return Err(SessionError::Handshake(format!("{detail} ({code})")));
            }
            other => debug!(?other, "frame ignored during handshake"),
        }
    }
    Err(SessionError::Handshake(
        "connection closed before the session was configured".to_string(),
    ))
}

/// Forward transcribed messages until the socket closes.
async fn pump_events(mut stream: SplitStream<WsStream>, events: broadcast::Sender<TranscriptEvent>) {
    while let Some(frame) = stream.next().await {
        let raw = match frame {
            Ok(WsMessage::Text(raw)) => raw,
            Ok(WsMessage::Close(close)) => {
                debug!(?close, "server closed the session");
                break;
            }
            Ok(_) => continue,
            Err(err) => {
                warn!(error = %err, "websocket read failed");
                break;
            }
        };

        match ServerFrame::parse(&raw) {
            Ok(ServerFrame::Message { direction, text }) => {
                let event = match direction {
                    Direction::Outbound => TranscriptEvent::counterpart(text),
                    Direction::Inbound => TranscriptEvent::harness(text),
                };
                // No subscribers is fine
                let _ = events.send(event);
            }
            Ok(ServerFrame::SessionRejected { code, detail }) => {
                warn!(code, %detail, "error frame from messenger");
            }
            Ok(other) => debug!(?other, "frame ignored"),
            Err(err) => warn!(error = %err, "unparseable frame"),
        }
    }
}

#[async_trait]
impl MessagingSession for WebMessengerSession {
    #[instrument(skip(self), fields(deployment_id = %self.settings.deployment_id))]
    async fn open(&self) -> Result<(), SessionError> {
        let mut writer = self.writer.lock().await;
        if writer.is_some() {
            return Ok(());
        }

        let (mut sink, mut stream) = self.connect().await?.split();

        let configure = ClientFrame::configure_session(&self.settings.deployment_id, &self.token);
        sink.send(WsMessage::Text(configure.to_json()?))
            .await
            .map_err(|err| SessionError::Handshake(err.to_string()))?;

        tokio::time::timeout(self.settings.handshake_timeout, await_session(&mut stream))
            .await
            .map_err(|_| {
                SessionError::Handshake(format!(
                    "no session response within {}s",
                    self.settings.handshake_timeout.as_secs()
                ))
            })??;

        let handle = tokio::spawn(pump_events(stream, self.events.clone()));
        *self.reader.lock().await = Some(handle);
        *writer = Some(sink);

        info!("guest session configured");
        Ok(())
    }

    async fn send(&self, text: &str) -> Result<(), SessionError> {
        let mut writer = self.writer.lock().await;
        let sink = writer.as_mut().ok_or(SessionError::Closed)?;

        let frame = ClientFrame::text(&self.token, text).to_json()?;
        sink.send(WsMessage::Text(frame))
            .await
            .map_err(|err| SessionError::Send(err.to_string()))
    }

    fn subscribe(&self) -> TranscriptSubscription {
        self.events.subscribe()
    }

    async fn close(&self) -> Result<(), SessionError> {
        if let Some(handle) = self.reader.lock().await.take() {
            handle.abort();
        }

        let Some(mut sink) = self.writer.lock().await.take() else {
            return Ok(());
        };
        if let Err(err) = sink.close().await {
            debug!(error = %err, "websocket close handshake failed");
        }
        info!("guest session closed");
        Ok(())
    }
}
