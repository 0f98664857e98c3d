//! Web messenger guest protocol frames.
//!
//! Outbound frames are JSON objects keyed by `action`. Inbound frames carry a
//! `type`, a `class`, a numeric `code` and a class-specific `body`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::errors::SessionError;

/// Frame sent by the guest.
#[derive(Debug, Serialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum ClientFrame<'a> {
    /// Starts a guest session; the token identifies it on every later frame
    #[serde(rename_all = "camelCase")]
    ConfigureSession { deployment_id: &'a str, token: &'a str },
    /// Text typed by the guest
    OnMessage { token: &'a str, message: TextPayload<'a> },
}

/// `message` body of an `onMessage` frame.
#[derive(Debug, Serialize)]
pub struct TextPayload<'a> {
    /// Always `Text`
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub text: &'a str,
}

impl<'a> ClientFrame<'a> {
    pub const fn configure_session(deployment_id: &'a str, token: &'a str) -> Self {
        Self::ConfigureSession { deployment_id, token }
    }

    pub const fn text(token: &'a str, text: &'a str) -> Self {
        Self::OnMessage {
            token,
            message: TextPayload { kind: "Text", text },
        }
    }

    /// Serialize for a websocket text frame.
    pub fn to_json(&self) -> Result<String, SessionError> {
        serde_json::to_string(self).map_err(|err| SessionError::Protocol(err.to_string()))
    }
}

/// Which way a transcribed message travelled, from the deployment's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum Direction {
    /// Guest to deployment: our own message echoed back
    Inbound,
    /// Deployment to guest: a reply from the bot
    Outbound,
}

/// Inbound frame, reduced to what the harness acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerFrame {
    /// `SessionResponse` with code 200
    SessionReady,
    /// Failed `SessionResponse`, or any error-coded frame
    SessionRejected { code: u16, detail: String },
    /// Transcribed text in either direction
    Message { direction: Direction, text: String },
    /// Anything else: presence events, typing indicators, acknowledgements
    Ignored { class: String, code: u16 },
}

#[derive(Debug, Deserialize)]
struct RawFrame {
    #[serde(default)]
    class: String,
    #[serde(default)]
    code: u16,
    #[serde(default)]
    body: Value,
}

#[derive(Debug, Deserialize)]
struct StructuredBody {
    direction: Direction,
    #[serde(default)]
    text: Option<String>,
}

impl ServerFrame {
    /// Decode one websocket text frame.
    pub fn parse(raw: &str) -> Result<Self, SessionError> {
        let frame: RawFrame =
            serde_json::from_str(raw).map_err(|err| SessionError::Protocol(err.to_string()))?;

        let parsed = match frame.class.as_str() {
            "SessionResponse" if frame.code == 200 => Self::SessionReady,
            "SessionResponse" => Self::SessionRejected {
                code: frame.code,
                detail: frame.body.to_string(),
            },
            "StructuredMessage" => {
                let body: StructuredBody = serde_json::from_value(frame.body)
                    .map_err(|err| SessionError::Protocol(err.to_string()))?;
                match body.text {
                    Some(text) => Self::Message {
                        direction: body.direction,
                        text,
                    },
                    None => Self::Ignored {
                        class: frame.class,
                        code: frame.code,
                    },
                }
            }
            // Errors come back with a plain string body and an error code
            _ if frame.code >= 400 => Self::SessionRejected {
                code: frame.code,
                detail: frame.body.as_str().map_or_else(|| frame.body.to_string(), str::to_string),
            },
            _ => Self::Ignored {
                class: frame.class,
                code: frame.code,
            },
        };
        Ok(parsed)
    }
}
