//! Real-time socket frames (Phoenix channel protocol, `vsn=1.0.0`).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::AppError;

pub const EVENT_JOIN: &str = "phx_join";
pub const EVENT_REPLY: &str = "phx_reply";
pub const EVENT_HEARTBEAT: &str = "heartbeat";
pub const EVENT_INSERT: &str = "INSERT";
pub const ACTION_NEW_UPDATE: &str = "new_update";

/// Topic that carries socket-level heartbeats.
pub const PHOENIX_TOPIC: &str = "phoenix";

/// Reference id of the join frame.
pub const JOIN_REF: u64 = 1;

/// Outbound frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhoenixFrame {
    pub topic: String,
    pub event: String,
    pub payload: Value,
    #[serde(rename = "ref")]
    pub reference: u64,
}

impl PhoenixFrame {
    /// Join frame for `topic`, always sent with ref 1.
    pub fn join(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            event: EVENT_JOIN.to_string(),
            payload: Value::Object(Default::default()),
            reference: JOIN_REF,
        }
    }

    pub fn heartbeat(reference: u64) -> Self {
        Self {
            topic: PHOENIX_TOPIC.to_string(),
            event: EVENT_HEARTBEAT.to_string(),
            payload: Value::Object(Default::default()),
            reference,
        }
    }

    pub fn to_text(&self) -> Result<String, AppError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Any inbound frame. Only `event` and `payload` matter for dispatch.
///
/// `topic` and `event` stay untyped: a server frame carrying something other
/// than a string there is simply not one we act on.
#[derive(Debug, Clone, Deserialize)]
pub struct RealtimeMessage {
    #[serde(default)]
    pub topic: Value,
    #[serde(default)]
    pub event: Value,
    #[serde(default)]
    pub payload: Value,
}

/// Body of a `new_update` notification.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateNotification {
    pub version: String,
    pub release_notes: String,
}

/// Result of classifying an inbound text frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundFrame {
    /// `INSERT` with `payload.action == "new_update"`
    NewUpdate(UpdateNotification),
    /// Server reply to a join or heartbeat
    Reply {
        topic: Option<String>,
        status: Option<String>,
    },
    /// Anything else; ignored
    Other,
}

impl InboundFrame {
    /// Decode and classify a text frame.
    ///
    /// Malformed JSON is an error. A frame that announces a new update but lacks the
    /// `message.version` / `message.releaseNotes` fields is an error too; every
    /// other shape is [`InboundFrame::Other`].
    pub fn parse(text: &str) -> Result<Self, AppError> {
        let message: RealtimeMessage = serde_json::from_str(text)?;

        match message.event.as_str() {
            Some(EVENT_INSERT) => {
                let action = message.payload.get("action").and_then(Value::as_str);
                if action != Some(ACTION_NEW_UPDATE) {
                    return Ok(InboundFrame::Other);
                }
                let body = message.payload.get("message").cloned().ok_or_else(|| {
                    AppError::Decode("new_update notification without a message".to_string())
                })?;
                let notification: UpdateNotification = serde_json::from_value(body)?;
                Ok(InboundFrame::NewUpdate(notification))
            }
            Some(EVENT_REPLY) => Ok(InboundFrame::Reply {
                topic: message.topic.as_str().map(str::to_string),
                status: message
                    .payload
                    .get("status")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            }),
            _ => Ok(InboundFrame::Other),
        }
    }
}
