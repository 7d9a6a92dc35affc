use crate::domain::models::{AppError, LocationUpdate};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub const EVENT_CONNECT: &str = "connect";
pub const EVENT_DISCONNECT: &str = "disconnect";
pub const EVENT_CONNECT_ERROR: &str = "connect_error";
pub const EVENT_RECONNECTING: &str = "reconnecting";
pub const EVENT_LOCATION_UPDATE: &str = "location-update";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "kebab-case")]
pub enum TransportEvent {
    Connect,
    Disconnect,
    #[serde(rename = "connect_error")]
    ConnectError { message: String },
    Reconnecting(u32),
    LocationUpdate(LocationUpdate),
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("unknown transport event: {0}")]
    UnknownEvent(String),
    #[error("malformed payload for {event}: {source}")]
    MalformedPayload {
        event: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("reconnecting event without a valid attempt number: {0}")]
    InvalidAttempt(Value),
    #[error("transport subscription closed")]
    Closed,
}

impl From<TransportError> for AppError {
    fn from(error: TransportError) -> Self {
        let code = match error {
            TransportError::Closed => "TRANSPORT_CLOSED",
            _ => "TRANSPORT_EVENT_INVALID",
        };
        AppError::new(code, error.to_string(), None)
    }
}

impl TransportEvent {
    pub fn decode(name: &str, payload: Value) -> Result<Self, TransportError> {
        match name {
            EVENT_CONNECT => Ok(TransportEvent::Connect),
            EVENT_DISCONNECT => Ok(TransportEvent::Disconnect),
            EVENT_CONNECT_ERROR => {
                let message = match &payload {
                    Value::String(message) => message.clone(),
                    Value::Object(object) => object
                        .get("message")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                    _ => String::new(),
                };
                Ok(TransportEvent::ConnectError { message })
            }
            EVENT_RECONNECTING => payload
                .as_u64()
                .and_then(|attempt| u32::try_from(attempt).ok())
                .map(TransportEvent::Reconnecting)
                .ok_or(TransportError::InvalidAttempt(payload)),
            EVENT_LOCATION_UPDATE => serde_json::from_value(payload)
                .map(TransportEvent::LocationUpdate)
                .map_err(|source| TransportError::MalformedPayload {
                    event: name.to_string(),
                    source,
                }),
            other => Err(TransportError::UnknownEvent(other.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            TransportEvent::Connect => EVENT_CONNECT,
            TransportEvent::Disconnect => EVENT_DISCONNECT,
            TransportEvent::ConnectError { .. } => EVENT_CONNECT_ERROR,
            TransportEvent::Reconnecting(_) => EVENT_RECONNECTING,
            TransportEvent::LocationUpdate(_) => EVENT_LOCATION_UPDATE,
        }
    }
}
