//! Command dispatch - inbound text frame in, optional reply out
//!
//! Decoding is two-step: the frame must be a JSON object with a string `type`
//! before it is matched against [`ClientMessage`]. That separates garbage
//! (logged and dropped), unknown commands (handled per [`UnknownTypePolicy`]),
//! and known commands with bad fields (logged and dropped).

use phoneos_protocol::{ClientMessage, ServerMessage};
use serde_json::{Number, Value};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use crate::core::calculator;
use crate::core::config::UnknownTypePolicy;
use crate::core::state::{SettingsPatch, StateStore};

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),
    #[error("message is not a JSON object")]
    NotAnObject,
    #[error("message has no string \"type\" field")]
    MissingType,
    #[error("malformed \"{kind}\" message: {source}")]
    Malformed {
        kind: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A decoded inbound frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Command(ClientMessage),
    /// Well-formed message with an unrecognised `type`
    Unknown(String),
}

pub fn decode(text: &str) -> Result<Inbound, DecodeError> {
    let value: Value = serde_json::from_str(text).map_err(DecodeError::InvalidJson)?;
    let kind = match &value {
        Value::Object(map) => match map.get("type") {
            Some(Value::String(kind)) => kind.clone(),
            _ => return Err(DecodeError::MissingType),
        },
        _ => return Err(DecodeError::NotAnObject),
    };

    if !ClientMessage::is_known_type(&kind) {
        return Ok(Inbound::Unknown(kind));
    }

    serde_json::from_value(value)
        .map(Inbound::Command)
        .map_err(|source| DecodeError::Malformed { kind, source })
}

/// Maps client commands onto the state store
#[derive(Debug, Clone)]
pub struct Dispatcher {
    store: Arc<StateStore>,
    unknown_types: UnknownTypePolicy,
}

impl Dispatcher {
    pub fn new(store: Arc<StateStore>, unknown_types: UnknownTypePolicy) -> Self {
        Self { store, unknown_types }
    }

    pub fn store(&self) -> &Arc<StateStore> {
        &self.store
    }

    /// Handle one inbound text frame. `None` means no reply is owed.
    pub fn dispatch(&self, text: &str) -> Option<ServerMessage> {
        match decode(text) {
            Ok(Inbound::Command(command)) => Some(self.handle(command)),
            Ok(Inbound::Unknown(kind)) => match self.unknown_types {
                UnknownTypePolicy::Ignore => {
                    debug!("Ignoring unknown message type: {}", kind);
                    None
                }
                UnknownTypePolicy::Reply => {
                    Some(ServerMessage::error(format!("Unknown message type: {}", kind)))
                }
            },
            Err(e) => {
                warn!("Dropping inbound message: {}", e);
                None
            }
        }
    }

    /// Execute a decoded command. Every known command produces a reply.
    pub fn handle(&self, command: ClientMessage) -> ServerMessage {
        debug!("Handling {}", command.type_name());
        match command {
            ClientMessage::OpenApp { app_id } => match self.store.open_app(&app_id) {
                Ok(app_data) => ServerMessage::AppOpened { app: app_id, app_data },
                Err(e) => ServerMessage::error(e.to_string()),
            },
            ClientMessage::Home => {
                self.store.go_home();
                ServerMessage::AppClosed
            }
            ClientMessage::GetApps => ServerMessage::Apps {
                apps: self.store.list_apps(),
            },
            ClientMessage::SettingsChange { brightness, volume } => {
                self.store.update_settings(SettingsPatch { brightness, volume });
                ServerMessage::SettingsUpdated
            }
            ClientMessage::Calculator { expression } => match calculator::evaluate(&expression) {
                Ok(value) => match result_number(value) {
                    Some(result) => ServerMessage::CalculatorResult { result },
                    None => ServerMessage::error("Invalid expression: result is not a finite number"),
                },
                Err(e) => ServerMessage::error(format!("Invalid expression: {}", e)),
            },
        }
    }
}

/// Integral results go out as JSON integers, the rest as floats
fn result_number(value: f64) -> Option<Number> {
    const MAX_EXACT: f64 = 9_007_199_254_740_992.0;
    if value.fract() == 0.0 && value.abs() <= MAX_EXACT {
        Some(Number::from(value as i64))
    } else {
        Number::from_f64(value)
    }
}
