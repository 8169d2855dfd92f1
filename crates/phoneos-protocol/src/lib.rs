//! Shared types and wire format for the Phone OS server ↔ client connection.
//!
//! This crate is intentionally lightweight (only `serde` + `serde_json`).
//! Every frame is a JSON text message whose `type` field selects the variant:
//! - Client → Server: [`ClientMessage`]
//! - Server → Client: [`ServerMessage`]

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Default server listen address
pub const DEFAULT_SERVER_ADDR: &str = "127.0.0.1:8765";

// ── Client → Server ────────────────────────────────────────────────

/// Commands sent by a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Switch the foreground app
    OpenApp { app_id: String },
    /// Return to the home screen
    Home,
    /// Request the app registry
    GetApps,
    /// Partial settings update; absent fields are left unchanged
    SettingsChange {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        brightness: Option<i64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        volume: Option<i64>,
    },
    /// Evaluate an arithmetic expression
    Calculator {
        #[serde(default = "default_expression")]
        expression: String,
    },
}

fn default_expression() -> String {
    "0".to_string()
}

impl ClientMessage {
    /// Every `type` tag the server understands.
    pub const TYPES: &'static [&'static str] =
        &["open_app", "home", "get_apps", "settings_change", "calculator"];

    pub fn is_known_type(tag: &str) -> bool {
        Self::TYPES.contains(&tag)
    }

    /// The wire tag of this command.
    pub fn type_name(&self) -> &'static str {
        match self {
            ClientMessage::OpenApp { .. } => "open_app",
            ClientMessage::Home => "home",
            ClientMessage::GetApps => "get_apps",
            ClientMessage::SettingsChange { .. } => "settings_change",
            ClientMessage::Calculator { .. } => "calculator",
        }
    }
}

// ── Server → Client ────────────────────────────────────────────────

/// Device status bar contents, pushed on connect and periodically
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusView {
    /// Wall clock, "HH:MM"
    pub time: String,
    /// "<Weekday>, <Month> <DD>"
    pub date: String,
    pub battery: u8,
    /// Wi-Fi strength in bars (0-4)
    pub wifi: u8,
    pub current_app: String,
    /// Number of notifications delivered so far
    pub notifications: u64,
    pub brightness: i64,
    pub volume: i64,
}

/// Display metadata for one app
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppInfo {
    pub name: String,
    pub icon: String,
}

/// Ordered `id -> AppInfo` mapping, serialized as a JSON object.
///
/// Keeps registry order on the wire so clients can lay out the home screen
/// the same way every time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppList(pub Vec<(String, AppInfo)>);

impl AppList {
    pub fn get(&self, id: &str) -> Option<&AppInfo> {
        self.0.iter().find(|(key, _)| key == id).map(|(_, info)| info)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(id, _)| id.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for AppList {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (id, info) in &self.0 {
            map.serialize_entry(id, info)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for AppList {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct AppListVisitor;

        impl<'de> Visitor<'de> for AppListVisitor {
            type Value = AppList;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of app id to app info")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<AppList, A::Error> {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((id, info)) = access.next_entry::<String, AppInfo>()? {
                    entries.push((id, info));
                }
                Ok(AppList(entries))
            }
        }

        deserializer.deserialize_map(AppListVisitor)
    }
}

/// App-specific payload returned with `app_opened`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AppData {
    Calculator {
        display: String,
        operation: Option<String>,
    },
    Weather {
        temperature: String,
        condition: String,
        humidity: String,
        wind: String,
    },
    Settings {
        brightness: i64,
        volume: i64,
        /// Whether Wi-Fi has any signal
        wifi: bool,
    },
    /// Apps without extra state; serializes as `{}`
    Empty {},
}

/// Messages sent by the server, either as replies or unsolicited pushes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Status(StatusView),
    Apps {
        apps: AppList,
    },
    AppOpened {
        app: String,
        app_data: AppData,
    },
    AppClosed,
    SettingsUpdated,
    CalculatorResult {
        result: serde_json::Number,
    },
    Notification {
        title: String,
        message: String,
    },
    Error {
        message: String,
    },
}

impl ServerMessage {
    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
        }
    }

    /// The wire tag of this message.
    pub fn type_name(&self) -> &'static str {
        match self {
            ServerMessage::Status(_) => "status",
            ServerMessage::Apps { .. } => "apps",
            ServerMessage::AppOpened { .. } => "app_opened",
            ServerMessage::AppClosed => "app_closed",
            ServerMessage::SettingsUpdated => "settings_updated",
            ServerMessage::CalculatorResult { .. } => "calculator_result",
            ServerMessage::Notification { .. } => "notification",
            ServerMessage::Error { .. } => "error",
        }
    }
}
