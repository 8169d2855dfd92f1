//! Phone OS Server
//!
//! A simulated phone operating system exposed over WebSocket.
//!
//! # Features
//! - One shared device state (current app, battery, Wi-Fi, brightness, volume, notifications)
//! - Status snapshot and app list pushed on connect, status re-pushed periodically
//! - Synthetic notifications at random intervals
//! - Commands: open app, go home, list apps, change settings, calculator
//! - Calculator restricted to `+ - * / ( )` over numeric literals

pub mod core;
pub mod dispatch;
pub mod server;
pub mod session;
pub mod ws;

pub use crate::core::config::{ServerConfig, UnknownTypePolicy};
pub use crate::core::state::{SettingsPatch, StateStore, StoreError};
pub use dispatch::Dispatcher;
pub use server::ServerState;
pub use session::{Session, SessionConfig};
