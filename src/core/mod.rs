//! Core module - Device state, app registry, calculator, and configuration

pub mod apps;
pub mod calculator;
pub mod config;
pub mod notifications;
pub mod state;
