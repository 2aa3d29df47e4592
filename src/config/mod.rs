//! Configuration module for the channel ops CLI.
//!
//! Handles loading and validation of process-wide settings: Telegram API
//! credentials, the target channel, and optional integrations.

mod settings;

pub use settings::{ConfigError, Settings};
