//! Configuration management for `sshterm`
//!
//! This module provides the `ConfigManager` for loading and saving
//! configuration files in TOML format.

mod manager;
pub mod settings;

pub use manager::ConfigManager;
pub use settings::{
    AppSettings, ConnectionSettings, LoggingSettings, TerminalSettings, TranscriptSettings,
};
