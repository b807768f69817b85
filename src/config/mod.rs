//! Configuration for derivo.
//!
//! Handles the settings file, environment variable expansion and resolution
//! limits.

mod settings;

pub use settings::{expand_env_vars, Limits, SchemaSettings, Settings, SettingsError};
