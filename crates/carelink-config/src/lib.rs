//! CareLink configuration system.
//!
//! TOML-based configuration for the backend endpoints, the signaling relay,
//! ICE servers, voice input, and logging. Every section uses serde defaults
//! that reproduce the local development setup, so partial configs (or no
//! config at all) work out of the box.
//!
//! ```rust,no_run
//! use carelink_config::load_config;
//!
//! let config = load_config().expect("failed to load config");
//! println!("{}", config.backend.chat_url());
//! ```

pub mod schema;
pub mod toml_loader;
pub mod validation;

pub use schema::{
    BackendConfig, CareConfig, IceConfig, LoggingConfig, SignalingConfig, VoiceConfig,
    CONFIG_SCHEMA_VERSION, SUPPORTED_LANGUAGES,
};
pub use toml_loader::{load_default, load_from_path};

use carelink_common::ConfigError;

/// Load config from the platform default path and validate it.
///
/// Creates a documented default `config.toml` if none exists.
pub fn load_config() -> Result<CareConfig, ConfigError> {
    let config = toml_loader::load_default()?;
    validation::validate(&config)?;
    Ok(config)
}

/// Placeholder printed in place of the transcription API key.
pub const REDACTED: &str = "[REDACTED]";

/// Serialize a config to pretty-printed JSON for display.
///
/// The transcription API key is replaced by [`REDACTED`].
pub fn config_to_json(config: &CareConfig) -> String {
    let mut shown = config.clone();
    if shown.voice.transcription_api_key.is_some() {
        shown.voice.transcription_api_key = Some(REDACTED.to_string());
    }
    serde_json::to_string_pretty(&shown)
        .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize config: {e}\"}}"))
}
