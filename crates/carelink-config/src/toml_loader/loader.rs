//! Read a config from an explicit path or the platform default.

use crate::schema::CareConfig;
use crate::validation;
use carelink_common::ConfigError;
use std::path::Path;
use tracing::{info, warn};

use super::paths::{create_default_config, default_config_path};

/// Load config from a specific TOML file path.
///
/// Missing fields take their serde defaults. Validation failures are
/// logged and the parsed config is still returned; callers that need a
/// hard failure run [`validation::validate`] themselves.
pub fn load_from_path(path: &Path) -> Result<CareConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ConfigError::FileNotFound(path.to_path_buf()),
        _ => ConfigError::ParseError(format!("failed to read {}: {e}", path.display())),
    })?;

    let config: CareConfig = toml::from_str(&content)
        .map_err(|e| ConfigError::ParseError(format!("failed to parse TOML: {e}")))?;

    if let Err(e) = validation::validate(&config) {
        warn!(error = %e, "config validation warning");
    }

    info!(path = %path.display(), "loaded config");
    Ok(config)
}

/// Load config from the platform-specific default path.
///
/// On Linux: `~/.config/carelink/config.toml`
/// On macOS: `~/Library/Application Support/carelink/config.toml`
///
/// If the file does not exist, writes the default template and returns defaults.
pub fn load_default() -> Result<CareConfig, ConfigError> {
    let path = default_config_path()?;

    if !path.exists() {
        info!(path = %path.display(), "no config found, creating default");
        create_default_config(&path)?;
        return Ok(CareConfig::default());
    }

    load_from_path(&path)
}
