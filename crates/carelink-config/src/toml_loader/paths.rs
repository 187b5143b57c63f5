//! Where `config.toml` lives, and first-run creation of it.

use std::io::Write;
use std::path::{Path, PathBuf};

use carelink_common::ConfigError;
use tracing::info;

use super::template::default_config_toml;

const APP_DIR: &str = "carelink";
const FILE_NAME: &str = "config.toml";

/// `config_dir()/carelink/config.toml` for the current platform.
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|base| config_path_in(&base))
        .ok_or_else(|| ConfigError::ParseError("could not determine config directory".into()))
}

fn config_path_in(base: &Path) -> PathBuf {
    base.join(APP_DIR).join(FILE_NAME)
}

fn io_error(action: &str, path: &Path, e: std::io::Error) -> ConfigError {
    ConfigError::ParseError(format!("failed to {action} {}: {e}", path.display()))
}

/// Write the documented template to `path`.
///
/// Never clobbers: an existing file is left alone and reported as an error.
pub fn create_default_config(path: &Path) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|e| io_error("create config directory", dir, e))?;
    }
    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|e| io_error("create", path, e))?;
    file.write_all(default_config_toml().as_bytes())
        .map_err(|e| io_error("write default config to", path, e))?;

    info!(path = %path.display(), "created default config");
    Ok(())
}
