//! Full configuration validation.
//!
//! Each section has its own check; this orchestrator runs them all and
//! collects the errors into a single `ConfigError`.

mod endpoints;
mod helpers;


use crate::schema::CareConfig;
use carelink_common::ConfigError;

/// Run all validations on a config, collecting all errors.
pub fn validate(config: &CareConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    endpoints::validate_backend(&mut errors, config);
    endpoints::validate_signaling(&mut errors, config);
    endpoints::validate_ice(&mut errors, config);
    endpoints::validate_voice(&mut errors, config);

    if config.logging.level.trim().is_empty() {
        errors.push("logging.level must not be empty".into());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors.join("; ")))
    }
}
