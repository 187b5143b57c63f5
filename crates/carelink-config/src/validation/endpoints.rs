//! Validation for backend, relay, ICE, and voice settings.

use crate::schema::{CareConfig, SUPPORTED_LANGUAGES};

use super::helpers::{validate_range, validate_scheme};

pub(crate) fn validate_backend(errors: &mut Vec<String>, config: &CareConfig) {
    validate_scheme(
        errors,
        "backend.base_url",
        &config.backend.base_url,
        &["http", "https"],
    );
    if config.backend.user_id.trim().is_empty() {
        errors.push("backend.user_id must not be empty".into());
    }
    validate_range(
        errors,
        "backend.timeout_secs",
        config.backend.timeout_secs,
        1,
        300,
    );
}

pub(crate) fn validate_signaling(errors: &mut Vec<String>, config: &CareConfig) {
    validate_scheme(
        errors,
        "signaling.url",
        &config.signaling.url,
        &["http", "https", "ws", "wss"],
    );
    validate_range(
        errors,
        "signaling.connect_timeout_secs",
        config.signaling.connect_timeout_secs,
        1,
        120,
    );
}

pub(crate) fn validate_ice(errors: &mut Vec<String>, config: &CareConfig) {
    for (i, server) in config.ice.stun_servers.iter().enumerate() {
        if !(server.starts_with("stun:") || server.starts_with("stuns:")) {
            errors.push(format!(
                "ice.stun_servers[{i}] = {server:?} must start with stun: or stuns:"
            ));
        }
    }
}

pub(crate) fn validate_voice(errors: &mut Vec<String>, config: &CareConfig) {
    if !SUPPORTED_LANGUAGES.contains(&config.voice.language.as_str()) {
        errors.push(format!(
            "voice.language = {:?} must be one of {}",
            config.voice.language,
            SUPPORTED_LANGUAGES.join(", ")
        ));
    }
    validate_scheme(
        errors,
        "voice.transcription_url",
        &config.voice.transcription_url,
        &["http", "https"],
    );
}
