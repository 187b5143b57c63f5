use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("config parse error: {0}")]
    ParseError(String),

    #[error("config validation error: {0}")]
    ValidationError(String),
}

#[derive(Debug, thiserror::Error)]
pub enum CareError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("network error: {0}")]
    Network(String),

    #[error("media error: {0}")]
    Media(String),

    #[error("negotiation error: {0}")]
    Negotiation(String),

    #[error("backend error: {0}")]
    Backend(String),

    #[error("{0}")]
    Other(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display() {
        let err = ConfigError::FileNotFound(PathBuf::from("/tmp/missing.toml"));
        assert_eq!(err.to_string(), "config file not found: /tmp/missing.toml");

        let err = ConfigError::ParseError("unexpected token".into());
        assert_eq!(err.to_string(), "config parse error: unexpected token");

        let err = ConfigError::ValidationError("backend.base_url is empty".into());
        assert_eq!(
            err.to_string(),
            "config validation error: backend.base_url is empty"
        );
    }

    #[test]
    fn care_error_from_config() {
        let config_err = ConfigError::ParseError("bad toml".into());
        let err: CareError = config_err.into();
        assert!(matches!(err, CareError::Config(_)));
        assert!(err.to_string().contains("bad toml"));
    }

    #[test]
    fn care_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "image missing");
        let err: CareError = io_err.into();
        assert!(matches!(err, CareError::Io(_)));
        assert!(err.to_string().contains("image missing"));
    }

    #[test]
    fn care_error_other_variants() {
        let err = CareError::Network("connection refused".into());
        assert_eq!(err.to_string(), "network error: connection refused");

        let err = CareError::Media("camera denied".into());
        assert_eq!(err.to_string(), "media error: camera denied");

        let err = CareError::Negotiation("bad sdp".into());
        assert_eq!(err.to_string(), "negotiation error: bad sdp");

        let err = CareError::Backend("HTTP 500".into());
        assert_eq!(err.to_string(), "backend error: HTTP 500");

        let err = CareError::Other("something went wrong".into());
        assert_eq!(err.to_string(), "something went wrong");
    }
}
