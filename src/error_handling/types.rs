use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    Toml(String),
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

/// Failures reported by a storage backend.
///
/// `NotFound` is the only variant callers are expected to branch on; the
/// others are terminal for the request that hit them.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("Key not found: {0}")]
    NotFound(String),
    #[error("Invalid storage key: {0}")]
    InvalidKey(String),
    #[error("Storage connection failed: {0}")]
    ConnectionFailed(String),
    #[error("Storage read failed: {0}")]
    ReadFailed(String),
    #[error("Storage write failed: {0}")]
    WriteFailed(String),
}

/// Errors raised while decoding, resolving or persisting an annotation session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A `labels`/`tracks`/`shapes` key did not parse as a non-negative integer.
    #[error("Malformed map key: {key:?}")]
    MalformedKey { key: String },
    /// The document is not structurally valid JSON for the expected shape.
    #[error("Decode error: {0}")]
    Decode(String),
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(#[from] StorageError),
    #[error("Can't save a demo project")]
    DemoModeSaveRejected,
}

impl From<serde_json::Error> for SessionError {
    fn from(err: serde_json::Error) -> Self {
        SessionError::Decode(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum WebError {
    #[error("Failed to bind web server: {0}")]
    Bind(String),
}

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Web error: {0}")]
    Web(#[from] WebError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_errors_become_storage_unavailable() {
        let err: SessionError = StorageError::ReadFailed("disk".into()).into();
        assert!(matches!(
            err,
            SessionError::StorageUnavailable(StorageError::ReadFailed(_))
        ));
    }

    #[test]
    fn json_errors_become_decode_errors() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: SessionError = json_err.into();
        assert!(matches!(err, SessionError::Decode(_)));
    }

    #[test]
    fn malformed_key_names_the_key() {
        let err = SessionError::MalformedKey { key: "abc".into() };
        assert_eq!(err.to_string(), "Malformed map key: \"abc\"");
    }
}
