use thiserror::Error;

/// Top-level error type for the Momentum workspace.
///
/// Subsystem crates define their own error enums and wrap this one with
/// `#[from]`, so configuration and storage failures propagate with `?`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MomentumError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Shutdown in progress")]
    ShuttingDown,
}

impl From<toml::de::Error> for MomentumError {
    fn from(err: toml::de::Error) -> Self {
        MomentumError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for MomentumError {
    fn from(err: toml::ser::Error) -> Self {
        MomentumError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for MomentumError {
    fn from(err: serde_json::Error) -> Self {
        MomentumError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Momentum operations.
pub type Result<T> = std::result::Result<T, MomentumError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let cases: Vec<(MomentumError, &str)> = vec![
            (
                MomentumError::Config("bad key".to_string()),
                "Configuration error: bad key",
            ),
            (
                MomentumError::Storage("disk full".to_string()),
                "Storage error: disk full",
            ),
            (
                MomentumError::Serialization("invalid json".to_string()),
                "Serialization error: invalid json",
            ),
            (MomentumError::ShuttingDown, "Shutdown in progress"),
        ];

        for (error, expected) in cases {
            assert_eq!(error.to_string(), expected);
        }
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: MomentumError = io_err.into();
        assert!(matches!(err, MomentumError::Io(_)));
        assert!(err.to_string().starts_with("I/O error:"));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_error_from_toml_de() {
        let err: std::result::Result<toml::Value, _> = toml::from_str("invalid = [[[");
        let err: MomentumError = err.unwrap_err().into();
        assert!(matches!(err, MomentumError::Config(_)));
    }

    #[test]
    fn test_error_from_serde_json() {
        let err: std::result::Result<serde_json::Value, _> = serde_json::from_str("{ nope }");
        let err: MomentumError = err.unwrap_err().into();
        assert!(matches!(err, MomentumError::Serialization(_)));
    }

    #[test]
    fn test_result_type_with_question_mark() {
        fn inner() -> Result<String> {
            let io_result: std::result::Result<i32, std::io::Error> = Ok(42);
            let value = io_result?;
            Ok(value.to_string())
        }

        assert_eq!(inner().unwrap(), "42");
    }
}
