use thiserror::Error;

/// Top-level error type for CuraScribe.
///
/// Subsystem crates define their own error types and implement
/// `From<SubsystemError> for CuraScribeError` so that `?` works across
/// crate boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CuraScribeError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Dictation error: {0}")]
    Dictation(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for CuraScribeError {
    fn from(err: toml::de::Error) -> Self {
        CuraScribeError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for CuraScribeError {
    fn from(err: toml::ser::Error) -> Self {
        CuraScribeError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for CuraScribeError {
    fn from(err: serde_json::Error) -> Self {
        CuraScribeError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for CuraScribe operations.
pub type Result<T> = std::result::Result<T, CuraScribeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let cases: Vec<(CuraScribeError, &str)> = vec![
            (
                CuraScribeError::Config("missing field".to_string()),
                "Configuration error: missing field",
            ),
            (
                CuraScribeError::Dictation("no field".to_string()),
                "Dictation error: no field",
            ),
            (
                CuraScribeError::Serialization("invalid json".to_string()),
                "Serialization error: invalid json",
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.to_string(), expected);
        }
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: CuraScribeError = io_err.into();
        assert!(matches!(err, CuraScribeError::Io(_)));
        assert!(err.to_string().starts_with("I/O error:"));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_error_from_toml_de() {
        let err: std::result::Result<toml::Value, _> = toml::from_str("invalid = [[[");
        let err: CuraScribeError = err.unwrap_err().into();
        assert!(matches!(err, CuraScribeError::Config(_)));
    }

    #[test]
    fn test_error_from_serde_json() {
        let err: std::result::Result<serde_json::Value, _> = serde_json::from_str("{ nope }");
        let err: CuraScribeError = err.unwrap_err().into();
        assert!(matches!(err, CuraScribeError::Serialization(_)));
    }

    #[test]
    fn test_result_type_with_question_mark() {
        fn inner() -> Result<String> {
            let io_result: std::result::Result<i32, std::io::Error> = Ok(42);
            let value = io_result?;
            Ok(format!("value {}", value))
        }

        assert_eq!(inner().unwrap(), "value 42");
    }
}
