//! Unified error hierarchy for SquadRS
//!
//! The analytics core degrades to conservative results instead of failing, so
//! these errors only surface at the edges: configuration, input decoding and
//! logging setup.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for SquadRS operations
#[derive(Debug, Error)]
pub enum SquadRsError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Input decoding errors
    #[error("Input error: {0}")]
    Input(#[from] InputError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Configuration validation errors
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    /// Value outside of its accepted range
    #[error("{field} out of range: {value} (expected {expected})")]
    OutOfRange {
        field: String,
        value: String,
        expected: String,
    },

    /// Pair of thresholds in the wrong order
    #[error("Thresholds out of order: {lower} must be below {upper}")]
    ThresholdOrder { lower: String, upper: String },

    /// Config file could not be parsed
    #[error("Failed to parse {path}: {reason}")]
    Parse { path: PathBuf, reason: String },
}

/// Errors raised while reading roster or session inputs
#[derive(Debug, Error)]
pub enum InputError {
    /// Input file not found
    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    /// Input could not be decoded
    #[error("Malformed input in {path}: {reason}")]
    Malformed { path: PathBuf, reason: String },

    /// Date argument could not be parsed
    #[error("Invalid date '{value}', expected YYYY-MM-DD")]
    InvalidDate { value: String },
}

/// Result type alias for SquadRS operations
pub type Result<T> = std::result::Result<T, SquadRsError>;

impl SquadRsError {
    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            SquadRsError::Input(InputError::InvalidDate { .. }) => ErrorSeverity::Warning,
            SquadRsError::Input(_) | SquadRsError::Config(_) => ErrorSeverity::Error,
            SquadRsError::Io(_) | SquadRsError::Serialization(_) => ErrorSeverity::Critical,
        }
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            SquadRsError::Input(InputError::FileNotFound { path }) => {
                format!("Could not find input file: {}", path.display())
            }
            SquadRsError::Config(ConfigError::OutOfRange { field, expected, .. }) => {
                format!("Setting '{}' must be {}", field, expected)
            }
            _ => self.to_string(),
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Critical system error requiring immediate attention
    Critical,
    /// Error that prevents the command from completing
    Error,
    /// Bad argument the user can correct
    Warning,
}

impl ErrorSeverity {
    /// Convert to tracing level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            ErrorSeverity::Critical => tracing::Level::ERROR,
            ErrorSeverity::Error => tracing::Level::ERROR,
            ErrorSeverity::Warning => tracing::Level::WARN,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_severity() {
        let err = SquadRsError::Input(InputError::InvalidDate {
            value: "yesterday".to_string(),
        });
        assert_eq!(err.severity(), ErrorSeverity::Warning);

        let err = SquadRsError::from(std::io::Error::new(std::io::ErrorKind::Other, "disk"));
        assert_eq!(err.severity(), ErrorSeverity::Critical);
        assert_eq!(err.severity().to_tracing_level(), tracing::Level::ERROR);
    }

    #[test]
    fn test_user_messages() {
        let err = SquadRsError::Input(InputError::FileNotFound {
            path: PathBuf::from("roster.json"),
        });
        assert!(err.user_message().contains("Could not find"));

        let err = SquadRsError::from(ConfigError::OutOfRange {
            field: "ewma.alpha".to_string(),
            value: "1.5".to_string(),
            expected: "in (0, 1]".to_string(),
        });
        assert!(err.user_message().contains("ewma.alpha"));
    }
}
