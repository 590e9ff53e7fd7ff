//! Error types for corpus statistics.

use thiserror::Error;

/// Main error type for glyphstat operations.
#[derive(Error, Debug)]
pub enum StatsError {
    /// A core parameter is out of its valid range (window size, top-k, ...)
    #[error("Invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    /// A single input record could not be parsed
    #[error("Invalid record at line {line}: {reason}")]
    InvalidRecord { line: usize, reason: String },

    /// Filesystem error with the offending path
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Configuration file could not be read or parsed
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type alias for glyphstat operations.
pub type Result<T> = std::result::Result<T, StatsError>;

impl StatsError {
    /// Check if this is a recoverable error
    ///
    /// Recoverable errors concern one record; the run skips it and continues.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, StatsError::InvalidRecord { .. })
    }

    pub(crate) fn io(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        StatsError::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }

    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        StatsError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for StatsError {
    fn from(err: serde_json::Error) -> Self {
        StatsError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable() {
        let rec = StatsError::InvalidRecord {
            line: 3,
            reason: "bad json".into(),
        };
        assert!(rec.is_recoverable());
        assert!(!StatsError::invalid("window_size", "must be positive").is_recoverable());
    }

    #[test]
    fn test_display_names_parameter() {
        let err = StatsError::invalid("window_size", "must be at least 1");
        assert_eq!(
            err.to_string(),
            "Invalid parameter `window_size`: must be at least 1"
        );
    }
}
