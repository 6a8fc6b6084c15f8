//! Error types for the drift checker.

use thiserror::Error;

/// Main error type for drift-check operations.
///
/// Only infrastructure problems are errors. Detected drift (missing tables,
/// shape or count differences, differing rows) is reported as data in
/// [`CompareResult`](crate::compare::CompareResult).
#[derive(Error, Debug)]
pub enum DriftError {
    /// Configuration error (invalid YAML, missing fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Database connection or query error
    #[error("Database error: {0}")]
    Database(#[from] tokio_postgres::Error),

    /// Connection pool error with context
    #[error("Pool error: {message}\n  Context: {context}")]
    Pool { message: String, context: String },

    /// Metadata query returned something unusable
    #[error("Metadata error: {0}")]
    Metadata(String),

    /// IO error (report file, config file)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Run was cancelled (SIGINT, etc.)
    #[error("Comparison cancelled")]
    Cancelled,
}

impl DriftError {
    /// Create a Pool error with context about where it occurred
    pub fn pool(message: impl ToString, context: impl Into<String>) -> Self {
        DriftError::Pool {
            message: message.to_string(),
            context: context.into(),
        }
    }

    /// Process exit code for this error.
    ///
    /// Exit code 1 is reserved for "drift detected", so errors start at 2.
    pub fn exit_code(&self) -> u8 {
        match self {
            DriftError::Config(_) | DriftError::Yaml(_) => 2,
            DriftError::Database(_) | DriftError::Pool { .. } | DriftError::Metadata(_) => 3,
            DriftError::Io(_) | DriftError::Json(_) => 4,
            DriftError::Cancelled => 130,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for drift-check operations.
pub type Result<T> = std::result::Result<T, DriftError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_do_not_collide_with_drift() {
        let errors = [
            DriftError::Config("bad".into()),
            DriftError::pool("timeout", "getting connection"),
            DriftError::Metadata("empty schema name".into()),
            DriftError::Io(std::io::Error::other("disk full")),
            DriftError::Cancelled,
        ];
        for err in errors {
            assert!(err.exit_code() > 1, "{err} must not exit with 0 or 1");
        }
    }

    #[test]
    fn test_pool_error_message() {
        let err = DriftError::pool("connection refused", "getting connection for record_count");
        let msg = err.to_string();
        assert!(msg.contains("connection refused"));
        assert!(msg.contains("record_count"));
    }

    #[test]
    fn test_format_detailed_includes_cause() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "config.yml");
        let err = DriftError::from(io);
        let detailed = err.format_detailed();
        assert!(detailed.starts_with("Error: IO error: config.yml"));
    }
}
