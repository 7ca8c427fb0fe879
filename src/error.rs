//! Error types for reference resolution

use thiserror::Error;

/// Result type for resolution operations
pub type Result<T> = std::result::Result<T, SchemaError>;

/// Resolution and store errors
///
/// Parse failures are deliberately absent here: they live in
/// [`crate::parser::ParseError`] and never escape a provider.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Invalid reference {reference}: missing {missing}")]
    InvalidReference { reference: String, missing: &'static str },

    #[error("Invalid version {version} for subject \"{subject}\"")]
    InvalidVersion { subject: String, version: i64 },

    #[error("No schema reference found for subject \"{subject}\" and version {version}")]
    NotFound { subject: String, version: String },

    #[error("Reference depth limit {limit} exceeded while resolving \"{name}\"")]
    DepthExceeded { name: String, limit: usize },

    #[error("Schema store lookup failed for subject \"{subject}\" version {version}: {message}")]
    Fetch { subject: String, version: String, message: String },

    #[error("No provider registered for schema type \"{0}\"")]
    UnknownSchemaType(String),

    #[error("Invalid schema format: {0}")]
    InvalidFormat(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(#[from] config_crate::ConfigError),
}

impl SchemaError {
    /// True for errors caused by bad or missing store data rather than I/O or config
    pub fn is_integrity_error(&self) -> bool {
        matches!(
            self,
            SchemaError::InvalidReference { .. }
                | SchemaError::InvalidVersion { .. }
                | SchemaError::NotFound { .. }
                | SchemaError::DepthExceeded { .. }
        )
    }
}
