//! Error types for schema generation

use thiserror::Error;

/// Result type for schema operations
pub type Result<T> = std::result::Result<T, SchemaError>;

/// Schema generation errors
#[derive(Error, Debug)]
pub enum SchemaError {
    /// The compiler reached a class that needs a full sub-schema, but no
    /// schema builder was wired in (or the wired builder was dropped).
    #[error("The schema builder must be configured by calling `set_schema_builder` before building schemas for class {class_name}")]
    SchemaBuilderNotConfigured { class_name: String },

    #[error("Unknown class: {0}")]
    UnknownClass(String),

    #[error("Invalid metadata: {0}")]
    InvalidMetadata(String),

    #[error("Unsupported metadata format: {0}")]
    UnsupportedFormat(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config_crate::ConfigError),

    #[error("Semver error: {0}")]
    Semver(#[from] semver::Error),
}
