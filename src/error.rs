use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while validating a plugin's declared settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required property has no value and no default.
    #[error("missing value for property '{0}'")]
    Missing(String),

    /// A property that must not be empty was set to an empty string.
    #[error("property '{0}' must not be empty")]
    Empty(String),

    /// The raw value could not be parsed as the declared type.
    #[error("property '{name}' expects {expected}, got '{value}'")]
    Type {
        name: String,
        expected: &'static str,
        value: String,
    },

    /// An integer value fell outside the declared bounds.
    #[error("property '{name}' must be between {min} and {max}, got {value}")]
    Bounds {
        name: String,
        min: i64,
        max: i64,
        value: i64,
    },

    /// The value is not one of the declared possible values.
    #[error("property '{name}' does not allow value '{value}'")]
    NotAllowed { name: String, value: String },

    /// A delimited list had the wrong number of entries.
    #[error("property '{name}' expects {expected} entries, got {actual}")]
    Length {
        name: String,
        expected: usize,
        actual: usize,
    },

    /// A plugin-supplied check or convert function rejected the value.
    #[error("property '{name}': {message}")]
    Check { name: String, message: String },

    /// A dependency gate references a property that was not declared earlier.
    #[error("property '{name}' depends on unknown property '{dependency}'")]
    UnknownDependency { name: String, dependency: String },

    /// The schema itself is malformed (duplicate names, missing enable flag).
    #[error("invalid settings schema: {0}")]
    Schema(String),
}

/// Library error type for plugin hook failures.
#[derive(Debug, Error)]
pub enum PluginError {
    /// Settings validation failed before the hook could run.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// An external tool exited unsuccessfully; carries its captured output.
    #[error("{tool} failed: {message}")]
    Tool { tool: String, message: String },

    /// A file named by a photo record does not exist.
    #[error("photo file not found: {0}")]
    MissingPhoto(PathBuf),

    /// A configured photo directory is missing or not a directory.
    #[error("invalid photo directory: {0}")]
    BadDir(PathBuf),

    /// Underlying IO error.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// In-process image decode/encode error.
    #[error(transparent)]
    Image(#[from] image::ImageError),

    /// Anything else a plugin wants to surface for the host to log.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
