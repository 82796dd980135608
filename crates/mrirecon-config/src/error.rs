use std::path::PathBuf;

/// Errors raised by the configuration store and its loaders.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Keys must be non-empty.
    #[error("configuration key must not be empty")]
    EmptyKey,

    /// A stored value does not parse as the requested type.
    #[error("value {value:?} for {key:?} is not a valid {expected}")]
    Parse {
        key: String,
        value: String,
        expected: &'static str,
    },

    /// A configuration file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A configuration file exceeds the size cap.
    #[error("configuration file {path} too large ({size} bytes, max {max})")]
    TooLarge { path: PathBuf, size: u64, max: u64 },

    /// A configuration document is not valid JSON for its schema.
    #[error("invalid configuration document: {0}")]
    InvalidDocument(#[from] serde_json::Error),

    /// A parameter value has a JSON type that cannot be stored.
    #[error("parameter {key:?} must be a string, number or boolean")]
    UnsupportedValue { key: String },
}

pub type Result<T> = std::result::Result<T, ConfigError>;
