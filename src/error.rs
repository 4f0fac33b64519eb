//! Error types shared across the crate

use thiserror::Error;

/// Result type for all fallible operations in this crate
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by config, registry, hub and lifecycle operations
#[derive(Error, Debug)]
pub enum Error {
    /// Config or weight file absent both locally and remotely
    #[error("not found: {0}")]
    NotFound(String),

    /// Raw mapping contains keys the target config type does not declare,
    /// or the expected config block is missing
    #[error("`{config_type}` config schema mismatch: {detail}")]
    SchemaMismatch {
        config_type: &'static str,
        detail: String,
    },

    /// Requested model name is not in the registry
    #[error("unknown model `{name}`, known models: {known:?}")]
    UnknownModel { name: String, known: Vec<String> },

    /// Weight file unreadable or undeserializable
    #[error("corrupt weights: {0}")]
    CorruptWeights(String),

    /// Hub rejected the credentials (or none were provided)
    #[error("hub authentication failed: {0}")]
    HubAuth(String),

    /// Hub transport failure
    #[error("hub network error: {0}")]
    HubNetwork(String),

    /// Inputs incompatible with the model's expectations
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
