// src/errors.rs

//! Crate-wide error type and result alias.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    /// Caller supplied something unusable (empty module id, missing script,
    /// malformed prompt condition). Raised before any process is spawned.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Module not found: {0}")]
    ModuleNotFound(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Refused at a security boundary (allow-list, operation provenance).
    #[error("Refused: {0}")]
    SecurityRejected(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, EngineError>;
