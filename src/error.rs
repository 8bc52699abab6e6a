//! Error types for Manabu.

use thiserror::Error;

/// Library-level error type for Manabu operations.
#[derive(Error, Debug)]
pub enum ManabuError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Moodle API unreachable: {0}")]
    RemoteUnavailable(String),

    #[error("Moodle API returned status {0}")]
    RemoteBadStatus(u16),

    #[error("Malformed Moodle API payload: {0}")]
    RemoteMalformedPayload(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),

    #[error("Model backend unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Malformed model decision: {0}")]
    MalformedDecision(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

/// Result type alias for Manabu operations.
pub type Result<T> = std::result::Result<T, ManabuError>;
