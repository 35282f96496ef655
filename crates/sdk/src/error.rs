use blockstream_types::{FieldKind, PositionError};
use thiserror::Error;

use crate::session::SessionState;

/// Errors raised before any session opens
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// No module with this name in the package
    #[error("Module '{0}' not found in package")]
    ModuleNotFound(String),

    /// The module's first input is not a params input
    #[error("Module '{0}' does not have parameters")]
    ModuleHasNoParams(String),

    /// Parameter not in `module=value` form
    #[error("Malformed parameter '{0}': expected 'module=value'")]
    MalformedParam(String),

    #[error("Invalid range: {0}")]
    InvalidRange(#[from] PositionError),

    #[error("Restart cadence must be greater than zero")]
    InvalidRestartCadence,

    #[error("Output module name is empty")]
    MissingModuleName,
}

/// Errors that end a stream session
#[derive(Error, Debug)]
pub enum StreamError {
    /// Connection error (failed to reach the stream endpoint)
    #[error("Connection error: {0}")]
    Connection(String),

    /// Authentication error (invalid or missing credentials)
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Stream aborted by the transport
    #[error("Transport error: {0}")]
    Transport(String),

    /// Malformed framing or an unparseable message
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The server reported a fatal error and closed the stream
    #[error("Fatal stream error: {0}")]
    Fatal(String),

    /// A session can only be opened once
    #[error("Cannot open a session in state {0}")]
    InvalidState(SessionState),

    /// HTTP error from reqwest
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl StreamError {
    /// Whether reopening the stream from the last cursor may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StreamError::Connection(_) | StreamError::Transport(_) | StreamError::Http(_)
        )
    }
}

/// Module output that claims to be present but cannot be decoded
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Unknown type '{0}'")]
    UnknownType(String),

    #[error("Invalid JSON payload for '{type_name}': {source}")]
    InvalidJson {
        type_name: String,
        source: serde_json::Error,
    },

    #[error("Payload for '{0}' is not an object")]
    NotAnObject(String),

    #[error("Unknown field '{field}' in '{type_name}'")]
    UnknownField { type_name: String, field: String },

    #[error("Field '{field}' in '{type_name}' is not a valid {expected}")]
    FieldKind {
        type_name: String,
        field: String,
        expected: FieldKind,
    },
}

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("Output receiver dropped")]
    Closed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors that unwind the whole consumer
#[derive(Error, Debug)]
pub enum ConsumerError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Stream(#[from] StreamError),

    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),
}

/// Result type alias for consumer operations
pub type Result<T> = std::result::Result<T, ConsumerError>;
