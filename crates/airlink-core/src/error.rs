//! Error taxonomy for the connectivity layer.
//!
//! Initialization errors are returned synchronously to the caller. Runtime
//! errors inside the periodic loop and the command handlers are terminal to
//! that single operation only: they are logged and the loop or dispatcher
//! continues.

use thiserror::Error;

/// Result type for link operations.
pub type Result<T> = std::result::Result<T, LinkError>;

/// Error type for the connectivity layer.
#[derive(Debug, Error)]
pub enum LinkError {
    /// Bad or missing required configuration; fatal to initialization.
    #[error("configuration error: {0}")]
    Config(String),

    /// Task or allocation failure; fatal to initialization.
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    /// Failure reported by the transport collaborator. No distinction is
    /// made between transient and fatal transport faults.
    #[error("transport failure: {0}")]
    Transport(String),

    /// Command module registration failure.
    #[error("registration error: {0}")]
    Registration(String),

    /// Malformed or incomplete command payload.
    #[error("command parse error: {0}")]
    Parse(String),

    /// Requested entry was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Collaborator-specific error passthrough.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl LinkError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn resource_exhausted(msg: impl Into<String>) -> Self {
        Self::ResourceExhausted(msg.into())
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    pub fn registration(msg: impl Into<String>) -> Self {
        Self::Registration(msg.into())
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_class_and_message() {
        let err = LinkError::config("broker address is required");
        assert_eq!(
            err.to_string(),
            "configuration error: broker address is required"
        );

        let err = LinkError::transport("connection refused");
        assert_eq!(err.to_string(), "transport failure: connection refused");
    }

    #[test]
    fn anyhow_passthrough_keeps_message() {
        let err: LinkError = anyhow::anyhow!("backing store unavailable").into();
        assert_eq!(err.to_string(), "backing store unavailable");
    }
}
