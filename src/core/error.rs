//! Runtime error types

use reqwest::StatusCode;
use thiserror::Error;

/// Errors raised while talking to the broker over HTTP
#[derive(Error, Debug)]
pub enum TransportError {
    /// Request body could not be encoded
    #[error("Failed to serialize request body: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Request could not be built or sent, or the connection failed
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Broker answered with a status we do not accept
    #[error("Unexpected status: {0}")]
    Status(StatusCode),
}

impl TransportError {
    /// HTTP status carried by this error, if the broker answered at all
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            TransportError::Status(status) => Some(*status),
            TransportError::Request(err) => err.status(),
            TransportError::Serialize(_) => None,
        }
    }
}

/// Errors that can occur in the agent runtime
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// An agent type with this name is already registered
    #[error("Agent {0} already registered")]
    DuplicateName(String),

    /// No factory is registered for this agent type
    #[error("No factory registered for agent {0}")]
    MissingFactory(String),

    /// Inbound line or lifecycle payload is not valid JSON for its schema
    #[error("Decode error: {0}")]
    Decode(#[source] serde_json::Error),

    /// Broker transport failure
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Result type alias for broker transport operations
pub type TransportResult<T> = Result<T, TransportError>;

/// Result type alias for runtime operations
pub type RuntimeResult<T> = Result<T, RuntimeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RuntimeError::DuplicateName("server".into());
        assert_eq!(err.to_string(), "Agent server already registered");

        let err = RuntimeError::MissingFactory("ghost".into());
        assert_eq!(err.to_string(), "No factory registered for agent ghost");

        let err = TransportError::Status(StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "Unexpected status: 500 Internal Server Error");
    }

    #[test]
    fn test_status_accessor() {
        let err = TransportError::Status(StatusCode::NOT_FOUND);
        assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));

        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: TransportError = json_err.into();
        assert!(matches!(err, TransportError::Serialize(_)));
        assert_eq!(err.status(), None);
    }

    #[test]
    fn test_transport_into_runtime() {
        let err: RuntimeError = TransportError::Status(StatusCode::BAD_GATEWAY).into();
        assert!(matches!(err, RuntimeError::Transport(TransportError::Status(_))));
    }
}
