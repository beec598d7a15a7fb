//! Error types for WSAP

use thiserror::Error;

/// Result type for WSAP operations
pub type Result<T> = std::result::Result<T, WsapError>;

/// WSAP error types
#[derive(Debug, Error)]
pub enum WsapError {
    /// Action name not present in the action space it was decided against
    #[error("Action not in action space: {0}")]
    UnknownAction(String),

    /// Agent reply could not be decoded into an action
    #[error("Unparseable agent reply: {reason}")]
    UnparseableReply { reason: String, raw: String },

    /// Action space declares the same name twice
    #[error("Duplicate action name in action space: {0}")]
    DuplicateAction(String),

    /// Game state is missing fields an observation requires
    #[error("Incomplete game state: {0}")]
    IncompleteState(String),

    /// Bridge, LLM backend or hub unreachable or misbehaving
    #[error("Transport error: {0}")]
    Transport(String),

    /// Request to an out-of-process component timed out
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Generation backend returned nothing usable
    #[error("Backend error: {0}")]
    Backend(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Game-specific error
    #[error("Game error: {0}")]
    Game(String),

    /// Hub rejected a request
    #[error("Nexus error: {0}")]
    Nexus(String),

    /// Adapter used after close()
    #[error("Adapter closed")]
    Closed,
}

impl From<serde_json::Error> for WsapError {
    fn from(err: serde_json::Error) -> Self {
        WsapError::Serialization(err.to_string())
    }
}

impl WsapError {
    /// Protocol violations are surfaced to the decision loop; everything else is a hard failure
    pub fn is_protocol_violation(&self) -> bool {
        matches!(
            self,
            WsapError::UnknownAction(_) | WsapError::UnparseableReply { .. }
        )
    }
}
