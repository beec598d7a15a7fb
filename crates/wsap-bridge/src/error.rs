//! Bridge error types

use crate::protocol::CommandId;
use std::time::Duration;
use thiserror::Error;
use wsap_core::WsapError;

/// Outcome of a submitted command that did not produce a game result
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    /// No result was delivered within the submit window
    #[error("Timeout waiting for game response (command {id} after {after:?})")]
    Timeout { id: CommandId, after: Duration },

    /// The queue was torn down while the command was in flight
    #[error("Command queue closed before command {0} completed")]
    Closed(CommandId),
}

impl From<BridgeError> for WsapError {
    fn from(err: BridgeError) -> Self {
        match err {
            BridgeError::Timeout { .. } => WsapError::Timeout(err.to_string()),
            BridgeError::Closed(_) => WsapError::Transport(err.to_string()),
        }
    }
}
