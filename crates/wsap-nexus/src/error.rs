//! Hub error types

use crate::game::GameStatus;
use thiserror::Error;

/// Result type for hub operations
pub type Result<T> = std::result::Result<T, NexusError>;

/// Caller misuse: operations on identities or avatars that do not exist
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NexusError {
    #[error("Unknown agent: {0}")]
    UnknownAgent(String),

    #[error("Unknown game: {0}")]
    UnknownGame(String),

    #[error("No avatar for agent {agent_id} in {game_id}")]
    AvatarNotFound { agent_id: String, game_id: String },

    #[error("Avatar limit reached ({max} live avatars) for agent {agent_id} in {game_id}")]
    AvatarLimit {
        agent_id: String,
        game_id: String,
        max: usize,
    },

    #[error("Avatar {0} is destroyed")]
    AvatarDestroyed(String),
}

/// Why a transit into a game was refused
///
/// These are routine outcomes an agent meets while navigating games, so they are
/// returned as values rather than treated as failures of the hub.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransitDenied {
    #[error("Unknown game: {0}")]
    UnknownGame(String),

    #[error("Game not available: {}", .status.as_str())]
    GameUnavailable { game_id: String, status: GameStatus },

    #[error("Unknown agent: {0}")]
    UnknownAgent(String),

    #[error("Agent {agent_id} is already in game: {game_id}")]
    AlreadyInGame { agent_id: String, game_id: String },
}
