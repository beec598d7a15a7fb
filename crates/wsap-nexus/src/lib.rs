//! # wsap-nexus
//!
//! The hub agents return to between games.
//!
//! This crate provides:
//! - A game registry and a persistent agent identity store
//! - Transit sessions with at most one active session per agent
//! - Skill-derived starting bonuses and game suggestions
//! - Avatars, cross-game meta-goals and session expiry
//! - The axum HTTP API, its configuration and a reqwest client

pub mod avatar;
pub mod bonus;
pub mod client;
pub mod config;
pub mod error;
pub mod game;
pub mod hub;
pub mod identity;
pub mod meta_goal;
pub mod server;

pub use avatar::{Avatar, AvatarRoster, AvatarSpec, AvatarState, JackOutMode};
pub use bonus::{BonusTable, Bonuses};
pub use client::{ExitSummary, NexusClient};
pub use config::NexusConfig;
pub use error::{NexusError, Result, TransitDenied};
pub use game::{GameInfo, GameStatus, seed_games};
pub use hub::{Nexus, NexusObservation, Session, Suggestion, TransitGrant};
pub use identity::{
    Achievement, AgentIdentity, EntryPackage, SKILL_DOMAINS, StatsUpdate, TransitPackage,
};
pub use server::{router, serve};
