//! Polling command bridge for games that can only make outbound HTTP calls
//!
//! This crate provides:
//! - A command queue pairing blocking controller requests with game polls
//! - Wire schemas for commands, results and status
//! - The axum bridge server and its configuration
//! - An HTTP client for controllers and pollers

pub mod client;
pub mod config;
pub mod error;
pub mod protocol;
pub mod queue;
pub mod server;

pub use client::BridgeClient;
pub use config::BridgeConfig;
pub use error::BridgeError;
pub use protocol::{BridgeStatus, Command, CommandId, CommandType, ResultSubmission};
pub use queue::CommandQueue;
pub use server::{BridgeState, router, serve};
