//! # wsap-core
//!
//! Core types for the WSAP protocol.
//!
//! This crate provides the shared vocabulary between games and agents:
//! - Observation snapshots and their fixed-header text rendering
//! - Action spaces, action definitions and chosen actions
//! - Action results
//! - Error types

pub mod action;
pub mod error;
pub mod observation;

pub use action::{Action, ActionDef, ActionSpace, ParamDef, Params};
pub use error::{Result, WsapError};
pub use observation::{
    ActionResult, Effect, Entity, Event, EventKind, Goal, Inventory, Location, Observation,
    StatusMap, Terrain,
};
