//! Game adapters for the World Simulation Agent Protocol
//!
//! - [`crafter`]: the Crafter survival world, driven through a [`CrafterEngine`]
//! - [`starbound`]: OpenStarbound, reached through the polling bridge

pub mod crafter;
pub mod starbound;

pub use crafter::{CrafterAdapter, CrafterEngine, CrafterInfo, CrafterStep, MockCrafter, crafter_actions};
pub use starbound::{BridgeTransport, MockStarbound, StarboundAdapter, StarboundTransport, starbound_actions};
