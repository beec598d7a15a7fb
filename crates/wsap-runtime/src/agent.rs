//! Agent trait

use async_trait::async_trait;
use wsap_core::{Action, ActionResult, ActionSpace, Observation, Result};

/// A decision policy
///
/// Algorithmic or LLM-backed; the episode loop only sees this trait.
#[async_trait]
pub trait Agent: Send {
    /// Called once per episode before the first decision
    fn initialize(&mut self, game_description: &str, action_space: &ActionSpace);

    /// The action space changed since the last decision
    fn refresh_action_space(&mut self, _action_space: &ActionSpace) {}

    /// Choose the next action.
    ///
    /// Protocol violations (unknown action, unparseable reply) are returned as
    /// errors; the caller decides whether to retry.
    async fn decide(&mut self, observation: &Observation) -> Result<Action>;

    /// Learn from the outcome of the last action
    fn reflect(&mut self, _result: &ActionResult) {}

    /// Clear per-episode state
    fn reset(&mut self) {}
}
