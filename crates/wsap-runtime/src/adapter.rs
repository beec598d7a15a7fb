//! Game adapter trait

use async_trait::async_trait;
use wsap_core::{Action, ActionResult, ActionSpace, Observation, Result};

/// Trait for exposing a game to WSAP agents
///
/// Translates engine state into an [`Observation`] and agent intent into engine
/// calls. One adapter instance drives one game session; calls are sequential.
#[async_trait]
pub trait GameAdapter: Send {
    /// Short game name
    fn name(&self) -> &str;

    /// Static description used in prompts
    fn game_description(&self) -> &str;

    /// Actions legal right now; recomputed on every call
    fn action_space(&self) -> ActionSpace;

    /// Complete snapshot of the current state.
    ///
    /// Missing engine state or an unreachable game is an error, never a
    /// defaulted observation.
    async fn observe(&mut self) -> Result<Observation>;

    /// Execute one action.
    ///
    /// Unknown action names come back as `success = false`; only transport
    /// and engine failures are errors.
    async fn act(&mut self, action: &Action) -> Result<ActionResult>;

    /// Start a new episode
    async fn reset(&mut self) -> Result<Observation>;

    /// Release the game; calling it twice is fine
    async fn close(&mut self) -> Result<()> {
        Ok(())
    }

    /// System prompt for LLM agents
    fn system_prompt(&self) -> String {
        format!(
            "You are an AI agent playing {}.\n\n{}\n\nAVAILABLE ACTIONS:\n{}\n\n\
             RESPONSE FORMAT:\n\
             Respond with a JSON object containing your chosen action:\n\
             {{\"action\": \"action_name\", \"params\": {{}}, \"reasoning\": \"brief explanation\"}}\n\n\
             Focus on survival and progress. Make decisions based on current state.",
            self.name(),
            self.game_description(),
            self.action_space().to_text()
        )
    }
}
