//! The observe / decide / act loop

use crate::adapter::GameAdapter;
use crate::agent::Agent;
use serde::Serialize;
use tracing::{debug, info, warn};
use wsap_core::observation::display_value;
use wsap_core::{ActionDef, Observation};

/// How an episode ended
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EpisodeOutcome {
    /// The game reported `done`
    Done,
    /// `max_steps` reached
    StepLimit,
    /// Agent chose the exit action
    AgentExit { reasoning: Option<String> },
    /// A hard failure stopped the loop
    Aborted { error: String },
}

impl EpisodeOutcome {
    /// Reason string reported to the hub on transit out
    pub fn exit_reason(&self) -> String {
        match self {
            EpisodeOutcome::Done => "game_over".to_string(),
            EpisodeOutcome::StepLimit => "step_limit".to_string(),
            EpisodeOutcome::AgentExit { reasoning } => reasoning
                .clone()
                .filter(|r| !r.is_empty())
                .unwrap_or_else(|| "voluntary".to_string()),
            EpisodeOutcome::Aborted { .. } => "error".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EpisodeStats {
    /// Actions executed by the game
    pub steps: u64,
    pub total_reward: f64,
    /// In unlock order
    pub achievements: Vec<String>,
    pub final_observation: Option<Observation>,
    pub outcome: EpisodeOutcome,
}

#[derive(Debug, Clone)]
pub struct EpisodeOptions {
    pub max_steps: u64,
    /// Start with `reset()` rather than `observe()`
    pub reset_on_start: bool,
    /// Extra action that ends the episode without reaching the game
    pub exit_action: Option<ActionDef>,
    /// Log a progress line every this many steps (0 disables)
    pub log_every: u64,
}

impl Default for EpisodeOptions {
    fn default() -> Self {
        Self {
            max_steps: 1000,
            reset_on_start: true,
            exit_action: None,
            log_every: 10,
        }
    }
}

/// Run one episode of `agent` in `adapter`.
///
/// Errors from the adapter or the agent end the episode as `Aborted`; the
/// stats gathered so far are still returned.
pub async fn run_episode<A, G>(adapter: &mut A, agent: &mut G, options: &EpisodeOptions) -> EpisodeStats
where
    A: GameAdapter + ?Sized,
    G: Agent + ?Sized,
{
    let mut stats = EpisodeStats {
        steps: 0,
        total_reward: 0.0,
        achievements: Vec::new(),
        final_observation: None,
        outcome: EpisodeOutcome::StepLimit,
    };

    let mut space = adapter.action_space();
    if let Some(exit) = &options.exit_action {
        match space.extended(exit.clone()) {
            Ok(extended) => space = extended,
            Err(err) => {
                stats.outcome = aborted(adapter.name(), err);
                return stats;
            }
        }
    }
    agent.initialize(adapter.game_description(), &space);

    let start = if options.reset_on_start {
        adapter.reset().await
    } else {
        adapter.observe().await
    };
    let mut observation = match start {
        Ok(observation) => observation,
        Err(err) => {
            stats.outcome = aborted(adapter.name(), err);
            return stats;
        }
    };
    agent.reset();

    info!(game = adapter.name(), max_steps = options.max_steps, "episode started");

    let exit_name = options.exit_action.as_ref().map(|a| a.name.as_str());
    while stats.steps < options.max_steps {
        if stats.steps > 0 {
            let mut current = adapter.action_space();
            if let Some(exit) = &options.exit_action {
                current = match current.extended(exit.clone()) {
                    Ok(extended) => extended,
                    Err(err) => {
                        stats.outcome = aborted(adapter.name(), err);
                        break;
                    }
                };
            }
            if current != space {
                agent.refresh_action_space(&current);
                space = current;
            }
        }

        let action = match agent.decide(&observation).await {
            Ok(action) => action,
            Err(err) => {
                stats.outcome = aborted(adapter.name(), err);
                break;
            }
        };

        if Some(action.name.as_str()) == exit_name {
            info!(game = adapter.name(), step = stats.steps, reasoning = ?action.reasoning, "agent chose to exit");
            stats.outcome = EpisodeOutcome::AgentExit {
                reasoning: action.reasoning,
            };
            break;
        }

        let result = match adapter.act(&action).await {
            Ok(result) => result,
            Err(err) => {
                stats.outcome = aborted(adapter.name(), err);
                break;
            }
        };
        agent.reflect(&result);

        stats.steps += 1;
        stats.total_reward += result.reward;
        stats.achievements.extend(result.achievements.iter().cloned());

        for achievement in &result.achievements {
            info!(game = adapter.name(), step = stats.steps, %achievement, "achievement unlocked");
        }
        let periodic = options.log_every > 0 && (stats.steps - 1) % options.log_every == 0;
        if periodic || result.reward > 0.0 {
            let status = &result.observation.status;
            let field = |key: &str| status.get(key).map(display_value).unwrap_or_else(|| "?".to_string());
            info!(
                game = adapter.name(),
                step = stats.steps,
                action = %action.name,
                health = %field("health"),
                food = %field("food"),
                drink = %field("drink"),
                energy = %field("energy"),
                reward = result.reward,
                "step"
            );
        } else {
            debug!(step = stats.steps, action = %action.name, success = result.success, "step");
        }

        let done = result.done;
        observation = result.observation;
        if done {
            stats.outcome = EpisodeOutcome::Done;
            break;
        }
    }

    info!(
        game = adapter.name(),
        steps = stats.steps,
        total_reward = stats.total_reward,
        achievements = stats.achievements.len(),
        outcome = ?stats.outcome,
        "episode finished"
    );
    stats.final_observation = Some(observation);
    stats
}

fn aborted(game: &str, err: wsap_core::WsapError) -> EpisodeOutcome {
    warn!(%game, error = %err, "episode aborted");
    EpisodeOutcome::Aborted {
        error: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use wsap_core::{
        Action, ActionResult, ActionSpace, Inventory, Location, Result, StatusMap, WsapError,
    };

    /// Counts to `length`, rewarding every third step
    struct Counter {
        step: u64,
        length: u64,
        fail_at: Option<u64>,
    }

    impl Counter {
        fn new(length: u64) -> Self {
            Self {
                step: 0,
                length,
                fail_at: None,
            }
        }

        fn snapshot(&self) -> Observation {
            let mut status = StatusMap::new();
            status.insert("health".into(), 9.into());
            let mut obs = Observation::new(status, Inventory::new(), Location::new(vec![0.0, 0.0]));
            obs.step = self.step;
            obs
        }
    }

    #[async_trait]
    impl GameAdapter for Counter {
        fn name(&self) -> &str {
            "Counter"
        }

        fn game_description(&self) -> &str {
            "Count to the end."
        }

        fn action_space(&self) -> ActionSpace {
            ActionSpace::new(vec![ActionDef::new("tick", "Advance one step")]).unwrap()
        }

        async fn observe(&mut self) -> Result<Observation> {
            Ok(self.snapshot())
        }

        async fn act(&mut self, action: &Action) -> Result<ActionResult> {
            if self.fail_at == Some(self.step) {
                return Err(WsapError::Transport("bridge went away".into()));
            }
            if action.name != "tick" {
                return Ok(ActionResult::failure(
                    format!("Unknown action: {}", action.name),
                    self.snapshot(),
                ));
            }
            self.step += 1;
            let mut result = ActionResult::success("tick", self.snapshot());
            if self.step % 3 == 0 {
                result.reward = 1.0;
                result.add_achievement(format!("count_{}", self.step));
            }
            result.done = self.step >= self.length;
            Ok(result)
        }

        async fn reset(&mut self) -> Result<Observation> {
            self.step = 0;
            Ok(self.snapshot())
        }
    }

    /// Plays a fixed list of actions, then errors
    struct Script {
        moves: VecDeque<Action>,
        initialized: bool,
        reflections: usize,
    }

    impl Script {
        fn new(moves: Vec<Action>) -> Self {
            Self {
                moves: moves.into(),
                initialized: false,
                reflections: 0,
            }
        }

        fn ticks(n: usize) -> Self {
            Self::new(vec![Action::new("tick"); n])
        }
    }

    #[async_trait]
    impl Agent for Script {
        fn initialize(&mut self, _description: &str, space: &ActionSpace) {
            assert!(space.contains("tick"));
            self.initialized = true;
        }

        async fn decide(&mut self, _observation: &Observation) -> Result<Action> {
            self.moves
                .pop_front()
                .ok_or_else(|| WsapError::UnparseableReply {
                    reason: "out of moves".into(),
                    raw: String::new(),
                })
        }

        fn reflect(&mut self, _result: &ActionResult) {
            self.reflections += 1;
        }
    }

    #[tokio::test]
    async fn test_episode_runs_until_done() {
        let mut game = Counter::new(6);
        let mut agent = Script::ticks(10);
        let stats = run_episode(&mut game, &mut agent, &EpisodeOptions::default()).await;

        assert!(agent.initialized);
        assert_eq!(stats.outcome, EpisodeOutcome::Done);
        assert_eq!(stats.steps, 6);
        assert_eq!(stats.total_reward, 2.0);
        assert_eq!(stats.achievements, vec!["count_3", "count_6"]);
        assert_eq!(stats.final_observation.unwrap().step, 6);
        assert_eq!(agent.reflections, 6);
    }

    #[tokio::test]
    async fn test_step_limit() {
        let mut game = Counter::new(100);
        let mut agent = Script::ticks(10);
        let options = EpisodeOptions {
            max_steps: 4,
            ..EpisodeOptions::default()
        };
        let stats = run_episode(&mut game, &mut agent, &options).await;
        assert_eq!(stats.outcome, EpisodeOutcome::StepLimit);
        assert_eq!(stats.steps, 4);
        assert_eq!(stats.outcome.exit_reason(), "step_limit");
    }

    #[tokio::test]
    async fn test_exit_action_never_reaches_the_game() {
        let mut game = Counter::new(100);
        let mut agent = Script::new(vec![
            Action::new("tick"),
            Action::new("exit_game").with_reasoning("bored"),
            Action::new("tick"),
        ]);
        let options = EpisodeOptions {
            exit_action: Some(ActionDef::new("exit_game", "Leave this game")),
            reset_on_start: false,
            ..EpisodeOptions::default()
        };
        let stats = run_episode(&mut game, &mut agent, &options).await;

        assert_eq!(
            stats.outcome,
            EpisodeOutcome::AgentExit {
                reasoning: Some("bored".into())
            }
        );
        assert_eq!(stats.steps, 1);
        assert_eq!(game.step, 1);
        assert_eq!(stats.outcome.exit_reason(), "bored");
    }

    #[tokio::test]
    async fn test_unknown_action_is_an_unsuccessful_step() {
        let mut game = Counter::new(2);
        let mut agent = Script::new(vec![Action::new("jump"), Action::new("tick"), Action::new("tick")]);
        let stats = run_episode(&mut game, &mut agent, &EpisodeOptions::default()).await;
        assert_eq!(stats.outcome, EpisodeOutcome::Done);
        assert_eq!(stats.steps, 3);
    }

    #[tokio::test]
    async fn test_agent_error_aborts() {
        let mut game = Counter::new(100);
        let mut agent = Script::ticks(2);
        let stats = run_episode(&mut game, &mut agent, &EpisodeOptions::default()).await;
        assert!(matches!(stats.outcome, EpisodeOutcome::Aborted { ref error } if error.contains("out of moves")));
        assert_eq!(stats.steps, 2);
        assert!(stats.final_observation.is_some());
        assert_eq!(stats.outcome.exit_reason(), "error");
    }

    #[tokio::test]
    async fn test_transport_failure_aborts() {
        let mut game = Counter::new(100);
        game.fail_at = Some(1);
        let mut agent = Script::ticks(10);
        let stats = run_episode(&mut game, &mut agent, &EpisodeOptions::default()).await;
        assert!(matches!(stats.outcome, EpisodeOutcome::Aborted { ref error } if error.contains("bridge went away")));
        assert_eq!(stats.steps, 1);
    }

    #[tokio::test]
    async fn test_runs_through_trait_objects() {
        let mut game: Box<dyn GameAdapter> = Box::new(Counter::new(3));
        let mut agent: Box<dyn Agent> = Box::new(Script::ticks(3));
        let stats = run_episode(game.as_mut(), agent.as_mut(), &EpisodeOptions::default()).await;
        assert_eq!(stats.outcome, EpisodeOutcome::Done);
    }
}
