//! Multiverse controller: moves one agent between games through the Nexus

use crate::adapter::GameAdapter;
use crate::agent::Agent;
use crate::backend::GenerationBackend;
use crate::episode::{EpisodeOptions, run_episode};
use crate::reply::decode_reply;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};
use wsap_core::{ActionDef, ActionSpace, ParamDef, Result, WsapError};
use wsap_nexus::identity::Skills;
use wsap_nexus::{NexusClient, StatsUpdate};

/// Name of the action that leaves the current game
pub const EXIT_ACTION: &str = "exit_game";

const CHOOSER_SYSTEM: &str = "You are an AI agent navigating a multiverse of games.\n\
Choose a game to enter based on your skills and what you want to learn.\n\
Always respond with JSON: {\"action\": \"enter_game\", \"params\": {\"game_id\": \"...\"}, \"reasoning\": \"...\"}";

/// Builds a fresh adapter for a game the controller just entered
pub type AdapterFactory = Box<dyn Fn() -> Result<Box<dyn GameAdapter>> + Send + Sync>;

/// Skill gained per 100 steps played, by game
#[derive(Debug, Clone, PartialEq)]
pub struct SkillGainTable {
    rates: BTreeMap<String, Vec<(String, f64)>>,
}

impl Default for SkillGainTable {
    fn default() -> Self {
        Self::empty()
            .with_rate("crafter", "survival", 0.01)
            .with_rate("crafter", "resource_management", 0.01)
            .with_rate("starbound", "exploration", 0.01)
            .with_rate("starbound", "combat", 0.005)
    }
}

impl SkillGainTable {
    pub fn empty() -> Self {
        Self {
            rates: BTreeMap::new(),
        }
    }

    pub fn with_rate(mut self, game_id: &str, domain: &str, per_hundred_steps: f64) -> Self {
        self.rates
            .entry(game_id.to_string())
            .or_default()
            .push((domain.to_string(), per_hundred_steps));
        self
    }

    /// `rate * steps / 100` for every domain the game trains
    pub fn gains(&self, game_id: &str, steps: u64) -> Skills {
        self.rates
            .get(game_id)
            .into_iter()
            .flatten()
            .map(|(domain, rate)| (domain.clone(), rate * steps as f64 / 100.0))
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct ControllerOptions {
    /// Steps across all games
    pub max_total_steps: u64,
    pub max_games: u32,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            max_total_steps: 500,
            max_games: 5,
        }
    }
}

/// One stay in one game
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameVisit {
    pub game_id: String,
    pub steps: u64,
    pub reward: f64,
    pub achievements: Vec<String>,
    pub exit_reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ControllerReport {
    pub total_steps: u64,
    pub games_played: u32,
    pub visits: Vec<GameVisit>,
}

pub struct MultiverseController {
    nexus: NexusClient,
    agent_id: String,
    name: String,
    chooser: Arc<dyn GenerationBackend>,
    agent: Box<dyn Agent>,
    adapters: BTreeMap<String, AdapterFactory>,
    skill_gains: SkillGainTable,
    options: ControllerOptions,
}

impl MultiverseController {
    /// `chooser` picks games from the Nexus view; `agent` plays inside them
    pub fn new(
        nexus: NexusClient,
        agent_id: impl Into<String>,
        name: impl Into<String>,
        chooser: Arc<dyn GenerationBackend>,
        agent: Box<dyn Agent>,
    ) -> Self {
        Self {
            nexus,
            agent_id: agent_id.into(),
            name: name.into(),
            chooser,
            agent,
            adapters: BTreeMap::new(),
            skill_gains: SkillGainTable::default(),
            options: ControllerOptions::default(),
        }
    }

    pub fn with_adapter(mut self, game_id: &str, factory: AdapterFactory) -> Self {
        self.adapters.insert(game_id.to_string(), factory);
        self
    }

    pub fn with_skill_gains(mut self, table: SkillGainTable) -> Self {
        self.skill_gains = table;
        self
    }

    pub fn with_options(mut self, options: ControllerOptions) -> Self {
        self.options = options;
        self
    }

    /// Navigate between games until a bound is hit or no game is chosen.
    ///
    /// Fails only if the Nexus cannot be reached at all.
    pub async fn run(&mut self) -> Result<ControllerReport> {
        let identity = self.nexus.register_agent(&self.agent_id, &self.name).await?;
        info!(
            agent_id = %identity.agent_id,
            total_steps = identity.total_steps,
            games_visited = identity.games_visited.len(),
            "registered with nexus"
        );

        let mut report = ControllerReport::default();
        while report.total_steps < self.options.max_total_steps && report.games_played < self.options.max_games {
            let Some(game_id) = self.choose_game().await? else {
                info!("no game chosen, leaving the multiverse");
                break;
            };

            match self.nexus.enter_game(&self.agent_id, &game_id, &[]).await {
                Ok(grant) => {
                    info!(%game_id, session_id = %grant.session_id, bonuses = ?grant.bonuses, "entered game");
                }
                Err(WsapError::Nexus(reason)) => {
                    warn!(%game_id, %reason, "nexus refused entry");
                    report.games_played += 1;
                    continue;
                }
                Err(err) => return Err(err),
            }
            report.games_played += 1;

            let remaining = self.options.max_total_steps - report.total_steps;
            let visit = self.play(&game_id, remaining).await;
            report.total_steps += visit.steps;
            report.visits.push(visit);
        }

        info!(
            total_steps = report.total_steps,
            games_played = report.games_played,
            "session complete"
        );
        Ok(report)
    }

    /// Ask the chooser for a game; `None` when nothing usable was chosen
    pub async fn choose_game(&self) -> Result<Option<String>> {
        let observation = self.nexus.get_nexus_observation(&self.agent_id).await?;
        let available: Vec<String> = observation
            .available_games
            .iter()
            .filter(|g| g.is_available())
            .map(|g| g.id.clone())
            .collect();
        if available.is_empty() {
            return Ok(None);
        }

        let mut game_param = ParamDef::new("game_id", "Game to enter");
        game_param.options = Some(available.clone());
        let space = ActionSpace::new(vec![
            ActionDef::new("enter_game", "Enter a game world").param(game_param),
        ])?;

        let reply = self.chooser.generate(CHOOSER_SYSTEM, &observation.to_text()).await?;
        let action = match decode_reply(&reply, &space) {
            Ok(action) => action,
            Err(err) if err.is_protocol_violation() => {
                warn!(error = %err, "could not decode game choice");
                return Ok(None);
            }
            Err(err) => return Err(err),
        };

        let chosen = action.parameters.get("game_id").and_then(|v| v.as_str());
        match chosen {
            Some(game_id) if available.iter().any(|g| g == game_id) => {
                info!(%game_id, reasoning = ?action.reasoning, "chose game");
                Ok(Some(game_id.to_string()))
            }
            other => {
                warn!(chosen = ?other, ?available, "chose a game that is not available");
                Ok(None)
            }
        }
    }

    async fn play(&mut self, game_id: &str, max_steps: u64) -> GameVisit {
        let mut visit = GameVisit {
            game_id: game_id.to_string(),
            steps: 0,
            reward: 0.0,
            achievements: Vec::new(),
            exit_reason: "error".to_string(),
        };

        let adapter = match self.adapters.get(game_id) {
            Some(factory) => factory(),
            None => Err(WsapError::Game(format!("No adapter for game: {}", game_id))),
        };

        match adapter {
            Ok(mut adapter) => {
                let options = EpisodeOptions {
                    max_steps,
                    reset_on_start: false,
                    exit_action: Some(ActionDef::new(
                        EXIT_ACTION,
                        "Leave this game and return to the Nexus (when you have learned enough, are stuck, or want a different game)",
                    )
                    .category("meta")),
                    ..EpisodeOptions::default()
                };
                let stats = run_episode(adapter.as_mut(), self.agent.as_mut(), &options).await;
                if let Err(err) = adapter.close().await {
                    warn!(%game_id, error = %err, "adapter close failed");
                }

                visit.steps = stats.steps;
                visit.reward = stats.total_reward;
                visit.achievements = stats.achievements;
                visit.exit_reason = stats.outcome.exit_reason();
            }
            Err(err) => warn!(%game_id, error = %err, "could not start game"),
        }

        let update = StatsUpdate {
            steps: visit.steps,
            reward: visit.reward,
            achievements: visit.achievements.clone(),
            skills: self.skill_gains.gains(game_id, visit.steps),
        };
        match self
            .nexus
            .exit_game(&self.agent_id, game_id, &visit.exit_reason, Some(&update))
            .await
        {
            Ok(summary) => info!(
                %game_id,
                reason = %visit.exit_reason,
                steps = visit.steps,
                total_steps = summary.transit_package.total_steps,
                "returned to nexus"
            ),
            Err(err) => warn!(%game_id, error = %err, "could not report exit to nexus"),
        }
        visit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_skill_gains() {
        let table = SkillGainTable::default();
        let gains = table.gains("crafter", 200);
        assert_eq!(gains.len(), 2);
        assert!((gains["survival"] - 0.02).abs() < 1e-12);
        assert!((gains["resource_management"] - 0.02).abs() < 1e-12);

        let gains = table.gains("starbound", 100);
        assert!((gains["combat"] - 0.005).abs() < 1e-12);
        assert!((gains["exploration"] - 0.01).abs() < 1e-12);

        assert!(table.gains("tetris", 1000).is_empty());
    }
}
