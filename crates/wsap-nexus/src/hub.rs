//! The hub: game registry, identity store, transit sessions and avatars
//!
//! All state lives in one `HubState` behind one lock. Every mutation takes the
//! write lock for its whole duration, so readers never see a session without its
//! `active_sessions` entry and `active_agents` count.

use crate::avatar::{
    Avatar, AvatarRoster, AvatarSpec, DEFAULT_MAX_AVATARS, JackInResult, JackOutMode,
    JackOutResult,
};
use crate::bonus::{BonusTable, Bonuses};
use crate::error::{NexusError, Result, TransitDenied};
use crate::game::{GameInfo, GameStatus};
use crate::identity::{
    Achievement, AgentIdentity, Difficulty, EntryPackage, SpawnPreference, StatsUpdate,
    TransitPackage, percent,
};
use crate::meta_goal::{MetaGoal, MetaGoalProgress, catalog};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Skill level a domain must exceed to count toward a suggestion
const SUGGESTION_SKILL_FLOOR: f64 = 0.3;
/// Score added for games the agent has never visited
const UNVISITED_BONUS: f64 = 0.5;
const MAX_SUGGESTIONS: usize = 3;

/// An agent's stay in one game, from transit in to transit out
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub session_id: String,
    pub agent_id: String,
    pub game_id: String,
    pub started_at: DateTime<Utc>,
    /// Refreshed by stat updates; drives expiry
    pub last_active: DateTime<Utc>,
    pub goals: Vec<String>,
    pub spawn_preference: SpawnPreference,
    pub difficulty: Difficulty,
    pub bonuses: Bonuses,
}

/// Successful transit into a game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitGrant {
    pub success: bool,
    pub session_id: String,
    pub bridge_url: Option<String>,
    pub bonuses: Bonuses,
}

/// A game ranked for an agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub game_id: String,
    pub game_name: String,
    pub score: f64,
    pub reasons: Vec<String>,
}

/// What an agent sees while between games
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NexusObservation {
    pub agent: AgentIdentity,
    pub available_games: Vec<GameInfo>,
    pub suggested_games: Vec<Suggestion>,
    pub meta_goals: Vec<MetaGoalProgress>,
}

impl NexusObservation {
    /// Prompt text for choosing the next game
    pub fn to_text(&self) -> String {
        let skills = self
            .agent
            .top_skills(3)
            .into_iter()
            .filter(|(_, level)| *level > 0.0)
            .map(|(name, level)| format!("{}: {}", name, percent(level)))
            .collect::<Vec<_>>()
            .join(", ");

        let mut text = String::new();
        let _ = writeln!(text, "=== NEXUS ===");
        let _ = writeln!(text, "Welcome back, {}.", self.agent.name);
        let _ = writeln!(text);
        let _ = writeln!(text, "YOUR STATS:");
        let _ = writeln!(
            text,
            "- Total experience: {} steps across {} games",
            self.agent.total_steps,
            self.agent.games_visited.len()
        );
        let _ = writeln!(text, "- Top skills: {}", skills);
        let _ = writeln!(text, "- Achievements: {}", self.agent.achievements.len());
        let _ = writeln!(text);
        let _ = writeln!(text, "AVAILABLE GAMES:");
        for game in &self.available_games {
            let status = if game.is_available() {
                "[READY]".to_string()
            } else {
                format!("[{}]", game.status.as_str().to_uppercase())
            };
            let _ = writeln!(text, "- {} ({}) {}", game.name, game.id, status);
            let _ = writeln!(text, "  {}", game.description);
        }

        if !self.suggested_games.is_empty() {
            let _ = writeln!(text);
            let _ = writeln!(text, "SUGGESTED FOR YOU:");
            for s in &self.suggested_games {
                let _ = writeln!(text, "- {}: {}", s.game_name, s.reasons.join(", "));
            }
        }

        let open_goals: Vec<_> = self.meta_goals.iter().filter(|g| !g.completed).collect();
        if !open_goals.is_empty() {
            let _ = writeln!(text);
            let _ = writeln!(text, "META GOALS:");
            for g in open_goals {
                let _ = writeln!(text, "- {} ({})", g.description, percent(g.progress));
            }
        }

        let _ = writeln!(text);
        let _ = writeln!(text, "COMMANDS:");
        let _ = writeln!(text, "- enter_game <id>: Enter a game world");
        let _ = writeln!(text);
        let _ = write!(text, "What would you like to do?");
        text
    }
}

#[derive(Default)]
struct HubState {
    games: BTreeMap<String, GameInfo>,
    agents: HashMap<String, AgentIdentity>,
    /// agent_id -> session_id; at most one per agent
    active_sessions: HashMap<String, String>,
    sessions: HashMap<String, Session>,
    rosters: HashMap<(String, String), AvatarRoster>,
}

impl HubState {
    fn active_session(&self, agent_id: &str) -> Option<&Session> {
        self.active_sessions
            .get(agent_id)
            .and_then(|id| self.sessions.get(id))
    }

    /// Fold stats into an identity, tagging achievements with `game_id`
    fn apply_stats(&mut self, agent_id: &str, game_id: &str, update: &StatsUpdate) -> bool {
        if let Some(session_id) = self.active_sessions.get(agent_id).cloned() {
            if let Some(session) = self.sessions.get_mut(&session_id) {
                session.last_active = Utc::now();
            }
        }

        let Some(identity) = self.agents.get_mut(agent_id) else {
            warn!(agent_id, "Stats update for unknown agent ignored");
            return false;
        };

        identity.total_steps = identity.total_steps.saturating_add(update.steps);
        if update.reward.is_finite() {
            identity.total_reward += update.reward;
        }
        for (domain, delta) in &update.skills {
            identity.update_skill(domain, *delta);
        }
        for name in &update.achievements {
            identity.achievements.push(Achievement::earned(game_id, name));
        }
        debug!(
            agent_id,
            game_id,
            steps = update.steps,
            achievements = update.achievements.len(),
            "Updated agent stats"
        );
        true
    }

    fn transit_out(&mut self, agent_id: &str, game_id: &str, reason: &str) -> Result<TransitPackage> {
        let identity = self
            .agents
            .get_mut(agent_id)
            .ok_or_else(|| NexusError::UnknownAgent(agent_id.to_string()))?;

        identity.add_game_visit(game_id);
        let package = TransitPackage::snapshot(identity, game_id, reason);

        let session_game = self
            .active_session(agent_id)
            .map(|s| s.game_id.clone());
        match session_game {
            Some(active) if active == game_id => {
                if let Some(session_id) = self.active_sessions.remove(agent_id) {
                    self.sessions.remove(&session_id);
                }
                if let Some(game) = self.games.get_mut(game_id) {
                    game.active_agents = game.active_agents.saturating_sub(1);
                }
            }
            Some(active) => {
                warn!(agent_id, game_id, active_game = %active, "Transit out of a game the agent is not in; session kept");
            }
            None => {
                debug!(agent_id, game_id, "Transit out without an active session");
            }
        }

        info!(agent_id, game_id, reason, "Agent exited game");
        Ok(package)
    }

    fn suggest_games(&self, identity: &AgentIdentity) -> Vec<Suggestion> {
        let mut suggestions: Vec<Suggestion> = self
            .games
            .values()
            .filter(|g| g.is_available())
            .filter_map(|game| {
                let mut score = 0.0;
                let mut reasons = Vec::new();
                for domain in &game.skill_domains {
                    let level = identity.skill(domain);
                    if level > SUGGESTION_SKILL_FLOOR {
                        score += level;
                        reasons.push(format!(
                            "Your {} skill ({}) would help",
                            domain,
                            percent(level)
                        ));
                    }
                }
                if !identity.has_visited(&game.id) {
                    score += UNVISITED_BONUS;
                    reasons.push("You haven't tried this game yet".to_string());
                }
                (score > 0.0).then(|| Suggestion {
                    game_id: game.id.clone(),
                    game_name: game.name.clone(),
                    score,
                    reasons,
                })
            })
            .collect();

        // Stable sort: equal scores keep game id order
        suggestions.sort_by(|a, b| b.score.total_cmp(&a.score));
        suggestions.truncate(MAX_SUGGESTIONS);
        suggestions
    }
}

/// The multiverse hub
pub struct Nexus {
    state: RwLock<HubState>,
    bonuses: BonusTable,
    meta_goals: Vec<MetaGoal>,
    max_avatars: usize,
}

impl Default for Nexus {
    fn default() -> Self {
        Self::new(BonusTable::default())
    }
}

impl Nexus {
    pub fn new(bonuses: BonusTable) -> Self {
        Self {
            state: RwLock::new(HubState::default()),
            bonuses,
            meta_goals: catalog(),
            max_avatars: DEFAULT_MAX_AVATARS,
        }
    }

    pub fn with_max_avatars(mut self, max_avatars: usize) -> Self {
        self.max_avatars = max_avatars;
        self
    }

    // ---- games ----

    /// Add or replace a game; an existing game keeps its `active_agents` count
    pub async fn register_game(&self, mut info: GameInfo) {
        let mut state = self.state.write().await;
        if let Some(existing) = state.games.get(&info.id) {
            info.active_agents = existing.active_agents;
        }
        info!(game_id = %info.id, name = %info.name, status = info.status.as_str(), "Registered game");
        state.games.insert(info.id.clone(), info);
    }

    pub async fn unregister_game(&self, game_id: &str) -> Option<GameInfo> {
        let removed = self.state.write().await.games.remove(game_id);
        if removed.is_some() {
            info!(game_id, "Unregistered game");
        }
        removed
    }

    pub async fn set_game_status(&self, game_id: &str, status: GameStatus) -> Result<()> {
        let mut state = self.state.write().await;
        let game = state
            .games
            .get_mut(game_id)
            .ok_or_else(|| NexusError::UnknownGame(game_id.to_string()))?;
        game.status = status;
        info!(game_id, status = status.as_str(), "Game status changed");
        Ok(())
    }

    pub async fn list_games(&self) -> Vec<GameInfo> {
        self.state.read().await.games.values().cloned().collect()
    }

    pub async fn get_game(&self, game_id: &str) -> Option<GameInfo> {
        self.state.read().await.games.get(game_id).cloned()
    }

    // ---- agents ----

    /// Return the existing identity or create a fresh one; never resets progress
    pub async fn register_agent(&self, agent_id: &str, name: &str) -> AgentIdentity {
        let mut state = self.state.write().await;
        if let Some(existing) = state.agents.get(agent_id) {
            debug!(agent_id, "Agent already registered");
            return existing.clone();
        }
        let identity = AgentIdentity::new(agent_id, name);
        state.agents.insert(agent_id.to_string(), identity.clone());
        info!(agent_id, name, "Registered agent");
        identity
    }

    pub async fn get_agent(&self, agent_id: &str) -> Option<AgentIdentity> {
        self.state.read().await.agents.get(agent_id).cloned()
    }

    /// Fold gameplay stats into an identity; false when the agent is unknown
    pub async fn update_agent_stats(&self, agent_id: &str, update: &StatsUpdate) -> bool {
        let mut state = self.state.write().await;
        let game_id = state
            .active_session(agent_id)
            .map(|s| s.game_id.clone())
            .unwrap_or_else(|| "unknown".to_string());
        state.apply_stats(agent_id, &game_id, update)
    }

    // ---- transit ----

    /// Enter a game; refusals are routine and returned as `TransitDenied`
    pub async fn transit_in(&self, entry: EntryPackage) -> std::result::Result<TransitGrant, TransitDenied> {
        let mut state = self.state.write().await;

        let game = state
            .games
            .get(&entry.game_id)
            .ok_or_else(|| TransitDenied::UnknownGame(entry.game_id.clone()))?;
        if !game.is_available() {
            return Err(TransitDenied::GameUnavailable {
                game_id: entry.game_id.clone(),
                status: game.status,
            });
        }
        let bridge_url = game.bridge_url.clone();

        let identity = state
            .agents
            .get(&entry.agent_id)
            .ok_or_else(|| TransitDenied::UnknownAgent(entry.agent_id.clone()))?;
        if let Some(active) = state.active_session(&entry.agent_id) {
            return Err(TransitDenied::AlreadyInGame {
                agent_id: entry.agent_id.clone(),
                game_id: active.game_id.clone(),
            });
        }

        let bonuses = self.bonuses.compute(&identity.skills, &entry.game_id);
        let session_id = format!(
            "sess_{}_{}_{}",
            entry.agent_id,
            entry.game_id,
            &Uuid::new_v4().simple().to_string()[..8]
        );
        let now = Utc::now();
        let session = Session {
            session_id: session_id.clone(),
            agent_id: entry.agent_id.clone(),
            game_id: entry.game_id.clone(),
            started_at: now,
            last_active: now,
            goals: entry.goals,
            spawn_preference: entry.spawn_preference,
            difficulty: entry.difficulty,
            bonuses: bonuses.clone(),
        };

        state.sessions.insert(session_id.clone(), session);
        state
            .active_sessions
            .insert(entry.agent_id.clone(), session_id.clone());
        if let Some(game) = state.games.get_mut(&entry.game_id) {
            game.active_agents += 1;
        }

        info!(
            agent_id = %entry.agent_id,
            game_id = %entry.game_id,
            session_id = %session_id,
            bonuses = bonuses.len(),
            "Agent entered game"
        );
        Ok(TransitGrant {
            success: true,
            session_id,
            bridge_url,
            bonuses,
        })
    }

    /// Leave a game. An unknown agent is caller misuse and an error.
    pub async fn transit_out(&self, agent_id: &str, game_id: &str, reason: &str) -> Result<TransitPackage> {
        self.state.write().await.transit_out(agent_id, game_id, reason)
    }

    /// Report final stats and leave `game_id` as one step; achievements are
    /// tagged with the game being left
    pub async fn exit_game(
        &self,
        agent_id: &str,
        game_id: &str,
        reason: &str,
        stats: Option<&StatsUpdate>,
    ) -> Result<TransitPackage> {
        let mut state = self.state.write().await;
        if !state.agents.contains_key(agent_id) {
            return Err(NexusError::UnknownAgent(agent_id.to_string()));
        }
        if let Some(update) = stats {
            state.apply_stats(agent_id, game_id, update);
        }
        state.transit_out(agent_id, game_id, reason)
    }

    /// Game the agent currently holds a session in
    pub async fn active_game(&self, agent_id: &str) -> Option<String> {
        self.state
            .read()
            .await
            .active_session(agent_id)
            .map(|s| s.game_id.clone())
    }

    pub async fn active_session(&self, agent_id: &str) -> Option<Session> {
        self.state.read().await.active_session(agent_id).cloned()
    }

    pub async fn session_count(&self) -> usize {
        self.state.read().await.sessions.len()
    }

    /// Transit out every session idle for longer than `max_age`
    pub async fn expire_sessions(&self, max_age: Duration) -> Vec<TransitPackage> {
        let Ok(max_age) = chrono::Duration::from_std(max_age) else {
            return Vec::new();
        };
        let cutoff = Utc::now() - max_age;

        let mut state = self.state.write().await;
        let stale: Vec<(String, String)> = state
            .sessions
            .values()
            .filter(|s| s.last_active < cutoff)
            .map(|s| (s.agent_id.clone(), s.game_id.clone()))
            .collect();

        let mut expired = Vec::with_capacity(stale.len());
        for (agent_id, game_id) in stale {
            match state.transit_out(&agent_id, &game_id, "expired") {
                Ok(package) => {
                    info!(agent_id = %agent_id, game_id = %game_id, "Session expired");
                    expired.push(package);
                }
                Err(e) => warn!(agent_id = %agent_id, error = %e, "Could not expire session"),
            }
        }
        expired
    }

    // ---- observation ----

    pub async fn get_nexus_observation(&self, agent_id: &str) -> Option<NexusObservation> {
        let state = self.state.read().await;
        let identity = state.agents.get(agent_id)?;
        let games: Vec<GameInfo> = state.games.values().cloned().collect();
        let meta_goals = self
            .meta_goals
            .iter()
            .map(|g| g.evaluate(identity, &games))
            .collect();

        Some(NexusObservation {
            agent: identity.clone(),
            suggested_games: state.suggest_games(identity),
            available_games: games,
            meta_goals,
        })
    }

    // ---- avatars ----

    /// Create an avatar; the live-avatar limit is checked under the same lock
    pub async fn create_avatar(&self, agent_id: &str, game_id: &str, spec: AvatarSpec) -> Result<Avatar> {
        let mut state = self.state.write().await;
        if !state.agents.contains_key(agent_id) {
            return Err(NexusError::UnknownAgent(agent_id.to_string()));
        }
        if !state.games.contains_key(game_id) {
            return Err(NexusError::UnknownGame(game_id.to_string()));
        }
        let max = self.max_avatars;
        let roster = state
            .rosters
            .entry((agent_id.to_string(), game_id.to_string()))
            .or_insert_with(|| AvatarRoster::new(agent_id, game_id, max));
        let avatar = roster.create(spec)?.clone();
        info!(agent_id, game_id, avatar_id = %avatar.avatar_id, "Created avatar");
        Ok(avatar)
    }

    /// Bind the agent to an avatar, creating one when it has none alive
    pub async fn jack_in(&self, agent_id: &str, game_id: &str, avatar_id: Option<&str>) -> Result<JackInResult> {
        let mut state = self.state.write().await;
        let skills = state
            .agents
            .get(agent_id)
            .map(|a| a.skills.clone())
            .ok_or_else(|| NexusError::UnknownAgent(agent_id.to_string()))?;
        if !state.games.contains_key(game_id) {
            return Err(NexusError::UnknownGame(game_id.to_string()));
        }

        let max = self.max_avatars;
        let roster = state
            .rosters
            .entry((agent_id.to_string(), game_id.to_string()))
            .or_insert_with(|| AvatarRoster::new(agent_id, game_id, max));

        let created = avatar_id.is_none() && roster.live_count() == 0;
        if created {
            roster.create(AvatarSpec::default())?;
        }
        let avatar = roster.jack_in(avatar_id)?.clone();

        let message = if created {
            format!("Created and jacked into {}", avatar.name)
        } else {
            format!("Jacked into {}", avatar.name)
        };
        info!(agent_id, game_id, avatar_id = %avatar.avatar_id, created, "Jacked in");
        Ok(JackInResult {
            success: true,
            avatar,
            message,
            bonuses_applied: self.bonuses.compute(&skills, game_id),
        })
    }

    pub async fn jack_out(&self, agent_id: &str, game_id: &str, mode: JackOutMode) -> Result<JackOutResult> {
        let mut state = self.state.write().await;
        let roster = state
            .rosters
            .get_mut(&(agent_id.to_string(), game_id.to_string()))
            .ok_or_else(|| NexusError::AvatarNotFound {
                agent_id: agent_id.to_string(),
                game_id: game_id.to_string(),
            })?;
        let avatar = roster.jack_out(mode)?;

        let mut stats = serde_json::Map::new();
        stats.insert("total_playtime".into(), avatar.total_playtime.into());
        stats.insert("death_count".into(), avatar.death_count.into());
        stats.insert("health".into(), avatar.health.into());

        info!(agent_id, game_id, avatar_id = %avatar.avatar_id, state = avatar.state.as_str(), "Jacked out");
        Ok(JackOutResult {
            success: true,
            avatar_state: avatar.state,
            message: format!("{} is now {}", avatar.name, avatar.state.as_str()),
            stats,
        })
    }

    pub async fn roster(&self, agent_id: &str, game_id: &str) -> Option<AvatarRoster> {
        self.state
            .read()
            .await
            .rosters
            .get(&(agent_id.to_string(), game_id.to_string()))
            .cloned()
    }
}
