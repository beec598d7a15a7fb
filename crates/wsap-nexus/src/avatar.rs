//! Per-agent, per-game embodiments
//!
//! An avatar outlives the agent's session: jacking out leaves it dormant,
//! suspended or destroyed, and a later jack-in can pick it up again.

use crate::bonus::Bonuses;
use crate::error::{NexusError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Live avatars allowed per agent per game unless configured otherwise
pub const DEFAULT_MAX_AVATARS: usize = 3;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AvatarState {
    /// No agent controlling it
    #[default]
    Unbound,
    /// Agent actively controlling
    Bound,
    /// Agent away, avatar persists
    Dormant,
    /// Avatar frozen in time
    Suspended,
    /// Died or despawned
    Destroyed,
}

impl AvatarState {
    pub fn as_str(&self) -> &'static str {
        match self {
            AvatarState::Unbound => "unbound",
            AvatarState::Bound => "bound",
            AvatarState::Dormant => "dormant",
            AvatarState::Suspended => "suspended",
            AvatarState::Destroyed => "destroyed",
        }
    }
}

/// How an agent leaves its avatar
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JackOutMode {
    #[default]
    Dormant,
    Suspend,
    Despawn,
}

impl JackOutMode {
    pub fn resulting_state(self) -> AvatarState {
        match self {
            JackOutMode::Dormant => AvatarState::Dormant,
            JackOutMode::Suspend => AvatarState::Suspended,
            JackOutMode::Despawn => AvatarState::Destroyed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Avatar {
    pub avatar_id: String,
    pub game_id: String,
    /// Set exactly when `state` is `Bound`
    pub bound_agent: Option<String>,
    pub state: AvatarState,
    pub name: String,
    pub position: Vec<f64>,
    #[serde(default)]
    pub appearance: serde_json::Map<String, serde_json::Value>,
    pub health: f64,
    pub max_health: f64,
    #[serde(default)]
    pub inventory: BTreeMap<String, i64>,
    #[serde(default)]
    pub equipment: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
    /// Seconds spent bound
    pub total_playtime: u64,
    pub death_count: u32,
    #[serde(default)]
    pub respawn_point: Option<Vec<f64>>,
}

impl Avatar {
    pub fn new(game_id: impl Into<String>, name: Option<String>) -> Self {
        let avatar_id = Uuid::new_v4().simple().to_string();
        let now = Utc::now();
        Self {
            name: name.unwrap_or_else(|| format!("Avatar_{}", &avatar_id[..8])),
            avatar_id,
            game_id: game_id.into(),
            bound_agent: None,
            state: AvatarState::Unbound,
            position: vec![0.0, 0.0],
            appearance: serde_json::Map::new(),
            health: 100.0,
            max_health: 100.0,
            inventory: BTreeMap::new(),
            equipment: BTreeMap::new(),
            created_at: now,
            last_active: now,
            total_playtime: 0,
            death_count: 0,
            respawn_point: None,
        }
    }

    pub fn is_live(&self) -> bool {
        self.state != AvatarState::Destroyed
    }

    /// Bind an agent; destroyed avatars cannot be re-entered
    pub fn jack_in(&mut self, agent_id: &str) -> Result<()> {
        if self.state == AvatarState::Destroyed {
            return Err(NexusError::AvatarDestroyed(self.avatar_id.clone()));
        }
        self.bound_agent = Some(agent_id.to_string());
        self.state = AvatarState::Bound;
        self.last_active = Utc::now();
        Ok(())
    }

    /// Release control; playtime accrues for the time spent bound
    pub fn jack_out(&mut self, mode: JackOutMode) {
        let now = Utc::now();
        if self.state == AvatarState::Bound {
            let bound_for = (now - self.last_active).num_seconds().max(0) as u64;
            self.total_playtime += bound_for;
        }
        self.bound_agent = None;
        self.state = mode.resulting_state();
        self.last_active = now;
    }

    pub fn to_text(&self) -> String {
        let position = self
            .position
            .iter()
            .map(|p| p.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "Avatar: {} ({})\nState: {}\nHealth: {}/{}\nPosition: ({})\nPlaytime: {}s\nDeaths: {}",
            self.name,
            self.avatar_id,
            self.state.as_str(),
            self.health,
            self.max_health,
            position,
            self.total_playtime,
            self.death_count
        )
    }
}

/// Preferences for creating a new avatar
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AvatarSpec {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub appearance: serde_json::Map<String, serde_json::Value>,
    /// safe, random, specific
    #[serde(default = "default_spawn_location")]
    pub spawn_location: String,
    #[serde(default = "default_loadout")]
    pub starting_loadout: String,
    #[serde(default)]
    pub skill_bonuses: BTreeMap<String, f64>,
}

fn default_spawn_location() -> String {
    "safe".to_string()
}

fn default_loadout() -> String {
    "default".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JackInResult {
    pub success: bool,
    pub avatar: Avatar,
    pub message: String,
    pub bonuses_applied: Bonuses,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JackOutResult {
    pub success: bool,
    pub avatar_state: AvatarState,
    pub message: String,
    pub stats: serde_json::Map<String, serde_json::Value>,
}

/// All avatars one agent has in one game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvatarRoster {
    pub agent_id: String,
    pub game_id: String,
    pub avatars: Vec<Avatar>,
    pub active_avatar_id: Option<String>,
    pub max_avatars: usize,
}

impl AvatarRoster {
    pub fn new(agent_id: &str, game_id: &str, max_avatars: usize) -> Self {
        Self {
            agent_id: agent_id.to_string(),
            game_id: game_id.to_string(),
            avatars: Vec::new(),
            active_avatar_id: None,
            max_avatars,
        }
    }

    pub fn get(&self, avatar_id: &str) -> Option<&Avatar> {
        self.avatars.iter().find(|a| a.avatar_id == avatar_id)
    }

    pub fn get_active(&self) -> Option<&Avatar> {
        self.active_avatar_id.as_deref().and_then(|id| self.get(id))
    }

    pub fn get_dormant(&self) -> Vec<&Avatar> {
        self.avatars
            .iter()
            .filter(|a| a.state == AvatarState::Dormant)
            .collect()
    }

    pub fn live_count(&self) -> usize {
        self.avatars.iter().filter(|a| a.is_live()).count()
    }

    pub fn can_create_new(&self) -> bool {
        self.live_count() < self.max_avatars
    }

    /// Create an avatar, refusing when the live limit is already reached
    pub fn create(&mut self, spec: AvatarSpec) -> Result<&Avatar> {
        if !self.can_create_new() {
            return Err(NexusError::AvatarLimit {
                agent_id: self.agent_id.clone(),
                game_id: self.game_id.clone(),
                max: self.max_avatars,
            });
        }
        let mut avatar = Avatar::new(self.game_id.clone(), spec.name);
        avatar.appearance = spec.appearance;
        self.avatars.push(avatar);
        Ok(&self.avatars[self.avatars.len() - 1])
    }

    /// Bind the agent to the named avatar, or to the active one, or to the
    /// most recently used live avatar. Any other bound avatar goes dormant.
    pub fn jack_in(&mut self, avatar_id: Option<&str>) -> Result<&Avatar> {
        let index = match avatar_id {
            Some(id) => self.avatars.iter().position(|a| a.avatar_id == id),
            None => self
                .active_avatar_id
                .as_deref()
                .and_then(|id| self.avatars.iter().position(|a| a.avatar_id == id && a.is_live()))
                .or_else(|| {
                    self.avatars
                        .iter()
                        .enumerate()
                        .filter(|(_, a)| a.is_live())
                        .max_by_key(|(_, a)| a.last_active)
                        .map(|(i, _)| i)
                }),
        };
        let Some(index) = index else {
            return Err(NexusError::AvatarNotFound {
                agent_id: self.agent_id.clone(),
                game_id: self.game_id.clone(),
            });
        };

        if self.avatars[index].state == AvatarState::Destroyed {
            return Err(NexusError::AvatarDestroyed(self.avatars[index].avatar_id.clone()));
        }
        // One bound avatar per agent: switching parks the previous one
        for (i, other) in self.avatars.iter_mut().enumerate() {
            if i != index && other.state == AvatarState::Bound {
                other.jack_out(JackOutMode::Dormant);
            }
        }

        let agent_id = self.agent_id.clone();
        let avatar = &mut self.avatars[index];
        avatar.jack_in(&agent_id)?;
        self.active_avatar_id = Some(avatar.avatar_id.clone());
        Ok(&self.avatars[index])
    }

    /// Release the active avatar; it stays active unless despawned
    pub fn jack_out(&mut self, mode: JackOutMode) -> Result<&Avatar> {
        let index = self
            .active_avatar_id
            .as_deref()
            .and_then(|id| self.avatars.iter().position(|a| a.avatar_id == id))
            .ok_or_else(|| NexusError::AvatarNotFound {
                agent_id: self.agent_id.clone(),
                game_id: self.game_id.clone(),
            })?;

        self.avatars[index].jack_out(mode);
        if mode == JackOutMode::Despawn {
            self.active_avatar_id = None;
        }
        Ok(&self.avatars[index])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jack_in_and_out_modes() {
        let mut avatar = Avatar::new("crafter", None);
        assert!(avatar.name.starts_with("Avatar_"));

        avatar.jack_in("a1").unwrap();
        assert_eq!(avatar.state, AvatarState::Bound);
        assert_eq!(avatar.bound_agent.as_deref(), Some("a1"));

        avatar.jack_out(JackOutMode::Suspend);
        assert_eq!(avatar.state, AvatarState::Suspended);
        assert!(avatar.bound_agent.is_none());

        avatar.jack_in("a1").unwrap();
        avatar.jack_out(JackOutMode::Despawn);
        assert_eq!(avatar.state, AvatarState::Destroyed);
        assert!(matches!(
            avatar.jack_in("a1"),
            Err(NexusError::AvatarDestroyed(_))
        ));
        assert!(avatar.bound_agent.is_none());
    }

    #[test]
    fn test_capacity_is_enforced_at_creation() {
        let mut roster = AvatarRoster::new("a1", "crafter", 2);
        roster.create(AvatarSpec::default()).unwrap();
        roster.create(AvatarSpec::default()).unwrap();
        assert!(!roster.can_create_new());
        assert!(matches!(
            roster.create(AvatarSpec::default()),
            Err(NexusError::AvatarLimit { max: 2, .. })
        ));

        // Destroying one frees a slot
        roster.jack_in(None).unwrap();
        roster.jack_out(JackOutMode::Despawn).unwrap();
        assert!(roster.can_create_new());
        roster.create(AvatarSpec::default()).unwrap();
        assert_eq!(roster.live_count(), 2);
        assert_eq!(roster.avatars.len(), 3);
    }

    #[test]
    fn test_roster_reenters_dormant_avatar() {
        let mut roster = AvatarRoster::new("a1", "crafter", DEFAULT_MAX_AVATARS);
        let id = roster
            .create(AvatarSpec {
                name: Some("Scout".into()),
                ..Default::default()
            })
            .unwrap()
            .avatar_id
            .clone();

        roster.jack_in(None).unwrap();
        roster.jack_out(JackOutMode::Dormant).unwrap();
        assert_eq!(roster.get_dormant().len(), 1);

        let avatar = roster.jack_in(None).unwrap();
        assert_eq!(avatar.avatar_id, id);
        assert_eq!(avatar.name, "Scout");
        assert_eq!(roster.get_active().map(|a| a.state), Some(AvatarState::Bound));
    }

    #[test]
    fn test_switching_avatars_releases_the_previous_one() {
        let mut roster = AvatarRoster::new("a1", "crafter", DEFAULT_MAX_AVATARS);
        let first = roster.create(AvatarSpec::default()).unwrap().avatar_id.clone();
        let second = roster.create(AvatarSpec::default()).unwrap().avatar_id.clone();

        roster.jack_in(Some(&first)).unwrap();
        roster.jack_in(Some(&second)).unwrap();
        let previous = roster.get(&first).unwrap();
        assert_eq!(previous.state, AvatarState::Dormant);
        assert!(previous.bound_agent.is_none());
        assert_eq!(
            roster.avatars.iter().filter(|a| a.state == AvatarState::Bound).count(),
            1
        );

        roster.jack_out(JackOutMode::Dormant).unwrap();
        assert!(roster.avatars.iter().all(|a| a.bound_agent.is_none()));
    }

    #[test]
    fn test_switch_to_destroyed_avatar_keeps_current_binding() {
        let mut roster = AvatarRoster::new("a1", "crafter", DEFAULT_MAX_AVATARS);
        let first = roster.create(AvatarSpec::default()).unwrap().avatar_id.clone();
        let second = roster.create(AvatarSpec::default()).unwrap().avatar_id.clone();
        roster.jack_in(Some(&second)).unwrap();
        roster.jack_out(JackOutMode::Despawn).unwrap();

        roster.jack_in(Some(&first)).unwrap();
        assert!(matches!(
            roster.jack_in(Some(&second)),
            Err(NexusError::AvatarDestroyed(_))
        ));
        assert_eq!(roster.get(&first).unwrap().state, AvatarState::Bound);
    }

    #[test]
    fn test_jack_in_without_avatars_fails() {
        let mut roster = AvatarRoster::new("a1", "crafter", DEFAULT_MAX_AVATARS);
        assert!(matches!(
            roster.jack_in(None),
            Err(NexusError::AvatarNotFound { .. })
        ));
        tokio_test::assert_err!(roster.jack_out(JackOutMode::Dormant));
    }
}
