//! Persistent agent identity and the packages exchanged at transit

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Skill domains every identity starts with, all at 0.0
pub const SKILL_DOMAINS: [&str; 9] = [
    "exploration",
    "resource_management",
    "combat",
    "crafting",
    "survival",
    "social",
    "puzzle_solving",
    "planning",
    "adaptation",
];

/// Skill levels by domain, each in [0, 1]
pub type Skills = BTreeMap<String, f64>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    #[default]
    Common,
    Uncommon,
    Rare,
    Legendary,
}

/// An achievement earned in some game, kept across games
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Achievement {
    /// `{game_origin}:{name}`
    pub id: String,
    pub name: String,
    pub description: String,
    pub game_origin: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub rarity: Rarity,
}

impl Achievement {
    pub fn earned(game_origin: &str, name: &str) -> Self {
        Self {
            id: format!("{}:{}", game_origin, name),
            name: name.to_string(),
            description: name.to_string(),
            game_origin: game_origin.to_string(),
            timestamp: Utc::now(),
            rarity: Rarity::Common,
        }
    }
}

/// Item in abstract form for cross-game transfer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortableItem {
    /// weapon, tool, material, consumable
    pub category: String,
    /// 1-10 power level
    pub tier: u8,
    #[serde(default)]
    pub properties: serde_json::Map<String, serde_json::Value>,
    /// `game:item_name`
    #[serde(default)]
    pub origin: String,
    /// Target game id to suggested local equivalent
    #[serde(default)]
    pub equivalence_hints: BTreeMap<String, String>,
}

/// Identity that follows an agent across games
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentIdentity {
    pub agent_id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub total_steps: u64,
    #[serde(default)]
    pub total_reward: f64,
    pub games_visited: Vec<String>,
    pub achievements: Vec<Achievement>,
    pub skills: Skills,
    #[serde(default)]
    pub carried_items: Vec<PortableItem>,
    #[serde(default)]
    pub carried_currency: BTreeMap<String, i64>,
    #[serde(default)]
    pub core_memories: Vec<String>,
    #[serde(default)]
    pub strategies: Vec<String>,
    #[serde(default)]
    pub meta_goals: Vec<String>,
}

impl AgentIdentity {
    pub fn new(agent_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            name: name.into(),
            created_at: Utc::now(),
            total_steps: 0,
            total_reward: 0.0,
            games_visited: Vec::new(),
            achievements: Vec::new(),
            skills: SKILL_DOMAINS.iter().map(|d| (d.to_string(), 0.0)).collect(),
            carried_items: Vec::new(),
            carried_currency: BTreeMap::new(),
            core_memories: Vec::new(),
            strategies: Vec::new(),
            meta_goals: Vec::new(),
        }
    }

    pub fn add_game_visit(&mut self, game_id: &str) {
        if !self.has_visited(game_id) {
            self.games_visited.push(game_id.to_string());
        }
    }

    pub fn has_visited(&self, game_id: &str) -> bool {
        self.games_visited.iter().any(|g| g == game_id)
    }

    pub fn skill(&self, domain: &str) -> f64 {
        self.skills.get(domain).copied().unwrap_or(0.0)
    }

    /// Apply a delta and clamp to [0, 1]; unknown domains start at 0.0
    pub fn update_skill(&mut self, domain: &str, delta: f64) {
        if !delta.is_finite() {
            return;
        }
        let level = self.skills.entry(domain.to_string()).or_insert(0.0);
        *level = (*level + delta).clamp(0.0, 1.0);
    }

    /// Highest skills first; equal levels keep domain name order
    pub fn top_skills(&self, n: usize) -> Vec<(&str, f64)> {
        let mut ranked: Vec<(&str, f64)> = self
            .skills
            .iter()
            .map(|(name, level)| (name.as_str(), *level))
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked.truncate(n);
        ranked
    }

    pub fn to_text(&self) -> String {
        let skills = self
            .top_skills(3)
            .iter()
            .map(|(name, level)| format!("{}: {}", name, percent(*level)))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "Agent: {} ({})\nExperience: {} steps across {} games\nTop Skills: {}\nAchievements: {}",
            self.name,
            self.agent_id,
            self.total_steps,
            self.games_visited.len(),
            skills,
            self.achievements.len()
        )
    }
}

/// Render a [0, 1] level as a whole percentage
pub fn percent(level: f64) -> String {
    format!("{:.0}%", level * 100.0)
}

/// Stats reported by a controller when it leaves a game
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsUpdate {
    #[serde(default)]
    pub steps: u64,
    #[serde(default)]
    pub reward: f64,
    #[serde(default)]
    pub achievements: Vec<String>,
    /// Skill deltas by domain
    #[serde(default)]
    pub skills: Skills,
}

/// Snapshot of an identity taken when an agent leaves a game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitPackage {
    pub agent_id: String,
    pub agent_name: String,
    pub total_steps: u64,
    pub games_visited: Vec<String>,
    pub achievements: Vec<Achievement>,
    pub skills: Skills,
    pub carried_items: Vec<PortableItem>,
    pub carried_currency: BTreeMap<String, i64>,
    pub core_memories: Vec<String>,
    pub strategies: Vec<String>,
    pub origin_game: String,
    pub exit_reason: String,
    pub timestamp: DateTime<Utc>,
}

impl TransitPackage {
    pub fn snapshot(identity: &AgentIdentity, origin_game: &str, exit_reason: &str) -> Self {
        Self {
            agent_id: identity.agent_id.clone(),
            agent_name: identity.name.clone(),
            total_steps: identity.total_steps,
            games_visited: identity.games_visited.clone(),
            achievements: identity.achievements.clone(),
            skills: identity.skills.clone(),
            carried_items: identity.carried_items.clone(),
            carried_currency: identity.carried_currency.clone(),
            core_memories: identity.core_memories.clone(),
            strategies: identity.strategies.clone(),
            origin_game: origin_game.to_string(),
            exit_reason: exit_reason.to_string(),
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpawnPreference {
    #[default]
    Safe,
    Challenging,
    Random,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Normal,
    Hard,
    Adaptive,
}

/// An agent's request to enter a game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryPackage {
    pub agent_id: String,
    pub game_id: String,
    #[serde(default)]
    pub transit_package: Option<TransitPackage>,
    #[serde(default)]
    pub spawn_preference: SpawnPreference,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub goals: Vec<String>,
    #[serde(default)]
    pub max_steps: Option<u64>,
    #[serde(default)]
    pub exit_conditions: Vec<String>,
}

impl EntryPackage {
    pub fn new(agent_id: impl Into<String>, game_id: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            game_id: game_id.into(),
            transit_package: None,
            spawn_preference: SpawnPreference::default(),
            difficulty: Difficulty::default(),
            goals: Vec::new(),
            max_steps: None,
            exit_conditions: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_identity_has_all_domains_at_zero() {
        let identity = AgentIdentity::new("a1", "Nova");
        assert_eq!(identity.skills.len(), SKILL_DOMAINS.len());
        assert!(identity.skills.values().all(|l| *l == 0.0));
    }

    #[test]
    fn test_skill_updates_clamp() {
        let mut identity = AgentIdentity::new("a1", "Nova");
        identity.update_skill("combat", 0.7);
        identity.update_skill("combat", 0.7);
        assert_eq!(identity.skill("combat"), 1.0);

        identity.update_skill("survival", -0.5);
        assert_eq!(identity.skill("survival"), 0.0);

        identity.update_skill("juggling", 0.2);
        assert_eq!(identity.skill("juggling"), 0.2);

        identity.update_skill("combat", f64::NAN);
        assert_eq!(identity.skill("combat"), 1.0);
    }

    #[test]
    fn test_game_visits_are_unique() {
        let mut identity = AgentIdentity::new("a1", "Nova");
        identity.add_game_visit("crafter");
        identity.add_game_visit("crafter");
        identity.add_game_visit("starbound");
        assert_eq!(identity.games_visited, vec!["crafter", "starbound"]);
    }

    #[test]
    fn test_identity_text_view() {
        let mut identity = AgentIdentity::new("a1", "Nova");
        identity.total_steps = 120;
        identity.add_game_visit("crafter");
        identity.update_skill("survival", 0.5);
        identity.update_skill("combat", 0.25);

        let text = identity.to_text();
        assert!(text.starts_with("Agent: Nova (a1)\nExperience: 120 steps across 1 games\n"));
        assert!(text.contains("Top Skills: survival: 50%, combat: 25%, adaptation: 0%"));
        assert!(text.ends_with("Achievements: 0"));
    }

    #[test]
    fn test_achievement_id_is_tagged_with_game() {
        let achievement = Achievement::earned("crafter", "collect_wood");
        assert_eq!(achievement.id, "crafter:collect_wood");
        assert_eq!(achievement.game_origin, "crafter");
    }

    #[test]
    fn test_entry_package_defaults() {
        let entry: EntryPackage =
            serde_json::from_str(r#"{"agent_id": "a1", "game_id": "crafter"}"#).unwrap();
        assert_eq!(entry.spawn_preference, SpawnPreference::Safe);
        assert_eq!(entry.difficulty, Difficulty::Normal);
        assert!(entry.goals.is_empty());
    }
}
