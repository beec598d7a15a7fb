//! Game registry entries

use serde::{Deserialize, Serialize};

/// Current availability of a game
///
/// Descriptive only: the hub never health-checks a game, it only refuses transit into
/// games that are not `Available`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    Available,
    Busy,
    #[default]
    Offline,
    Maintenance,
}

impl GameStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameStatus::Available => "available",
            GameStatus::Busy => "busy",
            GameStatus::Offline => "offline",
            GameStatus::Maintenance => "maintenance",
        }
    }

    /// Bracketed tag used in text views
    pub fn tag(&self) -> &'static str {
        match self {
            GameStatus::Available => "[READY]",
            GameStatus::Busy => "[BUSY]",
            GameStatus::Offline => "[OFFLINE]",
            GameStatus::Maintenance => "[DOWN]",
        }
    }
}

/// A game registered with the hub
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameInfo {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub status: GameStatus,
    #[serde(default)]
    pub genre: Vec<String>,
    #[serde(default = "default_dimensions")]
    pub dimensions: u8,
    #[serde(default)]
    pub multiplayer: bool,
    #[serde(default)]
    pub persistent_world: bool,
    /// Skill domains this game exercises
    #[serde(default)]
    pub skill_domains: Vec<String>,
    #[serde(default = "default_wsap_version")]
    pub wsap_version: String,
    #[serde(default = "default_true")]
    pub transit_compatible: bool,
    /// Agents currently holding a session in this game
    #[serde(default)]
    pub active_agents: u32,
    #[serde(default)]
    pub bridge_url: Option<String>,
}

fn default_dimensions() -> u8 {
    2
}

fn default_wsap_version() -> String {
    "0.1".to_string()
}

fn default_true() -> bool {
    true
}

impl GameInfo {
    pub fn new(id: impl Into<String>, name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            status: GameStatus::default(),
            genre: Vec::new(),
            dimensions: default_dimensions(),
            multiplayer: false,
            persistent_world: false,
            skill_domains: Vec::new(),
            wsap_version: default_wsap_version(),
            transit_compatible: true,
            active_agents: 0,
            bridge_url: None,
        }
    }

    pub fn with_status(mut self, status: GameStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_genre(mut self, genre: &[&str]) -> Self {
        self.genre = genre.iter().map(|g| g.to_string()).collect();
        self
    }

    pub fn with_skill_domains(mut self, domains: &[&str]) -> Self {
        self.skill_domains = domains.iter().map(|d| d.to_string()).collect();
        self
    }

    pub fn with_bridge_url(mut self, url: impl Into<String>) -> Self {
        self.bridge_url = Some(url.into());
        self
    }

    pub fn is_available(&self) -> bool {
        self.status == GameStatus::Available
    }

    pub fn to_text(&self) -> String {
        format!(
            "{} ({}) {}\n{}\nGenre: {}\nSkills: {}\nPlayers: {} active",
            self.name,
            self.id,
            self.status.tag(),
            self.description,
            self.genre.join(", "),
            self.skill_domains.join(", "),
            self.active_agents
        )
    }
}

/// Games the hub binary registers at startup
pub fn seed_games() -> Vec<GameInfo> {
    vec![
        GameInfo::new("crafter", "Crafter", "2D survival game - gather, craft, survive")
            .with_status(GameStatus::Available)
            .with_genre(&["survival", "sandbox"])
            .with_skill_domains(&["resource_management", "survival", "crafting", "combat"])
            .with_bridge_url("http://localhost:9997"),
        GameInfo::new(
            "starbound",
            "OpenStarbound",
            "Space exploration and survival across planets",
        )
        .with_status(GameStatus::Available)
        .with_genre(&["exploration", "survival", "rpg"])
        .with_skill_domains(&["exploration", "combat", "crafting", "social"])
        .with_bridge_url("http://localhost:9999"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_game_text_view() {
        let game = GameInfo::new("crafter", "Crafter", "2D survival")
            .with_status(GameStatus::Available)
            .with_genre(&["survival", "sandbox"])
            .with_skill_domains(&["survival"]);

        assert_eq!(
            game.to_text(),
            "Crafter (crafter) [READY]\n2D survival\nGenre: survival, sandbox\nSkills: survival\nPlayers: 0 active"
        );
    }

    #[test]
    fn test_minimal_registration_payload_uses_defaults() {
        let game: GameInfo = serde_json::from_str(
            r#"{"id": "g", "name": "G", "description": "d", "status": "maintenance"}"#,
        )
        .unwrap();
        assert_eq!(game.status, GameStatus::Maintenance);
        assert_eq!(game.dimensions, 2);
        assert!(game.transit_compatible);
        assert_eq!(game.active_agents, 0);
        assert!(game.bridge_url.is_none());
    }

    #[test]
    fn test_unknown_status_is_rejected() {
        let parsed = serde_json::from_str::<GameInfo>(
            r#"{"id": "g", "name": "G", "description": "d", "status": "sleeping"}"#,
        );
        assert!(parsed.is_err());
    }
}
