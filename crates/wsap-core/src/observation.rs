//! Observation types and their text rendering

use serde::{Deserialize, Serialize};

/// Status values keep the order the adapter inserted them in
pub type StatusMap = serde_json::Map<String, serde_json::Value>;

/// Item name to count, in the order the game reports items
pub type Inventory = serde_json::Map<String, serde_json::Value>;

/// Agent's position in the world
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub coordinates: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default)]
    pub description: String,
}

impl Location {
    pub fn new(coordinates: Vec<f64>) -> Self {
        Self {
            coordinates,
            region: None,
            description: String::new(),
        }
    }

    pub fn to_text(&self) -> String {
        let mut parts = Vec::new();
        if let Some(region) = self.region.as_deref().filter(|r| !r.is_empty()) {
            parts.push(format!("In {}", region));
        }
        if !self.description.is_empty() {
            parts.push(self.description.clone());
        }
        if parts.is_empty() {
            parts.push(format!("At {}", format_coordinates(&self.coordinates)));
        }
        parts.join(". ")
    }
}

/// Something in the world near the agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    #[serde(rename = "type")]
    pub entity_type: String,
    pub distance: f64,
    pub direction: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default = "default_true")]
    pub interactable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

fn default_true() -> bool {
    true
}

impl Entity {
    pub fn to_text(&self) -> String {
        let mut parts = vec![match non_empty(&self.name) {
            Some(name) => format!("{} ({})", name, self.entity_type),
            None => self.entity_type.clone(),
        }];
        if let Some(state) = non_empty(&self.state) {
            parts.push(format!("[{}]", state));
        }
        parts.push(format!("- {}, distance {:.0}", self.direction, self.distance));
        if let Some(description) = non_empty(&self.description) {
            parts.push(format!("({})", description));
        }
        parts.join(" ")
    }
}

/// Ground or environment in a direction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Terrain {
    #[serde(rename = "type")]
    pub terrain_type: String,
    pub direction: String,
    #[serde(default = "default_true")]
    pub passable: bool,
}

impl Terrain {
    pub fn to_text(&self) -> String {
        let suffix = if self.passable { "" } else { " (impassable)" };
        format!("{} to the {}{}", self.terrain_type, self.direction, suffix)
    }
}

/// Active buff, debuff or condition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Effect {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Steps remaining, `None` means permanent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
}

impl Effect {
    pub fn to_text(&self) -> String {
        match self.duration.filter(|d| *d > 0) {
            Some(duration) => format!("{}: {} ({} steps)", self.name, self.description, duration),
            None => format!("{}: {}", self.name, self.description),
        }
    }
}

/// An objective for the agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub id: String,
    pub description: String,
    /// main, side, urgent, quest, achievement
    #[serde(rename = "type", default = "default_goal_type")]
    pub goal_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hints: Vec<String>,
}

fn default_goal_type() -> String {
    "main".to_string()
}

impl Goal {
    pub fn new(id: impl Into<String>, description: impl Into<String>, goal_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            goal_type: goal_type.into(),
            progress: None,
            hints: Vec::new(),
        }
    }

    pub fn with_progress(mut self, progress: impl Into<String>) -> Self {
        self.progress = Some(progress.into());
        self
    }

    pub fn to_text(&self) -> String {
        let mut text = format!("[{}] {}", self.goal_type.to_uppercase(), self.description);
        if let Some(progress) = non_empty(&self.progress) {
            text.push_str(&format!(" ({})", progress));
        }
        text
    }
}

/// Kind of a recent event, drives its prefix in text form
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Success,
    Danger,
    Reward,
    #[default]
    #[serde(other)]
    Info,
}

/// Something that happened recently
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub description: String,
    #[serde(rename = "type", default)]
    pub kind: EventKind,
}

impl Event {
    pub fn new(description: impl Into<String>, kind: EventKind) -> Self {
        Self {
            description: description.into(),
            kind,
        }
    }

    pub fn to_text(&self) -> String {
        let prefix = match self.kind {
            EventKind::Danger => "!",
            EventKind::Success => "+",
            EventKind::Reward => "*",
            EventKind::Info => "-",
        };
        format!("{} {}", prefix, self.description)
    }
}

/// Complete game state snapshot for one decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub status: StatusMap,
    pub inventory: Inventory,
    pub location: Location,

    #[serde(default)]
    pub nearby_entities: Vec<Entity>,
    #[serde(default)]
    pub nearby_terrain: Vec<Terrain>,

    #[serde(default)]
    pub active_effects: Vec<Effect>,
    #[serde(default)]
    pub current_goals: Vec<Goal>,
    #[serde(default)]
    pub recent_events: Vec<Event>,

    #[serde(default)]
    pub step: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_of_day: Option<String>,
}

impl Observation {
    pub fn new(status: StatusMap, inventory: Inventory, location: Location) -> Self {
        Self {
            status,
            inventory,
            location,
            nearby_entities: Vec::new(),
            nearby_terrain: Vec::new(),
            active_effects: Vec::new(),
            current_goals: Vec::new(),
            recent_events: Vec::new(),
            step: 0,
            time_of_day: None,
        }
    }

    /// Natural language form used to prompt LLM agents
    pub fn to_text(&self) -> String {
        let mut sections = Vec::new();

        let mut header = format!("Step {}", self.step);
        if let Some(time) = non_empty(&self.time_of_day) {
            header.push_str(&format!(" ({})", time));
        }
        sections.push(header);

        if !self.status.is_empty() {
            let items: Vec<String> = self
                .status
                .iter()
                .map(|(k, v)| format!("{}: {}", k, display_value(v)))
                .collect();
            sections.push(format!("STATUS:\n{}", items.join(", ")));
        }

        let items: Vec<String> = self
            .inventory
            .iter()
            .filter(|(_, count)| count.as_f64().is_some_and(|c| c > 0.0))
            .map(|(k, v)| format!("{}: {}", k, display_value(v)))
            .collect();
        if items.is_empty() {
            sections.push("INVENTORY:\nempty".to_string());
        } else {
            sections.push(format!("INVENTORY:\n{}", items.join(", ")));
        }

        sections.push(format!("LOCATION:\n{}", self.location.to_text()));

        if !self.nearby_entities.is_empty() || !self.nearby_terrain.is_empty() {
            let lines: Vec<String> = self
                .nearby_entities
                .iter()
                .map(|e| format!("  - {}", e.to_text()))
                .chain(self.nearby_terrain.iter().map(|t| format!("  - {}", t.to_text())))
                .collect();
            sections.push(format!("NEARBY:\n{}", lines.join("\n")));
        }

        if !self.active_effects.is_empty() {
            let lines: Vec<String> = self
                .active_effects
                .iter()
                .map(|e| format!("  - {}", e.to_text()))
                .collect();
            sections.push(format!("ACTIVE EFFECTS:\n{}", lines.join("\n")));
        }

        if !self.current_goals.is_empty() {
            let lines: Vec<String> = self
                .current_goals
                .iter()
                .map(|g| format!("  - {}", g.to_text()))
                .collect();
            sections.push(format!("CURRENT GOALS:\n{}", lines.join("\n")));
        }

        if !self.recent_events.is_empty() {
            let lines: Vec<String> = self
                .recent_events
                .iter()
                .map(|e| format!("  {}", e.to_text()))
                .collect();
            sections.push(format!("RECENT EVENTS:\n{}", lines.join("\n")));
        }

        sections.join("\n\n")
    }
}

/// Result of executing an action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionResult {
    pub success: bool,
    pub message: String,
    #[serde(default)]
    pub reward: f64,
    /// Newly unlocked this step, each name at most once
    #[serde(default)]
    pub achievements: Vec<String>,
    #[serde(default)]
    pub done: bool,
    pub observation: Observation,
}

impl ActionResult {
    pub fn success(message: impl Into<String>, observation: Observation) -> Self {
        Self {
            success: true,
            message: message.into(),
            reward: 0.0,
            achievements: Vec::new(),
            done: false,
            observation,
        }
    }

    /// Expected failure such as an unknown action name
    pub fn failure(message: impl Into<String>, observation: Observation) -> Self {
        Self {
            success: false,
            ..Self::success(message, observation)
        }
    }

    pub fn add_achievement(&mut self, name: impl Into<String>) {
        let name = name.into();
        if !self.achievements.contains(&name) {
            self.achievements.push(name);
        }
    }

    pub fn to_text(&self) -> String {
        let mut parts = vec![if self.success {
            format!("Success: {}", self.message)
        } else {
            format!("Failed: {}", self.message)
        }];
        if self.reward != 0.0 {
            parts.push(format!("Reward: {:+.1}", self.reward));
        }
        if !self.achievements.is_empty() {
            parts.push(format!("Achievements: {}", self.achievements.join(", ")));
        }
        if self.done {
            parts.push("Episode ended.".to_string());
        }
        parts.join(" | ")
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

/// Renders a status value the way a plain-text prompt expects (no JSON quoting)
pub fn display_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Bool(true) => "True".to_string(),
        serde_json::Value::Bool(false) => "False".to_string(),
        serde_json::Value::Null => "None".to_string(),
        other => other.to_string(),
    }
}

fn format_coordinates(coordinates: &[f64]) -> String {
    let parts: Vec<String> = coordinates
        .iter()
        .map(|c| {
            if c.fract() == 0.0 && c.is_finite() {
                format!("{}", *c as i64)
            } else {
                c.to_string()
            }
        })
        .collect();
    if parts.len() == 1 {
        format!("({},)", parts[0])
    } else {
        format!("({})", parts.join(", "))
    }
}
