//! Action types and action spaces

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{Result, WsapError};

/// Parameter map carried by an action
pub type Params = serde_json::Map<String, serde_json::Value>;

/// An action chosen by an agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// Must name an action in the space it was decided against
    pub name: String,
    #[serde(default)]
    pub parameters: Params,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

impl Action {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: Params::new(),
            reasoning: None,
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = Some(reasoning.into());
        self
    }
}

/// Definition of an action parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamDef {
    pub name: String,
    pub description: String,
    #[serde(rename = "type", default = "default_param_type")]
    pub param_type: String,
    #[serde(default = "default_required")]
    pub required: bool,
    /// Allowed values when the parameter is enum-like
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
}

fn default_param_type() -> String {
    "string".to_string()
}

fn default_required() -> bool {
    true
}

impl ParamDef {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            param_type: default_param_type(),
            required: true,
            options: None,
        }
    }
}

/// Definition of an available action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionDef {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub parameters: Vec<ParamDef>,
    #[serde(default)]
    pub preconditions: Vec<String>,
    #[serde(default = "default_category")]
    pub category: String,
}

fn default_category() -> String {
    "general".to_string()
}

impl ActionDef {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: Vec::new(),
            preconditions: Vec::new(),
            category: default_category(),
        }
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn param(mut self, param: ParamDef) -> Self {
        self.parameters.push(param);
        self
    }

    pub fn requires(mut self, precondition: impl Into<String>) -> Self {
        self.preconditions.push(precondition.into());
        self
    }

    /// One-line form used inside the action space listing
    pub fn to_text(&self) -> String {
        let mut text = format!("{}: {}", self.name, self.description);
        if !self.parameters.is_empty() {
            let params: Vec<&str> = self.parameters.iter().map(|p| p.name.as_str()).collect();
            text.push_str(&format!(" (params: {})", params.join(", ")));
        }
        if !self.preconditions.is_empty() {
            text.push_str(&format!(" [requires: {}]", self.preconditions.join(", ")));
        }
        text
    }
}

/// All actions legal at a point in time.
///
/// Names are unique within a space; construction fails otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawActionSpace")]
pub struct ActionSpace {
    actions: Vec<ActionDef>,
}

#[derive(Deserialize)]
struct RawActionSpace {
    actions: Vec<ActionDef>,
}

impl TryFrom<RawActionSpace> for ActionSpace {
    type Error = WsapError;

    fn try_from(raw: RawActionSpace) -> Result<Self> {
        ActionSpace::new(raw.actions)
    }
}

impl ActionSpace {
    pub fn new(actions: Vec<ActionDef>) -> Result<Self> {
        let mut seen = HashSet::new();
        for action in &actions {
            if !seen.insert(action.name.as_str()) {
                return Err(WsapError::DuplicateAction(action.name.clone()));
            }
        }
        Ok(Self { actions })
    }

    /// Returns a copy of this space with one more action appended
    pub fn extended(&self, action: ActionDef) -> Result<Self> {
        let mut actions = self.actions.clone();
        actions.push(action);
        Self::new(actions)
    }

    pub fn actions(&self) -> &[ActionDef] {
        &self.actions
    }

    pub fn action_names(&self) -> Vec<&str> {
        self.actions.iter().map(|a| a.name.as_str()).collect()
    }

    pub fn get_action(&self, name: &str) -> Option<&ActionDef> {
        self.actions.iter().find(|a| a.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get_action(name).is_some()
    }

    /// Fails with `UnknownAction` when the action does not belong to this space
    pub fn validate(&self, action: &Action) -> Result<()> {
        if self.contains(&action.name) {
            Ok(())
        } else {
            Err(WsapError::UnknownAction(action.name.clone()))
        }
    }

    /// Listing grouped by category, categories in first-seen order
    pub fn to_text(&self) -> String {
        let mut categories: Vec<(&str, Vec<&ActionDef>)> = Vec::new();
        for action in &self.actions {
            match categories.iter_mut().find(|(c, _)| *c == action.category) {
                Some((_, defs)) => defs.push(action),
                None => categories.push((action.category.as_str(), vec![action])),
            }
        }

        categories
            .into_iter()
            .map(|(category, defs)| {
                let mut lines = vec![format!("[{}]", category.to_uppercase())];
                lines.extend(defs.iter().map(|a| format!("  - {}", a.to_text())));
                lines.join("\n")
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}
