//! Goals that span multiple games

use crate::game::GameInfo;
use crate::identity::AgentIdentity;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetaGoalKind {
    Skill,
    Exploration,
    Achievement,
}

/// What completing a meta-goal takes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Requirement {
    /// `min_steps` of play in each of `min_games` games
    Endurance { min_steps: u64, min_games: usize },
    /// `craft_items` crafting achievements spread over `min_games` games
    Crafting { craft_items: usize, min_games: usize },
    /// Every registered game visited at least once
    VisitAll,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaGoal {
    pub id: String,
    pub description: String,
    pub goal_type: MetaGoalKind,
    pub requirement: Requirement,
    pub rewards: Vec<String>,
}

/// A meta-goal evaluated against one identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaGoalProgress {
    pub id: String,
    pub description: String,
    pub progress: f64,
    pub completed: bool,
    pub rewards: Vec<String>,
}

// Crafter-style achievement names for making or placing things
fn is_crafting_achievement(name: &str) -> bool {
    name.starts_with("make_") || name.starts_with("place_") || name.starts_with("craft")
}

fn ratio(have: f64, need: f64) -> f64 {
    if need <= 0.0 {
        1.0
    } else {
        (have / need).min(1.0)
    }
}

impl MetaGoal {
    /// Completion fraction in [0, 1]
    pub fn progress(&self, identity: &AgentIdentity, games: &[GameInfo]) -> f64 {
        match &self.requirement {
            Requirement::Endurance {
                min_steps,
                min_games,
            } => {
                let visited = identity.games_visited.len();
                let games_part = ratio(visited as f64, *min_games as f64);
                let steps_part = ratio(
                    identity.total_steps as f64,
                    (*min_steps as f64) * (*min_games as f64),
                );
                games_part.min(steps_part)
            }
            Requirement::Crafting {
                craft_items,
                min_games,
            } => {
                let crafted: Vec<_> = identity
                    .achievements
                    .iter()
                    .filter(|a| is_crafting_achievement(&a.name))
                    .collect();
                let games_with_crafting: BTreeSet<&str> =
                    crafted.iter().map(|a| a.game_origin.as_str()).collect();
                ratio(crafted.len() as f64, *craft_items as f64)
                    .min(ratio(games_with_crafting.len() as f64, *min_games as f64))
            }
            Requirement::VisitAll => {
                if games.is_empty() {
                    return 0.0;
                }
                let visited = games.iter().filter(|g| identity.has_visited(&g.id)).count();
                ratio(visited as f64, games.len() as f64)
            }
        }
    }

    pub fn evaluate(&self, identity: &AgentIdentity, games: &[GameInfo]) -> MetaGoalProgress {
        let progress = self.progress(identity, games);
        MetaGoalProgress {
            id: self.id.clone(),
            description: self.description.clone(),
            progress,
            completed: progress >= 1.0,
            rewards: self.rewards.clone(),
        }
    }

    pub fn to_text(&self) -> &str {
        &self.description
    }
}

/// Meta-goals offered to every agent
pub fn catalog() -> Vec<MetaGoal> {
    vec![
        MetaGoal {
            id: "survivor".into(),
            description: "Survive for 100+ steps in 3 different games".into(),
            goal_type: MetaGoalKind::Skill,
            requirement: Requirement::Endurance {
                min_steps: 100,
                min_games: 3,
            },
            rewards: vec![
                "Title: Survivor".into(),
                "+10% starting health in all games".into(),
            ],
        },
        MetaGoal {
            id: "polyglot".into(),
            description: "Learn crafting systems in 5 different games".into(),
            goal_type: MetaGoalKind::Exploration,
            requirement: Requirement::Crafting {
                craft_items: 10,
                min_games: 5,
            },
            rewards: vec![
                "Title: Master Crafter".into(),
                "Reveal all recipes in new games".into(),
            ],
        },
        MetaGoal {
            id: "explorer".into(),
            description: "Visit every available game at least once".into(),
            goal_type: MetaGoalKind::Exploration,
            requirement: Requirement::VisitAll,
            rewards: vec![
                "Title: World Walker".into(),
                "Instant travel between known games".into(),
            ],
        },
    ]
}
