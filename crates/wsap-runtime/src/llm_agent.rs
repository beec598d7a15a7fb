//! LLM-backed agents

use crate::agent::Agent;
use crate::backend::GenerationBackend;
use crate::reply::decode_reply;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};
use wsap_core::{Action, ActionResult, ActionSpace, Observation, Result, WsapError};

const HISTORY_LIMIT: usize = 50;
const HISTORY_KEEP: usize = 30;
const HISTORY_SHOWN: usize = 3;

const FACTS_SHOWN: usize = 10;
const PLAN_SHOWN: usize = 5;
const AVOID_AFTER_FAILURES: u32 = 2;

/// One remembered step
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub step: u64,
    pub action: String,
    pub success: bool,
    pub reward: f64,
}

impl HistoryEntry {
    fn to_text(&self) -> String {
        format!(
            "  Step {}: {} -> {}",
            self.step,
            self.action,
            if self.success { "success" } else { "failed" }
        )
    }
}

/// Agent that asks a generation backend for every decision
pub struct LlmAgent {
    backend: Arc<dyn GenerationBackend>,
    system_prompt: String,
    action_space: Option<ActionSpace>,
    history: Vec<HistoryEntry>,
    step_count: u64,
    last_action: Option<String>,
}

impl LlmAgent {
    pub fn new(backend: Arc<dyn GenerationBackend>) -> Self {
        Self {
            backend,
            system_prompt: String::new(),
            action_space: None,
            history: Vec::new(),
            step_count: 0,
            last_action: None,
        }
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    /// Observation text followed by the last few steps
    pub fn build_prompt(&self, observation: &Observation) -> String {
        let mut prompt = observation.to_text();
        if !self.history.is_empty() {
            let start = self.history.len().saturating_sub(HISTORY_SHOWN);
            let lines: Vec<String> = self.history[start..].iter().map(HistoryEntry::to_text).collect();
            prompt.push_str(&format!("\n\nRECENT HISTORY:\n{}", lines.join("\n")));
        }
        prompt.push_str("\n\nWhat action do you take?");
        prompt
    }

    async fn query(&mut self, prompt: String) -> Result<Action> {
        self.step_count += 1;
        let space = self
            .action_space
            .as_ref()
            .ok_or_else(|| WsapError::Game("Agent used before initialize()".to_string()))?;

        let reply = self.backend.generate(&self.system_prompt, &prompt).await?;
        let action = decode_reply(&reply, space).inspect_err(|err| {
            warn!(step = self.step_count, error = %err, "could not decode model reply");
        })?;

        debug!(step = self.step_count, action = %action.name, "decided");
        self.last_action = Some(action.name.clone());
        Ok(action)
    }

    fn record(&mut self, result: &ActionResult) {
        self.history.push(HistoryEntry {
            step: self.step_count,
            action: self.last_action.clone().unwrap_or_else(|| "unknown".to_string()),
            success: result.success,
            reward: result.reward,
        });
        if self.history.len() > HISTORY_LIMIT {
            let excess = self.history.len() - HISTORY_KEEP;
            self.history.drain(..excess);
        }
    }
}

#[async_trait]
impl Agent for LlmAgent {
    fn initialize(&mut self, game_description: &str, action_space: &ActionSpace) {
        self.system_prompt = format!(
            "{}\n\nAVAILABLE ACTIONS:\n{}\n\nRESPONSE FORMAT:\n\
             Respond with just the action name, or JSON: {{\"action\": \"name\", \"reasoning\": \"why\"}}\n\n\
             Be concise. Focus on survival and progress.",
            game_description,
            action_space.to_text()
        );
        self.action_space = Some(action_space.clone());
    }

    fn refresh_action_space(&mut self, action_space: &ActionSpace) {
        self.action_space = Some(action_space.clone());
    }

    async fn decide(&mut self, observation: &Observation) -> Result<Action> {
        let prompt = self.build_prompt(observation);
        self.query(prompt).await
    }

    fn reflect(&mut self, result: &ActionResult) {
        self.record(result);
    }

    fn reset(&mut self) {
        self.history.clear();
        self.step_count = 0;
        self.last_action = None;
    }
}

/// LLM agent with memory that outlives episodes.
///
/// Facts and failure counts carry across `reset()`; the plan does not.
pub struct MemoryAgent {
    inner: LlmAgent,
    facts: Vec<String>,
    plan: Vec<String>,
    failed_actions: BTreeMap<String, u32>,
}

impl MemoryAgent {
    pub fn new(backend: Arc<dyn GenerationBackend>) -> Self {
        Self {
            inner: LlmAgent::new(backend),
            facts: Vec::new(),
            plan: Vec::new(),
            failed_actions: BTreeMap::new(),
        }
    }

    pub fn add_fact(&mut self, fact: impl Into<String>) {
        self.facts.push(fact.into());
    }

    pub fn set_plan(&mut self, steps: Vec<String>) {
        self.plan = steps;
    }

    pub fn facts(&self) -> &[String] {
        &self.facts
    }

    pub fn plan(&self) -> &[String] {
        &self.plan
    }

    pub fn failure_count(&self, action: &str) -> u32 {
        self.failed_actions.get(action).copied().unwrap_or(0)
    }

    pub fn build_prompt(&self, observation: &Observation) -> String {
        let mut prompt = observation.to_text();

        if !self.facts.is_empty() {
            let start = self.facts.len().saturating_sub(FACTS_SHOWN);
            let lines: Vec<String> = self.facts[start..].iter().map(|f| format!("  - {}", f)).collect();
            prompt.push_str(&format!("\n\nKNOWN FACTS:\n{}", lines.join("\n")));
        }

        if !self.plan.is_empty() {
            let lines: Vec<String> = self
                .plan
                .iter()
                .take(PLAN_SHOWN)
                .enumerate()
                .map(|(i, p)| format!("  {}. {}", i + 1, p))
                .collect();
            prompt.push_str(&format!("\n\nCURRENT PLAN:\n{}", lines.join("\n")));
        }

        let avoid: Vec<String> = self
            .failed_actions
            .iter()
            .filter(|(_, count)| **count >= AVOID_AFTER_FAILURES)
            .map(|(name, count)| format!("{} (failed {}x)", name, count))
            .collect();
        if !avoid.is_empty() {
            prompt.push_str(&format!("\n\nAVOID (previously failed): {}", avoid.join(", ")));
        }

        prompt.push_str("\n\nWhat action do you take?");
        prompt
    }
}

#[async_trait]
impl Agent for MemoryAgent {
    fn initialize(&mut self, game_description: &str, action_space: &ActionSpace) {
        self.inner.initialize(game_description, action_space);
    }

    fn refresh_action_space(&mut self, action_space: &ActionSpace) {
        self.inner.refresh_action_space(action_space);
    }

    async fn decide(&mut self, observation: &Observation) -> Result<Action> {
        let prompt = self.build_prompt(observation);
        self.inner.query(prompt).await
    }

    fn reflect(&mut self, result: &ActionResult) {
        self.inner.record(result);
        if !result.success {
            let action = self
                .inner
                .last_action
                .clone()
                .unwrap_or_else(|| "unknown".to_string());
            *self.failed_actions.entry(action).or_insert(0) += 1;
        }
        for achievement in &result.achievements {
            self.facts.push(format!("Achieved: {}", achievement));
        }
    }

    fn reset(&mut self) {
        self.inner.reset();
        self.plan.clear();
    }
}
