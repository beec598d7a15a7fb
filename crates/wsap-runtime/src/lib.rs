//! # wsap-runtime
//!
//! The moving parts between a game and a decision policy:
//! - [`GameAdapter`]: a game seen through the WSAP vocabulary
//! - [`Agent`]: a decision policy, with LLM-backed implementations
//! - [`decode_reply`]: strict decoding of model replies into actions
//! - [`run_episode`]: the observe / decide / act loop
//! - [`MultiverseController`]: an agent travelling between games via the Nexus

pub mod adapter;
pub mod agent;
pub mod backend;
pub mod controller;
pub mod episode;
pub mod llm_agent;
pub mod reply;

pub use adapter::GameAdapter;
pub use agent::Agent;
pub use backend::{GenerationBackend, OllamaBackend, OllamaConfig};
pub use controller::{
    AdapterFactory, ControllerOptions, ControllerReport, EXIT_ACTION, GameVisit, MultiverseController,
    SkillGainTable,
};
pub use episode::{EpisodeOptions, EpisodeOutcome, EpisodeStats, run_episode};
pub use llm_agent::{HistoryEntry, LlmAgent, MemoryAgent};
pub use reply::decode_reply;
