//! HTTP API of the hub

use crate::avatar::{AvatarSpec, JackOutMode};
use crate::config::NexusConfig;
use crate::error::{NexusError, TransitDenied};
use crate::game::{GameInfo, GameStatus};
use crate::hub::Nexus;
use crate::identity::{Difficulty, EntryPackage, SpawnPreference, StatsUpdate};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

/// Errors returned to HTTP callers
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Rejection(JsonRejection),
    Nexus(NexusError),
    Transit(TransitDenied),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Rejection(rejection)
    }
}

impl From<NexusError> for ApiError {
    fn from(err: NexusError) -> Self {
        Self::Nexus(err)
    }
}

impl From<TransitDenied> for ApiError {
    fn from(denied: TransitDenied) -> Self {
        Self::Transit(denied)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Rejection(rejection) => (rejection.status(), rejection.body_text()),
            Self::Nexus(err) => {
                let status = match err {
                    NexusError::UnknownAgent(_)
                    | NexusError::UnknownGame(_)
                    | NexusError::AvatarNotFound { .. } => StatusCode::NOT_FOUND,
                    NexusError::AvatarLimit { .. } | NexusError::AvatarDestroyed(_) => {
                        StatusCode::CONFLICT
                    }
                };
                (status, err.to_string())
            }
            Self::Transit(denied) => {
                let status = match denied {
                    TransitDenied::UnknownGame(_) | TransitDenied::UnknownAgent(_) => {
                        StatusCode::NOT_FOUND
                    }
                    TransitDenied::GameUnavailable { .. } | TransitDenied::AlreadyInGame { .. } => {
                        StatusCode::CONFLICT
                    }
                };
                let body = json!({ "success": false, "error": denied.to_string() });
                return (status, Json(body)).into_response();
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

/// `POST /games` body; registered games default to available
#[derive(Debug, Deserialize)]
pub struct RegisterGameRequest {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "available")]
    pub status: GameStatus,
    #[serde(default)]
    pub genre: Vec<String>,
    #[serde(default)]
    pub skill_domains: Vec<String>,
    #[serde(default)]
    pub bridge_url: Option<String>,
    #[serde(default)]
    pub multiplayer: bool,
    #[serde(default)]
    pub persistent_world: bool,
}

fn available() -> GameStatus {
    GameStatus::Available
}

impl RegisterGameRequest {
    fn into_game_info(self) -> GameInfo {
        let mut info = GameInfo::new(self.id, self.name, self.description);
        info.status = self.status;
        info.genre = self.genre;
        info.skill_domains = self.skill_domains;
        info.bridge_url = self.bridge_url;
        info.multiplayer = self.multiplayer;
        info.persistent_world = self.persistent_world;
        info
    }
}

/// `POST /agents` body
#[derive(Debug, Deserialize)]
pub struct RegisterAgentRequest {
    pub agent_id: String,
    #[serde(default = "default_agent_name")]
    pub name: String,
}

fn default_agent_name() -> String {
    "Agent".to_string()
}

#[derive(Debug, Default, Deserialize)]
pub struct EntryPreferences {
    #[serde(default)]
    pub spawn: SpawnPreference,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub goals: Vec<String>,
}

/// `POST /transit/enter` body
#[derive(Debug, Deserialize)]
pub struct EnterRequest {
    pub agent_id: String,
    pub game_id: String,
    #[serde(default)]
    pub preferences: EntryPreferences,
}

/// `POST /transit/exit` body
#[derive(Debug, Deserialize)]
pub struct ExitRequest {
    pub agent_id: String,
    pub game_id: String,
    #[serde(default = "default_reason")]
    pub reason: String,
    #[serde(default)]
    pub stats: Option<StatsUpdate>,
}

fn default_reason() -> String {
    "voluntary".to_string()
}

/// `POST /avatars` body
#[derive(Debug, Deserialize)]
pub struct CreateAvatarRequest {
    pub agent_id: String,
    pub game_id: String,
    #[serde(flatten)]
    pub spec: AvatarSpec,
}

/// `POST /avatars/jack-in` body
#[derive(Debug, Deserialize)]
pub struct JackInRequest {
    pub agent_id: String,
    pub game_id: String,
    #[serde(default)]
    pub avatar_id: Option<String>,
}

/// `POST /avatars/jack-out` body
#[derive(Debug, Deserialize)]
pub struct JackOutRequest {
    pub agent_id: String,
    pub game_id: String,
    #[serde(default)]
    pub mode: JackOutMode,
}

/// Build the hub router
pub fn router(nexus: Arc<Nexus>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/games", get(list_games).post(register_game))
        .route("/games/{game_id}", get(get_game).delete(unregister_game))
        .route("/agents", post(register_agent))
        .route("/agents/{agent_id}", get(get_agent))
        .route("/nexus/{agent_id}", get(nexus_observation))
        .route("/transit/enter", post(transit_enter))
        .route("/transit/exit", post(transit_exit))
        .route("/avatars", post(create_avatar))
        .route("/avatars/jack-in", post(jack_in))
        .route("/avatars/jack-out", post(jack_out))
        .route("/avatars/{agent_id}/{game_id}", get(get_roster))
        .fallback(not_found)
        .with_state(nexus)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

async fn list_games(State(nexus): State<Arc<Nexus>>) -> Json<Value> {
    Json(json!({ "games": nexus.list_games().await }))
}

async fn get_game(State(nexus): State<Arc<Nexus>>, Path(game_id): Path<String>) -> ApiResult<GameInfo> {
    nexus
        .get_game(&game_id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Game not found".into()))
}

async fn register_game(
    State(nexus): State<Arc<Nexus>>,
    payload: Result<Json<RegisterGameRequest>, JsonRejection>,
) -> ApiResult<Value> {
    let Json(request) = payload?;
    if request.id.is_empty() {
        return Err(ApiError::BadRequest("Missing game id".into()));
    }
    nexus.register_game(request.into_game_info()).await;
    Ok(Json(json!({ "success": true })))
}

async fn unregister_game(
    State(nexus): State<Arc<Nexus>>,
    Path(game_id): Path<String>,
) -> ApiResult<Value> {
    nexus
        .unregister_game(&game_id)
        .await
        .map(|_| Json(json!({ "success": true })))
        .ok_or_else(|| ApiError::NotFound("Game not found".into()))
}

async fn register_agent(
    State(nexus): State<Arc<Nexus>>,
    payload: Result<Json<RegisterAgentRequest>, JsonRejection>,
) -> ApiResult<Value> {
    let Json(request) = payload?;
    if request.agent_id.is_empty() {
        return Err(ApiError::BadRequest("Missing agent id".into()));
    }
    let identity = nexus.register_agent(&request.agent_id, &request.name).await;
    Ok(Json(serde_json::to_value(identity).unwrap_or_default()))
}

async fn get_agent(State(nexus): State<Arc<Nexus>>, Path(agent_id): Path<String>) -> ApiResult<Value> {
    let identity = nexus
        .get_agent(&agent_id)
        .await
        .ok_or_else(|| ApiError::NotFound("Agent not found".into()))?;
    Ok(Json(serde_json::to_value(identity).unwrap_or_default()))
}

async fn nexus_observation(
    State(nexus): State<Arc<Nexus>>,
    Path(agent_id): Path<String>,
) -> ApiResult<Value> {
    let observation = nexus
        .get_nexus_observation(&agent_id)
        .await
        .ok_or_else(|| ApiError::NotFound("Unknown agent".into()))?;
    let mut body = serde_json::to_value(&observation).unwrap_or_default();
    if let Some(object) = body.as_object_mut() {
        object.insert("text".into(), observation.to_text().into());
    }
    Ok(Json(body))
}

async fn transit_enter(
    State(nexus): State<Arc<Nexus>>,
    payload: Result<Json<EnterRequest>, JsonRejection>,
) -> ApiResult<Value> {
    let Json(request) = payload?;
    let mut entry = EntryPackage::new(request.agent_id, request.game_id);
    entry.spawn_preference = request.preferences.spawn;
    entry.difficulty = request.preferences.difficulty;
    entry.goals = request.preferences.goals;

    let grant = nexus.transit_in(entry).await?;
    Ok(Json(serde_json::to_value(grant).unwrap_or_default()))
}

async fn transit_exit(
    State(nexus): State<Arc<Nexus>>,
    payload: Result<Json<ExitRequest>, JsonRejection>,
) -> ApiResult<Value> {
    let Json(request) = payload?;

    let package = nexus
        .exit_game(
            &request.agent_id,
            &request.game_id,
            &request.reason,
            request.stats.as_ref(),
        )
        .await?;
    let observation = nexus.get_nexus_observation(&request.agent_id).await;

    debug!(agent_id = %request.agent_id, game_id = %request.game_id, "Transit exit served");
    Ok(Json(json!({
        "success": true,
        "transit_package": {
            "skills": package.skills,
            "achievements": package.achievements.iter().map(|a| a.name.as_str()).collect::<Vec<_>>(),
            "total_steps": package.total_steps,
        },
        "nexus_observation": observation,
    })))
}

async fn create_avatar(
    State(nexus): State<Arc<Nexus>>,
    payload: Result<Json<CreateAvatarRequest>, JsonRejection>,
) -> ApiResult<Value> {
    let Json(request) = payload?;
    let avatar = nexus
        .create_avatar(&request.agent_id, &request.game_id, request.spec)
        .await?;
    Ok(Json(serde_json::to_value(avatar).unwrap_or_default()))
}

async fn jack_in(
    State(nexus): State<Arc<Nexus>>,
    payload: Result<Json<JackInRequest>, JsonRejection>,
) -> ApiResult<Value> {
    let Json(request) = payload?;
    let result = nexus
        .jack_in(&request.agent_id, &request.game_id, request.avatar_id.as_deref())
        .await?;
    Ok(Json(serde_json::to_value(result).unwrap_or_default()))
}

async fn jack_out(
    State(nexus): State<Arc<Nexus>>,
    payload: Result<Json<JackOutRequest>, JsonRejection>,
) -> ApiResult<Value> {
    let Json(request) = payload?;
    let result = nexus
        .jack_out(&request.agent_id, &request.game_id, request.mode)
        .await?;
    Ok(Json(serde_json::to_value(result).unwrap_or_default()))
}

async fn get_roster(
    State(nexus): State<Arc<Nexus>>,
    Path((agent_id, game_id)): Path<(String, String)>,
) -> ApiResult<Value> {
    let roster = nexus.roster(&agent_id, &game_id).await.ok_or_else(|| {
        ApiError::Nexus(NexusError::AvatarNotFound {
            agent_id: agent_id.clone(),
            game_id: game_id.clone(),
        })
    })?;
    Ok(Json(serde_json::to_value(roster).unwrap_or_default()))
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Not found" })))
}

/// Run the hub until ctrl-c, sweeping idle sessions when a TTL is configured
pub async fn serve(config: NexusConfig, nexus: Arc<Nexus>) -> std::io::Result<()> {
    if let Some(ttl) = config.session_ttl {
        let sweeper = nexus.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(NexusConfig::sweep_interval(ttl));
            loop {
                interval.tick().await;
                let expired = sweeper.expire_sessions(ttl).await;
                if !expired.is_empty() {
                    info!(count = expired.len(), "Expired idle sessions");
                }
            }
        });
    }

    let app = router(nexus);
    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port)).await?;
    info!("Nexus listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Nexus shutting down");
        })
        .await
}
