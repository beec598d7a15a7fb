use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;
use wsap_nexus::{Nexus, router, seed_games};

async fn seeded_app() -> Router {
    let nexus = Arc::new(Nexus::default());
    for game in seed_games() {
        nexus.register_game(game).await;
    }
    router(nexus)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder()
        .uri(uri)
        .method(method)
        .header("Content-Type", "application/json")
        .body(match body {
            Some(b) => Body::from(b.to_string()),
            None => Body::empty(),
        })
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn test_games_listing_and_lookup() {
    let app = seeded_app().await;

    let (status, body) = send(&app, "GET", "/games", None).await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<_> = body["games"]
        .as_array()
        .unwrap()
        .iter()
        .map(|g| g["id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(ids, vec!["crafter", "starbound"]);

    let (status, body) = send(&app, "GET", "/games/starbound", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "available");

    let (status, body) = send(&app, "GET", "/games/tetris", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"error": "Game not found"}));
}

#[tokio::test]
async fn test_register_game_defaults_to_available() {
    let app = seeded_app().await;

    let (status, body) = send(
        &app,
        "POST",
        "/games",
        Some(json!({"id": "pong", "name": "Pong", "skill_domains": ["adaptation"]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true}));

    let (_, game) = send(&app, "GET", "/games/pong", None).await;
    assert_eq!(game["status"], "available");
    assert_eq!(game["active_agents"], 0);

    let (status, _) = send(&app, "DELETE", "/games/pong", None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, "GET", "/games/pong", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_agent_registration_is_idempotent_over_http() {
    let app = seeded_app().await;

    let (status, first) = send(
        &app,
        "POST",
        "/agents",
        Some(json!({"agent_id": "a1", "name": "Nova"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["total_steps"], 0);
    assert_eq!(first["skills"]["survival"], 0.0);

    send(&app, "POST", "/transit/enter", Some(json!({"agent_id": "a1", "game_id": "crafter"}))).await;
    send(
        &app,
        "POST",
        "/transit/exit",
        Some(json!({"agent_id": "a1", "game_id": "crafter", "stats": {"steps": 50}})),
    )
    .await;

    let (_, again) = send(
        &app,
        "POST",
        "/agents",
        Some(json!({"agent_id": "a1", "name": "Nova"})),
    )
    .await;
    assert_eq!(again["total_steps"], 50);

    let (status, body) = send(&app, "GET", "/agents/ghost", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"error": "Agent not found"}));
}

#[tokio::test]
async fn test_transit_enter_and_exit() {
    let app = seeded_app().await;
    send(&app, "POST", "/agents", Some(json!({"agent_id": "a1", "name": "Nova"}))).await;

    let (status, grant) = send(
        &app,
        "POST",
        "/transit/enter",
        Some(json!({
            "agent_id": "a1",
            "game_id": "crafter",
            "preferences": {"spawn": "safe", "difficulty": "normal", "goals": ["collect_wood"]}
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(grant["success"], true);
    assert_eq!(grant["bridge_url"], "http://localhost:9997");
    assert_eq!(grant["bonuses"], json!({}));
    assert!(grant["session_id"].as_str().unwrap().starts_with("sess_a1_crafter_"));

    let (_, game) = send(&app, "GET", "/games/crafter", None).await;
    assert_eq!(game["active_agents"], 1);

    let (status, exit) = send(
        &app,
        "POST",
        "/transit/exit",
        Some(json!({
            "agent_id": "a1",
            "game_id": "crafter",
            "reason": "game_over",
            "stats": {
                "steps": 120,
                "reward": 3.0,
                "achievements": ["collect_wood"],
                "skills": {"survival": 0.012, "resource_management": 0.012}
            }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(exit["success"], true);
    assert_eq!(exit["transit_package"]["total_steps"], 120);
    assert_eq!(exit["transit_package"]["achievements"], json!(["collect_wood"]));
    assert_eq!(exit["nexus_observation"]["agent"]["games_visited"], json!(["crafter"]));

    let (_, agent) = send(&app, "GET", "/agents/a1", None).await;
    assert_eq!(agent["achievements"][0]["id"], "crafter:collect_wood");

    let (_, game) = send(&app, "GET", "/games/crafter", None).await;
    assert_eq!(game["active_agents"], 0);
}

#[tokio::test]
async fn test_transit_refusals_are_structured() {
    let app = seeded_app().await;
    send(&app, "POST", "/agents", Some(json!({"agent_id": "a1", "name": "Nova"}))).await;

    let (status, body) = send(
        &app,
        "POST",
        "/transit/enter",
        Some(json!({"agent_id": "a1", "game_id": "tetris"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"success": false, "error": "Unknown game: tetris"}));

    send(&app, "POST", "/transit/enter", Some(json!({"agent_id": "a1", "game_id": "crafter"}))).await;
    let (status, body) = send(
        &app,
        "POST",
        "/transit/enter",
        Some(json!({"agent_id": "a1", "game_id": "starbound"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Agent a1 is already in game: crafter");

    let (status, body) = send(
        &app,
        "POST",
        "/transit/exit",
        Some(json!({"agent_id": "ghost", "game_id": "crafter"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"error": "Unknown agent: ghost"}));
}

#[tokio::test]
async fn test_nexus_observation_includes_text() {
    let app = seeded_app().await;
    send(&app, "POST", "/agents", Some(json!({"agent_id": "a1", "name": "Nova"}))).await;

    let (status, body) = send(&app, "GET", "/nexus/a1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["agent"]["agent_id"], "a1");
    assert_eq!(body["available_games"].as_array().unwrap().len(), 2);
    assert_eq!(body["suggested_games"].as_array().unwrap().len(), 2);
    assert_eq!(body["meta_goals"].as_array().unwrap().len(), 3);
    assert!(body["text"].as_str().unwrap().starts_with("=== NEXUS ==="));

    let (status, body) = send(&app, "GET", "/nexus/ghost", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"error": "Unknown agent"}));
}

#[tokio::test]
async fn test_avatar_endpoints() {
    let app = seeded_app().await;
    send(&app, "POST", "/agents", Some(json!({"agent_id": "a1", "name": "Nova"}))).await;

    let (status, avatar) = send(
        &app,
        "POST",
        "/avatars",
        Some(json!({"agent_id": "a1", "game_id": "starbound", "name": "Scout"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(avatar["name"], "Scout");
    assert_eq!(avatar["state"], "unbound");

    let (status, jacked) = send(
        &app,
        "POST",
        "/avatars/jack-in",
        Some(json!({"agent_id": "a1", "game_id": "starbound"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(jacked["avatar"]["state"], "bound");
    assert_eq!(jacked["avatar"]["bound_agent"], "a1");

    let (status, out) = send(
        &app,
        "POST",
        "/avatars/jack-out",
        Some(json!({"agent_id": "a1", "game_id": "starbound", "mode": "suspend"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(out["avatar_state"], "suspended");

    let (status, roster) = send(&app, "GET", "/avatars/a1/starbound", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(roster["avatars"].as_array().unwrap().len(), 1);
    assert_eq!(roster["avatars"][0]["bound_agent"], Value::Null);

    let (status, _) = send(&app, "GET", "/avatars/a1/crafter", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_avatar_limit_is_a_conflict() {
    let app = seeded_app().await;
    send(&app, "POST", "/agents", Some(json!({"agent_id": "a1", "name": "Nova"}))).await;

    for _ in 0..3 {
        let (status, _) = send(
            &app,
            "POST",
            "/avatars",
            Some(json!({"agent_id": "a1", "game_id": "crafter"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }
    let (status, body) = send(
        &app,
        "POST",
        "/avatars",
        Some(json!({"agent_id": "a1", "game_id": "crafter"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("Avatar limit reached"));
}

#[tokio::test]
async fn test_invalid_bodies_are_rejected_with_json_error() {
    let app = seeded_app().await;

    let (status, body) = send(&app, "POST", "/agents", Some(json!({"name": "Nova"}))).await;
    assert!(status.is_client_error());
    assert!(body["error"].is_string());

    let (status, body) = send(
        &app,
        "POST",
        "/transit/enter",
        Some(json!({"agent_id": "a1", "game_id": "crafter", "preferences": {"difficulty": "nightmare"}})),
    )
    .await;
    assert!(status.is_client_error());
    assert!(body["error"].is_string());

    let (status, body) = send(&app, "GET", "/teleport", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"error": "Not found"}));
}
