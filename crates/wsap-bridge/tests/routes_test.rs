use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use std::time::Duration;
use tower::ServiceExt;
use wsap_bridge::{BridgeState, router};

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
    let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn poll_until_command(app: &Router) -> Value {
    for _ in 0..200 {
        let (status, body) = send(app, "GET", "/poll", None).await;
        assert_eq!(status, StatusCode::OK);
        if body.as_object().is_some_and(|o| !o.is_empty()) {
            return body;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("no command was queued");
}

#[tokio::test]
async fn test_idle_poll_returns_empty_object() {
    let app = router(BridgeState::new(Duration::from_secs(1)));
    let (status, body) = send(&app, "GET", "/poll", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({}));
}

#[tokio::test]
async fn test_act_round_trip_through_poller() {
    let app = router(BridgeState::new(Duration::from_secs(5)));

    let controller = {
        let app = app.clone();
        tokio::spawn(async move {
            send(
                &app,
                "POST",
                "/act",
                Some(json!({"action": "move", "parameters": {"direction": "left"}})),
            )
            .await
        })
    };

    let command = poll_until_command(&app).await;
    assert_eq!(command["type"], "act");
    assert_eq!(command["action"], "move");
    assert_eq!(command["parameters"]["direction"], "left");
    let id = command["id"].as_str().unwrap().to_string();

    let (status, ack) = send(
        &app,
        "POST",
        "/result",
        Some(json!({"id": id, "result": {"success": true, "message": "Moved left"}})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack, json!({"ok": true, "delivered": true}));

    let (status, body) = controller.await.unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true, "message": "Moved left"}));
}

#[tokio::test]
async fn test_observe_without_body_is_accepted() {
    let app = router(BridgeState::new(Duration::from_secs(5)));

    let controller = {
        let app = app.clone();
        tokio::spawn(async move { send(&app, "POST", "/observe", None).await })
    };

    let command = poll_until_command(&app).await;
    assert_eq!(command["type"], "observe");
    assert_eq!(command["player_id"], Value::Null);

    send(
        &app,
        "POST",
        "/result",
        Some(json!({"id": command["id"], "result": {"health": 100}})),
    )
    .await;

    let (status, body) = controller.await.unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["health"], 100);
}

#[tokio::test]
async fn test_unanswered_command_returns_gateway_timeout() {
    let app = router(BridgeState::new(Duration::from_millis(100)));

    let (status, body) = send(&app, "POST", "/reset", Some(json!({}))).await;
    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert!(
        body["error"]
            .as_str()
            .unwrap()
            .starts_with("Timeout waiting for game response")
    );

    let (_, status_body) = send(&app, "GET", "/status", None).await;
    assert_eq!(status_body["pending"], 0);
    assert_eq!(status_body["timed_out"], 1);
}

#[tokio::test]
async fn test_result_without_id_is_rejected() {
    let app = router(BridgeState::new(Duration::from_secs(1)));

    let (status, body) = send(&app, "POST", "/result", Some(json!({"result": {}}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "Missing command id"}));
}

#[tokio::test]
async fn test_stray_result_is_acknowledged_but_not_delivered() {
    let app = router(BridgeState::new(Duration::from_secs(1)));

    let (status, body) = send(
        &app,
        "POST",
        "/result",
        Some(json!({"id": "no-such-command", "result": {}})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["delivered"], false);

    let (_, status_body) = send(&app, "GET", "/status", None).await;
    assert_eq!(status_body["discarded_results"], 1);
    assert_eq!(status_body["in_flight"], 0);
}

#[tokio::test]
async fn test_status_reports_connection_after_poll() {
    let app = router(BridgeState::new(Duration::from_secs(1)));

    let (_, before) = send(&app, "GET", "/status", None).await;
    assert_eq!(before["status"], "running");
    assert_eq!(before["connected"], false);

    send(&app, "GET", "/poll", None).await;
    let (_, after) = send(&app, "GET", "/status", None).await;
    assert_eq!(after["connected"], true);
}

#[tokio::test]
async fn test_malformed_json_is_a_bad_request() {
    let app = router(BridgeState::new(Duration::from_secs(1)));

    let request = Request::builder()
        .uri("/act")
        .method("POST")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let app = router(BridgeState::new(Duration::from_secs(1)));
    let (status, body) = send(&app, "GET", "/nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"error": "Not found"}));
}
