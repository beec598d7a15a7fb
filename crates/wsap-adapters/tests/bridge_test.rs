use serde_json::Value;
use std::time::Duration;
use tokio::net::TcpListener;
use wsap_adapters::{BridgeTransport, MockStarbound, StarboundAdapter, StarboundTransport};
use wsap_bridge::{BridgeClient, BridgeState, CommandType, router};
use wsap_core::{Action, Params};
use wsap_runtime::GameAdapter;

async fn spawn_bridge() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = router(BridgeState::new(Duration::from_secs(5)));
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Plays the in-game mod: polls the bridge and answers from a mock world
fn spawn_poller(url: &str) -> tokio::task::JoinHandle<()> {
    let client = BridgeClient::new(url, Duration::from_secs(5)).unwrap();
    tokio::spawn(async move {
        let mut game = MockStarbound::new();
        loop {
            let Some(command) = client.poll().await.unwrap() else {
                tokio::time::sleep(Duration::from_millis(5)).await;
                continue;
            };
            let player_id = command.payload.get("player_id").and_then(Value::as_str);
            let result = match command.command_type {
                CommandType::Observe => game.observe(player_id).await,
                CommandType::Reset => game.reset(player_id).await,
                CommandType::Act => {
                    let action = command.payload.get("action").and_then(Value::as_str).unwrap_or_default();
                    let parameters: Params = command
                        .payload
                        .get("parameters")
                        .and_then(|p| p.as_object().cloned())
                        .unwrap_or_default();
                    game.act(action, &parameters, player_id).await
                }
            }
            .unwrap();
            client.post_result(&command.id, result).await.unwrap();
        }
    })
}

#[tokio::test]
async fn test_adapter_over_bridge() {
    let url = spawn_bridge().await;
    let poller = spawn_poller(&url);

    let transport = BridgeTransport::new(&url, Duration::from_secs(10)).unwrap();
    assert_eq!(transport.bridge_url(), url);
    let mut adapter = StarboundAdapter::new(transport).unwrap().with_player("p1");

    let obs = adapter.reset().await.unwrap();
    assert_eq!(obs.status["health"], 100);
    assert_eq!(obs.location.region.as_deref(), Some("garden_planet"));

    let result = adapter.act(&Action::new("move_left")).await.unwrap();
    assert!(result.success);
    assert_eq!(result.message, "Moved left");
    assert_eq!(result.observation.location.coordinates, vec![-1.0, 0.0]);
    assert_eq!(result.observation.step, 1);

    let result = adapter.act(&Action::new("interact")).await.unwrap();
    assert_eq!(result.observation.recent_events.len(), 1);

    poller.abort();
}

#[tokio::test]
async fn test_bridge_without_game_times_out() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = router(BridgeState::new(Duration::from_millis(100)));
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let transport = BridgeTransport::new(&format!("http://{}", addr), Duration::from_secs(5)).unwrap();
    let mut adapter = StarboundAdapter::new(transport).unwrap();
    tokio_test::assert_err!(adapter.observe().await);
}
