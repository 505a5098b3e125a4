use super::*;
use axum::{
    http::StatusCode as HttpStatus,
    routing::{get, post},
    Json, Router,
};
use serde_json::Value;
use tokio::net::TcpListener;

const TIMEOUT: Duration = Duration::from_secs(5);

async fn serve(app: Router) -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let port = listener.local_addr().expect("addr").port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    port
}

fn bridge() -> Router {
    Router::new()
        .route("/Game", get(|| async { "GameService" }))
        .route(
            "/Game/login",
            post(|Json(args): Json<Value>| async move {
                let reply = if args["password"] == "secret" {
                    format!("SUCCESS:tok-{}", args["username"].as_str().unwrap_or_default())
                } else {
                    "FAILURE:Invalid credentials".to_string()
                };
                Json(json!({ "result": reply }))
            }),
        )
        .route(
            "/Game/startGame",
            post(|| async {
                Json(json!({ "result": ["SUCCESS", "Waiting for another player", "g1"] }))
            }),
        )
        .route(
            "/Game/guessLetter",
            post(|Json(args): Json<Value>| async move {
                Json(json!({ "result": args["letter"] == "a" }))
            }),
        )
        .route("/Game/quitGame", post(|| async { Json(json!({ "result": null })) }))
        .route("/Game/logout", post(|| async { Json(json!({})) }))
        .route(
            "/Game/getGameConfig",
            post(|| async {
                Json(json!({ "result": "GAME CONFIGURATION:\nwait_time: 12 seconds\n" }))
            }),
        )
        .route(
            "/Game/getLeaderboard",
            post(|| async { (HttpStatus::INTERNAL_SERVER_ERROR, "boom") }),
        )
}

#[tokio::test]
async fn calls_are_posted_as_named_arguments() {
    let port = serve(bridge()).await;
    let service = HttpGameService::connect("127.0.0.1", port, TIMEOUT)
        .await
        .expect("connect");

    assert_eq!(
        service.login("alice", "secret").await.expect("login"),
        "SUCCESS:tok-alice"
    );
    assert_eq!(
        service.login("alice", "nope").await.expect("login"),
        "FAILURE:Invalid credentials"
    );
    assert_eq!(
        service.start_game("alice").await.expect("start"),
        vec!["SUCCESS", "Waiting for another player", "g1"]
    );
    assert!(service
        .guess_letter("alice", Guess::parse("A").expect("guess"))
        .await
        .expect("guess"));
    assert!(!service
        .guess_letter("alice", Guess::parse("b").expect("guess"))
        .await
        .expect("guess"));
    service.quit_game("alice").await.expect("quit");
    service.logout("alice").await.expect("logout");
    assert_eq!(
        shared::protocol::parse_wait_timeout(&service.get_game_config().await.expect("config")),
        12
    );
}

#[tokio::test]
async fn server_errors_surface_as_status() {
    let port = serve(bridge()).await;
    let service = HttpGameService::connect("127.0.0.1", port, TIMEOUT)
        .await
        .expect("connect");

    let err = service.get_leaderboard().await.expect_err("status");

    assert!(matches!(
        err,
        RpcError::Status {
            operation: "getLeaderboard",
            status: 500
        }
    ));
}

#[tokio::test]
async fn missing_service_entry_fails_initialization() {
    let port = serve(Router::new().route("/health", get(|| async { "ok" }))).await;

    let err = HttpGameService::connect("127.0.0.1", port, TIMEOUT)
        .await
        .err()
        .expect("missing entry");

    assert!(matches!(err, RpcError::ServiceNotFound(_)));
}

#[tokio::test]
async fn unreachable_bridge_fails_initialization() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let port = listener.local_addr().expect("addr").port();
    drop(listener);

    let err = HttpGameService::connect("127.0.0.1", port, TIMEOUT)
        .await
        .err()
        .expect("unreachable");

    assert!(matches!(err, RpcError::Request(_)));
}
