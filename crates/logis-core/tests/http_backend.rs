use std::sync::Arc;

use anyhow::Result;
use axum::{extract::State, http::StatusCode, routing::get, routing::post, Json, Router};
use logis_core::{
    ApiError, ChatBackend, ChatRequest, ChatRole, LogisClient, SendOutcome, SessionController,
    FALLBACK_MESSAGE,
};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::Mutex};

const STOCK_QUESTION: &str = "¿Hay stock de elaion f50 5w-40 4l?";

#[derive(Clone, Copy)]
enum ChatMode {
    Answer,
    ServerError,
    Malformed,
}

#[derive(Clone)]
struct ServerState {
    mode: ChatMode,
    healthy: bool,
    requests: Arc<Mutex<Vec<Value>>>,
}

async fn handle_health(State(state): State<ServerState>) -> (StatusCode, Json<Value>) {
    if state.healthy {
        (StatusCode::OK, Json(json!({"status": "ok", "productos": 50})))
    } else {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"detail": "no such table: inventario"})),
        )
    }
}

async fn handle_chat(
    State(state): State<ServerState>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let mut requests = state.requests.lock().await;
    requests.push(body.clone());
    let turn = requests.len();

    match state.mode {
        ChatMode::Answer => {
            let session_id = body["session_id"]
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| "abc123".to_string());
            (
                StatusCode::OK,
                Json(json!({
                    "session_id": session_id,
                    "response": format!("Respuesta {turn}: Sí, 4 unidades."),
                })),
            )
        }
        ChatMode::ServerError => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"detail": "quota exceeded"})),
        ),
        ChatMode::Malformed => (StatusCode::OK, Json(json!({"respuesta": "sin sesión"}))),
    }
}

async fn spawn_backend(mode: ChatMode, healthy: bool) -> Result<(String, ServerState)> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let state = ServerState {
        mode,
        healthy,
        requests: Arc::new(Mutex::new(Vec::new())),
    };
    let app = Router::new()
        .route("/health", get(handle_health))
        .route("/chat", post(handle_chat))
        .with_state(state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((format!("http://{addr}"), state))
}

/// A base URL nothing is listening on.
async fn closed_port_url() -> Result<String> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);
    Ok(format!("http://{addr}"))
}

#[tokio::test]
async fn conversation_threads_session_id_over_http() {
    let (url, server) = spawn_backend(ChatMode::Answer, true).await.expect("spawn server");
    let (controller, probe) = SessionController::start(LogisClient::new(&url));
    assert!(probe.await.unwrap());
    assert_eq!(controller.snapshot().product_count(), Some(50));

    assert_eq!(
        controller.send(Some(STOCK_QUESTION)).await,
        SendOutcome::Answered
    );
    assert_eq!(
        controller.send(Some("¿Y en 1 litro?")).await,
        SendOutcome::Answered
    );

    let state = controller.snapshot();
    assert_eq!(state.session_id(), Some("abc123"));
    let roles: Vec<ChatRole> = state.turns().iter().map(|turn| turn.role()).collect();
    assert_eq!(
        roles,
        vec![
            ChatRole::User,
            ChatRole::Assistant,
            ChatRole::User,
            ChatRole::Assistant
        ]
    );
    assert_eq!(state.turns()[1].content(), "Respuesta 1: Sí, 4 unidades.");

    let requests = server.requests.lock().await.clone();
    assert_eq!(
        requests,
        vec![
            json!({"message": STOCK_QUESTION, "session_id": null}),
            json!({"message": "¿Y en 1 litro?", "session_id": "abc123"}),
        ]
    );
}

#[tokio::test]
async fn server_error_becomes_fallback_turn() {
    let (url, _server) = spawn_backend(ChatMode::ServerError, true)
        .await
        .expect("spawn server");
    let client = LogisClient::new(&url);

    let err = client
        .chat(&ChatRequest {
            message: STOCK_QUESTION.to_string(),
            session_id: None,
        })
        .await
        .unwrap_err();
    match err {
        ApiError::Status { status, detail, .. } => {
            assert_eq!(status.as_u16(), 500);
            assert_eq!(detail, "quota exceeded");
        }
        other => panic!("expected status error, got {other:?}"),
    }

    let (controller, _probe) = SessionController::start(client);
    assert_eq!(
        controller.send(Some(STOCK_QUESTION)).await,
        SendOutcome::Fallback
    );
    let state = controller.snapshot();
    assert_eq!(state.turns()[1].content(), FALLBACK_MESSAGE);
    assert_eq!(state.session_id(), None);
    assert!(!state.pending());
}

#[tokio::test]
async fn malformed_reply_becomes_fallback_turn() {
    let (url, _server) = spawn_backend(ChatMode::Malformed, true)
        .await
        .expect("spawn server");
    let client = LogisClient::new(&url);

    let err = client
        .chat(&ChatRequest {
            message: "Dame los 5 productos más caros".to_string(),
            session_id: Some("abc123".to_string()),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Decode { .. }));

    let (controller, _probe) = SessionController::start(client);
    assert_eq!(
        controller.send(Some("Dame los 5 productos más caros")).await,
        SendOutcome::Fallback
    );
    assert_eq!(controller.snapshot().turns()[1].content(), FALLBACK_MESSAGE);
}

#[tokio::test]
async fn unhealthy_backend_reports_offline() {
    let (url, _server) = spawn_backend(ChatMode::Answer, false)
        .await
        .expect("spawn server");

    let (controller, probe) = SessionController::start(LogisClient::new(&url));

    assert!(!probe.await.unwrap());
    let state = controller.snapshot();
    assert!(!state.connected());
    assert_eq!(state.product_count(), None);
}

#[tokio::test]
async fn unreachable_backend_is_offline_and_falls_back() {
    let url = closed_port_url().await.expect("reserve port");

    let (controller, probe) = SessionController::start(LogisClient::new(&url));

    assert!(!probe.await.unwrap());
    assert_eq!(
        controller.send(Some(STOCK_QUESTION)).await,
        SendOutcome::Fallback
    );
    let state = controller.snapshot();
    assert_eq!(state.turns().len(), 2);
    assert_eq!(state.turns()[0].content(), STOCK_QUESTION);
    assert_eq!(state.turns()[1].content(), FALLBACK_MESSAGE);
    assert_eq!(state.session_id(), None);
}

#[tokio::test]
async fn plain_text_health_body_still_counts_as_connected() {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let url = format!("http://{}", listener.local_addr().expect("local addr"));
    let app = Router::new().route("/health", get(|| async { "ok" }));
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    let (controller, probe) = SessionController::start(LogisClient::new(&url));

    assert!(probe.await.unwrap());
    let state = controller.snapshot();
    assert!(state.connected());
    assert_eq!(state.product_count(), None);
}
