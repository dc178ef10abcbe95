use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use futures_util::{SinkExt, StreamExt};
use maze_chase_engine::constants::TICK_MS;
use maze_chase_engine::engine::{GameEngine, GameEngineOptions};
use maze_chase_engine::logging::emit_log;
use maze_chase_engine::maze::Maze;
use maze_chase_engine::types::{Direction, MazeView};
use serde_json::{json, Value};
use tokio::sync::{mpsc, Mutex};
use tower_http::services::{ServeDir, ServeFile};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

const OUTBOUND_QUEUE: usize = 256;

type SharedState = Arc<Mutex<ServerState>>;

#[derive(Clone, Debug)]
enum OutboundMessage {
    Text(String),
    Close { code: u16, reason: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum QueuePolicy {
    DropOnFull,
    DisconnectOnFull,
}

/// One WebSocket connection and the session it plays.
struct ClientSession {
    tx: mpsc::Sender<OutboundMessage>,
    game: Option<GameEngine>,
    summary_sent: bool,
}

struct ServerState {
    clients: HashMap<String, ClientSession>,
    maze_view: MazeView,
    fixed_seed: Option<u64>,
}

impl ServerState {
    fn new(maze_view: MazeView, fixed_seed: Option<u64>) -> Self {
        Self {
            clients: HashMap::new(),
            maze_view,
            fixed_seed,
        }
    }
}

#[derive(Debug, PartialEq)]
enum ParsedClientMessage {
    Start { seed: Option<u64> },
    Input { dir: Direction },
    Restart,
    Ping { t: f64 },
}

#[tokio::main]
async fn main() {
    let port = std::env::var("PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);
    let fixed_seed = std::env::var("MAZE_SEED")
        .ok()
        .and_then(|value| value.parse::<u64>().ok());

    let maze_view = match Maze::classic() {
        Ok(maze) => maze.to_view(),
        Err(error) => {
            emit_log(
                "error",
                "maze_load_failed",
                None,
                fixed_seed,
                None,
                json!({ "error": error.to_string() }),
            );
            std::process::exit(2);
        }
    };

    let state = Arc::new(Mutex::new(ServerState::new(maze_view, fixed_seed)));
    start_tick_loop(state.clone());

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/api/maze", get(maze_handler))
        .route("/ws", get(ws_handler))
        .with_state(state);

    let app = if let Some(static_dir) = resolve_static_dir() {
        let index_file = static_dir.join("index.html");
        println!(
            "[server] static file root: {}",
            static_dir.to_string_lossy()
        );
        app.fallback_service(
            ServeDir::new(static_dir).not_found_service(ServeFile::new(index_file)),
        )
    } else {
        println!("[server] no static client bundle, serving API only");
        app
    };

    let bind_addr = format!("0.0.0.0:{port}");
    let listener = match tokio::net::TcpListener::bind(&bind_addr).await {
        Ok(listener) => listener,
        Err(error) => {
            emit_log(
                "error",
                "bind_failed",
                None,
                None,
                None,
                json!({ "addr": bind_addr, "error": error.to_string() }),
            );
            std::process::exit(2);
        }
    };

    println!("[server] listening on :{port}");
    if let Err(error) = axum::serve(listener, app).await {
        emit_log(
            "error",
            "server_stopped",
            None,
            None,
            None,
            json!({ "error": error.to_string() }),
        );
        std::process::exit(1);
    }
}

fn resolve_static_dir() -> Option<PathBuf> {
    let raw = std::env::var("STATIC_DIR").ok()?;
    let path = PathBuf::from(raw);
    path.join("index.html").is_file().then_some(path)
}

async fn healthz() -> impl IntoResponse {
    Json(json!({ "ok": true }))
}

async fn maze_handler(State(state): State<SharedState>) -> impl IntoResponse {
    let guard = state.lock().await;
    Json(guard.maze_view.clone())
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<SharedState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(state, socket))
}

async fn handle_socket(state: SharedState, socket: WebSocket) {
    let client_id = make_id("client");
    let (tx, mut rx) = mpsc::channel::<OutboundMessage>(OUTBOUND_QUEUE);

    {
        let mut guard = state.lock().await;
        register_client(&mut guard, &client_id, tx.clone());
    }
    emit_log(
        "info",
        "client_connected",
        Some(&client_id),
        None,
        None,
        json!({}),
    );

    let (mut ws_sender, mut ws_receiver) = socket.split();
    let writer = tokio::spawn(async move {
        while let Some(outbound) = rx.recv().await {
            let should_close = matches!(outbound, OutboundMessage::Close { .. });
            let result = match outbound {
                OutboundMessage::Text(payload) => {
                    ws_sender.send(Message::Text(payload.into())).await
                }
                OutboundMessage::Close { code, reason } => {
                    let frame = CloseFrame {
                        code,
                        reason: reason.into(),
                    };
                    ws_sender.send(Message::Close(Some(frame))).await
                }
            };
            if result.is_err() || should_close {
                break;
            }
        }
    });

    while let Some(received) = ws_receiver.next().await {
        let Ok(message) = received else {
            break;
        };
        let raw = match message {
            Message::Text(raw) => raw.to_string(),
            Message::Binary(raw) => match String::from_utf8(raw.to_vec()) {
                Ok(text) => text,
                Err(_) => {
                    let mut guard = state.lock().await;
                    send_error(&mut guard, &client_id, "invalid utf8 message");
                    continue;
                }
            },
            Message::Close(_) => break,
            _ => continue,
        };

        let mut guard = state.lock().await;
        match parse_client_message(&raw) {
            Some(parsed) => apply_client_message(&mut guard, &client_id, parsed),
            None => send_error(&mut guard, &client_id, "invalid message"),
        }
    }

    {
        let mut guard = state.lock().await;
        guard.clients.remove(&client_id);
    }
    emit_log(
        "info",
        "client_disconnected",
        Some(&client_id),
        None,
        None,
        json!({}),
    );
    drop(tx);
    let _ = writer.await;
}

fn register_client(state: &mut ServerState, client_id: &str, tx: mpsc::Sender<OutboundMessage>) {
    state.clients.insert(
        client_id.to_string(),
        ClientSession {
            tx,
            game: None,
            summary_sent: false,
        },
    );
    let welcome = json!({
        "type": "welcome",
        "clientId": client_id,
        "maze": state.maze_view,
    });
    send_to_client(state, client_id, &welcome, QueuePolicy::DisconnectOnFull);
}

fn apply_client_message(state: &mut ServerState, client_id: &str, message: ParsedClientMessage) {
    match message {
        ParsedClientMessage::Start { seed } => {
            let seed = seed.or(state.fixed_seed).unwrap_or_else(rand::random::<u64>);
            let game = match GameEngine::new(GameEngineOptions {
                seed,
                ..GameEngineOptions::default()
            }) {
                Ok(game) => game,
                Err(error) => {
                    emit_log(
                        "error",
                        "session_start_failed",
                        Some(client_id),
                        Some(seed),
                        None,
                        json!({ "error": error.to_string() }),
                    );
                    send_error(state, client_id, "failed to start session");
                    return;
                }
            };
            let Some(client) = state.clients.get_mut(client_id) else {
                return;
            };
            client.game = Some(game);
            client.summary_sent = false;
            emit_log(
                "info",
                "session_started",
                Some(client_id),
                Some(seed),
                None,
                json!({}),
            );
        }
        ParsedClientMessage::Input { dir } => {
            let Some(game) = state
                .clients
                .get_mut(client_id)
                .and_then(|client| client.game.as_mut())
            else {
                send_error(state, client_id, "send start first");
                return;
            };
            game.set_direction(dir);
        }
        ParsedClientMessage::Restart => {
            let Some(client) = state.clients.get_mut(client_id) else {
                return;
            };
            let Some(game) = client.game.as_mut() else {
                send_error(state, client_id, "send start first");
                return;
            };
            game.init_session();
            client.summary_sent = false;
        }
        ParsedClientMessage::Ping { t } => {
            send_to_client(
                state,
                client_id,
                &json!({
                    "type": "pong",
                    "t": t,
                }),
                QueuePolicy::DisconnectOnFull,
            );
        }
    }
}

fn start_tick_loop(state: SharedState) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_millis(TICK_MS));
        loop {
            interval.tick().await;
            let mut guard = state.lock().await;
            tick_sessions(&mut guard);
        }
    });
}

fn tick_sessions(state: &mut ServerState) {
    let client_ids: Vec<String> = state.clients.keys().cloned().collect();
    for client_id in client_ids {
        let outgoing = {
            let Some(client) = state.clients.get_mut(&client_id) else {
                continue;
            };
            let Some(game) = client.game.as_mut() else {
                continue;
            };
            if game.is_session_over() {
                if client.summary_sent {
                    continue;
                }
                client.summary_sent = true;
                let summary = game.build_summary();
                emit_log(
                    "info",
                    "game_over",
                    Some(&client_id),
                    Some(game.seed()),
                    Some(summary.ticks),
                    json!({
                        "score": summary.score,
                        "roundReached": summary.round_reached,
                    }),
                );
                (
                    json!({ "type": "game_over", "summary": summary }),
                    QueuePolicy::DisconnectOnFull,
                )
            } else {
                game.tick();
                (
                    json!({ "type": "state", "snapshot": game.build_snapshot(true) }),
                    QueuePolicy::DropOnFull,
                )
            }
        };
        send_to_client(state, &client_id, &outgoing.0, outgoing.1);
    }
}

fn send_to_client(state: &mut ServerState, client_id: &str, message: &Value, policy: QueuePolicy) {
    let send_failed = match state.clients.get(client_id) {
        Some(client) => client
            .tx
            .try_send(OutboundMessage::Text(message.to_string()))
            .is_err(),
        None => false,
    };
    if send_failed && policy == QueuePolicy::DisconnectOnFull {
        if let Some(client) = state.clients.remove(client_id) {
            let _ = client.tx.try_send(OutboundMessage::Close {
                code: 1013,
                reason: "outbound queue full".to_string(),
            });
        }
        emit_log(
            "warn",
            "client_dropped",
            Some(client_id),
            None,
            None,
            json!({ "reason": "outbound queue full" }),
        );
    }
}

fn send_error(state: &mut ServerState, client_id: &str, message: &str) {
    send_to_client(
        state,
        client_id,
        &json!({
            "type": "error",
            "message": message,
        }),
        QueuePolicy::DisconnectOnFull,
    );
}

fn parse_client_message(raw: &str) -> Option<ParsedClientMessage> {
    let value: Value = serde_json::from_str(raw).ok()?;
    let object = value.as_object()?;
    let message_type = object.get("type")?.as_str()?;

    match message_type {
        "start" => {
            let seed = match object.get("seed") {
                None | Some(Value::Null) => None,
                Some(value) => Some(value.as_u64()?),
            };
            Some(ParsedClientMessage::Start { seed })
        }
        "input" => {
            let dir = Direction::parse_move(object.get("dir")?.as_str()?)?;
            Some(ParsedClientMessage::Input { dir })
        }
        "restart" => Some(ParsedClientMessage::Restart),
        "ping" => {
            let t = object.get("t")?.as_f64()?;
            if !t.is_finite() {
                return None;
            }
            Some(ParsedClientMessage::Ping { t })
        }
        _ => None,
    }
}

fn make_id(prefix: &str) -> String {
    let seq = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}_{seq}")
}
