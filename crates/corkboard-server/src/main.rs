//! Corkboard WebSocket Relay Server
//!
//! Relays board events between clients on the same board and keeps a
//! presence registry per board. The relay never looks inside event payloads;
//! merging is entirely up to the clients.
//!
//! ## Protocol
//!
//! Messages are JSON with a `type` tag:
//! ```json
//! { "type": "join", "board": "board-id" }
//! { "type": "broadcast", "event": "objects", "payload": { "kind": "ops", "ops": [] } }
//! { "type": "track", "meta": { "userId": "u1", "displayName": "Ada" } }
//! ```

use axum::{
    Router,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
    routing::get,
};
use corkboard_core::presence::{PresenceMeta, PresenceState};
use corkboard_core::transport::protocol::{ClientMessage, ServerMessage};
use dashmap::DashMap;
use futures_util::{
    SinkExt, StreamExt,
    stream::SplitSink,
};
use std::{collections::HashSet, net::SocketAddr, sync::Arc};
use tokio::sync::broadcast::{self, error::RecvError};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Capacity of each board's fan-out channel.
const CHANNEL_CAPACITY: usize = 256;

/// Port used when `CORKBOARD_ADDR` is unset or invalid.
const DEFAULT_PORT: u16 = 3030;

/// A message on a board's channel, with the client it must not be echoed to.
#[derive(Debug, Clone)]
struct Envelope {
    skip: Option<String>,
    msg: ServerMessage,
}

/// Board state
struct Board {
    tx: broadcast::Sender<Envelope>,
    members: HashSet<String>,
    presence: PresenceState,
}

impl Board {
    fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            tx,
            members: HashSet::new(),
            presence: PresenceState::new(),
        }
    }

    /// Send the whole registry to every member.
    fn publish_presence(&self) {
        let msg = ServerMessage::PresenceState {
            state: self.presence.clone(),
        };
        let _ = self.tx.send(Envelope { skip: None, msg });
    }
}

/// Shared application state
struct AppState {
    boards: DashMap<String, Board>,
}

impl AppState {
    fn new() -> Self {
        Self {
            boards: DashMap::new(),
        }
    }

    /// Add a client to a board, creating the board on first join.
    fn join(&self, board_id: &str, client_id: &str) -> (broadcast::Receiver<Envelope>, PresenceState) {
        let mut board = self
            .boards
            .entry(board_id.to_string())
            .or_insert_with(Board::new);
        board.members.insert(client_id.to_string());
        (board.tx.subscribe(), board.presence.clone())
    }

    /// Remove a client and its presence from a board. Empty boards are dropped.
    fn leave(&self, board_id: &str, client_id: &str) {
        if let Some(mut board) = self.boards.get_mut(board_id) {
            board.members.remove(client_id);
            if board.presence.remove(client_id).is_some() {
                board.publish_presence();
            }
        }
        self.boards.remove_if(board_id, |_, b| b.members.is_empty());
    }

    fn track(&self, board_id: &str, client_id: &str, meta: PresenceMeta) {
        if let Some(mut board) = self.boards.get_mut(board_id) {
            board.presence.insert(client_id.to_string(), vec![meta]);
            board.publish_presence();
        }
    }

    fn untrack(&self, board_id: &str, client_id: &str) {
        if let Some(mut board) = self.boards.get_mut(board_id) {
            if board.presence.remove(client_id).is_some() {
                board.publish_presence();
            }
        }
    }

    /// Fan a message out to every member of a board except `skip`.
    fn broadcast(&self, board_id: &str, skip: Option<&str>, msg: ServerMessage) {
        if let Some(board) = self.boards.get(board_id) {
            let _ = board.tx.send(Envelope {
                skip: skip.map(str::to_string),
                msg,
            });
        }
    }

    #[cfg(test)]
    fn member_count(&self, board_id: &str) -> usize {
        self.boards.get(board_id).map_or(0, |b| b.members.len())
    }
}

/// One socket's place in the relay.
struct Connection {
    client_id: String,
    board: Option<String>,
    rx: Option<broadcast::Receiver<Envelope>>,
}

impl Connection {
    fn new() -> Self {
        Self {
            client_id: Uuid::new_v4().to_string(),
            board: None,
            rx: None,
        }
    }

    fn leave(&mut self, state: &AppState) {
        if let Some(board) = self.board.take() {
            state.leave(&board, &self.client_id);
            info!("Client {} left board {}", self.client_id, board);
        }
        self.rx = None;
    }

    /// Apply one client message. Returns a reply for this client only.
    fn handle(&mut self, state: &AppState, msg: ClientMessage) -> Option<ServerMessage> {
        match msg {
            ClientMessage::Join { board } => {
                self.leave(state);
                let (rx, presence) = state.join(&board, &self.client_id);
                self.rx = Some(rx);
                self.board = Some(board.clone());
                info!("Client {} joined board {}", self.client_id, board);
                Some(ServerMessage::Joined {
                    board,
                    client_id: self.client_id.clone(),
                    presence,
                })
            }
            ClientMessage::Leave => {
                self.leave(state);
                None
            }
            ClientMessage::Broadcast { event, payload } => {
                let Some(board) = self.board.as_deref() else {
                    return Some(not_joined());
                };
                debug!("Client {} broadcast {} on {}", self.client_id, event, board);
                state.broadcast(
                    board,
                    Some(&self.client_id),
                    ServerMessage::Broadcast {
                        from: self.client_id.clone(),
                        event,
                        payload,
                    },
                );
                None
            }
            ClientMessage::Track { meta } => {
                let Some(board) = self.board.as_deref() else {
                    return Some(not_joined());
                };
                state.track(board, &self.client_id, meta);
                None
            }
            ClientMessage::Untrack => {
                if let Some(board) = self.board.as_deref() {
                    state.untrack(board, &self.client_id);
                }
                None
            }
        }
    }
}

fn not_joined() -> ServerMessage {
    ServerMessage::Error {
        message: "Join a board first".to_string(),
    }
}

fn listen_addr() -> SocketAddr {
    std::env::var("CORKBOARD_ADDR")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)))
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "corkboard_server=info,tower_http=info".into()),
        )
        .init();

    let state = Arc::new(AppState::new());

    let app = Router::new()
        .route("/", get(index))
        .route("/ws", get(ws_handler))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = listen_addr();
    info!("Corkboard relay listening on {}", addr);
    info!("WebSocket endpoint: ws://{}/ws", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await
}

/// Index page
async fn index() -> &'static str {
    "Corkboard Relay Server - Connect via WebSocket at /ws"
}

/// Health check
async fn health() -> &'static str {
    "ok"
}

/// WebSocket upgrade handler
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Serialize and send one message. Returns false once the socket is gone.
async fn send_message(sender: &mut SplitSink<WebSocket, Message>, msg: &ServerMessage) -> bool {
    match serde_json::to_string(msg) {
        Ok(json) => sender.send(Message::Text(json.into())).await.is_ok(),
        Err(e) => {
            warn!("Failed to encode server message: {}", e);
            true
        }
    }
}

/// Handle a WebSocket connection
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let mut conn = Connection::new();
    info!("New connection: {}", conn.client_id);

    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            // Handle incoming messages from client
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let reply = match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(client_msg) => conn.handle(&state, client_msg),
                            Err(e) => {
                                warn!("Invalid message from {}: {}", conn.client_id, e);
                                Some(ServerMessage::Error {
                                    message: format!("Invalid message: {}", e),
                                })
                            }
                        };
                        if let Some(reply) = reply {
                            if !send_message(&mut sender, &reply).await {
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {} // Ignore binary and ping/pong
                    Some(Err(e)) => {
                        warn!("WebSocket error for {}: {}", conn.client_id, e);
                        break;
                    }
                }
            }

            // Handle messages fanned out on the board
            msg = async {
                match &mut conn.rx {
                    Some(rx) => rx.recv().await,
                    None => std::future::pending().await,
                }
            } => {
                match msg {
                    Ok(envelope) => {
                        if envelope.skip.as_deref() != Some(conn.client_id.as_str())
                            && !send_message(&mut sender, &envelope.msg).await
                        {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(n)) => {
                        warn!("Client {} lagged, skipped {} messages", conn.client_id, n);
                    }
                    Err(RecvError::Closed) => conn.rx = None,
                }
            }
        }
    }

    // Cleanup on disconnect
    conn.leave(&state);
    info!("Connection closed: {}", conn.client_id);
}
